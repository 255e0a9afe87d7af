/*
 *
 *    Copyright (c) 2020-2022 Project CHIP Authors
 *
 *    Licensed under the Apache License, Version 2.0 (the "License");
 *    you may not use this file except in compliance with the License.
 *    You may obtain a copy of the License at
 *
 *        http://www.apache.org/licenses/LICENSE-2.0
 *
 *    Unless required by applicable law or agreed to in writing, software
 *    distributed under the License is distributed on an "AS IS" BASIS,
 *    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *    See the License for the specific language governing permissions and
 *    limitations under the License.
 */

//! A fixture resembling a small bridged device: a root endpoint plus an
//! aggregated endpoint with two bridged children, with the clusters this
//! crate implements mounted on them.

use core::cell::Cell;

use matter_dm::dm::clusters::{desc::DescCluster, groupcast::GroupcastCluster, meter_id::MeterIdCluster};
use matter_dm::dm::registry::ClusterRegistry;
use matter_dm::dm::{
    AttrDetails, AttrId, AttrValueEncoder, ClusterId, CompositionPattern, Dataver,
    DeviceTypeEntry, EndpointEntry, EndpointMeta, EndptId, Node, SemanticTag,
    INVALID_ENDPOINT_ID,
};
use matter_dm::error::Error;
use matter_dm::tlv::{TLVElement, TLVWriter};

pub const ROOT: EndptId = 0;
pub const AGGREGATOR: EndptId = 1;
pub const METER_A: EndptId = 2;
pub const METER_B: EndptId = 3;

pub const NODE: Node<'static> = Node::new(
    0,
    &[
        EndpointMeta::new(
            EndpointEntry::tree(ROOT, INVALID_ENDPOINT_ID),
            &[DeviceTypeEntry::new(0x0016, 3)],
        ),
        EndpointMeta::new(
            EndpointEntry::new(AGGREGATOR, ROOT, CompositionPattern::FullFamily),
            &[DeviceTypeEntry::new(0x000E, 2)],
        ),
        EndpointMeta::new(
            EndpointEntry::tree(METER_A, AGGREGATOR),
            &[DeviceTypeEntry::new(0x0503, 1)],
        )
        .with_semantic_tags(&[SemanticTag::new(7, 0)])
        .with_unique_id("meter-a"),
        EndpointMeta::new(
            EndpointEntry::tree(METER_B, AGGREGATOR),
            &[DeviceTypeEntry::new(0x0503, 1)],
        ),
    ],
);

/// A change notification sink recording every notification it sees.
#[derive(Default)]
pub struct RecordingNotify {
    count: Cell<u32>,
    last: Cell<Option<(EndptId, ClusterId, AttrId)>>,
}

impl RecordingNotify {
    pub fn count(&self) -> u32 {
        self.count.get()
    }

    pub fn last(&self) -> Option<(EndptId, ClusterId, AttrId)> {
        self.last.get()
    }
}

impl matter_dm::dm::ChangeNotify for RecordingNotify {
    fn notify(&self, endpoint_id: EndptId, cluster_id: ClusterId, attr_id: AttrId) {
        self.count.set(self.count.get() + 1);
        self.last.set(Some((endpoint_id, cluster_id, attr_id)));
    }
}

/// The cluster instances of the fixture node, owned by the "application".
pub struct Clusters {
    pub root_desc: DescCluster,
    pub groupcast: GroupcastCluster,
    pub aggregator_desc: DescCluster,
    pub meter_a_desc: DescCluster,
    pub meter_a: MeterIdCluster,
    pub meter_b_desc: DescCluster,
    pub meter_b: MeterIdCluster,
}

impl Clusters {
    pub fn new() -> Self {
        Self {
            root_desc: DescCluster::new(ROOT, Dataver::new(1)),
            groupcast: GroupcastCluster::new(ROOT, Dataver::new(1)),
            aggregator_desc: DescCluster::new(AGGREGATOR, Dataver::new(1)),
            meter_a_desc: DescCluster::new(METER_A, Dataver::new(1)),
            meter_a: MeterIdCluster::new(METER_A, Dataver::new(1)).with_power_threshold(),
            meter_b_desc: DescCluster::new(METER_B, Dataver::new(1)),
            meter_b: MeterIdCluster::new(METER_B, Dataver::new(1)),
        }
    }

    pub fn register<'a, const N: usize>(
        &'a self,
        registry: &ClusterRegistry<'a, N>,
    ) -> Result<(), Error> {
        registry.register(&self.root_desc)?;
        registry.register(&self.groupcast)?;
        registry.register(&self.aggregator_desc)?;
        registry.register(&self.meter_a_desc)?;
        registry.register(&self.meter_a)?;
        registry.register(&self.meter_b_desc)?;
        registry.register(&self.meter_b)?;

        Ok(())
    }
}

/// Read an attribute through the registry, returning the raw reply bytes.
pub fn read<const N: usize>(
    registry: &ClusterRegistry<'_, N>,
    endpoint_id: EndptId,
    cluster_id: ClusterId,
    attr_id: AttrId,
) -> Result<Vec<u8>, Error> {
    let mut buf = [0; 512];
    let mut tw = TLVWriter::new(&mut buf);
    let req = AttrDetails::new(endpoint_id, cluster_id, attr_id);

    registry.read(&req, AttrValueEncoder::new(&req, &mut tw))?;

    Ok(tw.as_slice().to_vec())
}

/// Read a list-shaped attribute and decode it as a list of ids.
pub fn read_id_list<const N: usize>(
    registry: &ClusterRegistry<'_, N>,
    endpoint_id: EndptId,
    cluster_id: ClusterId,
    attr_id: AttrId,
) -> Result<Vec<u32>, Error> {
    let data = read(registry, endpoint_id, cluster_id, attr_id)?;
    let root = TLVElement::new(&data)?;

    root.array()?
        .map(|element| element.and_then(|element| element.u32()))
        .collect()
}
