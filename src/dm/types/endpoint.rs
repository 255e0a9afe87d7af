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

use crate::error::Error;
use crate::tlv::{TLVTag, TLVWrite, ToTLV};
use crate::utils::bitflags::bitflags;

use super::{ClusterId, DeviceTypeId, EndptId};

/// The sentinel endpoint ID, used where "no endpoint" needs to be
/// expressed (most notably as the implicit root parent).
pub const INVALID_ENDPOINT_ID: EndptId = 0xFFFF;

/// How an endpoint composes the endpoints beneath it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CompositionPattern {
    /// The endpoint exposes only its direct children in its parts list
    Tree,
    /// The endpoint exposes every transitive descendant in its parts list
    FullFamily,
}

/// The position of one endpoint in the endpoint tree of a node.
///
/// A `parent_id` of [`INVALID_ENDPOINT_ID`] means the endpoint hangs
/// directly off the (implicit) root.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EndpointEntry {
    pub id: EndptId,
    pub parent_id: EndptId,
    pub composition: CompositionPattern,
}

impl EndpointEntry {
    pub const fn new(id: EndptId, parent_id: EndptId, composition: CompositionPattern) -> Self {
        Self {
            id,
            parent_id,
            composition,
        }
    }

    /// A root-parented endpoint with the tree composition pattern.
    pub const fn tree(id: EndptId, parent_id: EndptId) -> Self {
        Self::new(id, parent_id, CompositionPattern::Tree)
    }

    pub const fn parent(&self) -> Option<EndptId> {
        if self.parent_id == INVALID_ENDPOINT_ID {
            None
        } else {
            Some(self.parent_id)
        }
    }
}

/// A device type attached to an endpoint, with the revision of its
/// device type definition.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceTypeEntry {
    pub device_type: DeviceTypeId,
    pub revision: u16,
}

impl DeviceTypeEntry {
    pub const fn new(device_type: DeviceTypeId, revision: u16) -> Self {
        Self {
            device_type,
            revision,
        }
    }
}

mod device_type_tag {
    pub const DEVICE_TYPE: u8 = 0;
    pub const REVISION: u8 = 1;
}

impl ToTLV for DeviceTypeEntry {
    fn to_tlv<W: TLVWrite>(&self, tag: &TLVTag, mut tw: W) -> Result<(), Error> {
        tw.start_struct(tag)?;
        tw.u32(
            &TLVTag::Context(device_type_tag::DEVICE_TYPE),
            self.device_type,
        )?;
        tw.u16(&TLVTag::Context(device_type_tag::REVISION), self.revision)?;
        tw.end_container()
    }
}

bitflags! {
    /// Quality flags of a whole server cluster instance.
    #[repr(transparent)]
    #[derive(Default)]
    #[cfg_attr(not(feature = "defmt"), derive(Debug, Copy, Clone, Eq, PartialEq, Hash))]
    pub struct ClusterQuality: u8 {
        /// The cluster serves diagnostics data
        const DIAGNOSTICS = 0x01;
    }
}

/// A server cluster as seen through the topology query surface: its ID,
/// its live data version and its quality flags.
///
/// Produced on demand by the registry; the `dataver` is read from the
/// cluster instance at query time, never cached.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServerClusterEntry {
    pub id: ClusterId,
    pub dataver: u32,
    pub quality: ClusterQuality,
}

/// A semantic tag attached to an endpoint, disambiguating equivalent
/// endpoints for clients (e.g. "left" vs "right" switch).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SemanticTag {
    pub namespace_id: u8,
    pub tag: u8,
    pub mfg_code: Option<u16>,
}

impl SemanticTag {
    pub const fn new(namespace_id: u8, tag: u8) -> Self {
        Self {
            namespace_id,
            tag,
            mfg_code: None,
        }
    }
}

mod semantic_tag_tag {
    pub const MFG_CODE: u8 = 0;
    pub const NAMESPACE_ID: u8 = 1;
    pub const TAG: u8 = 2;
}

impl ToTLV for SemanticTag {
    fn to_tlv<W: TLVWrite>(&self, tag: &TLVTag, mut tw: W) -> Result<(), Error> {
        tw.start_struct(tag)?;
        match self.mfg_code {
            Some(code) => tw.u16(&TLVTag::Context(semantic_tag_tag::MFG_CODE), code)?,
            None => tw.null(&TLVTag::Context(semantic_tag_tag::MFG_CODE))?,
        }
        tw.u8(
            &TLVTag::Context(semantic_tag_tag::NAMESPACE_ID),
            self.namespace_id,
        )?;
        tw.u8(&TLVTag::Context(semantic_tag_tag::TAG), self.tag)?;
        tw.end_container()
    }
}
