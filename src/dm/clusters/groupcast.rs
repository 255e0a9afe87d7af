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

//! The Groupcast cluster, currently a placeholder: the complete metadata
//! surface is advertised, while every operation on a recognized id fails
//! with `NotImplemented`.
//!
//! This is a legitimate pre-feature-complete state of a cluster, and it
//! is deliberately distinguishable on the wire and in the logs from the
//! `Unsupported*` family: an unknown id is the caller addressing
//! something that does not exist, a `NotImplemented` one is addressing
//! something whose logic has not been built yet.

use strum::FromRepr;

use log::warn;

use crate::dm::{
    AcceptedCommandEntry, AttrDetails, AttrListBuilder, AttrQuality, AttrValueDecoder,
    AttrValueEncoder, AttributeEntry, ClusterContext, ClusterPath, ClusterState, CmdDetails,
    CmdQuality, CmdReply, Dataver, EndptId, GlobalAttr, ListBuilder, OptionalAttributeSet,
    Privilege, ServerCluster,
};
use crate::error::{Error, ErrorCode};
use crate::tlv::TLVElement;
use crate::{attribute_enum, command_enum};

pub const ID: u32 = 0x0065;

pub const CLUSTER_REVISION: u16 = 1;

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum AttributeId {
    Membership = 0x0000,
}

attribute_enum!(AttributeId);

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum CommandId {
    JoinGroup = 0x00,
    LeaveGroup = 0x01,
    UpdateGroupKey = 0x02,
}

command_enum!(CommandId);

const ATTRIBUTES: &[AttributeEntry] = &[AttributeEntry::new(
    AttributeId::Membership as _,
    AttrQuality::LIST,
    Some(Privilege::Manage),
    None,
)];

const COMMANDS: &[AcceptedCommandEntry] = &[
    AcceptedCommandEntry::new(
        CommandId::JoinGroup as _,
        CmdQuality::FABRIC_SCOPED,
        Privilege::Manage,
    ),
    AcceptedCommandEntry::new(
        CommandId::LeaveGroup as _,
        CmdQuality::FABRIC_SCOPED,
        Privilege::Manage,
    ),
    AcceptedCommandEntry::new(
        CommandId::UpdateGroupKey as _,
        CmdQuality::FABRIC_SCOPED,
        Privilege::Administer,
    ),
];

/// The Groupcast cluster of the root endpoint.
pub struct GroupcastCluster {
    state: ClusterState,
}

impl GroupcastCluster {
    pub const fn new(endpoint_id: EndptId, dataver: Dataver) -> Self {
        Self {
            state: ClusterState::new(
                ClusterPath {
                    endpoint_id,
                    cluster_id: ID,
                },
                dataver,
            ),
        }
    }
}

impl ServerCluster for GroupcastCluster {
    fn path(&self) -> ClusterPath {
        self.state.path()
    }

    fn dataver(&self) -> u32 {
        self.state.dataver()
    }

    fn startup(&self, _ctx: &ClusterContext<'_>) -> Result<(), Error> {
        self.state.startup()
    }

    fn shutdown(&self) {
        self.state.shutdown();
    }

    fn attributes(
        &self,
        _ctx: &ClusterContext<'_>,
        builder: &mut ListBuilder<'_, AttributeEntry>,
    ) -> Result<(), Error> {
        AttrListBuilder::new(builder)
            .mandatory(ATTRIBUTES)?
            .optional(&[], OptionalAttributeSet::empty())?
            .finish()
    }

    fn accepted_commands(
        &self,
        _ctx: &ClusterContext<'_>,
        builder: &mut ListBuilder<'_, AcceptedCommandEntry>,
    ) -> Result<(), Error> {
        builder.try_extend_from_slice(COMMANDS)
    }

    fn read(
        &self,
        _ctx: &ClusterContext<'_>,
        req: &AttrDetails,
        encoder: AttrValueEncoder<'_, '_>,
    ) -> Result<(), Error> {
        let Some(writer) = encoder.with_dataver(self.dataver())? else {
            return Ok(());
        };

        if req.attr_id == GlobalAttr::FeatureMap as u32 {
            return writer.set(0u32);
        }

        if req.attr_id == GlobalAttr::ClusterRevision as u32 {
            return writer.set(CLUSTER_REVISION);
        }

        match req.attr_id.try_into()? {
            AttributeId::Membership => {
                warn!("{}: membership not implemented yet", req.path());
                Err(ErrorCode::NotImplemented.into())
            }
        }
    }

    fn write(
        &self,
        _ctx: &ClusterContext<'_>,
        req: &AttrDetails,
        _decoder: AttrValueDecoder<'_>,
    ) -> Result<(), Error> {
        match req.attr_id.try_into()? {
            AttributeId::Membership => Err(ErrorCode::NotImplemented.into()),
        }
    }

    fn invoke(
        &self,
        _ctx: &ClusterContext<'_>,
        req: &CmdDetails,
        _data: &TLVElement<'_>,
        _reply: CmdReply<'_, '_>,
    ) -> Result<(), Error> {
        match req.cmd_id.try_into()? {
            CommandId::JoinGroup | CommandId::LeaveGroup | CommandId::UpdateGroupKey => {
                warn!("{}: command {:#04x} not implemented yet", req.path(), req.cmd_id);
                Err(ErrorCode::NotImplemented.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AttributeId, CommandId, GroupcastCluster, ID};
    use crate::dm::registry::ClusterRegistry;
    use crate::dm::{
        AttrDetails, AttrValueEncoder, ClusterContext, CmdDetails, CmdDataTracker, CmdReply,
        Dataver, DeviceTypeEntry, EndpointEntry, EndpointMeta, Node, ServerCluster,
        INVALID_ENDPOINT_ID,
    };
    use crate::error::ErrorCode;
    use crate::tlv::{TLVTag, TLVWrite, TLVWriter};

    const NODE: Node<'static> = Node::new(
        0,
        &[EndpointMeta::new(
            EndpointEntry::tree(0, INVALID_ENDPOINT_ID),
            &[DeviceTypeEntry::new(0x0016, 1)],
        )],
    );

    #[test]
    fn test_recognized_ids_yield_not_implemented() {
        let cluster = GroupcastCluster::new(0, Dataver::new(0));
        let registry = ClusterRegistry::<2>::new(NODE, &());
        registry.register(&cluster).unwrap();

        let mut buf = [0; 64];

        // Recognized attribute: NotImplemented
        let mut tw = TLVWriter::new(&mut buf);
        let req = AttrDetails::new(0, ID, AttributeId::Membership as u32);
        let err = registry
            .read(&req, AttrValueEncoder::new(&req, &mut tw))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotImplemented);

        // Unknown attribute: a different failure entirely
        let mut tw = TLVWriter::new(&mut buf);
        let req = AttrDetails::new(0, ID, 0x42);
        let err = registry
            .read(&req, AttrValueEncoder::new(&req, &mut tw))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AttributeNotFound);
    }

    #[test]
    fn test_invoke_not_implemented_vs_unknown() {
        let cluster = GroupcastCluster::new(0, Dataver::new(0));
        let registry = ClusterRegistry::<2>::new(NODE, &());
        registry.register(&cluster).unwrap();

        let mut data_buf = [0; 8];
        let mut tw = TLVWriter::new(&mut data_buf);
        tw.start_struct(&TLVTag::Anonymous).unwrap();
        tw.end_container().unwrap();
        let data = crate::tlv::TLVElement::new(tw.as_slice()).unwrap();

        let mut out = [0; 32];

        let mut tw = TLVWriter::new(&mut out);
        let mut tracker = CmdDataTracker::new();
        let req = CmdDetails::new(0, ID, CommandId::JoinGroup as u32);
        let err = registry
            .invoke(&req, &data, CmdReply::new(&mut tracker, &mut tw))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotImplemented);

        let mut tw = TLVWriter::new(&mut out);
        let mut tracker = CmdDataTracker::new();
        let req = CmdDetails::new(0, ID, 0x77);
        let err = registry
            .invoke(&req, &data, CmdReply::new(&mut tracker, &mut tw))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CommandNotFound);
    }

    #[test]
    fn test_reads_never_panic_on_unknown_ids() {
        let cluster = GroupcastCluster::new(0, Dataver::new(0));
        let registry = ClusterRegistry::<2>::new(NODE, &());
        let ctx = ClusterContext {
            provider: &registry,
            notify: &(),
        };

        for attr_id in [0x01u32, 0xFFF7, 0xFFFF, u32::MAX] {
            let mut buf = [0; 16];
            let mut tw = TLVWriter::new(&mut buf);
            let req = AttrDetails::new(0, ID, attr_id);

            let err = cluster
                .read(&ctx, &req, AttrValueEncoder::new(&req, &mut tw))
                .unwrap_err();
            assert_eq!(err.code(), ErrorCode::AttributeNotFound);
        }
    }
}
