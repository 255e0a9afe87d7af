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

//! The cluster registry: a non-owning, endpoint+cluster keyed index of
//! the server cluster instances of a node, and the dispatch entry points
//! which route attribute reads/writes and command invocations to them.

use core::cell::RefCell;
use core::mem::MaybeUninit;

use log::{debug, warn};

use crate::error::{Error, ErrorCode};
use crate::tlv::TLVElement;

use super::{
    AcceptedCommandEntry, AttrDetails, AttrValueDecoder, AttrValueEncoder, AttributeEntry,
    ChangeNotify, ClusterContext, ClusterId, ClusterPath, CmdDetails, CmdId, CmdReply,
    DeviceTypeEntry, EndpointEntry, EndptId, GlobalAttr, ListBuilder, Node, Provider,
    SemanticTag, ServerCluster, ServerClusterEntry, MAX_CLUSTER_ATTRIBUTES,
    MAX_CLUSTER_COMMANDS,
};

/// The registry of the server cluster instances of one node.
///
/// Holds non-owning references: the application owns the instances and
/// must keep them alive while registered. Registrations are kept in a
/// plain index keyed by the cluster path.
///
/// Registration/unregistration must not be interleaved with dispatch from
/// another thread; the whole data model assumes single-threaded
/// cooperative dispatch.
pub struct ClusterRegistry<'a, const N: usize> {
    node: Node<'a>,
    notify: &'a dyn ChangeNotify,
    clusters: RefCell<heapless::Vec<&'a dyn ServerCluster, N>>,
}

impl<'a, const N: usize> ClusterRegistry<'a, N> {
    /// Create a registry for the provided node topology.
    ///
    /// `notify` is the change notification sink handed to every cluster.
    pub fn new(node: Node<'a>, notify: &'a dyn ChangeNotify) -> Self {
        Self {
            node,
            notify,
            clusters: RefCell::new(heapless::Vec::new()),
        }
    }

    pub const fn node(&self) -> &Node<'a> {
        &self.node
    }

    /// The context handed to clusters on every call.
    pub fn context(&self) -> ClusterContext<'_> {
        ClusterContext {
            provider: self,
            notify: self.notify,
        }
    }

    /// Register a cluster instance and run its startup hook.
    ///
    /// Fails with `EndpointNotFound` if the cluster's endpoint is not part
    /// of the node, `Duplicate` if the path is already registered and
    /// `NoSpace` if the registry is full. If the startup hook fails the
    /// registration is rolled back.
    pub fn register(&self, cluster: &'a dyn ServerCluster) -> Result<(), Error> {
        let path = cluster.path();

        self.node.endpoint_or_err(path.endpoint_id)?;

        {
            let mut clusters = self.clusters.borrow_mut();

            if clusters.iter().any(|other| other.path() == path) {
                return Err(ErrorCode::Duplicate.into());
            }

            clusters
                .push(cluster)
                .map_err(|_| Error::new(ErrorCode::NoSpace))?;
        }

        // The startup hook runs outside the registrations borrow, as it is
        // free to query the provider surface
        if let Err(e) = cluster.startup(&self.context()) {
            warn!("{}: startup failed: {}", path, e);
            self.remove(&path);

            return Err(e);
        }

        debug!("{}: registered", path);

        Ok(())
    }

    /// Unregister the cluster mounted at `path` and run its shutdown hook.
    pub fn unregister(&self, path: &ClusterPath) -> Result<(), Error> {
        let cluster = self.remove(path).ok_or(ErrorCode::NotFound)?;

        cluster.shutdown();
        debug!("{}: unregistered", path);

        Ok(())
    }

    fn remove(&self, path: &ClusterPath) -> Option<&'a dyn ServerCluster> {
        let mut clusters = self.clusters.borrow_mut();

        let index = clusters
            .iter()
            .position(|cluster| cluster.path() == *path)?;

        Some(clusters.remove(index))
    }

    /// Return the cluster mounted at the given path, if any.
    pub fn get(&self, endpoint_id: EndptId, cluster_id: ClusterId) -> Option<&'a dyn ServerCluster> {
        self.clusters
            .borrow()
            .iter()
            .find(|cluster| {
                let path = cluster.path();

                path.endpoint_id == endpoint_id && path.cluster_id == cluster_id
            })
            .copied()
    }

    fn resolve(
        &self,
        endpoint_id: EndptId,
        cluster_id: ClusterId,
    ) -> Result<&'a dyn ServerCluster, Error> {
        self.node.endpoint_or_err(endpoint_id)?;

        self.get(endpoint_id, cluster_id)
            .ok_or_else(|| ErrorCode::ClusterNotFound.into())
    }

    /// Dispatch an attribute read.
    ///
    /// The list-shaped global attributes are synthesized here from the
    /// cluster's metadata operations; everything else, `FeatureMap` and
    /// `ClusterRevision` included, goes through the cluster's own read
    /// switch.
    pub fn read(&self, req: &AttrDetails, encoder: AttrValueEncoder<'_, '_>) -> Result<(), Error> {
        let cluster = self.resolve(req.endpoint_id, req.cluster_id)?;
        let ctx = self.context();

        let mut storage = [MaybeUninit::uninit(); MAX_CLUSTER_ATTRIBUTES];
        let mut attrs = ListBuilder::<AttributeEntry>::new(&mut storage);
        cluster.attributes(&ctx, &mut attrs)?;

        let entry = attrs
            .as_slice()
            .iter()
            .find(|entry| entry.id == req.attr_id)
            .ok_or(ErrorCode::AttributeNotFound)?;

        if !entry.is_readable() {
            return Err(ErrorCode::UnsupportedRead.into());
        }

        debug!("{}::Attr({:#06x})::Read", req.path(), req.attr_id);

        match GlobalAttr::from_repr(req.attr_id) {
            Some(GlobalAttr::AttributeList) => {
                let Some(writer) = encoder.with_dataver(cluster.dataver())? else {
                    return Ok(());
                };

                writer.set_list(|enc| {
                    for entry in attrs.as_slice() {
                        enc.item(entry.id)?;
                    }

                    Ok(())
                })
            }
            Some(GlobalAttr::AcceptedCmdList) => {
                let mut storage = [MaybeUninit::uninit(); MAX_CLUSTER_COMMANDS];
                let mut cmds = ListBuilder::<AcceptedCommandEntry>::new(&mut storage);
                cluster.accepted_commands(&ctx, &mut cmds)?;

                let Some(writer) = encoder.with_dataver(cluster.dataver())? else {
                    return Ok(());
                };

                writer.set_list(|enc| {
                    for entry in cmds.as_slice() {
                        enc.item(entry.id)?;
                    }

                    Ok(())
                })
            }
            Some(GlobalAttr::GeneratedCmdList) => {
                let mut storage = [MaybeUninit::uninit(); MAX_CLUSTER_COMMANDS];
                let mut cmds = ListBuilder::<CmdId>::new(&mut storage);
                cluster.generated_commands(&ctx, &mut cmds)?;

                let Some(writer) = encoder.with_dataver(cluster.dataver())? else {
                    return Ok(());
                };

                writer.set_list(|enc| {
                    for id in cmds.as_slice() {
                        enc.item(*id)?;
                    }

                    Ok(())
                })
            }
            _ => cluster.read(&ctx, req, encoder),
        }
    }

    /// Dispatch an attribute write.
    ///
    /// The write is rejected before reaching the cluster when the
    /// attribute is unknown, not writable, or when the request carries a
    /// dataver precondition which no longer matches.
    pub fn write(&self, req: &AttrDetails, decoder: AttrValueDecoder<'_>) -> Result<(), Error> {
        let cluster = self.resolve(req.endpoint_id, req.cluster_id)?;
        let ctx = self.context();

        let mut storage = [MaybeUninit::uninit(); MAX_CLUSTER_ATTRIBUTES];
        let mut attrs = ListBuilder::<AttributeEntry>::new(&mut storage);
        cluster.attributes(&ctx, &mut attrs)?;

        let entry = attrs
            .as_slice()
            .iter()
            .find(|entry| entry.id == req.attr_id)
            .ok_or(ErrorCode::AttributeNotFound)?;

        if !entry.is_writable() {
            return Err(ErrorCode::UnsupportedWrite.into());
        }

        if let Some(required) = req.dataver {
            if required != cluster.dataver() {
                return Err(ErrorCode::DataVersionMismatch.into());
            }
        }

        debug!("{}::Attr({:#06x})::Write", req.path(), req.attr_id);

        cluster.write(&ctx, req, decoder)
    }

    /// Dispatch a command invocation.
    pub fn invoke(
        &self,
        req: &CmdDetails,
        data: &TLVElement<'_>,
        reply: CmdReply<'_, '_>,
    ) -> Result<(), Error> {
        let cluster = self.resolve(req.endpoint_id, req.cluster_id)?;
        let ctx = self.context();

        let mut storage = [MaybeUninit::uninit(); MAX_CLUSTER_COMMANDS];
        let mut cmds = ListBuilder::<AcceptedCommandEntry>::new(&mut storage);
        cluster.accepted_commands(&ctx, &mut cmds)?;

        cmds.as_slice()
            .iter()
            .find(|entry| entry.id == req.cmd_id)
            .ok_or(ErrorCode::CommandNotFound)?;

        debug!("{}::Cmd({:#06x})::Invoke", req.path(), req.cmd_id);

        cluster.invoke(&ctx, req, data, reply)
    }
}

impl<const N: usize> Provider for ClusterRegistry<'_, N> {
    fn endpoints(&self, out: &mut ListBuilder<'_, EndpointEntry>) -> Result<(), Error> {
        for ep in self.node.endpoints {
            out.push(ep.entry)?;
        }

        Ok(())
    }

    fn device_types(
        &self,
        endpoint_id: EndptId,
        out: &mut ListBuilder<'_, DeviceTypeEntry>,
    ) -> Result<(), Error> {
        out.try_extend_from_slice(self.node.endpoint_or_err(endpoint_id)?.device_types)
    }

    fn server_clusters(
        &self,
        endpoint_id: EndptId,
        out: &mut ListBuilder<'_, ServerClusterEntry>,
    ) -> Result<(), Error> {
        self.node.endpoint_or_err(endpoint_id)?;

        for cluster in self.clusters.borrow().iter() {
            if cluster.path().endpoint_id == endpoint_id {
                out.push(ServerClusterEntry {
                    id: cluster.path().cluster_id,
                    dataver: cluster.dataver(),
                    quality: cluster.quality(),
                })?;
            }
        }

        Ok(())
    }

    fn client_clusters(
        &self,
        endpoint_id: EndptId,
        out: &mut ListBuilder<'_, ClusterId>,
    ) -> Result<(), Error> {
        out.try_extend_from_slice(self.node.endpoint_or_err(endpoint_id)?.client_clusters)
    }

    fn semantic_tags(
        &self,
        endpoint_id: EndptId,
        out: &mut ListBuilder<'_, SemanticTag>,
    ) -> Result<(), Error> {
        out.try_extend_from_slice(self.node.endpoint_or_err(endpoint_id)?.semantic_tags)
    }

    fn endpoint_unique_id(&self, endpoint_id: EndptId) -> Result<Option<&str>, Error> {
        Ok(self.node.endpoint_or_err(endpoint_id)?.unique_id)
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;
    use core::mem::MaybeUninit;

    use super::ClusterRegistry;
    use crate::dm::{
        AcceptedCommandEntry, AttrDetails, AttrListBuilder, AttrValueDecoder, AttrValueEncoder,
        AttrQuality, AttributeEntry, ClusterContext, ClusterPath, ClusterState, CmdDetails,
        CmdDataTracker, CmdQuality, CmdReply, Dataver, DeviceTypeEntry, EndpointEntry,
        EndpointMeta, GlobalAttr, ListBuilder, Node, OptionalAttributeSet, ServerCluster,
        INVALID_ENDPOINT_ID,
    };
    use crate::error::{Error, ErrorCode};
    use crate::tlv::{TLVElement, TLVTag, TLVWrite, TLVWriter};

    const CLUSTER_ID: u32 = 0xFFF1_0001;

    struct TestCluster {
        state: ClusterState,
        value: Cell<u8>,
    }

    impl TestCluster {
        const ATTRIBUTES: &'static [AttributeEntry] =
            &[AttributeEntry::rw(0, AttrQuality::empty())];
        const COMMANDS: &'static [AcceptedCommandEntry] =
            &[AcceptedCommandEntry::operate(0, CmdQuality::empty())];

        fn new(endpoint_id: u16) -> Self {
            Self {
                state: ClusterState::new(
                    ClusterPath {
                        endpoint_id,
                        cluster_id: CLUSTER_ID,
                    },
                    Dataver::new(1),
                ),
                value: Cell::new(0),
            }
        }
    }

    impl ServerCluster for TestCluster {
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
                .mandatory(Self::ATTRIBUTES)?
                .optional(&[], OptionalAttributeSet::empty())?
                .finish()
        }

        fn accepted_commands(
            &self,
            _ctx: &ClusterContext<'_>,
            builder: &mut ListBuilder<'_, AcceptedCommandEntry>,
        ) -> Result<(), Error> {
            builder.try_extend_from_slice(Self::COMMANDS)
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

            match req.attr_id {
                0 => writer.set(self.value.get()),
                x if x == GlobalAttr::FeatureMap as u32 => writer.set(0u32),
                x if x == GlobalAttr::ClusterRevision as u32 => writer.set(1u16),
                _ => Err(ErrorCode::AttributeNotFound.into()),
            }
        }

        fn write(
            &self,
            ctx: &ClusterContext<'_>,
            req: &AttrDetails,
            decoder: AttrValueDecoder<'_>,
        ) -> Result<(), Error> {
            match req.attr_id {
                0 => {
                    self.value.set(decoder.decode::<u8>()?);
                    self.state.data_changed(ctx.notify, req.attr_id);

                    Ok(())
                }
                _ => Err(ErrorCode::AttributeNotFound.into()),
            }
        }
    }

    const NODE: Node<'static> = Node::new(
        0,
        &[EndpointMeta::new(
            EndpointEntry::tree(0, INVALID_ENDPOINT_ID),
            &[DeviceTypeEntry::new(0x0016, 1)],
        )],
    );

    #[test]
    fn test_lifecycle() {
        let cluster = TestCluster::new(0);
        let registry = ClusterRegistry::<4>::new(NODE, &());

        registry.register(&cluster).unwrap();
        assert_eq!(
            registry.register(&cluster).unwrap_err().code(),
            ErrorCode::Duplicate
        );

        registry.unregister(&cluster.path()).unwrap();
        assert_eq!(
            registry.unregister(&cluster.path()).unwrap_err().code(),
            ErrorCode::NotFound
        );

        // Re-registration works after shutdown
        registry.register(&cluster).unwrap();
    }

    #[test]
    fn test_register_unknown_endpoint() {
        let cluster = TestCluster::new(7);
        let registry = ClusterRegistry::<4>::new(NODE, &());

        assert_eq!(
            registry.register(&cluster).unwrap_err().code(),
            ErrorCode::EndpointNotFound
        );
    }

    #[test]
    fn test_dispatch_errors() {
        let cluster = TestCluster::new(0);
        let registry = ClusterRegistry::<4>::new(NODE, &());
        registry.register(&cluster).unwrap();

        let mut buf = [0; 64];

        // Unknown endpoint
        let mut tw = TLVWriter::new(&mut buf);
        let req = AttrDetails::new(9, CLUSTER_ID, 0);
        let err = registry
            .read(&req, AttrValueEncoder::new(&req, &mut tw))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::EndpointNotFound);

        // Unknown cluster
        let mut tw = TLVWriter::new(&mut buf);
        let req = AttrDetails::new(0, 0xFFF1_0099, 0);
        let err = registry
            .read(&req, AttrValueEncoder::new(&req, &mut tw))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ClusterNotFound);

        // Unknown attribute
        let mut tw = TLVWriter::new(&mut buf);
        let req = AttrDetails::new(0, CLUSTER_ID, 99);
        let err = registry
            .read(&req, AttrValueEncoder::new(&req, &mut tw))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AttributeNotFound);

        // Write to a read-only (global) attribute
        let mut tw = TLVWriter::new(&mut buf);
        tw.u8(&TLVTag::Anonymous, 1).unwrap();
        let data = TLVElement::new(tw.as_slice()).unwrap();
        let req = AttrDetails::new(0, CLUSTER_ID, GlobalAttr::AttributeList as u32);
        let err = registry
            .write(&req, AttrValueDecoder::new(data))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedWrite);
    }

    #[test]
    fn test_write_and_dataver_precondition() {
        let cluster = TestCluster::new(0);
        let registry = ClusterRegistry::<4>::new(NODE, &());
        registry.register(&cluster).unwrap();

        let mut data_buf = [0; 8];
        let mut tw = TLVWriter::new(&mut data_buf);
        tw.u8(&TLVTag::Anonymous, 42).unwrap();
        let data = TLVElement::new(tw.as_slice()).unwrap();

        // Mismatching precondition
        let req = AttrDetails::new(0, CLUSTER_ID, 0).with_dataver(cluster.dataver() + 1);
        let err = registry
            .write(&req, AttrValueDecoder::new(data.clone()))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DataVersionMismatch);
        assert_eq!(cluster.value.get(), 0);

        // Matching precondition commits and bumps the dataver
        let dataver = cluster.dataver();
        let req = AttrDetails::new(0, CLUSTER_ID, 0).with_dataver(dataver);
        registry.write(&req, AttrValueDecoder::new(data)).unwrap();
        assert_eq!(cluster.value.get(), 42);
        assert_eq!(cluster.dataver(), dataver + 1);
    }

    #[test]
    fn test_global_attribute_synthesis() {
        let cluster = TestCluster::new(0);
        let registry = ClusterRegistry::<4>::new(NODE, &());
        registry.register(&cluster).unwrap();

        let mut buf = [0; 128];
        let mut tw = TLVWriter::new(&mut buf);
        let req = AttrDetails::new(0, CLUSTER_ID, GlobalAttr::AttributeList as u32);
        registry
            .read(&req, AttrValueEncoder::new(&req, &mut tw))
            .unwrap();

        let root = TLVElement::new(tw.as_slice()).unwrap();
        let ids = root
            .array()
            .unwrap()
            .map(|e| e.unwrap().u32().unwrap())
            .collect::<heapless::Vec<_, 8>>();

        assert_eq!(
            ids.as_slice(),
            &[0, 0xFFF8, 0xFFF9, 0xFFFB, 0xFFFC, 0xFFFD]
        );
    }

    #[test]
    fn test_invoke_unknown_command() {
        let cluster = TestCluster::new(0);
        let registry = ClusterRegistry::<4>::new(NODE, &());
        registry.register(&cluster).unwrap();

        let mut data_buf = [0; 8];
        let mut tw = TLVWriter::new(&mut data_buf);
        tw.start_struct(&TLVTag::Anonymous).unwrap();
        tw.end_container().unwrap();
        let data = TLVElement::new(tw.as_slice()).unwrap();

        let mut out = [0; 32];
        let mut tw = TLVWriter::new(&mut out);
        let mut tracker = CmdDataTracker::new();

        let req = CmdDetails::new(0, CLUSTER_ID, 0x55);
        let err = registry
            .invoke(&req, &data, CmdReply::new(&mut tracker, &mut tw))
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::CommandNotFound);
    }

    #[test]
    fn test_provider_surface() {
        let cluster = TestCluster::new(0);
        let registry = ClusterRegistry::<4>::new(NODE, &());
        registry.register(&cluster).unwrap();

        use crate::dm::Provider;

        let mut storage = [MaybeUninit::uninit(); 4];
        let mut out = ListBuilder::new(&mut storage);
        registry.server_clusters(0, &mut out).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out.as_slice()[0].id, CLUSTER_ID);
        assert_eq!(out.as_slice()[0].dataver, cluster.dataver());

        assert_eq!(
            registry
                .endpoint_unique_id(3)
                .unwrap_err()
                .code(),
            ErrorCode::EndpointNotFound
        );
    }
}
