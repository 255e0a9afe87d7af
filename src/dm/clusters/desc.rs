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

//! The Descriptor cluster: exposes the composition of an endpoint,
//! i.e. its device types, server/client clusters, the endpoints beneath
//! it and its semantic tags.

use core::mem::MaybeUninit;

use strum::FromRepr;

use crate::attribute_enum;
use crate::dm::{
    AttrDetails, AttrListBuilder, AttrQuality, AttrValueEncoder, AttrValueWriter, AttributeEntry,
    AcceptedCommandEntry, ClusterContext, ClusterPath, ClusterState, CompositionPattern, Dataver,
    EndpointEntry, EndptId, ListBuilder, OptionalAttributeSet, Provider, ServerCluster,
    MAX_ENDPOINTS, ROOT_ENDPOINT_ID,
};
use crate::error::{Error, ErrorCode};

pub const ID: u32 = 0x001D;

pub const CLUSTER_REVISION: u16 = 3;

/// The `TagList` feature: set when the endpoint carries semantic tags.
pub const FEATURE_TAG_LIST: u32 = 0x01;

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum AttributeId {
    DeviceTypeList = 0x0000,
    ServerList = 0x0001,
    ClientList = 0x0002,
    PartsList = 0x0003,
    TagList = 0x0004,
    EndpointUniqueID = 0x0005,
}

attribute_enum!(AttributeId);

const MANDATORY_ATTRIBUTES: &[AttributeEntry] = &[
    AttributeEntry::rv(AttributeId::DeviceTypeList as _, AttrQuality::LIST),
    AttributeEntry::rv(AttributeId::ServerList as _, AttrQuality::LIST),
    AttributeEntry::rv(AttributeId::ClientList as _, AttrQuality::LIST),
    AttributeEntry::rv(AttributeId::PartsList as _, AttrQuality::LIST),
];

// Candidate order is the bit order of the enabled-optionals mask
const OPTIONAL_ATTRIBUTES: &[AttributeEntry] = &[
    AttributeEntry::rv(AttributeId::TagList as _, AttrQuality::LIST),
    AttributeEntry::rv(AttributeId::EndpointUniqueID as _, AttrQuality::empty()),
];

const TAG_LIST_IDX: usize = 0;
const ENDPOINT_UNIQUE_ID_IDX: usize = 1;

// Semantic tag lists are tiny; this bounds the read-time materialization
const MAX_TAGS: usize = 8;

/// The Descriptor cluster of one endpoint.
///
/// Everything this cluster serves is derived from the provider at read
/// time. Which optional attributes exist and which feature bits are set
/// can legitimately differ endpoint-to-endpoint and change at runtime, so
/// nothing is cached here.
pub struct DescCluster {
    state: ClusterState,
}

impl DescCluster {
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

    fn enabled_optionals(
        &self,
        provider: &dyn Provider,
    ) -> Result<OptionalAttributeSet, Error> {
        let endpoint_id = self.state.path().endpoint_id;
        let mut enabled = OptionalAttributeSet::empty();

        if self.has_tags(provider)? {
            enabled = enabled.enable(TAG_LIST_IDX);
        }

        if provider.endpoint_unique_id(endpoint_id)?.is_some() {
            enabled = enabled.enable(ENDPOINT_UNIQUE_ID_IDX);
        }

        Ok(enabled)
    }

    fn has_tags(&self, provider: &dyn Provider) -> Result<bool, Error> {
        let mut storage = [MaybeUninit::uninit(); MAX_TAGS];
        let mut tags = ListBuilder::new(&mut storage);
        provider.semantic_tags(self.state.path().endpoint_id, &mut tags)?;

        Ok(!tags.is_empty())
    }

    fn encode_device_types(
        &self,
        provider: &dyn Provider,
        writer: AttrValueWriter<'_, '_>,
    ) -> Result<(), Error> {
        let mut storage = [MaybeUninit::uninit(); 8];
        let mut device_types = ListBuilder::new(&mut storage);
        provider.device_types(self.state.path().endpoint_id, &mut device_types)?;

        writer.set_list(|enc| {
            for device_type in device_types.as_slice() {
                enc.item(device_type)?;
            }

            Ok(())
        })
    }

    fn encode_server_list(
        &self,
        provider: &dyn Provider,
        writer: AttrValueWriter<'_, '_>,
    ) -> Result<(), Error> {
        let mut storage = [MaybeUninit::uninit(); crate::dm::MAX_ENDPOINT_CLUSTERS];
        let mut clusters = ListBuilder::new(&mut storage);
        provider.server_clusters(self.state.path().endpoint_id, &mut clusters)?;

        writer.set_list(|enc| {
            for cluster in clusters.as_slice() {
                enc.item(cluster.id)?;
            }

            Ok(())
        })
    }

    fn encode_client_list(
        &self,
        provider: &dyn Provider,
        writer: AttrValueWriter<'_, '_>,
    ) -> Result<(), Error> {
        let mut storage = [MaybeUninit::uninit(); crate::dm::MAX_ENDPOINT_CLUSTERS];
        let mut clusters = ListBuilder::new(&mut storage);
        provider.client_clusters(self.state.path().endpoint_id, &mut clusters)?;

        writer.set_list(|enc| {
            for id in clusters.as_slice() {
                enc.item(*id)?;
            }

            Ok(())
        })
    }

    /// Encode the endpoints belonging to this endpoint's parts list.
    ///
    /// - For the root endpoint: every endpoint except the root itself.
    /// - For a `Tree` endpoint: its direct children only.
    /// - For a `FullFamily` endpoint: every transitive descendant, found
    ///   by walking each candidate's parent chain upward.
    ///
    /// The ancestor walk is O(endpoints * depth) per read; endpoint trees
    /// are shallow and small, so no ancestor index is maintained.
    fn encode_parts_list(
        &self,
        provider: &dyn Provider,
        writer: AttrValueWriter<'_, '_>,
    ) -> Result<(), Error> {
        let mut storage = [MaybeUninit::uninit(); MAX_ENDPOINTS];
        let mut endpoints = ListBuilder::new(&mut storage);
        provider.endpoints(&mut endpoints)?;
        let endpoints = endpoints.into_slice();

        let endpoint_id = self.state.path().endpoint_id;

        if endpoint_id == ROOT_ENDPOINT_ID {
            return writer.set_list(|enc| {
                for ep in endpoints {
                    if ep.id != ROOT_ENDPOINT_ID {
                        enc.item(ep.id)?;
                    }
                }

                Ok(())
            });
        }

        let entry = endpoints
            .iter()
            .find(|ep| ep.id == endpoint_id)
            .ok_or(ErrorCode::NotFound)?;

        match entry.composition {
            CompositionPattern::Tree => writer.set_list(|enc| {
                for ep in endpoints {
                    if ep.parent_id == endpoint_id {
                        enc.item(ep.id)?;
                    }
                }

                Ok(())
            }),
            CompositionPattern::FullFamily => writer.set_list(|enc| {
                for ep in endpoints {
                    if ep.id != endpoint_id && is_descendant(endpoints, ep, endpoint_id) {
                        enc.item(ep.id)?;
                    }
                }

                Ok(())
            }),
        }
    }

    fn encode_tag_list(
        &self,
        provider: &dyn Provider,
        writer: AttrValueWriter<'_, '_>,
    ) -> Result<(), Error> {
        let mut storage = [MaybeUninit::uninit(); MAX_TAGS];
        let mut tags = ListBuilder::new(&mut storage);
        provider.semantic_tags(self.state.path().endpoint_id, &mut tags)?;

        if tags.is_empty() {
            return Err(ErrorCode::AttributeNotFound.into());
        }

        writer.set_list(|enc| {
            for tag in tags.as_slice() {
                enc.item(tag)?;
            }

            Ok(())
        })
    }

    fn feature_map(&self, provider: &dyn Provider) -> Result<u32, Error> {
        // Derived on every read; a cached copy would go stale when tags
        // appear or disappear at runtime
        Ok(if self.has_tags(provider)? {
            FEATURE_TAG_LIST
        } else {
            0
        })
    }
}

/// Walk `candidate`'s parent chain upward: a candidate belongs to the
/// family of `ancestor` if the chain passes through it before reaching
/// the invalid sentinel. A parent that cannot be resolved (or a cycle)
/// excludes the candidate.
fn is_descendant(
    endpoints: &[EndpointEntry],
    candidate: &EndpointEntry,
    ancestor: EndptId,
) -> bool {
    let mut current = candidate;

    for _ in 0..endpoints.len() {
        let Some(parent) = current.parent() else {
            return false;
        };

        if parent == ancestor {
            return true;
        }

        match endpoints.iter().find(|ep| ep.id == parent) {
            Some(next) => current = next,
            None => return false,
        }
    }

    false
}

impl ServerCluster for DescCluster {
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
        ctx: &ClusterContext<'_>,
        builder: &mut ListBuilder<'_, AttributeEntry>,
    ) -> Result<(), Error> {
        AttrListBuilder::new(builder)
            .mandatory(MANDATORY_ATTRIBUTES)?
            .optional(OPTIONAL_ATTRIBUTES, self.enabled_optionals(ctx.provider)?)?
            .finish()
    }

    fn accepted_commands(
        &self,
        _ctx: &ClusterContext<'_>,
        _builder: &mut ListBuilder<'_, AcceptedCommandEntry>,
    ) -> Result<(), Error> {
        // The Descriptor cluster has no commands
        Ok(())
    }

    fn read(
        &self,
        ctx: &ClusterContext<'_>,
        req: &AttrDetails,
        encoder: AttrValueEncoder<'_, '_>,
    ) -> Result<(), Error> {
        let Some(writer) = encoder.with_dataver(self.dataver())? else {
            return Ok(());
        };

        if req.attr_id == crate::dm::GlobalAttr::FeatureMap as u32 {
            return writer.set(self.feature_map(ctx.provider)?);
        }

        if req.attr_id == crate::dm::GlobalAttr::ClusterRevision as u32 {
            return writer.set(CLUSTER_REVISION);
        }

        match req.attr_id.try_into()? {
            AttributeId::DeviceTypeList => self.encode_device_types(ctx.provider, writer),
            AttributeId::ServerList => self.encode_server_list(ctx.provider, writer),
            AttributeId::ClientList => self.encode_client_list(ctx.provider, writer),
            AttributeId::PartsList => self.encode_parts_list(ctx.provider, writer),
            AttributeId::TagList => self.encode_tag_list(ctx.provider, writer),
            AttributeId::EndpointUniqueID => {
                let unique_id = ctx
                    .provider
                    .endpoint_unique_id(self.state.path().endpoint_id)?
                    .ok_or(ErrorCode::AttributeNotFound)?;

                writer.set(unique_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use core::mem::MaybeUninit;

    use super::{AttributeId, DescCluster, FEATURE_TAG_LIST, ID};
    use crate::dm::{
        AttrDetails, AttrValueEncoder, ClusterContext, ClusterId, CompositionPattern, Dataver,
        DeviceTypeEntry, EndpointEntry, EndptId, GlobalAttr, ListBuilder, Provider, SemanticTag,
        ServerCluster, ServerClusterEntry, INVALID_ENDPOINT_ID,
    };
    use crate::error::{Error, ErrorCode};
    use crate::tlv::{TLVElement, TLVWriter};

    struct TestProvider {
        endpoints: &'static [EndpointEntry],
        tags: &'static [SemanticTag],
    }

    impl TestProvider {
        const fn new(endpoints: &'static [EndpointEntry]) -> Self {
            Self {
                endpoints,
                tags: &[],
            }
        }

        fn endpoint(&self, endpoint_id: EndptId) -> Result<&EndpointEntry, Error> {
            self.endpoints
                .iter()
                .find(|ep| ep.id == endpoint_id)
                .ok_or_else(|| ErrorCode::EndpointNotFound.into())
        }
    }

    impl Provider for TestProvider {
        fn endpoints(&self, out: &mut ListBuilder<'_, EndpointEntry>) -> Result<(), Error> {
            out.try_extend_from_slice(self.endpoints)
        }

        fn device_types(
            &self,
            endpoint_id: EndptId,
            out: &mut ListBuilder<'_, DeviceTypeEntry>,
        ) -> Result<(), Error> {
            self.endpoint(endpoint_id)?;
            out.push(DeviceTypeEntry::new(0x0100, 2))
        }

        fn server_clusters(
            &self,
            endpoint_id: EndptId,
            out: &mut ListBuilder<'_, ServerClusterEntry>,
        ) -> Result<(), Error> {
            self.endpoint(endpoint_id)?;
            out.push(ServerClusterEntry {
                id: ID,
                dataver: 0,
                quality: Default::default(),
            })
        }

        fn client_clusters(
            &self,
            endpoint_id: EndptId,
            out: &mut ListBuilder<'_, ClusterId>,
        ) -> Result<(), Error> {
            self.endpoint(endpoint_id)?;
            let _ = out;

            Ok(())
        }

        fn semantic_tags(
            &self,
            endpoint_id: EndptId,
            out: &mut ListBuilder<'_, SemanticTag>,
        ) -> Result<(), Error> {
            self.endpoint(endpoint_id)?;
            out.try_extend_from_slice(self.tags)
        }

        fn endpoint_unique_id(&self, endpoint_id: EndptId) -> Result<Option<&str>, Error> {
            self.endpoint(endpoint_id)?;

            Ok(None)
        }
    }

    fn read_id_list(cluster: &DescCluster, provider: &TestProvider, attr: u32) -> Result<heapless::Vec<u16, 8>, Error> {
        let ctx = ClusterContext {
            provider,
            notify: &(),
        };

        let mut buf = [0; 128];
        let mut tw = TLVWriter::new(&mut buf);
        let req = AttrDetails::new(cluster.path().endpoint_id, ID, attr);

        cluster.read(&ctx, &req, AttrValueEncoder::new(&req, &mut tw))?;

        let root = TLVElement::new(tw.as_slice()).unwrap();
        Ok(root
            .array()
            .unwrap()
            .map(|e| e.unwrap().u16().unwrap())
            .collect())
    }

    const TREE: &[EndpointEntry] = &[
        EndpointEntry::tree(0, INVALID_ENDPOINT_ID),
        EndpointEntry::tree(1, 0),
        EndpointEntry::tree(2, 1),
        EndpointEntry::tree(3, 1),
    ];

    #[test]
    fn test_parts_list_tree() {
        let provider = TestProvider::new(TREE);

        // Direct children only
        let cluster = DescCluster::new(1, Dataver::new(0));
        let parts = read_id_list(&cluster, &provider, AttributeId::PartsList as u32).unwrap();
        assert_eq!(parts.as_slice(), &[2, 3]);

        // The root lists everything except itself
        let cluster = DescCluster::new(0, Dataver::new(0));
        let parts = read_id_list(&cluster, &provider, AttributeId::PartsList as u32).unwrap();
        assert_eq!(parts.as_slice(), &[1, 2, 3]);

        // A leaf has no parts
        let cluster = DescCluster::new(3, Dataver::new(0));
        let parts = read_id_list(&cluster, &provider, AttributeId::PartsList as u32).unwrap();
        assert!(parts.is_empty());
    }

    const FAMILY: &[EndpointEntry] = &[
        EndpointEntry::tree(0, INVALID_ENDPOINT_ID),
        EndpointEntry::new(1, 0, CompositionPattern::FullFamily),
        EndpointEntry::tree(2, 1),
        EndpointEntry::tree(3, 1),
        EndpointEntry::tree(4, 2),
        // Unresolvable parent: never part of anyone's family
        EndpointEntry::tree(5, 77),
    ];

    #[test]
    fn test_parts_list_full_family() {
        let provider = TestProvider::new(FAMILY);

        let cluster = DescCluster::new(1, Dataver::new(0));
        let parts = read_id_list(&cluster, &provider, AttributeId::PartsList as u32).unwrap();
        assert_eq!(parts.as_slice(), &[2, 3, 4]);
    }

    #[test]
    fn test_parts_list_unknown_endpoint() {
        let provider = TestProvider::new(TREE);

        let cluster = DescCluster::new(9, Dataver::new(0));
        let ctx = ClusterContext {
            provider: &provider,
            notify: &(),
        };

        let mut buf = [0; 64];
        let mut tw = TLVWriter::new(&mut buf);
        let req = AttrDetails::new(9, ID, AttributeId::PartsList as u32);

        let err = cluster
            .read(&ctx, &req, AttrValueEncoder::new(&req, &mut tw))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        // Nothing was left behind in the output
        assert_eq!(tw.as_slice(), &[]);
    }

    #[test]
    fn test_feature_map_derived_from_tags() {
        static TAGS: [SemanticTag; 1] = [SemanticTag::new(7, 1)];
        let plain = TestProvider::new(TREE);
        let tagged = TestProvider {
            endpoints: TREE,
            tags: &TAGS,
        };

        let cluster = DescCluster::new(1, Dataver::new(0));

        let features =
            read_scalar(&cluster, &plain, GlobalAttr::FeatureMap as u32).unwrap();
        assert_eq!(features, 0);

        let features =
            read_scalar(&cluster, &tagged, GlobalAttr::FeatureMap as u32).unwrap();
        assert_eq!(features, FEATURE_TAG_LIST);
    }

    #[test]
    fn test_optional_attributes_follow_tags() {
        use crate::dm::AttributeEntry;

        static TAGS: [SemanticTag; 1] = [SemanticTag::new(7, 1)];
        let tagged = TestProvider {
            endpoints: TREE,
            tags: &TAGS,
        };
        let plain = TestProvider::new(TREE);

        let cluster = DescCluster::new(1, Dataver::new(0));

        let has_tag_list = |provider: &TestProvider| {
            let ctx = ClusterContext {
                provider,
                notify: &(),
            };

            let mut storage = [MaybeUninit::uninit(); 16];
            let mut attrs = ListBuilder::<AttributeEntry>::new(&mut storage);
            cluster.attributes(&ctx, &mut attrs).unwrap();

            attrs
                .as_slice()
                .iter()
                .any(|entry| entry.id == AttributeId::TagList as u32)
        };

        assert!(!has_tag_list(&plain));
        assert!(has_tag_list(&tagged));
    }

    fn read_scalar(
        cluster: &DescCluster,
        provider: &TestProvider,
        attr: u32,
    ) -> Result<u32, Error> {
        let ctx = ClusterContext {
            provider,
            notify: &(),
        };

        let mut buf = [0; 64];
        let mut tw = TLVWriter::new(&mut buf);
        let req = AttrDetails::new(cluster.path().endpoint_id, ID, attr);

        cluster.read(&ctx, &req, AttrValueEncoder::new(&req, &mut tw))?;

        TLVElement::new(tw.as_slice()).unwrap().u32()
    }
}
