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

use crate::error::{Error, ErrorCode};

use super::{
    ClusterId, DeviceTypeEntry, EndpointEntry, EndptId, ListBuilder, SemanticTag,
    ServerClusterEntry,
};

/// The endpoint/device-type/cluster topology query surface clusters
/// consult to resolve endpoint composition.
///
/// Every list query materializes its complete result into the provided
/// builder before returning; results are never streamed. Queries against
/// an unknown endpoint fail with `EndpointNotFound`.
pub trait Provider {
    fn endpoints(&self, out: &mut ListBuilder<'_, EndpointEntry>) -> Result<(), Error>;

    fn device_types(
        &self,
        endpoint_id: EndptId,
        out: &mut ListBuilder<'_, DeviceTypeEntry>,
    ) -> Result<(), Error>;

    fn server_clusters(
        &self,
        endpoint_id: EndptId,
        out: &mut ListBuilder<'_, ServerClusterEntry>,
    ) -> Result<(), Error>;

    fn client_clusters(
        &self,
        endpoint_id: EndptId,
        out: &mut ListBuilder<'_, ClusterId>,
    ) -> Result<(), Error>;

    fn semantic_tags(
        &self,
        endpoint_id: EndptId,
        out: &mut ListBuilder<'_, SemanticTag>,
    ) -> Result<(), Error>;

    fn endpoint_unique_id(&self, endpoint_id: EndptId) -> Result<Option<&str>, Error>;
}

impl<T> Provider for &T
where
    T: Provider,
{
    fn endpoints(&self, out: &mut ListBuilder<'_, EndpointEntry>) -> Result<(), Error> {
        (**self).endpoints(out)
    }

    fn device_types(
        &self,
        endpoint_id: EndptId,
        out: &mut ListBuilder<'_, DeviceTypeEntry>,
    ) -> Result<(), Error> {
        (**self).device_types(endpoint_id, out)
    }

    fn server_clusters(
        &self,
        endpoint_id: EndptId,
        out: &mut ListBuilder<'_, ServerClusterEntry>,
    ) -> Result<(), Error> {
        (**self).server_clusters(endpoint_id, out)
    }

    fn client_clusters(
        &self,
        endpoint_id: EndptId,
        out: &mut ListBuilder<'_, ClusterId>,
    ) -> Result<(), Error> {
        (**self).client_clusters(endpoint_id, out)
    }

    fn semantic_tags(
        &self,
        endpoint_id: EndptId,
        out: &mut ListBuilder<'_, SemanticTag>,
    ) -> Result<(), Error> {
        (**self).semantic_tags(endpoint_id, out)
    }

    fn endpoint_unique_id(&self, endpoint_id: EndptId) -> Result<Option<&str>, Error> {
        (**self).endpoint_unique_id(endpoint_id)
    }
}

/// The static topology metadata of one endpoint.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EndpointMeta<'a> {
    pub entry: EndpointEntry,
    pub device_types: &'a [DeviceTypeEntry],
    pub client_clusters: &'a [ClusterId],
    pub semantic_tags: &'a [SemanticTag],
    pub unique_id: Option<&'a str>,
}

impl<'a> EndpointMeta<'a> {
    pub const fn new(entry: EndpointEntry, device_types: &'a [DeviceTypeEntry]) -> Self {
        Self {
            entry,
            device_types,
            client_clusters: &[],
            semantic_tags: &[],
            unique_id: None,
        }
    }

    pub const fn with_client_clusters(self, client_clusters: &'a [ClusterId]) -> Self {
        Self {
            client_clusters,
            ..self
        }
    }

    pub const fn with_semantic_tags(self, semantic_tags: &'a [SemanticTag]) -> Self {
        Self {
            semantic_tags,
            ..self
        }
    }

    pub const fn with_unique_id(self, unique_id: &'a str) -> Self {
        Self {
            unique_id: Some(unique_id),
            ..self
        }
    }
}

/// The static topology metadata of a whole node: the endpoints it is
/// composed of, in a const-friendly shape an application assembles once.
///
/// Does not know about live cluster instances; the registry combines a
/// `Node` with its registrations into the full [`Provider`] surface.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Node<'a> {
    pub id: u16,
    pub endpoints: &'a [EndpointMeta<'a>],
}

impl<'a> Node<'a> {
    pub const fn new(id: u16, endpoints: &'a [EndpointMeta<'a>]) -> Self {
        Self { id, endpoints }
    }

    /// Return the endpoint with the given ID, if it exists.
    pub fn endpoint(&self, id: EndptId) -> Option<&EndpointMeta<'a>> {
        self.endpoints.iter().find(|ep| ep.entry.id == id)
    }

    pub(crate) fn endpoint_or_err(&self, id: EndptId) -> Result<&EndpointMeta<'a>, Error> {
        self.endpoint(id)
            .ok_or_else(|| ErrorCode::EndpointNotFound.into())
    }
}
