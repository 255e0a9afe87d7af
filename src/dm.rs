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

//! The data model: metadata types, the server-cluster contract, the
//! endpoint topology provider and the cluster registry which dispatches
//! attribute reads/writes and command invocations.

pub use types::*;

pub mod clusters;
pub mod registry;

mod types;

/// The ID of the root endpoint (Endpoint 0)
pub const ROOT_ENDPOINT_ID: EndptId = 0;

/// The largest attribute count a single cluster may expose, global
/// attributes included. Dispatch-time metadata queries materialize into
/// stack buffers of this size.
pub const MAX_CLUSTER_ATTRIBUTES: usize = 64;

/// The largest accepted/generated command count a single cluster may expose.
pub const MAX_CLUSTER_COMMANDS: usize = 32;

/// The largest endpoint count a node may be composed of.
pub const MAX_ENDPOINTS: usize = 32;

/// The largest server cluster count a single endpoint may carry.
pub const MAX_ENDPOINT_CLUSTERS: usize = 32;
