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

pub use attribute::*;
pub use builder::*;
pub use cluster::*;
pub use command::*;
pub use dataver::*;
pub use endpoint::*;
pub use encoder::*;
pub use privilege::*;
pub use provider::*;

mod attribute;
mod builder;
mod cluster;
mod command;
mod dataver;
mod encoder;
mod endpoint;
mod privilege;
mod provider;

/// A type alias for endpoint IDs.
pub type EndptId = u16;
/// A type alias for cluster IDs.
pub type ClusterId = u32;
/// A type alias for attribute IDs.
pub type AttrId = u32;
/// A type alias for command IDs.
pub type CmdId = u32;
/// A type alias for device type IDs.
pub type DeviceTypeId = u32;
