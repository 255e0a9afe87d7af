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

//! Concrete server cluster implementations.
//!
//! `desc` is required on every endpoint; the others are representative of
//! the two remaining shapes a cluster can take: a stateful cluster with
//! validated setters (`meter_id`) and a metadata-complete placeholder
//! whose logic is not present yet (`groupcast`).

pub mod desc;
pub mod groupcast;
pub mod meter_id;
