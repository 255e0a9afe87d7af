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

//! The server-cluster dispatch and attribute/command data-model engine of a
//! Matter node.
//!
//! This crate models the part of a Matter device that sits between the
//! Interaction Model transport (external) and the concrete cluster business
//! logic (external): compact attribute/command metadata, the polymorphic
//! [`dm::ServerCluster`] contract every cluster implements, the attribute
//! value codec boundary, the endpoint topology [`dm::Provider`] surface and
//! the endpoint+cluster keyed [`dm::ClusterRegistry`] that dispatches
//! read/write/invoke operations.
//!
//! The crate is `no_std` by default; enable the `std` feature for
//! `std::error::Error` integration.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod dm;
pub mod error;
pub mod im;
pub mod tlv;
pub mod utils;
