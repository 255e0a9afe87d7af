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

//! The Interaction Model facing types: the wire-level status codes that
//! every attribute/command operation ultimately resolves to, and the
//! mapping from the crate-internal [`Error`] taxonomy onto them.
//!
//! The Interaction Model transport itself (TLV message framing, exchanges,
//! sessions) is an external collaborator; this module only describes the
//! status contract it consumes.

use num_derive::FromPrimitive;

use crate::error::{Error, ErrorCode};

/// An enumeration of all possible status codes that can be returned to the
/// remote peer by the Interaction Model.
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum IMStatusCode {
    Success = 0,
    Failure = 1,
    InvalidSubscription = 0x7D,
    UnsupportedAccess = 0x7E,
    UnsupportedEndpoint = 0x7F,
    InvalidAction = 0x80,
    UnsupportedCommand = 0x81,
    InvalidCommand = 0x85,
    UnsupportedAttribute = 0x86,
    ConstraintError = 0x87,
    UnsupportedWrite = 0x88,
    ResourceExhausted = 0x89,
    NotFound = 0x8B,
    UnreportableAttribute = 0x8C,
    InvalidDataType = 0x8D,
    UnsupportedRead = 0x8F,
    DataVersionMismatch = 0x92,
    Timeout = 0x94,
    Busy = 0x9C,
    UnsupportedCluster = 0xC3,
    NoUpstreamSubscription = 0xC5,
    NeedsTimedInteraction = 0xC6,
    UnsupportedEvent = 0xC7,
    PathsExhausted = 0xC8,
    TimedRequestMisMatch = 0xC9,
    FailSafeRequired = 0xCA,
}

impl From<&Error> for IMStatusCode {
    fn from(e: &Error) -> Self {
        match e.code() {
            ErrorCode::EndpointNotFound => IMStatusCode::UnsupportedEndpoint,
            ErrorCode::ClusterNotFound => IMStatusCode::UnsupportedCluster,
            ErrorCode::AttributeNotFound => IMStatusCode::UnsupportedAttribute,
            ErrorCode::CommandNotFound => IMStatusCode::UnsupportedCommand,
            ErrorCode::UnsupportedRead => IMStatusCode::UnsupportedRead,
            ErrorCode::UnsupportedWrite => IMStatusCode::UnsupportedWrite,
            ErrorCode::UnsupportedAccess => IMStatusCode::UnsupportedAccess,
            ErrorCode::DataVersionMismatch => IMStatusCode::DataVersionMismatch,
            ErrorCode::ConstraintError | ErrorCode::BufferTooSmall => IMStatusCode::ConstraintError,
            ErrorCode::InvalidArgument => IMStatusCode::ConstraintError,
            ErrorCode::InvalidDataType => IMStatusCode::InvalidDataType,
            ErrorCode::InvalidAction => IMStatusCode::InvalidAction,
            ErrorCode::NotFound => IMStatusCode::NotFound,
            ErrorCode::NoSpace | ErrorCode::NoMemory => IMStatusCode::ResourceExhausted,
            ErrorCode::TLVNotFound | ErrorCode::TLVTypeMismatch | ErrorCode::InvalidData => {
                IMStatusCode::InvalidDataType
            }
            // `NotImplemented` intentionally lands on `Failure`: the id was
            // recognized but the logic is absent, which is a different
            // diagnostic from the `Unsupported*` family.
            _ => IMStatusCode::Failure,
        }
    }
}

impl From<Error> for IMStatusCode {
    fn from(e: Error) -> Self {
        (&e).into()
    }
}

/// An IM status structure that contains an `IMStatusCode` and an optional
/// cluster-specific status code.
///
/// Corresponds to the `StatusIB` block in the Matter Interaction Model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    /// The status code of the IM operation.
    pub status: IMStatusCode,
    /// An optional cluster status code, which is used for cluster-specific
    /// status codes.
    pub cluster_status: Option<u16>,
}

impl Status {
    pub const SUCCESS: Status = Status::new(IMStatusCode::Success, None);

    /// Create a new `Status` instance with the given `IMStatusCode` and an
    /// optional cluster status code.
    pub const fn new(status: IMStatusCode, cluster_status: Option<u16>) -> Status {
        Status {
            status,
            cluster_status,
        }
    }
}

impl From<Result<(), Error>> for Status {
    fn from(result: Result<(), Error>) -> Self {
        match result {
            Ok(()) => Status::SUCCESS,
            Err(e) => Status::new((&e).into(), None),
        }
    }
}
