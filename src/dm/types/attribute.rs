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
#![allow(clippy::bad_bit_mask)]

use core::fmt;

use strum::FromRepr;

use crate::utils::bitflags::bitflags;

use super::{AttrId, ClusterId, EndptId, Privilege, PRIVILEGE_BITS};

bitflags! {
    /// Quality flags describing special read/write behavior of an attribute.
    #[repr(transparent)]
    #[derive(Default)]
    #[cfg_attr(not(feature = "defmt"), derive(Debug, Copy, Clone, Eq, PartialEq, Hash))]
    pub struct AttrQuality: u8 {
        /// The attribute value is list-typed
        const LIST = 0x01;
        /// The attribute data is scoped to the accessing fabric
        const FABRIC_SCOPED = 0x02;
        /// The attribute data must not be served to other fabrics
        const FABRIC_SENSITIVE = 0x04;
        /// Value changes are not reported through subscriptions
        const CHANGES_OMITTED = 0x08;
        /// Writes require a timed interaction
        const TIMED_WRITE = 0x10;
    }
}

/// The bit width of the packed attribute quality field.
pub const ATTR_QUALITY_BITS: u32 = 5;

const _: () = assert!((AttrQuality::all().bits() as u32) < (1 << ATTR_QUALITY_BITS));

/// Compact metadata for a single attribute of a cluster: its ID, quality
/// flags and the privileges required to read/write it, packed so that a
/// generated metadata table stays cheap enough to live in flash.
///
/// The packed layout is `[0..5) quality | [5..8) read privilege |
/// [8..11) write privilege`, with `0` in a privilege field meaning the
/// operation is not available for this attribute at all.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttributeEntry {
    pub id: AttrId,
    mask: u16,
}

const READ_SHIFT: u32 = ATTR_QUALITY_BITS;
const WRITE_SHIFT: u32 = ATTR_QUALITY_BITS + PRIVILEGE_BITS;

// The packed entry must stay exactly two words on 32-bit targets;
// a change here silently doubles every generated metadata table.
const _: () = assert!(core::mem::size_of::<AttributeEntry>() == 8);

impl AttributeEntry {
    /// Create a new entry.
    ///
    /// An empty `read`/`write` privilege renders the attribute
    /// non-readable/non-writable respectively.
    pub const fn new(
        id: AttrId,
        quality: AttrQuality,
        read: Option<Privilege>,
        write: Option<Privilege>,
    ) -> Self {
        let mask = quality.bits() as u16
            | (Privilege::pack(read) << READ_SHIFT)
            | (Privilege::pack(write) << WRITE_SHIFT);

        Self { id, mask }
    }

    /// A read-only entry readable with `View` privilege.
    pub const fn rv(id: AttrId, quality: AttrQuality) -> Self {
        Self::new(id, quality, Some(Privilege::View), None)
    }

    /// A read-write entry readable with `View` and writable with
    /// `Operate` privilege.
    pub const fn rw(id: AttrId, quality: AttrQuality) -> Self {
        Self::new(id, quality, Some(Privilege::View), Some(Privilege::Operate))
    }

    pub const fn quality(&self) -> AttrQuality {
        AttrQuality::from_bits_truncate(self.mask as u8 & ((1 << ATTR_QUALITY_BITS) - 1))
    }

    pub const fn read_privilege(&self) -> Option<Privilege> {
        Privilege::unpack(self.mask >> READ_SHIFT)
    }

    pub const fn write_privilege(&self) -> Option<Privilege> {
        Privilege::unpack(self.mask >> WRITE_SHIFT)
    }

    pub const fn is_readable(&self) -> bool {
        self.read_privilege().is_some()
    }

    pub const fn is_writable(&self) -> bool {
        self.write_privilege().is_some()
    }

    /// Return `true` if this entry describes a global attribute.
    pub fn is_global(&self) -> bool {
        GlobalAttr::from_repr(self.id).is_some()
    }
}

impl fmt::Display for AttributeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.id)
    }
}

/// The global attributes every server cluster exposes.
///
/// The list-shaped ones are synthesized by the dispatch layer from the
/// cluster's metadata operations; `FeatureMap` and `ClusterRevision` are
/// served by each cluster's own read switch.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum GlobalAttr {
    GeneratedCmdList = 0xFFF8,
    AcceptedCmdList = 0xFFF9,
    AttributeList = 0xFFFB,
    FeatureMap = 0xFFFC,
    ClusterRevision = 0xFFFD,
}

/// The metadata entries for the global attributes, in the order they are
/// appended to every cluster's attribute list.
pub const GLOBAL_ATTRIBUTES: &[AttributeEntry] = &[
    AttributeEntry::rv(GlobalAttr::GeneratedCmdList as _, AttrQuality::LIST),
    AttributeEntry::rv(GlobalAttr::AcceptedCmdList as _, AttrQuality::LIST),
    AttributeEntry::rv(GlobalAttr::AttributeList as _, AttrQuality::LIST),
    AttributeEntry::rv(GlobalAttr::FeatureMap as _, AttrQuality::empty()),
    AttributeEntry::rv(GlobalAttr::ClusterRevision as _, AttrQuality::empty()),
];

/// The concrete (non-wildcard) path of a cluster instance.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClusterPath {
    pub endpoint_id: EndptId,
    pub cluster_id: ClusterId,
}

impl fmt::Display for ClusterPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Endpt({:#04x})::Cluster({:#06x})",
            self.endpoint_id, self.cluster_id
        )
    }
}

/// The details of an attribute read or write operation, already resolved
/// to a concrete path by the Interaction Model layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttrDetails {
    /// The endpoint being addressed
    pub endpoint_id: EndptId,
    /// The cluster being addressed
    pub cluster_id: ClusterId,
    /// The attribute being addressed
    pub attr_id: AttrId,
    /// For reads: serve the data only if the cluster dataver differs.
    /// For writes: a precondition which must match the cluster dataver.
    pub dataver: Option<u32>,
}

impl AttrDetails {
    pub const fn new(endpoint_id: EndptId, cluster_id: ClusterId, attr_id: AttrId) -> Self {
        Self {
            endpoint_id,
            cluster_id,
            attr_id,
            dataver: None,
        }
    }

    pub const fn with_dataver(self, dataver: u32) -> Self {
        Self {
            dataver: Some(dataver),
            ..self
        }
    }

    pub const fn path(&self) -> ClusterPath {
        ClusterPath {
            endpoint_id: self.endpoint_id,
            cluster_id: self.cluster_id,
        }
    }
}

/// A macro to generate an id -> enum conversion for a cluster's attribute
/// id enum, failing with `AttributeNotFound`.
#[allow(unused_macros)]
#[macro_export]
macro_rules! attribute_enum {
    ($en:ty) => {
        impl core::convert::TryFrom<$crate::dm::AttrId> for $en {
            type Error = $crate::error::Error;

            fn try_from(id: $crate::dm::AttrId) -> Result<Self, Self::Error> {
                <$en>::from_repr(id)
                    .ok_or_else(|| $crate::error::ErrorCode::AttributeNotFound.into())
            }
        }
    };
}
