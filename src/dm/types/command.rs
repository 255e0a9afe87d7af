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

use core::fmt;

use crate::utils::bitflags::bitflags;

use super::{ClusterId, ClusterPath, CmdId, EndptId, Privilege, PRIVILEGE_BITS};

bitflags! {
    /// Quality flags describing special invoke behavior of a command.
    #[repr(transparent)]
    #[derive(Default)]
    #[cfg_attr(not(feature = "defmt"), derive(Debug, Copy, Clone, Eq, PartialEq, Hash))]
    pub struct CmdQuality: u8 {
        /// The command operates on fabric-scoped data
        const FABRIC_SCOPED = 0x01;
        /// The command requires a timed interaction
        const TIMED = 0x02;
        /// The command exchanges payloads beyond the usual MTU
        const LARGE_MESSAGE = 0x04;
    }
}

/// The bit width of the packed command quality field.
pub const CMD_QUALITY_BITS: u32 = 3;

const _: () = assert!((CmdQuality::all().bits() as u32) < (1 << CMD_QUALITY_BITS));

/// Compact metadata for a single accepted (client-to-server) command:
/// its ID, quality flags and the privilege required to invoke it.
///
/// The packed layout is `[0..3) quality | [3..6) invoke privilege`; the
/// same flash-friendly discipline as `AttributeEntry`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AcceptedCommandEntry {
    pub id: CmdId,
    mask: u16,
}

const INVOKE_SHIFT: u32 = CMD_QUALITY_BITS;

const _: () = assert!(core::mem::size_of::<AcceptedCommandEntry>() == 8);

impl AcceptedCommandEntry {
    pub const fn new(id: CmdId, quality: CmdQuality, invoke: Privilege) -> Self {
        let mask = quality.bits() as u16 | (Privilege::pack(Some(invoke)) << INVOKE_SHIFT);

        Self { id, mask }
    }

    /// An entry invokable with the default `Operate` privilege.
    pub const fn operate(id: CmdId, quality: CmdQuality) -> Self {
        Self::new(id, quality, Privilege::Operate)
    }

    pub const fn quality(&self) -> CmdQuality {
        CmdQuality::from_bits_truncate(self.mask as u8 & ((1 << CMD_QUALITY_BITS) - 1))
    }

    pub const fn invoke_privilege(&self) -> Privilege {
        // An accepted command always carries an invoke privilege; `Operate`
        // doubles as the recovery value should the packed field ever be 0.
        match Privilege::unpack(self.mask >> INVOKE_SHIFT) {
            Some(privilege) => privilege,
            None => Privilege::Operate,
        }
    }
}

impl fmt::Display for AcceptedCommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.id)
    }
}

/// The details of a command invocation, already resolved to a concrete
/// path by the Interaction Model layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CmdDetails {
    pub endpoint_id: EndptId,
    pub cluster_id: ClusterId,
    pub cmd_id: CmdId,
}

impl CmdDetails {
    pub const fn new(endpoint_id: EndptId, cluster_id: ClusterId, cmd_id: CmdId) -> Self {
        Self {
            endpoint_id,
            cluster_id,
            cmd_id,
        }
    }

    pub const fn path(&self) -> ClusterPath {
        ClusterPath {
            endpoint_id: self.endpoint_id,
            cluster_id: self.cluster_id,
        }
    }
}

/// A macro to generate an id -> enum conversion for a cluster's command
/// id enum, failing with `CommandNotFound`.
#[allow(unused_macros)]
#[macro_export]
macro_rules! command_enum {
    ($en:ty) => {
        impl core::convert::TryFrom<$crate::dm::CmdId> for $en {
            type Error = $crate::error::Error;

            fn try_from(id: $crate::dm::CmdId) -> Result<Self, Self::Error> {
                <$en>::from_repr(id).ok_or_else(|| $crate::error::ErrorCode::CommandNotFound.into())
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::{AcceptedCommandEntry, CmdQuality};
    use crate::dm::Privilege;

    #[test]
    fn test_quality_roundtrip() {
        for bits in 0..=CmdQuality::all().bits() {
            let quality = CmdQuality::from_bits_truncate(bits);
            let entry = AcceptedCommandEntry::operate(0x10, quality);

            assert_eq!(entry.quality(), quality);
            assert_eq!(entry.invoke_privilege(), Privilege::Operate);
        }
    }

    #[test]
    fn test_invoke_privilege() {
        let entry = AcceptedCommandEntry::new(2, CmdQuality::TIMED, Privilege::Administer);

        assert_eq!(entry.quality(), CmdQuality::TIMED);
        assert_eq!(entry.invoke_privilege(), Privilege::Administer);
    }

    #[test]
    fn test_size() {
        assert_eq!(core::mem::size_of::<AcceptedCommandEntry>(), 8);
    }
}
