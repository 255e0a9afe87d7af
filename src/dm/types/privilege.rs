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

use strum::FromRepr;

/// The access privilege an accessor must hold for an attribute read/write
/// or a command invoke, as defined by the Matter access control model.
///
/// Privileges are packed into 3-bit fields inside the attribute/command
/// metadata entries, with `0` reserved for "no privilege" (the operation
/// is not available at all); the discriminants below are the packed
/// representation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Privilege {
    View = 1,
    ProxyView = 2,
    Operate = 3,
    Manage = 4,
    Administer = 5,
}

/// The bit width of a packed privilege field.
pub const PRIVILEGE_BITS: u32 = 3;

// Every enumerator, present and future, must stay representable in the
// packed field; widening the field is a deliberate layout change.
const _: () = assert!((Privilege::Administer as u32) < (1 << PRIVILEGE_BITS));

impl Privilege {
    /// Pack an optional privilege into its 3-bit field representation.
    pub(crate) const fn pack(privilege: Option<Self>) -> u16 {
        match privilege {
            None => 0,
            Some(privilege) => privilege as u16,
        }
    }

    /// Unpack a 3-bit field into an optional privilege.
    ///
    /// Only the low `PRIVILEGE_BITS` bits of `raw` are considered.
    pub(crate) const fn unpack(raw: u16) -> Option<Self> {
        match (raw & ((1 << PRIVILEGE_BITS) - 1)) as u8 {
            0 => None,
            1 => Some(Self::View),
            2 => Some(Self::ProxyView),
            3 => Some(Self::Operate),
            4 => Some(Self::Manage),
            5 => Some(Self::Administer),
            _ => None,
        }
    }

    /// Return `true` if this privilege implies (is at least as powerful
    /// as) the `other` privilege.
    pub fn implies(&self, other: Privilege) -> bool {
        match other {
            Privilege::ProxyView => matches!(self, Privilege::ProxyView | Privilege::Administer),
            _ => (*self as u8) >= (other as u8) && !matches!(self, Privilege::ProxyView),
        }
    }
}
