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

//! A compact implementation of the Matter TLV encoding.
//!
//! Only the subset needed by the attribute/command codec boundary is
//! implemented: anonymous and context tags, the integer/bool/null/string
//! primitives and struct/array containers. Multi-byte tag forms, lists and
//! floating point elements are not modeled.

use crate::error::{Error, ErrorCode};

mod read;
mod traits;
mod write;

pub use read::*;
pub use traits::*;
pub use write::*;

/// The number of bits the tag control occupies in a TLV control byte.
pub const TAG_SHIFT_BITS: u8 = 5;
/// The mask of the tag control bits in a TLV control byte.
pub const TAG_MASK: u8 = 0xe0;
/// The mask of the element type bits in a TLV control byte.
pub const TYPE_MASK: u8 = 0x1f;

/// A TLV tag, restricted to the two forms the data model core emits.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TLVTag {
    Anonymous,
    Context(u8),
}

impl TLVTag {
    pub(crate) const fn control_bits(&self) -> u8 {
        match self {
            Self::Anonymous => 0x00,
            Self::Context(_) => 0x20,
        }
    }

    pub(crate) const fn size(&self) -> usize {
        match self {
            Self::Anonymous => 0,
            Self::Context(_) => 1,
        }
    }
}

/// The TLV element types understood by this implementation, with their
/// on-wire type codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub(crate) enum ElementType {
    S8 = 0x00,
    S16 = 0x01,
    S32 = 0x02,
    S64 = 0x03,
    U8 = 0x04,
    U16 = 0x05,
    U32 = 0x06,
    U64 = 0x07,
    False = 0x08,
    True = 0x09,
    Utf8l = 0x0c,
    Utf16l = 0x0d,
    Str8l = 0x10,
    Str16l = 0x11,
    Null = 0x14,
    Struct = 0x15,
    Array = 0x16,
    EndCnt = 0x18,
}

impl ElementType {
    pub(crate) fn from_control(control: u8) -> Result<Self, Error> {
        let value = match control & TYPE_MASK {
            0x00 => Self::S8,
            0x01 => Self::S16,
            0x02 => Self::S32,
            0x03 => Self::S64,
            0x04 => Self::U8,
            0x05 => Self::U16,
            0x06 => Self::U32,
            0x07 => Self::U64,
            0x08 => Self::False,
            0x09 => Self::True,
            0x0c => Self::Utf8l,
            0x0d => Self::Utf16l,
            0x10 => Self::Str8l,
            0x11 => Self::Str16l,
            0x14 => Self::Null,
            0x15 => Self::Struct,
            0x16 => Self::Array,
            0x18 => Self::EndCnt,
            _ => return Err(ErrorCode::InvalidData.into()),
        };

        Ok(value)
    }
}
