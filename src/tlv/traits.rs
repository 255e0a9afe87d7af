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

use super::{TLVElement, TLVTag, TLVWrite};

/// A type that can serialize itself as a single TLV element.
pub trait ToTLV {
    fn to_tlv<W: TLVWrite>(&self, tag: &TLVTag, tw: W) -> Result<(), Error>;
}

impl<T> ToTLV for &T
where
    T: ToTLV + ?Sized,
{
    fn to_tlv<W: TLVWrite>(&self, tag: &TLVTag, tw: W) -> Result<(), Error> {
        (**self).to_tlv(tag, tw)
    }
}

/// A type that can deserialize itself from a single TLV element.
pub trait FromTLV<'a>: Sized {
    fn from_tlv(element: &TLVElement<'a>) -> Result<Self, Error>;
}

macro_rules! totlv_for_int {
    ($ty:ty, $method:ident) => {
        impl ToTLV for $ty {
            fn to_tlv<W: TLVWrite>(&self, tag: &TLVTag, mut tw: W) -> Result<(), Error> {
                tw.$method(tag, *self)
            }
        }

        impl FromTLV<'_> for $ty {
            fn from_tlv(element: &TLVElement) -> Result<Self, Error> {
                element.$method()
            }
        }
    };
}

totlv_for_int!(i8, i8);
totlv_for_int!(i16, i16);
totlv_for_int!(i32, i32);
totlv_for_int!(i64, i64);
totlv_for_int!(u8, u8);
totlv_for_int!(u16, u16);
totlv_for_int!(u32, u32);
totlv_for_int!(u64, u64);

impl ToTLV for bool {
    fn to_tlv<W: TLVWrite>(&self, tag: &TLVTag, mut tw: W) -> Result<(), Error> {
        tw.bool(tag, *self)
    }
}

impl FromTLV<'_> for bool {
    fn from_tlv(element: &TLVElement) -> Result<Self, Error> {
        element.bool()
    }
}

impl ToTLV for str {
    fn to_tlv<W: TLVWrite>(&self, tag: &TLVTag, mut tw: W) -> Result<(), Error> {
        tw.utf8(tag, self)
    }
}

impl<'a> FromTLV<'a> for &'a str {
    fn from_tlv(element: &TLVElement<'a>) -> Result<Self, Error> {
        element.utf8()
    }
}

impl<const N: usize> ToTLV for heapless::String<N> {
    fn to_tlv<W: TLVWrite>(&self, tag: &TLVTag, mut tw: W) -> Result<(), Error> {
        tw.utf8(tag, self)
    }
}

impl<const N: usize> FromTLV<'_> for heapless::String<N> {
    fn from_tlv(element: &TLVElement) -> Result<Self, Error> {
        let mut value = Self::new();
        value
            .push_str(element.utf8()?)
            .map_err(|_| Error::new(ErrorCode::BufferTooSmall))?;

        Ok(value)
    }
}

/// A newtype for octet strings.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Octets<'a>(pub &'a [u8]);

impl ToTLV for Octets<'_> {
    fn to_tlv<W: TLVWrite>(&self, tag: &TLVTag, mut tw: W) -> Result<(), Error> {
        tw.str(tag, self.0)
    }
}

impl<'a> FromTLV<'a> for Octets<'a> {
    fn from_tlv(element: &TLVElement<'a>) -> Result<Self, Error> {
        Ok(Self(element.octets()?))
    }
}

/// The value of a nullable attribute or field.
///
/// Modeled separately from `Option` because "null" is a first-class value
/// on the wire, whereas `Option` is used for fields which might not be
/// present at all.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Nullable<T> {
    Null,
    Some(T),
}

impl<T> Nullable<T> {
    pub const fn some(value: T) -> Self {
        Self::Some(value)
    }

    pub const fn none() -> Self {
        Self::Null
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_ref(&self) -> Nullable<&T> {
        match self {
            Self::Null => Nullable::Null,
            Self::Some(value) => Nullable::Some(value),
        }
    }

    pub fn as_opt_ref(&self) -> Option<&T> {
        match self {
            Self::Null => None,
            Self::Some(value) => Some(value),
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Null => None,
            Self::Some(value) => Some(value),
        }
    }

    pub fn map<U, F>(self, f: F) -> Nullable<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Null => Nullable::Null,
            Self::Some(value) => Nullable::Some(f(value)),
        }
    }
}

impl<T> From<Option<T>> for Nullable<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            None => Self::Null,
            Some(value) => Self::Some(value),
        }
    }
}

impl<T> ToTLV for Nullable<T>
where
    T: ToTLV,
{
    fn to_tlv<W: TLVWrite>(&self, tag: &TLVTag, mut tw: W) -> Result<(), Error> {
        match self {
            Self::Null => tw.null(tag),
            Self::Some(value) => value.to_tlv(tag, tw),
        }
    }
}

impl<'a, T> FromTLV<'a> for Nullable<T>
where
    T: FromTLV<'a>,
{
    fn from_tlv(element: &TLVElement<'a>) -> Result<Self, Error> {
        if element.null().is_ok() {
            Ok(Self::Null)
        } else {
            Ok(Self::Some(T::from_tlv(element)?))
        }
    }
}
