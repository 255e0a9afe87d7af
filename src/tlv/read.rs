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

use super::{ElementType, TLVTag, TAG_MASK};

/// A parsed view over a single TLV element inside a borrowed buffer.
///
/// The element starts at the beginning of the wrapped slice; the slice may
/// extend beyond the element's end (e.g. when iterating a container).
/// All accessors are non-panicking: malformed or truncated input surfaces
/// as a typed error.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TLVElement<'a> {
    buf: &'a [u8],
}

impl<'a> TLVElement<'a> {
    /// Create an element view over the first element in `buf`.
    pub fn new(buf: &'a [u8]) -> Result<Self, Error> {
        if buf.is_empty() {
            return Err(ErrorCode::TLVNotFound.into());
        }

        Ok(Self { buf })
    }

    pub fn tag(&self) -> Result<TLVTag, Error> {
        match self.control()? & TAG_MASK {
            0x00 => Ok(TLVTag::Anonymous),
            0x20 => {
                let id = *self.buf.get(1).ok_or(ErrorCode::InvalidData)?;
                Ok(TLVTag::Context(id))
            }
            _ => Err(ErrorCode::InvalidData.into()),
        }
    }

    pub fn u8(&self) -> Result<u8, Error> {
        match self.etype()? {
            ElementType::U8 => Ok(self.value_bytes(1)?[0]),
            _ => Err(ErrorCode::TLVTypeMismatch.into()),
        }
    }

    pub fn u16(&self) -> Result<u16, Error> {
        match self.etype()? {
            ElementType::U8 => Ok(self.u8()? as u16),
            ElementType::U16 => Ok(u16::from_le_bytes(self.value_bytes(2)?.try_into()?)),
            _ => Err(ErrorCode::TLVTypeMismatch.into()),
        }
    }

    pub fn u32(&self) -> Result<u32, Error> {
        match self.etype()? {
            ElementType::U8 | ElementType::U16 => Ok(self.u16()? as u32),
            ElementType::U32 => Ok(u32::from_le_bytes(self.value_bytes(4)?.try_into()?)),
            _ => Err(ErrorCode::TLVTypeMismatch.into()),
        }
    }

    pub fn u64(&self) -> Result<u64, Error> {
        match self.etype()? {
            ElementType::U8 | ElementType::U16 | ElementType::U32 => Ok(self.u32()? as u64),
            ElementType::U64 => Ok(u64::from_le_bytes(self.value_bytes(8)?.try_into()?)),
            _ => Err(ErrorCode::TLVTypeMismatch.into()),
        }
    }

    pub fn i8(&self) -> Result<i8, Error> {
        match self.etype()? {
            ElementType::S8 => Ok(self.value_bytes(1)?[0] as i8),
            _ => Err(ErrorCode::TLVTypeMismatch.into()),
        }
    }

    pub fn i16(&self) -> Result<i16, Error> {
        match self.etype()? {
            ElementType::S8 => Ok(self.i8()? as i16),
            ElementType::S16 => Ok(i16::from_le_bytes(self.value_bytes(2)?.try_into()?)),
            _ => Err(ErrorCode::TLVTypeMismatch.into()),
        }
    }

    pub fn i32(&self) -> Result<i32, Error> {
        match self.etype()? {
            ElementType::S8 | ElementType::S16 => Ok(self.i16()? as i32),
            ElementType::S32 => Ok(i32::from_le_bytes(self.value_bytes(4)?.try_into()?)),
            _ => Err(ErrorCode::TLVTypeMismatch.into()),
        }
    }

    pub fn i64(&self) -> Result<i64, Error> {
        match self.etype()? {
            ElementType::S8 | ElementType::S16 | ElementType::S32 => Ok(self.i32()? as i64),
            ElementType::S64 => Ok(i64::from_le_bytes(self.value_bytes(8)?.try_into()?)),
            _ => Err(ErrorCode::TLVTypeMismatch.into()),
        }
    }

    pub fn bool(&self) -> Result<bool, Error> {
        match self.etype()? {
            ElementType::False => Ok(false),
            ElementType::True => Ok(true),
            _ => Err(ErrorCode::TLVTypeMismatch.into()),
        }
    }

    /// Succeeds only if this element is the TLV null value.
    pub fn null(&self) -> Result<(), Error> {
        match self.etype()? {
            ElementType::Null => Ok(()),
            _ => Err(ErrorCode::TLVTypeMismatch.into()),
        }
    }

    pub fn utf8(&self) -> Result<&'a str, Error> {
        match self.etype()? {
            ElementType::Utf8l | ElementType::Utf16l => {
                Ok(core::str::from_utf8(self.str_bytes()?)?)
            }
            _ => Err(ErrorCode::TLVTypeMismatch.into()),
        }
    }

    pub fn octets(&self) -> Result<&'a [u8], Error> {
        match self.etype()? {
            ElementType::Str8l | ElementType::Str16l => self.str_bytes(),
            _ => Err(ErrorCode::TLVTypeMismatch.into()),
        }
    }

    /// Iterate the members of a struct element.
    pub fn structure(&self) -> Result<TLVSeqIter<'a>, Error> {
        match self.etype()? {
            ElementType::Struct => self.children(),
            _ => Err(ErrorCode::TLVTypeMismatch.into()),
        }
    }

    /// Iterate the members of an array element.
    pub fn array(&self) -> Result<TLVSeqIter<'a>, Error> {
        match self.etype()? {
            ElementType::Array => self.children(),
            _ => Err(ErrorCode::TLVTypeMismatch.into()),
        }
    }

    /// Find the struct member carrying the provided context tag.
    pub fn find_ctx(&self, id: u8) -> Result<TLVElement<'a>, Error> {
        for member in self.structure()? {
            let member = member?;

            if member.tag()? == TLVTag::Context(id) {
                return Ok(member);
            }
        }

        Err(ErrorCode::TLVNotFound.into())
    }

    /// Like `find_ctx`, but an absent member is not an error.
    pub fn find_ctx_opt(&self, id: u8) -> Result<Option<TLVElement<'a>>, Error> {
        match self.find_ctx(id) {
            Ok(element) => Ok(Some(element)),
            Err(e) if e.code() == ErrorCode::TLVNotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn control(&self) -> Result<u8, Error> {
        self.buf
            .first()
            .copied()
            .ok_or_else(|| ErrorCode::TLVNotFound.into())
    }

    fn etype(&self) -> Result<ElementType, Error> {
        ElementType::from_control(self.control()?)
    }

    // Offset of the value, past the control byte and the tag
    fn value_offset(&self) -> Result<usize, Error> {
        Ok(1 + self.tag()?.size())
    }

    fn value_bytes(&self, len: usize) -> Result<&'a [u8], Error> {
        let offset = self.value_offset()?;

        self.buf
            .get(offset..offset + len)
            .ok_or_else(|| ErrorCode::InvalidData.into())
    }

    fn str_bytes(&self) -> Result<&'a [u8], Error> {
        let offset = self.value_offset()?;

        let (len, offset) = match self.etype()? {
            ElementType::Utf8l | ElementType::Str8l => {
                let len = *self.buf.get(offset).ok_or(ErrorCode::InvalidData)?;
                (len as usize, offset + 1)
            }
            ElementType::Utf16l | ElementType::Str16l => {
                let len = u16::from_le_bytes(
                    self.buf
                        .get(offset..offset + 2)
                        .ok_or(ErrorCode::InvalidData)?
                        .try_into()?,
                );
                (len as usize, offset + 2)
            }
            _ => return Err(ErrorCode::TLVTypeMismatch.into()),
        };

        self.buf
            .get(offset..offset + len)
            .ok_or_else(|| ErrorCode::InvalidData.into())
    }

    fn children(&self) -> Result<TLVSeqIter<'a>, Error> {
        let offset = self.value_offset()?;

        Ok(TLVSeqIter {
            buf: self.buf.get(offset..).unwrap_or(&[]),
            done: false,
        })
    }

    // Total encoded length of this element, nested containers included
    pub(crate) fn total_len(&self) -> Result<usize, Error> {
        skip(self.buf, 0)
    }
}

// Return the offset just past the element starting at `pos`
fn skip(buf: &[u8], pos: usize) -> Result<usize, Error> {
    let control = *buf.get(pos).ok_or(ErrorCode::InvalidData)?;
    let etype = ElementType::from_control(control)?;

    let element = TLVElement::new(&buf[pos..])?;
    let mut next = pos + 1 + element.tag()?.size();

    match etype {
        ElementType::S8 | ElementType::U8 => next += 1,
        ElementType::S16 | ElementType::U16 => next += 2,
        ElementType::S32 | ElementType::U32 => next += 4,
        ElementType::S64 | ElementType::U64 => next += 8,
        ElementType::False | ElementType::True | ElementType::Null | ElementType::EndCnt => (),
        ElementType::Utf8l | ElementType::Utf16l | ElementType::Str8l | ElementType::Str16l => {
            let data = element.str_bytes()?;
            let len_size = match etype {
                ElementType::Utf8l | ElementType::Str8l => 1,
                _ => 2,
            };

            next += len_size + data.len();
        }
        ElementType::Struct | ElementType::Array => {
            loop {
                let control = *buf.get(next).ok_or(ErrorCode::InvalidData)?;

                if ElementType::from_control(control)? == ElementType::EndCnt {
                    next += 1;
                    break;
                }

                next = skip(buf, next)?;
            }
        }
    }

    Ok(next)
}

/// An iterator over the members of a TLV container.
pub struct TLVSeqIter<'a> {
    buf: &'a [u8],
    done: bool,
}

impl<'a> Iterator for TLVSeqIter<'a> {
    type Item = Result<TLVElement<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let control = match self.buf.first() {
            Some(control) => *control,
            None => {
                self.done = true;
                return Some(Err(ErrorCode::InvalidData.into()));
            }
        };

        match ElementType::from_control(control) {
            Ok(ElementType::EndCnt) => {
                self.done = true;
                None
            }
            Ok(_) => {
                let element = match TLVElement::new(self.buf) {
                    Ok(element) => element,
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                };

                match element.total_len() {
                    Ok(len) => {
                        self.buf = &self.buf[len..];
                        Some(Ok(element))
                    }
                    Err(e) => {
                        self.done = true;
                        Some(Err(e))
                    }
                }
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
