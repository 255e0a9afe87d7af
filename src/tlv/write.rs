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

use super::{ElementType, TLVTag};

/// A type that can consume a stream of TLV tag + value writes.
///
/// Write failures are sticky in the sense that the underlying output is
/// left exactly as it was before the failing write; combined with
/// `get_tail`/`rewind_to` this allows callers to atomically abandon a
/// partially written element tree.
pub trait TLVWrite {
    fn i8(&mut self, tag: &TLVTag, data: i8) -> Result<(), Error>;

    fn i16(&mut self, tag: &TLVTag, data: i16) -> Result<(), Error>;

    fn i32(&mut self, tag: &TLVTag, data: i32) -> Result<(), Error>;

    fn i64(&mut self, tag: &TLVTag, data: i64) -> Result<(), Error>;

    fn u8(&mut self, tag: &TLVTag, data: u8) -> Result<(), Error>;

    fn u16(&mut self, tag: &TLVTag, data: u16) -> Result<(), Error>;

    fn u32(&mut self, tag: &TLVTag, data: u32) -> Result<(), Error>;

    fn u64(&mut self, tag: &TLVTag, data: u64) -> Result<(), Error>;

    fn bool(&mut self, tag: &TLVTag, data: bool) -> Result<(), Error>;

    fn utf8(&mut self, tag: &TLVTag, data: &str) -> Result<(), Error>;

    fn str(&mut self, tag: &TLVTag, data: &[u8]) -> Result<(), Error>;

    fn null(&mut self, tag: &TLVTag) -> Result<(), Error>;

    fn start_struct(&mut self, tag: &TLVTag) -> Result<(), Error>;

    fn start_array(&mut self, tag: &TLVTag) -> Result<(), Error>;

    fn end_container(&mut self) -> Result<(), Error>;
}

impl<T> TLVWrite for &mut T
where
    T: TLVWrite,
{
    fn i8(&mut self, tag: &TLVTag, data: i8) -> Result<(), Error> {
        (**self).i8(tag, data)
    }

    fn i16(&mut self, tag: &TLVTag, data: i16) -> Result<(), Error> {
        (**self).i16(tag, data)
    }

    fn i32(&mut self, tag: &TLVTag, data: i32) -> Result<(), Error> {
        (**self).i32(tag, data)
    }

    fn i64(&mut self, tag: &TLVTag, data: i64) -> Result<(), Error> {
        (**self).i64(tag, data)
    }

    fn u8(&mut self, tag: &TLVTag, data: u8) -> Result<(), Error> {
        (**self).u8(tag, data)
    }

    fn u16(&mut self, tag: &TLVTag, data: u16) -> Result<(), Error> {
        (**self).u16(tag, data)
    }

    fn u32(&mut self, tag: &TLVTag, data: u32) -> Result<(), Error> {
        (**self).u32(tag, data)
    }

    fn u64(&mut self, tag: &TLVTag, data: u64) -> Result<(), Error> {
        (**self).u64(tag, data)
    }

    fn bool(&mut self, tag: &TLVTag, data: bool) -> Result<(), Error> {
        (**self).bool(tag, data)
    }

    fn utf8(&mut self, tag: &TLVTag, data: &str) -> Result<(), Error> {
        (**self).utf8(tag, data)
    }

    fn str(&mut self, tag: &TLVTag, data: &[u8]) -> Result<(), Error> {
        (**self).str(tag, data)
    }

    fn null(&mut self, tag: &TLVTag) -> Result<(), Error> {
        (**self).null(tag)
    }

    fn start_struct(&mut self, tag: &TLVTag) -> Result<(), Error> {
        (**self).start_struct(tag)
    }

    fn start_array(&mut self, tag: &TLVTag) -> Result<(), Error> {
        (**self).start_array(tag)
    }

    fn end_container(&mut self) -> Result<(), Error> {
        (**self).end_container()
    }
}

/// A TLV writer over a borrowed output buffer.
pub struct TLVWriter<'a> {
    buf: &'a mut [u8],
    tail: usize,
}

impl<'a> TLVWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, tail: 0 }
    }

    /// Return the current write position.
    pub fn get_tail(&self) -> usize {
        self.tail
    }

    /// Discard everything written after the provided position.
    pub fn rewind_to(&mut self, tail: usize) {
        self.tail = tail;
    }

    /// Return the bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.tail]
    }

    fn header(&mut self, tag: &TLVTag, etype: ElementType) -> Result<(), Error> {
        if self.tail + 1 + tag.size() > self.buf.len() {
            return Err(ErrorCode::NoSpace.into());
        }

        self.buf[self.tail] = tag.control_bits() | etype as u8;
        self.tail += 1;

        if let TLVTag::Context(id) = tag {
            self.buf[self.tail] = *id;
            self.tail += 1;
        }

        Ok(())
    }

    fn raw(&mut self, data: &[u8]) -> Result<(), Error> {
        if self.tail + data.len() > self.buf.len() {
            return Err(ErrorCode::NoSpace.into());
        }

        self.buf[self.tail..self.tail + data.len()].copy_from_slice(data);
        self.tail += data.len();

        Ok(())
    }

    // Writes header + value, undoing the header if the value does not fit
    fn element(&mut self, tag: &TLVTag, etype: ElementType, value: &[u8]) -> Result<(), Error> {
        let anchor = self.tail;

        self.header(tag, etype)
            .and_then(|_| self.raw(value))
            .inspect_err(|_| self.rewind_to(anchor))
    }
}

impl TLVWrite for TLVWriter<'_> {
    fn i8(&mut self, tag: &TLVTag, data: i8) -> Result<(), Error> {
        self.element(tag, ElementType::S8, &data.to_le_bytes())
    }

    fn i16(&mut self, tag: &TLVTag, data: i16) -> Result<(), Error> {
        self.element(tag, ElementType::S16, &data.to_le_bytes())
    }

    fn i32(&mut self, tag: &TLVTag, data: i32) -> Result<(), Error> {
        self.element(tag, ElementType::S32, &data.to_le_bytes())
    }

    fn i64(&mut self, tag: &TLVTag, data: i64) -> Result<(), Error> {
        self.element(tag, ElementType::S64, &data.to_le_bytes())
    }

    fn u8(&mut self, tag: &TLVTag, data: u8) -> Result<(), Error> {
        self.element(tag, ElementType::U8, &data.to_le_bytes())
    }

    fn u16(&mut self, tag: &TLVTag, data: u16) -> Result<(), Error> {
        self.element(tag, ElementType::U16, &data.to_le_bytes())
    }

    fn u32(&mut self, tag: &TLVTag, data: u32) -> Result<(), Error> {
        self.element(tag, ElementType::U32, &data.to_le_bytes())
    }

    fn u64(&mut self, tag: &TLVTag, data: u64) -> Result<(), Error> {
        self.element(tag, ElementType::U64, &data.to_le_bytes())
    }

    fn bool(&mut self, tag: &TLVTag, data: bool) -> Result<(), Error> {
        self.element(
            tag,
            if data {
                ElementType::True
            } else {
                ElementType::False
            },
            &[],
        )
    }

    fn utf8(&mut self, tag: &TLVTag, data: &str) -> Result<(), Error> {
        let anchor = self.tail;

        let result = if data.len() <= u8::MAX as usize {
            self.header(tag, ElementType::Utf8l)
                .and_then(|_| self.raw(&[data.len() as u8]))
        } else if data.len() <= u16::MAX as usize {
            self.header(tag, ElementType::Utf16l)
                .and_then(|_| self.raw(&(data.len() as u16).to_le_bytes()))
        } else {
            Err(ErrorCode::InvalidData.into())
        };

        result
            .and_then(|_| self.raw(data.as_bytes()))
            .inspect_err(|_| self.rewind_to(anchor))
    }

    fn str(&mut self, tag: &TLVTag, data: &[u8]) -> Result<(), Error> {
        let anchor = self.tail;

        let result = if data.len() <= u8::MAX as usize {
            self.header(tag, ElementType::Str8l)
                .and_then(|_| self.raw(&[data.len() as u8]))
        } else if data.len() <= u16::MAX as usize {
            self.header(tag, ElementType::Str16l)
                .and_then(|_| self.raw(&(data.len() as u16).to_le_bytes()))
        } else {
            Err(ErrorCode::InvalidData.into())
        };

        result
            .and_then(|_| self.raw(data))
            .inspect_err(|_| self.rewind_to(anchor))
    }

    fn null(&mut self, tag: &TLVTag) -> Result<(), Error> {
        self.element(tag, ElementType::Null, &[])
    }

    fn start_struct(&mut self, tag: &TLVTag) -> Result<(), Error> {
        self.element(tag, ElementType::Struct, &[])
    }

    fn start_array(&mut self, tag: &TLVTag) -> Result<(), Error> {
        self.element(tag, ElementType::Array, &[])
    }

    fn end_container(&mut self) -> Result<(), Error> {
        let anchor = self.tail;

        self.header(&TLVTag::Anonymous, ElementType::EndCnt)
            .inspect_err(|_| self.rewind_to(anchor))
    }
}

#[cfg(test)]
mod tests {
    use super::{TLVWrite, TLVWriter};
    use crate::error::ErrorCode;
    use crate::tlv::TLVTag;

    #[test]
    fn test_encoding() {
        let mut buf = [0; 32];
        let mut tw = TLVWriter::new(&mut buf);

        tw.u8(&TLVTag::Anonymous, 12).unwrap();
        tw.u16(&TLVTag::Context(1), 0x1234).unwrap();
        tw.bool(&TLVTag::Context(2), true).unwrap();
        tw.null(&TLVTag::Context(3)).unwrap();

        assert_eq!(
            tw.as_slice(),
            &[0x04, 12, 0x25, 1, 0x34, 0x12, 0x29, 2, 0x34, 3]
        );
    }

    #[test]
    fn test_containers() {
        let mut buf = [0; 32];
        let mut tw = TLVWriter::new(&mut buf);

        tw.start_struct(&TLVTag::Anonymous).unwrap();
        tw.u32(&TLVTag::Context(0), 0xdeadbeef).unwrap();
        tw.start_array(&TLVTag::Context(1)).unwrap();
        tw.u8(&TLVTag::Anonymous, 1).unwrap();
        tw.end_container().unwrap();
        tw.end_container().unwrap();

        assert_eq!(
            tw.as_slice(),
            &[
                0x15, 0x26, 0, 0xef, 0xbe, 0xad, 0xde, 0x36, 1, 0x04, 1, 0x18, 0x18
            ]
        );
    }

    #[test]
    fn test_no_space_leaves_output_untouched() {
        let mut buf = [0; 3];
        let mut tw = TLVWriter::new(&mut buf);

        tw.u8(&TLVTag::Anonymous, 1).unwrap();

        // A u16 with a context tag needs 4 bytes, only 1 is left
        let err = tw.u16(&TLVTag::Context(1), 0xffff).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoSpace);
        assert_eq!(tw.as_slice(), &[0x04, 1]);
    }

    #[test]
    fn test_rewind() {
        let mut buf = [0; 32];
        let mut tw = TLVWriter::new(&mut buf);

        tw.u8(&TLVTag::Anonymous, 1).unwrap();
        let anchor = tw.get_tail();

        tw.utf8(&TLVTag::Anonymous, "scratch").unwrap();
        tw.rewind_to(anchor);

        assert_eq!(tw.as_slice(), &[0x04, 1]);
    }
}
