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

use core::mem::MaybeUninit;

use crate::error::{Error, ErrorCode};

use super::{AttributeEntry, GLOBAL_ATTRIBUTES};

/// A push-only builder over caller-provided storage, used to materialize
/// the result of every metadata query (attribute lists, endpoint lists,
/// topology queries) before it is consumed.
///
/// Results are populated once and then read many times via `as_slice`;
/// there is no removal, mutation or restart.
pub struct ListBuilder<'a, T: Copy> {
    items: &'a mut [MaybeUninit<T>],
    len: usize,
}

impl<'a, T: Copy> ListBuilder<'a, T> {
    pub fn new(storage: &'a mut [MaybeUninit<T>]) -> Self {
        Self {
            items: storage,
            len: 0,
        }
    }

    pub fn push(&mut self, item: T) -> Result<(), Error> {
        if self.len >= self.items.len() {
            return Err(ErrorCode::NoSpace.into());
        }

        self.items[self.len] = MaybeUninit::new(item);
        self.len += 1;

        Ok(())
    }

    pub fn try_extend_from_slice(&mut self, items: &[T]) -> Result<(), Error> {
        for item in items {
            self.push(*item)?;
        }

        Ok(())
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[T] {
        // The first `len` items are always initialized by `push`
        unsafe { core::slice::from_raw_parts(self.items.as_ptr() as *const T, self.len) }
    }

    pub fn into_slice(self) -> &'a [T] {
        unsafe { core::slice::from_raw_parts(self.items.as_ptr() as *const T, self.len) }
    }
}

/// A bitmask selecting which of a cluster's candidate optional attributes
/// are enabled right now; bit `i` gates candidate `i` of the optional
/// span, so a span may carry at most 32 candidates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OptionalAttributeSet(u32);

impl OptionalAttributeSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn enable(self, index: usize) -> Self {
        Self(self.0 | (1 << index))
    }

    pub const fn disable(self, index: usize) -> Self {
        Self(self.0 & !(1 << index))
    }

    pub const fn contains(&self, index: usize) -> bool {
        self.0 & (1 << index) != 0
    }
}

/// Produces the final ordered attribute list a cluster exposes:
/// the mandatory span first (unconditionally, in declaration order), then
/// the enabled subset of the optional-candidate span (in declaration
/// order), then the global attributes.
///
/// No sorting by numeric ID is performed and no deduplication: the caller
/// guarantees the mandatory and optional spans never overlap in attribute
/// ID.
pub struct AttrListBuilder<'s, 'a> {
    out: &'s mut ListBuilder<'a, AttributeEntry>,
}

impl<'s, 'a> AttrListBuilder<'s, 'a> {
    pub fn new(out: &'s mut ListBuilder<'a, AttributeEntry>) -> Self {
        Self { out }
    }

    pub fn mandatory(self, entries: &[AttributeEntry]) -> Result<Self, Error> {
        self.out.try_extend_from_slice(entries)?;

        Ok(self)
    }

    pub fn optional(
        self,
        candidates: &[AttributeEntry],
        enabled: OptionalAttributeSet,
    ) -> Result<Self, Error> {
        for (index, entry) in candidates.iter().enumerate() {
            if enabled.contains(index) {
                self.out.push(*entry)?;
            }
        }

        Ok(self)
    }

    pub fn finish(self) -> Result<(), Error> {
        self.out.try_extend_from_slice(GLOBAL_ATTRIBUTES)
    }
}

#[cfg(test)]
mod tests {
    use core::mem::MaybeUninit;

    use super::{AttrListBuilder, ListBuilder, OptionalAttributeSet};
    use crate::dm::{AttrQuality, AttributeEntry, GLOBAL_ATTRIBUTES};
    use crate::error::ErrorCode;

    const MANDATORY: &[AttributeEntry] = &[
        AttributeEntry::rv(0, AttrQuality::empty()),
        AttributeEntry::rv(1, AttrQuality::LIST),
    ];

    const OPTIONAL: &[AttributeEntry] = &[
        AttributeEntry::rv(2, AttrQuality::empty()),
        AttributeEntry::rw(3, AttrQuality::empty()),
        AttributeEntry::rv(4, AttrQuality::empty()),
    ];

    fn build(enabled: OptionalAttributeSet) -> heapless::Vec<u32, 16> {
        let mut storage = [MaybeUninit::uninit(); 16];
        let mut out = ListBuilder::new(&mut storage);

        AttrListBuilder::new(&mut out)
            .mandatory(MANDATORY)
            .unwrap()
            .optional(OPTIONAL, enabled)
            .unwrap()
            .finish()
            .unwrap();

        out.as_slice().iter().map(|entry| entry.id).collect()
    }

    #[test]
    fn test_ordering_and_idempotence() {
        let enabled = OptionalAttributeSet::empty().enable(0).enable(2);

        let first = build(enabled);
        let second = build(enabled);

        // Same configuration twice yields identical ordered output
        assert_eq!(first, second);

        let mut expected: heapless::Vec<u32, 16> = heapless::Vec::new();
        expected.extend([0, 1, 2, 4]);
        expected.extend(GLOBAL_ATTRIBUTES.iter().map(|entry| entry.id));
        assert_eq!(first, expected);
    }

    #[test]
    fn test_toggling_one_bit_preserves_relative_order() {
        let without = build(OptionalAttributeSet::empty().enable(2));
        let with = build(OptionalAttributeSet::empty().enable(1).enable(2));

        // The only difference is the presence of candidate 1
        let filtered: heapless::Vec<u32, 16> =
            with.iter().copied().filter(|id| *id != 3).collect();
        assert_eq!(filtered, without);
    }

    #[test]
    fn test_no_space() {
        let mut storage = [MaybeUninit::uninit(); 2];
        let mut out = ListBuilder::new(&mut storage);

        let err = AttrListBuilder::new(&mut out)
            .mandatory(MANDATORY)
            .unwrap()
            .optional(OPTIONAL, OptionalAttributeSet::empty().enable(0))
            .map(|_| ())
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::NoSpace);
    }
}
