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

//! The attribute value codec boundary: the capability objects handed to a
//! cluster so it can produce or consume attribute values and command
//! payloads without knowing anything about the wire format.

use crate::error::{Error, ErrorCode};
use crate::tlv::{FromTLV, TLVElement, TLVTag, TLVWrite, TLVWriter, ToTLV};

use super::{AttrDetails, CmdId};

/// The encoder handed to a cluster for one attribute read.
///
/// Carries the subscriber's dataver filter: when the filter still matches
/// the cluster's live dataver the read is suppressed and no value is
/// produced.
pub struct AttrValueEncoder<'a, 'w> {
    dataver_filter: Option<u32>,
    tw: &'a mut TLVWriter<'w>,
}

impl<'a, 'w> AttrValueEncoder<'a, 'w> {
    pub fn new(attr: &AttrDetails, tw: &'a mut TLVWriter<'w>) -> Self {
        Self {
            dataver_filter: attr.dataver,
            tw,
        }
    }

    /// Return the value writer for a cluster whose live dataver is
    /// `dataver`, or `None` if the read is suppressed by the dataver
    /// filter.
    pub fn with_dataver(self, dataver: u32) -> Result<Option<AttrValueWriter<'a, 'w>>, Error> {
        if self
            .dataver_filter
            .map(|filter| filter != dataver)
            .unwrap_or(true)
        {
            Ok(Some(AttrValueWriter::new(self.tw)))
        } else {
            Ok(None)
        }
    }
}

/// Writes the value of one attribute read.
///
/// Exactly one of `set`/`set_list` must be called; a writer dropped
/// without completing rewinds the output to where it started, so a failed
/// read never leaves a partial value behind.
pub struct AttrValueWriter<'a, 'w> {
    tw: &'a mut TLVWriter<'w>,
    anchor: usize,
    completed: bool,
}

impl<'a, 'w> AttrValueWriter<'a, 'w> {
    pub const TAG: TLVTag = TLVTag::Anonymous;

    fn new(tw: &'a mut TLVWriter<'w>) -> Self {
        let anchor = tw.get_tail();

        Self {
            tw,
            anchor,
            completed: false,
        }
    }

    /// Encode a scalar or struct value.
    pub fn set<T: ToTLV>(mut self, value: T) -> Result<(), Error> {
        value.to_tlv(&Self::TAG, &mut *self.tw)?;
        self.completed = true;

        Ok(())
    }

    /// Encode a list value.
    ///
    /// The provided closure is invoked exactly once with a [`ListEncoder`]
    /// and must append every element in order: a lazy, single-pass, finite
    /// sequence which is not restartable.
    pub fn set_list<F>(mut self, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut ListEncoder<'_, 'w>) -> Result<(), Error>,
    {
        self.tw.start_array(&Self::TAG)?;

        let mut encoder = ListEncoder {
            tw: &mut *self.tw,
        };
        f(&mut encoder)?;

        self.tw.end_container()?;
        self.completed = true;

        Ok(())
    }

    /// Return the raw TLV writer for values which need to be produced in
    /// smaller pieces than `set` allows.
    pub fn writer(&mut self) -> &mut TLVWriter<'w> {
        self.tw
    }

    /// Complete a manual write performed through `writer`.
    pub fn complete(mut self) -> Result<(), Error> {
        self.completed = true;

        Ok(())
    }
}

impl Drop for AttrValueWriter<'_, '_> {
    fn drop(&mut self) {
        if !self.completed {
            self.tw.rewind_to(self.anchor);
        }
    }
}

/// Appends the elements of one list-typed attribute value.
pub struct ListEncoder<'a, 'w> {
    tw: &'a mut TLVWriter<'w>,
}

impl ListEncoder<'_, '_> {
    pub fn item<T: ToTLV>(&mut self, value: T) -> Result<(), Error> {
        value.to_tlv(&TLVTag::Anonymous, &mut *self.tw)
    }
}

/// The decoder handed to a cluster for one attribute write.
///
/// Clusters must decode the complete new value before mutating any state,
/// so that a decode failure never leaves a partially applied write.
pub struct AttrValueDecoder<'a> {
    data: TLVElement<'a>,
}

impl<'a> AttrValueDecoder<'a> {
    pub const fn new(data: TLVElement<'a>) -> Self {
        Self { data }
    }

    /// Decode the incoming value.
    pub fn decode<T: FromTLV<'a>>(&self) -> Result<T, Error> {
        T::from_tlv(&self.data).map_err(|e| e.map_invalid_data_type())
    }

    /// Return the raw TLV element for values which need custom decoding.
    pub fn element(&self) -> &TLVElement<'a> {
        &self.data
    }
}

/// Records whether an invoke produced a data response, so the dispatcher
/// knows whether a plain success status is still owed to the peer.
#[derive(Default)]
pub struct CmdDataTracker {
    data_written: bool,
}

impl CmdDataTracker {
    pub const fn new() -> Self {
        Self {
            data_written: false,
        }
    }

    pub(crate) fn complete(&mut self) {
        self.data_written = true;
    }

    pub fn needs_status(&self) -> bool {
        !self.data_written
    }
}

mod cmd_resp_tag {
    pub const CMD: u8 = 0;
    pub const DATA: u8 = 1;
}

/// The reply capability handed to a cluster for one command invocation.
///
/// A cluster producing a data-bearing response calls `with_command` with
/// the response command ID and then sets the payload; a cluster producing
/// only a status does not touch the reply at all.
pub struct CmdReply<'a, 'w> {
    tracker: &'a mut CmdDataTracker,
    tw: &'a mut TLVWriter<'w>,
}

impl<'a, 'w> CmdReply<'a, 'w> {
    pub fn new(tracker: &'a mut CmdDataTracker, tw: &'a mut TLVWriter<'w>) -> Self {
        Self { tracker, tw }
    }

    /// Start a data response for the provided response command ID.
    pub fn with_command(self, resp_id: CmdId) -> Result<CmdDataWriter<'a, 'w>, Error> {
        let mut writer = CmdDataWriter::new(self.tracker, self.tw);

        writer.tw.start_struct(&TLVTag::Anonymous)?;
        writer
            .tw
            .u32(&TLVTag::Context(cmd_resp_tag::CMD), resp_id)?;

        Ok(writer)
    }
}

/// Writes the payload of a data-bearing command response.
pub struct CmdDataWriter<'a, 'w> {
    tracker: &'a mut CmdDataTracker,
    tw: &'a mut TLVWriter<'w>,
    anchor: usize,
    completed: bool,
}

impl<'a, 'w> CmdDataWriter<'a, 'w> {
    pub const TAG: TLVTag = TLVTag::Context(cmd_resp_tag::DATA);

    fn new(tracker: &'a mut CmdDataTracker, tw: &'a mut TLVWriter<'w>) -> Self {
        let anchor = tw.get_tail();

        Self {
            tracker,
            tw,
            anchor,
            completed: false,
        }
    }

    /// Set the response payload and complete the response.
    pub fn set<T: ToTLV>(mut self, value: T) -> Result<(), Error> {
        value.to_tlv(&Self::TAG, &mut *self.tw)?;
        self.finish()
    }

    /// Complete the response without a payload.
    pub fn complete(mut self) -> Result<(), Error> {
        self.finish()
    }

    pub fn writer(&mut self) -> &mut TLVWriter<'w> {
        self.tw
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.tw.end_container()?;

        self.completed = true;
        self.tracker.complete();

        Ok(())
    }
}

impl Drop for CmdDataWriter<'_, '_> {
    fn drop(&mut self) {
        if !self.completed {
            self.tw.rewind_to(self.anchor);
        }
    }
}
