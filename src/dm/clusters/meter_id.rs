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

//! The Meter Identification cluster: read-only on the wire, mutated by
//! the application through setters as the metering backend reports new
//! identification data.
//!
//! The setters follow the same discipline throughout: validate the whole
//! new value first, return without touching anything on failure, swallow
//! no-op assignments without a change notification, and otherwise mutate,
//! bump the dataver and notify.

use core::cell::{Cell, RefCell};

use strum::FromRepr;

use crate::attribute_enum;
use crate::dm::{
    AcceptedCommandEntry, AttrDetails, AttrListBuilder, AttrQuality, AttrValueEncoder,
    AttributeEntry, ChangeNotify, ClusterContext, ClusterPath, ClusterState, Dataver, EndptId,
    GlobalAttr, ListBuilder, OptionalAttributeSet, ServerCluster,
};
use crate::error::{Error, ErrorCode};
use crate::tlv::{Nullable, TLVTag, TLVWrite, ToTLV};

pub const ID: u32 = 0x0B06;

pub const CLUSTER_REVISION: u16 = 1;

/// The `PowerThreshold` feature bit.
pub const FEATURE_POWER_THRESHOLD: u32 = 0x01;

/// The capacity of the fixed string buffers (point of delivery, serial
/// number, protocol version).
pub const MAX_STRING_LEN: usize = 64;

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum AttributeId {
    MeterType = 0x0000,
    PointOfDelivery = 0x0001,
    MeterSerialNumber = 0x0002,
    ProtocolVersion = 0x0003,
    PowerThreshold = 0x0004,
}

attribute_enum!(AttributeId);

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MeterTypeEnum {
    Utility = 0,
    Private = 1,
    Generic = 2,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PowerThresholdSourceEnum {
    Contract = 0,
    Regulator = 1,
    Equipment = 2,
}

/// The power threshold of the metered supply.
///
/// The `source` is carried as a raw enum value and validated by the
/// setter, as it usually arrives from an external metering backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerThresholdStruct {
    pub power_threshold: Option<i64>,
    pub apparent_power_threshold: Option<i64>,
    pub source: Nullable<u8>,
}

mod power_threshold_tag {
    pub const POWER_THRESHOLD: u8 = 0;
    pub const APPARENT_POWER_THRESHOLD: u8 = 1;
    pub const SOURCE: u8 = 2;
}

impl ToTLV for PowerThresholdStruct {
    fn to_tlv<W: TLVWrite>(&self, tag: &TLVTag, mut tw: W) -> Result<(), Error> {
        tw.start_struct(tag)?;
        if let Some(threshold) = self.power_threshold {
            tw.i64(
                &TLVTag::Context(power_threshold_tag::POWER_THRESHOLD),
                threshold,
            )?;
        }
        if let Some(threshold) = self.apparent_power_threshold {
            tw.i64(
                &TLVTag::Context(power_threshold_tag::APPARENT_POWER_THRESHOLD),
                threshold,
            )?;
        }
        self.source
            .to_tlv(&TLVTag::Context(power_threshold_tag::SOURCE), &mut tw)?;
        tw.end_container()
    }
}

const MANDATORY_ATTRIBUTES: &[AttributeEntry] = &[
    AttributeEntry::rv(AttributeId::MeterType as _, AttrQuality::empty()),
    AttributeEntry::rv(AttributeId::PointOfDelivery as _, AttrQuality::empty()),
    AttributeEntry::rv(AttributeId::MeterSerialNumber as _, AttrQuality::empty()),
];

const OPTIONAL_ATTRIBUTES: &[AttributeEntry] = &[
    AttributeEntry::rv(AttributeId::ProtocolVersion as _, AttrQuality::empty()),
    AttributeEntry::rv(AttributeId::PowerThreshold as _, AttrQuality::empty()),
];

const PROTOCOL_VERSION_IDX: usize = 0;
const POWER_THRESHOLD_IDX: usize = 1;

type MeterString = heapless::String<MAX_STRING_LEN>;

/// The Meter Identification cluster instance of one endpoint, sole owner
/// of its typed state.
pub struct MeterIdCluster {
    state: ClusterState,
    enabled: OptionalAttributeSet,
    meter_type: Cell<Nullable<MeterTypeEnum>>,
    point_of_delivery: RefCell<Nullable<MeterString>>,
    serial_number: RefCell<Nullable<MeterString>>,
    protocol_version: RefCell<Nullable<MeterString>>,
    power_threshold: Cell<Nullable<PowerThresholdStruct>>,
}

impl MeterIdCluster {
    pub const fn new(endpoint_id: EndptId, dataver: Dataver) -> Self {
        Self {
            state: ClusterState::new(
                ClusterPath {
                    endpoint_id,
                    cluster_id: ID,
                },
                dataver,
            ),
            enabled: OptionalAttributeSet::empty(),
            meter_type: Cell::new(Nullable::Null),
            point_of_delivery: RefCell::new(Nullable::Null),
            serial_number: RefCell::new(Nullable::Null),
            protocol_version: RefCell::new(Nullable::Null),
            power_threshold: Cell::new(Nullable::Null),
        }
    }

    /// Expose the optional `ProtocolVersion` attribute.
    pub const fn with_protocol_version(mut self) -> Self {
        self.enabled = self.enabled.enable(PROTOCOL_VERSION_IDX);
        self
    }

    /// Expose the optional `PowerThreshold` attribute and advertise the
    /// corresponding feature.
    pub const fn with_power_threshold(mut self) -> Self {
        self.enabled = self.enabled.enable(POWER_THRESHOLD_IDX);
        self
    }

    pub fn meter_type(&self) -> Nullable<MeterTypeEnum> {
        self.meter_type.get()
    }

    pub fn point_of_delivery(&self) -> Nullable<MeterString> {
        self.point_of_delivery.borrow().clone()
    }

    pub fn meter_serial_number(&self) -> Nullable<MeterString> {
        self.serial_number.borrow().clone()
    }

    pub fn protocol_version(&self) -> Nullable<MeterString> {
        self.protocol_version.borrow().clone()
    }

    pub fn power_threshold(&self) -> Nullable<PowerThresholdStruct> {
        self.power_threshold.get()
    }

    /// Set the meter type from a raw enum value.
    ///
    /// An unknown enum value is rejected with `InvalidArgument` before
    /// any state is touched.
    pub fn set_meter_type(
        &self,
        notify: &dyn ChangeNotify,
        value: Nullable<u8>,
    ) -> Result<(), Error> {
        let value = match value {
            Nullable::Null => Nullable::Null,
            Nullable::Some(raw) => Nullable::Some(
                MeterTypeEnum::from_repr(raw).ok_or(ErrorCode::InvalidArgument)?,
            ),
        };

        if self.meter_type.get() == value {
            return Ok(());
        }

        self.meter_type.set(value);
        self.state
            .data_changed(notify, AttributeId::MeterType as _);

        Ok(())
    }

    pub fn set_point_of_delivery(
        &self,
        notify: &dyn ChangeNotify,
        value: Nullable<&str>,
    ) -> Result<(), Error> {
        Self::set_string(
            &self.point_of_delivery,
            value,
            &self.state,
            notify,
            AttributeId::PointOfDelivery,
        )
    }

    pub fn set_meter_serial_number(
        &self,
        notify: &dyn ChangeNotify,
        value: Nullable<&str>,
    ) -> Result<(), Error> {
        Self::set_string(
            &self.serial_number,
            value,
            &self.state,
            notify,
            AttributeId::MeterSerialNumber,
        )
    }

    pub fn set_protocol_version(
        &self,
        notify: &dyn ChangeNotify,
        value: Nullable<&str>,
    ) -> Result<(), Error> {
        Self::set_string(
            &self.protocol_version,
            value,
            &self.state,
            notify,
            AttributeId::ProtocolVersion,
        )
    }

    /// Set the power threshold.
    ///
    /// The threshold source is validated against the known enum values
    /// before any state is touched.
    pub fn set_power_threshold(
        &self,
        notify: &dyn ChangeNotify,
        value: Nullable<PowerThresholdStruct>,
    ) -> Result<(), Error> {
        if let Nullable::Some(threshold) = &value {
            if let Nullable::Some(source) = threshold.source {
                PowerThresholdSourceEnum::from_repr(source)
                    .ok_or(ErrorCode::InvalidArgument)?;
            }
        }

        if self.power_threshold.get() == value {
            return Ok(());
        }

        self.power_threshold.set(value);
        self.state
            .data_changed(notify, AttributeId::PowerThreshold as _);

        Ok(())
    }

    // The shared validate -> compare -> commit -> notify path of the
    // string-valued setters. The capacity check precedes the copy.
    fn set_string(
        cell: &RefCell<Nullable<MeterString>>,
        value: Nullable<&str>,
        state: &ClusterState,
        notify: &dyn ChangeNotify,
        attr: AttributeId,
    ) -> Result<(), Error> {
        let value = match value {
            Nullable::Null => Nullable::Null,
            Nullable::Some(s) => {
                let mut owned = MeterString::new();
                owned
                    .push_str(s)
                    .map_err(|_| Error::new(ErrorCode::BufferTooSmall))?;

                Nullable::Some(owned)
            }
        };

        if *cell.borrow() == value {
            return Ok(());
        }

        *cell.borrow_mut() = value;
        state.data_changed(notify, attr as _);

        Ok(())
    }

    fn feature_map(&self) -> u32 {
        if self.enabled.contains(POWER_THRESHOLD_IDX) {
            FEATURE_POWER_THRESHOLD
        } else {
            0
        }
    }
}

impl ServerCluster for MeterIdCluster {
    fn path(&self) -> ClusterPath {
        self.state.path()
    }

    fn dataver(&self) -> u32 {
        self.state.dataver()
    }

    fn startup(&self, _ctx: &ClusterContext<'_>) -> Result<(), Error> {
        self.state.startup()
    }

    fn shutdown(&self) {
        self.state.shutdown();
    }

    fn attributes(
        &self,
        _ctx: &ClusterContext<'_>,
        builder: &mut ListBuilder<'_, AttributeEntry>,
    ) -> Result<(), Error> {
        AttrListBuilder::new(builder)
            .mandatory(MANDATORY_ATTRIBUTES)?
            .optional(OPTIONAL_ATTRIBUTES, self.enabled)?
            .finish()
    }

    fn accepted_commands(
        &self,
        _ctx: &ClusterContext<'_>,
        _builder: &mut ListBuilder<'_, AcceptedCommandEntry>,
    ) -> Result<(), Error> {
        Ok(())
    }

    fn read(
        &self,
        _ctx: &ClusterContext<'_>,
        req: &AttrDetails,
        encoder: AttrValueEncoder<'_, '_>,
    ) -> Result<(), Error> {
        let Some(writer) = encoder.with_dataver(self.dataver())? else {
            return Ok(());
        };

        if req.attr_id == GlobalAttr::FeatureMap as u32 {
            return writer.set(self.feature_map());
        }

        if req.attr_id == GlobalAttr::ClusterRevision as u32 {
            return writer.set(CLUSTER_REVISION);
        }

        match req.attr_id.try_into()? {
            AttributeId::MeterType => {
                writer.set(self.meter_type.get().map(|meter_type| meter_type as u8))
            }
            AttributeId::PointOfDelivery => {
                let value = self.point_of_delivery.borrow();
                writer.set(value.as_ref().map(|s| s.as_str()))
            }
            AttributeId::MeterSerialNumber => {
                let value = self.serial_number.borrow();
                writer.set(value.as_ref().map(|s| s.as_str()))
            }
            AttributeId::ProtocolVersion => {
                if !self.enabled.contains(PROTOCOL_VERSION_IDX) {
                    return Err(ErrorCode::AttributeNotFound.into());
                }

                let value = self.protocol_version.borrow();
                writer.set(value.as_ref().map(|s| s.as_str()))
            }
            AttributeId::PowerThreshold => {
                if !self.enabled.contains(POWER_THRESHOLD_IDX) {
                    return Err(ErrorCode::AttributeNotFound.into());
                }

                writer.set(self.power_threshold.get())
            }
        }
    }
}
