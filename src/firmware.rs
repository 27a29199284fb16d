// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

//! The firmware transport consumed by the rest of the crate.
//!
//! Implementations evaluate vendor methods on the host's management bus; the
//! crate only ever talks to firmware through [`Firmware`].

use crate::errors::TransportError;
use std::fmt;

/// Firmware objects published by the platform, named by role.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Device {
    /// Register-level method block of the oldest machines.
    Legacy,
    /// Companion block whose presence marks a legacy machine with a wireless switch.
    LegacyAlternate,
    /// Numbered get/set methods.
    Unified,
    /// Query block describing which radios exist.
    CapabilityBlock,
    /// Device-status and function-mode methods.
    DeviceStatus,
    /// Gaming methods: turbo, fans, keyboard lighting, misc settings.
    Gaming,
    /// Source of asynchronous notifications.
    Events,
}

impl Device {
    pub const ALL: [Device; 7] = [
        Device::Legacy,
        Device::LegacyAlternate,
        Device::Unified,
        Device::CapabilityBlock,
        Device::DeviceStatus,
        Device::Gaming,
        Device::Events,
    ];

    pub fn guid(self) -> &'static str {
        match self {
            Device::Legacy => "67C3371D-95A3-4C37-BB61-DD47B491DAAB",
            Device::LegacyAlternate => "431F16ED-0C2B-444C-B267-27DEB140CF9C",
            Device::Unified => "6AF4F258-B401-42FD-BE91-3D4AC2D7C0D3",
            Device::CapabilityBlock => "95764E09-FB56-4E83-B31A-37761F60994A",
            Device::DeviceStatus => "61EF69EA-865C-4BC3-A502-A0DEBA0CB531",
            Device::Gaming => "7A4DDFE7-5B5D-40B4-8595-4408E0CC7F56",
            Device::Events => "676AA15E-6A47-4D9F-A2CC-1E6D18D14026",
        }
    }

    pub fn from_guid(guid: &str) -> Option<Device> {
        Device::ALL.into_iter().find(|device| device.guid().eq_ignore_ascii_case(guid))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.guid())
    }
}

/// A value returned by a firmware method.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FirmwareObject {
    Buffer(Vec<u8>),
    Integer(u64),
    /// Packages, strings and anything else the crate never expects.
    Other,
}

impl FirmwareObject {
    fn describe(object: Option<&FirmwareObject>) -> String {
        match object {
            None => "nothing".into(),
            Some(FirmwareObject::Buffer(buf)) => format!("{}-byte buffer", buf.len()),
            Some(FirmwareObject::Integer(_)) => "integer".into(),
            Some(FirmwareObject::Other) => "non-buffer object".into(),
        }
    }

    /// A 32-bit result: a 4 or 8 byte buffer (low word used) or an integer.
    pub fn into_u32(object: Option<FirmwareObject>) -> Result<u32, TransportError> {
        match object {
            Some(FirmwareObject::Buffer(ref buf)) if buf.len() == 4 || buf.len() == 8 => {
                Ok(le_u32(buf))
            }
            Some(FirmwareObject::Integer(value)) => Ok(value as u32),
            other => Err(TransportError::Shape {
                expected: "4 or 8 byte buffer",
                found:    Self::describe(other.as_ref()),
            }),
        }
    }

    /// A 64-bit result: a 4 byte buffer, an 8 byte buffer or an integer.
    pub fn into_u64(object: Option<FirmwareObject>) -> Result<u64, TransportError> {
        match object {
            Some(FirmwareObject::Buffer(ref buf)) if buf.len() == 4 => Ok(u64::from(le_u32(buf))),
            Some(FirmwareObject::Buffer(ref buf)) if buf.len() == 8 => Ok(le_u64(buf)),
            Some(FirmwareObject::Integer(value)) => Ok(value),
            other => Err(TransportError::Shape {
                expected: "4 or 8 byte buffer",
                found:    Self::describe(other.as_ref()),
            }),
        }
    }

    /// A buffer of exactly `N` bytes.
    pub fn into_array<const N: usize>(
        object: Option<FirmwareObject>,
        expected: &'static str,
    ) -> Result<[u8; N], TransportError> {
        if let Some(FirmwareObject::Buffer(ref buf)) = object {
            if buf.len() == N {
                let mut out = [0; N];
                out.copy_from_slice(buf);
                return Ok(out);
            }
        }

        Err(TransportError::Shape { expected, found: Self::describe(object.as_ref()) })
    }
}

/// Receives raw notification payloads, or `None` when the platform failed to
/// fetch the event data.
pub type EventCallback = Box<dyn Fn(Option<FirmwareObject>) + Send + Sync>;

/// The black-box method transport and embedded-controller access.
///
/// Calls may block on the firmware round trip. Implementations must tolerate
/// being called from the notification callback thread and the refresh task at
/// the same time as a user request.
pub trait Firmware: Send + Sync {
    fn has_device(&self, device: Device) -> bool;

    /// Evaluate method `method` of `device` with a little-endian input buffer.
    fn invoke(
        &self,
        device: Device,
        method: u32,
        input: &[u8],
    ) -> Result<Option<FirmwareObject>, TransportError>;

    fn query_block(&self, device: Device) -> Result<Option<FirmwareObject>, TransportError>;

    fn ec_read(&self, register: u8) -> Result<u8, TransportError>;

    fn ec_write(&self, register: u8, value: u8) -> Result<(), TransportError>;

    /// Issue a command to the keyboard controller through the vendor method.
    fn kbc_command(&self, _param: u8, _command: u16) -> Result<(), TransportError> {
        Err(TransportError::NotProvided)
    }

    /// Read one sample from the lid accelerometer.
    fn accelerometer_sample(&self) -> Result<[i16; 3], TransportError> {
        Err(TransportError::NotProvided)
    }

    fn subscribe(&self, device: Device, callback: EventCallback) -> Result<(), TransportError>;

    fn unsubscribe(&self, device: Device);
}

pub(crate) fn le_u16(buf: &[u8]) -> u16 { u16::from_le_bytes([buf[0], buf[1]]) }

pub(crate) fn le_u32(buf: &[u8]) -> u32 { u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) }

pub(crate) fn le_u64(buf: &[u8]) -> u64 {
    u64::from_le_bytes([buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7]])
}
