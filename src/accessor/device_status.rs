// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

//! Device-status transactions and function-mode switching.

use crate::{
    capability::Attribute,
    errors::{Error, Result, TransportError, UnknownCode},
    firmware::{le_u16, Device, Firmware, FirmwareObject},
};
use serde::Serialize;

const SET_METHOD: u32 = 1;
const GET_METHOD: u32 = 2;

const FN_GET_DEVICE_STATUS: u8 = 0x1;
const FN_SET_DEVICE_STATUS: u8 = 0x2;
const FN_SET_FUNCTION_MODE: u8 = 0x1;
const FN_KBD_DOCK_STATE: u8 = 0x5;

pub const WIRELESS: u16 = 1 << 0;
pub const TOUCHPAD: u16 = 1 << 1;
pub const THREEG: u16 = 1 << 6;
pub const BLUETOOTH: u16 = 1 << 11;
pub const RFBTN: u16 = 1 << 14;

/// The device-status bit owned by a radio attribute.
pub fn device_bit(attribute: Attribute) -> Option<u16> {
    match attribute {
        Attribute::Wireless => Some(WIRELESS),
        Attribute::Bluetooth => Some(BLUETOOTH),
        Attribute::Wwan => Some(THREEG),
        _ => None,
    }
}

/// Set or clear `bit` in a device-status bitmask.
pub const fn apply(devices: u16, bit: u16, enabled: bool) -> u16 {
    if enabled {
        devices | bit
    } else {
        devices & !bit
    }
}

/// The OEM hotkey-function table published through SMBIOS type 0xAA.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct HotkeyFunctionTable {
    pub commun_func_bitmap:   u16,
    pub commun_fn_key_number: u8,
}

impl HotkeyFunctionTable {
    pub const TYPE: u8 = 0xAA;
    const LEN: usize = 15;

    /// Parse a raw SMBIOS structure, header included.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        if raw.len() < Self::LEN || raw[0] != Self::TYPE {
            return None;
        }

        Some(HotkeyFunctionTable {
            commun_func_bitmap:   le_u16(&raw[4..6]),
            commun_fn_key_number: raw[14],
        })
    }

    /// Radios advertised by the communication button.
    pub fn radios(&self) -> impl Iterator<Item = Attribute> + '_ {
        Attribute::RADIOS.into_iter().filter(move |&radio| {
            device_bit(radio).map_or(false, |bit| self.commun_func_bitmap & bit != 0)
        })
    }

    /// The bitmap used for device-status transactions, which never carries
    /// the RF button.
    pub fn transaction_bitmap(&self) -> u16 { self.commun_func_bitmap & !RFBTN }
}

/// Application modes toggled through the function-mode method.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FunctionMode {
    RfButton,
    LaunchManager,
    EcRaw,
}

impl FunctionMode {
    /// `(app_status, app_mask)`
    const fn app_bits(self) -> (u8, u8) {
        match self {
            FunctionMode::RfButton => (0x10, 0x10),
            FunctionMode::LaunchManager => (0x01, 0x01),
            FunctionMode::EcRaw => (0x00, 0x01),
        }
    }
}

/// Whether the detachable keyboard is attached in laptop position.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DockMode {
    Clamshell,
    Tablet,
}

impl DockMode {
    pub fn classify(state: u8) -> Result<DockMode, UnknownCode> {
        match state {
            0x01 => Ok(DockMode::Clamshell),
            0x04 | 0x40 => Ok(DockMode::Tablet),
            other => Err(UnknownCode::DockState(other)),
        }
    }

    /// Unrecognized states fall back to clamshell.
    pub fn classify_lenient(state: u8) -> DockMode {
        DockMode::classify(state).unwrap_or_else(|why| {
            log::warn!("{}", why);
            DockMode::Clamshell
        })
    }
}

fn check(error: u8, ec: u8) -> Result<(), TransportError> {
    if error != 0 || ec != 0 {
        return Err(TransportError::Rejected { error, ec });
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub struct DeviceStatus {
    hotkey: u8,
    bitmap: u16,
}

impl DeviceStatus {
    pub fn new(table: Option<&HotkeyFunctionTable>) -> Self {
        match table {
            Some(table) => {
                DeviceStatus { hotkey: table.commun_fn_key_number, bitmap: table.transaction_bitmap() }
            }
            None => DeviceStatus { hotkey: 0, bitmap: 0 },
        }
    }

    /// Read the current device-status bitmask restricted to `devices`.
    pub fn read(&self, firmware: &dyn Firmware, devices: u16) -> Result<u16, TransportError> {
        let [lo, hi] = devices.to_le_bytes();
        let input = [FN_GET_DEVICE_STATUS, self.hotkey, lo, hi];
        let out = FirmwareObject::into_array::<8>(
            firmware.invoke(Device::DeviceStatus, GET_METHOD, &input)?,
            "8 byte device status",
        )?;

        check(out[0], out[1])?;
        Ok(le_u16(&out[2..4]))
    }

    /// Write back a whole device-status bitmask.
    pub fn write(&self, firmware: &dyn Firmware, devices: u16) -> Result<(), TransportError> {
        let [lo, hi] = devices.to_le_bytes();
        let input = [FN_SET_DEVICE_STATUS, self.hotkey, lo, hi, 0];
        let out = FirmwareObject::into_array::<4>(
            firmware.invoke(Device::DeviceStatus, SET_METHOD, &input)?,
            "4 byte status",
        )?;

        check(out[0], out[1])
    }

    pub fn get(&self, firmware: &dyn Firmware, attribute: Attribute) -> Result<u64> {
        let bit = device_bit(attribute).ok_or(Error::Unsupported(attribute))?;
        let devices = self.read(firmware, bit)?;
        Ok(u64::from(devices & bit != 0))
    }

    /// Read the bitmask, flip one bit, write it back. A change made by
    /// firmware between the two calls is lost.
    pub fn set(&self, firmware: &dyn Firmware, attribute: Attribute, value: u64) -> Result<()> {
        let bit = device_bit(attribute).ok_or(Error::Unsupported(attribute))?;
        if value > 1 {
            return Err(Error::BadParameter { attribute, value, max: 1 });
        }

        let current = self.read(firmware, self.bitmap)?;
        let next = apply(current, bit, value == 1);
        log::debug!("device status {:#06x} -> {:#06x}", current, next);
        Ok(self.write(firmware, next)?)
    }
}

pub fn set_function_mode(firmware: &dyn Firmware, mode: FunctionMode) -> Result<(), TransportError> {
    let (app_status, app_mask) = mode.app_bits();
    let input = [FN_SET_FUNCTION_MODE, 0xFF, 0xFF, 0xFF, 0xFF, app_status, app_mask, 0];
    let out = FirmwareObject::into_array::<4>(
        firmware.invoke(Device::DeviceStatus, SET_METHOD, &input)?,
        "4 byte status",
    )?;

    if let Err(why) = check(out[0], out[1]) {
        log::warn!("enabling {:?} mode: {}", mode, why);
    }

    Ok(())
}

/// Ask firmware whether the keyboard dock is attached.
pub fn kbd_dock_state(firmware: &dyn Firmware) -> Result<DockMode, TransportError> {
    let input = [FN_KBD_DOCK_STATE, 0, 0, 0, 0, 0, 0, 0];
    let out = FirmwareObject::into_array::<8>(
        firmware.invoke(Device::DeviceStatus, GET_METHOD, &input)?,
        "8 byte dock state",
    )?;

    if out[0] != 0x00 || (out[3] != 0x05 && out[3] != 0x45) {
        return Err(TransportError::Shape {
            expected: "dock state report",
            found:    format!("[0]={:#04x} [3]={:#04x}", out[0], out[3]),
        });
    }

    Ok(DockMode::classify_lenient(out[4]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_bit_updates() {
        assert_eq!(apply(0b0001, WIRELESS, false), 0b0000);
        assert_eq!(apply(0b0000, BLUETOOTH, true), 0b1000_0000_0000);
        assert_eq!(apply(WIRELESS | THREEG, THREEG, true), WIRELESS | THREEG);
    }

    #[test]
    fn hotkey_table() {
        let mut raw = [0u8; 15];
        raw[0] = 0xAA;
        raw[1] = 15;
        raw[4..6].copy_from_slice(&(WIRELESS | BLUETOOTH | RFBTN).to_le_bytes());
        raw[14] = 0x03;

        let table = HotkeyFunctionTable::parse(&raw).unwrap();
        assert_eq!(table.commun_fn_key_number, 3);
        assert_eq!(table.transaction_bitmap(), WIRELESS | BLUETOOTH);
        assert_eq!(
            table.radios().collect::<Vec<_>>(),
            vec![Attribute::Wireless, Attribute::Bluetooth]
        );

        raw[0] = 0xAB;
        assert_eq!(HotkeyFunctionTable::parse(&raw), None);
        assert_eq!(HotkeyFunctionTable::parse(&[0xAA, 4, 0, 0]), None);
    }

    #[test]
    fn dock_states() {
        assert_eq!(DockMode::classify(0x01).ok(), Some(DockMode::Clamshell));
        assert_eq!(DockMode::classify(0x04).ok(), Some(DockMode::Tablet));
        assert_eq!(DockMode::classify(0x40).ok(), Some(DockMode::Tablet));
        assert!(DockMode::classify(0x02).is_err());
        assert_eq!(DockMode::classify_lenient(0x99), DockMode::Clamshell);
    }

    #[test]
    fn function_mode_bits() {
        assert_eq!(FunctionMode::RfButton.app_bits(), (0x10, 0x10));
        assert_eq!(FunctionMode::LaunchManager.app_bits(), (0x01, 0x01));
        assert_eq!(FunctionMode::EcRaw.app_bits(), (0x00, 0x01));
    }
}
