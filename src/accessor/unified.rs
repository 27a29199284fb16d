// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

//! Numbered get/set methods taking a single 32-bit argument.

use crate::{
    capability::{Attribute, CapabilityBuilder},
    errors::{Error, Result, TransportError},
    firmware::{Device, Firmware, FirmwareObject},
};

/// Brightness ceiling when discovery reports the reduced range.
pub const REDUCED_MAX_BRIGHTNESS: u8 = 0x9;
pub const DEFAULT_MAX_BRIGHTNESS: u8 = 0xF;

const MAILLED_REGISTER: u8 = 0x9f;
const KBC_MAILLED_COMMAND: u16 = 0x1059;
const KBC_MAILLED_ON: u8 = 0x92;
const KBC_MAILLED_OFF: u8 = 0x93;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Methods {
    get: u32,
    set: u32,
}

fn methods(attribute: Attribute) -> Option<Methods> {
    match attribute {
        Attribute::Wireless => Some(Methods { get: 1, set: 4 }),
        Attribute::Bluetooth => Some(Methods { get: 2, set: 5 }),
        Attribute::Brightness => Some(Methods { get: 3, set: 6 }),
        Attribute::Wwan => Some(Methods { get: 10, set: 11 }),
        _ => None,
    }
}

fn execute(firmware: &dyn Firmware, method: u32, input: u32) -> Result<Option<FirmwareObject>, TransportError> {
    firmware.invoke(Device::Unified, method, &input.to_le_bytes())
}

#[derive(Clone, Debug)]
pub struct Unified {
    /// The mail LED sits behind the keyboard controller.
    kbc_mailled:    bool,
    max_brightness: u8,
}

impl Unified {
    pub fn new(kbc_mailled: bool, max_brightness: u8) -> Self { Unified { kbc_mailled, max_brightness } }

    pub fn get(&self, firmware: &dyn Firmware, attribute: Attribute) -> Result<u64> {
        if attribute == Attribute::MailLed && self.kbc_mailled {
            return Ok(u64::from(firmware.ec_read(MAILLED_REGISTER)? & 1));
        }

        let Methods { get, .. } = methods(attribute).ok_or(Error::Unsupported(attribute))?;
        let result = FirmwareObject::into_u32(execute(firmware, get, 0)?)?;
        Ok(u64::from(result as u8))
    }

    pub fn set(&self, firmware: &dyn Firmware, attribute: Attribute, value: u64) -> Result<()> {
        let max = match attribute {
            Attribute::Brightness => u64::from(self.max_brightness),
            Attribute::Wireless | Attribute::Bluetooth | Attribute::Wwan | Attribute::MailLed => 1,
            _ => return Err(Error::Unsupported(attribute)),
        };

        if value > max {
            return Err(Error::BadParameter { attribute, value, max });
        }

        if attribute == Attribute::MailLed {
            if !self.kbc_mailled {
                return Err(Error::Unsupported(attribute));
            }
            let param = if value == 1 { KBC_MAILLED_ON } else { KBC_MAILLED_OFF };
            return Ok(firmware.kbc_command(param, KBC_MAILLED_COMMAND)?);
        }

        let Methods { set, .. } = methods(attribute).ok_or(Error::Unsupported(attribute))?;
        execute(firmware, set, value as u32)?;
        Ok(())
    }
}

/// Read the capability query block, returning the brightness ceiling it
/// implies.
pub fn discover(firmware: &dyn Firmware, caps: &mut CapabilityBuilder) -> Result<u8, TransportError> {
    let devices = FirmwareObject::into_u32(firmware.query_block(Device::CapabilityBlock)?)?;
    log::info!("function bitmap for communication device: {:#x}", devices);

    if devices & 0x07 != 0 {
        caps.discover(Attribute::Wireless);
    }
    if devices & 0x40 != 0 {
        caps.discover(Attribute::Wwan);
    }
    if devices & 0x10 != 0 {
        caps.discover(Attribute::Bluetooth);
    }

    Ok(if devices & 0x20 == 0 { REDUCED_MAX_BRIGHTNESS } else { DEFAULT_MAX_BRIGHTNESS })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_numbers() {
        assert_eq!(methods(Attribute::Wireless), Some(Methods { get: 1, set: 4 }));
        assert_eq!(methods(Attribute::Wwan), Some(Methods { get: 10, set: 11 }));
        assert_eq!(methods(Attribute::TurboLed), None);
    }
}
