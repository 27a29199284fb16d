// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

//! Register-level access for the oldest interface.

use crate::{
    capability::{Attribute, CapabilityBuilder},
    errors::{Error, Result, TransportError},
    firmware::{le_u32, Device, Firmware, FirmwareObject},
    quirks::QuirkRecord,
};

const METHOD: u32 = 1;

const WRITE: u32 = 0x9610;
const FIND_MAILLED: u32 = 0x86;

const MAILLED_MASK: u32 = 0x31;
const WIRELESS_MASK: u32 = 0x35;
const BLUETOOTH_MASK: u32 = 0x34;

const BRIGHTNESS_REGISTER: u8 = 0x83;

/// Input block: four little-endian registers.
#[derive(Clone, Copy, Debug, Default)]
struct Registers {
    eax: u32,
    ebx: u32,
    ecx: u32,
    edx: u32,
}

impl Registers {
    fn encode(self) -> [u8; 16] {
        let mut out = [0; 16];
        out[0..4].copy_from_slice(&self.eax.to_le_bytes());
        out[4..8].copy_from_slice(&self.ebx.to_le_bytes());
        out[8..12].copy_from_slice(&self.ecx.to_le_bytes());
        out[12..16].copy_from_slice(&self.edx.to_le_bytes());
        out
    }
}

/// Output block: five little-endian registers.
#[derive(Clone, Copy, Debug)]
struct Response {
    eax: u32,
    eex: u32,
}

fn execute(firmware: &dyn Firmware, args: Registers) -> Result<Option<FirmwareObject>, TransportError> {
    firmware.invoke(Device::Legacy, METHOD, &args.encode())
}

fn query(firmware: &dyn Firmware, args: Registers) -> Result<Response, TransportError> {
    let raw = FirmwareObject::into_array::<20>(execute(firmware, args)?, "20 byte register block")?;
    Ok(Response { eax: le_u32(&raw[0..4]), eex: le_u32(&raw[16..20]) })
}

/// A single bit of an embedded-controller register.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct EcBit {
    register: u8,
    shift:    u8,
}

impl EcBit {
    const fn new(register: u8, shift: u8) -> Self { EcBit { register, shift } }

    fn read(self, firmware: &dyn Firmware) -> Result<u64, TransportError> {
        firmware.ec_read(self.register).map(|value| u64::from((value >> self.shift) & 1))
    }
}

#[derive(Clone, Debug)]
pub struct LegacyDirect {
    quirks:         QuirkRecord,
    max_brightness: u8,
}

impl LegacyDirect {
    pub fn new(quirks: QuirkRecord, max_brightness: u8) -> Self {
        LegacyDirect { quirks, max_brightness }
    }

    fn state_bit(&self, attribute: Attribute) -> Option<EcBit> {
        match attribute {
            Attribute::MailLed => Some(EcBit::new(0xA, 7)),
            Attribute::Wireless => Some(match self.quirks.wireless {
                1 => EcBit::new(0x7B, 0),
                2 => EcBit::new(0x71, 0),
                3 => EcBit::new(0x78, 0),
                _ => EcBit::new(0xA, 2),
            }),
            Attribute::Bluetooth => Some(EcBit::new(0xA, 4)),
            _ => None,
        }
    }

    pub fn get(&self, firmware: &dyn Firmware, attribute: Attribute) -> Result<u64> {
        if attribute == Attribute::Brightness {
            return Ok(u64::from(firmware.ec_read(BRIGHTNESS_REGISTER)?));
        }

        let bit = self.state_bit(attribute).ok_or(Error::Unsupported(attribute))?;
        Ok(bit.read(firmware)?)
    }

    pub fn set(&self, firmware: &dyn Firmware, attribute: Attribute, value: u64) -> Result<()> {
        let mask = match attribute {
            Attribute::MailLed => MAILLED_MASK,
            Attribute::Wireless => WIRELESS_MASK,
            Attribute::Bluetooth => BLUETOOTH_MASK,
            Attribute::Brightness => {
                let max = u64::from(self.max_brightness);
                if value > max {
                    return Err(Error::BadParameter { attribute, value, max });
                }
                return Ok(firmware.ec_write(BRIGHTNESS_REGISTER, value as u8)?);
            }
            _ => return Err(Error::Unsupported(attribute)),
        };

        if value > 1 {
            return Err(Error::BadParameter { attribute, value, max: 1 });
        }

        let args = Registers {
            eax: WRITE,
            ebx: (if value == 1 { 1 << 8 } else { 0 }) | mask,
            ..Registers::default()
        };

        execute(firmware, args)?;
        Ok(())
    }
}

/// Probe which controls exist.
///
/// `quirk_known` and `foreign_rfkill` only matter on machines exposing the
/// alternate legacy block, where the probe commands are unreliable.
pub fn discover(
    firmware: &dyn Firmware,
    quirks: &QuirkRecord,
    quirk_known: bool,
    foreign_rfkill: bool,
    caps: &mut CapabilityBuilder,
) -> Result<(), TransportError> {
    if firmware.has_device(Device::LegacyAlternate) {
        if quirk_known || !foreign_rfkill {
            caps.discover(Attribute::Wireless);
        }
        return Ok(());
    }

    let wireless =
        query(firmware, Registers { eax: WRITE, ebx: (0xa2 << 8) | WIRELESS_MASK, ..Registers::default() })?;
    if wireless.eax & 1 != 0 {
        caps.discover(Attribute::Wireless);
    }

    let bluetooth =
        query(firmware, Registers { eax: WRITE, ebx: (2 << 8) | BLUETOOTH_MASK, ..Registers::default() })?;
    if bluetooth.eax & 1 != 0 {
        caps.discover(Attribute::Bluetooth);
    }

    // Wistron based machines share this register.
    if quirks.brightness >= 0 {
        caps.discover(Attribute::Brightness);
    }

    Ok(())
}

pub fn find_mail_led(firmware: &dyn Firmware) -> Result<bool, TransportError> {
    let ret = query(firmware, Registers { eax: FIND_MAILLED, ..Registers::default() })?;
    Ok(ret.eex & 1 != 0)
}
