// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

//! Gaming methods: turbo indicators, fan behavior, misc settings and keyboard
//! lighting.

use crate::{
    capability::Attribute,
    errors::{Error, Result, TransportError},
    firmware::{Device, Firmware, FirmwareObject},
};

const SET_LED: u32 = 2;
const GET_LED: u32 = 4;
const GET_SYS_INFO: u32 = 5;
const SET_STATIC_LED: u32 = 6;
const SET_FAN_BEHAVIOR: u32 = 14;
const SET_KB_BACKLIGHT: u32 = 20;
const SET_MISC_SETTING: u32 = 22;
const GET_MISC_SETTING: u32 = 23;

pub const KB_BACKLIGHT_LEN: usize = 16;
pub const KB_BACKLIGHT_STATIC_LEN: usize = 4;

const SYS_INFO_BATTERY_STATUS: u64 = 0x02;
const FAN_SPEED_SHIFT: u32 = 8;
const FAN_SPEED_MASK: u64 = 0x1FFF;

/// Misc-setting indices. Words are `index | value << 8`; results carry a
/// status byte in bits 7:0 followed by the value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum MiscSetting {
    Overclock1 = 0x05,
    Overclock2 = 0x07,
    SupportedProfiles = 0x0A,
    PlatformProfile = 0x0B,
}

impl MiscSetting {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0x05 => Some(MiscSetting::Overclock1),
            0x07 => Some(MiscSetting::Overclock2),
            0x0A => Some(MiscSetting::SupportedProfiles),
            0x0B => Some(MiscSetting::PlatformProfile),
            _ => None,
        }
    }

    pub const fn word(self, value: u8) -> u64 { self as u64 | (value as u64) << 8 }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Fan {
    Cpu,
    Gpu,
}

impl Fan {
    const fn sys_info_command(self) -> u64 {
        match self {
            Fan::Cpu => 0x0201,
            Fan::Gpu => 0x0601,
        }
    }
}

fn execute(firmware: &dyn Firmware, method: u32, input: u64) -> Result<Option<FirmwareObject>, TransportError> {
    firmware.invoke(Device::Gaming, method, &input.to_le_bytes())
}

fn query(firmware: &dyn Firmware, method: u32, input: u64) -> Result<u64, TransportError> {
    FirmwareObject::into_u64(execute(firmware, method, input)?)
}

fn status(result: u64) -> Result<u8, TransportError> {
    match result as u8 {
        0 => Ok((result >> 8) as u8),
        error => Err(TransportError::Rejected { error, ec: 0 }),
    }
}

pub fn get_misc(firmware: &dyn Firmware, setting: MiscSetting) -> Result<u8, TransportError> {
    let input = u32::from(setting as u8);
    let result =
        FirmwareObject::into_u64(firmware.invoke(Device::Gaming, GET_MISC_SETTING, &input.to_le_bytes())?)?;
    status(result)
}

/// Write a raw misc-setting word and check the returned status.
pub fn set_misc_word(firmware: &dyn Firmware, word: u64) -> Result<(), TransportError> {
    status(query(firmware, SET_MISC_SETTING, word)?).map(|_| ())
}

pub fn fan_speed(firmware: &dyn Firmware, fan: Fan) -> Result<u64, TransportError> {
    let raw = query(firmware, GET_SYS_INFO, fan.sys_info_command())?;
    Ok((raw >> FAN_SPEED_SHIFT) & FAN_SPEED_MASK)
}

pub fn on_ac_power(firmware: &dyn Firmware) -> Result<bool, TransportError> {
    query(firmware, GET_SYS_INFO, SYS_INFO_BATTERY_STATUS).map(|status| status != 0)
}

/// Light all four keyboard zones. Some four-zone keyboards ignore the LED
/// method until system info has been queried once.
pub fn enable_keyboard_zones(firmware: &dyn Firmware) -> Result<(), TransportError> {
    if let Err(why) = query(firmware, GET_SYS_INFO, 0) {
        log::debug!("gaming system info: {}", why);
    }
    execute(firmware, SET_LED, 8 | (15 << 40))?;
    Ok(())
}

/// Read a gaming attribute. `TurboFan` and `PlatformProfile` are write-only
/// here: the profile is read back from the embedded controller by the thermal
/// controller, in a different unit from the misc word written.
pub fn get(firmware: &dyn Firmware, attribute: Attribute) -> Result<u64> {
    match attribute {
        Attribute::TurboLed => Ok(query(firmware, GET_LED, 1)?),
        Attribute::TurboOverclock => {
            let value = get_misc(firmware, MiscSetting::Overclock1)?;
            Ok(MiscSetting::Overclock1.word(value))
        }
        Attribute::FanSpeedRead => Ok(fan_speed(firmware, Fan::Cpu)?),
        _ => Err(Error::Unsupported(attribute)),
    }
}

pub fn set(firmware: &dyn Firmware, attribute: Attribute, value: u64) -> Result<()> {
    match attribute {
        Attribute::TurboLed => {
            execute(firmware, SET_LED, value)?;
        }
        Attribute::TurboFan => {
            execute(firmware, SET_FAN_BEHAVIOR, value)?;
        }
        Attribute::TurboOverclock => {
            let index = MiscSetting::from_index(value as u8);
            if !matches!(index, Some(MiscSetting::Overclock1) | Some(MiscSetting::Overclock2))
                || value > 0xFFFF
            {
                return Err(Error::BadParameter { attribute, value, max: 0xFFFF });
            }
            set_misc_word(firmware, value)?;
        }
        Attribute::PlatformProfile => {
            if MiscSetting::from_index(value as u8) != Some(MiscSetting::PlatformProfile)
                || value > 0xFFFF
            {
                return Err(Error::BadParameter { attribute, value, max: 0xFFFF });
            }
            set_misc_word(firmware, value)?;
        }
        _ => return Err(Error::Unsupported(attribute)),
    }

    Ok(())
}

pub fn set_byte_array(firmware: &dyn Firmware, attribute: Attribute, bytes: &[u8]) -> Result<()> {
    let (method, len) = match attribute {
        Attribute::GamingKbBacklight => (SET_KB_BACKLIGHT, KB_BACKLIGHT_LEN),
        Attribute::GamingKbBacklightStatic => (SET_STATIC_LED, KB_BACKLIGHT_STATIC_LEN),
        _ => return Err(Error::Unsupported(attribute)),
    };

    if bytes.len() != len {
        return Err(Error::BadParameter { attribute, value: bytes.len() as u64, max: len as u64 });
    }

    firmware.invoke(Device::Gaming, method, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misc_words() {
        assert_eq!(MiscSetting::Overclock1.word(2), 0x205);
        assert_eq!(MiscSetting::Overclock2.word(0), 0x7);
        assert_eq!(MiscSetting::PlatformProfile.word(6), 0x060B);
        assert_eq!(MiscSetting::from_index(0x0A), Some(MiscSetting::SupportedProfiles));
        assert_eq!(MiscSetting::from_index(0x06), None);
    }

    struct Silent;

    impl Firmware for Silent {
        fn has_device(&self, _: Device) -> bool { true }

        fn invoke(&self, _: Device, _: u32, _: &[u8]) -> Result<Option<FirmwareObject>, TransportError> {
            Err(TransportError::Status(0xDEAD))
        }

        fn query_block(&self, _: Device) -> Result<Option<FirmwareObject>, TransportError> {
            Err(TransportError::NotProvided)
        }

        fn ec_read(&self, _: u8) -> Result<u8, TransportError> { Err(TransportError::NotProvided) }

        fn ec_write(&self, _: u8, _: u8) -> Result<(), TransportError> { Err(TransportError::NotProvided) }

        fn subscribe(&self, _: Device, _: crate::firmware::EventCallback) -> Result<(), TransportError> {
            Err(TransportError::NotProvided)
        }

        fn unsubscribe(&self, _: Device) {}
    }

    #[test]
    fn write_only_attributes() {
        for attribute in [Attribute::PlatformProfile, Attribute::TurboFan] {
            assert!(matches!(get(&Silent, attribute), Err(Error::Unsupported(a)) if a == attribute));
        }
        assert!(matches!(get(&Silent, Attribute::TurboLed), Err(Error::Transport(_))));
    }

    #[test]
    fn profile_words_need_the_profile_index() {
        assert!(matches!(
            set(&Silent, Attribute::PlatformProfile, 0x0605),
            Err(Error::BadParameter { attribute: Attribute::PlatformProfile, .. })
        ));
    }

    #[test]
    fn status_byte() {
        assert_eq!(status(0x0300).ok(), Some(3));
        assert!(matches!(status(0x0301), Err(TransportError::Rejected { error: 1, ec: 0 })));
    }
}
