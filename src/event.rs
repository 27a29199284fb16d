// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

//! Firmware notification decoding and routing.

use crate::{
    accessor::{device_status, device_status::DockMode, Accessor},
    capability::Attribute,
    errors::{DecodeError, Error, UnknownCode},
    firmware::{le_u16, FirmwareObject},
    keymap::{self, Key, KeyEntry, KeyEvent},
    notify::{Listeners, RadioChange},
    thermal::ThermalController,
};
use serde::Serialize;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

pub const HOTKEY_EVENT: u8 = 0x1;
pub const ACCEL_OR_KBD_DOCK_EVENT: u8 = 0x5;
pub const GAMING_TURBO_KEY_EVENT: u8 = 0x7;

/// The fixed 8-byte notification payload.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct EventRecord {
    pub function:       u8,
    pub key_num:        u8,
    pub device_state:   u16,
    pub reserved1:      u16,
    pub kbd_dock_state: u8,
    pub reserved2:      u8,
}

impl EventRecord {
    pub const LEN: usize = 8;

    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != Self::LEN {
            return Err(DecodeError::Length(bytes.len()));
        }

        Ok(EventRecord {
            function:       bytes[0],
            key_num:        bytes[1],
            device_state:   le_u16(&bytes[2..4]),
            reserved1:      le_u16(&bytes[4..6]),
            kbd_dock_state: bytes[6],
            reserved2:      bytes[7],
        })
    }

    pub fn decode(object: Option<FirmwareObject>) -> Result<Self, DecodeError> {
        match object {
            None => Err(DecodeError::Missing),
            Some(FirmwareObject::Buffer(bytes)) => Self::parse(&bytes),
            Some(_) => Err(DecodeError::NotBuffer),
        }
    }

    pub fn encode(&self) -> [u8; 8] {
        let [s0, s1] = self.device_state.to_le_bytes();
        let [r0, r1] = self.reserved1.to_le_bytes();
        [self.function, self.key_num, s0, s1, r0, r1, self.kbd_dock_state, self.reserved2]
    }

    pub fn classify(&self) -> Result<Event, UnknownCode> {
        let device_state = self.device_state;
        match (self.function, self.key_num) {
            (HOTKEY_EVENT, key_num) => Ok(Event::Hotkey { key_num, device_state }),
            (ACCEL_OR_KBD_DOCK_EVENT, _) => {
                Ok(Event::AccelOrDock { kbd_dock_state: self.kbd_dock_state })
            }
            (GAMING_TURBO_KEY_EVENT, 1) => Ok(Event::MacroBank { device_state }),
            (GAMING_TURBO_KEY_EVENT, 2) => Ok(Event::MacroKey { device_state }),
            (GAMING_TURBO_KEY_EVENT, 4) => Ok(Event::TurboToggle),
            (GAMING_TURBO_KEY_EVENT, 5) => Ok(Event::ProfileCycle),
            (GAMING_TURBO_KEY_EVENT, key_num) => Err(UnknownCode::GamingEvent(key_num)),
            (function, _) => Err(UnknownCode::Function(function)),
        }
    }
}

/// What a notification asks for.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Event {
    Hotkey { key_num: u8, device_state: u16 },
    AccelOrDock { kbd_dock_state: u8 },
    MacroBank { device_state: u16 },
    MacroKey { device_state: u16 },
    TurboToggle,
    ProfileCycle,
}

/// A hotkey after keymap lookup.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Hotkey {
    pub entry: KeyEntry,
    /// The key reported to listeners, if any.
    pub event: Option<KeyEvent>,
}

/// Look up a hotkey. Touchpad toggles resolve to an explicit on or off key
/// chosen from the touchpad bit of `device_state`.
pub fn resolve_hotkey(key_num: u8, device_state: u16) -> Result<Hotkey, UnknownCode> {
    let entry = keymap::lookup(u16::from(key_num)).ok_or(UnknownCode::Key(u16::from(key_num)))?;

    let scancode = if entry.key() == Key::TouchpadToggle {
        if device_state & device_status::TOUCHPAD != 0 {
            keymap::TOUCHPAD_ON
        } else {
            keymap::TOUCHPAD_OFF
        }
    } else {
        u16::from(key_num)
    };

    let event = match keymap::lookup(scancode) {
        Some(KeyEntry::Key(key)) => Some(KeyEvent { scancode, key }),
        _ => None,
    };

    Ok(Hotkey { entry, event })
}

/// Applies decoded notifications. Every failure is logged here and never
/// leaves the router.
pub struct Router {
    accessor:        Arc<Accessor>,
    thermal:         Arc<ThermalController>,
    listeners:       Arc<Listeners>,
    decode_failures: AtomicU64,
}

impl Router {
    pub fn new(
        accessor: Arc<Accessor>,
        thermal: Arc<ThermalController>,
        listeners: Arc<Listeners>,
    ) -> Self {
        Router { accessor, thermal, listeners, decode_failures: AtomicU64::new(0) }
    }

    pub fn decode_failures(&self) -> u64 { self.decode_failures.load(Ordering::Relaxed) }

    /// Decode a raw payload, counting and logging failures.
    pub fn decode(&self, object: Option<FirmwareObject>) -> Option<EventRecord> {
        match EventRecord::decode(object) {
            Ok(record) => Some(record),
            Err(why) => {
                self.decode_failures.fetch_add(1, Ordering::Relaxed);
                log::warn!("{}", Error::Decode(why));
                None
            }
        }
    }

    /// Decode and dispatch on the calling thread.
    pub fn handle(&self, object: Option<FirmwareObject>) {
        if let Some(record) = self.decode(object) {
            self.dispatch(record);
        }
    }

    pub fn dispatch(&self, record: EventRecord) {
        let event = match record.classify() {
            Ok(event) => event,
            Err(why) => {
                log::warn!("{} (key {:#04x})", why, record.key_num);
                return;
            }
        };

        log::debug!("event {:?}", event);

        match event {
            Event::Hotkey { key_num, device_state } => self.hotkey(key_num, device_state),
            Event::AccelOrDock { kbd_dock_state } => {
                self.accelerometer();
                self.dock(kbd_dock_state);
            }
            Event::MacroBank { device_state } => {
                if let Err(why) = self.thermal.select_macro_bank(device_state) {
                    log::warn!("{}; only banks 1 to 3 are known", why);
                }
            }
            Event::MacroKey { device_state } => match self.thermal.macro_scancode(device_state) {
                Ok(scancode) => match keymap::lookup(scancode) {
                    Some(KeyEntry::Key(key)) => self.listeners.key_event(KeyEvent { scancode, key }),
                    _ => log::warn!("{}", UnknownCode::Key(scancode)),
                },
                Err(why) => log::warn!("{}; only keys 1 to 5 are known", why),
            },
            Event::TurboToggle => {
                self.thermal.toggle_turbo();
            }
            Event::ProfileCycle => {
                if !self.accessor.supports(Attribute::PlatformProfile) {
                    return;
                }
                match self.thermal.cycle() {
                    Ok(profile) => self.listeners.profile_changed(profile),
                    Err(why @ Error::Unsupported(_)) => log::debug!("profile cycle: {}", why),
                    Err(why) => log::warn!("profile cycle: {}", why),
                }
            }
        }
    }

    fn hotkey(&self, key_num: u8, device_state: u16) {
        log::debug!("device state: {:#x}", device_state);

        let hotkey = match resolve_hotkey(key_num, device_state) {
            Ok(hotkey) => hotkey,
            Err(why) => {
                log::warn!("{}", why);
                return;
            }
        };

        if hotkey.entry.key().is_radio() {
            for radio in Attribute::RADIOS {
                let Some(bit) = device_status::device_bit(radio) else { continue };
                let enabled = device_state & bit != 0;
                if self.accessor.record_radio(radio, enabled) {
                    self.listeners.radio_state_changed(RadioChange {
                        attribute: radio,
                        enabled,
                        hardware: false,
                    });
                }
            }
        }

        if let Some(event) = hotkey.event {
            self.listeners.key_event(event);
        }
    }

    fn accelerometer(&self) {
        match self.accessor.firmware().accelerometer_sample() {
            Ok(sample) => self.listeners.accelerometer_sample(sample),
            Err(why) => log::debug!("accelerometer: {}", why),
        }
    }

    fn dock(&self, kbd_dock_state: u8) {
        if !self.accessor.supports(Attribute::KbdDock) {
            return;
        }

        self.listeners.tablet_mode_changed(DockMode::classify_lenient(kbd_dock_state));
    }
}
