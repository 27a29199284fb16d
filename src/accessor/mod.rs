// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

//! Attribute reads and writes, routed to the calling convention selected at
//! probe time.

pub mod device_status;
pub mod gaming;
pub mod legacy;
pub mod unified;

use self::{
    device_status::{DeviceStatus, DockMode},
    legacy::LegacyDirect,
    unified::Unified,
};
use crate::{
    capability::{Attribute, Capabilities},
    errors::{Error, Result, TransportError},
    firmware::{Device, Firmware},
    interface::InterfaceVariant,
};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

/// The resolved encoding strategy for each interface generation.
#[derive(Clone, Debug)]
pub enum Convention {
    /// No calling convention was found.
    Absent,
    LegacyDirect(LegacyDirect),
    LegacyDirectV2 { legacy: LegacyDirect, unified: Unified },
    Unified(Unified),
    UnifiedV2 { status: DeviceStatus, unified: Option<Unified> },
    UnifiedGaming { status: DeviceStatus, unified: Option<Unified> },
}

impl Convention {
    pub fn variant(&self) -> Option<InterfaceVariant> {
        match self {
            Convention::Absent => None,
            Convention::LegacyDirect(_) => Some(InterfaceVariant::LegacyDirect),
            Convention::LegacyDirectV2 { .. } => Some(InterfaceVariant::LegacyDirectV2),
            Convention::Unified(_) => Some(InterfaceVariant::Unified),
            Convention::UnifiedV2 { .. } => Some(InterfaceVariant::UnifiedV2),
            Convention::UnifiedGaming { .. } => Some(InterfaceVariant::UnifiedGaming),
        }
    }

    fn device_status(&self) -> Option<&DeviceStatus> {
        match self {
            Convention::UnifiedV2 { status, .. } | Convention::UnifiedGaming { status, .. } => {
                Some(status)
            }
            _ => None,
        }
    }
}

fn is_gaming(attribute: Attribute) -> bool {
    matches!(
        attribute,
        Attribute::TurboLed
            | Attribute::TurboFan
            | Attribute::TurboOverclock
            | Attribute::PlatformProfile
            | Attribute::FanSpeedRead
            | Attribute::GamingKbBacklight
            | Attribute::GamingKbBacklightStatic
    )
}

fn unified_or_absent(unified: Option<&Unified>) -> Result<&Unified, TransportError> {
    unified.ok_or(TransportError::NoDevice(Device::Unified))
}

/// Last known on/off state of each radio. Advisory only; firmware stays the
/// source of truth.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct RadioState {
    pub wireless:  Option<bool>,
    pub bluetooth: Option<bool>,
    pub wwan:      Option<bool>,
}

impl RadioState {
    fn slot(&mut self, attribute: Attribute) -> Option<&mut Option<bool>> {
        match attribute {
            Attribute::Wireless => Some(&mut self.wireless),
            Attribute::Bluetooth => Some(&mut self.bluetooth),
            Attribute::Wwan => Some(&mut self.wwan),
            _ => None,
        }
    }

    pub fn get(&self, attribute: Attribute) -> Option<bool> {
        match attribute {
            Attribute::Wireless => self.wireless,
            Attribute::Bluetooth => self.bluetooth,
            Attribute::Wwan => self.wwan,
            _ => None,
        }
    }
}

/// The sole entry point for attribute access.
pub struct Accessor {
    firmware:   Arc<dyn Firmware>,
    caps:       Capabilities,
    convention: Convention,
    radios:     Mutex<RadioState>,
}

impl Accessor {
    pub fn new(firmware: Arc<dyn Firmware>, caps: Capabilities, convention: Convention) -> Self {
        Accessor { firmware, caps, convention, radios: Mutex::new(RadioState::default()) }
    }

    pub fn firmware(&self) -> &dyn Firmware { &*self.firmware }

    pub fn capabilities(&self) -> Capabilities { self.caps }

    pub fn convention(&self) -> &Convention { &self.convention }

    pub fn supports(&self, attribute: Attribute) -> bool { self.caps.supports(attribute) }

    fn radios(&self) -> MutexGuard<'_, RadioState> {
        self.radios.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read an attribute in the unit firmware reports it. `TurboFan` and
    /// `PlatformProfile` are write-only here; [`Accessor::set`] takes the raw
    /// fan-behavior and misc-setting words for them.
    pub fn get(&self, attribute: Attribute) -> Result<u64> {
        if !self.supports(attribute) {
            return Err(Error::Unsupported(attribute));
        }

        let fw = self.firmware();
        match (&self.convention, attribute) {
            (Convention::Absent, _) => Err(Error::Unsupported(attribute)),
            (_, Attribute::KbdDock) => Ok(u64::from(self.dock_mode()? == DockMode::Tablet)),
            (Convention::LegacyDirect(legacy), _) => legacy.get(fw, attribute),
            (Convention::LegacyDirectV2 { legacy, .. }, Attribute::MailLed) => legacy.get(fw, attribute),
            (Convention::LegacyDirectV2 { unified, .. }, _) => unified.get(fw, attribute),
            (Convention::Unified(unified), _) => unified.get(fw, attribute),
            (Convention::UnifiedGaming { .. }, _) if is_gaming(attribute) => gaming::get(fw, attribute),
            (Convention::UnifiedV2 { status, unified } | Convention::UnifiedGaming { status, unified }, _) => {
                if attribute.is_radio() {
                    status.get(fw, attribute)
                } else {
                    unified_or_absent(unified.as_ref())?.get(fw, attribute)
                }
            }
        }
    }

    pub fn set(&self, attribute: Attribute, value: u64) -> Result<()> {
        if !self.supports(attribute) {
            return Err(Error::Unsupported(attribute));
        }

        if attribute.is_radio() {
            let mut radios = self.radios();
            self.write(attribute, value)?;
            if let Some(slot) = radios.slot(attribute) {
                *slot = Some(value == 1);
            }
            return Ok(());
        }

        self.write(attribute, value)
    }

    fn write(&self, attribute: Attribute, value: u64) -> Result<()> {
        let fw = self.firmware();
        match (&self.convention, attribute) {
            (Convention::Absent, _) | (_, Attribute::KbdDock) | (_, Attribute::SetFunctionMode) => {
                Err(Error::Unsupported(attribute))
            }
            (Convention::LegacyDirect(legacy), _) => legacy.set(fw, attribute, value),
            (Convention::LegacyDirectV2 { legacy, .. }, Attribute::MailLed) => {
                legacy.set(fw, attribute, value)
            }
            // Some models need the legacy method as well before the radio really toggles.
            (Convention::LegacyDirectV2 { legacy, unified }, Attribute::Wireless | Attribute::Bluetooth) => {
                unified.set(fw, attribute, value)?;
                if let Err(why) = legacy.set(fw, attribute, value) {
                    log::warn!("legacy re-write of {}: {}", attribute, why);
                }
                Ok(())
            }
            (Convention::LegacyDirectV2 { unified, .. }, _) => unified.set(fw, attribute, value),
            (Convention::Unified(unified), _) => unified.set(fw, attribute, value),
            (Convention::UnifiedGaming { .. }, _) if is_gaming(attribute) => {
                gaming::set(fw, attribute, value)
            }
            (Convention::UnifiedV2 { status, unified } | Convention::UnifiedGaming { status, unified }, _) => {
                if attribute.is_radio() {
                    status.set(fw, attribute, value)
                } else {
                    unified_or_absent(unified.as_ref())?.set(fw, attribute, value)
                }
            }
        }
    }

    /// Write a fixed-length keyboard lighting configuration.
    pub fn set_byte_array(&self, attribute: Attribute, bytes: &[u8]) -> Result<()> {
        if !self.supports(attribute) {
            return Err(Error::Unsupported(attribute));
        }

        match self.convention {
            Convention::UnifiedGaming { .. } => gaming::set_byte_array(self.firmware(), attribute, bytes),
            _ => Err(Error::Unsupported(attribute)),
        }
    }

    /// Whether the detachable keyboard is docked. Only conventions with the
    /// device-status method can answer.
    pub fn dock_mode(&self) -> Result<DockMode> {
        if !self.supports(Attribute::KbdDock) || self.convention.device_status().is_none() {
            return Err(Error::Unsupported(Attribute::KbdDock));
        }

        Ok(device_status::kbd_dock_state(self.firmware())?)
    }

    /// Raw device-status bitmask read, for conventions that have one.
    pub fn device_status(&self, devices: u16) -> Option<Result<u16, TransportError>> {
        self.convention.device_status().map(|status| status.read(self.firmware(), devices))
    }

    pub fn radio_state(&self, attribute: Attribute) -> Option<bool> { self.radios().get(attribute) }

    pub fn radio_snapshot(&self) -> RadioState { *self.radios() }

    /// Record a radio state observed outside of [`Accessor::set`]. Returns
    /// whether the advisory state changed.
    pub fn record_radio(&self, attribute: Attribute, enabled: bool) -> bool {
        if !self.supports(attribute) {
            return false;
        }

        let mut radios = self.radios();
        match radios.slot(attribute) {
            Some(slot) if *slot != Some(enabled) => {
                *slot = Some(enabled);
                true
            }
            _ => false,
        }
    }
}
