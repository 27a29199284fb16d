// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

//! Interface detection: which calling convention the firmware speaks and
//! which attributes it offers.

use crate::{
    accessor::{
        device_status::{DeviceStatus, HotkeyFunctionTable},
        legacy::{self, LegacyDirect},
        unified::{self, Unified, DEFAULT_MAX_BRIGHTNESS},
        Accessor, Convention,
    },
    capability::{Attribute, Capabilities, CapabilityBuilder},
    config::Config,
    errors::ProbeError,
    firmware::{Device, Firmware},
    quirks::{self, QuirkLookup, QuirkSelection},
};
use serde::Serialize;
use std::{fmt, sync::Arc};

/// Calling-convention generations, oldest first.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterfaceVariant {
    LegacyDirect,
    LegacyDirectV2,
    Unified,
    UnifiedV2,
    UnifiedGaming,
}

impl fmt::Display for InterfaceVariant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            InterfaceVariant::LegacyDirect => "legacy-direct",
            InterfaceVariant::LegacyDirectV2 => "legacy-direct-v2",
            InterfaceVariant::Unified => "unified",
            InterfaceVariant::UnifiedV2 => "unified-v2",
            InterfaceVariant::UnifiedGaming => "unified-gaming",
        })
    }
}

/// Facts about the machine supplied by the host.
#[derive(Clone, Debug, Default, Serialize)]
pub struct MachineIdentity {
    pub vendor:           String,
    pub model:            String,
    /// The OEM hotkey-function structure, when the SMBIOS tables carry one.
    pub hotkey_table:     Option<HotkeyFunctionTable>,
    /// Whether the vendor backlight interface is the one in use.
    pub vendor_backlight: bool,
    /// Whether another driver already owns the wireless kill switch.
    pub foreign_rfkill:   bool,
}

impl MachineIdentity {
    pub fn new<V: Into<String>, M: Into<String>>(vendor: V, model: M) -> Self {
        MachineIdentity {
            vendor: vendor.into(),
            model: model.into(),
            vendor_backlight: true,
            ..Default::default()
        }
    }
}

/// The outcome of a successful probe.
pub struct Interface {
    pub variant:        Option<InterfaceVariant>,
    pub quirks:         QuirkSelection,
    pub hotkey_table:   Option<HotkeyFunctionTable>,
    pub max_brightness: u8,
    pub accessor:       Accessor,
}

fn select_variant(firmware: &dyn Firmware) -> Option<InterfaceVariant> {
    let legacy = firmware.has_device(Device::Legacy);
    let unified = firmware.has_device(Device::Unified);

    if legacy && !unified {
        return Some(InterfaceVariant::LegacyDirect);
    }

    if firmware.has_device(Device::DeviceStatus) {
        return Some(if firmware.has_device(Device::Gaming) {
            InterfaceVariant::UnifiedGaming
        } else {
            InterfaceVariant::UnifiedV2
        });
    }

    match (legacy, unified) {
        (true, true) => Some(InterfaceVariant::LegacyDirectV2),
        (false, true) => Some(InterfaceVariant::Unified),
        _ => None,
    }
}

/// Detect the interface and build the capability set.
pub fn probe(
    firmware: Arc<dyn Firmware>,
    identity: &MachineIdentity,
    lookup: &dyn QuirkLookup,
    config: &Config,
) -> Result<Interface, ProbeError> {
    if quirks::is_blacklisted(&identity.vendor, &identity.model) {
        log::info!("blacklisted hardware detected, not loading");
        return Err(ProbeError::Blacklisted);
    }

    let selection = quirks::select(lookup, &identity.vendor, &identity.model, config);
    let fw = &*firmware;
    let has_legacy = fw.has_device(Device::Legacy);

    if has_legacy && !quirks::legacy_vendor_whitelisted(&identity.vendor) && !selection.known {
        log::debug!("unsupported machine exposes the legacy interface");
        return Err(ProbeError::UnsupportedMachine);
    }

    let Some(variant) = select_variant(fw) else {
        log::warn!("no supported interface found; every attribute is unsupported");
        return Ok(Interface {
            variant:        None,
            quirks:         selection,
            hotkey_table:   None,
            max_brightness: DEFAULT_MAX_BRIGHTNESS,
            accessor:       Accessor::new(firmware, Capabilities::empty(), Convention::Absent),
        });
    };

    let mut caps = CapabilityBuilder::new();
    let mut max_brightness = DEFAULT_MAX_BRIGHTNESS;
    let mut hotkey_table = None;

    if variant == InterfaceVariant::LegacyDirect {
        legacy::discover(fw, &selection.record, selection.known, identity.foreign_rfkill, &mut caps)
            .map_err(|why| {
                log::error!("unable to detect available legacy devices: {}", why);
                ProbeError::Discovery(why)
            })?;
    } else {
        hotkey_table = identity.hotkey_table;
        if let Some(ref table) = hotkey_table {
            log::info!("function bitmap for communication button: {:#x}", table.commun_func_bitmap);
            for radio in table.radios() {
                caps.discover(radio);
            }
        }

        if fw.has_device(Device::CapabilityBlock) {
            if hotkey_table.is_none() {
                max_brightness = unified::discover(fw, &mut caps).map_err(|why| {
                    log::error!("unable to detect available devices: {}", why);
                    ProbeError::Discovery(why)
                })?;
            }
            caps.discover(Attribute::Brightness);
        } else if hotkey_table.is_none() && selection.force_caps.is_none() {
            log::error!("no device detection method found");
            return Err(ProbeError::NoDetectionMethod);
        }
    }

    if has_legacy {
        match legacy::find_mail_led(fw) {
            Ok(true) => {
                caps.discover(Attribute::MailLed);
            }
            Ok(false) => (),
            Err(why) => log::debug!("mail LED discovery: {}", why),
        }
    }

    let record = selection.record;
    let unified = Unified::new(record.mailled == 1, max_brightness);
    let unified = fw.has_device(Device::Unified).then_some(unified);
    let status = DeviceStatus::new(hotkey_table.as_ref());
    let convention = match (variant, unified) {
        (InterfaceVariant::LegacyDirectV2, Some(unified)) => Convention::LegacyDirectV2 {
            legacy: LegacyDirect::new(record, max_brightness),
            unified,
        },
        (InterfaceVariant::Unified, Some(unified)) => Convention::Unified(unified),
        (InterfaceVariant::UnifiedV2, unified) => Convention::UnifiedV2 { status, unified },
        (InterfaceVariant::UnifiedGaming, unified) => Convention::UnifiedGaming { status, unified },
        _ => Convention::LegacyDirect(LegacyDirect::new(record, max_brightness)),
    };

    caps.quirks(selection.record.capabilities());

    if !identity.vendor_backlight {
        caps.withhold(Attribute::Brightness);
    }

    if fw.has_device(Device::DeviceStatus) {
        caps.discover(Attribute::SetFunctionMode);
        if fw.has_device(Device::Gaming) {
            caps.discover(Attribute::GamingKbBacklight).discover(Attribute::GamingKbBacklightStatic);
        }
    }

    caps.force(selection.force_caps);

    let built = caps.build();
    log::info!("{} interface with capabilities [{}]", variant, built);

    Ok(Interface {
        variant: Some(variant),
        quirks: selection,
        hotkey_table,
        max_brightness,
        accessor: Accessor::new(firmware, built, convention),
    })
}
