// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

mod common;

use acer_wmi::{
    config::Config,
    errors::{Error, ProbeError},
    firmware::Device,
    quirks::{QuirkMatch, QuirkRecord},
    Attribute, InterfaceVariant, MachineIdentity, Platform,
};
use common::{FakeFirmware, FixedLookup};
use std::sync::Arc;

fn probe(
    fw: &Arc<FakeFirmware>,
    identity: &MachineIdentity,
    found: Option<QuirkMatch>,
    config: Config,
) -> Result<Platform, ProbeError> {
    Platform::probe(fw.clone(), identity, &FixedLookup(found), config)
}

#[test]
fn blacklisted_machines_are_refused() {
    let fw = Arc::new(FakeFirmware::new(&[Device::Unified, Device::CapabilityBlock]));
    let identity = MachineIdentity::new("Acer", "AOA150");

    assert!(matches!(
        probe(&fw, &identity, None, Config::default()),
        Err(ProbeError::Blacklisted)
    ));
    assert!(fw.calls().is_empty());
}

#[test]
fn legacy_interface_needs_a_known_vendor() {
    let fw = Arc::new(FakeFirmware::new(&[Device::Legacy]));
    let identity = MachineIdentity::new("Some Vendor", "Some Model");

    assert!(matches!(
        probe(&fw, &identity, None, Config::default()),
        Err(ProbeError::UnsupportedMachine)
    ));

    // A quirk entry vouches for the machine.
    let known = Some(QuirkMatch::Record(&QuirkRecord::FUJITSU_AMILO_LI_1718));
    assert!(probe(&fw, &identity, known, Config::default()).is_ok());
}

#[test]
fn detection_method_or_forced_mask_required() {
    let fw = Arc::new(FakeFirmware::new(&[Device::Unified]));
    let identity = MachineIdentity::new("Acer", "Aspire 5750");

    assert!(matches!(
        probe(&fw, &identity, None, Config::default()),
        Err(ProbeError::NoDetectionMethod)
    ));

    let config = Config { force_caps: Some(Attribute::Brightness.bit()), ..Config::default() };
    let platform = probe(&fw, &identity, None, config).unwrap();
    assert_eq!(platform.variant(), Some(InterfaceVariant::Unified));
    assert_eq!(platform.capabilities().iter().collect::<Vec<_>>(), vec![Attribute::Brightness]);
}

#[test]
fn no_interface_means_nothing_is_supported() {
    let fw = Arc::new(FakeFirmware::new(&[]));
    let platform =
        probe(&fw, &MachineIdentity::new("Acer", "Aspire 5750"), None, Config::default()).unwrap();

    assert_eq!(platform.variant(), None);
    assert!(platform.capabilities().is_empty());

    for attribute in Attribute::ALL {
        assert!(matches!(platform.get(attribute), Err(Error::Unsupported(_))));
        assert!(matches!(platform.set(attribute, 0), Err(Error::Unsupported(_))));
    }
    assert!(fw.calls().is_empty());
}

#[test]
fn legacy_discovery() {
    let fw = Arc::new(FakeFirmware::new(&[Device::Legacy]));
    fw.set_legacy_devices(&[0x35], true);
    let found = Some(QuirkMatch::Record(&QuirkRecord::TRAVELMATE_2490));

    let platform =
        probe(&fw, &MachineIdentity::new("Acer", "TravelMate 2490"), found, Config::default())
            .unwrap();

    assert_eq!(platform.variant(), Some(InterfaceVariant::LegacyDirect));
    let caps = platform.capabilities();
    assert!(caps.supports(Attribute::Wireless));
    assert!(caps.supports(Attribute::MailLed));
    assert!(caps.supports(Attribute::Brightness));
    assert!(!caps.supports(Attribute::Bluetooth));
}

#[test]
fn legacy_brightness_quirk_adds_capability() {
    let fw = Arc::new(FakeFirmware::new(&[Device::Legacy]));
    let found = Some(QuirkMatch::Record(&QuirkRecord::ASPIRE_1520));

    let platform =
        probe(&fw, &MachineIdentity::new("Acer", "Aspire 1520"), found, Config::default()).unwrap();

    // Discovery skips the shared register, the quirk still declares it.
    assert!(platform.supports(Attribute::Brightness));
    assert!(!platform.supports(Attribute::Wireless));
}

#[test]
fn capability_block_discovery() {
    let fw = Arc::new(FakeFirmware::new(&[Device::Unified, Device::CapabilityBlock]));
    fw.set_capability_block(0x01 | 0x10 | 0x40);

    let platform =
        probe(&fw, &MachineIdentity::new("Acer", "Aspire 5750"), None, Config::default()).unwrap();

    let caps = platform.capabilities();
    assert_eq!(platform.variant(), Some(InterfaceVariant::Unified));
    assert!(caps.supports(Attribute::Wireless));
    assert!(caps.supports(Attribute::Bluetooth));
    assert!(caps.supports(Attribute::Wwan));
    assert!(caps.supports(Attribute::Brightness));
    assert!(!caps.supports(Attribute::MailLed));
}

#[test]
fn foreign_backlight_withholds_brightness() {
    let fw = Arc::new(FakeFirmware::new(&[Device::Unified, Device::CapabilityBlock]));
    let identity =
        MachineIdentity { vendor_backlight: false, ..MachineIdentity::new("Acer", "Aspire 5750") };

    let platform = probe(&fw, &identity, None, Config::default()).unwrap();
    assert!(!platform.supports(Attribute::Brightness));
}

#[test]
fn variant_selection() {
    let identity = common::gaming_identity();
    let cases: &[(&[Device], InterfaceVariant)] = &[
        (&[Device::Legacy, Device::Unified, Device::CapabilityBlock], InterfaceVariant::LegacyDirectV2),
        (&[Device::DeviceStatus, Device::CapabilityBlock], InterfaceVariant::UnifiedV2),
        (&[Device::DeviceStatus, Device::Gaming], InterfaceVariant::UnifiedGaming),
        (&[Device::Unified, Device::CapabilityBlock], InterfaceVariant::Unified),
    ];

    for &(devices, expected) in cases {
        let fw = Arc::new(FakeFirmware::new(devices));
        let platform = probe(&fw, &identity, None, Config::default()).unwrap();
        assert_eq!(platform.variant(), Some(expected), "{:?}", devices);
    }
}

#[test]
fn device_status_adds_function_mode_and_gaming_lighting() {
    let fw = Arc::new(FakeFirmware::gaming());
    let platform = common::gaming_platform(&fw);
    let caps = platform.capabilities();

    assert!(caps.supports(Attribute::SetFunctionMode));
    assert!(caps.supports(Attribute::GamingKbBacklight));
    assert!(caps.supports(Attribute::GamingKbBacklightStatic));
    assert!(caps.supports(Attribute::PlatformProfile));
    assert!(caps.supports(Attribute::TurboLed));
    // Radios come from the hotkey table.
    assert!(caps.supports(Attribute::Wwan));
}

#[test]
fn forced_mask_replaces_everything() {
    let fw = Arc::new(FakeFirmware::gaming());
    let config = Config { force_caps: Some(Attribute::KbdDock.bit()), ..Config::default() };

    let platform = probe(&fw, &common::gaming_identity(), None, config).unwrap();
    assert_eq!(platform.capabilities().iter().collect::<Vec<_>>(), vec![Attribute::KbdDock]);
}
