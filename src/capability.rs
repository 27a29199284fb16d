// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};
use std::fmt;

/// A device control surface exposed by the vendor firmware.
///
/// The discriminant is the bit position used by raw capability masks, so the
/// order of this enum is part of the override format and must not change.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum Attribute {
    MailLed = 0,
    Wireless = 1,
    Bluetooth = 2,
    Brightness = 3,
    Wwan = 4,
    SetFunctionMode = 5,
    KbdDock = 6,
    TurboOverclock = 7,
    TurboLed = 8,
    TurboFan = 9,
    PlatformProfile = 10,
    FanSpeedRead = 11,
    GamingKbBacklight = 12,
    GamingKbBacklightStatic = 13,
}

impl Attribute {
    pub const ALL: [Attribute; 14] = [
        Attribute::MailLed,
        Attribute::Wireless,
        Attribute::Bluetooth,
        Attribute::Brightness,
        Attribute::Wwan,
        Attribute::SetFunctionMode,
        Attribute::KbdDock,
        Attribute::TurboOverclock,
        Attribute::TurboLed,
        Attribute::TurboFan,
        Attribute::PlatformProfile,
        Attribute::FanSpeedRead,
        Attribute::GamingKbBacklight,
        Attribute::GamingKbBacklightStatic,
    ];

    pub const RADIOS: [Attribute; 3] = [Attribute::Wireless, Attribute::Bluetooth, Attribute::Wwan];

    pub const fn bit(self) -> u32 { 1 << self as u32 }

    pub fn is_radio(self) -> bool {
        matches!(self, Attribute::Wireless | Attribute::Bluetooth | Attribute::Wwan)
    }

    pub fn name(self) -> &'static str {
        match self {
            Attribute::MailLed => "mail-led",
            Attribute::Wireless => "wireless",
            Attribute::Bluetooth => "bluetooth",
            Attribute::Brightness => "brightness",
            Attribute::Wwan => "wwan",
            Attribute::SetFunctionMode => "set-function-mode",
            Attribute::KbdDock => "kbd-dock",
            Attribute::TurboOverclock => "turbo-overclock",
            Attribute::TurboLed => "turbo-led",
            Attribute::TurboFan => "turbo-fan",
            Attribute::PlatformProfile => "platform-profile",
            Attribute::FanSpeedRead => "fan-speed-read",
            Attribute::GamingKbBacklight => "gaming-kb-backlight",
            Attribute::GamingKbBacklightStatic => "gaming-kb-backlight-static",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { f.write_str(self.name()) }
}

const ALL_BITS: u32 = (1 << Attribute::ALL.len()) - 1;

/// The set of attributes present on this machine.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Capabilities(u32);

impl Capabilities {
    pub const fn empty() -> Self { Capabilities(0) }

    /// Bits that do not name an attribute are discarded.
    pub const fn from_bits(bits: u32) -> Self { Capabilities(bits & ALL_BITS) }

    pub const fn bits(self) -> u32 { self.0 }

    pub const fn is_empty(self) -> bool { self.0 == 0 }

    pub const fn supports(self, attribute: Attribute) -> bool { self.0 & attribute.bit() != 0 }

    pub fn insert(&mut self, attribute: Attribute) { self.0 |= attribute.bit(); }

    pub fn remove(&mut self, attribute: Attribute) { self.0 &= !attribute.bit(); }

    #[must_use]
    pub const fn union(self, other: Capabilities) -> Self { Capabilities(self.0 | other.0) }

    pub fn any_radio(self) -> bool { Attribute::RADIOS.iter().any(|&radio| self.supports(radio)) }

    pub fn iter(self) -> impl Iterator<Item = Attribute> {
        Attribute::ALL.into_iter().filter(move |&attribute| self.supports(attribute))
    }
}

impl FromIterator<Attribute> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        let mut caps = Capabilities::empty();
        for attribute in iter {
            caps.insert(attribute);
        }
        caps
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for attribute in self.iter() {
            if !first {
                f.write_str(",")?;
            }
            first = false;
            f.write_str(attribute.name())?;
        }
        Ok(())
    }
}

/// Collects capability bits from firmware discovery and quirk data.
///
/// A forced mask, when present, is the final answer and nothing else is
/// consulted.
#[derive(Debug, Default)]
pub struct CapabilityBuilder {
    discovered: Capabilities,
    quirks:     Capabilities,
    withheld:   Capabilities,
    forced:     Option<Capabilities>,
}

impl CapabilityBuilder {
    pub fn new() -> Self { Self::default() }

    /// An attribute reported by the firmware itself.
    pub fn discover(&mut self, attribute: Attribute) -> &mut Self {
        self.discovered.insert(attribute);
        self
    }

    /// Attributes statically known for this model family.
    pub fn quirks(&mut self, caps: Capabilities) -> &mut Self {
        self.quirks = self.quirks.union(caps);
        self
    }

    /// Hide an attribute that another subsystem owns on this machine.
    pub fn withhold(&mut self, attribute: Attribute) -> &mut Self {
        self.withheld.insert(attribute);
        self
    }

    pub fn force(&mut self, mask: Option<u32>) -> &mut Self {
        if let Some(mask) = mask {
            self.forced = Some(Capabilities::from_bits(mask));
        }
        self
    }

    pub fn discovered(&self) -> Capabilities { self.discovered }

    pub fn build(&self) -> Capabilities {
        if let Some(forced) = self.forced {
            return forced;
        }

        Capabilities(self.discovered.union(self.quirks).0 & !self.withheld.0)
    }
}
