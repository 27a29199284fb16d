// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

//! Thermal profiles, the turbo toggle and the macro key bank.

use crate::{
    accessor::{
        gaming::{self, MiscSetting},
        Accessor,
    },
    capability::Attribute,
    errors::{Error, Result, UnknownCode},
    quirks::QuirkRecord,
};
use serde::{Deserialize, Serialize};
use self::ThermalProfile::{Balanced, Eco, Performance, Quiet, Turbo};
use std::{
    fmt,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

/// Performance profiles, in order of increasing performance.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ThermalProfile {
    Eco,
    Quiet,
    Balanced,
    Performance,
    Turbo,
}

impl ThermalProfile {
    pub const ALL: [ThermalProfile; 5] = [
        ThermalProfile::Eco,
        ThermalProfile::Quiet,
        ThermalProfile::Balanced,
        ThermalProfile::Performance,
        ThermalProfile::Turbo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ThermalProfile::Eco => "eco",
            ThermalProfile::Quiet => "quiet",
            ThermalProfile::Balanced => "balanced",
            ThermalProfile::Performance => "performance",
            ThermalProfile::Turbo => "turbo",
        }
    }
}

impl fmt::Display for ThermalProfile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for ThermalProfile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ThermalProfile::ALL
            .into_iter()
            .find(|profile| profile.name() == s)
            .ok_or_else(|| format!("unknown thermal profile '{}'", s))
    }
}

/// Firmware encodings of one profile.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ProfileCode {
    pub profile:    ThermalProfile,
    /// Value reported by the embedded controller.
    pub ec_code:    u8,
    /// Misc-setting word that selects the profile.
    pub write_word: u64,
}

/// Where the mode key goes from a given profile.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Next {
    To(ThermalProfile),
    LastNonTurbo,
}

#[derive(Clone, Copy, Debug)]
pub struct Transition {
    pub from:       ThermalProfile,
    pub on_battery: ThermalProfile,
    pub cycle:      ThermalProfile,
    pub toggle:     Next,
}

/// One generation of the thermal profile protocol.
#[derive(Debug)]
pub struct ThermalProtocol {
    pub name:        &'static str,
    pub ec_register: u8,
    pub codes:       &'static [ProfileCode],
    pub transitions: &'static [Transition],
}

const fn code(profile: ThermalProfile, ec_code: u8, value: u8) -> ProfileCode {
    ProfileCode { profile, ec_code, write_word: MiscSetting::PlatformProfile.word(value) }
}

const fn step(
    from: ThermalProfile,
    on_battery: ThermalProfile,
    cycle: ThermalProfile,
    toggle: Next,
) -> Transition {
    Transition { from, on_battery, cycle, toggle }
}

pub static PREDATOR_V4: ThermalProtocol = ThermalProtocol {
    name:        "predator-v4",
    ec_register: 0x54,
    codes:       &[
        code(Eco, 0x04, 0x06),
        code(Turbo, 0x03, 0x05),
        code(Performance, 0x02, 0x04),
        code(Quiet, 0x01, 0x00),
        code(Balanced, 0x00, 0x01),
    ],
    transitions: &[
        step(Turbo, Balanced, Eco, Next::LastNonTurbo),
        step(Performance, Balanced, Turbo, Next::To(Turbo)),
        step(Balanced, Eco, Performance, Next::To(Turbo)),
        step(Quiet, Balanced, Balanced, Next::To(Turbo)),
        step(Eco, Balanced, Quiet, Next::To(Turbo)),
    ],
};

impl ThermalProtocol {
    pub fn code(&self, profile: ThermalProfile) -> Option<&ProfileCode> {
        self.codes.iter().find(|code| code.profile == profile)
    }

    pub fn from_ec(&self, ec_code: u8) -> std::result::Result<ThermalProfile, UnknownCode> {
        self.codes
            .iter()
            .find(|code| code.ec_code == ec_code)
            .map(|code| code.profile)
            .ok_or(UnknownCode::Profile(ec_code))
    }

    /// Pick the profile the mode key switches to.
    pub fn next(
        &self,
        current: ThermalProfile,
        on_ac: bool,
        cycle_mode: bool,
        last_non_turbo: ThermalProfile,
    ) -> Option<ThermalProfile> {
        let transition = self.transitions.iter().find(|t| t.from == current)?;
        Some(if !on_ac {
            transition.on_battery
        } else if cycle_mode {
            transition.cycle
        } else {
            match transition.toggle {
                Next::To(profile) => profile,
                Next::LastNonTurbo => last_non_turbo,
            }
        })
    }

    /// Profiles named by a supported-profiles bitmask of EC codes, in order of
    /// increasing performance.
    pub fn supported(&self, mask: u8) -> Vec<ThermalProfile> {
        let mut profiles: Vec<ThermalProfile> = self
            .codes
            .iter()
            .filter(|code| code.ec_code < 8 && mask & (1 << code.ec_code) != 0)
            .map(|code| code.profile)
            .collect();
        profiles.sort();
        profiles
    }
}

/// `(max_perf, last_non_turbo)` for a set of supported profiles.
///
/// The last non-turbo profile is the fastest of eco, quiet and balanced, then
/// performance, then turbo when nothing else exists.
pub fn derive_defaults(supported: &[ThermalProfile]) -> Option<(ThermalProfile, ThermalProfile)> {
    let max_perf = supported.iter().copied().max()?;
    let last_non_turbo = supported
        .iter()
        .copied()
        .filter(|&profile| profile <= ThermalProfile::Balanced)
        .max()
        .or_else(|| supported.iter().copied().find(|&p| p == ThermalProfile::Performance))
        .unwrap_or(max_perf);
    Some((max_perf, last_non_turbo))
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[repr(u8)]
pub enum FanMode {
    Auto = 1,
    Turbo = 2,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct FanTopology {
    pub cpu: u8,
    pub gpu: u8,
}

impl From<&QuirkRecord> for FanTopology {
    fn from(quirks: &QuirkRecord) -> Self { FanTopology { cpu: quirks.cpu_fans, gpu: quirks.gpu_fans } }
}

/// Largest fan layout the fan-behavior word can describe.
pub const MAX_CPU_FANS: u8 = 1;
pub const MAX_GPU_FANS: u8 = 4;

/// Pack the fan-behavior word: the enable mask in bits 15:0 and the 2-bit
/// per-fan modes from bit 16.
pub fn pack_fan_mode(fans: FanTopology, mode: FanMode) -> Result<u64> {
    for (count, max) in [(fans.cpu, MAX_CPU_FANS), (fans.gpu, MAX_GPU_FANS)] {
        if count > max {
            return Err(Error::BadParameter {
                attribute: Attribute::TurboFan,
                value:     u64::from(count),
                max:       u64::from(max),
            });
        }
    }

    let mode = mode as u64;
    let (mut enabled, mut modes) = (0u64, 0u64);

    if fans.cpu > 0 {
        enabled |= 1;
        modes |= mode;
    }

    for i in 0..u32::from(fans.cpu) + u32::from(fans.gpu) {
        enabled |= 1 << (i + 1);
        modes |= mode << (2 * i + 2);
    }

    for i in 0..u32::from(fans.gpu) {
        enabled |= 1 << (i + 3);
        modes |= mode << (2 * i + 6);
    }

    Ok(enabled | modes << 16)
}

const MACRO_KEY_BASE: u16 = 0xda00;

/// State shared by the turbo toggle, profile writes and macro keys.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct GamingState {
    pub turbo:          bool,
    pub last_non_turbo: ThermalProfile,
    pub max_perf:       ThermalProfile,
    pub macro_bank:     u8,
    /// Supported-profiles bitmask, when firmware reported one.
    pub supported:      Option<u8>,
}

impl Default for GamingState {
    fn default() -> Self {
        GamingState {
            turbo:          false,
            last_non_turbo: ThermalProfile::Balanced,
            max_perf:       ThermalProfile::Turbo,
            macro_bank:     0,
            supported:      None,
        }
    }
}

fn best_effort(result: Result<()>, what: &str) {
    match result {
        Ok(()) => (),
        Err(why @ Error::Unsupported(_)) => log::debug!("{}: {}", what, why),
        Err(why) => log::warn!("{}: {}", what, why),
    }
}

pub struct ThermalController {
    accessor:   Arc<Accessor>,
    protocol:   &'static ThermalProtocol,
    fans:       FanTopology,
    cycle_mode: AtomicBool,
    state:      Mutex<GamingState>,
}

impl ThermalController {
    pub fn new(
        accessor: Arc<Accessor>,
        protocol: &'static ThermalProtocol,
        fans: FanTopology,
        cycle_mode: bool,
    ) -> Self {
        ThermalController {
            accessor,
            protocol,
            fans,
            cycle_mode: AtomicBool::new(cycle_mode),
            state: Mutex::new(GamingState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, GamingState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> GamingState { *self.state() }

    pub fn protocol(&self) -> &'static ThermalProtocol { self.protocol }

    pub fn cycle_mode(&self) -> bool { self.cycle_mode.load(Ordering::SeqCst) }

    pub fn set_cycle_mode(&self, enabled: bool) { self.cycle_mode.store(enabled, Ordering::SeqCst); }

    fn require_profiles(&self) -> Result<()> {
        if !self.accessor.supports(Attribute::PlatformProfile) {
            return Err(Error::Unsupported(Attribute::PlatformProfile));
        }
        Ok(())
    }

    fn read_profile(&self) -> Result<ThermalProfile> {
        let raw = self.accessor.firmware().ec_read(self.protocol.ec_register)?;
        Ok(self.protocol.from_ec(raw)?)
    }

    fn write_profile(&self, profile: ThermalProfile) -> Result<()> {
        let code =
            self.protocol.code(profile).ok_or(Error::Unsupported(Attribute::PlatformProfile))?;
        self.accessor.set(Attribute::PlatformProfile, code.write_word)
    }

    /// Query the supported profiles and derive the turbo bookkeeping from them.
    pub fn probe_supported(&self) -> Result<Vec<ThermalProfile>> {
        self.require_profiles()?;
        let mask = gaming::get_misc(self.accessor.firmware(), MiscSetting::SupportedProfiles)?;
        let supported = self.protocol.supported(mask);

        let mut state = self.state();
        state.supported = Some(mask);
        if let Some((max_perf, last_non_turbo)) = derive_defaults(&supported) {
            state.max_perf = max_perf;
            state.last_non_turbo = last_non_turbo;
        }

        log::info!("supported thermal profiles: {:?}", supported);
        Ok(supported)
    }

    pub fn profile(&self) -> Result<ThermalProfile> {
        self.require_profiles()?;
        self.read_profile()
    }

    pub fn set_profile(&self, profile: ThermalProfile) -> Result<()> {
        self.require_profiles()?;
        let mut state = self.state();
        self.write_profile(profile)?;
        if profile != state.max_perf {
            state.last_non_turbo = profile;
        }
        Ok(())
    }

    /// Advance to the next profile for the current power source. Returns the
    /// profile written.
    pub fn cycle(&self) -> Result<ThermalProfile> {
        self.require_profiles()?;
        let mut state = self.state();

        let current = self.read_profile().map_err(|why| match why {
            Error::Unknown(code) => {
                log::warn!("{}", code);
                Error::Unsupported(Attribute::PlatformProfile)
            }
            other => other,
        })?;

        let on_ac = gaming::on_ac_power(self.accessor.firmware())?;
        let next = self
            .protocol
            .next(current, on_ac, self.cycle_mode(), state.last_non_turbo)
            .ok_or(Error::Unsupported(Attribute::PlatformProfile))?;

        self.write_profile(next)?;
        if next != ThermalProfile::Turbo {
            state.last_non_turbo = next;
        }

        log::debug!("thermal profile {} -> {} (ac: {})", current, next, on_ac);
        Ok(next)
    }

    pub fn set_fan_mode(&self, mode: FanMode) -> Result<()> {
        self.accessor.set(Attribute::TurboFan, pack_fan_mode(self.fans, mode)?)
    }

    /// Flip turbo. The bundle is applied with the state lock held; individual
    /// write failures are logged and the state flips regardless.
    pub fn toggle_turbo(&self) -> bool {
        let mut state = self.state();
        state.turbo = !state.turbo;

        let (led, fan, overclock) = if state.turbo {
            (0x1_0001, FanMode::Turbo, 2)
        } else {
            (0x1, FanMode::Auto, 0)
        };

        best_effort(self.accessor.set(Attribute::TurboLed, led), "turbo LED");
        best_effort(self.set_fan_mode(fan), "fan mode");
        for setting in [MiscSetting::Overclock1, MiscSetting::Overclock2] {
            best_effort(self.accessor.set(Attribute::TurboOverclock, setting.word(overclock)), "overclock");
        }

        log::info!("turbo {}", if state.turbo { "on" } else { "off" });
        state.turbo
    }

    pub fn macro_bank(&self) -> u8 { self.state().macro_bank }

    /// Select the macro bank from a bank key's device state (1 through 3).
    pub fn select_macro_bank(&self, device_state: u16) -> std::result::Result<u8, UnknownCode> {
        match device_state {
            1..=3 => {
                let bank = (device_state - 1) as u8;
                self.state().macro_bank = bank;
                Ok(bank)
            }
            other => Err(UnknownCode::MacroBank(other)),
        }
    }

    /// The scancode of macro key `device_state` (1 through 5) in the current
    /// bank.
    pub fn macro_scancode(&self, device_state: u16) -> std::result::Result<u16, UnknownCode> {
        match device_state {
            1..=5 => {
                let bank = u16::from(self.state().macro_bank);
                Ok(MACRO_KEY_BASE + (bank << 4) + device_state - 1)
            }
            other => Err(UnknownCode::MacroKey(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_codes() {
        assert_eq!(PREDATOR_V4.code(Eco).map(|c| c.write_word), Some(0x060B));
        assert_eq!(PREDATOR_V4.code(Quiet).map(|c| c.write_word), Some(0x000B));
        assert_eq!(PREDATOR_V4.code(Balanced).map(|c| c.write_word), Some(0x010B));
        assert_eq!(PREDATOR_V4.from_ec(0x03).ok(), Some(Turbo));
        assert!(matches!(PREDATOR_V4.from_ec(0x09), Err(UnknownCode::Profile(9))));
    }

    #[test]
    fn cycle_on_ac() {
        let mut profile = Balanced;
        let mut seen = Vec::new();
        for _ in 0..6 {
            profile = PREDATOR_V4.next(profile, true, true, Balanced).unwrap();
            seen.push(profile);
        }
        assert_eq!(seen, vec![Performance, Turbo, Eco, Quiet, Balanced, Performance]);
    }

    #[test]
    fn battery_never_offers_turbo() {
        for profile in ThermalProfile::ALL {
            for cycle in [true, false] {
                let next = PREDATOR_V4.next(profile, false, cycle, Quiet).unwrap();
                assert!(next == Balanced || next == Eco, "{} -> {}", profile, next);
            }
        }
        assert_eq!(PREDATOR_V4.next(Turbo, false, true, Quiet), Some(Balanced));
        assert_eq!(PREDATOR_V4.next(Balanced, false, true, Quiet), Some(Eco));
    }

    #[test]
    fn toggle_mode() {
        assert_eq!(PREDATOR_V4.next(Quiet, true, false, Balanced), Some(Turbo));
        assert_eq!(PREDATOR_V4.next(Turbo, true, false, Quiet), Some(Quiet));
        assert_eq!(PREDATOR_V4.next(Turbo, true, false, Eco), Some(Eco));
    }

    #[test]
    fn supported_mask() {
        let all = PREDATOR_V4.supported(0x1F);
        assert_eq!(all, ThermalProfile::ALL.to_vec());
        assert_eq!(derive_defaults(&all), Some((Turbo, Balanced)));

        let no_balanced = PREDATOR_V4.supported((1 << 0x04) | (1 << 0x01) | (1 << 0x02));
        assert_eq!(no_balanced, vec![Eco, Quiet, Performance]);
        assert_eq!(derive_defaults(&no_balanced), Some((Performance, Quiet)));

        assert_eq!(derive_defaults(&[Performance, Turbo]), Some((Turbo, Performance)));
        assert_eq!(derive_defaults(&[Turbo]), Some((Turbo, Turbo)));
        assert_eq!(derive_defaults(&[]), None);
    }

    #[test]
    fn fan_words() {
        let single = FanTopology { cpu: 1, gpu: 1 };
        assert_eq!(pack_fan_mode(single, FanMode::Turbo).ok(), Some(0xAA_000F));
        assert_eq!(pack_fan_mode(single, FanMode::Auto).ok(), Some(0x55_000F));

        let dual = FanTopology { cpu: 1, gpu: 2 };
        assert_eq!(pack_fan_mode(dual, FanMode::Turbo).ok(), Some(0x2AA_001F));

        assert_eq!(pack_fan_mode(FanTopology::default(), FanMode::Turbo).ok(), Some(0));
    }

    #[test]
    fn oversized_fan_layouts_are_rejected() {
        let widest = FanTopology { cpu: MAX_CPU_FANS, gpu: MAX_GPU_FANS };
        assert!(pack_fan_mode(widest, FanMode::Turbo).is_ok());

        assert!(matches!(
            pack_fan_mode(FanTopology { cpu: 40, gpu: 40 }, FanMode::Turbo),
            Err(Error::BadParameter { attribute: Attribute::TurboFan, value: 40, max: 1 })
        ));
        assert!(matches!(
            pack_fan_mode(FanTopology { cpu: 1, gpu: MAX_GPU_FANS + 1 }, FanMode::Auto),
            Err(Error::BadParameter { value: 5, max: 4, .. })
        ));
    }

    #[test]
    fn profile_names() {
        assert_eq!("performance".parse::<ThermalProfile>(), Ok(Performance));
        assert!("ludicrous".parse::<ThermalProfile>().is_err());
        assert!(Eco < Quiet && Performance < Turbo);
    }
}
