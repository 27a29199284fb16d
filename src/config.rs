// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

const SYSTEM: &str = "/etc/acer-wmi/config.toml";

/// Load-time parameters.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Initial mail LED state.
    pub mailled: Option<u8>,
    /// Initial display brightness.
    pub brightness: Option<u8>,
    /// Initial WWAN radio state.
    pub threeg: Option<u8>,
    /// Force a quirk series instead of looking the machine up. `2490` selects
    /// the TravelMate 2490 layout.
    pub force_series: u32,
    /// Replace the detected capability mask.
    pub force_caps: Option<u32>,
    /// Let the embedded controller report hotkeys instead of Launch Manager.
    pub ec_raw_mode: bool,
    /// Cycle through every thermal profile with the mode key on AC power,
    /// rather than toggling turbo.
    pub cycle_gaming_thermal_profile: bool,
    /// Treat the machine as a predator v4 regardless of its identity.
    pub predator_v4: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mailled: None,
            brightness: None,
            threeg: None,
            force_series: 0,
            force_caps: None,
            ec_raw_mode: false,
            cycle_gaming_thermal_profile: true,
            predator_v4: false,
        }
    }
}

impl Config {
    /// The system configuration, or defaults when it is absent or unreadable.
    pub fn load() -> Self {
        if !Path::new(SYSTEM).exists() {
            return Config::default();
        }

        match Config::from_path(SYSTEM) {
            Ok(config) => config,
            Err(why) => {
                log::error!("{}; using defaults", why);
                Config::default()
            }
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        fs::read_to_string(path)
            .map_err(|error| ConfigError::Read(PathBuf::from(path), error))
            .and_then(|ref data| toml::from_str::<Self>(data).map_err(ConfigError::Parse))
    }
}
