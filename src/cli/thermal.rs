// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use acer_wmi::thermal::{self, FanTopology, ThermalProfile, PREDATOR_V4};
use anyhow::{anyhow, Context};
use clap::{Args, ValueEnum};

/// Show where the mode key moves the thermal profile
#[derive(Args)]
pub struct Cycle {
    /// The current profile
    #[arg(long)]
    from: ThermalProfile,

    /// Assume battery power
    #[arg(long)]
    battery: bool,

    /// Toggle turbo rather than cycling through every profile
    #[arg(long)]
    toggle: bool,

    /// Profile restored when leaving turbo
    #[arg(long, default_value = "balanced")]
    last: ThermalProfile,
}

impl Cycle {
    pub fn run(&self) -> anyhow::Result<()> {
        let next = PREDATOR_V4
            .next(self.from, !self.battery, !self.toggle, self.last)
            .ok_or_else(|| anyhow!("no transition from {}", self.from))?;

        let code = PREDATOR_V4.code(next).context("profile has no firmware code")?;
        println!("{} -> {} (ec {:#04x}, word {:#06x})", self.from, next, code.ec_code, code.write_word);
        Ok(())
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Auto,
    Turbo,
}

/// Print the fan-behavior word for a fan layout
#[derive(Args)]
pub struct FanMode {
    /// Number of CPU fans
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=i64::from(thermal::MAX_CPU_FANS)))]
    cpu: u8,

    /// Number of GPU fans
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=i64::from(thermal::MAX_GPU_FANS)))]
    gpu: u8,

    #[arg(long, value_enum)]
    mode: Mode,
}

impl FanMode {
    pub fn run(&self) -> anyhow::Result<()> {
        let mode = match self.mode {
            Mode::Auto => thermal::FanMode::Auto,
            Mode::Turbo => thermal::FanMode::Turbo,
        };

        let word = thermal::pack_fan_mode(FanTopology { cpu: self.cpu, gpu: self.gpu }, mode)?;
        println!("{:#x}", word);
        Ok(())
    }
}
