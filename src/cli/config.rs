// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use acer_wmi::config::Config;
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;

/// Print the load-time parameters in effect
#[derive(Args)]
pub struct Command {
    /// Read this file instead of the system configuration
    #[arg(long)]
    path: Option<PathBuf>,
}

impl Command {
    pub fn run(&self) -> anyhow::Result<()> {
        let config = match self.path {
            Some(ref path) => Config::from_path(path)?,
            None => Config::load(),
        };

        let text = toml::to_string(&config).context("failed to serialize config")?;
        print!("{}", text);
        Ok(())
    }
}
