// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};

mod config;
mod decode;
mod quirks;
mod thermal;

/// Inspect the Acer firmware extras tables and decoders
#[derive(Parser)]
#[command(name = "acer-wmi", version)]
pub struct Cli {
    /// Set the verbosity of logs to 'off' [default is 'info']
    #[arg(long, short, global = true, group = "verbosity")]
    pub quiet: bool,

    /// Set the verbosity of logs to 'debug' [default is 'info']
    #[arg(long, short, global = true, group = "verbosity")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    Config(config::Command),
    Quirks(quirks::Command),
    Decode(decode::Command),
    Cycle(thermal::Cycle),
    FanMode(thermal::FanMode),
}

impl Command {
    pub fn run(&self) -> anyhow::Result<()> {
        match self {
            Self::Config(command) => command.run(),
            Self::Quirks(command) => command.run(),
            Self::Decode(command) => command.run(),
            Self::Cycle(command) => command.run(),
            Self::FanMode(command) => command.run(),
        }
    }
}
