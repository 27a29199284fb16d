// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use acer_wmi::{
    config::Config,
    quirks::{self, DmiTable},
};
use clap::Args;
use serde_json::json;

/// Show the quirk entry and capabilities selected for a machine identity
#[derive(Args)]
pub struct Command {
    /// System vendor, as reported by DMI
    #[arg(long)]
    vendor: String,

    /// Product name, as reported by DMI
    #[arg(long)]
    model: String,

    /// Print the selection as JSON
    #[arg(long)]
    json: bool,
}

impl Command {
    pub fn run(&self) -> anyhow::Result<()> {
        let table = DmiTable::default();
        let config = Config::load();
        let blacklisted = quirks::is_blacklisted(&self.vendor, &self.model);
        let selection = quirks::select(&table, &self.vendor, &self.model, &config);
        let ident = table.entry(&self.vendor, &self.model).map(|entry| entry.ident);
        let caps = selection.record.capabilities();

        if self.json {
            let value = json!({
                "ident": ident,
                "blacklisted": blacklisted,
                "selection": selection,
                "capabilities": caps.iter().map(|attr| attr.name()).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }

        println!("Entry: {}", ident.unwrap_or("none"));
        if blacklisted {
            println!("Blacklisted: yes");
        }
        println!("Quirk capabilities: {}", caps);
        if let Some(mask) = selection.force_caps {
            println!("Forced capabilities: {:#x}", mask);
        }
        println!(
            "Fans: {} cpu, {} gpu{}",
            selection.record.cpu_fans,
            selection.record.gpu_fans,
            if selection.record.predator_v4 { " (predator v4)" } else { "" }
        );

        Ok(())
    }
}
