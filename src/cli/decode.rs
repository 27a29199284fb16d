// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use acer_wmi::event::{self, Event, EventRecord};
use anyhow::{bail, Context};
use clap::Args;
use serde_json::json;

/// Decode an 8-byte event payload given in hex
#[derive(Args)]
pub struct Command {
    /// Payload bytes, e.g. `0701030000000000` or `07 01 03 00 00 00 00 00`
    #[arg(required = true)]
    payload: Vec<String>,
}

fn parse_hex(input: &str) -> anyhow::Result<Vec<u8>> {
    let digits: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if !digits.is_ascii() {
        bail!("'{}' is not hex", input);
    }
    if digits.len() % 2 != 0 {
        bail!("odd number of hex digits in '{}'", input);
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .with_context(|| format!("invalid hex byte '{}'", &digits[i..i + 2]))
        })
        .collect()
}

impl Command {
    pub fn run(&self) -> anyhow::Result<()> {
        let bytes = parse_hex(&self.payload.join(""))?;
        let record = EventRecord::parse(&bytes)?;

        let classified = record.classify();
        let key = match classified {
            Ok(Event::Hotkey { key_num, device_state }) => {
                event::resolve_hotkey(key_num, device_state).ok().and_then(|hotkey| hotkey.event)
            }
            _ => None,
        };

        let value = json!({
            "record": record,
            "event": classified.as_ref().ok(),
            "error": classified.as_ref().err().map(ToString::to_string),
            "key": key,
        });

        println!("{}", serde_json::to_string_pretty(&value)?);
        Ok(())
    }
}
