// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use fern::{Dispatch, InitError};
use log::LevelFilter;
use std::io;

/// Route log records from this crate to stderr at the given level.
pub fn setup(filter: LevelFilter) -> Result<(), InitError> {
    Dispatch::new()
        // Silence dependencies
        .level(LevelFilter::Off)
        .level_for("acer_wmi", filter)
        .format(|out, message, record| {
            out.finish(format_args!("[{}] {}: {}", record.level(), record.target(), message))
        })
        .chain(io::stderr())
        .apply()?;
    Ok(())
}

/// Maps the `--quiet`/`--verbose` pair used by the command line to a level.
#[must_use]
pub fn level(quiet: bool, verbose: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Off
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}
