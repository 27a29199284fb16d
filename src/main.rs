// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use acer_wmi::logging;
use clap::Parser;
use std::process;

mod cli;

fn main() {
    let args = cli::Cli::parse();

    if let Err(why) = logging::setup(logging::level(args.quiet, args.verbose)) {
        eprintln!("failed to set up logging: {}", why);
        process::exit(1);
    }

    if let Err(why) = args.command.run() {
        eprintln!("acer-wmi: {:#}", why);
        process::exit(1);
    }
}
