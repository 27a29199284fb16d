// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

#![deny(clippy::all)]
#![deny(unused_imports)]
#![allow(clippy::match_like_matches_macro)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::single_match)]

pub mod accessor;
pub mod capability;
pub mod config;
pub mod daemon;
pub mod errors;
pub mod event;
pub mod firmware;
pub mod interface;
pub mod keymap;
pub mod logging;
pub mod notify;
pub mod quirks;
pub mod thermal;

pub use self::{
    capability::{Attribute, Capabilities},
    daemon::Platform,
    errors::{Error, Result},
    interface::{InterfaceVariant, MachineIdentity},
    thermal::ThermalProfile,
};
