// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use crate::{capability::Attribute, firmware::Device};
use std::{io, path::PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{} is not supported on this machine", _0)]
    Unsupported(Attribute),
    #[error("value {} is out of range for {} (max {})", value, attribute, max)]
    BadParameter { attribute: Attribute, value: u64, max: u64 },
    #[error("firmware transport failure: {}", _0)]
    Transport(TransportError),
    #[error("malformed event: {}", _0)]
    Decode(DecodeError),
    #[error("unrecognized code: {}", _0)]
    Unknown(UnknownCode),
}

impl From<TransportError> for Error {
    fn from(why: TransportError) -> Error { Error::Transport(why) }
}

impl From<DecodeError> for Error {
    fn from(why: DecodeError) -> Error { Error::Decode(why) }
}

impl From<UnknownCode> for Error {
    fn from(why: UnknownCode) -> Error { Error::Unknown(why) }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("firmware call failed with status {:#x}", _0)]
    Status(u32),
    #[error("{} is not present", _0)]
    NoDevice(Device),
    #[error("unexpected response: expected {}, got {}", expected, found)]
    Shape { expected: &'static str, found: String },
    #[error("firmware rejected the request (error {:#04x}, ec {:#04x})", error, ec)]
    Rejected { error: u8, ec: u8 },
    #[error("operation is not provided by this transport")]
    NotProvided,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("event carried no payload")]
    Missing,
    #[error("event payload is not a buffer")]
    NotBuffer,
    #[error("event payload is {} bytes, expected 8", _0)]
    Length(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum UnknownCode {
    #[error("unknown key {:#x}", _0)]
    Key(u16),
    #[error("unknown keyboard dock state {:#04x}", _0)]
    DockState(u8),
    #[error("unknown event function {:#04x}", _0)]
    Function(u8),
    #[error("unknown macro bank {:#x}", _0)]
    MacroBank(u16),
    #[error("unknown macro key {:#x}", _0)]
    MacroKey(u16),
    #[error("unknown gaming event {:#04x}", _0)]
    GamingEvent(u8),
    #[error("unknown thermal profile code {:#04x}", _0)]
    Profile(u8),
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("machine is blacklisted")]
    Blacklisted,
    #[error("legacy interface found on an unsupported machine")]
    UnsupportedMachine,
    #[error("no device detection method is available")]
    NoDetectionMethod,
    #[error("capability discovery failed: {}", _0)]
    Discovery(TransportError),
    #[error("failed to set the firmware function mode: {}", _0)]
    FunctionMode(TransportError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {:?}: {}", _0, _1)]
    Read(PathBuf, io::Error),
    #[error("failed to parse config: {}", _0)]
    Parse(toml::de::Error),
}
