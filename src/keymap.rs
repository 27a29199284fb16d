// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

//! Hotkey scancodes and the keys they stand for.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::{collections::HashMap, fmt};

pub const TOUCHPAD_ON: u16 = 0x213;
pub const TOUCHPAD_OFF: u16 = 0x214;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Key {
    Wlan,
    Bluetooth,
    Prog1,
    Prog2,
    Prog3,
    Prog4,
    Help,
    Unknown,
    SwitchVideoMode,
    TouchpadToggle,
    TouchpadOn,
    TouchpadOff,
    Power,
    Mute,
    PreviousSong,
    NextSong,
    PlayPause,
    Stop,
    VolumeUp,
    VolumeDown,
    BrightnessUp,
    BrightnessDown,
    Sleep,
    KbdIllumToggle,
    F13,
    F14,
    F15,
    F16,
    F17,
    F18,
    F19,
    F20,
    F21,
    F22,
    F23,
}

impl Key {
    /// Keys that report a change of radio state.
    pub fn is_radio(self) -> bool { matches!(self, Key::Wlan | Key::Bluetooth) }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { fmt::Debug::fmt(self, f) }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyEntry {
    /// Emitted to listeners.
    Key(Key),
    /// Known, but reported through another path.
    Ignore(Key),
}

impl KeyEntry {
    pub fn key(self) -> Key {
        match self {
            KeyEntry::Key(key) | KeyEntry::Ignore(key) => key,
        }
    }

    pub fn is_ignored(self) -> bool { matches!(self, KeyEntry::Ignore(_)) }
}

static KEYMAP: Lazy<HashMap<u16, KeyEntry>> = Lazy::new(|| {
    use self::{Key::*, KeyEntry::Ignore};

    let keys = [
        (0x01, Wlan),
        (0x03, Wlan),
        (0x04, Wlan),
        (0x12, Bluetooth),
        (0x21, Prog1),
        (0x22, Prog2),
        (0x23, Prog3),
        (0x24, Prog4),
        (0x27, Help),
        (0x29, Prog3),
        // Often duplicated by the video bus, but not always.
        (0x61, Unknown),
        (0x64, SwitchVideoMode),
        (0x82, TouchpadToggle),
        (TOUCHPAD_ON, TouchpadOn),
        (TOUCHPAD_OFF, TouchpadOff),
        (0x85, TouchpadToggle),
        (0x86, Wlan),
        (0x87, Power),
        // Predator macro keys: 0xdaXY, X the bank and Y the key.
        (0xda00, Prog1),
        (0xda01, Prog2),
        (0xda02, Prog3),
        (0xda03, Prog4),
        (0xda04, F13),
        (0xda10, F14),
        (0xda11, F15),
        (0xda12, F16),
        (0xda13, F17),
        (0xda14, F18),
        (0xda20, F19),
        (0xda21, F20),
        (0xda22, F21),
        (0xda23, F22),
        (0xda24, F23),
    ];

    let ignored = [
        (0x41, Mute),
        (0x42, PreviousSong),
        (0x4d, PreviousSong),
        (0x43, NextSong),
        (0x4e, NextSong),
        (0x44, PlayPause),
        (0x4f, PlayPause),
        (0x45, Stop),
        (0x50, Stop),
        (0x48, VolumeUp),
        (0x49, VolumeDown),
        (0x4a, VolumeDown),
        (0x62, BrightnessUp),
        (0x63, BrightnessDown),
        (0x81, Sleep),
        (0x83, TouchpadToggle),
        (0x84, KbdIllumToggle),
    ];

    keys.into_iter()
        .map(|(code, key)| (code, KeyEntry::Key(key)))
        .chain(ignored.into_iter().map(|(code, key)| (code, Ignore(key))))
        .collect()
});

pub fn lookup(scancode: u16) -> Option<KeyEntry> { KEYMAP.get(&scancode).copied() }

/// A key press delivered to listeners.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct KeyEvent {
    pub scancode: u16,
    pub key:      Key,
}
