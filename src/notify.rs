// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

//! Callbacks for the user-facing subsystems.

use crate::{
    accessor::device_status::DockMode, capability::Attribute, keymap::KeyEvent,
    thermal::ThermalProfile,
};
use serde::Serialize;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A radio state change. `hardware` marks a kill switch the user cannot
/// override from software.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct RadioChange {
    pub attribute: Attribute,
    pub enabled:   bool,
    pub hardware:  bool,
}

type Callback<T> = Box<dyn Fn(T) + Send + Sync>;

struct Slot<T>(RwLock<Vec<Callback<T>>>);

impl<T: Copy> Slot<T> {
    fn new() -> Self { Slot(RwLock::new(Vec::new())) }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Callback<T>>> {
        self.0.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Callback<T>>> {
        self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push<F: Fn(T) + Send + Sync + 'static>(&self, callback: F) { self.write().push(Box::new(callback)); }

    fn emit(&self, value: T) {
        for callback in self.read().iter() {
            callback(value);
        }
    }
}

/// Registered observers. Callbacks run on the thread that raised the change
/// and must not register new callbacks.
pub struct Listeners {
    profile:       Slot<ThermalProfile>,
    radio:         Slot<RadioChange>,
    tablet:        Slot<DockMode>,
    key:           Slot<KeyEvent>,
    accelerometer: Slot<[i16; 3]>,
}

impl Default for Listeners {
    fn default() -> Self {
        Listeners {
            profile:       Slot::new(),
            radio:         Slot::new(),
            tablet:        Slot::new(),
            key:           Slot::new(),
            accelerometer: Slot::new(),
        }
    }
}

impl Listeners {
    pub fn on_profile_changed<F: Fn(ThermalProfile) + Send + Sync + 'static>(&self, callback: F) {
        self.profile.push(callback);
    }

    pub fn on_radio_state_changed<F: Fn(RadioChange) + Send + Sync + 'static>(&self, callback: F) {
        self.radio.push(callback);
    }

    pub fn on_tablet_mode_changed<F: Fn(DockMode) + Send + Sync + 'static>(&self, callback: F) {
        self.tablet.push(callback);
    }

    pub fn on_semantic_key_event<F: Fn(KeyEvent) + Send + Sync + 'static>(&self, callback: F) {
        self.key.push(callback);
    }

    pub fn on_accelerometer_sample<F: Fn([i16; 3]) + Send + Sync + 'static>(&self, callback: F) {
        self.accelerometer.push(callback);
    }

    pub fn profile_changed(&self, profile: ThermalProfile) { self.profile.emit(profile); }

    pub fn radio_state_changed(&self, change: RadioChange) { self.radio.emit(change); }

    pub fn tablet_mode_changed(&self, mode: DockMode) { self.tablet.emit(mode); }

    pub fn key_event(&self, event: KeyEvent) { self.key.emit(event); }

    pub fn accelerometer_sample(&self, sample: [i16; 3]) { self.accelerometer.emit(sample); }
}
