// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

//! The platform context: one per machine, built at probe time and torn down
//! once at shutdown.

use crate::{
    accessor::{
        device_status::{self, DockMode, FunctionMode, HotkeyFunctionTable},
        gaming::{self, Fan},
        Accessor, RadioState,
    },
    capability::{Attribute, Capabilities},
    config::Config,
    errors::{Error, ProbeError, Result},
    event::Router,
    firmware::{Device, Firmware},
    interface::{self, InterfaceVariant, MachineIdentity},
    notify::Listeners,
    quirks::{QuirkLookup, QuirkSelection},
    thermal::{FanMode, FanTopology, GamingState, ThermalController, ThermalProfile, PREDATOR_V4},
};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

mod tasks;
pub use self::tasks::{poll_radios, RefreshPolicy, EVENT_QUEUE_DEPTH, REFRESH_PERIOD};

const LED_OFF: u64 = 0;

struct Tasks {
    shutdown: watch::Sender<bool>,
    handles:  Vec<JoinHandle<()>>,
}

/// Values held across a suspend.
#[derive(Clone, Copy, Debug, Default)]
struct Saved {
    mailled:    Option<u64>,
    brightness: Option<u64>,
}

pub struct Platform {
    variant:      Option<InterfaceVariant>,
    quirks:       QuirkSelection,
    hotkey_table: Option<HotkeyFunctionTable>,
    config:       Config,
    accessor:     Arc<Accessor>,
    thermal:      Arc<ThermalController>,
    listeners:    Arc<Listeners>,
    router:       Arc<Router>,
    saved:        Mutex<Saved>,
    tasks:        Mutex<Option<Tasks>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Platform {
    /// Detect the interface and build the context. Nothing is written to
    /// firmware until [`Platform::start`].
    pub fn probe(
        firmware: Arc<dyn Firmware>,
        identity: &MachineIdentity,
        lookup: &dyn QuirkLookup,
        config: Config,
    ) -> std::result::Result<Self, ProbeError> {
        let detected = interface::probe(firmware, identity, lookup, &config)?;

        let accessor = Arc::new(detected.accessor);
        let thermal = Arc::new(ThermalController::new(
            accessor.clone(),
            &PREDATOR_V4,
            FanTopology::from(&detected.quirks.record),
            config.cycle_gaming_thermal_profile,
        ));
        let listeners = Arc::new(Listeners::default());
        let router = Arc::new(Router::new(accessor.clone(), thermal.clone(), listeners.clone()));

        Ok(Platform {
            variant: detected.variant,
            quirks: detected.quirks,
            hotkey_table: detected.hotkey_table,
            config,
            accessor,
            thermal,
            listeners,
            router,
            saved: Mutex::new(Saved::default()),
            tasks: Mutex::new(None),
        })
    }

    fn firmware(&self) -> &dyn Firmware { self.accessor.firmware() }

    fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy {
            wireless_is_hardware: self.quirks.record.wireless == 3,
            poll_wwan:            self.firmware().has_device(Device::DeviceStatus),
        }
    }

    /// Apply startup settings, subscribe to notifications and start the
    /// background tasks. Must be called from within a Tokio runtime.
    pub fn start(&self) -> std::result::Result<(), ProbeError> {
        let fw = self.firmware();

        if fw.has_device(Device::DeviceStatus) && self.supports(Attribute::SetFunctionMode) {
            if let Err(why) = device_status::set_function_mode(fw, FunctionMode::RfButton) {
                log::warn!("cannot enable RF button driver: {}", why);
            }

            let mode =
                if self.config.ec_raw_mode { FunctionMode::EcRaw } else { FunctionMode::LaunchManager };
            device_status::set_function_mode(fw, mode).map_err(|why| {
                log::error!("cannot enable {:?} mode: {}", mode, why);
                ProbeError::FunctionMode(why)
            })?;
        } else if self.config.ec_raw_mode {
            log::info!("no EC raw mode enable method");
        }

        if fw.has_device(Device::Gaming) {
            if let Err(why) = gaming::enable_keyboard_zones(fw) {
                log::warn!("cannot enable keyboard lighting zones: {}", why);
            }
        }

        if self.supports(Attribute::PlatformProfile) {
            if let Err(why) = self.thermal.probe_supported() {
                log::warn!("thermal profile probe: {}", why);
            }
        }

        if self.supports(Attribute::KbdDock) {
            match self.accessor.dock_mode() {
                Ok(mode) => self.listeners.tablet_mode_changed(mode),
                Err(why @ Error::Unsupported(_)) => log::debug!("keyboard dock state: {}", why),
                Err(why) => log::warn!("keyboard dock state: {}", why),
            }
        }

        let policy = self.refresh_policy();
        poll_radios(&self.accessor, &self.listeners, policy);
        self.apply_initial_values();

        let (shutdown, shutdown_rx) = watch::channel(false);
        let mut handles = Vec::new();
        let has_events = fw.has_device(Device::Events);

        if has_events {
            let (queue, queue_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
            match fw.subscribe(Device::Events, tasks::event_callback(self.router.clone(), queue)) {
                Ok(()) => {
                    handles.push(tasks::spawn_worker(
                        self.router.clone(),
                        queue_rx,
                        shutdown_rx.clone(),
                    ));
                }
                Err(why) => log::warn!("cannot subscribe to firmware events: {}", why),
            }
        }

        if (self.config.ec_raw_mode || !has_events) && self.capabilities().any_radio() {
            log::info!("polling radio state every {:?}", REFRESH_PERIOD);
            handles.push(tasks::spawn_refresh(
                self.accessor.clone(),
                self.listeners.clone(),
                policy,
                shutdown_rx,
            ));
        }

        *lock(&self.tasks) = Some(Tasks { shutdown, handles });
        Ok(())
    }

    fn apply_initial_values(&self) {
        let mut initial = vec![
            (Attribute::MailLed, self.config.mailled),
            (Attribute::Brightness, self.config.brightness),
        ];

        if self.hotkey_table.is_none() {
            initial.push((Attribute::Wwan, self.config.threeg));
        }

        for (attribute, value) in initial {
            let Some(value) = value else { continue };
            if let Err(why) = self.set(attribute, u64::from(value)) {
                log::debug!("initial {}: {}", attribute, why);
            }
        }
    }

    /// Stop the background tasks and release the notification channel. No
    /// refresh fires after this returns.
    pub async fn shutdown(&self) {
        let tasks = lock(&self.tasks).take();

        if let Some(tasks) = tasks {
            let _ = tasks.shutdown.send(true);
            for handle in tasks.handles {
                if let Err(why) = handle.await {
                    log::warn!("background task failed: {}", why);
                }
            }
        }

        if self.firmware().has_device(Device::Events) {
            self.firmware().unsubscribe(Device::Events);
        }

        if self.supports(Attribute::MailLed) {
            if let Err(why) = self.set(Attribute::MailLed, LED_OFF) {
                log::debug!("mail LED off: {}", why);
            }
        }
    }

    pub fn suspend(&self) {
        let mut saved = lock(&self.saved);

        if self.supports(Attribute::MailLed) {
            saved.mailled = self.get(Attribute::MailLed).ok();
            if let Err(why) = self.set(Attribute::MailLed, LED_OFF) {
                log::debug!("mail LED off: {}", why);
            }
        }

        if self.supports(Attribute::Brightness) {
            saved.brightness = self.get(Attribute::Brightness).ok();
        }
    }

    pub fn resume(&self) {
        let saved = std::mem::take(&mut *lock(&self.saved));

        for (attribute, value) in
            [(Attribute::MailLed, saved.mailled), (Attribute::Brightness, saved.brightness)]
        {
            let Some(value) = value else { continue };
            if let Err(why) = self.set(attribute, value) {
                log::warn!("restoring {}: {}", attribute, why);
            }
        }
    }

    pub fn variant(&self) -> Option<InterfaceVariant> { self.variant }

    pub fn quirks(&self) -> &QuirkSelection { &self.quirks }

    pub fn capabilities(&self) -> Capabilities { self.accessor.capabilities() }

    pub fn supports(&self, attribute: Attribute) -> bool { self.accessor.supports(attribute) }

    pub fn listeners(&self) -> &Listeners { &self.listeners }

    pub fn router(&self) -> &Router { &self.router }

    /// Read an attribute. The thermal profile is reported as its firmware
    /// code.
    pub fn get(&self, attribute: Attribute) -> Result<u64> {
        if attribute == Attribute::PlatformProfile {
            let profile = self.thermal.profile()?;
            let code = self
                .thermal
                .protocol()
                .code(profile)
                .ok_or(Error::Unsupported(attribute))?;
            return Ok(u64::from(code.ec_code));
        }

        self.accessor.get(attribute)
    }

    pub fn set(&self, attribute: Attribute, value: u64) -> Result<()> {
        if attribute == Attribute::PlatformProfile {
            if !self.supports(attribute) {
                return Err(Error::Unsupported(attribute));
            }
            let profile = u8::try_from(value)
                .ok()
                .and_then(|code| self.thermal.protocol().from_ec(code).ok())
                .ok_or(Error::BadParameter { attribute, value, max: 0xFF })?;
            return self.thermal.set_profile(profile);
        }

        self.accessor.set(attribute, value)
    }

    pub fn set_byte_array(&self, attribute: Attribute, bytes: &[u8]) -> Result<()> {
        self.accessor.set_byte_array(attribute, bytes)
    }

    pub fn profile(&self) -> Result<ThermalProfile> { self.thermal.profile() }

    pub fn set_profile(&self, profile: ThermalProfile) -> Result<()> { self.thermal.set_profile(profile) }

    pub fn set_fan_mode(&self, mode: FanMode) -> Result<()> { self.thermal.set_fan_mode(mode) }

    pub fn set_cycle_mode(&self, enabled: bool) { self.thermal.set_cycle_mode(enabled); }

    pub fn gaming_state(&self) -> GamingState { self.thermal.snapshot() }

    pub fn fan_speed(&self, fan: Fan) -> Result<u64> {
        if !self.supports(Attribute::FanSpeedRead) {
            return Err(Error::Unsupported(Attribute::FanSpeedRead));
        }
        Ok(gaming::fan_speed(self.firmware(), fan)?)
    }

    pub fn tablet_mode(&self) -> Result<DockMode> { self.accessor.dock_mode() }

    pub fn radio_state(&self) -> RadioState { self.accessor.radio_snapshot() }

    pub fn decode_failures(&self) -> u64 { self.router.decode_failures() }
}
