// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

use crate::{
    accessor::Accessor,
    capability::Attribute,
    errors::Error,
    event::{EventRecord, Router},
    firmware::EventCallback,
    notify::{Listeners, RadioChange},
};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};

pub const REFRESH_PERIOD: Duration = Duration::from_secs(1);

/// Pending events the worker has not yet applied.
pub const EVENT_QUEUE_DEPTH: usize = 32;

/// Which radios the refresh polls and how wireless changes are reported.
#[derive(Clone, Copy, Debug)]
pub struct RefreshPolicy {
    pub wireless_is_hardware: bool,
    pub poll_wwan:            bool,
}

/// Poll every supported radio once, recording and announcing changes.
pub fn poll_radios(accessor: &Accessor, listeners: &Listeners, policy: RefreshPolicy) {
    for radio in Attribute::RADIOS {
        if !accessor.supports(radio) || (radio == Attribute::Wwan && !policy.poll_wwan) {
            continue;
        }

        match accessor.get(radio) {
            Ok(state) => {
                let enabled = state != 0;
                if accessor.record_radio(radio, enabled) {
                    listeners.radio_state_changed(RadioChange {
                        attribute: radio,
                        enabled,
                        hardware: radio == Attribute::Wireless && policy.wireless_is_hardware,
                    });
                }
            }
            Err(why @ Error::Unsupported(_)) => log::debug!("{} refresh: {}", radio, why),
            Err(why) => log::warn!("{} refresh: {}", radio, why),
        }
    }
}

pub fn spawn_refresh(
    accessor: Arc<Accessor>,
    listeners: Arc<Listeners>,
    policy: RefreshPolicy,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + REFRESH_PERIOD, REFRESH_PERIOD);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => (),
                _ = shutdown.changed() => break,
            }

            if *shutdown.borrow() {
                break;
            }

            poll_radios(&accessor, &listeners, policy);
        }

        log::debug!("radio refresh stopped");
    })
}

/// The firmware callback: decode, then hand off without blocking.
pub fn event_callback(router: Arc<Router>, queue: mpsc::Sender<EventRecord>) -> EventCallback {
    Box::new(move |object| {
        let Some(record) = router.decode(object) else { return };
        if let Err(why) = queue.try_send(record) {
            log::warn!("dropping event {:?}: {}", record, why);
        }
    })
}

pub fn spawn_worker(
    router: Arc<Router>,
    mut queue: mpsc::Receiver<EventRecord>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let record = tokio::select! {
                record = queue.recv() => record,
                _ = shutdown.changed() => None,
            };

            match record {
                Some(record) => router.dispatch(record),
                None => break,
            }
        }

        log::debug!("event worker stopped");
    })
}
