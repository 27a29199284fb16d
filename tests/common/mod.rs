// Copyright 2018-2021 System76 <info@system76.com>
//
// SPDX-License-Identifier: GPL-3.0-only

#![allow(dead_code)]

use acer_wmi::{
    accessor::device_status::{HotkeyFunctionTable, BLUETOOTH, THREEG, WIRELESS},
    config::Config,
    errors::TransportError,
    firmware::{Device, EventCallback, Firmware, FirmwareObject},
    interface::MachineIdentity,
    quirks::{QuirkLookup, QuirkMatch, QuirkRecord},
    thermal::PREDATOR_V4,
    Platform,
};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

/// A predator with turbo, thermal profiles and fan readings.
pub static GAMING_RECORD: QuirkRecord = QuirkRecord {
    turbo: true,
    cpu_fans: 1,
    gpu_fans: 1,
    predator_v4: true,
    ..QuirkRecord::UNKNOWN
};

pub const PROFILE_REGISTER: u8 = 0x54;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Call {
    pub device: Device,
    pub method: u32,
    pub input:  Vec<u8>,
}

impl Call {
    pub fn word(&self) -> u64 {
        let mut bytes = [0u8; 8];
        let len = self.input.len().min(8);
        bytes[..len].copy_from_slice(&self.input[..len]);
        u64::from_le_bytes(bytes)
    }
}

#[derive(Default)]
struct State {
    calls:          Vec<Call>,
    ec:             HashMap<u8, u8>,
    kbc:            Vec<(u8, u16)>,
    unified:        HashMap<u32, u32>,
    capability:     u32,
    device_status:  u16,
    dock:           u8,
    function_modes: Vec<(u8, u8)>,
    broken_modes:   Vec<(u8, u8)>,
    rejected_modes: Vec<(u8, u8)>,
    misc:           HashMap<u8, u8>,
    led:            u64,
    fan_behavior:   Option<u64>,
    on_ac:          bool,
    fan_speeds:     (u64, u64),
    legacy_masks:   Vec<u8>,
    mail_led:       bool,
    accelerometer:  Option<[i16; 3]>,
    callback:       Option<EventCallback>,
    unsubscribed:   bool,
}

/// Scriptable firmware that records every call it receives.
pub struct FakeFirmware {
    devices: HashSet<Device>,
    state:   Mutex<State>,
}

impl FakeFirmware {
    pub fn new(devices: &[Device]) -> Self {
        FakeFirmware {
            devices: devices.iter().copied().collect(),
            state:   Mutex::new(State { on_ac: true, dock: 0x01, ..State::default() }),
        }
    }

    pub fn gaming() -> Self {
        let fw = FakeFirmware::new(&[
            Device::DeviceStatus,
            Device::Gaming,
            Device::Events,
            Device::CapabilityBlock,
        ]);
        {
            let mut state = fw.lock();
            state.misc.insert(0x0A, 0b0001_1111);
            state.ec.insert(PROFILE_REGISTER, 0);
        }
        fw
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn calls(&self) -> Vec<Call> { self.lock().calls.clone() }

    pub fn calls_to(&self, device: Device, method: u32) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.device == device && c.method == method).collect()
    }

    pub fn clear_calls(&self) { self.lock().calls.clear(); }

    pub fn ec(&self, register: u8) -> u8 { self.lock().ec.get(&register).copied().unwrap_or(0) }

    pub fn set_ec(&self, register: u8, value: u8) { self.lock().ec.insert(register, value); }

    pub fn kbc_commands(&self) -> Vec<(u8, u16)> { self.lock().kbc.clone() }

    /// The value read back by unified getter `method`.
    pub fn unified(&self, method: u32) -> Option<u32> { self.lock().unified.get(&method).copied() }

    pub fn set_unified(&self, method: u32, value: u32) { self.lock().unified.insert(method, value); }

    pub fn set_capability_block(&self, bits: u32) { self.lock().capability = bits; }

    pub fn device_status(&self) -> u16 { self.lock().device_status }

    pub fn set_device_status(&self, bits: u16) { self.lock().device_status = bits; }

    pub fn set_dock(&self, state: u8) { self.lock().dock = state; }

    pub fn function_modes(&self) -> Vec<(u8, u8)> { self.lock().function_modes.clone() }

    /// Fail the transport when this function mode is requested.
    pub fn break_function_mode(&self, app_status: u8, app_mask: u8) {
        self.lock().broken_modes.push((app_status, app_mask));
    }

    /// Answer this function mode with a nonzero status byte.
    pub fn reject_function_mode(&self, app_status: u8, app_mask: u8) {
        self.lock().rejected_modes.push((app_status, app_mask));
    }

    pub fn set_misc(&self, index: u8, value: u8) { self.lock().misc.insert(index, value); }

    pub fn led(&self) -> u64 { self.lock().led }

    pub fn fan_behavior(&self) -> Option<u64> { self.lock().fan_behavior }

    pub fn set_on_ac(&self, on_ac: bool) { self.lock().on_ac = on_ac; }

    pub fn set_fan_speeds(&self, cpu: u64, gpu: u64) { self.lock().fan_speeds = (cpu, gpu); }

    /// Legacy device masks that answer discovery, and whether a mail LED is
    /// reported.
    pub fn set_legacy_devices(&self, masks: &[u8], mail_led: bool) {
        let mut state = self.lock();
        state.legacy_masks = masks.to_vec();
        state.mail_led = mail_led;
    }

    pub fn set_accelerometer(&self, sample: [i16; 3]) { self.lock().accelerometer = Some(sample); }

    pub fn subscribed(&self) -> bool { self.lock().callback.is_some() }

    pub fn unsubscribed(&self) -> bool { self.lock().unsubscribed }

    /// Deliver a notification through the registered callback.
    pub fn fire(&self, object: Option<FirmwareObject>) {
        let state = self.lock();
        let callback = state.callback.as_ref().expect("no event subscriber");
        callback(object);
    }

    fn legacy(&self, state: &mut State, input: &[u8]) -> Option<FirmwareObject> {
        let eax = u32::from_le_bytes([input[0], input[1], input[2], input[3]]);
        let ebx = u32::from_le_bytes([input[4], input[5], input[6], input[7]]);

        let mut out = vec![0u8; 20];
        if eax == 0x9610 && state.legacy_masks.contains(&(ebx as u8)) {
            out[0] = 1;
        }
        if eax == 0x86 && state.mail_led {
            out[16] = 1;
        }
        Some(FirmwareObject::Buffer(out))
    }

    fn device_status_call(&self, state: &mut State, method: u32, input: &[u8]) -> Option<FirmwareObject> {
        match (method, input[0]) {
            (2, 0x1) => {
                let requested = u16::from_le_bytes([input[2], input[3]]);
                let [lo, hi] = (state.device_status & requested).to_le_bytes();
                Some(FirmwareObject::Buffer(vec![0, 0, lo, hi, 0, 0, 0, 0]))
            }
            (2, 0x5) => Some(FirmwareObject::Buffer(vec![0, 0, 0, 0x05, state.dock, 0, 0, 0])),
            (1, 0x2) => {
                state.device_status = u16::from_le_bytes([input[2], input[3]]);
                Some(FirmwareObject::Buffer(vec![0; 4]))
            }
            (1, 0x1) => {
                let mode = (input[5], input[6]);
                state.function_modes.push(mode);
                let error = u8::from(state.rejected_modes.contains(&mode));
                Some(FirmwareObject::Buffer(vec![error, 0, 0, 0]))
            }
            _ => None,
        }
    }

    fn gaming_call(&self, state: &mut State, method: u32, input: &[u8]) -> Option<FirmwareObject> {
        let mut bytes = [0u8; 8];
        bytes[..input.len().min(8)].copy_from_slice(&input[..input.len().min(8)]);
        let word = u64::from_le_bytes(bytes);
        let reply = |value: u64| Some(FirmwareObject::Buffer(value.to_le_bytes().to_vec()));

        match method {
            2 => {
                state.led = word;
                reply(0)
            }
            4 => reply(state.led),
            5 => match word {
                0x02 => reply(u64::from(state.on_ac)),
                0x0201 => reply(state.fan_speeds.0 << 8),
                0x0601 => reply(state.fan_speeds.1 << 8),
                _ => reply(0),
            },
            14 => {
                state.fan_behavior = Some(word);
                reply(0)
            }
            22 => {
                let index = word as u8;
                let value = (word >> 8) as u8;
                if index == 0x0B {
                    match PREDATOR_V4.codes.iter().find(|code| code.write_word == word & 0xFFFF) {
                        Some(code) => {
                            state.ec.insert(PROFILE_REGISTER, code.ec_code);
                        }
                        None => return reply(1),
                    }
                } else {
                    state.misc.insert(index, value);
                }
                reply(0)
            }
            23 => {
                let value = state.misc.get(&(word as u8)).copied().unwrap_or(0);
                reply(u64::from(value) << 8)
            }
            _ => reply(0),
        }
    }
}

impl Firmware for FakeFirmware {
    fn has_device(&self, device: Device) -> bool { self.devices.contains(&device) }

    fn invoke(
        &self,
        device: Device,
        method: u32,
        input: &[u8],
    ) -> Result<Option<FirmwareObject>, TransportError> {
        if !self.has_device(device) {
            return Err(TransportError::NoDevice(device));
        }

        let mut state = self.lock();
        state.calls.push(Call { device, method, input: input.to_vec() });

        if device == Device::DeviceStatus && method == 1 && input.len() > 6 && input[0] == 0x1 {
            let mode = (input[5], input[6]);
            if state.broken_modes.contains(&mode) {
                state.function_modes.push(mode);
                return Err(TransportError::Status(0x8000_0005));
            }
        }

        Ok(match device {
            Device::Legacy => self.legacy(&mut state, input),
            Device::Unified => {
                let arg = u32::from_le_bytes([input[0], input[1], input[2], input[3]]);
                // Setters store where the matching getter reads.
                let getter = match method {
                    4 => Some(1),
                    5 => Some(2),
                    6 => Some(3),
                    11 => Some(10),
                    _ => None,
                };
                match getter {
                    Some(get) => {
                        state.unified.insert(get, arg);
                        Some(FirmwareObject::Integer(0))
                    }
                    None => {
                        let value = state.unified.get(&method).copied().unwrap_or(0);
                        Some(FirmwareObject::Buffer(value.to_le_bytes().to_vec()))
                    }
                }
            }
            Device::DeviceStatus => self.device_status_call(&mut state, method, input),
            Device::Gaming => self.gaming_call(&mut state, method, input),
            _ => None,
        })
    }

    fn query_block(&self, device: Device) -> Result<Option<FirmwareObject>, TransportError> {
        if !self.has_device(device) {
            return Err(TransportError::NoDevice(device));
        }
        let bits = self.lock().capability;
        Ok(Some(FirmwareObject::Buffer(bits.to_le_bytes().to_vec())))
    }

    fn ec_read(&self, register: u8) -> Result<u8, TransportError> { Ok(self.ec(register)) }

    fn ec_write(&self, register: u8, value: u8) -> Result<(), TransportError> {
        self.set_ec(register, value);
        Ok(())
    }

    fn kbc_command(&self, param: u8, command: u16) -> Result<(), TransportError> {
        self.lock().kbc.push((param, command));
        Ok(())
    }

    fn accelerometer_sample(&self) -> Result<[i16; 3], TransportError> {
        self.lock().accelerometer.ok_or(TransportError::NotProvided)
    }

    fn subscribe(&self, _device: Device, callback: EventCallback) -> Result<(), TransportError> {
        self.lock().callback = Some(callback);
        Ok(())
    }

    fn unsubscribe(&self, _device: Device) {
        let mut state = self.lock();
        state.callback = None;
        state.unsubscribed = true;
    }
}

/// Quirk lookup that always answers the same way.
pub struct FixedLookup(pub Option<QuirkMatch>);

impl QuirkLookup for FixedLookup {
    fn lookup(&self, _vendor: &str, _model: &str) -> Option<QuirkMatch> { self.0 }
}

pub fn hotkey_table(bitmap: u16) -> HotkeyFunctionTable {
    HotkeyFunctionTable { commun_func_bitmap: bitmap, commun_fn_key_number: 0 }
}

pub fn gaming_identity() -> MachineIdentity {
    MachineIdentity {
        hotkey_table: Some(hotkey_table(WIRELESS | BLUETOOTH | THREEG)),
        ..MachineIdentity::new("Acer", "Predator PH18-71")
    }
}

/// A probed gaming platform sharing `fw`.
pub fn gaming_platform(fw: &Arc<FakeFirmware>) -> Platform {
    Platform::probe(
        fw.clone(),
        &gaming_identity(),
        &FixedLookup(Some(QuirkMatch::Record(&GAMING_RECORD))),
        Config::default(),
    )
    .expect("gaming probe")
}

pub fn event(function: u8, key_num: u8, device_state: u16) -> Option<FirmwareObject> {
    let [lo, hi] = device_state.to_le_bytes();
    Some(FirmwareObject::Buffer(vec![function, key_num, lo, hi, 0, 0, 0, 0]))
}
