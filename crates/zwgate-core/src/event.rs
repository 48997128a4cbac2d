//! Driver notifications and commands exchanged with the hardware layer

use serde::{Deserialize, Serialize};

use crate::device::{DeviceId, DeviceInfo, Parameter};

/// Notification emitted by the Z-Wave driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HardwareEvent {
    /// Driver connected to the controller stick
    DriverReady { home_id: u32 },
    /// Driver could not start
    DriverFailed,
    /// Initial network scan finished
    ScanComplete,
    DeviceAdded {
        device: DeviceId,
    },
    ValueAdded {
        device: DeviceId,
        class_id: u8,
        value: Parameter,
    },
    ValueRemoved {
        device: DeviceId,
        class_id: u8,
        index: u16,
    },
    ValueChanged {
        device: DeviceId,
        class_id: u8,
        value: Parameter,
    },
    DeviceReady {
        device: DeviceId,
        info: DeviceInfo,
    },
    PollingEnabled {
        device: DeviceId,
    },
    PollingDisabled {
        device: DeviceId,
    },
    Notification {
        device: DeviceId,
        code: u8,
    },
    ControllerCommand {
        state: u8,
        #[serde(default)]
        error: Option<u8>,
    },
}

/// Command sent to the Z-Wave driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum DriverCommand {
    SetValue {
        device: DeviceId,
        class_id: u8,
        instance: u8,
        index: u16,
        value: i64,
    },
    EnablePoll {
        device: DeviceId,
        class_id: u8,
    },
}
