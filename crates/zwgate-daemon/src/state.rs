//! Application state management

use anyhow::{bail, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use zwgate_core::catalog::{
    controller_error_name, controller_state_name, notification_name, NOTIFICATION_NOOP,
};
use zwgate_core::change::{device_added_line, device_ready_line};
use zwgate_core::registry::RegistryStats;
use zwgate_core::{
    query, report, Controller, Device, DeviceId, HardwareEvent, Parameter, ParameterGroup,
    ParameterSelector, QueryError, Registry,
};

use crate::config::Config;
use crate::fanout::Fanout;

/// Shared application state
pub struct AppState {
    /// Device registry, written only by the ingestion loop
    pub registry: Arc<RwLock<Registry>>,
    /// Console and event-stream observers
    pub fanout: Arc<Fanout>,
    /// Outbound command sink to the driver
    pub controller: Arc<dyn Controller>,
    /// Configuration
    pub config: Config,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config, controller: Arc<dyn Controller>) -> Arc<Self> {
        Arc::new(Self {
            registry: Arc::new(RwLock::new(Registry::new())),
            fanout: Arc::new(Fanout::new()),
            controller,
            config,
        })
    }

    /// Apply driver events one at a time, in arrival order.
    ///
    /// The task ends when the driver link closes, or with an error if the
    /// driver reports that it failed to start.
    pub fn spawn_ingest(
        self: &Arc<Self>,
        mut events: mpsc::Receiver<HardwareEvent>,
    ) -> JoinHandle<Result<()>> {
        let state = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                state.ingest(event).await?;
            }
            info!("Driver event stream ended");
            Ok(())
        })
    }

    /// Apply one driver event, then publish its effects.
    ///
    /// The registry lock is released before any command is sent or any
    /// observer is notified.
    pub async fn ingest(&self, event: HardwareEvent) -> Result<()> {
        debug!(?event, "Driver event");
        match event {
            HardwareEvent::DriverReady { home_id } => {
                self.fanout.broadcast_log("Connected to controller device");
                self.fanout
                    .broadcast_log(&format!("Beginning scan of home 0x{:x}", home_id));
            }
            HardwareEvent::DriverFailed => {
                self.fanout.broadcast_error("Failed to start driver. Exiting.");
                bail!("Z-Wave driver failed to start");
            }
            HardwareEvent::ScanComplete => {
                self.fanout.broadcast_log("Scan complete.");
            }
            HardwareEvent::DeviceAdded { device } => {
                self.registry.write().await.upsert_device(device);
                self.fanout.broadcast_event(&device_added_line(device));
            }
            HardwareEvent::ValueAdded {
                device,
                class_id,
                value,
            } => {
                let poll = self
                    .registry
                    .write()
                    .await
                    .apply_value_added(device, class_id, value);
                if let Some(poll) = poll {
                    info!(device = %poll.device, class_id = poll.class_id, "Enabling polling");
                    self.controller.enable_poll(poll.device, poll.class_id);
                }
            }
            HardwareEvent::ValueRemoved {
                device,
                class_id,
                index,
            } => {
                self.registry
                    .write()
                    .await
                    .apply_value_removed(device, class_id, index);
            }
            HardwareEvent::ValueChanged {
                device,
                class_id,
                value,
            } => {
                let change = self
                    .registry
                    .write()
                    .await
                    .apply_value_changed(device, class_id, value);
                if let Some(change) = change {
                    self.fanout.broadcast_log(&change.log_line());
                    self.fanout.broadcast_event(&change.event_line());
                }
            }
            HardwareEvent::DeviceReady { device, info } => {
                let became_ready = self.registry.write().await.mark_ready(device, info);
                if became_ready {
                    self.fanout
                        .broadcast_log(&format!("[Node {}] Node is ready", device));
                    self.fanout.broadcast_event(&device_ready_line(device));
                }
            }
            HardwareEvent::PollingEnabled { device } => {
                self.fanout
                    .broadcast_log(&format!("[Node {}] Polling enabled", device));
            }
            HardwareEvent::PollingDisabled { device } => {
                self.fanout
                    .broadcast_log(&format!("[Node {}] Polling disabled", device));
            }
            HardwareEvent::Notification { device, code } => {
                if code != NOTIFICATION_NOOP {
                    let text = match notification_name(code) {
                        Some(name) => name.to_string(),
                        None => format!("Unknown notification {}", code),
                    };
                    self.fanout.broadcast_log(&format!("[Node {}] {}", device, text));
                }
            }
            HardwareEvent::ControllerCommand { state, error } => {
                let text = controller_state_name(state)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Unknown state {}", state));
                self.fanout
                    .broadcast_log(&format!("Controller command feedback: {}", text));
                if let Some(error) = error.filter(|e| *e != 0) {
                    let text = controller_error_name(error)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("Unknown error {}", error));
                    self.fanout.broadcast_log(&format!("   {}", text));
                }
            }
        }
        Ok(())
    }

    /// Get all devices
    pub async fn devices(&self) -> Vec<Device> {
        query::list_devices(&*self.registry.read().await)
    }

    /// Get device by ID
    pub async fn device(&self, id: DeviceId) -> Result<Device, QueryError> {
        query::get_device(&*self.registry.read().await, id)
    }

    pub async fn classes(&self, id: DeviceId) -> Result<BTreeMap<u8, ParameterGroup>, QueryError> {
        query::get_device_classes(&*self.registry.read().await, id)
    }

    pub async fn class(&self, id: DeviceId, class: &str) -> Result<ParameterGroup, QueryError> {
        query::get_class(&*self.registry.read().await, id, class)
    }

    pub async fn parameter(
        &self,
        id: DeviceId,
        class: &str,
        selector: &ParameterSelector,
    ) -> Result<Parameter, QueryError> {
        query::get_parameter(&*self.registry.read().await, id, class, selector)
    }

    /// Validate a write and hand it to the driver.
    ///
    /// Returns the parameter as currently stored; the registry is updated
    /// when the driver reports the new value.
    pub async fn set_parameter(
        &self,
        id: DeviceId,
        class: &str,
        selector: &ParameterSelector,
        payload: Option<&Value>,
    ) -> Result<Parameter, QueryError> {
        let plan = {
            let registry = self.registry.read().await;
            query::plan_set_parameter(&registry, id, class, selector, payload)?
        };
        info!(command = ?plan.command, "Sending value to driver");
        self.controller.submit(plan.command);
        Ok(plan.parameter)
    }

    pub async fn stats(&self) -> RegistryStats {
        self.registry.read().await.stats()
    }

    /// Summary lines for every device
    pub async fn network_report(&self) -> Vec<String> {
        report::network_summary(&self.devices().await)
    }

    /// Detailed lines for one device
    pub async fn device_report(&self, id: DeviceId) -> Result<Vec<String>, QueryError> {
        self.device(id).await.map(|d| report::device_report(&d))
    }
}
