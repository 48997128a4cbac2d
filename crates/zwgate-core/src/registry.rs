//! Device registry: the in-memory model of every node the driver reported
//!
//! Events are applied one at a time in arrival order. The registry tolerates
//! partial and out-of-order notifications: value events may arrive before the
//! device was announced, and changes for untracked slots are dropped and
//! counted rather than treated as errors.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::catalog::{command_class_name, SWITCH_MULTILEVEL};
use crate::change::{detect_change, ValueChange};
use crate::device::{Device, DeviceId, DeviceInfo, Parameter, ParameterGroup};

/// Request to enable driver polling for one class of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollRequest {
    pub device: DeviceId,
    pub class_id: u8,
}

/// Counters describing the registry contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub devices: usize,
    pub ready: usize,
    /// Value events dropped because their device or slot was not tracked
    pub dropped_events: u64,
}

/// Owner of all device, parameter-group and parameter records
#[derive(Debug, Clone, Default)]
pub struct Registry {
    devices: BTreeMap<DeviceId, Device>,
    dropped_events: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty device record; existing records are left untouched.
    /// Returns true if a record was created.
    pub fn upsert_device(&mut self, id: DeviceId) -> bool {
        if self.devices.contains_key(&id) {
            return false;
        }
        self.devices.insert(id, Device::new(id));
        true
    }

    /// Insert or overwrite a parameter, creating the device and group as needed.
    ///
    /// Returns a poll request the first time a switch_multilevel group is
    /// created for the device.
    pub fn apply_value_added(
        &mut self,
        id: DeviceId,
        class_id: u8,
        parameter: Parameter,
    ) -> Option<PollRequest> {
        let device = self.devices.entry(id).or_insert_with(|| Device::new(id));

        let mut poll = None;
        let group = device.groups.entry(class_id).or_insert_with(|| {
            if class_id == SWITCH_MULTILEVEL {
                poll = Some(PollRequest {
                    device: id,
                    class_id,
                });
            }
            ParameterGroup::new(class_id, command_class_name(class_id).map(str::to_string))
        });

        group.parameters.insert(parameter.index, parameter);
        poll
    }

    /// Delete the parameter at `index`. Returns true if a slot was removed.
    pub fn apply_value_removed(&mut self, id: DeviceId, class_id: u8, index: u16) -> bool {
        let removed = self
            .devices
            .get_mut(&id)
            .and_then(|d| d.groups.get_mut(&class_id))
            .and_then(|g| g.parameters.remove(&index))
            .is_some();

        if !removed {
            self.dropped_events += 1;
            debug!(device = %id, class_id, index, "Ignoring removal of untracked value");
        }
        removed
    }

    /// Replace an existing parameter slot with a new reading.
    ///
    /// Yields a change record only when the device is ready and the value
    /// content differs from the stored one.
    pub fn apply_value_changed(
        &mut self,
        id: DeviceId,
        class_id: u8,
        parameter: Parameter,
    ) -> Option<ValueChange> {
        let Some(device) = self.devices.get_mut(&id) else {
            self.dropped_events += 1;
            debug!(device = %id, class_id, "Ignoring value change for unknown device");
            return None;
        };
        let ready = device.ready;

        let Some(slot) = device
            .groups
            .get_mut(&class_id)
            .and_then(|g| g.parameters.get_mut(&parameter.index))
        else {
            self.dropped_events += 1;
            debug!(
                device = %id,
                class_id,
                index = parameter.index,
                "Ignoring value change for untracked slot"
            );
            return None;
        };

        let change = if ready {
            detect_change(id, class_id, slot, &parameter)
        } else {
            None
        };
        *slot = parameter;
        change
    }

    /// Copy the descriptor into the device and mark it ready.
    ///
    /// Returns true only on the first transition; unknown or already-ready
    /// devices are left unchanged.
    pub fn mark_ready(&mut self, id: DeviceId, info: DeviceInfo) -> bool {
        match self.devices.get_mut(&id) {
            Some(device) if !device.ready => {
                device.info = info;
                device.ready = true;
                device.ready_at = Some(chrono::Utc::now());
                true
            }
            _ => false,
        }
    }

    /// Find a group by numeric class id, falling back to its catalog name
    pub fn resolve_class(&self, id: DeviceId, class: &str) -> Option<&ParameterGroup> {
        let device = self.devices.get(&id)?;

        if let Some(group) = class.parse::<u8>().ok().and_then(|c| device.groups.get(&c)) {
            return Some(group);
        }

        device
            .groups
            .values()
            .find(|g| g.class_name.as_deref() == Some(class))
    }

    pub fn resolve_parameter_by_index(
        &self,
        id: DeviceId,
        class: &str,
        instance: u8,
        index: u16,
    ) -> Option<&Parameter> {
        self.resolve_class(id, class)?.find_slot(instance, index)
    }

    pub fn resolve_parameter_by_label(
        &self,
        id: DeviceId,
        class: &str,
        label: &str,
    ) -> Option<&Parameter> {
        self.resolve_class(id, class)?.find_label(label)
    }

    pub fn get(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(&id)
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.devices.contains_key(&id)
    }

    /// Copy of every device, ordered by id
    pub fn snapshot(&self) -> Vec<Device> {
        self.devices.values().cloned().collect()
    }

    pub fn snapshot_one(&self, id: DeviceId) -> Option<Device> {
        self.devices.get(&id).cloned()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            devices: self.devices.len(),
            ready: self.devices.values().filter(|d| d.ready).count(),
            dropped_events: self.dropped_events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ParameterValue;

    const NODE: DeviceId = DeviceId(5);

    fn level(index: u16, value: i64) -> Parameter {
        Parameter::new(1, index, "Level").with_value(value)
    }

    fn info(name: &str) -> DeviceInfo {
        DeviceInfo {
            manufacturer: "Aeotec".to_string(),
            manufacturer_id: "0x0086".to_string(),
            product: "Micro Smart Dimmer".to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Device 5 announced and ready, with Level = 0 on switch_multilevel
    fn ready_dimmer() -> Registry {
        let mut registry = Registry::new();
        registry.upsert_device(NODE);
        registry.apply_value_added(NODE, 38, level(0, 0));
        assert!(registry.mark_ready(NODE, info("hall")));
        registry
    }

    #[test]
    fn test_upsert_keeps_existing_data() {
        let mut registry = ready_dimmer();
        assert!(!registry.upsert_device(NODE));

        let device = registry.get(NODE).unwrap();
        assert!(device.ready);
        assert_eq!(device.info.name, "hall");
        assert!(device.group(38).is_some());
    }

    #[test]
    fn test_polling_requested_once_per_class() {
        let mut registry = Registry::new();
        registry.upsert_device(NODE);

        let first = registry.apply_value_added(NODE, 38, level(0, 0));
        assert_eq!(
            first,
            Some(PollRequest {
                device: NODE,
                class_id: 38
            })
        );

        let second = registry.apply_value_added(NODE, 38, level(1, 0));
        assert_eq!(second, None);
        assert_eq!(registry.get(NODE).unwrap().group(38).unwrap().parameters.len(), 2);
    }

    #[test]
    fn test_other_classes_do_not_request_polling() {
        let mut registry = Registry::new();
        assert_eq!(registry.apply_value_added(NODE, 37, level(0, 0)), None);
        assert_eq!(registry.apply_value_added(NODE, 200, level(0, 0)), None);

        let device = registry.get(NODE).unwrap();
        assert_eq!(device.group(37).unwrap().class_name.as_deref(), Some("switch_binary"));
        assert_eq!(device.group(200).unwrap().class_name, None);
    }

    #[test]
    fn test_value_before_device_added_bootstraps_record() {
        let mut registry = Registry::new();
        registry.apply_value_added(NODE, 38, level(0, 7));

        let device = registry.get(NODE).unwrap();
        assert!(!device.ready);
        assert_eq!(device.info, DeviceInfo::default());

        // A late device-added must not discard the accumulated values
        registry.upsert_device(NODE);
        assert!(registry.mark_ready(NODE, info("porch")));
        let device = registry.get(NODE).unwrap();
        assert_eq!(device.info.name, "porch");
        assert_eq!(
            device.group(38).unwrap().parameters[&0].value,
            Some(ParameterValue::Int(7))
        );
    }

    #[test]
    fn test_change_notified_once_when_ready() {
        let mut registry = ready_dimmer();

        let change = registry.apply_value_changed(NODE, 38, level(0, 50)).unwrap();
        assert_eq!(change.old_value, Some(ParameterValue::Int(0)));
        assert_eq!(change.new_value, Some(ParameterValue::Int(50)));
        assert_eq!(change.label, "Level");

        assert!(registry.apply_value_changed(NODE, 38, level(0, 50)).is_none());
        let stored = registry.resolve_parameter_by_index(NODE, "38", 1, 0).unwrap();
        assert_eq!(stored.value, Some(ParameterValue::Int(50)));
    }

    #[test]
    fn test_blank_text_after_zero_is_not_a_change() {
        let mut registry = ready_dimmer();

        let mut blank = Parameter::new(1, 0, "Level");
        blank.value = Some(ParameterValue::Text(String::new()));
        assert!(registry.apply_value_changed(NODE, 38, blank).is_none());

        let mut text = Parameter::new(1, 0, "Level");
        text.value = Some(ParameterValue::Text("off".to_string()));
        assert!(registry.apply_value_changed(NODE, 38, text).is_some());
    }

    #[test]
    fn test_changes_before_ready_are_seeded_silently() {
        let mut registry = Registry::new();
        registry.upsert_device(NODE);
        registry.apply_value_added(NODE, 38, level(0, 0));

        assert!(registry.apply_value_changed(NODE, 38, level(0, 99)).is_none());
        let stored = registry.resolve_parameter_by_index(NODE, "38", 1, 0).unwrap();
        assert_eq!(stored.value, Some(ParameterValue::Int(99)));
    }

    #[test]
    fn test_out_of_order_events_are_dropped_and_counted() {
        let mut registry = Registry::new();
        assert!(registry.apply_value_changed(NODE, 38, level(0, 1)).is_none());
        assert!(!registry.contains(NODE));

        registry.upsert_device(NODE);
        assert!(registry.apply_value_changed(NODE, 38, level(0, 1)).is_none());
        assert!(registry.get(NODE).unwrap().groups.is_empty());

        assert!(!registry.apply_value_removed(NODE, 38, 0));
        assert!(!registry.apply_value_removed(DeviceId(77), 38, 0));
        assert_eq!(registry.stats().dropped_events, 4);
    }

    #[test]
    fn test_removed_slot_is_not_found() {
        let mut registry = ready_dimmer();
        registry.apply_value_changed(NODE, 38, level(0, 50));

        assert!(registry.apply_value_removed(NODE, 38, 0));
        assert!(registry.resolve_parameter_by_index(NODE, "38", 1, 0).is_none());
        assert!(registry.resolve_parameter_by_label(NODE, "38", "Level").is_none());
        // The group itself survives with no parameters
        assert!(registry.resolve_class(NODE, "38").is_some());
    }

    #[test]
    fn test_mark_ready_is_idempotent() {
        let mut registry = ready_dimmer();
        let before = registry.snapshot_one(NODE).unwrap();

        assert!(!registry.mark_ready(NODE, info("kitchen")));
        assert!(!registry.mark_ready(NODE, info("hall")));
        assert_eq!(registry.snapshot_one(NODE).unwrap(), before);
    }

    #[test]
    fn test_mark_ready_unknown_device_is_noop() {
        let mut registry = Registry::new();
        assert!(!registry.mark_ready(NODE, info("hall")));
        assert!(!registry.contains(NODE));
    }

    #[test]
    fn test_resolve_class_by_id_then_name() {
        let mut registry = ready_dimmer();
        registry.apply_value_added(NODE, 128, Parameter::new(1, 0, "Battery Level").with_value(90));

        assert_eq!(registry.resolve_class(NODE, "38").unwrap().class_id, 38);
        assert_eq!(registry.resolve_class(NODE, "battery").unwrap().class_id, 128);
        // Numeric token with no matching group falls through to name lookup and misses
        assert!(registry.resolve_class(NODE, "37").is_none());
        // Names are matched exactly
        assert!(registry.resolve_class(NODE, "Battery").is_none());
        assert!(registry.resolve_class(DeviceId(6), "38").is_none());
    }

    #[test]
    fn test_label_resolution_ignores_case() {
        let registry = ready_dimmer();
        for token in ["Level", "level", "LEVEL"] {
            let param = registry
                .resolve_parameter_by_label(NODE, "switch_multilevel", token)
                .unwrap();
            assert_eq!(param.index, 0);
        }
        assert!(registry.resolve_parameter_by_label(NODE, "38", "Bright").is_none());
    }

    #[test]
    fn test_application_is_deterministic_and_order_sensitive() {
        let events: Vec<(u8, Parameter, bool)> = vec![
            (38, level(0, 0), true),
            (38, level(1, 5), true),
            (38, level(0, 20), false),
            (37, Parameter::new(1, 0, "Switch").with_value(true), true),
        ];

        let fold = |events: &[(u8, Parameter, bool)]| {
            let mut registry = Registry::new();
            registry.upsert_device(NODE);
            for (class_id, param, added) in events {
                if *added {
                    registry.apply_value_added(NODE, *class_id, param.clone());
                } else {
                    registry.apply_value_changed(NODE, *class_id, param.clone());
                }
            }
            registry.apply_value_removed(NODE, 38, 1);
            registry.snapshot_one(NODE).unwrap().groups
        };

        assert_eq!(fold(&events), fold(&events));

        let mut reordered = events.clone();
        reordered.swap(0, 2);
        let groups = fold(&reordered);
        // The change arrived before its slot existed, so the later add wins
        assert_eq!(groups[&38].parameters[&0].value, Some(ParameterValue::Int(0)));
        assert_eq!(fold(&events)[&38].parameters[&0].value, Some(ParameterValue::Int(20)));
    }

    #[test]
    fn test_stats() {
        let mut registry = ready_dimmer();
        registry.upsert_device(DeviceId(9));
        let stats = registry.stats();
        assert_eq!(stats.devices, 2);
        assert_eq!(stats.ready, 1);
        assert_eq!(stats.dropped_events, 0);
    }
}
