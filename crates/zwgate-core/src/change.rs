//! Change detection and the notification lines derived from it

use serde::Serialize;

use crate::catalog::class_label;
use crate::device::{DeviceId, Parameter, ParameterValue};

/// A notable change of a parameter value on a ready device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueChange {
    pub device: DeviceId,
    pub class_id: u8,
    pub instance: u8,
    pub index: u16,
    pub label: String,
    pub old_value: Option<ParameterValue>,
    pub new_value: Option<ParameterValue>,
}

/// Compare the stored and incoming parameter; `None` when the value content is equal
pub fn detect_change(
    device: DeviceId,
    class_id: u8,
    old: &Parameter,
    new: &Parameter,
) -> Option<ValueChange> {
    let changed = match (&old.value, &new.value) {
        (Some(a), Some(b)) => !a.same_content(b),
        (None, None) => false,
        _ => true,
    };
    if !changed {
        return None;
    }

    Some(ValueChange {
        device,
        class_id,
        instance: new.instance,
        index: new.index,
        label: new.label.clone(),
        old_value: old.value.clone(),
        new_value: new.value.clone(),
    })
}

impl ValueChange {
    /// Human-readable line for logs and console sessions
    pub fn log_line(&self) -> String {
        format!(
            "[Node {}] {}: {} changed from {} to {}",
            self.device,
            class_label(self.class_id),
            self.label,
            display_value(self.old_value.as_ref()),
            display_value(self.new_value.as_ref()),
        )
    }

    /// Space-delimited line for event-stream subscribers
    pub fn event_line(&self) -> String {
        format!(
            "value_changed {} {} {} {} {} {}",
            self.device,
            self.class_id,
            self.instance,
            self.index,
            event_token(self.old_value.as_ref()),
            event_token(self.new_value.as_ref()),
        )
    }
}

pub fn device_added_line(device: DeviceId) -> String {
    format!("node_added {}", device)
}

pub fn device_ready_line(device: DeviceId) -> String {
    format!("node_ready {}", device)
}

fn display_value(value: Option<&ParameterValue>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "(none)".to_string())
}

// Keeps one token per value: empty or whitespace-bearing text is JSON-quoted.
fn event_token(value: Option<&ParameterValue>) -> String {
    let text = match value {
        Some(v) => v.to_string(),
        None => return "-".to_string(),
    };
    if text.is_empty() || text.chars().any(char::is_whitespace) {
        serde_json::Value::String(text).to_string()
    } else {
        text
    }
}
