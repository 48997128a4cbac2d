//! Request/response façade over the registry
//!
//! Every lookup returns an explicit `QueryError::NotFound` instead of
//! panicking or returning a default. Writes are only planned here; issuing
//! the resulting [`DriverCommand`] is left to the caller so that no command
//! is sent while the registry is locked.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::device::{Device, DeviceId, Parameter, ParameterGroup};
use crate::event::DriverCommand;
use crate::registry::Registry;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Malformed input: {0}")]
    MalformedInput(String),
}

/// Outbound command sink implemented by the hardware driver link
pub trait Controller: Send + Sync {
    /// Queue a command for the driver without waiting for its effect
    fn submit(&self, command: DriverCommand);

    fn set_value(&self, device: DeviceId, class_id: u8, instance: u8, index: u16, value: i64) {
        self.submit(DriverCommand::SetValue {
            device,
            class_id,
            instance,
            index,
            value,
        });
    }

    fn enable_poll(&self, device: DeviceId, class_id: u8) {
        self.submit(DriverCommand::EnablePoll { device, class_id });
    }
}

/// How a parameter is addressed within its class
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterSelector {
    Label(String),
    Slot { instance: u8, index: u16 },
}

impl fmt::Display for ParameterSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => write!(f, "'{}'", label),
            Self::Slot { instance, index } => write!(f, "{}:{}", instance, index),
        }
    }
}

/// A validated write: the command to send and the parameter it targets
#[derive(Debug, Clone, PartialEq)]
pub struct SetPlan {
    pub command: DriverCommand,
    /// The parameter as currently stored; the registry only changes once the
    /// driver reports the new value
    pub parameter: Parameter,
}

pub fn list_devices(registry: &Registry) -> Vec<Device> {
    registry.snapshot()
}

pub fn get_device(registry: &Registry, id: DeviceId) -> Result<Device, QueryError> {
    registry.snapshot_one(id).ok_or_else(|| device_not_found(id))
}

pub fn get_device_classes(
    registry: &Registry,
    id: DeviceId,
) -> Result<BTreeMap<u8, ParameterGroup>, QueryError> {
    registry
        .get(id)
        .map(|d| d.groups.clone())
        .ok_or_else(|| device_not_found(id))
}

pub fn get_class(
    registry: &Registry,
    id: DeviceId,
    class: &str,
) -> Result<ParameterGroup, QueryError> {
    registry
        .resolve_class(id, class)
        .cloned()
        .ok_or_else(|| class_not_found(id, class))
}

pub fn get_parameter(
    registry: &Registry,
    id: DeviceId,
    class: &str,
    selector: &ParameterSelector,
) -> Result<Parameter, QueryError> {
    let found = match selector {
        ParameterSelector::Label(label) => registry.resolve_parameter_by_label(id, class, label),
        ParameterSelector::Slot { instance, index } => {
            registry.resolve_parameter_by_index(id, class, *instance, *index)
        }
    };
    found.cloned().ok_or_else(|| {
        QueryError::NotFound(format!(
            "parameter {} in class '{}' on device {}",
            selector, class, id
        ))
    })
}

/// Resolve the target parameter and validate the payload for a write.
///
/// Resolution is checked first, so an unknown target reports `NotFound`
/// even when the payload is also invalid.
pub fn plan_set_parameter(
    registry: &Registry,
    id: DeviceId,
    class: &str,
    selector: &ParameterSelector,
    payload: Option<&Value>,
) -> Result<SetPlan, QueryError> {
    let group = registry
        .resolve_class(id, class)
        .ok_or_else(|| class_not_found(id, class))?;
    let parameter = get_parameter(registry, id, class, selector)?;

    let payload =
        payload.ok_or_else(|| QueryError::MalformedInput("missing 'value' field".to_string()))?;
    let value = coerce_integer(payload)?;

    Ok(SetPlan {
        command: DriverCommand::SetValue {
            device: id,
            class_id: group.class_id,
            instance: parameter.instance,
            index: parameter.index,
            value,
        },
        parameter,
    })
}

/// Coerce a JSON payload into an integer command value.
///
/// Accepts integers, floats (truncated toward zero) and strings holding an
/// integer.
pub fn coerce_integer(value: &Value) -> Result<i64, QueryError> {
    let coerced = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    coerced.ok_or_else(|| QueryError::MalformedInput(format!("{} is not an integer", value)))
}

fn device_not_found(id: DeviceId) -> QueryError {
    QueryError::NotFound(format!("device {}", id))
}

fn class_not_found(id: DeviceId, class: &str) -> QueryError {
    QueryError::NotFound(format!("class '{}' on device {}", class, id))
}
