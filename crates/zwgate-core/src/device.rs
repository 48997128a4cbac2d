//! Device types for tracking Z-Wave nodes and their parameters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Node identifier assigned by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u8);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DeviceId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u8>().map(DeviceId)
    }
}

impl From<u8> for DeviceId {
    fn from(id: u8) -> Self {
        Self(id)
    }
}

/// Descriptive information reported once a node is fully interviewed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub manufacturer_id: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub product_id: String,
    /// Generic device type (e.g. "Multilevel Power Switch")
    #[serde(default, rename = "type")]
    pub device_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
}

/// Current reading of a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl ParameterValue {
    /// Numeric view of the value, if it has one
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(s) => s.trim().parse().ok(),
            Self::List(_) => None,
        }
    }

    /// Content equality: numeric when both sides are numeric, textual otherwise.
    /// Blank text counts as zero against a non-text number.
    pub fn same_content(&self, other: &Self) -> bool {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a == b,
            (Some(n), None) if other.is_blank() && !self.is_text() => n == 0.0,
            (None, Some(n)) if self.is_blank() && !other.is_text() => n == 0.0,
            _ => self.to_string() == other.to_string(),
        }
    }

    fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(s) => f.write_str(s),
            Self::List(items) => f.write_str(&items.join(",")),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParameterValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// A single value slot reported by the driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub instance: u8,
    pub index: u16,
    #[serde(default)]
    pub label: String,
    /// Absent for purely informational entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ParameterValue>,
    /// Driver value type ("byte", "bool", "list", ...)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    /// Allowed choices for list-typed values
    #[serde(default, rename = "values", skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<String>>,
}

impl Parameter {
    /// Create a parameter with only its addressing and label set
    pub fn new(instance: u8, index: u16, label: impl Into<String>) -> Self {
        Self {
            instance,
            index,
            label: label.into(),
            value: None,
            value_type: None,
            genre: None,
            units: None,
            help: None,
            read_only: None,
            write_only: None,
            min: None,
            max: None,
            items: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<ParameterValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Case-insensitive label comparison
    pub fn label_matches(&self, label: &str) -> bool {
        self.label.to_lowercase() == label.to_lowercase()
    }
}

/// Parameters of one command class on one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterGroup {
    #[serde(rename = "id")]
    pub class_id: u8,
    #[serde(rename = "name", skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Parameters keyed by their index within the class
    #[serde(rename = "values")]
    pub parameters: BTreeMap<u16, Parameter>,
}

impl ParameterGroup {
    pub fn new(class_id: u8, class_name: Option<String>) -> Self {
        Self {
            class_id,
            class_name,
            parameters: BTreeMap::new(),
        }
    }

    /// Parameter at an exact instance and index
    pub fn find_slot(&self, instance: u8, index: u16) -> Option<&Parameter> {
        self.parameters
            .values()
            .find(|p| p.instance == instance && p.index == index)
    }

    /// First parameter on instance 1 whose label matches, ignoring case
    pub fn find_label(&self, label: &str) -> Option<&Parameter> {
        self.parameters
            .values()
            .find(|p| p.instance == 1 && p.label_matches(label))
    }
}

/// A node known to the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    #[serde(flatten)]
    pub info: DeviceInfo,
    /// Set once the node has been fully interviewed; never reverts
    pub ready: bool,
    #[serde(rename = "classes")]
    pub groups: BTreeMap<u8, ParameterGroup>,
    pub discovered_at: DateTime<Utc>,
    pub ready_at: Option<DateTime<Utc>>,
}

impl Device {
    /// Create a device record with no descriptive information
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            info: DeviceInfo::default(),
            ready: false,
            groups: BTreeMap::new(),
            discovered_at: Utc::now(),
            ready_at: None,
        }
    }

    pub fn group(&self, class_id: u8) -> Option<&ParameterGroup> {
        self.groups.get(&class_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_parse() {
        assert_eq!("5".parse::<DeviceId>().unwrap(), DeviceId(5));
        assert_eq!(" 12 ".parse::<DeviceId>().unwrap(), DeviceId(12));
        assert!("abc".parse::<DeviceId>().is_err());
        assert!("300".parse::<DeviceId>().is_err());
    }

    #[test]
    fn test_value_content_equality() {
        let zero = ParameterValue::Int(0);
        assert!(zero.same_content(&ParameterValue::Float(0.0)));
        assert!(zero.same_content(&ParameterValue::Text("0".to_string())));
        assert!(zero.same_content(&ParameterValue::Bool(false)));
        assert!(!zero.same_content(&ParameterValue::Int(50)));

        let blank = ParameterValue::Text(" ".to_string());
        assert!(zero.same_content(&blank));
        assert!(blank.same_content(&ParameterValue::Float(0.0)));
        assert!(!blank.same_content(&ParameterValue::Int(1)));
        assert!(!blank.same_content(&ParameterValue::Text("0".to_string())));

        let on = ParameterValue::Text("On".to_string());
        assert!(on.same_content(&ParameterValue::Text("On".to_string())));
        assert!(!on.same_content(&ParameterValue::Text("on".to_string())));
    }

    #[test]
    fn test_value_deserializes_untagged() {
        let v: ParameterValue = serde_json::from_str("50").unwrap();
        assert_eq!(v, ParameterValue::Int(50));
        let v: ParameterValue = serde_json::from_str("21.5").unwrap();
        assert_eq!(v, ParameterValue::Float(21.5));
        let v: ParameterValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, ParameterValue::Bool(true));
        let v: ParameterValue = serde_json::from_str("\"Normal\"").unwrap();
        assert_eq!(v.to_string(), "Normal");
    }

    #[test]
    fn test_parameter_without_value_omits_field() {
        let param = Parameter::new(1, 3, "Library Version");
        let json = serde_json::to_value(&param).unwrap();
        assert!(json.get("value").is_none());
        assert_eq!(json["label"], "Library Version");
    }

    #[test]
    fn test_group_label_lookup_uses_instance_one() {
        let mut group = ParameterGroup::new(38, Some("switch_multilevel".to_string()));
        group
            .parameters
            .insert(0, Parameter::new(2, 0, "Level").with_value(10));
        group
            .parameters
            .insert(1, Parameter::new(1, 1, "Level").with_value(20));

        let found = group.find_label("LEVEL").unwrap();
        assert_eq!(found.index, 1);
        assert!(group.find_slot(2, 0).is_some());
        assert!(group.find_slot(1, 0).is_none());
    }
}
