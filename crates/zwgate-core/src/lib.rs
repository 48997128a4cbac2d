//! zwgate Core - Device registry and query types for a Z-Wave controller bridge
//!
//! This crate provides the in-memory model behind the zwgate daemon:
//! - Command-class catalog and driver code tables
//! - Device / parameter-group / parameter records
//! - The registry that applies driver events in arrival order
//! - Change detection and the text renderings sent to observers
//! - The request/response query façade over the registry

pub mod catalog;
pub mod change;
pub mod device;
pub mod event;
pub mod query;
pub mod registry;
pub mod report;

pub use change::{detect_change, ValueChange};
pub use device::{Device, DeviceId, DeviceInfo, Parameter, ParameterGroup, ParameterValue};
pub use event::{DriverCommand, HardwareEvent};
pub use query::{Controller, ParameterSelector, QueryError, SetPlan};
pub use registry::{PollRequest, Registry, RegistryStats};
