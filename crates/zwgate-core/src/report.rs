//! Plain-text reports for console sessions

use crate::device::Device;

/// One summary line per device, preceded by a count
pub fn network_summary(devices: &[Device]) -> Vec<String> {
    let mut lines = Vec::with_capacity(devices.len() + 1);
    lines.push(format!("There are {} registered nodes", devices.len()));
    for device in devices {
        let info = &device.info;
        lines.push(format!(
            "Node {} - Manuf={}, Prod={}, Type={}, Name={}, Loc={}",
            device.id,
            info.manufacturer_id,
            info.product_id,
            info.product_type,
            info.name,
            info.location
        ));
    }
    lines
}

/// Descriptive fields followed by every class and parameter of a device
pub fn device_report(device: &Device) -> Vec<String> {
    let info = &device.info;
    let manufacturer = if info.manufacturer.is_empty() {
        format!("id={}", info.manufacturer_id)
    } else {
        info.manufacturer.clone()
    };
    let product = if info.product.is_empty() {
        format!("type={}, id={}", info.product_type, info.product_id)
    } else {
        info.product.clone()
    };

    let mut lines = vec![
        format!("   Manufacturer: {}", manufacturer),
        format!("   Product: {}", product),
        format!("   Name: {}", info.name),
        format!("   Type: {}", info.device_type),
        format!("   Location: {}", info.location),
    ];

    for group in device.groups.values() {
        match &group.class_name {
            Some(name) => lines.push(format!("   Command class '{}':", name)),
            None => lines.push(format!("   Command class 0x{:x}:", group.class_id)),
        }
        for (index, param) in &group.parameters {
            match &param.value {
                Some(value) => lines.push(format!(
                    "      <{}:{}> {} = {}",
                    group.class_id, index, param.label, value
                )),
                None => lines.push(format!("      <{}:{}> {}", group.class_id, index, param.label)),
            }
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceId, DeviceInfo, Parameter};
    use crate::registry::Registry;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.upsert_device(DeviceId(2));
        registry.apply_value_added(DeviceId(2), 38, Parameter::new(1, 0, "Level").with_value(40));
        registry.apply_value_added(DeviceId(2), 200, Parameter::new(1, 1, "Vendor Blob"));
        registry.mark_ready(
            DeviceId(2),
            DeviceInfo {
                manufacturer_id: "0x010f".to_string(),
                product_type: "0x0102".to_string(),
                product_id: "0x1000".to_string(),
                device_type: "Multilevel Power Switch".to_string(),
                name: "Lamp".to_string(),
                location: "Lounge".to_string(),
                ..Default::default()
            },
        );
        registry
    }

    #[test]
    fn test_network_summary() {
        let lines = network_summary(&registry().snapshot());
        assert_eq!(lines[0], "There are 1 registered nodes");
        assert_eq!(
            lines[1],
            "Node 2 - Manuf=0x010f, Prod=0x1000, Type=0x0102, Name=Lamp, Loc=Lounge"
        );
    }

    #[test]
    fn test_device_report_falls_back_to_ids() {
        let registry = registry();
        let lines = device_report(registry.get(DeviceId(2)).unwrap());
        assert_eq!(lines[0], "   Manufacturer: id=0x010f");
        assert_eq!(lines[1], "   Product: type=0x0102, id=0x1000");
        assert_eq!(lines[3], "   Type: Multilevel Power Switch");
        assert!(lines.contains(&"   Command class 'switch_multilevel':".to_string()));
        assert!(lines.contains(&"      <38:0> Level = 40".to_string()));
        assert!(lines.contains(&"   Command class 0xc8:".to_string()));
        assert!(lines.contains(&"      <200:1> Vendor Blob".to_string()));
    }
}
