//! Static lookup tables for Z-Wave command classes and driver codes

/// Command class whose groups get polling enabled when first created
pub const SWITCH_MULTILEVEL: u8 = 38;

/// Notification code the driver emits for no-op acknowledgements
pub const NOTIFICATION_NOOP: u8 = 2;

/// Canonical name of a command class
pub fn command_class_name(class_id: u8) -> Option<&'static str> {
    let name = match class_id {
        0 => "no_operation",
        32 => "basic",
        33 => "controller_replication",
        34 => "application_status",
        35 => "zip_services",
        36 => "zip_server",
        37 => "switch_binary",
        38 => "switch_multilevel",
        39 => "switch_all",
        40 => "switch_toggle_binary",
        41 => "switch_toggle_multilevel",
        42 => "chimney_fan",
        43 => "scene_activation",
        44 => "scene_actuator_conf",
        45 => "scene_controller_conf",
        46 => "zip_client",
        47 => "zip_adv_services",
        48 => "sensor_binary",
        49 => "sensor_multilevel",
        50 => "meter",
        51 => "zip_adv_server",
        52 => "zip_adv_client",
        53 => "meter_pulse",
        56 => "thermostat_heating",
        60 => "meter_tbl_config",
        61 => "meter_tbl_monitor",
        62 => "meter_tbl_push",
        64 => "thermostat_mode",
        66 => "thermostat_operating_state",
        67 => "thermostat_setpoint",
        68 => "thermostat_fan_mode",
        69 => "thermostat_fan_state",
        70 => "climate_control_schedule",
        71 => "thermostat_setback",
        76 => "door_lock_logging",
        78 => "schedule_entry_lock",
        80 => "basic_window_covering",
        81 => "mtp_window_covering",
        96 => "multi_instance",
        98 => "door_lock",
        99 => "user_code",
        102 => "barrier_operator",
        112 => "configuration",
        113 => "alarm",
        114 => "manufacturer_specific",
        115 => "powerlevel",
        117 => "protection",
        118 => "lock",
        119 => "node_naming",
        122 => "firmware_update_md",
        123 => "grouping_name",
        124 => "remote_association_activate",
        125 => "remote_association",
        128 => "battery",
        129 => "clock",
        130 => "hail",
        132 => "wake_up",
        133 => "association",
        134 => "version",
        135 => "indicator",
        136 => "proprietary",
        137 => "language",
        138 => "time",
        139 => "time_parameters",
        140 => "geographic_location",
        141 => "composite",
        142 => "multi_instance_association",
        143 => "multi_cmd",
        144 => "energy_production",
        145 => "manufacturer_proprietary",
        146 => "screen_md",
        147 => "screen_attributes",
        148 => "simple_av_control",
        149 => "av_content_directory_md",
        150 => "av_renderer_status",
        151 => "av_content_search_md",
        152 => "security",
        153 => "av_tagging_md",
        154 => "ip_configuration",
        155 => "association_command_configuration",
        156 => "sensor_alarm",
        157 => "silence_alarm",
        158 => "sensor_configuration",
        239 => "mark",
        240 => "non_interoperable",
        _ => return None,
    };
    Some(name)
}

/// Class name for display, falling back to hex for unknown classes
pub fn class_label(class_id: u8) -> String {
    match command_class_name(class_id) {
        Some(name) => name.to_string(),
        None => format!("0x{:x}", class_id),
    }
}

/// Description of a node notification code
pub fn notification_name(code: u8) -> Option<&'static str> {
    let name = match code {
        0 => "Message complete",
        1 => "Timeout",
        2 => "No-op",
        3 => "Node is awake",
        4 => "Node is asleep",
        5 => "Node is dead",
        6 => "Node is alive",
        _ => return None,
    };
    Some(name)
}

/// Description of a controller command state
pub fn controller_state_name(state: u8) -> Option<&'static str> {
    let name = match state {
        0 => "No command in progress",
        1 => "The command is starting",
        2 => "The command was cancelled",
        3 => "Command invocation had error(s) and was aborted",
        4 => "Controller is waiting for a user action",
        5 => "Controller command is on a sleep queue wait for device",
        6 => "The controller is communicating with the other device to carry out the command",
        7 => "The command has completed successfully",
        8 => "The command has failed",
        9 => "The controller thinks the node is OK",
        10 => "The controller thinks the node has failed",
        _ => return None,
    };
    Some(name)
}

/// Name of a controller error code
pub fn controller_error_name(error: u8) -> Option<&'static str> {
    let name = match error {
        0 => "No error",
        1 => "ButtonNotFound",
        2 => "NodeNotFound",
        3 => "NotBridge",
        4 => "NotSUC",
        5 => "NotSecondary",
        6 => "NotPrimary",
        7 => "IsPrimary",
        8 => "NotFound",
        9 => "Busy",
        10 => "Failed",
        11 => "Disabled",
        12 => "Overflow",
        _ => return None,
    };
    Some(name)
}
