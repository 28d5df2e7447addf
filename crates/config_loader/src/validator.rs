//! Config validation
//!
//! Rules:
//! - at least one device
//! - device ids and serials unique, storage prefixes non-empty
//! - trigger interval and every queue capacity > 0
//! - downsample divisor >= 1
//! - numeric camera settings in range
//! - backoff initial <= max
//! - max_tokens > 0 when set

use std::collections::HashSet;

use contracts::{ContractError, RetryConfig, RigBlueprint};

/// Validate a RigBlueprint
///
/// Returns the first error encountered.
pub fn validate(blueprint: &RigBlueprint) -> Result<(), ContractError> {
    validate_devices(blueprint)?;
    validate_device_settings(blueprint)?;
    validate_trigger(blueprint)?;
    validate_acquisition(blueprint)?;
    validate_persistence(blueprint)?;
    Ok(())
}

fn validate_devices(blueprint: &RigBlueprint) -> Result<(), ContractError> {
    if blueprint.devices.is_empty() {
        return Err(ContractError::config_validation(
            "devices",
            "at least one device is required",
        ));
    }

    let mut ids = HashSet::new();
    let mut serials = HashSet::new();
    for device in &blueprint.devices {
        if device.id.is_empty() {
            return Err(ContractError::config_validation(
                "devices[].id",
                "device id cannot be empty",
            ));
        }
        if !ids.insert(&device.id) {
            return Err(ContractError::config_validation(
                format!("devices[id={}]", device.id),
                "duplicate device id",
            ));
        }
        if !serials.insert(device.serial.as_str()) {
            return Err(ContractError::config_validation(
                format!("devices[{}].serial", device.id),
                format!("duplicate serial '{}'", device.serial),
            ));
        }
        if device.storage_prefix.as_os_str().is_empty() {
            return Err(ContractError::config_validation(
                format!("devices[{}].storage_prefix", device.id),
                "storage prefix cannot be empty",
            ));
        }
        if device.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("devices[{}].queue_capacity", device.id),
                "queue_capacity must be > 0",
            ));
        }
    }
    Ok(())
}

fn validate_device_settings(blueprint: &RigBlueprint) -> Result<(), ContractError> {
    for device in &blueprint.devices {
        for setting in device.settings.to_settings() {
            setting.validate().map_err(|_| {
                ContractError::config_validation(
                    format!("devices[{}].settings.{}", device.id, setting.name()),
                    format!("value out of range: {setting}"),
                )
            })?;
        }
        let sim = &device.simulation;
        if sim.width == 0 || sim.height == 0 {
            return Err(ContractError::config_validation(
                format!("devices[{}].simulation", device.id),
                format!("image size must be non-zero, got {}x{}", sim.width, sim.height),
            ));
        }
    }
    Ok(())
}

fn validate_trigger(blueprint: &RigBlueprint) -> Result<(), ContractError> {
    let trigger = &blueprint.trigger;
    if trigger.interval_ms == 0 {
        return Err(ContractError::config_validation(
            "trigger.interval_ms",
            "interval_ms must be > 0",
        ));
    }
    if trigger.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "trigger.queue_capacity",
            "queue_capacity must be > 0",
        ));
    }
    if trigger.max_tokens == Some(0) {
        return Err(ContractError::config_validation(
            "trigger.max_tokens",
            "max_tokens must be > 0 when set",
        ));
    }
    Ok(())
}

fn validate_acquisition(blueprint: &RigBlueprint) -> Result<(), ContractError> {
    let acquisition = &blueprint.acquisition;
    if acquisition.downsample == 0 {
        return Err(ContractError::config_validation(
            "acquisition.downsample",
            "downsample must be >= 1",
        ));
    }
    if let RetryConfig::Backoff { initial_us, max_us } = acquisition.retry {
        if initial_us == 0 || initial_us > max_us {
            return Err(ContractError::config_validation(
                "acquisition.retry",
                format!("backoff requires 0 < initial_us ({initial_us}) <= max_us ({max_us})"),
            ));
        }
    }
    Ok(())
}

fn validate_persistence(blueprint: &RigBlueprint) -> Result<(), ContractError> {
    if blueprint.persistence.idle_quantum_ms == 0 {
        return Err(ContractError::config_validation(
            "persistence.idle_quantum_ms",
            "idle_quantum_ms must be > 0",
        ));
    }
    Ok(())
}
