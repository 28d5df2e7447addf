//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{DeviceConfig, RigBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    trigger: TriggerInfo,
    acquisition: AcquisitionInfo,
    persistence: PersistenceInfo,
    devices: Vec<DeviceInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics_port: Option<u16>,
}

#[derive(Serialize)]
struct TriggerInfo {
    interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
    queue_capacity: usize,
}

#[derive(Serialize)]
struct AcquisitionInfo {
    pixel_format: String,
    downsample: u32,
    retry: String,
}

#[derive(Serialize)]
struct PersistenceInfo {
    sink_type: String,
    base_path: String,
    image_format: String,
    minute_buckets: bool,
}

#[derive(Serialize)]
struct DeviceInfo {
    id: String,
    serial: String,
    storage_prefix: String,
    queue_capacity: usize,
    /// Settings in the order they are applied
    settings: Vec<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn device_info(device: &DeviceConfig) -> DeviceInfo {
    DeviceInfo {
        id: device.id.to_string(),
        serial: device.serial.clone(),
        storage_prefix: device.storage_prefix.display().to_string(),
        queue_capacity: device.queue_capacity,
        settings: device
            .settings
            .to_settings()
            .iter()
            .map(ToString::to_string)
            .collect(),
    }
}

fn build_config_info(blueprint: &RigBlueprint) -> ConfigInfo {
    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        trigger: TriggerInfo {
            interval_ms: blueprint.trigger.interval_ms,
            max_tokens: blueprint.trigger.max_tokens,
            queue_capacity: blueprint.trigger.queue_capacity,
        },
        acquisition: AcquisitionInfo {
            pixel_format: blueprint.acquisition.pixel_format.to_string(),
            downsample: blueprint.acquisition.downsample,
            retry: format!("{:?}", blueprint.acquisition.retry),
        },
        persistence: PersistenceInfo {
            sink_type: format!("{:?}", blueprint.persistence.sink_type),
            base_path: blueprint.persistence.base_path.display().to_string(),
            image_format: blueprint.persistence.image_format.extension().to_string(),
            minute_buckets: blueprint.persistence.minute_buckets,
        },
        devices: blueprint.devices.iter().map(device_info).collect(),
        metrics_port: blueprint.observability.metrics_port,
    }
}

fn print_config_info(blueprint: &RigBlueprint) {
    let info = build_config_info(blueprint);

    println!("=== synccam Rig Configuration ===\n");
    println!("Version: {}", info.version);

    println!("\nTrigger");
    println!("   ├─ Interval: {} ms", info.trigger.interval_ms);
    match info.trigger.max_tokens {
        Some(max) => println!("   ├─ Tokens: {max}"),
        None => println!("   ├─ Tokens: unlimited"),
    }
    println!("   └─ Queue capacity: {}", info.trigger.queue_capacity);

    println!("\nAcquisition");
    println!("   ├─ Pixel format: {}", info.acquisition.pixel_format);
    println!("   ├─ Downsample: 1/{}", info.acquisition.downsample);
    println!("   └─ Retry: {}", info.acquisition.retry);

    println!("\nPersistence");
    println!("   ├─ Sink: {}", info.persistence.sink_type);
    println!("   ├─ Base path: {}", info.persistence.base_path);
    println!("   ├─ Image format: {}", info.persistence.image_format);
    println!("   └─ Minute buckets: {}", info.persistence.minute_buckets);

    println!("\nDevices ({})", info.devices.len());
    for (i, device) in info.devices.iter().enumerate() {
        let is_last = i == info.devices.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} {} (serial {}, queue {})",
            prefix, device.id, device.serial, device.queue_capacity
        );
        println!("   {}  ├─ Storage: {}", child_prefix, device.storage_prefix);
        println!("   {}  └─ Settings: {}", child_prefix, device.settings.join(", "));
    }

    if let Some(port) = info.metrics_port {
        println!("\nMetrics: port {port}");
    }

    println!();
}
