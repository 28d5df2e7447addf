//! `run` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{CancellationToken, RigBlueprint};
use device_registry::SimulatedProvider;
use synccam_cli::{CliError, Pipeline};
use tracing::info;

use crate::cli::RunArgs;

/// Execute the `run` command
pub fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut blueprint = ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut blueprint, args);
    ConfigLoader::validate(&blueprint).context("Invalid configuration after CLI overrides")?;

    info!(
        devices = blueprint.devices.len(),
        interval_ms = blueprint.trigger.interval_ms,
        max_tokens = ?blueprint.trigger.max_tokens,
        base_path = %blueprint.persistence.base_path.display(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    if let Some(port) = blueprint.observability.metrics_port {
        observability::init_metrics_only(port)?;
    }

    let cancel = CancellationToken::new();
    install_interrupt_handler(cancel.clone())?;

    let provider = SimulatedProvider::new();
    info!("Starting pipeline...");

    match Pipeline::new(blueprint).run(&provider, cancel) {
        Ok(stats) => {
            info!(
                tokens = stats.tokens_processed,
                committed = stats.committed(),
                failed = stats.failed(),
                cancelled = stats.cancelled,
                fps = format!("{:.2}", stats.fps()),
                "Pipeline completed"
            );
            stats.print_summary();
            Ok(())
        }
        Err(e @ CliError::Acquisition { .. }) => {
            if let Some(stats) = e.stats() {
                stats.print_summary();
            }
            Err(e).context("Pipeline stopped on a device fault")
        }
        Err(e) => Err(e).context("Pipeline execution failed"),
    }
}

fn apply_overrides(blueprint: &mut RigBlueprint, args: &RunArgs) {
    if let Some(max_tokens) = args.max_tokens {
        info!(max_tokens, "Overriding token limit from CLI");
        blueprint.trigger.max_tokens = Some(max_tokens);
    }
    if let Some(interval_ms) = args.interval_ms {
        info!(interval_ms, "Overriding trigger interval from CLI");
        blueprint.trigger.interval_ms = interval_ms;
    }
    if let Some(ref output) = args.output {
        info!(output = %output.display(), "Overriding storage base path from CLI");
        blueprint.persistence.base_path = output.clone();
    }
    if let Some(port) = args.metrics_port {
        blueprint.observability.metrics_port = Some(port);
    }
}

/// SIGINT / SIGTERM only set the cancellation token
fn install_interrupt_handler(cancel: CancellationToken) -> Result<()> {
    ctrlc::set_handler(interrupt_action(cancel)).context("Failed to install interrupt handler")
}

fn interrupt_action(cancel: CancellationToken) -> impl FnMut() + Send + 'static {
    move || cancel.cancel()
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &RigBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Trigger:");
    println!("  Interval: {} ms", blueprint.trigger.interval_ms);
    match blueprint.trigger.max_tokens {
        Some(max) => println!("  Tokens: {max}"),
        None => println!("  Tokens: unlimited"),
    }
    println!(
        "\nAcquisition: {} downsample 1/{}",
        blueprint.acquisition.pixel_format, blueprint.acquisition.downsample
    );
    println!(
        "Persistence: {:?} -> {} ({:?})",
        blueprint.persistence.sink_type,
        blueprint.persistence.base_path.display(),
        blueprint.persistence.image_format
    );

    println!("\nDevices ({}):", blueprint.devices.len());
    for device in &blueprint.devices {
        println!(
            "  - {} (serial {}) -> {}",
            device.id,
            device.serial,
            device.storage_prefix.display()
        );
    }

    println!();
}
