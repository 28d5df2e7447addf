//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{RigBlueprint, SinkType};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    device_count: usize,
    interval_ms: u64,
    max_tokens: Option<u64>,
    sink_type: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    device_count: blueprint.devices.len(),
                    interval_ms: blueprint.trigger.interval_ms,
                    max_tokens: blueprint.trigger.max_tokens,
                    sink_type: format!("{:?}", blueprint.persistence.sink_type),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &RigBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.trigger.max_tokens.is_none() {
        warnings.push("trigger.max_tokens is unset - the run only stops on interrupt".to_string());
    }

    if blueprint.persistence.sink_type == SinkType::Log {
        warnings.push("persistence.sink_type is 'log' - no frames will be written".to_string());
    }

    for device in &blueprint.devices {
        if !device.settings.is_triggered() {
            warnings.push(format!(
                "Device '{}' is free-running (trigger_mode = off) - frames will not be in lock-step",
                device.id
            ));
        }
        if device.queue_capacity < blueprint.trigger.queue_capacity {
            warnings.push(format!(
                "Device '{}' queue ({}) is smaller than the trigger queue ({})",
                device.id, device.queue_capacity, blueprint.trigger.queue_capacity
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Devices: {}", summary.device_count);
            println!("  Interval: {} ms", summary.interval_ms);
            match summary.max_tokens {
                Some(max) => println!("  Tokens: {max}"),
                None => println!("  Tokens: unlimited"),
            }
            println!("  Sink: {}", summary.sink_type);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let file = config_file(
            r#"
            [[devices]]
            id = "cam1"
            serial = "A1"
            storage_prefix = "imgs/cam1"
            settings = { trigger_mode = "off" }
            "#,
        );
        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        });

        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("max_tokens")));
        assert!(warnings.iter().any(|w| w.contains("free-running")));
        assert_eq!(result.summary.unwrap().device_count, 1);
    }

    #[test]
    fn test_invalid_config() {
        let file = config_file("devices = []\n");
        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("devices"));
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: "/nonexistent/rig.toml".into(),
            json: false,
        });
        assert!(!result.valid);
    }
}
