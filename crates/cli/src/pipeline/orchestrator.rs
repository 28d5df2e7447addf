//! Pipeline orchestrator - wires and runs all components.
//!
//! Threads: one trigger generator, one acquisition coordinator, one
//! persistence worker per device. Joined in that order.

use std::time::Instant;

use acquisition::{
    AcquisitionCoordinator, AcquisitionError, AcquisitionReport, CoordinatorConfig, DeviceOutput,
    TriggerGenerator, TriggerReport,
};
use contracts::{CancellationToken, RigBlueprint};
use device_registry::{DeviceProvider, DeviceRegistry};
use persistence::{create_sink, PersistenceWorker, WorkerHandle};
use spsc_queue::bounded;
use tracing::{error, info, instrument, warn};

use super::PipelineStats;
use crate::error::{CliError, Result};

/// Main pipeline orchestrator
pub struct Pipeline {
    blueprint: RigBlueprint,
}

impl Pipeline {
    /// Create a pipeline for a validated blueprint
    pub fn new(blueprint: RigBlueprint) -> Self {
        Self { blueprint }
    }

    pub fn blueprint(&self) -> &RigBlueprint {
        &self.blueprint
    }

    /// Run until the token limit is reached, `cancel` is set, or a device
    /// faults.
    ///
    /// Always joins every thread it started before returning. A device
    /// fault is returned as `CliError::Acquisition` carrying the partial
    /// statistics.
    #[instrument(
        name = "pipeline_run",
        skip_all,
        fields(provider = provider.name(), devices = self.blueprint.devices.len())
    )]
    pub fn run<P>(self, provider: &P, cancel: CancellationToken) -> Result<PipelineStats>
    where
        P: DeviceProvider + ?Sized,
    {
        let start_time = Instant::now();
        let blueprint = &self.blueprint;

        // 1. Devices
        let registry = DeviceRegistry::open(provider, &blueprint.devices)?;
        info!(devices = ?registry.ids(), "devices opened");

        // 2. Output queues and persistence workers
        let mut outputs = Vec::with_capacity(blueprint.devices.len());
        let mut workers = Vec::with_capacity(blueprint.devices.len());
        for device in &blueprint.devices {
            let (tx, rx) = bounded(device.queue_capacity);
            let sink = create_sink(&device.id, &blueprint.persistence)?;
            let worker = PersistenceWorker::new(device.id.clone(), rx, sink, cancel.clone())
                .with_idle_quantum(blueprint.persistence.idle_quantum());
            workers.push(WorkerHandle::spawn(worker)?);
            outputs.push(DeviceOutput {
                storage_prefix: device.storage_prefix.clone(),
                producer: tx,
            });
        }
        info!(
            workers = workers.len(),
            sink_type = ?blueprint.persistence.sink_type,
            base_path = %blueprint.persistence.base_path.display(),
            "persistence workers started"
        );

        // 3. Coordinator
        let coordinator_config = CoordinatorConfig::from(&blueprint.acquisition);
        let (trigger_tx, trigger_rx) = bounded(blueprint.trigger.queue_capacity);
        let coordinator = AcquisitionCoordinator::new(
            registry,
            trigger_rx,
            outputs,
            coordinator_config,
            cancel.clone(),
        )
        .map_err(|source| fail_setup(source, &cancel))?
        .spawn()
        .map_err(|source| {
            cancel.cancel();
            CliError::spawn("acquisition", source)
        })?;

        // 4. Trigger generator
        let generator = TriggerGenerator::new(
            blueprint.trigger.interval(),
            blueprint.trigger.max_tokens,
            trigger_tx,
            cancel.clone(),
        )
        .with_retry(coordinator_config.retry)
        .spawn();
        let generator = match generator {
            Ok(handle) => Some(handle),
            Err(e) => {
                // the dropped producer ends the trigger stream
                error!(error = %e, "failed to spawn trigger thread");
                cancel.cancel();
                None
            }
        };

        info!(
            interval_ms = blueprint.trigger.interval_ms,
            max_tokens = ?blueprint.trigger.max_tokens,
            "pipeline running"
        );

        // 5. Join: generator, coordinator, workers
        let trigger_report = match generator.map(|h| h.join()) {
            Some(Ok(report)) => report,
            Some(Err(_)) => {
                error!("trigger thread panicked");
                cancel.cancel();
                TriggerReport::default()
            }
            None => TriggerReport::default(),
        };
        if trigger_report.cancelled {
            warn!(
                tokens_emitted = trigger_report.tokens_emitted,
                "shutdown requested, draining pipeline"
            );
        }

        let acquisition = match coordinator.join() {
            Ok(result) => result.map_err(Some),
            Err(_) => {
                error!("acquisition thread panicked");
                Err(None)
            }
        };
        if acquisition.is_err() {
            cancel.cancel();
        }

        let worker_reports: Vec<_> = workers.into_iter().map(WorkerHandle::join).collect();

        let mut stats = PipelineStats {
            tokens_emitted: trigger_report.tokens_emitted,
            cancelled: cancel.is_cancelled(),
            duration: start_time.elapsed(),
            workers: worker_reports,
            ..Default::default()
        };

        match acquisition {
            Ok(report) => {
                apply_report(&mut stats, report);
                info!(
                    tokens = stats.tokens_processed,
                    committed = stats.committed(),
                    failed = stats.failed(),
                    duration_secs = stats.duration.as_secs_f64(),
                    "pipeline finished"
                );
                Ok(stats)
            }
            Err(Some(source)) => {
                warn!(
                    committed = stats.committed(),
                    error = %source,
                    "pipeline stopped on acquisition error"
                );
                Err(CliError::Acquisition {
                    source,
                    stats: Box::new(stats),
                })
            }
            Err(None) => Err(CliError::ThreadPanicked {
                component: "acquisition",
            }),
        }
    }
}

fn fail_setup(source: AcquisitionError, cancel: &CancellationToken) -> CliError {
    error!(error = %source, "coordinator setup failed");
    cancel.cancel();
    CliError::Acquisition {
        source,
        stats: Box::default(),
    }
}

fn apply_report(stats: &mut PipelineStats, report: AcquisitionReport) {
    stats.tokens_processed = report.tokens_processed;
    stats.frames_dropped = report.frames_dropped;
    stats.capture = report.capture;
    if report.shutdown_failures > 0 {
        warn!(
            failures = report.shutdown_failures,
            "some devices did not stop cleanly"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DeviceConfig, DeviceSettings, SimulationConfig, SinkType};
    use device_registry::SimulatedProvider;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn blueprint(base: PathBuf, ids: &[&str]) -> RigBlueprint {
        let mut blueprint: RigBlueprint = serde_json::from_str(r#"{"devices": []}"#).unwrap();
        blueprint.trigger.interval_ms = 1;
        blueprint.trigger.max_tokens = Some(5);
        blueprint.persistence.base_path = base;
        blueprint.devices = ids
            .iter()
            .map(|id| DeviceConfig {
                id: (*id).into(),
                serial: format!("sn-{id}"),
                storage_prefix: PathBuf::from(id),
                queue_capacity: 8,
                settings: DeviceSettings::default(),
                simulation: SimulationConfig {
                    width: 4,
                    height: 4,
                    ..SimulationConfig::default()
                },
            })
            .collect();
        blueprint
    }

    #[test]
    fn test_run_with_log_sink() {
        let dir = tempdir().unwrap();
        let mut bp = blueprint(dir.path().to_path_buf(), &["cam1", "cam2"]);
        bp.persistence.sink_type = SinkType::Log;

        let stats = Pipeline::new(bp)
            .run(&SimulatedProvider::new(), CancellationToken::new())
            .unwrap();

        assert_eq!(stats.tokens_emitted, 5);
        assert_eq!(stats.tokens_processed, 5);
        assert_eq!(stats.committed(), 10);
        assert!(!stats.cancelled);
    }

    #[test]
    fn test_missing_device_fails_setup() {
        let dir = tempdir().unwrap();
        let bp = blueprint(dir.path().to_path_buf(), &["cam1"]);
        let provider = SimulatedProvider::new().with_unavailable("sn-cam1");

        let err = Pipeline::new(bp)
            .run(&provider, CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, CliError::Devices(_)));
    }
}
