//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - The shipped rig configuration
//! - Full pipeline runs against the simulated camera backend
//! - Fault, cancellation and backpressure behaviour

#[cfg(test)]
mod support {
    use std::fs;
    use std::path::{Path, PathBuf};

    use contracts::{DeviceConfig, DeviceSettings, RigBlueprint, SimulationConfig};

    /// Parsed `{seq:08}-{host_ts}-{device_ts}.{ext}` file name
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct StoredFrame {
        pub path: PathBuf,
        pub sequence: u64,
        pub host_timestamp_us: i64,
        pub device_timestamp: u64,
    }

    pub fn device(id: &str) -> DeviceConfig {
        DeviceConfig {
            id: id.into(),
            serial: format!("SN-{id}"),
            storage_prefix: PathBuf::from("imgs").join(id),
            queue_capacity: 100,
            settings: DeviceSettings::default(),
            simulation: SimulationConfig {
                width: 32,
                height: 24,
                retrieval_latency_ms: 1,
                ..SimulationConfig::default()
            },
        }
    }

    pub fn rig(base: &Path, devices: Vec<DeviceConfig>) -> RigBlueprint {
        let mut blueprint = config_loader::ConfigLoader::load_from_str(
            "[[devices]]\nid = \"placeholder\"\nserial = \"0\"\nstorage_prefix = \"p\"\n",
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        blueprint.trigger.interval_ms = 2;
        blueprint.persistence.base_path = base.to_path_buf();
        blueprint.devices = devices;
        config_loader::ConfigLoader::validate(&blueprint).unwrap();
        blueprint
    }

    /// All frame files below `dir`, ordered by sequence
    pub fn stored_frames(dir: &Path) -> Vec<StoredFrame> {
        let mut frames = Vec::new();
        collect(dir, &mut frames);
        frames.sort_by_key(|f| f.sequence);
        frames
    }

    fn collect(dir: &Path, out: &mut Vec<StoredFrame>) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries {
            let path = entry.unwrap().path();
            if path.is_dir() {
                collect(&path, out);
            } else if let Some(frame) = parse(&path) {
                out.push(frame);
            }
        }
    }

    fn parse(path: &Path) -> Option<StoredFrame> {
        let stem = path.file_stem()?.to_str()?;
        let mut parts = stem.splitn(3, '-');
        let sequence = parts.next()?;
        if sequence.len() != 8 {
            return None;
        }
        Some(StoredFrame {
            path: path.to_path_buf(),
            sequence: sequence.parse().ok()?,
            host_timestamp_us: parts.next()?.parse().ok()?,
            device_timestamp: parts.next()?.parse().ok()?,
        })
    }
}

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{CameraSetting, PixelFormat, RetryConfig, SinkType};

    #[test]
    fn test_shipped_rig_config() {
        let blueprint =
            ConfigLoader::load_from_str(include_str!("../../../rig.toml"), ConfigFormat::Toml)
                .unwrap();

        assert_eq!(blueprint.device_ids().count(), 2);
        assert_eq!(blueprint.acquisition.pixel_format, PixelFormat::Mono8);
        assert!(matches!(
            blueprint.acquisition.retry,
            RetryConfig::Backoff { .. }
        ));
        assert_eq!(blueprint.persistence.sink_type, SinkType::File);

        let left = blueprint.device("left").unwrap();
        let settings = left.settings.to_settings();
        assert!(matches!(settings[0], CameraSetting::TriggerSource(_)));
        assert!(matches!(settings[1], CameraSetting::TriggerMode(_)));
        assert!(matches!(settings.last(), Some(CameraSetting::WhiteBalanceMode(_))));
    }

    #[test]
    fn test_json_and_toml_agree() {
        let blueprint =
            ConfigLoader::load_from_str(include_str!("../../../rig.toml"), ConfigFormat::Toml)
                .unwrap();
        let json = ConfigLoader::to_json(&blueprint).unwrap();
        let reloaded = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();

        assert_eq!(
            reloaded.device_ids().collect::<Vec<_>>(),
            blueprint.device_ids().collect::<Vec<_>>()
        );
        assert_eq!(reloaded.trigger.interval_ms, blueprint.trigger.interval_ms);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::thread;
    use std::time::{Duration, Instant};

    use acquisition::AcquisitionError;
    use contracts::{CancellationToken, DeviceError, TriggerMode};
    use device_registry::SimulatedProvider;
    use synccam_cli::{CliError, Pipeline};
    use tempfile::tempdir;

    use crate::support::{device, rig, stored_frames};

    /// Two devices, capacity 100, 10 tokens, no faults
    #[test]
    fn test_two_devices_ten_tokens() {
        let dir = tempdir().unwrap();
        let mut blueprint = rig(dir.path(), vec![device("cam1"), device("cam2")]);
        blueprint.trigger.max_tokens = Some(10);

        let provider = SimulatedProvider::new();
        let stats = Pipeline::new(blueprint)
            .run(&provider, CancellationToken::new())
            .unwrap();

        assert_eq!(stats.tokens_emitted, 10);
        assert_eq!(stats.tokens_processed, 10);
        assert_eq!(stats.committed(), 20);
        assert_eq!(stats.failed(), 0);
        assert_eq!(stats.frames_dropped, 0);
        assert!(!stats.cancelled);

        for id in ["cam1", "cam2"] {
            let frames = stored_frames(&dir.path().join("imgs").join(id));
            let sequences: Vec<u64> = frames.iter().map(|f| f.sequence).collect();
            assert_eq!(sequences, (0..10).collect::<Vec<_>>(), "{id}");

            assert!(frames
                .windows(2)
                .all(|w| w[1].host_timestamp_us > w[0].host_timestamp_us));
            assert!(frames
                .windows(2)
                .all(|w| w[1].device_timestamp > w[0].device_timestamp));

            let first = frames[0].path.file_name().unwrap().to_str().unwrap();
            assert!(first.starts_with("00000000-") && first.ends_with(".png"));

            // 32x24 halved by the default divisor
            let image = image::open(&frames[0].path).unwrap();
            assert_eq!((image.width(), image.height()), (16, 12));

            let probe = provider.probe(id).unwrap();
            assert!(!probe.is_acquiring());
            assert_eq!(probe.triggers(), 10);
        }
    }

    #[test]
    fn test_device_fault_stops_pipeline() {
        let dir = tempdir().unwrap();
        let mut faulty = device("cam2");
        faulty.simulation.fail_after = Some(4);
        let mut blueprint = rig(dir.path(), vec![device("cam1"), faulty]);
        blueprint.trigger.max_tokens = Some(50);

        let provider = SimulatedProvider::new();
        let cancel = CancellationToken::new();
        let err = Pipeline::new(blueprint)
            .run(&provider, cancel.clone())
            .unwrap_err();

        let CliError::Acquisition { source, stats } = &err else {
            panic!("unexpected error: {err}");
        };
        match source {
            AcquisitionError::DeviceFault {
                device_id,
                token,
                source,
            } => {
                assert_eq!(device_id, "cam2");
                assert_eq!(token.index(), 4);
                assert!(matches!(source, DeviceError::IncompleteFrame { .. }));
            }
            other => panic!("unexpected acquisition error: {other}"),
        }
        assert!(cancel.is_cancelled());
        assert!(stats.cancelled);

        for id in ["cam1", "cam2"] {
            let sequences: Vec<u64> = stored_frames(&dir.path().join("imgs").join(id))
                .iter()
                .map(|f| f.sequence)
                .collect();
            assert_eq!(sequences, vec![0, 1, 2, 3], "{id}");

            let probe = provider.probe(id).unwrap();
            assert!(!probe.is_acquiring());
            assert!(!probe.trigger_enabled());
        }
    }

    #[test]
    fn test_cancellation_terminates_unbounded_run() {
        let dir = tempdir().unwrap();
        let mut blueprint = rig(dir.path(), vec![device("cam1"), device("cam2")]);
        blueprint.trigger.interval_ms = 1;
        blueprint.trigger.max_tokens = None;

        let cancel = CancellationToken::new();
        let interrupter = {
            let cancel = cancel.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(100));
                cancel.cancel();
            })
        };

        let started = Instant::now();
        let stats = Pipeline::new(blueprint)
            .run(&SimulatedProvider::new(), cancel)
            .unwrap();
        interrupter.join().unwrap();

        assert!(stats.cancelled);
        assert!(stats.tokens_processed > 0);
        assert!(stats.tokens_processed <= stats.tokens_emitted);
        assert!(started.elapsed() < Duration::from_secs(10));

        // every captured frame is either committed or reported as dropped
        assert_eq!(
            stats.committed() + stats.failed() + stats.frames_dropped,
            stats.tokens_processed * 2
        );

        // whatever was committed is a gap-free prefix of the token stream
        for (report, id) in stats.workers.iter().zip(["cam1", "cam2"]) {
            assert!(report.committed <= stats.tokens_processed);
            let sequences: Vec<u64> = stored_frames(&dir.path().join("imgs").join(id))
                .iter()
                .map(|f| f.sequence)
                .collect();
            assert_eq!(sequences, (0..report.committed).collect::<Vec<_>>());
        }
    }

    /// Cancellation lands while a slow retrieval is in flight; that token's
    /// frame still reaches storage
    #[test]
    fn test_in_flight_token_committed_after_cancel() {
        let dir = tempdir().unwrap();
        let mut slow = device("cam1");
        slow.simulation.retrieval_latency_ms = 60;
        let mut blueprint = rig(dir.path(), vec![slow]);
        blueprint.trigger.interval_ms = 1;
        blueprint.trigger.max_tokens = None;

        let cancel = CancellationToken::new();
        let interrupter = {
            let cancel = cancel.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(90));
                cancel.cancel();
            })
        };

        let stats = Pipeline::new(blueprint)
            .run(&SimulatedProvider::new(), cancel)
            .unwrap();
        interrupter.join().unwrap();

        assert!(stats.cancelled);
        assert!(stats.tokens_processed >= 1);
        assert_eq!(stats.frames_dropped, 0);
        assert_eq!(stats.committed(), stats.tokens_processed);

        let sequences: Vec<u64> = stored_frames(&dir.path().join("imgs").join("cam1"))
            .iter()
            .map(|f| f.sequence)
            .collect();
        assert_eq!(sequences, (0..stats.tokens_processed).collect::<Vec<_>>());
    }

    /// A free-running camera alongside a triggered one stays in step by token
    #[test]
    fn test_free_running_device_in_rig() {
        let dir = tempdir().unwrap();
        let mut free = device("cam2");
        free.settings.trigger_mode = Some(TriggerMode::Off);
        let mut blueprint = rig(dir.path(), vec![device("cam1"), free]);
        blueprint.trigger.max_tokens = Some(5);

        let stats = Pipeline::new(blueprint)
            .run(&SimulatedProvider::new(), CancellationToken::new())
            .unwrap();

        assert_eq!(stats.tokens_processed, 5);
        assert_eq!(stats.committed(), 10);
        for id in ["cam1", "cam2"] {
            let sequences: Vec<u64> = stored_frames(&dir.path().join("imgs").join(id))
                .iter()
                .map(|f| f.sequence)
                .collect();
            assert_eq!(sequences, (0..5).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_unavailable_device_fails_before_capture() {
        let dir = tempdir().unwrap();
        let blueprint = rig(dir.path(), vec![device("cam1"), device("cam2")]);
        let provider = SimulatedProvider::new().with_unavailable("SN-cam2");

        let err = Pipeline::new(blueprint)
            .run(&provider, CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, CliError::Devices(_)));
        assert!(stored_frames(dir.path()).is_empty());
    }
}

#[cfg(test)]
mod backpressure_tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use acquisition::{
        AcquisitionCoordinator, CoordinatorConfig, CoordinatorExit, DeviceOutput, TriggerGenerator,
    };
    use contracts::{CancellationToken, ContractError, Frame, FrameSink, PixelFormat};
    use device_registry::{DeviceRegistry, SimulatedProvider};
    use persistence::{PersistenceWorker, WorkerHandle};
    use spsc_queue::{bounded, RetryPolicy};

    use crate::support::device;

    /// Sink that holds every commit until opened
    struct GatedSink {
        open: Arc<AtomicBool>,
        seen: Arc<Mutex<Vec<u64>>>,
    }

    impl FrameSink for GatedSink {
        fn name(&self) -> &str {
            "gated"
        }

        fn commit(&mut self, frame: &Frame) -> Result<(), ContractError> {
            while !self.open.load(Ordering::Acquire) {
                thread::sleep(Duration::from_millis(1));
            }
            self.seen.lock().unwrap().push(frame.sequence);
            Ok(())
        }

        fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    /// A stalled worker keeps its queue full; nothing is lost once it resumes
    #[test]
    fn test_stalled_worker_loses_nothing() {
        const CAPACITY: usize = 4;
        const TOKENS: u64 = 20;

        let mut config = device("cam1");
        config.queue_capacity = CAPACITY;
        config.simulation.retrieval_latency_ms = 0;

        let provider = SimulatedProvider::new();
        let registry = DeviceRegistry::open(&provider, std::slice::from_ref(&config)).unwrap();
        let cancel = CancellationToken::new();
        let retry = RetryPolicy::Backoff {
            initial: Duration::from_micros(50),
            max: Duration::from_millis(1),
        };

        let (trigger_tx, trigger_rx) = bounded(8);
        let (frame_tx, frame_rx) = bounded(CAPACITY);

        let coordinator = AcquisitionCoordinator::new(
            registry,
            trigger_rx,
            vec![DeviceOutput {
                storage_prefix: config.storage_prefix.clone(),
                producer: frame_tx,
            }],
            CoordinatorConfig {
                pixel_format: PixelFormat::Mono8,
                downsample: 1,
                retry,
            },
            cancel.clone(),
        )
        .unwrap()
        .spawn()
        .unwrap();

        let generator = TriggerGenerator::new(Duration::ZERO, Some(TOKENS), trigger_tx, cancel.clone())
            .with_retry(retry)
            .spawn()
            .unwrap();

        let open = Arc::new(AtomicBool::new(false));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = GatedSink {
            open: Arc::clone(&open),
            seen: Arc::clone(&seen),
        };
        let worker = WorkerHandle::spawn(PersistenceWorker::new(
            config.id.clone(),
            frame_rx,
            sink,
            cancel.clone(),
        ))
        .unwrap();

        // one frame held by the sink, CAPACITY queued, one blocked in the
        // coordinator's retry loop
        let stalled_at = CAPACITY as u64 + 2;
        let probe = provider.probe("cam1").unwrap();
        while probe.frames_delivered() < stalled_at {
            thread::sleep(Duration::from_millis(1));
        }
        thread::sleep(Duration::from_millis(20));
        assert_eq!(probe.frames_delivered(), stalled_at);
        assert_eq!(worker.metrics().committed(), 0);

        open.store(true, Ordering::Release);

        let trigger_report = generator.join().unwrap();
        let acquisition = coordinator.join().unwrap().unwrap();
        let report = worker.join();

        assert_eq!(trigger_report.tokens_emitted, TOKENS);
        assert_eq!(acquisition.exit, CoordinatorExit::TriggerStreamEnded);
        assert_eq!(acquisition.frames_dropped, 0);
        assert_eq!(report.committed, TOKENS);
        assert_eq!(*seen.lock().unwrap(), (0..TOKENS).collect::<Vec<_>>());
    }
}
