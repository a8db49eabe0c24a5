//! # Integration Tests
//!
//! Cross-crate tests of the subscriber engine.
//!
//! Covers:
//! - contract and configuration round trips
//! - metadata parsing and calibration resolving
//! - engine scenarios over the in-process bus and the simulated host
//! - an end-to-end run against the simulated DAQ

#[cfg(test)]
mod support {
    use std::sync::Arc;

    use contracts::{EngineConfig, RawFrame};
    use host_sim::CollectingDiagnostics;
    use ingestion::{encode_block, FramePublisher, LocalBus};
    use serde_json::{json, Value};
    use sync_engine::SubscriberEngine;

    /// Metadata document with one entry per `(name, gain, offset, delay)`
    pub fn document(samplerate: f64, channels: &[(&str, f64, f64, i64)]) -> Value {
        let mut described = serde_json::Map::new();
        let mut columns = serde_json::Map::new();
        for (i, (name, gain, offset, delay)) in channels.iter().enumerate() {
            let pin = format!("AI{i}");
            described.insert(
                name.to_string(),
                json!({"ai_pin": pin, "gain": gain, "offset": offset, "delay": delay, "unit": "V"}),
            );
            columns.insert(pin, json!(i));
        }
        json!({
            "daq_info": {
                "board": {
                    "samplerate": samplerate,
                    "adc_range": [-32768, 32767],
                    "differential": false
                },
                "channel": described
            },
            "data_columns": columns
        })
    }

    pub fn metadata_frame(doc: &Value) -> RawFrame {
        RawFrame::new(doc.to_string().into_bytes(), Vec::new())
    }

    pub fn data_frame(samples: &[i16]) -> RawFrame {
        RawFrame::new(Vec::new(), encode_block(samples))
    }

    pub struct Rig {
        pub bus: LocalBus,
        pub publisher: FramePublisher,
        pub engine: SubscriberEngine<LocalBus>,
        pub diagnostics: Arc<CollectingDiagnostics>,
    }

    impl Rig {
        pub fn new(address: &str, configure: impl FnOnce(&mut EngineConfig)) -> Self {
            let mut config = EngineConfig::new(address);
            config.retry.delay_ms = 0;
            configure(&mut config);

            let bus = LocalBus::new();
            let publisher = bus.bind(address).unwrap();
            let diagnostics = Arc::new(CollectingDiagnostics::new());
            let engine = SubscriberEngine::new(config, bus.clone(), diagnostics.clone());
            Self {
                bus,
                publisher,
                engine,
                diagnostics,
            }
        }

        /// Queue a metadata frame for the next update
        pub fn announce(&self, doc: &Value) {
            self.bus.preconnect(self.publisher.address()).unwrap();
            self.publisher.publish(metadata_frame(doc));
        }
    }
}

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ChannelKey, EngineConfig, DATA_CHANNEL_PREFIX};

    #[test]
    fn test_data_channel_keys() {
        let key = ChannelKey::data("U1");
        assert_eq!(key.as_str(), format!("{DATA_CHANNEL_PREFIX}U1"));
        assert_eq!(key.data_channel_name(), Some("U1"));
        assert!(!ChannelKey::new("DEBUG_DRIFT").is_data_channel());
    }

    #[test]
    fn test_engine_config_round_trip() {
        let mut config = EngineConfig::new("inproc://daq");
        config.drain.max_frames_per_cycle = Some(8);

        let toml = ConfigLoader::to_toml(&config).unwrap();
        let reloaded = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config, reloaded);
    }
}

#[cfg(test)]
mod metadata_tests {
    use super::support::document;
    use metadata::MetadataParser;

    #[test]
    fn test_parse_is_deterministic() {
        let payload = document(1000.0, &[("U2", 1.0, 0.0, 0), ("U1", 0.5, 0.1, 2)])
            .to_string()
            .into_bytes();

        let first = MetadataParser::parse(&payload).unwrap();
        let second = MetadataParser::parse(&payload).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.channels.keys().collect::<Vec<_>>(), vec!["U1", "U2"]);
    }

    #[test]
    fn test_delay_normalization() {
        let doc = document(1000.0, &[("A", 1.0, 0.0, -3), ("B", 1.0, 0.0, 1), ("C", 1.0, 0.0, 4)]);
        let snapshot = MetadataParser::parse_value(&doc).unwrap();
        let table = metadata::resolve(&snapshot).unwrap();

        assert_eq!(table.delay_min(), -3);
        let delays: Vec<i16> = table.iter().map(|(_, cal)| cal.delay).collect();
        assert_eq!(delays, vec![0, 4, 7]);
    }

    #[test]
    fn test_positive_delays_keep_zero_baseline() {
        let doc = document(1000.0, &[("A", 1.0, 0.0, 2), ("B", 1.0, 0.0, 5)]);
        let snapshot = MetadataParser::parse_value(&doc).unwrap();
        let table = metadata::resolve(&snapshot).unwrap();

        assert_eq!(table.delay_min(), 0);
        assert_eq!(table.get("A").unwrap().delay, 2);
        assert_eq!(table.get("B").unwrap().delay, 5);
    }
}

#[cfg(test)]
mod engine_tests {
    use super::support::{data_frame, document, Rig};
    use contracts::Severity;
    use host_sim::SimHost;

    #[test]
    fn test_demultiplex_two_channels() {
        let mut rig = Rig::new("inproc://demux", |_| {});
        let mut host = SimHost::new(1000.0);

        rig.announce(&document(1000.0, &[("A", 2.0, 1.0, 0), ("B", 2.0, 1.0, 0)]));
        rig.engine.update(&mut host).unwrap();

        rig.publisher.publish(data_frame(&[10, 20, 30, 40]));
        let report = rig.engine.process(&mut host);

        assert_eq!(report.frames_processed, 1);
        assert_eq!(host.recorder.samples("DATACHANNEL_A"), vec![19.0, 59.0]);
        assert_eq!(host.recorder.samples("DATACHANNEL_B"), vec![39.0, 79.0]);
    }

    #[test]
    fn test_update_reconciles_channel_set() {
        let mut rig = Rig::new("inproc://reconcile", |_| {});
        let mut host = SimHost::new(1000.0);

        rig.announce(&document(1000.0, &[("A", 1.0, 0.0, 0), ("B", 1.0, 0.0, 0)]));
        rig.engine.update(&mut host).unwrap();
        let handle_a = rig.engine.channel_handle("A").cloned().unwrap();

        rig.announce(&document(1000.0, &[("A", 1.0, 0.0, 0), ("C", 1.0, 0.0, 0)]));
        rig.engine.update(&mut host).unwrap();

        assert_eq!(rig.engine.channel_names(), vec!["A", "C"]);
        assert_eq!(rig.engine.channel_handle("A"), Some(&handle_a));
        assert_eq!(
            host.registry.keys(),
            vec!["DATACHANNEL_A", "DATACHANNEL_C", "DEBUG_DRIFT"]
        );
        assert_eq!(host.registry.reconfigured("DATACHANNEL_A"), Some(1));
        assert_eq!(host.registry.reconfigured("DATACHANNEL_C"), Some(0));
    }

    #[test]
    fn test_failed_update_keeps_previous_session() {
        let mut rig = Rig::new("inproc://retry", |config| {
            config.retry.max_attempts = 2;
            config.retry.delay_ms = 1;
        });
        let mut host = SimHost::new(1000.0);

        rig.announce(&document(1000.0, &[("A", 1.0, 0.0, 0)]));
        rig.engine.update(&mut host).unwrap();
        let keys = host.registry.keys();

        // nothing published for the second attempt
        assert!(rig.engine.update(&mut host).is_err());

        assert_eq!(rig.diagnostics.count(Severity::Error), 1);
        assert_eq!(host.registry.keys(), keys);
        assert!(rig.engine.is_connected());
        assert_eq!(rig.engine.channel_names(), vec!["A"]);
    }

    #[test]
    fn test_update_without_frames() {
        let mut rig = Rig::new("inproc://silent", |config| config.retry.max_attempts = 2);
        let mut host = SimHost::new(1000.0);

        assert!(rig.engine.update(&mut host).is_err());
        assert!(host.registry.is_empty());
        assert!(!rig.engine.is_connected());
        assert_eq!(rig.diagnostics.count(Severity::Error), 1);
    }

    #[test]
    fn test_malformed_frame_keeps_tick_accounting() {
        let mut rig = Rig::new("inproc://shape", |_| {});
        let mut host = SimHost::new(1000.0);

        rig.announce(&document(1000.0, &[("A", 1.0, 0.0, 0), ("B", 1.0, 0.0, 0)]));
        rig.engine.update(&mut host).unwrap();
        rig.engine.prepare(&host);
        assert_eq!(rig.engine.next_tick(), Some(0));

        rig.publisher.publish(data_frame(&[1, 2, 3, 4, 5]));
        rig.publisher.publish(data_frame(&[1, 2, 3, 4]));
        let report = rig.engine.process(&mut host);

        assert_eq!(report.frames_rejected, 1);
        assert_eq!(report.frames_processed, 1);
        assert_eq!(rig.engine.next_tick(), Some(2));
        let blocks = host.recorder.blocks("DATACHANNEL_A");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start_tick, 0);
    }

    #[test]
    fn test_drift_against_master_clock() {
        let mut rig = Rig::new("inproc://drift", |_| {});
        let mut host = SimHost::new(1000.0);

        rig.announce(&document(500.0, &[("A", 1.0, 0.0, 0)]));
        rig.engine.update(&mut host).unwrap();
        rig.engine.prepare(&host);

        rig.publisher.publish(data_frame(&[0; 480]));
        let first = rig.engine.process(&mut host);
        assert_eq!(first.drift, Some(0));
        assert_eq!(rig.engine.next_tick(), Some(480));

        // one second of master time is 500 board ticks
        host.clock.set_ticks(1000);
        let second = rig.engine.process(&mut host);
        assert_eq!(second.drift, Some(-20));

        let drift = host.recorder.async_samples("DEBUG_DRIFT");
        assert_eq!(drift.last().map(|s| (s.tick, s.value)), Some((1000, -20.0)));
    }

    #[test]
    fn test_empty_channel_set_rejects_data() {
        let mut rig = Rig::new("inproc://empty", |_| {});
        let mut host = SimHost::new(1000.0);

        rig.announce(&document(1000.0, &[]));
        rig.engine.update(&mut host).unwrap();
        assert!(rig.engine.channel_names().is_empty());

        rig.publisher.publish(data_frame(&[1, 2]));
        let report = rig.engine.process(&mut host);
        assert_eq!(report.frames_rejected, 1);
        assert_eq!(host.recorder.total_samples(), 0);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use contracts::EngineConfig;
    use host_sim::SimHost;
    use ingestion::{LocalBus, SimulatedDaq, SimulatorConfig};
    use observability::{DriftMetricsAggregator, TracingDiagnostics};
    use std::sync::Arc;
    use sync_engine::SubscriberEngine;

    use super::support::document;

    /// End-to-end: SimulatedDaq -> LocalBus -> SubscriberEngine -> SimHost
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_simulated_daq() {
        const ADDRESS: &str = "inproc://e2e";

        let bus = LocalBus::new();
        let publisher = bus.bind(ADDRESS).unwrap();
        bus.preconnect(ADDRESS).unwrap();

        let doc = document(1000.0, &[("U1", 0.001, 0.0, 0), ("U2", 0.001, 0.0, 1)]);
        let daq = SimulatedDaq::new(SimulatorConfig {
            metadata: doc.to_string().into_bytes().into(),
            channels: 2,
            samples_per_block: 20,
            block_rate_hz: 50.0,
            ..Default::default()
        });
        let daq_task = daq.start(publisher);

        let mut config = EngineConfig::new(ADDRESS);
        config.retry.max_attempts = 50;
        config.retry.delay_ms = 10;
        let mut engine = SubscriberEngine::new(config, bus.clone(), Arc::new(TracingDiagnostics));
        let mut host = SimHost::new(1000.0);

        tokio::task::block_in_place(|| engine.update(&mut host)).unwrap();
        engine.prepare(&host);

        let mut metrics = DriftMetricsAggregator::new();
        for _ in 0..10 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            host.clock.advance(20);
            let report = engine.process(&mut host);
            metrics.record_cycle(
                report.drift,
                report.frames_processed,
                report.frames_rejected,
                report.frames_pending,
            );
        }

        daq.stop();
        let published = daq_task.await.unwrap();
        engine.close();

        assert!(published > 0);
        let summary = metrics.summary();
        assert_eq!(summary.cycles, 10);
        assert_eq!(summary.frames_rejected, 0);
        assert!(summary.frames_processed > 0);

        // consecutive blocks of a channel are contiguous in ticks
        let blocks = host.recorder.blocks("DATACHANNEL_U1");
        assert!(!blocks.is_empty());
        for pair in blocks.windows(2) {
            assert_eq!(
                pair[1].start_tick,
                pair[0].start_tick + pair[0].samples.len() as u64
            );
        }
        // U2 is delayed by one tick: its head sample is dropped at tick 0
        // and later blocks start one tick earlier than U1's
        let u2 = host.recorder.blocks("DATACHANNEL_U2");
        assert!(blocks.len() >= 2 && u2.len() >= 2);
        assert_eq!(u2[0].start_tick, 0);
        assert_eq!(u2[0].samples.len() + 1, blocks[0].samples.len());
        assert_eq!(u2[1].start_tick + 1, blocks[1].start_tick);
    }
}
