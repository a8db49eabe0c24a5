//! Subscriber engine
//!
//! Host-driven, single-threaded: one `update` per (re)configuration, one
//! `process` per acquisition cycle.

use std::sync::Arc;

use contracts::{
    ChannelHandle, ChannelRegistry, ContractError, DiagnosticReport, DiagnosticsSink,
    EffectiveCalibration, EngineConfig, FrameTransport, MasterClock, MasterTimestamp,
    MetadataSnapshot, RawFrame, SampleEmitter, TransportConnector,
};
use metadata::MetadataParser;
use tracing::{debug, info, instrument, trace, warn};

use crate::demux::Demultiplexer;
use crate::reconcile::reconcile;
use crate::tick::{target_tick, DriftStats, TickSynchronizer};

/// Source name used in diagnostic reports
pub const DIAGNOSTICS_SOURCE: &str = "daq_subscriber";

/// Outcome of one process cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessReport {
    /// Frames demultiplexed and emitted
    pub frames_processed: usize,
    /// Frames dropped for their shape
    pub frames_rejected: usize,
    /// The drain budget was hit with frames still queued
    pub frames_pending: bool,
    /// Drift of this cycle, `None` without a session
    pub drift: Option<i64>,
}

/// Per-channel state of a session
#[derive(Debug)]
struct ChannelState {
    name: String,
    column_index: usize,
    calibration: EffectiveCalibration,
    buffer: Vec<f32>,
    handle: ChannelHandle,
}

/// Everything rebuilt on update
struct Session<T> {
    transport: T,
    snapshot: MetadataSnapshot,
    channels: Vec<ChannelState>,
    demux: Demultiplexer,
    sync: TickSynchronizer,
    drift_channel: Option<ChannelHandle>,
    /// Frame taken off the transport past the drain budget
    stashed: Option<RawFrame>,
    metadata_drift_reported: bool,
    clock_fault_reported: bool,
}

impl<T: FrameTransport> Session<T> {
    fn next_frame(&mut self) -> Option<RawFrame> {
        if let Some(frame) = self.stashed.take() {
            return Some(frame);
        }
        match self.transport.try_recv() {
            Ok(frame) => frame,
            Err(e) => {
                trace!(error = %e, "receive failure treated as no message");
                None
            }
        }
    }

    /// Compare an embedded metadata part against the session snapshot
    fn check_metadata(&mut self, payload: &[u8], diagnostics: &dyn DiagnosticsSink) {
        let drifted = match MetadataParser::daq_info(payload) {
            Ok(daq_info) => daq_info != self.snapshot.daq_info,
            Err(e) => {
                debug!(error = %e, "embedded metadata not comparable");
                false
            }
        };
        if !drifted {
            return;
        }

        warn!(
            endpoint = %self.transport.endpoint(),
            "frame metadata differs from the session snapshot, keeping current channel set"
        );
        observability::record_metadata_drift();

        if !self.metadata_drift_reported {
            self.metadata_drift_reported = true;
            diagnostics.report(DiagnosticReport::warning(
                DIAGNOSTICS_SOURCE,
                format!(
                    "metadata on '{}' changed since the last update; run an update to apply it",
                    self.transport.endpoint()
                ),
            ));
        }
    }

    /// Report a master clock reading that does not convert to a sample tick
    ///
    /// Logged and reported once per session.
    fn check_clock(&mut self, master: MasterTimestamp, diagnostics: &dyn DiagnosticsSink) {
        if target_tick(master, self.sync.samplerate()).is_some() || self.clock_fault_reported {
            return;
        }
        self.clock_fault_reported = true;

        warn!(
            master_ticks = master.ticks,
            frequency = master.frequency,
            locked = self.sync.is_locked(),
            "master clock reading does not convert to a sample tick"
        );
        diagnostics.report(DiagnosticReport::warning(
            DIAGNOSTICS_SOURCE,
            format!(
                "master clock reading ({} ticks at {} Hz) does not convert to a sample tick; \
                 drift is not reported while it persists",
                master.ticks, master.frequency
            ),
        ));
    }

    /// Demultiplex one frame and push it to the host
    ///
    /// Returns the per-channel sample count.
    fn emit_frame<H>(&mut self, frame: &RawFrame, host: &mut H) -> Result<usize, ContractError>
    where
        H: SampleEmitter + ?Sized,
    {
        let samples = self.demux.split(&frame.data)?;

        for channel in &mut self.channels {
            self.demux
                .column(channel.column_index, &channel.calibration, &mut channel.buffer);

            let placement = self.sync.place(channel.calibration.delay);
            let emitted = channel.buffer.get(placement.skip..).unwrap_or_default();
            if !emitted.is_empty() {
                host.add_samples(&channel.handle, placement.start_tick, emitted);
                observability::record_samples_emitted(&channel.name, emitted.len());
            }
        }

        self.sync.advance(samples);
        Ok(samples)
    }
}

/// Next queued frame carrying metadata, skipping data-only frames
fn poll_metadata_frame<T: FrameTransport>(
    transport: &mut T,
) -> Result<Option<RawFrame>, ContractError> {
    while let Some(frame) = transport.try_recv()? {
        if frame.has_metadata() {
            return Ok(Some(frame));
        }
        trace!("skipping frame without metadata");
    }
    Ok(None)
}

/// DAQ frame subscriber engine
///
/// Generic over the transport connector so tests and the CLI can use the
/// in-process bus while a host integration plugs in its own transport.
pub struct SubscriberEngine<C: TransportConnector> {
    config: EngineConfig,
    connector: C,
    diagnostics: Arc<dyn DiagnosticsSink>,
    session: Option<Session<C::Transport>>,
}

impl<C: TransportConnector> SubscriberEngine<C> {
    pub fn new(config: EngineConfig, connector: C, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        Self {
            config,
            connector,
            diagnostics,
            session: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Transport endpoint address
    pub fn address(&self) -> &str {
        &self.config.address
    }

    /// Change the endpoint address; takes effect on the next update
    pub fn set_address(&mut self, address: impl Into<String>) {
        self.config.address = address.into();
    }

    /// Whether an update has completed and a session is open
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Snapshot captured at the last successful update
    pub fn snapshot(&self) -> Option<&MetadataSnapshot> {
        self.session.as_ref().map(|s| &s.snapshot)
    }

    /// Channel names of the active session, sorted
    pub fn channel_names(&self) -> Vec<&str> {
        self.session
            .as_ref()
            .map(|s| s.channels.iter().map(|c| c.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Host handle of a data channel
    pub fn channel_handle(&self, name: &str) -> Option<&ChannelHandle> {
        self.session
            .as_ref()?
            .channels
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.handle)
    }

    pub fn drift_channel(&self) -> Option<&ChannelHandle> {
        self.session.as_ref()?.drift_channel.as_ref()
    }

    /// Tick the next frame lands at, `None` while unlocked
    pub fn next_tick(&self) -> Option<u64> {
        self.session.as_ref()?.sync.next_tick()
    }

    pub fn drift_stats(&self) -> Option<DriftStats> {
        self.session.as_ref().map(|s| s.sync.drift_stats())
    }

    /// Initial configuration: updates when an address is configured
    pub fn init<R>(&mut self, registry: &mut R) -> Result<(), ContractError>
    where
        R: ChannelRegistry + ?Sized,
    {
        if self.config.address.is_empty() {
            debug!("no address configured, skipping initial update");
            return Ok(());
        }
        self.update(registry)
    }

    /// Connect, read the first metadata frame and rebuild the channel set
    ///
    /// On failure one error report goes to the diagnostics sink and the
    /// previous session stays in place.
    #[instrument(
        name = "engine_update",
        skip(self, registry),
        fields(address = %self.config.address)
    )]
    pub fn update<R>(&mut self, registry: &mut R) -> Result<(), ContractError>
    where
        R: ChannelRegistry + ?Sized,
    {
        match self.rebuild(registry) {
            Ok(session) => {
                info!(
                    channels = session.channels.len(),
                    samplerate = session.snapshot.board.samplerate,
                    drift_channel = session.drift_channel.is_some(),
                    "update complete"
                );
                observability::record_update(true);
                observability::record_channel_set_size(session.channels.len());
                self.session = Some(session);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "update failed, keeping previous channel set");
                observability::record_update(false);
                self.diagnostics.report(DiagnosticReport::error(
                    DIAGNOSTICS_SOURCE,
                    format!("update of '{}' failed: {e}", self.config.address),
                ));
                Err(e)
            }
        }
    }

    fn rebuild<R: ChannelRegistry + ?Sized>(
        &mut self,
        registry: &mut R,
    ) -> Result<Session<C::Transport>, ContractError> {
        if self.config.address.is_empty() {
            return Err(ContractError::config_validation("address", "no address configured"));
        }

        let (transport, frame) = self.connect_first_frame()?;
        let snapshot = MetadataParser::parse(&frame.metadata)?;
        let calibration = metadata::resolve(&snapshot)?;
        let outcome = reconcile(registry, &snapshot, &calibration, &self.config.drift)?;

        let channels: Vec<ChannelState> = snapshot
            .channels
            .iter()
            .filter_map(|(name, descriptor)| {
                let handle = outcome.handles.get(name)?.clone();
                Some(ChannelState {
                    name: name.clone(),
                    column_index: descriptor.column_index,
                    calibration: calibration.get(name).copied().unwrap_or_default(),
                    buffer: Vec::new(),
                    handle,
                })
            })
            .collect();

        for channel in &channels {
            debug!(
                channel = %channel.name,
                column = channel.column_index,
                gain = channel.calibration.gain,
                offset = channel.calibration.offset,
                delay = channel.calibration.delay,
                "channel configured"
            );
        }

        Ok(Session {
            transport,
            demux: Demultiplexer::new(snapshot.channel_count()),
            sync: TickSynchronizer::new(snapshot.board.samplerate, self.config.drift.history),
            channels,
            drift_channel: outcome.drift_channel,
            snapshot,
            stashed: None,
            metadata_drift_reported: false,
            clock_fault_reported: false,
        })
    }

    /// Poll for the first frame carrying metadata within the retry budget
    ///
    /// The data part of that frame is discarded.
    fn connect_first_frame(&self) -> Result<(C::Transport, RawFrame), ContractError> {
        let address = self.config.address.as_str();
        let attempts = self.config.retry.max_attempts.max(1);
        let mut transport: Option<C::Transport> = None;
        let mut last_error = String::from("no metadata frame received");

        for attempt in 1..=attempts {
            let connected = match transport.take() {
                Some(t) => Some(t),
                None => match self.connector.connect(address) {
                    Ok(t) => Some(t),
                    Err(e) => {
                        last_error = e.to_string();
                        None
                    }
                },
            };

            if let Some(mut t) = connected {
                match poll_metadata_frame(&mut t) {
                    Ok(Some(frame)) => {
                        debug!(attempt, "metadata frame received");
                        return Ok((t, frame));
                    }
                    Ok(None) => transport = Some(t),
                    // reconnect on the next attempt
                    Err(e) => last_error = e.to_string(),
                }
            }

            debug!(attempt, attempts, error = %last_error, "no metadata frame yet");
            if attempt < attempts {
                std::thread::sleep(self.config.retry.delay());
            }
        }

        Err(ContractError::transport_connect(address, attempts, last_error))
    }

    /// Lock the tick synchronizer before the first process cycle
    pub fn prepare<K: MasterClock + ?Sized>(&mut self, clock: &K) {
        if let Some(session) = self.session.as_mut() {
            match session.sync.lock(clock.master_timestamp()) {
                Some(tick) => debug!(next_tick = tick, "processing prepared"),
                None => debug!("processing prepared, master clock not usable yet"),
            }
        }
    }

    /// One host processing cycle
    ///
    /// Locks the synchronizer if needed, emits the cycle's drift, then
    /// drains queued frames (up to the configured budget).
    #[instrument(level = "trace", name = "engine_process", skip(self, host))]
    pub fn process<H>(&mut self, host: &mut H) -> ProcessReport
    where
        H: MasterClock + SampleEmitter + ?Sized,
    {
        let Some(session) = self.session.as_mut() else {
            return ProcessReport::default();
        };
        let diagnostics = self.diagnostics.as_ref();
        let budget = self.config.drain.max_frames_per_cycle;

        let master = host.master_timestamp();
        session.check_clock(master, diagnostics);
        session.sync.lock(master);

        let mut report = ProcessReport {
            drift: session.sync.observe_drift(master),
            ..Default::default()
        };
        if let Some(drift) = report.drift {
            observability::record_tick_drift(drift);
            if let Some(handle) = &session.drift_channel {
                host.add_async_sample(handle, master.ticks, drift as f64);
            }
        }

        loop {
            if budget.is_some_and(|max| report.frames_processed + report.frames_rejected >= max) {
                session.stashed = session.next_frame();
                report.frames_pending = session.stashed.is_some();
                break;
            }

            let Some(frame) = session.next_frame() else {
                break;
            };
            observability::record_frame_received();

            if frame.has_metadata() {
                session.check_metadata(&frame.metadata, diagnostics);
            }

            match session.emit_frame(&frame, host) {
                Ok(samples) => {
                    report.frames_processed += 1;
                    debug!(
                        samples,
                        next_tick = session.sync.next_tick(),
                        acquisition_start_ns = host.acquisition_start_ns(),
                        "frame processed"
                    );
                }
                Err(e) => {
                    report.frames_rejected += 1;
                    observability::record_frame_rejected("frame_shape");
                    warn!(error = %e, "frame dropped");
                }
            }
        }

        observability::record_drain(report.frames_processed + report.frames_rejected);
        report
    }

    /// Close the session; the next update starts from scratch
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            info!(
                endpoint = %session.transport.endpoint(),
                drift = %session.sync.drift_stats(),
                "session closed"
            );
        }
    }
}
