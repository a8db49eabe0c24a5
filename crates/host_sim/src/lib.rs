//! # Host Sim
//!
//! In-memory measurement host for engine tests and the CLI: channel
//! registry, sample recorder, manual master clock and a collecting
//! diagnostics sink.

mod clock;
mod diagnostics;
mod recorder;
mod registry;

pub use clock::ManualClock;
pub use diagnostics::CollectingDiagnostics;
pub use recorder::{AsyncSample, EmittedBlock, SampleRecorder};
pub use registry::{MemoryRegistry, RegistryFailures, RegistryStats};

use contracts::{
    ChannelConfig, ChannelHandle, ChannelKey, ChannelRegistry, ContractError, MasterClock,
    MasterTimestamp, SampleEmitter,
};

/// Registry, emitter and clock in one value
#[derive(Debug, Default)]
pub struct SimHost {
    pub registry: MemoryRegistry,
    pub recorder: SampleRecorder,
    pub clock: ManualClock,
}

impl SimHost {
    /// Host with a master clock running at `frequency`
    pub fn new(frequency: f64) -> Self {
        Self {
            registry: MemoryRegistry::new(),
            recorder: SampleRecorder::new(),
            clock: ManualClock::new(frequency),
        }
    }
}

impl ChannelRegistry for SimHost {
    fn lookup(&self, key: &ChannelKey) -> Option<ChannelHandle> {
        self.registry.lookup(key)
    }

    fn create(
        &mut self,
        key: ChannelKey,
        config: &ChannelConfig,
    ) -> Result<ChannelHandle, ContractError> {
        self.registry.create(key, config)
    }

    fn configure(
        &mut self,
        handle: &ChannelHandle,
        config: &ChannelConfig,
    ) -> Result<(), ContractError> {
        self.registry.configure(handle, config)
    }

    fn remove(&mut self, handle: &ChannelHandle) -> Result<(), ContractError> {
        self.registry.remove(handle)
    }

    fn list(&self) -> Vec<ChannelHandle> {
        self.registry.list()
    }
}

impl SampleEmitter for SimHost {
    fn add_samples(&mut self, channel: &ChannelHandle, start_tick: u64, samples: &[f32]) {
        self.recorder.add_samples(channel, start_tick, samples);
    }

    fn add_async_sample(&mut self, channel: &ChannelHandle, tick: u64, value: f64) {
        self.recorder.add_async_sample(channel, tick, value);
    }
}

impl MasterClock for SimHost {
    fn master_timestamp(&self) -> MasterTimestamp {
        self.clock.master_timestamp()
    }

    fn acquisition_start_ns(&self) -> u64 {
        self.clock.acquisition_start_ns()
    }
}
