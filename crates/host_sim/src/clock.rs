//! Manually driven master clock

use contracts::{MasterClock, MasterTimestamp};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManualClock {
    pub ticks: u64,
    pub frequency: f64,
    pub acquisition_start_ns: u64,
}

impl ManualClock {
    /// Clock at tick 0
    pub fn new(frequency: f64) -> Self {
        Self {
            ticks: 0,
            frequency,
            acquisition_start_ns: 0,
        }
    }

    pub fn set_ticks(&mut self, ticks: u64) {
        self.ticks = ticks;
    }

    pub fn advance(&mut self, ticks: u64) {
        self.ticks += ticks;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(1000.0)
    }
}

impl MasterClock for ManualClock {
    fn master_timestamp(&self) -> MasterTimestamp {
        MasterTimestamp {
            ticks: self.ticks,
            frequency: self.frequency,
        }
    }

    fn acquisition_start_ns(&self) -> u64 {
        self.acquisition_start_ns
    }
}
