//! Tick synchronizer
//!
//! Free-running sample tick, locked once per session to the host master
//! clock and advanced by emitted sample counts afterwards. Drift against the
//! clock-derived target tick is observed, never corrected.

use std::fmt;

use contracts::MasterTimestamp;
use ringbuf::{traits::*, HeapRb};
use tracing::debug;

/// "No value" sentinel of `next_tick`
pub const TICK_UNSET: u64 = u64::MAX;

/// Master time expressed in sample ticks at `samplerate`
///
/// `None` when the reading cannot be expressed as a tick, so it never
/// collides with `TICK_UNSET`.
#[inline]
pub fn target_tick(master: MasterTimestamp, samplerate: f64) -> Option<u64> {
    master.sample_tick(samplerate)
}

/// `next_tick - target`, saturated to the i64 range
#[inline]
pub fn tick_drift(next_tick: u64, target: u64) -> i64 {
    let diff = i128::from(next_tick) - i128::from(target);
    diff.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Where a channel's sample block lands on the host timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// First tick of the emitted samples
    pub start_tick: u64,
    /// Leading samples dropped instead of starting before tick 0
    pub skip: usize,
}

/// Summary of the recent drift history
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriftStats {
    pub last: Option<i64>,
    pub mean: f64,
    pub min: i64,
    pub max: i64,
    pub count: usize,
}

impl fmt::Display for DriftStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last {
            None => write!(f, "N/A"),
            Some(last) => write!(
                f,
                "last={}, mean={:.1}, min={}, max={} (n={})",
                last, self.mean, self.min, self.max, self.count
            ),
        }
    }
}

/// Per-session tick state
pub struct TickSynchronizer {
    samplerate: f64,
    next_tick: u64,
    history: HeapRb<i64>,
    last_drift: Option<i64>,
}

impl fmt::Debug for TickSynchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickSynchronizer")
            .field("samplerate", &self.samplerate)
            .field("next_tick", &self.next_tick())
            .field("history", &self.history.occupied_len())
            .finish()
    }
}

impl TickSynchronizer {
    /// Unlocked synchronizer for a channel set sampled at `samplerate`
    pub fn new(samplerate: f64, history: usize) -> Self {
        Self {
            samplerate,
            next_tick: TICK_UNSET,
            history: HeapRb::new(history.max(1)),
            last_drift: None,
        }
    }

    pub fn samplerate(&self) -> f64 {
        self.samplerate
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.next_tick != TICK_UNSET
    }

    /// Next tick to emit at, `None` while unlocked
    #[inline]
    pub fn next_tick(&self) -> Option<u64> {
        self.is_locked().then_some(self.next_tick)
    }

    /// Back to the unlocked state, drift history cleared
    pub fn reset(&mut self) {
        self.next_tick = TICK_UNSET;
        self.history.clear();
        self.last_drift = None;
    }

    /// Lock to the master clock
    ///
    /// Only the first call of a session sets the tick; later calls return
    /// the current value unchanged. Stays unlocked and returns `None` while
    /// the clock reading does not convert to a tick.
    pub fn lock(&mut self, master: MasterTimestamp) -> Option<u64> {
        if !self.is_locked() {
            let Some(target) = target_tick(master, self.samplerate) else {
                debug!(
                    master_ticks = master.ticks,
                    frequency = master.frequency,
                    "master clock reading unusable, synchronizer stays unlocked"
                );
                return None;
            };
            self.next_tick = target;
            debug!(
                master_ticks = master.ticks,
                frequency = master.frequency,
                samplerate = self.samplerate,
                next_tick = self.next_tick,
                "tick synchronizer locked"
            );
        }
        self.next_tick()
    }

    /// Placement of a block for a channel with normalized `delay`
    ///
    /// Shifts the start back by `delay`; when that would go below tick 0 the
    /// missing distance is dropped from the head of the block instead.
    pub fn place(&self, delay: i16) -> Placement {
        let next = self.next_tick().unwrap_or(0);
        let delay = u64::from(delay.max(0) as u16);
        match next.checked_sub(delay) {
            Some(start_tick) => Placement { start_tick, skip: 0 },
            None => Placement {
                start_tick: 0,
                skip: (delay - next) as usize,
            },
        }
    }

    /// Advance by the per-channel sample count of one frame
    pub fn advance(&mut self, samples: usize) {
        if self.is_locked() {
            self.next_tick = self
                .next_tick
                .saturating_add(samples as u64)
                .min(TICK_UNSET - 1);
        }
    }

    /// Drift of the free-running tick against the master clock
    ///
    /// Recorded in the history; `None` while unlocked or when the clock
    /// reading does not convert to a tick.
    pub fn observe_drift(&mut self, master: MasterTimestamp) -> Option<i64> {
        let next = self.next_tick()?;
        let drift = tick_drift(next, target_tick(master, self.samplerate)?);
        self.history.push_overwrite(drift);
        self.last_drift = Some(drift);
        Some(drift)
    }

    pub fn drift_stats(&self) -> DriftStats {
        let count = self.history.occupied_len();
        if count == 0 {
            return DriftStats::default();
        }

        let (mut min, mut max, mut sum) = (i64::MAX, i64::MIN, 0.0);
        for &d in self.history.iter() {
            min = min.min(d);
            max = max.max(d);
            sum += d as f64;
        }

        DriftStats {
            last: self.last_drift,
            mean: sum / count as f64,
            min,
            max,
            count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn master(ticks: u64, frequency: f64) -> MasterTimestamp {
        MasterTimestamp { ticks, frequency }
    }

    #[test]
    fn test_target_and_drift() {
        let target = target_tick(master(1000, 1000.0), 500.0).unwrap();
        assert_eq!(target, 500);
        assert_eq!(tick_drift(480, target), -20);
        assert_eq!(tick_drift(510, target), 10);
    }

    #[test]
    fn test_lock_once() {
        let mut sync = TickSynchronizer::new(500.0, 8);
        assert!(!sync.is_locked());
        assert_eq!(sync.next_tick(), None);

        assert_eq!(sync.lock(master(1000, 1000.0)), Some(500));
        assert_eq!(sync.lock(master(9000, 1000.0)), Some(500));
        assert_eq!(sync.next_tick(), Some(500));
    }

    #[test]
    fn test_lock_rounds() {
        let mut sync = TickSynchronizer::new(1000.0, 8);
        // 333 * 1000 / 3000 = 111.0
        assert_eq!(sync.lock(master(333, 3000.0)), Some(111));

        let mut sync = TickSynchronizer::new(1000.0, 8);
        // 5 * 1000 / 3000 = 1.67
        assert_eq!(sync.lock(master(5, 3000.0)), Some(2));
    }

    #[test]
    fn test_unusable_clock_keeps_unlocked() {
        let mut sync = TickSynchronizer::new(1000.0, 8);
        assert_eq!(sync.lock(master(1000, 0.0)), None);
        assert!(!sync.is_locked());
        assert_eq!(sync.lock(master(u64::MAX, 1.0)), None);
        assert!(!sync.is_locked());

        assert_eq!(sync.lock(master(10, 1000.0)), Some(10));
        assert_eq!(sync.observe_drift(master(10, 0.0)), None);
        assert_eq!(sync.drift_stats().count, 0);
        assert_eq!(sync.observe_drift(master(12, 1000.0)), Some(-2));
    }

    #[test]
    fn test_advance_and_reset() {
        let mut sync = TickSynchronizer::new(1000.0, 8);
        sync.advance(10);
        assert_eq!(sync.next_tick(), None);

        sync.lock(master(0, 1000.0));
        sync.advance(10);
        sync.advance(5);
        assert_eq!(sync.next_tick(), Some(15));

        sync.reset();
        assert!(!sync.is_locked());
    }

    #[test]
    fn test_place_shifts_by_delay() {
        let mut sync = TickSynchronizer::new(1000.0, 8);
        sync.lock(master(100, 1000.0));
        assert_eq!(sync.place(0), Placement { start_tick: 100, skip: 0 });
        assert_eq!(sync.place(7), Placement { start_tick: 93, skip: 0 });
    }

    #[test]
    fn test_place_at_tick_zero_drops_head() {
        let mut sync = TickSynchronizer::new(1000.0, 8);
        sync.lock(master(0, 1000.0));
        assert_eq!(sync.place(3), Placement { start_tick: 0, skip: 3 });

        sync.advance(2);
        assert_eq!(sync.place(3), Placement { start_tick: 0, skip: 1 });
        assert_eq!(sync.place(2), Placement { start_tick: 0, skip: 0 });
    }

    #[test]
    fn test_drift_history() {
        let mut sync = TickSynchronizer::new(500.0, 2);
        assert_eq!(sync.observe_drift(master(1000, 1000.0)), None);

        sync.lock(master(960, 1000.0));
        assert_eq!(sync.observe_drift(master(1000, 1000.0)), Some(-20));
        assert_eq!(sync.observe_drift(master(1020, 1000.0)), Some(-30));
        assert_eq!(sync.observe_drift(master(960, 1000.0)), Some(0));

        let stats = sync.drift_stats();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.last, Some(0));
        assert_eq!(stats.min, -30);
        assert_eq!(stats.max, 0);
        assert!((stats.mean + 15.0).abs() < 1e-9);
    }
}
