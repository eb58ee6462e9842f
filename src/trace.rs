//! Observable trace events emitted by energy sources, plus the sample
//! rows the runner collects for export.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::time::Duration;

/// Observer contract for source-level trace events.
///
/// `energy_changed` fires whenever a recompute lands on a different
/// remaining-energy value; `depleted` fires once per depletion episode.
pub trait EnergyTrace {
    fn energy_changed(&self, old_j: f64, new_j: f64);
    fn depleted(&self, at: Duration);
}

/// A recording observer used by the runner and the test suites.
#[derive(Default)]
pub struct TraceRecorder {
    changes: RefCell<Vec<(f64, f64)>>,
    depleted_at: Cell<Option<Duration>>,
    depleted_count: Cell<u32>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// All `(old, new)` energy changes observed, in order.
    pub fn changes(&self) -> Vec<(f64, f64)> {
        self.changes.borrow().clone()
    }

    pub fn change_count(&self) -> usize {
        self.changes.borrow().len()
    }

    /// Timestamp of the first depletion event, if one fired.
    pub fn depleted_at(&self) -> Option<Duration> {
        self.depleted_at.get()
    }

    /// Number of depletion events observed.
    pub fn depleted_count(&self) -> u32 {
        self.depleted_count.get()
    }
}

impl EnergyTrace for TraceRecorder {
    fn energy_changed(&self, old_j: f64, new_j: f64) {
        self.changes.borrow_mut().push((old_j, new_j));
    }

    fn depleted(&self, at: Duration) {
        if self.depleted_at.get().is_none() {
            self.depleted_at.set(Some(at));
        }
        self.depleted_count.set(self.depleted_count.get() + 1);
    }
}

/// One periodic sample of the source, as collected by the runner.
#[derive(Debug, Clone)]
pub struct SampleRow {
    /// Simulated time of the sample (s).
    pub time_s: f64,
    /// Aggregate consumer draw at the sample instant (A).
    pub current_a: f64,
    /// Terminal voltage (V).
    pub voltage_v: f64,
    /// Remaining stored energy (J).
    pub remaining_j: f64,
    /// Remaining energy as a fraction of the initial figure.
    pub energy_fraction: f64,
    /// Cumulative capacity drained from the source (Ah).
    pub drained_capacity_ah: f64,
}

impl fmt::Display for SampleRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>8.1}s | V={:.4} V  I={:.4} A | E={:>10.2} J ({:>5.1}%)  drained={:.4} Ah",
            self.time_s,
            self.voltage_v,
            self.current_a,
            self.remaining_j,
            self.energy_fraction * 100.0,
            self.drained_capacity_ah,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_keeps_changes_in_order() {
        let recorder = TraceRecorder::new();
        recorder.energy_changed(10.0, 9.0);
        recorder.energy_changed(9.0, 7.5);
        assert_eq!(recorder.changes(), vec![(10.0, 9.0), (9.0, 7.5)]);
        assert_eq!(recorder.change_count(), 2);
    }

    #[test]
    fn first_depletion_timestamp_is_retained() {
        let recorder = TraceRecorder::new();
        assert!(recorder.depleted_at().is_none());

        recorder.depleted(Duration::from_secs(12));
        recorder.depleted(Duration::from_secs(30));
        assert_eq!(recorder.depleted_at(), Some(Duration::from_secs(12)));
        assert_eq!(recorder.depleted_count(), 2);
    }

    #[test]
    fn sample_row_display_does_not_panic() {
        let row = SampleRow {
            time_s: 3600.0,
            current_a: 1.0,
            voltage_v: 3.72,
            remaining_j: 13500.0,
            energy_fraction: 0.51,
            drained_capacity_ah: 0.98,
        };
        assert!(!format!("{row}").is_empty());
    }
}
