//! Duty-cycled device energy model.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::devices::types::DeviceEnergyModel;
use crate::sim::scheduler::Scheduler;

/// A device alternating between an on-current and an off-current on a
/// fixed duty cycle, derived from the simulated clock.
///
/// The cycle starts in the on phase at t = 0: the draw is `on_current_a`
/// for `on_duration`, then `off_current_a` for `off_duration`, repeating.
pub struct PulsedLoad {
    scheduler: Rc<Scheduler>,
    on_current_a: f64,
    off_current_a: f64,
    on_duration: Duration,
    off_duration: Duration,
    halted: Cell<bool>,
}

impl PulsedLoad {
    /// Creates a pulsed load.
    ///
    /// # Panics
    ///
    /// Panics if either phase duration is zero or a current is not finite.
    pub fn new(
        scheduler: Rc<Scheduler>,
        on_current_a: f64,
        off_current_a: f64,
        on_duration: Duration,
        off_duration: Duration,
    ) -> Self {
        assert!(on_current_a.is_finite(), "on-current must be finite");
        assert!(off_current_a.is_finite(), "off-current must be finite");
        assert!(!on_duration.is_zero(), "on-duration must be positive");
        assert!(!off_duration.is_zero(), "off-duration must be positive");

        Self {
            scheduler,
            on_current_a,
            off_current_a,
            on_duration,
            off_duration,
            halted: Cell::new(false),
        }
    }

    fn period(&self) -> Duration {
        self.on_duration + self.off_duration
    }

    /// Returns `true` while the current instant falls in the on phase.
    pub fn is_on(&self) -> bool {
        let period = self.period().as_secs_f64();
        let phase = self.scheduler.now().as_secs_f64() % period;
        phase < self.on_duration.as_secs_f64()
    }
}

impl DeviceEnergyModel for PulsedLoad {
    fn current_a(&self) -> f64 {
        if self.halted.get() {
            0.0
        } else if self.is_on() {
            self.on_current_a
        } else {
            self.off_current_a
        }
    }

    fn on_depleted(&self) {
        self.halted.set(true);
    }

    fn kind(&self) -> &'static str {
        "pulsed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(now_s: u64) -> Rc<Scheduler> {
        // Advance the clock by draining a single event at `now_s`.
        let scheduler = Rc::new(Scheduler::new(Duration::from_secs(now_s)));
        scheduler.schedule_after(Duration::from_secs(now_s), || {});
        scheduler.run();
        scheduler
    }

    #[test]
    fn starts_in_the_on_phase() {
        let load = PulsedLoad::new(
            at(0),
            1.0,
            0.0,
            Duration::from_secs(600),
            Duration::from_secs(60),
        );
        assert!(load.is_on());
        assert_eq!(load.current_a(), 1.0);
    }

    #[test]
    fn switches_off_after_the_on_phase() {
        let load = PulsedLoad::new(
            at(630),
            1.0,
            0.0,
            Duration::from_secs(600),
            Duration::from_secs(60),
        );
        assert!(!load.is_on());
        assert_eq!(load.current_a(), 0.0);
    }

    #[test]
    fn cycle_repeats_after_one_period() {
        let load = PulsedLoad::new(
            at(660 + 10),
            1.0,
            0.05,
            Duration::from_secs(600),
            Duration::from_secs(60),
        );
        assert!(load.is_on());
        assert_eq!(load.current_a(), 1.0);
    }

    #[test]
    fn depletion_halts_the_draw() {
        let load = PulsedLoad::new(
            at(0),
            1.0,
            0.05,
            Duration::from_secs(600),
            Duration::from_secs(60),
        );
        load.on_depleted();
        assert_eq!(load.current_a(), 0.0);
    }
}
