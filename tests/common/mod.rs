//! Shared test fixtures for integration tests.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use cell_sim::energy::liion::{LiIonBattery, LiIonParams};
use cell_sim::sim::scheduler::Scheduler;

/// A scheduler bounded at `horizon_s` simulated seconds.
pub fn scheduler(horizon_s: f64) -> Rc<Scheduler> {
    Rc::new(Scheduler::new(Duration::from_secs_f64(horizon_s)))
}

/// Reference cell parameters: 31752 J, c = 0.834, k = 0.0169, 0.1 s
/// update interval.
pub fn default_params() -> LiIonParams {
    LiIonParams::default()
}

/// A small 100 J cell that depletes within a minute at 1 A.
pub fn small_cell_params() -> LiIonParams {
    LiIonParams {
        initial_energy_j: 100.0,
        ..LiIonParams::default()
    }
}

/// A cell on the given scheduler, not yet started.
pub fn battery(scheduler: &Rc<Scheduler>, params: LiIonParams) -> Rc<RefCell<LiIonBattery>> {
    LiIonBattery::new(Rc::clone(scheduler), params)
}
