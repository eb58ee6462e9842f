//! Linear energy source: constant supply voltage and ohmic bookkeeping,
//! without the kinetic two-well model.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::devices::types::DeviceEnergyModel;
use crate::energy::source::{
    fire_depleted, fire_energy_changed, ConsumerSet, EnergySource, SourceState,
};
use crate::sim::scheduler::{EventHandle, Scheduler};
use crate::trace::EnergyTrace;

/// Construction parameters for [`BasicSource`].
#[derive(Debug, Clone, Copy)]
pub struct BasicParams {
    /// Initial stored energy (J).
    pub initial_energy_j: f64,
    /// Constant supply voltage (V).
    pub supply_voltage_v: f64,
    /// Depletion threshold as a fraction of the initial energy.
    pub low_battery_threshold: f64,
    /// Interval between periodic state updates.
    pub update_interval: Duration,
}

impl Default for BasicParams {
    fn default() -> Self {
        Self {
            initial_energy_j: 10.0,
            supply_voltage_v: 3.0,
            low_battery_threshold: 0.10,
            update_interval: Duration::from_secs(1),
        }
    }
}

/// The simplest `EnergySource`: each tick removes
/// `current × voltage × elapsed` joules, with the voltage held constant
/// for the whole discharge. It shares the periodic self-rescheduling and
/// notification discipline of the Li-ion model and serves as the cheap
/// alternative where discharge-curve fidelity is not needed.
pub struct BasicSource {
    scheduler: Rc<Scheduler>,
    weak_self: Weak<RefCell<BasicSource>>,
    consumers: ConsumerSet,
    traces: Vec<Rc<dyn EnergyTrace>>,

    low_battery_threshold: f64,
    update_interval: Duration,

    initial_energy_j: f64,
    remaining_energy_j: f64,
    drained_capacity_ah: f64,
    supply_voltage_v: f64,

    state: SourceState,
    started: bool,
    last_update: Duration,
    update_event: Option<EventHandle>,
}

impl BasicSource {
    /// Creates a source on the given scheduler. It does not tick until
    /// [`EnergySource::start`] is called.
    ///
    /// # Panics
    ///
    /// Panics if the initial energy is negative, the supply voltage is
    /// not positive, the threshold is outside (0, 1], or the update
    /// interval is zero.
    pub fn new(scheduler: Rc<Scheduler>, params: BasicParams) -> Rc<RefCell<Self>> {
        assert!(
            params.initial_energy_j >= 0.0,
            "initial energy must be non-negative"
        );
        assert!(
            params.supply_voltage_v > 0.0,
            "supply voltage must be positive"
        );
        assert!(
            params.low_battery_threshold > 0.0 && params.low_battery_threshold <= 1.0,
            "low-battery threshold must be in (0, 1]"
        );
        assert!(
            !params.update_interval.is_zero(),
            "update interval must be positive"
        );

        Rc::new_cyclic(|weak| {
            RefCell::new(Self {
                scheduler,
                weak_self: weak.clone(),
                consumers: ConsumerSet::new(),
                traces: Vec::new(),
                low_battery_threshold: params.low_battery_threshold,
                update_interval: params.update_interval,
                initial_energy_j: params.initial_energy_j,
                remaining_energy_j: params.initial_energy_j,
                drained_capacity_ah: 0.0,
                supply_voltage_v: params.supply_voltage_v,
                state: SourceState::Active,
                started: false,
                last_update: Duration::ZERO,
                update_event: None,
            })
        })
    }

    /// Resets the source to `initial_energy_j` joules and re-enters
    /// `Active`; periodic updates resume immediately if running.
    pub fn set_initial_energy(&mut self, initial_energy_j: f64) {
        assert!(initial_energy_j >= 0.0, "initial energy must be non-negative");
        self.initial_energy_j = initial_energy_j;
        self.remaining_energy_j = initial_energy_j;
        self.state = SourceState::Active;
        self.last_update = self.scheduler.now();
        if self.started {
            self.update_energy_source();
        }
    }

    /// Advances the ledger to the current simulated instant.
    pub fn update_energy_source(&mut self) {
        if self.scheduler.is_finished() {
            return;
        }
        if let Some(event) = self.update_event.take() {
            event.cancel();
        }
        if self.state == SourceState::Depleted {
            return;
        }

        let now = self.scheduler.now();
        assert!(now >= self.last_update, "simulation clock moved backwards");
        let elapsed = (now - self.last_update).as_secs_f64();
        let current_a = self.consumers.total_current_a();

        let consumed_j = current_a * self.supply_voltage_v * elapsed;
        let old = self.remaining_energy_j;
        self.remaining_energy_j = (self.remaining_energy_j - consumed_j).clamp(0.0, self.initial_energy_j);
        if consumed_j > 0.0 {
            self.drained_capacity_ah += current_a * elapsed / 3600.0;
        }
        self.last_update = now;
        fire_energy_changed(&self.traces, old, self.remaining_energy_j);

        if self.remaining_energy_j <= self.low_battery_threshold * self.initial_energy_j {
            self.state = SourceState::Depleted;
            fire_depleted(&self.traces, now);
            self.consumers.notify_depleted();
            return;
        }

        if self.started {
            let weak = self.weak_self.clone();
            let handle = self.scheduler.schedule_after(self.update_interval, move || {
                if let Some(source) = weak.upgrade() {
                    source.borrow_mut().update_energy_source();
                }
            });
            self.update_event = Some(handle);
        }
    }
}

impl EnergySource for BasicSource {
    fn attach_consumer(&mut self, consumer: Rc<dyn DeviceEnergyModel>) {
        self.consumers.attach(consumer);
    }

    fn consumers_of_kind(&self, kind: &str) -> Vec<Rc<dyn DeviceEnergyModel>> {
        self.consumers.of_kind(kind)
    }

    fn add_trace(&mut self, trace: Rc<dyn EnergyTrace>) {
        self.traces.push(trace);
    }

    fn start(&mut self) {
        self.started = true;
        self.update_energy_source();
    }

    fn update(&mut self) {
        self.update_energy_source();
    }

    fn initial_energy_j(&self) -> f64 {
        self.initial_energy_j
    }

    fn remaining_energy_j(&mut self) -> f64 {
        self.update_energy_source();
        self.remaining_energy_j
    }

    fn supply_voltage_v(&mut self) -> f64 {
        self.update_energy_source();
        self.supply_voltage_v
    }

    fn total_current_a(&self) -> f64 {
        self.consumers.total_current_a()
    }

    fn drained_capacity_ah(&self) -> f64 {
        self.drained_capacity_ah
    }

    fn state(&self) -> SourceState {
        self.state
    }

    fn decrease_remaining_energy(&mut self, energy_j: f64) {
        assert!(energy_j >= 0.0, "energy adjustment must be non-negative");
        let old = self.remaining_energy_j;
        self.remaining_energy_j = (self.remaining_energy_j - energy_j).max(0.0);
        fire_energy_changed(&self.traces, old, self.remaining_energy_j);

        if self.state == SourceState::Active
            && self.remaining_energy_j <= self.low_battery_threshold * self.initial_energy_j
        {
            self.state = SourceState::Depleted;
            if let Some(event) = self.update_event.take() {
                event.cancel();
            }
            fire_depleted(&self.traces, self.scheduler.now());
            self.consumers.notify_depleted();
        }
    }

    fn increase_remaining_energy(&mut self, energy_j: f64) {
        assert!(energy_j >= 0.0, "energy adjustment must be non-negative");
        let old = self.remaining_energy_j;
        self.remaining_energy_j = (self.remaining_energy_j + energy_j).min(self.initial_energy_j);
        fire_energy_changed(&self.traces, old, self.remaining_energy_j);
    }
}

impl Drop for BasicSource {
    fn drop(&mut self) {
        if let Some(event) = self.update_event.take() {
            event.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::constant::ConstantLoad;

    fn scheduler(horizon_s: u64) -> Rc<Scheduler> {
        Rc::new(Scheduler::new(Duration::from_secs(horizon_s)))
    }

    #[test]
    fn drain_is_linear_in_current_and_time() {
        let params = BasicParams {
            initial_energy_j: 100.0,
            supply_voltage_v: 3.0,
            ..BasicParams::default()
        };
        let scheduler = scheduler(10);
        let source = BasicSource::new(Rc::clone(&scheduler), params);
        source
            .borrow_mut()
            .attach_consumer(Rc::new(ConstantLoad::new(1.0)));
        source.borrow_mut().start();
        scheduler.run();

        // 1 A × 3 V × 10 s
        let remaining = source.borrow_mut().remaining_energy_j();
        assert!((remaining - 70.0).abs() < 1e-9);
        assert!((source.borrow().drained_capacity_ah() - 10.0 / 3600.0).abs() < 1e-12);
    }

    #[test]
    fn voltage_is_constant_for_the_whole_discharge() {
        let scheduler = scheduler(5);
        let source = BasicSource::new(Rc::clone(&scheduler), BasicParams::default());
        source
            .borrow_mut()
            .attach_consumer(Rc::new(ConstantLoad::new(0.1)));
        source.borrow_mut().start();
        let before = source.borrow_mut().supply_voltage_v();
        scheduler.run();
        let after = source.borrow_mut().supply_voltage_v();
        assert_eq!(before, after);
    }

    #[test]
    fn depletes_at_the_threshold_and_stops_ticking() {
        let params = BasicParams {
            initial_energy_j: 100.0,
            supply_voltage_v: 3.0,
            ..BasicParams::default()
        };
        let scheduler = scheduler(120);
        let source = BasicSource::new(Rc::clone(&scheduler), params);
        let load = Rc::new(ConstantLoad::new(1.0));
        source
            .borrow_mut()
            .attach_consumer(Rc::clone(&load) as Rc<dyn DeviceEnergyModel>);
        source.borrow_mut().start();
        scheduler.run();

        // 90 J of headroom at 3 W puts depletion at t = 30 s.
        assert_eq!(source.borrow().state(), SourceState::Depleted);
        assert!(source.borrow_mut().remaining_energy_j() <= 10.0);
        assert!(load.is_halted());
    }

    #[test]
    fn zero_draw_holds_the_ledger_steady() {
        let scheduler = scheduler(30);
        let source = BasicSource::new(Rc::clone(&scheduler), BasicParams::default());
        source.borrow_mut().start();
        scheduler.run();
        assert_eq!(source.borrow_mut().remaining_energy_j(), 10.0);
    }
}
