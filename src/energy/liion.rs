//! Li-ion battery model: a two-well kinetic cell integrated with RK4 and
//! a periodic self-rescheduling update process.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::devices::types::DeviceEnergyModel;
use crate::energy::curve::DischargeCurve;
use crate::energy::source::{
    fire_depleted, fire_energy_changed, ConsumerSet, EnergySource, SourceState,
};
use crate::sim::scheduler::{EventHandle, Scheduler};
use crate::trace::EnergyTrace;

/// Construction parameters for [`LiIonBattery`].
///
/// Defaults describe a 2.45 Ah / 4.05 V cell (a common 18650), with the
/// kinetic constants `c` and `k` fitted to it.
#[derive(Debug, Clone, Copy)]
pub struct LiIonParams {
    /// Energy stored in the fully charged cell (J).
    pub initial_energy_j: f64,
    /// Depletion threshold as a fraction of the initial energy.
    pub low_battery_threshold: f64,
    /// Interval between periodic state updates.
    pub update_interval: Duration,
    /// Fraction of the total charge held in the available well.
    pub c: f64,
    /// Rate constant of the diffusion between the two wells (1/s).
    pub k: f64,
    /// Voltage of the fully charged cell (V); also the initial supply
    /// voltage.
    pub initial_supply_voltage_v: f64,
    /// Nominal cell voltage (V).
    pub e_nom_v: f64,
    /// Cell voltage at the end of the exponential zone (V).
    pub e_exp_v: f64,
    /// Rated cell capacity (Ah).
    pub q_rated_ah: f64,
    /// Capacity at the end of the nominal zone (Ah).
    pub q_nom_ah: f64,
    /// Capacity at the end of the exponential zone (Ah).
    pub q_exp_ah: f64,
    /// Internal resistance of the cell (Ω).
    pub internal_resistance_ohm: f64,
    /// Typical discharge current used to fit the curve (A).
    pub typical_current_a: f64,
}

impl Default for LiIonParams {
    fn default() -> Self {
        Self {
            initial_energy_j: 31752.0,
            low_battery_threshold: 0.10,
            update_interval: Duration::from_millis(100),
            c: 0.834,
            k: 0.0169,
            initial_supply_voltage_v: 4.05,
            e_nom_v: 3.6,
            e_exp_v: 3.6,
            q_rated_ah: 2.45,
            q_nom_ah: 1.1,
            q_exp_ah: 1.2,
            internal_resistance_ohm: 0.083,
            typical_current_a: 2.33,
        }
    }
}

/// Energy source backed by a two-well kinetic cell model.
///
/// The cell's charge is split between an available well `y1`, which
/// supplies the load directly, and a bound well `y2`, which replenishes
/// the available well through diffusion. Each periodic tick integrates
///
/// ```text
/// dy1/dt = -I + k·(y2/(1-c) - y1/c)
/// dy2/dt =     -k·(y2/(1-c) - y1/c)
/// ```
///
/// with 4th-order Runge–Kutta over the elapsed interval, treating the
/// aggregate load current as varying linearly between the previous and
/// the freshly sampled draw. Remaining energy and terminal voltage are
/// derived from the updated state, and the source depletes once the
/// remaining energy falls to the configured fraction of the initial
/// figure.
///
/// Only one update event is ever pending per source: every tick cancels
/// the previous handle before scheduling the next, and disposal cancels
/// the pending handle so no callback can fire against a dropped cell.
pub struct LiIonBattery {
    scheduler: Rc<Scheduler>,
    weak_self: Weak<RefCell<LiIonBattery>>,
    consumers: ConsumerSet,
    traces: Vec<Rc<dyn EnergyTrace>>,

    curve: DischargeCurve,
    c: f64,
    k: f64,
    low_battery_threshold: f64,
    update_interval: Duration,

    initial_energy_j: f64,
    remaining_energy_j: f64,
    drained_capacity_ah: f64,
    supply_voltage_v: f64,

    /// Available charge (A·s).
    y1: f64,
    /// Bound charge (A·s).
    y2: f64,
    /// Aggregate draw sampled at the previous tick (A).
    prev_current_a: f64,

    state: SourceState,
    started: bool,
    last_update: Duration,
    update_event: Option<EventHandle>,
}

impl LiIonBattery {
    /// Creates a cell on the given scheduler.
    ///
    /// The cell does not tick until [`EnergySource::start`] is called.
    ///
    /// # Panics
    ///
    /// Panics if any parameter is outside its valid range: initial
    /// energy < 0, threshold outside (0, 1], a zero update interval,
    /// `c` outside (0, 1), `k` ≤ 0, or a non-positive curve constant.
    pub fn new(scheduler: Rc<Scheduler>, params: LiIonParams) -> Rc<RefCell<Self>> {
        assert!(
            params.initial_energy_j >= 0.0,
            "initial energy must be non-negative"
        );
        assert!(
            params.low_battery_threshold > 0.0 && params.low_battery_threshold <= 1.0,
            "low-battery threshold must be in (0, 1]"
        );
        assert!(
            !params.update_interval.is_zero(),
            "update interval must be positive"
        );
        assert!(params.c > 0.0 && params.c < 1.0, "c must be in (0, 1)");
        assert!(params.k > 0.0, "k must be positive");

        let curve = DischargeCurve::new(
            params.initial_supply_voltage_v,
            params.e_nom_v,
            params.e_exp_v,
            params.q_rated_ah,
            params.q_nom_ah,
            params.q_exp_ah,
            params.internal_resistance_ohm,
            params.typical_current_a,
        );

        Rc::new_cyclic(|weak| {
            let mut cell = Self {
                scheduler,
                weak_self: weak.clone(),
                consumers: ConsumerSet::new(),
                traces: Vec::new(),
                curve,
                c: params.c,
                k: params.k,
                low_battery_threshold: params.low_battery_threshold,
                update_interval: params.update_interval,
                initial_energy_j: 0.0,
                remaining_energy_j: 0.0,
                drained_capacity_ah: 0.0,
                supply_voltage_v: params.initial_supply_voltage_v,
                y1: 0.0,
                y2: 0.0,
                prev_current_a: 0.0,
                state: SourceState::Active,
                started: false,
                last_update: Duration::ZERO,
                update_event: None,
            };
            cell.apply_initial_energy(params.initial_energy_j);
            RefCell::new(cell)
        })
    }

    /// Resets the cell to a freshly charged state holding `c ×
    /// initial_energy_j` joules (only the available well is addressable
    /// as energy) and re-enters `Active`. If periodic updates were
    /// running they resume immediately.
    pub fn set_initial_energy(&mut self, initial_energy_j: f64) {
        assert!(initial_energy_j >= 0.0, "initial energy must be non-negative");
        self.apply_initial_energy(initial_energy_j);
        if self.started {
            self.update_energy_source();
        }
    }

    /// Changes the available-charge fraction and restarts the integrator
    /// from the current remaining-energy figure.
    pub fn set_c(&mut self, c: f64) {
        assert!(c > 0.0 && c < 1.0, "c must be in (0, 1)");
        self.c = c;
        self.rederive_state_split();
    }

    /// Changes the diffusion rate constant and restarts the integrator
    /// from the current remaining-energy figure.
    pub fn set_k(&mut self, k: f64) {
        assert!(k > 0.0, "k must be positive");
        self.k = k;
        self.rederive_state_split();
    }

    pub fn set_update_interval(&mut self, interval: Duration) {
        assert!(!interval.is_zero(), "update interval must be positive");
        self.update_interval = interval;
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    pub fn low_battery_threshold(&self) -> f64 {
        self.low_battery_threshold
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    /// Advances the model to the current simulated instant.
    ///
    /// This is the periodic tick and also runs whenever a getter or a
    /// consumer forces an out-of-cycle refresh, so only one code path
    /// ever mutates the cell state.
    pub fn update_energy_source(&mut self) {
        // A callback may still be dispatched during teardown races;
        // acting on a stale model after the run ended is a no-op.
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
        self.calculate_remaining_energy(now);
        self.last_update = now;

        if self.remaining_energy_j <= self.low_battery_threshold * self.initial_energy_j {
            self.state = SourceState::Depleted;
            self.handle_energy_drained(now);
            return; // periodic updates stop until re-initialization
        }

        if self.started {
            self.schedule_update(self.update_interval);
        }
    }

    fn apply_initial_energy(&mut self, configured_j: f64) {
        self.initial_energy_j = self.c * configured_j;
        self.remaining_energy_j = self.initial_energy_j;
        self.state = SourceState::Active;
        self.last_update = self.scheduler.now();
        self.rederive_state_split();
    }

    fn rederive_state_split(&mut self) {
        self.y1 = self.remaining_energy_j / self.supply_voltage_v;
        self.y2 = (1.0 - self.c) * self.y1 / self.c;
        self.prev_current_a = self.consumers.total_current_a();
    }

    fn calculate_remaining_energy(&mut self, now: Duration) {
        assert!(now >= self.last_update, "simulation clock moved backwards");
        let step = (now - self.last_update).as_secs_f64();
        let current_a = self.consumers.total_current_a();

        let (y1_next, y2_next) = self.integrate(step, self.prev_current_a, current_a);

        // Charge leaving the available well over this tick (A·s).
        let delta_as = self.y1 - y1_next;
        let consumed_j = delta_as * self.supply_voltage_v;
        let old_remaining = self.remaining_energy_j;

        if consumed_j > self.remaining_energy_j {
            // The floor is physical, not an error: the charge and the
            // energy ledgers never go negative.
            self.remaining_energy_j = 0.0;
            self.y1 = 0.0;
            self.y2 = y2_next;
        } else {
            // A negative consumption is bound charge relaxing back into
            // the available well while the cell rests; the ledger is
            // capped at the initial figure.
            self.remaining_energy_j =
                (self.remaining_energy_j - consumed_j).min(self.initial_energy_j);
            if delta_as > 0.0 {
                self.drained_capacity_ah += delta_as / 3600.0 / self.c;
            }
            self.y1 = y1_next;
            self.y2 = y2_next;
        }

        self.supply_voltage_v = self.curve.voltage(self.drained_capacity_ah, current_a);
        self.prev_current_a = current_a;

        fire_energy_changed(&self.traces, old_remaining, self.remaining_energy_j);
    }

    /// One RK4 step over `step` seconds, with the load current
    /// interpolated linearly between the previous and the fresh sample.
    fn integrate(&self, step: f64, i_prev: f64, i_now: f64) -> (f64, f64) {
        let i_mid = 0.5 * (i_prev + i_now);

        let (f1, g1) = self.flow(self.y1, self.y2, i_prev);
        let (f2, g2) = self.flow(
            self.y1 + 0.5 * step * f1,
            self.y2 + 0.5 * step * g1,
            i_mid,
        );
        let (f3, g3) = self.flow(
            self.y1 + 0.5 * step * f2,
            self.y2 + 0.5 * step * g2,
            i_mid,
        );
        let (f4, g4) = self.flow(self.y1 + step * f3, self.y2 + step * g3, i_now);

        (
            self.y1 + (f1 + 2.0 * f2 + 2.0 * f3 + f4) * step / 6.0,
            self.y2 + (g1 + 2.0 * g2 + 2.0 * g3 + g4) * step / 6.0,
        )
    }

    /// Right-hand side of the coupled system at `(y1, y2)` under load
    /// `current_a`.
    fn flow(&self, y1: f64, y2: f64, current_a: f64) -> (f64, f64) {
        let diffusion = self.k * (y2 / (1.0 - self.c) - y1 / self.c);
        (-current_a + diffusion, -diffusion)
    }

    fn handle_energy_drained(&mut self, at: Duration) {
        fire_depleted(&self.traces, at);
        self.consumers.notify_depleted();
    }

    fn schedule_update(&mut self, delay: Duration) {
        let weak = self.weak_self.clone();
        let handle = self.scheduler.schedule_after(delay, move || {
            if let Some(cell) = weak.upgrade() {
                cell.borrow_mut().update_energy_source();
            }
        });
        self.update_event = Some(handle);
    }
}

impl EnergySource for LiIonBattery {
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
            self.handle_energy_drained(self.scheduler.now());
        }
    }

    fn increase_remaining_energy(&mut self, energy_j: f64) {
        assert!(energy_j >= 0.0, "energy adjustment must be non-negative");
        let old = self.remaining_energy_j;
        self.remaining_energy_j = (self.remaining_energy_j + energy_j).min(self.initial_energy_j);
        fire_energy_changed(&self.traces, old, self.remaining_energy_j);
    }
}

impl Drop for LiIonBattery {
    // Teardown discipline: a pending callback must never fire against a
    // destroyed source.
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
    use std::cell::Cell;

    fn scheduler(horizon_s: u64) -> Rc<Scheduler> {
        Rc::new(Scheduler::new(Duration::from_secs(horizon_s)))
    }

    #[test]
    fn initial_energy_is_scaled_to_the_available_well() {
        let cell = LiIonBattery::new(scheduler(1), LiIonParams::default());
        let initial = cell.borrow().initial_energy_j();
        assert!((initial - 0.834 * 31752.0).abs() < 1e-9);
    }

    #[test]
    fn zero_current_cell_is_in_equilibrium() {
        let scheduler = scheduler(50);
        let cell = LiIonBattery::new(Rc::clone(&scheduler), LiIonParams::default());
        cell.borrow_mut().start();

        let observed = Rc::new(Cell::new(0.0));
        let c = Rc::clone(&cell);
        let seen = Rc::clone(&observed);
        scheduler.schedule_after(Duration::from_secs(50), move || {
            seen.set(c.borrow_mut().remaining_energy_j());
        });
        scheduler.run();

        let initial = cell.borrow().initial_energy_j();
        assert!((observed.get() - initial).abs() < 1e-6 * initial);
    }

    #[test]
    fn constant_draw_decreases_remaining_energy() {
        let scheduler = scheduler(10);
        let cell = LiIonBattery::new(Rc::clone(&scheduler), LiIonParams::default());
        cell.borrow_mut()
            .attach_consumer(Rc::new(ConstantLoad::new(1.0)));
        cell.borrow_mut().start();
        scheduler.run();

        let remaining = {
            let mut cell = cell.borrow_mut();
            cell.remaining_energy_j()
        };
        let initial = cell.borrow().initial_energy_j();
        assert!(remaining < initial);
        assert!(remaining > 0.0);
        assert_eq!(cell.borrow().state(), SourceState::Active);
        assert!(cell.borrow().drained_capacity_ah() > 0.0);
    }

    #[test]
    fn forced_refresh_with_no_elapsed_time_is_idempotent() {
        let scheduler = scheduler(10);
        let cell = LiIonBattery::new(Rc::clone(&scheduler), LiIonParams::default());
        cell.borrow_mut()
            .attach_consumer(Rc::new(ConstantLoad::new(0.5)));
        cell.borrow_mut().start();

        let readings = Rc::new(RefCell::new(Vec::new()));
        let c = Rc::clone(&cell);
        let seen = Rc::clone(&readings);
        scheduler.schedule_after(Duration::from_secs(5), move || {
            let mut cell = c.borrow_mut();
            let first = cell.remaining_energy_j();
            let second = cell.remaining_energy_j();
            seen.borrow_mut().push((first, second));
        });
        scheduler.run();

        let readings = readings.borrow();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].0, readings[0].1);
    }

    #[test]
    fn overdraw_clamps_at_the_zero_floor() {
        let params = LiIonParams {
            initial_energy_j: 10.0,
            ..LiIonParams::default()
        };
        let scheduler = scheduler(2);
        let cell = LiIonBattery::new(Rc::clone(&scheduler), params);
        cell.borrow_mut()
            .attach_consumer(Rc::new(ConstantLoad::new(1000.0)));
        cell.borrow_mut().start();
        scheduler.run();

        assert_eq!(cell.borrow().state(), SourceState::Depleted);
        assert!(cell.borrow_mut().remaining_energy_j() >= 0.0);
    }

    #[test]
    fn set_c_preserves_the_remaining_energy_figure() {
        let scheduler = scheduler(10);
        let cell = LiIonBattery::new(Rc::clone(&scheduler), LiIonParams::default());
        let before = cell.borrow_mut().remaining_energy_j();
        cell.borrow_mut().set_c(0.7);
        let after = cell.borrow_mut().remaining_energy_j();
        assert_eq!(before, after);
    }

    #[test]
    fn reinitialization_leaves_the_depleted_state() {
        let params = LiIonParams {
            initial_energy_j: 10.0,
            ..LiIonParams::default()
        };
        let scheduler = scheduler(30);
        let cell = LiIonBattery::new(Rc::clone(&scheduler), params);
        cell.borrow_mut()
            .attach_consumer(Rc::new(ConstantLoad::new(5.0)));
        cell.borrow_mut().start();

        let c = Rc::clone(&cell);
        scheduler.schedule_after(Duration::from_secs(20), move || {
            let mut cell = c.borrow_mut();
            assert_eq!(cell.state(), SourceState::Depleted);
            cell.set_initial_energy(10.0);
            assert_eq!(cell.state(), SourceState::Active);
            assert!((cell.initial_energy_j() - 0.834 * 10.0).abs() < 1e-9);
        });
        scheduler.run();
    }

    #[test]
    fn explicit_decrease_runs_the_depletion_predicate() {
        let scheduler = scheduler(10);
        let cell = LiIonBattery::new(Rc::clone(&scheduler), LiIonParams::default());
        let initial = cell.borrow().initial_energy_j();

        cell.borrow_mut().decrease_remaining_energy(initial * 0.95);
        assert_eq!(cell.borrow().state(), SourceState::Depleted);
    }

    #[test]
    fn explicit_increase_is_capped_at_the_initial_figure() {
        let scheduler = scheduler(10);
        let cell = LiIonBattery::new(Rc::clone(&scheduler), LiIonParams::default());
        let initial = cell.borrow().initial_energy_j();

        cell.borrow_mut().decrease_remaining_energy(100.0);
        cell.borrow_mut().increase_remaining_energy(1e9);
        assert_eq!(cell.borrow_mut().remaining_energy_j(), initial);
    }

    #[test]
    fn dropping_the_cell_cancels_its_pending_update() {
        let scheduler = scheduler(10);
        let cell = LiIonBattery::new(Rc::clone(&scheduler), LiIonParams::default());
        cell.borrow_mut().start();
        drop(cell);
        // The queued callback must not fire against the dropped cell.
        scheduler.run();
        assert!(scheduler.is_finished());
    }

    #[test]
    #[should_panic]
    fn negative_initial_energy_is_rejected() {
        let params = LiIonParams {
            initial_energy_j: -1.0,
            ..LiIonParams::default()
        };
        LiIonBattery::new(scheduler(1), params);
    }

    #[test]
    #[should_panic]
    fn out_of_range_c_is_rejected() {
        let params = LiIonParams {
            c: 1.0,
            ..LiIonParams::default()
        };
        LiIonBattery::new(scheduler(1), params);
    }
}
