//! Scenario runner: wires a validated configuration into a scheduler,
//! source, and load, runs the discharge, and collects the sample trace.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::config::ScenarioConfig;
use crate::devices::constant::ConstantLoad;
use crate::devices::noisy::NoisyLoad;
use crate::devices::pulsed::PulsedLoad;
use crate::devices::types::DeviceEnergyModel;
use crate::energy::basic::{BasicParams, BasicSource};
use crate::energy::liion::{LiIonBattery, LiIonParams};
use crate::energy::source::EnergySource;
use crate::report::DischargeReport;
use crate::sim::scheduler::Scheduler;
use crate::trace::{EnergyTrace, SampleRow, TraceRecorder};

/// Complete outcome of one scenario run.
pub struct SimulationResult {
    /// Periodic samples of the source, in time order.
    pub rows: Vec<SampleRow>,
    /// Post-hoc summary derived from the trace.
    pub report: DischargeReport,
}

/// Builds the configured source on the given scheduler.
fn build_source(cfg: &ScenarioConfig, scheduler: &Rc<Scheduler>) -> Rc<RefCell<dyn EnergySource>> {
    let b = &cfg.battery;
    match b.model.as_str() {
        "basic" => BasicSource::new(
            Rc::clone(scheduler),
            BasicParams {
                initial_energy_j: b.initial_energy_j,
                supply_voltage_v: b.supply_voltage_v,
                low_battery_threshold: b.low_battery_threshold,
                update_interval: Duration::from_secs_f64(b.update_interval_s),
            },
        ),
        _ => LiIonBattery::new(
            Rc::clone(scheduler),
            LiIonParams {
                initial_energy_j: b.initial_energy_j,
                low_battery_threshold: b.low_battery_threshold,
                update_interval: Duration::from_secs_f64(b.update_interval_s),
                c: b.c,
                k: b.k,
                initial_supply_voltage_v: b.supply_voltage_v,
                e_nom_v: b.e_nom_v,
                e_exp_v: b.e_exp_v,
                q_rated_ah: b.q_rated_ah,
                q_nom_ah: b.q_nom_ah,
                q_exp_ah: b.q_exp_ah,
                internal_resistance_ohm: b.internal_resistance_ohm,
                typical_current_a: b.typical_current_a,
            },
        ),
    }
}

/// Builds the configured load device.
fn build_load(cfg: &ScenarioConfig, scheduler: &Rc<Scheduler>) -> Rc<dyn DeviceEnergyModel> {
    let l = &cfg.load;
    match l.model.as_str() {
        "pulsed" => Rc::new(PulsedLoad::new(
            Rc::clone(scheduler),
            l.current_a,
            l.off_current_a,
            Duration::from_secs_f64(l.on_s),
            Duration::from_secs_f64(l.off_s),
        )),
        "noisy" => Rc::new(NoisyLoad::new(
            l.current_a,
            l.noise_std,
            cfg.simulation.seed,
        )),
        _ => Rc::new(ConstantLoad::new(l.current_a)),
    }
}

/// Samples the source now and schedules the next sample, mirroring the
/// engine's own self-rescheduling discipline.
fn sample_and_reschedule(
    scheduler: Rc<Scheduler>,
    source: Rc<RefCell<dyn EnergySource>>,
    rows: Rc<RefCell<Vec<SampleRow>>>,
    interval: Duration,
) {
    {
        let mut src = source.borrow_mut();
        let remaining_j = src.remaining_energy_j();
        let voltage_v = src.supply_voltage_v();
        let energy_fraction = src.energy_fraction();
        rows.borrow_mut().push(SampleRow {
            time_s: scheduler.now().as_secs_f64(),
            current_a: src.total_current_a(),
            voltage_v,
            remaining_j,
            energy_fraction,
            drained_capacity_ah: src.drained_capacity_ah(),
        });
    }

    if scheduler.is_finished() {
        return;
    }
    let sch = Rc::clone(&scheduler);
    scheduler.schedule_after(interval, move || {
        sample_and_reschedule(Rc::clone(&sch), source, rows, interval);
    });
}

/// Runs a scenario to its configured horizon.
///
/// The configuration is assumed to be validated; invalid parameter
/// ranges panic in the model constructors.
pub fn run_scenario(cfg: &ScenarioConfig) -> SimulationResult {
    let scheduler = Rc::new(Scheduler::new(Duration::from_secs_f64(
        cfg.simulation.duration_s,
    )));
    let source = build_source(cfg, &scheduler);
    let load = build_load(cfg, &scheduler);
    let recorder = Rc::new(TraceRecorder::new());

    {
        let mut src = source.borrow_mut();
        src.attach_consumer(Rc::clone(&load));
        let trace: Rc<dyn EnergyTrace> = Rc::clone(&recorder) as Rc<dyn EnergyTrace>;
        src.add_trace(trace);
        src.start();
    }

    let rows = Rc::new(RefCell::new(Vec::new()));
    sample_and_reschedule(
        Rc::clone(&scheduler),
        Rc::clone(&source),
        Rc::clone(&rows),
        Duration::from_secs_f64(cfg.simulation.sample_interval_s),
    );

    scheduler.run();

    let initial_energy_j = source.borrow().initial_energy_j();
    let rows = rows.take();
    let report = DischargeReport::from_rows(
        &rows,
        initial_energy_j,
        recorder.depleted_at().map(|at| at.as_secs_f64()),
    );
    SimulationResult { rows, report }
}
