//! The polymorphic energy-source contract and the shared consumer registry.

use std::rc::Rc;
use std::time::Duration;

use crate::devices::types::DeviceEnergyModel;
use crate::trace::EnergyTrace;

/// Discharge lifecycle of a source.
///
/// `Depleted` is terminal: a source only returns to `Active` through an
/// explicit re-initialization via `set_initial_energy` on the concrete
/// model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Active,
    Depleted,
}

/// Capability set every concrete battery model supports.
///
/// Getters that report energy or voltage force a state refresh first, so
/// callers always observe up-to-date figures regardless of where in the
/// periodic update cycle they are invoked.
pub trait EnergySource {
    /// Appends a consumer to the source's ordered list. Duplicates are
    /// not detected; attaching the same consumer twice doubles its draw.
    fn attach_consumer(&mut self, consumer: Rc<dyn DeviceEnergyModel>);

    /// Ordered subsequence of attached consumers whose capability tag
    /// matches `kind`. Empty when none match.
    fn consumers_of_kind(&self, kind: &str) -> Vec<Rc<dyn DeviceEnergyModel>>;

    /// Registers an observer for energy-change and depletion events.
    fn add_trace(&mut self, trace: Rc<dyn EnergyTrace>);

    /// Begins periodic updates. Idempotent once running.
    fn start(&mut self);

    /// Forces an out-of-cycle state refresh. Consumers whose draw just
    /// stepped sharply call this so the change lands now instead of a
    /// full update interval later.
    fn update(&mut self);

    /// Initial stored energy (J).
    fn initial_energy_j(&self) -> f64;

    /// Remaining stored energy (J), refreshed before returning.
    fn remaining_energy_j(&mut self) -> f64;

    /// Remaining energy as a fraction of the initial figure.
    fn energy_fraction(&mut self) -> f64 {
        let initial = self.initial_energy_j();
        if initial > 0.0 {
            self.remaining_energy_j() / initial
        } else {
            0.0
        }
    }

    /// Terminal voltage (V), refreshed before returning.
    fn supply_voltage_v(&mut self) -> f64;

    /// Signed sum of every attached consumer's instantaneous draw (A),
    /// freshly queried.
    fn total_current_a(&self) -> f64;

    /// Cumulative capacity drained from the source (Ah).
    fn drained_capacity_ah(&self) -> f64;

    /// Current lifecycle state.
    fn state(&self) -> SourceState;

    /// Explicit event-driven withdrawal of `energy_j` joules, clamped at
    /// the zero floor. Runs the same depletion predicate as the periodic
    /// update path.
    fn decrease_remaining_energy(&mut self, energy_j: f64);

    /// Explicit recharge of `energy_j` joules, capped at the initial
    /// figure. Does not leave the `Depleted` state.
    fn increase_remaining_energy(&mut self, energy_j: f64);
}

/// Ordered registry of the consumers attached to one source.
///
/// The source shares ownership of its consumers (`Rc`) while consumers
/// keep only weak back-references, so no ownership cycle forms.
#[derive(Default)]
pub struct ConsumerSet {
    consumers: Vec<Rc<dyn DeviceEnergyModel>>,
}

impl ConsumerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, consumer: Rc<dyn DeviceEnergyModel>) {
        self.consumers.push(consumer);
    }

    /// Consumers whose capability tag matches `kind`, in attachment order.
    pub fn of_kind(&self, kind: &str) -> Vec<Rc<dyn DeviceEnergyModel>> {
        self.consumers
            .iter()
            .filter(|c| c.kind() == kind)
            .cloned()
            .collect()
    }

    /// Signed sum of all instantaneous draws, queried fresh on each call.
    pub fn total_current_a(&self) -> f64 {
        self.consumers.iter().map(|c| c.current_a()).sum()
    }

    /// Delivers the depletion event to every consumer in attachment order.
    pub fn notify_depleted(&self) {
        for consumer in &self.consumers {
            consumer.on_depleted();
        }
    }

    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }
}

/// Observer fan-out shared by the concrete source models.
pub(crate) fn fire_energy_changed(traces: &[Rc<dyn EnergyTrace>], old_j: f64, new_j: f64) {
    // TracedValue semantics: observers only hear about actual changes,
    // so forced zero-elapsed refreshes stay silent.
    if old_j != new_j {
        for trace in traces {
            trace.energy_changed(old_j, new_j);
        }
    }
}

pub(crate) fn fire_depleted(traces: &[Rc<dyn EnergyTrace>], at: Duration) {
    for trace in traces {
        trace.depleted(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::constant::ConstantLoad;

    #[test]
    fn aggregates_signed_currents() {
        let mut set = ConsumerSet::new();
        set.attach(Rc::new(ConstantLoad::new(0.3)));
        set.attach(Rc::new(ConstantLoad::new(1.2)));
        assert!((set.total_current_a() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn empty_set_draws_nothing() {
        let set = ConsumerSet::new();
        assert!(set.is_empty());
        assert_eq!(set.total_current_a(), 0.0);
    }

    #[test]
    fn of_kind_filters_by_capability_tag() {
        let mut set = ConsumerSet::new();
        set.attach(Rc::new(ConstantLoad::new(1.0)));
        assert_eq!(set.of_kind("constant").len(), 1);
        assert!(set.of_kind("radio").is_empty());
    }

    #[test]
    fn depletion_notification_halts_consumers() {
        let mut set = ConsumerSet::new();
        let load = Rc::new(ConstantLoad::new(2.0));
        set.attach(Rc::clone(&load) as Rc<dyn DeviceEnergyModel>);

        set.notify_depleted();
        assert_eq!(load.current_a(), 0.0);
    }
}
