//! Radio device energy model: a finite-state transceiver with per-state
//! supply currents.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::devices::types::DeviceEnergyModel;
use crate::energy::source::EnergySource;
use crate::sim::scheduler::Scheduler;

/// Operating state of the transceiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioState {
    Off,
    Sleep,
    Idle,
    Rx,
    Tx,
}

/// Supply current drawn in each radio state, in amperes.
#[derive(Debug, Clone, Copy)]
pub struct RadioCurrents {
    pub sleep_a: f64,
    pub idle_a: f64,
    pub rx_a: f64,
    pub tx_a: f64,
}

impl Default for RadioCurrents {
    /// Typical 802.11 transceiver figures.
    fn default() -> Self {
        Self {
            sleep_a: 0.033,
            idle_a: 0.273,
            rx_a: 0.313,
            tx_a: 0.380,
        }
    }
}

/// A transceiver energy model attached to an energy source.
///
/// State changes settle the charge drawn so far and then force an
/// out-of-cycle refresh on the source, so a large current step lands
/// immediately instead of a full update interval later. When the source
/// depletes, the radio drops to `Off` and stops drawing.
pub struct RadioEnergyModel {
    scheduler: Rc<Scheduler>,
    currents: RadioCurrents,
    state: Cell<RadioState>,
    state_since: Cell<Duration>,
    drawn_charge_as: Cell<f64>,
    source: RefCell<Option<Weak<RefCell<dyn EnergySource>>>>,
}

impl RadioEnergyModel {
    pub fn new(scheduler: Rc<Scheduler>, currents: RadioCurrents, initial: RadioState) -> Self {
        let state_since = Cell::new(scheduler.now());
        Self {
            scheduler,
            currents,
            state: Cell::new(initial),
            state_since,
            drawn_charge_as: Cell::new(0.0),
            source: RefCell::new(None),
        }
    }

    /// Registers the source this radio draws from, enabling proactive
    /// refreshes on state changes. The reference is weak; the radio
    /// never keeps its source alive.
    pub fn set_source(&self, source: &Rc<RefCell<dyn EnergySource>>) {
        *self.source.borrow_mut() = Some(Rc::downgrade(source));
    }

    pub fn state(&self) -> RadioState {
        self.state.get()
    }

    /// Switches the transceiver state and forces the source to fold the
    /// current step into its state now.
    pub fn set_state(&self, next: RadioState) {
        self.settle();
        self.state.set(next);

        let source = self.source.borrow().as_ref().and_then(Weak::upgrade);
        if let Some(source) = source {
            source.borrow_mut().update();
        }
    }

    /// Cumulative charge drawn across all states, in ampere-seconds,
    /// including the in-progress state.
    pub fn drawn_charge_as(&self) -> f64 {
        let in_flight = (self.scheduler.now() - self.state_since.get()).as_secs_f64()
            * self.state_current_a(self.state.get());
        self.drawn_charge_as.get() + in_flight
    }

    fn state_current_a(&self, state: RadioState) -> f64 {
        match state {
            RadioState::Off => 0.0,
            RadioState::Sleep => self.currents.sleep_a,
            RadioState::Idle => self.currents.idle_a,
            RadioState::Rx => self.currents.rx_a,
            RadioState::Tx => self.currents.tx_a,
        }
    }

    /// Folds the charge drawn in the current state into the cumulative
    /// total and restarts the state timer.
    fn settle(&self) {
        let now = self.scheduler.now();
        let elapsed = (now - self.state_since.get()).as_secs_f64();
        self.drawn_charge_as
            .set(self.drawn_charge_as.get() + elapsed * self.state_current_a(self.state.get()));
        self.state_since.set(now);
    }
}

impl DeviceEnergyModel for RadioEnergyModel {
    fn current_a(&self) -> f64 {
        self.state_current_a(self.state.get())
    }

    // The source is mid-update while it notifies, so transition directly
    // instead of forcing another refresh through set_state.
    fn on_depleted(&self) {
        self.settle();
        self.state.set(RadioState::Off);
    }

    fn kind(&self) -> &'static str {
        "radio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_per_state_currents() {
        let scheduler = Rc::new(Scheduler::new(Duration::from_secs(10)));
        let radio = RadioEnergyModel::new(scheduler, RadioCurrents::default(), RadioState::Idle);
        assert_eq!(radio.current_a(), 0.273);

        radio.set_state(RadioState::Tx);
        assert_eq!(radio.current_a(), 0.380);

        radio.set_state(RadioState::Off);
        assert_eq!(radio.current_a(), 0.0);
    }

    #[test]
    fn charge_accounting_across_transitions() {
        let scheduler = Rc::new(Scheduler::new(Duration::from_secs(30)));
        let radio = Rc::new(RadioEnergyModel::new(
            Rc::clone(&scheduler),
            RadioCurrents::default(),
            RadioState::Idle,
        ));

        let r = Rc::clone(&radio);
        scheduler.schedule_after(Duration::from_secs(10), move || r.set_state(RadioState::Tx));
        let r = Rc::clone(&radio);
        scheduler.schedule_after(Duration::from_secs(20), move || r.set_state(RadioState::Off));
        scheduler.run();

        // 10 s idle + 10 s tx, then silence.
        let expected = 10.0 * 0.273 + 10.0 * 0.380;
        assert!((radio.drawn_charge_as() - expected).abs() < 1e-9);
    }

    #[test]
    fn depletion_drops_to_off() {
        let scheduler = Rc::new(Scheduler::new(Duration::from_secs(10)));
        let radio = RadioEnergyModel::new(scheduler, RadioCurrents::default(), RadioState::Rx);

        radio.on_depleted();
        assert_eq!(radio.state(), RadioState::Off);
        assert_eq!(radio.current_a(), 0.0);
    }

    #[test]
    fn capability_tag_is_radio() {
        let scheduler = Rc::new(Scheduler::new(Duration::from_secs(1)));
        let radio = RadioEnergyModel::new(scheduler, RadioCurrents::default(), RadioState::Sleep);
        assert_eq!(radio.kind(), "radio");
    }
}
