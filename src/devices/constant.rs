//! Constant-current device energy model.

use std::cell::Cell;

use crate::devices::types::DeviceEnergyModel;

/// A device drawing a fixed, externally settable current.
///
/// The draw can be changed at any time; the source picks the new value
/// up at its next update. On depletion the device halts and reports
/// zero draw from then on.
///
/// # Examples
///
/// ```
/// use cell_sim::devices::constant::ConstantLoad;
/// use cell_sim::devices::types::DeviceEnergyModel;
///
/// let load = ConstantLoad::new(1.0);
/// assert_eq!(load.current_a(), 1.0);
///
/// load.set_current_a(0.05);
/// assert_eq!(load.current_a(), 0.05);
/// ```
#[derive(Debug, Default)]
pub struct ConstantLoad {
    current_a: Cell<f64>,
    halted: Cell<bool>,
}

impl ConstantLoad {
    /// Creates a load drawing `current_a` amperes.
    ///
    /// # Panics
    ///
    /// Panics if `current_a` is not finite.
    pub fn new(current_a: f64) -> Self {
        assert!(current_a.is_finite(), "load current must be finite");
        Self {
            current_a: Cell::new(current_a),
            halted: Cell::new(false),
        }
    }

    /// Updates the draw. Has no effect once the device has halted.
    pub fn set_current_a(&self, current_a: f64) {
        assert!(current_a.is_finite(), "load current must be finite");
        if !self.halted.get() {
            self.current_a.set(current_a);
        }
    }

    /// Returns `true` once the device has halted after depletion.
    pub fn is_halted(&self) -> bool {
        self.halted.get()
    }
}

impl DeviceEnergyModel for ConstantLoad {
    fn current_a(&self) -> f64 {
        if self.halted.get() {
            0.0
        } else {
            self.current_a.get()
        }
    }

    fn on_depleted(&self) {
        self.halted.set(true);
    }

    fn kind(&self) -> &'static str {
        "constant"
    }
}
