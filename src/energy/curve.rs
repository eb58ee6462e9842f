//! Empirical discharge-curve model mapping drained capacity and load
//! current to cell terminal voltage.

/// Fitted discharge-curve constants for one cell chemistry.
///
/// The model is pure: given the cumulative capacity drained from the cell
/// (in Ah) and the instantaneous load current (in A) it produces the
/// terminal voltage. It is only valid while the drained capacity stays
/// below the rated capacity; the battery engine's depletion threshold is
/// the guard against that singularity.
#[derive(Debug, Clone, Copy)]
pub struct DischargeCurve {
    /// Voltage of the fully charged cell (V).
    pub e_full_v: f64,
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

impl DischargeCurve {
    /// Creates a discharge curve from fitted constants.
    ///
    /// # Panics
    ///
    /// Panics if any constant is not strictly positive.
    #[expect(clippy::too_many_arguments)]
    pub fn new(
        e_full_v: f64,
        e_nom_v: f64,
        e_exp_v: f64,
        q_rated_ah: f64,
        q_nom_ah: f64,
        q_exp_ah: f64,
        internal_resistance_ohm: f64,
        typical_current_a: f64,
    ) -> Self {
        assert!(e_full_v > 0.0, "full cell voltage must be > 0");
        assert!(e_nom_v > 0.0, "nominal cell voltage must be > 0");
        assert!(e_exp_v > 0.0, "exponential-zone voltage must be > 0");
        assert!(q_rated_ah > 0.0, "rated capacity must be > 0");
        assert!(q_nom_ah > 0.0, "nominal capacity must be > 0");
        assert!(q_exp_ah > 0.0, "exponential-zone capacity must be > 0");
        assert!(internal_resistance_ohm > 0.0, "internal resistance must be > 0");
        assert!(typical_current_a > 0.0, "typical fitting current must be > 0");

        Self {
            e_full_v,
            e_nom_v,
            e_exp_v,
            q_rated_ah,
            q_nom_ah,
            q_exp_ah,
            internal_resistance_ohm,
            typical_current_a,
        }
    }

    /// Terminal voltage for the given drained capacity (Ah) and load
    /// current (A).
    pub fn voltage(&self, drained_ah: f64, current_a: f64) -> f64 {
        debug_assert!(
            drained_ah < self.q_rated_ah,
            "discharge curve is undefined at rated capacity"
        );

        // empirical factors
        let a = self.e_full_v - self.e_exp_v;
        let b = 3.0 / self.q_exp_ah;

        // slope of the polarization curve
        let k = ((self.e_full_v - self.e_nom_v + a * ((-b * self.q_nom_ah).exp() - 1.0))
            * (self.q_rated_ah - self.q_nom_ah)
            / self.q_nom_ah)
            .abs();

        // constant voltage term
        let e0 = self.e_full_v + k + self.internal_resistance_ohm * self.typical_current_a - a;

        // open-circuit voltage
        let e = e0 - k * self.q_rated_ah / (self.q_rated_ah - drained_ah)
            + a * (-b * drained_ah).exp();

        e - self.internal_resistance_ohm * current_a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The 2.45 Ah / 4.05 V cell the curve was originally fitted against.
    fn reference_cell() -> DischargeCurve {
        DischargeCurve::new(4.05, 3.6, 3.6, 2.45, 1.1, 1.2, 0.083, 2.33)
    }

    #[test]
    fn fresh_cell_at_typical_current_sits_at_full_voltage() {
        let curve = reference_cell();
        let v = curve.voltage(0.0, curve.typical_current_a);
        assert!((v - curve.e_full_v).abs() < 1e-9);
    }

    #[test]
    fn voltage_decreases_as_capacity_drains() {
        let curve = reference_cell();
        let mut previous = curve.voltage(0.0, 1.0);
        for step in 1..20 {
            let drained = step as f64 * 0.1;
            let v = curve.voltage(drained, 1.0);
            assert!(v < previous, "voltage should fall at {drained} Ah");
            previous = v;
        }
    }

    #[test]
    fn heavier_load_sags_the_terminal_voltage() {
        let curve = reference_cell();
        let light = curve.voltage(0.5, 0.1);
        let heavy = curve.voltage(0.5, 2.0);
        assert!(heavy < light);
        // The sag is purely ohmic.
        assert!((light - heavy - curve.internal_resistance_ohm * 1.9).abs() < 1e-9);
    }

    #[test]
    #[should_panic]
    fn zero_rated_capacity_is_rejected() {
        DischargeCurve::new(4.05, 3.6, 3.6, 0.0, 1.1, 1.2, 0.083, 2.33);
    }
}
