//! Post-hoc discharge report computed from sample rows.

use std::fmt;

use crate::trace::SampleRow;

/// Aggregate figures derived from a complete discharge run.
///
/// Computed post-hoc from `Vec<SampleRow>` to ensure consistency between
/// the exported trace and the reported summary.
#[derive(Debug, Clone)]
pub struct DischargeReport {
    /// Simulated time covered by the trace (s).
    pub duration_s: f64,
    /// Number of samples in the trace.
    pub samples: usize,
    /// Initial stored energy (J).
    pub initial_energy_j: f64,
    /// Remaining energy at the last sample (J).
    pub final_energy_j: f64,
    /// Terminal voltage at the last sample (V).
    pub final_voltage_v: f64,
    /// Lowest terminal voltage observed (V).
    pub min_voltage_v: f64,
    /// Mean aggregate draw across all samples (A).
    pub mean_current_a: f64,
    /// Capacity drained over the run (Ah).
    pub drained_capacity_ah: f64,
    /// Whether the source depleted during the run.
    pub depleted: bool,
    /// Simulated time of the depletion event, if one fired (s).
    pub depletion_time_s: Option<f64>,
}

impl DischargeReport {
    /// Computes the report from the complete sample trace.
    ///
    /// # Arguments
    ///
    /// * `rows` - Complete sample trace, in time order
    /// * `initial_energy_j` - Initial stored energy of the source
    /// * `depletion_time_s` - Depletion timestamp, if the source depleted
    pub fn from_rows(
        rows: &[SampleRow],
        initial_energy_j: f64,
        depletion_time_s: Option<f64>,
    ) -> Self {
        if rows.is_empty() {
            return Self {
                duration_s: 0.0,
                samples: 0,
                initial_energy_j,
                final_energy_j: initial_energy_j,
                final_voltage_v: 0.0,
                min_voltage_v: 0.0,
                mean_current_a: 0.0,
                drained_capacity_ah: 0.0,
                depleted: depletion_time_s.is_some(),
                depletion_time_s,
            };
        }

        let last = &rows[rows.len() - 1];
        let mut min_voltage = f64::INFINITY;
        let mut current_sum = 0.0;
        for row in rows {
            min_voltage = min_voltage.min(row.voltage_v);
            current_sum += row.current_a;
        }

        Self {
            duration_s: last.time_s,
            samples: rows.len(),
            initial_energy_j,
            final_energy_j: last.remaining_j,
            final_voltage_v: last.voltage_v,
            min_voltage_v: min_voltage,
            mean_current_a: current_sum / rows.len() as f64,
            drained_capacity_ah: last.drained_capacity_ah,
            depleted: depletion_time_s.is_some(),
            depletion_time_s,
        }
    }
}

impl fmt::Display for DischargeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Discharge Report ---")?;
        writeln!(f, "Duration:           {:.1} s ({} samples)", self.duration_s, self.samples)?;
        writeln!(f, "Initial energy:     {:.2} J", self.initial_energy_j)?;
        writeln!(
            f,
            "Final energy:       {:.2} J ({:.1}%)",
            self.final_energy_j,
            if self.initial_energy_j > 0.0 {
                100.0 * self.final_energy_j / self.initial_energy_j
            } else {
                0.0
            }
        )?;
        writeln!(f, "Final voltage:      {:.4} V", self.final_voltage_v)?;
        writeln!(f, "Minimum voltage:    {:.4} V", self.min_voltage_v)?;
        writeln!(f, "Mean current:       {:.4} A", self.mean_current_a)?;
        writeln!(f, "Capacity drained:   {:.4} Ah", self.drained_capacity_ah)?;
        match self.depletion_time_s {
            Some(t) => write!(f, "Depleted:           yes, at {t:.1} s"),
            None => write!(f, "Depleted:           no"),
        }
    }
}
