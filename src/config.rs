//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulation timing and global parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Battery model parameters.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// Load device parameters.
    #[serde(default)]
    pub load: LoadConfig,
}

/// Simulation timing and global parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Simulated run length in seconds (must be > 0).
    pub duration_s: f64,
    /// Interval between trace samples in seconds (must be > 0).
    pub sample_interval_s: f64,
    /// Master random seed.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration_s: 3600.0,
            sample_interval_s: 1.0,
            seed: 42,
        }
    }
}

/// Battery model parameters.
///
/// The curve constants only apply to the `"liion"` model; the `"basic"`
/// model uses `supply_voltage_v` as its constant rail and ignores them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Battery model: `"liion"` or `"basic"`.
    pub model: String,
    /// Initial stored energy (J).
    pub initial_energy_j: f64,
    /// Depletion threshold as a fraction of the initial energy, in (0, 1].
    pub low_battery_threshold: f64,
    /// Interval between periodic state updates (s).
    pub update_interval_s: f64,
    /// Available-charge fraction of the kinetic model, in (0, 1).
    pub c: f64,
    /// Diffusion rate constant of the kinetic model (1/s).
    pub k: f64,
    /// Full-cell (initial) supply voltage (V).
    pub supply_voltage_v: f64,
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

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            model: "liion".to_string(),
            initial_energy_j: 31752.0,
            low_battery_threshold: 0.10,
            update_interval_s: 0.1,
            c: 0.834,
            k: 0.0169,
            supply_voltage_v: 4.05,
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

/// Load device parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    /// Load model: `"constant"`, `"pulsed"`, or `"noisy"`.
    pub model: String,
    /// Draw while active (A); the mean draw for the noisy model.
    pub current_a: f64,
    /// Draw during the off phase of the pulsed model (A).
    pub off_current_a: f64,
    /// On-phase length of the pulsed model (s).
    pub on_s: f64,
    /// Off-phase length of the pulsed model (s).
    pub off_s: f64,
    /// Gaussian jitter standard deviation of the noisy model (A).
    pub noise_std: f64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            model: "constant".to_string(),
            current_a: 1.0,
            off_current_a: 0.0,
            on_s: 600.0,
            off_s: 60.0,
            noise_std: 0.05,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"battery.low_battery_threshold"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {} — {}", self.field, self.message)
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: the reference cell under a constant
    /// 1 A draw for one hour.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            battery: BatteryConfig::default(),
            load: LoadConfig::default(),
        }
    }

    /// Returns the pulsed preset: 600 s of 1 A followed by a 60 s rest,
    /// repeating, so the voltage trace shows the rest-phase recovery.
    pub fn pulsed() -> Self {
        Self {
            load: LoadConfig {
                model: "pulsed".to_string(),
                ..LoadConfig::default()
            },
            ..Self::baseline()
        }
    }

    /// Returns the depletion preset: a small cell run past its
    /// low-battery threshold.
    pub fn depletion() -> Self {
        Self {
            simulation: SimulationConfig {
                duration_s: 60.0,
                sample_interval_s: 0.5,
                ..SimulationConfig::default()
            },
            battery: BatteryConfig {
                initial_energy_j: 100.0,
                ..BatteryConfig::default()
            },
            load: LoadConfig::default(),
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "pulsed", "depletion"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "pulsed" => Ok(Self::pulsed()),
            "depletion" => Ok(Self::depletion()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is
    /// invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "scenario".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown
    /// fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.duration_s <= 0.0 {
            errors.push(ConfigError {
                field: "simulation.duration_s".into(),
                message: "must be > 0".into(),
            });
        }
        if s.sample_interval_s <= 0.0 {
            errors.push(ConfigError {
                field: "simulation.sample_interval_s".into(),
                message: "must be > 0".into(),
            });
        }

        let b = &self.battery;
        if b.model != "liion" && b.model != "basic" {
            errors.push(ConfigError {
                field: "battery.model".into(),
                message: format!("must be \"liion\" or \"basic\", got \"{}\"", b.model),
            });
        }
        if b.initial_energy_j < 0.0 {
            errors.push(ConfigError {
                field: "battery.initial_energy_j".into(),
                message: "must be >= 0".into(),
            });
        }
        if !(b.low_battery_threshold > 0.0 && b.low_battery_threshold <= 1.0) {
            errors.push(ConfigError {
                field: "battery.low_battery_threshold".into(),
                message: "must be in (0.0, 1.0]".into(),
            });
        }
        if b.update_interval_s <= 0.0 {
            errors.push(ConfigError {
                field: "battery.update_interval_s".into(),
                message: "must be > 0".into(),
            });
        }
        if !(b.c > 0.0 && b.c < 1.0) {
            errors.push(ConfigError {
                field: "battery.c".into(),
                message: "must be in (0.0, 1.0)".into(),
            });
        }
        if b.k <= 0.0 {
            errors.push(ConfigError {
                field: "battery.k".into(),
                message: "must be > 0".into(),
            });
        }
        for (field, value) in [
            ("battery.supply_voltage_v", b.supply_voltage_v),
            ("battery.e_nom_v", b.e_nom_v),
            ("battery.e_exp_v", b.e_exp_v),
            ("battery.q_rated_ah", b.q_rated_ah),
            ("battery.q_nom_ah", b.q_nom_ah),
            ("battery.q_exp_ah", b.q_exp_ah),
            ("battery.internal_resistance_ohm", b.internal_resistance_ohm),
            ("battery.typical_current_a", b.typical_current_a),
        ] {
            if value <= 0.0 {
                errors.push(ConfigError {
                    field: field.into(),
                    message: "must be > 0".into(),
                });
            }
        }

        let l = &self.load;
        if l.model != "constant" && l.model != "pulsed" && l.model != "noisy" {
            errors.push(ConfigError {
                field: "load.model".into(),
                message: format!(
                    "must be \"constant\", \"pulsed\", or \"noisy\", got \"{}\"",
                    l.model
                ),
            });
        }
        if l.current_a < 0.0 {
            errors.push(ConfigError {
                field: "load.current_a".into(),
                message: "must be >= 0".into(),
            });
        }
        if l.model == "pulsed" {
            if l.off_current_a < 0.0 {
                errors.push(ConfigError {
                    field: "load.off_current_a".into(),
                    message: "must be >= 0".into(),
                });
            }
            if l.on_s <= 0.0 {
                errors.push(ConfigError {
                    field: "load.on_s".into(),
                    message: "must be > 0".into(),
                });
            }
            if l.off_s <= 0.0 {
                errors.push(ConfigError {
                    field: "load.off_s".into(),
                    message: "must be > 0".into(),
                });
            }
        }
        if l.model == "noisy" && l.noise_std < 0.0 {
            errors.push(ConfigError {
                field: "load.noise_std".into(),
                message: "must be >= 0".into(),
            });
        }

        errors
    }
}
