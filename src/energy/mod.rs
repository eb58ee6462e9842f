//! Energy sources: the polymorphic source contract and its concrete
//! battery models.

/// Linear constant-voltage source.
pub mod basic;
/// Empirical discharge-curve voltage model.
pub mod curve;
/// Two-well kinetic Li-ion model.
pub mod liion;
pub mod source;

// Re-export the main types for convenience
pub use basic::{BasicParams, BasicSource};
pub use curve::DischargeCurve;
pub use liion::{LiIonBattery, LiIonParams};
pub use source::{ConsumerSet, EnergySource, SourceState};
