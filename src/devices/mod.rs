//! Consumer device energy models drawing current from an energy source.

/// Fixed-draw device model.
pub mod constant;
/// Mean-plus-jitter device model.
pub mod noisy;
/// Duty-cycled device model.
pub mod pulsed;
/// Finite-state transceiver device model.
pub mod radio;
pub mod types;

// Re-export the main types for convenience
pub use constant::ConstantLoad;
pub use noisy::NoisyLoad;
pub use pulsed::PulsedLoad;
pub use radio::{RadioCurrents, RadioEnergyModel, RadioState};
pub use types::DeviceEnergyModel;
