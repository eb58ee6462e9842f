//! Common types and traits for consumer device energy models.

use rand::rngs::StdRng;
use rand::Rng;

/// Trait implemented by every device that draws current from an energy
/// source.
///
/// A device reports its instantaneous draw on demand — the source never
/// caches it — and is told when its source depletes so it can halt its
/// own activity. Implementations use interior mutability (`Cell`) for
/// their small mutable state, so draw queries compose with the source's
/// refresh cycle without aliasing conflicts.
pub trait DeviceEnergyModel {
    /// Instantaneous current drawn from the attached source, in amperes.
    /// Positive values discharge the source.
    fn current_a(&self) -> f64;

    /// Invoked by the source, in attachment order, when it depletes.
    /// Devices are expected to halt their own activity; the source does
    /// not enforce this, only announces it.
    fn on_depleted(&self);

    /// Capability tag used by `EnergySource::consumers_of_kind`.
    fn kind(&self) -> &'static str;
}

/// Utility function to generate Gaussian noise using Box-Muller transform.
///
/// # Arguments
///
/// * `rng` - Random number generator
/// * `std_dev` - Standard deviation of the noise
///
/// # Returns
///
/// Random value from a Gaussian distribution with mean 0 and specified
/// standard deviation
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}
