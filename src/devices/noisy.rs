//! Jittery device energy model.

use std::cell::{Cell, RefCell};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::devices::types::{gaussian_noise, DeviceEnergyModel};

/// A device drawing a mean current with seeded Gaussian jitter, modeling
/// a load whose draw fluctuates between updates. The draw never goes
/// negative.
pub struct NoisyLoad {
    mean_current_a: f64,
    noise_std: f64,
    rng: RefCell<StdRng>,
    halted: Cell<bool>,
}

impl NoisyLoad {
    /// Creates a noisy load around `mean_current_a`.
    ///
    /// # Panics
    ///
    /// Panics if the mean draw or the noise standard deviation is negative.
    pub fn new(mean_current_a: f64, noise_std: f64, seed: u64) -> Self {
        assert!(mean_current_a >= 0.0, "mean draw must be non-negative");
        assert!(noise_std >= 0.0, "noise std must be non-negative");

        Self {
            mean_current_a,
            noise_std,
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
            halted: Cell::new(false),
        }
    }
}

impl DeviceEnergyModel for NoisyLoad {
    fn current_a(&self) -> f64 {
        if self.halted.get() {
            return 0.0;
        }
        let noise = gaussian_noise(&mut self.rng.borrow_mut(), self.noise_std);
        (self.mean_current_a + noise).max(0.0)
    }

    fn on_depleted(&self) {
        self.halted.set(true);
    }

    fn kind(&self) -> &'static str {
        "noisy"
    }
}
