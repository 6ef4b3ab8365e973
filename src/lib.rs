//! Neon Folio - decorative effects for a single-page portfolio
//!
//! Core modules:
//! - `sim`: Deterministic effect simulations (asteroid-targeted text, particle field)
//! - `settings`: Performance tier policy and tunable effect settings
//! - `renderer`: Draw command generation (and the canvas backend on wasm32)
//! - `visitor`: Visitor IP/location lookup data with offline fallbacks
//! - `error`: Configuration and lookup errors

pub mod error;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod visitor;

pub use error::{ConfigError, LookupError};
pub use settings::{DeviceSignals, FieldBudget, PerformanceTier, Settings};

use rand::Rng;

/// Effect configuration constants
pub mod consts {
    /// Nominal frame duration (ms) used by headless runs and tests
    pub const FRAME_MS: f64 = 1000.0 / 60.0;

    /// Viewports narrower than this are treated as mobile
    pub const MOBILE_MAX_WIDTH: f32 = 768.0;
    /// Pixel ratios below this count as a low-end display
    pub const LOW_END_PIXEL_RATIO: f32 = 2.0;
    /// Fewer logical cores than this count as a low-end device
    pub const LOW_END_CORES: u32 = 4;

    /// Particle field population per tier
    pub const PARTICLES_HIGH: usize = 80;
    pub const PARTICLES_MEDIUM: usize = 40;
    /// Capable mobile devices still get a reduced field
    pub const PARTICLES_MOBILE: usize = 25;
    pub const PARTICLES_LOW: usize = 15;

    /// Fraction of the way to 1.0 that still counts as fully repaired
    pub const REPAIR_EPSILON: f32 = 1e-4;
}

/// Uniform sample in `[min, max)`; returns `min` for an empty span
#[inline]
pub fn rand_between<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    min + rng.random::<f32>() * (max - min)
}

/// Linear interpolation over evenly spaced keyframes, `t` in [0, 1]
pub fn keyframes(values: &[f32], t: f32) -> f32 {
    match values {
        [] => 0.0,
        [only] => *only,
        _ => {
            let t = t.clamp(0.0, 1.0);
            let segments = (values.len() - 1) as f32;
            let pos = t * segments;
            let i = (pos.floor() as usize).min(values.len() - 2);
            let local = pos - i as f32;
            values[i] + (values[i + 1] - values[i]) * local
        }
    }
}

/// Ease-out quadratic
#[inline]
pub fn ease_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}
