//! Deterministic effect simulations
//!
//! Everything here is pure and deterministic:
//! - Seeded RNG only
//! - Time comes from the caller (monotonic milliseconds)
//! - Stable iteration order (by letter index, then spawn order)
//! - No rendering or platform dependencies

pub mod asteroid;
pub mod field;
pub mod fragments;
pub mod letters;
pub mod projectile;

pub use asteroid::{AsteroidText, FrameReport, Impact};
pub use field::{FieldFrame, Link, Particle, ParticleField, ProjectedParticle, perspective_scale, project};
pub use fragments::{Fragment, FragmentKind, FragmentSample};
pub use letters::{CharacterCell, LetterField, LetterPhase, PhaseChange};
pub use projectile::{Advance, Projectile, TargetLocator};
