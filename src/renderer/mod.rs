//! Rendering
//!
//! Effects are turned into a flat list of [`DrawCommand`]s by `shapes`, which
//! is pure and runs anywhere. On wasm32 the `canvas` backend replays them on a
//! 2D canvas context.

#[cfg(target_arch = "wasm32")]
pub mod canvas;
pub mod shapes;

use glam::Vec2;

#[cfg(target_arch = "wasm32")]
pub use canvas::CanvasBackend;
pub use shapes::{asteroid_commands, field_commands, fragment_commands};

/// RGBA color, components in [0, 1]
pub type Color = [f32; 4];

/// One drawing primitive, in canvas pixels
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Translucent fill over the whole canvas (motion-blur fade)
    Fade { color: Color },
    /// Solid circle
    Circle {
        center: Vec2,
        radius: f32,
        color: Color,
    },
    /// Circle filled with a radial gradient; stops are (offset, color)
    Glow {
        center: Vec2,
        radius: f32,
        stops: [(f32, Color); 4],
    },
    Line {
        from: Vec2,
        to: Vec2,
        width: f32,
        color: Color,
    },
    /// A single rotated glyph centered on `center`
    Glyph {
        center: Vec2,
        glyph: char,
        size: f32,
        /// Degrees
        rotation: f32,
        color: Color,
    },
}

/// Scale a color's alpha
#[inline]
pub fn with_alpha(color: Color, alpha: f32) -> Color {
    [color[0], color[1], color[2], color[3] * alpha.clamp(0.0, 1.0)]
}

/// Palette
pub mod colors {
    use super::Color;

    pub const NEON_RED: Color = [1.0, 0.09, 0.267, 1.0];
    pub const NEON_PINK: Color = [1.0, 0.27, 0.41, 1.0];
    pub const PURE_RED: Color = [1.0, 0.0, 0.0, 1.0];
    pub const TRANSPARENT: Color = [1.0, 0.0, 0.0, 0.0];
    pub const BACKDROP_FADE: Color = [0.039, 0.039, 0.039, 0.08];

    pub const ASTEROID_CORE: Color = [1.0, 0.42, 0.42, 1.0];
    pub const ASTEROID_MID: Color = [1.0, 0.2, 0.2, 1.0];
    pub const ASTEROID_RIM: Color = [0.8, 0.0, 0.0, 1.0];
    pub const ASTEROID_EDGE: Color = [0.5, 0.0, 0.0, 1.0];
    pub const ASTEROID_TRAIL: Color = [1.0, 0.39, 0.39, 1.0];

    pub const SPARK: Color = [0.98, 0.8, 0.08, 1.0];
    pub const SMOKE: Color = [0.29, 0.33, 0.39, 0.4];
}
