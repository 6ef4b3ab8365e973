//! Seeking projectiles ("asteroids")

use std::collections::VecDeque;

use glam::Vec2;

use crate::settings::TextSettings;

/// Resolves the live on-screen center of a letter.
///
/// Letters move with layout and scroll, so positions are looked up every
/// frame. `None` means the letter cannot be located right now.
pub trait TargetLocator {
    fn locate(&self, index: usize) -> Option<Vec2>;
}

impl<F> TargetLocator for F
where
    F: Fn(usize) -> Option<Vec2>,
{
    fn locate(&self, index: usize) -> Option<Vec2> {
        self(index)
    }
}

impl TargetLocator for [Option<Vec2>] {
    fn locate(&self, index: usize) -> Option<Vec2> {
        self.get(index).copied().flatten()
    }
}

/// Outcome of one motion step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Advance {
    Moved,
    /// Target could not be located; nothing changed
    Unresolved,
    /// Within the collision radius of the target at `at`
    Collided { at: Vec2 },
}

/// A projectile seeking one letter
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: u32,
    pub pos: Vec2,
    /// Index of the targeted letter
    pub target: usize,
    /// Pixels per frame
    pub speed: f32,
    pub size: f32,
    /// Degrees
    pub rotation: f32,
    /// Recent positions, oldest first
    pub trail: VecDeque<Vec2>,
}

impl Projectile {
    pub fn new(id: u32, pos: Vec2, target: usize, speed: f32, size: f32) -> Self {
        Self {
            id,
            pos,
            target,
            speed,
            size,
            rotation: 0.0,
            trail: VecDeque::new(),
        }
    }

    /// Move one frame toward `target_pos`.
    ///
    /// A projectile already inside the collision radius (including exactly on
    /// the target) collides without moving. A step never overshoots the
    /// target, so any speed eventually collides.
    pub fn advance(&mut self, target_pos: Option<Vec2>, settings: &TextSettings) -> Advance {
        let Some(target_pos) = target_pos else {
            return Advance::Unresolved;
        };

        let delta = target_pos - self.pos;
        let distance = delta.length();
        if distance < settings.collision_radius {
            return Advance::Collided { at: target_pos };
        }

        self.record_trail(settings.trail_len);
        self.pos += delta / distance * self.speed.min(distance);
        self.rotation += settings.spin;
        Advance::Moved
    }

    fn record_trail(&mut self, max_len: usize) {
        if max_len == 0 {
            return;
        }
        self.trail.push_back(self.pos);
        while self.trail.len() > max_len {
            self.trail.pop_front();
        }
    }
}
