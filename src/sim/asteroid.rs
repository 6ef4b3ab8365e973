//! Asteroid-targeted text
//!
//! Owns the letters, the live asteroids, and the spawn schedule. The host
//! calls [`AsteroidText::frame`] once per animation frame with a monotonic
//! timestamp; everything else (phase deadlines, spawn timing) is derived
//! from that clock, so dropping or resetting the effect cancels it all.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::letters::{LetterField, PhaseChange};
use super::projectile::{Advance, Projectile, TargetLocator};
use crate::settings::{PerformanceTier, TextSettings};

/// A collision handed to the letter state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    pub projectile: u32,
    pub index: usize,
    pub at: Vec2,
    /// Whether the letter actually started breaking
    pub applied: bool,
}

/// What happened during one frame
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    pub spawned: Vec<u32>,
    pub impacts: Vec<Impact>,
    pub transitions: Vec<PhaseChange>,
}

/// The text effect for one mounted string
#[derive(Debug, Clone)]
pub struct AsteroidText {
    letters: LetterField,
    highlight: Option<String>,
    projectiles: Vec<Projectile>,
    settings: TextSettings,
    tier: PerformanceTier,
    viewport_width: f32,
    seed: u64,
    rng: Pcg32,
    next_spawn_at: Option<f64>,
    next_id: u32,
}

impl AsteroidText {
    pub fn new(
        text: &str,
        highlight: Option<&str>,
        tier: PerformanceTier,
        settings: TextSettings,
        viewport_width: f32,
        seed: u64,
    ) -> Self {
        log::info!(
            "Asteroid text '{}' ({} asteroids, {} tier)",
            text,
            settings.asteroid_count,
            tier.as_str()
        );
        Self {
            letters: LetterField::new(text, highlight, &settings),
            highlight: highlight.map(str::to_owned),
            projectiles: Vec::new(),
            settings,
            tier,
            viewport_width,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            next_spawn_at: None,
            next_id: 1,
        }
    }

    pub fn letters(&self) -> &LetterField {
        &self.letters
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn settings(&self) -> &TextSettings {
        &self.settings
    }

    pub fn tier(&self) -> PerformanceTier {
        self.tier
    }

    /// Time of the next spawn check, once the first frame has run
    pub fn next_spawn_at(&self) -> Option<f64> {
        self.next_spawn_at
    }

    pub fn resize(&mut self, viewport_width: f32) {
        self.viewport_width = viewport_width;
    }

    /// Replace the text. All asteroids and pending transitions are dropped.
    pub fn set_text(&mut self, text: &str, highlight: Option<&str>) {
        self.letters = LetterField::new(text, highlight, &self.settings);
        self.highlight = highlight.map(str::to_owned);
        self.projectiles.clear();
        self.next_spawn_at = None;
        log::debug!("Asteroid text replaced with '{}'", text);
    }

    /// Return to the freshly constructed state
    pub fn reset(&mut self) {
        let text = self.letters.text();
        self.letters = LetterField::new(&text, self.highlight.as_deref(), &self.settings);
        self.projectiles.clear();
        self.rng = Pcg32::seed_from_u64(self.seed);
        self.next_spawn_at = None;
        self.next_id = 1;
    }

    fn is_targeted(&self, index: usize) -> bool {
        self.projectiles.iter().any(|p| p.target == index)
    }

    /// Letters a new asteroid may aim at
    pub fn eligible_targets(&self) -> Vec<usize> {
        self.letters
            .cells()
            .iter()
            .filter(|c| c.is_targetable() && !self.letters.is_destroyed(c.index))
            .map(|c| c.index)
            .filter(|&i| !self.is_targeted(i))
            .collect()
    }

    fn schedule_spawn(&mut self, now: f64) {
        let delay = self.settings.spawn_interval_ms.sample(&mut self.rng) as f64;
        self.next_spawn_at = Some(now + delay);
    }

    /// Drop asteroids whose letter left `Intact` by some other route
    fn prune_stale(&mut self) {
        let letters = &self.letters;
        self.projectiles
            .retain(|p| letters.cell(p.target).is_some_and(|c| c.is_targetable()));
    }

    /// Spawn one asteroid if under the ceiling and a target is free
    fn try_spawn(&mut self) -> Option<u32> {
        self.prune_stale();
        if self.projectiles.len() >= self.settings.asteroid_count {
            return None;
        }

        let targets = self.eligible_targets();
        if targets.is_empty() {
            return None;
        }
        let target = targets[self.rng.random_range(0..targets.len())];

        let id = self.next_id;
        self.next_id += 1;
        let pos = Vec2::new(
            self.rng.random::<f32>() * self.viewport_width,
            self.settings.spawn_y,
        );
        let speed = self.settings.speed.sample(&mut self.rng);
        let size = self.settings.size.sample(&mut self.rng);
        self.projectiles
            .push(Projectile::new(id, pos, target, speed, size));

        log::debug!("Asteroid {} spawned toward letter {}", id, target);
        Some(id)
    }

    /// Advance one animation frame
    pub fn frame<L>(&mut self, now: f64, locator: &L) -> FrameReport
    where
        L: TargetLocator + ?Sized,
    {
        let mut report = FrameReport {
            transitions: self.letters.advance(now),
            ..Default::default()
        };

        match self.next_spawn_at {
            None => self.schedule_spawn(now),
            Some(at) if now >= at => {
                if let Some(id) = self.try_spawn() {
                    report.spawned.push(id);
                }
                self.schedule_spawn(now);
            }
            Some(_) => {}
        }

        // Read every target position before any letter is struck
        let targets: Vec<Option<Vec2>> = self
            .projectiles
            .iter()
            .map(|p| locator.locate(p.target))
            .collect();

        let mut collided = Vec::new();
        for (projectile, target_pos) in self.projectiles.iter_mut().zip(targets) {
            if let Advance::Collided { at } = projectile.advance(target_pos, &self.settings) {
                collided.push((projectile.id, projectile.target, at));
            }
        }

        let counts = self.tier.fragment_counts();
        for &(id, index, at) in &collided {
            let applied = self.letters.strike(index, now, counts, &mut self.rng);
            report.impacts.push(Impact {
                projectile: id,
                index,
                at,
                applied,
            });
        }
        self.projectiles
            .retain(|p| !collided.iter().any(|&(id, _, _)| id == p.id));

        report
    }
}
