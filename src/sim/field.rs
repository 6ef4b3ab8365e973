//! Depth-layered ambient particle field
//!
//! Particles drift across the viewport while approaching the viewer. A
//! particle that passes the near plane or leaves the padded viewport is
//! recycled to the far band, so the population never changes.

use glam::{Vec2, Vec3};
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::rand_between;
use crate::settings::{FieldBudget, FieldSettings};

/// One point of the field. `pos.z` is depth; `vel.z` is the approach speed.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub pos: Vec3,
    pub vel: Vec3,
    pub size: f32,
    pub opacity: f32,
    /// Phase of the opacity pulse (radians)
    pub pulse: f32,
}

/// A particle after perspective projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedParticle {
    pub index: usize,
    pub pos: Vec2,
    pub size: f32,
    /// Pulsed opacity already scaled by depth
    pub alpha: f32,
    pub scale: f32,
    pub depth: f32,
}

/// A faint line between two nearby particles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub from: Vec2,
    pub to: Vec2,
    pub alpha: f32,
}

/// Output of one simulated frame
#[derive(Debug, Clone, Default)]
pub struct FieldFrame {
    pub particles: Vec<ProjectedParticle>,
    pub links: Vec<Link>,
    /// Draw radial gradients instead of flat circles
    pub gradient: bool,
}

/// Pinhole scale factor; strictly decreasing in depth
#[inline]
pub fn perspective_scale(near_plane: f32, depth: f32) -> f32 {
    near_plane / (near_plane + depth)
}

/// Project a point toward the viewport center. Returns the screen position
/// and the scale used.
#[inline]
pub fn project(pos: Vec3, near_plane: f32, viewport: Vec2) -> (Vec2, f32) {
    let scale = perspective_scale(near_plane, pos.z);
    let center = viewport / 2.0;
    (pos.truncate() * scale + center * (1.0 - scale), scale)
}

/// Ambient particle background for one viewport
#[derive(Debug, Clone)]
pub struct ParticleField {
    particles: Vec<Particle>,
    viewport: Vec2,
    budget: FieldBudget,
    settings: FieldSettings,
    rng: Pcg32,
    frame_count: u64,
    frame: FieldFrame,
}

impl ParticleField {
    pub fn new(
        width: f32,
        height: f32,
        budget: FieldBudget,
        settings: FieldSettings,
        seed: u64,
    ) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let count = budget.particles;
        let drift = settings.drift;
        let particles = (0..count)
            .map(|_| Particle {
                pos: Vec3::new(
                    rand_between(&mut rng, 0.0, width),
                    rand_between(&mut rng, 0.0, height),
                    settings.spawn_depth.sample(&mut rng),
                ),
                vel: Vec3::new(
                    rand_between(&mut rng, -drift, drift),
                    rand_between(&mut rng, -drift, drift),
                    settings.approach.sample(&mut rng),
                ),
                size: settings.size.sample(&mut rng),
                opacity: settings.opacity.sample(&mut rng),
                pulse: rand_between(&mut rng, 0.0, std::f32::consts::TAU),
            })
            .collect();

        log::info!(
            "Particle field {}x{}: {} particles ({} tier)",
            width,
            height,
            count,
            budget.tier.as_str()
        );

        Self {
            particles,
            viewport: Vec2::new(width, height),
            budget,
            settings,
            rng,
            frame_count: 0,
            frame: FieldFrame {
                particles: Vec::with_capacity(count),
                links: Vec::new(),
                gradient: budget.gradient,
            },
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn budget(&self) -> FieldBudget {
        self.budget
    }

    /// The most recently simulated frame
    pub fn last_frame(&self) -> &FieldFrame {
        &self.frame
    }

    /// Change the viewport; particles outside it recycle on the next step
    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport = Vec2::new(width, height);
    }

    fn out_of_bounds(&self, p: &Particle) -> bool {
        let pad = self.settings.padding;
        p.pos.z <= 0.0
            || p.pos.x < -pad
            || p.pos.x > self.viewport.x + pad
            || p.pos.y < -pad
            || p.pos.y > self.viewport.y + pad
    }

    fn recycle(&mut self, index: usize) {
        let pad = self.settings.padding;
        let x = rand_between(&mut self.rng, -pad, self.viewport.x + pad);
        let y = rand_between(&mut self.rng, -pad, self.viewport.y + pad);
        let z = self.settings.recycle_depth.sample(&mut self.rng);
        self.particles[index].pos = Vec3::new(x, y, z);
    }

    /// Simulate one display frame. Returns `None` on frames the budget skips.
    pub fn step(&mut self) -> Option<&FieldFrame> {
        self.frame_count += 1;
        if self.frame_count % self.budget.frame_skip.max(1) != 0 {
            return None;
        }

        for i in 0..self.particles.len() {
            let p = &mut self.particles[i];
            p.pos.x += p.vel.x;
            p.pos.y += p.vel.y;
            p.pos.z -= p.vel.z;
            p.pulse += self.settings.pulse_rate;
            if self.out_of_bounds(&self.particles[i]) {
                self.recycle(i);
            }
        }

        self.project_all();
        if self.budget.links {
            self.link_all();
        }
        Some(&self.frame)
    }

    fn project_all(&mut self) {
        let near = self.settings.near_plane;
        self.frame.particles.clear();
        self.frame.particles.extend(self.particles.iter().enumerate().map(|(index, p)| {
            let (pos, scale) = project(p.pos, near, self.viewport);
            let pulsed = p.opacity * (0.8 + 0.2 * p.pulse.sin());
            ProjectedParticle {
                index,
                pos,
                size: p.size * scale,
                alpha: pulsed * scale,
                scale,
                depth: p.pos.z,
            }
        }));
    }

    /// Sparse connection pass: every `link_stride`-th particle checks the
    /// next `link_window` particles only
    fn link_all(&mut self) {
        let s = &self.settings;
        let projected = &self.frame.particles;
        let mut links = std::mem::take(&mut self.frame.links);
        links.clear();

        for (i, a) in projected.iter().enumerate().step_by(s.link_stride.max(1)) {
            for b in projected.iter().skip(i + 1).take(s.link_window) {
                let distance = a.pos.distance(b.pos);
                if distance < s.link_distance && a.depth < s.link_depth && b.depth < s.link_depth
                {
                    links.push(Link {
                        from: a.pos,
                        to: b.pos,
                        alpha: (1.0 - distance / s.link_distance) * s.link_alpha * a.scale * b.scale,
                    });
                }
            }
        }

        self.frame.links = links;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    use crate::settings::{DeviceSignals, PerformanceTier};

    fn field(tier: PerformanceTier, seed: u64) -> ParticleField {
        ParticleField::new(1920.0, 1080.0, tier.into(), FieldSettings::default(), seed)
    }

    #[test]
    fn test_population_per_tier() {
        assert_eq!(field(PerformanceTier::High, 1).len(), 80);
        let low = field(PerformanceTier::Low, 1).len();
        assert!((15..=25).contains(&low));
        assert!(field(PerformanceTier::Medium, 1).len() < 80);
    }

    #[test]
    fn test_initial_particles_in_range() {
        let field = field(PerformanceTier::High, 2);
        for p in field.particles() {
            assert!((0.0..=1920.0).contains(&p.pos.x));
            assert!((0.0..=1080.0).contains(&p.pos.y));
            assert!((200.0..=1000.0).contains(&p.pos.z));
            assert!(p.vel.x.abs() <= 0.15 && p.vel.y.abs() <= 0.15);
            assert!(p.vel.z >= 0.5 && p.vel.z <= 2.0);
        }
    }

    #[test]
    fn test_projection_toward_center() {
        let viewport = Vec2::new(1000.0, 800.0);
        let (pos, scale) = project(Vec3::new(0.0, 0.0, 800.0), 800.0, viewport);
        assert_eq!(scale, 0.5);
        assert_eq!(pos, Vec2::new(250.0, 200.0));

        // Depth zero is identity
        let (pos, scale) = project(Vec3::new(10.0, 20.0, 0.0), 800.0, viewport);
        assert_eq!(scale, 1.0);
        assert_eq!(pos, Vec2::new(10.0, 20.0));
    }

    #[test]
    fn test_near_plane_recycles_to_far_band() {
        let mut field = field(PerformanceTier::High, 3);
        field.particles[0].pos = Vec3::new(500.0, 500.0, 0.1);
        field.particles[0].vel = Vec3::new(0.0, 0.0, 1.0);
        field.step();
        let z = field.particles()[0].pos.z;
        assert!((800.0..=1000.0).contains(&z));
    }

    #[test]
    fn test_leaving_viewport_recycles() {
        let mut field = field(PerformanceTier::High, 4);
        field.particles[0].pos = Vec3::new(-49.95, 500.0, 600.0);
        field.particles[0].vel = Vec3::new(-0.1, 0.0, 0.5);
        field.step();
        let p = &field.particles()[0];
        assert!(p.pos.z >= 800.0);
        assert!(p.pos.x >= -50.0 && p.pos.x <= 1970.0);
    }

    #[test]
    fn test_low_tier_skips_alternate_frames_and_links() {
        let mut field = field(PerformanceTier::Low, 5);
        assert!(field.step().is_none());
        let frame = field.step().expect("even frame is simulated");
        assert_eq!(frame.particles.len(), 15);
        assert!(frame.links.is_empty());
        assert!(!frame.gradient);
    }

    #[test]
    fn test_links_only_for_close_near_pairs() {
        let mut field = field(PerformanceTier::High, 6);
        for p in field.particles.iter_mut() {
            p.pos = Vec3::new(100.0, 100.0, 950.0);
            p.vel = Vec3::new(0.0, 0.0, 0.5);
        }
        // Far pairs never link
        assert!(field.step().unwrap().links.is_empty());

        field.particles[0].pos = Vec3::new(960.0, 540.0, 100.0);
        field.particles[1].pos = Vec3::new(970.0, 540.0, 100.0);
        field.particles[2].pos = Vec3::new(2000.0, 540.0, 100.0);
        let frame = field.step().unwrap();
        assert_eq!(frame.links.len(), 1);
        let link = frame.links[0];
        assert!(link.alpha > 0.0 && link.alpha < 0.2);
    }

    #[test]
    fn test_capable_phone_draws_small_flat_field() {
        let phone = DeviceSignals::new(400.0, 3.0, 8);
        let mut field = ParticleField::new(
            400.0,
            800.0,
            FieldBudget::for_device(&phone),
            FieldSettings::default(),
            8,
        );
        assert!((15..=25).contains(&field.len()));
        let frame = field.step().expect("medium tier simulates every frame");
        assert!(!frame.gradient);
        assert!(frame.links.is_empty());
    }

    #[test]
    fn test_resize_keeps_population() {
        let mut field = field(PerformanceTier::High, 7);
        field.resize(400.0, 300.0);
        for _ in 0..10 {
            field.step();
        }
        assert_eq!(field.len(), 80);
        assert_eq!(field.viewport(), Vec2::new(400.0, 300.0));
    }

    proptest! {
        #[test]
        fn scale_decreases_with_depth(a in 0.0f32..5000.0, b in 0.0f32..5000.0) {
            prop_assume!((a - b).abs() > 1e-2);
            let (near, far) = if a < b { (a, b) } else { (b, a) };
            prop_assert!(perspective_scale(800.0, near) > perspective_scale(800.0, far));
        }

        #[test]
        fn population_and_depth_stay_bounded(seed in any::<u64>(), frames in 1usize..400) {
            let mut field = ParticleField::new(
                1280.0,
                720.0,
                PerformanceTier::High.into(),
                FieldSettings::default(),
                seed,
            );
            let count = field.len();
            for _ in 0..frames {
                field.step();
                prop_assert_eq!(field.len(), count);
                prop_assert_eq!(field.last_frame().particles.len(), count);
                for p in field.particles() {
                    prop_assert!(p.pos.z > 0.0 && p.pos.z <= 1000.0);
                }
            }
        }
    }
}
