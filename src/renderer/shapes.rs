//! Draw command generation for the effects

use glam::Vec2;

use super::colors::*;
use super::{DrawCommand, with_alpha};
use crate::sim::{FieldFrame, FragmentKind, LetterField, LetterPhase, Projectile, TargetLocator};

/// Impact flash lifetime (ms)
const FLASH_MS: f32 = 400.0;
/// Impact flash base radius (px)
const FLASH_RADIUS: f32 = 12.0;

/// Particle field: fade, particles, then connection lines
pub fn field_commands(frame: &FieldFrame, out: &mut Vec<DrawCommand>) {
    out.push(DrawCommand::Fade {
        color: BACKDROP_FADE,
    });

    for p in &frame.particles {
        if frame.gradient {
            out.push(DrawCommand::Glow {
                center: p.pos,
                radius: p.size * 4.0,
                stops: [
                    (0.0, with_alpha(NEON_RED, p.alpha)),
                    (0.3, with_alpha(NEON_PINK, p.alpha * 0.7)),
                    (0.7, with_alpha(PURE_RED, p.alpha * 0.3)),
                    (1.0, TRANSPARENT),
                ],
            });
        } else {
            out.push(DrawCommand::Circle {
                center: p.pos,
                radius: p.size * 2.0,
                color: with_alpha(NEON_RED, p.alpha * 0.6),
            });
        }
    }

    for link in &frame.links {
        out.push(DrawCommand::Line {
            from: link.from,
            to: link.to,
            width: 0.5,
            color: with_alpha(NEON_RED, link.alpha),
        });
    }
}

/// Asteroids, with their fading trails unless `trails` is off
pub fn asteroid_commands(projectiles: &[Projectile], trails: bool, out: &mut Vec<DrawCommand>) {
    for asteroid in projectiles {
        if trails {
            let len = asteroid.trail.len() as f32;
            for (i, point) in asteroid.trail.iter().enumerate().skip(1) {
                // Older points are smaller and dimmer
                let t = i as f32 / len;
                out.push(DrawCommand::Circle {
                    center: *point,
                    radius: asteroid.size * t * 0.4,
                    color: with_alpha(ASTEROID_TRAIL, t),
                });
            }
        }

        out.push(DrawCommand::Glow {
            center: asteroid.pos,
            radius: asteroid.size / 2.0,
            stops: [
                (0.0, ASTEROID_CORE),
                (0.4, ASTEROID_MID),
                (0.8, ASTEROID_RIM),
                (1.0, ASTEROID_EDGE),
            ],
        });
    }
}

/// Impact flashes and fragments around struck letters
pub fn fragment_commands<L>(
    letters: &LetterField,
    now: f64,
    locator: &L,
    out: &mut Vec<DrawCommand>,
) where
    L: TargetLocator + ?Sized,
{
    for cell in letters.cells() {
        if cell.phase == LetterPhase::Intact && cell.fragments.is_empty() {
            continue;
        }
        let Some(center) = locator.locate(cell.index) else {
            continue;
        };

        if cell.phase == LetterPhase::Impact {
            let t = ((now - cell.impact_at()) as f32 / FLASH_MS).clamp(0.0, 1.0);
            out.push(DrawCommand::Glow {
                center,
                radius: FLASH_RADIUS * (0.5 + 3.5 * t),
                stops: [
                    (0.0, [1.0, 1.0, 1.0, 0.9 * (1.0 - t)]),
                    (0.3, with_alpha(NEON_RED, 0.7 * (1.0 - t))),
                    (0.6, [1.0, 0.39, 0.0, 0.5 * (1.0 - t)]),
                    (0.8, TRANSPARENT),
                ],
            });
        }

        for fragment in &cell.fragments {
            let Some(sample) = fragment.sample(now) else {
                continue;
            };
            let pos: Vec2 = center + sample.offset;
            let command = match fragment.kind {
                FragmentKind::Character => DrawCommand::Glyph {
                    center: pos,
                    glyph: fragment.glyph.unwrap_or(cell.glyph),
                    size: fragment.size * sample.scale,
                    rotation: sample.rotation,
                    color: with_alpha(NEON_RED, sample.opacity),
                },
                FragmentKind::Spark => DrawCommand::Circle {
                    center: pos,
                    radius: fragment.size / 2.0 * sample.scale,
                    color: with_alpha(SPARK, sample.opacity),
                },
                FragmentKind::Smoke => DrawCommand::Circle {
                    center: pos,
                    radius: fragment.size / 2.0 * sample.scale,
                    color: with_alpha(SMOKE, sample.opacity),
                },
            };
            out.push(command);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use crate::settings::{FieldSettings, PerformanceTier, TextSettings};
    use crate::sim::ParticleField;

    #[test]
    fn test_field_commands_high_tier() {
        let mut field =
            ParticleField::new(1920.0, 1080.0, PerformanceTier::High.into(), FieldSettings::default(), 1);
        let frame = field.step().unwrap().clone();
        let mut out = Vec::new();
        field_commands(&frame, &mut out);

        assert!(matches!(out[0], DrawCommand::Fade { .. }));
        let glows = out
            .iter()
            .filter(|c| matches!(c, DrawCommand::Glow { .. }))
            .count();
        let lines = out
            .iter()
            .filter(|c| matches!(c, DrawCommand::Line { .. }))
            .count();
        assert_eq!(glows, 80);
        assert_eq!(lines, frame.links.len());
    }

    #[test]
    fn test_field_commands_low_tier_flat() {
        let mut field =
            ParticleField::new(400.0, 800.0, PerformanceTier::Low.into(), FieldSettings::default(), 2);
        field.step();
        let frame = field.step().unwrap().clone();
        let mut out = Vec::new();
        field_commands(&frame, &mut out);
        assert!(!out.iter().any(|c| matches!(c, DrawCommand::Glow { .. })));
        assert_eq!(out.len(), 1 + 15);
    }

    #[test]
    fn test_asteroid_commands() {
        let settings = TextSettings::default();
        let mut asteroid = Projectile::new(1, Vec2::new(0.0, -50.0), 0, 3.0, 12.0);
        for _ in 0..4 {
            asteroid.advance(Some(Vec2::new(0.0, 500.0)), &settings);
        }
        let mut out = Vec::new();
        asteroid_commands(std::slice::from_ref(&asteroid), true, &mut out);
        // Oldest trail point is skipped, body drawn last
        assert_eq!(out.len(), 3 + 1);
        assert!(matches!(out.last(), Some(DrawCommand::Glow { .. })));

        let mut out = Vec::new();
        asteroid_commands(std::slice::from_ref(&asteroid), false, &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_fragment_commands_follow_letter() {
        let mut letters = LetterField::new("A", None, &TextSettings::default());
        let mut rng = Pcg32::seed_from_u64(3);
        letters.strike(0, 0.0, PerformanceTier::High.fragment_counts(), &mut rng);

        let locator = |_: usize| Some(Vec2::new(100.0, 100.0));
        let mut out = Vec::new();
        fragment_commands(&letters, 50.0, &locator, &mut out);
        // Flash plus every fragment
        assert_eq!(out.len(), 1 + 27);
        assert!(
            out.iter()
                .any(|c| matches!(c, DrawCommand::Glyph { glyph: 'A', .. }))
        );

        // Unlocatable letters draw nothing
        let nowhere = |_: usize| -> Option<Vec2> { None };
        let mut out = Vec::new();
        fragment_commands(&letters, 50.0, &nowhere, &mut out);
        assert!(out.is_empty());
    }
}
