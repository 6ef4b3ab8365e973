//! Impact fragment bursts
//!
//! Fragments are fire-and-forget: once emitted they are a pure function of
//! time, sampled by the renderer until they expire.

use glam::Vec2;
use rand::Rng;

use crate::settings::FragmentCounts;
use crate::{ease_out, keyframes, rand_between};

/// Fragment categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    /// Large piece of the glyph itself
    Character,
    /// Small, bright, short-lived
    Spark,
    /// Soft, rising, longest-lived
    Smoke,
}

impl FragmentKind {
    /// Lifetime in ms
    pub fn duration_ms(&self) -> f32 {
        match self {
            FragmentKind::Character => 3000.0,
            FragmentKind::Spark => 2500.0,
            FragmentKind::Smoke => 4000.0,
        }
    }

    fn opacity_curve(&self, initial: f32) -> [f32; 4] {
        match self {
            FragmentKind::Character => [0.0, 1.0, 0.8, 0.0],
            FragmentKind::Spark => [1.0, 0.8, 0.4, 0.0],
            FragmentKind::Smoke => [initial, 0.3, 0.15, 0.0],
        }
    }

    fn scale_curve(&self) -> [f32; 4] {
        match self {
            FragmentKind::Character => [1.0, 0.8, 0.5, 0.2],
            FragmentKind::Spark => [1.0, 0.7, 0.3, 0.0],
            FragmentKind::Smoke => [0.2, 0.6, 1.0, 1.5],
        }
    }
}

/// One cosmetic fragment, positioned relative to its letter's center
#[derive(Debug, Clone)]
pub struct Fragment {
    pub kind: FragmentKind,
    /// Start offset from the letter center
    pub origin: Vec2,
    /// Total displacement over the lifetime
    pub travel: Vec2,
    pub opacity: f32,
    pub size: f32,
    /// Degrees
    pub rotation: f32,
    pub spin: f32,
    /// Glyph drawn by character fragments
    pub glyph: Option<char>,
    pub spawned_at: f64,
}

/// Render state of a fragment at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragmentSample {
    pub offset: Vec2,
    pub opacity: f32,
    pub scale: f32,
    pub rotation: f32,
}

impl Fragment {
    /// Lifetime fraction in [0, 1]
    pub fn progress(&self, now: f64) -> f32 {
        let age = (now - self.spawned_at).max(0.0) as f32;
        (age / self.kind.duration_ms()).min(1.0)
    }

    pub fn is_expired(&self, now: f64) -> bool {
        now - self.spawned_at >= self.kind.duration_ms() as f64
    }

    pub fn sample(&self, now: f64) -> Option<FragmentSample> {
        if self.is_expired(now) {
            return None;
        }
        let t = self.progress(now);
        let eased = ease_out(t);
        Some(FragmentSample {
            offset: self.origin + self.travel * eased,
            opacity: keyframes(&self.kind.opacity_curve(self.opacity), t),
            scale: keyframes(&self.kind.scale_curve(), t),
            rotation: self.rotation + self.spin * 100.0 * eased,
        })
    }
}

/// Emit the burst for a letter struck at `now`
pub fn burst<R: Rng + ?Sized>(
    glyph: char,
    now: f64,
    counts: FragmentCounts,
    rng: &mut R,
) -> Vec<Fragment> {
    let mut fragments = Vec::with_capacity(counts.total());

    for i in 0..counts.character {
        // Alternate pieces fly left and right
        let side = if i % 2 == 0 { -100.0 } else { 100.0 };
        fragments.push(Fragment {
            kind: FragmentKind::Character,
            origin: Vec2::ZERO,
            travel: Vec2::new(
                rand_between(rng, -200.0, 200.0) + side,
                rand_between(rng, -150.0, 150.0) - 150.0,
            ),
            opacity: 1.0,
            size: rand_between(rng, 8.0, 20.0),
            rotation: rand_between(rng, 0.0, 360.0),
            spin: rand_between(rng, -10.0, 10.0),
            glyph: Some(glyph),
            spawned_at: now,
        });
    }

    for _ in 0..counts.spark {
        fragments.push(Fragment {
            kind: FragmentKind::Spark,
            origin: Vec2::new(rand_between(rng, -5.0, 5.0), rand_between(rng, -5.0, 5.0)),
            travel: Vec2::new(
                rand_between(rng, -250.0, 250.0),
                rand_between(rng, -250.0, 250.0) - 200.0,
            ),
            opacity: 1.0,
            size: rand_between(rng, 1.0, 4.0),
            rotation: rand_between(rng, 0.0, 360.0),
            spin: 0.0,
            glyph: None,
            spawned_at: now,
        });
    }

    for _ in 0..counts.smoke {
        fragments.push(Fragment {
            kind: FragmentKind::Smoke,
            origin: Vec2::new(rand_between(rng, -10.0, 10.0), rand_between(rng, -10.0, 10.0)),
            travel: Vec2::new(rand_between(rng, -50.0, 50.0), -rand_between(rng, 50.0, 200.0)),
            opacity: 0.6,
            size: rand_between(rng, 10.0, 25.0),
            rotation: rand_between(rng, 0.0, 360.0),
            spin: 0.0,
            glyph: None,
            spawned_at: now,
        });
    }

    fragments
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use crate::settings::PerformanceTier;

    #[test]
    fn test_burst_counts_follow_tier() {
        let mut rng = Pcg32::seed_from_u64(1);
        let counts = PerformanceTier::High.fragment_counts();
        let fragments = burst('A', 0.0, counts, &mut rng);
        assert_eq!(fragments.len(), counts.total());

        let count = |kind| fragments.iter().filter(|f| f.kind == kind).count();
        assert_eq!(count(FragmentKind::Character), 4);
        assert_eq!(count(FragmentKind::Spark), 15);
        assert_eq!(count(FragmentKind::Smoke), 8);
        assert!(
            fragments
                .iter()
                .filter(|f| f.kind == FragmentKind::Character)
                .all(|f| f.glyph == Some('A'))
        );
    }

    #[test]
    fn test_smoke_rises() {
        let mut rng = Pcg32::seed_from_u64(2);
        let fragments = burst('x', 0.0, PerformanceTier::High.fragment_counts(), &mut rng);
        assert!(
            fragments
                .iter()
                .filter(|f| f.kind == FragmentKind::Smoke)
                .all(|f| f.travel.y < 0.0)
        );
    }

    #[test]
    fn test_sample_expires() {
        let mut rng = Pcg32::seed_from_u64(3);
        let fragments = burst('x', 1000.0, PerformanceTier::Low.fragment_counts(), &mut rng);
        for fragment in &fragments {
            let start = fragment.sample(1000.0).unwrap();
            assert_eq!(start.offset, fragment.origin);
            let end = 1000.0 + fragment.kind.duration_ms() as f64;
            assert!(fragment.sample(end).is_none());
        }
    }

    #[test]
    fn test_spark_fades_out() {
        let mut rng = Pcg32::seed_from_u64(4);
        let spark = burst(
            'x',
            0.0,
            FragmentCounts {
                character: 0,
                spark: 1,
                smoke: 0,
            },
            &mut rng,
        )
        .remove(0);
        let early = spark.sample(100.0).unwrap().opacity;
        let late = spark.sample(2400.0).unwrap().opacity;
        assert!(early > late);
    }
}
