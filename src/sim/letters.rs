//! Per-letter destruction and repair
//!
//! Each character of the text is a [`CharacterCell`] that cycles
//! `Intact → Impact → Breaking → Fragments → Destroyed → Repairing → Intact`.
//! A strike starts the cycle; every later transition is a deadline measured
//! from the impact and checked by [`LetterField::advance`] against the clock.

use std::collections::BTreeSet;

use rand::Rng;

use super::fragments::{self, Fragment};
use crate::consts::REPAIR_EPSILON;
use crate::settings::{FragmentCounts, TextSettings};

/// Lifecycle phase of a letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LetterPhase {
    #[default]
    Intact,
    /// Flash and shake right after the hit
    Impact,
    Breaking,
    Fragments,
    /// Glyph hidden; listed in the destroyed set
    Destroyed,
    Repairing,
}

impl LetterPhase {
    /// Glyph opacity for rendering
    pub fn glyph_opacity(&self, repair_progress: f32) -> f32 {
        match self {
            LetterPhase::Destroyed => 0.0,
            LetterPhase::Fragments => 0.5,
            LetterPhase::Breaking => 0.8,
            LetterPhase::Repairing => repair_progress.max(0.9),
            LetterPhase::Intact | LetterPhase::Impact => 1.0,
        }
    }
}

/// One character of the effect text
#[derive(Debug, Clone)]
pub struct CharacterCell {
    pub index: usize,
    pub glyph: char,
    pub highlighted: bool,
    pub phase: LetterPhase,
    /// 0 until the first repair, then in [repair_seed, 1]
    pub repair_progress: f32,
    pub fragments: Vec<Fragment>,
    impact_at: f64,
    repair_at: f64,
    repair_ticks: u32,
}

impl CharacterCell {
    fn new(index: usize, glyph: char, highlighted: bool) -> Self {
        Self {
            index,
            glyph,
            highlighted,
            phase: LetterPhase::Intact,
            repair_progress: 0.0,
            fragments: Vec::new(),
            impact_at: 0.0,
            repair_at: 0.0,
            repair_ticks: 0,
        }
    }

    pub fn is_whitespace(&self) -> bool {
        self.glyph.is_whitespace()
    }

    /// Can be struck right now
    pub fn is_targetable(&self) -> bool {
        !self.is_whitespace() && self.phase == LetterPhase::Intact
    }

    pub fn opacity(&self) -> f32 {
        self.phase.glyph_opacity(self.repair_progress)
    }

    /// Time of the last impact (ms), meaningful outside `Intact`
    pub fn impact_at(&self) -> f64 {
        self.impact_at
    }

    /// Scheduled start of the repair (ms), meaningful outside `Intact`
    pub fn repair_at(&self) -> f64 {
        self.repair_at
    }
}

/// A phase change reported by [`LetterField::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    pub index: usize,
    pub from: LetterPhase,
    pub to: LetterPhase,
}

/// Phase deadlines copied out of [`TextSettings`]
#[derive(Debug, Clone, Copy)]
struct PhaseTiming {
    impact_ms: f64,
    breaking_ms: f64,
    destroyed_ms: f64,
    repair_seed: f32,
    repair_step: f32,
    repair_tick_ms: f64,
}

impl From<&TextSettings> for PhaseTiming {
    fn from(s: &TextSettings) -> Self {
        Self {
            impact_ms: s.impact_ms as f64,
            breaking_ms: s.breaking_ms as f64,
            destroyed_ms: s.destroyed_ms as f64,
            repair_seed: s.repair_seed,
            repair_step: s.repair_step,
            repair_tick_ms: s.repair_tick_ms as f64,
        }
    }
}

/// Character range `[start, end)` of the first occurrence of `highlight`
fn highlight_range(text: &str, highlight: Option<&str>) -> Option<(usize, usize)> {
    let needle = highlight.filter(|h| !h.is_empty())?;
    let byte = text.find(needle)?;
    let start = text[..byte].chars().count();
    Some((start, start + needle.chars().count()))
}

/// All letters of one text plus the destroyed set
#[derive(Debug, Clone)]
pub struct LetterField {
    cells: Vec<CharacterCell>,
    destroyed: BTreeSet<usize>,
    timing: PhaseTiming,
    repair_delay_min: f32,
    repair_delay_max: f32,
}

impl LetterField {
    pub fn new(text: &str, highlight: Option<&str>, settings: &TextSettings) -> Self {
        let range = highlight_range(text, highlight);
        let cells = text
            .chars()
            .enumerate()
            .map(|(i, c)| {
                let highlighted = range.is_some_and(|(start, end)| i >= start && i < end);
                CharacterCell::new(i, c, highlighted)
            })
            .collect();

        Self {
            cells,
            destroyed: BTreeSet::new(),
            timing: PhaseTiming::from(settings),
            repair_delay_min: settings.repair_delay_ms.min,
            repair_delay_max: settings.repair_delay_ms.max,
        }
    }

    pub fn cells(&self) -> &[CharacterCell] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<&CharacterCell> {
        self.cells.get(index)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn text(&self) -> String {
        self.cells.iter().map(|c| c.glyph).collect()
    }

    /// Letters whose glyph is currently gone
    pub fn destroyed(&self) -> &BTreeSet<usize> {
        &self.destroyed
    }

    pub fn is_destroyed(&self, index: usize) -> bool {
        self.destroyed.contains(&index)
    }

    /// Start destruction of an intact letter.
    ///
    /// Returns `false` (and changes nothing) for whitespace, unknown indices,
    /// and letters already mid-cycle.
    pub fn strike<R: Rng + ?Sized>(
        &mut self,
        index: usize,
        now: f64,
        counts: FragmentCounts,
        rng: &mut R,
    ) -> bool {
        let Some(cell) = self.cells.get_mut(index) else {
            return false;
        };
        if !cell.is_targetable() {
            return false;
        }

        let delay = crate::rand_between(rng, self.repair_delay_min, self.repair_delay_max) as f64;
        cell.phase = LetterPhase::Impact;
        cell.impact_at = now;
        cell.repair_at = now + delay.max(self.timing.destroyed_ms);
        cell.repair_ticks = 0;
        cell.repair_progress = 0.0;
        cell.fragments = fragments::burst(cell.glyph, now, counts, rng);

        log::debug!("Letter {} '{}' struck at {:.0}ms", index, cell.glyph, now);
        true
    }

    /// Apply every transition due at `now`, in order
    pub fn advance(&mut self, now: f64) -> Vec<PhaseChange> {
        let timing = self.timing;
        let mut changes = Vec::new();

        for cell in self.cells.iter_mut() {
            loop {
                let from = cell.phase;
                let to = match from {
                    LetterPhase::Impact if now >= cell.impact_at + timing.impact_ms => {
                        LetterPhase::Breaking
                    }
                    LetterPhase::Breaking if now >= cell.impact_at + timing.breaking_ms => {
                        LetterPhase::Fragments
                    }
                    LetterPhase::Fragments if now >= cell.impact_at + timing.destroyed_ms => {
                        self.destroyed.insert(cell.index);
                        LetterPhase::Destroyed
                    }
                    LetterPhase::Destroyed if now >= cell.repair_at => {
                        cell.repair_progress = timing.repair_seed;
                        cell.repair_ticks = 0;
                        LetterPhase::Repairing
                    }
                    LetterPhase::Repairing => {
                        let due = cell.repair_at
                            + (cell.repair_ticks + 1) as f64 * timing.repair_tick_ms;
                        if now < due {
                            break;
                        }
                        cell.repair_ticks += 1;
                        let progress =
                            timing.repair_seed + cell.repair_ticks as f32 * timing.repair_step;
                        if progress < 1.0 - REPAIR_EPSILON {
                            cell.repair_progress = progress;
                            continue;
                        }
                        cell.repair_progress = 1.0;
                        cell.fragments.clear();
                        self.destroyed.remove(&cell.index);
                        LetterPhase::Intact
                    }
                    _ => break,
                };

                cell.phase = to;
                if to == LetterPhase::Intact {
                    log::debug!("Letter {} '{}' repaired", cell.index, cell.glyph);
                }
                changes.push(PhaseChange {
                    index: cell.index,
                    from,
                    to,
                });
            }
        }

        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use crate::settings::PerformanceTier;

    fn field(text: &str) -> LetterField {
        LetterField::new(text, None, &TextSettings::default())
    }

    fn strike(field: &mut LetterField, index: usize, now: f64) -> bool {
        let mut rng = Pcg32::seed_from_u64(5);
        field.strike(index, now, PerformanceTier::High.fragment_counts(), &mut rng)
    }

    #[test]
    fn test_one_cell_per_char() {
        let field = field("héllo wörld");
        assert_eq!(field.len(), 11);
        assert_eq!(field.text(), "héllo wörld");
        assert!(field.cells().iter().enumerate().all(|(i, c)| c.index == i));
    }

    #[test]
    fn test_highlight_marks_first_occurrence() {
        let field = LetterField::new("I build web apps", Some("web"), &TextSettings::default());
        let lit: Vec<usize> = field
            .cells()
            .iter()
            .filter(|c| c.highlighted)
            .map(|c| c.index)
            .collect();
        assert_eq!(lit, vec![8, 9, 10]);
    }

    #[test]
    fn test_missing_highlight_marks_nothing() {
        let field = LetterField::new("ADNAN", Some("zzz"), &TextSettings::default());
        assert!(field.cells().iter().all(|c| !c.highlighted));
        let field = LetterField::new("ADNAN", Some(""), &TextSettings::default());
        assert!(field.cells().iter().all(|c| !c.highlighted));
    }

    #[test]
    fn test_whitespace_cannot_be_struck() {
        let mut field = field("A B");
        assert!(!strike(&mut field, 1, 0.0));
        assert_eq!(field.cells()[1].phase, LetterPhase::Intact);
        assert!(!strike(&mut field, 99, 0.0));
    }

    #[test]
    fn test_full_cycle() {
        let mut field = field("AB");
        assert!(strike(&mut field, 0, 0.0));
        assert_eq!(field.cells()[0].phase, LetterPhase::Impact);
        assert!(!field.cells()[0].fragments.is_empty());

        // Already mid-cycle
        assert!(!strike(&mut field, 0, 10.0));

        field.advance(99.0);
        assert_eq!(field.cells()[0].phase, LetterPhase::Impact);
        field.advance(100.0);
        assert_eq!(field.cells()[0].phase, LetterPhase::Breaking);
        field.advance(300.0);
        assert_eq!(field.cells()[0].phase, LetterPhase::Fragments);
        assert!(!field.is_destroyed(0));
        field.advance(1000.0);
        assert_eq!(field.cells()[0].phase, LetterPhase::Destroyed);
        assert!(field.is_destroyed(0));
        assert_eq!(field.cells()[0].opacity(), 0.0);

        let repair_at = field.cells()[0].repair_at();
        assert!((4000.0..=6000.0).contains(&repair_at));
        field.advance(repair_at);
        assert_eq!(field.cells()[0].phase, LetterPhase::Repairing);
        assert!((field.cells()[0].repair_progress - 0.1).abs() < 1e-6);
        assert!(field.cells()[0].opacity() >= 0.9);

        field.advance(repair_at + 450.0);
        assert_eq!(field.cells()[0].phase, LetterPhase::Repairing);
        assert!((field.cells()[0].repair_progress - 0.5).abs() < 1e-5);

        let changes = field.advance(repair_at + 900.0);
        assert_eq!(field.cells()[0].phase, LetterPhase::Intact);
        assert_eq!(field.cells()[0].repair_progress, 1.0);
        assert!(field.cells()[0].fragments.is_empty());
        assert!(!field.is_destroyed(0));
        assert_eq!(
            changes,
            vec![PhaseChange {
                index: 0,
                from: LetterPhase::Repairing,
                to: LetterPhase::Intact,
            }]
        );

        // Neighbour never moved
        assert_eq!(field.cells()[1].phase, LetterPhase::Intact);
    }

    #[test]
    fn test_late_advance_catches_up() {
        let mut field = field("A");
        strike(&mut field, 0, 0.0);
        let changes = field.advance(20_000.0);
        let phases: Vec<LetterPhase> = changes.iter().map(|c| c.to).collect();
        assert_eq!(
            phases,
            vec![
                LetterPhase::Breaking,
                LetterPhase::Fragments,
                LetterPhase::Destroyed,
                LetterPhase::Repairing,
                LetterPhase::Intact,
            ]
        );
        assert!(field.destroyed().is_empty());
        // Can be struck again once intact
        assert!(strike(&mut field, 0, 20_000.0));
    }

    proptest! {
        #[test]
        fn repair_cycle_is_bounded(seed in any::<u64>(), start in 0.0f64..1.0e6) {
            let settings = TextSettings::default();
            let mut field = LetterField::new("X", None, &settings);
            let mut rng = Pcg32::seed_from_u64(seed);
            prop_assert!(field.strike(0, start, PerformanceTier::Medium.fragment_counts(), &mut rng));

            let repair_at = field.cells()[0].repair_at();
            prop_assert!(repair_at >= start + settings.destroyed_ms as f64);
            prop_assert!(repair_at <= start + settings.repair_delay_ms.max as f64);

            let done = repair_at
                + settings.max_repair_ticks() as f64 * settings.repair_tick_ms as f64;
            let mut now = start;
            while now <= done {
                field.advance(now);
                now += 16.0;
            }
            field.advance(done);
            prop_assert_eq!(field.cells()[0].phase, LetterPhase::Intact);
            prop_assert!(field.destroyed().is_empty());
        }
    }
}
