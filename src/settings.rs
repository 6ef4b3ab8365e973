//! Performance tiers and effect settings
//!
//! The tier is classified once from device signals when an effect mounts and
//! is handed to each engine's constructor. Everything that scales with the
//! tier is a static lookup on [`PerformanceTier`].

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;
use crate::rand_between;

/// Network Information API `effectiveType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectiveType {
    Slow2g,
    TwoG,
    ThreeG,
    FourG,
}

impl EffectiveType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "slow-2g" => Some(EffectiveType::Slow2g),
            "2g" => Some(EffectiveType::TwoG),
            "3g" => Some(EffectiveType::ThreeG),
            "4g" => Some(EffectiveType::FourG),
            _ => None,
        }
    }

    pub fn is_slow(&self) -> bool {
        matches!(self, EffectiveType::Slow2g | EffectiveType::TwoG)
    }
}

/// Environment signals read once from the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceSignals {
    /// Viewport width in CSS pixels
    pub viewport_width: f32,
    pub device_pixel_ratio: f32,
    /// Logical processor count, if the host reports one
    pub hardware_concurrency: Option<u32>,
    pub effective_type: Option<EffectiveType>,
}

impl DeviceSignals {
    pub fn new(viewport_width: f32, device_pixel_ratio: f32, cores: u32) -> Self {
        Self {
            viewport_width,
            device_pixel_ratio,
            hardware_concurrency: Some(cores),
            effective_type: None,
        }
    }

    pub fn with_effective_type(mut self, effective_type: EffectiveType) -> Self {
        self.effective_type = Some(effective_type);
        self
    }

    pub fn is_mobile(&self) -> bool {
        self.viewport_width < MOBILE_MAX_WIDTH
    }

    pub fn is_low_end(&self) -> bool {
        self.device_pixel_ratio < LOW_END_PIXEL_RATIO
            || self.hardware_concurrency.is_some_and(|c| c < LOW_END_CORES)
    }

    pub fn is_slow_network(&self) -> bool {
        self.effective_type.is_some_and(|t| t.is_slow())
    }
}

/// Kinds of decorative animation a page may choose to skip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationKind {
    Complex,
    Particle,
    Trail,
    Float,
}

/// What the particle field may spend on one device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldBudget {
    pub tier: PerformanceTier,
    pub particles: usize,
    /// Draw connection lines between nearby particles
    pub links: bool,
    /// Radial gradients instead of flat circles
    pub gradient: bool,
    /// Simulate one frame out of every `frame_skip`
    pub frame_skip: u64,
}

impl FieldBudget {
    /// Budget for a device; mobile viewports always get the reduced field
    pub fn for_device(signals: &DeviceSignals) -> Self {
        PerformanceTier::classify(signals).field_budget(signals.is_mobile())
    }
}

impl From<PerformanceTier> for FieldBudget {
    fn from(tier: PerformanceTier) -> Self {
        tier.field_budget(false)
    }
}

/// Fragment burst sizes emitted on impact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentCounts {
    pub character: usize,
    pub spark: usize,
    pub smoke: usize,
}

impl FragmentCounts {
    pub fn total(&self) -> usize {
        self.character + self.spark + self.smoke
    }
}

/// Coarse device capability class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PerformanceTier {
    Low,
    Medium,
    #[default]
    High,
}

impl PerformanceTier {
    /// Classify a device. Pure: identical signals give the identical tier.
    pub fn classify(signals: &DeviceSignals) -> Self {
        let mobile = signals.is_mobile();
        let low_end = signals.is_low_end();

        if mobile && (low_end || signals.is_slow_network()) {
            PerformanceTier::Low
        } else if mobile || low_end {
            PerformanceTier::Medium
        } else {
            PerformanceTier::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceTier::Low => "Low",
            PerformanceTier::Medium => "Medium",
            PerformanceTier::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(PerformanceTier::Low),
            "medium" | "med" => Some(PerformanceTier::Medium),
            "high" => Some(PerformanceTier::High),
            _ => None,
        }
    }

    /// Ambient particle field population
    pub fn particle_count(&self) -> usize {
        match self {
            PerformanceTier::Low => PARTICLES_LOW,
            PerformanceTier::Medium => PARTICLES_MEDIUM,
            PerformanceTier::High => PARTICLES_HIGH,
        }
    }

    /// Whether the particle field draws connection lines
    pub fn links_enabled(&self) -> bool {
        matches!(self, PerformanceTier::High)
    }

    /// Whether particles are drawn as radial gradients (flat circles otherwise)
    pub fn gradient_enabled(&self) -> bool {
        !matches!(self, PerformanceTier::Low)
    }

    /// Simulate one frame out of every `frame_skip`
    pub fn frame_skip(&self) -> u64 {
        match self {
            PerformanceTier::Low => 2,
            PerformanceTier::Medium | PerformanceTier::High => 1,
        }
    }

    pub fn fragment_counts(&self) -> FragmentCounts {
        match self {
            PerformanceTier::Low => FragmentCounts {
                character: 2,
                spark: 5,
                smoke: 2,
            },
            PerformanceTier::Medium => FragmentCounts {
                character: 4,
                spark: 10,
                smoke: 4,
            },
            PerformanceTier::High => FragmentCounts {
                character: 4,
                spark: 15,
                smoke: 8,
            },
        }
    }

    /// Default transition duration for animated page elements (seconds)
    pub fn transition_secs(&self) -> f32 {
        match self {
            PerformanceTier::Low => 0.3,
            PerformanceTier::Medium => 0.5,
            PerformanceTier::High => 0.8,
        }
    }

    /// Particle field budget. Mobile viewports keep a small population and
    /// flat circles even when the device is otherwise capable.
    pub fn field_budget(&self, mobile: bool) -> FieldBudget {
        let particles = match (self, mobile) {
            (PerformanceTier::Low, _) => PARTICLES_LOW,
            (_, true) => PARTICLES_MOBILE,
            _ => self.particle_count(),
        };
        FieldBudget {
            tier: *self,
            particles,
            links: self.links_enabled() && !mobile,
            gradient: self.gradient_enabled() && !mobile,
            frame_skip: self.frame_skip(),
        }
    }

    /// Whether an animation of this kind should be skipped on this tier
    pub fn skips(&self, kind: AnimationKind) -> bool {
        match self {
            PerformanceTier::Low => true,
            PerformanceTier::Medium => {
                matches!(kind, AnimationKind::Particle | AnimationKind::Trail)
            }
            PerformanceTier::High => false,
        }
    }
}

/// Closed span of values sampled uniformly
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f32,
    pub max: f32,
}

impl Band {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        rand_between(rng, self.min, self.max)
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::InvalidRange {
                field,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

/// Asteroid-targeted text tunables (times in ms, distances in px)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSettings {
    /// Ceiling on live asteroids
    pub asteroid_count: usize,
    /// Delay between spawn checks
    pub spawn_interval_ms: Band,
    /// Vertical spawn position (above the container)
    pub spawn_y: f32,
    /// Pixels per frame
    pub speed: Band,
    pub size: Band,
    /// Trail points kept per asteroid
    pub trail_len: usize,
    /// Degrees of spin per frame
    pub spin: f32,
    pub collision_radius: f32,

    // === Destruction phases, measured from impact ===
    pub impact_ms: f32,
    pub breaking_ms: f32,
    pub destroyed_ms: f32,
    pub repair_delay_ms: Band,

    // === Repair ===
    pub repair_seed: f32,
    pub repair_step: f32,
    pub repair_tick_ms: f32,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            asteroid_count: 3,
            spawn_interval_ms: Band::new(3000.0, 7000.0),
            spawn_y: -50.0,
            speed: Band::new(2.0, 5.0),
            size: Band::new(8.0, 20.0),
            trail_len: 8,
            spin: 5.0,
            collision_radius: 30.0,

            impact_ms: 100.0,
            breaking_ms: 300.0,
            destroyed_ms: 1000.0,
            repair_delay_ms: Band::new(4000.0, 6000.0),

            repair_seed: 0.1,
            repair_step: 0.1,
            repair_tick_ms: 100.0,
        }
    }
}

impl TextSettings {
    pub fn with_asteroid_count(mut self, count: usize) -> Self {
        self.asteroid_count = count;
        self
    }

    /// Upper bound on repair ticks from `repair_seed` to 1.0
    pub fn max_repair_ticks(&self) -> u32 {
        ((1.0 - self.repair_seed).max(0.0) / self.repair_step).ceil() as u32
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.spawn_interval_ms.validate("text.spawn_interval_ms")?;
        self.speed.validate("text.speed")?;
        self.size.validate("text.size")?;
        self.repair_delay_ms.validate("text.repair_delay_ms")?;
        positive("text.collision_radius", self.collision_radius)?;
        positive("text.repair_step", self.repair_step)?;
        positive("text.repair_tick_ms", self.repair_tick_ms)?;
        positive("text.speed.min", self.speed.min)?;
        Band::new(self.impact_ms, self.breaking_ms).validate("text.impact_ms..breaking_ms")?;
        Band::new(self.breaking_ms, self.destroyed_ms)
            .validate("text.breaking_ms..destroyed_ms")?;
        Band::new(0.0, self.repair_seed).validate("text.repair_seed")?;
        Ok(())
    }
}

/// Particle field tunables (distances in px, velocities per frame)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSettings {
    /// Pinhole distance used by the perspective projection
    pub near_plane: f32,
    /// Initial depth band
    pub spawn_depth: Band,
    /// Depth band for recycled particles
    pub recycle_depth: Band,
    /// Max lateral drift per axis
    pub drift: f32,
    /// Depth decrease per frame
    pub approach: Band,
    pub size: Band,
    pub opacity: Band,
    pub pulse_rate: f32,
    /// Margin outside the viewport before a particle is recycled
    pub padding: f32,

    // === Connection lines ===
    pub link_distance: f32,
    /// Both ends must be nearer than this depth
    pub link_depth: f32,
    /// Only every `link_stride`-th particle starts links
    pub link_stride: usize,
    /// Number of following particles checked per start
    pub link_window: usize,
    pub link_alpha: f32,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            near_plane: 800.0,
            spawn_depth: Band::new(200.0, 1000.0),
            recycle_depth: Band::new(800.0, 1000.0),
            drift: 0.15,
            approach: Band::new(0.5, 2.0),
            size: Band::new(1.0, 3.0),
            opacity: Band::new(0.4, 1.0),
            pulse_rate: 0.02,
            padding: 50.0,

            link_distance: 100.0,
            link_depth: 400.0,
            link_stride: 4,
            link_window: 2,
            link_alpha: 0.2,
        }
    }
}

impl FieldSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("field.near_plane", self.near_plane)?;
        self.spawn_depth.validate("field.spawn_depth")?;
        self.recycle_depth.validate("field.recycle_depth")?;
        self.approach.validate("field.approach")?;
        self.size.validate("field.size")?;
        self.opacity.validate("field.opacity")?;
        positive("field.spawn_depth.min", self.spawn_depth.min)?;
        positive("field.recycle_depth.min", self.recycle_depth.min)?;
        positive("field.approach.min", self.approach.min)?;
        positive("field.link_distance", self.link_distance)?;
        positive("field.link_stride", self.link_stride as f32)?;
        Ok(())
    }
}

/// Effect settings for a page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub text: TextSettings,
    pub field: FieldSettings,
}

impl Settings {
    /// Parse and validate settings; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.text.validate()?;
        self.field.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_small_low_density_dual_core_is_low() {
        let signals = DeviceSignals::new(400.0, 1.0, 2);
        assert_eq!(PerformanceTier::classify(&signals), PerformanceTier::Low);
    }

    #[test]
    fn test_decision_table() {
        // Mobile, good display and cores, slow network
        let slow = DeviceSignals::new(400.0, 3.0, 8).with_effective_type(EffectiveType::TwoG);
        assert_eq!(PerformanceTier::classify(&slow), PerformanceTier::Low);

        // Mobile, capable
        let phone = DeviceSignals::new(400.0, 3.0, 8);
        assert_eq!(PerformanceTier::classify(&phone), PerformanceTier::Medium);

        // Desktop, low density
        let office = DeviceSignals::new(1920.0, 1.0, 8);
        assert_eq!(PerformanceTier::classify(&office), PerformanceTier::Medium);

        // Desktop, slow network alone is not enough
        let desk = DeviceSignals::new(1920.0, 2.0, 8).with_effective_type(EffectiveType::Slow2g);
        assert_eq!(PerformanceTier::classify(&desk), PerformanceTier::High);
    }

    #[test]
    fn test_unknown_cores_are_not_low_end() {
        let signals = DeviceSignals {
            viewport_width: 1920.0,
            device_pixel_ratio: 2.0,
            hardware_concurrency: None,
            effective_type: None,
        };
        assert_eq!(PerformanceTier::classify(&signals), PerformanceTier::High);
    }

    #[test]
    fn test_tier_lookups() {
        assert_eq!(PerformanceTier::High.particle_count(), 80);
        assert!((15..=25).contains(&PerformanceTier::Low.particle_count()));
        assert!(PerformanceTier::High.links_enabled());
        assert!(!PerformanceTier::Medium.links_enabled());
        assert!(!PerformanceTier::Low.gradient_enabled());
        assert_eq!(PerformanceTier::Low.frame_skip(), 2);
        assert_eq!(PerformanceTier::High.fragment_counts().total(), 27);
        assert!(PerformanceTier::Medium.skips(AnimationKind::Trail));
        assert!(!PerformanceTier::Medium.skips(AnimationKind::Float));
        assert!(!PerformanceTier::High.skips(AnimationKind::Complex));
        assert!(PerformanceTier::Low.transition_secs() < PerformanceTier::High.transition_secs());
    }

    #[test]
    fn test_capable_phone_gets_mobile_budget() {
        let phone = DeviceSignals::new(400.0, 3.0, 8);
        assert_eq!(PerformanceTier::classify(&phone), PerformanceTier::Medium);
        let budget = FieldBudget::for_device(&phone);
        assert!((15..=25).contains(&budget.particles));
        assert!(!budget.gradient);
        assert!(!budget.links);

        // Same tier on a desktop keeps the larger gradient field
        let office = FieldBudget::for_device(&DeviceSignals::new(1920.0, 1.0, 8));
        assert_eq!(office.particles, 40);
        assert!(office.gradient);
    }

    #[test]
    fn test_field_budget_ladder() {
        let counts: Vec<usize> = [
            DeviceSignals::new(400.0, 1.0, 2),
            DeviceSignals::new(400.0, 3.0, 8),
            DeviceSignals::new(1920.0, 1.0, 8),
            DeviceSignals::new(1920.0, 2.0, 8),
        ]
        .iter()
        .map(|s| FieldBudget::for_device(s).particles)
        .collect();
        assert_eq!(counts, vec![15, 25, 40, 80]);
    }

    #[test]
    fn test_tier_from_str() {
        assert_eq!(PerformanceTier::from_str("MED"), Some(PerformanceTier::Medium));
        assert_eq!(PerformanceTier::from_str("ultra"), None);
        assert_eq!(EffectiveType::from_str("slow-2g"), Some(EffectiveType::Slow2g));
    }

    #[test]
    fn test_settings_json_defaults_missing_fields() {
        let settings = Settings::from_json(r#"{ "text": { "asteroid_count": 1 } }"#).unwrap();
        assert_eq!(settings.text.asteroid_count, 1);
        assert_eq!(settings.text.collision_radius, 30.0);
        assert_eq!(settings.field, FieldSettings::default());
    }

    #[test]
    fn test_settings_json_rejects_inverted_range() {
        let err = Settings::from_json(r#"{ "text": { "speed": { "min": 5.0, "max": 2.0 } } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRange { field: "text.speed", .. }));
    }

    #[test]
    fn test_settings_json_rejects_garbage() {
        assert!(matches!(Settings::from_json("{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_max_repair_ticks() {
        assert_eq!(TextSettings::default().max_repair_ticks(), 9);
    }

    proptest! {
        #[test]
        fn classify_is_pure(
            width in 200.0f32..3000.0,
            ratio in 0.5f32..4.0,
            cores in 1u32..32,
        ) {
            let signals = DeviceSignals::new(width, ratio, cores);
            prop_assert_eq!(
                PerformanceTier::classify(&signals),
                PerformanceTier::classify(&signals.clone())
            );
        }

        #[test]
        fn desktop_is_never_low(
            width in 768.0f32..3000.0,
            ratio in 0.5f32..4.0,
            cores in 1u32..32,
        ) {
            let signals = DeviceSignals::new(width, ratio, cores)
                .with_effective_type(EffectiveType::Slow2g);
            prop_assert_ne!(PerformanceTier::classify(&signals), PerformanceTier::Low);
        }
    }
}
