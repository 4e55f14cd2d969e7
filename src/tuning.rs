//! Data-driven game balance
//!
//! Every gameplay constant lives in the [`Tuning`] tree. The defaults are the
//! shipped balance; a hosting page can override the whole tree with JSON via
//! [`Tuning::from_json`] without a rebuild. Components take `&Tuning` and
//! never hardcode these values.

use serde::{Deserialize, Serialize};

/// Coarse device class, decided once by the shell at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DeviceClass {
    #[default]
    Desktop,
    Mobile,
}

/// Spawner timing and placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnTuning {
    /// Milliseconds between spawner ticks
    pub delay_ms: f64,
    /// Left clamp for spawn x positions
    pub min_x: f32,
    /// Right clamp is `width - max_x_offset`
    pub max_x_offset: f32,
}

/// Multi-fruit burst policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiSpawnTuning {
    pub enabled: bool,
    /// Chance a spawner tick becomes a burst
    pub probability: f64,
    pub min_fruits: u32,
    pub max_fruits: u32,
    /// Horizontal spacing between burst positions (pixels)
    pub spread: f32,
    /// Minimum time between bursts
    pub cooldown_ms: f64,
    /// Creation delay between fruits of one burst
    pub stagger_ms: f64,
}

/// Launch kinematics and sprite scaling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FruitTuning {
    /// Upward launch speed range, negative = up (screen coordinates)
    pub min_upward: f32,
    pub max_upward: f32,
    /// Horizontal speed as a fraction of upward speed at full center offset
    pub horizontal_speed_multiplier: f32,
    /// Spin range at launch, radians/s (sampled symmetric around 0)
    pub max_angular_velocity: f32,

    // === Responsive scaling ===
    pub desktop_base_scale: f32,
    pub mobile_base_scale: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    /// Viewport height the balance was authored against
    pub reference_height: f32,
    /// Launch speed boost on small screens
    pub mobile_velocity_boost: f32,

    // === Hit testing ===
    /// Hit circle as a fraction of display width (under the visual radius)
    pub hit_radius_frac: f32,
    /// Visual body circle as a fraction of display width
    pub body_radius_frac: f32,
}

/// Ambient physics and slice response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldTuning {
    /// Gravity on live fruit/bombs, pixels/s²
    pub gravity_y: f32,
    /// Stronger gravity on sliced halves
    pub sliced_gravity_y: f32,
    /// Speed given to each half along the swipe perpendicular
    pub separation_force: f32,
    /// Spin range for halves, radians/s (each half gets an opposite sign)
    pub sliced_spin_min: f32,
    pub sliced_spin_max: f32,
    /// How far past an edge an entity must be before removal
    pub despawn_margin: f32,
}

/// Combo scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComboTuning {
    /// Max gap between slices that continues a combo
    pub time_window_ms: f64,
    /// Smallest combo count worth announcing
    pub min_combo: u32,
    /// Bonus per combo step: base + floor(base * bonus_multiplier * count)
    pub bonus_multiplier: f32,
    /// How long the shell shows combo text
    pub display_duration_ms: f64,
    /// Points for a plain slice
    pub base_points: u32,
}

/// Gesture sampling windows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureTuning {
    /// Rolling sample window while tracking
    pub window_ms: f64,
    /// Tap-not-swipe timeout: clear if no movement arrives in time
    pub idle_timeout_ms: f64,
    /// How long the last sample lingers after pointer-up (trail fade)
    pub clear_delay_ms: f64,
    /// Speed between the last two samples that earns a whoosh, pixels/ms
    pub whoosh_speed: f32,
    /// Minimum gap between whooshes
    pub whoosh_cooldown_ms: f64,
}

/// Visual effect timings (the sim owns the clocks, the shell draws)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectsTuning {
    // === Swipe trail ===
    pub trail_base_width: f32,
    pub trail_tip_width: f32,
    pub trail_fade_ms: f64,

    // === Sliced halves ===
    pub half_fade_delay_min_ms: f64,
    pub half_fade_delay_max_ms: f64,
    pub half_fade_ms: f64,
    /// Juice particles per slice
    pub juice_particles: u32,

    // === Bomb game-over sequence ===
    pub bomb_flash_ms: f64,
    pub bomb_text_delay_ms: f64,
    pub bomb_panel_delay_ms: f64,
}

/// Difficulty ramp over a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifficultyTuning {
    pub enabled: bool,
    /// Launch-speed multiplier gained per second of play
    pub ramp_per_sec: f32,
    /// Multiplier cap
    pub max: f32,
}

/// The whole balance tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tuning {
    /// Unsliced fruit drops that end the run
    pub max_misses: u32,
    pub spawn: SpawnTuning,
    pub multi: MultiSpawnTuning,
    pub fruit: FruitTuning,
    pub world: WorldTuning,
    pub combo: ComboTuning,
    pub gesture: GestureTuning,
    pub effects: EffectsTuning,
    pub difficulty: DifficultyTuning,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            max_misses: 3,
            spawn: SpawnTuning {
                delay_ms: 1200.0,
                min_x: 50.0,
                max_x_offset: 50.0,
            },
            multi: MultiSpawnTuning {
                enabled: true,
                probability: 0.3,
                min_fruits: 2,
                max_fruits: 5,
                spread: 150.0,
                cooldown_ms: 5000.0,
                stagger_ms: 50.0,
            },
            fruit: FruitTuning {
                min_upward: -300.0,
                max_upward: -450.0,
                horizontal_speed_multiplier: 0.4,
                max_angular_velocity: 3.49, // ~200°/s
                desktop_base_scale: 0.4,
                mobile_base_scale: 0.5,
                min_scale: 0.3,
                max_scale: 0.5,
                reference_height: 1080.0,
                mobile_velocity_boost: 1.2,
                hit_radius_frac: 0.35,
                body_radius_frac: 0.45,
            },
            world: WorldTuning {
                gravity_y: 800.0,
                sliced_gravity_y: 1200.0,
                separation_force: 500.0,
                sliced_spin_min: 1.40, // ~80°/s
                sliced_spin_max: 1.57, // ~90°/s
                despawn_margin: 100.0,
            },
            combo: ComboTuning {
                time_window_ms: 200.0,
                min_combo: 2,
                bonus_multiplier: 0.5,
                display_duration_ms: 1500.0,
                base_points: 1,
            },
            gesture: GestureTuning {
                window_ms: 50.0,
                idle_timeout_ms: 200.0,
                clear_delay_ms: 200.0,
                whoosh_speed: 1.5,
                whoosh_cooldown_ms: 150.0,
            },
            effects: EffectsTuning {
                trail_base_width: 15.0,
                trail_tip_width: 1.0,
                trail_fade_ms: 200.0,
                half_fade_delay_min_ms: 1000.0,
                half_fade_delay_max_ms: 2000.0,
                half_fade_ms: 300.0,
                juice_particles: 8,
                bomb_flash_ms: 1500.0,
                bomb_text_delay_ms: 100.0,
                bomb_panel_delay_ms: 1200.0,
            },
            difficulty: DifficultyTuning {
                enabled: true,
                ramp_per_sec: 0.01,
                max: 1.5,
            },
        }
    }
}

impl Tuning {
    /// Parse a JSON override, falling back to defaults on any parse error.
    pub fn from_json(json: &str) -> Self {
        serde_json::from_str(json).unwrap_or_else(|e| {
            log::warn!("Ignoring bad tuning JSON: {e}");
            Self::default()
        })
    }

    /// Sprite scale for a viewport height, clamped and quantized to 2
    /// decimals so sprites land on stable sub-pixel sizes.
    pub fn scale_factor(&self, height: f32, device: DeviceClass) -> f32 {
        let base = match device {
            DeviceClass::Desktop => self.fruit.desktop_base_scale,
            DeviceClass::Mobile => self.fruit.mobile_base_scale,
        };
        let raw = base * height / self.fruit.reference_height;
        let clamped = raw.clamp(self.fruit.min_scale, self.fruit.max_scale);
        (clamped * 100.0).round() / 100.0
    }

    /// Launch-velocity factor for a viewport height.
    pub fn velocity_scale(&self, height: f32) -> f32 {
        height / self.fruit.reference_height
    }

    /// Launch-velocity factor for the device class.
    pub fn device_velocity(&self, device: DeviceClass) -> f32 {
        match device {
            DeviceClass::Desktop => 1.0,
            DeviceClass::Mobile => self.fruit.mobile_velocity_boost,
        }
    }

    /// Difficulty multiplier after `elapsed_ms` of play.
    pub fn difficulty_multiplier(&self, elapsed_ms: f64) -> f32 {
        if !self.difficulty.enabled {
            return 1.0;
        }
        let ramped = 1.0 + self.difficulty.ramp_per_sec * (elapsed_ms / 1000.0) as f32;
        ramped.min(self.difficulty.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_factor_reference_height() {
        let t = Tuning::default();
        assert_eq!(t.scale_factor(1080.0, DeviceClass::Desktop), 0.4);
        assert_eq!(t.scale_factor(1080.0, DeviceClass::Mobile), 0.5);
    }

    #[test]
    fn test_scale_factor_clamps() {
        let t = Tuning::default();
        // Tiny viewport clamps up to min_scale
        assert_eq!(t.scale_factor(400.0, DeviceClass::Desktop), 0.3);
        // Huge viewport clamps down to max_scale
        assert_eq!(t.scale_factor(2400.0, DeviceClass::Mobile), 0.5);
    }

    #[test]
    fn test_scale_factor_quantized_to_two_decimals() {
        let t = Tuning::default();
        // 0.4 * 912 / 1080 = 0.33777... -> 0.34
        let s = t.scale_factor(912.0, DeviceClass::Desktop);
        assert!((s - 0.34).abs() < 1e-6);
    }

    #[test]
    fn test_velocity_scale_is_linear_in_height() {
        let t = Tuning::default();
        assert_eq!(t.velocity_scale(1080.0), 1.0);
        assert_eq!(t.velocity_scale(540.0), 0.5);
    }

    #[test]
    fn test_difficulty_ramps_and_caps() {
        let t = Tuning::default();
        assert_eq!(t.difficulty_multiplier(0.0), 1.0);
        let early = t.difficulty_multiplier(10_000.0);
        assert!(early > 1.0 && early < t.difficulty.max);
        assert_eq!(t.difficulty_multiplier(3_600_000.0), t.difficulty.max);

        let mut off = Tuning::default();
        off.difficulty.enabled = false;
        assert_eq!(off.difficulty_multiplier(3_600_000.0), 1.0);
    }

    #[test]
    fn test_from_json_falls_back_on_garbage() {
        let t = Tuning::from_json("{not json");
        assert_eq!(t.spawn.delay_ms, 1200.0);
    }
}
