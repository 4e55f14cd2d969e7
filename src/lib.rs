//! Fruit Slash - a swipe-to-slice arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (gestures, spawning, slicing, game rules)
//! - `tuning`: Data-driven game balance and responsive scaling
//! - `audio`: Procedural Web Audio sound cues
//! - `best_score`: Best score persisted in LocalStorage

pub mod audio;
pub mod best_score;
pub mod sim;
pub mod tuning;

pub use best_score::BestScore;
pub use tuning::{DeviceClass, Tuning};

/// Frame loop constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz keeps swipe sampling tight)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
}

/// Normalize angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}
