//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod entity;
pub mod geometry;
pub mod gesture;
pub mod slice;
pub mod spawner;
pub mod state;
pub mod tick;

pub use entity::{Entity, EntityKind, Fade, FruitKind, HalfSide};
pub use geometry::{angle_of, segment_intersects_circle, segment_point_distance};
pub use gesture::{GestureTrace, PointSample};
pub use spawner::{Spawner, launch_kinematics};
pub use state::{
    BombSequence, BombStage, ComboState, GameEvent, GameOverReason, GamePhase, GameState,
    Particle, SoundCue, Viewport, MAX_PARTICLES,
};
pub use tick::{PointerEvent, TickInput, tick};
