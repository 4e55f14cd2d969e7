//! Entities: fruit, bombs, and sliced halves
//!
//! Kinds are tagged enums with lookup tables, so nothing downstream branches
//! on asset names.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Fruit variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FruitKind {
    Watermelon,
    Apple,
    Peach,
    Pear,
}

impl FruitKind {
    pub const ALL: [FruitKind; 4] = [
        FruitKind::Watermelon,
        FruitKind::Apple,
        FruitKind::Peach,
        FruitKind::Pear,
    ];

    /// Nominal sprite diameter at scale 1.0, pixels
    pub fn base_diameter(self) -> f32 {
        match self {
            FruitKind::Watermelon => 320.0,
            FruitKind::Apple => 190.0,
            FruitKind::Peach => 200.0,
            FruitKind::Pear => 210.0,
        }
    }

    /// Juice splash color, RGB
    pub fn juice_color(self) -> [u8; 3] {
        match self {
            FruitKind::Watermelon => [255, 71, 87],
            FruitKind::Apple => [106, 176, 76],
            FruitKind::Peach => [255, 190, 118],
            FruitKind::Pear => [186, 220, 88],
        }
    }
}

/// Which side of the cut a half came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HalfSide {
    Left,
    Right,
}

/// What an entity is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Fruit(FruitKind),
    Bomb,
    Half { parent: FruitKind, side: HalfSide },
}

impl EntityKind {
    /// Nominal sprite diameter at scale 1.0, pixels
    pub fn base_diameter(self) -> f32 {
        match self {
            EntityKind::Fruit(kind) => kind.base_diameter(),
            EntityKind::Bomb => 220.0,
            EntityKind::Half { parent, .. } => parent.base_diameter(),
        }
    }

    /// Whether swipes can hit this entity (halves are inert)
    pub fn is_sliceable(self) -> bool {
        matches!(self, EntityKind::Fruit(_) | EntityKind::Bomb)
    }

    /// Whether falling off the bottom unsliced costs the player a miss
    pub fn counts_as_miss(self) -> bool {
        matches!(self, EntityKind::Fruit(_))
    }
}

/// Alpha fade-out schedule (sliced halves)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Fade {
    /// Sim time the fade begins
    pub start_ms: f64,
    pub duration_ms: f64,
}

impl Fade {
    /// Alpha at `now_ms`: 1.0 before the fade starts, 0.0 once it completes.
    pub fn alpha(&self, now_ms: f64) -> f32 {
        if now_ms <= self.start_ms {
            return 1.0;
        }
        let t = (now_ms - self.start_ms) / self.duration_ms.max(1.0);
        (1.0 - t as f32).max(0.0)
    }

    pub fn finished(&self, now_ms: f64) -> bool {
        now_ms >= self.start_ms + self.duration_ms
    }
}

/// A moving game object
#[derive(Debug, Clone, Serialize)]
pub struct Entity {
    pub id: u32,
    pub kind: EntityKind,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Radians/s
    pub angular_vel: f32,
    /// Radians
    pub rotation: f32,
    /// Sprite scale, fixed at spawn from the viewport
    pub scale: f32,
    /// Swipe hit-circle radius (smaller than the visual body)
    pub hit_radius: f32,
    /// Downward acceleration, pixels/s² (halves fall harder)
    pub gravity: f32,
    /// Fade-out schedule, halves only
    pub fade: Option<Fade>,
    pub alive: bool,
}

impl Entity {
    /// On-screen sprite width, pixels
    pub fn display_width(&self) -> f32 {
        self.kind.base_diameter() * self.scale
    }

    pub fn alpha(&self, now_ms: f64) -> f32 {
        self.fade.map_or(1.0, |f| f.alpha(now_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watermelon_is_the_biggest_fruit() {
        for kind in FruitKind::ALL {
            assert!(kind.base_diameter() <= FruitKind::Watermelon.base_diameter());
            assert!(kind.base_diameter() > 0.0);
        }
    }

    #[test]
    fn test_only_fruit_counts_as_miss() {
        assert!(EntityKind::Fruit(FruitKind::Apple).counts_as_miss());
        assert!(!EntityKind::Bomb.counts_as_miss());
        assert!(
            !EntityKind::Half {
                parent: FruitKind::Apple,
                side: HalfSide::Left
            }
            .counts_as_miss()
        );
    }

    #[test]
    fn test_halves_are_not_sliceable() {
        assert!(EntityKind::Fruit(FruitKind::Pear).is_sliceable());
        assert!(EntityKind::Bomb.is_sliceable());
        assert!(
            !EntityKind::Half {
                parent: FruitKind::Pear,
                side: HalfSide::Right
            }
            .is_sliceable()
        );
    }

    #[test]
    fn test_fade_alpha_schedule() {
        let fade = Fade {
            start_ms: 1000.0,
            duration_ms: 300.0,
        };
        assert_eq!(fade.alpha(0.0), 1.0);
        assert_eq!(fade.alpha(1000.0), 1.0);
        assert!((fade.alpha(1150.0) - 0.5).abs() < 1e-6);
        assert_eq!(fade.alpha(1300.0), 0.0);
        assert!(fade.finished(1300.0));
        assert!(!fade.finished(1299.0));
    }
}
