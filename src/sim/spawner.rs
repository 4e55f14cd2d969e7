//! Spawn policy: when and where fruit enters play
//!
//! [`Spawner`] is pure timing state; [`run`] applies it to the session each
//! tick. Multi-fruit bursts queue members with staggered deadlines instead
//! of real timers, so the policy steps under a virtual clock.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::entity::{Entity, EntityKind, FruitKind};
use super::state::{GameEvent, GamePhase, GameState, SoundCue, Viewport};
use crate::tuning::{DeviceClass, Tuning};

/// One queued burst member waiting out its stagger delay
#[derive(Debug, Clone, Copy, Serialize)]
struct PendingSpawn {
    kind: FruitKind,
    x: f32,
    due_ms: f64,
}

/// Spawn timing state
#[derive(Debug, Clone, Default, Serialize)]
pub struct Spawner {
    active: bool,
    next_spawn_ms: f64,
    last_multi_ms: Option<f64>,
    pending: Vec<PendingSpawn>,
}

impl Spawner {
    /// Arm the repeating spawn deadline. Idempotent.
    pub fn start(&mut self, now_ms: f64, delay_ms: f64) {
        if self.active {
            return;
        }
        self.active = true;
        self.next_spawn_ms = now_ms + delay_ms;
    }

    /// Disarm and drop queued burst members. Idempotent.
    pub fn stop(&mut self) {
        self.active = false;
        self.pending.clear();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Run the spawner for this tick: release due burst members, then fire any
/// spawn deadlines that have passed.
pub fn run(state: &mut GameState, tuning: &Tuning) {
    if !state.spawner.active || state.phase != GamePhase::Running {
        return;
    }
    let now = state.clock_ms;

    let mut due = Vec::new();
    state.spawner.pending.retain(|p| {
        if p.due_ms <= now {
            due.push(*p);
            false
        } else {
            true
        }
    });
    for p in due {
        spawn_entity(state, tuning, EntityKind::Fruit(p.kind), p.x);
    }

    let delay = tuning.spawn.delay_ms.max(1.0);
    while now >= state.spawner.next_spawn_ms {
        state.spawner.next_spawn_ms += delay;
        spawn_wave(state, tuning);
    }
}

/// One spawn deadline: burst or single.
fn spawn_wave(state: &mut GameState, tuning: &Tuning) {
    let now = state.clock_ms;
    let multi_ready = match state.spawner.last_multi_ms {
        Some(t) => now - t >= tuning.multi.cooldown_ms,
        None => true,
    };
    let roll: f64 = state.rng.random_range(0.0..1.0);

    if tuning.multi.enabled && multi_ready && roll < tuning.multi.probability {
        state.spawner.last_multi_ms = Some(now);
        queue_burst(state, tuning);
    } else {
        let kind = random_single_kind(&mut state.rng);
        let x = random_spawn_x(state, tuning);
        spawn_entity(state, tuning, kind, x);
    }
}

/// Queue a staggered burst of fruits (never bombs), evenly spread around the
/// horizontal center.
fn queue_burst(state: &mut GameState, tuning: &Tuning) {
    let m = &tuning.multi;
    let lo = m.min_fruits.min(m.max_fruits).max(1);
    let hi = m.max_fruits.max(lo);
    let count = state.rng.random_range(lo..=hi);

    let center = state.viewport.w / 2.0;
    let span = m.spread * (count - 1) as f32;
    let start_x = center - span / 2.0;

    for i in 0..count {
        let kind = FruitKind::ALL[state.rng.random_range(0..FruitKind::ALL.len())];
        let x = clamp_spawn_x(start_x + i as f32 * m.spread, state.viewport.w, tuning);
        let due_ms = state.clock_ms + i as f64 * m.stagger_ms;
        state.spawner.pending.push(PendingSpawn { kind, x, due_ms });
    }
    log::debug!("Queued burst of {count}");
}

/// Uniform over all fruit kinds plus the bomb.
fn random_single_kind(rng: &mut Pcg32) -> EntityKind {
    let i = rng.random_range(0..=FruitKind::ALL.len());
    if i < FruitKind::ALL.len() {
        EntityKind::Fruit(FruitKind::ALL[i])
    } else {
        EntityKind::Bomb
    }
}

fn clamp_spawn_x(x: f32, width: f32, tuning: &Tuning) -> f32 {
    let lo = tuning.spawn.min_x;
    let hi = (width - tuning.spawn.max_x_offset).max(lo);
    x.clamp(lo, hi)
}

fn random_spawn_x(state: &mut GameState, tuning: &Tuning) -> f32 {
    let lo = tuning.spawn.min_x;
    let hi = (state.viewport.w - tuning.spawn.max_x_offset).max(lo);
    if hi <= lo {
        lo
    } else {
        state.rng.random_range(lo..hi)
    }
}

/// Launch velocity and spin for a spawn at `x`.
///
/// Upward speed scales with viewport height, device class and difficulty.
/// Horizontal speed points toward the screen center and grows with the
/// normalized distance from it, which keeps fruit reachable on narrow
/// viewports. Spin is sampled straight from the configured range.
pub fn launch_kinematics(
    rng: &mut Pcg32,
    tuning: &Tuning,
    x: f32,
    viewport: Viewport,
    device: DeviceClass,
    elapsed_ms: f64,
) -> (Vec2, f32) {
    let f = &tuning.fruit;
    let speed_scale = tuning.velocity_scale(viewport.h)
        * tuning.device_velocity(device)
        * tuning.difficulty_multiplier(elapsed_ms);

    let (lo, hi) = if f.min_upward <= f.max_upward {
        (f.min_upward, f.max_upward)
    } else {
        (f.max_upward, f.min_upward)
    };
    let base = if hi > lo { rng.random_range(lo..hi) } else { lo };
    let upward = base * speed_scale;

    let half_w = viewport.w / 2.0;
    let dist = x - half_w;
    let normalized = if half_w > 0.0 {
        (dist.abs() / half_w).min(1.0)
    } else {
        0.0
    };
    let h_mag = upward.abs() * f.horizontal_speed_multiplier * normalized;
    // Signed toward center
    let h_vel = if dist > 0.0 {
        -h_mag
    } else if dist < 0.0 {
        h_mag
    } else {
        0.0
    };

    let spin_max = f.max_angular_velocity.abs();
    let spin = if spin_max > 0.0 {
        rng.random_range(-spin_max..spin_max)
    } else {
        0.0
    };

    (Vec2::new(h_vel, upward), spin)
}

/// Create one entity at the bottom edge and launch it.
pub fn spawn_entity(state: &mut GameState, tuning: &Tuning, kind: EntityKind, x: f32) {
    let elapsed = state.elapsed_ms();
    let viewport = state.viewport;
    let device = state.device;
    let (vel, angular_vel) =
        launch_kinematics(&mut state.rng, tuning, x, viewport, device, elapsed);
    let scale = tuning.scale_factor(viewport.h, device);
    let hit_radius = kind.base_diameter() * scale * tuning.fruit.hit_radius_frac;

    let id = state.next_entity_id();
    state.entities.push(Entity {
        id,
        kind,
        pos: Vec2::new(x, viewport.h),
        vel,
        angular_vel,
        rotation: 0.0,
        scale,
        hit_radius,
        gravity: tuning.world.gravity_y,
        fade: None,
        alive: true,
    });
    state.push_event(GameEvent::Sound(SoundCue::Throw));
    log::debug!("Spawned {kind:?} at x={x:.0}");
}
