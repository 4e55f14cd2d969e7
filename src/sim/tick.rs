//! Fixed timestep simulation tick
//!
//! One call = one logical frame: advance the clock, apply pointer input,
//! run the spawner, integrate motion, sweep off-screen entities, hit-test
//! the gesture, then expire deadlines (combo, bomb chain, fades). The
//! ordering is part of the contract; miss accounting and fading depend on
//! it.

use glam::Vec2;

use super::entity::EntityKind;
use super::state::{BombStage, GameEvent, GameOverReason, GamePhase, GameState, SoundCue};
use super::{slice, spawner};
use crate::normalize_angle;
use crate::tuning::Tuning;

/// A pointer event stamped with the sim clock by the shell
#[derive(Debug, Clone, Copy)]
pub enum PointerEvent {
    Down { pos: Vec2, t_ms: f64 },
    Move { pos: Vec2, t_ms: f64 },
    Up { t_ms: f64 },
}

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Pointer events since the last tick, oldest first
    pub pointer: Vec<PointerEvent>,
    /// Start or restart the run (start panel / retry button)
    pub start: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, tuning: &Tuning, dt: f32) {
    state.clock_ms += dt as f64 * 1000.0;
    let now = state.clock_ms;

    if input.start {
        state.start_game(tuning);
    }

    // Gesture input applies in every phase: the trail draws on the panels
    // too, slicing just has nothing to hit there.
    for ev in &input.pointer {
        match *ev {
            PointerEvent::Down { pos, t_ms } => {
                state.gesture.pointer_down(pos, t_ms, &tuning.gesture);
            }
            PointerEvent::Move { pos, t_ms } => {
                if state.gesture.pointer_move(pos, t_ms, &tuning.gesture) {
                    state.push_event(GameEvent::Sound(SoundCue::Whoosh));
                }
            }
            PointerEvent::Up { t_ms } => {
                state.gesture.pointer_up(t_ms, &tuning.gesture);
            }
        }
    }
    state.gesture.update(now);
    update_particles(state, tuning, dt);

    if state.phase != GamePhase::Running {
        // Leftover halves keep falling behind the game-over panel
        integrate_motion(state, dt);
        sweep(state, tuning);
        return;
    }

    spawner::run(state, tuning);
    integrate_motion(state, dt);
    sweep(state, tuning);
    slice::run(state, tuning);
    update_combo(state, now);
    update_bomb_sequence(state, tuning, now);
}

fn integrate_motion(state: &mut GameState, dt: f32) {
    for e in &mut state.entities {
        e.vel.y += e.gravity * dt;
        e.pos += e.vel * dt;
        e.rotation = normalize_angle(e.rotation + e.angular_vel * dt);
    }
}

/// Removal pass: fade completions, bottom exits, and (for halves) side
/// exits. A live fruit crossing the bottom while the game runs costs a
/// miss; bombs and halves never do.
fn sweep(state: &mut GameState, tuning: &Tuning) {
    let now = state.clock_ms;
    let w = state.viewport.w;
    let h = state.viewport.h;
    let margin = tuning.world.despawn_margin;
    let running = state.phase == GamePhase::Running;

    let mut missed = 0u32;
    state.entities.retain(|e| {
        if let Some(fade) = e.fade {
            if fade.finished(now) {
                return false;
            }
        }
        let below = e.pos.y > h + margin;
        if let EntityKind::Half { .. } = e.kind {
            return !below && e.pos.x > -margin && e.pos.x < w + margin;
        }
        if below && e.kind.counts_as_miss() {
            missed += 1;
        }
        !below
    });

    if missed > 0 && running {
        for _ in 0..missed {
            state.misses += 1;
            log::info!("Missed fruit ({}/{})", state.misses, tuning.max_misses);
            state.push_event(GameEvent::MissedFruit {
                misses: state.misses,
            });
        }
        if state.misses >= tuning.max_misses {
            state.end_game(GameOverReason::MissLimit(state.misses));
        }
    }
}

fn update_combo(state: &mut GameState, now: f64) {
    if let Some(deadline) = state.combo.reset_deadline_ms {
        if now >= deadline {
            state.combo.count = 0;
            state.combo.reset_deadline_ms = None;
        }
    }
}

/// Advance the bomb chain: text beat, then the terminal beat that actually
/// ends the run.
fn update_bomb_sequence(state: &mut GameState, tuning: &Tuning, now: f64) {
    let Some(mut seq) = state.pending_game_over else {
        return;
    };
    let elapsed = now - seq.started_ms;

    if seq.stage == BombStage::Flash && elapsed >= tuning.effects.bomb_text_delay_ms {
        seq.stage = BombStage::GameOverText;
        state.push_event(GameEvent::ShowGameOverText);
    }
    if elapsed >= tuning.effects.bomb_panel_delay_ms {
        state.end_game(GameOverReason::Bomb);
        return;
    }
    state.pending_game_over = Some(seq);
}

fn update_particles(state: &mut GameState, tuning: &Tuning, dt: f32) {
    for p in &mut state.particles {
        p.vel.y += tuning.world.gravity_y * dt;
        p.pos += p.vel * dt;
        p.life -= dt * 2.5;
    }
    state.particles.retain(|p| p.life > 0.0);
}
