//! Hit testing and the slice response
//!
//! Matches the gesture polyline against live entities, splits fruit into
//! halves with separation impulses, spawns juice, and keeps the combo
//! ledger. Bombs arm the game-over chain instead of scoring.

use glam::Vec2;
use rand::Rng;

use super::entity::{Entity, EntityKind, Fade, FruitKind, HalfSide};
use super::geometry::segment_intersects_circle;
use super::state::{
    BombSequence, BombStage, GameEvent, GameState, MAX_PARTICLES, Particle, SoundCue,
};
use crate::tuning::Tuning;

/// Test the gesture polyline against every live sliceable entity and apply
/// slice responses. First intersecting segment wins per entity (one slice
/// per entity per tick); other entities keep getting tested.
pub fn run(state: &mut GameState, tuning: &Tuning) {
    if !state.gesture.is_active() {
        return;
    }

    let mut hits: Vec<u32> = Vec::new();
    for e in &state.entities {
        if !e.alive || !e.kind.is_sliceable() {
            continue;
        }
        for (a, b) in state.gesture.segments() {
            if segment_intersects_circle(a, b, e.pos, e.hit_radius) {
                hits.push(e.id);
                break;
            }
        }
    }
    if hits.is_empty() {
        return;
    }

    let swipe_angle = state.gesture.swipe_angle();
    let swipe_dir = Vec2::new(swipe_angle.cos(), swipe_angle.sin());
    let swipe_start = state
        .gesture
        .samples()
        .first()
        .map_or(Vec2::ZERO, |s| s.pos);

    for id in hits {
        slice_entity(state, tuning, id, swipe_dir, swipe_start, swipe_angle);
    }
}

fn slice_entity(
    state: &mut GameState,
    tuning: &Tuning,
    id: u32,
    swipe_dir: Vec2,
    swipe_start: Vec2,
    swipe_angle: f32,
) {
    let Some(idx) = state.entities.iter().position(|e| e.id == id) else {
        return;
    };
    let entity = state.entities.remove(idx);

    match entity.kind {
        EntityKind::Bomb => bomb_hit(state, tuning),
        EntityKind::Fruit(kind) => {
            award_slice_points(state, tuning);
            spawn_halves(state, tuning, &entity, kind, swipe_dir, swipe_start);
            spawn_juice(state, tuning, entity.pos, kind, swipe_angle);
            state.push_event(GameEvent::Sound(SoundCue::Slice));
        }
        EntityKind::Half { .. } => {}
    }
}

/// A sliced bomb arms the flash → text → panel chain. The game keeps
/// running until the chain's terminal beat; a second bomb while the chain
/// is armed is destroyed silently.
fn bomb_hit(state: &mut GameState, tuning: &Tuning) {
    if state.pending_game_over.is_some() {
        return;
    }
    log::info!("Bomb sliced");
    state.pending_game_over = Some(BombSequence {
        started_ms: state.clock_ms,
        stage: BombStage::Flash,
    });
    state.push_event(GameEvent::Sound(SoundCue::Explosion));
    state.push_event(GameEvent::Flash {
        duration_ms: tuning.effects.bomb_flash_ms,
    });
}

/// Combo bookkeeping for one sliced fruit: inside the window the chain
/// grows and pays `base + floor(base * bonus_multiplier * count)`, otherwise
/// the chain restarts at 1 for base points.
fn award_slice_points(state: &mut GameState, tuning: &Tuning) {
    let now = state.clock_ms;
    let c = &tuning.combo;
    let continued = match state.combo.last_slice_ms {
        Some(t) => now - t <= c.time_window_ms,
        None => false,
    };

    let points = if continued {
        state.combo.count += 1;
        let bonus = (c.base_points as f32 * c.bonus_multiplier * state.combo.count as f32).floor();
        c.base_points + bonus as u32
    } else {
        state.combo.count = 1;
        c.base_points
    };

    state.score += points;
    state.combo.last_slice_ms = Some(now);
    state.combo.reset_deadline_ms = Some(now + c.time_window_ms);

    if state.combo.count >= c.min_combo {
        state.push_event(GameEvent::Combo {
            count: state.combo.count,
            points,
        });
    }
}

/// Split a fruit into two halves sharing the cut line. Each half is pushed
/// along the swipe perpendicular; which way depends on the side of the
/// swipe line its rotated world-space center falls on (2D cross product),
/// so the push always separates the pair.
fn spawn_halves(
    state: &mut GameState,
    tuning: &Tuning,
    parent: &Entity,
    kind: FruitKind,
    swipe_dir: Vec2,
    swipe_start: Vec2,
) {
    let perp = swipe_dir.perp();
    let quarter = parent.display_width() / 4.0;
    let offset = Vec2::from_angle(parent.rotation).rotate(Vec2::new(quarter, 0.0));

    let (lo, hi) = (tuning.world.sliced_spin_min, tuning.world.sliced_spin_max);
    let spin = if hi > lo {
        state.rng.random_range(lo..hi)
    } else {
        lo
    };
    let (dlo, dhi) = (
        tuning.effects.half_fade_delay_min_ms,
        tuning.effects.half_fade_delay_max_ms,
    );
    let fade_delay = if dhi > dlo {
        state.rng.random_range(dlo..dhi)
    } else {
        dlo
    };

    let halves = [
        (HalfSide::Left, parent.pos - offset, -spin),
        (HalfSide::Right, parent.pos + offset, spin),
    ];
    for (side, center, angular_vel) in halves {
        let side_sign = swipe_dir.perp_dot(center - swipe_start).signum();
        let id = state.next_entity_id();
        state.entities.push(Entity {
            id,
            kind: EntityKind::Half { parent: kind, side },
            pos: center,
            vel: perp * tuning.world.separation_force * side_sign,
            angular_vel,
            rotation: parent.rotation,
            scale: parent.scale,
            hit_radius: 0.0,
            gravity: tuning.world.sliced_gravity_y,
            fade: Some(Fade {
                start_ms: state.clock_ms + fade_delay,
                duration_ms: tuning.effects.half_fade_ms,
            }),
            alive: true,
        });
    }
}

/// Juice burst at the slice point, cone around the swipe direction.
fn spawn_juice(
    state: &mut GameState,
    tuning: &Tuning,
    pos: Vec2,
    kind: FruitKind,
    swipe_angle: f32,
) {
    let color = kind.juice_color();
    for _ in 0..tuning.effects.juice_particles {
        if state.particles.len() >= MAX_PARTICLES {
            break;
        }
        let angle = swipe_angle + state.rng.random_range(-0.8f32..0.8);
        let speed = state.rng.random_range(60.0f32..220.0);
        state.particles.push(Particle {
            pos,
            vel: Vec2::new(angle.cos(), angle.sin()) * speed,
            color,
            size: state.rng.random_range(2.0f32..5.0),
            life: 1.0,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{GamePhase, Viewport};
    use crate::tuning::DeviceClass;

    fn running_state(tuning: &Tuning) -> GameState {
        let mut state = GameState::new(
            3,
            Viewport {
                w: 1920.0,
                h: 1080.0,
            },
            DeviceClass::Desktop,
        );
        state.start_game(tuning);
        state.drain_events();
        state
    }

    fn push_fruit(state: &mut GameState, pos: Vec2, hit_radius: f32) -> u32 {
        let id = state.next_entity_id();
        state.entities.push(Entity {
            id,
            kind: EntityKind::Fruit(FruitKind::Watermelon),
            pos,
            vel: Vec2::ZERO,
            angular_vel: 0.0,
            rotation: 0.0,
            scale: 0.4,
            hit_radius,
            gravity: 800.0,
            fade: None,
            alive: true,
        });
        id
    }

    fn push_bomb(state: &mut GameState, pos: Vec2, hit_radius: f32) -> u32 {
        let id = state.next_entity_id();
        state.entities.push(Entity {
            id,
            kind: EntityKind::Bomb,
            pos,
            vel: Vec2::ZERO,
            angular_vel: 0.0,
            rotation: 0.0,
            scale: 0.4,
            hit_radius,
            gravity: 800.0,
            fade: None,
            alive: true,
        });
        id
    }

    fn swipe(state: &mut GameState, tuning: &Tuning, from: Vec2, to: Vec2) {
        let now = state.clock_ms;
        state.gesture.pointer_down(from, now, &tuning.gesture);
        state.gesture.pointer_move(to, now + 8.0, &tuning.gesture);
    }

    #[test]
    fn test_vertical_swipe_separates_halves_horizontally() {
        let tuning = Tuning::default();
        let mut state = running_state(&tuning);
        push_fruit(&mut state, Vec2::new(500.0, 500.0), 40.0);

        swipe(
            &mut state,
            &tuning,
            Vec2::new(500.0, 400.0),
            Vec2::new(500.0, 600.0),
        );
        run(&mut state, &tuning);

        assert_eq!(state.entities.len(), 2);
        let left = state
            .entities
            .iter()
            .find(|e| matches!(e.kind, EntityKind::Half { side: HalfSide::Left, .. }))
            .unwrap();
        let right = state
            .entities
            .iter()
            .find(|e| matches!(e.kind, EntityKind::Half { side: HalfSide::Right, .. }))
            .unwrap();

        // Left half sits left of the cut and gets pushed further left
        assert!(left.pos.x < 500.0 && right.pos.x > 500.0);
        assert!(left.vel.x < 0.0 && right.vel.x > 0.0);
        assert!((left.vel.x.abs() - tuning.world.separation_force).abs() < 1e-3);

        // Opposite spins, heavier gravity, fade armed
        assert!(left.angular_vel * right.angular_vel < 0.0);
        assert_eq!(left.gravity, tuning.world.sliced_gravity_y);
        let fade = left.fade.unwrap();
        let delay = fade.start_ms - state.clock_ms;
        assert!(delay >= tuning.effects.half_fade_delay_min_ms);
        assert!(delay <= tuning.effects.half_fade_delay_max_ms);

        assert_eq!(state.score, tuning.combo.base_points);
        assert_eq!(state.misses, 0);
        assert_eq!(
            state.particles.len(),
            tuning.effects.juice_particles as usize
        );
        let events = state.drain_events();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, GameEvent::Sound(SoundCue::Slice)))
        );
    }

    #[test]
    fn test_hit_radius_is_tighter_than_the_body() {
        let tuning = Tuning::default();
        let mut state = running_state(&tuning);
        push_fruit(&mut state, Vec2::new(500.0, 500.0), 35.0);

        // Graze 40px above the center: inside the visual body, outside hits
        swipe(
            &mut state,
            &tuning,
            Vec2::new(400.0, 460.0),
            Vec2::new(600.0, 460.0),
        );
        run(&mut state, &tuning);
        assert_eq!(state.entities.len(), 1);
        assert_eq!(state.score, 0);

        // A deeper pass slices
        swipe(
            &mut state,
            &tuning,
            Vec2::new(400.0, 470.0),
            Vec2::new(600.0, 470.0),
        );
        run(&mut state, &tuning);
        assert_eq!(state.score, 1);
    }

    #[test]
    fn test_one_slice_per_entity_even_when_two_segments_cross() {
        let tuning = Tuning::default();
        let mut state = running_state(&tuning);
        push_fruit(&mut state, Vec2::new(500.0, 500.0), 40.0);

        // Three samples, both segments pass through the circle
        let now = state.clock_ms;
        state
            .gesture
            .pointer_down(Vec2::new(400.0, 500.0), now, &tuning.gesture);
        state
            .gesture
            .pointer_move(Vec2::new(500.0, 490.0), now + 5.0, &tuning.gesture);
        state
            .gesture
            .pointer_move(Vec2::new(600.0, 500.0), now + 10.0, &tuning.gesture);
        run(&mut state, &tuning);

        assert_eq!(state.score, 1);
        assert_eq!(state.entities.len(), 2); // exactly one pair of halves
    }

    #[test]
    fn test_halves_are_never_resliced() {
        let tuning = Tuning::default();
        let mut state = running_state(&tuning);
        push_fruit(&mut state, Vec2::new(500.0, 500.0), 40.0);

        swipe(
            &mut state,
            &tuning,
            Vec2::new(400.0, 500.0),
            Vec2::new(600.0, 500.0),
        );
        run(&mut state, &tuning);
        assert_eq!(state.entities.len(), 2);

        // Fresh swipe straight through where the halves are
        state.clock_ms += 500.0;
        swipe(
            &mut state,
            &tuning,
            Vec2::new(400.0, 500.0),
            Vec2::new(600.0, 500.0),
        );
        run(&mut state, &tuning);
        assert_eq!(state.entities.len(), 2);
        assert_eq!(state.score, 1);
    }

    #[test]
    fn test_bomb_hit_arms_the_chain_without_scoring() {
        let tuning = Tuning::default();
        let mut state = running_state(&tuning);
        push_bomb(&mut state, Vec2::new(500.0, 500.0), 40.0);

        swipe(
            &mut state,
            &tuning,
            Vec2::new(400.0, 500.0),
            Vec2::new(600.0, 500.0),
        );
        run(&mut state, &tuning);

        assert_eq!(state.score, 0);
        assert_eq!(state.combo.count, 0);
        assert!(state.entities.is_empty());
        assert_eq!(state.phase, GamePhase::Running);
        let seq = state.pending_game_over.unwrap();
        assert_eq!(seq.stage, BombStage::Flash);

        let events = state.drain_events();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, GameEvent::Sound(SoundCue::Explosion)))
        );
        assert!(events.iter().any(|e| matches!(e, GameEvent::Flash { .. })));
    }

    #[test]
    fn test_second_bomb_does_not_rearm_the_chain() {
        let tuning = Tuning::default();
        let mut state = running_state(&tuning);
        push_bomb(&mut state, Vec2::new(500.0, 500.0), 40.0);
        swipe(
            &mut state,
            &tuning,
            Vec2::new(400.0, 500.0),
            Vec2::new(600.0, 500.0),
        );
        run(&mut state, &tuning);
        let started = state.pending_game_over.unwrap().started_ms;
        state.drain_events();

        state.clock_ms += 50.0;
        push_bomb(&mut state, Vec2::new(700.0, 500.0), 40.0);
        swipe(
            &mut state,
            &tuning,
            Vec2::new(600.0, 500.0),
            Vec2::new(800.0, 500.0),
        );
        run(&mut state, &tuning);

        assert!(state.entities.is_empty()); // still destroyed
        assert_eq!(state.pending_game_over.unwrap().started_ms, started);
        let events = state.drain_events();
        assert!(!events.iter().any(|e| matches!(e, GameEvent::Flash { .. })));
    }

    #[test]
    fn test_combo_window_scenario() {
        let tuning = Tuning::default();
        let mut state = running_state(&tuning);

        state.clock_ms = 0.0;
        award_slice_points(&mut state, &tuning);
        assert_eq!(state.combo.count, 1);
        assert_eq!(state.score, 1);

        state.clock_ms = 100.0;
        award_slice_points(&mut state, &tuning);
        assert_eq!(state.combo.count, 2);
        assert_eq!(state.score, 3); // + 1 + floor(1 * 0.5 * 2) = 2

        state.clock_ms = 250.0;
        award_slice_points(&mut state, &tuning);
        assert_eq!(state.combo.count, 3);
        assert_eq!(state.score, 5); // gap 150 <= 200 keeps the chain

        state.clock_ms = 700.0;
        award_slice_points(&mut state, &tuning);
        assert_eq!(state.combo.count, 1); // gap 450 > 200 resets
        assert_eq!(state.score, 6);
    }

    #[test]
    fn test_combo_count_monotone_inside_window() {
        let tuning = Tuning::default();
        let mut state = running_state(&tuning);

        let mut last = 0;
        for i in 0..6 {
            state.clock_ms = i as f64 * 150.0;
            award_slice_points(&mut state, &tuning);
            assert_eq!(state.combo.count, last + 1);
            last = state.combo.count;
        }
    }

    #[test]
    fn test_combo_event_waits_for_min_count() {
        let tuning = Tuning::default();
        let mut state = running_state(&tuning);

        state.clock_ms = 0.0;
        award_slice_points(&mut state, &tuning);
        assert!(
            !state
                .drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::Combo { .. }))
        );

        state.clock_ms = 100.0;
        award_slice_points(&mut state, &tuning);
        let events = state.drain_events();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, GameEvent::Combo { count: 2, points: 2 }))
        );
    }

    #[test]
    fn test_inactive_gesture_never_slices() {
        let tuning = Tuning::default();
        let mut state = running_state(&tuning);
        push_fruit(&mut state, Vec2::new(500.0, 500.0), 40.0);

        // Tracking but only one sample: no segment to test
        state
            .gesture
            .pointer_down(Vec2::new(500.0, 500.0), 0.0, &tuning.gesture);
        run(&mut state, &tuning);
        assert_eq!(state.entities.len(), 1);

        // Released gesture: the lingering sample is not an active swipe
        state
            .gesture
            .pointer_move(Vec2::new(600.0, 500.0), 8.0, &tuning.gesture);
        state.gesture.pointer_up(16.0, &tuning.gesture);
        run(&mut state, &tuning);
        assert_eq!(state.entities.len(), 1);
    }
}
