//! Game session state and rules transitions
//!
//! [`GameState`] is the one session object: the shell owns a single instance
//! and passes it to `tick` every frame. All timing state is sim-clock
//! deadlines, so every transition here can be driven by a virtual clock in
//! tests.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::entity::Entity;
use super::gesture::GestureTrace;
use super::spawner::Spawner;
use crate::tuning::{DeviceClass, Tuning};

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GamePhase {
    /// Start panel showing, nothing spawning
    Ready,
    /// Active gameplay
    Running,
    /// Run ended, game-over panel showing
    GameOver,
}

/// Why the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GameOverReason {
    Bomb,
    MissLimit(u32),
}

impl GameOverReason {
    pub fn describe(&self) -> String {
        match self {
            GameOverReason::Bomb => "You sliced a bomb!".to_string(),
            GameOverReason::MissLimit(n) => format!("You missed {n} fruits!"),
        }
    }
}

/// Named sound cues the shell synthesizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SoundCue {
    Throw,
    Slice,
    Whoosh,
    Explosion,
    Start,
    GameOver,
}

/// Things that happened during a tick, drained by the shell once per frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    Sound(SoundCue),
    /// Full-screen white flash (bomb hit)
    Flash { duration_ms: f64 },
    /// Bomb sequence reached the "GAME OVER" text beat
    ShowGameOverText,
    /// A combo worth announcing
    Combo { count: u32, points: u32 },
    /// A fruit fell off the bottom unsliced
    MissedFruit { misses: u32 },
    /// New best score, persist it
    BestScoreImproved { score: u32 },
    Started,
    Ended {
        reason: GameOverReason,
        score: u32,
        best: u32,
    },
}

/// Combo chain bookkeeping, mutated only by the slice engine
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComboState {
    /// Slices in the current chain (0 = no chain)
    pub count: u32,
    pub last_slice_ms: Option<f64>,
    /// Chain dies when this passes with no new slice
    pub reset_deadline_ms: Option<f64>,
}

impl ComboState {
    pub fn cancel(&mut self) {
        self.count = 0;
        self.last_slice_ms = None;
        self.reset_deadline_ms = None;
    }
}

/// Bomb game-over sequence beats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BombStage {
    /// Screen flashing, text beat not reached yet
    Flash,
    /// Text shown, waiting for the terminal beat
    GameOverText,
}

/// The flash → text → panel chain, driven by elapsed sim time
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BombSequence {
    pub started_ms: f64,
    pub stage: BombStage,
}

/// Juice burst particle (visual only)
#[derive(Debug, Clone, Copy)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub color: [u8; 3],
    pub size: f32,
    /// 1.0 at spawn, 0.0 at death; doubles as draw alpha
    pub life: f32,
}

/// Particle cap across all bursts
pub const MAX_PARTICLES: usize = 256;

/// Viewport size in CSS pixels
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Viewport {
    pub w: f32,
    pub h: f32,
}

/// Complete game session (deterministic for a given seed + input script)
#[derive(Debug, Clone, Serialize)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    #[serde(skip)]
    pub rng: Pcg32,
    /// Sim clock, milliseconds; advanced only by `tick`
    pub clock_ms: f64,
    pub phase: GamePhase,
    pub viewport: Viewport,
    pub device: DeviceClass,
    pub score: u32,
    pub best_score: u32,
    pub misses: u32,
    pub combo: ComboState,
    /// Clock value when the current run started (difficulty ramp base)
    pub started_at_ms: f64,
    /// Live entities, insertion order = id order
    pub entities: Vec<Entity>,
    #[serde(skip)]
    pub particles: Vec<Particle>,
    pub gesture: GestureTrace,
    pub spawner: Spawner,
    /// Bomb chain in progress (game still Running until it lands)
    pub pending_game_over: Option<BombSequence>,
    pub game_over_reason: Option<GameOverReason>,
    #[serde(skip)]
    pub events: Vec<GameEvent>,
    next_id: u32,
}

impl GameState {
    pub fn new(seed: u64, viewport: Viewport, device: DeviceClass) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            clock_ms: 0.0,
            phase: GamePhase::Ready,
            viewport,
            device,
            score: 0,
            best_score: 0,
            misses: 0,
            combo: ComboState::default(),
            started_at_ms: 0.0,
            entities: Vec::new(),
            particles: Vec::new(),
            gesture: GestureTrace::default(),
            spawner: Spawner::default(),
            pending_game_over: None,
            game_over_reason: None,
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Hand this tick's events to the shell
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Time into the current run
    pub fn elapsed_ms(&self) -> f64 {
        self.clock_ms - self.started_at_ms
    }

    /// Begin (or restart) a run. No-op while one is already running.
    pub fn start_game(&mut self, tuning: &Tuning) {
        if self.phase == GamePhase::Running {
            return;
        }
        log::info!("Run started (seed {})", self.seed);
        self.score = 0;
        self.misses = 0;
        self.combo = ComboState::default();
        self.entities.clear();
        self.particles.clear();
        self.gesture.clear();
        self.pending_game_over = None;
        self.game_over_reason = None;
        self.started_at_ms = self.clock_ms;
        self.phase = GamePhase::Running;
        self.spawner.start(self.clock_ms, tuning.spawn.delay_ms);
        self.push_event(GameEvent::Started);
        self.push_event(GameEvent::Sound(SoundCue::Start));
    }

    /// End the run. Idempotent: a second trigger in the same tick (bomb
    /// landing while the miss limit fires) is a silent no-op.
    pub fn end_game(&mut self, reason: GameOverReason) {
        if self.phase != GamePhase::Running {
            return;
        }
        log::info!("Game over: {} (score {})", reason.describe(), self.score);
        self.phase = GamePhase::GameOver;
        self.spawner.stop();
        self.gesture.clear();
        self.combo.cancel();
        self.pending_game_over = None;
        self.game_over_reason = Some(reason);
        if self.score > self.best_score {
            self.best_score = self.score;
            self.push_event(GameEvent::BestScoreImproved { score: self.score });
        }
        self.push_event(GameEvent::Sound(SoundCue::GameOver));
        self.push_event(GameEvent::Ended {
            reason,
            score: self.score,
            best: self.best_score,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_state() -> GameState {
        GameState::new(7, Viewport { w: 1920.0, h: 1080.0 }, DeviceClass::Desktop)
    }

    #[test]
    fn test_start_game_is_noop_while_running() {
        let tuning = Tuning::default();
        let mut state = ready_state();
        state.start_game(&tuning);
        state.score = 5;
        state.start_game(&tuning);
        assert_eq!(state.score, 5);
        assert_eq!(state.phase, GamePhase::Running);
    }

    #[test]
    fn test_end_game_is_idempotent_and_persists_best_once() {
        let tuning = Tuning::default();
        let mut state = ready_state();
        state.start_game(&tuning);
        state.drain_events();
        state.score = 10;

        state.end_game(GameOverReason::Bomb);
        state.end_game(GameOverReason::MissLimit(3));

        assert_eq!(state.phase, GamePhase::GameOver);
        assert_eq!(state.game_over_reason, Some(GameOverReason::Bomb));
        assert_eq!(state.best_score, 10);

        let events = state.drain_events();
        let improvements = events
            .iter()
            .filter(|e| matches!(e, GameEvent::BestScoreImproved { .. }))
            .count();
        let endings = events
            .iter()
            .filter(|e| matches!(e, GameEvent::Ended { .. }))
            .count();
        assert_eq!(improvements, 1);
        assert_eq!(endings, 1);
    }

    #[test]
    fn test_end_game_keeps_higher_best() {
        let tuning = Tuning::default();
        let mut state = ready_state();
        state.start_game(&tuning);
        state.drain_events();
        state.score = 3;
        state.best_score = 10;

        state.end_game(GameOverReason::MissLimit(3));

        assert_eq!(state.best_score, 10);
        let events = state.drain_events();
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, GameEvent::BestScoreImproved { .. }))
        );
    }

    #[test]
    fn test_restart_resets_the_run() {
        let tuning = Tuning::default();
        let mut state = ready_state();
        state.start_game(&tuning);
        state.score = 4;
        state.misses = 2;
        state.end_game(GameOverReason::Bomb);

        state.start_game(&tuning);
        assert_eq!(state.phase, GamePhase::Running);
        assert_eq!(state.score, 0);
        assert_eq!(state.misses, 0);
        assert!(state.spawner.is_active());
        assert!(state.game_over_reason.is_none());
    }

    #[test]
    fn test_reason_text() {
        assert_eq!(
            GameOverReason::MissLimit(3).describe(),
            "You missed 3 fruits!"
        );
        assert!(GameOverReason::Bomb.describe().contains("bomb"));
    }
}
