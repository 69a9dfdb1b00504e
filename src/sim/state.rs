//! Session state and core simulation types
//!
//! Everything needed to snapshot or replay a session deterministically lives
//! here. Transition logic is in `session`.

use glam::Vec2;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::Aabb;
use super::difficulty;
use super::field::EntityField;
use super::powerups::{PowerKind, PowerUpBank};
use super::schedule::{TimerHandle, TimerQueue};
use super::spawn::SpawnPlan;
use crate::consts::*;
use crate::problem::Problem;

/// Top-level scene phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Title screen, waiting for the start command
    Menu,
    /// Active session
    Playing,
    /// Session ended, waiting for the play-again command
    GameOver,
}

/// Where the current round is in its lifecycle (meaningful while Playing)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Problem requested, nothing falling yet; catches and misses are ignored
    AwaitingProblem,
    /// Spawn timer still has planned blocks to drop
    Spawning,
    /// Whole answer set is in the air; waiting for the field to empty
    Resolving,
}

/// A falling answer block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerEntity {
    pub id: u32,
    pub value: i32,
    pub is_correct: bool,
    /// Center position
    pub pos: Vec2,
    pub vel_y: f32,
}

impl AnswerEntity {
    pub fn new(id: u32, value: i32, is_correct: bool, x: f32) -> Self {
        Self {
            id,
            value,
            is_correct,
            pos: Vec2::new(x, SPAWN_Y),
            vel_y: 0.0,
        }
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_center(self.pos, Vec2::new(BLOCK_WIDTH / 2.0, BLOCK_HEIGHT / 2.0))
    }
}

/// The player's bucket. Pointer x maps straight to the bucket center,
/// clamped so it never leaves the field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catcher {
    pub x: f32,
}

impl Default for Catcher {
    fn default() -> Self {
        Self {
            x: FIELD_WIDTH / 2.0,
        }
    }
}

impl Catcher {
    pub fn move_to(&mut self, target_x: f32) {
        let half = CATCHER_WIDTH / 2.0;
        self.x = target_x.clamp(half, FIELD_WIDTH - half);
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_center(
            Vec2::new(self.x, CATCHER_Y),
            Vec2::new(CATCHER_WIDTH / 2.0, CATCHER_HEIGHT / 2.0),
        )
    }
}

/// Session-to-shell notifications, drained once per frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    ScoreChanged { score: u32 },
    LivesChanged { lives: u8 },
    LevelChanged { level: u32 },
    QuestionChanged { text: String },
    /// The session wants a problem for `level`; the answer must echo `serial`
    ProblemRequested { level: u32, serial: u64 },
    PowerUsed { power: PowerKind },
    PowersRefreshed,
    /// Shield activation acknowledged (it stays armed until a mistake)
    ShieldArmed,
    /// A life was lost (drives the red flash)
    MistakePenalized,
    SessionEnded { score: u32 },
}

/// Sound cues, drained alongside events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    Correct,
    Incorrect,
    LevelUp,
    GameOver,
}

/// RNG state wrapper for serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    /// Fresh generator on the next stream. Each consumer (round shuffle,
    /// local generation) gets its own stream, so snapshots replay exactly.
    pub fn next_rng(&mut self) -> Pcg32 {
        self.stream = self.stream.wrapping_add(1);
        Pcg32::new(self.seed, self.stream)
    }
}

/// Complete session state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng_state: RngState,
    pub phase: GamePhase,
    /// Round sub-cycle, only meaningful while `phase == Playing`
    pub round: RoundPhase,
    /// Bumped on every problem request; stale responses are dropped
    pub round_serial: u64,
    pub score: u32,
    pub lives: u8,
    pub level: u32,
    /// Gravity for the current level before any slowdown
    pub nominal_gravity: f32,
    /// Effective gravity applied to falling blocks
    pub gravity: f32,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Problem currently on screen
    pub problem: Option<Problem>,
    /// Blocks not yet dropped this round
    pub plan: SpawnPlan,
    /// Blocks currently falling
    pub field: EntityField,
    pub catcher: Catcher,
    pub powers: PowerUpBank,
    pub timers: TimerQueue,
    /// Handles for cancellation on reset
    pub spawn_timer: Option<TimerHandle>,
    pub advance_timer: Option<TimerHandle>,
    pub slowdown_timer: Option<TimerHandle>,
    /// Level-up banner fade countdown
    pub banner_ticks: u32,
    /// Red mistake flash countdown
    pub flash_ticks: u32,
    /// Events for the shell, drained each frame
    #[serde(skip)]
    pub events: Vec<GameEvent>,
    /// Sound cues for the shell, drained each frame
    #[serde(skip)]
    pub sounds: Vec<SoundCue>,
    next_id: u32,
}

impl SessionState {
    /// Create a fresh state sitting at the menu
    pub fn new(seed: u64) -> Self {
        let nominal_gravity = difficulty::gravity(1);
        Self {
            seed,
            rng_state: RngState::new(seed),
            phase: GamePhase::Menu,
            round: RoundPhase::AwaitingProblem,
            round_serial: 0,
            score: 0,
            lives: START_LIVES,
            level: 1,
            nominal_gravity,
            gravity: nominal_gravity,
            time_ticks: 0,
            problem: None,
            plan: SpawnPlan::default(),
            field: EntityField::default(),
            catcher: Catcher::default(),
            powers: PowerUpBank::fresh(),
            timers: TimerQueue::new(),
            spawn_timer: None,
            advance_timer: None,
            slowdown_timer: None,
            banner_ticks: 0,
            flash_ticks: 0,
            events: Vec::new(),
            sounds: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// True while a slowdown window is running
    pub fn slowdown_active(&self) -> bool {
        self.slowdown_timer
            .is_some_and(|h| self.timers.is_pending(h))
    }

    pub(crate) fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub(crate) fn play(&mut self, cue: SoundCue) {
        self.sounds.push(cue);
    }

    /// Take all queued events (shell side, once per frame)
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Take all queued sound cues (shell side, once per frame)
    pub fn drain_sounds(&mut self) -> Vec<SoundCue> {
        std::mem::take(&mut self.sounds)
    }
}
