//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Tick-counted timers only (no wall clock)
//! - No rendering or platform dependencies

pub mod collision;
pub mod difficulty;
pub mod field;
pub mod powerups;
pub mod schedule;
pub mod session;
pub mod spawn;
pub mod state;

pub use collision::Aabb;
pub use field::EntityField;
pub use powerups::{PowerKind, PowerUpBank};
pub use schedule::{TimerHandle, TimerKind, TimerQueue};
pub use session::{
    TickInput, activate_power, problem_failed, problem_ready, start_session, tick,
};
pub use spawn::{PlannedBlock, SpawnPlan};
pub use state::{
    AnswerEntity, Catcher, GameEvent, GamePhase, RngState, RoundPhase, SessionState, SoundCue,
};
