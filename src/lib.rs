//! Root Catch - catch the correct root of the quadratic
//!
//! Core modules:
//! - `sim`: Deterministic simulation (session state machine, falling answers,
//!   power-ups, timers)
//! - `problem`: Problem payloads, local generator, fetch fallback
//! - `renderer`: Canvas 2D drawing (wasm)
//! - `audio`: Procedural sound cues (wasm)
//! - `settings`: Player preferences persisted to LocalStorage

#[cfg(target_arch = "wasm32")]
pub mod audio;
pub mod problem;
#[cfg(target_arch = "wasm32")]
pub mod renderer;
pub mod settings;
pub mod sim;

pub use problem::Problem;
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Simulation tick rate
    pub const TICK_HZ: u32 = 60;
    /// Fixed simulation timestep
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Playfield dimensions
    pub const FIELD_WIDTH: f32 = 800.0;
    pub const FIELD_HEIGHT: f32 = 600.0;

    /// Answer blocks spawn above the visible field and fall in
    pub const SPAWN_Y: f32 = -100.0;
    /// Horizontal spawn band, inset so blocks never clip the edges
    pub const SPAWN_X_MIN: f32 = 100.0;
    pub const SPAWN_X_MAX: f32 = 700.0;
    /// A block at or past this y has fallen out (field height + buffer)
    pub const MISS_Y: f32 = FIELD_HEIGHT + 50.0;

    /// Answer block dimensions
    pub const BLOCK_WIDTH: f32 = 80.0;
    pub const BLOCK_HEIGHT: f32 = 50.0;

    /// Catcher bucket dimensions and vertical lane
    pub const CATCHER_WIDTH: f32 = 120.0;
    pub const CATCHER_HEIGHT: f32 = 30.0;
    pub const CATCHER_Y: f32 = 560.0;

    /// Scoring
    pub const CATCH_SCORE: u32 = 10;
    /// Level up every time the score crosses a multiple of this
    pub const LEVEL_STEP_SCORE: u32 = 50;
    pub const START_LIVES: u8 = 3;

    /// Pause between a resolved round and the next problem request
    pub const ROUND_ADVANCE_MS: u32 = 500;
    /// Slowdown power-up window
    pub const SLOWDOWN_MS: u32 = 5_000;
    /// Gravity divisor while slowdown is active
    pub const SLOWDOWN_FACTOR: f32 = 3.0;
    /// Level-up banner fade
    pub const BANNER_MS: u32 = 2_000;
    /// Red flash after a penalized mistake
    pub const FLASH_MS: u32 = 200;
}

/// Convert a millisecond delay to simulation ticks (rounded, at least 1)
#[inline]
pub fn ms_to_ticks(ms: u32) -> u32 {
    ((ms as u64 * consts::TICK_HZ as u64 + 500) / 1000).max(1) as u32
}
