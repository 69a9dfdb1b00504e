//! Difficulty curve
//!
//! Level drives everything else: gravity, spawn pacing. Pure functions so the
//! curve is testable in isolation and the session never caches stale values.

use crate::consts::FIELD_HEIGHT;

/// Seconds a block should take to fall the full field height.
/// Starts at 10s on level 1, bottoms out at 3s from level 8 on.
pub fn fall_time(level: u32) -> f32 {
    (11 - level as i64).max(3) as f32
}

/// Nominal gravity for a level (px/s²), solved from d = ½gt² so a block
/// spawned at the top reaches the floor in exactly `fall_time` seconds.
pub fn gravity(level: u32) -> f32 {
    let t = fall_time(level);
    2.0 * FIELD_HEIGHT / (t * t)
}

/// Delay between consecutive block spawns, in milliseconds.
pub fn spawn_interval_ms(level: u32) -> u32 {
    (1000 - level as i64 * 100).max(200) as u32
}

/// Spawn delay in simulation ticks.
pub fn spawn_interval_ticks(level: u32) -> u32 {
    crate::ms_to_ticks(spawn_interval_ms(level))
}
