//! Power-up bank
//!
//! Three independent single-use abilities. Each is either available or
//! consumed; the only way back to available is the refresh on session start
//! and level-up. Activating a consumed power is a no-op, never an error.

use serde::{Deserialize, Serialize};

/// The three power-ups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerKind {
    /// Divide gravity by 3 for a few seconds
    Slowdown,
    /// Forgive the next life-costing mistake (consumed passively)
    Shield,
    /// Destroy every falling distractor block
    Clear,
}

impl PowerKind {
    pub const ALL: [PowerKind; 3] = [PowerKind::Slowdown, PowerKind::Shield, PowerKind::Clear];

    /// Key used by the HUD (button ids, event payloads)
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerKind::Slowdown => "slowdown",
            PowerKind::Shield => "shield",
            PowerKind::Clear => "clear",
        }
    }
}

/// Availability of the three power-ups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUpBank {
    slowdown: bool,
    shield: bool,
    clear: bool,
}

impl Default for PowerUpBank {
    fn default() -> Self {
        Self::fresh()
    }
}

impl PowerUpBank {
    /// All three available
    pub fn fresh() -> Self {
        Self {
            slowdown: true,
            shield: true,
            clear: true,
        }
    }

    pub fn is_available(&self, kind: PowerKind) -> bool {
        match kind {
            PowerKind::Slowdown => self.slowdown,
            PowerKind::Shield => self.shield,
            PowerKind::Clear => self.clear,
        }
    }

    /// Consume a power. Returns false (and changes nothing) if it was
    /// already spent.
    pub fn consume(&mut self, kind: PowerKind) -> bool {
        let slot = match kind {
            PowerKind::Slowdown => &mut self.slowdown,
            PowerKind::Shield => &mut self.shield,
            PowerKind::Clear => &mut self.clear,
        };
        let was_available = *slot;
        *slot = false;
        was_available
    }

    /// Reset all powers to available (session start, level-up)
    pub fn refresh(&mut self) {
        *self = Self::fresh();
    }
}
