//! Deterministic timer queue
//!
//! Delayed calls and the repeating spawn timer are explicit entries keyed to
//! the simulation tick counter. Every entry carries a cancellation handle so
//! a session reset can drop in-flight timers instead of letting a stale
//! callback mutate fresh state.

use serde::{Deserialize, Serialize};

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerKind {
    /// Pop the next planned answer block into the field
    SpawnEntity,
    /// End the post-round pause and request the next problem
    AdvanceRound,
    /// Slowdown window expired, restore nominal gravity
    RestoreGravity,
}

/// Cancellation token for a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Timer {
    handle: TimerHandle,
    kind: TimerKind,
    due_tick: u64,
    /// Reschedule with this period after firing
    period: Option<u32>,
}

/// Pending timers. Firing order is deterministic: (due tick, handle).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimerQueue {
    timers: Vec<Timer>,
    next_handle: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: TimerKind, due_tick: u64, period: Option<u32>) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        self.timers.push(Timer {
            handle,
            kind,
            due_tick,
            period,
        });
        handle
    }

    /// Schedule a one-shot timer `delay_ticks` from `now`
    pub fn schedule_once(&mut self, kind: TimerKind, now: u64, delay_ticks: u32) -> TimerHandle {
        self.push(kind, now + delay_ticks as u64, None)
    }

    /// Schedule a repeating timer; the first fire is one period after `now`
    pub fn schedule_repeating(
        &mut self,
        kind: TimerKind,
        now: u64,
        period_ticks: u32,
    ) -> TimerHandle {
        let period = period_ticks.max(1);
        self.push(kind, now + period as u64, Some(period))
    }

    /// Cancel a pending timer. Returns false if it already fired or was
    /// cancelled earlier.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.handle != handle);
        self.timers.len() != before
    }

    /// Drop every pending timer (session reset, game over)
    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.timers.iter().any(|t| t.handle == handle)
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Remove timers due at or before `now`, reschedule repeating ones, and
    /// return the fired set in (due tick, handle) order.
    pub fn fire_due(&mut self, now: u64) -> Vec<(TimerHandle, TimerKind)> {
        let mut fired: Vec<Timer> = Vec::new();
        self.timers.retain(|t| {
            if t.due_tick <= now {
                fired.push(t.clone());
                false
            } else {
                true
            }
        });
        fired.sort_by_key(|t| (t.due_tick, t.handle.0));

        let mut out = Vec::with_capacity(fired.len());
        for t in fired {
            if let Some(period) = t.period {
                // Keep the handle stable across refires so callers can still
                // cancel the repeating timer.
                self.timers.push(Timer {
                    handle: t.handle,
                    kind: t.kind,
                    due_tick: now + period as u64,
                    period: Some(period),
                });
            }
            out.push((t.handle, t.kind));
        }
        out
    }
}
