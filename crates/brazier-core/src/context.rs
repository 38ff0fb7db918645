//! Per-run scratch state for the agent's step programs.
//!
//! Every field starts empty and is dropped wholesale when the owning program
//! resets, so nothing leaks from one run (or one phase) into the next.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Outcome of comparing a skill's experience against the last snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressCheck {
    /// Experience went up since the snapshot; the snapshot moved forward.
    Gained,
    /// No gain yet, but the retry window has not elapsed.
    Waiting,
    /// No gain for the whole retry window; the caller should act again.
    Stalled,
}

/// An experience snapshot and the tick it was taken on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub xp: u32,
    pub since: u64,
}

impl Progress {
    pub fn new(xp: u32, since: u64) -> Self {
        Self { xp, since }
    }

    /// Compare `xp` against the snapshot. Gains and stalls both re-arm the
    /// snapshot at `now`, so a stalled activity is retried at most once per
    /// `retry_ticks`.
    pub fn check(&mut self, xp: u32, now: u64, retry_ticks: u64) -> ProgressCheck {
        if xp > self.xp {
            *self = Progress::new(xp, now);
            return ProgressCheck::Gained;
        }
        if now.saturating_sub(self.since) < retry_ticks {
            return ProgressCheck::Waiting;
        }
        *self = Progress::new(xp, now);
        ProgressCheck::Stalled
    }
}

// ---------------------------------------------------------------------------
// RunContext
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunContext {
    /// Firemaking experience before the brazier was lit at round start.
    pub ignition_xp: Option<u32>,
    /// Fletching progress while turning roots into kindling.
    pub fletching: Option<Progress>,
    /// Firemaking progress while feeding the brazier.
    pub feeding: Option<Progress>,
}

impl RunContext {
    pub fn is_empty(&self) -> bool {
        *self == RunContext::default()
    }
}
