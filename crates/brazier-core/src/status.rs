//! State shared between the tick callback and everything else.
//!
//! The tick callback is the only writer of the published phase; render
//! callbacks on other threads only read it. The start/stop switch goes the
//! other way: the control surface writes, the tick callback samples it once
//! per tick. Both are single atomics, so a reader sees either the old or the
//! new value and never a mix.

use crate::types::Phase;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// ActivitySwitch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ActivitySwitch {
    flag: Arc<AtomicBool>,
}

impl ActivitySwitch {
    pub fn new(active: bool) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(active)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn set(&self, active: bool) {
        self.flag.store(active, Ordering::Release);
    }

    /// Flip the switch and return the new state.
    pub fn toggle(&self) -> bool {
        !self.flag.fetch_xor(true, Ordering::AcqRel)
    }
}

// ---------------------------------------------------------------------------
// StatusHandle
// ---------------------------------------------------------------------------

const INACTIVE: u8 = 0;

#[derive(Debug, Clone, Default)]
pub struct StatusHandle {
    cell: Arc<AtomicU8>,
}

impl StatusHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn publish(&self, phase: Option<Phase>) {
        let encoded = match phase {
            Some(p) => p.index() as u8 + 1,
            None => INACTIVE,
        };
        self.cell.store(encoded, Ordering::Release);
    }

    pub fn current(&self) -> Option<Phase> {
        match self.cell.load(Ordering::Acquire) {
            INACTIVE => None,
            n => Phase::all().get(n as usize - 1).copied(),
        }
    }

    /// The overlay line for whatever phase was last published.
    pub fn render(&self) -> StatusLine {
        StatusLine::for_phase(self.current())
    }
}

// ---------------------------------------------------------------------------
// StatusLine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Red,
    Yellow,
    Cyan,
    Green,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusLine {
    pub text: &'static str,
    pub color: Color,
}

impl StatusLine {
    pub fn for_phase(phase: Option<Phase>) -> Self {
        match phase {
            None => StatusLine {
                text: "Inactive",
                color: Color::Red,
            },
            Some(Phase::Start) => StatusLine {
                text: "Starting...",
                color: Color::Yellow,
            },
            Some(Phase::Prep) => StatusLine {
                text: "Preparation Phase",
                color: Color::Cyan,
            },
            Some(Phase::Game) => StatusLine {
                text: "In Game",
                color: Color::Green,
            },
        }
    }
}
