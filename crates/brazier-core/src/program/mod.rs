//! Resumable step programs.
//!
//! A `StepProgram` is a flat list of instructions with a cursor. Each call to
//! [`StepProgram::step`] evaluates exactly one instruction: immediates run once
//! and move on, conditional waits re-poll until their predicate holds, jumps
//! move the cursor to an index resolved when the program was built. Nothing
//! ever blocks; a wait is visible only as a cursor that does not advance.

pub mod builder;

pub use builder::{Label, ProgramBuilder};

use serde::Serialize;
use tracing::warn;

// ---------------------------------------------------------------------------
// StepStatus / Flow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Complete,
}

/// What an immediate action asks the program to do next.
#[derive(Debug, Clone)]
pub enum Flow {
    /// Fall through to the following instruction.
    Next,
    /// Continue at the instruction marked with this label.
    Jump(Label),
}

// ---------------------------------------------------------------------------
// Instruction
// ---------------------------------------------------------------------------

pub(crate) type Action<W, C> = Box<dyn FnMut(&mut W, &mut C) -> Flow>;
pub(crate) type Poll<W, C> = Box<dyn FnMut(&mut W, &mut C) -> bool>;

pub(crate) enum Instruction<W, C> {
    Immediate(Action<W, C>),
    Wait(Poll<W, C>),
    /// Unconditional jump to an absolute index.
    Jump(usize),
}

impl<W, C> Instruction<W, C> {
    fn kind(&self) -> &'static str {
        match self {
            Instruction::Immediate(_) => "immediate",
            Instruction::Wait(_) => "wait",
            Instruction::Jump(_) => "jump",
        }
    }
}

// ---------------------------------------------------------------------------
// StepProgram
// ---------------------------------------------------------------------------

pub struct StepProgram<W, C> {
    id: u64,
    instructions: Vec<Instruction<W, C>>,
    /// Label name per resolved index, for diagnostics only.
    labels: Vec<(usize, String)>,
    cursor: usize,
    context: C,
}

impl<W, C: Default> StepProgram<W, C> {
    pub(crate) fn new(
        id: u64,
        instructions: Vec<Instruction<W, C>>,
        labels: Vec<(usize, String)>,
    ) -> Self {
        Self {
            id,
            instructions,
            labels,
            cursor: 0,
            context: C::default(),
        }
    }

    /// Evaluate the instruction under the cursor.
    ///
    /// Returns `Complete` when the cursor is (or just became) terminal.
    pub fn step(&mut self, world: &mut W) -> StepStatus {
        let len = self.instructions.len();
        let Some(instruction) = self.instructions.get_mut(self.cursor) else {
            return StepStatus::Complete;
        };

        let next = match instruction {
            Instruction::Immediate(action) => match action(world, &mut self.context) {
                Flow::Next => self.cursor + 1,
                Flow::Jump(label) => match label.target_in(self.id) {
                    Some(target) => target,
                    None => {
                        warn!(
                            label = label.name(),
                            cursor = self.cursor,
                            "jump to a label outside this program; falling through"
                        );
                        self.cursor + 1
                    }
                },
            },
            Instruction::Wait(poll) => {
                if poll(world, &mut self.context) {
                    self.cursor + 1
                } else {
                    self.cursor
                }
            }
            Instruction::Jump(target) => *target,
        };

        self.cursor = next.min(len);
        if self.cursor == len {
            StepStatus::Complete
        } else {
            StepStatus::Running
        }
    }

    /// Rewind to the first instruction and start from an empty context.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.context = C::default();
    }
}

impl<W, C> StepProgram<W, C> {
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.instructions.len()
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    /// Name of the label marked at `index`, if any.
    pub fn label_at(&self, index: usize) -> Option<&str> {
        self.labels
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, name)| name.as_str())
    }

    /// Kind of the instruction under the cursor, or `None` when terminal.
    pub fn current_kind(&self) -> Option<&'static str> {
        self.instructions.get(self.cursor).map(Instruction::kind)
    }
}

impl<W, C: std::fmt::Debug> std::fmt::Debug for StepProgram<W, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepProgram")
            .field("len", &self.instructions.len())
            .field("cursor", &self.cursor)
            .field("labels", &self.labels)
            .field("context", &self.context)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
