use super::{Flow, Instruction, StepProgram};
use crate::error::{BrazierError, Result};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

static NEXT_PROGRAM_ID: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// Label
// ---------------------------------------------------------------------------

/// A jump target minted by a [`ProgramBuilder`].
///
/// The absolute instruction index is bound exactly once, when the program that
/// marks the label is built. Jumping through a label is an index read.
#[derive(Clone)]
pub struct Label {
    slot: Arc<LabelSlot>,
}

struct LabelSlot {
    name: String,
    /// Owning program id and index.
    binding: OnceLock<(u64, usize)>,
}

impl Label {
    fn new(name: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(LabelSlot {
                name: name.into(),
                binding: OnceLock::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.slot.name
    }

    /// Resolved instruction index, or `None` before the owning program is built.
    pub fn target(&self) -> Option<usize> {
        self.slot.binding.get().map(|&(_, index)| index)
    }

    /// Resolved index, only if the label was bound by program `id`.
    pub(crate) fn target_in(&self, id: u64) -> Option<usize> {
        match self.slot.binding.get() {
            Some(&(owner, index)) if owner == id => Some(index),
            _ => None,
        }
    }

    fn same(&self, other: &Label) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Label")
            .field("name", &self.slot.name)
            .field("target", &self.target())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ProgramBuilder
// ---------------------------------------------------------------------------

enum Pending<W, C> {
    Immediate(super::Action<W, C>),
    Wait(super::Poll<W, C>),
    Jump(Label),
}

/// Buffers directives and resolves them into a [`StepProgram`] on `build()`.
pub struct ProgramBuilder<W, C> {
    pending: Vec<Pending<W, C>>,
    minted: Vec<Label>,
    marks: Vec<(Label, usize)>,
}

impl<W, C> Default for ProgramBuilder<W, C> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            minted: Vec::new(),
            marks: Vec::new(),
        }
    }
}

impl<W, C> ProgramBuilder<W, C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instructions appended so far.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Mint a label owned by this builder. It must be marked before `build()`.
    pub fn label(&mut self, name: impl Into<String>) -> Label {
        let label = Label::new(name);
        self.minted.push(label.clone());
        label
    }

    /// Declare `label` at the current position: it targets the next instruction
    /// appended, or the terminal position if nothing follows.
    pub fn mark(&mut self, label: &Label) -> &mut Self {
        self.marks.push((label.clone(), self.pending.len()));
        self
    }

    /// Append an action that runs once and falls through.
    pub fn add(&mut self, mut action: impl FnMut(&mut W, &mut C) + 'static) -> &mut Self {
        self.pending.push(Pending::Immediate(Box::new(move |w, c| {
            action(w, c);
            Flow::Next
        })));
        self
    }

    /// Append an action that runs once and picks where execution continues.
    pub fn branch(&mut self, action: impl FnMut(&mut W, &mut C) -> Flow + 'static) -> &mut Self {
        self.pending.push(Pending::Immediate(Box::new(action)));
        self
    }

    /// Append a conditional wait. The predicate runs once per step (side
    /// effects included) until it returns `true`.
    pub fn delay_until(&mut self, poll: impl FnMut(&mut W, &mut C) -> bool + 'static) -> &mut Self {
        self.pending.push(Pending::Wait(Box::new(poll)));
        self
    }

    /// Append an unconditional jump.
    pub fn jump(&mut self, label: &Label) -> &mut Self {
        self.pending.push(Pending::Jump(label.clone()));
        self
    }

    /// Splice another builder's instructions and labels in at the current position.
    pub fn append(&mut self, other: ProgramBuilder<W, C>) -> &mut Self {
        let offset = self.pending.len();
        self.pending.extend(other.pending);
        self.minted.extend(other.minted);
        self.marks.extend(
            other
                .marks
                .into_iter()
                .map(|(label, index)| (label, index + offset)),
        );
        self
    }

    /// Resolve every label and produce the program.
    ///
    /// Fails when a minted or jumped-to label was never marked, or when a
    /// label is marked twice. Nothing is bound unless the whole build succeeds.
    pub fn build(self) -> Result<StepProgram<W, C>>
    where
        C: Default,
    {
        let ProgramBuilder {
            pending,
            minted,
            marks,
        } = self;

        for (i, (label, _)) in marks.iter().enumerate() {
            let repeated = marks[..i].iter().any(|(l, _)| l.same(label));
            if repeated || label.target().is_some() {
                return Err(BrazierError::DuplicateLabel(label.name().to_string()));
            }
        }

        for label in &minted {
            if position_in(&marks, label).is_none() {
                return Err(BrazierError::UnresolvedLabel(label.name().to_string()));
            }
        }

        let mut instructions = Vec::with_capacity(pending.len());
        for directive in pending {
            instructions.push(match directive {
                Pending::Immediate(action) => Instruction::Immediate(action),
                Pending::Wait(poll) => Instruction::Wait(poll),
                Pending::Jump(label) => {
                    let target = position_in(&marks, &label)
                        .ok_or_else(|| BrazierError::UnresolvedLabel(label.name().to_string()))?;
                    Instruction::Jump(target)
                }
            });
        }

        let id = NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed);
        let mut names = Vec::with_capacity(marks.len());
        for (label, index) in &marks {
            // Duplicates and already-bound labels were rejected above.
            let _ = label.slot.binding.set((id, *index));
            names.push((*index, label.name().to_string()));
        }

        Ok(StepProgram::new(id, instructions, names))
    }
}

fn position_in(marks: &[(Label, usize)], label: &Label) -> Option<usize> {
    marks
        .iter()
        .find(|(marked, _)| marked.same(label))
        .map(|(_, index)| *index)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
