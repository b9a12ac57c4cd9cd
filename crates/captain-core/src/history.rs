//! Undo/redo log for one program instance.
//!
//! The history owns the program it tracks. Every structural mutation goes
//! through [`ProgramHistory::apply`] as an [`Edit`], which is recorded as a
//! reversible delta. Handlers registered for the change, undo and redo
//! notifications run synchronously, after the mutation has been applied, and
//! receive the post-mutation program.

use crate::action::{Action, Program};
use crate::error::{CaptainError, Result};
use std::collections::VecDeque;
use std::fmt;

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

// ---------------------------------------------------------------------------
// Edit
// ---------------------------------------------------------------------------

/// A reversible structural mutation of a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Append(Action),
    Insert { index: usize, action: Action },
    Remove { index: usize, action: Action },
    Move { from: usize, to: usize },
    SetParam { index: usize, before: Action, after: Action },
}

impl Edit {
    fn check(&self, program: &Program) -> Result<()> {
        let len = program.len();
        let out_of_range = |index: usize| CaptainError::IndexOutOfRange { index, len };
        match self {
            Edit::Append(_) => Ok(()),
            Edit::Insert { index, .. } if *index > len => Err(out_of_range(*index)),
            Edit::Insert { .. } => Ok(()),
            Edit::Remove { index, .. } | Edit::SetParam { index, .. } if *index >= len => {
                Err(out_of_range(*index))
            }
            Edit::Remove { .. } | Edit::SetParam { .. } => Ok(()),
            Edit::Move { from, .. } if *from >= len => Err(out_of_range(*from)),
            Edit::Move { to, .. } if *to >= len => Err(out_of_range(*to)),
            Edit::Move { .. } => Ok(()),
        }
    }

    fn apply(&self, program: &mut Program) {
        match self {
            Edit::Append(action) => program.push(action.clone()),
            Edit::Insert { index, action } => program.insert(*index, action.clone()),
            Edit::Remove { index, .. } => {
                program.remove(*index);
            }
            Edit::Move { from, to } => {
                let action = program.remove(*from);
                program.insert(*to, action);
            }
            Edit::SetParam { index, after, .. } => {
                program.replace(*index, after.clone());
            }
        }
    }

    fn revert(&self, program: &mut Program) {
        match self {
            Edit::Append(_) => {
                program.pop();
            }
            Edit::Insert { index, .. } => {
                program.remove(*index);
            }
            Edit::Remove { index, action } => program.insert(*index, action.clone()),
            Edit::Move { from, to } => {
                let action = program.remove(*to);
                program.insert(*from, action);
            }
            Edit::SetParam { index, before, .. } => {
                program.replace(*index, before.clone());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ProgramHistory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    /// No program watched yet; edits are applied but not recorded.
    Initial,
    Tracking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEvent {
    Change,
    Undo,
    Redo,
}

pub type Handler = Box<dyn FnMut(&Program)>;

pub struct ProgramHistory {
    program: Program,
    state: HistoryState,
    undo_stack: VecDeque<Edit>,
    redo_stack: Vec<Edit>,
    limit: usize,
    change_handlers: Vec<Handler>,
    undo_handlers: Vec<Handler>,
    redo_handlers: Vec<Handler>,
}

impl ProgramHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            program: Program::new(),
            state: HistoryState::Initial,
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
            change_handlers: Vec::new(),
            undo_handlers: Vec::new(),
            redo_handlers: Vec::new(),
        }
    }

    /// Shorthand for `new(limit)` followed by `watch(program)`.
    pub fn watching(program: Program, limit: usize) -> Self {
        let mut history = Self::new(limit);
        history.watch(program);
        history
    }

    /// Start tracking `program`. Deltas recorded for a previous program are
    /// discarded; registered handlers stay attached.
    pub fn watch(&mut self, program: Program) {
        self.program = program;
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.state = HistoryState::Tracking;
    }

    pub fn state(&self) -> HistoryState {
        self.state
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn add_change_handler(&mut self, handler: impl FnMut(&Program) + 'static) {
        self.change_handlers.push(Box::new(handler));
    }

    pub fn add_undo_handler(&mut self, handler: impl FnMut(&Program) + 'static) {
        self.undo_handlers.push(Box::new(handler));
    }

    pub fn add_redo_handler(&mut self, handler: impl FnMut(&Program) + 'static) {
        self.redo_handlers.push(Box::new(handler));
    }

    /// Apply a user edit and record it. An edit whose indices don't fit the
    /// current program is rejected before anything changes.
    pub fn apply(&mut self, edit: Edit) -> Result<()> {
        edit.check(&self.program)?;
        edit.apply(&mut self.program);
        if self.state == HistoryState::Tracking {
            self.record_change(edit);
        }
        Ok(())
    }

    fn record_change(&mut self, edit: Edit) {
        self.redo_stack.clear();
        self.undo_stack.push_back(edit);
        while self.undo_stack.len() > self.limit {
            self.undo_stack.pop_front();
        }
        self.notify(HistoryEvent::Change);
    }

    /// Revert the most recent edit. Returns `false` when there is nothing to
    /// undo.
    pub fn undo(&mut self) -> bool {
        let Some(edit) = self.undo_stack.pop_back() else {
            return false;
        };
        edit.revert(&mut self.program);
        self.redo_stack.push(edit);
        self.notify(HistoryEvent::Undo);
        true
    }

    /// Re-apply the most recently undone edit. Returns `false` when there is
    /// nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(edit) = self.redo_stack.pop() else {
            return false;
        };
        edit.apply(&mut self.program);
        self.undo_stack.push_back(edit);
        self.notify(HistoryEvent::Redo);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    fn notify(&mut self, event: HistoryEvent) {
        let handlers = match event {
            HistoryEvent::Change => &mut self.change_handlers,
            HistoryEvent::Undo => &mut self.undo_handlers,
            HistoryEvent::Redo => &mut self.redo_handlers,
        };
        for handler in handlers.iter_mut() {
            handler(&self.program);
        }
    }
}

impl Default for ProgramHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl fmt::Debug for ProgramHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramHistory")
            .field("program", &self.program)
            .field("state", &self.state)
            .field("undo", &self.undo_stack.len())
            .field("redo", &self.redo_stack.len())
            .field("limit", &self.limit)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
