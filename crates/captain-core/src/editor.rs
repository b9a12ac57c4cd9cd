use crate::action::{Action, Program, WireAction};
use crate::catalog::{ActionCatalog, ActionKind};
use crate::error::{CaptainError, Result};
use crate::history::{Edit, ProgramHistory, DEFAULT_HISTORY_LIMIT};
use std::cell::Cell;
use std::rc::Rc;

/// Editing session state for one card: the live program with its history,
/// the notes field, and the dirty bookkeeping relative to the last save.
///
/// `dirty_count` is moved only by history notifications (change +1, undo -1,
/// redo +1), so it is zero exactly when the live program matches the snapshot
/// last passed to [`ProgramEditor::mark_saved`]. It can go negative when the
/// user undoes past the saved snapshot. A new edit made while the count is
/// negative discards the redo branch holding that snapshot; from then on the
/// program stays dirty until the next save or load.
#[derive(Debug)]
pub struct ProgramEditor {
    catalog: ActionCatalog,
    history: ProgramHistory,
    notes: String,
    saved_notes: String,
    dirty_count: Rc<Cell<i64>>,
    saved_reachable: bool,
}

impl ProgramEditor {
    pub fn new(catalog: ActionCatalog) -> Self {
        Self::with_history_limit(catalog, DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(catalog: ActionCatalog, limit: usize) -> Self {
        let dirty_count = Rc::new(Cell::new(0));
        let history = tracked_history(Program::new(), limit, &dirty_count);
        Self {
            catalog,
            history,
            notes: String::new(),
            saved_notes: String::new(),
            dirty_count,
            saved_reachable: true,
        }
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    pub fn program(&self) -> &Program {
        self.history.program()
    }

    pub fn wire_program(&self) -> Vec<WireAction> {
        self.program().to_wire()
    }

    // -----------------------------------------------------------------------
    // Load / save bookkeeping
    // -----------------------------------------------------------------------

    /// Replace the live program with a decoded saved one. On a decode error
    /// nothing changes.
    pub fn load(&mut self, wire: &[WireAction], notes: impl Into<String>) -> Result<()> {
        let program = Action::from_wire_list(&self.catalog, wire)?;
        self.replace(program, notes.into());
        Ok(())
    }

    /// Replace the live program with an already decoded one.
    pub fn load_program(&mut self, program: Program, notes: impl Into<String>) {
        self.replace(program, notes.into());
    }

    /// Like [`load`](Self::load), but falls back to an empty program when the
    /// saved one cannot be decoded. The decode error is handed back so the
    /// caller can report it.
    pub fn load_or_empty(
        &mut self,
        wire: &[WireAction],
        notes: impl Into<String>,
    ) -> Option<CaptainError> {
        let notes = notes.into();
        match Action::from_wire_list(&self.catalog, wire) {
            Ok(program) => {
                self.replace(program, notes);
                None
            }
            Err(e) => {
                self.replace(Program::new(), notes);
                Some(e)
            }
        }
    }

    fn replace(&mut self, program: Program, notes: String) {
        // Fresh history and counter: handlers attached to the previous
        // program must not see edits of the new one.
        let limit = self.history.limit();
        self.dirty_count = Rc::new(Cell::new(0));
        self.history = tracked_history(program, limit, &self.dirty_count);
        self.saved_reachable = true;
        self.saved_notes = notes.clone();
        self.notes = notes;
    }

    /// Record that the current program and notes have been persisted.
    pub fn mark_saved(&mut self) {
        self.dirty_count.set(0);
        self.saved_reachable = true;
        self.saved_notes = self.notes.clone();
    }

    pub fn dirty_count(&self) -> i64 {
        self.dirty_count.get()
    }

    pub fn is_program_dirty(&self) -> bool {
        self.dirty_count() != 0 || !self.saved_reachable
    }

    /// Whether undo/redo can still bring the program back to the saved one.
    pub fn can_reach_saved(&self) -> bool {
        self.saved_reachable
    }

    pub fn is_notes_dirty(&self) -> bool {
        self.notes != self.saved_notes
    }

    pub fn is_dirty(&self) -> bool {
        self.is_program_dirty() || self.is_notes_dirty()
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn saved_notes(&self) -> &str {
        &self.saved_notes
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    // -----------------------------------------------------------------------
    // Edits
    // -----------------------------------------------------------------------

    pub fn append_action(&mut self, kind: ActionKind, param: Option<&str>) -> Result<()> {
        let action = Action::new(&self.catalog, kind, param)?;
        self.record(Edit::Append(action))
    }

    /// Insert at `index`, where `index == len` appends.
    pub fn insert_action(&mut self, index: usize, kind: ActionKind, param: Option<&str>) -> Result<()> {
        let len = self.program().len();
        if index > len {
            return Err(CaptainError::IndexOutOfRange { index, len });
        }
        let action = Action::new(&self.catalog, kind, param)?;
        self.record(Edit::Insert { index, action })
    }

    pub fn remove_action_at(&mut self, index: usize) -> Result<Action> {
        let action = self.action_at(index)?.clone();
        self.record(Edit::Remove {
            index,
            action: action.clone(),
        })?;
        Ok(action)
    }

    pub fn move_action(&mut self, from: usize, to: usize) -> Result<()> {
        self.action_at(from)?;
        self.action_at(to)?;
        if from == to {
            return Ok(());
        }
        self.record(Edit::Move { from, to })
    }

    pub fn set_param(&mut self, index: usize, param: Option<&str>) -> Result<()> {
        let before = self.action_at(index)?.clone();
        let after = before.with_param(&self.catalog, param)?;
        if after == before {
            return Ok(());
        }
        self.record(Edit::SetParam { index, before, after })
    }

    fn record(&mut self, edit: Edit) -> Result<()> {
        // Behind the save point, the saved program lives on the redo branch
        // that this edit is about to clear.
        let drops_saved = self.dirty_count() < 0 && self.history.can_redo();
        self.history.apply(edit)?;
        if drops_saved {
            self.saved_reachable = false;
        }
        Ok(())
    }

    fn action_at(&self, index: usize) -> Result<&Action> {
        let program = self.program();
        program.get(index).ok_or(CaptainError::IndexOutOfRange {
            index,
            len: program.len(),
        })
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Register an extra observer of program changes (edits, undo and redo).
    /// Observers belong to the current program and are dropped by the next
    /// load.
    pub fn add_program_observer(&mut self, observer: impl FnMut(&Program) + Clone + 'static) {
        self.history.add_change_handler(observer.clone());
        self.history.add_undo_handler(observer.clone());
        self.history.add_redo_handler(observer);
    }
}

fn tracked_history(program: Program, limit: usize, dirty: &Rc<Cell<i64>>) -> ProgramHistory {
    let mut history = ProgramHistory::watching(program, limit);
    let d = dirty.clone();
    history.add_change_handler(move |_| d.set(d.get() + 1));
    let d = dirty.clone();
    history.add_undo_handler(move |_| d.set(d.get() - 1));
    let d = dirty.clone();
    history.add_redo_handler(move |_| d.set(d.get() + 1));
    history
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
