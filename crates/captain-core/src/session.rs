use crate::card::{CommandReport, RobotCommand};
use crate::catalog::ActionCatalog;
use crate::client::CardApi;
use crate::codec;
use crate::editor::ProgramEditor;
use crate::error::{CaptainError, Result};

/// Whether a robot command should persist pending edits first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePolicy {
    SaveIfDirty,
    Never,
}

/// One editing session: a card, the API it lives behind, and the editor
/// holding its program.
#[derive(Debug)]
pub struct EditingSession<A: CardApi> {
    api: A,
    card_id: String,
    editor: ProgramEditor,
    load_warning: Option<CaptainError>,
}

impl<A: CardApi> EditingSession<A> {
    /// Load `card_id` and start editing it. A saved program that cannot be
    /// decoded is replaced by an empty one; the decode error is kept in
    /// [`load_warning`](Self::load_warning). Transport failures are returned.
    pub fn open(
        api: A,
        catalog: ActionCatalog,
        card_id: impl Into<String>,
        history_limit: usize,
    ) -> Result<Self> {
        let mut session = Self {
            api,
            card_id: card_id.into(),
            editor: ProgramEditor::with_history_limit(catalog, history_limit),
            load_warning: None,
        };
        session.reload()?;
        Ok(session)
    }

    /// Fetch the card again, discarding local edits.
    pub fn reload(&mut self) -> Result<()> {
        let body = self.api.load_card(&self.card_id)?;
        let decoded = match codec::decode_wire(body.program.as_deref()) {
            Ok(wire) => self.editor.load_or_empty(&wire, body.notes.as_str()),
            Err(e) => {
                self.editor.load_program(Default::default(), body.notes.as_str());
                Some(e)
            }
        };
        if let Some(e) = &decoded {
            tracing::warn!(card = %self.card_id, error = %e, "saved program unreadable, starting empty");
        } else {
            tracing::debug!(card = %self.card_id, actions = self.editor.program().len(), "card loaded");
        }
        self.load_warning = decoded;
        Ok(())
    }

    pub fn card_id(&self) -> &str {
        &self.card_id
    }

    pub fn editor(&self) -> &ProgramEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut ProgramEditor {
        &mut self.editor
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn load_warning(&self) -> Option<&CaptainError> {
        self.load_warning.as_ref()
    }

    /// Persist program and notes. The editor is marked saved only once the
    /// store has confirmed; a failed save leaves the dirty state as it was.
    pub fn save(&mut self) -> Result<()> {
        let body = codec::save_request(self.editor.program(), self.editor.notes())?;
        match self.api.save_card(&self.card_id, &body) {
            Ok(()) => {
                self.editor.mark_saved();
                self.load_warning = None;
                tracing::info!(card = %self.card_id, actions = self.editor.program().len(), "card saved");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(card = %self.card_id, error = %e, "save failed");
                Err(e)
            }
        }
    }

    /// Send a robot command for this card. Commands don't depend on the
    /// editor state; with `SaveIfDirty` pending edits are saved first.
    pub fn command(&mut self, command: RobotCommand, policy: SavePolicy) -> Result<CommandReport> {
        if policy == SavePolicy::SaveIfDirty && self.editor.is_dirty() {
            self.save()?;
        }
        let report = self.api.command(&self.card_id, command)?;
        tracing::info!(card = %self.card_id, %command, status = report.status, "robot command sent");
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardResponse;
    use crate::catalog::ActionKind;
    use crate::client::InMemoryCardApi;
    use crate::history::DEFAULT_HISTORY_LIMIT;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    fn open<'a>(api: &'a InMemoryCardApi, card: &str) -> EditingSession<&'a InMemoryCardApi> {
        EditingSession::open(api, ActionCatalog::standard(), card, DEFAULT_HISTORY_LIMIT).unwrap()
    }

    #[test]
    fn opening_a_new_card_gives_an_empty_program() {
        let api = InMemoryCardApi::new();
        let session = open(&api, "fresh");
        assert!(session.editor().program().is_empty());
        assert!(session.load_warning().is_none());
        assert!(!session.editor().can_undo());
    }

    #[test]
    fn save_then_reload_round_trips() {
        let api = InMemoryCardApi::new();
        let mut session = open(&api, "A1");
        session.editor_mut().append_action(ActionKind::Turn, Some("Right90")).unwrap();
        session.editor_mut().set_notes("spin");
        session.save().unwrap();
        assert!(!session.editor().is_dirty());

        let reopened = open(&api, "A1");
        assert_eq!(reopened.editor().program(), session.editor().program());
        assert_eq!(reopened.editor().notes(), "spin");
    }

    #[test]
    fn failed_save_keeps_dirty_state() {
        let api = InMemoryCardApi::new();
        let mut session = open(&api, "A1");
        session.editor_mut().append_action(ActionKind::MoveForward, Some("10cm")).unwrap();
        session.editor_mut().set_notes("unsaved");
        api.fail_saves(Some("store offline"));

        assert!(session.save().is_err());
        assert_eq!(session.editor().dirty_count(), 1);
        assert!(session.editor().is_notes_dirty());
    }

    #[test]
    fn corrupt_program_falls_back_to_empty() {
        let api = InMemoryCardApi::new();
        api.insert(CardResponse {
            card_id: "bad".into(),
            notes: "kept".into(),
            program: Some(STANDARD.encode(r#"[{"Action":"Teleport"}]"#)),
        });
        let mut session = open(&api, "bad");
        assert!(matches!(
            session.load_warning(),
            Some(CaptainError::MalformedProgram(_))
        ));
        assert!(session.editor().program().is_empty());
        assert_eq!(session.editor().notes(), "kept");

        session.editor_mut().append_action(ActionKind::Turn, Some("Left45")).unwrap();
        session.save().unwrap();
        assert!(session.load_warning().is_none());
    }

    #[test]
    fn undecodable_field_falls_back_to_empty() {
        let api = InMemoryCardApi::new();
        api.insert(CardResponse {
            card_id: "junk".into(),
            notes: String::new(),
            program: Some("!!!".into()),
        });
        let session = open(&api, "junk");
        assert!(matches!(
            session.load_warning(),
            Some(CaptainError::TransportDecode(_))
        ));
    }

    #[test]
    fn command_saves_first_when_dirty() {
        let api = InMemoryCardApi::new();
        let mut session = open(&api, "A1");
        session.editor_mut().append_action(ActionKind::FollowLine, Some("20cm")).unwrap();

        let report = session.command(RobotCommand::Upload, SavePolicy::SaveIfDirty).unwrap();
        assert_eq!(report.status, 200);
        assert!(!session.editor().is_dirty());
        assert!(api.card("A1").unwrap().program.is_some());
        assert_eq!(api.commands(), vec![("A1".to_string(), RobotCommand::Upload)]);
    }

    #[test]
    fn upload_saves_edit_made_after_undoing_past_save() {
        let api = InMemoryCardApi::new();
        let mut session = open(&api, "A1");
        session.editor_mut().append_action(ActionKind::MoveForward, Some("10cm")).unwrap();
        session.save().unwrap();
        session.editor_mut().undo();
        session.editor_mut().append_action(ActionKind::Turn, Some("Left90")).unwrap();

        session.command(RobotCommand::Upload, SavePolicy::SaveIfDirty).unwrap();
        assert!(!session.editor().is_dirty());

        let stored = api.card("A1").unwrap();
        let wire = codec::decode_wire(stored.program.as_deref()).unwrap();
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0].action, "Turn");
    }

    #[test]
    fn command_without_save_ignores_dirty_state() {
        let api = InMemoryCardApi::new();
        let mut session = open(&api, "A1");
        session.editor_mut().append_action(ActionKind::FollowLine, Some("20cm")).unwrap();
        session.command(RobotCommand::Stop, SavePolicy::Never).unwrap();
        assert!(session.editor().is_program_dirty());
        assert!(api.card("A1").is_none());
    }

    #[test]
    fn command_is_not_sent_when_forced_save_fails() {
        let api = InMemoryCardApi::new();
        let mut session = open(&api, "A1");
        session.editor_mut().set_notes("changed");
        api.fail_saves(Some("nope"));
        assert!(session.command(RobotCommand::Run, SavePolicy::SaveIfDirty).is_err());
        assert!(api.commands().is_empty());
    }
}
