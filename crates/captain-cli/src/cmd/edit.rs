//! Line-oriented editing session for one card.
//!
//! Positions shown to and typed by the user are 1-based.

use crate::context::Context;
use anyhow::{bail, Context as _};
use captain_core::card::RobotCommand;
use captain_core::catalog::{ActionCatalog, ActionKind};
use captain_core::client::CardApi;
use captain_core::session::{EditingSession, SavePolicy};
use std::io::{BufRead, Write};

const HELP: &str = "\
commands:
  list                        show the program
  add <kind> [param]          append an action
  insert <pos> <kind> [param] insert an action before <pos>
  rm <pos>                    remove an action
  mv <from> <to>              move an action
  param <pos> [param]         change an action's parameter (none clears it)
  notes [text]                replace the notes
  undo | redo                 step through the edit history
  status                      show unsaved changes
  save                        store program and notes on the card
  run | stop                  control the card's robot
  upload                      save if needed, then send the program to the robot
  quit                        leave (quit! discards unsaved changes)";

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditCommand {
    List,
    Add { kind: ActionKind, param: Option<String> },
    Insert { pos: usize, kind: ActionKind, param: Option<String> },
    Remove { pos: usize },
    Move { from: usize, to: usize },
    Param { pos: usize, param: Option<String> },
    Notes(String),
    Undo,
    Redo,
    Status,
    Save,
    Robot(RobotCommand),
    Help,
    Quit { force: bool },
}

/// Kind names are the wire names, matched case-insensitively.
fn parse_kind(word: &str) -> Result<ActionKind, String> {
    ActionKind::all()
        .iter()
        .copied()
        .find(|k| k.as_str().eq_ignore_ascii_case(word))
        .ok_or_else(|| {
            let names: Vec<&str> = ActionKind::all().iter().map(|k| k.as_str()).collect();
            format!("unknown action '{word}': expected one of {}", names.join(", "))
        })
}

fn parse_pos(word: Option<&str>) -> Result<usize, String> {
    let word = word.ok_or("missing position")?;
    match word.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!("bad position '{word}': positions start at 1")),
    }
}

fn parse_param(word: Option<&str>) -> Option<String> {
    word.filter(|w| !w.eq_ignore_ascii_case("none"))
        .map(str::to_string)
}

pub fn parse(line: &str) -> Result<Option<EditCommand>, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((v, r)) => (v, r.trim()),
        None => (line, ""),
    };
    let mut args = rest.split_whitespace();

    let cmd = match verb {
        "" => return Ok(None),
        "list" | "ls" => EditCommand::List,
        "add" => EditCommand::Add {
            kind: parse_kind(args.next().ok_or("usage: add <kind> [param]")?)?,
            param: parse_param(args.next()),
        },
        "insert" => {
            let pos = parse_pos(args.next())?;
            EditCommand::Insert {
                pos,
                kind: parse_kind(args.next().ok_or("usage: insert <pos> <kind> [param]")?)?,
                param: parse_param(args.next()),
            }
        }
        "rm" => EditCommand::Remove {
            pos: parse_pos(args.next())?,
        },
        "mv" => EditCommand::Move {
            from: parse_pos(args.next())?,
            to: parse_pos(args.next())?,
        },
        "param" => EditCommand::Param {
            pos: parse_pos(args.next())?,
            param: parse_param(args.next()),
        },
        "notes" => EditCommand::Notes(rest.to_string()),
        "undo" => EditCommand::Undo,
        "redo" => EditCommand::Redo,
        "status" => EditCommand::Status,
        "save" => EditCommand::Save,
        "run" => EditCommand::Robot(RobotCommand::Run),
        "stop" => EditCommand::Robot(RobotCommand::Stop),
        "upload" => EditCommand::Robot(RobotCommand::Upload),
        "help" | "?" => EditCommand::Help,
        "quit" | "exit" => EditCommand::Quit { force: false },
        "quit!" | "exit!" => EditCommand::Quit { force: true },
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    if args.next().is_some() && !matches!(cmd, EditCommand::Notes(_)) {
        return Err(format!("too many arguments for '{verb}'"));
    }
    Ok(Some(cmd))
}

// ---------------------------------------------------------------------------
// Applying commands
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    Continue(String),
    Quit,
}

fn listing<A: CardApi>(session: &EditingSession<A>) -> anyhow::Result<String> {
    let editor = session.editor();
    let catalog = editor.catalog();
    if editor.program().is_empty() {
        return Ok("(empty program)".to_string());
    }
    let mut lines = Vec::with_capacity(editor.program().len());
    for (i, action) in editor.program().iter().enumerate() {
        let title = action.title(catalog)?;
        let line = match action.param_description(catalog) {
            Some(desc) => format!("{:>3}. {title}: {desc}  [{action}]", i + 1),
            None => format!("{:>3}. {title}  [{action}]", i + 1),
        };
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

fn status<A: CardApi>(session: &EditingSession<A>) -> String {
    let editor = session.editor();
    let program = match editor.dirty_count() {
        _ if !editor.can_reach_saved() => {
            "program modified (saved version no longer in the undo history)".to_string()
        }
        0 => "program saved".to_string(),
        n if n < 0 => format!("program {} edits behind the saved version (redo to return)", -n),
        n => format!("program modified ({n} unsaved edits)"),
    };
    let notes = if editor.is_notes_dirty() {
        "notes modified"
    } else {
        "notes saved"
    };
    format!(
        "{program}, {notes}; undo {}, redo {}",
        if editor.can_undo() { "available" } else { "empty" },
        if editor.can_redo() { "available" } else { "empty" },
    )
}

/// Apply one command to the session. Editing errors leave the session
/// untouched and come back as `Err`.
pub fn apply<A: CardApi>(session: &mut EditingSession<A>, cmd: EditCommand) -> anyhow::Result<Step> {
    let message = match cmd {
        EditCommand::List => listing(session)?,
        EditCommand::Add { kind, param } => {
            session.editor_mut().append_action(kind, param.as_deref())?;
            listing(session)?
        }
        EditCommand::Insert { pos, kind, param } => {
            session
                .editor_mut()
                .insert_action(pos - 1, kind, param.as_deref())?;
            listing(session)?
        }
        EditCommand::Remove { pos } => {
            let removed = session.editor_mut().remove_action_at(pos - 1)?;
            format!("removed {removed}")
        }
        EditCommand::Move { from, to } => {
            session.editor_mut().move_action(from - 1, to - 1)?;
            listing(session)?
        }
        EditCommand::Param { pos, param } => {
            session.editor_mut().set_param(pos - 1, param.as_deref())?;
            listing(session)?
        }
        EditCommand::Notes(text) => {
            session.editor_mut().set_notes(text);
            "notes updated".to_string()
        }
        EditCommand::Undo => {
            if session.editor_mut().undo() {
                listing(session)?
            } else {
                "nothing to undo".to_string()
            }
        }
        EditCommand::Redo => {
            if session.editor_mut().redo() {
                listing(session)?
            } else {
                "nothing to redo".to_string()
            }
        }
        EditCommand::Status => status(session),
        EditCommand::Save => {
            session.save().context("save failed")?;
            "saved".to_string()
        }
        EditCommand::Robot(command) => {
            let policy = match command {
                RobotCommand::Upload => SavePolicy::SaveIfDirty,
                _ => SavePolicy::Never,
            };
            let report = session.command(command, policy)?;
            format!("{command}: {} {}", report.status, report.body.trim())
        }
        EditCommand::Help => HELP.to_string(),
        EditCommand::Quit { force } => {
            if !force && session.editor().is_dirty() {
                bail!("unsaved changes: 'save' first or 'quit!' to discard them");
            }
            return Ok(Step::Quit);
        }
    };
    Ok(Step::Continue(message))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(ctx: &Context, card_id: &str) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let mut session = EditingSession::open(
        client,
        ActionCatalog::standard(),
        card_id,
        ctx.config.client.history_limit,
    )
    .with_context(|| format!("failed to load card {card_id}"))?;

    if let Some(w) = session.load_warning() {
        eprintln!("warning: {w}; starting from an empty program");
    }
    println!("{}", listing(&session)?);
    if !session.editor().notes().is_empty() {
        println!("notes: {}", session.editor().notes());
    }
    println!("type 'help' for commands");

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut lines = stdin.lock().lines();
    loop {
        print!("captain> ");
        stdout.flush()?;
        let Some(line) = lines.next() else {
            if session.editor().is_dirty() {
                eprintln!("warning: input closed with unsaved changes");
            }
            return Ok(());
        };
        let line = line?;
        let cmd = match parse(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };
        match apply(&mut session, cmd) {
            Ok(Step::Continue(message)) => println!("{message}"),
            Ok(Step::Quit) => return Ok(()),
            Err(e) => eprintln!("error: {e:#}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
