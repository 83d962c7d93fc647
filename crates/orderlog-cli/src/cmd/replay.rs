//! `olog replay` — commit a script of board operations through the undo
//! history, then walk it back and forth.
//!
//! # Usage
//!
//! ```text
//! # Apply a script and print the resulting board
//! olog replay --board board.json --script ops.json
//!
//! # Apply, undo the last two actions, redo one, and persist each step
//! olog replay --board board.json --script ops.json --undo 2 --redo 1 --save
//! ```
//!
//! Operations whose targets no longer exist are reported as skipped steps;
//! only a failing collection or an unreadable file aborts the run.

use crate::cmd::show::{write_pretty_items, write_rows};
use crate::output::{Coded, OutputMode, pretty_kv, pretty_section, render_mode};
use anyhow::{Context, Result};
use clap::Args;
use orderlog_core::config::HistoryConfig;
use orderlog_core::error::ErrorCode;
use orderlog_core::model::{Color, GroupId, Item, ItemId, Status};
use orderlog_core::{Action, Board, History, HistoryError, Step};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::Cell;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

// ---------------------------------------------------------------------------
// Argument structs
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Board JSON file the script runs against.
    #[arg(long, value_name = "FILE")]
    pub board: PathBuf,

    /// JSON array of operations to apply in order.
    #[arg(long, value_name = "FILE")]
    pub script: PathBuf,

    /// Number of undos to perform after the script.
    #[arg(long = "undo", value_name = "N", default_value_t = 0)]
    pub undo_count: usize,

    /// Number of redos to perform after the undos.
    #[arg(long = "redo", value_name = "N", default_value_t = 0)]
    pub redo_count: usize,

    /// Write the board back after every step that changed it.
    #[arg(long)]
    pub save: bool,
}

// ---------------------------------------------------------------------------
// Script format
// ---------------------------------------------------------------------------

/// One script entry. Each mutating op maps onto one action constructor.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Status {
        ids: Vec<ItemId>,
        status: Status,
    },
    Archive {
        ids: Vec<ItemId>,
        #[serde(default)]
        status: Option<Status>,
    },
    Unarchive {
        ids: Vec<ItemId>,
        #[serde(default)]
        status: Option<Status>,
    },
    Edit {
        id: ItemId,
        field: String,
        #[serde(default)]
        value: Option<Value>,
    },
    Link {
        ids: Vec<ItemId>,
        group: GroupId,
    },
    Unlink {
        ids: Vec<ItemId>,
    },
    Delete {
        ids: Vec<ItemId>,
    },
    Color {
        id: ItemId,
        #[serde(default)]
        color: Option<Color>,
    },
    Reorder {
        id: ItemId,
        to: usize,
    },
    Paste {
        items: Vec<Item>,
        index: usize,
    },
    Undo,
    Redo,
}

impl Request {
    const fn name(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Archive { .. } => "archive",
            Self::Unarchive { .. } => "unarchive",
            Self::Edit { .. } => "edit",
            Self::Link { .. } => "link",
            Self::Unlink { .. } => "unlink",
            Self::Delete { .. } => "delete",
            Self::Color { .. } => "color",
            Self::Reorder { .. } => "reorder",
            Self::Paste { .. } => "paste",
            Self::Undo => "undo",
            Self::Redo => "redo",
        }
    }

    /// Capture an action against the current board. `None` for the
    /// history-navigation ops.
    fn build(self, board: &Board) -> Result<Option<Action>, HistoryError> {
        let action = match self {
            Self::Status { ids, status } => Action::status_change(board, ids, status)?,
            Self::Archive { ids, status } => Action::archive(board, ids, status)?,
            Self::Unarchive { ids, status } => Action::unarchive(board, ids, status)?,
            Self::Edit { id, field, value } => Action::field_edit(board, id, field, value)?,
            Self::Link { ids, group } => Action::link(board, ids, group)?,
            Self::Unlink { ids } => Action::unlink(board, ids)?,
            Self::Delete { ids } => Action::delete(board, ids)?,
            Self::Color { id, color } => Action::color_change(board, id, color)?,
            Self::Reorder { id, to } => Action::reorder(board, id, to)?,
            Self::Paste { items, index } => Action::paste(board, items, index)?,
            Self::Undo | Self::Redo => return Ok(None),
        };
        Ok(Some(action))
    }
}

/// Read and parse a script file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a JSON array of
/// known operations.
pub fn load_script(path: &Path) -> Result<Vec<Request>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct StepReport {
    /// Position in the run: script entries first, then `--undo`/`--redo`.
    index: usize,
    op: &'static str,
    /// Description of the action that ran (absent when nothing ran).
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    applied: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skipped: Vec<ItemId>,
    /// Why nothing ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

impl StepReport {
    fn ran(index: usize, op: &'static str, step: Step) -> Self {
        Self {
            index,
            op,
            description: Some(step.description),
            applied: step.outcome.applied,
            skipped: step.outcome.skipped,
            note: None,
        }
    }

    fn noted(index: usize, op: &'static str, note: impl Into<String>) -> Self {
        Self {
            index,
            op,
            description: None,
            applied: 0,
            skipped: Vec::new(),
            note: Some(note.into()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReplayReport {
    steps: Vec<StepReport>,
    board: Board,
    /// Undo stack, most recent first.
    undo: Vec<String>,
    /// Redo stack, most recent first.
    redo: Vec<String>,
    saves: usize,
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

struct Session {
    board: Board,
    history: History,
    dirty: Rc<Cell<bool>>,
    save_to: Option<PathBuf>,
    saves: usize,
    steps: Vec<StepReport>,
}

impl Session {
    fn new(board: Board, history_config: &HistoryConfig, save_to: Option<PathBuf>) -> Self {
        let mut history = History::from_config(history_config);
        let dirty = Rc::new(Cell::new(false));
        let flag = Rc::clone(&dirty);
        history.subscribe(move || flag.set(true));
        Self {
            board,
            history,
            dirty,
            save_to,
            saves: 0,
            steps: Vec::new(),
        }
    }

    fn apply(&mut self, request: Request) -> Result<()> {
        let index = self.steps.len();
        let op = request.name();
        let report = match request {
            Request::Undo => self.undo(index)?,
            Request::Redo => self.redo(index)?,
            request => match request.build(&self.board) {
                Ok(Some(action)) => {
                    let step = self
                        .history
                        .execute(action, &mut self.board)
                        .with_context(|| format!("step {index} ({op})"))?;
                    StepReport::ran(index, op, step)
                }
                Ok(None) => StepReport::noted(index, op, "no action"),
                Err(HistoryError::NothingToRecord(reason)) => {
                    tracing::info!(index, op, %reason, "step recorded nothing");
                    StepReport::noted(index, op, reason)
                }
                Err(err) => {
                    return Err(anyhow::Error::new(err))
                        .with_context(|| format!("step {index} ({op})"));
                }
            },
        };
        self.steps.push(report);
        self.persist()
    }

    fn undo(&mut self, index: usize) -> Result<StepReport> {
        let step = self
            .history
            .undo(&mut self.board)
            .with_context(|| format!("step {index} (undo)"))?;
        Ok(step.map_or_else(
            || StepReport::noted(index, "undo", "nothing to undo"),
            |step| StepReport::ran(index, "undo", step),
        ))
    }

    fn redo(&mut self, index: usize) -> Result<StepReport> {
        let step = self
            .history
            .redo(&mut self.board)
            .with_context(|| format!("step {index} (redo)"))?;
        Ok(step.map_or_else(
            || StepReport::noted(index, "redo", "nothing to redo"),
            |step| StepReport::ran(index, "redo", step),
        ))
    }

    fn persist(&mut self) -> Result<()> {
        if !self.dirty.replace(false) {
            return Ok(());
        }
        if let Some(path) = &self.save_to {
            self.board
                .save(path)
                .context(Coded(ErrorCode::BoardWriteFailed))?;
            self.saves += 1;
        }
        Ok(())
    }

    fn into_report(self) -> ReplayReport {
        let undo = self
            .history
            .undo_history()
            .map(|a| a.description().to_string())
            .collect();
        let redo = self
            .history
            .redo_history()
            .map(|a| a.description().to_string())
            .collect();
        ReplayReport {
            steps: self.steps,
            board: self.board,
            undo,
            redo,
            saves: self.saves,
        }
    }
}

/// Run a script, then the requested undos and redos.
///
/// # Errors
///
/// Returns an error if the board or script cannot be loaded, the board
/// cannot be saved, or an action fails against the collection.
pub fn run_replay(
    args: &ReplayArgs,
    history_config: &HistoryConfig,
    output: OutputMode,
) -> Result<()> {
    let board = Board::load(&args.board).context(Coded(ErrorCode::BoardReadFailed))?;
    let script = load_script(&args.script)?;
    tracing::debug!(
        ops = script.len(),
        undo = args.undo_count,
        redo = args.redo_count,
        max_history = history_config.max_history,
        "starting replay"
    );

    let save_to = args.save.then(|| args.board.clone());
    let mut session = Session::new(board, history_config, save_to);
    let tail = std::iter::repeat_n(Request::Undo, args.undo_count)
        .chain(std::iter::repeat_n(Request::Redo, args.redo_count));
    for request in script.into_iter().chain(tail) {
        session.apply(request)?;
    }

    let report = session.into_report();
    render_mode(output, &report, write_text, write_pretty)
}

fn write_text(report: &ReplayReport, w: &mut dyn Write) -> io::Result<()> {
    for step in &report.steps {
        let what = step
            .description
            .as_deref()
            .or(step.note.as_deref())
            .unwrap_or("");
        writeln!(
            w,
            "step\t{}\t{}\t{}\t{}\t{what}",
            step.index,
            step.op,
            step.applied,
            step.skipped.len()
        )?;
    }
    write_rows(report.board.items(), w)?;
    for description in &report.undo {
        writeln!(w, "undo\t{description}")?;
    }
    for description in &report.redo {
        writeln!(w, "redo\t{description}")?;
    }
    Ok(())
}

fn write_pretty(report: &ReplayReport, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Steps ({})", report.steps.len()))?;
    for step in &report.steps {
        match (&step.description, &step.note) {
            (Some(description), _) => {
                write!(w, "{:>3}. {:<10} {description}", step.index, step.op)?;
                if step.skipped.is_empty() {
                    writeln!(w)?;
                } else {
                    let ids: Vec<&str> = step.skipped.iter().map(ItemId::as_str).collect();
                    writeln!(w, " (skipped {})", ids.join(", "))?;
                }
            }
            (None, note) => {
                let note = note.as_deref().unwrap_or("");
                writeln!(w, "{:>3}. {:<10} -- {note}", step.index, step.op)?;
            }
        }
    }
    writeln!(w)?;
    pretty_section(w, &format!("Board ({} items)", report.board.items().len()))?;
    write_pretty_items(report.board.items(), w)?;
    pretty_kv(w, "undo", report.undo.join(" | "))?;
    pretty_kv(w, "redo", report.redo.join(" | "))?;
    if report.saves > 0 {
        pretty_kv(w, "saved", format!("{} times", report.saves))?;
    }
    Ok(())
}
