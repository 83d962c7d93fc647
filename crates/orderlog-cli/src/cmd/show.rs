//! `olog show` — render a board file.

use crate::output::{Coded, OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};
use anyhow::{Context, Result};
use clap::Args;
use orderlog_core::error::ErrorCode;
use orderlog_core::model::Item;
use orderlog_core::Board;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Board JSON file to render.
    #[arg(long, value_name = "FILE")]
    pub board: PathBuf,
}

/// Load and print the board.
///
/// # Errors
///
/// Returns an error if the board file cannot be read or parsed.
pub fn run_show(args: &ShowArgs, output: OutputMode) -> Result<()> {
    let board = Board::load(&args.board).context(Coded(ErrorCode::BoardReadFailed))?;
    render_mode(output, &board, |b, w| write_rows(b.items(), w), |b, w| {
        pretty_section(w, &format!("Board ({} items)", b.items().len()))?;
        write_pretty_items(b.items(), w)
    })
}

/// Tab-separated rows: id, status, archived flag, group, color.
pub fn write_rows(items: &[Item], w: &mut dyn Write) -> io::Result<()> {
    for item in items {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}",
            item.id,
            item.status,
            if item.archived { "archived" } else { "-" },
            item.group.as_ref().map_or("-", |g| g.as_str()),
            item.color.as_ref().map_or("-", |c| c.as_str()),
        )?;
    }
    Ok(())
}

/// One block per item, fields included.
pub fn write_pretty_items(items: &[Item], w: &mut dyn Write) -> io::Result<()> {
    if items.is_empty() {
        return writeln!(w, "(empty)");
    }
    for item in items {
        let mut flags = Vec::new();
        if item.archived {
            flags.push("archived".to_string());
        }
        if let Some(group) = &item.group {
            flags.push(format!("group {}", group.as_str()));
        }
        if let Some(color) = &item.color {
            flags.push(color.as_str().to_string());
        }
        if flags.is_empty() {
            writeln!(w, "{:<16} {}", item.id.as_str(), item.status.as_str())?;
        } else {
            writeln!(
                w,
                "{:<16} {:<12} [{}]",
                item.id.as_str(),
                item.status.as_str(),
                flags.join(", ")
            )?;
        }
        for (name, value) in &item.fields {
            let shown = value
                .as_str()
                .map_or_else(|| value.to_string(), str::to_string);
            write!(w, "  ")?;
            pretty_kv(w, name, shown)?;
        }
    }
    pretty_rule(w)
}
