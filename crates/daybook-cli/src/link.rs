use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use daybook_config::Settings;

/// Jumps from a position in an excerpt to the journal line behind it, using
/// the sync file written next to the excerpt. Does nothing when the file has
/// no sync file or the line carries no mapping, so the command is safe to
/// bind to a key in any buffer.
pub fn run(settings: &Settings, file: &Path, line: u32, column: u32) -> Result<()> {
    let sync_path = file.with_extension("sync");
    let Ok(sync) = fs::read_to_string(&sync_path) else {
        return Ok(());
    };
    let Some(source_line) = mapped_line(&sync, line) else {
        return Ok(());
    };
    match parent_window_id(&sync) {
        Some(id) => focus_parent(id, source_line, column),
        None => open_parent(settings, &sync, source_line, column),
    }
}

/// The journal line recorded for excerpt line `line`, if any. Separator
/// lines synthesized by the filter have an empty mapping.
fn mapped_line(sync: &str, line: u32) -> Option<u32> {
    let index = (line as usize).checked_sub(1)?;
    sync.lines().nth(index)?.trim().parse().ok()
}

fn parent_window_id(sync: &str) -> Option<u32> {
    sync.lines().next()?.trim().parse().ok()
}

/// Returns the editor in the recorded kitty window to normal mode and moves
/// its cursor to the linked position, then focuses that window.
fn focus_parent(id: u32, line: u32, column: u32) -> Result<()> {
    log::info!("jumping to line {line} in kitty window {id}");
    Command::new("kitten")
        .args(["@", "send-text", "--match"])
        .arg(format!("id:{id}"))
        .arg(format!("\\e{line}G{column}|"))
        .status()
        .context("Failed to run kitten")?;
    Command::new("kitty")
        .args(["@", "focus-window", "--match"])
        .arg(format!("id:{id}"))
        .status()
        .context("Failed to run kitty")?;
    Ok(())
}

/// No recorded window: open the parent journal at the linked position in a
/// new kitty tab.
fn open_parent(settings: &Settings, sync: &str, line: u32, column: u32) -> Result<()> {
    let Some(parent) = sync
        .lines()
        .nth(1)
        .map(str::trim)
        .filter(|parent| !parent.is_empty())
    else {
        return Ok(());
    };
    log::info!("opening {parent} in a new kitty tab");
    let mut command = Command::new("kitten");
    command.args(["@", "launch", "--type=tab", "--title=daybook", "--cwd=current", "--hold"]);
    command.args(settings.editor.split_whitespace());
    command.arg(format!("+call cursor({line}, {column})"));
    command.arg(parent);
    command
        .status()
        .context("Failed to open a new kitty tab")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYNC: &str = "17\n/home/user/daybook.dbk\n3\n\n12\n";

    #[test]
    fn maps_excerpt_lines_to_journal_lines() {
        assert_eq!(mapped_line(SYNC, 3), Some(3));
        assert_eq!(mapped_line(SYNC, 5), Some(12));
    }

    #[test]
    fn separator_lines_have_no_mapping() {
        assert_eq!(mapped_line(SYNC, 4), None);
    }

    #[test]
    fn lines_past_the_end_have_no_mapping() {
        assert_eq!(mapped_line(SYNC, 0), None);
        assert_eq!(mapped_line(SYNC, 99), None);
    }

    #[test]
    fn window_id_comes_from_the_first_line() {
        assert_eq!(parent_window_id(SYNC), Some(17));
        assert_eq!(parent_window_id("\n/home/user/daybook.dbk\n"), None);
    }
}
