use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use daybook_config::Settings;
use daybook_engine::{resolve_locale, run_filter, FilterOptions};

use crate::cache;

pub struct Request {
    pub file: Option<PathBuf>,
    pub ignore_parent: bool,
    pub parent_id: Option<u32>,
    pub no_open: bool,
    pub term: Vec<String>,
}

pub fn run(settings: &Settings, request: Request) -> Result<()> {
    let term = normalize_term(&read_term(&request.term)?);
    let start = request
        .file
        .clone()
        .unwrap_or_else(|| settings.main_file.clone());
    let main_file = resolve_parent(&start, request.ignore_parent)?;
    log::info!("filtering {} for {term:?}", main_file.display());

    let input = fs::read_to_string(&main_file)
        .with_context(|| format!("Failed to read journal {}", main_file.display()))?;
    let options = FilterOptions {
        term: term.clone(),
        tolerance: settings.tolerance,
        case_sensitive_search: settings.case_sensitive_search,
        case_sensitive_leave: settings.case_sensitive_leave,
        locale: resolve_locale(&settings.locale),
    };
    let output = run_filter(&input, &options)?;

    let basename = cache::excerpt_basename(&term)?;
    let content_path = cache::content_path(&basename);
    let sync_path = cache::sync_path(&basename);

    // The header names the term and carries one line per matched
    // description; the parallel sync lines hold the parent window id and the
    // parent file, so both streams stay aligned line by line.
    let mut content = format!("-- {term}\n");
    content.push_str(&"-".repeat(term.chars().count() + 6));
    content.push('\n');
    let mut sync = String::new();
    if let Some(id) = request.parent_id {
        sync.push_str(&id.to_string());
    }
    sync.push('\n');
    sync.push_str(&main_file.display().to_string());
    sync.push('\n');
    for entry in &output.matches {
        content.push_str(&format!("-- {} = {}\n", entry.name, entry.text));
        sync.push_str(&format!("{}\n", entry.line));
    }
    content.push('\n');
    sync.push('\n');
    content.push_str(&output.content);
    sync.push_str(&output.sync);

    fs::write(&content_path, content)
        .with_context(|| format!("Failed to write excerpt {}", content_path.display()))?;
    fs::write(&sync_path, sync)
        .with_context(|| format!("Failed to write sync file {}", sync_path.display()))?;
    log::info!("wrote excerpt pair {}", basename.display());

    cache::prune(settings.history_count, settings.history_size, &basename)?;

    if !request.no_open {
        open_editor(&settings.editor, &content_path)?;
    }
    Ok(())
}

fn read_term(args: &[String]) -> Result<String> {
    let joined = args.join(" ");
    if !joined.is_empty() {
        return Ok(joined);
    }
    print!("Enter filter phrase: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read the filter phrase")?;
    Ok(line.trim_end_matches('\n').to_string())
}

/// Makes one search line out of a possibly indented paragraph pasted on
/// stdin.
fn normalize_term(raw: &str) -> String {
    raw.split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ")
}

/// The file to actually filter: `file` itself, or the journal it was
/// excerpted from, named on the second line of its sync file.
fn resolve_parent(file: &Path, ignore_parent: bool) -> Result<PathBuf> {
    let path = std::path::absolute(file)
        .with_context(|| format!("Cannot resolve journal path {}", file.display()))?;
    if ignore_parent {
        return Ok(path);
    }
    let sync_path = path.with_extension("sync");
    let Ok(sync) = fs::read_to_string(&sync_path) else {
        // Not a filter result, so it is the journal itself.
        return Ok(path);
    };
    match sync.lines().nth(1).map(str::trim) {
        Some(parent) if !parent.is_empty() => {
            log::info!("following parent reference to {parent}");
            Ok(std::path::absolute(parent)?)
        }
        _ => Ok(path),
    }
}

fn open_editor(editor: &str, path: &Path) -> Result<()> {
    log::info!("opening {} with {editor}", path.display());
    let status = Command::new("sh")
        .arg("-c")
        .arg(format!("{editor} -R \"$0\""))
        .arg(path)
        .status()
        .with_context(|| format!("Failed to launch editor {editor}"))?;
    if !status.success() {
        log::warn!("editor exited with {status}");
    }
    Ok(())
}
