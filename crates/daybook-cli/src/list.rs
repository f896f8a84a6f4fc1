use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use daybook_config::Settings;
use daybook_engine::{next_date, open_blocks, resolve_locale, MatchRules};

/// Prints the open blocks above `line`, or tomorrow's date line. Every
/// output line starts with a newline instead of ending with one; that drops
/// cleanly into an editor buffer at the cursor.
pub fn run(settings: &Settings, file: &Path, line: u32, generate_date: bool) -> Result<()> {
    let input = fs::read_to_string(file)
        .with_context(|| format!("Failed to read journal {}", file.display()))?;
    let rules = MatchRules {
        case_sensitive_leave: settings.case_sensitive_leave,
    };
    let locale = resolve_locale(&settings.locale);
    let out = if generate_date {
        next_date(&input, line, rules, locale)?
    } else {
        open_blocks(&input, line, rules, locale)?
    };
    print!("{out}");
    Ok(())
}
