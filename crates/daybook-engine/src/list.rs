use chrono::Locale;

use crate::error::EngineError;
use crate::parsing::date::Date;
use crate::traverse::registry::MatchRules;
use crate::traverse::{traverse, BaseResolver, LastParsed};

/// Lines describing every block still open above the cursor, for insertion
/// into an editor buffer: each opener verbatim, prefixed by its captured
/// date whenever that is newer than the previously written one, and the
/// running date at the end if newer still. Every line starts with a newline
/// so the result drops straight in at the cursor.
///
/// # Errors
///
/// Fails when the journal prefix above `line` does not traverse.
pub fn open_blocks(
    input: &str,
    line: u32,
    rules: MatchRules,
    locale: Locale,
) -> Result<String, EngineError> {
    let traversal = traverse(input, Some(line), rules, &mut BaseResolver)?;
    log::debug!(
        "{} blocks open above line {line}",
        traversal.registry.open_blocks().count()
    );
    let mut out = String::new();
    let mut date_written = Date::default();
    for enter in traversal.registry.open_blocks() {
        if enter.date.is_after(&date_written) {
            out.push('\n');
            out.push_str(&enter.date.render(locale));
            date_written = enter.date.clone();
        }
        out.push('\n');
        out.push_str(&enter.text);
    }
    if traversal.date.is_after(&date_written) {
        out.push('\n');
        out.push_str(&traversal.date.render(locale));
    }
    Ok(out)
}

/// The date line for the next day: tomorrow of the running date above the
/// cursor, indented like the last parsed element.
///
/// # Errors
///
/// Fails when the journal prefix above `line` does not traverse.
pub fn next_date(
    input: &str,
    line: u32,
    rules: MatchRules,
    locale: Locale,
) -> Result<String, EngineError> {
    let traversal = traverse(input, Some(line), rules, &mut BaseResolver)?;
    let indent = traversal
        .last_parsed
        .as_ref()
        .map(LastParsed::indent)
        .unwrap_or(0);
    Ok(format!("\n{}", traversal.date.tomorrow_line(indent, locale)))
}
