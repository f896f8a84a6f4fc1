pub mod registry;

use crate::error::EngineError;
use crate::parsing::date::Date;
use crate::parsing::element::{indent_of, Description, Element, Enter, Gap, Leave, Note};
use crate::parsing::{Classifier, ITEM_MARKER};
use registry::{MatchRules, Registry};

/// The last element handed to the handler, kept for indent context and for
/// recognizing two consecutive date lines. Blank lines do not count.
#[derive(Debug, Clone, PartialEq)]
pub enum LastParsed {
    Date(Date),
    Other { indent: usize },
}

impl LastParsed {
    pub fn indent(&self) -> usize {
        match self {
            LastParsed::Date(date) => date.indent,
            LastParsed::Other { indent } => *indent,
        }
    }
}

/// Running state of one pass over a journal.
#[derive(Debug)]
pub struct Traversal {
    pub registry: Registry,
    pub date: Date,
    pub rules: MatchRules,
    pub last_parsed: Option<LastParsed>,
}

/// Per-element callbacks, dispatched in document order. Default bodies
/// perform plain resolution: merge dates into the running date and drop
/// resolved blocks. The filter overrides every one of them.
pub trait Handler {
    fn on_date(&mut self, traversal: &mut Traversal, date: &Date) {
        traversal.date = traversal.date.merged(date, false);
    }

    fn on_enter(&mut self, _traversal: &mut Traversal, _enter: &mut Enter) {}

    /// Called when a closer resolves the open block at `enter_line`.
    fn on_leave_matched(&mut self, traversal: &mut Traversal, _leave: Leave, enter_line: u32) {
        traversal.registry.remove(enter_line);
    }

    /// Called for each open block the closer scanned past without matching.
    fn on_leave_nonmatched(&mut self, _traversal: &mut Traversal, _leave: &mut Leave, _enter_line: u32) {
    }

    fn on_description(&mut self, _traversal: &mut Traversal, _description: Description) {}

    fn on_note(&mut self, _traversal: &mut Traversal, _note: Note) {}
}

/// Plain resolution with no side effects beyond the traversal state.
#[derive(Debug, Default)]
pub struct BaseResolver;

impl Handler for BaseResolver {}

/// Single pass over `input`, classifying each line and dispatching to
/// `handler`.
///
/// # Arguments
///
/// * `limit` - stop after this 1-indexed line; the line itself is still
///   processed. `None` reads everything.
///
/// # Errors
///
/// Fails on the first malformed line, on a date not after the running date,
/// and on a closer no open block matches.
pub fn traverse<H: Handler>(
    input: &str,
    limit: Option<u32>,
    rules: MatchRules,
    handler: &mut H,
) -> Result<Traversal, EngineError> {
    let mut traversal = Traversal {
        registry: Registry::default(),
        date: Date::default(),
        rules,
        last_parsed: None,
    };
    let mut classifier = Classifier::default();
    let mut pending: Option<Gap> = None;

    for (index, raw) in input.lines().enumerate() {
        let line_no = index as u32 + 1;
        let in_list = traversal
            .registry
            .innermost_open()
            .is_some_and(|enter| enter.kind.starts_with(ITEM_MARKER));
        let classified =
            classifier.classify(line_no, raw, &traversal.date, &mut pending, in_list)?;
        if let Some(note) = classified.flushed {
            dispatch(handler, &mut traversal, Element::Note(note))?;
        }
        if let Some(element) = classified.element {
            dispatch(handler, &mut traversal, element)?;
        }
        if Some(line_no) == limit {
            break;
        }
    }
    if let Some(note) = classifier.finish() {
        dispatch(handler, &mut traversal, Element::Note(note))?;
    }
    Ok(traversal)
}

fn dispatch<H: Handler>(
    handler: &mut H,
    traversal: &mut Traversal,
    element: Element,
) -> Result<(), EngineError> {
    match element {
        Element::Command { .. } => {
            traversal.date = Date::default();
        }
        Element::Date(date) => {
            if !date.is_after(&traversal.date) {
                return Err(EngineError::structure(
                    date.line,
                    format!("date {date} is not after {}", traversal.date),
                ));
            }
            handler.on_date(traversal, &date);
            traversal.last_parsed = Some(LastParsed::Date(date));
        }
        Element::Enter(mut enter) => {
            handler.on_enter(traversal, &mut enter);
            let indent = indent_of(&enter.text);
            traversal.registry.insert_open(enter);
            traversal.last_parsed = Some(LastParsed::Other { indent });
        }
        Element::Leave(leave) => {
            let indent = indent_of(&leave.text);
            resolve_leave(handler, traversal, leave)?;
            traversal.last_parsed = Some(LastParsed::Other { indent });
        }
        Element::Description(description) => {
            let indent = indent_of(&description.text);
            handler.on_description(traversal, description);
            traversal.last_parsed = Some(LastParsed::Other { indent });
        }
        Element::Note(note) => {
            let indent = indent_of(&note.text);
            handler.on_note(traversal, note);
            traversal.last_parsed = Some(LastParsed::Other { indent });
        }
    }
    Ok(())
}

/// Scans open blocks newest-first for one the closer resolves. Every block
/// scanned past gets the nonmatched callback; a journal where no block
/// matches at all is malformed.
fn resolve_leave<H: Handler>(
    handler: &mut H,
    traversal: &mut Traversal,
    mut leave: Leave,
) -> Result<(), EngineError> {
    let rules = traversal.rules;
    for line in traversal.registry.open_lines_rev() {
        let matched = match traversal.registry.open(line) {
            Some(enter) => rules.matches(enter, &leave),
            None => continue,
        };
        if matched {
            handler.on_leave_matched(traversal, leave, line);
            return Ok(());
        }
        handler.on_leave_nonmatched(traversal, &mut leave, line);
    }
    Err(EngineError::structure(
        leave.line,
        "no open block matches this closer",
    ))
}
