pub mod date;
pub mod element;
pub mod value;

use crate::error::EngineError;
use date::Date;
use element::{indent_of, Command, Element, Gap, Note, NoteKind};

pub(crate) const DATE_MARKER: char = '#';
pub(crate) const ENTER_MARKER: char = '>';
pub(crate) const LEAVE_MARKER: char = '<';
pub(crate) const DESCRIPTION_MARKER: char = '=';
pub(crate) const COMMAND_MARKER: char = '!';
pub(crate) const ITEM_MARKER: char = '-';
pub(crate) const COMMENT_MARKER: &str = "--";
pub(crate) const ELLIPSIS_TOKEN: &str = "...";

/// Result of classifying one raw line. A marker line may flush a Note that
/// was accumulating above it; the flushed Note precedes the line's own
/// element in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub flushed: Option<Note>,
    pub element: Option<Element>,
}

impl Classified {
    fn flush(note: Option<Note>) -> Self {
        Classified {
            flushed: note,
            element: None,
        }
    }

    fn element(flushed: Option<Note>, element: Element) -> Self {
        Classified {
            flushed,
            element: Some(element),
        }
    }
}

/// Line classifier. Holds the Note being accumulated; blank-line bookkeeping
/// lives in the caller's pending slot because blanks attach to whatever
/// element comes next, which the classifier alone cannot know.
#[derive(Debug, Default)]
pub struct Classifier {
    note: Option<Note>,
}

impl Classifier {
    /// Classifies one line.
    ///
    /// # Arguments
    ///
    /// * `date` - the running date, copied onto dated elements.
    /// * `pending` - slot for an unconsumed blank or ellipsis line; blanks
    ///   keep the first stashed line, a structural ellipsis replaces it.
    /// * `in_list` - whether the nearest matchable open block is list-typed,
    ///   which turns dash lines into Items.
    pub fn classify(
        &mut self,
        line_no: u32,
        raw: &str,
        date: &Date,
        pending: &mut Option<Gap>,
        in_list: bool,
    ) -> Result<Classified, EngineError> {
        let mut line = raw.trim_end();
        if let Some(index) = line.find(COMMENT_MARKER) {
            line = line[..index].trim_end();
        }
        let trimmed = line.trim_start();

        if trimmed.is_empty() {
            let flushed = self.note.take();
            if pending.is_none() {
                *pending = Some(Gap::blank(line_no));
            }
            return Ok(Classified::flush(flushed));
        }

        if let Some(rest) = trimmed.strip_prefix(COMMAND_MARKER) {
            let token = rest.trim();
            let command = match token {
                "reset" => Command::Reset,
                _ => {
                    return Err(EngineError::parse(
                        line_no,
                        line,
                        format!("unknown command {token:?}"),
                    ));
                }
            };
            // Applied in place; an accumulating note keeps accumulating.
            return Ok(Classified::element(
                None,
                Element::Command {
                    line: line_no,
                    command,
                },
            ));
        }

        if let Some(body) = trimmed.strip_prefix(DATE_MARKER) {
            let flushed = self.note.take();
            let mut parsed = Date::parse(line_no, indent_of(line), body)
                .map_err(|error| EngineError::parse(line_no, line, error.to_string()))?;
            parsed.gap = pending.take();
            return Ok(Classified::element(flushed, Element::Date(parsed)));
        }

        if trimmed.starts_with(ENTER_MARKER) {
            let flushed = self.note.take();
            let (tag, rest) = split_tag(trimmed);
            let mut parts = rest.split(DESCRIPTION_MARKER).map(str::trim);
            let name = parts.next().unwrap_or_default().to_string();
            let descriptions = parts.map(str::to_string).collect();
            return Ok(Classified::element(
                flushed,
                Element::Enter(element::Enter::new(
                    line_no,
                    pending.take(),
                    date.clone(),
                    line.to_string(),
                    tag.to_string(),
                    name,
                    descriptions,
                )),
            ));
        }

        if trimmed.starts_with(LEAVE_MARKER) {
            let flushed = self.note.take();
            let (tag, rest) = split_tag(trimmed);
            return Ok(Classified::element(
                flushed,
                Element::Leave(element::Leave::new(
                    line_no,
                    pending.take(),
                    date.clone(),
                    line.to_string(),
                    tag.to_string(),
                    rest.trim().to_string(),
                )),
            ));
        }

        if let Some(body) = trimmed.strip_prefix(DESCRIPTION_MARKER) {
            let flushed = self.note.take();
            let mut parts = body.split(DESCRIPTION_MARKER).map(str::trim);
            let name = parts.next().unwrap_or_default().to_string();
            let values = parts.map(str::to_string).collect();
            return Ok(Classified::element(
                flushed,
                Element::Description(element::Description {
                    line: line_no,
                    gap: pending.take(),
                    date: date.clone(),
                    text: line.to_string(),
                    name,
                    values,
                }),
            ));
        }

        if trimmed == ELLIPSIS_TOKEN {
            let flushed = self.note.take();
            *pending = Some(Gap::ellipsis(line_no, line.to_string()));
            return Ok(Classified::flush(flushed));
        }

        if in_list && is_item_line(trimmed) {
            let flushed = self.note.take();
            self.note = Some(Note::new(
                line_no,
                pending.take(),
                date.clone(),
                line.to_string(),
                NoteKind::Item,
            ));
            return Ok(Classified::flush(flushed));
        }

        match &mut self.note {
            Some(note) => note.push_line(line_no, line),
            None => {
                self.note = Some(Note::new(
                    line_no,
                    pending.take(),
                    date.clone(),
                    line.to_string(),
                    NoteKind::Free,
                ));
            }
        }
        Ok(Classified::flush(None))
    }

    /// Flushes the Note still accumulating at end of input.
    pub fn finish(&mut self) -> Option<Note> {
        self.note.take()
    }
}

/// Splits a marker line into its type tag and the remainder from the first
/// space on. `>label` with no space is all tag.
fn split_tag(trimmed: &str) -> (&str, &str) {
    match trimmed.find(' ') {
        Some(index) => (&trimmed[1..index], &trimmed[index..]),
        None => (&trimmed[1..], ""),
    }
}

/// A lone dash, or a dash followed by a space. Double dashes never reach
/// this point; the comment cut already removed them.
fn is_item_line(trimmed: &str) -> bool {
    let mut chars = trimmed.chars();
    chars.next() == Some(ITEM_MARKER) && matches!(chars.next(), None | Some(' '))
}
