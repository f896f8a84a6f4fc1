use std::collections::BTreeSet;

use crate::parsing::date::Date;

/// Width of the leading space run; tabs do not count.
pub fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// A blank line or an ellipsis line. At most one is held pending at a time
/// and attaches to the next element parsed; the filter also fabricates them
/// for separators (no source line) and omission markers.
#[derive(Debug, Clone, PartialEq)]
pub struct Gap {
    pub line: Option<u32>,
    pub text: String,
    pub indent: usize,
}

impl Gap {
    pub fn blank(line: u32) -> Self {
        Gap {
            line: Some(line),
            text: String::new(),
            indent: 0,
        }
    }

    /// An ellipsis line as it appeared in the source, indent preserved.
    pub fn ellipsis(line: u32, text: String) -> Self {
        let indent = indent_of(&text);
        Gap {
            line: Some(line),
            text,
            indent,
        }
    }

    /// An ellipsis standing in for omitted lines starting at `line`.
    pub fn omission(line: u32, indent: usize) -> Self {
        Gap {
            line: Some(line),
            text: format!("{}...", " ".repeat(indent)),
            indent,
        }
    }

    /// A blank line with no source counterpart; its sync line stays empty.
    pub fn separator() -> Self {
        Gap {
            line: None,
            text: String::new(),
            indent: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Clear the running date so chronology may restart.
    Reset,
}

/// Start of a named block: `>type name = description = ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct Enter {
    pub line: u32,
    pub gap: Option<Gap>,
    pub date: Date,
    pub text: String,
    pub kind: String,
    pub name: String,
    pub descriptions: Vec<String>,
    /// Set once the filter has written this block header out.
    pub printed: bool,
    /// Set when a closer matched this block but is held back by
    /// interleaved blocks; a waiting block matches no further closer.
    pub waiting: bool,
    /// Lines of pending closers to re-check when this block resolves.
    pub waited_by: Vec<u32>,
}

impl Enter {
    pub fn new(
        line: u32,
        gap: Option<Gap>,
        date: Date,
        text: String,
        kind: String,
        name: String,
        descriptions: Vec<String>,
    ) -> Self {
        Enter {
            line,
            gap,
            date,
            text,
            kind,
            name,
            descriptions,
            printed: false,
            waiting: false,
            waited_by: Vec::new(),
        }
    }
}

/// End of a block: `<type name`. Empty type or name matches any.
#[derive(Debug, Clone, PartialEq)]
pub struct Leave {
    pub line: u32,
    pub gap: Option<Gap>,
    pub date: Date,
    pub text: String,
    pub kind: String,
    pub name: String,
    /// The opener this closer resolved to, once known.
    pub enter_line: Option<u32>,
    /// Interleaved openers that must resolve before this closer prints.
    pub waiting_for: BTreeSet<u32>,
}

impl Leave {
    pub fn new(
        line: u32,
        gap: Option<Gap>,
        date: Date,
        text: String,
        kind: String,
        name: String,
    ) -> Self {
        Leave {
            line,
            gap,
            date,
            text,
            kind,
            name,
            enter_line: None,
            waiting_for: BTreeSet::new(),
        }
    }
}

/// Standalone metadata: `= name = value = ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct Description {
    pub line: u32,
    pub gap: Option<Gap>,
    pub date: Date,
    pub text: String,
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    Free,
    /// Dash-started entry of a list block; behaves as a note past
    /// classification.
    Item,
}

/// Multi-line free text. The display form keeps line breaks and indent;
/// the searchable form joins the physical lines with single spaces.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// One source line number per physical line, in order.
    pub lines: Vec<u32>,
    pub gap: Option<Gap>,
    pub date: Date,
    pub text: String,
    pub searchable: String,
    pub kind: NoteKind,
}

impl Note {
    pub fn new(line: u32, gap: Option<Gap>, date: Date, text: String, kind: NoteKind) -> Self {
        Note {
            lines: vec![line],
            gap,
            date,
            searchable: text.clone(),
            text,
            kind,
        }
    }

    pub fn push_line(&mut self, line: u32, text: &str) {
        self.text.push('\n');
        self.text.push_str(text);
        self.searchable.push(' ');
        self.searchable.push_str(text);
        self.lines.push(line);
    }

    pub fn first_line(&self) -> u32 {
        self.lines[0]
    }
}

/// One classified journal line (or accumulated note).
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Date(Date),
    Command { line: u32, command: Command },
    Enter(Enter),
    Leave(Leave),
    Description(Description),
    Note(Note),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn indent_counts_leading_spaces_only() {
        assert_eq!(indent_of("    foo"), 4);
        assert_eq!(indent_of("foo  "), 0);
        assert_eq!(indent_of(""), 0);
        assert_eq!(indent_of("\tfoo"), 0);
    }

    #[test]
    fn note_accumulates_display_searchable_and_lines() {
        let mut note = Note::new(10, None, Date::default(), "  first".into(), NoteKind::Free);
        note.push_line(11, "  second");
        note.push_line(12, "third");
        assert_eq!(note.text, "  first\n  second\nthird");
        assert_eq!(note.searchable, "  first   second third");
        assert_eq!(note.lines, vec![10, 11, 12]);
        assert_eq!(note.first_line(), 10);
    }

    #[test]
    fn omission_gap_renders_dots_at_indent() {
        let gap = Gap::omission(7, 2);
        assert_eq!(gap.text, "  ...");
        assert_eq!(gap.line, Some(7));
        assert_eq!(gap.indent, 2);
    }

    #[test]
    fn separator_gap_has_no_source_line() {
        let gap = Gap::separator();
        assert_eq!(gap.line, None);
        assert_eq!(gap.text, "");
    }
}
