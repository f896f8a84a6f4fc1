use chrono::Locale;

use crate::parsing::date::Date;
use crate::parsing::element::{indent_of, Description, Enter, Gap, Leave, Note};

/// Emitted element category, the granularity at which separator rules and
/// blank-line suppression operate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EmittedKind {
    Gap,
    Date,
    Enter,
    Leave,
    Description,
    Note,
}

/// Pairs that must stay visually separated in the excerpt even when the
/// source had no blank line between them; otherwise unrelated matches would
/// read as one paragraph.
fn forces_break(previous: EmittedKind, next: EmittedKind) -> bool {
    use EmittedKind::*;
    matches!(
        (previous, next),
        (Note, Note)
            | (Note, Enter)
            | (Note, Date)
            | (Note, Description)
            | (Leave, Note)
            | (Description, Note)
    )
}

/// Anything the filter can write into the excerpt: one or more content
/// lines, each with a parallel sync line.
pub(crate) trait Emittable {
    /// Source line, used to decide which omitted ranges precede it.
    /// Synthesized separators have none and return 0; they are never
    /// consulted.
    fn line(&self) -> u32;
    fn indent(&self) -> usize;
    fn gap(&self) -> Option<&Gap>;
    fn date(&self) -> Option<&Date>;
    fn kind(&self) -> EmittedKind;
    fn write(&self, content: &mut String, sync: &mut String, locale: Locale);
}

fn push_pair(content: &mut String, sync: &mut String, text: &str, line: Option<u32>) {
    content.push_str(text);
    content.push('\n');
    if let Some(line) = line {
        sync.push_str(&line.to_string());
    }
    sync.push('\n');
}

impl Emittable for Gap {
    fn line(&self) -> u32 {
        self.line.unwrap_or(0)
    }

    fn indent(&self) -> usize {
        self.indent
    }

    fn gap(&self) -> Option<&Gap> {
        None
    }

    fn date(&self) -> Option<&Date> {
        None
    }

    fn kind(&self) -> EmittedKind {
        EmittedKind::Gap
    }

    fn write(&self, content: &mut String, sync: &mut String, _locale: Locale) {
        push_pair(content, sync, &self.text, self.line);
    }
}

impl Emittable for Date {
    fn line(&self) -> u32 {
        self.line
    }

    fn indent(&self) -> usize {
        self.indent
    }

    fn gap(&self) -> Option<&Gap> {
        self.gap.as_ref()
    }

    fn date(&self) -> Option<&Date> {
        None
    }

    fn kind(&self) -> EmittedKind {
        EmittedKind::Date
    }

    fn write(&self, content: &mut String, sync: &mut String, locale: Locale) {
        push_pair(content, sync, &self.render(locale), Some(self.line));
    }
}

impl Emittable for Enter {
    fn line(&self) -> u32 {
        self.line
    }

    fn indent(&self) -> usize {
        indent_of(&self.text)
    }

    fn gap(&self) -> Option<&Gap> {
        self.gap.as_ref()
    }

    fn date(&self) -> Option<&Date> {
        Some(&self.date)
    }

    fn kind(&self) -> EmittedKind {
        EmittedKind::Enter
    }

    fn write(&self, content: &mut String, sync: &mut String, _locale: Locale) {
        push_pair(content, sync, &self.text, Some(self.line));
    }
}

impl Emittable for Leave {
    fn line(&self) -> u32 {
        self.line
    }

    fn indent(&self) -> usize {
        indent_of(&self.text)
    }

    fn gap(&self) -> Option<&Gap> {
        self.gap.as_ref()
    }

    fn date(&self) -> Option<&Date> {
        Some(&self.date)
    }

    fn kind(&self) -> EmittedKind {
        EmittedKind::Leave
    }

    fn write(&self, content: &mut String, sync: &mut String, _locale: Locale) {
        push_pair(content, sync, &self.text, Some(self.line));
    }
}

impl Emittable for Description {
    fn line(&self) -> u32 {
        self.line
    }

    fn indent(&self) -> usize {
        indent_of(&self.text)
    }

    fn gap(&self) -> Option<&Gap> {
        self.gap.as_ref()
    }

    fn date(&self) -> Option<&Date> {
        Some(&self.date)
    }

    fn kind(&self) -> EmittedKind {
        EmittedKind::Description
    }

    fn write(&self, content: &mut String, sync: &mut String, _locale: Locale) {
        push_pair(content, sync, &self.text, Some(self.line));
    }
}

impl Emittable for Note {
    fn line(&self) -> u32 {
        self.first_line()
    }

    fn indent(&self) -> usize {
        indent_of(&self.text)
    }

    fn gap(&self) -> Option<&Gap> {
        self.gap.as_ref()
    }

    fn date(&self) -> Option<&Date> {
        Some(&self.date)
    }

    fn kind(&self) -> EmittedKind {
        EmittedKind::Note
    }

    fn write(&self, content: &mut String, sync: &mut String, _locale: Locale) {
        for (text, line) in self.text.split('\n').zip(&self.lines) {
            push_pair(content, sync, text, Some(*line));
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LastEmitted {
    kind: EmittedKind,
    indent: usize,
}

/// Writes the excerpt and its sync stream. Owns the blank-line heuristics,
/// the omitted-range bookkeeping, and the "date header before an element
/// from a newer day" logic.
#[derive(Debug)]
pub(crate) struct Emitter {
    pub(crate) content: String,
    pub(crate) sync: String,
    pub(crate) date_printed: Date,
    last: Option<LastEmitted>,
    omitted: Vec<(u32, usize)>,
    locale: Locale,
}

impl Emitter {
    pub(crate) fn new(locale: Locale) -> Self {
        Emitter {
            content: String::new(),
            sync: String::new(),
            date_printed: Date::default(),
            last: None,
            omitted: Vec::new(),
            locale,
        }
    }

    /// Writes the element, nothing else.
    pub(crate) fn atom(&mut self, element: &dyn Emittable) {
        element.write(&mut self.content, &mut self.sync, self.locale);
        self.last = Some(LastEmitted {
            kind: element.kind(),
            indent: element.indent(),
        });
    }

    /// Writes the element, preceded by a separator when the adjacency rules
    /// demand one: the element's own blank line when it has one, a
    /// synthesized blank otherwise.
    pub(crate) fn with_break(&mut self, element: &dyn Emittable) {
        let forced = self
            .last
            .map(|last| forces_break(last.kind, element.kind()))
            .unwrap_or(false);
        if forced {
            match element.gap() {
                Some(gap) => self.atom(gap),
                None => self.atom(&Gap::separator()),
            }
        }
        self.atom(element);
    }

    /// Writes the element preceded by its own blank line, unless the
    /// previous output line was already blank (or an ellipsis).
    pub(crate) fn spaced(&mut self, element: &dyn Emittable) {
        let after_gap = matches!(
            self.last,
            Some(LastEmitted {
                kind: EmittedKind::Gap,
                ..
            })
        );
        if !after_gap {
            if let Some(gap) = element.gap() {
                self.atom(gap);
            }
        }
        self.atom(element);
    }

    /// Writes the element, flushing an ellipsis first if anything was
    /// omitted strictly before its line.
    pub(crate) fn ellipsed(&mut self, element: &dyn Emittable) {
        self.flush_omitted_before(element.line());
        self.with_break(element);
    }

    pub(crate) fn spaced_dated(&mut self, element: &dyn Emittable) {
        if let Some(date) = self.context_date(element) {
            self.spaced(&date);
            self.date_printed = date;
        }
        self.spaced(element);
    }

    pub(crate) fn ellipsed_dated(&mut self, element: &dyn Emittable) {
        if let Some(date) = self.context_date(element) {
            self.ellipsed(&date);
            self.date_printed = date;
        }
        self.ellipsed(element);
    }

    /// The element's captured date, prepared for printing before it, or
    /// `None` when the excerpt is already on that day. The date line adopts
    /// the deeper of the element's and the previous output line's indent so
    /// it reads as a header for both.
    fn context_date(&self, element: &dyn Emittable) -> Option<Date> {
        let date = element.date()?;
        if !date.is_after(&self.date_printed) {
            return None;
        }
        let mut adjusted = date.clone();
        adjusted.indent = match self.last {
            Some(last) => element.indent().max(last.indent),
            None => element.indent(),
        };
        Some(adjusted)
    }

    /// Records a skipped element, in source order.
    pub(crate) fn record_omitted(&mut self, line: u32, indent: usize) {
        self.omitted.push((line, indent));
    }

    /// Records a skipped element out of order (an opener recorded at its
    /// closer's position).
    pub(crate) fn record_omitted_sorted(&mut self, line: u32, indent: usize) {
        let at = self.omitted.partition_point(|&entry| entry <= (line, indent));
        self.omitted.insert(at, (line, indent));
    }

    /// Emits one ellipsis covering every omitted range before `line`,
    /// carrying the first omitted line number and the deepest indent among
    /// the consumed ranges.
    fn flush_omitted_before(&mut self, line: u32) {
        let cut = self.omitted.partition_point(|&(omitted, _)| omitted < line);
        if cut == 0 {
            return;
        }
        let first = self.omitted[0].0;
        let indent = self.omitted[..cut]
            .iter()
            .map(|&(_, indent)| indent)
            .max()
            .unwrap_or(0);
        self.omitted.drain(..cut);
        self.atom(&Gap::omission(first, indent));
    }

    /// Emits the trailing ellipsis for everything omitted after the last
    /// printed element.
    pub(crate) fn flush_remaining(&mut self) {
        if self.omitted.is_empty() {
            return;
        }
        let first = self.omitted[0].0;
        let indent = self
            .omitted
            .iter()
            .map(|&(_, indent)| indent)
            .max()
            .unwrap_or(0);
        self.omitted.clear();
        self.atom(&Gap::omission(first, indent));
    }
}
