mod emit;

use std::collections::BTreeSet;

use chrono::Locale;

use crate::error::EngineError;
use crate::parsing::date::Date;
use crate::parsing::element::{indent_of, Description, Enter, Leave, Note};
use crate::similarity::partial_ratio;
use crate::traverse::registry::{Block, MatchRules};
use crate::traverse::{traverse, Handler, LastParsed, Traversal};
use emit::Emitter;

/// Knobs of one filter pass, normally taken from the settings file plus the
/// command line.
#[derive(Debug, Clone)]
pub struct FilterOptions {
    pub term: String,
    /// Minimum similarity score of a match; 0 matches everything, 100 only
    /// near-exact occurrences.
    pub tolerance: u8,
    pub case_sensitive_search: bool,
    pub case_sensitive_leave: bool,
    /// Locale for rendered weekday names.
    pub locale: Locale,
}

impl Default for FilterOptions {
    fn default() -> Self {
        FilterOptions {
            term: String::new(),
            tolerance: 75,
            case_sensitive_search: false,
            case_sensitive_leave: false,
            locale: Locale::POSIX,
        }
    }
}

/// One matched name with an attached description, collected for the excerpt
/// header. Lower priority means a closer match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEntry {
    pub priority: u8,
    pub name: String,
    pub line: u32,
    pub text: String,
}

/// The reduced excerpt, its line mapping, and the sorted match summary.
#[derive(Debug)]
pub struct FilterOutput {
    pub content: String,
    pub sync: String,
    pub matches: Vec<MatchEntry>,
}

/// Runs one filter pass over a whole journal.
///
/// # Arguments
///
/// * `input` - the journal text.
/// * `options` - term, tolerance, case folding and locale.
///
/// # Errors
///
/// Any parse or structure error aborts the pass; output produced up to that
/// point must be discarded.
pub fn run_filter(input: &str, options: &FilterOptions) -> Result<FilterOutput, EngineError> {
    let mut filter = Filter::new(options);
    traverse(
        input,
        None,
        MatchRules {
            case_sensitive_leave: options.case_sensitive_leave,
        },
        &mut filter,
    )?;
    let output = filter.finish();
    log::debug!(
        "term {:?}: {} content lines, {} summary entries",
        options.term,
        output.content.lines().count(),
        output.matches.len()
    );
    Ok(output)
}

struct Filter {
    term: String,
    tolerance: u8,
    case_sensitive: bool,
    locale: Locale,
    emitter: Emitter,
    /// Lines of open blocks whose name matched; while non-empty, everything
    /// prints.
    matched_blocks: BTreeSet<u32>,
    /// Set while the current day's date itself matched; the whole day
    /// prints.
    matched_date: bool,
    matches: Vec<MatchEntry>,
}

impl Filter {
    fn new(options: &FilterOptions) -> Self {
        let term = if options.case_sensitive_search {
            options.term.clone()
        } else {
            options.term.to_lowercase()
        };
        Filter {
            term,
            tolerance: options.tolerance,
            case_sensitive: options.case_sensitive_search,
            locale: options.locale,
            emitter: Emitter::new(options.locale),
            matched_blocks: BTreeSet::new(),
            matched_date: false,
            matches: Vec::new(),
        }
    }

    /// Match priority of `text` against the term: 0 for no match, else
    /// `101 - ratio` so that better matches sort first.
    fn score(&self, text: &str) -> u8 {
        let ratio = if self.case_sensitive {
            partial_ratio(&self.term, text)
        } else {
            partial_ratio(&self.term, &text.to_lowercase())
        };
        if ratio >= self.tolerance {
            101 - ratio
        } else {
            0
        }
    }

    /// Prints every still-open unprinted Enter and every pending Leave in
    /// registry order, then drops the resolved pairs. This is the context
    /// shown before an isolated match.
    fn flush_structure(&mut self, traversal: &mut Traversal) {
        let mut printed_now: Vec<u32> = Vec::new();
        let mut resolved: Vec<(u32, Option<u32>)> = Vec::new();
        for line in traversal.registry.lines() {
            match traversal.registry.get(line) {
                Some(Block::Open(enter)) if !enter.printed => {
                    self.emitter.ellipsed_dated(enter);
                    printed_now.push(line);
                }
                Some(Block::Pending(pending)) => {
                    self.emitter.ellipsed_dated(pending);
                    resolved.push((line, pending.enter_line));
                }
                _ => {}
            }
        }
        for line in printed_now {
            if let Some(enter) = traversal.registry.open_mut(line) {
                enter.printed = true;
            }
        }
        for (leave_line, enter_line) in resolved {
            traversal.registry.remove(leave_line);
            if let Some(enter_line) = enter_line {
                traversal.registry.remove(enter_line);
                self.matched_blocks.remove(&enter_line);
            }
        }
    }

    fn finish(mut self) -> FilterOutput {
        self.emitter.flush_remaining();
        self.matches
            .sort_by(|a, b| (a.priority, &a.name, a.line).cmp(&(b.priority, &b.name, b.line)));
        FilterOutput {
            content: self.emitter.content,
            sync: self.emitter.sync,
            matches: self.matches,
        }
    }
}

impl Handler for Filter {
    fn on_date(&mut self, traversal: &mut Traversal, date: &Date) {
        // Two consecutive date lines keep the first one's blank so the
        // excerpt does not glue the days together.
        let keep_gap = match &traversal.last_parsed {
            Some(LastParsed::Date(previous)) => previous.is_after(&self.emitter.date_printed),
            _ => false,
        };
        traversal.date = traversal.date.merged(date, keep_gap);
        let rendered = traversal.date.render(self.locale);
        if self.score(&rendered) > 0 {
            if self.matched_date || !self.matched_blocks.is_empty() {
                self.emitter.spaced(&traversal.date);
            } else {
                self.flush_structure(traversal);
                self.emitter.ellipsed(&traversal.date);
            }
            self.emitter.date_printed = traversal.date.clone();
            self.matched_date = true;
        } else {
            self.matched_date = false;
        }
    }

    fn on_enter(&mut self, traversal: &mut Traversal, enter: &mut Enter) {
        // The name is scored even in matched mode: overlapping blocks each
        // carry their own descriptions for the summary.
        let distance = self.score(&enter.name);
        if self.matched_date {
            self.emitter.spaced(enter);
            enter.printed = true;
        } else if !self.matched_blocks.is_empty() {
            self.emitter.spaced_dated(enter);
            enter.printed = true;
        } else if distance > 0 || self.score(&enter.text) > 0 {
            self.flush_structure(traversal);
            self.emitter.ellipsed_dated(enter);
            enter.printed = true;
        }
        if distance > 0 {
            for description in &enter.descriptions {
                self.matches.push(MatchEntry {
                    priority: distance,
                    name: enter.name.clone(),
                    line: enter.line,
                    text: description.clone(),
                });
            }
            self.matched_blocks.insert(enter.line);
        }
    }

    fn on_leave_matched(&mut self, traversal: &mut Traversal, leave: Leave, enter_line: u32) {
        let printed = traversal
            .registry
            .open(enter_line)
            .map(|enter| enter.printed)
            .unwrap_or(false);

        if !printed {
            // Nothing of this block was shown: drop the pair, remember its
            // range, and resolve any closer that was only waiting for it.
            let waited_by = match traversal.registry.remove(enter_line) {
                Some(Block::Open(enter)) => {
                    self.emitter
                        .record_omitted_sorted(enter.line, indent_of(&enter.text));
                    enter.waited_by
                }
                _ => Vec::new(),
            };
            self.emitter
                .record_omitted(leave.line, indent_of(&leave.text));
            for waiting_line in waited_by {
                let freed = match traversal.registry.pending_mut(waiting_line) {
                    Some(pending) => {
                        pending.waiting_for.remove(&enter_line);
                        pending.waiting_for.is_empty()
                    }
                    None => false,
                };
                if freed {
                    if let Some(Block::Pending(resolved)) = traversal.registry.remove(waiting_line)
                    {
                        if let Some(resolved_enter) = resolved.enter_line {
                            traversal.registry.remove(resolved_enter);
                            self.matched_blocks.remove(&resolved_enter);
                        }
                        self.emitter.ellipsed_dated(&resolved);
                    }
                }
            }
            return;
        }

        if leave.waiting_for.is_empty() {
            traversal.registry.remove(enter_line);
            if self.matched_date {
                self.emitter.spaced(&leave);
            } else if !self.matched_blocks.is_empty() {
                self.emitter.spaced_dated(&leave);
            } else {
                self.emitter.ellipsed_dated(&leave);
            }
            self.matched_blocks.remove(&enter_line);
            return;
        }

        // The block was shown but interleaved blocks are still unresolved:
        // park the closer until the last of them goes away.
        if let Some(enter) = traversal.registry.open_mut(enter_line) {
            enter.waiting = true;
        }
        let mut parked = leave;
        parked.enter_line = Some(enter_line);
        let interleaved: Vec<u32> = parked.waiting_for.iter().copied().collect();
        for line in interleaved {
            if let Some(enter) = traversal.registry.open_mut(line) {
                enter.waited_by.push(parked.line);
            }
        }
        traversal.registry.insert_pending(parked);
    }

    fn on_leave_nonmatched(&mut self, traversal: &mut Traversal, leave: &mut Leave, enter_line: u32) {
        // Whether this scanned-past block becomes a dependency is only known
        // once the matching Enter turns up, so just collect it for now.
        let eligible = traversal
            .registry
            .open(enter_line)
            .map(|enter| !enter.printed && !enter.waiting)
            .unwrap_or(false);
        if eligible {
            leave.waiting_for.insert(enter_line);
        }
    }

    fn on_description(&mut self, traversal: &mut Traversal, description: Description) {
        let distance = self.score(&description.name);
        if self.matched_date {
            self.emitter.spaced(&description);
        } else if !self.matched_blocks.is_empty() {
            self.emitter.spaced_dated(&description);
        } else if distance > 0 || self.score(&description.text) > 0 {
            self.flush_structure(traversal);
            self.emitter.ellipsed_dated(&description);
        } else {
            self.emitter
                .record_omitted(description.line, indent_of(&description.text));
        }
        if distance > 0 {
            for value in &description.values {
                self.matches.push(MatchEntry {
                    priority: distance,
                    name: description.name.clone(),
                    line: description.line,
                    text: value.clone(),
                });
            }
        }
    }

    fn on_note(&mut self, traversal: &mut Traversal, note: Note) {
        if self.matched_date {
            self.emitter.spaced(&note);
        } else if !self.matched_blocks.is_empty() {
            self.emitter.spaced_dated(&note);
        } else if self.score(&note.searchable) > 0 {
            self.flush_structure(traversal);
            self.emitter.ellipsed_dated(&note);
        } else {
            self.emitter
                .record_omitted(note.first_line(), indent_of(&note.text));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn filter(input: &str, term: &str) -> FilterOutput {
        let options = FilterOptions {
            term: term.into(),
            ..FilterOptions::default()
        };
        match run_filter(input, &options) {
            Ok(output) => output,
            Err(error) => panic!("unexpected error: {error}"),
        }
    }

    #[test]
    fn matching_block_prints_with_full_context() {
        let output = filter(
            "# 1.1.2024\n>project Alpha\nnote about alpha\n<project Alpha",
            "alpha",
        );
        assert_eq!(
            output.content,
            "# 1.1.2024 --Monday\n>project Alpha\nnote about alpha\n<project Alpha\n"
        );
        assert_eq!(output.sync, "1\n2\n3\n4\n");
    }

    #[test]
    fn nothing_matching_leaves_a_single_ellipsis() {
        let output = filter(
            "# 1.1.2024\n>project Alpha\nnote about alpha\n<project Alpha",
            "zzz",
        );
        assert_eq!(output.content, "...\n");
        assert_eq!(output.sync, "2\n");
        assert_eq!(output.matches, Vec::<MatchEntry>::new());
    }

    #[test]
    fn matched_date_prints_the_whole_day() {
        let output = filter(
            "# 1.1.2024\nsome morning note\n\n>task errand\n<task errand",
            "1.1.2024",
        );
        assert_eq!(
            output.content,
            "# 1.1.2024 --Monday\nsome morning note\n\n>task errand\n<task errand\n"
        );
        assert_eq!(output.sync, "1\n2\n3\n4\n5\n");
    }

    #[test]
    fn empty_term_reproduces_the_day_verbatim() {
        let output = filter("# 1.1.2024\n\n>task errand\nnote\n<task errand", "");
        assert_eq!(
            output.content,
            "# 1.1.2024 --Monday\n\n>task errand\nnote\n<task errand\n"
        );
        assert_eq!(output.sync, "1\n2\n3\n4\n5\n");
    }

    #[test]
    fn interleaved_close_parks_until_dependencies_resolve() {
        let output = filter(
            ">outer alpha\n>task beta\n<outer alpha\n<task beta",
            "outer",
        );
        // The opener matched by text; its closer waits for the quiet task
        // block, which resolves silently into the ellipsis.
        assert_eq!(output.content, ">outer alpha\n...\n<outer alpha\n...\n");
        assert_eq!(output.sync, "1\n2\n3\n4\n");
    }

    #[test]
    fn descriptions_collect_into_the_sorted_summary() {
        let output = filter(
            "# 1.1.2024\n>project Alpha = kickoff meeting = prep notes\n= alpha = details here\n<project Alpha",
            "alpha",
        );
        assert_eq!(
            output.matches,
            vec![
                MatchEntry {
                    priority: 1,
                    name: "Alpha".into(),
                    line: 2,
                    text: "kickoff meeting".into(),
                },
                MatchEntry {
                    priority: 1,
                    name: "Alpha".into(),
                    line: 2,
                    text: "prep notes".into(),
                },
                MatchEntry {
                    priority: 1,
                    name: "alpha".into(),
                    line: 3,
                    text: "details here".into(),
                },
            ]
        );
    }

    #[test]
    fn structure_errors_propagate() {
        let options = FilterOptions::default();
        match run_filter("<task gamma", &options) {
            Err(EngineError::Structure { line, .. }) => assert_eq!(line, 1),
            other => panic!("expected a structure error, got {other:?}"),
        }
    }
}
