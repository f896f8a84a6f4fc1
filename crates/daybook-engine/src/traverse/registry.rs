use std::collections::BTreeMap;

use crate::parsing::element::{Enter, Leave};

/// A tracked block: either still open, or a closer parked until the blocks
/// it interleaves with resolve.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Open(Enter),
    Pending(Leave),
}

/// Open and pending blocks keyed by source line, iterated in line order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    blocks: BTreeMap<u32, Block>,
}

impl Registry {
    pub fn insert_open(&mut self, enter: Enter) {
        self.blocks.insert(enter.line, Block::Open(enter));
    }

    pub fn insert_pending(&mut self, leave: Leave) {
        self.blocks.insert(leave.line, Block::Pending(leave));
    }

    pub fn remove(&mut self, line: u32) -> Option<Block> {
        self.blocks.remove(&line)
    }

    pub fn get(&self, line: u32) -> Option<&Block> {
        self.blocks.get(&line)
    }

    pub fn open(&self, line: u32) -> Option<&Enter> {
        match self.blocks.get(&line) {
            Some(Block::Open(enter)) => Some(enter),
            _ => None,
        }
    }

    pub fn open_mut(&mut self, line: u32) -> Option<&mut Enter> {
        match self.blocks.get_mut(&line) {
            Some(Block::Open(enter)) => Some(enter),
            _ => None,
        }
    }

    pub fn pending_mut(&mut self, line: u32) -> Option<&mut Leave> {
        match self.blocks.get_mut(&line) {
            Some(Block::Pending(leave)) => Some(leave),
            _ => None,
        }
    }

    /// All tracked lines, oldest first.
    pub fn lines(&self) -> Vec<u32> {
        self.blocks.keys().copied().collect()
    }

    /// Lines of open blocks only, newest first: the closer scan order.
    pub fn open_lines_rev(&self) -> Vec<u32> {
        self.blocks
            .iter()
            .rev()
            .filter_map(|(line, block)| match block {
                Block::Open(_) => Some(*line),
                Block::Pending(_) => None,
            })
            .collect()
    }

    /// The newest open block a wildcard closer would resolve to, if any.
    pub fn innermost_open(&self) -> Option<&Enter> {
        self.blocks.values().rev().find_map(|block| match block {
            Block::Open(enter) if !enter.waiting => Some(enter),
            _ => None,
        })
    }

    /// Open blocks oldest first, for listing.
    pub fn open_blocks(&self) -> impl Iterator<Item = &Enter> {
        self.blocks.values().filter_map(|block| match block {
            Block::Open(enter) => Some(enter),
            Block::Pending(_) => None,
        })
    }
}

/// Decides whether a closer resolves a given open block.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchRules {
    pub case_sensitive_leave: bool,
}

impl MatchRules {
    /// An empty closer name or type is a wildcard. A non-empty name must
    /// occur as a substring of the block's name; a non-empty type must match
    /// it exactly. Blocks already claimed by a waiting closer never match.
    pub fn matches(&self, enter: &Enter, leave: &Leave) -> bool {
        if enter.waiting {
            return false;
        }
        if !leave.name.is_empty() {
            let found = if self.case_sensitive_leave {
                enter.name.contains(&leave.name)
            } else {
                enter.name.to_lowercase().contains(&leave.name.to_lowercase())
            };
            if !found {
                return false;
            }
        }
        leave.kind.is_empty() || leave.kind == enter.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::date::Date;
    use pretty_assertions::assert_eq;

    fn enter(line: u32, kind: &str, name: &str) -> Enter {
        Enter::new(
            line,
            None,
            Date::default(),
            format!(">{kind} {name}"),
            kind.into(),
            name.into(),
            Vec::new(),
        )
    }

    fn leave(line: u32, kind: &str, name: &str) -> Leave {
        Leave::new(
            line,
            None,
            Date::default(),
            format!("<{kind} {name}"),
            kind.into(),
            name.into(),
        )
    }

    #[test]
    fn closer_scan_order_is_newest_first_and_skips_pending() {
        let mut registry = Registry::default();
        registry.insert_open(enter(1, "project", "alpha"));
        registry.insert_open(enter(3, "task", "beta"));
        registry.insert_pending(leave(5, "project", "alpha"));
        assert_eq!(registry.open_lines_rev(), vec![3, 1]);
        assert_eq!(registry.lines(), vec![1, 3, 5]);
    }

    #[test]
    fn innermost_open_skips_waiting_blocks() {
        let mut registry = Registry::default();
        registry.insert_open(enter(1, "-shopping", "market"));
        let mut waiting = enter(3, "task", "beta");
        waiting.waiting = true;
        registry.insert_open(waiting);
        let innermost = match registry.innermost_open() {
            Some(found) => found,
            None => panic!("expected an open block"),
        };
        assert_eq!(innermost.line, 1);
    }

    #[test]
    fn empty_filters_match_any_block() {
        let rules = MatchRules::default();
        assert!(rules.matches(&enter(1, "project", "alpha"), &leave(2, "", "")));
    }

    #[test]
    fn name_filter_is_a_substring_match() {
        let rules = MatchRules::default();
        let open = enter(1, "project", "Winter Cleanup");
        assert!(rules.matches(&open, &leave(2, "", "cleanup")));
        assert!(rules.matches(&open, &leave(2, "", "Winter Clean")));
        assert!(!rules.matches(&open, &leave(2, "", "summer")));
    }

    #[test]
    fn name_filter_respects_case_sensitivity_setting() {
        let rules = MatchRules {
            case_sensitive_leave: true,
        };
        let open = enter(1, "project", "Winter Cleanup");
        assert!(!rules.matches(&open, &leave(2, "", "cleanup")));
        assert!(rules.matches(&open, &leave(2, "", "Cleanup")));
    }

    #[test]
    fn type_filter_is_exact() {
        let rules = MatchRules::default();
        let open = enter(1, "project", "alpha");
        assert!(rules.matches(&open, &leave(2, "project", "")));
        assert!(!rules.matches(&open, &leave(2, "proj", "")));
    }

    #[test]
    fn waiting_blocks_never_match() {
        let rules = MatchRules::default();
        let mut open = enter(1, "project", "alpha");
        open.waiting = true;
        assert!(!rules.matches(&open, &leave(2, "project", "alpha")));
    }
}
