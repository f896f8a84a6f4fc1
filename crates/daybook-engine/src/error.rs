/// Errors raised while traversing a journal.
///
/// Both variants are fatal and deterministic: the same input always fails at
/// the same line, and there is no partial-success mode. Callers discard any
/// output produced before the failure.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A line that carries a marker but cannot be parsed.
    #[error("line {line}: cannot parse {text:?}: {reason}")]
    Parse {
        line: u32,
        text: String,
        reason: String,
    },
    /// A line that parses but contradicts the journal structure.
    #[error("line {line}: {reason}")]
    Structure { line: u32, reason: String },
}

impl EngineError {
    pub(crate) fn parse(line: u32, text: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            line,
            text: text.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn structure(line: u32, reason: impl Into<String>) -> Self {
        Self::Structure {
            line,
            reason: reason.into(),
        }
    }
}
