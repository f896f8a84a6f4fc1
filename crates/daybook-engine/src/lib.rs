pub mod error;
pub mod filter;
pub mod list;
pub mod parsing;
pub mod similarity;
pub mod traverse;

// Re-export the surface the CLI works against.
pub use chrono::Locale;
pub use error::EngineError;
pub use filter::{run_filter, FilterOptions, FilterOutput, MatchEntry};
pub use list::{next_date, open_blocks};
pub use parsing::date::resolve_locale;
pub use traverse::registry::MatchRules;
