//! Release parsing, scoring, validation, and selection (C1-C4, §4.1-§4.4).

pub mod parser;
pub mod scorer;
pub mod selection;
pub mod validator;

pub use parser::{is_season_pack_title, parse, ParseError, ParsedRelease};
pub use scorer::quality_score;
pub use selection::{SelectionConfig, SelectionEngine};
pub use validator::{levenshtein, title_similarity, Rejection, Thresholds, ValidationScore};
