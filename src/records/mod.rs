pub mod free_text;
pub mod structured;
pub mod types;

pub use free_text::parse_free_text;
pub use structured::parse_structured;
pub use types::*;

// Module-level constants
pub const TARGET_PARSE: &str = "record_parse";
