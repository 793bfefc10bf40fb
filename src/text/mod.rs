pub mod aliases;
pub mod normalizer;
pub mod sentences;

pub use aliases::AliasMap;
pub use normalizer::normalize;
pub use sentences::{PunctuationSplitter, SentenceSplitter, UnicodeSentenceSplitter};

// Module-level constants
pub const TARGET_TEXT: &str = "text_prep";
