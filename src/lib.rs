pub mod environment;
pub mod linking;
pub mod logging;
pub mod records;
pub mod similarity;
pub mod text;

pub use linking::{LinkedPatient, Pipeline, PipelineConfig};
