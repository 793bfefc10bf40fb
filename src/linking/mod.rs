pub mod anchors;
pub mod chunks;
pub mod core_name;
pub mod patients;
pub mod pipeline;

pub use anchors::{locate_anchors, DrugAnchor};
pub use chunks::{chunk_ranges, trim_trailing_word, DiscussionChunk};
pub use core_name::extract_core;
pub use patients::{match_patients, patient_score, PatientMatch};
pub use pipeline::{LinkedPatient, Pipeline, PipelineConfig};

// Module-level constants
pub const TARGET_LINK: &str = "patient_link";
