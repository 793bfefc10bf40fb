use serde::{Deserialize, Serialize};

/// One medication line from the structured export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationRecord {
    // Line as exported, without the status flag
    pub raw_line: String,

    // First field: the medication name
    pub clean_name: String,

    // Second field: usage instructions
    pub usage: String,

    // Free-text note on the following line, empty when absent
    pub note: String,
}

/// A patient from the structured export with the current medication list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredPatientRecord {
    pub name: String,

    // dd-mm-yyyy, or empty when the header could not be parsed
    pub birth_date: String,

    pub medications: Vec<MedicationRecord>,
}

/// The parsed structured export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredExport {
    /// Ward or department named in the export preamble.
    pub department: Option<String>,
    pub patients: Vec<StructuredPatientRecord>,
}

/// A patient block from the free-text archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeTextPatientBlock {
    pub name: String,
    pub birth_date: String,

    // Renal function annotation, verbatim
    pub gfr_text: Option<String>,

    // Trimmed, non-blank lines; line 0 is the block header
    pub lines: Vec<String>,
}

impl FreeTextPatientBlock {
    pub fn has_identity(&self) -> bool {
        !self.name.trim().is_empty() || !self.birth_date.trim().is_empty()
    }
}
