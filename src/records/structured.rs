//! Parser for the structured medication export.
//!
//! The export is plain text. An optional preamble names the department, then
//! every patient starts with a header line such as `Mevr. M Curie (07-11-1942)`
//! followed by medication lines:
//!
//! ```text
//! C   Paracetamol tablet 500mg  1-0-0, Continu
//! Z   Macrogol/zouten drank  zo nodig
//!     bij obstipatie
//! ```
//!
//! A medication line carries a one-letter status flag, then fields separated by
//! two or more spaces or tabs. A line following a medication that is neither a
//! medication line nor a patient header is that medication's note.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

use super::types::{MedicationRecord, StructuredExport, StructuredPatientRecord};
use super::TARGET_PARSE;
use crate::text::normalizer::fold_diacritics;

const PATIENT_TITLES: &[&str] = &["Dhr. ", "Mevr. "];

lazy_static! {
    static ref DEPARTMENT: Regex =
        Regex::new(r"Een overzicht van alle actieve medicatie in afdeling (.+?)\.")
            .expect("department pattern is valid");
    static ref PATIENT_HEADER: Regex =
        Regex::new(r"(Mevr\.|Dhr\.)\s+([^(]+)\((\d{2}-\d{2}-\d{4})\)")
            .expect("patient header pattern is valid");
    static ref MEDICATION_LINE: Regex =
        Regex::new(r"^[CZ]\s+(.+)$").expect("medication line pattern is valid");
    static ref FIELD_SEPARATOR: Regex =
        Regex::new(r"\s{2,}|\t+").expect("field separator pattern is valid");
    static ref PARENTHESIZED: Regex = Regex::new(r"\(.*?\)").expect("parenthesis pattern is valid");
}

/// Parse the complete structured export.
pub fn parse_structured(content: &str) -> StructuredExport {
    let department = DEPARTMENT
        .captures(content)
        .map(|caps| caps[1].trim().to_string());

    let patients: Vec<StructuredPatientRecord> = split_patient_blocks(content)
        .iter()
        .map(|block| parse_patient_block(block))
        .collect();

    let medication_count: usize = patients.iter().map(|p| p.medications.len()).sum();
    info!(
        target: TARGET_PARSE,
        "Structured export: {} patients, {} medications, department {}",
        patients.len(),
        medication_count,
        department.as_deref().unwrap_or("unknown")
    );

    StructuredExport {
        department,
        patients,
    }
}

fn is_patient_header(line: &str) -> bool {
    PATIENT_TITLES.iter().any(|title| line.starts_with(title))
}

fn split_patient_blocks(content: &str) -> Vec<Vec<&str>> {
    let mut blocks: Vec<Vec<&str>> = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if is_patient_header(line) {
            blocks.push(vec![line]);
        } else if let Some(block) = blocks.last_mut() {
            block.push(line);
        }
    }

    blocks
}

/// Parse one patient block; `lines[0]` is the header line.
fn parse_patient_block(lines: &[&str]) -> StructuredPatientRecord {
    let header = lines.first().copied().unwrap_or_default();

    let (name, birth_date) = match PATIENT_HEADER.captures(header) {
        Some(caps) => (
            format!("{} {}", &caps[1], caps[2].trim()),
            caps[3].to_string(),
        ),
        None => {
            warn!(
                target: TARGET_PARSE,
                "Could not parse patient header '{}', keeping it as the name", header
            );
            (header.to_string(), String::new())
        }
    };

    let mut medications = Vec::new();
    let mut i = 1;
    while i < lines.len() {
        let line = lines[i];
        if let Some(caps) = MEDICATION_LINE.captures(line) {
            let raw_line = caps[1].trim();
            let fields: Vec<&str> = FIELD_SEPARATOR.split(raw_line).collect();
            if fields.len() < 2 {
                debug!(
                    target: TARGET_PARSE,
                    "Skipping medication line with fewer than two fields: '{}'", line
                );
                i += 1;
                continue;
            }

            let mut note = String::new();
            if let Some(next) = lines.get(i + 1) {
                if !next.is_empty() && !MEDICATION_LINE.is_match(next) && !is_patient_header(next)
                {
                    note = next.to_string();
                    i += 1;
                }
            }

            medications.push(MedicationRecord {
                raw_line: raw_line.to_string(),
                clean_name: fields[0].trim().to_string(),
                usage: fields[1].trim().to_string(),
                note,
            });
        }
        i += 1;
    }

    StructuredPatientRecord {
        name: clean_name(&name),
        birth_date,
        medications,
    }
}

/// Display form of a patient name: diacritics folded, parenthesized parts and
/// zero-width characters removed.
fn clean_name(name: &str) -> String {
    let folded = fold_diacritics(name);
    PARENTHESIZED.replace_all(&folded, "").trim().to_string()
}
