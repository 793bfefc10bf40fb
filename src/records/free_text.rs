//! Parser for the free-text discussion archive.
//!
//! Each patient block starts at a line beginning with the word `Wie`, followed
//! by the patient name and usually a birth date (`dd-mm-yyyy` or `dd/mm/yyyy`).
//! Everything up to the next `Wie` line belongs to the block.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::types::FreeTextPatientBlock;
use super::TARGET_PARSE;

const BLOCK_MARKER: &str = "Wie";

lazy_static! {
    static ref BLOCK_START: Regex = Regex::new(r"^Wie\b").expect("block start pattern is valid");
    static ref HEADER_DATE: Regex =
        Regex::new(r"\b\d{2}[-/]\d{2}[-/]\d{4}\b").expect("header date pattern is valid");
    static ref GFR_LINE: Regex =
        Regex::new(r"(?i)^e?gfr\s*[: ]\s*\S").expect("gfr pattern is valid");
}

/// Parse the archive into patient blocks, dropping blocks without any identity.
pub fn parse_free_text(content: &str) -> Vec<FreeTextPatientBlock> {
    let mut blocks = Vec::new();
    let mut discarded = 0;

    for raw in split_blocks(content) {
        let block = parse_block(&raw);
        if block.has_identity() {
            blocks.push(block);
        } else {
            warn!(
                target: TARGET_PARSE,
                "Discarding free-text block without name or birth date: '{}'",
                raw.first().copied().unwrap_or_default()
            );
            discarded += 1;
        }
    }

    info!(
        target: TARGET_PARSE,
        "Free text: {} patient blocks ({} discarded)",
        blocks.len(),
        discarded
    );

    blocks
}

/// Group trimmed, non-blank lines into blocks; text before the first marker is ignored.
fn split_blocks(content: &str) -> Vec<Vec<&str>> {
    let mut blocks: Vec<Vec<&str>> = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if BLOCK_START.is_match(line) {
            blocks.push(vec![line]);
        } else if let Some(block) = blocks.last_mut() {
            block.push(line);
        }
    }

    blocks
}

fn parse_block(lines: &[&str]) -> FreeTextPatientBlock {
    let header = lines.first().copied().unwrap_or_default();
    let (name, birth_date) = parse_header(header);

    let gfr_text = lines
        .iter()
        .find(|line| GFR_LINE.is_match(line))
        .map(|line| line.to_string());

    FreeTextPatientBlock {
        name,
        birth_date,
        gfr_text,
        lines: lines.iter().map(|line| line.to_string()).collect(),
    }
}

/// Split `Wie <name> <date> ...` into name and date; either may come back empty.
fn parse_header(header: &str) -> (String, String) {
    let rest = header
        .strip_prefix(BLOCK_MARKER)
        .unwrap_or(header)
        .trim_start_matches(|c: char| c == ':' || c.is_whitespace());

    let (name_part, birth_date) = match HEADER_DATE.find(rest) {
        Some(found) => (&rest[..found.start()], found.as_str().to_string()),
        None => (rest, String::new()),
    };

    let name = name_part
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '(' | '-' | ':' | '|'))
        .to_string();

    (name, birth_date)
}
