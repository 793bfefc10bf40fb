use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, info};

use super::TARGET_LINK;
use crate::records::{FreeTextPatientBlock, StructuredPatientRecord};
use crate::similarity::Similarity;
use crate::text::normalize;

/// Minimum combined score for a free-text block to be linked to a record.
pub const DEFAULT_PATIENT_THRESHOLD: u8 = 80;

lazy_static! {
    static ref TITLES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("mw", "mevr");
        map.insert("mevr", "mevr");
        map.insert("mevrouw", "mevr");
        map.insert("dhr", "dhr");
        map.insert("hr", "dhr");
        map
    };
    static ref LEXICAL_DATE: Regex =
        Regex::new(r"^(\d{2})[-/](\d{2})[-/](\d{4})$").expect("date pattern is valid");
}

/// A free-text block with its best structured candidate.
///
/// `record` is `None` when no candidate reached the acceptance threshold; the
/// best observed score is kept for diagnostics either way.
#[derive(Debug, Clone)]
pub struct PatientMatch<'a> {
    pub block: &'a FreeTextPatientBlock,
    pub record: Option<&'a StructuredPatientRecord>,
    pub score: u8,
}

/// Component scores behind a combined patient score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatientScore {
    // None when the name is missing on either side
    pub name: Option<u8>,
    // None when the birth date is missing on either side
    pub birth_date: Option<u8>,
    pub combined: u8,
}

/// Name in comparison form: normalized, leading title canonicalized, initials
/// and stray commas removed.
pub fn comparable_name(name: &str) -> String {
    let normalized = normalize(name);
    let mut tokens = normalized.split(' ').filter(|t| !t.is_empty());

    let mut parts: Vec<&str> = Vec::new();
    if let Some(first) = tokens.next() {
        let bare = first.trim_end_matches('.');
        parts.push(TITLES.get(bare).copied().unwrap_or(first));
    }
    parts.extend(tokens);

    parts
        .into_iter()
        .map(|token| token.trim_matches(|c: char| c == ',' || c == ';'))
        .filter(|token| !token.is_empty() && !is_initial(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `m`, `m.` and `j.a.` are initials; `mevr.` is not.
fn is_initial(token: &str) -> bool {
    let mut pieces = token.split('.').filter(|piece| !piece.is_empty()).peekable();
    pieces.peek().is_some()
        && pieces.all(|piece| piece.chars().count() == 1 && piece.chars().all(char::is_alphabetic))
}

/// Rewrite `dd-mm-yyyy` or `dd/mm/yyyy` as `yyyy-mm-dd`; other input is returned trimmed.
pub fn normalize_birth_date(date: &str) -> String {
    let date = date.trim();

    for format in ["%d-%m-%Y", "%d/%m/%Y"] {
        if let Ok(parsed) = NaiveDate::parse_from_str(date, format) {
            return parsed.format("%Y-%m-%d").to_string();
        }
    }

    // Not a calendar date (typo such as 31-02), keep the digits aligned anyway
    if let Some(caps) = LEXICAL_DATE.captures(date) {
        return format!("{}-{}-{}", &caps[3], &caps[2], &caps[1]);
    }

    date.replace('/', "-")
}

/// Score a free-text identity against a structured identity.
///
/// Both fields comparable: the truncated mean of both. One field comparable:
/// that score alone. Nothing comparable: 0.
pub fn score_components(
    similarity: &dyn Similarity,
    name_a: &str,
    birth_date_a: &str,
    name_b: &str,
    birth_date_b: &str,
) -> PatientScore {
    let (name_a, name_b) = (comparable_name(name_a), comparable_name(name_b));
    let (date_a, date_b) = (
        normalize_birth_date(birth_date_a),
        normalize_birth_date(birth_date_b),
    );

    let name = (!name_a.is_empty() && !name_b.is_empty())
        .then(|| similarity.token_sort_ratio(&name_a, &name_b));
    let birth_date = (!date_a.is_empty() && !date_b.is_empty())
        .then(|| similarity.ratio(&date_a, &date_b));

    let combined = match (name, birth_date) {
        (Some(name), Some(date)) => ((u16::from(name) + u16::from(date)) / 2) as u8,
        (Some(name), None) => name,
        (None, Some(date)) => date,
        (None, None) => 0,
    };

    PatientScore {
        name,
        birth_date,
        combined,
    }
}

pub fn patient_score(
    similarity: &dyn Similarity,
    name_a: &str,
    birth_date_a: &str,
    name_b: &str,
    birth_date_b: &str,
) -> u8 {
    score_components(similarity, name_a, birth_date_a, name_b, birth_date_b).combined
}

/// Pair every free-text block with its best-scoring structured record.
///
/// The first record wins ties. Blocks whose best score stays under `threshold`
/// are returned without a record.
pub fn match_patients<'a>(
    blocks: &'a [FreeTextPatientBlock],
    records: &'a [StructuredPatientRecord],
    similarity: &dyn Similarity,
    threshold: u8,
) -> Vec<PatientMatch<'a>> {
    blocks
        .iter()
        .map(|block| {
            let mut best: Option<&StructuredPatientRecord> = None;
            let mut best_score = 0;

            for record in records {
                let score = patient_score(
                    similarity,
                    &block.name,
                    &block.birth_date,
                    &record.name,
                    &record.birth_date,
                );
                if score > best_score {
                    best = Some(record);
                    best_score = score;
                }
            }

            match best {
                Some(record) if best_score >= threshold => {
                    info!(
                        target: TARGET_LINK,
                        "Match: {} ({}) <-> {} ({}) score={}",
                        block.name, block.birth_date, record.name, record.birth_date, best_score
                    );
                    PatientMatch {
                        block,
                        record: Some(record),
                        score: best_score,
                    }
                }
                _ => {
                    info!(
                        target: TARGET_LINK,
                        "No match for {} ({}), best score={}",
                        block.name, block.birth_date, best_score
                    );
                    if let Some(record) = best {
                        debug!(
                            target: TARGET_LINK,
                            "Closest candidate for {} was {}", block.name, record.name
                        );
                    }
                    PatientMatch {
                        block,
                        record: None,
                        score: best_score,
                    }
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::SequenceMatcher;

    fn block(name: &str, birth_date: &str) -> FreeTextPatientBlock {
        FreeTextPatientBlock {
            name: name.to_string(),
            birth_date: birth_date.to_string(),
            gfr_text: None,
            lines: vec![format!("Wie {} {}", name, birth_date)],
        }
    }

    fn record(name: &str, birth_date: &str) -> StructuredPatientRecord {
        StructuredPatientRecord {
            name: name.to_string(),
            birth_date: birth_date.to_string(),
            medications: Vec::new(),
        }
    }

    #[test]
    fn test_title_normalization() {
        assert_eq!(comparable_name("Mw. Jansen"), "mevr jansen");
        assert_eq!(comparable_name("Mevrouw Jansen"), "mevr jansen");
        assert_eq!(comparable_name("Mevr. M Curie"), "mevr curie");
        assert_eq!(comparable_name("hr. de Vries"), "dhr de vries");
        assert_eq!(comparable_name("Dhr Bakker"), "dhr bakker");
    }

    #[test]
    fn test_initials_are_stripped() {
        assert_eq!(comparable_name("Curie M"), "curie");
        assert_eq!(comparable_name("Dhr. J.A. de Boer"), "dhr de boer");
        assert_eq!(comparable_name("Jansen, P."), "jansen");
        assert_eq!(comparable_name("M"), "");
    }

    #[test]
    fn test_birth_date_normalization() {
        assert_eq!(normalize_birth_date("07-11-1942"), "1942-11-07");
        assert_eq!(normalize_birth_date(" 12/05/1936 "), "1936-05-12");
        assert_eq!(normalize_birth_date("31-02-1940"), "1940-02-31");
        assert_eq!(normalize_birth_date("1942-11-07"), "1942-11-07");
        assert_eq!(normalize_birth_date(""), "");
    }

    #[test]
    fn test_full_identity_is_averaged() {
        let sim = SequenceMatcher;
        let score = score_components(&sim, "Curie M", "07-11-1942", "Mevr. M Curie", "07-11-1942");
        assert_eq!(score.name, Some(67));
        assert_eq!(score.birth_date, Some(100));
        assert_eq!(score.combined, 83);
    }

    #[test]
    fn test_name_only_on_both_sides() {
        let sim = SequenceMatcher;
        let score = score_components(&sim, "Marie Curie", "", "Curie Marie", "");
        assert_eq!(score.birth_date, None);
        assert_eq!(score.combined, score.name.unwrap());
        assert_eq!(score.combined, 100);
    }

    #[test]
    fn test_birth_date_only_on_both_sides() {
        let sim = SequenceMatcher;
        assert_eq!(patient_score(&sim, "", "07-11-1942", "", "07/11/1942"), 100);
    }

    #[test]
    fn test_no_comparable_field_scores_zero() {
        let sim = SequenceMatcher;
        assert_eq!(patient_score(&sim, "Curie", "", "", "07-11-1942"), 0);
        assert_eq!(patient_score(&sim, "", "07-11-1942", "Curie", ""), 0);
        assert_eq!(patient_score(&sim, "", "", "", ""), 0);
    }

    #[test]
    fn test_match_patients_picks_best_record() {
        let sim = SequenceMatcher;
        let blocks = vec![block("Curie M", "07-11-1942")];
        let records = vec![
            record("Dhr. P Jansen", "12-05-1936"),
            record("Mevr. M Curie", "07-11-1942"),
        ];
        let matches = match_patients(&blocks, &records, &sim, DEFAULT_PATIENT_THRESHOLD);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].record.map(|r| r.name.as_str()), Some("Mevr. M Curie"));
        assert!(matches[0].score >= DEFAULT_PATIENT_THRESHOLD);
    }

    #[test]
    fn test_match_below_threshold_keeps_block() {
        let sim = SequenceMatcher;
        let blocks = vec![block("Visser", "03-03-1933")];
        let records = vec![record("Mevr. M Curie", "07-11-1942")];
        let matches = match_patients(&blocks, &records, &sim, DEFAULT_PATIENT_THRESHOLD);
        assert_eq!(matches.len(), 1);
        assert!(matches[0].record.is_none());
        assert!(matches[0].score < DEFAULT_PATIENT_THRESHOLD);
        assert!(matches[0].score > 0);
    }

    #[test]
    fn test_match_without_records() {
        let sim = SequenceMatcher;
        let blocks = vec![block("Visser", "03-03-1933")];
        let matches = match_patients(&blocks, &[], &sim, DEFAULT_PATIENT_THRESHOLD);
        assert!(matches[0].record.is_none());
        assert_eq!(matches[0].score, 0);
    }
}
