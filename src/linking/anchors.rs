use tracing::debug;

use super::core_name::extract_core;
use super::TARGET_LINK;
use crate::records::MedicationRecord;
use crate::similarity::Similarity;
use crate::text::{normalize, AliasMap};

/// Minimum partial-match score for a line to count as a medication's start.
pub const DEFAULT_ANCHOR_THRESHOLD: u8 = 70;

/// Lines opening with one of these words are section headers, never anchors.
const HEADER_KEYWORDS: &[&str] = &[
    "wie",
    "gfr",
    "egfr",
    "medicatie",
    "medicatieoverzicht",
    "voorgeschiedenis",
    "conclusie",
    "beleid",
    "afspraken",
    "actiepunten",
    "opmerking",
    "opmerkingen",
];

/// The line where discussion of one medication starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrugAnchor {
    pub line_index: usize,
    pub medication_index: usize,
    pub core_name: String,
    pub score: u8,
}

/// Everything the locator needs besides the lines and medications.
pub struct AnchorParams<'a> {
    pub aliases: &'a AliasMap,
    pub similarity: &'a dyn Similarity,
    pub apply_alias_to_structured_names: bool,
    pub apply_alias_to_free_text: bool,
    pub threshold: u8,
}

pub fn is_header_line(normalized: &str) -> bool {
    HEADER_KEYWORDS.iter().any(|keyword| {
        normalized
            .strip_prefix(keyword)
            .is_some_and(|rest| !rest.starts_with(|c: char| c.is_ascii_alphanumeric()))
    })
}

/// Find, per medication, the best-matching line and resolve lines claimed by
/// several medications in favor of the highest score.
///
/// The result is sorted by line index and never contains two anchors on the
/// same line.
pub fn locate_anchors(
    lines: &[String],
    medications: &[MedicationRecord],
    params: &AnchorParams,
) -> Vec<DrugAnchor> {
    // Prepared once per block; headers are None
    let prepared: Vec<Option<String>> = lines
        .iter()
        .map(|line| {
            let normalized = normalize(line);
            if is_header_line(&normalized) {
                None
            } else if params.apply_alias_to_free_text {
                Some(params.aliases.apply(line))
            } else {
                Some(normalized)
            }
        })
        .collect();

    let mut candidates = Vec::new();
    for (medication_index, medication) in medications.iter().enumerate() {
        let core_name = extract_core(
            &medication.clean_name,
            params.aliases,
            params.apply_alias_to_structured_names,
        );
        if core_name.is_empty() {
            debug!(
                target: TARGET_LINK,
                "No core name for '{}', skipping", medication.clean_name
            );
            continue;
        }

        let mut best_line = None;
        let mut best_score = 0;
        for (line_index, line) in prepared.iter().enumerate() {
            let Some(line) = line else { continue };
            let score = params.similarity.partial_ratio(&core_name, line);
            if score > best_score {
                best_line = Some(line_index);
                best_score = score;
            }
        }

        match best_line {
            Some(line_index) if best_score >= params.threshold => {
                candidates.push(DrugAnchor {
                    line_index,
                    medication_index,
                    core_name,
                    score: best_score,
                });
            }
            _ => {
                debug!(
                    target: TARGET_LINK,
                    "No start line for '{}' (best score {})", core_name, best_score
                );
            }
        }
    }

    candidates.sort_by(|a, b| {
        a.line_index
            .cmp(&b.line_index)
            .then_with(|| b.score.cmp(&a.score))
    });
    candidates.dedup_by_key(|anchor| anchor.line_index);

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::SequenceMatcher;
    use std::collections::HashSet;

    fn medication(name: &str) -> MedicationRecord {
        MedicationRecord {
            raw_line: format!("{}  1dd1", name),
            clean_name: name.to_string(),
            usage: "1dd1".to_string(),
            note: String::new(),
        }
    }

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|l| l.to_string()).collect()
    }

    fn params<'a>(aliases: &'a AliasMap, similarity: &'a SequenceMatcher) -> AnchorParams<'a> {
        AnchorParams {
            aliases,
            similarity,
            apply_alias_to_structured_names: false,
            apply_alias_to_free_text: true,
            threshold: DEFAULT_ANCHOR_THRESHOLD,
        }
    }

    #[test]
    fn test_header_lines() {
        assert!(is_header_line("wie curie m 07-11-1942"));
        assert!(is_header_line("egfr: 45"));
        assert!(is_header_line("medicatie:"));
        assert!(!is_header_line("wiel"));
        assert!(!is_header_line("medicatiegebruik besproken"));
        assert!(!is_header_line("paracetamol"));
    }

    #[test]
    fn test_anchor_per_medication() {
        let aliases = AliasMap::empty();
        let sim = SequenceMatcher;
        let block = lines(&[
            "Wie Curie M 07-11-1942",
            "Algemeen: valt vaak",
            "Paracetamol tablet 500 mg wordt voortgezet.",
            "pijn goed onder controle",
            "Omeprazol: afbouwen, geen indicatie meer.",
        ]);
        let meds = vec![
            medication("Omeprazol capsule msr 20mg"),
            medication("Paracetamol tablet 500mg"),
        ];

        let anchors = locate_anchors(&block, &meds, &params(&aliases, &sim));
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].line_index, 2);
        assert_eq!(anchors[0].medication_index, 1);
        assert_eq!(anchors[0].core_name, "paracetamol");
        assert_eq!(anchors[0].score, 100);
        assert_eq!(anchors[1].line_index, 4);
        assert_eq!(anchors[1].medication_index, 0);
    }

    #[test]
    fn test_unmatched_medication_has_no_anchor() {
        let aliases = AliasMap::empty();
        let sim = SequenceMatcher;
        let block = lines(&["Wie Visser", "Metformine voortzetten"]);
        let meds = vec![medication("Apixaban tablet 5mg")];
        assert!(locate_anchors(&block, &meds, &params(&aliases, &sim)).is_empty());
    }

    #[test]
    fn test_shared_line_goes_to_highest_score() {
        let aliases = AliasMap::empty();
        let sim = SequenceMatcher;
        let block = lines(&["Wie Visser", "paracetamol/codeine 500/10 zo nodig"]);
        let meds = vec![
            medication("Paracetamol/Codeine tablet 500/10mg"),
            medication("Codeine tablet 10mg"),
        ];

        let anchors = locate_anchors(&block, &meds, &params(&aliases, &sim));
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].line_index, 1);
        assert_eq!(anchors[0].medication_index, 1);
        assert_eq!(anchors[0].score, 100);
    }

    #[test]
    fn test_anchor_lines_are_unique_and_sorted() {
        let aliases = AliasMap::empty();
        let sim = SequenceMatcher;
        let block = lines(&[
            "Wie Visser",
            "metoprolol en metformine ongewijzigd",
            "metoprolol",
            "amlodipine",
        ]);
        let meds = vec![
            medication("Metoprolol tablet 50mg"),
            medication("Metformine tablet 500mg"),
            medication("Amlodipine tablet 5mg"),
            medication("Amlodipine tablet 10mg"),
        ];

        let anchors = locate_anchors(&block, &meds, &params(&aliases, &sim));
        let unique: HashSet<usize> = anchors.iter().map(|a| a.line_index).collect();
        assert_eq!(unique.len(), anchors.len());
        assert!(anchors.windows(2).all(|w| w[0].line_index < w[1].line_index));
    }

    #[test]
    fn test_header_line_is_never_an_anchor() {
        let aliases = AliasMap::empty();
        let sim = SequenceMatcher;
        let block = lines(&["Wie Digoxine", "Medicatie: digoxine"]);
        let meds = vec![medication("Digoxine tablet 0,125mg")];
        assert!(locate_anchors(&block, &meds, &params(&aliases, &sim)).is_empty());
    }

    #[test]
    fn test_free_text_aliases() {
        let aliases = AliasMap::from_pairs([("ascal", "carbasalaatcalcium")]).unwrap();
        let sim = SequenceMatcher;
        let block = lines(&["Wie Visser", "Ascal stoppen ivm bloeding"]);
        let meds = vec![medication("Carbasalaatcalcium poeder 100mg")];

        let anchors = locate_anchors(&block, &meds, &params(&aliases, &sim));
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].line_index, 1);

        let mut without_alias = params(&aliases, &sim);
        without_alias.apply_alias_to_free_text = false;
        assert!(locate_anchors(&block, &meds, &without_alias).is_empty());
    }
}
