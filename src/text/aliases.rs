//! Free-text synonym substitution.
//!
//! Hand-typed discussions often refer to a medication by a brand name, an
//! abbreviation or a local nickname. An [`AliasMap`] maps those spellings to the
//! canonical term used by the structured export so that fuzzy matching compares
//! like with like. The map is loaded from an optional JSON object
//! (`{"alias": "canonical", ...}`); a missing or broken file yields an empty map
//! and the pipeline carries on without substitution.

use anyhow::{anyhow, Context, Result};
use regex::{NoExpand, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use super::normalizer::normalize;
use super::TARGET_TEXT;

#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    // Longest alias first, equal lengths in lexicographic order
    rules: Vec<AliasRule>,
}

#[derive(Debug, Clone)]
struct AliasRule {
    alias: String,
    canonical: String,
    pattern: Regex,
}

impl AliasMap {
    /// An alias map that substitutes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load aliases from a JSON file, falling back to an empty map on any failure.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            warn!(
                target: TARGET_TEXT,
                "Alias file {} not found, continuing without aliases",
                path.display()
            );
            return Self::empty();
        }

        match Self::try_load(path) {
            Ok(map) => {
                info!(
                    target: TARGET_TEXT,
                    "Loaded {} aliases from {}",
                    map.len(),
                    path.display()
                );
                map
            }
            Err(err) => {
                warn!(
                    target: TARGET_TEXT,
                    "Could not load aliases from {}: {:#}, continuing without aliases",
                    path.display(),
                    err
                );
                Self::empty()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read alias file {}", path.display()))?;
        Self::from_json_str(&raw)
    }

    /// Parse a flat JSON object of alias to canonical strings.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).context("Alias source is not valid JSON")?;

        let Value::Object(object) = value else {
            return Err(anyhow!("Alias source must be a JSON object"));
        };

        let mut pairs = Vec::with_capacity(object.len());
        for (alias, canonical) in object {
            match canonical {
                Value::String(canonical) => pairs.push((alias, canonical)),
                other => {
                    return Err(anyhow!(
                        "Alias '{}' maps to a non-string value: {}",
                        alias,
                        other
                    ))
                }
            }
        }

        Self::from_pairs(pairs)
    }

    /// Build a map from raw pairs; both sides are normalized before storage.
    ///
    /// When two raw aliases normalize to the same key the last one wins.
    pub fn from_pairs<I, A, C>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (A, C)>,
        A: AsRef<str>,
        C: AsRef<str>,
    {
        let mut entries = HashMap::new();
        for (alias, canonical) in pairs {
            let alias = normalize(alias.as_ref());
            let canonical = normalize(canonical.as_ref());
            if alias.is_empty() {
                debug!(target: TARGET_TEXT, "Skipping alias with empty key");
                continue;
            }
            entries.insert(alias, canonical);
        }

        let mut ordered: Vec<(String, String)> = entries.into_iter().collect();
        ordered.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let rules = ordered
            .into_iter()
            .map(|(alias, canonical)| {
                let pattern = alias_pattern(&alias)?;
                Ok(AliasRule {
                    alias,
                    canonical,
                    pattern,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Normalize `text`, then replace whole-word occurrences of each alias in
    /// turn, longest alias first.
    ///
    /// Every alias is applied to the output of the previous one, so a
    /// canonical value may itself contain a shorter alias that is replaced
    /// later.
    pub fn apply(&self, text: &str) -> String {
        let mut current = normalize(text);
        for rule in &self.rules {
            if rule.pattern.is_match(&current) {
                current = rule
                    .pattern
                    .replace_all(&current, NoExpand(&rule.canonical))
                    .into_owned();
                debug!(
                    target: TARGET_TEXT,
                    "Alias '{}' -> '{}'", rule.alias, rule.canonical
                );
            }
        }
        current
    }
}

/// Whole-word pattern for one alias.
///
/// Word boundaries are only asserted on edges that are word characters, so an
/// alias such as `"mg/ml"` or `"vit. d"` still matches inside a sentence.
fn alias_pattern(alias: &str) -> Result<Regex> {
    let starts_word = alias.chars().next().is_some_and(is_word_char);
    let ends_word = alias.chars().last().is_some_and(is_word_char);
    let pattern = format!(
        "{}{}{}",
        if starts_word { r"\b" } else { "" },
        regex::escape(alias),
        if ends_word { r"\b" } else { "" }
    );
    Regex::new(&pattern).with_context(|| format!("Failed to compile pattern for alias '{}'", alias))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn map(pairs: &[(&str, &str)]) -> AliasMap {
        AliasMap::from_pairs(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn test_whole_word_substitution() {
        let aliases = map(&[("ascal", "carbasalaatcalcium")]);
        assert_eq!(
            aliases.apply("Ascal 100 mg gestopt"),
            "carbasalaatcalcium 100 mg gestopt"
        );
        // Not inside a longer word
        assert_eq!(aliases.apply("ascalon"), "ascalon");
    }

    #[test]
    fn test_longest_alias_wins() {
        let aliases = map(&[
            ("vit", "vitamine"),
            ("vit d", "colecalciferol"),
        ]);
        assert_eq!(aliases.apply("Vit D 800 IE"), "colecalciferol 800 ie");
        assert_eq!(aliases.apply("vit b12"), "vitamine b12");
    }

    #[test]
    fn test_longer_alias_is_not_preempted_by_earlier_overlap() {
        let aliases = map(&[("b c d", "x"), ("a b", "y")]);
        assert_eq!(aliases.apply("a b c d"), "a x");
    }

    #[test]
    fn test_canonical_values_feed_shorter_aliases() {
        let aliases = map(&[("pant 40", "pantoprazol pcm"), ("pcm", "paracetamol")]);
        assert_eq!(aliases.apply("Pant 40"), "pantoprazol paracetamol");
    }

    #[test]
    fn test_replacement_text_is_literal() {
        let aliases = map(&[("kosten", "$1 eigen bijdrage")]);
        assert_eq!(aliases.apply("kosten"), "$1 eigen bijdrage");
    }

    #[test]
    fn test_keys_and_values_are_normalized() {
        let aliases = map(&[("  Émcoretic ", "Bisoprolol/HCT")]);
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases.apply("EMCORETIC"), "bisoprolol/hct");
    }

    #[test]
    fn test_non_word_edges() {
        let aliases = map(&[("sel.", "selokeen"), ("mg/ml", "milligram per milliliter")]);
        assert_eq!(aliases.apply("sel. zok"), "selokeen zok");
        assert_eq!(aliases.apply("10 mg/ml drank"), "10 milligram per milliliter drank");
    }

    #[test]
    fn test_apply_does_not_depend_on_insertion_order() {
        let pairs = vec![
            ("a b", "x"),
            ("b c", "y"),
            ("a", "z"),
            ("c", "w"),
            ("b", "v"),
        ];

        let mut orders = Vec::new();
        for shift in 0..pairs.len() {
            let mut rotated = pairs.clone();
            rotated.rotate_left(shift);
            orders.push(rotated.clone());
            rotated.reverse();
            orders.push(rotated);
        }

        // "a b" and "b c" have equal length; "a b" sorts first
        for order in orders {
            let aliases = map(&order);
            assert_eq!(aliases.apply("a b c a b c"), "x w x w", "{:?}", order);
        }
    }

    #[test]
    fn test_empty_map_only_normalizes() {
        let aliases = AliasMap::empty();
        assert!(aliases.is_empty());
        assert_eq!(aliases.apply("  Crème  Zalf "), "creme zalf");
    }

    #[test]
    fn test_from_json_str() {
        let aliases =
            AliasMap::from_json_str(r#"{"Pantozol": "pantoprazol", "APAP": "paracetamol"}"#)
                .unwrap();
        assert_eq!(aliases.len(), 2);
        assert_eq!(aliases.apply("pantozol 40mg"), "pantoprazol 40mg");
    }

    #[test]
    fn test_from_json_str_rejects_bad_shapes() {
        assert!(AliasMap::from_json_str("not json").is_err());
        assert!(AliasMap::from_json_str(r#"["a", "b"]"#).is_err());
        assert!(AliasMap::from_json_str(r#"{"a": 1}"#).is_err());
    }

    #[test]
    fn test_empty_keys_are_skipped() {
        let aliases = AliasMap::from_json_str(r#"{"  ": "leeg", "x": "y"}"#).unwrap();
        assert_eq!(aliases.len(), 1);
    }

    #[test]
    fn test_load_missing_file_gives_empty_map() {
        let dir = TempDir::new().unwrap();
        let aliases = AliasMap::load(&dir.path().join("aliases.json"));
        assert!(aliases.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_gives_empty_map() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ this is not json").unwrap();
        let aliases = AliasMap::load(file.path());
        assert!(aliases.is_empty());
    }

    #[test]
    fn test_load_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"metfo": "metformine"}}"#).unwrap();
        let aliases = AliasMap::load(file.path());
        assert_eq!(aliases.apply("Metfo 2dd"), "metformine 2dd");
    }
}
