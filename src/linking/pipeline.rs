//! End-to-end linkage of a free-text archive to a structured medication export.
//!
//! The [`Pipeline`] parses both sources, pairs every free-text patient block
//! with its best structured record, locates where each medication of that
//! record is discussed and emits one [`LinkedPatient`] per retained block.
//! The behavior differences between earlier variants of this process are
//! expressed as [`PipelineConfig`] flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::anchors::{locate_anchors, AnchorParams, DEFAULT_ANCHOR_THRESHOLD};
use super::chunks::{chunk_ranges, trim_trailing_word};
use super::patients::{match_patients, DEFAULT_PATIENT_THRESHOLD};
use super::TARGET_LINK;
use crate::environment::{get_env_var_as_bool, get_env_var_or};
use crate::records::{
    parse_free_text, parse_structured, FreeTextPatientBlock, MedicationRecord, StructuredExport,
};
use crate::similarity::{SequenceMatcher, Similarity};
use crate::text::{AliasMap, PunctuationSplitter, SentenceSplitter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub apply_alias_to_structured_names: bool,
    pub apply_alias_to_free_text: bool,
    pub trim_trailing_word_from_chunks: bool,
    pub split_chunks_into_sentences: bool,
    pub patient_threshold: u8,
    pub anchor_threshold: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            apply_alias_to_structured_names: false,
            apply_alias_to_free_text: true,
            trim_trailing_word_from_chunks: false,
            split_chunks_into_sentences: false,
            patient_threshold: DEFAULT_PATIENT_THRESHOLD,
            anchor_threshold: DEFAULT_ANCHOR_THRESHOLD,
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `MEDLINK_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            apply_alias_to_structured_names: get_env_var_as_bool(
                "MEDLINK_ALIAS_STRUCTURED",
                defaults.apply_alias_to_structured_names,
            ),
            apply_alias_to_free_text: get_env_var_as_bool(
                "MEDLINK_ALIAS_FREE_TEXT",
                defaults.apply_alias_to_free_text,
            ),
            trim_trailing_word_from_chunks: get_env_var_as_bool(
                "MEDLINK_TRIM_TRAILING_WORD",
                defaults.trim_trailing_word_from_chunks,
            ),
            split_chunks_into_sentences: get_env_var_as_bool(
                "MEDLINK_SPLIT_SENTENCES",
                defaults.split_chunks_into_sentences,
            ),
            patient_threshold: get_env_var_or(
                "MEDLINK_PATIENT_THRESHOLD",
                defaults.patient_threshold,
            ),
            anchor_threshold: get_env_var_or("MEDLINK_ANCHOR_THRESHOLD", defaults.anchor_threshold),
        }
    }
}

/// Identity fields of a free-text block as they appear in the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeTextIdentity {
    pub name: String,
    pub birth_date: String,
    pub gfr_text: Option<String>,
}

/// Identity of the structured record a block was linked to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredIdentity {
    pub name: String,
    pub birth_date: String,
}

/// One medication's stretch of discussion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discussion {
    pub start_line_index: usize,
    pub first_line: String,
    pub lines: Vec<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentences: Option<Vec<String>>,
    pub match_core: String,
    pub match_score: u8,
    pub medication: MedicationRecord,
}

/// Output record for one free-text block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedPatient {
    pub free_text_patient: FreeTextIdentity,
    pub structured_patient: Option<StructuredIdentity>,
    pub patient_match_score: u8,
    pub discussions: Vec<Discussion>,
}

pub struct Pipeline {
    config: PipelineConfig,
    aliases: AliasMap,
    similarity: Box<dyn Similarity>,
    splitter: Box<dyn SentenceSplitter>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, aliases: AliasMap) -> Self {
        Self {
            config,
            aliases,
            similarity: Box::new(SequenceMatcher),
            splitter: Box::new(PunctuationSplitter),
        }
    }

    /// Build a pipeline whose aliases come from an optional JSON file.
    pub fn with_alias_file(config: PipelineConfig, alias_path: Option<&Path>) -> Self {
        let aliases = match alias_path {
            Some(path) => AliasMap::load(path),
            None => {
                info!(target: TARGET_LINK, "No alias file configured");
                AliasMap::empty()
            }
        };
        Self::new(config, aliases)
    }

    pub fn with_similarity(mut self, similarity: Box<dyn Similarity>) -> Self {
        self.similarity = similarity;
        self
    }

    pub fn with_sentence_splitter(mut self, splitter: Box<dyn SentenceSplitter>) -> Self {
        self.splitter = splitter;
        self
    }

    /// Read both sources from disk and link them.
    pub fn run_files(
        &self,
        structured_path: &Path,
        free_text_path: &Path,
    ) -> Result<Vec<LinkedPatient>> {
        let structured = fs::read_to_string(structured_path).with_context(|| {
            format!(
                "Failed to read structured export {}",
                structured_path.display()
            )
        })?;
        let free_text = fs::read_to_string(free_text_path).with_context(|| {
            format!("Failed to read free-text archive {}", free_text_path.display())
        })?;

        Ok(self.run(&structured, &free_text))
    }

    /// Parse and link in-memory sources.
    pub fn run(&self, structured: &str, free_text: &str) -> Vec<LinkedPatient> {
        let export = parse_structured(structured);
        let blocks = parse_free_text(free_text);
        self.link(&export, &blocks)
    }

    /// Link already parsed sources.
    pub fn link(
        &self,
        export: &StructuredExport,
        blocks: &[FreeTextPatientBlock],
    ) -> Vec<LinkedPatient> {
        let matches = match_patients(
            blocks,
            &export.patients,
            self.similarity.as_ref(),
            self.config.patient_threshold,
        );

        let params = AnchorParams {
            aliases: &self.aliases,
            similarity: self.similarity.as_ref(),
            apply_alias_to_structured_names: self.config.apply_alias_to_structured_names,
            apply_alias_to_free_text: self.config.apply_alias_to_free_text,
            threshold: self.config.anchor_threshold,
        };

        let result: Vec<LinkedPatient> = matches
            .iter()
            .map(|found| {
                let medications: &[MedicationRecord] = found
                    .record
                    .map_or(&[], |record| record.medications.as_slice());
                LinkedPatient {
                    free_text_patient: FreeTextIdentity {
                        name: found.block.name.clone(),
                        birth_date: found.block.birth_date.clone(),
                        gfr_text: found.block.gfr_text.clone(),
                    },
                    structured_patient: found.record.map(|record| StructuredIdentity {
                        name: record.name.clone(),
                        birth_date: record.birth_date.clone(),
                    }),
                    patient_match_score: found.score,
                    discussions: self.discussions(found.block, medications, &params),
                }
            })
            .collect();

        let matched = result.iter().filter(|p| p.structured_patient.is_some()).count();
        let discussions: usize = result.iter().map(|p| p.discussions.len()).sum();
        info!(
            target: TARGET_LINK,
            "Linked {} of {} free-text blocks against {} structured patients ({}), {} discussions",
            matched,
            result.len(),
            export.patients.len(),
            export.department.as_deref().unwrap_or("unknown department"),
            discussions
        );

        result
    }

    fn discussions(
        &self,
        block: &FreeTextPatientBlock,
        medications: &[MedicationRecord],
        params: &AnchorParams,
    ) -> Vec<Discussion> {
        if medications.is_empty() {
            return Vec::new();
        }

        let anchors = locate_anchors(&block.lines, medications, params);
        let chunks = chunk_ranges(&anchors, block.lines.len());
        debug!(
            target: TARGET_LINK,
            "{}: {} of {} medications anchored",
            block.name,
            anchors.len(),
            medications.len()
        );

        chunks
            .iter()
            .zip(&anchors)
            .map(|(chunk, anchor)| {
                let mut lines = block.lines[chunk.start..chunk.end].to_vec();
                if self.config.trim_trailing_word_from_chunks {
                    trim_trailing_word(&mut lines);
                }
                let text = lines.join("\n").trim().to_string();
                let sentences = self
                    .config
                    .split_chunks_into_sentences
                    .then(|| self.splitter.split(&text));

                Discussion {
                    start_line_index: anchor.line_index,
                    first_line: block.lines[anchor.line_index].clone(),
                    lines,
                    text,
                    sentences,
                    match_core: anchor.core_name.clone(),
                    match_score: anchor.score,
                    medication: medications[anchor.medication_index].clone(),
                }
            })
            .collect()
    }
}

/// Write the linkage result as pretty-printed JSON, creating parent directories.
pub fn write_output(path: &Path, result: &[LinkedPatient]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(result).context("Failed to serialize linkage")?;
    fs::write(path, json).with_context(|| format!("Failed to write output {}", path.display()))?;

    info!(
        target: TARGET_LINK,
        "Wrote {} records to {}",
        result.len(),
        path.display()
    );
    Ok(())
}
