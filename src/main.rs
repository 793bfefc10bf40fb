use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::env;
use std::path::PathBuf;
use tracing::info;

use medlink::linking::extract_core;
use medlink::linking::patients::score_components;
use medlink::linking::pipeline::write_output;
use medlink::similarity::{LevenshteinSimilarity, SequenceMatcher, Similarity};
use medlink::text::{AliasMap, PunctuationSplitter, SentenceSplitter, UnicodeSentenceSplitter};
use medlink::{Pipeline, PipelineConfig};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Link a free-text archive to a structured medication export
    Link {
        /// Structured medication export (plain text)
        #[arg(short, long)]
        structured: PathBuf,

        /// Free-text discussion archive (plain text)
        #[arg(short, long)]
        free_text: PathBuf,

        #[command(flatten)]
        aliases: AliasArgs,

        /// Where to write the JSON result
        #[arg(short, long, default_value = "output/linkage.json")]
        output: PathBuf,

        /// Also resolve aliases in structured medication names
        #[arg(long)]
        alias_structured: bool,

        /// Do not resolve aliases in free-text lines
        #[arg(long)]
        no_alias_free_text: bool,

        /// Drop the trailing word of every discussion chunk
        #[arg(long)]
        trim_trailing_word: bool,

        /// Add a sentence split of every discussion chunk
        #[arg(long, value_enum, num_args = 0..=1, default_missing_value = "punctuation")]
        sentences: Option<SplitterChoice>,

        /// Minimum combined score to accept a patient match
        #[arg(long)]
        patient_threshold: Option<u8>,

        /// Minimum partial score for a drug anchor
        #[arg(long)]
        anchor_threshold: Option<u8>,

        /// Similarity measure
        #[arg(long, value_enum, default_value_t = SimilarityChoice::Reference)]
        similarity: SimilarityChoice,
    },

    /// Score two patient identities against each other
    ScorePatient {
        #[arg(long)]
        name_a: String,

        #[arg(long, default_value = "")]
        dob_a: String,

        #[arg(long)]
        name_b: String,

        #[arg(long, default_value = "")]
        dob_b: String,

        #[arg(long, value_enum, default_value_t = SimilarityChoice::Reference)]
        similarity: SimilarityChoice,
    },

    /// Show the core name extracted from medication names
    Core {
        /// Medication names or text fragments
        #[arg(required = true)]
        text: Vec<String>,

        #[command(flatten)]
        aliases: AliasArgs,

        /// Resolve aliases before extraction
        #[arg(long)]
        apply_alias: bool,
    },
}

#[derive(Args)]
struct AliasArgs {
    /// JSON alias map (alias -> canonical name); defaults to MEDLINK_ALIAS_PATH
    #[arg(short, long)]
    aliases: Option<PathBuf>,
}

impl AliasArgs {
    fn path(&self) -> Option<PathBuf> {
        self.aliases
            .clone()
            .or_else(|| env::var("MEDLINK_ALIAS_PATH").ok().map(PathBuf::from))
    }

    fn load(&self) -> AliasMap {
        self.path()
            .map(|path| AliasMap::load(&path))
            .unwrap_or_default()
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SimilarityChoice {
    /// Ratcliff/Obershelp matching blocks
    Reference,
    /// Normalized Levenshtein distance
    Levenshtein,
}

impl SimilarityChoice {
    fn build(self) -> Box<dyn Similarity> {
        match self {
            SimilarityChoice::Reference => Box::new(SequenceMatcher),
            SimilarityChoice::Levenshtein => Box::new(LevenshteinSimilarity),
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SplitterChoice {
    /// Break after . ? ! and at newlines
    Punctuation,
    /// Unicode sentence boundaries
    Unicode,
}

impl SplitterChoice {
    fn build(self) -> Box<dyn SentenceSplitter> {
        match self {
            SplitterChoice::Punctuation => Box::new(PunctuationSplitter),
            SplitterChoice::Unicode => Box::new(UnicodeSentenceSplitter),
        }
    }
}

fn main() -> Result<()> {
    medlink::logging::configure_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Link {
            structured,
            free_text,
            aliases,
            output,
            alias_structured,
            no_alias_free_text,
            trim_trailing_word,
            sentences,
            patient_threshold,
            anchor_threshold,
            similarity,
        } => {
            // Command-line flags only ever switch behavior on top of the environment
            let mut config = PipelineConfig::from_env();
            config.apply_alias_to_structured_names |= alias_structured;
            config.apply_alias_to_free_text &= !no_alias_free_text;
            config.trim_trailing_word_from_chunks |= trim_trailing_word;
            config.split_chunks_into_sentences |= sentences.is_some();
            if let Some(threshold) = patient_threshold {
                config.patient_threshold = threshold;
            }
            if let Some(threshold) = anchor_threshold {
                config.anchor_threshold = threshold;
            }
            info!("Linking with {:?}", config);

            let alias_path = aliases.path();
            let pipeline = Pipeline::with_alias_file(config, alias_path.as_deref())
                .with_similarity(similarity.build())
                .with_sentence_splitter(sentences.unwrap_or(SplitterChoice::Punctuation).build());

            let result = pipeline.run_files(&structured, &free_text)?;
            write_output(&output, &result)?;

            let matched = result
                .iter()
                .filter(|p| p.structured_patient.is_some())
                .count();
            println!(
                "Linked {} of {} patients, written to {}",
                matched,
                result.len(),
                output.display()
            );
        }

        Commands::ScorePatient {
            name_a,
            dob_a,
            name_b,
            dob_b,
            similarity,
        } => {
            let similarity = similarity.build();
            let score = score_components(similarity.as_ref(), &name_a, &dob_a, &name_b, &dob_b);

            let show = |component: Option<u8>| {
                component.map_or_else(|| "-".to_string(), |value| value.to_string())
            };
            println!("Name score:       {}", show(score.name));
            println!("Birth date score: {}", show(score.birth_date));
            println!("Combined score:   {}", score.combined);
        }

        Commands::Core {
            text,
            aliases,
            apply_alias,
        } => {
            let aliases = aliases.load();
            for item in &text {
                println!("{} -> {}", item, extract_core(item, &aliases, apply_alias));
            }
        }
    }

    Ok(())
}
