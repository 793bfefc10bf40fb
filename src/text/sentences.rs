use lazy_static::lazy_static;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

lazy_static! {
    static ref SENTENCE_BREAK: Regex =
        Regex::new(r"[.?!]+\s+|\n").expect("sentence break pattern is valid");
}

/// Splits a chunk of discussion text into sentences.
pub trait SentenceSplitter: Send + Sync {
    fn split(&self, text: &str) -> Vec<String>;
}

/// Breaks after `.`, `?` or `!` followed by whitespace, and at every newline.
#[derive(Debug, Clone, Copy, Default)]
pub struct PunctuationSplitter;

impl SentenceSplitter for PunctuationSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut start = 0;

        for found in SENTENCE_BREAK.find_iter(text) {
            // Keep the terminal punctuation, drop the whitespace after it
            let end = found.start() + found.as_str().trim_end().len();
            push_trimmed(&mut sentences, &text[start..end]);
            start = found.end();
        }
        push_trimmed(&mut sentences, &text[start..]);

        sentences
    }
}

/// Unicode (UAX #29) sentence boundaries, which cope better with abbreviations
/// and quotes than the punctuation rule. Newlines still force a break.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeSentenceSplitter;

impl SentenceSplitter for UnicodeSentenceSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        for line in text.lines() {
            for sentence in line.split_sentence_bounds() {
                push_trimmed(&mut sentences, sentence);
            }
        }
        sentences
    }
}

fn push_trimmed(sentences: &mut Vec<String>, candidate: &str) {
    let trimmed = candidate.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_punctuation_splitter() {
        let sentences = PunctuationSplitter.split("Paracetamol blijft. Dosis verlagen? Ja!");
        assert_eq!(
            sentences,
            vec!["Paracetamol blijft.", "Dosis verlagen?", "Ja!"]
        );
    }

    #[test]
    fn test_punctuation_splitter_breaks_on_newlines() {
        let sentences = PunctuationSplitter.split("Omeprazol 20 mg\ngestart in 2019\n\nafbouwen");
        assert_eq!(
            sentences,
            vec!["Omeprazol 20 mg", "gestart in 2019", "afbouwen"]
        );
    }

    #[test]
    fn test_punctuation_splitter_keeps_decimals_together() {
        let sentences = PunctuationSplitter.split("Dosis 2.5 mg per dag. Evalueren.");
        assert_eq!(sentences, vec!["Dosis 2.5 mg per dag.", "Evalueren."]);
    }

    #[test]
    fn test_empty_text() {
        assert!(PunctuationSplitter.split("").is_empty());
        assert!(UnicodeSentenceSplitter.split("  \n ").is_empty());
    }

    #[test]
    fn test_unicode_splitter() {
        let sentences =
            UnicodeSentenceSplitter.split("Metformine wordt voortgezet. Nierfunctie controleren.\nStop");
        assert_eq!(
            sentences,
            vec![
                "Metformine wordt voortgezet.",
                "Nierfunctie controleren.",
                "Stop"
            ]
        );
    }
}
