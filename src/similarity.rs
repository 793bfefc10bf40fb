//! String similarity scores on a 0-100 scale.
//!
//! All matching in the pipeline goes through the [`Similarity`] trait so that a
//! different backend can be plugged in without touching the callers. The
//! [`SequenceMatcher`] reference implementation (Ratcliff/Obershelp) is always
//! available; [`LevenshteinSimilarity`] is an alternative built on `strsim`.

use strsim::normalized_levenshtein;

pub trait Similarity: Send + Sync {
    /// Whole-string similarity. Scores are rounded half away from zero
    /// (`f64::round`), so 66.5 becomes 67.
    fn ratio(&self, a: &str, b: &str) -> u8;

    /// Best `ratio` of the shorter string against every equal-length window of
    /// the longer one.
    fn partial_ratio(&self, a: &str, b: &str) -> u8 {
        let a_chars: Vec<char> = a.chars().collect();
        let b_chars: Vec<char> = b.chars().collect();
        let (short, long) = if a_chars.len() <= b_chars.len() {
            (a_chars, b_chars)
        } else {
            (b_chars, a_chars)
        };

        if short.is_empty() {
            return if long.is_empty() { 100 } else { 0 };
        }

        let probe: String = short.iter().collect();
        let mut best = 0;
        for window in long.windows(short.len()) {
            let window: String = window.iter().collect();
            best = best.max(self.ratio(&probe, &window));
            if best == 100 {
                break;
            }
        }
        best
    }

    /// `ratio` after sorting the whitespace-separated tokens of both strings.
    fn token_sort_ratio(&self, a: &str, b: &str) -> u8 {
        self.ratio(&sorted_tokens(a), &sorted_tokens(b))
    }
}

fn sorted_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Ratcliff/Obershelp "gestalt" matching.
///
/// The longest common run of characters is found, then the same is done
/// recursively on the pieces to its left and right. `M` is the total length of
/// all runs found and the score is `round(200 * M / (len(a) + len(b)))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceMatcher;

impl SequenceMatcher {
    fn ratio_chars(a: &[char], b: &[char]) -> u8 {
        let total = a.len() + b.len();
        if total == 0 {
            return 100;
        }
        let matched = matched_characters(a, b);
        (200.0 * matched as f64 / total as f64).round() as u8
    }
}

impl Similarity for SequenceMatcher {
    fn ratio(&self, a: &str, b: &str) -> u8 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        Self::ratio_chars(&a, &b)
    }

    fn partial_ratio(&self, a: &str, b: &str) -> u8 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };

        if short.is_empty() {
            return if long.is_empty() { 100 } else { 0 };
        }

        let mut best = 0;
        for window in long.windows(short.len()) {
            best = best.max(Self::ratio_chars(short, window));
            if best == 100 {
                break;
            }
        }
        best
    }
}

/// Sum of the lengths of all matching runs in the recursive partition.
fn matched_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common run within `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Among runs of equal length the one starting earliest in `a` wins, then the
/// one starting earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let width = bhi - blo;
    let mut best = (alo, blo, 0);
    let mut previous = vec![0usize; width + 1];
    let mut current = vec![0usize; width + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let slot = j - blo + 1;
            if a[i] == b[j] {
                let run = previous[slot - 1] + 1;
                current[slot] = run;
                if run > best.2 {
                    best = (i + 1 - run, j + 1 - run, run);
                }
            } else {
                current[slot] = 0;
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }

    best
}

/// Normalized Levenshtein distance scaled to 0-100.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevenshteinSimilarity;

impl Similarity for LevenshteinSimilarity {
    fn ratio(&self, a: &str, b: &str) -> u8 {
        (normalized_levenshtein(a, b) * 100.0).round() as u8
    }
}
