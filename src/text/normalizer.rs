use unicode_normalization::UnicodeNormalization;

/// Canonical comparison form of a piece of text.
///
/// Decomposes to NFKD, lowercases, drops everything outside ASCII (combining
/// marks included, so `é` becomes `e`), collapses whitespace runs to a single
/// space and trims. Applying it twice gives the same result as applying it once.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .nfkd()
        .flat_map(char::to_lowercase)
        .filter(char::is_ascii)
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Folds diacritics without touching case or spacing, for display names.
pub fn fold_diacritics(text: &str) -> String {
    text.nfkd().filter(char::is_ascii).collect()
}
