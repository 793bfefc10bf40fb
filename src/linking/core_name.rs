use lazy_static::lazy_static;
use regex::Regex;

use crate::text::{normalize, AliasMap};

const MAX_CORE_TOKENS: usize = 3;

/// Pharmaceutical forms and release modifiers that never belong to a drug name.
const FORM_WORDS: &[&str] = &[
    "aerosol", "bruistablet", "capsule", "capsules", "caps", "creme", "dragee", "drank",
    "druppels", "edo", "ellipta", "emulsie", "fl", "flacon", "fo", "filmomhuld", "gel",
    "inhalatie", "inhalatiepoeder", "inhalator", "inj", "injectie", "injsusp", "injvlst",
    "infuus", "kauwtablet", "mga", "msr", "neusspray", "oogdruppels", "oordruppels",
    "oplossing", "pdr", "pleister", "poeder", "sachet", "smelttablet", "spray", "susp",
    "suspensie", "tablet", "tabletten", "vloeistof", "zalf", "zetpil", "zetpillen",
];

/// Dosage units.
const UNITS: &[&str] = &[
    "dosis", "g", "gram", "ie", "mcg", "mg", "microgram", "milligram", "ml", "mmol", "ppm",
    "ug",
];

lazy_static! {
    static ref BRACKETED: Regex =
        Regex::new(r"\([^)]*\)|\[[^\]]*\]").expect("bracket pattern is valid");
    // Alphabetic runs (slash compounds kept whole) or numeric-leading runs
    static ref TOKEN: Regex =
        Regex::new(r"[a-z]+(?:/[a-z]+)*|[0-9][a-z0-9%/.,]*").expect("token pattern is valid");
}

/// Reduce a medication line or text fragment to its 1-3 token core name.
///
/// Tokens are taken left to right until one is a unit, a form word or contains
/// a digit. Slash compounds count as one token and come out space-separated,
/// so `Beclometason/Formoterol 100/6 aerosol` gives `beclometason formoterol`.
pub fn extract_core(text: &str, aliases: &AliasMap, apply_alias: bool) -> String {
    let source = if apply_alias {
        aliases.apply(text)
    } else {
        text.to_string()
    };
    let stripped = BRACKETED.replace_all(&source, " ");
    let normalized = normalize(&stripped);

    let tokens: Vec<&str> = TOKEN.find_iter(&normalized).map(|m| m.as_str()).collect();

    let mut core: Vec<&str> = Vec::with_capacity(MAX_CORE_TOKENS);
    for &token in &tokens {
        if is_terminator(token) {
            break;
        }
        core.push(token);
        if core.len() == MAX_CORE_TOKENS {
            break;
        }
    }

    let joined = if core.is_empty() {
        tokens
            .first()
            .map(|first| {
                first
                    .chars()
                    .filter(|c| c.is_ascii_alphabetic() || *c == '/')
                    .collect::<String>()
            })
            .unwrap_or_default()
    } else {
        core.join(" ")
    };

    normalize(&joined.replace('/', " "))
}

fn is_terminator(token: &str) -> bool {
    if token.chars().any(|c| c.is_ascii_digit()) {
        return true;
    }
    token
        .split('/')
        .all(|part| UNITS.contains(&part) || FORM_WORDS.contains(&part))
}
