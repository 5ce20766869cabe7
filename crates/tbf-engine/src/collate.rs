//! Locale-aware ordering for facet values.
//!
//! Values are compared case-insensitively with Latin diacritics folded onto
//! their base letter, so `Árbol` sorts next to `arbol` rather than after
//! `zapato`. `ñ` stays a letter of its own, between `n` and `o`. Exact ties
//! fall back to the raw strings so the order is total and deterministic.

use std::cmp::Ordering;

fn fold(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Primary sort weight of one character.
fn weight(c: char) -> (char, u8) {
    match c {
        // Sorts after every `n…` and before `o`.
        'ñ' => ('n', 1),
        other => (fold(other), 0),
    }
}

/// Case-insensitive dedup key. Accents stay significant.
#[must_use]
pub fn dedup_key(s: &str) -> String {
    s.to_lowercase()
}

/// Compares two facet values the way a shopper expects to read them.
#[must_use]
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let weights = |s: &str| -> Vec<(char, u8)> {
        s.chars().flat_map(char::to_lowercase).map(weight).collect()
    };
    weights(a).cmp(&weights(b)).then_with(|| a.cmp(b))
}
