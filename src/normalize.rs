//! Canonical forms for free-text comparison and URL slugs.

use unicode_normalization::UnicodeNormalization;

/// Combining diacritical marks block stripped after decomposition
fn is_diacritic(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}

fn strip_accents(text: &str) -> String {
    text.nfd().filter(|c| !is_diacritic(*c)).collect()
}

/// Accent-free, upper-cased, trimmed form of a name.
///
/// `None` and `""` give `None`. Internal whitespace is left untouched.
pub fn normalize_name(name: Option<&str>) -> Option<String> {
    let name = name.filter(|n| !n.is_empty())?;
    Some(strip_accents(name).to_uppercase().trim().to_string())
}

/// Lower-case, hyphenated path segment ("Rio de Janeiro" -> "rio-de-janeiro")
pub fn slugify(value: &str) -> String {
    let cleaned: String = strip_accents(value)
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join("-")
}
