//! Identifier case helpers.

/// Splits a PascalCase/camelCase identifier into its words.
///
/// A new word starts at an upper-case letter that follows a non-upper-case
/// character, or at an upper-case letter followed by a lower-case one (so
/// acronyms stay together: `XMLParser` → `["XML", "Parser"]`). Digits stay
/// attached to the word before them.
///
/// ```
/// # use crudkit_api::naming::split_words;
/// assert_eq!(split_words("Split10CamelCase"), ["Split10", "Camel", "Case"]);
/// assert_eq!(split_words("10SplitCamelCase"), ["10", "Split", "Camel", "Case"]);
/// ```
pub fn split_words(identifier: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = identifier.char_indices().collect();
    let mut words = Vec::new();
    let mut start = 0;

    for i in 1..chars.len() {
        let (offset, c) = chars[i];
        if !c.is_ascii_uppercase() {
            continue;
        }
        let after_lower = !chars[i - 1].1.is_ascii_uppercase();
        let before_lower = chars.get(i + 1).is_some_and(|(_, n)| n.is_ascii_lowercase());
        if after_lower || before_lower {
            words.push(&identifier[start..offset]);
            start = offset;
        }
    }

    if start < identifier.len() {
        words.push(&identifier[start..]);
    }
    words
}

/// First word of `identifier`, lower-cased: `UserResponse` → `user`.
pub fn first_word(identifier: &str) -> String {
    split_words(identifier)
        .first()
        .map(|w| w.to_lowercase())
        .unwrap_or_default()
}

/// `UserResponses` → `user_responses`.
pub fn snake_case(identifier: &str) -> String {
    split_words(identifier)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}
