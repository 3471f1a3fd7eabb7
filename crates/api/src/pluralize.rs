//! Plural forms for content names.

use crate::naming::split_words;

/// Turns a singular noun (or a PascalCase identifier ending in one) into its plural.
pub trait Pluralizer: Send + Sync {
    fn plural(&self, word: &str) -> String;
}

impl<F> Pluralizer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn plural(&self, word: &str) -> String {
        self(word)
    }
}

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("tooth", "teeth"),
    ("foot", "feet"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("ox", "oxen"),
    ("datum", "data"),
    ("index", "indices"),
    ("matrix", "matrices"),
    ("criterion", "criteria"),
    ("analysis", "analyses"),
    ("leaf", "leaves"),
    ("life", "lives"),
    ("knife", "knives"),
    ("wife", "wives"),
    ("half", "halves"),
    ("wolf", "wolves"),
    ("shelf", "shelves"),
    ("hero", "heroes"),
    ("potato", "potatoes"),
    ("tomato", "tomatoes"),
];

const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "deer",
    "news",
    "metadata",
];

/// Rule-based English pluralizer.
///
/// Only the last word of a compound identifier is inflected and its leading
/// capital is kept: `OrderItem` → `OrderItems`, `Person` → `People`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishPluralizer;

impl EnglishPluralizer {
    fn plural_word(word: &str) -> String {
        let lower = word.to_lowercase();

        if UNCOUNTABLE.contains(&lower.as_str()) {
            return word.to_string();
        }
        if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == lower) {
            return match_capital(word, plural);
        }

        let stem = &word[..word.len() - word.chars().last().map_or(0, char::len_utf8)];
        if lower.ends_with('y') && !ends_with_vowel_y(&lower) {
            return format!("{stem}ies");
        }
        if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| lower.ends_with(suffix)) {
            return format!("{word}es");
        }
        format!("{word}s")
    }
}

impl Pluralizer for EnglishPluralizer {
    fn plural(&self, word: &str) -> String {
        let words = split_words(word);
        let Some(last) = words.last() else {
            return String::new();
        };
        let head = &word[..word.len() - last.len()];
        // Trailing digits are not a noun.
        if !last.chars().any(char::is_alphabetic) {
            return word.to_string();
        }
        format!("{head}{}", Self::plural_word(last))
    }
}

fn ends_with_vowel_y(lower: &str) -> bool {
    let mut rev = lower.chars().rev();
    rev.next();
    matches!(rev.next(), Some('a' | 'e' | 'i' | 'o' | 'u'))
}

fn match_capital(original: &str, plural: &str) -> String {
    let mut chars = plural.chars();
    match (original.chars().next(), chars.next()) {
        (Some(o), Some(first)) if o.is_uppercase() => first.to_uppercase().chain(chars).collect(),
        _ => plural.to_string(),
    }
}
