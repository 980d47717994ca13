//! Canonicalization of multi-valued record fields.
//!
//! Record fields such as artist ids, training counts, tags and trigger words
//! arrive either as JSON arrays or as one comma-joined string typed into a
//! form. Everything that crosses this module comes out as an ordered `Vec`.

use serde::{Deserialize, Deserializer, Serialize};

/// A list field as submitted: already a sequence, or one comma-joined string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListInput {
    List(Vec<String>),
    Joined(String),
}

impl ListInput {
    /// Sequences pass through untouched; joined strings are split.
    pub fn normalize(self) -> Vec<String> {
        match self {
            ListInput::List(items) => items,
            ListInput::Joined(text) => split_list(&text),
        }
    }
}

impl From<&str> for ListInput {
    fn from(value: &str) -> Self {
        ListInput::Joined(value.to_string())
    }
}

impl From<Vec<String>> for ListInput {
    fn from(value: Vec<String>) -> Self {
        ListInput::List(value)
    }
}

/// One element of a training-count sequence. Older documents and hand-edited
/// drafts carry counts as strings as often as numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CountToken {
    Number(i64),
    Fraction(f64),
    Text(String),
}

impl CountToken {
    pub fn value(&self) -> i64 {
        match self {
            CountToken::Number(value) => *value,
            CountToken::Fraction(value) if value.is_finite() => value.trunc() as i64,
            CountToken::Fraction(_) => 0,
            CountToken::Text(text) => coerce_count(text),
        }
    }
}

/// A training-count field as submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CountInput {
    List(Vec<CountToken>),
    Single(CountToken),
}

impl From<&str> for CountInput {
    fn from(value: &str) -> Self {
        CountInput::Single(CountToken::Text(value.to_string()))
    }
}

impl From<Vec<i64>> for CountInput {
    fn from(value: Vec<i64>) -> Self {
        CountInput::List(value.into_iter().map(CountToken::Number).collect())
    }
}

/// What an absent (or blank) training-count input turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountDefault {
    /// Update path: nothing submitted means no counts.
    Empty,
    /// Create path: a new record always starts with one zero count.
    Zero,
}

impl CountInput {
    pub fn normalize(self, default: CountDefault) -> Vec<i64> {
        match self {
            CountInput::List(tokens) => tokens.iter().map(CountToken::value).collect(),
            CountInput::Single(CountToken::Text(text)) if text.trim().is_empty() => {
                default_counts(default)
            }
            CountInput::Single(CountToken::Text(text)) => split_counts(&text),
            CountInput::Single(token) => vec![token.value()],
        }
    }
}

/// Split on `,`, trim each piece and drop the empty ones.
pub fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

/// Like [`split_list`], every surviving piece coerced with [`coerce_count`].
pub fn split_counts(text: &str) -> Vec<i64> {
    text.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(coerce_count)
        .collect()
}

/// Reads the leading integer of `piece` (optional sign, then digits). Anything
/// without a leading integer, or out of range, is `0`; it is never dropped.
pub fn coerce_count(piece: &str) -> i64 {
    let trimmed = piece.trim();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits_end = rest
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..digits_end]
        .parse::<i64>()
        .map(|value| sign * value)
        .unwrap_or(0)
}

pub fn normalize_list(input: Option<ListInput>) -> Vec<String> {
    input.map(ListInput::normalize).unwrap_or_default()
}

pub fn normalize_counts(input: Option<CountInput>, default: CountDefault) -> Vec<i64> {
    match input {
        Some(input) => input.normalize(default),
        None => default_counts(default),
    }
}

fn default_counts(default: CountDefault) -> Vec<i64> {
    match default {
        CountDefault::Empty => Vec::new(),
        CountDefault::Zero => vec![0],
    }
}

/// `deserialize_with` helper for stored list fields: tolerates `null`, a bare
/// comma-joined string, or an array.
pub fn de_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(normalize_list(Option::<ListInput>::deserialize(deserializer)?))
}

/// `deserialize_with` helper for stored training counts.
pub fn de_count_list<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(normalize_counts(
        Option::<CountInput>::deserialize(deserializer)?,
        CountDefault::Empty,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_trims_and_drops_empty_pieces() {
        assert_eq!(
            split_list(" a1, ,b2 ,, c3 "),
            vec!["a1".to_string(), "b2".to_string(), "c3".to_string()]
        );
        assert!(split_list("").is_empty());
        assert!(split_list(" , ,").is_empty());
    }

    #[test]
    fn malformed_counts_become_zero() {
        assert_eq!(split_counts("100, abc, 50"), vec![100, 0, 50]);
        assert_eq!(coerce_count("12px"), 12);
        assert_eq!(coerce_count("-4"), -4);
        assert_eq!(coerce_count("+9"), 9);
        assert_eq!(coerce_count("x"), 0);
        assert_eq!(coerce_count("99999999999999999999999"), 0);
    }

    #[test]
    fn list_input_passes_sequences_through() {
        let input = ListInput::List(vec![" keep ".to_string(), String::new()]);
        assert_eq!(input.normalize(), vec![" keep ".to_string(), String::new()]);
    }

    #[test]
    fn count_defaults_depend_on_path() {
        assert_eq!(normalize_counts(None, CountDefault::Zero), vec![0]);
        assert!(normalize_counts(None, CountDefault::Empty).is_empty());
        assert_eq!(
            normalize_counts(Some(CountInput::from("  ")), CountDefault::Zero),
            vec![0]
        );
        assert_eq!(
            normalize_counts(Some(CountInput::from(vec![])), CountDefault::Zero),
            Vec::<i64>::new()
        );
    }

    #[test]
    fn count_input_accepts_mixed_json() {
        let input: CountInput = serde_json::from_str(r#"["5", "x", 3, 2.9]"#).unwrap();
        assert_eq!(input.normalize(CountDefault::Empty), vec![5, 0, 3, 2]);

        let input: CountInput = serde_json::from_str(r#""10, 20""#).unwrap();
        assert_eq!(input.normalize(CountDefault::Empty), vec![10, 20]);

        let input: CountInput = serde_json::from_str("42").unwrap();
        assert_eq!(input.normalize(CountDefault::Empty), vec![42]);
    }
}
