//! Trigger-word chains.
//!
//! A chain is a comma-joined list of trigger words assembled from several
//! artists. Appending dedups tokens case-sensitively; matching a chain back to
//! artists compares case-insensitively.

use std::collections::HashSet;

use serde::Serialize;

use crate::domain::{ArtistDraft, ArtistRecord, RecordId};
use crate::normalize::{CountInput, ListInput, split_list};

pub const CHAIN_SEPARATOR: &str = ", ";

/// Add the record's trigger words to the end of `chain`, keeping existing
/// tokens in place. A record without trigger words leaves `chain` untouched.
pub fn append_trigger_words(chain: &str, record: &ArtistRecord) -> String {
    let incoming = record
        .trigger_words
        .iter()
        .flat_map(|word| split_list(word))
        .collect::<Vec<_>>();
    if incoming.is_empty() {
        return chain.to_string();
    }

    let mut seen = HashSet::new();
    split_list(chain)
        .into_iter()
        .chain(incoming)
        .filter(|token| seen.insert(token.clone()))
        .collect::<Vec<_>>()
        .join(CHAIN_SEPARATOR)
}

/// Fold [`append_trigger_words`] over `records` in order.
pub fn compose_chain<'a, I>(chain: &str, records: I) -> String
where
    I: IntoIterator<Item = &'a ArtistRecord>,
{
    records
        .into_iter()
        .fold(chain.to_string(), |chain, record| {
            append_trigger_words(&chain, record)
        })
}

/// Everything a chain points back to: the matching records plus the union of
/// their artist ids and training counts, each in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChainMatch {
    pub records: Vec<RecordId>,
    pub artist_ids: Vec<String>,
    pub training_counts: Vec<i64>,
}

impl ChainMatch {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Seed a creation draft: the chain becomes the trigger words and the
    /// matched ids and counts become candidates. Nothing is created here.
    pub fn into_draft(self, chain_text: &str) -> ArtistDraft {
        let trigger_words = split_list(chain_text);
        ArtistDraft {
            artist_ids: (!self.artist_ids.is_empty()).then(|| ListInput::List(self.artist_ids)),
            training_counts: (!self.training_counts.is_empty())
                .then(|| CountInput::from(self.training_counts)),
            trigger_words: (!trigger_words.is_empty()).then(|| ListInput::List(trigger_words)),
            ..ArtistDraft::default()
        }
    }
}

/// A record matches when any of its trigger words, case-folded, is one of the
/// chain's words.
pub fn match_records_by_chain(chain_text: &str, records: &[ArtistRecord]) -> ChainMatch {
    let chain_words = split_list(chain_text)
        .into_iter()
        .map(|word| word.to_lowercase())
        .collect::<HashSet<_>>();

    let mut result = ChainMatch::default();
    if chain_words.is_empty() {
        return result;
    }

    let mut seen_ids = HashSet::new();
    let mut seen_counts = HashSet::new();
    for record in records {
        let is_match = record
            .trigger_words
            .iter()
            .any(|word| chain_words.contains(&word.to_lowercase()));
        if !is_match {
            continue;
        }
        result.records.push(record.id);
        for id in &record.artist_ids {
            if seen_ids.insert(id.as_str()) {
                result.artist_ids.push(id.clone());
            }
        }
        for count in &record.training_counts {
            if seen_counts.insert(*count) {
                result.training_counts.push(*count);
            }
        }
    }
    result
}
