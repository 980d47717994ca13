//! Filtered, sorted view over one snapshot of the catalog.

use std::cmp::{Ordering, Reverse};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use feruca::Collator;
use serde::{Deserialize, Serialize};

use crate::domain::{ArtistRecord, RecordId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SortKey {
    /// Summed training count, highest first.
    #[default]
    Count,
    /// Name, ascending.
    Name,
    /// Creation date, newest first.
    Date,
    /// Any other key: snapshot order is kept.
    Unsorted,
}

impl FromStr for SortKey {
    type Err = Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value.trim().to_lowercase().as_str() {
            "count" => SortKey::Count,
            "name" => SortKey::Name,
            "date" => SortKey::Date,
            _ => SortKey::Unsorted,
        })
    }
}

impl From<String> for SortKey {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(key) => key,
            Err(never) => match never {},
        }
    }
}

impl From<SortKey> for String {
    fn from(value: SortKey) -> Self {
        value.to_string()
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Count => write!(f, "count"),
            SortKey::Name => write!(f, "name"),
            SortKey::Date => write!(f, "date"),
            SortKey::Unsorted => write!(f, "none"),
        }
    }
}

/// Browsing state carried between refreshes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub search_term: String,
    pub sort_key: SortKey,
    pub selected: Option<RecordId>,
}

impl ViewState {
    pub fn new(sort_key: SortKey) -> Self {
        Self {
            sort_key,
            ..Self::default()
        }
    }

    pub fn with_search(mut self, term: &str) -> Self {
        self.search_term = term.to_string();
        self
    }

    pub fn with_selection(mut self, id: Option<RecordId>) -> Self {
        self.selected = id;
        self
    }

    /// Rebuild the view and drop the selection if the selected record was
    /// filtered out or no longer exists.
    pub fn refresh(&mut self, records: &[ArtistRecord]) -> View {
        let view = build_view(records, self);
        self.selected = view.selected.as_ref().map(|record| record.id);
        view
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    pub records: Vec<ViewEntry>,
    pub selected: Option<ArtistRecord>,
}

impl View {
    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(|entry| entry.record.id).collect()
    }
}

/// A record plus the aggregates shown next to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewEntry {
    #[serde(flatten)]
    pub record: ArtistRecord,
    pub total_training_count: i64,
}

pub fn build_view(records: &[ArtistRecord], state: &ViewState) -> View {
    let term = state.search_term.to_lowercase();
    let mut visible = records
        .iter()
        .filter(|record| matches_search(record, &term))
        .cloned()
        .collect::<Vec<_>>();
    sort_records(&mut visible, state.sort_key);

    let selected = state
        .selected
        .and_then(|id| visible.iter().find(|record| record.id == id).cloned());

    View {
        records: visible
            .into_iter()
            .map(|record| ViewEntry {
                total_training_count: sum_training_count(&record),
                record,
            })
            .collect(),
        selected,
    }
}

/// `term` must already be lowercase. An empty term matches everything.
pub fn matches_search(record: &ArtistRecord, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let contains = |value: &str| value.to_lowercase().contains(term);
    contains(&record.name)
        || record.artist_ids.iter().any(|id| contains(id.as_str()))
        || contains(&record.style_description)
        || record.trigger_words.iter().any(|word| contains(word.as_str()))
        || record.tags.iter().any(|tag| contains(tag.as_str()))
}

/// Stable sort; ties keep snapshot order.
pub fn sort_records(records: &mut [ArtistRecord], key: SortKey) {
    match key {
        SortKey::Count => records.sort_by_cached_key(|record| Reverse(sum_training_count(record))),
        SortKey::Name => {
            let mut collator = Collator::default();
            records.sort_by(|a, b| collate_names(&mut collator, &a.name, &b.name))
        }
        SortKey::Date => {
            records.sort_by_cached_key(|record| Reverse(parse_create_time(&record.create_time)))
        }
        SortKey::Unsorted => {}
    }
}

pub fn sum_training_count(record: &ArtistRecord) -> i64 {
    record
        .training_counts
        .iter()
        .fold(0i64, |sum, count| sum.saturating_add(*count))
}

/// Unicode root collation (accents and case are secondary to the base
/// letters, so "Émile" sorts between "apple" and "Zed"); exact text breaks
/// ties so the order is total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    collate_names(&mut Collator::default(), a, b)
}

fn collate_names(collator: &mut Collator, a: &str, b: &str) -> Ordering {
    collator
        .collate(a.trim(), b.trim())
        .then_with(|| a.cmp(b))
}

/// Dates are stored as `YYYY-MM-DD`; full RFC 3339 timestamps are accepted
/// too. Unparseable values sort after every real date.
pub fn parse_create_time(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|stamp| stamp.date_naive())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ImageRef;

    fn record(id: u64, name: &str, counts: &[i64], date: &str) -> ArtistRecord {
        ArtistRecord {
            id: RecordId::new(id),
            name: name.to_string(),
            artist_ids: vec![format!("id-{id}")],
            training_counts: counts.to_vec(),
            preview_image: ImageRef::artist_placeholder(),
            sample_images: Vec::new(),
            tags: Vec::new(),
            trigger_words: Vec::new(),
            style_description: String::new(),
            create_time: date.to_string(),
        }
    }

    fn names(view: &View) -> Vec<&str> {
        view.records
            .iter()
            .map(|entry| entry.record.name.as_str())
            .collect()
    }

    #[test]
    fn sum_of_empty_counts_is_zero() {
        assert_eq!(sum_training_count(&record(1, "a", &[], "")), 0);
        assert_eq!(sum_training_count(&record(1, "a", &[100, 50], "")), 150);
    }

    #[test]
    fn sort_by_count_descending() {
        let records = vec![
            record(1, "low", &[1], "2024-01-01"),
            record(2, "high", &[10, 20], "2024-01-01"),
            record(3, "mid", &[15], "2024-01-01"),
        ];
        let view = build_view(&records, &ViewState::new(SortKey::Count));
        assert_eq!(names(&view), vec!["high", "mid", "low"]);
        assert_eq!(view.records[0].total_training_count, 30);
    }

    #[test]
    fn sort_by_name_ignores_case() {
        let records = vec![
            record(1, "Ω-art", &[0], ""),
            record(2, "Zed", &[0], ""),
            record(3, "beta", &[0], ""),
            record(4, "Alpha", &[0], ""),
        ];
        let view = build_view(&records, &ViewState::new(SortKey::Name));
        assert_eq!(names(&view), vec!["Alpha", "beta", "Zed", "Ω-art"]);
    }

    #[test]
    fn sort_by_name_places_accented_letters_with_their_base() {
        let records = vec![
            record(1, "Zed", &[0], ""),
            record(2, "Émile", &[0], ""),
            record(3, "apple", &[0], ""),
            record(4, "Ölund", &[0], ""),
        ];
        let view = build_view(&records, &ViewState::new(SortKey::Name));
        assert_eq!(names(&view), vec!["apple", "Émile", "Ölund", "Zed"]);
        assert_ne!(compare_names("éclair", "Eclair"), Ordering::Equal);
        assert_eq!(compare_names("Émile", "Zed"), Ordering::Less);
    }

    #[test]
    fn sort_by_date_newest_first() {
        let records = vec![
            record(1, "old", &[0], "2023-05-01"),
            record(2, "broken", &[0], "not a date"),
            record(3, "new", &[0], "2024-02-10"),
            record(4, "stamp", &[0], "2023-12-31T23:00:00Z"),
        ];
        let view = build_view(&records, &ViewState::new(SortKey::Date));
        assert_eq!(names(&view), vec!["new", "stamp", "old", "broken"]);
    }

    #[test]
    fn unknown_sort_key_keeps_order() {
        let key: SortKey = "popularity".parse().unwrap();
        assert_eq!(key, SortKey::Unsorted);
        let records = vec![record(1, "b", &[1], ""), record(2, "a", &[9], "")];
        let view = build_view(&records, &ViewState::new(key));
        assert_eq!(names(&view), vec!["b", "a"]);
    }

    #[test]
    fn search_spans_all_text_fields() {
        let mut tagged = record(1, "Foo", &[0], "");
        tagged.tags = vec!["Category A".to_string()];
        let mut styled = record(2, "Bar", &[0], "");
        styled.style_description = "Muted CATS".to_string();
        let mut triggered = record(3, "Baz", &[0], "");
        triggered.trigger_words = vec!["scatter".to_string()];
        let plain = record(4, "Qux", &[0], "");

        let records = vec![tagged, styled, triggered, plain];
        let view = build_view(
            &records,
            &ViewState::new(SortKey::Unsorted).with_search("Cat"),
        );
        assert_eq!(names(&view), vec!["Foo", "Bar", "Baz"]);

        let by_id = build_view(&records, &ViewState::new(SortKey::Unsorted).with_search("ID-4"));
        assert_eq!(names(&by_id), vec!["Qux"]);
    }

    #[test]
    fn selection_cleared_when_filtered_out() {
        let records = vec![record(1, "Foo", &[0], ""), record(2, "Bar", &[0], "")];
        let mut state = ViewState::new(SortKey::Name).with_selection(Some(RecordId::new(1)));

        let view = state.refresh(&records);
        assert_eq!(view.selected.map(|record| record.id), Some(RecordId::new(1)));
        assert_eq!(state.selected, Some(RecordId::new(1)));

        state.search_term = "bar".to_string();
        let view = state.refresh(&records);
        assert!(view.selected.is_none());
        assert_eq!(state.selected, None);

        state.search_term.clear();
        let view = state.refresh(&records);
        assert!(view.selected.is_none());
        assert_eq!(view.ids(), vec![RecordId::new(2), RecordId::new(1)]);
    }
}
