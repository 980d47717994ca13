//! Uniqueness of artist id sets across the catalog.

use serde::{Deserialize, Serialize};

use crate::domain::{ArtistRecord, RecordId};

/// When the identity-set check runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Only creation is gated; replacing a record never re-checks.
    #[default]
    CreateOnly,
    CreateAndUpdate,
}

impl DuplicatePolicy {
    pub fn checks_updates(self) -> bool {
        matches!(self, DuplicatePolicy::CreateAndUpdate)
    }
}

/// Case-folded, sorted form of an id list. Two records collide when their
/// keys are equal; subsets and supersets never collide.
pub fn identity_key<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    let mut key = ids
        .iter()
        .map(|id| id.as_ref().to_lowercase())
        .collect::<Vec<_>>();
    key.sort();
    key
}

pub fn is_duplicate_identity_set<S: AsRef<str>>(candidate: &[S], existing: &[ArtistRecord]) -> bool {
    find_identity_collision(candidate, existing, None).is_some()
}

/// First record whose identity set equals `candidate`, ignoring `exclude`
/// (the record being replaced, when checking an update).
pub fn find_identity_collision<'a, S: AsRef<str>>(
    candidate: &[S],
    existing: &'a [ArtistRecord],
    exclude: Option<RecordId>,
) -> Option<&'a ArtistRecord> {
    let key = identity_key(candidate);
    existing
        .iter()
        .filter(|record| Some(record.id) != exclude)
        .find(|record| identity_key(&record.artist_ids) == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ImageRef;

    fn record(id: u64, ids: &[&str]) -> ArtistRecord {
        ArtistRecord {
            id: RecordId::new(id),
            name: format!("artist-{id}"),
            artist_ids: ids.iter().map(|id| id.to_string()).collect(),
            training_counts: vec![0],
            preview_image: ImageRef::artist_placeholder(),
            sample_images: Vec::new(),
            tags: Vec::new(),
            trigger_words: Vec::new(),
            style_description: String::new(),
            create_time: "2024-01-01".to_string(),
        }
    }

    #[test]
    fn order_and_case_are_ignored() {
        let existing = vec![record(1, &["A", "b"])];
        assert!(is_duplicate_identity_set(&["b", "a"], &existing));
        assert!(is_duplicate_identity_set(&["B", "A"], &existing));
    }

    #[test]
    fn subsets_and_supersets_do_not_collide() {
        let existing = vec![record(1, &["A", "b"])];
        assert!(!is_duplicate_identity_set(&["A", "b", "c"], &existing));
        assert!(!is_duplicate_identity_set(&["A"], &existing));
    }

    #[test]
    fn joined_ids_do_not_alias_separate_ids() {
        let existing = vec![record(1, &["a", "b"])];
        assert!(!is_duplicate_identity_set(&["a,b"], &existing));
    }

    #[test]
    fn excluded_record_is_skipped() {
        let existing = vec![record(1, &["x"]), record(2, &["y"])];
        assert!(find_identity_collision(&["x"], &existing, Some(RecordId::new(1))).is_none());
        let hit = find_identity_collision(&["Y"], &existing, Some(RecordId::new(1))).unwrap();
        assert_eq!(hit.id, RecordId::new(2));
    }

    #[test]
    fn policy_defaults_to_create_only() {
        assert!(!DuplicatePolicy::default().checks_updates());
        assert!(DuplicatePolicy::CreateAndUpdate.checks_updates());
    }
}
