use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::normalize::{self, CountInput, ListInput};

/// Prefix under which every managed image is referenced.
pub const IMAGE_REF_PREFIX: &str = "/images/";
pub const PLACEHOLDER_PREFIX: &str = "placeholder-";
pub const PLACEHOLDER_ARTIST_FILE: &str = "placeholder-artist.png";
pub const PLACEHOLDER_SAMPLE_FILE: &str = "placeholder-sample.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| CatalogError::InvalidRecordId(value.to_string()))
    }
}

/// Reference to an image as stored in a record, e.g. `/images/foo-preview-1.png`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn for_file(file_name: &str) -> Self {
        Self(format!("{IMAGE_REF_PREFIX}{file_name}"))
    }

    pub fn artist_placeholder() -> Self {
        Self::for_file(PLACEHOLDER_ARTIST_FILE)
    }

    pub fn sample_placeholder() -> Self {
        Self::for_file(PLACEHOLDER_SAMPLE_FILE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bare file name inside the managed image directory, or `None` when
    /// the reference points anywhere else.
    pub fn file_name(&self) -> Option<&str> {
        let name = self.0.strip_prefix(IMAGE_REF_PREFIX)?;
        let is_plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && !name.contains('\0');
        is_plain.then_some(name)
    }

    pub fn is_placeholder(&self) -> bool {
        self.0.is_empty()
            || self
                .file_name()
                .map(|name| name.starts_with(PLACEHOLDER_PREFIX))
                .unwrap_or(false)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Preview,
    Sample,
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageKind::Preview => write!(f, "preview"),
            ImageKind::Sample => write!(f, "sample"),
        }
    }
}

/// The persisted artist document. Field names on disk keep the legacy
/// layout (`artistId`, `trainingCount`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistRecord {
    pub id: RecordId,
    pub name: String,
    #[serde(
        rename = "artistId",
        alias = "artistIds",
        default,
        deserialize_with = "normalize::de_string_list"
    )]
    pub artist_ids: Vec<String>,
    #[serde(
        rename = "trainingCount",
        alias = "trainingCounts",
        default,
        deserialize_with = "normalize::de_count_list"
    )]
    pub training_counts: Vec<i64>,
    #[serde(default = "ImageRef::artist_placeholder")]
    pub preview_image: ImageRef,
    #[serde(default)]
    pub sample_images: Vec<ImageRef>,
    #[serde(default, deserialize_with = "normalize::de_string_list")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "normalize::de_string_list")]
    pub trigger_words: Vec<String>,
    #[serde(default)]
    pub style_description: String,
    #[serde(default)]
    pub create_time: String,
}

impl ArtistRecord {
    /// Images this record owns, i.e. everything it references except the
    /// shared placeholders.
    pub fn owned_images(&self) -> Vec<ImageRef> {
        std::iter::once(&self.preview_image)
            .chain(self.sample_images.iter())
            .filter(|image| !image.is_placeholder())
            .cloned()
            .collect()
    }
}

/// A submitted record, before normalization. Absent fields mean "use the
/// default" on create and "keep the current value" on replace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "artistId",
        alias = "artistIds",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub artist_ids: Option<ListInput>,
    #[serde(
        rename = "trainingCount",
        alias = "trainingCounts",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub training_counts: Option<CountInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_image: Option<ImageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_images: Option<Vec<ImageRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<ListInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_words: Option<ListInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
}

impl FromStr for ArtistDraft {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(value).map_err(|err| CatalogError::InvalidDraft(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_record_id() {
        let id: RecordId = " 1718000000000 ".parse().unwrap();
        assert_eq!(id.as_u64(), 1_718_000_000_000);
        let err = "abc".parse::<RecordId>().unwrap_err();
        assert_matches!(err, CatalogError::InvalidRecordId(_));
    }

    #[test]
    fn image_ref_confined_to_image_dir() {
        assert_eq!(
            ImageRef::new("/images/foo-preview-1.png").file_name(),
            Some("foo-preview-1.png")
        );
        assert_eq!(ImageRef::new("/images/../secret.json").file_name(), None);
        assert_eq!(ImageRef::new("/etc/passwd").file_name(), None);
        assert_eq!(ImageRef::new("/images/").file_name(), None);
    }

    #[test]
    fn placeholders_are_recognized() {
        assert!(ImageRef::artist_placeholder().is_placeholder());
        assert!(ImageRef::sample_placeholder().is_placeholder());
        assert!(ImageRef::new("").is_placeholder());
        assert!(!ImageRef::new("/images/foo-sample-1.png").is_placeholder());
    }

    #[test]
    fn legacy_document_is_normalized() {
        let json = r#"{
            "id": 1700000000000,
            "name": "Foo",
            "artistId": "f1, f2",
            "trainingCount": ["5", "x", 3],
            "tags": null,
            "triggerWords": ["blue"]
        }"#;
        let record: ArtistRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.artist_ids, vec!["f1", "f2"]);
        assert_eq!(record.training_counts, vec![5, 0, 3]);
        assert!(record.tags.is_empty());
        assert_eq!(record.preview_image, ImageRef::artist_placeholder());
        assert!(record.sample_images.is_empty());
    }

    #[test]
    fn owned_images_skip_placeholders() {
        let record = ArtistRecord {
            id: RecordId::new(1),
            name: "Foo".to_string(),
            artist_ids: vec!["f1".to_string()],
            training_counts: vec![0],
            preview_image: ImageRef::artist_placeholder(),
            sample_images: vec![
                ImageRef::new("/images/Foo-sample-1.png"),
                ImageRef::sample_placeholder(),
            ],
            tags: Vec::new(),
            trigger_words: Vec::new(),
            style_description: String::new(),
            create_time: "2024-01-01".to_string(),
        };
        assert_eq!(
            record.owned_images(),
            vec![ImageRef::new("/images/Foo-sample-1.png")]
        );
    }

    #[test]
    fn draft_accepts_joined_and_plural_keys() {
        let draft: ArtistDraft =
            r#"{"name": "Foo", "artistIds": ["f1"], "trainingCounts": "1, 2"}"#
                .parse()
                .unwrap();
        assert_eq!(draft.name.as_deref(), Some("Foo"));
        assert_eq!(draft.artist_ids, Some(ListInput::List(vec!["f1".to_string()])));
        assert!(draft.training_counts.is_some());
    }
}
