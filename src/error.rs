use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::RecordId;

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("an artist with the same artist id set already exists: {0}")]
    #[diagnostic(help("artist id sets are compared case-insensitively and ignoring order"))]
    DuplicateIdentitySet(String),

    #[error("invalid artist record id: {0}")]
    InvalidRecordId(String),

    #[error("invalid artist draft: {0}")]
    InvalidDraft(String),

    #[error("only images (jpeg, jpg, png, gif, webp) are allowed: {0}")]
    InvalidImageType(String),

    #[error("image is {size} bytes, the limit is {limit} bytes")]
    ImageTooLarge { size: u64, limit: u64 },

    #[error("cannot delete placeholder images or files outside the image directory: {0}")]
    ForbiddenImage(String),

    #[error("sample image index {index} is out of range for artist {id}")]
    InvalidSampleIndex { id: RecordId, index: usize },

    #[error("artist not found: {0}")]
    RecordNotFound(RecordId),

    #[error("image file not found: {0}")]
    ImageNotFound(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("unsupported config schema_version {0}")]
    #[diagnostic(help("this build reads schema_version 1"))]
    UnsupportedSchemaVersion(u32),

    #[error("filesystem error: {0}")]
    #[diagnostic(help("check that the catalog data directory exists and is writable"))]
    Filesystem(String),
}

/// Coarse classification used by callers that only care how a failure should
/// be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Transport,
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::MissingField(_)
            | CatalogError::DuplicateIdentitySet(_)
            | CatalogError::InvalidRecordId(_)
            | CatalogError::InvalidDraft(_)
            | CatalogError::InvalidImageType(_)
            | CatalogError::ImageTooLarge { .. }
            | CatalogError::ForbiddenImage(_)
            | CatalogError::InvalidSampleIndex { .. }
            | CatalogError::ConfigParse(_)
            | CatalogError::UnsupportedSchemaVersion(_) => ErrorKind::Validation,
            CatalogError::RecordNotFound(_) | CatalogError::ImageNotFound(_) => {
                ErrorKind::NotFound
            }
            CatalogError::ConfigRead(_) | CatalogError::Filesystem(_) => ErrorKind::Transport,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_errors() {
        assert_eq!(
            CatalogError::DuplicateIdentitySet("a, b".to_string()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            CatalogError::ImageTooLarge { size: 11, limit: 10 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            CatalogError::RecordNotFound(RecordId::new(7)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CatalogError::Filesystem("disk gone".to_string()).kind(),
            ErrorKind::Transport
        );
    }
}
