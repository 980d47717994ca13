use std::fs;
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::domain::{ArtistRecord, PLACEHOLDER_ARTIST_FILE, PLACEHOLDER_SAMPLE_FILE, RecordId};
use crate::error::CatalogError;
use crate::fs_util::write_atomic;

static ILLEGAL_FILE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|]"#).expect("valid file name pattern"));

const PLACEHOLDER_ARTIST_SVG: &str = r##"<svg width="200" height="180" xmlns="http://www.w3.org/2000/svg"><rect width="200" height="180" fill="#e6e6fa"/><text x="50%" y="50%" font-family="Arial" font-size="18" text-anchor="middle" alignment-baseline="middle" fill="#777">Artist Image</text></svg>"##;
const PLACEHOLDER_SAMPLE_SVG: &str = r##"<svg width="100" height="80" xmlns="http://www.w3.org/2000/svg"><rect width="100" height="80" fill="#f0f0f0"/><text x="50%" y="50%" font-family="Arial" font-size="12" text-anchor="middle" alignment-baseline="middle" fill="#8a8c8a">Sample</text></svg>"##;

/// Directory of artist documents, one `<name>-<id>.json` file per record.
/// Uploaded images and the shared placeholders live in the same directory.
///
/// There is no index: every read scans the directory.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    /// Create the directory if needed and make sure both placeholders exist.
    pub fn open(root: Utf8PathBuf) -> Result<Self, CatalogError> {
        let store = Self::new(root);
        store.ensure_root()?;
        store.ensure_placeholders()?;
        Ok(store)
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn ensure_root(&self) -> Result<(), CatalogError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| CatalogError::Filesystem(err.to_string()))
    }

    pub fn ensure_placeholders(&self) -> Result<(), CatalogError> {
        for (file, svg) in [
            (PLACEHOLDER_ARTIST_FILE, PLACEHOLDER_ARTIST_SVG),
            (PLACEHOLDER_SAMPLE_FILE, PLACEHOLDER_SAMPLE_SVG),
        ] {
            let path = self.root.join(file);
            if !path.as_std_path().exists() {
                write_atomic(&path, svg.as_bytes())?;
                info!("created placeholder image {file}");
            }
        }
        Ok(())
    }

    pub fn record_path(&self, record: &ArtistRecord) -> Utf8PathBuf {
        self.root
            .join(format!("{}-{}.json", sanitize_file_name(&record.name), record.id))
    }

    /// Every readable document in the directory, in file name order.
    /// Documents that fail to parse are skipped with a warning.
    pub fn list_records(&self) -> Result<Vec<ArtistRecord>, CatalogError> {
        let mut records = Vec::new();
        for path in self.document_paths()? {
            let content = match fs::read_to_string(path.as_std_path()) {
                Ok(content) => content,
                Err(err) => {
                    warn!("skipping unreadable artist document {path}: {err}");
                    continue;
                }
            };
            match serde_json::from_str::<ArtistRecord>(&content) {
                Ok(record) => records.push(record),
                Err(err) => warn!("skipping malformed artist document {path}: {err}"),
            }
        }
        Ok(records)
    }

    pub fn find_record(&self, id: RecordId) -> Result<ArtistRecord, CatalogError> {
        self.list_records()?
            .into_iter()
            .find(|record| record.id == id)
            .ok_or(CatalogError::RecordNotFound(id))
    }

    /// Persist `record`, then drop any older document for the same id that was
    /// written under a different name. Older documents are only touched once
    /// the new one is in place.
    pub fn write_record(&self, record: &ArtistRecord) -> Result<Utf8PathBuf, CatalogError> {
        let path = self.record_path(record);
        let stale = self
            .documents_for(record.id)?
            .into_iter()
            .filter(|existing| *existing != path)
            .collect::<Vec<_>>();

        let content = serde_json::to_vec_pretty(record)
            .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
        write_atomic(&path, &content)?;
        info!("saved artist {} to {path}", record.id);

        for old in stale {
            match fs::remove_file(old.as_std_path()) {
                Ok(()) => info!("removed renamed artist document {old}"),
                Err(err) => warn!("could not remove renamed artist document {old}: {err}"),
            }
        }
        Ok(path)
    }

    pub fn remove_record(&self, id: RecordId) -> Result<(), CatalogError> {
        let documents = self.documents_for(id)?;
        if documents.is_empty() {
            return Err(CatalogError::RecordNotFound(id));
        }
        for path in documents {
            fs::remove_file(path.as_std_path())
                .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
            info!("deleted artist document {path}");
        }
        Ok(())
    }

    /// A fresh id: the current time in milliseconds, bumped past any id that
    /// already has a document.
    pub fn next_id(&self) -> Result<RecordId, CatalogError> {
        let taken = self
            .document_paths()?
            .iter()
            .filter_map(|path| document_id(path))
            .collect::<Vec<_>>();
        let mut candidate = Utc::now().timestamp_millis().max(0) as u64;
        while taken.contains(&RecordId::new(candidate)) {
            candidate += 1;
        }
        debug!("assigned artist id {candidate}");
        Ok(RecordId::new(candidate))
    }

    fn documents_for(&self, id: RecordId) -> Result<Vec<Utf8PathBuf>, CatalogError> {
        Ok(self
            .document_paths()?
            .into_iter()
            .filter(|path| document_id(path) == Some(id))
            .collect())
    }

    fn document_paths(&self) -> Result<Vec<Utf8PathBuf>, CatalogError> {
        if !self.root.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(self.root.as_std_path())
            .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| CatalogError::Filesystem(err.to_string()))?;
            let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
                continue;
            };
            if path.extension() == Some("json") && path.as_std_path().is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// Replace characters that are not allowed in file names with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    ILLEGAL_FILE_CHARS.replace_all(name, "_").into_owned()
}

/// The id encoded in a document file name: the digits after the last `-`.
fn document_id(path: &Utf8Path) -> Option<RecordId> {
    let (_, id) = path.file_stem()?.rsplit_once('-')?;
    id.parse().ok()
}
