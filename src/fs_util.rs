use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::CatalogError;

/// Write `content` next to `path` under a temporary name, then move it into
/// place. The temporary name never ends in `.json`, so a half-written file is
/// never picked up by a directory scan.
pub fn write_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), CatalogError> {
    let parent = path
        .parent()
        .ok_or_else(|| CatalogError::Filesystem(format!("invalid destination path {path}")))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
    let mut temp = Builder::new()
        .prefix(".artist-catalog")
        .suffix(".tmp")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| CatalogError::Filesystem(err.error.to_string()))?;
    Ok(())
}

/// One member of an export archive.
#[derive(Debug, Clone)]
pub enum ArchiveEntry {
    Bytes { name: String, content: Vec<u8> },
    File { name: String, source: Utf8PathBuf },
}

impl ArchiveEntry {
    fn name(&self) -> &str {
        match self {
            ArchiveEntry::Bytes { name, .. } | ArchiveEntry::File { name, .. } => name,
        }
    }
}

/// Build a zip archive at `dest`. The archive is assembled under a temporary
/// name and only appears at `dest` once complete.
pub fn write_zip(dest: &Utf8Path, entries: &[ArchiveEntry]) -> Result<(), CatalogError> {
    let parent = dest
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."));
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
    let temp = Builder::new()
        .prefix(".artist-catalog-export")
        .suffix(".tmp")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| CatalogError::Filesystem(err.to_string()))?;

    let mut archive = ZipWriter::new(
        temp.reopen()
            .map_err(|err| CatalogError::Filesystem(err.to_string()))?,
    );
    for entry in entries {
        archive
            .start_file(entry.name(), SimpleFileOptions::default())
            .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
        match entry {
            ArchiveEntry::Bytes { content, .. } => archive
                .write_all(content)
                .map_err(|err| CatalogError::Filesystem(err.to_string()))?,
            ArchiveEntry::File { source, .. } => {
                let mut file = fs::File::open(source.as_std_path()).map_err(|err| {
                    CatalogError::Filesystem(format!("open {source}: {err}"))
                })?;
                io::copy(&mut file, &mut archive)
                    .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
            }
        }
    }
    archive
        .finish()
        .map_err(|err| CatalogError::Filesystem(err.to_string()))?;

    temp.persist(dest.as_std_path())
        .map_err(|err| CatalogError::Filesystem(err.error.to_string()))?;
    Ok(())
}
