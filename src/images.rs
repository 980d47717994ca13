use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::domain::{ImageKind, ImageRef};
use crate::error::CatalogError;
use crate::fs_util::write_atomic;
use crate::store::sanitize_file_name;

pub const ALLOWED_IMAGE_TYPES: [&str; 5] = ["jpeg", "jpg", "png", "gif", "webp"];
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Storage for preview and sample images.
pub trait ImageStore {
    fn upload_image(
        &self,
        upload: &ImageUpload,
        owner_name: &str,
        kind: ImageKind,
    ) -> Result<ImageRef, CatalogError>;

    fn delete_image(&self, image: &ImageRef) -> Result<(), CatalogError>;

    /// Where the file behind `image` lives, when it is a managed image.
    fn image_path(&self, image: &ImageRef) -> Option<Utf8PathBuf>;
}

/// An image file as submitted by the user.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content,
        }
    }

    pub fn from_path(path: &Utf8Path) -> Result<Self, CatalogError> {
        let content = fs::read(path.as_std_path())
            .map_err(|err| CatalogError::Filesystem(format!("read {path}: {err}")))?;
        let file_name = path
            .file_name()
            .ok_or_else(|| CatalogError::InvalidImageType(path.to_string()))?;
        Ok(Self::new(file_name, content))
    }

    /// Lowercase extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        Utf8Path::new(&self.file_name)
            .extension()
            .map(str::to_lowercase)
    }
}

/// Check size, extension and sniffed content type. Returns the lowercase
/// extension the stored file will carry.
pub fn validate_upload(upload: &ImageUpload, max_bytes: u64) -> Result<String, CatalogError> {
    let size = upload.content.len() as u64;
    if size > max_bytes {
        return Err(CatalogError::ImageTooLarge {
            size,
            limit: max_bytes,
        });
    }

    let extension = upload
        .extension()
        .filter(|ext| ALLOWED_IMAGE_TYPES.contains(&ext.as_str()))
        .ok_or_else(|| CatalogError::InvalidImageType(upload.file_name.clone()))?;

    let mime = infer::get(&upload.content)
        .map(|kind| kind.mime_type())
        .ok_or_else(|| CatalogError::InvalidImageType(upload.file_name.clone()))?;
    let allowed_mime = mime
        .strip_prefix("image/")
        .map(|subtype| ALLOWED_IMAGE_TYPES.contains(&subtype))
        .unwrap_or(false);
    if !allowed_mime {
        return Err(CatalogError::InvalidImageType(format!(
            "{} ({mime})",
            upload.file_name
        )));
    }
    Ok(extension)
}

/// The file name behind `image` when it names an image file in the managed
/// directory. Other files in that directory (artist documents included) are
/// never reachable through an image reference.
pub fn managed_file_name(image: &ImageRef) -> Option<&str> {
    let name = image.file_name()?;
    let extension = Utf8Path::new(name).extension()?.to_lowercase();
    ALLOWED_IMAGE_TYPES
        .contains(&extension.as_str())
        .then_some(name)
}

/// A reference a record may carry: empty, a placeholder, or a managed image
/// file.
pub fn check_image_ref(image: &ImageRef) -> Result<(), CatalogError> {
    if image.as_str().is_empty() || managed_file_name(image).is_some() {
        Ok(())
    } else {
        Err(CatalogError::ForbiddenImage(image.to_string()))
    }
}

/// Images stored as plain files in one directory, referenced as
/// `/images/<file name>`.
#[derive(Debug, Clone)]
pub struct DirImageStore {
    root: Utf8PathBuf,
    max_bytes: u64,
}

impl DirImageStore {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self {
            root,
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// `<owner>-<kind>-<n>.<ext>`, where `n` starts one past the number of
    /// files already sharing the prefix and extension and skips taken names.
    fn next_file_name(
        &self,
        owner_name: &str,
        kind: ImageKind,
        extension: &str,
    ) -> Result<String, CatalogError> {
        let prefix = format!("{}-{kind}", sanitize_file_name(owner_name));
        let suffix = format!(".{extension}");
        let entries = fs::read_dir(self.root.as_std_path())
            .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
        let mut existing = 0usize;
        for entry in entries {
            let entry = entry.map_err(|err| CatalogError::Filesystem(err.to_string()))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&prefix) && name.ends_with(&suffix) {
                existing += 1;
            }
        }

        let mut index = existing + 1;
        loop {
            let candidate = format!("{prefix}-{index}{suffix}");
            if !self.root.join(&candidate).as_std_path().exists() {
                return Ok(candidate);
            }
            index += 1;
        }
    }
}

impl ImageStore for DirImageStore {
    fn upload_image(
        &self,
        upload: &ImageUpload,
        owner_name: &str,
        kind: ImageKind,
    ) -> Result<ImageRef, CatalogError> {
        let extension = validate_upload(upload, self.max_bytes)?;
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
        let owner = if owner_name.trim().is_empty() {
            "unknown"
        } else {
            owner_name
        };
        let file_name = self.next_file_name(owner, kind, &extension)?;
        write_atomic(&self.root.join(&file_name), &upload.content)?;
        info!("stored {kind} image {file_name}");
        Ok(ImageRef::for_file(&file_name))
    }

    fn delete_image(&self, image: &ImageRef) -> Result<(), CatalogError> {
        if image.is_placeholder() {
            return Err(CatalogError::ForbiddenImage(image.to_string()));
        }
        let path = self
            .image_path(image)
            .ok_or_else(|| CatalogError::ForbiddenImage(image.to_string()))?;
        if !path.as_std_path().is_file() {
            return Err(CatalogError::ImageNotFound(image.to_string()));
        }
        fs::remove_file(path.as_std_path())
            .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
        info!("deleted image file {path}");
        Ok(())
    }

    fn image_path(&self, image: &ImageRef) -> Option<Utf8PathBuf> {
        managed_file_name(image).map(|name| self.root.join(name))
    }
}
