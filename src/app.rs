use camino::Utf8Path;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chain::{ChainMatch, compose_chain, match_records_by_chain};
use crate::domain::{ArtistDraft, ArtistRecord, ImageKind, ImageRef, RecordId};
use crate::error::CatalogError;
use crate::fs_util::{ArchiveEntry, write_zip};
use crate::identity::{DuplicatePolicy, find_identity_collision};
use crate::images::{ImageStore, ImageUpload, check_image_ref};
use crate::normalize::{CountDefault, normalize_counts, normalize_list};
use crate::store::Store;
use crate::view::{View, ViewState};

pub const EXPORT_RECORDS_ENTRY: &str = "artists.json";
pub const EXPORT_IMAGES_DIR: &str = "images";

#[derive(Debug, Clone, Serialize)]
pub struct DeleteResult {
    pub id: RecordId,
    pub removed_images: Vec<ImageRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainResult {
    pub chain: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub archive: String,
    pub records: usize,
    pub images: usize,
}

/// Create/replace/delete and the derived reads over one record directory and
/// one image store. Every operation works on a fresh snapshot of the store.
#[derive(Clone)]
pub struct Catalog<I: ImageStore> {
    store: Store,
    images: I,
    duplicate_policy: DuplicatePolicy,
}

impl<I: ImageStore> Catalog<I> {
    pub fn new(store: Store, images: I) -> Self {
        Self {
            store,
            images,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn images(&self) -> &I {
        &self.images
    }

    pub fn list_records(&self) -> Result<Vec<ArtistRecord>, CatalogError> {
        self.store.list_records()
    }

    pub fn record(&self, id: RecordId) -> Result<ArtistRecord, CatalogError> {
        self.store.find_record(id)
    }

    /// Rebuild the view for `state` and reconcile its selection.
    pub fn view(&self, state: &mut ViewState) -> Result<View, CatalogError> {
        let snapshot = self.store.list_records()?;
        Ok(state.refresh(&snapshot))
    }

    pub fn create_record(
        &self,
        draft: ArtistDraft,
        preview: Option<&ImageUpload>,
    ) -> Result<ArtistRecord, CatalogError> {
        check_draft_images(&draft)?;
        let name = draft
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(CatalogError::MissingField("name"))?
            .to_string();
        let artist_ids = normalize_list(draft.artist_ids);
        if artist_ids.is_empty() {
            return Err(CatalogError::MissingField("artistIds"));
        }

        let snapshot = self.store.list_records()?;
        if let Some(existing) = find_identity_collision(&artist_ids, &snapshot, None) {
            debug!("artist id set collides with artist {}", existing.id);
            return Err(CatalogError::DuplicateIdentitySet(artist_ids.join(", ")));
        }

        let uploaded = match preview {
            Some(upload) => Some(self.images.upload_image(upload, &name, ImageKind::Preview)?),
            None => None,
        };
        let preview_image = uploaded
            .clone()
            .or(draft.preview_image)
            .filter(|image| !image.as_str().is_empty())
            .unwrap_or_else(ImageRef::artist_placeholder);

        let record = ArtistRecord {
            id: self.store.next_id()?,
            name,
            artist_ids,
            training_counts: normalize_counts(draft.training_counts, CountDefault::Zero),
            preview_image,
            sample_images: draft.sample_images.unwrap_or_default(),
            tags: normalize_list(draft.tags),
            trigger_words: normalize_list(draft.trigger_words),
            style_description: draft
                .style_description
                .map(|text| text.trim().to_string())
                .unwrap_or_default(),
            create_time: draft
                .create_time
                .filter(|date| !date.trim().is_empty())
                .unwrap_or_else(today),
        };

        if let Err(err) = self.store.write_record(&record) {
            if let Some(image) = uploaded {
                self.discard_image(&image);
            }
            return Err(err);
        }
        info!("created artist {} ({})", record.id, record.name);
        Ok(record)
    }

    /// Replace the fields `draft` carries; absent fields keep their current
    /// value. `id` and `createTime` never change.
    pub fn replace_record(
        &self,
        id: RecordId,
        draft: ArtistDraft,
        preview: Option<&ImageUpload>,
    ) -> Result<ArtistRecord, CatalogError> {
        let snapshot = self.store.list_records()?;
        let current = snapshot
            .iter()
            .find(|record| record.id == id)
            .cloned()
            .ok_or(CatalogError::RecordNotFound(id))?;

        check_draft_images(&draft)?;

        let mut next = current.clone();
        if let Some(name) = draft.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(CatalogError::MissingField("name"));
            }
            next.name = name.to_string();
        }
        if let Some(ids) = draft.artist_ids {
            next.artist_ids = ids.normalize();
        }
        if let Some(counts) = draft.training_counts {
            next.training_counts = counts.normalize(CountDefault::Empty);
        }
        if let Some(tags) = draft.tags {
            next.tags = tags.normalize();
        }
        if let Some(words) = draft.trigger_words {
            next.trigger_words = words.normalize();
        }
        if let Some(style) = draft.style_description {
            next.style_description = style.trim().to_string();
        }
        if let Some(samples) = draft.sample_images {
            next.sample_images = samples;
        }
        if let Some(image) = draft.preview_image {
            next.preview_image = if image.as_str().is_empty() {
                ImageRef::artist_placeholder()
            } else {
                image
            };
        }
        if draft
            .create_time
            .is_some_and(|date| date != current.create_time)
        {
            debug!("ignoring createTime change for artist {id}");
        }

        if self.duplicate_policy.checks_updates()
            && next.artist_ids != current.artist_ids
            && find_identity_collision(&next.artist_ids, &snapshot, Some(id)).is_some()
        {
            return Err(CatalogError::DuplicateIdentitySet(next.artist_ids.join(", ")));
        }

        let uploaded = match preview {
            Some(upload) => {
                Some(self.images.upload_image(upload, &next.name, ImageKind::Preview)?)
            }
            None => None,
        };
        if let Some(image) = &uploaded {
            next.preview_image = image.clone();
        }

        if let Err(err) = self.store.write_record(&next) {
            if let Some(image) = uploaded {
                self.discard_image(&image);
            }
            return Err(err);
        }
        if uploaded.is_some()
            && current.preview_image != next.preview_image
            && !current.preview_image.is_placeholder()
        {
            self.discard_image(&current.preview_image);
        }
        info!("updated artist {id}");
        Ok(next)
    }

    /// Remove the record, then every image it owns. Image removal is best
    /// effort; the record is gone either way.
    pub fn delete_record(&self, id: RecordId) -> Result<DeleteResult, CatalogError> {
        let record = self.store.find_record(id)?;
        self.store.remove_record(id)?;

        let mut removed_images = Vec::new();
        for image in record.owned_images() {
            match self.images.delete_image(&image) {
                Ok(()) => removed_images.push(image),
                Err(err) => warn!("could not delete image {image} of artist {id}: {err}"),
            }
        }
        info!("deleted artist {id} ({})", record.name);
        Ok(DeleteResult { id, removed_images })
    }

    /// Upload every file, then append the refs in order. If any upload fails
    /// the record is left untouched.
    pub fn add_sample_images(
        &self,
        id: RecordId,
        uploads: &[ImageUpload],
    ) -> Result<ArtistRecord, CatalogError> {
        if uploads.is_empty() {
            return Err(CatalogError::MissingField("sampleImages"));
        }
        let mut record = self.store.find_record(id)?;

        let mut stored = Vec::with_capacity(uploads.len());
        for upload in uploads {
            match self
                .images
                .upload_image(upload, &record.name, ImageKind::Sample)
            {
                Ok(image) => stored.push(image),
                Err(err) => {
                    stored.iter().for_each(|image| self.discard_image(image));
                    return Err(err);
                }
            }
        }

        record.sample_images.extend(stored.iter().cloned());
        if let Err(err) = self.store.write_record(&record) {
            stored.iter().for_each(|image| self.discard_image(image));
            return Err(err);
        }
        info!("added {} sample images to artist {id}", stored.len());
        Ok(record)
    }

    /// Drop the sample image at `index`. The file is removed best effort; the
    /// record is updated even when that fails.
    pub fn delete_sample_image(
        &self,
        id: RecordId,
        index: usize,
    ) -> Result<ArtistRecord, CatalogError> {
        let mut record = self.store.find_record(id)?;
        if index >= record.sample_images.len() {
            return Err(CatalogError::InvalidSampleIndex { id, index });
        }
        let image = record.sample_images.remove(index);
        if !image.is_placeholder() {
            if let Err(err) = self.images.delete_image(&image) {
                warn!("could not delete sample image file {image}: {err}");
            }
        }
        self.store.write_record(&record)?;
        info!("removed sample image {index} from artist {id}");
        Ok(record)
    }

    pub fn upload_image(
        &self,
        upload: &ImageUpload,
        owner_name: &str,
        kind: ImageKind,
    ) -> Result<ImageRef, CatalogError> {
        self.images.upload_image(upload, owner_name, kind)
    }

    pub fn delete_image(&self, image: &ImageRef) -> Result<(), CatalogError> {
        self.images.delete_image(image)
    }

    /// Append the trigger words of `ids`, in order, to `chain`.
    pub fn append_to_chain(&self, chain: &str, ids: &[RecordId]) -> Result<String, CatalogError> {
        let snapshot = self.store.list_records()?;
        let records = ids
            .iter()
            .map(|id| {
                snapshot
                    .iter()
                    .find(|record| record.id == *id)
                    .ok_or(CatalogError::RecordNotFound(*id))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(compose_chain(chain, records))
    }

    pub fn match_chain(&self, chain: &str) -> Result<ChainMatch, CatalogError> {
        let snapshot = self.store.list_records()?;
        Ok(match_records_by_chain(chain, &snapshot))
    }

    /// A creation draft seeded from `chain`; the caller still names it and
    /// submits it through [`Catalog::create_record`].
    pub fn chain_draft(&self, chain: &str) -> Result<ArtistDraft, CatalogError> {
        Ok(self.match_chain(chain)?.into_draft(chain))
    }

    pub fn export_all(&self) -> Result<Vec<ArtistRecord>, CatalogError> {
        self.store.list_records()
    }

    /// Zip archive with `artists.json` and every image the records own.
    /// Images whose files are gone are skipped.
    pub fn export_archive(&self, dest: &Utf8Path) -> Result<ExportResult, CatalogError> {
        let records = self.store.list_records()?;
        let content = serde_json::to_vec_pretty(&records)
            .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
        let mut entries = vec![ArchiveEntry::Bytes {
            name: EXPORT_RECORDS_ENTRY.to_string(),
            content,
        }];

        let mut seen = std::collections::HashSet::new();
        for image in records.iter().flat_map(ArtistRecord::owned_images) {
            if !seen.insert(image.clone()) {
                continue;
            }
            let (Some(name), Some(source)) = (image.file_name(), self.images.image_path(&image))
            else {
                warn!("not exporting image {image}: outside the image directory");
                continue;
            };
            if !source.as_std_path().is_file() {
                warn!("not exporting missing image {image}");
                continue;
            }
            entries.push(ArchiveEntry::File {
                name: format!("{EXPORT_IMAGES_DIR}/{name}"),
                source,
            });
        }

        write_zip(dest, &entries)?;
        info!("exported {} artists to {dest}", records.len());
        Ok(ExportResult {
            archive: dest.to_string(),
            records: records.len(),
            images: entries.len() - 1,
        })
    }

    fn discard_image(&self, image: &ImageRef) {
        if let Err(err) = self.images.delete_image(image) {
            warn!("could not clean up image {image}: {err}");
        }
    }
}

/// Image refs submitted in a draft must be placeholders or managed image
/// files; anything else would later be deleted along with the record.
fn check_draft_images(draft: &ArtistDraft) -> Result<(), CatalogError> {
    draft
        .preview_image
        .iter()
        .chain(draft.sample_images.iter().flatten())
        .try_for_each(check_image_ref)
}

fn today() -> String {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}
