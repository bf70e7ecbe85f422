// src/services/rental_service.rs
// DOCUMENTATION: Rental submission orchestration
// PURPOSE: Validate, default, ingest images and persist rentals in that order

use crate::config::Config;
use crate::db::RentalRepository;
use crate::errors::RentalError;
use crate::models::{NormalizedImageRef, Rental, RentalSubmission, UploadedImage};
use crate::services::ingestion::{discard_images, ingest_images, IngestionTarget, StoredImage};
use chrono::Utc;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Progress of one submission
/// DOCUMENTATION: Received -> Validated -> ImagesIngested -> Persisted.
/// A failure at any step ends the submission before Persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Received,
    Validated,
    ImagesIngested,
    Persisted,
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SubmissionState::Received => "received",
            SubmissionState::Validated => "validated",
            SubmissionState::ImagesIngested => "images_ingested",
            SubmissionState::Persisted => "persisted",
        };
        f.write_str(label)
    }
}

/// Storage settings of the orchestrator
#[derive(Debug, Clone)]
pub struct SubmissionSettings {
    /// Filesystem root; each rental gets `<root>/<rental id>/`
    pub assets_base_path: PathBuf,
    /// Prefix of stored references, mirrored by the static mount
    pub media_url_prefix: String,
    /// Most images a rental may carry
    pub max_images: usize,
}

impl From<&Config> for SubmissionSettings {
    fn from(config: &Config) -> Self {
        Self {
            assets_base_path: PathBuf::from(&config.assets_base_path),
            media_url_prefix: config.media_url_prefix.trim_matches('/').to_string(),
            max_images: config.max_images_per_submission,
        }
    }
}

/// RentalService: Business logic layer for rentals
/// DOCUMENTATION: Ingestion is always awaited in full before anything is
/// persisted, and a rental is never persisted without at least one image
pub struct RentalService {
    repository: Arc<dyn RentalRepository>,
    settings: SubmissionSettings,
}

impl RentalService {
    pub fn new(repository: Arc<dyn RentalRepository>, settings: SubmissionSettings) -> Self {
        Self {
            repository,
            settings,
        }
    }

    /// Create a rental from a submission and its uploaded images
    pub async fn add_rental(
        &self,
        submission: RentalSubmission,
        images: Vec<UploadedImage>,
        actor: Uuid,
    ) -> Result<Rental, RentalError> {
        let id = Uuid::new_v4();
        transition(id, SubmissionState::Received);

        self.check_submission(&submission, images.len())?;
        let fields = submission.with_defaults();
        transition(id, SubmissionState::Validated);

        let target = self.prepare_target(id).await?;
        let stored = match ingest_images(images, &target).await {
            Ok(stored) => stored,
            Err(e) => {
                remove_if_empty(&target.directory).await;
                return Err(e);
            }
        };
        transition(id, SubmissionState::ImagesIngested);

        let rental = Rental::new(id, fields, references(&stored), actor, Utc::now());

        if let Err(e) = self.repository.persist(&rental).await {
            log::error!("Persisting rental {} failed, discarding its images: {}", id, e);
            discard_images(&stored).await;
            remove_if_empty(&target.directory).await;
            return Err(e);
        }
        transition(id, SubmissionState::Persisted);

        Ok(rental)
    }

    /// Replace every field of an existing rental
    /// DOCUMENTATION: Existing images listed in `keep_images` are retained (in
    /// their stored order) and new uploads are ingested and appended. Files of
    /// images that are no longer referenced are removed once the update is stored.
    pub async fn update_rental(
        &self,
        id: Uuid,
        submission: RentalSubmission,
        images: Vec<UploadedImage>,
        actor: Uuid,
    ) -> Result<Rental, RentalError> {
        let existing = self.owned_rental(id, actor).await?;
        transition(id, SubmissionState::Received);

        let (retained, dropped): (Vec<NormalizedImageRef>, Vec<NormalizedImageRef>) = existing
            .images
            .iter()
            .cloned()
            .partition(|image| is_kept(image, &submission.keep_images));

        self.check_submission(&submission, retained.len() + images.len())?;
        let fields = submission.with_defaults();
        transition(id, SubmissionState::Validated);

        let stored = if images.is_empty() {
            Vec::new()
        } else {
            let target = self.prepare_target(id).await?;
            ingest_images(images, &target).await?
        };
        transition(id, SubmissionState::ImagesIngested);

        let mut all_images = retained;
        all_images.extend(references(&stored));

        let rental = Rental {
            id,
            fields,
            images: all_images,
            created_at: existing.created_at,
            updated_at: Utc::now(),
            created_by: existing.created_by,
            updated_by: actor,
            deleted_at: None,
        };

        if let Err(e) = self.repository.update(id, &rental).await {
            log::error!("Updating rental {} failed, discarding new images: {}", id, e);
            discard_images(&stored).await;
            return Err(e);
        }
        transition(id, SubmissionState::Persisted);

        self.remove_files(&dropped).await;
        Ok(rental)
    }

    /// Get rental by ID
    pub async fn get_rental(&self, id: Uuid) -> Result<Rental, RentalError> {
        self.repository.find_by_id(id).await
    }

    /// All live rentals
    pub async fn list_rentals(&self) -> Result<Vec<Rental>, RentalError> {
        self.repository.list().await
    }

    /// Rentals created by one user
    pub async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Rental>, RentalError> {
        self.repository.find_by_owner(owner_id).await
    }

    /// Soft delete a rental owned by `actor`; stored images are kept
    pub async fn delete_rental(&self, id: Uuid, actor: Uuid) -> Result<(), RentalError> {
        self.owned_rental(id, actor).await?;
        self.repository.delete(id, actor).await
    }

    /// Fails unless `actor` owns the live rental `id`
    pub async fn authorize_owner(&self, id: Uuid, actor: Uuid) -> Result<(), RentalError> {
        self.owned_rental(id, actor).await.map(|_| ())
    }

    async fn owned_rental(&self, id: Uuid, actor: Uuid) -> Result<Rental, RentalError> {
        let rental = self.repository.find_by_id(id).await?;
        if rental.owner_id() != actor {
            log::warn!("User {} attempted to modify rental {} owned by {}", actor, id, rental.owner_id());
            return Err(RentalError::Unauthorized);
        }
        Ok(rental)
    }

    /// Business rules checked before any image is touched
    fn check_submission(
        &self,
        submission: &RentalSubmission,
        image_count: usize,
    ) -> Result<(), RentalError> {
        submission.validate()?;

        if image_count == 0 {
            return Err(RentalError::NoImagesIngested);
        }
        if image_count > self.settings.max_images {
            return Err(RentalError::ValidationError(format!(
                "a rental may carry at most {} images, got {}",
                self.settings.max_images, image_count
            )));
        }
        Ok(())
    }

    /// Create the rental's image directory, once, before ingestion starts
    async fn prepare_target(&self, id: Uuid) -> Result<IngestionTarget, RentalError> {
        let directory = self.settings.assets_base_path.join(id.to_string());
        tokio::fs::create_dir_all(&directory).await.map_err(|e| {
            log::error!("Failed to create image directory {}: {}", directory.display(), e);
            RentalError::IoError(e.to_string())
        })?;

        Ok(IngestionTarget {
            directory,
            reference_prefix: format!("{}/{}", self.settings.media_url_prefix, id),
        })
    }

    /// Local file behind a stored reference, if it lives under the asset root
    fn file_for(&self, image: &NormalizedImageRef) -> Option<PathBuf> {
        let prefix = format!("{}/", self.settings.media_url_prefix);
        let relative = image.path.trim_start_matches("../").strip_prefix(&prefix)?;
        if relative.split('/').any(|part| part == "..") {
            return None;
        }
        Some(self.settings.assets_base_path.join(relative))
    }

    async fn remove_files(&self, images: &[NormalizedImageRef]) {
        for image in images {
            let Some(file) = self.file_for(image) else {
                continue;
            };
            if let Err(e) = tokio::fs::remove_file(&file).await {
                log::warn!("Failed to remove dropped image {}: {}", file.display(), e);
            }
        }
    }
}

fn transition(id: Uuid, state: SubmissionState) {
    log::debug!("Rental {} submission {}", id, state);
}

fn references(stored: &[StoredImage]) -> Vec<NormalizedImageRef> {
    stored.iter().map(|image| image.reference.clone()).collect()
}

/// Clients echo back either the stored path or the public URL built from it
fn is_kept(image: &NormalizedImageRef, keep: &[String]) -> bool {
    keep.iter().any(|entry| {
        let entry = entry.trim();
        entry == image.path || entry.ends_with(&format!("/{}", image.path.trim_start_matches("../")))
    })
}

async fn remove_if_empty(directory: &std::path::Path) {
    // remove_dir refuses non-empty directories
    let _ = tokio::fs::remove_dir(directory).await;
}
