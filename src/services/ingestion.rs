// src/services/ingestion.rs
// DOCUMENTATION: Concurrent ingestion of all images of one submission
// PURPOSE: Fan out normalization, join every worker, enforce first-failure semantics

use crate::errors::RentalError;
use crate::models::{NormalizedImageRef, UploadedImage};
use crate::services::image_normalizer::normalize_image;
use futures_util::future::join_all;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Destination of one submission's images
#[derive(Debug, Clone)]
pub struct IngestionTarget {
    /// Directory on disk; created by the caller before ingestion starts
    pub directory: PathBuf,
    /// Prefix recorded in image references, e.g. "assets/rentals/<rental id>"
    pub reference_prefix: String,
}

/// One successfully stored image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Where the normalized file lives on disk
    pub file: PathBuf,
    /// Reference persisted on the rental
    pub reference: NormalizedImageRef,
}

/// Normalize every uploaded image in parallel
/// DOCUMENTATION: One blocking worker per image, all joined before returning.
///
/// - Results come back in upload order: worker `i` owns slot `i`, so no lock
///   is needed and ordering does not depend on completion timing.
/// - Every file is stored under a generated name; the uploaded filename is
///   kept only as metadata, so two uploads named alike never collide.
/// - If any worker fails, the failure of the earliest image (in upload order)
///   is returned and every file written by sibling workers is removed.
/// - Workers are not cancelled when the caller goes away; they run to
///   completion or failure on the blocking pool.
pub async fn ingest_images(
    images: Vec<UploadedImage>,
    target: &IngestionTarget,
) -> Result<Vec<StoredImage>, RentalError> {
    if images.is_empty() {
        return Err(RentalError::NoImagesIngested);
    }

    let total = images.len();
    log::debug!(
        "Ingesting {} images into {}",
        total,
        target.directory.display()
    );

    let workers = images.into_iter().map(|image| {
        let stem = target.directory.join(Uuid::new_v4().simple().to_string());
        tokio::task::spawn_blocking(move || {
            normalize_image(&image.bytes, &stem)
                .map(|file| (file, image.filename.clone()))
                .map_err(|e| {
                    log::warn!("Failed to normalize image '{}': {}", image.filename, e);
                    e
                })
        })
    });

    let outcomes = join_all(workers).await;

    let mut stored = Vec::with_capacity(total);
    let mut first_error: Option<RentalError> = None;

    for outcome in outcomes {
        match outcome {
            Ok(Ok((file, original_filename))) => {
                let reference = reference_for(&file, &target.reference_prefix, original_filename);
                stored.push(StoredImage { file, reference });
            }
            Ok(Err(err)) => {
                first_error.get_or_insert(err);
            }
            Err(join_err) => {
                log::error!("Image worker panicked: {}", join_err);
                first_error.get_or_insert(RentalError::InternalError);
            }
        }
    }

    if let Some(err) = first_error {
        log::warn!(
            "Ingestion failed ({} of {} images stored), removing partial output: {}",
            stored.len(),
            total,
            err
        );
        discard_images(&stored).await;
        return Err(err);
    }

    if stored.is_empty() {
        return Err(RentalError::NoImagesIngested);
    }

    log::info!(
        "Ingested {} images into {}",
        stored.len(),
        target.directory.display()
    );
    Ok(stored)
}

/// Remove files written by an ingestion that is being rolled back
/// DOCUMENTATION: Best effort; a file that cannot be removed is logged and skipped
pub async fn discard_images(images: &[StoredImage]) {
    for image in images {
        if let Err(e) = tokio::fs::remove_file(&image.file).await {
            log::warn!(
                "Failed to remove orphaned image {}: {}",
                image.file.display(),
                e
            );
        }
    }
}

fn reference_for(file: &Path, prefix: &str, original_filename: String) -> NormalizedImageRef {
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    NormalizedImageRef {
        path: format!("{}/{}", prefix.trim_end_matches('/'), file_name),
        original_filename,
    }
}
