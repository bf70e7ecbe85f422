// src/db/repository.rs
// DOCUMENTATION: Database access layer - all SQL queries
// PURPOSE: Abstract rental persistence from business logic

use crate::errors::RentalError;
use crate::models::Rental;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Persistence collaborator for rentals
/// DOCUMENTATION: Every method is a network round trip; callers do not retry.
/// Soft-deleted rentals are invisible to every read.
#[async_trait]
pub trait RentalRepository: Send + Sync {
    /// Store a new rental
    async fn persist(&self, rental: &Rental) -> Result<(), RentalError>;

    /// Fetch one live rental, `NotFound` otherwise
    async fn find_by_id(&self, id: Uuid) -> Result<Rental, RentalError>;

    /// All live rentals created by `owner_id`, newest first
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Rental>, RentalError>;

    /// All live rentals, newest first
    async fn list(&self) -> Result<Vec<Rental>, RentalError>;

    /// Replace the stored document of an existing live rental
    async fn update(&self, id: Uuid, rental: &Rental) -> Result<(), RentalError>;

    /// Soft delete
    async fn delete(&self, id: Uuid, actor: Uuid) -> Result<(), RentalError>;
}

/// Internal struct for mapping database rows to Rental
#[derive(Debug, FromRow)]
struct RentalRow {
    document: Json<Rental>,
}

/// PostgreSQL document store
/// DOCUMENTATION: Each rental is one JSONB document; `owner_id`, timestamps
/// and `deleted_at` are lifted into columns for lookups and soft delete
#[derive(Clone)]
pub struct PgRentalRepository {
    pool: PgPool,
}

impl PgRentalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RentalRepository for PgRentalRepository {
    async fn persist(&self, rental: &Rental) -> Result<(), RentalError> {
        sqlx::query(
            r#"
            INSERT INTO rentals (id, owner_id, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(rental.id)
        .bind(rental.owner_id())
        .bind(Json(rental))
        .bind(rental.created_at)
        .bind(rental.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            log::error!("Failed to create rental {}: {}", rental.id, e);
            RentalError::DatabaseError(e.to_string())
        })?;

        log::info!("Created rental with id: {}", rental.id);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Rental, RentalError> {
        let row = sqlx::query_as::<_, RentalRow>(
            "SELECT document FROM rentals WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            log::error!("Database error fetching rental {}: {}", id, e);
            RentalError::DatabaseError(e.to_string())
        })?
        .ok_or_else(|| {
            log::warn!("Rental not found: {}", id);
            RentalError::NotFound(format!("rental {}", id))
        })?;

        Ok(row.document.0)
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Rental>, RentalError> {
        let rows = sqlx::query_as::<_, RentalRow>(
            r#"
            SELECT document FROM rentals
            WHERE owner_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            log::error!("Failed to list rentals of owner {}: {}", owner_id, e);
            RentalError::DatabaseError(e.to_string())
        })?;

        log::debug!("Owner {} has {} rentals", owner_id, rows.len());
        Ok(rows.into_iter().map(|r| r.document.0).collect())
    }

    async fn list(&self) -> Result<Vec<Rental>, RentalError> {
        let rows = sqlx::query_as::<_, RentalRow>(
            "SELECT document FROM rentals WHERE deleted_at IS NULL ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            log::error!("Failed to list rentals: {}", e);
            RentalError::DatabaseError(e.to_string())
        })?;

        Ok(rows.into_iter().map(|r| r.document.0).collect())
    }

    async fn update(&self, id: Uuid, rental: &Rental) -> Result<(), RentalError> {
        let rows = sqlx::query(
            r#"
            UPDATE rentals
            SET document = $1, updated_at = $2
            WHERE id = $3 AND deleted_at IS NULL
            "#,
        )
        .bind(Json(rental))
        .bind(rental.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            log::error!("Update failed for rental {}: {}", id, e);
            RentalError::DatabaseError(e.to_string())
        })?
        .rows_affected();

        if rows == 0 {
            return Err(RentalError::NotFound(format!("rental {}", id)));
        }

        log::info!("Updated rental: {}", id);
        Ok(())
    }

    async fn delete(&self, id: Uuid, actor: Uuid) -> Result<(), RentalError> {
        let now = Utc::now();
        let rows = sqlx::query(
            r#"
            UPDATE rentals
            SET deleted_at = $1,
                updated_at = $1,
                document = document || jsonb_build_object(
                    'deletedAt', to_jsonb($1),
                    'updatedAt', to_jsonb($1),
                    'updatedBy', to_jsonb($2)
                )
            WHERE id = $3 AND deleted_at IS NULL
            "#,
        )
        .bind(now)
        .bind(actor)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            log::error!("Delete failed for rental {}: {}", id, e);
            RentalError::DatabaseError(e.to_string())
        })?
        .rows_affected();

        if rows == 0 {
            return Err(RentalError::NotFound(format!("rental {}", id)));
        }

        log::info!("Deleted rental: {}", id);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory stand-in for the document store
    #[derive(Default)]
    pub(crate) struct InMemoryRentalRepository {
        rentals: Mutex<HashMap<Uuid, Rental>>,
        /// When set, every write fails with a database error
        pub fail_writes: bool,
    }

    impl InMemoryRentalRepository {
        pub(crate) fn failing() -> Self {
            Self {
                fail_writes: true,
                ..Default::default()
            }
        }

        pub(crate) fn stored(&self, id: Uuid) -> Option<Rental> {
            self.rentals.lock().unwrap().get(&id).cloned()
        }

        fn check_writable(&self) -> Result<(), RentalError> {
            if self.fail_writes {
                return Err(RentalError::DatabaseError("connection refused".to_string()));
            }
            Ok(())
        }

        fn live(&self) -> Vec<Rental> {
            let mut rentals: Vec<Rental> = self
                .rentals
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.deleted_at.is_none())
                .cloned()
                .collect();
            rentals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            rentals
        }
    }

    #[async_trait]
    impl RentalRepository for InMemoryRentalRepository {
        async fn persist(&self, rental: &Rental) -> Result<(), RentalError> {
            self.check_writable()?;
            self.rentals.lock().unwrap().insert(rental.id, rental.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Rental, RentalError> {
            self.stored(id)
                .filter(|r| r.deleted_at.is_none())
                .ok_or_else(|| RentalError::NotFound(format!("rental {}", id)))
        }

        async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Rental>, RentalError> {
            Ok(self
                .live()
                .into_iter()
                .filter(|r| r.owner_id() == owner_id)
                .collect())
        }

        async fn list(&self) -> Result<Vec<Rental>, RentalError> {
            Ok(self.live())
        }

        async fn update(&self, id: Uuid, rental: &Rental) -> Result<(), RentalError> {
            self.check_writable()?;
            let mut rentals = self.rentals.lock().unwrap();
            match rentals.get_mut(&id) {
                Some(existing) if existing.deleted_at.is_none() => {
                    *existing = rental.clone();
                    Ok(())
                }
                _ => Err(RentalError::NotFound(format!("rental {}", id))),
            }
        }

        async fn delete(&self, id: Uuid, actor: Uuid) -> Result<(), RentalError> {
            self.check_writable()?;
            let mut rentals = self.rentals.lock().unwrap();
            match rentals.get_mut(&id) {
                Some(existing) if existing.deleted_at.is_none() => {
                    let now = Utc::now();
                    existing.deleted_at = Some(now);
                    existing.updated_at = now;
                    existing.updated_by = actor;
                    Ok(())
                }
                _ => Err(RentalError::NotFound(format!("rental {}", id))),
            }
        }
    }

    #[test]
    fn test_row_document_decodes_from_json() {
        use crate::models::rental::tests::valid_submission;
        use crate::models::NormalizedImageRef;

        let rental = Rental::new(
            Uuid::new_v4(),
            valid_submission().with_defaults(),
            vec![NormalizedImageRef {
                path: "assets/rentals/x/1.jpg".to_string(),
                original_filename: "1.jpg".to_string(),
            }],
            Uuid::new_v4(),
            Utc::now(),
        );

        // The soft-delete patch merges these camelCase keys into the document
        let mut value = serde_json::to_value(&rental).unwrap();
        let now = Utc::now();
        value["deletedAt"] = serde_json::to_value(now).unwrap();
        value["updatedAt"] = serde_json::to_value(now).unwrap();

        let decoded: Rental = serde_json::from_value(value).unwrap();
        assert_eq!(decoded.deleted_at, Some(now));
        assert_eq!(decoded.updated_at, now);
        assert_eq!(decoded.images, rental.images);
    }

    #[tokio::test]
    async fn test_in_memory_soft_delete_hides_rental() {
        use crate::models::rental::tests::valid_submission;

        let repo = InMemoryRentalRepository::default();
        let owner = Uuid::new_v4();
        let rental = Rental::new(
            Uuid::new_v4(),
            valid_submission().with_defaults(),
            Vec::new(),
            owner,
            Utc::now(),
        );

        repo.persist(&rental).await.unwrap();
        assert_eq!(repo.find_by_owner(owner).await.unwrap().len(), 1);

        repo.delete(rental.id, owner).await.unwrap();
        assert!(matches!(
            repo.find_by_id(rental.id).await,
            Err(RentalError::NotFound(_))
        ));
        assert!(repo.list().await.unwrap().is_empty());
        assert!(repo.stored(rental.id).unwrap().deleted_at.is_some());
        assert!(matches!(
            repo.delete(rental.id, owner).await,
            Err(RentalError::NotFound(_))
        ));
    }
}
