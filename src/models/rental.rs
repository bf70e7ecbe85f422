// src/models/rental.rs
// DOCUMENTATION: Core data structures for rentals
// PURPOSE: Rental aggregate, submission DTO with validation and deterministic defaults

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::NormalizedImageRef;

/// Kind of rental offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RentalType {
    Shared,
    Independent,
    Sale,
}

/// Comfort level of the property
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Standing {
    Economy,
    #[default]
    Standard,
    Luxury,
}

/// Moderation status of a listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RentalStatus {
    Agreed,
    Declined,
    #[default]
    Pending,
}

/// Currency of the asking price
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Tnd,
    Usd,
    Eur,
}

/// Postal address of the property
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[validate(custom = "validate_not_blank")]
    pub street_number: String,

    #[validate(custom = "validate_not_blank")]
    pub street: String,

    #[validate(custom = "validate_not_blank")]
    pub city: String,

    #[validate(custom = "validate_not_blank")]
    pub country: String,

    /// Free-text address; composed from the parts when left empty
    #[serde(default)]
    pub full_address: String,
}

/// Coordinates of the property in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Geometry {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Amenities {
    pub air_conditioning: bool,
    pub heating: bool,
    pub refrigerator: bool,
    pub parking: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rules {
    pub pets_allowed: bool,
    pub parties_allowed: bool,
    pub smoking_allowed: bool,
}

/// Request DTO for adding or updating a rental
/// DOCUMENTATION: Bound from the multipart form of POST /api/rental/add and
/// PUT /api/rental/{id}. Optional fields stay `None` until defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Validate)]
#[validate(schema(function = "validate_submission"))]
pub struct RentalSubmission {
    #[validate(custom = "validate_not_blank", length(max = 100))]
    pub name: String,

    #[validate]
    pub address: Address,

    #[validate]
    pub geometry: Geometry,

    pub agree_to_terms: bool,

    pub status: Option<RentalStatus>,

    #[validate(length(max = 500))]
    pub description: String,

    #[validate(range(min = 0))]
    pub price: i64,

    pub currency: Option<Currency>,

    #[validate(range(min = 0))]
    pub bedrooms: i64,

    #[validate(range(min = 0))]
    pub bathrooms: i64,

    #[validate(range(min = 0))]
    pub area_size: i64,

    pub available: Option<bool>,

    pub available_from: Option<DateTime<Utc>>,

    #[validate(length(max = 20))]
    pub tags: Vec<String>,

    pub rental_type: Option<RentalType>,

    pub standing: Option<Standing>,

    pub amenities: Amenities,

    pub rules: Rules,

    /// Existing image paths to retain on update (ignored on add)
    pub keep_images: Vec<String>,
}

/// Field set of a rental after validation and defaulting
/// DOCUMENTATION: Everything a submission can replace; identity, images and
/// audit data live on `Rental`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalFields {
    pub name: String,
    pub address: Address,
    pub geometry: Geometry,
    pub agree_to_terms: bool,
    pub status: RentalStatus,
    pub description: String,
    pub price: i64,
    pub currency: Currency,
    pub bedrooms: i64,
    pub bathrooms: i64,
    pub area_size: i64,
    pub available: bool,
    pub available_from: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub rental_type: RentalType,
    pub standing: Standing,
    pub amenities: Amenities,
    pub rules: Rules,
}

/// Complete rental document as persisted by the repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    pub id: Uuid,

    #[serde(flatten)]
    pub fields: RentalFields,

    /// Never empty once persisted
    pub images: Vec<NormalizedImageRef>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub updated_by: Uuid,

    /// Soft delete marker
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Response DTO for API responses
/// DOCUMENTATION: Same document with image references turned into URLs
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalResponse {
    pub id: Uuid,

    #[serde(flatten)]
    pub fields: RentalFields,

    pub images: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub updated_by: Uuid,
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn validate_submission(submission: &RentalSubmission) -> Result<(), ValidationError> {
    if !submission.agree_to_terms {
        return Err(ValidationError::new("terms_not_accepted"));
    }
    if submission.rental_type.is_none() {
        return Err(ValidationError::new("type_required"));
    }
    if submission.tags.iter().any(|tag| tag.trim().chars().count() > 50) {
        return Err(ValidationError::new("tag_too_long"));
    }
    Ok(())
}

impl RentalSubmission {
    /// Apply defaults for every omitted optional field
    /// DOCUMENTATION: Pure function of the submission (no clock, no randomness),
    /// so the same submission always yields the same field set.
    /// Call only after `validate()` succeeded.
    pub fn with_defaults(&self) -> RentalFields {
        let address = Address {
            street_number: self.address.street_number.trim().to_string(),
            street: self.address.street.trim().to_string(),
            city: self.address.city.trim().to_string(),
            country: self.address.country.trim().to_string(),
            full_address: if self.address.full_address.trim().is_empty() {
                format!(
                    "{} {}, {}, {}",
                    self.address.street_number.trim(),
                    self.address.street.trim(),
                    self.address.city.trim(),
                    self.address.country.trim()
                )
            } else {
                self.address.full_address.trim().to_string()
            },
        };

        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in &self.tags {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }

        RentalFields {
            name: self.name.trim().to_string(),
            address,
            geometry: self.geometry,
            agree_to_terms: self.agree_to_terms,
            status: self.status.unwrap_or_default(),
            description: self.description.trim().to_string(),
            price: self.price,
            currency: self.currency.unwrap_or_default(),
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            area_size: self.area_size,
            available: self.available.unwrap_or(true),
            available_from: self.available_from,
            tags,
            // validate_submission guarantees presence; shared is the fallback
            rental_type: self.rental_type.unwrap_or(RentalType::Shared),
            standing: self.standing.unwrap_or_default(),
            amenities: self.amenities,
            rules: self.rules,
        }
    }
}

impl Rental {
    /// Build a new rental document owned by `actor`
    pub fn new(
        id: Uuid,
        fields: RentalFields,
        images: Vec<NormalizedImageRef>,
        actor: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            fields,
            images,
            created_at: now,
            updated_at: now,
            created_by: actor,
            updated_by: actor,
            deleted_at: None,
        }
    }

    /// Owner of the listing
    pub fn owner_id(&self) -> Uuid {
        self.created_by
    }

    /// Convert Rental to RentalResponse for API
    /// DOCUMENTATION: Maps stored image paths to URLs under `base_url`
    pub fn to_response(&self, base_url: &str) -> RentalResponse {
        RentalResponse {
            id: self.id,
            fields: self.fields.clone(),
            images: self
                .images
                .iter()
                .map(|image| image.public_url(base_url))
                .collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            created_by: self.created_by,
            updated_by: self.updated_by,
        }
    }
}
