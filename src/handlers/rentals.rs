// src/handlers/rentals.rs
// DOCUMENTATION: HTTP handlers for rental operations
// PURPOSE: Parse multipart submissions, identify the acting user, call RentalService

use crate::config::Config;
use crate::errors::RentalError;
use crate::models::{RentalResponse, RentalSubmission, UploadedImage};
use crate::services::RentalService;
use actix_multipart::Multipart;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use futures_util::future::{ready, Ready};
use futures_util::TryStreamExt;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Header carrying the authenticated user id (set by the auth gateway)
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Upper bound on a plain text form field
const MAX_FIELD_BYTES: usize = 64 * 1024;

/// Multipart field holding image files
const IMAGES_FIELD: &str = "images";

/// Acting user of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser(pub Uuid);

impl FromRequest for ActingUser {
    type Error = RentalError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .map(ActingUser)
            .ok_or(RentalError::Unauthorized);

        ready(user)
    }
}

/// Public base URL for media references, derived from the request host
fn base_url(req: &HttpRequest) -> String {
    format!("http://{}/", req.connection_info().host())
}

/// POST /api/rental/add
/// Create a rental from form fields and `images` files
pub async fn add_rental(
    req: HttpRequest,
    service: web::Data<RentalService>,
    config: web::Data<Config>,
    user: ActingUser,
    payload: Multipart,
) -> Result<impl Responder, RentalError> {
    let (submission, images) = read_submission(payload, &config).await?;
    log::info!(
        "Rental submission from {} with {} images",
        user.0,
        images.len()
    );

    let rental = service.add_rental(submission, images, user.0).await?;
    Ok(HttpResponse::Created().json(rental.to_response(&base_url(&req))))
}

/// PUT /api/rental/{id}
/// Replace a rental; `keepImages` lists existing images to retain
/// DOCUMENTATION: Ownership is checked before the multipart body is read
pub async fn update_rental(
    req: HttpRequest,
    service: web::Data<RentalService>,
    config: web::Data<Config>,
    user: ActingUser,
    path: web::Path<Uuid>,
    payload: Multipart,
) -> Result<impl Responder, RentalError> {
    let id = path.into_inner();
    service.authorize_owner(id, user.0).await?;

    let (submission, images) = read_submission(payload, &config).await?;
    let rental = service.update_rental(id, submission, images, user.0).await?;
    Ok(HttpResponse::Ok().json(rental.to_response(&base_url(&req))))
}

/// GET /api/rental/list
pub async fn list_rentals(
    req: HttpRequest,
    service: web::Data<RentalService>,
) -> Result<impl Responder, RentalError> {
    let base = base_url(&req);
    let rentals: Vec<RentalResponse> = service
        .list_rentals()
        .await?
        .iter()
        .map(|rental| rental.to_response(&base))
        .collect();
    Ok(HttpResponse::Ok().json(rentals))
}

/// GET /api/rental/{id}
pub async fn get_rental(
    req: HttpRequest,
    service: web::Data<RentalService>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, RentalError> {
    let rental = service.get_rental(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(rental.to_response(&base_url(&req))))
}

/// GET /api/rental/user/{owner_id}
pub async fn list_user_rentals(
    req: HttpRequest,
    service: web::Data<RentalService>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, RentalError> {
    let base = base_url(&req);
    let rentals: Vec<RentalResponse> = service
        .list_by_owner(path.into_inner())
        .await?
        .iter()
        .map(|rental| rental.to_response(&base))
        .collect();
    Ok(HttpResponse::Ok().json(rentals))
}

/// DELETE /api/rental/{id}
/// Soft delete a rental owned by the caller
pub async fn delete_rental(
    service: web::Data<RentalService>,
    user: ActingUser,
    path: web::Path<Uuid>,
) -> Result<impl Responder, RentalError> {
    service.delete_rental(path.into_inner(), user.0).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Drain a multipart payload into a submission and its image files
/// DOCUMENTATION: Every field is read fully before anything else happens;
/// size and count limits come from Config
async fn read_submission(
    mut payload: Multipart,
    config: &Config,
) -> Result<(RentalSubmission, Vec<UploadedImage>), RentalError> {
    let mut submission = RentalSubmission::default();
    let mut images = Vec::new();

    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        log::warn!("Malformed multipart payload: {}", e);
        RentalError::InvalidInput(format!("invalid form data: {}", e))
    })? {
        let name = field.name().to_string();
        let is_image = name == IMAGES_FIELD || name == "images[]";
        let filename = field
            .content_disposition()
            .get_filename()
            .unwrap_or_default()
            .to_string();

        if is_image && images.len() >= config.max_images_per_submission {
            return Err(RentalError::ValidationError(format!(
                "at most {} images may be uploaded",
                config.max_images_per_submission
            )));
        }

        let limit = if is_image {
            config.max_image_bytes
        } else {
            MAX_FIELD_BYTES
        };

        let mut data = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| RentalError::InvalidInput(format!("invalid form data: {}", e)))?
        {
            if data.len() + chunk.len() > limit {
                return Err(RentalError::ValidationError(format!(
                    "field '{}' exceeds {} bytes",
                    name, limit
                )));
            }
            data.extend_from_slice(&chunk);
        }

        if is_image {
            images.push(UploadedImage::new(filename, data));
        } else {
            let value = String::from_utf8(data).map_err(|_| {
                RentalError::InvalidInput(format!("field '{}' is not valid UTF-8", name))
            })?;
            apply_field(&mut submission, &name, &value)?;
        }
    }

    Ok((submission, images))
}

/// Copy one text form field onto the submission
pub fn apply_field(
    submission: &mut RentalSubmission,
    name: &str,
    value: &str,
) -> Result<(), RentalError> {
    match name {
        "name" => submission.name = value.to_string(),
        "streetNumber" => submission.address.street_number = value.to_string(),
        "street" => submission.address.street = value.to_string(),
        "city" => submission.address.city = value.to_string(),
        "country" => submission.address.country = value.to_string(),
        "fullAddress" => submission.address.full_address = value.to_string(),
        "lat" => submission.geometry.lat = parse_number(name, value)?,
        "lng" => submission.geometry.lng = parse_number(name, value)?,
        "agreeToTerms" | "agree" => submission.agree_to_terms = parse_flag(name, value)?,
        "status" => submission.status = parse_choice(name, value)?,
        "description" => submission.description = value.to_string(),
        "price" => submission.price = parse_number(name, value)?,
        "currency" => submission.currency = parse_choice(name, &value.to_uppercase())?,
        "bedrooms" => submission.bedrooms = parse_number(name, value)?,
        "bathrooms" => submission.bathrooms = parse_number(name, value)?,
        "areaSize" => submission.area_size = parse_number(name, value)?,
        "available" => submission.available = Some(parse_flag(name, value)?),
        "availableFrom" => submission.available_from = parse_timestamp(name, value)?,
        "tags" | "tags[]" => submission.tags.extend(
            value
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string),
        ),
        "type" => submission.rental_type = parse_choice(name, value)?,
        "standing" => submission.standing = parse_choice(name, value)?,
        "airConditioning" => submission.amenities.air_conditioning = parse_flag(name, value)?,
        "heating" => submission.amenities.heating = parse_flag(name, value)?,
        "refrigerator" => submission.amenities.refrigerator = parse_flag(name, value)?,
        "parking" => submission.amenities.parking = parse_flag(name, value)?,
        "petsAllowed" => submission.rules.pets_allowed = parse_flag(name, value)?,
        "partiesAllowed" => submission.rules.parties_allowed = parse_flag(name, value)?,
        "smokingAllowed" => submission.rules.smoking_allowed = parse_flag(name, value)?,
        "keepImages" | "keepImages[]" => {
            if !value.trim().is_empty() {
                submission.keep_images.push(value.trim().to_string());
            }
        }
        other => log::debug!("Ignoring unknown form field '{}'", other),
    }
    Ok(())
}

fn invalid(name: &str, value: &str) -> RentalError {
    RentalError::ValidationError(format!("invalid value for '{}': {}", name, value))
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, RentalError> {
    value.trim().parse().map_err(|_| invalid(name, value))
}

fn parse_flag(name: &str, value: &str) -> Result<bool, RentalError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" | "" => Ok(false),
        _ => Err(invalid(name, value)),
    }
}

/// Enum fields reuse their JSON names; an empty value leaves the default
fn parse_choice<T: DeserializeOwned>(name: &str, value: &str) -> Result<Option<T>, RentalError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map(Some)
        .map_err(|_| invalid(name, value))
}

fn parse_timestamp(name: &str, value: &str) -> Result<Option<DateTime<Utc>>, RentalError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|ts| Some(ts.with_timezone(&Utc)))
        .map_err(|_| invalid(name, value))
}

/// Configuration for rental routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/rental")
            .route("/add", web::post().to(add_rental))
            .route("/list", web::get().to(list_rentals))
            .route("/user/{owner_id}", web::get().to(list_user_rentals))
            .route("/{id}", web::get().to(get_rental))
            .route("/{id}", web::put().to(update_rental))
            .route("/{id}", web::delete().to(delete_rental)),
    );
}
