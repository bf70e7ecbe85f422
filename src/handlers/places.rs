// src/handlers/places.rs
// DOCUMENTATION: HTTP handlers for place lookups
// PURPOSE: Autocomplete, place details and reverse address resolution

use crate::errors::RentalError;
use crate::models::LatLng;
use crate::services::{GeocodeResolver, GoogleGeocodingClient};
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct AutocompleteQuery {
    #[serde(default)]
    pub input: String,
}

#[derive(Debug, Deserialize)]
pub struct DetailsQuery {
    #[serde(default)]
    pub place_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AddressQuery {
    pub lat: f64,
    pub lng: f64,
}

/// GET /api/places?input=
/// Place suggestions within the configured country
pub async fn get_places(
    client: web::Data<Arc<GoogleGeocodingClient>>,
    query: web::Query<AutocompleteQuery>,
) -> Result<impl Responder, RentalError> {
    if query.input.trim().is_empty() {
        return Err(RentalError::InvalidInput("input parameter is required".to_string()));
    }

    let predictions = client.autocomplete(&query.input).await?;
    Ok(HttpResponse::Ok().json(predictions))
}

/// GET /api/placesDetails?place_id=
pub async fn get_place_details(
    client: web::Data<Arc<GoogleGeocodingClient>>,
    query: web::Query<DetailsQuery>,
) -> Result<impl Responder, RentalError> {
    if query.place_id.trim().is_empty() {
        return Err(RentalError::InvalidInput("no place_id provided".to_string()));
    }

    let details = client.place_details(&query.place_id).await?;
    Ok(HttpResponse::Ok().json(details))
}

/// GET /api/address?lat=&lng=
/// Resolve a coordinate into the closest street address in the target country
pub async fn get_address(
    resolver: web::Data<GeocodeResolver>,
    query: web::Query<AddressQuery>,
) -> Result<impl Responder, RentalError> {
    let address = resolver
        .resolve(LatLng::new(query.lat, query.lng))
        .await
        .map_err(|e| {
            if e.is_address_not_found() {
                log::info!("No address for {},{}: {}", query.lat, query.lng, e);
            } else {
                log::error!("Address lookup for {},{} failed: {}", query.lat, query.lng, e);
            }
            e
        })?;
    Ok(HttpResponse::Ok().json(address))
}

/// Configuration for place routes
/// DOCUMENTATION: Plain routes, no `/api` scope, so `/api/rental` stays reachable
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/places", web::get().to(get_places))
        .route("/api/placesDetails", web::get().to(get_place_details))
        .route("/api/address", web::get().to(get_address));
}
