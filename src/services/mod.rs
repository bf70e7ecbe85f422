// src/services/mod.rs
// DOCUMENTATION: Services module organization
// PURPOSE: Re-export service components

pub mod distance;
pub mod geocode_resolver;
pub mod google_geocoding_client;
pub mod image_normalizer;
pub mod ingestion;
pub mod rental_service;

pub use geocode_resolver::*;
pub use google_geocoding_client::*;
pub use rental_service::*;
