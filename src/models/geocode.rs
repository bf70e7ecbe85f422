// src/models/geocode.rs
// DOCUMENTATION: Reverse geocoding data structures
// PURPOSE: Provider-neutral shapes exchanged between the geocoder client and the resolver

use geo_types::Point;
use serde::{Deserialize, Serialize};

/// Latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and inside the valid degree ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl From<LatLng> for Point<f64> {
    fn from(coord: LatLng) -> Self {
        Point::new(coord.lng, coord.lat)
    }
}

/// Typed piece of a candidate address (street, city, country, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressComponent {
    /// Display name (e.g., "Avenue Habib Bourguiba", "Tunisia")
    pub long_name: String,
    /// Type tags (e.g., ["route"], ["country", "political"])
    pub types: Vec<String>,
}

impl AddressComponent {
    pub fn has_type(&self, tag: &str) -> bool {
        self.types.iter().any(|t| t == tag)
    }
}

/// One address returned by the external geocoder for a reverse lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoCandidate {
    pub formatted_address: String,
    pub location: LatLng,
    pub address_components: Vec<AddressComponent>,
}

/// Raw answer of the geocoder: its own status sentinel plus the candidates
#[derive(Debug, Clone)]
pub struct ReverseGeocodeResponse {
    pub status: String,
    pub candidates: Vec<GeoCandidate>,
}

/// Winning candidate of a reverse lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedAddress {
    pub formatted_address: String,
    pub location: LatLng,
    pub address_components: Vec<AddressComponent>,
}

impl From<GeoCandidate> for ResolvedAddress {
    fn from(candidate: GeoCandidate) -> Self {
        Self {
            formatted_address: candidate.formatted_address,
            location: candidate.location,
            address_components: candidate.address_components,
        }
    }
}
