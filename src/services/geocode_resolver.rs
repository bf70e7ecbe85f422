// src/services/geocode_resolver.rs
// DOCUMENTATION: Reverse-lookup candidate resolution
// PURPOSE: Pick one address among the geocoder's candidates for a coordinate

use crate::errors::RentalError;
use crate::models::{GeoCandidate, LatLng, ResolvedAddress, ReverseGeocodeResponse};
use crate::services::distance::haversine_distance;
use async_trait::async_trait;
use std::sync::Arc;

/// Address component tag marking a street/road
pub const ROUTE_TAG: &str = "route";

/// External reverse geocoder
/// DOCUMENTATION: Transport, retries and timeouts belong to the implementation
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse_geocode(&self, query: LatLng) -> Result<ReverseGeocodeResponse, RentalError>;
}

/// Provider vocabulary used by the resolver
/// DOCUMENTATION: Keeps status sentinels and component tagging out of the
/// ranking logic so another provider only needs a new schema
pub trait CandidateSchema: Send + Sync {
    /// Whether the provider's status means the lookup itself succeeded
    fn is_success(&self, status: &str) -> bool;

    /// Whether the candidate lies in the target country
    fn is_in_country(&self, candidate: &GeoCandidate) -> bool;

    /// Whether any address component of the candidate carries `tag`
    fn has_type(&self, candidate: &GeoCandidate, tag: &str) -> bool;

    /// Target country name, for error reporting
    fn target_country(&self) -> &str;
}

/// Google Geocoding API vocabulary
#[derive(Debug, Clone)]
pub struct GoogleCandidateSchema {
    target_country: String,
}

impl GoogleCandidateSchema {
    pub fn new(target_country: impl Into<String>) -> Self {
        Self {
            target_country: target_country.into(),
        }
    }
}

impl CandidateSchema for GoogleCandidateSchema {
    fn is_success(&self, status: &str) -> bool {
        status == "OK"
    }

    fn is_in_country(&self, candidate: &GeoCandidate) -> bool {
        candidate
            .address_components
            .iter()
            .any(|component| component.has_type("country") && component.long_name == self.target_country)
    }

    fn has_type(&self, candidate: &GeoCandidate, tag: &str) -> bool {
        candidate
            .address_components
            .iter()
            .any(|component| component.has_type(tag))
    }

    fn target_country(&self) -> &str {
        &self.target_country
    }
}

/// Closest candidate seen so far for one class
struct Closest {
    distance: f64,
    candidate: Option<GeoCandidate>,
}

impl Closest {
    fn new() -> Self {
        Self {
            distance: f64::MAX,
            candidate: None,
        }
    }

    /// Strictly closer wins, so the earlier candidate keeps a tie and NaN never wins
    fn offer(&mut self, distance: f64, candidate: GeoCandidate) {
        if distance < self.distance {
            self.distance = distance;
            self.candidate = Some(candidate);
        }
    }
}

/// Choose the winning candidate for `query`
/// DOCUMENTATION: Candidates outside the target country are discarded; the
/// closest route-typed candidate wins, otherwise the closest non-route one.
pub fn select_candidate<S: CandidateSchema + ?Sized>(
    query: LatLng,
    candidates: Vec<GeoCandidate>,
    schema: &S,
) -> Result<ResolvedAddress, RentalError> {
    let mut closest_route = Closest::new();
    let mut closest_other = Closest::new();

    for candidate in candidates {
        if !schema.is_in_country(&candidate) {
            continue;
        }

        let distance = haversine_distance(query.into(), candidate.location.into());

        if schema.has_type(&candidate, ROUTE_TAG) {
            closest_route.offer(distance, candidate);
        } else {
            closest_other.offer(distance, candidate);
        }
    }

    match (closest_route.candidate, closest_other.candidate) {
        (Some(route), _) => {
            log::debug!("Resolved route address {:.1}m away", closest_route.distance);
            Ok(route.into())
        }
        (None, Some(other)) => {
            log::debug!("Resolved non-route address {:.1}m away", closest_other.distance);
            Ok(other.into())
        }
        (None, None) => Err(RentalError::NoResultsInTargetCountry(
            schema.target_country().to_string(),
        )),
    }
}

/// Reverse lookup resolver
/// DOCUMENTATION: Stateless apart from its collaborators; safe to share and
/// call concurrently
#[derive(Clone)]
pub struct GeocodeResolver {
    geocoder: Arc<dyn ReverseGeocoder>,
    schema: Arc<dyn CandidateSchema>,
}

impl GeocodeResolver {
    pub fn new(geocoder: Arc<dyn ReverseGeocoder>, schema: Arc<dyn CandidateSchema>) -> Self {
        Self { geocoder, schema }
    }

    /// Resolve a coordinate into one address
    pub async fn resolve(&self, query: LatLng) -> Result<ResolvedAddress, RentalError> {
        if !query.is_valid() {
            return Err(RentalError::ValidationError(format!(
                "invalid coordinate: {}, {}",
                query.lat, query.lng
            )));
        }

        let response = self.geocoder.reverse_geocode(query).await?;

        if !self.schema.is_success(&response.status) || response.candidates.is_empty() {
            log::info!(
                "Reverse lookup for {},{} yielded nothing (status {})",
                query.lat,
                query.lng,
                response.status
            );
            return Err(RentalError::UpstreamResolutionFailed(response.status));
        }

        select_candidate(query, response.candidates, self.schema.as_ref())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::AddressComponent;
    use std::sync::Mutex;
    use tokio_test::assert_ok;

    const QUERY: LatLng = LatLng {
        lat: 36.8,
        lng: 10.18,
    };

    /// Move `meters` north of QUERY
    fn north_of_query(meters: f64) -> LatLng {
        LatLng::new(QUERY.lat + meters / 111_195.0, QUERY.lng)
    }

    fn component(name: &str, types: &[&str]) -> AddressComponent {
        AddressComponent {
            long_name: name.to_string(),
            types: types.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub(crate) fn candidate(name: &str, at: LatLng, route: bool, country: &str) -> GeoCandidate {
        let mut components = Vec::new();
        if route {
            components.push(component(name, &["route"]));
        }
        components.push(component("Tunis", &["locality", "political"]));
        components.push(component(country, &["country", "political"]));
        GeoCandidate {
            formatted_address: name.to_string(),
            location: at,
            address_components: components,
        }
    }

    fn schema() -> GoogleCandidateSchema {
        GoogleCandidateSchema::new("Tunisia")
    }

    /// Geocoder double returning a canned response
    pub(crate) struct StubGeocoder {
        pub response: Mutex<Option<Result<ReverseGeocodeResponse, RentalError>>>,
    }

    impl StubGeocoder {
        pub(crate) fn answering(status: &str, candidates: Vec<GeoCandidate>) -> Self {
            Self {
                response: Mutex::new(Some(Ok(ReverseGeocodeResponse {
                    status: status.to_string(),
                    candidates,
                }))),
            }
        }

        pub(crate) fn failing(err: RentalError) -> Self {
            Self {
                response: Mutex::new(Some(Err(err))),
            }
        }
    }

    #[async_trait]
    impl ReverseGeocoder for StubGeocoder {
        async fn reverse_geocode(&self, _query: LatLng) -> Result<ReverseGeocodeResponse, RentalError> {
            self.response
                .lock()
                .unwrap()
                .take()
                .expect("stub geocoder called more than once")
        }
    }

    fn resolver(geocoder: StubGeocoder) -> GeocodeResolver {
        GeocodeResolver::new(Arc::new(geocoder), Arc::new(schema()))
    }

    #[test]
    fn test_route_preferred_over_closer_non_route() {
        let candidates = vec![
            candidate("Near area", north_of_query(5.0), false, "Tunisia"),
            candidate("Rue de Rome", north_of_query(50.0), true, "Tunisia"),
        ];

        let resolved = select_candidate(QUERY, candidates, &schema()).unwrap();
        assert_eq!(resolved.formatted_address, "Rue de Rome");
    }

    #[test]
    fn test_closest_route_wins_among_routes() {
        let candidates = vec![
            candidate("Far street", north_of_query(400.0), true, "Tunisia"),
            candidate("Close street", north_of_query(20.0), true, "Tunisia"),
            candidate("Middle street", north_of_query(100.0), true, "Tunisia"),
        ];

        let resolved = select_candidate(QUERY, candidates, &schema()).unwrap();
        assert_eq!(resolved.formatted_address, "Close street");
    }

    #[test]
    fn test_falls_back_to_non_route() {
        let candidates = vec![
            candidate("Foreign street", north_of_query(1.0), true, "Algeria"),
            candidate("La Marsa", north_of_query(300.0), false, "Tunisia"),
        ];

        let resolved = select_candidate(QUERY, candidates, &schema()).unwrap();
        assert_eq!(resolved.formatted_address, "La Marsa");
        assert_eq!(resolved.location, north_of_query(300.0));
    }

    #[test]
    fn test_no_candidates_in_country() {
        let candidates = vec![
            candidate("Annaba", north_of_query(10.0), true, "Algeria"),
            candidate("Tripoli", north_of_query(20.0), false, "Libya"),
        ];

        let result = select_candidate(QUERY, candidates, &schema());
        assert!(matches!(result, Err(RentalError::NoResultsInTargetCountry(c)) if c == "Tunisia"));
    }

    #[test]
    fn test_country_match_is_exact() {
        let candidates = vec![candidate("Street", north_of_query(10.0), true, "tunisia")];
        assert!(select_candidate(QUERY, candidates, &schema()).is_err());
    }

    #[test]
    fn test_country_name_on_non_country_component_ignored() {
        let mut odd = candidate("Tunisia Street", north_of_query(10.0), true, "Algeria");
        odd.address_components.push(component("Tunisia", &["route"]));

        assert!(select_candidate(QUERY, vec![odd], &schema()).is_err());
    }

    #[test]
    fn test_equal_distance_keeps_first() {
        let candidates = vec![
            candidate("First", north_of_query(30.0), true, "Tunisia"),
            candidate("Second", north_of_query(30.0), true, "Tunisia"),
        ];

        let resolved = select_candidate(QUERY, candidates, &schema()).unwrap();
        assert_eq!(resolved.formatted_address, "First");
    }

    #[tokio::test]
    async fn test_resolve_returns_winner() {
        let geocoder = StubGeocoder::answering(
            "OK",
            vec![
                candidate("Area", north_of_query(5.0), false, "Tunisia"),
                candidate("Avenue de Paris", north_of_query(50.0), true, "Tunisia"),
            ],
        );

        let resolved = assert_ok!(resolver(geocoder).resolve(QUERY).await);
        assert_eq!(resolved.formatted_address, "Avenue de Paris");
        assert!(resolved.address_components.iter().any(|c| c.has_type("route")));
    }

    #[tokio::test]
    async fn test_resolve_non_success_status() {
        let geocoder = StubGeocoder::answering(
            "ZERO_RESULTS",
            vec![candidate("Ignored", north_of_query(5.0), true, "Tunisia")],
        );

        let result = resolver(geocoder).resolve(QUERY).await;
        assert!(matches!(result, Err(RentalError::UpstreamResolutionFailed(s)) if s == "ZERO_RESULTS"));
    }

    #[tokio::test]
    async fn test_resolve_empty_candidates() {
        let result = resolver(StubGeocoder::answering("OK", Vec::new()))
            .resolve(QUERY)
            .await;
        assert!(matches!(result, Err(RentalError::UpstreamResolutionFailed(_))));
    }

    #[tokio::test]
    async fn test_resolve_transport_failure_passes_through() {
        let geocoder =
            StubGeocoder::failing(RentalError::ExternalApiError("Request timed out".to_string()));

        let result = resolver(geocoder).resolve(QUERY).await;
        assert!(matches!(result, Err(RentalError::ExternalApiError(_))));
    }

    #[tokio::test]
    async fn test_resolve_rejects_invalid_coordinates() {
        // Stub has no answer queued: the geocoder must not be called
        let geocoder = StubGeocoder {
            response: Mutex::new(None),
        };
        let resolver = resolver(geocoder);

        for bad in [LatLng::new(f64::NAN, 10.0), LatLng::new(91.0, 10.0), LatLng::new(0.0, 181.0)] {
            assert!(matches!(
                resolver.resolve(bad).await,
                Err(RentalError::ValidationError(_))
            ));
        }
    }
}
