//! Place enrichment via forward geocoding
//!
//! Generated places usually arrive without coordinates. The enricher fills
//! them in through the `Geocoder` boundary (Mapbox in production) so map
//! markers render, and backfills missing addresses from the geocoder's
//! resolved place name. Enrichment is best-effort: a failed lookup leaves
//! the place as-is and never fails the pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GeocodingConfig;
use crate::domain::{DestinationType, Place};

mod gazetteer;

pub use gazetteer::{Gazetteer, StaticGazetteer};

/// Errors from the geocoding collaborator
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("Geocoding configuration error: {0}")]
    Configuration(String),

    #[error("Geocoding request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Malformed geocoding response: {0}")]
    InvalidResponse(String),
}

/// A resolved location
#[derive(Debug, Clone, PartialEq)]
pub struct GeoCandidate {
    pub latitude: f64,
    pub longitude: f64,
    /// Full resolved place name, used to backfill missing addresses
    pub place_name: Option<String>,
}

/// Forward-geocoding boundary
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a free-text query to its best candidate, if any
    async fn locate(&self, query: &str) -> Result<Option<GeoCandidate>, GeoError>;
}

/// Mapbox forward-geocoding client
pub struct MapboxGeocoder {
    base_url: String,
    token: String,
    http: Client,
}

impl MapboxGeocoder {
    /// Create a new client from configuration
    pub fn from_config(config: &GeocodingConfig) -> Result<Self, GeoError> {
        debug!("MapboxGeocoder::from_config: called");
        let token = config
            .token()
            .map_err(|e| GeoError::Configuration(e.to_string()))?;

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(GeoError::Network)?;

        Ok(Self {
            base_url: config.base_url.clone(),
            token,
            http,
        })
    }

    fn request_url(&self, query: &str) -> Result<Url, GeoError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| GeoError::Configuration(format!("Bad geocoding base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| GeoError::Configuration("Geocoding base URL cannot carry a path".to_string()))?
            .push(&format!("{}.json", query));
        url.query_pairs_mut()
            .append_pair("access_token", &self.token)
            .append_pair("limit", "1");
        Ok(url)
    }
}

#[async_trait]
impl Geocoder for MapboxGeocoder {
    async fn locate(&self, query: &str) -> Result<Option<GeoCandidate>, GeoError> {
        debug!(%query, "MapboxGeocoder::locate: called");
        let url = self.request_url(query)?;

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GeoError::InvalidResponse(format!(
                "Geocoding returned {}: {}",
                status, text
            )));
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GeoError::InvalidResponse(e.to_string()))?;

        let Some(feature) = body.features.into_iter().next() else {
            debug!(%query, "locate: no features");
            return Ok(None);
        };

        // Mapbox centers are [longitude, latitude]
        let &[longitude, latitude] = feature.center.as_slice() else {
            return Err(GeoError::InvalidResponse(format!(
                "Feature center had {} components",
                feature.center.len()
            )));
        };

        debug!(%query, latitude, longitude, "locate: resolved");
        Ok(Some(GeoCandidate {
            latitude,
            longitude,
            place_name: feature.place_name,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    features: Vec<GeoFeature>,
}

#[derive(Debug, Deserialize)]
struct GeoFeature {
    #[serde(default)]
    center: Vec<f64>,
    place_name: Option<String>,
}

/// Fills in coordinates and addresses for generated places
pub struct PlaceEnricher {
    geocoder: Arc<dyn Geocoder>,
    gazetteer: Arc<dyn Gazetteer>,
}

impl PlaceEnricher {
    pub fn new(geocoder: Arc<dyn Geocoder>, gazetteer: Arc<dyn Gazetteer>) -> Self {
        debug!("PlaceEnricher::new: called");
        Self { geocoder, gazetteer }
    }

    /// Enrich every place missing coordinates, concurrently
    ///
    /// Order is preserved. Places that already carry coordinates are left
    /// untouched and cost no lookup.
    pub async fn enrich(
        &self,
        places: Vec<Place>,
        destination: &str,
        destination_type: DestinationType,
    ) -> Vec<Place> {
        debug!(
            %destination,
            place_count = places.len(),
            "PlaceEnricher::enrich: called"
        );
        let lookups = places
            .into_iter()
            .map(|place| self.enrich_one(place, destination, destination_type));
        join_all(lookups).await
    }

    async fn enrich_one(&self, mut place: Place, destination: &str, destination_type: DestinationType) -> Place {
        if place.has_coordinates() {
            debug!(name = %place.name, "enrich_one: already has coordinates");
            return place;
        }

        let query = self.build_query(&place, destination, destination_type);
        debug!(name = %place.name, %query, "enrich_one: geocoding");

        match self.geocoder.locate(&query).await {
            Ok(Some(candidate)) => {
                place.latitude = Some(candidate.latitude);
                place.longitude = Some(candidate.longitude);
                if place.address.is_none() {
                    place.address = candidate.place_name;
                }
            }
            Ok(None) => {
                debug!(name = %place.name, "enrich_one: no candidate found");
            }
            Err(e) => {
                warn!(name = %place.name, error = %e, "enrich_one: lookup failed, leaving coordinates empty");
            }
        }

        place
    }

    /// Build the lookup query: name, address, destination, and a country
    /// hint when the destination is a city the gazetteer knows.
    fn build_query(&self, place: &Place, destination: &str, destination_type: DestinationType) -> String {
        let mut parts: Vec<&str> = vec![place.name.as_str()];
        if let Some(ref address) = place.address {
            parts.push(address);
        }
        parts.push(destination);

        if destination_type == DestinationType::City
            && let Some(country) = self.gazetteer.country_for(destination)
        {
            parts.push(country);
        }

        parts.join(", ")
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// What the mock returns for every lookup
    pub enum MockOutcome {
        Found(GeoCandidate),
        NotFound,
        Fail,
    }

    /// Scripted geocoder for tests
    pub struct MockGeocoder {
        outcome: MockOutcome,
        queries: Mutex<Vec<String>>,
    }

    impl MockGeocoder {
        pub fn returning(candidate: GeoCandidate) -> Self {
            Self {
                outcome: MockOutcome::Found(candidate),
                queries: Mutex::new(Vec::new()),
            }
        }

        pub fn not_found() -> Self {
            Self {
                outcome: MockOutcome::NotFound,
                queries: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                outcome: MockOutcome::Fail,
                queries: Mutex::new(Vec::new()),
            }
        }

        /// Queries received, in order
        pub fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Geocoder for MockGeocoder {
        async fn locate(&self, query: &str) -> Result<Option<GeoCandidate>, GeoError> {
            self.queries.lock().unwrap().push(query.to_string());
            match &self.outcome {
                MockOutcome::Found(candidate) => Ok(Some(candidate.clone())),
                MockOutcome::NotFound => Ok(None),
                MockOutcome::Fail => Err(GeoError::InvalidResponse("mock failure".to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockGeocoder;
    use super::*;

    fn candidate() -> GeoCandidate {
        GeoCandidate {
            latitude: 21.0278,
            longitude: 105.8342,
            place_name: Some("Tam Vi, 4B P. Yên Thế, Hanoi, Vietnam".to_string()),
        }
    }

    fn enricher(geocoder: MockGeocoder) -> (Arc<MockGeocoder>, PlaceEnricher) {
        let geocoder = Arc::new(geocoder);
        let enricher = PlaceEnricher::new(geocoder.clone(), Arc::new(StaticGazetteer));
        (geocoder, enricher)
    }

    #[tokio::test]
    async fn test_enrich_fills_coordinates_and_backfills_address() {
        let (_, enricher) = enricher(MockGeocoder::returning(candidate()));
        let places = vec![Place::named("Tam Vi")];

        let enriched = enricher.enrich(places, "Hanoi", DestinationType::City).await;

        assert_eq!(enriched[0].latitude, Some(21.0278));
        assert_eq!(enriched[0].longitude, Some(105.8342));
        assert_eq!(
            enriched[0].address.as_deref(),
            Some("Tam Vi, 4B P. Yên Thế, Hanoi, Vietnam")
        );
    }

    #[tokio::test]
    async fn test_enrich_skips_places_with_coordinates() {
        let (geocoder, enricher) = enricher(MockGeocoder::returning(candidate()));
        let mut place = Place::named("Known Spot");
        place.latitude = Some(1.0);
        place.longitude = Some(2.0);

        let enriched = enricher.enrich(vec![place], "Hanoi", DestinationType::City).await;

        assert_eq!(enriched[0].latitude, Some(1.0));
        assert!(geocoder.queries().is_empty());
    }

    #[tokio::test]
    async fn test_query_carries_country_hint_for_known_city() {
        let (geocoder, enricher) = enricher(MockGeocoder::not_found());
        let mut place = Place::named("Tam Vi");
        place.address = Some("4B Yen The".to_string());

        enricher.enrich(vec![place], "Hanoi", DestinationType::City).await;

        assert_eq!(geocoder.queries(), vec!["Tam Vi, 4B Yen The, Hanoi, Vietnam"]);
    }

    #[tokio::test]
    async fn test_query_skips_country_hint_for_country_destination() {
        let (geocoder, enricher) = enricher(MockGeocoder::not_found());

        enricher
            .enrich(vec![Place::named("Fushimi Inari")], "Japan", DestinationType::Country)
            .await;

        assert_eq!(geocoder.queries(), vec!["Fushimi Inari, Japan"]);
    }

    #[tokio::test]
    async fn test_lookup_failure_leaves_place_unchanged() {
        let (_, enricher) = enricher(MockGeocoder::failing());
        let original_address = Some("Somewhere 12".to_string());
        let mut place = Place::named("Flaky Cafe");
        place.address = original_address.clone();

        let enriched = enricher.enrich(vec![place], "Berlin", DestinationType::City).await;

        assert!(enriched[0].latitude.is_none());
        assert!(enriched[0].longitude.is_none());
        assert_eq!(enriched[0].address, original_address);
    }

    #[tokio::test]
    async fn test_not_found_leaves_coordinates_empty() {
        let (_, enricher) = enricher(MockGeocoder::not_found());

        let enriched = enricher
            .enrich(vec![Place::named("Imaginary Museum")], "Paris", DestinationType::City)
            .await;

        assert!(!enriched[0].has_coordinates());
    }
}
