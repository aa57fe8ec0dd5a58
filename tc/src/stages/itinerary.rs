//! Initial itinerary generation
//!
//! Produces the first place list for a trip: search-grounded prompt,
//! generation through the fallback chain, wrong-destination filtering, a
//! presentation cap, then coordinate enrichment. Total failure yields an
//! empty list, never an error.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use super::filter_wrong_destination;
use crate::coerce::SchemaDescriptor;
use crate::domain::{Place, TripParameters};
use crate::geo::PlaceEnricher;
use crate::llm::{GenerationClient, GenerationRequest};
use crate::prompts::PromptLoader;
use crate::search::SearchContextBuilder;

const SYSTEM: &str = "You are a travel expert. Return only valid JSON with real, current places.";

/// Output of one generation turn
#[derive(Debug, Clone)]
pub struct GeneratedItinerary {
    pub places: Vec<Place>,
    /// Raw generation payload, kept for the result's research-text field
    pub raw: Option<String>,
}

/// Generates the initial place list for a trip
pub struct ItineraryGenerationStage {
    client: Arc<GenerationClient>,
    prompts: Arc<PromptLoader>,
    search: Arc<SearchContextBuilder>,
    enricher: Arc<PlaceEnricher>,
    presentation_cap: usize,
}

impl ItineraryGenerationStage {
    pub fn new(
        client: Arc<GenerationClient>,
        prompts: Arc<PromptLoader>,
        search: Arc<SearchContextBuilder>,
        enricher: Arc<PlaceEnricher>,
        presentation_cap: usize,
    ) -> Self {
        debug!(presentation_cap, "ItineraryGenerationStage::new: called");
        Self {
            client,
            prompts,
            search,
            enricher,
            presentation_cap,
        }
    }

    fn schema() -> SchemaDescriptor {
        SchemaDescriptor::new(
            "itinerary",
            json!({
                "type": "object",
                "properties": {
                    "places": { "type": "array" }
                },
                "required": ["places"]
            }),
        )
    }

    /// How many places to ask for: scales with trip length, floored at 5
    fn target_count(days: u32) -> u32 {
        5.max(days * 2)
    }

    /// Generate, filter, cap, and enrich an itinerary
    pub async fn generate(&self, params: &TripParameters) -> GeneratedItinerary {
        debug!(destination = %params.destination, days = params.days, "ItineraryGenerationStage::generate: called");

        let search_context = self
            .search
            .for_interests(&params.destination, &params.interests)
            .await;

        let ctx = json!({
            "days": params.days,
            "destination": params.destination,
            "interests": params.interests,
            "target_count": Self::target_count(params.days),
            "search_context": search_context,
        });
        let prompt = match self.prompts.render("itinerary", &ctx) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "generate: template render failed");
                return GeneratedItinerary {
                    places: Vec::new(),
                    raw: None,
                };
            }
        };

        let request = GenerationRequest::new(SYSTEM, prompt)
            .with_temperature(0.5)
            .with_max_tokens(2000);
        let generated = self.client.generate(request, &Self::schema()).await;

        if !generated.is_usable() {
            warn!("generate: all generation tiers failed, returning empty itinerary");
            return GeneratedItinerary {
                places: Vec::new(),
                raw: None,
            };
        }

        let raw = Some(generated.value.to_string());
        let mut places = Place::vec_from_value(&generated.value["places"]);
        places = filter_wrong_destination(places, &params.destination);
        places.truncate(self.presentation_cap);

        let places = self
            .enricher
            .enrich(places, &params.destination, params.destination_type)
            .await;

        debug!(place_count = places.len(), "generate: itinerary complete");
        GeneratedItinerary { places, raw }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DestinationType;
    use crate::geo::mock::MockGeocoder;
    use crate::geo::{GeoCandidate, StaticGazetteer};
    use crate::llm::client::mock::{MockLlmEngine, MockReply};
    use crate::search::mock::MockSearchProvider;

    fn stage(engine: Arc<MockLlmEngine>, geocoder: MockGeocoder) -> ItineraryGenerationStage {
        ItineraryGenerationStage::new(
            Arc::new(GenerationClient::new(engine)),
            Arc::new(PromptLoader::embedded_only()),
            Arc::new(SearchContextBuilder::new(Arc::new(MockSearchProvider::empty()))),
            Arc::new(PlaceEnricher::new(Arc::new(geocoder), Arc::new(StaticGazetteer))),
            6,
        )
    }

    fn params(destination: &str, days: u32) -> TripParameters {
        TripParameters {
            destination: destination.to_string(),
            destination_type: DestinationType::City,
            interests: "food, art".to_string(),
            days,
        }
    }

    fn places_reply(names: &[&str]) -> String {
        let places: Vec<_> = names.iter().map(|n| json!({ "name": n })).collect();
        json!({ "places": places }).to_string()
    }

    #[test]
    fn test_target_count() {
        assert_eq!(ItineraryGenerationStage::target_count(1), 5);
        assert_eq!(ItineraryGenerationStage::target_count(2), 5);
        assert_eq!(ItineraryGenerationStage::target_count(3), 6);
        assert_eq!(ItineraryGenerationStage::target_count(7), 14);
    }

    #[tokio::test]
    async fn test_generate_enriches_places() {
        let engine = Arc::new(MockLlmEngine::new(vec![MockReply::text(places_reply(&[
            "Tam Vi",
            "Hoan Kiem Lake",
        ]))]));
        let geocoder = MockGeocoder::returning(GeoCandidate {
            latitude: 21.0,
            longitude: 105.8,
            place_name: None,
        });
        let stage = stage(engine, geocoder);

        let itinerary = stage.generate(&params("Hanoi", 2)).await;

        assert_eq!(itinerary.places.len(), 2);
        assert!(itinerary.places.iter().all(Place::has_coordinates));
        assert!(itinerary.raw.is_some());
    }

    #[tokio::test]
    async fn test_generate_caps_at_presentation_limit() {
        let names: Vec<String> = (1..=10).map(|i| format!("Place {i}")).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let engine = Arc::new(MockLlmEngine::new(vec![MockReply::text(places_reply(&name_refs))]));
        let stage = stage(engine, MockGeocoder::not_found());

        let itinerary = stage.generate(&params("Hanoi", 7)).await;

        assert_eq!(itinerary.places.len(), 6);
        assert_eq!(itinerary.places[0].name, "Place 1");
    }

    #[tokio::test]
    async fn test_generate_filters_wrong_destination() {
        let engine = Arc::new(MockLlmEngine::new(vec![MockReply::text(places_reply(&[
            "Hoan Kiem Lake",
            "Bangkok Floating Market",
        ]))]));
        let stage = stage(engine, MockGeocoder::not_found());

        let itinerary = stage.generate(&params("Hanoi", 1)).await;

        assert_eq!(itinerary.places.len(), 1);
        assert_eq!(itinerary.places[0].name, "Hoan Kiem Lake");
    }

    #[tokio::test]
    async fn test_generate_total_failure_yields_empty() {
        let engine = Arc::new(MockLlmEngine::always_failing());
        let stage = stage(engine, MockGeocoder::not_found());

        let itinerary = stage.generate(&params("Hanoi", 3)).await;

        assert!(itinerary.places.is_empty());
        assert!(itinerary.raw.is_none());
    }

    #[tokio::test]
    async fn test_generate_survives_geocoder_failure() {
        let engine = Arc::new(MockLlmEngine::new(vec![MockReply::text(places_reply(&[
            "Tam Vi",
        ]))]));
        let stage = stage(engine, MockGeocoder::failing());

        let itinerary = stage.generate(&params("Hanoi", 1)).await;

        assert_eq!(itinerary.places.len(), 1);
        assert!(!itinerary.places[0].has_coordinates());
    }
}
