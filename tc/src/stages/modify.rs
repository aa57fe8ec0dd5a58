//! Itinerary modification
//!
//! Applies a follow-up edit instruction to an existing place list. The
//! generator proposes the edited list; this stage reconciles it against the
//! current one so accepted places survive untouched (coordinates included)
//! and additive edits can never silently drop entries.

use std::sync::Arc;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;
use tracing::{debug, warn};

use super::filter_wrong_destination;
use crate::coerce::SchemaDescriptor;
use crate::domain::{Place, TripParameters};
use crate::geo::PlaceEnricher;
use crate::llm::{GenerationClient, GenerationRequest};
use crate::prompts::PromptLoader;
use crate::search::{SearchContextBuilder, needs_search};

const SYSTEM: &str = "You are a travel expert modifying itineraries. Return only valid JSON.";

const NO_CHANGES_RESPONSE: &str = "No changes requested.";
const FAILURE_RESPONSE: &str = "I'm having trouble processing that request right now.";
const GENERIC_RESPONSE: &str = "I've processed your request.";

/// The kind of edit an instruction asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// New entries join the list
    Add,
    /// Entries leave the list
    Remove,
    /// One entry swaps for another
    Replace,
    /// Anything else ("make it more foodie")
    Augment,
}

fn replace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\breplace\b.*\bwith\b").unwrap())
}

fn remove_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(remove|delete)\b|\btake\s+out\b").unwrap())
}

fn add_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(add|include|insert|append)\b|\bput\s+in\b").unwrap())
}

impl EditKind {
    /// Classify an instruction by word-boundary trigger matching
    pub fn detect(instruction: &str) -> Self {
        debug!("EditKind::detect: called");
        if replace_re().is_match(instruction) {
            return EditKind::Replace;
        }
        if remove_re().is_match(instruction) {
            return EditKind::Remove;
        }
        if add_re().is_match(instruction) {
            return EditKind::Add;
        }
        EditKind::Augment
    }

    /// Additive edits must preserve every existing entry
    pub fn is_additive(&self) -> bool {
        matches!(self, EditKind::Add | EditKind::Augment)
    }
}

/// Output of one modification turn
#[derive(Debug, Clone)]
pub struct ModifiedItinerary {
    pub places: Vec<Place>,
    pub response: String,
}

/// Applies edit instructions to an existing itinerary
pub struct ItineraryModificationStage {
    client: Arc<GenerationClient>,
    prompts: Arc<PromptLoader>,
    search: Arc<SearchContextBuilder>,
    enricher: Arc<PlaceEnricher>,
}

impl ItineraryModificationStage {
    pub fn new(
        client: Arc<GenerationClient>,
        prompts: Arc<PromptLoader>,
        search: Arc<SearchContextBuilder>,
        enricher: Arc<PlaceEnricher>,
    ) -> Self {
        debug!("ItineraryModificationStage::new: called");
        Self {
            client,
            prompts,
            search,
            enricher,
        }
    }

    fn schema() -> SchemaDescriptor {
        SchemaDescriptor::new(
            "modification",
            json!({
                "type": "object",
                "properties": {
                    "type": { "type": "string" },
                    "response": { "type": "string" },
                    "places": { "type": "array" }
                },
                "required": ["places"]
            }),
        )
    }

    /// Apply an edit instruction to the current place list
    pub async fn modify(
        &self,
        params: &TripParameters,
        existing: &[Place],
        instruction: &str,
    ) -> ModifiedItinerary {
        debug!(
            destination = %params.destination,
            existing_count = existing.len(),
            "ItineraryModificationStage::modify: called"
        );

        if instruction.trim().is_empty() {
            debug!("modify: empty instruction, no-op");
            return ModifiedItinerary {
                places: existing.to_vec(),
                response: NO_CHANGES_RESPONSE.to_string(),
            };
        }

        let kind = EditKind::detect(instruction);
        debug!(?kind, "modify: edit kind detected");

        let search_context = if needs_search(instruction, existing) {
            self.search
                .for_modification(&params.destination, instruction, kind == EditKind::Add)
                .await
        } else {
            String::new()
        };

        let places_json = serde_json::to_string_pretty(existing).unwrap_or_else(|_| "[]".to_string());
        let template = if kind == EditKind::Add { "modify-add" } else { "modify-edit" };
        let ctx = json!({
            "destination": params.destination,
            "places_json": places_json,
            "search_context": search_context,
            "instruction": instruction,
            "places_count": existing.len(),
        });
        let prompt = match self.prompts.render(template, &ctx) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "modify: template render failed");
                return ModifiedItinerary {
                    places: existing.to_vec(),
                    response: FAILURE_RESPONSE.to_string(),
                };
            }
        };

        let request = GenerationRequest::new(SYSTEM, prompt)
            .with_temperature(0.4)
            .with_max_tokens(2000);
        let generated = self.client.generate(request, &Self::schema()).await;

        if !generated.is_usable() {
            warn!("modify: all generation tiers failed, keeping itinerary unchanged");
            return ModifiedItinerary {
                places: existing.to_vec(),
                response: FAILURE_RESPONSE.to_string(),
            };
        }

        let response = generated.value["response"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(GENERIC_RESPONSE)
            .to_string();

        let proposed = Place::vec_from_value(&generated.value["places"]);
        let reconciled = Self::reconcile(existing, proposed, &params.destination);

        let places = if kind.is_additive() {
            Self::merge_preserving(existing, reconciled)
        } else {
            reconciled
        };

        let places = self
            .enricher
            .enrich(places, &params.destination, params.destination_type)
            .await;

        debug!(place_count = places.len(), "modify: edit complete");
        ModifiedItinerary { places, response }
    }

    /// Substitute name-matched entries with their original records and
    /// wrong-destination-filter the genuinely new ones
    ///
    /// Accepted places are immutable: whatever the generator echoed back for
    /// them is discarded in favor of the record we already hold, which also
    /// keeps enrichment results.
    fn reconcile(existing: &[Place], proposed: Vec<Place>, destination: &str) -> Vec<Place> {
        proposed
            .into_iter()
            .filter_map(|place| match find_by_name(existing, &place.name) {
                Some(original) => Some(original.clone()),
                None => filter_wrong_destination(vec![place], destination).pop(),
            })
            .collect()
    }

    /// Preservation check for additive edits: every existing entry stays, in
    /// its original position, with new entries appended
    fn merge_preserving(existing: &[Place], reconciled: Vec<Place>) -> Vec<Place> {
        let mut merged = existing.to_vec();
        for place in reconciled {
            if find_by_name(&merged, &place.name).is_none() {
                merged.push(place);
            }
        }
        merged
    }
}

fn find_by_name<'a>(places: &'a [Place], name: &str) -> Option<&'a Place> {
    let needle = name.trim().to_lowercase();
    places.iter().find(|p| p.name.trim().to_lowercase() == needle)
}
