//! Trip-parameter extraction
//!
//! Turns a free-form trip request into `TripParameters`. The stage never
//! errors: empty input short-circuits to defaults without an engine call,
//! and any generation failure or missing field falls back field-by-field.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::debug;

use crate::coerce::SchemaDescriptor;
use crate::domain::{DestinationType, TripParameters};
use crate::llm::{GenerationClient, GenerationRequest};
use crate::prompts::PromptLoader;

const SYSTEM: &str = "You are a travel expert extracting structured trip details.";

/// Extracts structured trip parameters from a raw request
pub struct ExtractionStage {
    client: Arc<GenerationClient>,
    prompts: Arc<PromptLoader>,
}

impl ExtractionStage {
    pub fn new(client: Arc<GenerationClient>, prompts: Arc<PromptLoader>) -> Self {
        debug!("ExtractionStage::new: called");
        Self { client, prompts }
    }

    /// Every field optional: validation happens after generation so a
    /// partial or legacy-shaped reply still contributes what it has.
    fn schema() -> SchemaDescriptor {
        SchemaDescriptor::new(
            "trip_extraction",
            json!({
                "type": "object",
                "properties": {
                    "destination": { "type": ["string", "null"] },
                    "destination_type": { "type": ["string", "null"] },
                    "city": { "type": ["string", "null"] },
                    "interests": { "type": ["string", "null"] },
                    "days": { "type": ["integer", "null"] }
                },
                "required": []
            }),
        )
    }

    /// Extract parameters from the request text
    ///
    /// `max_days` is the caller's subscription-tier day cap.
    pub async fn extract(&self, text: &str, max_days: u32) -> TripParameters {
        debug!(text_len = text.len(), max_days, "ExtractionStage::extract: called");

        if text.trim().is_empty() {
            debug!("extract: empty input, returning defaults without engine call");
            return TripParameters::default();
        }

        let prompt = match self.prompts.render("extract", &json!({ "text": text })) {
            Ok(prompt) => prompt,
            Err(e) => {
                debug!(error = %e, "extract: template render failed, returning defaults");
                return TripParameters::default();
            }
        };

        let request = GenerationRequest::new(SYSTEM, prompt)
            .with_temperature(0.2)
            .with_max_tokens(150);
        let generated = self.client.generate(request, &Self::schema()).await;

        Self::validate(&generated.value, max_days)
    }

    /// Field-by-field validation with per-field defaults
    fn validate(value: &Value, max_days: u32) -> TripParameters {
        let defaults = TripParameters::default();

        // The legacy shape carried only `city`; honor it when `destination`
        // is absent.
        let destination = non_empty_str(&value["destination"])
            .or_else(|| non_empty_str(&value["city"]))
            .unwrap_or(defaults.destination);

        let destination_type = value["destination_type"]
            .as_str()
            .map(DestinationType::parse)
            .unwrap_or_default();

        let interests = non_empty_str(&value["interests"]).unwrap_or(defaults.interests);

        let days = parse_days(&value["days"])
            .unwrap_or(defaults.days)
            .clamp(1, max_days.max(1));

        debug!(%destination, %destination_type, %interests, days, "validate: extracted parameters");
        TripParameters {
            destination,
            destination_type,
            interests,
            days,
        }
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Days arrive as a number most of the time, sometimes as a numeric string
fn parse_days(value: &Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    if let Some(f) = value.as_f64() {
        return (f >= 0.0).then_some(f as u32);
    }
    value.as_str().and_then(|s| s.trim().parse().ok())
}
