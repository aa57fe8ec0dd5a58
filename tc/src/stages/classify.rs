//! Follow-up intent classification
//!
//! Routes a follow-up utterance to either the question or modification path.
//! The generator does the nuanced work; a deterministic keyword fallback
//! guarantees a valid label when it misbehaves, with `question` as the
//! terminal default.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use crate::coerce::SchemaDescriptor;
use crate::domain::{Intent, Place, TripParameters};
use crate::llm::{GenerationClient, GenerationRequest};
use crate::prompts::PromptLoader;

const SYSTEM: &str = "You are a precise intent classifier for travel planning. \
'question' = asking for information/availability. 'modification' = direct command \
to change itinerary. Questions about 'can I', 'where can I', 'is there' are \
ALWAYS questions, not modifications.";

/// Imperative verbs that signal itinerary edits
const MODIFICATION_KEYWORDS: &[&str] = &[
    "add", "remove", "delete", "replace", "change", "modify", "update", "include", "exclude",
    "swap", "substitute", "insert", "drop",
];

/// Interrogatives and availability phrasings
const QUESTION_KEYWORDS: &[&str] = &[
    "what", "where", "when", "how", "why", "which", "who", "is", "are", "can", "could", "would",
    "should", "tell me", "explain",
];

/// Max place names included in the classification context
const CONTEXT_PLACE_LIMIT: usize = 5;

/// Classifies follow-up utterances as question or modification
pub struct IntentClassifier {
    client: Arc<GenerationClient>,
    prompts: Arc<PromptLoader>,
}

impl IntentClassifier {
    pub fn new(client: Arc<GenerationClient>, prompts: Arc<PromptLoader>) -> Self {
        debug!("IntentClassifier::new: called");
        Self { client, prompts }
    }

    fn schema() -> SchemaDescriptor {
        SchemaDescriptor::new(
            "classification",
            json!({
                "type": "object",
                "properties": {
                    "classification": { "type": "string" }
                },
                "required": ["classification"]
            }),
        )
    }

    /// Classify an utterance against the current session
    pub async fn classify(&self, utterance: &str, params: &TripParameters, places: &[Place]) -> Intent {
        debug!(utterance_len = utterance.len(), "IntentClassifier::classify: called");

        let context = Self::build_context(params, places);
        let ctx = json!({ "utterance": utterance, "context": context });
        let prompt = match self.prompts.render("classify", &ctx) {
            Ok(prompt) => prompt,
            Err(e) => {
                debug!(error = %e, "classify: template render failed, using keyword fallback");
                return Self::fallback_classify(utterance);
            }
        };

        let request = GenerationRequest::new(SYSTEM, prompt)
            .with_temperature(0.1)
            .with_max_tokens(20);
        let generated = self.client.generate(request, &Self::schema()).await;

        // Defaulted tier yields a null classification, which parse rejects
        if let Some(label) = generated.value["classification"].as_str()
            && let Some(intent) = Intent::parse(label)
        {
            debug!(%intent, "classify: engine label accepted");
            return intent;
        }

        debug!("classify: invalid or missing label, using keyword fallback");
        Self::fallback_classify(utterance)
    }

    /// Session summary the classifier sees alongside the utterance
    fn build_context(params: &TripParameters, places: &[Place]) -> String {
        let mut context = format!(
            "Planning a {}-day trip to {} (interests: {}).",
            params.days, params.destination, params.interests
        );

        if !places.is_empty() {
            let names: Vec<&str> = places
                .iter()
                .take(CONTEXT_PLACE_LIMIT)
                .map(|p| p.name.as_str())
                .collect();
            context.push_str(&format!(" Current itinerary: {}.", names.join(", ")));
        }

        context
    }

    /// Deterministic keyword classification
    ///
    /// Modification keywords win over question keywords; an utterance
    /// matching neither is a question.
    pub fn fallback_classify(utterance: &str) -> Intent {
        debug!("IntentClassifier::fallback_classify: called");
        let lowered = utterance.to_lowercase();

        if MODIFICATION_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            debug!("fallback_classify: modification keyword matched");
            return Intent::Modification;
        }

        if QUESTION_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            debug!("fallback_classify: question keyword matched");
            return Intent::Question;
        }

        debug!("fallback_classify: no keyword matched, defaulting to question");
        Intent::Question
    }
}
