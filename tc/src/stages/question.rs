//! Travel question answering
//!
//! Answers a follow-up question in one short sentence, grounded by a bounded
//! session summary and, when the question calls for fresh facts, a sliver of
//! search context. Failures degrade to a canned pointer at travel guides.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::coerce::SchemaDescriptor;
use crate::domain::{ChatTurn, Place, TripParameters};
use crate::llm::{GenerationClient, GenerationRequest};
use crate::prompts::PromptLoader;
use crate::search::{SearchContextBuilder, needs_search};

const SYSTEM: &str =
    "Answer travel questions in exactly 1 sentence. Maximum 20 words. Be direct and helpful.";

const EMPTY_QUESTION_RESPONSE: &str = "Please ask me a question about your travel plans.";

/// Max place summaries rendered into the question context
const CONTEXT_PLACE_LIMIT: usize = 10;

/// Max chat turns rendered into the question context
const CONTEXT_HISTORY_LIMIT: usize = 6;

/// Answers follow-up questions about the trip
pub struct QuestionStage {
    client: Arc<GenerationClient>,
    prompts: Arc<PromptLoader>,
    search: Arc<SearchContextBuilder>,
}

impl QuestionStage {
    pub fn new(
        client: Arc<GenerationClient>,
        prompts: Arc<PromptLoader>,
        search: Arc<SearchContextBuilder>,
    ) -> Self {
        debug!("QuestionStage::new: called");
        Self {
            client,
            prompts,
            search,
        }
    }

    fn schema() -> SchemaDescriptor {
        SchemaDescriptor::new(
            "question_response",
            json!({
                "type": "object",
                "properties": {
                    "response": { "type": "string" }
                },
                "required": ["response"]
            }),
        )
    }

    /// Answer a question against the current session
    pub async fn answer(
        &self,
        params: &TripParameters,
        places: &[Place],
        question: &str,
        history: &[ChatTurn],
    ) -> String {
        debug!(question_len = question.len(), "QuestionStage::answer: called");

        if question.trim().is_empty() {
            debug!("answer: empty question");
            return EMPTY_QUESTION_RESPONSE.to_string();
        }

        let search_info = if needs_search(question, places) {
            self.search.travel_info(question, &params.destination).await
        } else {
            String::new()
        };

        let context = Self::build_context(params, places, history);
        let ctx = json!({
            "context": context,
            "question": question,
            "search_info": search_info,
        });
        let prompt = match self.prompts.render("question", &ctx) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "answer: template render failed");
                return Self::fallback_response(params, question);
            }
        };

        let request = GenerationRequest::new(SYSTEM, prompt)
            .with_temperature(0.1)
            .with_max_tokens(60);
        let generated = self.client.generate(request, &Self::schema()).await;

        match generated.value["response"].as_str().map(str::trim) {
            Some(response) if !response.is_empty() => normalize(response),
            _ => {
                warn!("answer: no usable response, using fallback");
                Self::fallback_response(params, question)
            }
        }
    }

    /// Bounded session summary: trip line, up to ten place summaries, and
    /// the most recent chat turns
    fn build_context(params: &TripParameters, places: &[Place], history: &[ChatTurn]) -> String {
        let mut context = format!(
            "Trip: {}, {} ({} days)",
            params.destination, params.interests, params.days
        );

        if !places.is_empty() {
            let summaries: Vec<String> = places
                .iter()
                .take(CONTEXT_PLACE_LIMIT)
                .map(|p| match p.category.as_deref() {
                    Some(category) => format!("{} ({})", p.name, category),
                    None => p.name.clone(),
                })
                .collect();
            context.push_str(&format!("\nPlaces: {}", summaries.join(", ")));
        }

        let start = history.len().saturating_sub(CONTEXT_HISTORY_LIMIT);
        for turn in &history[start..] {
            context.push_str(&format!("\n{}: {}", turn.role, turn.content));
        }

        context
    }

    fn fallback_response(params: &TripParameters, question: &str) -> String {
        format!(
            "Check {} travel guides for {}.",
            params.destination,
            question.trim().trim_end_matches('?').to_lowercase()
        )
    }
}

/// Ensure the answer reads as a sentence
fn normalize(response: &str) -> String {
    let trimmed = response.trim();
    if trimmed.ends_with('.') || trimmed.ends_with('!') || trimmed.ends_with('?') {
        trimmed.to_string()
    } else {
        format!("{}.", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::{MockLlmEngine, MockReply};
    use crate::search::mock::MockSearchProvider;

    fn stage(engine: Arc<MockLlmEngine>, provider: Arc<MockSearchProvider>) -> QuestionStage {
        QuestionStage::new(
            Arc::new(GenerationClient::new(engine)),
            Arc::new(PromptLoader::embedded_only()),
            Arc::new(SearchContextBuilder::new(provider)),
        )
    }

    fn params() -> TripParameters {
        TripParameters {
            destination: "Hanoi".to_string(),
            ..TripParameters::default()
        }
    }

    #[tokio::test]
    async fn test_empty_question_short_circuits() {
        let engine = Arc::new(MockLlmEngine::always_failing());
        let stage = stage(engine.clone(), Arc::new(MockSearchProvider::empty()));

        let answer = stage.answer(&params(), &[], "   ", &[]).await;

        assert_eq!(answer, "Please ask me a question about your travel plans.");
        assert_eq!(engine.call_count(), 0);
    }

    #[tokio::test]
    async fn test_answer_normalized_with_period() {
        let engine = Arc::new(MockLlmEngine::new(vec![MockReply::text(
            r#"{"response": "Yes, scooter rentals are easy to find in the Old Quarter"}"#,
        )]));
        let stage = stage(engine, Arc::new(MockSearchProvider::empty()));

        let answer = stage
            .answer(&params(), &[], "can I rent a scooter", &[])
            .await;

        assert_eq!(answer, "Yes, scooter rentals are easy to find in the Old Quarter.");
    }

    #[tokio::test]
    async fn test_existing_punctuation_kept() {
        let engine = Arc::new(MockLlmEngine::new(vec![MockReply::text(
            r#"{"response": "Absolutely!"}"#,
        )]));
        let stage = stage(engine, Arc::new(MockSearchProvider::empty()));

        let answer = stage.answer(&params(), &[], "is it walkable", &[]).await;
        assert_eq!(answer, "Absolutely!");
    }

    #[tokio::test]
    async fn test_failure_points_at_travel_guides() {
        let engine = Arc::new(MockLlmEngine::always_failing());
        let stage = stage(engine, Arc::new(MockSearchProvider::empty()));

        let answer = stage
            .answer(&params(), &[], "Where is the best Pho?", &[])
            .await;

        assert_eq!(answer, "Check Hanoi travel guides for where is the best pho.");
    }

    #[tokio::test]
    async fn test_context_bounds_places_and_history() {
        let engine = Arc::new(MockLlmEngine::new(vec![MockReply::text(
            r#"{"response": "Sure."}"#,
        )]));
        let stage = stage(engine.clone(), Arc::new(MockSearchProvider::empty()));

        let places: Vec<Place> = (1..=12).map(|i| Place::named(format!("Spot {i}"))).collect();
        let history: Vec<ChatTurn> = (1..=10)
            .map(|i| ChatTurn::new("user", format!("turn {i}")))
            .collect();

        stage
            .answer(&params(), &places, "which spot first", &history)
            .await;

        let prompt = &engine.requests()[0].prompt;
        assert!(prompt.contains("Spot 10"));
        assert!(!prompt.contains("Spot 11"));
        assert!(prompt.contains("turn 5"));
        assert!(!prompt.contains("turn 4"));
    }

    #[tokio::test]
    async fn test_search_gated_by_heuristic() {
        let engine = Arc::new(MockLlmEngine::new(vec![
            MockReply::text(r#"{"response": "About $2 per bowl."}"#),
            MockReply::text(r#"{"response": "It is in the Old Quarter."}"#),
        ]));
        let provider = Arc::new(MockSearchProvider::empty());
        let stage = stage(engine, provider.clone());
        let places = vec![Place::named("Tam Vi")];

        // Freshness keyword ("price") triggers a search
        stage
            .answer(&params(), &places, "what is the price of pho", &[])
            .await;
        assert_eq!(provider.queries().len(), 1);

        // Naming an existing place skips it
        stage.answer(&params(), &places, "how do I get to Tam Vi", &[]).await;
        assert_eq!(provider.queries().len(), 1);
    }
}
