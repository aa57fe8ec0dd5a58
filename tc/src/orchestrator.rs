//! Session orchestration
//!
//! The public boundary of the planning core: one operation per turn. A fresh
//! request runs extraction then generation; a follow-up is classified and
//! routed to the question or modification stage. All session state is
//! reconstructed per call from caller-supplied data; the core itself holds
//! nothing between turns.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Limits;
use crate::domain::{
    ChatTurn, DestinationType, Intent, Place, SessionMetadata, SessionState, TripParameters,
    TripResult, TurnKind, TurnOutcome,
};
use crate::geo::PlaceEnricher;
use crate::llm::GenerationClient;
use crate::prompts::PromptLoader;
use crate::search::SearchContextBuilder;
use crate::stages::{
    ExtractionStage, IntentClassifier, ItineraryGenerationStage, ItineraryModificationStage,
    QuestionStage,
};

/// Caller-supplied state for a follow-up turn
#[derive(Debug, Clone)]
pub struct FollowUpRequest {
    pub destination: String,
    pub destination_type: DestinationType,
    pub interests: String,
    pub days: u32,
    pub places: Vec<Place>,
    pub instruction: String,
    pub original_request: Option<String>,
    pub chat_history: Vec<ChatTurn>,
    pub premium: bool,
}

/// Routes each turn through the stage pipeline
pub struct SessionOrchestrator {
    extraction: ExtractionStage,
    classifier: IntentClassifier,
    generation: ItineraryGenerationStage,
    modification: ItineraryModificationStage,
    question: QuestionStage,
    limits: Limits,
}

impl SessionOrchestrator {
    pub fn new(
        client: Arc<GenerationClient>,
        prompts: Arc<PromptLoader>,
        search: Arc<SearchContextBuilder>,
        enricher: Arc<PlaceEnricher>,
        limits: Limits,
    ) -> Self {
        debug!("SessionOrchestrator::new: called");
        Self {
            extraction: ExtractionStage::new(client.clone(), prompts.clone()),
            classifier: IntentClassifier::new(client.clone(), prompts.clone()),
            generation: ItineraryGenerationStage::new(
                client.clone(),
                prompts.clone(),
                search.clone(),
                enricher.clone(),
                limits.presentation_cap,
            ),
            modification: ItineraryModificationStage::new(
                client.clone(),
                prompts.clone(),
                search.clone(),
                enricher,
            ),
            question: QuestionStage::new(client, prompts, search),
            limits,
        }
    }

    /// Plan a trip from a fresh natural-language request
    pub async fn plan_trip(&self, text: &str, premium: bool) -> TripResult {
        info!(text_len = text.len(), premium, "SessionOrchestrator::plan_trip: called");

        let max_days = self.limits.max_days(premium);
        let params = self.extraction.extract(text, max_days).await;
        let itinerary = self.generation.generate(&params).await;

        info!(
            destination = %params.destination,
            place_count = itinerary.places.len(),
            "plan_trip: done"
        );
        Self::generation_result(params, itinerary.places, itinerary.raw)
    }

    /// Handle a follow-up turn against caller-supplied session state
    ///
    /// An empty place list means there is nothing to follow up on; the turn
    /// is treated as a fresh request instead.
    pub async fn continue_trip(&self, request: FollowUpRequest) -> TripResult {
        info!(
            destination = %request.destination,
            place_count = request.places.len(),
            "SessionOrchestrator::continue_trip: called"
        );

        if request.places.is_empty() {
            debug!("continue_trip: no existing places, rerouting to fresh generation");
            let text = request
                .original_request
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(&request.instruction)
                .to_string();
            return self.plan_trip(&text, request.premium).await;
        }

        let state = Self::rebuild_state(request, self.limits.history_window);
        let intent = self
            .classifier
            .classify(&state.query, &state.params, &state.places)
            .await;
        debug!(%intent, "continue_trip: routed");

        match intent {
            Intent::Question => {
                let answer = self
                    .question
                    .answer(&state.params, &state.places, &state.query, &state.chat_history)
                    .await;
                Self::follow_up_result(state.params, state.places, TurnKind::Answer, answer)
            }
            Intent::Modification => {
                let modified = self
                    .modification
                    .modify(&state.params, &state.places, &state.query)
                    .await;
                Self::follow_up_result(
                    state.params,
                    modified.places,
                    TurnKind::Modification,
                    modified.response,
                )
            }
        }
    }

    /// Reconstruct per-call session state, windowing the chat history
    fn rebuild_state(request: FollowUpRequest, history_window: usize) -> SessionState {
        let mut state = SessionState::new_request(request.instruction.clone());
        state.params = TripParameters {
            destination: request.destination,
            destination_type: request.destination_type,
            interests: request.interests,
            days: request.days,
        };
        state.places = request.places;
        state.metadata = SessionMetadata {
            instruction: Some(request.instruction),
            original_request: request.original_request,
            result_type: None,
        };

        let start = request.chat_history.len().saturating_sub(history_window);
        state.chat_history = request.chat_history[start..].to_vec();
        state
    }

    fn generation_result(params: TripParameters, places: Vec<Place>, raw: Option<String>) -> TripResult {
        TripResult {
            destination: params.destination,
            destination_type: params.destination_type,
            interests: params.interests,
            days: params.days,
            places,
            raw_research_text: raw,
            turn: None,
        }
    }

    fn follow_up_result(
        params: TripParameters,
        places: Vec<Place>,
        kind: TurnKind,
        response: String,
    ) -> TripResult {
        TripResult {
            destination: params.destination,
            destination_type: params.destination_type,
            interests: params.interests,
            days: params.days,
            places,
            raw_research_text: None,
            turn: Some(TurnOutcome { kind, response }),
        }
    }
}
