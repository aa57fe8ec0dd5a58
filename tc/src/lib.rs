//! tripcraft - conversational travel-itinerary planning core
//!
//! Plans and iteratively revises travel itineraries through natural-language
//! interaction: a trip request becomes structured parameters and a list of
//! recommended places; follow-up utterances are routed to an informational
//! answer or an itinerary edit that never silently drops accepted places.
//!
//! # Core Concepts
//!
//! - **Fallback-chained generation**: every engine call degrades through a
//!   structured tier, a coerced plain-text tier, and a null-filled default;
//!   stage callers never see an error
//! - **State with the caller**: session state is reconstructed per call from
//!   caller-supplied data; the core holds nothing between turns
//! - **Preservation semantics**: additive edits re-merge any entries the
//!   generator dropped; accepted places are immutable except for coordinate
//!   enrichment
//!
//! # Modules
//!
//! - [`coerce`] - schema coercion for raw generator output
//! - [`llm`] - generation engine boundary and fallback chain
//! - [`domain`] - places, trip parameters, session state, results
//! - [`stages`] - extraction, classification, generation, modification,
//!   question answering
//! - [`geo`] - coordinate enrichment via geocoding
//! - [`search`] - web-search grounding and the search-or-not heuristic
//! - [`orchestrator`] - the per-turn public boundary
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod coerce;
pub mod config;
pub mod domain;
pub mod geo;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod search;
pub mod stages;

// Re-export commonly used types
pub use config::{Config, GeocodingConfig, Limits, LlmConfig, SearchConfig};
pub use domain::{
    ChatTurn, DestinationType, Intent, Place, SessionState, TripParameters, TripResult, TurnKind,
    TurnOutcome,
};
pub use llm::{GenerationClient, GradientClient, LlmEngine, LlmError};
pub use orchestrator::{FollowUpRequest, SessionOrchestrator};
