//! Pipeline stages
//!
//! Each stage wraps one generation concern: extracting trip parameters,
//! classifying follow-up intent, generating an itinerary, modifying one, and
//! answering questions. Stages never return errors to the orchestrator;
//! every failure degrades to a stage-specific default.

use tracing::debug;

use crate::domain::Place;

pub mod classify;
pub mod extract;
pub mod itinerary;
pub mod modify;
pub mod question;

pub use classify::IntentClassifier;
pub use extract::ExtractionStage;
pub use itinerary::{GeneratedItinerary, ItineraryGenerationStage};
pub use modify::{EditKind, ItineraryModificationStage, ModifiedItinerary};
pub use question::QuestionStage;

/// Destination names the generator confuses with nearby hubs
const WRONG_DESTINATION_KEYWORDS: &[&str] = &[
    "ho chi minh",
    "saigon",
    "bangkok",
    "kuala lumpur",
    "singapore",
    "jakarta",
    "manila",
    "phnom penh",
    "vientiane",
];

/// Drop places whose name, address, or notes mention a known wrong
/// destination
///
/// The generator occasionally leaks famous places from neighboring hubs into
/// an itinerary. Matching the target destination itself is exempt.
pub(crate) fn filter_wrong_destination(places: Vec<Place>, destination: &str) -> Vec<Place> {
    debug!(%destination, place_count = places.len(), "filter_wrong_destination: called");
    let target = destination.to_lowercase();

    places
        .into_iter()
        .filter(|place| {
            let name = place.name.to_lowercase();
            let address = place.address.as_deref().unwrap_or("").to_lowercase();
            let notes = place.notes.as_deref().unwrap_or("").to_lowercase();

            let leaked = WRONG_DESTINATION_KEYWORDS
                .iter()
                .filter(|k| **k != target)
                .any(|k| name.contains(k) || address.contains(k) || notes.contains(k));

            if leaked {
                debug!(name = %place.name, "filter_wrong_destination: dropping leaked place");
            }
            !leaked
        })
        .collect()
}
