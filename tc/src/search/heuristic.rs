//! Search-or-not gating
//!
//! Every follow-up turn could hit the search API, but most don't need to:
//! an instruction that talks about a place already on the itinerary is
//! answerable from state alone. Search only pays off when the user is
//! discovering something new or asking about fresh facts.

use tracing::debug;

use crate::domain::Place;

/// Keywords that signal discovery of new places or freshness-sensitive facts
const DISCOVERY_KEYWORDS: &[&str] = &[
    "add", "new", "find", "recommend", "suggest", "price", "cost", "hours", "open", "booking",
    "ticket", "current", "best", "near",
];

/// Decide whether a follow-up instruction warrants a search call
///
/// Skips search when the instruction names an existing place verbatim;
/// otherwise searches only when a discovery or freshness keyword appears.
pub fn needs_search(instruction: &str, places: &[Place]) -> bool {
    debug!(place_count = places.len(), "needs_search: called");
    let lowered = instruction.to_lowercase();

    for place in places {
        let name = place.name.trim().to_lowercase();
        if !name.is_empty() && lowered.contains(&name) {
            debug!(name = %place.name, "needs_search: instruction references existing place");
            return false;
        }
    }

    let hit = DISCOVERY_KEYWORDS.iter().find(|k| lowered.contains(*k));
    match hit {
        Some(keyword) => {
            debug!(%keyword, "needs_search: discovery keyword matched");
            true
        }
        None => {
            debug!("needs_search: no trigger, skipping search");
            false
        }
    }
}
