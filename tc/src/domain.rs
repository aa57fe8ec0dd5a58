//! Core data model for trip planning sessions
//!
//! These types cross every stage boundary: a `Place` is a single recommended
//! point of interest, `TripParameters` are the extracted request fields, and
//! `TripResult` is the JSON-shaped object the orchestrator returns per turn.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A recommended point of interest in an itinerary
///
/// Once accepted into an itinerary a place is never mutated in place except
/// for coordinate enrichment; edits replace whole records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Name of the place (required, non-empty)
    pub name: String,

    /// Neighborhood or area
    #[serde(default)]
    pub neighborhood: Option<String>,

    /// Informal category: food/art/culture/shopping/sightseeing
    #[serde(default)]
    pub category: Option<String>,

    /// Full address
    #[serde(default)]
    pub address: Option<String>,

    /// Latitude coordinate (filled by enrichment when missing)
    #[serde(default)]
    pub latitude: Option<f64>,

    /// Longitude coordinate (filled by enrichment when missing)
    #[serde(default)]
    pub longitude: Option<f64>,

    /// Brief description or notes
    #[serde(default)]
    pub notes: Option<String>,
}

impl Place {
    /// Create a place with just a name (tests and fallback paths)
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            neighborhood: None,
            category: None,
            address: None,
            latitude: None,
            longitude: None,
            notes: None,
        }
    }

    /// True when both coordinates are present
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// Parse a `places` array out of a generation payload
    ///
    /// Entries that fail to deserialize or carry an empty name are skipped
    /// rather than failing the whole list; the generator is not trusted to
    /// honor the schema on every element.
    pub fn vec_from_value(value: &serde_json::Value) -> Vec<Place> {
        debug!("Place::vec_from_value: called");
        let Some(entries) = value.as_array() else {
            debug!("Place::vec_from_value: not an array");
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|entry| match serde_json::from_value::<Place>(entry.clone()) {
                Ok(place) if !place.name.trim().is_empty() => Some(place),
                Ok(_) => {
                    debug!("Place::vec_from_value: skipping entry with empty name");
                    None
                }
                Err(e) => {
                    debug!(error = %e, "Place::vec_from_value: skipping malformed entry");
                    None
                }
            })
            .collect()
    }
}

/// Whether the trip targets a city or a whole country
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationType {
    #[default]
    City,
    Country,
}

impl DestinationType {
    /// Parse from generator output; anything unrecognized is treated as a city
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "country" => DestinationType::Country,
            _ => DestinationType::City,
        }
    }
}

impl std::fmt::Display for DestinationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DestinationType::City => write!(f, "city"),
            DestinationType::Country => write!(f, "country"),
        }
    }
}

/// Structured fields extracted from a free-form trip request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripParameters {
    pub destination: String,
    pub destination_type: DestinationType,
    /// Comma-joined interests, e.g. "art, food"
    pub interests: String,
    pub days: u32,
}

impl Default for TripParameters {
    fn default() -> Self {
        debug!("TripParameters::default: called");
        Self {
            destination: "Bangalore".to_string(),
            destination_type: DestinationType::City,
            interests: "art, food".to_string(),
            days: 1,
        }
    }
}

/// Classification of a follow-up utterance
///
/// Only these two labels ever reach the orchestrator; anything else is
/// resolved by the classifier's deterministic fallback first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Question,
    Modification,
}

impl Intent {
    /// Parse a generator-produced label, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "question" => Some(Intent::Question),
            "modification" => Some(Intent::Modification),
            _ => None,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intent::Question => write!(f, "question"),
            Intent::Modification => write!(f, "modification"),
        }
    }
}

/// One turn of caller-supplied chat history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Per-call session state
///
/// Owned exclusively by one orchestration call; the caller is responsible for
/// persisting whatever it needs between turns and handing it back.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Original query text for this turn
    pub query: String,
    pub params: TripParameters,
    /// Insertion order is display order
    pub places: Vec<Place>,
    pub chat_history: Vec<ChatTurn>,
    pub intent: Option<Intent>,
    pub response: Option<String>,
    pub metadata: SessionMetadata,
}

/// Free-text metadata carried through a turn
#[derive(Debug, Clone, Default)]
pub struct SessionMetadata {
    pub instruction: Option<String>,
    pub original_request: Option<String>,
    pub result_type: Option<String>,
}

impl SessionState {
    /// Build a fresh-request state
    pub fn new_request(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            params: TripParameters::default(),
            places: Vec::new(),
            chat_history: Vec::new(),
            intent: None,
            response: None,
            metadata: SessionMetadata::default(),
        }
    }

    /// Most-recent-N window over the chat history
    pub fn bounded_history(&self, window: usize) -> &[ChatTurn] {
        let start = self.chat_history.len().saturating_sub(window);
        &self.chat_history[start..]
    }
}

/// Kind of follow-up turn outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnKind {
    Answer,
    Modification,
}

/// The `{type, response}` payload of a follow-up turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    #[serde(rename = "type")]
    pub kind: TurnKind,
    pub response: String,
}

/// Result object produced by every orchestrated turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripResult {
    pub destination: String,
    pub destination_type: DestinationType,
    pub interests: String,
    pub days: u32,
    /// Current full place list after this turn
    pub places: Vec<Place>,
    /// Raw generation payload, present on generation turns only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_research_text: Option<String>,
    /// `{type, response}`, present on follow-up turns only
    #[serde(default, flatten)]
    pub turn: Option<TurnOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_place_vec_from_value_skips_malformed() {
        let value = json!([
            {"name": "Lenin Museum", "category": "culture"},
            {"category": "food"},
            {"name": "", "category": "art"},
            {"name": "Dong Xuan Market", "latitude": 21.038, "longitude": 105.849}
        ]);

        let places = Place::vec_from_value(&value);
        assert_eq!(places.len(), 2);
        assert_eq!(places[0].name, "Lenin Museum");
        assert_eq!(places[1].name, "Dong Xuan Market");
        assert!(places[1].has_coordinates());
    }

    #[test]
    fn test_place_vec_from_value_non_array() {
        assert!(Place::vec_from_value(&json!("nope")).is_empty());
        assert!(Place::vec_from_value(&json!(null)).is_empty());
    }

    #[test]
    fn test_destination_type_parse() {
        assert_eq!(DestinationType::parse("country"), DestinationType::Country);
        assert_eq!(DestinationType::parse("Country"), DestinationType::Country);
        assert_eq!(DestinationType::parse("city"), DestinationType::City);
        // Ambiguous input is assumed to be a city
        assert_eq!(DestinationType::parse("region"), DestinationType::City);
    }

    #[test]
    fn test_intent_parse() {
        assert_eq!(Intent::parse("question"), Some(Intent::Question));
        assert_eq!(Intent::parse("MODIFICATION"), Some(Intent::Modification));
        assert_eq!(Intent::parse(" Question "), Some(Intent::Question));
        assert_eq!(Intent::parse("garbage"), None);
        assert_eq!(Intent::parse(""), None);
    }

    #[test]
    fn test_default_trip_parameters() {
        let params = TripParameters::default();
        assert_eq!(params.destination, "Bangalore");
        assert_eq!(params.destination_type, DestinationType::City);
        assert_eq!(params.interests, "art, food");
        assert_eq!(params.days, 1);
    }

    #[test]
    fn test_bounded_history() {
        let mut state = SessionState::new_request("test");
        for i in 0..12 {
            state.chat_history.push(ChatTurn::new("user", format!("turn {i}")));
        }

        let window = state.bounded_history(8);
        assert_eq!(window.len(), 8);
        assert_eq!(window[0].content, "turn 4");
        assert_eq!(window[7].content, "turn 11");

        // Window larger than history returns everything
        assert_eq!(state.bounded_history(100).len(), 12);
    }

    #[test]
    fn test_trip_result_follow_up_shape() {
        let result = TripResult {
            destination: "Hanoi".to_string(),
            destination_type: DestinationType::City,
            interests: "food".to_string(),
            days: 2,
            places: vec![Place::named("Old Quarter")],
            raw_research_text: None,
            turn: Some(TurnOutcome {
                kind: TurnKind::Answer,
                response: "Yes, scooter rentals are widely available.".to_string(),
            }),
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["type"], "answer");
        assert_eq!(value["response"], "Yes, scooter rentals are widely available.");
        assert!(value.get("raw_research_text").is_none());

        let back: TripResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_trip_result_generation_shape() {
        let result = TripResult {
            destination: "Tokyo".to_string(),
            destination_type: DestinationType::City,
            interests: "food".to_string(),
            days: 2,
            places: vec![],
            raw_research_text: Some("{\"places\":[]}".to_string()),
            turn: None,
        };

        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("type").is_none());
        assert_eq!(value["raw_research_text"], "{\"places\":[]}");
    }
}
