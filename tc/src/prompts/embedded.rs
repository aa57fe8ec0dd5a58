//! Embedded prompt templates
//!
//! Default templates compiled into the binary. A user override directory can
//! shadow any of these by name (see the loader).

/// Trip-parameter extraction
pub const EXTRACT: &str = r#"Extract travel details from this request: "{{text}}"

Return ONLY a JSON object with these exact keys:
{
  "destination": "City or Country Name",
  "destination_type": "city" or "country",
  "interests": "comma, separated, interests",
  "days": number
}

Disambiguation rule:
- If the request names a country (e.g. "a week in Japan"), destination_type is "country".
- If it names a city, destination_type is "city".
- If ambiguous, assume "city".

If any information is missing, use reasonable defaults."#;

/// Follow-up intent classification
pub const CLASSIFY: &str = r#"Classify the following user input as either a "question" or a "modification" request for a travel itinerary.

USER INPUT: "{{utterance}}"

CONTEXT: {{context}}

CLASSIFICATION RULES:
- "question": User is asking for information, advice, recommendations, explanations, or seeking help. This includes questions about availability, possibilities, or general inquiries.
  Examples: "What's the best time to visit?", "How far is X from Y?", "Can I get a scooter rental?", "Is there a good restaurant nearby?", "Where can I find X?"

- "modification": User is giving a direct command or explicit request to change, add, remove, or replace something in their itinerary. Look for imperative verbs and direct instructions.
  Examples: "Add a restaurant", "Remove the museum", "Replace X with Y", "Include more shopping places", "Take out expensive places"

Respond with a JSON object: {"classification": "question"} or {"classification": "modification"}."#;

/// Initial itinerary generation
pub const ITINERARY: &str = r#"Create a {{days}}-day travel itinerary for {{destination}} focusing on {{interests}}.

{{#if search_context}}{{search_context}}
Use the search results above as a reference for current, popular places to include in the itinerary. Prioritize places with good ratings and detailed information.

{{/if}}Return ONLY a valid JSON object with this structure:
{"places":[{"name":"Name","neighborhood":"Area","category":"food/art/culture/shopping/sightseeing","address":"Address","latitude":null,"longitude":null,"notes":"Brief note"}]}

CRITICAL LOCATION REQUIREMENT:
- ALL places MUST be located in {{destination}}
- DO NOT include places from other destinations
- Verify each place is actually in {{destination}} before including it
- If you cannot verify a place is in {{destination}}, leave it out rather than guessing

Requirements:
- Include {{target_count}} diverse places that match the interests
- Prioritize places from the search results when they match the interests
- Mix of popular attractions and local gems
- Include specific addresses where possible
- Categorize each place appropriately (food, art, culture, shopping, sightseeing)
- Provide helpful notes for each place
- Real places only, NO markdown formatting, just pure JSON"#;

/// Itinerary modification, add-type instructions
pub const MODIFY_ADD: &str = r#"You are modifying a travel itinerary for {{destination}}. Here's the current situation:

Destination: {{destination}}
Current Places: {{places_json}}

{{#if search_context}}{{search_context}}
Use ONLY the search results above when adding new places. Prioritize places with good ratings that are clearly located in {{destination}}.

{{/if}}User Request: "{{instruction}}"

LOCATION CONSTRAINT - EXTREMELY IMPORTANT:
- You are planning a trip to {{destination}}
- ALL new places MUST be located in {{destination}} specifically
- DO NOT add places from other destinations, even if they seem relevant
- Verify each place is actually in {{destination}} before adding it; if unsure, leave it out

CRITICAL INSTRUCTIONS - READ CAREFULLY:

1. PRESERVATION RULE: The "places" array in your response MUST contain ALL places that should exist in the final itinerary.

2. ADD/INCLUDE OPERATIONS:
   - Words like "add", "include", "put in", "to the list", "to the itinerary" mean ADD TO EXISTING
   - You MUST include ALL current places PLUS the new one(s), existing places unchanged and in their original order

Current places count: {{places_count}}
You must return AT LEAST this many places.

Return ONLY a JSON object:
{
  "type": "modification",
  "response": "Description of what changes were made",
  "places": [
    {
      "name": "Place Name",
      "neighborhood": "Area Name",
      "category": "food/art/culture/shopping/sightseeing",
      "address": "Full Address",
      "latitude": null,
      "longitude": null,
      "notes": "Brief description"
    }
  ]
}"#;

/// Itinerary modification, remove/replace/other instructions
pub const MODIFY_EDIT: &str = r#"You are modifying a travel itinerary. Here's the current situation:

Destination: {{destination}}
Current Places: {{places_json}}

{{#if search_context}}{{search_context}}
Use the search results above when modifying places. Prioritize places with good ratings and detailed information.

{{/if}}User Request: "{{instruction}}"

CRITICAL LOCATION REQUIREMENT:
- ALL places (new or existing) MUST be located in {{destination}}
- DO NOT include places from other destinations
- Verify each place is actually in {{destination}} before including it

CRITICAL INSTRUCTIONS - READ CAREFULLY:

1. PRESERVATION RULE: The "places" array in your response MUST contain ALL places that should exist in the final itinerary.

2. REMOVE/DELETE OPERATIONS:
   - Only remove places when explicitly told to "remove", "delete", "take out"
   - Keep all other existing places unchanged

3. REPLACE OPERATIONS:
   - Only replace when explicitly told to "replace X with Y"
   - Keep all other existing places unchanged

4. EXAMPLES:
   - "Remove Place A" -> Keep all places except Place A
   - "Replace Place A with Place B" -> Keep all places but change Place A to Place B

Current places count: {{places_count}}
You must return AT LEAST this many places unless explicitly asked to remove some.

Return ONLY a JSON object:
{
  "type": "modification",
  "response": "Description of what changes were made",
  "places": [
    {
      "name": "Place Name",
      "neighborhood": "Area Name",
      "category": "food/art/culture/shopping/sightseeing",
      "address": "Full Address",
      "latitude": null,
      "longitude": null,
      "notes": "Brief description"
    }
  ]
}"#;

/// Travel question answering
pub const QUESTION: &str = r#"{{context}}

Question: {{question}}

{{#if search_info}}Current information: {{search_info}}

{{/if}}Give a direct 1-sentence answer (max 20 words):"#;

/// Look up an embedded template by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    match name {
        "extract" => Some(EXTRACT),
        "classify" => Some(CLASSIFY),
        "itinerary" => Some(ITINERARY),
        "modify-add" => Some(MODIFY_ADD),
        "modify-edit" => Some(MODIFY_EDIT),
        "question" => Some(QUESTION),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_templates_resolvable() {
        for name in ["extract", "classify", "itinerary", "modify-add", "modify-edit", "question"] {
            assert!(get_embedded(name).is_some(), "missing embedded template: {name}");
        }
        assert!(get_embedded("nonexistent").is_none());
    }
}
