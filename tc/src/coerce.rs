//! Schema coercion for raw generator output
//!
//! The text generator does not reliably honor its output contract: replies
//! arrive wrapped in markdown fences, with fields missing, or as outright
//! garbage. `coerce` is the single funnel every stage uses to turn raw text
//! into a validated JSON object, and `SchemaDescriptor` describes what that
//! object must look like.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Max characters of offending text carried in a parse error
const SNIPPET_LEN: usize = 80;

/// Errors from coercing raw generator text to a schema-conformant object
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed JSON near '{snippet}'")]
    MalformedJson { snippet: String },

    #[error("expected a JSON object, got {found}")]
    NotAnObject { found: &'static str },

    #[error("missing required field '{field}'")]
    MissingField { field: String },
}

/// Describes the object shape a stage expects back from the generator
///
/// Built from a hand-written `json!` schema literal. Required fields come
/// from the schema's `required` array; every other property is optional and
/// defaulted to `null` when absent.
#[derive(Debug, Clone)]
pub struct SchemaDescriptor {
    name: String,
    schema: Value,
    required: Vec<String>,
    optional: Vec<String>,
}

impl SchemaDescriptor {
    /// Create a descriptor from a JSON schema object
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        let name = name.into();
        debug!(%name, "SchemaDescriptor::new: called");

        let required: Vec<String> = schema["required"]
            .as_array()
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|f| f.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let optional: Vec<String> = schema["properties"]
            .as_object()
            .map(|props| {
                props
                    .keys()
                    .filter(|k| !required.contains(k))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name,
            schema,
            required,
            optional,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The JSON schema sent to the engine's structured-output tier
    pub fn json_schema(&self) -> &Value {
        &self.schema
    }

    /// Object with every expected field set to null
    ///
    /// This is the last fallback tier's return value: callers get a fully
    /// shaped but empty object instead of an error.
    pub fn null_object(&self) -> Value {
        debug!(name = %self.name, "SchemaDescriptor::null_object: called");
        let mut obj = Map::new();
        for field in self.required.iter().chain(self.optional.iter()) {
            obj.insert(field.clone(), Value::Null);
        }
        Value::Object(obj)
    }

    pub fn required_fields(&self) -> &[String] {
        &self.required
    }
}

/// Strip a single leading/trailing fenced code block and trim whitespace
fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

fn snippet(raw: &str) -> String {
    raw.chars().take(SNIPPET_LEN).collect()
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Coerce raw generator text into a validated JSON object
///
/// Strips one markdown fence if present, parses strictly, then validates
/// loosely against the schema: required fields must be present and non-null,
/// missing optional fields are filled with null. Idempotent: coercing the
/// same text twice yields the same result.
pub fn coerce(raw: &str, schema: Option<&SchemaDescriptor>) -> Result<Value, ParseError> {
    debug!(raw_len = raw.len(), "coerce: called");
    let text = strip_fences(raw);

    let mut value: Value = serde_json::from_str(text).map_err(|e| {
        debug!(error = %e, "coerce: strict parse failed");
        ParseError::MalformedJson { snippet: snippet(text) }
    })?;

    let Some(schema) = schema else {
        debug!("coerce: no schema, returning parsed value");
        return Ok(value);
    };

    let Some(obj) = value.as_object_mut() else {
        debug!("coerce: parsed value is not an object");
        return Err(ParseError::NotAnObject {
            found: value_kind(&value),
        });
    };

    for field in schema.required_fields() {
        match obj.get(field) {
            Some(v) if !v.is_null() => {}
            _ => {
                debug!(%field, "coerce: missing required field");
                return Err(ParseError::MissingField { field: field.clone() });
            }
        }
    }

    for field in &schema.optional {
        obj.entry(field.clone()).or_insert(Value::Null);
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn place_list_schema() -> SchemaDescriptor {
        SchemaDescriptor::new(
            "itinerary",
            json!({
                "type": "object",
                "properties": {
                    "places": { "type": "array" }
                },
                "required": ["places"]
            }),
        )
    }

    fn extraction_schema() -> SchemaDescriptor {
        SchemaDescriptor::new(
            "trip_extraction",
            json!({
                "type": "object",
                "properties": {
                    "destination": { "type": "string" },
                    "destination_type": { "type": "string" },
                    "city": { "type": "string" },
                    "interests": { "type": "string" },
                    "days": { "type": "integer" }
                },
                "required": []
            }),
        )
    }

    #[test]
    fn test_coerce_plain_json() {
        let result = coerce(r#"{"places": []}"#, Some(&place_list_schema())).unwrap();
        assert_eq!(result["places"], json!([]));
    }

    #[test]
    fn test_coerce_strips_json_fence() {
        let raw = "```json\n{\"places\": [{\"name\": \"X\"}]}\n```";
        let result = coerce(raw, Some(&place_list_schema())).unwrap();
        assert_eq!(result["places"][0]["name"], "X");
    }

    #[test]
    fn test_coerce_strips_bare_fence() {
        let raw = "```\n{\"places\": []}\n```";
        assert!(coerce(raw, Some(&place_list_schema())).is_ok());
    }

    #[test]
    fn test_coerce_missing_required_field() {
        let err = coerce(r#"{"response": "hi"}"#, Some(&place_list_schema())).unwrap_err();
        assert!(matches!(err, ParseError::MissingField { field } if field == "places"));
    }

    #[test]
    fn test_coerce_null_required_field_is_missing() {
        let err = coerce(r#"{"places": null}"#, Some(&place_list_schema())).unwrap_err();
        assert!(matches!(err, ParseError::MissingField { .. }));
    }

    #[test]
    fn test_coerce_fills_missing_optional_with_null() {
        let result = coerce(r#"{"city": "Hanoi"}"#, Some(&extraction_schema())).unwrap();
        assert_eq!(result["city"], "Hanoi");
        assert_eq!(result["destination"], Value::Null);
        assert_eq!(result["days"], Value::Null);
    }

    #[test]
    fn test_coerce_rejects_garbage() {
        let err = coerce("Sure! Here are some great places to visit...", None).unwrap_err();
        match err {
            ParseError::MalformedJson { snippet } => {
                assert!(snippet.starts_with("Sure!"));
                assert!(snippet.len() <= SNIPPET_LEN);
            }
            other => panic!("expected MalformedJson, got {other:?}"),
        }
    }

    #[test]
    fn test_coerce_rejects_non_object_with_schema() {
        let err = coerce(r#"["a", "b"]"#, Some(&place_list_schema())).unwrap_err();
        assert!(matches!(err, ParseError::NotAnObject { found: "an array" }));
    }

    #[test]
    fn test_coerce_idempotent() {
        let raw = "```json\n{\"places\": [{\"name\": \"A\"}]}\n```";
        let first = coerce(raw, Some(&place_list_schema())).unwrap();
        let second = coerce(raw, Some(&place_list_schema())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_null_object_shape() {
        let schema = extraction_schema();
        let obj = schema.null_object();
        assert_eq!(obj["destination"], Value::Null);
        assert_eq!(obj["city"], Value::Null);
        assert_eq!(obj["interests"], Value::Null);
        assert_eq!(obj["days"], Value::Null);
    }

    #[test]
    fn test_descriptor_splits_required_and_optional() {
        let schema = SchemaDescriptor::new(
            "classification",
            json!({
                "type": "object",
                "properties": {
                    "classification": { "type": "string" },
                    "confidence": { "type": "number" }
                },
                "required": ["classification"]
            }),
        );
        assert_eq!(schema.required_fields(), ["classification"]);
        assert_eq!(schema.optional, ["confidence"]);
    }

    proptest! {
        // Round-trip: any well-formed object survives fence-wrapping + coercion
        #[test]
        fn prop_coerce_fenced_round_trip(
            name in "[a-zA-Z][a-zA-Z0-9 ]{0,30}",
            lat in -90.0f64..90.0,
            lon in -180.0f64..180.0,
        ) {
            let obj = json!({
                "places": [{"name": name, "latitude": lat, "longitude": lon}]
            });
            let wrapped = format!("```json\n{}\n```", serde_json::to_string(&obj).unwrap());
            let coerced = coerce(&wrapped, Some(&place_list_schema())).unwrap();
            prop_assert_eq!(coerced, obj);
        }
    }
}
