//! Two-tier generation client
//!
//! Tier 1 asks the engine for schema-constrained output. Tier 2 reissues the
//! call as plain chat with an explicit "return only valid JSON" instruction
//! and coerces the reply. If both tiers fail, callers get a null-filled
//! object shaped by the schema, never an error. This is the one place the
//! engine's unreliability is absorbed; downstream stages pattern-match on
//! the outcome instead of catching anything.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::{EngineRequest, LlmEngine};
use crate::coerce::{SchemaDescriptor, coerce};

/// Which execution path served a generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Schema-constrained engine output parsed cleanly
    Structured,
    /// Plain chat reply coerced into shape
    TextFallback,
    /// Both tiers failed; value is the schema's null object
    Defaulted,
}

/// Outcome of a generation call; always a usable object
#[derive(Debug, Clone)]
pub struct Generated {
    pub value: Value,
    pub tier: Tier,
}

impl Generated {
    /// True when a real tier produced this value (not the null default)
    pub fn is_usable(&self) -> bool {
        self.tier != Tier::Defaulted
    }
}

/// Parameters for one generation call
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            temperature: 0.5,
            max_tokens: 800,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Fallback-chained wrapper over the generation engine
pub struct GenerationClient {
    engine: Arc<dyn LlmEngine>,
}

impl GenerationClient {
    pub fn new(engine: Arc<dyn LlmEngine>) -> Self {
        debug!("GenerationClient::new: called");
        Self { engine }
    }

    /// Generate a schema-conformant object, degrading through tiers
    ///
    /// Never returns an error: the worst outcome is a null-filled object
    /// tagged `Tier::Defaulted`, which callers must treat as "no result".
    pub async fn generate(&self, request: GenerationRequest, schema: &SchemaDescriptor) -> Generated {
        debug!(schema = %schema.name(), "GenerationClient::generate: called");

        // Tier 1: schema-constrained output
        let structured = EngineRequest::plain(request.system.clone(), request.prompt.clone())
            .with_schema(schema.name(), schema.json_schema().clone())
            .with_temperature(request.temperature)
            .with_max_tokens(request.max_tokens);

        match self.engine.invoke(structured).await {
            Ok(raw) => match coerce(&raw, Some(schema)) {
                Ok(value) => {
                    debug!(schema = %schema.name(), "generate: served by structured tier");
                    return Generated {
                        value,
                        tier: Tier::Structured,
                    };
                }
                Err(e) => {
                    warn!(schema = %schema.name(), error = %e, "generate: structured reply failed coercion");
                }
            },
            Err(e) => {
                warn!(schema = %schema.name(), error = %e, "generate: structured tier failed");
            }
        }

        // Tier 2: plain chat with an explicit JSON instruction
        let fallback_system = format!("{} Return ONLY valid JSON, no markdown formatting.", request.system);
        let fallback = EngineRequest::plain(fallback_system, request.prompt)
            .with_temperature(request.temperature)
            .with_max_tokens(request.max_tokens);

        match self.engine.invoke(fallback).await {
            Ok(raw) => match coerce(&raw, Some(schema)) {
                Ok(value) => {
                    debug!(schema = %schema.name(), "generate: served by text fallback tier");
                    return Generated {
                        value,
                        tier: Tier::TextFallback,
                    };
                }
                Err(e) => {
                    warn!(schema = %schema.name(), error = %e, "generate: fallback reply failed coercion");
                }
            },
            Err(e) => {
                warn!(schema = %schema.name(), error = %e, "generate: fallback tier failed");
            }
        }

        warn!(schema = %schema.name(), "generate: all tiers failed, returning null-filled default");
        Generated {
            value: schema.null_object(),
            tier: Tier::Defaulted,
        }
    }
}
