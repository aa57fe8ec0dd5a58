//! LlmEngine trait definition

use async_trait::async_trait;
use serde_json::Value;

use super::LlmError;

/// A single request to the text-generation engine
///
/// Every call is independent; no conversation state is maintained inside the
/// engine; whatever context a stage needs goes into the prompt itself.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    /// System instruction for this call
    pub system: String,

    /// User-facing prompt (rendered from a template)
    pub prompt: String,

    /// When present, the engine is asked for schema-conforming output
    pub schema: Option<ResponseSchema>,

    pub temperature: f32,

    pub max_tokens: u32,
}

/// Named JSON schema sent to the engine's structured-output mode
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: Value,
}

impl EngineRequest {
    /// Plain-text request without a schema constraint
    pub fn plain(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            schema: None,
            temperature: 0.5,
            max_tokens: 800,
        }
    }

    pub fn with_schema(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.schema = Some(ResponseSchema {
            name: name.into(),
            schema,
        });
        self
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

/// Stateless text-generation engine boundary
///
/// This is the only seam through which the core talks to the generator.
/// Implementations may fail on network, timeout, or formatting problems;
/// callers treat any error as a trigger for the next fallback tier.
#[async_trait]
pub trait LlmEngine: Send + Sync {
    /// Send one request and return the raw reply text
    async fn invoke(&self, request: EngineRequest) -> Result<String, LlmError>;
}
