//! Generation engine boundary for tripcraft
//!
//! Provides the `LlmEngine` trait, the Gradient chat-completions
//! implementation, and the two-tier `GenerationClient` every stage calls.

pub mod client;
mod error;
mod generate;
mod gradient;

pub use client::{EngineRequest, LlmEngine, ResponseSchema};
pub use error::LlmError;
pub use generate::{Generated, GenerationClient, GenerationRequest, Tier};
pub use gradient::GradientClient;
