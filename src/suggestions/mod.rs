//! AI-assisted time slot suggestions.
//!
//! The [`requestor::SuggestionRequestor`] turns the user's events into an
//! [`models::OracleInput`], the [`adapter::OracleAdapter`] wraps it in the instruction
//! template, makes exactly one oracle call and parses the reply into
//! [`models::OracleOutput`].

pub mod adapter;
pub mod gemini;
pub mod models;
pub mod requestor;

use thiserror::Error;

pub use adapter::{OracleAdapter, SchedulingOracle};
pub use gemini::{DisabledOracle, GeminiOracle};
pub use models::{OracleInput, OracleOutput, SlotIssue, TimeSlotSuggestion};
pub use requestor::{SuggestionOutcome, SuggestionRequestor, MAX_SUGGESTIONS};

/// Failures of a single suggestion call
#[derive(Debug, Error)]
pub enum SuggestionError {
    /// Input rejected before any oracle call
    #[error("{0}")]
    Validation(String),

    #[error("Failed to serialize suggestion request: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Oracle call failed: {0}")]
    Oracle(String),

    /// Oracle output did not match the output schema
    #[error("Oracle output failed schema validation: {0}")]
    Schema(String),
}
