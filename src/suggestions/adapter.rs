use super::models::{OracleInput, OracleOutput};
use super::SuggestionError;
use crate::error::AppResult;
use async_trait::async_trait;
use schemars::schema_for;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Instruction template sent to the oracle. `{name}` placeholders are filled once,
/// values are never re-scanned.
pub const PROMPT_TEMPLATE: &str = "You are a scheduling assistant for a personal calendar.

The user wants to add a new event and needs good time slots for it.

Existing events, as a JSON array of objects with title, start and end (ISO-8601, UTC):
{schedule}

New event duration in minutes: {event_duration}
New event description: {event_description}

Suggest up to three time slots for the new event.
Rules:
1. Every slot must be exactly {event_duration} minutes long.
2. A slot must not overlap any existing event.
3. Prefer reasonable waking hours and leave some room around existing events.
4. startTime and endTime must be ISO-8601 timestamps in UTC, e.g. 2024-01-01T10:00:00Z.
5. reason is one short sentence explaining why the slot fits.

Respond with a single JSON object that validates against this JSON Schema:
{output_schema}

Respond with the JSON object only, no explanations or other text.";

/// Preamble given to chat-style oracles
pub const SYSTEM_PREAMBLE: &str =
    "You find open time slots in calendars and always answer with strict JSON.";

/// A hosted language model treated as an opaque text completion service
#[async_trait]
pub trait SchedulingOracle: Send + Sync + 'static {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Complete a prompt, returning the raw model text
    async fn complete(&self, prompt: &str) -> AppResult<String>;
}

/// Builds the prompt, makes the single oracle call and validates its output
#[derive(Clone)]
pub struct OracleAdapter {
    oracle: Arc<dyn SchedulingOracle>,
}

impl OracleAdapter {
    pub fn new(oracle: Arc<dyn SchedulingOracle>) -> Self {
        Self { oracle }
    }

    /// Ask the oracle for time slots. No retry: any failure ends the call.
    pub async fn suggest_times(&self, input: &OracleInput) -> Result<OracleOutput, SuggestionError> {
        let prompt = render_prompt(input)?;
        info!(
            "Requesting time slots from {} for a {} minute event",
            self.oracle.name(),
            input.event_duration
        );
        debug!("Oracle prompt: {}", prompt);

        let raw = self.oracle.complete(&prompt).await.map_err(|e| {
            error!("Oracle {} call failed: {}", self.oracle.name(), e);
            SuggestionError::Oracle(e.to_string())
        })?;

        debug!("Oracle response: {}", raw);
        parse_oracle_output(&raw)
    }
}

/// JSON Schema of the expected oracle output
pub fn output_schema() -> Result<String, SuggestionError> {
    Ok(serde_json::to_string_pretty(&schema_for!(OracleOutput))?)
}

/// Fill the instruction template with the oracle input
pub fn render_prompt(input: &OracleInput) -> Result<String, SuggestionError> {
    let schema = output_schema()?;
    let duration = input.event_duration.to_string();
    Ok(fill_template(
        PROMPT_TEMPLATE,
        &[
            ("schedule", input.schedule.as_str()),
            ("event_duration", duration.as_str()),
            ("event_description", input.event_description.as_str()),
            ("output_schema", schema.as_str()),
        ],
    ))
}

fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let placeholder = values
            .iter()
            .find(|(key, _)| tail.starts_with(key) && tail[key.len()..].starts_with('}'));

        match placeholder {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Parse the oracle's text as `OracleOutput`. Anything that does not match the schema
/// is an error; only a surrounding markdown code fence is removed.
pub fn parse_oracle_output(raw: &str) -> Result<OracleOutput, SuggestionError> {
    let trimmed = raw.trim();
    let cleaned = if trimmed.starts_with("```") {
        trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```JSON")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
    } else {
        trimmed
    };

    serde_json::from_str::<OracleOutput>(cleaned).map_err(|e| {
        error!("Oracle output failed schema validation: {}", e);
        SuggestionError::Schema(e.to_string())
    })
}
