use crate::events::models::{iso_instant, CalendarEvent};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Compact form of an existing event as the oracle sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScheduleEntry {
    pub title: String,
    /// ISO-8601 instant
    pub start: String,
    /// ISO-8601 instant
    pub end: String,
}

impl From<&CalendarEvent> for ScheduleEntry {
    fn from(event: &CalendarEvent) -> Self {
        Self {
            title: event.title.clone(),
            start: iso_instant(&event.start),
            end: iso_instant(&event.end),
        }
    }
}

/// Input handed to the oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OracleInput {
    /// JSON array of `ScheduleEntry`
    pub schedule: String,
    /// Desired length of the new event in minutes
    pub event_duration: i64,
    /// What the new event is about
    pub event_description: String,
}

/// One proposed placement for the new event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlotSuggestion {
    /// ISO-8601 instant
    pub start_time: String,
    /// ISO-8601 instant
    pub end_time: String,
    /// Why this slot fits
    pub reason: String,
}

/// Output the oracle must produce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OracleOutput {
    pub suggested_times: Vec<TimeSlotSuggestion>,
}

/// Something suspicious about a returned slot. Slots are reported, not dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SlotIssue {
    /// A start or end time is not a valid ISO-8601 instant
    #[serde(rename_all = "camelCase")]
    UnparseableInstant { index: usize, value: String },
    /// The slot ends at or before its start
    #[serde(rename_all = "camelCase")]
    EndNotAfterStart { index: usize },
    /// The slot length differs from the requested duration
    #[serde(rename_all = "camelCase")]
    DurationMismatch {
        index: usize,
        requested_minutes: i64,
        actual_seconds: i64,
    },
    /// The oracle returned more slots than it was asked for
    #[serde(rename_all = "camelCase")]
    ExtraSuggestion { index: usize },
    /// The slot overlaps an existing event
    #[serde(rename_all = "camelCase")]
    OverlapsEvent { index: usize, title: String },
}
