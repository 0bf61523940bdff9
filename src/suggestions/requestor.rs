use super::adapter::{OracleAdapter, SchedulingOracle};
use super::models::{OracleInput, ScheduleEntry, SlotIssue, TimeSlotSuggestion};
use super::SuggestionError;
use crate::events::CalendarEvent;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use rust_i18n::t;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Number of slots the oracle is asked for. Extra slots are flagged, not dropped.
pub const MAX_SUGGESTIONS: usize = 3;

/// Why a suggestion call produced no suggestions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Input was rejected, the oracle was not called
    Validation,
    /// The oracle call or its output failed
    Oracle,
}

/// Result of one suggestion call: suggestions or an error, never both
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SuggestionOutcome {
    Suggestions {
        suggestions: Vec<TimeSlotSuggestion>,
        issues: Vec<SlotIssue>,
        #[serde(skip_serializing_if = "Option::is_none")]
        notice: Option<String>,
    },
    Failed {
        error: String,
        #[serde(skip_serializing)]
        kind: FailureKind,
    },
}

impl SuggestionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SuggestionOutcome::Suggestions { .. })
    }

    /// Validation failure with a user-facing message
    pub fn invalid(message: impl Into<String>) -> Self {
        SuggestionOutcome::Failed {
            error: message.into(),
            kind: FailureKind::Validation,
        }
    }
}

/// Gathers the schedule, calls the oracle once and recovers every failure
#[derive(Clone)]
pub struct SuggestionRequestor {
    adapter: OracleAdapter,
}

impl SuggestionRequestor {
    pub fn new(oracle: Arc<dyn SchedulingOracle>) -> Self {
        Self {
            adapter: OracleAdapter::new(oracle),
        }
    }

    /// Suggest up to three slots of `duration_minutes` for a new event
    pub async fn suggest(
        &self,
        events: &[CalendarEvent],
        duration_minutes: i64,
        description: &str,
    ) -> SuggestionOutcome {
        match self.try_suggest(events, duration_minutes, description).await {
            Ok((suggestions, issues)) => {
                info!(
                    "Oracle returned {} suggestion(s) with {} issue(s)",
                    suggestions.len(),
                    issues.len()
                );
                let notice = suggestions
                    .is_empty()
                    .then(|| t!("suggestions_empty").to_string());
                SuggestionOutcome::Suggestions {
                    suggestions,
                    issues,
                    notice,
                }
            }
            Err(SuggestionError::Validation(message)) => SuggestionOutcome::invalid(message),
            Err(e) => {
                error!("Failed to get suggestions: {}", e);
                SuggestionOutcome::Failed {
                    error: t!("suggestions_failed").to_string(),
                    kind: FailureKind::Oracle,
                }
            }
        }
    }

    async fn try_suggest(
        &self,
        events: &[CalendarEvent],
        duration_minutes: i64,
        description: &str,
    ) -> Result<(Vec<TimeSlotSuggestion>, Vec<SlotIssue>), SuggestionError> {
        if duration_minutes <= 0 {
            return Err(SuggestionError::Validation(
                t!("validation_duration_positive").to_string(),
            ));
        }

        let input = build_request(events, duration_minutes, description)?;
        let output = self.adapter.suggest_times(&input).await?;

        if output.suggested_times.len() > MAX_SUGGESTIONS {
            warn!(
                "Oracle returned {} suggestions, more than the {} asked for",
                output.suggested_times.len(),
                MAX_SUGGESTIONS
            );
        }

        let issues = check_slots(&output.suggested_times, duration_minutes, events);
        for issue in &issues {
            warn!("Suggested slot flagged: {:?}", issue);
        }

        Ok((output.suggested_times, issues))
    }
}

/// Serialize the schedule snapshot and build the oracle input
pub fn build_request(
    events: &[CalendarEvent],
    duration_minutes: i64,
    description: &str,
) -> Result<OracleInput, SuggestionError> {
    let entries: Vec<ScheduleEntry> = events.iter().map(ScheduleEntry::from).collect();
    Ok(OracleInput {
        schedule: serde_json::to_string(&entries)?,
        event_duration: duration_minutes,
        event_description: description.to_string(),
    })
}

/// Parse an ISO-8601 instant; values without an offset are taken as UTC
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Check returned slots against the request without altering them
pub fn check_slots(
    slots: &[TimeSlotSuggestion],
    requested_minutes: i64,
    events: &[CalendarEvent],
) -> Vec<SlotIssue> {
    let mut issues = Vec::new();

    for (index, slot) in slots.iter().enumerate() {
        if index >= MAX_SUGGESTIONS {
            issues.push(SlotIssue::ExtraSuggestion { index });
        }

        let start = parse_instant(&slot.start_time);
        let end = parse_instant(&slot.end_time);

        if start.is_none() {
            issues.push(SlotIssue::UnparseableInstant {
                index,
                value: slot.start_time.clone(),
            });
        }
        if end.is_none() {
            issues.push(SlotIssue::UnparseableInstant {
                index,
                value: slot.end_time.clone(),
            });
        }
        let (Some(start), Some(end)) = (start, end) else {
            continue;
        };

        if end <= start {
            issues.push(SlotIssue::EndNotAfterStart { index });
            continue;
        }

        let actual = end - start;
        if Duration::try_minutes(requested_minutes) != Some(actual) {
            issues.push(SlotIssue::DurationMismatch {
                index,
                requested_minutes,
                actual_seconds: actual.num_seconds(),
            });
        }

        for event in events.iter().filter(|event| event.overlaps(start, end)) {
            issues.push(SlotIssue::OverlapsEvent {
                index,
                title: event.title.clone(),
            });
        }
    }

    issues
}
