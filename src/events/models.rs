use crate::error::{validation_error, AppResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rust_i18n::t;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single event on a user's calendar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    /// Stable unique identifier
    pub id: String,
    /// Event title, never empty
    pub title: String,
    /// Start instant
    pub start: DateTime<Utc>,
    /// End instant, strictly after `start`
    pub end: DateTime<Utc>,
    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Owning user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl CalendarEvent {
    /// Create a new event from a validated draft
    pub fn from_draft(user_id: &str, draft: EventDraft) -> AppResult<Self> {
        draft.validate()?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            title: draft.title.trim().to_string(),
            start: draft.start,
            end: draft.end,
            description: normalize_description(draft.description),
            user_id: Some(user_id.to_string()),
        })
    }

    /// Apply an edit, keeping the identifier and owner
    pub fn apply(&mut self, draft: EventDraft) -> AppResult<()> {
        draft.validate()?;
        self.title = draft.title.trim().to_string();
        self.start = draft.start;
        self.end = draft.end;
        self.description = normalize_description(draft.description);
        Ok(())
    }

    /// Whether the event overlaps the half-open interval `[from, to)`
    pub fn overlaps(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.start < to && self.end > from
    }

    /// Length of the event in whole minutes
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// User input for creating or editing an event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
}

impl EventDraft {
    /// Check the draft before it is saved
    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(validation_error(&t!("validation_title_required")));
        }
        if self.end <= self.start {
            return Err(validation_error(&t!("validation_end_after_start")));
        }
        Ok(())
    }
}

/// Format an instant the way it is exchanged with clients and the oracle
pub fn iso_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}
