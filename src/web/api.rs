use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_i18n::t;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use super::AppState;
use crate::auth::JwtAuth;
use crate::calendar::{build_page, visible_range, CalendarPage, CalendarView};
use crate::error::{AppResult, Error};
use crate::events::{CalendarEvent, EventDraft};
use crate::suggestions::requestor::FailureKind;
use crate::suggestions::SuggestionOutcome;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::Validation(message) => (StatusCode::UNPROCESSABLE_ENTITY, message.clone()),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, t!("event_not_found").to_string()),
            other => {
                error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Malformed request bodies and query strings are reported as validation errors
fn rejected(reason: String) -> Error {
    Error::Validation(t!("invalid_request_body", reason = reason).to_string())
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        rejected(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        rejected(rejection.body_text())
    }
}

/// Optional `[from, to)` filter for event listings
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl RangeQuery {
    fn contains(&self, event: &CalendarEvent) -> bool {
        self.from.map_or(true, |from| event.end > from) && self.to.map_or(true, |to| event.start < to)
    }
}

/// List the signed-in user's events
pub async fn list_events_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<JwtAuth>,
    range: Result<Query<RangeQuery>, QueryRejection>,
) -> AppResult<Json<Vec<CalendarEvent>>> {
    let Query(range) = range?;
    let events = state.store.list_events(auth.user_id()).await?;
    Ok(Json(
        events.into_iter().filter(|event| range.contains(event)).collect(),
    ))
}

/// Create an event
pub async fn create_event_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<JwtAuth>,
    draft: Result<Json<EventDraft>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CalendarEvent>)> {
    let Json(draft) = draft?;
    let event = state.store.create_event(auth.user_id(), draft).await?;
    info!("User {} created event {}", auth.user_id(), event.id);
    Ok((StatusCode::CREATED, Json(event)))
}

/// Get one event
pub async fn get_event_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<JwtAuth>,
    Path(id): Path<String>,
) -> AppResult<Json<CalendarEvent>> {
    state
        .store
        .get_event(auth.user_id(), &id)
        .await?
        .map(Json)
        .ok_or(Error::NotFound(id))
}

/// Replace an event's fields
pub async fn update_event_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<JwtAuth>,
    Path(id): Path<String>,
    draft: Result<Json<EventDraft>, JsonRejection>,
) -> AppResult<Json<CalendarEvent>> {
    let Json(draft) = draft?;
    let event = state.store.update_event(auth.user_id(), &id, draft).await?;
    info!("User {} updated event {}", auth.user_id(), event.id);
    Ok(Json(event))
}

/// Delete an event
pub async fn delete_event_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<JwtAuth>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.store.delete_event(auth.user_id(), &id).await?;
    info!("User {} deleted event {}", auth.user_id(), id);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    pub view: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Month, week or day layout of the user's events
pub async fn calendar_view_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<JwtAuth>,
    query: Result<Query<CalendarQuery>, QueryRejection>,
) -> AppResult<Json<CalendarPage>> {
    let Query(query) = query?;
    let settings = &state.config.calendar;
    let tz = state.config.timezone;

    let view = match query.view.as_deref() {
        Some(name) => name.parse::<CalendarView>()?,
        None => settings.default_view,
    };
    let today = Utc::now().with_timezone(&tz).date_naive();
    let anchor = query.date.unwrap_or(today);

    let (from, to) = visible_range(view, anchor, settings.week_starts_on)?.to_utc(&tz);
    let events: Vec<CalendarEvent> = state
        .store
        .list_events(auth.user_id())
        .await?
        .into_iter()
        .filter(|event| event.overlaps(from, to))
        .collect();

    let page = build_page(view, anchor, settings.week_starts_on, &tz, today, &events)?;
    Ok(Json(page))
}

/// Body of a suggestion request, as sent by the event form
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionQuery {
    #[serde(default)]
    pub event_description: String,
    /// Duration in minutes, derived from `start`/`end` when absent
    pub event_duration: Option<i64>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl SuggestionQuery {
    /// Requested duration in minutes, if the form provided enough to tell
    pub fn duration_minutes(&self) -> Option<i64> {
        self.event_duration.or_else(|| match (self.start, self.end) {
            (Some(start), Some(end)) => Some((end - start).num_minutes()),
            _ => None,
        })
    }
}

/// Ask the oracle for open slots that fit the user's schedule
pub async fn suggestions_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<JwtAuth>,
    query: Result<Json<SuggestionQuery>, JsonRejection>,
) -> AppResult<Response> {
    let query = match query {
        Ok(Json(query)) => query,
        Err(rejection) => {
            let outcome = SuggestionOutcome::invalid(t!(
                "invalid_request_body",
                reason = rejection.body_text()
            ));
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(outcome)).into_response());
        }
    };
    let description = query.event_description.trim();

    let outcome = if description.is_empty() {
        SuggestionOutcome::invalid(t!("validation_description_required"))
    } else if let Some(duration) = query.duration_minutes() {
        let events = state.store.list_events(auth.user_id()).await?;
        state.requestor.suggest(&events, duration, description).await
    } else {
        SuggestionOutcome::invalid(t!("validation_duration_positive"))
    };

    let status = match &outcome {
        SuggestionOutcome::Suggestions { .. } => StatusCode::OK,
        SuggestionOutcome::Failed {
            kind: FailureKind::Validation,
            ..
        } => StatusCode::UNPROCESSABLE_ENTITY,
        SuggestionOutcome::Failed {
            kind: FailureKind::Oracle,
            ..
        } => StatusCode::BAD_GATEWAY,
    };

    Ok((status, Json(outcome)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn duration_prefers_explicit_value() {
        let query = SuggestionQuery {
            event_description: "Sync".to_string(),
            event_duration: Some(30),
            start: Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()),
            end: Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()),
        };
        assert_eq!(query.duration_minutes(), Some(30));
    }

    #[test]
    fn duration_from_form_times() {
        let query = SuggestionQuery {
            start: Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()),
            end: Some(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()),
            ..Default::default()
        };
        assert_eq!(query.duration_minutes(), Some(-60));
        assert_eq!(SuggestionQuery::default().duration_minutes(), None);
    }

    #[test]
    fn range_filter_is_half_open() {
        let event = CalendarEvent {
            id: "1".to_string(),
            title: "Standup".to_string(),
            start: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 1, 9, 15, 0).unwrap(),
            description: None,
            user_id: None,
        };
        let before = RangeQuery {
            from: None,
            to: Some(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()),
        };
        let after = RangeQuery {
            from: Some(Utc.with_ymd_and_hms(2024, 1, 1, 9, 15, 0).unwrap()),
            to: None,
        };
        assert!(!before.contains(&event));
        assert!(!after.contains(&event));
        assert!(RangeQuery::default().contains(&event));
    }
}
