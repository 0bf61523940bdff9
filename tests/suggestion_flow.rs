use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use kalenteri::error::{oracle_error, AppResult};
use kalenteri::events::CalendarEvent;
use kalenteri::suggestions::{
    SchedulingOracle, SlotIssue, SuggestionOutcome, SuggestionRequestor, MAX_SUGGESTIONS,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Oracle that replies with a fixed payload and records every prompt
struct FixedOracle {
    reply: String,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FixedOracle {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchedulingOracle for FixedOracle {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn complete(&self, prompt: &str) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Oracle whose transport always fails
struct FailingOracle {
    calls: AtomicUsize,
}

#[async_trait]
impl SchedulingOracle for FailingOracle {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn complete(&self, _prompt: &str) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(oracle_error("connection reset"))
    }
}

fn team_meeting() -> CalendarEvent {
    CalendarEvent {
        id: "evt-1".to_string(),
        title: "Team Meeting".to_string(),
        start: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap(),
        description: None,
        user_id: Some("admin".to_string()),
    }
}

const ONE_SLOT: &str = r#"{"suggestedTimes":[{"startTime":"2024-01-01T14:00:00Z","endTime":"2024-01-01T15:00:00Z","reason":"Free afternoon"}]}"#;

#[tokio::test]
async fn non_positive_duration_never_reaches_the_oracle() {
    let oracle = FixedOracle::new(ONE_SLOT);
    let requestor = SuggestionRequestor::new(oracle.clone());

    for duration in [0, -30] {
        let outcome = requestor.suggest(&[team_meeting()], duration, "Lunch").await;
        match outcome {
            SuggestionOutcome::Failed { error, .. } => assert!(!error.is_empty()),
            other => panic!("expected a validation failure, got {:?}", other),
        }
    }

    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn valid_payload_passes_through_unmodified() {
    let oracle = FixedOracle::new(ONE_SLOT);
    let requestor = SuggestionRequestor::new(oracle.clone());

    let outcome = requestor
        .suggest(&[team_meeting()], 60, "Planning session")
        .await;

    match outcome {
        SuggestionOutcome::Suggestions {
            suggestions,
            issues,
            notice,
        } => {
            assert_eq!(suggestions.len(), 1);
            assert_eq!(suggestions[0].start_time, "2024-01-01T14:00:00Z");
            assert_eq!(suggestions[0].end_time, "2024-01-01T15:00:00Z");
            assert_eq!(suggestions[0].reason, "Free afternoon");
            assert!(issues.is_empty());
            assert!(notice.is_none());
        }
        other => panic!("expected suggestions, got {:?}", other),
    }

    assert_eq!(oracle.calls(), 1);
    let prompts = oracle.prompts.lock().unwrap();
    assert!(prompts[0].contains("Team Meeting"));
    assert!(prompts[0].contains("2024-01-01T10:00:00Z"));
    assert!(prompts[0].contains("Planning session"));
}

#[tokio::test]
async fn transport_failure_becomes_error_outcome() {
    let oracle = Arc::new(FailingOracle {
        calls: AtomicUsize::new(0),
    });
    let requestor = SuggestionRequestor::new(oracle.clone());

    let outcome = requestor.suggest(&[], 30, "Call").await;

    assert!(!outcome.is_success());
    let json = serde_json::to_value(&outcome).unwrap();
    assert!(!json["error"].as_str().unwrap().is_empty());
    assert!(json.get("suggestions").is_none());
    // Exactly one attempt, no retry
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unparseable_reply_becomes_error_outcome() {
    let oracle = FixedOracle::new("Sure! How about Tuesday at noon?");
    let requestor = SuggestionRequestor::new(oracle.clone());

    let outcome = requestor.suggest(&[], 30, "Call").await;

    assert!(matches!(outcome, SuggestionOutcome::Failed { .. }));
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn extra_suggestions_pass_through_flagged() {
    let slots: Vec<String> = (9..13)
        .map(|hour| {
            format!(
                r#"{{"startTime":"2024-01-02T{:02}:00:00Z","endTime":"2024-01-02T{:02}:30:00Z","reason":"Open"}}"#,
                hour, hour
            )
        })
        .collect();
    let reply = format!(r#"{{"suggestedTimes":[{}]}}"#, slots.join(","));
    let requestor = SuggestionRequestor::new(FixedOracle::new(&reply));

    match requestor.suggest(&[], 30, "Sync").await {
        SuggestionOutcome::Suggestions {
            suggestions,
            issues,
            ..
        } => {
            assert_eq!(suggestions.len(), 4);
            assert_eq!(suggestions[3].start_time, "2024-01-02T12:00:00Z");
            assert_eq!(
                issues,
                vec![SlotIssue::ExtraSuggestion {
                    index: MAX_SUGGESTIONS
                }]
            );
        }
        other => panic!("expected suggestions, got {:?}", other),
    }
}

#[tokio::test]
async fn empty_reply_carries_a_notice() {
    let requestor = SuggestionRequestor::new(FixedOracle::new(r#"{"suggestedTimes":[]}"#));

    match requestor.suggest(&[team_meeting()], 45, "Review").await {
        SuggestionOutcome::Suggestions {
            suggestions,
            notice,
            ..
        } => {
            assert!(suggestions.is_empty());
            assert!(notice.is_some());
        }
        other => panic!("expected empty suggestions, got {:?}", other),
    }
}

#[tokio::test]
async fn conflicting_slot_is_flagged_not_dropped() {
    let reply = r#"{"suggestedTimes":[{"startTime":"2024-01-01T10:30:00Z","endTime":"2024-01-01T11:30:00Z","reason":"Right after lunch"}]}"#;
    let requestor = SuggestionRequestor::new(FixedOracle::new(reply));

    match requestor.suggest(&[team_meeting()], 60, "Design review").await {
        SuggestionOutcome::Suggestions {
            suggestions,
            issues,
            ..
        } => {
            assert_eq!(suggestions.len(), 1);
            assert!(issues.iter().any(|issue| matches!(
                issue,
                SlotIssue::OverlapsEvent { index: 0, title } if title == "Team Meeting"
            )));
        }
        other => panic!("expected suggestions, got {:?}", other),
    }
}
