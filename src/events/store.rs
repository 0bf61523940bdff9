use super::models::{CalendarEvent, EventDraft};
use crate::error::{AppResult, Error};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Storage for calendar events, partitioned by owning user
#[async_trait]
pub trait EventStore: Send + Sync + 'static {
    /// List all events of a user, sorted by start
    async fn list_events(&self, user_id: &str) -> AppResult<Vec<CalendarEvent>>;

    /// Get a single event of a user
    async fn get_event(&self, user_id: &str, event_id: &str) -> AppResult<Option<CalendarEvent>>;

    /// Validate and store a new event
    async fn create_event(&self, user_id: &str, draft: EventDraft) -> AppResult<CalendarEvent>;

    /// Validate and apply an edit to an existing event
    async fn update_event(
        &self,
        user_id: &str,
        event_id: &str,
        draft: EventDraft,
    ) -> AppResult<CalendarEvent>;

    /// Remove an event
    async fn delete_event(&self, user_id: &str, event_id: &str) -> AppResult<()>;
}

/// Sort events the way every listing returns them
pub fn sort_events(events: &mut [CalendarEvent]) {
    events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.end.cmp(&b.end)));
}

/// In-memory implementation of the event store
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<HashMap<String, HashMap<String, CalendarEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn list_events(&self, user_id: &str) -> AppResult<Vec<CalendarEvent>> {
        let events = self.events.read().await;
        let mut listed: Vec<CalendarEvent> = events
            .get(user_id)
            .map(|by_id| by_id.values().cloned().collect())
            .unwrap_or_default();
        sort_events(&mut listed);
        Ok(listed)
    }

    async fn get_event(&self, user_id: &str, event_id: &str) -> AppResult<Option<CalendarEvent>> {
        let events = self.events.read().await;
        Ok(events
            .get(user_id)
            .and_then(|by_id| by_id.get(event_id))
            .cloned())
    }

    async fn create_event(&self, user_id: &str, draft: EventDraft) -> AppResult<CalendarEvent> {
        let event = CalendarEvent::from_draft(user_id, draft)?;
        let mut events = self.events.write().await;
        events
            .entry(user_id.to_string())
            .or_default()
            .insert(event.id.clone(), event.clone());
        Ok(event)
    }

    async fn update_event(
        &self,
        user_id: &str,
        event_id: &str,
        draft: EventDraft,
    ) -> AppResult<CalendarEvent> {
        let mut events = self.events.write().await;
        let event = events
            .get_mut(user_id)
            .and_then(|by_id| by_id.get_mut(event_id))
            .ok_or_else(|| Error::NotFound(event_id.to_string()))?;
        event.apply(draft)?;
        Ok(event.clone())
    }

    async fn delete_event(&self, user_id: &str, event_id: &str) -> AppResult<()> {
        let mut events = self.events.write().await;
        events
            .get_mut(user_id)
            .and_then(|by_id| by_id.remove(event_id))
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(event_id.to_string()))
    }
}
