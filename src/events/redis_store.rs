use super::models::{CalendarEvent, EventDraft};
use super::store::{sort_events, EventStore};
use crate::error::{store_error, AppResult, Error};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client as RedisClient, Script};
use tracing::{info, warn};

/// Redis keys
mod keys {
    /// Hash of event id -> event JSON, one per user
    pub const EVENTS_PREFIX: &str = "calendar:events:";
}

fn events_key(user_id: &str) -> String {
    format!("{}{}", keys::EVENTS_PREFIX, user_id)
}

/// Replace a hash field only while it still exists, so an update racing a delete
/// cannot bring the event back. Returns 1 when written, 0 when the field is gone.
const REPLACE_EXISTING: &str = r"
if redis.call('HEXISTS', KEYS[1], ARGV[1]) == 1 then
    redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
    return 1
end
return 0
";

/// Redis-backed event store. Concurrent edits of the same event are last-writer-wins.
#[derive(Clone)]
pub struct RedisEventStore {
    conn: ConnectionManager,
    replace_existing: Script,
}

impl RedisEventStore {
    /// Connect to Redis at the given URL
    pub async fn connect(redis_url: &str) -> AppResult<Self> {
        info!("Connecting to Redis at {}", redis_url);

        let client = RedisClient::open(redis_url)
            .map_err(|e| store_error(&format!("Failed to create Redis client: {}", e)))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| store_error(&format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            conn,
            replace_existing: Script::new(REPLACE_EXISTING),
        })
    }
}

#[async_trait]
impl EventStore for RedisEventStore {
    async fn list_events(&self, user_id: &str) -> AppResult<Vec<CalendarEvent>> {
        let mut conn = self.conn.clone();
        let values: Vec<String> = conn.hvals(events_key(user_id)).await?;

        let mut events = Vec::with_capacity(values.len());
        for value in values {
            match serde_json::from_str::<CalendarEvent>(&value) {
                Ok(event) => events.push(event),
                Err(e) => warn!("Skipping unreadable event for {}: {}", user_id, e),
            }
        }
        sort_events(&mut events);
        Ok(events)
    }

    async fn get_event(&self, user_id: &str, event_id: &str) -> AppResult<Option<CalendarEvent>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.hget(events_key(user_id), event_id).await?;

        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn create_event(&self, user_id: &str, draft: EventDraft) -> AppResult<CalendarEvent> {
        let event = CalendarEvent::from_draft(user_id, draft)?;
        let json = serde_json::to_string(&event)?;

        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(events_key(user_id), &event.id, json)
            .await?;

        info!("Created event {} for {}", event.id, user_id);
        Ok(event)
    }

    async fn update_event(
        &self,
        user_id: &str,
        event_id: &str,
        draft: EventDraft,
    ) -> AppResult<CalendarEvent> {
        let mut event = self
            .get_event(user_id, event_id)
            .await?
            .ok_or_else(|| Error::NotFound(event_id.to_string()))?;
        event.apply(draft)?;
        let json = serde_json::to_string(&event)?;

        let mut conn = self.conn.clone();
        let written: i64 = self
            .replace_existing
            .key(events_key(user_id))
            .arg(event_id)
            .arg(json)
            .invoke_async(&mut conn)
            .await?;

        if written == 0 {
            return Err(Error::NotFound(event_id.to_string()));
        }
        info!("Updated event {} for {}", event.id, user_id);
        Ok(event)
    }

    async fn delete_event(&self, user_id: &str, event_id: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.hdel(events_key(user_id), event_id).await?;

        if removed == 0 {
            return Err(Error::NotFound(event_id.to_string()));
        }
        info!("Deleted event {} for {}", event_id, user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn keys_are_per_user() {
        assert_eq!(events_key("alice"), "calendar:events:alice");
        assert_ne!(events_key("alice"), events_key("bob"));
    }

    fn draft(title: &str) -> EventDraft {
        EventDraft {
            title: title.to_string(),
            start: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
            description: None,
        }
    }

    /// Runs only when TEST_REDIS_URL points at a scratch Redis instance
    #[tokio::test]
    async fn update_after_delete_does_not_resurrect() {
        let Ok(url) = std::env::var("TEST_REDIS_URL") else {
            return;
        };
        let store = RedisEventStore::connect(&url).await.unwrap();
        let user = format!("test-{}", uuid::Uuid::new_v4());

        let event = store.create_event(&user, draft("Standup")).await.unwrap();
        let updated = store
            .update_event(&user, &event.id, draft("Standup (moved)"))
            .await
            .unwrap();
        assert_eq!(updated.title, "Standup (moved)");

        // Field removed after the read, as a concurrent delete would
        let mut conn = store.conn.clone();
        conn.hdel::<_, _, ()>(events_key(&user), &event.id).await.unwrap();
        let written: i64 = store
            .replace_existing
            .key(events_key(&user))
            .arg(&event.id)
            .arg("{}")
            .invoke_async(&mut conn)
            .await
            .unwrap();
        assert_eq!(written, 0);
        assert!(store.get_event(&user, &event.id).await.unwrap().is_none());

        assert!(matches!(
            store.update_event(&user, &event.id, draft("Again")).await,
            Err(Error::NotFound(_))
        ));
    }
}
