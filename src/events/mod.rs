pub mod models;
pub mod redis_store;
pub mod store;

pub use models::{CalendarEvent, EventDraft};
pub use redis_store::RedisEventStore;
pub use store::{EventStore, InMemoryEventStore};
