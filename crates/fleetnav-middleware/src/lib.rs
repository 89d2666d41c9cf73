//! `fleetnav-middleware` – message delivery between agents and the external
//! fleet services.
//!
//! Routes planner requests/responses, obstacle reports, spawn commands and
//! tracking snapshots without caring about their meaning.
//!
//! # Modules
//!
//! - [`bus`] – headless, typed, topic-based publish/subscribe event bus built
//!   on Tokio broadcast channels, drained once per simulation frame.

pub mod bus;

pub use bus::{EventBus, Topic, TopicReceiver};
