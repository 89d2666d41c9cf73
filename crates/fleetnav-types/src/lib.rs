//! `fleetnav-types` – shared vocabulary of the fleet navigation stack.
//!
//! Identities, behavior-policy tags, obstacle categories, the wire messages
//! exchanged with the planning and fleet-management services, the event
//! envelope routed over the middleware bus, and the crate-wide error type.

pub mod geometry;
pub mod messages;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use geometry::Vec2;
pub use messages::{
    ObstacleReport, PathFeedback, PathRequest, PathResponse, SpawnCommand, SubscribeMessage,
    TrackingSnapshot,
};

/// Stable identity of a simulated robot, assigned by the spawn service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub i32);

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a physical body in the scene (obstacle, debris, robot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodyId(pub u64);

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Behavior policy attached to an agent at spawn.  Never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentSubtype {
    #[default]
    Default,
    Cleaner,
    Security,
}

impl AgentSubtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentSubtype::Default => "default",
            AgentSubtype::Cleaner => "cleaner",
            AgentSubtype::Security => "security",
        }
    }
}

impl FromStr for AgentSubtype {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "" => Ok(AgentSubtype::Default),
            "cleaner" => Ok(AgentSubtype::Cleaner),
            "security" => Ok(AgentSubtype::Security),
            _ => Err(FleetError::UnknownSubtype(s.to_string())),
        }
    }
}

impl std::fmt::Display for AgentSubtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category tag carried by every scene body and reported with obstacles.
///
/// Serialises as the plain category string (`"DirtObstacle"`,
/// `"UnattendedObstacle"`, `"Robot"`, or any other tag verbatim).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObstacleTag {
    /// Removable debris a cleaner can dispose of.
    Debris,
    /// Unattended item a security robot must carry to the drop-off.
    Unattended,
    /// Another robot's body.
    Robot,
    /// Anything else; handled by the generic report-and-stop policy.
    Other(String),
}

impl ObstacleTag {
    pub fn as_str(&self) -> &str {
        match self {
            ObstacleTag::Debris => "DirtObstacle",
            ObstacleTag::Unattended => "UnattendedObstacle",
            ObstacleTag::Robot => "Robot",
            ObstacleTag::Other(tag) => tag,
        }
    }
}

impl From<String> for ObstacleTag {
    fn from(s: String) -> Self {
        match s.as_str() {
            "DirtObstacle" => ObstacleTag::Debris,
            "UnattendedObstacle" => ObstacleTag::Unattended,
            "Robot" => ObstacleTag::Robot,
            _ => ObstacleTag::Other(s),
        }
    }
}

impl From<&str> for ObstacleTag {
    fn from(s: &str) -> Self {
        ObstacleTag::from(s.to_string())
    }
}

impl From<ObstacleTag> for String {
    fn from(tag: ObstacleTag) -> Self {
        match tag {
            ObstacleTag::Other(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ObstacleTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single active control state of an agent in a given tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Empty path queue and nothing pending.
    Idle,
    /// Consuming a non-empty path queue.
    Following,
    /// A subtype routine owns the agent's behavior.
    PerformingTask,
    /// Waiting for the planner to answer.
    PendingRequest,
}

/// Unified event wrapper routed over the middleware bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. `"fleetnav-nav::agent/3"`
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Wrap `payload` in a fresh envelope stamped with the current time.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Payloads exchanged between agents and the external services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    PathRequest(PathRequest),
    PathResponse(PathResponse),
    PathFeedback(PathFeedback),
    ObstacleReport(ObstacleReport),
    Spawn(SpawnCommand),
    Subscribe(SubscribeMessage),
    Tracking(TrackingSnapshot),
}

/// Errors raised at the edges of the control loop: transport, spawn
/// validation, malformed planner output and configuration.
#[derive(Error, Debug)]
pub enum FleetError {
    #[error("Channel Error: {0}")]
    Channel(String),

    #[error("Invalid spawn command for agent {agent}: {reason}")]
    InvalidSpawn { agent: AgentId, reason: String },

    #[error("Agent {0} already exists")]
    DuplicateAgent(AgentId),

    #[error("Unknown agent subtype: {0:?}")]
    UnknownSubtype(String),

    #[error("Malformed path for agent {agent}: {reason}")]
    MalformedPath { agent: AgentId, reason: String },

    #[error("Configuration Error: {0}")]
    Config(String),
}

pub type FleetResult<T> = Result<T, FleetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtype_parses_case_insensitively() {
        assert_eq!("Cleaner".parse::<AgentSubtype>().unwrap(), AgentSubtype::Cleaner);
        assert_eq!(" security ".parse::<AgentSubtype>().unwrap(), AgentSubtype::Security);
        assert_eq!("default".parse::<AgentSubtype>().unwrap(), AgentSubtype::Default);
        assert!(matches!(
            "drone".parse::<AgentSubtype>(),
            Err(FleetError::UnknownSubtype(s)) if s == "drone"
        ));
    }

    #[test]
    fn obstacle_tag_roundtrips_through_category_string() {
        let json = serde_json::to_string(&ObstacleTag::Debris).unwrap();
        assert_eq!(json, "\"DirtObstacle\"");

        let back: ObstacleTag = serde_json::from_str("\"UnattendedObstacle\"").unwrap();
        assert_eq!(back, ObstacleTag::Unattended);

        let other: ObstacleTag = serde_json::from_str("\"Shelf\"").unwrap();
        assert_eq!(other, ObstacleTag::Other("Shelf".to_string()));
        assert_eq!(other.to_string(), "Shelf");
    }

    #[test]
    fn event_roundtrip() {
        let event = Event::new(
            "fleetnav-nav::agent/1",
            EventPayload::PathRequest(PathRequest::new(
                AgentId(1),
                Vec2::new(0.0, 0.0),
                Vec2::new(3.0, 3.0),
            )),
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event.id, back.id);
        match back.payload {
            EventPayload::PathRequest(req) => {
                assert_eq!(req.robot_id, AgentId(1));
                assert_eq!(req.end(), Vec2::new(3.0, 3.0));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn fleet_error_display() {
        let err = FleetError::DuplicateAgent(AgentId(4));
        assert!(err.to_string().contains('4'));

        let err = FleetError::MalformedPath {
            agent: AgentId(2),
            reason: "length mismatch".to_string(),
        };
        assert!(err.to_string().contains("length mismatch"));
    }
}
