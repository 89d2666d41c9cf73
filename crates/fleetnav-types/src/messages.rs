//! Wire-level messages exchanged with the external fleet services.
//!
//! Field names follow the planner and fleet-manager message definitions
//! (`robot_id`, `start_x`, `path_x`, …) so that a transport adapter can
//! serialise them one-to-one.  Path arrays are kept as parallel `x`/`y`
//! vectors exactly as the services produce them; use
//! [`PathResponse::waypoints`] and [`SpawnCommand::destinations`] to obtain
//! validated point lists.

use serde::{Deserialize, Serialize};

use crate::geometry::Vec2;
use crate::{AgentId, AgentSubtype, FleetError, FleetResult, TaskState};

/// Request for a new path, keyed by the requesting agent's identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRequest {
    pub robot_id: AgentId,
    pub start_x: f32,
    pub start_y: f32,
    pub end_x: f32,
    pub end_y: f32,
}

impl PathRequest {
    pub fn new(robot_id: AgentId, start: Vec2, end: Vec2) -> Self {
        Self {
            robot_id,
            start_x: start.x,
            start_y: start.y,
            end_x: end.x,
            end_y: end.y,
        }
    }

    pub fn start(&self) -> Vec2 {
        Vec2::new(self.start_x, self.start_y)
    }

    pub fn end(&self) -> Vec2 {
        Vec2::new(self.end_x, self.end_y)
    }
}

/// Final answer of the planning service for one request.
///
/// Responses may be broadcast to every agent; receivers must discard those
/// whose `robot_id` is not their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResponse {
    pub robot_id: AgentId,
    pub success: bool,
    #[serde(default)]
    pub path_x: Vec<f32>,
    #[serde(default)]
    pub path_y: Vec<f32>,
}

impl PathResponse {
    /// Build a successful response from a list of waypoints.
    pub fn from_waypoints(robot_id: AgentId, waypoints: &[Vec2]) -> Self {
        Self {
            robot_id,
            success: true,
            path_x: waypoints.iter().map(|p| p.x).collect(),
            path_y: waypoints.iter().map(|p| p.y).collect(),
        }
    }

    /// Build a failed response carrying no path.
    pub fn failure(robot_id: AgentId) -> Self {
        Self {
            robot_id,
            success: false,
            path_x: Vec::new(),
            path_y: Vec::new(),
        }
    }

    /// Zip the parallel arrays into ordered waypoints.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::MalformedPath`] when the arrays differ in length.
    pub fn waypoints(&self) -> FleetResult<Vec<Vec2>> {
        zip_points(&self.path_x, &self.path_y).ok_or_else(|| FleetError::MalformedPath {
            agent: self.robot_id,
            reason: format!(
                "path_x has {} entries but path_y has {}",
                self.path_x.len(),
                self.path_y.len()
            ),
        })
    }
}

/// Advisory progress report from the planner.  Logged, never acted upon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathFeedback {
    pub robot_id: AgentId,
    pub percent_complete: f32,
}

/// Fire-and-forget obstacle report sent to the obstacle manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleReport {
    pub x: f32,
    pub y: f32,
    #[serde(rename = "type")]
    pub obstacle_tag: String,
}

/// Inbound command from the fleet manager that creates one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnCommand {
    pub robot_id: AgentId,
    #[serde(default = "default_robot_type")]
    pub robot_type: String,
    pub start_x: f32,
    pub start_y: f32,
    pub end_x: f32,
    pub end_y: f32,
    #[serde(default)]
    pub path_x: Vec<f32>,
    #[serde(default)]
    pub path_y: Vec<f32>,
    #[serde(rename = "loop", default)]
    pub loop_route: bool,
    pub move_speed: f32,
    pub perception_radius: f32,
    pub obstacle_distance_threshold: f32,
}

fn default_robot_type() -> String {
    "default".to_string()
}

impl SpawnCommand {
    pub fn start(&self) -> Vec2 {
        Vec2::new(self.start_x, self.start_y)
    }

    pub fn end(&self) -> Vec2 {
        Vec2::new(self.end_x, self.end_y)
    }

    /// Parse the behavior-policy tag.
    pub fn subtype(&self) -> FleetResult<AgentSubtype> {
        self.robot_type.parse()
    }

    /// The ordered destination list carried in `path_x` / `path_y`.
    pub fn destinations(&self) -> FleetResult<Vec<Vec2>> {
        zip_points(&self.path_x, &self.path_y).ok_or_else(|| FleetError::InvalidSpawn {
            agent: self.robot_id,
            reason: "destination arrays differ in length".to_string(),
        })
    }

    /// Check every numeric parameter and the subtype tag.
    pub fn validate(&self) -> FleetResult<()> {
        let invalid = |reason: &str| FleetError::InvalidSpawn {
            agent: self.robot_id,
            reason: reason.to_string(),
        };
        if !(self.move_speed.is_finite() && self.move_speed > 0.0) {
            return Err(invalid("move_speed must be positive"));
        }
        if !(self.perception_radius.is_finite() && self.perception_radius > 0.0) {
            return Err(invalid("perception_radius must be positive"));
        }
        if !(self.obstacle_distance_threshold.is_finite() && self.obstacle_distance_threshold >= 0.0)
        {
            return Err(invalid("obstacle_distance_threshold must be non-negative"));
        }
        if ![self.start_x, self.start_y, self.end_x, self.end_y]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(invalid("start and end coordinates must be finite"));
        }
        if !self.path_x.iter().chain(&self.path_y).all(|v| v.is_finite()) {
            return Err(invalid("destination coordinates must be finite"));
        }
        self.subtype()?;
        self.destinations()?;
        Ok(())
    }
}

/// Readiness announcement sent to the fleet manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeMessage {
    pub state: String,
}

impl SubscribeMessage {
    pub fn ready() -> Self {
        Self {
            state: "ready".to_string(),
        }
    }
}

/// Periodic full-state snapshot of one agent for fleet monitoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSnapshot {
    pub robot_id: AgentId,
    pub robot_type: AgentSubtype,
    pub position: Vec2,
    pub start: Vec2,
    pub end: Vec2,
    pub destinations: Vec<Vec2>,
    pub destination_index: usize,
    pub move_speed: f32,
    pub perception_radius: f32,
    pub obstacle_distance_threshold: f32,
    #[serde(rename = "loop")]
    pub loop_route: bool,
    pub obstacle_detected: bool,
    pub is_performing_task: bool,
    pub task_state: TaskState,
    pub remaining_waypoints: usize,
}

fn zip_points(xs: &[f32], ys: &[f32]) -> Option<Vec<Vec2>> {
    if xs.len() != ys.len() {
        return None;
    }
    Some(xs.iter().zip(ys).map(|(&x, &y)| Vec2::new(x, y)).collect())
}
