//! Headless stand-in for the path planning service.
//!
//! [`SimPathPlanner`] listens on `path_planner/request`, waits a configurable
//! simulated latency, and answers with a straight line from start to end,
//! broken into waypoints no more than `waypoint_spacing` apart.  Progress
//! feedback is published at 50 % and 100 %.  Requests whose end lies outside
//! the optional `bounds` are answered with `success = false`.
//!
//! It does no obstacle-aware planning.  It exists so the `fleetnav` binary
//! and integration tests run without the real planner.

use fleetnav_middleware::{EventBus, Topic, TopicReceiver};
use fleetnav_types::{
    Event, EventPayload, FleetError, FleetResult, PathFeedback, PathRequest, PathResponse, Vec2,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const SOURCE: &str = "fleetnav-runtime::sim_planner";

/// Smallest accepted `waypoint_spacing`.
pub const MIN_WAYPOINT_SPACING: f32 = 0.01;

/// Upper bound on the points of one plan, whatever the distance.
pub const MAX_WAYPOINTS: usize = 10_000;

/// Axis-aligned rectangle of reachable targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// The `[planner]` table of the fleet configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimPlannerConfig {
    /// Simulated seconds between receiving a request and answering it.
    #[serde(default = "default_latency")]
    pub latency_secs: f32,

    #[serde(default = "default_spacing")]
    pub waypoint_spacing: f32,

    #[serde(default)]
    pub bounds: Option<Bounds>,
}

fn default_latency() -> f32 {
    0.2
}
fn default_spacing() -> f32 {
    1.0
}

impl Default for SimPlannerConfig {
    fn default() -> Self {
        Self {
            latency_secs: default_latency(),
            waypoint_spacing: default_spacing(),
            bounds: None,
        }
    }
}

impl SimPlannerConfig {
    /// # Errors
    ///
    /// Returns [`FleetError::Config`] naming the first offending key.
    pub fn validate(&self) -> FleetResult<()> {
        if !(self.latency_secs.is_finite() && self.latency_secs >= 0.0) {
            return Err(FleetError::Config(format!(
                "planner.latency_secs must not be negative, got {}",
                self.latency_secs
            )));
        }
        if !(self.waypoint_spacing.is_finite() && self.waypoint_spacing >= MIN_WAYPOINT_SPACING) {
            return Err(FleetError::Config(format!(
                "planner.waypoint_spacing must be at least {MIN_WAYPOINT_SPACING}, got {}",
                self.waypoint_spacing
            )));
        }
        if let Some(bounds) = self.bounds {
            let finite = [bounds.min.x, bounds.min.y, bounds.max.x, bounds.max.y]
                .iter()
                .all(|v| v.is_finite());
            if !finite || bounds.min.x > bounds.max.x || bounds.min.y > bounds.max.y {
                return Err(FleetError::Config(
                    "planner.bounds must be finite with min <= max".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Job {
    request: PathRequest,
    elapsed: f32,
    half_reported: bool,
}

pub struct SimPathPlanner {
    config: SimPlannerConfig,
    bus: EventBus,
    requests: TopicReceiver,
    jobs: Vec<Job>,
    answered: usize,
}

impl SimPathPlanner {
    /// Subscribe to the request topic of `bus`.
    pub fn new(bus: EventBus, config: SimPlannerConfig) -> Self {
        let requests = bus.subscribe_to(Topic::PathRequests);
        Self {
            config,
            bus,
            requests,
            jobs: Vec::new(),
            answered: 0,
        }
    }

    /// Requests accepted but not yet answered.
    pub fn in_flight(&self) -> usize {
        self.jobs.len()
    }

    /// Total responses published so far.
    pub fn answered(&self) -> usize {
        self.answered
    }

    /// Pick up new requests and answer those whose latency has elapsed.
    pub fn step(&mut self, dt: f32) {
        for event in self.requests.drain() {
            if let EventPayload::PathRequest(request) = event.payload {
                debug!(agent = %request.robot_id, end = %request.end(), "planner accepted request");
                self.jobs.push(Job {
                    request,
                    elapsed: 0.0,
                    half_reported: false,
                });
            }
        }

        let latency = self.config.latency_secs.max(0.0);
        let mut pending = Vec::with_capacity(self.jobs.len());
        for mut job in std::mem::take(&mut self.jobs) {
            job.elapsed += dt;
            if !job.half_reported && job.elapsed >= latency * 0.5 {
                job.half_reported = true;
                self.feedback(&job.request, 50.0);
            }
            if job.elapsed >= latency {
                self.feedback(&job.request, 100.0);
                let response = self.plan(&job.request);
                info!(
                    agent = %response.robot_id,
                    success = response.success,
                    points = response.path_x.len(),
                    "planner answered"
                );
                self.publish(Topic::PathResponses, EventPayload::PathResponse(response));
                self.answered += 1;
            } else {
                pending.push(job);
            }
        }
        self.jobs = pending;
    }

    /// Straight-line plan for `request`.
    pub fn plan(&self, request: &PathRequest) -> PathResponse {
        let end = request.end();
        if let Some(bounds) = self.config.bounds {
            if !bounds.contains(end) {
                return PathResponse::failure(request.robot_id);
            }
        }
        let waypoints = straight_line(request.start(), end, self.config.waypoint_spacing);
        PathResponse::from_waypoints(request.robot_id, &waypoints)
    }

    fn feedback(&self, request: &PathRequest, percent_complete: f32) {
        self.publish(
            Topic::PathFeedback,
            EventPayload::PathFeedback(PathFeedback {
                robot_id: request.robot_id,
                percent_complete,
            }),
        );
    }

    fn publish(&self, topic: Topic, payload: EventPayload) {
        if let Err(err) = self.bus.publish_to(topic, Event::new(SOURCE, payload)) {
            debug!(%topic, error = %err, "planner output dropped");
        }
    }
}

/// Evenly spaced points from `start` (exclusive) to `end` (inclusive).
///
/// Long legs are capped at [`MAX_WAYPOINTS`] points, spaced wider than
/// `spacing` if needed.
fn straight_line(start: Vec2, end: Vec2, spacing: f32) -> Vec<Vec2> {
    let distance = start.distance(end);
    let steps = if spacing > 0.0 && distance.is_finite() {
        ((distance / spacing).ceil() as usize).clamp(1, MAX_WAYPOINTS)
    } else {
        1
    };
    (1..=steps)
        .map(|i| {
            if i == steps {
                end
            } else {
                start + (end - start) * (i as f32 / steps as f32)
            }
        })
        .collect()
}
