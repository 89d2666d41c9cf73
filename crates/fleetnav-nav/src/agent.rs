//! One simulated robot and its per-tick control loop.
//!
//! An [`Agent`] is split in two halves so the subtype [`Behavior`] can
//! mutate the shared navigation state without aliasing itself:
//!
//! - [`AgentCore`] – identity, kinematics, path queue, ledger, request
//!   tracker and the outbound handle.
//! - [`Behavior`] – the subtype task state machine.
//!
//! # Tick order
//!
//! 1. Advance the pending-request timeout clock.
//! 2. If a task routine is active, hand the tick to [`Behavior::update_task`].
//! 3. Else, with an empty queue, run the idle branch (loop to the next
//!    destination when enabled).
//! 4. Else cast toward the queue head, let the subtype claim the nearest
//!    blocking hit, fall back to report-and-stop, and otherwise advance.
//! 5. Emit a tracking snapshot when the telemetry interval has elapsed.
//!
//! The tick never fails; every outcome is explicit state.  Scene mutations
//! requested by task routines are returned to the caller for application.

use std::sync::Arc;

use fleetnav_perception::{PerceptionSensor, SceneEffect, SensorHit, ShapeCast};
use fleetnav_types::{
    AgentId, AgentSubtype, BodyId, FleetResult, ObstacleReport, PathFeedback, PathRequest,
    PathResponse, SpawnCommand, TaskState, TrackingSnapshot, Vec2,
};
use tracing::{debug, info};

use crate::behavior::{Behavior, HookOutcome};
use crate::detour::Detour;
use crate::ledger::ObstacleLedger;
use crate::outbox::Outbox;
use crate::path_queue::{PathFollower, PathQueue};
use crate::policy::NavPolicy;
use crate::protocol::{RequestTracker, ResponseOutcome};
use crate::telemetry::TelemetryReporter;

/// Navigation state shared between the generic loop and the subtype hooks.
pub struct AgentCore {
    pub(crate) id: AgentId,
    pub(crate) subtype: AgentSubtype,
    pub(crate) body: BodyId,
    pub(crate) position: Vec2,
    pub(crate) start: Vec2,
    pub(crate) end: Vec2,
    pub(crate) destinations: Vec<Vec2>,
    pub(crate) destination_index: usize,
    pub(crate) move_speed: f32,
    pub(crate) perception_radius: f32,
    pub(crate) obstacle_distance_threshold: f32,
    pub(crate) loop_route: bool,
    pub(crate) obstacle_detected: bool,
    pub(crate) last_avoided: Option<BodyId>,
    pub(crate) queue: PathQueue,
    pub(crate) ledger: ObstacleLedger,
    pub(crate) requests: RequestTracker,
    pub(crate) follower: PathFollower,
    pub(crate) policy: Arc<NavPolicy>,
    outbox: Arc<dyn Outbox>,
    effects: Vec<SceneEffect>,
}

impl AgentCore {
    /// Set the current target and ask the planner for a path to it.
    ///
    /// Suppressed (returns `false`) while another request is pending.
    pub(crate) fn request_path_to(&mut self, target: Vec2) -> bool {
        if self.requests.is_pending() {
            return false;
        }
        self.end = target;
        let request = PathRequest::new(self.id, self.position, target);
        self.requests.send(self.outbox.as_ref(), request)
    }

    /// Report `hit` unless the ledger says it was already reported.
    pub(crate) fn report_obstacle(&mut self, hit: &SensorHit) -> bool {
        if !self.ledger.claim(hit.body) {
            return false;
        }
        info!(
            agent = %self.id,
            obstacle = %hit.body,
            tag = %hit.tag,
            at = %hit.body_position,
            "obstacle reported"
        );
        self.outbox.report_obstacle(ObstacleReport {
            x: hit.body_position.x,
            y: hit.body_position.y,
            obstacle_tag: hit.tag.to_string(),
        });
        true
    }

    /// Splice a side-step around `hit` into the queue.
    ///
    /// A second attempt for the obstacle last avoided is a successful no-op.
    /// Returns `false` when the geometry is degenerate.
    pub(crate) fn try_detour(&mut self, hit: &SensorHit) -> bool {
        if self.last_avoided == Some(hit.body) {
            return true;
        }
        let detour = Detour::plan(
            self.position,
            hit.body_position,
            self.policy.detour.clearance,
            self.policy.detour.side_offset,
        );
        match detour {
            Some(detour) => {
                detour.splice_into(&mut self.queue);
                self.last_avoided = Some(hit.body);
                debug!(agent = %self.id, obstacle = %hit.body, queued = self.queue.len(), "side-step planned");
                true
            }
            None => {
                debug!(agent = %self.id, obstacle = %hit.body, "degenerate detour geometry; stopping instead");
                false
            }
        }
    }

    /// Advance along the queue without consulting the sensor.
    pub(crate) fn follow_queue(&mut self, dt: f32) -> Option<Vec2> {
        self.follower
            .advance(&mut self.position, &mut self.queue, self.move_speed, dt)
    }

    /// Index of the destination closest to the current position.
    pub(crate) fn nearest_destination(&self) -> Option<usize> {
        self.destinations
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                self.position
                    .distance(**a)
                    .total_cmp(&self.position.distance(**b))
            })
            .map(|(index, _)| index)
    }

    pub(crate) fn emit(&mut self, effect: SceneEffect) {
        self.effects.push(effect);
    }

    /// Idle branch: loop to the next destination when enabled.
    fn replan_next_destination(&mut self) {
        if !self.loop_route || self.requests.is_pending() || self.destinations.is_empty() {
            return;
        }
        self.destination_index = (self.destination_index + 1) % self.destinations.len();
        let next = self.destinations[self.destination_index];
        self.request_path_to(next);
    }
}

/// A simulated robot.
pub struct Agent {
    core: AgentCore,
    behavior: Behavior,
    sensor: PerceptionSensor,
    telemetry: TelemetryReporter,
}

impl Agent {
    /// Create an agent from a spawn command.
    ///
    /// An agent without a destination list immediately requests a path from
    /// its start to its end target.
    ///
    /// # Errors
    ///
    /// Returns the validation error of `cmd` when it is malformed.
    pub fn spawn(
        cmd: &SpawnCommand,
        body: BodyId,
        policy: Arc<NavPolicy>,
        outbox: Arc<dyn Outbox>,
    ) -> FleetResult<Self> {
        cmd.validate()?;
        let subtype = cmd.subtype()?;
        let destinations = cmd.destinations()?;

        let core = AgentCore {
            id: cmd.robot_id,
            subtype,
            body,
            position: cmd.start(),
            start: cmd.start(),
            end: cmd.end(),
            destinations,
            destination_index: 0,
            move_speed: cmd.move_speed,
            perception_radius: cmd.perception_radius,
            obstacle_distance_threshold: cmd.obstacle_distance_threshold,
            loop_route: cmd.loop_route,
            obstacle_detected: false,
            last_avoided: None,
            queue: PathQueue::new(),
            ledger: ObstacleLedger::new(),
            requests: RequestTracker::new(policy.requests.clone()),
            follower: PathFollower::new(policy.arrival_epsilon),
            outbox,
            effects: Vec::new(),
            policy: Arc::clone(&policy),
        };

        let mut agent = Self {
            core,
            behavior: Behavior::for_subtype(subtype),
            sensor: PerceptionSensor::new(body),
            telemetry: TelemetryReporter::new(policy.telemetry_interval_secs),
        };
        info!(
            agent = %agent.core.id,
            subtype = %subtype,
            start = %agent.core.start,
            destinations = agent.core.destinations.len(),
            "agent spawned"
        );

        if agent.core.destinations.is_empty() {
            let end = agent.core.end;
            agent.core.request_path_to(end);
        }
        Ok(agent)
    }

    /// Run one control-loop pass of `dt` simulated seconds.
    ///
    /// Returns the scene effects emitted by task routines during the tick.
    pub fn tick(&mut self, dt: f32, cast: &dyn ShapeCast) -> Vec<SceneEffect> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let outbox = Arc::clone(&self.core.outbox);
        self.core.requests.poll(dt, outbox.as_ref());

        if self.behavior.is_performing_task() {
            self.behavior.update_task(&mut self.core, dt);
        } else if self.core.queue.is_empty() {
            self.core.obstacle_detected = false;
            self.core.replan_next_destination();
        } else {
            self.follow(dt, cast);
        }

        if self.telemetry.tick(dt) {
            outbox.publish_tracking(self.snapshot());
        }
        std::mem::take(&mut self.core.effects)
    }

    fn follow(&mut self, dt: f32, cast: &dyn ShapeCast) {
        let Some(target) = self.core.queue.peek() else {
            return;
        };
        let position = self.core.position;
        if self.core.follower.arrived(position, target) {
            self.core.queue.pop_front();
            self.core.obstacle_detected = false;
            return;
        }

        let hits = self.sensor.query(
            cast,
            position,
            target - position,
            position.distance(target),
            self.core.perception_radius,
        );
        let threshold = self.core.obstacle_distance_threshold;
        if let Some(hit) = hits.into_iter().find(|h| h.distance <= threshold) {
            match self.behavior.handle_special_obstacle(&mut self.core, &hit) {
                HookOutcome::Proceed => {}
                HookOutcome::Hold => {
                    self.core.obstacle_detected = true;
                    return;
                }
                HookOutcome::Unclaimed => {
                    self.core.report_obstacle(&hit);
                    self.core.obstacle_detected = true;
                    return;
                }
            }
        }

        self.core.obstacle_detected = false;
        self.core.follow_queue(dt);
    }

    /// Offer a planner response. Responses for other agents are ignored.
    pub fn on_response(&mut self, response: &PathResponse) {
        match self.core.requests.on_response(self.core.id, response) {
            ResponseOutcome::NotMine | ResponseOutcome::Unsolicited => {}
            ResponseOutcome::Failed => self.core.queue.clear(),
            ResponseOutcome::Accepted(waypoints) => {
                self.core.queue.replace(waypoints);
                self.core.last_avoided = None;
            }
        }
    }

    /// Planner progress is advisory and only logged.
    pub fn on_feedback(&self, feedback: &PathFeedback) {
        if feedback.robot_id != self.core.id {
            return;
        }
        debug!(agent = %self.core.id, percent = feedback.percent_complete, "planner progress");
    }

    pub fn task_state(&self) -> TaskState {
        if self.behavior.is_performing_task() {
            TaskState::PerformingTask
        } else if self.core.requests.is_pending() {
            TaskState::PendingRequest
        } else if !self.core.queue.is_empty() {
            TaskState::Following
        } else {
            TaskState::Idle
        }
    }

    pub fn snapshot(&self) -> TrackingSnapshot {
        let core = &self.core;
        TrackingSnapshot {
            robot_id: core.id,
            robot_type: core.subtype,
            position: core.position,
            start: core.start,
            end: core.end,
            destinations: core.destinations.clone(),
            destination_index: core.destination_index,
            move_speed: core.move_speed,
            perception_radius: core.perception_radius,
            obstacle_distance_threshold: core.obstacle_distance_threshold,
            loop_route: core.loop_route,
            obstacle_detected: core.obstacle_detected,
            is_performing_task: self.behavior.is_performing_task(),
            task_state: self.task_state(),
            remaining_waypoints: core.queue.len(),
        }
    }

    pub fn id(&self) -> AgentId {
        self.core.id
    }

    pub fn subtype(&self) -> AgentSubtype {
        self.core.subtype
    }

    pub fn body(&self) -> BodyId {
        self.core.body
    }

    pub fn position(&self) -> Vec2 {
        self.core.position
    }

    pub fn queue(&self) -> &PathQueue {
        &self.core.queue
    }

    pub fn is_pending(&self) -> bool {
        self.core.requests.is_pending()
    }

    pub fn obstacle_detected(&self) -> bool {
        self.core.obstacle_detected
    }

    pub fn is_performing_task(&self) -> bool {
        self.behavior.is_performing_task()
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub fn ledger(&self) -> &ObstacleLedger {
        &self.core.ledger
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.core.id)
            .field("subtype", &self.core.subtype)
            .field("position", &self.core.position)
            .field("task_state", &self.task_state())
            .field("queued", &self.core.queue.len())
            .finish()
    }
}
