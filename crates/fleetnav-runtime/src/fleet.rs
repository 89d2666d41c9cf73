//! [`Fleet`] – owns every agent and the shared scene, and runs the frame.
//!
//! Each call to [`Fleet::step`] is one simulation frame:
//!
//! 1. Drain the bus: spawn commands, then planner responses (offered to
//!    every agent; each filters by identity), then planner feedback.
//! 2. Tick every agent in ascending id order against the scene.
//! 3. After each agent's tick, move its body to its new position and apply
//!    the scene effects its task routine emitted.
//!
//! Nothing here blocks or awaits; the bus is read with non-blocking drains.

use std::collections::BTreeMap;
use std::sync::Arc;

use fleetnav_middleware::{EventBus, Topic, TopicReceiver};
use fleetnav_nav::{Agent, NavPolicy, Outbox};
use fleetnav_perception::Scene;
use fleetnav_types::{
    AgentId, Event, EventPayload, FleetError, FleetResult, ObstacleTag, SpawnCommand,
    SubscribeMessage,
};
use tracing::{debug, info, warn};

use crate::outbox::BusOutbox;

/// Radius of the circular body each agent occupies in the scene.
pub const DEFAULT_AGENT_RADIUS: f32 = 0.25;

const SOURCE: &str = "fleetnav-runtime::fleet";

pub struct Fleet {
    bus: EventBus,
    scene: Scene,
    policy: Arc<NavPolicy>,
    outbox: Arc<dyn Outbox>,
    agents: BTreeMap<AgentId, Agent>,
    agent_radius: f32,
    commands: TopicReceiver,
    responses: TopicReceiver,
    feedback: TopicReceiver,
}

impl Fleet {
    /// Build a fleet over `scene` and subscribe to its inbound topics.
    pub fn new(bus: EventBus, scene: Scene, policy: NavPolicy) -> Self {
        let outbox: Arc<dyn Outbox> = Arc::new(BusOutbox::new(bus.clone(), "fleetnav-nav::agent"));
        Self {
            commands: bus.subscribe_to(Topic::FleetCommands),
            responses: bus.subscribe_to(Topic::PathResponses),
            feedback: bus.subscribe_to(Topic::PathFeedback),
            bus,
            scene,
            policy: Arc::new(policy),
            outbox,
            agents: BTreeMap::new(),
            agent_radius: DEFAULT_AGENT_RADIUS,
        }
    }

    pub fn with_agent_radius(mut self, radius: f32) -> Self {
        self.agent_radius = radius.max(0.0);
        self
    }

    /// Tell the fleet manager this simulator accepts spawn commands.
    ///
    /// # Errors
    ///
    /// [`FleetError::Channel`] when nobody listens on the readiness topic.
    pub fn announce_ready(&self) -> FleetResult<usize> {
        let delivered = self.bus.publish_to(
            Topic::FleetReady,
            Event::new(SOURCE, EventPayload::Subscribe(SubscribeMessage::ready())),
        )?;
        info!(listeners = delivered, "fleet ready");
        Ok(delivered)
    }

    /// Create one agent and its body.
    ///
    /// # Errors
    ///
    /// [`FleetError::DuplicateAgent`] for a reused id, or the validation error
    /// of a malformed command. The scene is left untouched on error.
    pub fn spawn(&mut self, cmd: &SpawnCommand) -> FleetResult<AgentId> {
        if self.agents.contains_key(&cmd.robot_id) {
            return Err(FleetError::DuplicateAgent(cmd.robot_id));
        }
        cmd.validate()?;

        let body = self
            .scene
            .spawn(cmd.start(), self.agent_radius, ObstacleTag::Robot);
        match Agent::spawn(cmd, body, Arc::clone(&self.policy), Arc::clone(&self.outbox)) {
            Ok(agent) => {
                self.agents.insert(cmd.robot_id, agent);
                Ok(cmd.robot_id)
            }
            Err(err) => {
                self.scene.remove(body);
                Err(err)
            }
        }
    }

    /// Run one frame of `dt` simulated seconds.
    pub fn step(&mut self, dt: f32) {
        self.drain_inbound();

        for agent in self.agents.values_mut() {
            let effects = agent.tick(dt, &self.scene);
            self.scene.set_position(agent.body(), agent.position());
            for effect in &effects {
                if !self.scene.apply(effect) {
                    debug!(agent = %agent.id(), ?effect, "scene effect had no target");
                }
            }
        }
    }

    fn drain_inbound(&mut self) {
        for event in self.commands.drain() {
            if let EventPayload::Spawn(cmd) = event.payload {
                if let Err(err) = self.spawn(&cmd) {
                    warn!(agent = %cmd.robot_id, error = %err, "spawn command rejected");
                }
            }
        }

        for event in self.responses.drain() {
            if let EventPayload::PathResponse(response) = event.payload {
                for agent in self.agents.values_mut() {
                    agent.on_response(&response);
                }
            }
        }

        for event in self.feedback.drain() {
            if let EventPayload::PathFeedback(feedback) = event.payload {
                for agent in self.agents.values() {
                    agent.on_feedback(&feedback);
                }
            }
        }
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Agents in ascending id order.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

#[cfg(test)]
mod tests {
    use fleetnav_types::{PathResponse, TaskState, Vec2};

    use super::*;

    fn command(id: i32, subtype: &str, start: (f32, f32), end: (f32, f32)) -> SpawnCommand {
        SpawnCommand {
            robot_id: AgentId(id),
            robot_type: subtype.to_string(),
            start_x: start.0,
            start_y: start.1,
            end_x: end.0,
            end_y: end.1,
            path_x: vec![],
            path_y: vec![],
            loop_route: false,
            move_speed: 2.0,
            perception_radius: 0.5,
            obstacle_distance_threshold: 2.0,
        }
    }

    fn publish(bus: &EventBus, topic: Topic, payload: EventPayload) {
        bus.publish_to(topic, Event::new("test", payload))
            .expect("fleet is subscribed");
    }

    #[test]
    fn spawn_commands_arrive_over_the_bus() {
        let bus = EventBus::default();
        let mut fleet = Fleet::new(bus.clone(), Scene::new(), NavPolicy::default());

        publish(&bus, Topic::FleetCommands, EventPayload::Spawn(command(2, "cleaner", (0.0, 0.0), (1.0, 0.0))));
        publish(&bus, Topic::FleetCommands, EventPayload::Spawn(command(1, "default", (3.0, 0.0), (4.0, 0.0))));
        fleet.step(0.1);

        let ids: Vec<AgentId> = fleet.agents().map(Agent::id).collect();
        assert_eq!(ids, vec![AgentId(1), AgentId(2)]);
        assert_eq!(fleet.scene().len(), 2);
    }

    #[test]
    fn duplicate_and_invalid_spawns_are_rejected() {
        let mut fleet = Fleet::new(EventBus::default(), Scene::new(), NavPolicy::default());
        fleet.spawn(&command(1, "default", (0.0, 0.0), (1.0, 0.0))).expect("first spawn");

        assert!(matches!(
            fleet.spawn(&command(1, "default", (0.0, 0.0), (1.0, 0.0))),
            Err(FleetError::DuplicateAgent(AgentId(1)))
        ));
        assert!(matches!(
            fleet.spawn(&command(2, "janitor", (0.0, 0.0), (1.0, 0.0))),
            Err(FleetError::UnknownSubtype(_))
        ));
        assert_eq!(fleet.len(), 1);
        assert_eq!(fleet.scene().len(), 1);
    }

    #[test]
    fn broadcast_response_reaches_only_its_agent() {
        let bus = EventBus::default();
        let mut fleet = Fleet::new(bus.clone(), Scene::new(), NavPolicy::default());
        fleet.spawn(&command(1, "default", (0.0, 0.0), (0.0, 3.0))).expect("spawn 1");
        fleet.spawn(&command(5, "default", (5.0, 0.0), (5.0, 3.0))).expect("spawn 5");

        let response = PathResponse::from_waypoints(AgentId(5), &[Vec2::new(5.0, 3.0)]);
        publish(&bus, Topic::PathResponses, EventPayload::PathResponse(response));
        fleet.step(0.1);

        let first = fleet.agent(AgentId(1)).expect("agent 1");
        let fifth = fleet.agent(AgentId(5)).expect("agent 5");
        assert_eq!(first.task_state(), TaskState::PendingRequest);
        assert_eq!(fifth.task_state(), TaskState::Following);
    }

    #[test]
    fn agent_bodies_follow_agents() {
        let bus = EventBus::default();
        let mut fleet = Fleet::new(bus.clone(), Scene::new(), NavPolicy::default());
        fleet.spawn(&command(1, "default", (0.0, 0.0), (2.0, 0.0))).expect("spawn");

        let response = PathResponse::from_waypoints(AgentId(1), &[Vec2::new(2.0, 0.0)]);
        publish(&bus, Topic::PathResponses, EventPayload::PathResponse(response));
        fleet.step(0.5);

        let agent = fleet.agent(AgentId(1)).expect("agent");
        let body = fleet.scene().body(agent.body()).expect("body");
        assert_eq!(body.position, agent.position());
        assert!(agent.position().x > 0.0);
    }

    #[test]
    fn cleaning_removes_debris_from_the_scene() {
        let bus = EventBus::default();
        let mut scene = Scene::new();
        let debris = scene.spawn(Vec2::new(0.05, 0.0), 0.1, ObstacleTag::Debris);
        let mut fleet = Fleet::new(bus.clone(), scene, NavPolicy::default());
        fleet.spawn(&command(1, "cleaner", (0.0, 0.0), (2.0, 0.0))).expect("spawn");

        let response = PathResponse::from_waypoints(AgentId(1), &[Vec2::new(2.0, 0.0)]);
        publish(&bus, Topic::PathResponses, EventPayload::PathResponse(response));
        fleet.step(0.1);
        assert!(fleet.agent(AgentId(1)).is_some_and(Agent::is_performing_task));

        fleet.step(2.0);
        assert!(fleet.scene().body(debris).is_none());
    }

    #[test]
    fn announce_ready_needs_a_listener() {
        let bus = EventBus::default();
        let fleet = Fleet::new(bus.clone(), Scene::new(), NavPolicy::default());
        assert!(fleet.announce_ready().is_err());

        let mut ready = bus.subscribe_to(Topic::FleetReady);
        assert_eq!(fleet.announce_ready().ok(), Some(1));
        assert!(matches!(
            &ready.drain()[0].payload,
            EventPayload::Subscribe(msg) if msg.state == "ready"
        ));
    }
}
