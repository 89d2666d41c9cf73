//! Typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others.  The simulation never awaits on the bus: each frame it drains
//! whatever is already buffered with [`TopicReceiver::drain`] before agent
//! logic runs.
//!
//! # Topics
//!
//! | Topic | ROS name | Typical traffic |
//! |---|---|---|
//! | [`Topic::PathRequests`] | `path_planner/request` | Agent → planner requests |
//! | [`Topic::PathResponses`] | `path_planner/response` | Planner answers (broadcast to all agents) |
//! | [`Topic::PathFeedback`] | `path_planner/feedback` | Advisory planner progress |
//! | [`Topic::ObstacleReports`] | `obstacle_manager/report_obstacle` | One report per obstacle instance |
//! | [`Topic::FleetCommands`] | `robot_manager/publish_robot` | Spawn commands from the fleet manager |
//! | [`Topic::FleetReady`] | `robot_manager/subscribe_robot` | Readiness announcement |
//! | [`Topic::FleetStatus`] | `robot_manager/tracking` | Periodic tracking snapshots |

use fleetnav_types::{Event, FleetError};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::warn;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 1024;

/// Routing lanes of the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    PathRequests,
    PathResponses,
    PathFeedback,
    ObstacleReports,
    FleetCommands,
    FleetReady,
    FleetStatus,
}

impl Topic {
    pub const ALL: [Topic; 7] = [
        Topic::PathRequests,
        Topic::PathResponses,
        Topic::PathFeedback,
        Topic::ObstacleReports,
        Topic::FleetCommands,
        Topic::FleetReady,
        Topic::FleetStatus,
    ];

    /// The topic name used by the external services.
    pub fn ros_name(&self) -> &'static str {
        match self {
            Topic::PathRequests => "path_planner/request",
            Topic::PathResponses => "path_planner/response",
            Topic::PathFeedback => "path_planner/feedback",
            Topic::ObstacleReports => "obstacle_manager/report_obstacle",
            Topic::FleetCommands => "robot_manager/publish_robot",
            Topic::FleetReady => "robot_manager/subscribe_robot",
            Topic::FleetStatus => "robot_manager/tracking",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.ros_name())
    }
}

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    path_requests: broadcast::Sender<Event>,
    path_responses: broadcast::Sender<Event>,
    path_feedback: broadcast::Sender<Event>,
    obstacle_reports: broadcast::Sender<Event>,
    fleet_commands: broadcast::Sender<Event>,
    fleet_ready: broadcast::Sender<Event>,
    fleet_status: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every topic channel independently.
    pub fn new(capacity: usize) -> Self {
        let channel = || broadcast::channel::<Event>(capacity.max(1)).0;
        Self {
            path_requests: channel(),
            path_responses: channel(),
            path_feedback: channel(),
            obstacle_reports: channel(),
            fleet_commands: channel(),
            fleet_ready: channel(),
            fleet_status: channel(),
        }
    }

    /// Publish `event` to the given [`Topic`] channel.
    ///
    /// Returns the number of active receivers that were handed the event.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Channel`] when nobody is subscribed to the topic.
    /// Fire-and-forget publishers are expected to log and drop this error.
    pub fn publish_to(&self, topic: Topic, event: Event) -> Result<usize, FleetError> {
        self.topic_sender(topic)
            .send(event)
            .map_err(|_| FleetError::Channel(format!("no subscribers for topic {topic}")))
    }

    /// Subscribe to a specific [`Topic`] channel.
    ///
    /// The receiver only sees events published after this call.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    /// Number of live receivers on `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topic_sender(topic).receiver_count()
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::PathRequests => &self.path_requests,
            Topic::PathResponses => &self.path_responses,
            Topic::PathFeedback => &self.path_feedback,
            Topic::ObstacleReports => &self.obstacle_reports,
            Topic::FleetCommands => &self.fleet_commands,
            Topic::FleetReady => &self.fleet_ready,
            Topic::FleetStatus => &self.fleet_status,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A receiver bound to a single [`Topic`] channel.
///
/// Obtained via [`EventBus::subscribe_to`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    pub async fn recv(&mut self) -> Result<Event, RecvError> {
        self.receiver.recv().await
    }

    /// Take every event already buffered on this topic without blocking.
    ///
    /// Lagged gaps are logged and skipped; the events that survived are
    /// returned in publish order.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(n)) => {
                    warn!(topic = %self.topic, lagged_by = n, "topic receiver lagged; events dropped");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        events
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}
