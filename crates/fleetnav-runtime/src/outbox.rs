//! [`Outbox`] implementation that publishes onto the [`EventBus`].

use fleetnav_middleware::{EventBus, Topic};
use fleetnav_nav::Outbox;
use fleetnav_types::{Event, EventPayload, ObstacleReport, PathRequest, TrackingSnapshot};
use tracing::trace;

/// Routes agent traffic to the planner, obstacle manager and fleet topics.
///
/// Publishing is fire-and-forget: a topic without subscribers drops the
/// message.
#[derive(Debug, Clone)]
pub struct BusOutbox {
    bus: EventBus,
    source: String,
}

impl BusOutbox {
    pub fn new(bus: EventBus, source: impl Into<String>) -> Self {
        Self {
            bus,
            source: source.into(),
        }
    }

    fn publish(&self, topic: Topic, payload: EventPayload) {
        let event = Event::new(self.source.clone(), payload);
        if let Err(err) = self.bus.publish_to(topic, event) {
            trace!(%topic, error = %err, "outbound message dropped");
        }
    }
}

impl Outbox for BusOutbox {
    fn request_path(&self, request: PathRequest) {
        self.publish(Topic::PathRequests, EventPayload::PathRequest(request));
    }

    fn report_obstacle(&self, report: ObstacleReport) {
        self.publish(Topic::ObstacleReports, EventPayload::ObstacleReport(report));
    }

    fn publish_tracking(&self, snapshot: TrackingSnapshot) {
        self.publish(Topic::FleetStatus, EventPayload::Tracking(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use fleetnav_types::{AgentId, Vec2};

    use super::*;

    #[test]
    fn messages_land_on_their_topics() {
        let bus = EventBus::default();
        let mut requests = bus.subscribe_to(Topic::PathRequests);
        let mut reports = bus.subscribe_to(Topic::ObstacleReports);
        let outbox = BusOutbox::new(bus.clone(), "fleetnav-nav::agent");

        outbox.request_path(PathRequest::new(AgentId(2), Vec2::ZERO, Vec2::new(1.0, 0.0)));
        outbox.report_obstacle(ObstacleReport {
            x: 1.0,
            y: 2.0,
            obstacle_tag: "Crate".to_string(),
        });

        let sent = requests.drain();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].source, "fleetnav-nav::agent");
        assert!(matches!(
            &sent[0].payload,
            EventPayload::PathRequest(r) if r.robot_id == AgentId(2)
        ));
        assert_eq!(reports.drain().len(), 1);
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        let outbox = BusOutbox::new(EventBus::default(), "test");
        outbox.report_obstacle(ObstacleReport {
            x: 0.0,
            y: 0.0,
            obstacle_tag: "Robot".to_string(),
        });
    }
}
