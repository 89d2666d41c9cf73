//! Path request/response correlation.
//!
//! At most one request is in flight per agent.  [`RequestTracker::send`]
//! refuses to publish while one is pending, which is the only backpressure
//! against request storms.  Responses are matched by agent identity because
//! the planner may broadcast them to every agent.
//!
//! An unanswered request is re-sent after `timeout_secs` of simulated time,
//! up to `max_retries` times, and then abandoned so the agent can fall back
//! to its idle branch.

use fleetnav_types::{AgentId, PathRequest, PathResponse, Vec2};
use tracing::{debug, info, trace, warn};

use crate::outbox::Outbox;
use crate::policy::RequestPolicy;

/// Result of offering a response to a tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    /// Addressed to another agent.
    NotMine,
    /// Addressed to us, but nothing was pending.
    Unsolicited,
    /// Planning failed or the path arrays were malformed. Pending is cleared.
    Failed,
    /// A usable path, in order. Pending is cleared.
    Accepted(Vec<Vec2>),
}

/// What the timeout clock did this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingStatus {
    /// No request in flight.
    Clear,
    Waiting,
    /// The request was re-sent; carries the retry count so far.
    Retried(u32),
    /// Retries exhausted; the request was dropped.
    Abandoned,
}

#[derive(Debug, Clone)]
struct InFlight {
    request: PathRequest,
    waited: f32,
    retries: u32,
}

#[derive(Debug, Clone)]
pub struct RequestTracker {
    policy: RequestPolicy,
    in_flight: Option<InFlight>,
}

impl RequestTracker {
    pub fn new(policy: RequestPolicy) -> Self {
        Self {
            policy,
            in_flight: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The request currently awaiting an answer.
    pub fn pending(&self) -> Option<&PathRequest> {
        self.in_flight.as_ref().map(|f| &f.request)
    }

    /// Publish `request` and mark it pending.
    ///
    /// Returns `false` without publishing when a request is already pending.
    pub fn send(&mut self, outbox: &dyn Outbox, request: PathRequest) -> bool {
        if self.in_flight.is_some() {
            trace!(agent = %request.robot_id, "path request suppressed; one already pending");
            return false;
        }
        info!(
            agent = %request.robot_id,
            start = %request.start(),
            end = %request.end(),
            "path request sent"
        );
        outbox.request_path(request.clone());
        self.in_flight = Some(InFlight {
            request,
            waited: 0.0,
            retries: 0,
        });
        true
    }

    /// Correlate `response` with the pending request of agent `me`.
    pub fn on_response(&mut self, me: AgentId, response: &PathResponse) -> ResponseOutcome {
        if response.robot_id != me {
            trace!(agent = %me, addressed_to = %response.robot_id, "response for another agent ignored");
            return ResponseOutcome::NotMine;
        }
        if self.in_flight.take().is_none() {
            debug!(agent = %me, "response arrived with no request pending; discarded");
            return ResponseOutcome::Unsolicited;
        }
        if !response.success {
            warn!(agent = %me, "path planning failed");
            return ResponseOutcome::Failed;
        }
        match response.waypoints() {
            Ok(waypoints) => {
                info!(agent = %me, points = waypoints.len(), "path received");
                ResponseOutcome::Accepted(waypoints)
            }
            Err(err) => {
                warn!(agent = %me, error = %err, "malformed path response treated as failure");
                ResponseOutcome::Failed
            }
        }
    }

    /// Advance the timeout clock by `dt` simulated seconds.
    pub fn poll(&mut self, dt: f32, outbox: &dyn Outbox) -> PendingStatus {
        let Some(flight) = self.in_flight.as_mut() else {
            return PendingStatus::Clear;
        };
        let Some(timeout) = self.policy.timeout() else {
            return PendingStatus::Waiting;
        };

        flight.waited += dt;
        if flight.waited < timeout {
            return PendingStatus::Waiting;
        }

        if flight.retries < self.policy.max_retries {
            flight.retries += 1;
            flight.waited = 0.0;
            warn!(
                agent = %flight.request.robot_id,
                retry = flight.retries,
                "path request timed out; re-sending"
            );
            outbox.request_path(flight.request.clone());
            PendingStatus::Retried(flight.retries)
        } else {
            warn!(
                agent = %flight.request.robot_id,
                retries = flight.retries,
                "path request abandoned after retries"
            );
            self.in_flight = None;
            PendingStatus::Abandoned
        }
    }
}
