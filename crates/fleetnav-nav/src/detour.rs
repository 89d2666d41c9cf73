//! Local side-step around a blocking obstacle.
//!
//! The bypass is three points built on the agent → obstacle heading:
//!
//! ```text
//!            p1 ───────────────────► p2
//!            ▲                        │
//!   side     │                        ▼
//!          agent ······· obstacle ··· p3 ··· (rest of the path)
//!                 forward ─►
//! ```
//!
//! `p1` steps sideways by `side_offset`, `p2` advances past the obstacle by
//! its distance plus `clearance`, and `p3` returns to the original heading
//! line.  Queued waypoints that would re-collide (closer than `clearance` to
//! the obstacle) or that lie before `p3` along the heading are dropped.

use fleetnav_types::Vec2;

use crate::path_queue::PathQueue;

/// A computed bypass, ready to be spliced into a [`PathQueue`].
#[derive(Debug, Clone, PartialEq)]
pub struct Detour {
    origin: Vec2,
    obstacle: Vec2,
    forward: Vec2,
    clearance: f32,
    /// The three bypass points in travel order.
    pub bypass: [Vec2; 3],
    /// Progress of `bypass[2]` along the heading, measured from the agent.
    pub reentry_progress: f32,
}

impl Detour {
    /// Build the bypass geometry.
    ///
    /// Returns `None` when the agent sits on the obstacle's position and the
    /// heading is undefined; callers then fall back to report-and-stop.
    pub fn plan(agent: Vec2, obstacle: Vec2, clearance: f32, side_offset: f32) -> Option<Self> {
        let to_obstacle = obstacle - agent;
        let forward = to_obstacle.try_normalize()?;
        let side = forward.perp();
        let distance = to_obstacle.length();

        let p1 = agent + side * side_offset;
        let p2 = p1 + forward * (distance + clearance);
        let p3 = p2 - side * side_offset;

        Some(Self {
            origin: agent,
            obstacle,
            forward,
            clearance,
            bypass: [p1, p2, p3],
            reentry_progress: (p3 - agent).dot(forward),
        })
    }

    /// Forward-projected progress of `point` from the agent's position.
    pub fn progress(&self, point: Vec2) -> f32 {
        (point - self.origin).dot(self.forward)
    }

    /// Whether an original waypoint survives the splice.
    pub fn keeps(&self, waypoint: Vec2) -> bool {
        waypoint.distance(self.obstacle) >= self.clearance
            && self.progress(waypoint) >= self.reentry_progress
    }

    /// Replace `queue` with the bypass followed by the surviving waypoints.
    pub fn splice_into(&self, queue: &mut PathQueue) {
        queue.splice_front(self.bypass, |wp| self.keeps(wp));
    }
}
