//! Waypoint queue and the follower that consumes it.
//!
//! [`PathQueue`] is the only place an agent's committed path lives.  It can be
//! drained one waypoint at a time, replaced wholesale by a planner response,
//! or spliced by a detour; nothing else mutates it.
//!
//! [`PathFollower`] moves an agent toward the queue head at a fixed speed,
//! never past it, and dequeues the head once the agent is within the arrival
//! epsilon.

use std::collections::VecDeque;

use fleetnav_types::Vec2;

/// Ordered FIFO of waypoints owned by one agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathQueue {
    waypoints: VecDeque<Vec2>,
}

impl PathQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// The immediate navigation target.
    pub fn peek(&self) -> Option<Vec2> {
        self.waypoints.front().copied()
    }

    pub fn pop_front(&mut self) -> Option<Vec2> {
        self.waypoints.pop_front()
    }

    /// Discard the current contents and take `waypoints` in order.
    pub fn replace(&mut self, waypoints: impl IntoIterator<Item = Vec2>) {
        self.waypoints.clear();
        self.waypoints.extend(waypoints);
    }

    /// Keep only the queued waypoints accepted by `keep`, then put `prefix`
    /// in front of them.
    pub fn splice_front(
        &mut self,
        prefix: impl IntoIterator<Item = Vec2>,
        mut keep: impl FnMut(Vec2) -> bool,
    ) {
        let mut spliced: VecDeque<Vec2> = prefix.into_iter().collect();
        spliced.extend(self.waypoints.drain(..).filter(|wp| keep(*wp)));
        self.waypoints = spliced;
    }

    pub fn clear(&mut self) {
        self.waypoints.clear();
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vec2> {
        self.waypoints.iter()
    }
}

/// Linear motion toward the head of a [`PathQueue`].
#[derive(Debug, Clone, Copy)]
pub struct PathFollower {
    arrival_epsilon: f32,
}

impl PathFollower {
    pub fn new(arrival_epsilon: f32) -> Self {
        Self { arrival_epsilon }
    }

    pub fn arrived(&self, position: Vec2, target: Vec2) -> bool {
        position.distance(target) < self.arrival_epsilon
    }

    /// Move `position` toward the queue head by `speed * dt` and dequeue the
    /// head on arrival.
    ///
    /// Returns the waypoint that was reached, if any.
    pub fn advance(
        &self,
        position: &mut Vec2,
        queue: &mut PathQueue,
        speed: f32,
        dt: f32,
    ) -> Option<Vec2> {
        let target = queue.peek()?;
        *position = position.move_towards(target, speed * dt);
        if self.arrived(*position, target) {
            queue.pop_front()
        } else {
            None
        }
    }
}
