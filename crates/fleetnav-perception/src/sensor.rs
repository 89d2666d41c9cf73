//! Perception sensor adapter.
//!
//! The physics engine is consumed as a black box through the [`ShapeCast`]
//! trait: "sweep a circle along a direction, return every body it touches".
//! [`PerceptionSensor`] wraps that primitive for one agent, removing the
//! agent's own body from the results and ordering the remaining hits by
//! distance so the control loop can always look at the nearest one first.
//!
//! # Example
//!
//! ```rust
//! use fleetnav_perception::scene::Scene;
//! use fleetnav_perception::sensor::PerceptionSensor;
//! use fleetnav_types::{ObstacleTag, Vec2};
//!
//! let mut scene = Scene::new();
//! let me = scene.spawn(Vec2::new(0.0, 0.0), 0.25, ObstacleTag::Robot);
//! scene.spawn(Vec2::new(3.0, 0.0), 0.25, ObstacleTag::from("Crate"));
//! scene.spawn(Vec2::new(1.5, 0.0), 0.25, ObstacleTag::Debris);
//!
//! let sensor = PerceptionSensor::new(me);
//! let hits = sensor.query(&scene, Vec2::ZERO, Vec2::new(1.0, 0.0), 5.0, 0.5);
//! assert_eq!(hits.len(), 2);
//! assert_eq!(hits[0].tag, ObstacleTag::Debris);
//! ```

use fleetnav_types::{BodyId, ObstacleTag, Vec2};

/// A single body touched by a shape cast.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorHit {
    /// Identity of the body that was hit.
    pub body: BodyId,
    /// Category tag of the body.
    pub tag: ObstacleTag,
    /// Contact point on the body's surface.
    pub point: Vec2,
    /// Distance travelled by the swept circle before first contact.
    /// Zero when the circle already overlaps the body at the origin.
    pub distance: f32,
    /// Centre of the body at query time.
    pub body_position: Vec2,
}

/// The external continuous-collision primitive.
///
/// Implementations may return hits in any order and may include the caster's
/// own body; [`PerceptionSensor`] normalises both.
pub trait ShapeCast {
    /// Sweep a circle of `radius` from `origin` along `direction` for at most
    /// `max_distance` world units and report every body it touches.
    ///
    /// A zero `direction` degenerates to an overlap test at `origin`.
    fn circle_cast_all(
        &self,
        origin: Vec2,
        radius: f32,
        direction: Vec2,
        max_distance: f32,
    ) -> Vec<SensorHit>;
}

/// Per-agent view of the [`ShapeCast`] primitive.
#[derive(Debug, Clone, Copy)]
pub struct PerceptionSensor {
    own_body: BodyId,
}

impl PerceptionSensor {
    /// Create a sensor for the agent occupying `own_body`.
    pub fn new(own_body: BodyId) -> Self {
        Self { own_body }
    }

    /// The body excluded from every query.
    pub fn own_body(&self) -> BodyId {
        self.own_body
    }

    /// Cast toward `direction` and return the hits sorted ascending by
    /// distance, excluding the agent's own body.
    ///
    /// An empty result means nothing is in range; it is not an error.
    pub fn query(
        &self,
        cast: &dyn ShapeCast,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        radius: f32,
    ) -> Vec<SensorHit> {
        let mut hits: Vec<SensorHit> = cast
            .circle_cast_all(origin, radius, direction, max_distance.max(0.0))
            .into_iter()
            .filter(|hit| hit.body != self.own_body)
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns a fixed hit list in whatever order it was built with.
    struct FixedCast(Vec<SensorHit>);

    impl ShapeCast for FixedCast {
        fn circle_cast_all(&self, _: Vec2, _: f32, _: Vec2, _: f32) -> Vec<SensorHit> {
            self.0.clone()
        }
    }

    fn hit(body: u64, distance: f32) -> SensorHit {
        SensorHit {
            body: BodyId(body),
            tag: ObstacleTag::from("Crate"),
            point: Vec2::new(distance, 0.0),
            distance,
            body_position: Vec2::new(distance + 0.1, 0.0),
        }
    }

    #[test]
    fn hits_are_sorted_by_distance() {
        let cast = FixedCast(vec![hit(1, 2.0), hit(2, 0.5), hit(3, 1.0)]);
        let sensor = PerceptionSensor::new(BodyId(99));
        let hits = sensor.query(&cast, Vec2::ZERO, Vec2::new(1.0, 0.0), 5.0, 0.5);
        let order: Vec<u64> = hits.iter().map(|h| h.body.0).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn own_body_is_excluded() {
        let cast = FixedCast(vec![hit(7, 0.0), hit(8, 1.0)]);
        let sensor = PerceptionSensor::new(BodyId(7));
        let hits = sensor.query(&cast, Vec2::ZERO, Vec2::new(1.0, 0.0), 5.0, 0.5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].body, BodyId(8));
    }

    #[test]
    fn nothing_in_range_is_empty_not_error() {
        let sensor = PerceptionSensor::new(BodyId(1));
        let hits = sensor.query(&FixedCast(vec![]), Vec2::ZERO, Vec2::new(0.0, 1.0), 5.0, 0.5);
        assert!(hits.is_empty());
    }
}
