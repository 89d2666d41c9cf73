//! In-process 2D scene of circular bodies.
//!
//! [`Scene`] is the headless stand-in for the physics engine.  It stores
//! every body as a circle (centre, radius, category tag), answers swept
//! circle queries through [`ShapeCast`], and applies the [`SceneEffect`]s
//! that task routines emit (destroying debris, attaching a picked-up item to
//! its carrier, disposing of carried items).
//!
//! Carried bodies follow their carrier whenever the carrier is moved with
//! [`Scene::set_position`] and are invisible to casts while carried.
//!
//! # Example
//!
//! ```rust
//! use fleetnav_perception::scene::{Scene, SceneEffect};
//! use fleetnav_types::{ObstacleTag, Vec2};
//!
//! let mut scene = Scene::new();
//! let robot = scene.spawn(Vec2::ZERO, 0.25, ObstacleTag::Robot);
//! let bag = scene.spawn(Vec2::new(0.3, 0.0), 0.1, ObstacleTag::Unattended);
//!
//! scene.apply(&SceneEffect::Attach { body: bag, carrier: robot });
//! scene.set_position(robot, Vec2::new(5.0, 0.0));
//! assert_eq!(scene.body(bag).map(|b| b.position), Some(Vec2::new(5.3, 0.0)));
//! ```

use std::collections::BTreeMap;

use fleetnav_types::{BodyId, ObstacleTag, Vec2};
use tracing::{debug, trace};

use crate::sensor::{SensorHit, ShapeCast};

/// One circular body in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub id: BodyId,
    pub position: Vec2,
    pub radius: f32,
    pub tag: ObstacleTag,
    /// Carrier this body is attached to, if any.
    pub carried_by: Option<BodyId>,
}

/// Mutation requested by an agent's task routine, applied after its tick.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEffect {
    /// Destroy a body (cleaned debris).
    Remove(BodyId),
    /// Re-parent `body` onto `carrier`; it keeps its offset and moves along.
    Attach { body: BodyId, carrier: BodyId },
    /// Destroy every body carried by `carrier` whose tag equals `tag`.
    RemoveCarried { carrier: BodyId, tag: ObstacleTag },
}

/// Headless collection of circular bodies.
#[derive(Debug, Default)]
pub struct Scene {
    bodies: BTreeMap<BodyId, Body>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new free body and return its identity.
    pub fn spawn(&mut self, position: Vec2, radius: f32, tag: ObstacleTag) -> BodyId {
        self.next_id += 1;
        let id = BodyId(self.next_id);
        self.bodies.insert(
            id,
            Body {
                id,
                position,
                radius: radius.max(0.0),
                tag,
                carried_by: None,
            },
        );
        trace!(body = %id, %position, "body spawned");
        id
    }

    /// Remove a body. Bodies it was carrying are dropped in place.
    pub fn remove(&mut self, id: BodyId) -> Option<Body> {
        let removed = self.bodies.remove(&id)?;
        for body in self.bodies.values_mut() {
            if body.carried_by == Some(id) {
                body.carried_by = None;
            }
        }
        debug!(body = %id, tag = %removed.tag, "body removed");
        Some(removed)
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(&id)
    }

    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.values()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Move `id` to `position`, dragging every body it carries by the same
    /// displacement. Returns `false` for an unknown body.
    pub fn set_position(&mut self, id: BodyId, position: Vec2) -> bool {
        let Some(body) = self.bodies.get_mut(&id) else {
            return false;
        };
        let delta = position - body.position;
        body.position = position;
        for carried in self.bodies.values_mut() {
            if carried.carried_by == Some(id) {
                carried.position += delta;
            }
        }
        true
    }

    /// Bodies currently attached to `carrier`.
    pub fn carried_by(&self, carrier: BodyId) -> Vec<BodyId> {
        self.bodies
            .values()
            .filter(|b| b.carried_by == Some(carrier))
            .map(|b| b.id)
            .collect()
    }

    /// Apply one effect. Effects naming bodies that no longer exist are
    /// ignored and reported as `false`.
    pub fn apply(&mut self, effect: &SceneEffect) -> bool {
        match effect {
            SceneEffect::Remove(id) => self.remove(*id).is_some(),
            SceneEffect::Attach { body, carrier } => {
                if body == carrier || !self.bodies.contains_key(carrier) {
                    return false;
                }
                match self.bodies.get_mut(body) {
                    Some(b) => {
                        b.carried_by = Some(*carrier);
                        debug!(body = %body, carrier = %carrier, "body attached");
                        true
                    }
                    None => false,
                }
            }
            SceneEffect::RemoveCarried { carrier, tag } => {
                let doomed: Vec<BodyId> = self
                    .bodies
                    .values()
                    .filter(|b| b.carried_by == Some(*carrier) && &b.tag == tag)
                    .map(|b| b.id)
                    .collect();
                for id in &doomed {
                    self.bodies.remove(id);
                }
                debug!(carrier = %carrier, removed = doomed.len(), "carried bodies disposed");
                !doomed.is_empty()
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Swept circle queries
// ────────────────────────────────────────────────────────────────────────────

impl ShapeCast for Scene {
    fn circle_cast_all(
        &self,
        origin: Vec2,
        radius: f32,
        direction: Vec2,
        max_distance: f32,
    ) -> Vec<SensorHit> {
        let dir = direction.try_normalize();
        self.bodies
            .values()
            .filter(|b| b.carried_by.is_none())
            .filter_map(|b| sweep(origin, radius, dir, max_distance, b))
            .collect()
    }
}

/// First contact between a circle of `radius` swept from `origin` along the
/// unit vector `dir` and `body`. `dir == None` is a pure overlap test.
fn sweep(
    origin: Vec2,
    radius: f32,
    dir: Option<Vec2>,
    max_distance: f32,
    body: &Body,
) -> Option<SensorHit> {
    let reach = radius.max(0.0) + body.radius;
    let offset = origin - body.position;
    let c = offset.dot(offset) - reach * reach;

    let distance = if c <= 0.0 {
        0.0
    } else {
        let d = dir?;
        let b = offset.dot(d);
        if b > 0.0 {
            return None;
        }
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let t = -b - disc.sqrt();
        if t > max_distance {
            return None;
        }
        t.max(0.0)
    };

    let centre = match dir {
        Some(d) => origin + d * distance,
        None => origin,
    };
    let point = match (centre - body.position).try_normalize() {
        Some(n) => body.position + n * body.radius,
        None => body.position,
    };

    Some(SensorHit {
        body: body.id,
        tag: body.tag.clone(),
        point,
        distance,
        body_position: body.position,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn cast_reports_distance_to_first_contact() {
        let mut scene = Scene::new();
        let crate_id = scene.spawn(Vec2::new(3.0, 0.0), 0.5, ObstacleTag::from("Crate"));

        let hits = scene.circle_cast_all(Vec2::ZERO, 0.5, Vec2::new(1.0, 0.0), 5.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].body, crate_id);
        assert!((hits[0].distance - 2.0).abs() < EPS);
        assert!((hits[0].point.x - 2.5).abs() < EPS);
    }

    #[test]
    fn cast_misses_bodies_behind_beside_or_beyond_range() {
        let mut scene = Scene::new();
        scene.spawn(Vec2::new(-3.0, 0.0), 0.5, ObstacleTag::from("Behind"));
        scene.spawn(Vec2::new(2.0, 3.0), 0.5, ObstacleTag::from("Beside"));
        scene.spawn(Vec2::new(9.0, 0.0), 0.5, ObstacleTag::from("Far"));

        let hits = scene.circle_cast_all(Vec2::ZERO, 0.5, Vec2::new(1.0, 0.0), 5.0);
        assert!(hits.is_empty(), "unexpected hits: {hits:?}");
    }

    #[test]
    fn overlapping_body_is_hit_at_zero_distance() {
        let mut scene = Scene::new();
        scene.spawn(Vec2::new(0.2, 0.0), 0.25, ObstacleTag::Debris);

        let hits = scene.circle_cast_all(Vec2::ZERO, 0.25, Vec2::new(0.0, 1.0), 1.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].distance, 0.0);
    }

    #[test]
    fn zero_direction_is_an_overlap_test() {
        let mut scene = Scene::new();
        scene.spawn(Vec2::new(0.3, 0.0), 0.25, ObstacleTag::Debris);
        scene.spawn(Vec2::new(2.0, 0.0), 0.25, ObstacleTag::Debris);

        let hits = scene.circle_cast_all(Vec2::ZERO, 0.25, Vec2::ZERO, 5.0);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn carried_bodies_follow_carrier_and_are_not_cast() {
        let mut scene = Scene::new();
        let robot = scene.spawn(Vec2::ZERO, 0.25, ObstacleTag::Robot);
        let bag = scene.spawn(Vec2::new(0.5, 0.0), 0.1, ObstacleTag::Unattended);

        assert!(scene.apply(&SceneEffect::Attach { body: bag, carrier: robot }));
        assert!(scene.set_position(robot, Vec2::new(1.0, 1.0)));
        assert_eq!(scene.body(bag).map(|b| b.position), Some(Vec2::new(1.5, 1.0)));
        assert_eq!(scene.carried_by(robot), vec![bag]);

        let hits = scene.circle_cast_all(Vec2::new(0.0, 1.0), 0.1, Vec2::new(1.0, 0.0), 5.0);
        assert!(hits.iter().all(|h| h.body != bag));
    }

    #[test]
    fn remove_carried_only_disposes_matching_tag() {
        let mut scene = Scene::new();
        let robot = scene.spawn(Vec2::ZERO, 0.25, ObstacleTag::Robot);
        let bag = scene.spawn(Vec2::new(0.5, 0.0), 0.1, ObstacleTag::Unattended);
        let tool = scene.spawn(Vec2::new(0.0, 0.5), 0.1, ObstacleTag::from("Tool"));
        scene.apply(&SceneEffect::Attach { body: bag, carrier: robot });
        scene.apply(&SceneEffect::Attach { body: tool, carrier: robot });

        assert!(scene.apply(&SceneEffect::RemoveCarried {
            carrier: robot,
            tag: ObstacleTag::Unattended,
        }));
        assert!(scene.body(bag).is_none());
        assert!(scene.body(tool).is_some());
    }

    #[test]
    fn effects_on_missing_bodies_are_ignored() {
        let mut scene = Scene::new();
        let robot = scene.spawn(Vec2::ZERO, 0.25, ObstacleTag::Robot);
        assert!(!scene.apply(&SceneEffect::Remove(BodyId(404))));
        assert!(!scene.apply(&SceneEffect::Attach {
            body: BodyId(404),
            carrier: robot,
        }));
        assert!(!scene.apply(&SceneEffect::Attach { body: robot, carrier: robot }));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn removing_a_carrier_drops_its_load_in_place() {
        let mut scene = Scene::new();
        let robot = scene.spawn(Vec2::ZERO, 0.25, ObstacleTag::Robot);
        let bag = scene.spawn(Vec2::new(0.5, 0.0), 0.1, ObstacleTag::Unattended);
        scene.apply(&SceneEffect::Attach { body: bag, carrier: robot });

        scene.remove(robot);
        assert_eq!(scene.body(bag).and_then(|b| b.carried_by), None);
    }
}
