//! `fleetnav-perception` – what an agent can see.
//!
//! Wraps the physics engine's continuous collision query behind a narrow
//! trait so the navigation loop never depends on engine internals.
//!
//! # Modules
//!
//! - [`sensor`] – [`ShapeCast`][sensor::ShapeCast] boundary trait and the
//!   per-agent [`PerceptionSensor`][sensor::PerceptionSensor] that returns
//!   hits sorted by distance with the agent's own body filtered out.
//! - [`scene`] – [`Scene`][scene::Scene]: headless set of circular bodies
//!   implementing `ShapeCast`, plus the [`SceneEffect`][scene::SceneEffect]s
//!   task routines use to destroy, pick up and dispose of objects.

pub mod scene;
pub mod sensor;

pub use scene::{Body, Scene, SceneEffect};
pub use sensor::{PerceptionSensor, SensorHit, ShapeCast};
