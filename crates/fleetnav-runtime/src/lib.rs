//! `fleetnav-runtime` – runs a fleet of navigation agents.
//!
//! The navigation crates decide what each agent does in a frame; this crate
//! owns the frame itself and everything around it.
//!
//! # Modules
//!
//! - [`fleet`] – [`Fleet`][fleet::Fleet]: owns the [`Scene`][fleetnav_perception::Scene]
//!   and every [`Agent`][fleetnav_nav::Agent], drains spawn commands and
//!   planner traffic from the bus, ticks agents in id order and applies the
//!   scene effects they emit.
//! - [`simulation`] – [`Simulation`][simulation::Simulation]: the frame
//!   driver.  Steps the planner stand-in and the fleet, collects tracking
//!   snapshots and obstacle reports, and runs either as fast as possible or
//!   paced against wall-clock time.
//! - [`sim_planner`] – [`SimPathPlanner`][sim_planner::SimPathPlanner]:
//!   straight-line planner with simulated latency, used when no real
//!   planner is on the bus.
//! - [`outbox`] – [`BusOutbox`][outbox::BusOutbox]: the
//!   [`Outbox`][fleetnav_nav::Outbox] agents publish through.
//! - [`logging`] – [`init_tracing`][logging::init_tracing]: installs the
//!   global `tracing` subscriber with an optional OTLP span exporter.  Set
//!   `OTEL_EXPORTER_OTLP_ENDPOINT` to enable export.

pub mod fleet;
pub mod logging;
pub mod outbox;
pub mod sim_planner;
pub mod simulation;

pub use fleet::{DEFAULT_AGENT_RADIUS, Fleet};
pub use logging::{LogFormat, LoggingConfig, TracerProviderGuard, init_tracing};
pub use outbox::BusOutbox;
pub use sim_planner::{Bounds, SimPathPlanner, SimPlannerConfig};
pub use simulation::{RunOptions, Simulation, SimulationStats};
