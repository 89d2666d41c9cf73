//! `fleetnav-nav` – per-agent navigation and obstacle-handling control loop.
//!
//! Everything in this crate runs on the single simulation thread.  An agent
//! owns its position, path queue and ledger exclusively; the only
//! asynchronous interaction is the path request/response exchange, which is
//! correlated by agent identity.
//!
//! # Modules
//!
//! - [`agent`] – [`Agent`][agent::Agent]: spawn, per-tick control loop,
//!   response/feedback handling and tracking snapshots.
//! - [`behavior`] – [`Behavior`][behavior::Behavior]: `default`, `cleaner`
//!   and `security` task state machines.
//! - [`detour`] – [`Detour`][detour::Detour]: three-point lateral bypass and
//!   the queue splice that applies it.
//! - [`ledger`] – [`ObstacleLedger`][ledger::ObstacleLedger]: at most one
//!   report per obstacle instance.
//! - [`path_queue`] – [`PathQueue`][path_queue::PathQueue] and
//!   [`PathFollower`][path_queue::PathFollower].
//! - [`protocol`] – [`RequestTracker`][protocol::RequestTracker]: pending
//!   flag, response correlation, timeout and retry.
//! - [`telemetry`] – interval timer for tracking snapshots.
//! - [`policy`] – [`NavPolicy`][policy::NavPolicy]: every tunable constant.
//! - [`outbox`] – [`Outbox`][outbox::Outbox]: the injected outbound handle.

pub mod agent;
pub mod behavior;
pub mod detour;
pub mod ledger;
pub mod outbox;
pub mod path_queue;
pub mod policy;
pub mod protocol;
pub mod telemetry;

pub use agent::Agent;
pub use behavior::{Behavior, HookOutcome};
pub use outbox::Outbox;
pub use policy::NavPolicy;
