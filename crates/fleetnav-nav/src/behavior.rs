//! Subtype behavior policies.
//!
//! Every agent carries exactly one [`Behavior`], chosen from its subtype tag
//! at spawn and never changed afterwards.  The generic control loop in
//! [`Agent`](crate::agent::Agent) calls into it at two points:
//!
//! | Hook | When | Purpose |
//! |---|---|---|
//! | [`Behavior::handle_special_obstacle`] | nearest qualifying hit found | Claim the obstacle or leave it to the generic report-and-stop |
//! | [`Behavior::update_task`] | a task routine is active | Drive the routine for one tick |
//!
//! Timed routines are plain state with a remaining duration that is counted
//! down by the simulated frame time.
//!
//! | Subtype | Routine |
//! |---|---|
//! | `default` | none |
//! | `cleaner` | `Cleaning` debris in reach, then destroy it |
//! | `security` | `WaitingForPickup` → `Delivering` to the drop-off → `WaitingForDisposal` |

use fleetnav_perception::{SceneEffect, SensorHit};
use fleetnav_types::{AgentSubtype, BodyId, ObstacleTag};
use tracing::info;

use crate::agent::AgentCore;

/// How the subtype dealt with the nearest blocking hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    /// Not handled; the generic report-and-stop applies.
    Unclaimed,
    /// Handled; the agent keeps moving this tick.
    Proceed,
    /// Handled; the agent holds position this tick.
    Hold,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CleanerTask {
    Roaming,
    Cleaning { debris: BodyId, remaining: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SecurityTask {
    Patrolling,
    WaitingForPickup { item: BodyId, remaining: f32 },
    Delivering,
    WaitingForDisposal { remaining: f32 },
}

/// Behavior policy of one agent.
#[derive(Debug, Clone, PartialEq)]
pub enum Behavior {
    Default,
    Cleaner(CleanerTask),
    Security(SecurityTask),
}

impl Behavior {
    pub fn for_subtype(subtype: AgentSubtype) -> Self {
        match subtype {
            AgentSubtype::Default => Behavior::Default,
            AgentSubtype::Cleaner => Behavior::Cleaner(CleanerTask::Roaming),
            AgentSubtype::Security => Behavior::Security(SecurityTask::Patrolling),
        }
    }

    /// Whether a task routine currently owns the agent.
    pub fn is_performing_task(&self) -> bool {
        match self {
            Behavior::Default => false,
            Behavior::Cleaner(task) => !matches!(task, CleanerTask::Roaming),
            Behavior::Security(task) => !matches!(task, SecurityTask::Patrolling),
        }
    }

    /// Offer the nearest blocking hit to the subtype.
    pub fn handle_special_obstacle(&mut self, core: &mut AgentCore, hit: &SensorHit) -> HookOutcome {
        match self {
            Behavior::Default => HookOutcome::Unclaimed,
            Behavior::Cleaner(task) => cleaner_obstacle(task, core, hit),
            Behavior::Security(task) => security_obstacle(task, core, hit),
        }
    }

    /// Run the active routine for one tick.
    pub fn update_task(&mut self, core: &mut AgentCore, dt: f32) {
        match self {
            Behavior::Default => {}
            Behavior::Cleaner(task) => cleaner_update(task, core, dt),
            Behavior::Security(task) => security_update(task, core, dt),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Cleaner
// ────────────────────────────────────────────────────────────────────────────

fn cleaner_obstacle(task: &mut CleanerTask, core: &mut AgentCore, hit: &SensorHit) -> HookOutcome {
    match hit.tag {
        ObstacleTag::Debris => {
            let policy = &core.policy.cleaner;
            if core.position.distance(hit.body_position) < policy.clean_proximity {
                if matches!(task, CleanerTask::Roaming) {
                    info!(agent = %core.id, debris = %hit.body, at = %hit.body_position, "cleaning debris");
                    *task = CleanerTask::Cleaning {
                        debris: hit.body,
                        remaining: policy.clean_duration_secs,
                    };
                }
                HookOutcome::Hold
            } else {
                HookOutcome::Proceed
            }
        }
        ObstacleTag::Unattended => {
            core.report_obstacle(hit);
            if core.policy.cleaner.bypass_unattended && core.try_detour(hit) {
                HookOutcome::Proceed
            } else {
                HookOutcome::Unclaimed
            }
        }
        _ => HookOutcome::Unclaimed,
    }
}

fn cleaner_update(task: &mut CleanerTask, core: &mut AgentCore, dt: f32) {
    let CleanerTask::Cleaning { debris, remaining } = task else {
        return;
    };
    core.obstacle_detected = true;
    *remaining -= dt;
    if *remaining > 0.0 {
        return;
    }

    info!(agent = %core.id, debris = %debris, "debris cleaned");
    core.emit(SceneEffect::Remove(*debris));
    if core.policy.cleaner.reset_ledger_on_complete {
        core.ledger.reset();
    }
    core.obstacle_detected = false;
    *task = CleanerTask::Roaming;
}

// ────────────────────────────────────────────────────────────────────────────
// Security
// ────────────────────────────────────────────────────────────────────────────

fn security_obstacle(task: &mut SecurityTask, core: &mut AgentCore, hit: &SensorHit) -> HookOutcome {
    if hit.tag != ObstacleTag::Unattended {
        return HookOutcome::Unclaimed;
    }
    let policy = &core.policy.security;
    if core.position.distance(hit.body_position) < policy.pickup_proximity {
        if matches!(task, SecurityTask::Patrolling) {
            info!(agent = %core.id, item = %hit.body, at = %hit.body_position, "picking up unattended item");
            *task = SecurityTask::WaitingForPickup {
                item: hit.body,
                remaining: policy.pickup_duration_secs,
            };
            core.queue.clear();
        }
        HookOutcome::Hold
    } else if core.try_detour(hit) {
        HookOutcome::Proceed
    } else {
        HookOutcome::Unclaimed
    }
}

fn security_update(task: &mut SecurityTask, core: &mut AgentCore, dt: f32) {
    core.obstacle_detected = true;
    match task {
        SecurityTask::Patrolling => core.obstacle_detected = false,
        SecurityTask::WaitingForPickup { item, remaining } => {
            *remaining -= dt;
            if *remaining > 0.0 {
                return;
            }
            let carrier = core.body;
            core.emit(SceneEffect::Attach {
                body: *item,
                carrier,
            });
            let drop_off = core.policy.security.drop_off;
            info!(agent = %core.id, item = %item, %drop_off, "item secured; delivering");
            core.request_path_to(drop_off);
            *task = SecurityTask::Delivering;
        }
        SecurityTask::Delivering => {
            if core.requests.is_pending() {
                return;
            }
            if !core.queue.is_empty() {
                core.follow_queue(dt);
                return;
            }
            let policy = &core.policy.security;
            if core.position.distance(policy.drop_off) < policy.drop_off_proximity {
                *task = SecurityTask::WaitingForDisposal {
                    remaining: policy.disposal_duration_secs,
                };
            } else {
                let drop_off = policy.drop_off;
                core.request_path_to(drop_off);
            }
        }
        SecurityTask::WaitingForDisposal { remaining } => {
            *remaining -= dt;
            if *remaining > 0.0 {
                return;
            }
            let carrier = core.body;
            core.emit(SceneEffect::RemoveCarried {
                carrier,
                tag: ObstacleTag::Unattended,
            });
            info!(agent = %core.id, at = %core.position, "carried items disposed");
            if core.policy.security.reset_ledger_on_complete {
                core.ledger.reset();
            }
            core.obstacle_detected = false;
            *task = SecurityTask::Patrolling;

            if let Some(index) = core.nearest_destination() {
                core.destination_index = index;
                let next = core.destinations[index];
                core.request_path_to(next);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtype_selects_behavior() {
        assert_eq!(Behavior::for_subtype(AgentSubtype::Default), Behavior::Default);
        assert_eq!(
            Behavior::for_subtype(AgentSubtype::Cleaner),
            Behavior::Cleaner(CleanerTask::Roaming)
        );
        assert_eq!(
            Behavior::for_subtype(AgentSubtype::Security),
            Behavior::Security(SecurityTask::Patrolling)
        );
    }

    #[test]
    fn only_active_routines_count_as_tasks() {
        assert!(!Behavior::Default.is_performing_task());
        assert!(!Behavior::Cleaner(CleanerTask::Roaming).is_performing_task());
        assert!(
            Behavior::Cleaner(CleanerTask::Cleaning {
                debris: BodyId(1),
                remaining: 1.0,
            })
            .is_performing_task()
        );
        assert!(Behavior::Security(SecurityTask::Delivering).is_performing_task());
    }
}
