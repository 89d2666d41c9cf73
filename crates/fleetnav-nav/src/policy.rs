//! Tunable navigation policy.
//!
//! Every constant the control loop depends on lives here so deployments can
//! override them from the `[policy]` table of the fleet configuration file.
//! Missing keys fall back to the defaults below.
//!
//! | Key | Default | Meaning |
//! |---|---|---|
//! | `arrival_epsilon` | `0.02` | Distance under which a waypoint counts as reached |
//! | `telemetry_interval_secs` | `1.0` | Simulated seconds between tracking snapshots |
//! | `detour.side_offset` | `0.2` | Lateral step of a side-step bypass |
//! | `detour.clearance` | `0.5` | Minimum separation kept from an avoided obstacle |
//! | `requests.timeout_secs` | `30.0` | Time before an unanswered path request is re-sent (`0` = never) |
//! | `requests.max_retries` | `3` | Re-sends before the pending request is abandoned |
//! | `cleaner.*` | see [`CleanerPolicy`] | Debris removal routine |
//! | `security.*` | see [`SecurityPolicy`] | Unattended item interdiction routine |

use fleetnav_types::{FleetError, FleetResult, Vec2};
use serde::{Deserialize, Serialize};

/// Top-level navigation policy shared by every agent of a fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavPolicy {
    #[serde(default = "default_arrival_epsilon")]
    pub arrival_epsilon: f32,

    #[serde(default = "default_telemetry_interval")]
    pub telemetry_interval_secs: f32,

    #[serde(default)]
    pub detour: DetourPolicy,

    #[serde(default)]
    pub requests: RequestPolicy,

    #[serde(default)]
    pub cleaner: CleanerPolicy,

    #[serde(default)]
    pub security: SecurityPolicy,
}

/// Geometry of the lateral side-step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetourPolicy {
    #[serde(default = "default_side_offset")]
    pub side_offset: f32,
    #[serde(default = "default_clearance")]
    pub clearance: f32,
}

/// Retry behaviour for unanswered path requests.
///
/// `timeout_secs = 0` waits forever, which stalls the agent in
/// `PendingRequest` until a response arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestPolicy {
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: f32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanerPolicy {
    /// Debris closer than this (centre to centre) is cleaned.
    #[serde(default = "default_clean_proximity")]
    pub clean_proximity: f32,
    #[serde(default = "default_clean_duration")]
    pub clean_duration_secs: f32,
    /// Side-step unattended items after reporting them instead of stopping.
    #[serde(default = "default_true")]
    pub bypass_unattended: bool,
    #[serde(default)]
    pub reset_ledger_on_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    /// Unattended items closer than this are picked up.
    #[serde(default = "default_pickup_proximity")]
    pub pickup_proximity: f32,
    #[serde(default = "default_pickup_duration")]
    pub pickup_duration_secs: f32,
    /// Secure location carried items are delivered to.
    #[serde(default = "default_drop_off")]
    pub drop_off: Vec2,
    #[serde(default = "default_drop_off_proximity")]
    pub drop_off_proximity: f32,
    #[serde(default = "default_disposal_duration")]
    pub disposal_duration_secs: f32,
    #[serde(default = "default_true")]
    pub reset_ledger_on_complete: bool,
}

fn default_arrival_epsilon() -> f32 {
    0.02
}
fn default_telemetry_interval() -> f32 {
    1.0
}
fn default_side_offset() -> f32 {
    0.2
}
fn default_clearance() -> f32 {
    0.5
}
fn default_request_timeout() -> f32 {
    30.0
}
fn default_max_retries() -> u32 {
    3
}
fn default_clean_proximity() -> f32 {
    0.1
}
fn default_clean_duration() -> f32 {
    2.0
}
fn default_pickup_proximity() -> f32 {
    0.5
}
fn default_pickup_duration() -> f32 {
    2.0
}
fn default_drop_off() -> Vec2 {
    Vec2::new(9.0, 1.0)
}
fn default_drop_off_proximity() -> f32 {
    0.5
}
fn default_disposal_duration() -> f32 {
    1.0
}
fn default_true() -> bool {
    true
}

impl Default for NavPolicy {
    fn default() -> Self {
        Self {
            arrival_epsilon: default_arrival_epsilon(),
            telemetry_interval_secs: default_telemetry_interval(),
            detour: DetourPolicy::default(),
            requests: RequestPolicy::default(),
            cleaner: CleanerPolicy::default(),
            security: SecurityPolicy::default(),
        }
    }
}

impl Default for DetourPolicy {
    fn default() -> Self {
        Self {
            side_offset: default_side_offset(),
            clearance: default_clearance(),
        }
    }
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self {
            timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for CleanerPolicy {
    fn default() -> Self {
        Self {
            clean_proximity: default_clean_proximity(),
            clean_duration_secs: default_clean_duration(),
            bypass_unattended: true,
            reset_ledger_on_complete: false,
        }
    }
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            pickup_proximity: default_pickup_proximity(),
            pickup_duration_secs: default_pickup_duration(),
            drop_off: default_drop_off(),
            drop_off_proximity: default_drop_off_proximity(),
            disposal_duration_secs: default_disposal_duration(),
            reset_ledger_on_complete: true,
        }
    }
}

impl RequestPolicy {
    /// The effective timeout, `None` when timeouts are disabled.
    pub fn timeout(&self) -> Option<f32> {
        (self.timeout_secs > 0.0).then_some(self.timeout_secs)
    }
}

impl NavPolicy {
    /// Reject values the control loop cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Config`] naming the first offending key.
    pub fn validate(&self) -> FleetResult<()> {
        let positive = |key: &str, value: f32| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(FleetError::Config(format!("{key} must be positive, got {value}")))
            }
        };
        let non_negative = |key: &str, value: f32| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(FleetError::Config(format!("{key} must not be negative, got {value}")))
            }
        };

        positive("arrival_epsilon", self.arrival_epsilon)?;
        positive("telemetry_interval_secs", self.telemetry_interval_secs)?;
        non_negative("detour.side_offset", self.detour.side_offset)?;
        positive("detour.clearance", self.detour.clearance)?;
        non_negative("requests.timeout_secs", self.requests.timeout_secs)?;
        non_negative("cleaner.clean_proximity", self.cleaner.clean_proximity)?;
        non_negative("cleaner.clean_duration_secs", self.cleaner.clean_duration_secs)?;
        non_negative("security.pickup_proximity", self.security.pickup_proximity)?;
        non_negative("security.pickup_duration_secs", self.security.pickup_duration_secs)?;
        non_negative("security.drop_off_proximity", self.security.drop_off_proximity)?;
        non_negative(
            "security.disposal_duration_secs",
            self.security.disposal_duration_secs,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let policy = NavPolicy::default();
        assert_eq!(policy.arrival_epsilon, 0.02);
        assert_eq!(policy.detour.side_offset, 0.2);
        assert_eq!(policy.requests.timeout(), Some(30.0));
        assert_eq!(policy.security.drop_off, Vec2::new(9.0, 1.0));
        assert!(!policy.cleaner.reset_ledger_on_complete);
        assert!(policy.security.reset_ledger_on_complete);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn partial_table_keeps_other_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let policy: NavPolicy = toml::from_str(
            r#"
            arrival_epsilon = 0.05

            [cleaner]
            reset_ledger_on_complete = true

            [security]
            drop_off = { x = 1.0, y = 2.0 }
            "#,
        )?;
        assert_eq!(policy.arrival_epsilon, 0.05);
        assert!(policy.cleaner.reset_ledger_on_complete);
        assert_eq!(policy.cleaner.clean_duration_secs, 2.0);
        assert_eq!(policy.security.drop_off, Vec2::new(1.0, 2.0));
        assert_eq!(policy.security.pickup_proximity, 0.5);
        assert_eq!(policy.detour, DetourPolicy::default());
        Ok(())
    }

    #[test]
    fn empty_table_is_default() -> Result<(), Box<dyn std::error::Error>> {
        let policy: NavPolicy = toml::from_str("")?;
        assert_eq!(policy, NavPolicy::default());
        Ok(())
    }

    #[test]
    fn validate_rejects_zero_clearance() {
        let mut policy = NavPolicy::default();
        policy.detour.clearance = 0.0;
        match policy.validate() {
            Err(FleetError::Config(msg)) => assert!(msg.contains("detour.clearance")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn zero_timeout_disables_retries() {
        let mut policy = NavPolicy::default();
        policy.requests.timeout_secs = 0.0;
        assert!(policy.validate().is_ok());
        assert_eq!(policy.requests.timeout(), None);
        policy.requests.timeout_secs = -1.0;
        assert!(policy.validate().is_err());
    }
}
