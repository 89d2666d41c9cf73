//! Fleet configuration – reads `fleetnav.toml`.
//!
//! Every table is optional; a missing file yields the defaults.  A minimal
//! scenario looks like:
//!
//! ```toml
//! [simulation]
//! tick_secs = 0.05
//! duration_secs = 30.0
//!
//! [[obstacles]]
//! x = 4.0
//! y = 0.0
//! radius = 0.2
//! tag = "DirtObstacle"
//!
//! [[robots]]
//! robot_id = 1
//! robot_type = "cleaner"
//! start_x = 0.0
//! start_y = 0.0
//! end_x = 8.0
//! end_y = 0.0
//! move_speed = 1.5
//! perception_radius = 0.4
//! obstacle_distance_threshold = 1.0
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use fleetnav_nav::NavPolicy;
use fleetnav_runtime::{DEFAULT_AGENT_RADIUS, LoggingConfig, SimPlannerConfig};
use fleetnav_types::{FleetError, FleetResult, ObstacleTag, SpawnCommand, Vec2};
use serde::{Deserialize, Serialize};

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "fleetnav.toml";

/// The `[simulation]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Simulated seconds per frame.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: f32,

    /// Total simulated time before the run stops.
    #[serde(default = "default_duration_secs")]
    pub duration_secs: f32,

    #[serde(default = "default_agent_radius")]
    pub agent_radius: f32,

    /// Pace frames against the wall clock instead of running flat out.
    #[serde(default)]
    pub realtime: bool,
}

fn default_tick_secs() -> f32 {
    0.05
}
fn default_duration_secs() -> f32 {
    60.0
}
fn default_agent_radius() -> f32 {
    DEFAULT_AGENT_RADIUS
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            duration_secs: default_duration_secs(),
            agent_radius: default_agent_radius(),
            realtime: false,
        }
    }
}

impl SimulationConfig {
    /// Number of frames needed to cover `duration_secs`.
    pub fn frames(&self) -> u64 {
        (self.duration_secs / self.tick_secs).ceil().max(0.0) as u64
    }
}

/// One `[[obstacles]]` entry: a static body placed in the scene at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleConfig {
    pub x: f32,
    pub y: f32,
    #[serde(default = "default_obstacle_radius")]
    pub radius: f32,
    pub tag: ObstacleTag,
}

fn default_obstacle_radius() -> f32 {
    0.25
}

impl ObstacleConfig {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Complete contents of `fleetnav.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub policy: NavPolicy,

    #[serde(default)]
    pub planner: SimPlannerConfig,

    #[serde(default)]
    pub obstacles: Vec<ObstacleConfig>,

    /// Spawn commands published to the fleet once it is ready.
    #[serde(default)]
    pub robots: Vec<SpawnCommand>,
}

impl FleetConfig {
    /// Reject values the control loop cannot run with.
    ///
    /// # Errors
    ///
    /// [`FleetError::Config`] naming the offending key, or the spawn error of
    /// the first malformed `[[robots]]` entry.
    pub fn validate(&self) -> FleetResult<()> {
        let sim = &self.simulation;
        if !(sim.tick_secs.is_finite() && sim.tick_secs > 0.0) {
            return Err(FleetError::Config(format!(
                "simulation.tick_secs must be positive, got {}",
                sim.tick_secs
            )));
        }
        if !(sim.duration_secs.is_finite() && sim.duration_secs >= 0.0) {
            return Err(FleetError::Config(format!(
                "simulation.duration_secs must not be negative, got {}",
                sim.duration_secs
            )));
        }
        if !(sim.agent_radius.is_finite() && sim.agent_radius >= 0.0) {
            return Err(FleetError::Config(format!(
                "simulation.agent_radius must not be negative, got {}",
                sim.agent_radius
            )));
        }
        self.policy.validate()?;
        self.planner.validate()?;

        for (i, obstacle) in self.obstacles.iter().enumerate() {
            if !(obstacle.radius.is_finite() && obstacle.radius > 0.0) {
                return Err(FleetError::Config(format!(
                    "obstacles[{i}].radius must be positive, got {}",
                    obstacle.radius
                )));
            }
        }
        for robot in &self.robots {
            robot.validate()?;
        }
        Ok(())
    }
}

/// Load the config from `path`, apply environment overrides and validate.
///
/// A missing file is not an error: the defaults are used.
pub fn load_from(path: &Path) -> FleetResult<FleetConfig> {
    let mut cfg = if path.exists() {
        let raw = fs::read_to_string(path).map_err(|e| {
            FleetError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&raw).map_err(|e| {
            FleetError::Config(format!("failed to parse {}: {e}", path.display()))
        })?
    } else {
        FleetConfig::default()
    };
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

/// `--config` if given, otherwise [`DEFAULT_CONFIG_FILE`].
pub fn resolve_path(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Apply `FLEETNAV_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `FLEETNAV_TICK_SECS` | `simulation.tick_secs` |
/// | `FLEETNAV_DURATION_SECS` | `simulation.duration_secs` |
/// | `FLEETNAV_LOG_LEVEL` | `logging.level` |
///
/// Values that do not parse are ignored.  `FLEETNAV_LOG_FORMAT` is read by
/// [`fleetnav_runtime::init_tracing`] itself.
pub fn apply_env_overrides(cfg: &mut FleetConfig) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

/// Override logic behind [`apply_env_overrides`], with the variable lookup
/// passed in.
pub(crate) fn apply_overrides(cfg: &mut FleetConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("FLEETNAV_TICK_SECS")
        && let Ok(secs) = v.trim().parse::<f32>()
    {
        cfg.simulation.tick_secs = secs;
    }
    if let Some(v) = lookup("FLEETNAV_DURATION_SECS")
        && let Ok(secs) = v.trim().parse::<f32>()
    {
        cfg.simulation.duration_secs = secs;
    }
    if let Some(v) = lookup("FLEETNAV_LOG_LEVEL")
        && !v.trim().is_empty()
    {
        cfg.logging.level = v.trim().to_string();
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use fleetnav_runtime::LogFormat;
    use fleetnav_types::AgentId;

    use super::*;

    const SCENARIO: &str = r#"
[simulation]
tick_secs = 0.1
duration_secs = 12.0

[logging]
format = "json"

[policy.cleaner]
bypass_unattended = false

[planner]
latency_secs = 0.5

[[obstacles]]
x = 4.0
y = 0.0
radius = 0.2
tag = "DirtObstacle"

[[obstacles]]
x = 6.0
y = 1.0
tag = "Pallet"

[[robots]]
robot_id = 7
robot_type = "cleaner"
start_x = 0.0
start_y = 0.0
end_x = 8.0
end_y = 0.0
path_x = [8.0, 0.0]
path_y = [0.0, 0.0]
loop = true
move_speed = 1.5
perception_radius = 0.4
obstacle_distance_threshold = 1.0
"#;

    fn write_config(contents: &str) -> Result<tempfile::NamedTempFile, Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(contents.as_bytes())?;
        Ok(file)
    }

    #[test]
    fn scenario_file_parses_every_table() -> Result<(), Box<dyn std::error::Error>> {
        let file = write_config(SCENARIO)?;
        let cfg = load_from(file.path())?;

        assert_eq!(cfg.simulation.frames(), 120);
        assert_eq!(cfg.simulation.agent_radius, DEFAULT_AGENT_RADIUS);
        assert_eq!(cfg.logging.format, LogFormat::Json);
        assert!(!cfg.policy.cleaner.bypass_unattended);
        assert_eq!(cfg.planner.latency_secs, 0.5);

        assert_eq!(cfg.obstacles.len(), 2);
        assert_eq!(cfg.obstacles[0].tag, ObstacleTag::Debris);
        assert_eq!(cfg.obstacles[1].tag, ObstacleTag::Other("Pallet".to_string()));
        assert_eq!(cfg.obstacles[1].radius, 0.25);

        let robot = &cfg.robots[0];
        assert_eq!(robot.robot_id, AgentId(7));
        assert!(robot.loop_route);
        assert_eq!(robot.destinations()?.len(), 2);
        Ok(())
    }

    #[test]
    fn missing_file_yields_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let cfg = load_from(&dir.path().join("absent.toml"))?;
        assert!(cfg.robots.is_empty());
        assert_eq!(cfg.policy, NavPolicy::default());
        Ok(())
    }

    #[test]
    fn malformed_toml_is_a_config_error() -> Result<(), Box<dyn std::error::Error>> {
        let file = write_config("[simulation\ntick_secs = ")?;
        assert!(matches!(load_from(file.path()), Err(FleetError::Config(_))));
        Ok(())
    }

    #[test]
    fn invalid_values_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let file = write_config("[simulation]\ntick_secs = 0.0\n")?;
        let err = load_from(file.path()).expect_err("zero tick must fail");
        assert!(err.to_string().contains("simulation.tick_secs"));

        let file = write_config("[policy.detour]\nclearance = -1.0\n")?;
        let err = load_from(file.path()).expect_err("negative clearance must fail");
        assert!(err.to_string().contains("detour.clearance"));

        let file = write_config("[[obstacles]]\nx = 0.0\ny = 0.0\nradius = 0.0\ntag = \"Crate\"\n")?;
        let err = load_from(file.path()).expect_err("zero radius must fail");
        assert!(err.to_string().contains("obstacles[0].radius"));
        Ok(())
    }

    #[test]
    fn planner_table_is_validated() -> Result<(), Box<dyn std::error::Error>> {
        let file = write_config("[planner]\nwaypoint_spacing = 0.0\n")?;
        let err = load_from(file.path()).expect_err("zero spacing must fail");
        assert!(err.to_string().contains("planner.waypoint_spacing"));

        let file = write_config("[planner]\nlatency_secs = -1.0\n")?;
        let err = load_from(file.path()).expect_err("negative latency must fail");
        assert!(err.to_string().contains("planner.latency_secs"));
        Ok(())
    }

    #[test]
    fn malformed_robot_entry_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let broken = SCENARIO.replace("robot_type = \"cleaner\"", "robot_type = \"janitor\"");
        let file = write_config(&broken)?;
        assert!(matches!(
            load_from(file.path()),
            Err(FleetError::UnknownSubtype(_))
        ));
        Ok(())
    }

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn overrides_change_timing() {
        let mut cfg = FleetConfig::default();
        apply_overrides(
            &mut cfg,
            env(&[("FLEETNAV_TICK_SECS", "0.2"), ("FLEETNAV_DURATION_SECS", " 4 ")]),
        );
        assert_eq!(cfg.simulation.tick_secs, 0.2);
        assert_eq!(cfg.simulation.duration_secs, 4.0);
    }

    #[test]
    fn overrides_ignore_invalid_numbers() {
        let mut cfg = FleetConfig::default();
        apply_overrides(&mut cfg, env(&[("FLEETNAV_DURATION_SECS", "forever")]));
        assert_eq!(cfg.simulation.duration_secs, default_duration_secs());
    }

    #[test]
    fn overrides_change_log_level() {
        let mut cfg = FleetConfig::default();
        apply_overrides(&mut cfg, env(&[("FLEETNAV_LOG_LEVEL", "debug")]));
        assert_eq!(cfg.logging.level, "debug");

        apply_overrides(&mut cfg, env(&[("FLEETNAV_LOG_LEVEL", "  ")]));
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn default_path_is_in_working_directory() {
        assert_eq!(resolve_path(None), PathBuf::from("fleetnav.toml"));
        assert_eq!(
            resolve_path(Some(PathBuf::from("/tmp/x.toml"))),
            PathBuf::from("/tmp/x.toml")
        );
    }
}
