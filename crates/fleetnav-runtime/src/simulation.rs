//! Frame driver tying the fleet to the planner stand-in.
//!
//! [`Simulation::step`] runs one frame in this order: planner first (so
//! answers published this frame are drained by the fleet immediately), then
//! the fleet, then the outbound status and obstacle topics are collected.
//!
//! [`Simulation::run`] repeats that until a frame limit or a shutdown flag,
//! optionally paced against wall-clock time with a Tokio interval.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use fleetnav_middleware::{Topic, TopicReceiver};
use fleetnav_types::{EventPayload, ObstacleReport, TrackingSnapshot};
use tracing::{info, instrument};

use crate::fleet::Fleet;
use crate::sim_planner::SimPathPlanner;

/// How [`Simulation::run`] advances time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    pub tick_secs: f32,
    pub max_frames: u64,
    /// Sleep between frames so one simulated second takes one real second.
    pub realtime: bool,
}

/// Totals collected while running.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationStats {
    pub frames: u64,
    pub elapsed_secs: f32,
    pub snapshots: usize,
    pub reports: Vec<ObstacleReport>,
}

pub struct Simulation {
    fleet: Fleet,
    planner: Option<SimPathPlanner>,
    status: TopicReceiver,
    obstacle_reports: TopicReceiver,
    stats: SimulationStats,
}

impl Simulation {
    /// Wrap `fleet`; pass `None` for `planner` when a real planner serves
    /// the bus.
    pub fn new(fleet: Fleet, planner: Option<SimPathPlanner>) -> Self {
        let status = fleet.bus().subscribe_to(Topic::FleetStatus);
        let obstacle_reports = fleet.bus().subscribe_to(Topic::ObstacleReports);
        Self {
            fleet,
            planner,
            status,
            obstacle_reports,
            stats: SimulationStats::default(),
        }
    }

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    pub fn fleet_mut(&mut self) -> &mut Fleet {
        &mut self.fleet
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Run one frame and return the tracking snapshots it produced.
    pub fn step(&mut self, dt: f32) -> Vec<TrackingSnapshot> {
        if let Some(planner) = self.planner.as_mut() {
            planner.step(dt);
        }
        self.fleet.step(dt);

        self.stats.frames += 1;
        self.stats.elapsed_secs += dt;
        self.stats.reports.extend(
            self.obstacle_reports
                .drain()
                .into_iter()
                .filter_map(|e| match e.payload {
                    EventPayload::ObstacleReport(report) => Some(report),
                    _ => None,
                }),
        );

        let snapshots: Vec<TrackingSnapshot> = self
            .status
            .drain()
            .into_iter()
            .filter_map(|e| match e.payload {
                EventPayload::Tracking(snapshot) => Some(snapshot),
                _ => None,
            })
            .collect();
        self.stats.snapshots += snapshots.len();
        snapshots
    }

    /// Step until `options.max_frames` or until `shutdown` is set.
    ///
    /// `on_snapshot` sees every tracking snapshot as it is produced.
    #[instrument(name = "simulation", skip_all, fields(tick_secs = options.tick_secs))]
    pub async fn run(
        &mut self,
        options: RunOptions,
        shutdown: Arc<AtomicBool>,
        mut on_snapshot: impl FnMut(&TrackingSnapshot),
    ) -> SimulationStats {
        info!(agents = self.fleet.len(), max_frames = options.max_frames, "simulation started");

        let mut pacer = options
            .realtime
            .then(|| tokio::time::interval(Duration::from_secs_f32(options.tick_secs.max(0.001))));

        for _ in 0..options.max_frames {
            if shutdown.load(Ordering::SeqCst) {
                info!("shutdown requested");
                break;
            }
            match pacer.as_mut() {
                Some(interval) => {
                    interval.tick().await;
                }
                None => tokio::task::yield_now().await,
            }
            for snapshot in self.step(options.tick_secs) {
                on_snapshot(&snapshot);
            }
        }

        info!(
            frames = self.stats.frames,
            elapsed = self.stats.elapsed_secs,
            reports = self.stats.reports.len(),
            "simulation finished"
        );
        self.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use fleetnav_middleware::EventBus;
    use fleetnav_nav::NavPolicy;
    use fleetnav_perception::Scene;
    use fleetnav_types::{AgentId, ObstacleTag, SpawnCommand, TaskState, Vec2};

    use super::*;
    use crate::sim_planner::SimPlannerConfig;

    fn command(id: i32, subtype: &str, start: (f32, f32), end: (f32, f32)) -> SpawnCommand {
        SpawnCommand {
            robot_id: AgentId(id),
            robot_type: subtype.to_string(),
            start_x: start.0,
            start_y: start.1,
            end_x: end.0,
            end_y: end.1,
            path_x: vec![],
            path_y: vec![],
            loop_route: false,
            move_speed: 2.0,
            perception_radius: 0.5,
            obstacle_distance_threshold: 2.0,
        }
    }

    fn simulation(scene: Scene) -> Simulation {
        let bus = EventBus::default();
        let fleet = Fleet::new(bus.clone(), scene, NavPolicy::default());
        let planner = SimPathPlanner::new(bus, SimPlannerConfig::default());
        Simulation::new(fleet, Some(planner))
    }

    #[test]
    fn agent_reaches_its_target_through_the_planner() {
        let mut sim = simulation(Scene::new());
        sim.fleet_mut()
            .spawn(&command(1, "default", (0.0, 0.0), (3.0, 0.0)))
            .expect("spawn");

        for _ in 0..50 {
            sim.step(0.1);
        }

        let agent = sim.fleet().agent(AgentId(1)).expect("agent");
        assert!(agent.position().distance(Vec2::new(3.0, 0.0)) < 0.02);
        assert_eq!(agent.task_state(), TaskState::Idle);
        assert!(sim.stats().snapshots >= 4);
    }

    #[test]
    fn blocked_agent_reports_once() {
        let mut scene = Scene::new();
        scene.spawn(Vec2::new(2.0, 0.0), 0.3, ObstacleTag::from("Crate"));
        let mut sim = simulation(scene);
        sim.fleet_mut()
            .spawn(&command(1, "default", (0.0, 0.0), (4.0, 0.0)))
            .expect("spawn");

        for _ in 0..100 {
            sim.step(0.1);
        }

        assert_eq!(sim.stats().reports.len(), 1);
        assert_eq!(sim.stats().reports[0].obstacle_tag, "Crate");
        let agent = sim.fleet().agent(AgentId(1)).expect("agent");
        assert!(agent.obstacle_detected());
        assert!(agent.position().x < 2.0);
    }

    #[test]
    fn security_agent_disposes_unattended_item() {
        let mut scene = Scene::new();
        let item = scene.spawn(Vec2::new(2.0, 0.0), 0.1, ObstacleTag::Unattended);
        let mut sim = simulation(scene);
        sim.fleet_mut()
            .spawn(&command(1, "security", (0.0, 0.0), (5.0, 0.0)))
            .expect("spawn");

        for _ in 0..300 {
            sim.step(0.1);
        }

        assert!(sim.fleet().scene().body(item).is_none());
        let agent = sim.fleet().agent(AgentId(1)).expect("agent");
        assert!(agent.position().distance(Vec2::new(9.0, 1.0)) < 0.5);
        assert_eq!(agent.task_state(), TaskState::Idle);
    }

    #[tokio::test]
    async fn run_stops_at_frame_limit_and_streams_snapshots() {
        let mut sim = simulation(Scene::new());
        sim.fleet_mut()
            .spawn(&command(1, "cleaner", (0.0, 0.0), (1.0, 0.0)))
            .expect("spawn");

        let mut seen = 0;
        let stats = sim
            .run(
                RunOptions {
                    tick_secs: 0.25,
                    max_frames: 12,
                    realtime: false,
                },
                Arc::new(AtomicBool::new(false)),
                |_| seen += 1,
            )
            .await;

        assert_eq!(stats.frames, 12);
        assert_eq!(seen, 3);
        assert_eq!(stats.snapshots, 3);
    }

    #[tokio::test]
    async fn run_honours_shutdown_flag() {
        let mut sim = simulation(Scene::new());
        let stats = sim
            .run(
                RunOptions {
                    tick_secs: 0.1,
                    max_frames: 1_000,
                    realtime: false,
                },
                Arc::new(AtomicBool::new(true)),
                |_| {},
            )
            .await;
        assert_eq!(stats.frames, 0);
    }
}
