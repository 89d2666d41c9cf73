//! `fleetnav` – headless fleet navigation simulator.
//!
//! This binary:
//!
//! 1. Loads `fleetnav.toml` (or `--config`), applies `FLEETNAV_*` overrides
//!    and installs structured logging.
//! 2. Builds the scene from `[[obstacles]]`, the fleet and the straight-line
//!    planner stand-in, all sharing one event bus.
//! 3. Announces readiness and publishes every `[[robots]]` entry as a spawn
//!    command, exactly as the fleet manager would.
//! 4. Runs the frame loop until the configured duration elapses or Ctrl-C
//!    is pressed, then prints a per-agent summary.
//!
//! With `--dump-telemetry` every tracking snapshot is written to stdout as
//! one JSON object per line.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use colored::Colorize;
use tracing::{info, warn};

use config::FleetConfig;
use fleetnav_middleware::{EventBus, Topic};
use fleetnav_perception::Scene;
use fleetnav_runtime::{
    Fleet, RunOptions, SimPathPlanner, Simulation, SimulationStats, init_tracing,
};
use fleetnav_types::{Event, EventPayload, TaskState, TrackingSnapshot};

const SOURCE: &str = "fleetnav-cli";

// ── CLI definition ────────────────────────────────────────────────────────────

/// Headless robot fleet navigation simulator.
#[derive(Parser, Debug)]
#[command(name = "fleetnav", version, about)]
struct Cli {
    /// Scenario file. Defaults to `fleetnav.toml` in the working directory.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many frames instead of `simulation.duration_secs`.
    #[arg(long)]
    ticks: Option<u64>,

    /// Simulated seconds per frame.
    #[arg(long)]
    tick_secs: Option<f32>,

    /// Pace frames against the wall clock.
    #[arg(long)]
    realtime: bool,

    /// Print every tracking snapshot to stdout as a JSON line.
    #[arg(long)]
    dump_telemetry: bool,
}

impl Cli {
    /// Fold command-line flags over the loaded configuration.
    fn apply(&self, cfg: &mut FleetConfig) {
        if let Some(tick_secs) = self.tick_secs {
            cfg.simulation.tick_secs = tick_secs;
        }
        if self.realtime {
            cfg.simulation.realtime = true;
        }
    }

    fn run_options(&self, cfg: &FleetConfig) -> RunOptions {
        RunOptions {
            tick_secs: cfg.simulation.tick_secs,
            max_frames: self.ticks.unwrap_or_else(|| cfg.simulation.frames()),
            realtime: cfg.simulation.realtime,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();

    let path = config::resolve_path(cli.config.clone());
    let mut cfg = match config::load_from(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}: {e}", "Config error".red().bold());
            return ExitCode::FAILURE;
        }
    };
    cli.apply(&mut cfg);
    if let Err(e) = cfg.validate() {
        eprintln!("{}: {e}", "Invalid option".red().bold());
        return ExitCode::FAILURE;
    }

    let _guard = init_tracing("fleetnav", &cfg.logging);

    // Snapshots go to stdout as JSON, so keep the banner off it.
    if !cli.dump_telemetry {
        print_banner(&path, &cfg);
    }

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("{}", "⚠  Ctrl-C received – stopping after this frame …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; Ctrl-C will terminate immediately");
    }

    match run(&cli, &cfg, shutdown) {
        Ok((stats, simulation)) => {
            if !cli.dump_telemetry {
                print_summary(&stats, &simulation);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {e}", "Simulation error".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(
    cli: &Cli,
    cfg: &FleetConfig,
    shutdown: Arc<AtomicBool>,
) -> Result<(SimulationStats, Simulation), Box<dyn std::error::Error>> {
    let mut simulation = build_simulation(cfg)?;
    let options = cli.run_options(cfg);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let dump = cli.dump_telemetry;
    let stats = runtime.block_on(simulation.run(options, shutdown, |snapshot| {
        if dump {
            print_snapshot(snapshot);
        }
    }));
    Ok((stats, simulation))
}

/// Wire scene, bus, fleet and planner, then hand the fleet its robots.
fn build_simulation(cfg: &FleetConfig) -> Result<Simulation, Box<dyn std::error::Error>> {
    let bus = EventBus::default();

    let mut scene = Scene::new();
    for obstacle in &cfg.obstacles {
        scene.spawn(obstacle.position(), obstacle.radius, obstacle.tag.clone());
    }

    let fleet = Fleet::new(bus.clone(), scene, cfg.policy.clone())
        .with_agent_radius(cfg.simulation.agent_radius);
    let planner = SimPathPlanner::new(bus.clone(), cfg.planner.clone());

    // Stand in for the fleet manager: listen for readiness, then publish.
    let mut ready = bus.subscribe_to(Topic::FleetReady);
    fleet.announce_ready()?;
    for event in ready.drain() {
        if let EventPayload::Subscribe(msg) = event.payload {
            info!(state = %msg.state, "fleet manager acknowledged simulator");
        }
    }
    for robot in &cfg.robots {
        bus.publish_to(
            Topic::FleetCommands,
            Event::new(SOURCE, EventPayload::Spawn(robot.clone())),
        )?;
    }
    info!(
        robots = cfg.robots.len(),
        obstacles = cfg.obstacles.len(),
        "scenario loaded"
    );

    Ok(Simulation::new(fleet, Some(planner)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_snapshot(snapshot: &TrackingSnapshot) {
    match serde_json::to_string(snapshot) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(agent = %snapshot.robot_id, error = %e, "snapshot not serialisable"),
    }
}

fn print_banner(path: &std::path::Path, cfg: &FleetConfig) {
    println!();
    println!(
        "  {} {}",
        "fleetnav".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Scenario   {}", path.display().to_string().bold());
    println!(
        "  Robots     {}   Obstacles {}",
        cfg.robots.len(),
        cfg.obstacles.len()
    );
    println!(
        "  Tick       {}s for {}s{}",
        cfg.simulation.tick_secs,
        cfg.simulation.duration_secs,
        if cfg.simulation.realtime { " (realtime)" } else { "" }
    );
    println!();
}

fn print_summary(stats: &SimulationStats, simulation: &Simulation) {
    println!();
    println!(
        "  {} {} frames, {:.2}s simulated, {} snapshots, {} obstacle report(s)",
        "✓".green().bold(),
        stats.frames,
        stats.elapsed_secs,
        stats.snapshots,
        stats.reports.len()
    );
    println!();

    for agent in simulation.fleet().agents() {
        let state = match agent.task_state() {
            TaskState::Idle => "idle".green(),
            TaskState::Following => "following".cyan(),
            TaskState::PerformingTask => "task".magenta(),
            TaskState::PendingRequest => "pending".yellow(),
        };
        let blocked = if agent.obstacle_detected() {
            "blocked".red().to_string()
        } else {
            String::new()
        };
        println!(
            "    {:>4}  {:<9} {:<10} ({:>7.2}, {:>7.2})  {:>3} wp  {}",
            agent.id().to_string().bold(),
            agent.subtype().to_string(),
            state,
            agent.position().x,
            agent.position().y,
            agent.queue().len(),
            blocked
        );
    }

    for report in &stats.reports {
        println!(
            "    {} {} at ({:.2}, {:.2})",
            "!".yellow().bold(),
            report.obstacle_tag,
            report.x,
            report.y
        );
    }
    println!();
}
