//! Liveness Gate CLI
//!
//! Runs the verification loop against a scripted detection source.
//!
//! Usage:
//!   liveness-gate                                   # default demo scenario
//!   liveness-gate --scenario "real:0.9:330,none:90" # custom scenario
//!   liveness-gate --realtime --fps 30               # pace against the wall clock
//!   liveness-gate --config liveness.toml            # load settings from TOML
//!
//! Type `r` and Enter to reset the session, `q` and Enter to quit.

use clap::Parser;
use liveness_gate::{
    clock::{Clock, ManualClock, MonotonicClock},
    detection::ScriptedSource,
    metrics::MetricsRegistry,
    presenter::TextPresenter,
    runtime::{RunSummary, StopReason, TickLoop},
    session::{FileConfig, ResetController, VerificationSession},
};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_SCENARIO: &str = "real:0.92:330,none:200,fake:0.88:330,none:200";

#[derive(Parser, Debug)]
#[command(
    name = "liveness-gate",
    version = liveness_gate::VERSION,
    about = "Face-spoof liveness verification over per-frame classifications"
)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Comma-separated segments: label:confidence:frames or none:frames
    #[arg(short, long, default_value = DEFAULT_SCENARIO)]
    scenario: String,

    /// Loop the scenario until interrupted
    #[arg(long)]
    repeat: bool,

    /// Frames per second of the scripted source
    #[arg(long)]
    fps: Option<u32>,

    /// Pace ticks with the wall clock instead of simulated time
    #[arg(long)]
    realtime: bool,

    /// Stop after this many ticks
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Print the status line every N ticks (0 = only on change)
    #[arg(long)]
    status_every: Option<u32>,

    /// Port for the Prometheus endpoint (0 disables it; needs the `metrics` feature)
    #[arg(long)]
    metrics_port: Option<u16>,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(2);
            }
        },
        None => FileConfig::default(),
    };
    if let Some(fps) = args.fps {
        config.stream.fps = fps;
    }
    config.stream.realtime |= args.realtime;
    if let Some(every) = args.status_every {
        config.output.status_every = every;
    }
    if let Some(port) = args.metrics_port {
        config.output.metrics_port = port;
    }

    if let Err(e) = config
        .verification
        .validate()
        .and_then(|_| config.stream.validate())
    {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(2);
    }

    let source = match ScriptedSource::from_scenario(&args.scenario) {
        Ok(source) if args.repeat => source.repeating(),
        Ok(source) => source,
        Err(e) => {
            eprintln!("Invalid scenario: {}", e);
            std::process::exit(2);
        }
    };

    info!("Liveness Gate v{}", liveness_gate::VERSION);
    info!(
        threshold = config.verification.confidence_threshold,
        verify_secs = config.verification.verification_threshold_secs,
        fps = config.stream.fps,
        realtime = config.stream.realtime,
        "Starting verification loop"
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || shutdown.store(true, Ordering::Release)) {
            warn!("Failed to install Ctrl-C handler: {}", e);
        }
    }

    let registry = match MetricsRegistry::new() {
        Ok(registry) => Some(Arc::new(registry)),
        Err(e) => {
            warn!("Metrics disabled: {}", e);
            None
        }
    };
    if let Some(registry) = &registry {
        spawn_metrics_server(Arc::clone(registry), config.output.metrics_port);
    }

    let session = VerificationSession::new(config.verification.clone());
    spawn_keyboard_listener(session.reset_controller(), Arc::clone(&shutdown));

    let presenter = TextPresenter::stdout(config.output.status_every);
    let fps = config.stream.fps;

    let summary = if config.stream.realtime {
        let pacing = Duration::from_secs_f64(1.0 / f64::from(fps));
        let tick_loop = TickLoop::new(session, source, MonotonicClock::new(), presenter)
            .with_pacing(pacing);
        run(tick_loop, &args, shutdown, registry)
    } else {
        let tick_loop = TickLoop::new(session, source, ManualClock::with_fps(fps), presenter);
        run(tick_loop, &args, shutdown, registry)
    };

    report(&summary);

    if let StopReason::SourceFailed(_) = summary.stop_reason {
        std::process::exit(1);
    }
}

fn run<C: Clock>(
    tick_loop: TickLoop<ScriptedSource, C, TextPresenter<std::io::Stdout>>,
    args: &Args,
    shutdown: Arc<AtomicBool>,
    registry: Option<Arc<MetricsRegistry>>,
) -> RunSummary {
    let mut tick_loop = tick_loop.with_shutdown(shutdown);
    if let Some(limit) = args.max_ticks {
        tick_loop = tick_loop.with_tick_limit(limit);
    }
    if let Some(registry) = registry {
        tick_loop = tick_loop.with_metrics(registry);
    }
    tick_loop.run()
}

/// Reads commands from stdin: `r` resets, `q` quits.
fn spawn_keyboard_listener(resets: ResetController, shutdown: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match line.trim() {
                "r" | "R" => resets.request_reset(),
                "q" | "Q" => {
                    shutdown.store(true, Ordering::Release);
                    break;
                }
                _ => {}
            }
        }
    });
}

#[cfg(feature = "metrics")]
fn spawn_metrics_server(registry: Arc<MetricsRegistry>, port: u16) {
    use liveness_gate::metrics::{MetricsServer, MetricsServerConfig};

    if port == 0 {
        return;
    }

    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Failed to start metrics runtime: {}", e);
                return;
            }
        };

        let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
        if let Err(e) = runtime.block_on(server.run()) {
            warn!("Metrics server stopped: {}", e);
        }
    });
}

#[cfg(not(feature = "metrics"))]
fn spawn_metrics_server(_registry: Arc<MetricsRegistry>, port: u16) {
    if port != 0 {
        tracing::debug!(port, "Built without the metrics feature; endpoint not served");
    }
}

fn report(summary: &RunSummary) {
    info!(
        "Stopped ({:?}) after {} ticks: {} attempts, {} successful, {} failed, {} abandoned, {} resets",
        summary.stop_reason,
        summary.stats.ticks,
        summary.stats.attempts_started,
        summary.stats.successes,
        summary.stats.failures,
        summary.stats.abandoned,
        summary.stats.resets_requested
    );

    if let Some(fps) = summary.mean_fps {
        info!("Mean tick rate: {:.1} fps", fps);
    }

    for verdict in &summary.verdicts {
        println!(
            "{}  {:>8}  at t={}",
            verdict.decided_at.to_rfc3339(),
            verdict.outcome.to_string(),
            verdict.session_time
        );
    }
}
