use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use boardd::config::BoardConfig;
use boardd::engine::OsIncrement;
use boardd::notify::BoardEvent;
use boardd::providers::{CannedLogText, HttpPlanGenerator};
use boardd::SessionController;

#[derive(Parser)]
#[command(
    name = "boardd",
    about = "Agent task board daemon — simulated progression and live feed sync",
    version
)]
struct Args {
    /// Connect to a live agent feed on startup. Uses the configured feed
    /// address when no explicit address is given.
    #[arg(long, value_name = "URL", num_args = 0..=1)]
    connect: Option<Option<String>>,

    /// Generate a plan for this goal on startup, then simulate it.
    #[arg(long)]
    goal: Option<String>,

    /// Load the built-in demo board and start the simulated progression.
    #[arg(long)]
    demo: bool,

    /// Engine tick interval in milliseconds.
    #[arg(long, env = "BOARDD_TICK_MS")]
    tick_ms: Option<u64>,

    /// Path to boardd.toml (default: ./boardd.toml).
    #[arg(long, env = "BOARDD_CONFIG")]
    config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, env = "BOARDD_LOG")]
    log: Option<String>,

    /// Log output format: "pretty" | "json".
    #[arg(long, env = "BOARDD_LOG_FORMAT")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = BoardConfig::new(args.config, args.tick_ms, args.log, args.log_format);

    let filter = EnvFilter::new(&config.log);
    if config.log_format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).compact().init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "boardd starting");

    let controller = SessionController::new(
        &config,
        Arc::new(HttpPlanGenerator::from_config(&config)),
        Arc::new(CannedLogText),
        Arc::new(OsIncrement),
    );
    let mut events = controller.subscribe();

    if args.demo {
        controller.load_demo().await;
    } else if let Some(goal) = &args.goal {
        controller.start_plan(goal).await?;
        controller.start_simulation().await;
    } else if let Some(connect) = args.connect {
        let address = connect.unwrap_or_else(|| config.feed_url.clone());
        controller.start_connect(&address).await?;
    } else {
        info!("no startup action — waiting (use --demo, --goal, or --connect)");
    }

    // Minimal terminal rendering of board activity. The store is the source
    // of truth; this loop just mirrors its change events until Ctrl-C.
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                controller.stop().await;
                break;
            }
            event = events.recv() => match event {
                Ok(BoardEvent::GlobalLogAppended) => {
                    if let Some(entry) = controller.store().last_global_entry().await {
                        println!(
                            "{} [{}] {}",
                            entry.ts.format("%H:%M:%S"),
                            entry.severity,
                            entry.message
                        );
                    }
                }
                Ok(BoardEvent::TaskUpdated { id }) => {
                    if let Some(task) = controller.store().task(&id).await {
                        println!("  → {} [{}] {}%", task.title, task.status, task.progress);
                    }
                }
                Ok(BoardEvent::TasksReplaced) => {
                    let snap = controller.store().snapshot().await;
                    println!("board: {} tasks — {}", snap.tasks.len(), snap.goal);
                }
                Ok(BoardEvent::GoalChanged) => {
                    println!("goal: {}", controller.store().goal().await);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
            }
        }
    }

    Ok(())
}
