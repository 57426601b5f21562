use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tokio::time::{Duration, interval};
use tracing::{debug, error, info, warn};

use clr_host::adapters::CoreClrContexts;
use clr_host::{BridgeEnv, HostEvent, HostHandle, ResourceManager};
use clr_log::{LogConfig, init_logging};

mod config;
use config::Config;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get default config path based on executable location
fn default_config_path() -> String {
    env::current_exe()
        .ok()
        .and_then(|exe_path| {
            let stem = exe_path.file_stem()?;
            let parent = exe_path.parent()?;
            Some(parent.join(stem).with_extension("json"))
        })
        .and_then(|path| path.to_str().map(|s| s.to_string()))
        .unwrap_or_else(|| "./clr_server.json".to_string())
}

/// Standalone host for .NET resources
#[derive(Parser, Debug)]
#[command(name = "clr_server")]
#[command(version = VERSION)]
#[command(about = "Runs .NET resources through the CLR host bridge", long_about = None)]
struct Args {
    /// Path to configuration file (JSON)
    #[arg(short, long, default_value_t = default_config_path())]
    config: String,

    /// Enable logging to file (clr_server.log in current directory)
    #[arg(long, env = "CLR_LOG_FILE")]
    log_file: bool,

    /// Deliver the events of a JSON-lines file to every started resource
    #[arg(long)]
    replay: Option<PathBuf>,
}

/// Period between two ticks for a rate in Hz
fn tick_period(tick_rate: u64) -> Duration {
    Duration::from_micros(1_000_000 / tick_rate.max(1))
}

fn replay(manager: &ResourceManager, path: &Path) {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!("Cannot read replay file {}: {}", path.display(), e);
            return;
        }
    };
    let events = match HostEvent::parse_lines(&content) {
        Ok(events) => events,
        Err(e) => {
            error!("Invalid replay file {}: {}", path.display(), e);
            return;
        }
    };

    info!("Replaying {} events from {}", events.len(), path.display());
    for event in &events {
        let delivered = manager.broadcast(event);
        debug!("{:?} delivered to {} resources", event.kind(), delivered);
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Logging is not up yet, early failures go to stderr
    let config = match Config::from_json_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config from '{}': {}", args.config, e);
            std::process::exit(1);
        }
    };

    let log_config = if args.log_file {
        match fs::File::create("clr_server.log") {
            Ok(file) => LogConfig::new("clr_server::")
                .with_level(config.level())
                .with_log_file(file),
            Err(e) => {
                eprintln!("Unable to create clr_server.log: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        LogConfig::<fs::File>::new("clr_server::").with_level(config.level())
    };

    if let Err(e) = init_logging(log_config) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("CLR Server v{}", VERSION);
    info!("Configuration: {}", args.config);

    debug!("Settings:");
    debug!("  Runtime: {}", config.bridge.runtime_library_path.display());
    debug!("  Resources Path: {}", config.bridge.resources_subpath.display());
    debug!("  Entry Type: {}", config.bridge.entry_type);
    debug!("  Tick Rate: {} Hz", config.tick_rate);
    debug!("  Log Level: {}", config.log_level);

    // No native host sits behind this process
    let env = BridgeEnv::new(
        config.bridge.clone(),
        HostHandle::new(0),
        Arc::new(CoreClrContexts::new()),
    );
    let mut manager = ResourceManager::new(env);

    for descriptor in &config.resources {
        if let Err(e) = manager.create(descriptor) {
            warn!("Skipping resource '{}': {}", descriptor.name, e);
        }
    }

    let failed = manager.start_all();
    info!(
        "Started {} of {} resources",
        manager.len() - failed.len(),
        manager.len()
    );
    for name in &failed {
        warn!("Resource '{}' failed to start", name);
    }

    if let Some(path) = &args.replay {
        replay(&manager, path);
    }

    info!("Entering Main Loop (Use Ctrl+C to shutdown)");
    let mut ticker = interval(tick_period(config.tick_rate));
    let mut shutdown = std::pin::pin!(signal::ctrl_c());

    loop {
        tokio::select! {
            _ = ticker.tick() => manager.tick_all(),
            result = &mut shutdown => {
                if let Err(e) = result {
                    error!("Failed to listen for Ctrl+C: {}", e);
                }
                info!("Shutdown requested");
                break;
            }
        }
    }

    manager.stop_all();
    drop(manager);
    info!("Server shutdown complete");
}
