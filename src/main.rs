//! Gamepad GW - Rust implementation
//!
//! Gateway to drive MIDI instruments and VRM avatars from game
//! controllers.

use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gamepad_gw::avatar::{AnimationBridge, LoggingAvatar};
use gamepad_gw::cli::{self, Command, Outcome};
use gamepad_gw::config::AppConfig;
use gamepad_gw::engine::Engine;
use gamepad_gw::input::{GilrsSource, InputSource, SyntheticSource};
use gamepad_gw::output::{list_output_ports, Emitter, MidirSink};
use gamepad_gw::paths;
use gamepad_gw::preset::PresetStore;
use gamepad_gw::scene::SceneConfig;

/// Gamepad Gateway - drive MIDI instruments and VRM avatars from game controllers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI output ports
    #[arg(long)]
    list_ports: bool,

    /// Use a synthetic controller instead of real hardware
    #[arg(long)]
    demo: bool,

    /// Override the polling rate in Hz
    #[arg(long)]
    tick_hz: Option<u32>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("Starting Gamepad GW...");

    if args.list_ports {
        for name in list_output_ports()? {
            println!("{}", name);
        }
        return Ok(());
    }

    let config = AppConfig::load(&args.config).await?;
    info!("Configuration file: {}", args.config);

    run_app(args, config).await
}

async fn run_app(args: Args, config: AppConfig) -> Result<()> {
    // Output sink: idle until configured or selected from the console
    let mut emitter = Emitter::new();
    if let Some(pattern) = &config.midi.output_port {
        match MidirSink::connect(pattern) {
            Ok(sink) => emitter.set_sink(Box::new(sink)),
            Err(e) => warn!("MIDI output '{}' unavailable, starting idle: {:#}", pattern, e),
        }
    }

    // Avatar scene: configured file, or the bundled sample
    let mut bridge = AnimationBridge::new(Box::new(LoggingAvatar));
    let scene = match &config.scene {
        Some(path) => SceneConfig::load(path)?,
        None => SceneConfig::sample(),
    };
    bridge.set_scene(scene);

    let mut engine = Engine::new(emitter, bridge);
    let mut presets = PresetStore::new();
    let presets_dir = config
        .presets_dir
        .clone()
        .unwrap_or_else(paths::default_presets_dir);

    let mut input: Box<dyn InputSource> = if args.demo {
        info!("Demo mode: synthetic controller");
        Box::new(SyntheticSource::demo())
    } else {
        Box::new(GilrsSource::new()?)
    };

    // Operator console on its own thread; commands drain between ticks
    let (command_tx, mut command_rx) = mpsc::channel::<Command>(64);
    let _repl = cli::spawn_repl(command_tx);

    let tick_hz = args.tick_hz.unwrap_or(config.polling.tick_hz).max(1);
    let mut ticker = tokio::time::interval(Duration::from_secs(1) / tick_hz);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    info!("Polling at {} Hz", tick_hz);
    info!("Ready - type 'help' for console commands");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                engine.tick(input.as_mut());
            }

            Some(command) = command_rx.recv() => {
                if cli::apply(command, &mut engine, &mut presets, &presets_dir) == Outcome::Quit {
                    break;
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("Gamepad GW shutdown complete");
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}
