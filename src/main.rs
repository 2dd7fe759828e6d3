use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use led_text::config::{self, RawDisplayConfig};
use led_text::core::player::{self, Player};

#[derive(Parser, Debug)]
#[command(name = "led-text", about = "Static and scrolling text for LED matrices")]
struct Args {
    /// Display config JSON (re-read on `:reload`)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Text to show, overriding the config file
    #[arg(short, long)]
    text: Option<String>,

    /// Display width in pixels
    #[arg(long, default_value_t = 128)]
    width: u32,

    /// Display height in pixels
    #[arg(long, default_value_t = 32)]
    height: u32,

    /// Target FPS
    #[arg(long, default_value_t = 100)]
    fps: u32,

    /// Output mode: png, raw, none
    #[arg(long, default_value = "png")]
    output: String,

    /// Output file path (for png mode)
    #[arg(long, default_value = "output.png")]
    output_path: String,

    /// Stop after this many frames
    #[arg(long)]
    frames: Option<u64>,

    /// Stop once the recommended display duration has elapsed
    #[arg(long)]
    cycle: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so raw frames can own stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.parse().unwrap_or_default()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        "led-text v{} starting ({}x{} @ {}fps)",
        env!("CARGO_PKG_VERSION"),
        args.width,
        args.height,
        args.fps
    );

    let mut display = match &args.config {
        Some(path) => RawDisplayConfig::from_file(path).unwrap_or_else(|e| {
            warn!("{:#}, using defaults", e);
            RawDisplayConfig::default()
        }),
        None => RawDisplayConfig::default(),
    };
    if let Some(text) = args.text.clone() {
        display.text = Some(text);
    }

    let output_mode = args.output.parse().unwrap_or_else(|e| {
        warn!("{}, saving PNGs", e);
        config::OutputMode::default()
    });

    let mut player = Player::new(
        config::PlayerConfig {
            width: args.width,
            height: args.height,
            fps: args.fps,
            output_mode,
            output_path: args.output_path.clone().into(),
            config_path: args.config.clone(),
            frame_limit: args.frames,
            cycle: args.cycle,
        },
        &display,
    )?;

    // Text and commands from stdin in background
    let input_handle = {
        let command_tx = player.command_sender();
        let config_path = args.config.clone();
        tokio::spawn(player::read_commands(command_tx, config_path))
    };

    // Run the render loop
    player.run().await?;

    input_handle.abort();
    info!("led-text shutdown");
    Ok(())
}
