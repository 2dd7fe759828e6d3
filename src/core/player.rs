/// Frame pump: drives the text controller at a fixed rate and pushes
/// frames to the display sink.
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{self, Duration};
use tracing::{debug, info, warn};

use crate::config::{PlayerConfig, RawDisplayConfig};
use crate::render::font::preview;
use crate::render::plugins::{MatrixSize, RenderOutcome, TextDisplayController};
use crate::render::sink::{DisplaySink, PixmapSink};

/// Commands sent from the stdin reader (or an embedding host) to the player
#[derive(Debug)]
pub enum PlayerCommand {
    /// Replace the displayed text
    SetText(String),
    /// Apply a new display config; unchanged fields are left alone
    ApplyConfig(RawDisplayConfig),
    /// Log the controller's info snapshot as JSON
    ReportInfo,
    Shutdown,
}

pub struct Player {
    config: PlayerConfig,
    controller: TextDisplayController,
    sink: Box<dyn DisplaySink>,
    /// Channel for receiving commands
    command_rx: mpsc::Receiver<PlayerCommand>,
    /// Sender clone for giving to the input task
    command_tx: mpsc::Sender<PlayerCommand>,
    frames_rendered: u64,
    /// Start of the current display cycle and its recommended length
    cycle_start: Instant,
    cycle_secs: f32,
}

impl Player {
    pub fn new(config: PlayerConfig, display: &RawDisplayConfig) -> Result<Self> {
        let sink = PixmapSink::new(
            config.width,
            config.height,
            config.fps,
            config.output_mode,
            &config.output_path,
        )
        .context("Failed to create display sink")?;
        Ok(Self::with_sink(config, display, Box::new(sink)))
    }

    pub fn with_sink(
        config: PlayerConfig,
        display: &RawDisplayConfig,
        sink: Box<dyn DisplaySink>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let mut controller =
            TextDisplayController::from_raw(display, MatrixSize::new(config.width, config.height));
        if !controller.validate_config() {
            warn!(
                "Display config has {} invalid value(s), defaults substituted",
                controller.config_issues().len()
            );
        }
        let cycle_secs = controller.display_duration();

        Self {
            config,
            controller,
            sink,
            command_rx: rx,
            command_tx: tx,
            frames_rendered: 0,
            cycle_start: Instant::now(),
            cycle_secs,
        }
    }

    /// Get a clone of the command sender for the input task
    pub fn command_sender(&self) -> mpsc::Sender<PlayerCommand> {
        self.command_tx.clone()
    }

    pub fn controller(&self) -> &TextDisplayController {
        &self.controller
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Main render loop
    pub async fn run(&mut self) -> Result<()> {
        let mut interval = time::interval(frame_period(self.config.fps));
        self.restart_cycle();

        info!(
            "Starting render loop: {}x{} @ {}fps, output: {:?}",
            self.config.width, self.config.height, self.config.fps, self.config.output_mode
        );

        loop {
            interval.tick().await;

            // Process any pending commands
            let mut running = true;
            while let Ok(cmd) = self.command_rx.try_recv() {
                running &= self.handle_command(cmd);
            }
            if !running {
                break;
            }

            let now = Instant::now();
            self.controller.update_at(now);
            if let RenderOutcome::Fallback(e) = self.controller.render_to(self.sink.as_mut(), now) {
                debug!("Frame {} drawn statically: {}", self.frames_rendered, e);
            }
            self.sink
                .present_frame()
                .context("Failed to present frame")?;
            self.frames_rendered += 1;

            if self
                .config
                .frame_limit
                .is_some_and(|limit| self.frames_rendered >= limit)
            {
                info!("Rendered {} frames, stopping", self.frames_rendered);
                break;
            }

            if self.config.cycle && self.cycle_start.elapsed().as_secs_f32() >= self.cycle_secs {
                info!("Display cycle complete after {:.1}s", self.cycle_secs);
                break;
            }
        }

        self.controller.cleanup();
        Ok(())
    }

    /// Returns false when the player should stop
    fn handle_command(&mut self, cmd: PlayerCommand) -> bool {
        match cmd {
            PlayerCommand::SetText(text) => {
                self.controller.set_text(text);
                self.restart_cycle();
            }
            PlayerCommand::ApplyConfig(raw) => {
                let update = self.controller.on_config_change(&raw);
                if !update.is_valid() {
                    warn!("Config applied with {} invalid value(s)", update.issues.len());
                }
                if !update.changes.is_empty() {
                    self.restart_cycle();
                }
            }
            PlayerCommand::ReportInfo => match serde_json::to_string(&self.controller.info()) {
                Ok(json) => info!("Display info: {}", json),
                Err(e) => warn!("Failed to serialize display info: {}", e),
            },
            PlayerCommand::Shutdown => {
                info!("Shutdown requested");
                return false;
            }
        }
        true
    }

    fn restart_cycle(&mut self) {
        self.cycle_start = Instant::now();
        self.cycle_secs = self.controller.display_duration();
        debug!("Display cycle: {:.1}s", self.cycle_secs);
    }
}

/// Tick period for `fps` frames per second. Never zero, whatever the rate.
fn frame_period(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(1) as f64).max(Duration::from_nanos(1))
}

/// Read commands from stdin: each line replaces the text, `:reload`
/// re-reads the config file, `:info` logs a snapshot, `:quit` stops.
pub async fn read_commands(tx: mpsc::Sender<PlayerCommand>, config_path: Option<PathBuf>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("stdin closed");
                return;
            }
            Err(e) => {
                warn!("Failed to read stdin: {}", e);
                return;
            }
        };

        let Some(cmd) = parse_command(&line, config_path.as_deref()) else {
            continue;
        };
        let quit = matches!(cmd, PlayerCommand::Shutdown);
        if tx.send(cmd).await.is_err() || quit {
            return;
        }
    }
}

fn parse_command(line: &str, config_path: Option<&std::path::Path>) -> Option<PlayerCommand> {
    match line.trim_end_matches(['\r', '\n']) {
        "" => None,
        ":quit" => Some(PlayerCommand::Shutdown),
        ":info" => Some(PlayerCommand::ReportInfo),
        ":reload" => {
            let Some(path) = config_path else {
                warn!("No config file to reload");
                return None;
            };
            match RawDisplayConfig::from_file(path) {
                Ok(raw) => {
                    info!("Reloaded {}", path.display());
                    Some(PlayerCommand::ApplyConfig(raw))
                }
                Err(e) => {
                    warn!("Reload failed: {:#}", e);
                    None
                }
            }
        }
        text => {
            debug!("New text from stdin: '{}'", preview(text));
            Some(PlayerCommand::SetText(text.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputMode;
    use crate::render::scroll::ScrollPhase;
    use std::io::Write;

    fn player_config(frame_limit: Option<u64>) -> PlayerConfig {
        PlayerConfig {
            width: 32,
            height: 8,
            fps: 200,
            output_mode: OutputMode::Discard,
            output_path: PathBuf::from("unused.png"),
            config_path: None,
            frame_limit,
            cycle: false,
        }
    }

    fn display(text: &str) -> RawDisplayConfig {
        RawDisplayConfig {
            text: Some(text.to_string()),
            ..RawDisplayConfig::default()
        }
    }

    #[tokio::test]
    async fn test_run_stops_at_frame_limit() {
        let mut player = Player::new(player_config(Some(3)), &display("Hi")).unwrap();
        player.run().await.unwrap();
        assert_eq!(player.frames_rendered(), 3);
    }

    #[test]
    fn test_frame_period() {
        assert_eq!(frame_period(100), Duration::from_millis(10));
        assert_eq!(frame_period(2000), Duration::from_micros(500));
        assert_eq!(frame_period(0), Duration::from_secs(1));
        assert!(frame_period(u32::MAX) > Duration::ZERO);
    }

    #[tokio::test]
    async fn test_run_above_one_thousand_fps() {
        let config = PlayerConfig {
            fps: 2000,
            ..player_config(Some(2))
        };
        let mut player = Player::new(config, &display("Hi")).unwrap();
        player.run().await.unwrap();
        assert_eq!(player.frames_rendered(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_before_first_frame() {
        let mut player = Player::new(player_config(None), &display("Hi")).unwrap();
        player
            .command_sender()
            .send(PlayerCommand::Shutdown)
            .await
            .unwrap();
        player.run().await.unwrap();
        assert_eq!(player.frames_rendered(), 0);
    }

    #[tokio::test]
    async fn test_set_text_command() {
        let mut player = Player::new(player_config(Some(2)), &display("Hi")).unwrap();
        player
            .command_sender()
            .send(PlayerCommand::SetText("Scrolling along nicely".to_string()))
            .await
            .unwrap();
        player.run().await.unwrap();
        assert_eq!(player.controller().config().text, "Scrolling along nicely");
        assert_eq!(player.controller().phase(), ScrollPhase::Scrolling);
    }

    #[tokio::test]
    async fn test_apply_config_command() {
        let mut player = Player::new(player_config(Some(1)), &display("Hi")).unwrap();
        let mut raw = display("Hi");
        raw.scroll_speed = Some(2.5);
        player
            .command_sender()
            .send(PlayerCommand::ApplyConfig(raw))
            .await
            .unwrap();
        player.run().await.unwrap();
        assert_eq!(player.controller().config().scroll_speed, 2.5);
    }

    #[test]
    fn test_parse_command() {
        assert!(matches!(parse_command(":quit", None), Some(PlayerCommand::Shutdown)));
        assert!(matches!(parse_command(":info", None), Some(PlayerCommand::ReportInfo)));
        assert!(parse_command(":reload", None).is_none());
        assert!(parse_command("", None).is_none());
        match parse_command("hello\r", None) {
            Some(PlayerCommand::SetText(text)) => assert_eq!(text, "hello"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_reload_reads_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"text": "from file", "scrollSpeed": 2}}"#).unwrap();
        match parse_command(":reload", Some(file.path())) {
            Some(PlayerCommand::ApplyConfig(raw)) => {
                assert_eq!(raw.text.as_deref(), Some("from file"));
                assert_eq!(raw.scroll_speed, Some(2.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
