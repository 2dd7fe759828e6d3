/// Text display plugin: static text when it fits the matrix, a pre-rendered
/// scrolling scene when it doesn't.
use image::{Rgb as Pixel, RgbImage};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::display::{ConfigChange, DisplayConfig, RawDisplayConfig};
use crate::config::ScrollPolicy;
use crate::error::{ConfigError, RenderError};
use crate::render::font::{Font, FontSource, load_font_or_default, preview};
use crate::render::metrics::{TextMetrics, measure};
use crate::render::scene::SceneBuffer;
use crate::render::scroll::{Advance, ScrollEngine, ScrollParams, ScrollPhase, create_engine};
use crate::render::sink::DisplaySink;

/// Characters of text shown in the info snapshot
const INFO_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixSize {
    pub width: u32,
    pub height: u32,
}

impl MatrixSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Which path a `render` call took
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    /// Text fits (or scrolling is off); drawn centered
    Static,
    /// Window sampled from the scene buffer
    Scrolled,
    /// Scrolling was wanted but the scene couldn't be built; drawn centered instead
    Fallback(RenderError),
}

enum SceneState {
    Invalid,
    Ready(SceneBuffer),
    /// Not retried until something invalidates the scene again
    Failed(RenderError),
}

/// Result of applying a raw config from the host
#[derive(Debug, Clone)]
pub struct ConfigUpdate {
    pub changes: Vec<ConfigChange>,
    pub issues: Vec<ConfigError>,
    pub warnings: Vec<String>,
}

impl ConfigUpdate {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Snapshot of the controller for status reporting
#[derive(Debug, Clone, Serialize)]
pub struct DisplayInfo {
    pub text: String,
    pub text_width: u32,
    pub scroll_enabled: bool,
    pub scrolling: bool,
    pub scroll_speed: f32,
    pub scroll_delay: f32,
    pub target_fps: f32,
    pub pixels_per_second: f32,
    pub scroll_loop: bool,
    pub font_path: Option<PathBuf>,
    /// Configured font failed to load and the built-in face is in use
    pub font_fallback: bool,
    pub font_size: u32,
    pub policy: ScrollPolicy,
    pub phase: ScrollPhase,
    pub position: f32,
}

pub struct TextDisplayController {
    config: DisplayConfig,
    matrix: MatrixSize,
    font: Font,
    metrics: TextMetrics,
    scene: SceneState,
    engine: Box<dyn ScrollEngine>,
    /// Issues from the last validated config
    issues: Vec<ConfigError>,
    /// `update` already advanced the scroll for the upcoming frame
    advanced_for_frame: bool,
}

impl TextDisplayController {
    pub fn new(config: DisplayConfig, matrix: MatrixSize) -> Self {
        let font = load_font_or_default(config.font_path.as_deref(), config.font_size);
        let metrics = measure(&config.text, &font);
        let engine = create_engine(config.policy, ScrollParams::from_config(&config));

        info!("Text display initialized: '{}'", preview(&config.text));
        info!(
            "Font: {}, Size: {}, Scroll: {}, Policy: {:?}",
            font_label(&font),
            config.font_size,
            config.scroll,
            config.policy
        );
        info!(
            "Text width calculated: {}px{}",
            metrics.width,
            if metrics.estimated { " (estimated)" } else { "" }
        );

        Self {
            config,
            matrix,
            font,
            metrics,
            scene: SceneState::Invalid,
            engine,
            issues: Vec::new(),
            advanced_for_frame: false,
        }
    }

    /// Build from a host config. Invalid values are replaced by defaults;
    /// `validate_config` reports whether that happened.
    pub fn from_raw(raw: &RawDisplayConfig, matrix: MatrixSize) -> Self {
        let validated = DisplayConfig::from_raw(raw);
        let mut controller = Self::new(validated.config, matrix);
        controller.issues = validated.issues;
        controller
    }

    pub fn validate_config(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn config_issues(&self) -> &[ConfigError] {
        &self.issues
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn metrics(&self) -> &TextMetrics {
        &self.metrics
    }

    pub fn font(&self) -> &Font {
        &self.font
    }

    pub fn phase(&self) -> ScrollPhase {
        self.engine.phase()
    }

    pub fn position(&self) -> f32 {
        self.engine.position()
    }

    pub fn policy(&self) -> ScrollPolicy {
        self.engine.policy()
    }

    /// Width of the current scene buffer, if one is built
    pub fn scene_width(&self) -> Option<u32> {
        match &self.scene {
            SceneState::Ready(scene) => Some(scene.width()),
            _ => None,
        }
    }

    pub fn has_scene(&self) -> bool {
        matches!(self.scene, SceneState::Ready(_))
    }

    /// Scrolling is enabled and the text is wider than the matrix
    pub fn is_scrolling_content(&self) -> bool {
        self.config.scroll && self.metrics.width > self.matrix.width
    }

    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    /// Advance the animation by one logical frame.
    pub fn update_at(&mut self, now: Instant) {
        if !self.is_scrolling_content() {
            self.engine.reset();
            self.advanced_for_frame = false;
            return;
        }

        if let Err(e) = self.ensure_scene() {
            debug!("Scroll not advanced: {}", e);
            return;
        }
        self.step(now);
        self.advanced_for_frame = true;
    }

    pub fn render(&mut self, frame: &mut RgbImage) -> RenderOutcome {
        self.render_at(frame, Instant::now())
    }

    /// Produce the next visible frame in `frame`. Never fails: scene or font
    /// problems degrade to centered static text.
    pub fn render_at(&mut self, frame: &mut RgbImage, now: Instant) -> RenderOutcome {
        if frame.dimensions() != (self.matrix.width, self.matrix.height) {
            *frame = RgbImage::new(self.matrix.width, self.matrix.height);
        }

        if !self.is_scrolling_content() {
            self.engine.reset();
            self.advanced_for_frame = false;
            self.draw_static(frame);
            return RenderOutcome::Static;
        }

        match self.render_scrolling(frame, now) {
            Ok(()) => RenderOutcome::Scrolled,
            Err(e) => {
                debug!("Falling back to static text: {}", e);
                self.advanced_for_frame = false;
                self.draw_static(frame);
                RenderOutcome::Fallback(e)
            }
        }
    }

    /// Render straight into a sink's surface and tell it whether we're scrolling.
    pub fn render_to(&mut self, sink: &mut dyn DisplaySink, now: Instant) -> RenderOutcome {
        let outcome = self.render_at(sink.image_mut(), now);
        sink.set_scrolling_active(self.phase() == ScrollPhase::Scrolling);
        outcome
    }

    /// Replace the text. The scroll restarts from the beginning.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.config.text = text.into();
        self.metrics = measure(&self.config.text, &self.font);
        self.scene = SceneState::Invalid;
        self.engine.reset();
        self.advanced_for_frame = false;
        info!(
            "Text updated to: '{}' ({}px)",
            preview(&self.config.text),
            self.metrics.width
        );
    }

    /// Validate a host config and apply whatever differs from the current one.
    pub fn on_config_change(&mut self, raw: &RawDisplayConfig) -> ConfigUpdate {
        let validated = DisplayConfig::from_raw(raw);
        let changes = self.apply_config(validated.config);
        self.issues = validated.issues.clone();
        ConfigUpdate {
            changes,
            issues: validated.issues,
            warnings: validated.warnings,
        }
    }

    /// Apply an already validated config, touching only what changed.
    /// Returns the changed fields.
    pub fn apply_config(&mut self, new: DisplayConfig) -> Vec<ConfigChange> {
        let changes = self.config.diff(&new);
        if changes.is_empty() {
            debug!("Config unchanged");
            return changes;
        }
        self.config = new;
        let changed = |c: ConfigChange| changes.contains(&c);

        if changed(ConfigChange::Font) {
            let path = self.config.font_path.as_deref();
            self.font = load_font_or_default(path, self.config.font_size);
            info!("Font: {}, Size: {}", font_label(&self.font), self.config.font_size);
        }
        if changed(ConfigChange::Text) || changed(ConfigChange::Font) {
            self.metrics = measure(&self.config.text, &self.font);
        }

        let params = ScrollParams::from_config(&self.config);
        if changed(ConfigChange::Policy) {
            self.engine = create_engine(self.config.policy, params);
        } else {
            self.engine.configure(params);
        }

        if changes.iter().any(|c| c.resets_scroll()) {
            self.engine.reset();
            self.advanced_for_frame = false;
        }
        if changes.iter().any(|c| c.invalidates_scene()) {
            self.scene = SceneState::Invalid;
        }

        info!("Config updated: {:?}", changes);
        changes
    }

    /// Seconds the host should keep this text on screen.
    pub fn display_duration(&mut self) -> f32 {
        if self.is_scrolling_content() && self.ensure_scene().is_ok() {
            if let Some(secs) = self.engine.dynamic_duration() {
                return secs;
            }
        }
        self.config.display_duration
    }

    pub fn info(&self) -> DisplayInfo {
        DisplayInfo {
            text: self.config.text.chars().take(INFO_PREVIEW_CHARS).collect(),
            text_width: self.metrics.width,
            scroll_enabled: self.config.scroll,
            scrolling: self.is_scrolling_content(),
            scroll_speed: self.config.scroll_speed,
            scroll_delay: self.config.scroll_delay,
            target_fps: self.config.target_fps,
            pixels_per_second: self.config.pixels_per_second(),
            scroll_loop: self.config.scroll_loop,
            font_path: self.config.font_path.clone(),
            font_fallback: self.config.font_path.is_some()
                && *self.font.source() == FontSource::Builtin,
            font_size: self.config.font_size,
            policy: self.engine.policy(),
            phase: self.engine.phase(),
            position: self.engine.position(),
        }
    }

    /// Drop the scene buffer. The next scrolling frame rebuilds it.
    pub fn cleanup(&mut self) {
        self.scene = SceneState::Invalid;
        info!("Text display cleaned up");
    }

    fn render_scrolling(&mut self, frame: &mut RgbImage, now: Instant) -> Result<(), RenderError> {
        self.ensure_scene()?;
        if !self.advanced_for_frame {
            self.step(now);
        }
        self.advanced_for_frame = false;

        if let SceneState::Ready(scene) = &self.scene {
            fill(frame, self.config.background_color);
            self.engine.sample(scene.image(), frame);
        }
        Ok(())
    }

    fn step(&mut self, now: Instant) {
        if self.engine.advance(now) == Advance::Completed {
            info!("Finished scrolling '{}'", preview(&self.config.text));
        }
    }

    /// Build the scene if it is invalid and make sure the engine scrolls over it.
    fn ensure_scene(&mut self) -> Result<(), RenderError> {
        let mut rebuilt = false;
        if matches!(self.scene, SceneState::Invalid) {
            let layout = self.engine.layout(self.matrix.width, self.config.gap_width);
            self.scene = match SceneBuffer::build(
                &self.config.text,
                &self.font,
                self.config.text_color,
                self.config.background_color,
                self.matrix.height,
                layout,
            ) {
                Ok(scene) => SceneState::Ready(scene),
                Err(e) => {
                    warn!("Failed to create text cache: {}", e);
                    SceneState::Failed(e)
                }
            };
            rebuilt = true;
        }

        match &self.scene {
            SceneState::Ready(scene) => {
                if (rebuilt || self.engine.phase() == ScrollPhase::Idle)
                    && !self.engine.start(scene.width(), self.matrix.width)
                {
                    debug!("Scene narrower than the matrix, not scrolling");
                }
                Ok(())
            }
            SceneState::Failed(e) => Err(e.clone()),
            SceneState::Invalid => Ok(()),
        }
    }

    fn draw_static(&self, frame: &mut RgbImage) {
        fill(frame, self.config.background_color);
        let (x, y) = self.metrics.centered_origin(self.matrix.width, self.matrix.height);
        self.font.draw(frame, x, y, &self.config.text, self.config.text_color);
    }
}

fn fill(frame: &mut RgbImage, color: [u8; 3]) {
    for pixel in frame.pixels_mut() {
        *pixel = Pixel(color);
    }
}

fn font_label(font: &Font) -> String {
    match font.source() {
        FontSource::Builtin => "built-in".to_string(),
        FontSource::File(path) => path.display().to_string(),
    }
}
