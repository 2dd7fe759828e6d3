/// Display configuration for the text controller.
/// `RawDisplayConfig` mirrors the JSON the host hands us; `DisplayConfig`
/// is the validated, clamped value the controller actually runs on.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::ConfigError;

pub type Rgb = [u8; 3];

pub const DEFAULT_TEXT: &str = "Hello, World!";
pub const DEFAULT_TEXT_COLOR: Rgb = [255, 255, 255];
pub const DEFAULT_BACKGROUND_COLOR: Rgb = [0, 0, 0];

/// Pixels per frame
pub const MIN_SCROLL_SPEED: f32 = 0.1;
pub const MAX_SCROLL_SPEED: f32 = 5.0;
/// Seconds between scroll steps
pub const MIN_SCROLL_DELAY: f32 = 0.001;
pub const MAX_SCROLL_DELAY: f32 = 0.1;
pub const MIN_TARGET_FPS: f32 = 30.0;
pub const MAX_TARGET_FPS: f32 = 240.0;
pub const MAX_FONT_SIZE: u32 = 256;

/// How the scene buffer is laid out for scrolling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScrollPolicy {
    /// Matrix-width padding on both sides of the text, then the gap
    #[default]
    PaddedLoop,
    /// Text followed directly by the gap, wrapped without padding
    TightWrap,
}

/// One color channel as it may appear in JSON: 255, 255.0 or "255".
/// Anything else lands in `Other` and is rejected during validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorComponent {
    Int(i64),
    Float(f64),
    Text(String),
    Other(serde_json::Value),
}

/// A color field as it appears in JSON. Non-array values are kept so a bad
/// color replaces only that field, not the whole config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorValue {
    Triple(Vec<ColorComponent>),
    Other(serde_json::Value),
}

/// Display options as read from a config file. Every field is optional;
/// missing fields take defaults during validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDisplayConfig {
    pub text: Option<String>,
    #[serde(alias = "font_path")]
    pub font_path: Option<PathBuf>,
    #[serde(alias = "font_size")]
    pub font_size: Option<u32>,
    pub scroll: Option<bool>,
    #[serde(alias = "scroll_speed")]
    pub scroll_speed: Option<f32>,
    #[serde(alias = "scroll_delay")]
    pub scroll_delay: Option<f32>,
    #[serde(alias = "target_fps")]
    pub target_fps: Option<f32>,
    #[serde(alias = "scroll_loop")]
    pub scroll_loop: Option<bool>,
    #[serde(alias = "scroll_gap_width")]
    pub scroll_gap_width: Option<u32>,
    #[serde(alias = "scroll_policy")]
    pub scroll_policy: Option<ScrollPolicy>,
    #[serde(alias = "text_color")]
    pub text_color: Option<ColorValue>,
    #[serde(alias = "background_color")]
    pub background_color: Option<ColorValue>,
    #[serde(alias = "display_duration")]
    pub display_duration: Option<f32>,
    #[serde(alias = "dynamic_duration")]
    pub dynamic_duration: Option<bool>,
    #[serde(alias = "min_duration")]
    pub min_duration: Option<f32>,
    #[serde(alias = "max_duration")]
    pub max_duration: Option<f32>,
    #[serde(alias = "duration_buffer")]
    pub duration_buffer: Option<f32>,
}

impl RawDisplayConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse display config JSON")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read display config: {}", path.display()))?;
        Self::from_json(&json)
    }
}

/// Tuning for the recommended on-screen duration of a scroll cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DurationTuning {
    pub enabled: bool,
    pub min_secs: f32,
    pub max_secs: f32,
    /// Safety margin as a fraction of the estimate (0.1 = +10%)
    pub buffer: f32,
}

impl Default for DurationTuning {
    fn default() -> Self {
        Self {
            enabled: true,
            min_secs: 30.0,
            max_secs: 300.0,
            buffer: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayConfig {
    pub text: String,
    pub font_path: Option<PathBuf>,
    pub font_size: u32,
    pub scroll: bool,
    pub scroll_speed: f32,
    pub scroll_delay: f32,
    pub target_fps: f32,
    pub scroll_loop: bool,
    pub gap_width: u32,
    pub policy: ScrollPolicy,
    pub text_color: Rgb,
    pub background_color: Rgb,
    /// Seconds to stay on screen when no dynamic estimate applies
    pub display_duration: f32,
    pub duration: DurationTuning,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT.to_string(),
            font_path: None,
            font_size: 8,
            scroll: true,
            scroll_speed: 1.0,
            scroll_delay: 0.01,
            target_fps: 100.0,
            scroll_loop: true,
            gap_width: 32,
            policy: ScrollPolicy::PaddedLoop,
            text_color: DEFAULT_TEXT_COLOR,
            background_color: DEFAULT_BACKGROUND_COLOR,
            display_duration: 10.0,
            duration: DurationTuning::default(),
        }
    }
}

/// Result of validating a raw config. The config is always usable;
/// `issues` lists what was replaced by a default.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub config: DisplayConfig,
    pub issues: Vec<ConfigError>,
    /// Values that were accepted but adjusted (clamped ranges, legacy units)
    pub warnings: Vec<String>,
}

impl ValidatedConfig {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// A tunable field that differs between two configs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigChange {
    Text,
    Font,
    ScrollEnabled,
    Speed,
    Delay,
    TargetFps,
    Loop,
    GapWidth,
    Policy,
    TextColor,
    BackgroundColor,
    DisplayDuration,
    DurationTuning,
}

impl ConfigChange {
    /// Changes that are baked into the pre-rendered scene
    pub fn invalidates_scene(self) -> bool {
        matches!(
            self,
            ConfigChange::Text
                | ConfigChange::Font
                | ConfigChange::TextColor
                | ConfigChange::BackgroundColor
                | ConfigChange::GapWidth
                | ConfigChange::Policy
        )
    }

    /// Changes that send the scroll back to position 0
    pub fn resets_scroll(self) -> bool {
        matches!(
            self,
            ConfigChange::Text
                | ConfigChange::Font
                | ConfigChange::ScrollEnabled
                | ConfigChange::Policy
        )
    }
}

impl DisplayConfig {
    /// Validate and clamp a raw config, substituting defaults for anything unusable.
    pub fn from_raw(raw: &RawDisplayConfig) -> ValidatedConfig {
        let defaults = DisplayConfig::default();
        let mut issues = Vec::new();
        let mut warnings = Vec::new();

        let text = match raw.text.as_deref() {
            None => defaults.text.clone(),
            Some("") => {
                issues.push(ConfigError::MissingText);
                defaults.text.clone()
            }
            Some(t) => t.to_string(),
        };

        let font_size = match raw.font_size {
            None => defaults.font_size,
            Some(0) => {
                issues.push(ConfigError::InvalidNumber {
                    field: "font_size",
                    reason: "must be at least 1px".to_string(),
                });
                defaults.font_size
            }
            Some(size) if size > MAX_FONT_SIZE => {
                warnings.push(format!("font_size {size} clamped to {MAX_FONT_SIZE}"));
                MAX_FONT_SIZE
            }
            Some(size) => size,
        };

        let target_fps = clamp_field(
            "target_fps",
            raw.target_fps,
            defaults.target_fps,
            MIN_TARGET_FPS,
            MAX_TARGET_FPS,
            &mut issues,
            &mut warnings,
        );

        let scroll_speed = match raw.scroll_speed {
            Some(speed) if speed.is_finite() && speed > MAX_SCROLL_SPEED => {
                // Older configs expressed speed in pixels/second
                let message = format!(
                    "scroll_speed {speed} looks like pixels/second; it is now pixels/frame \
                     (about {:.2} at {target_fps} fps). Clamped to {MAX_SCROLL_SPEED}",
                    speed / target_fps
                );
                warn!("{}", message);
                warnings.push(message);
                MAX_SCROLL_SPEED
            }
            other => clamp_field(
                "scroll_speed",
                other,
                defaults.scroll_speed,
                MIN_SCROLL_SPEED,
                MAX_SCROLL_SPEED,
                &mut issues,
                &mut warnings,
            ),
        };

        let scroll_delay = clamp_field(
            "scroll_delay",
            raw.scroll_delay,
            defaults.scroll_delay,
            MIN_SCROLL_DELAY,
            MAX_SCROLL_DELAY,
            &mut issues,
            &mut warnings,
        );

        let text_color = color_field(
            "text_color",
            raw.text_color.as_ref(),
            DEFAULT_TEXT_COLOR,
            &mut issues,
        );
        let background_color = color_field(
            "background_color",
            raw.background_color.as_ref(),
            DEFAULT_BACKGROUND_COLOR,
            &mut issues,
        );

        let display_duration = match raw.display_duration {
            None => defaults.display_duration,
            Some(d) if d.is_finite() && d > 0.0 => d,
            Some(d) => {
                issues.push(ConfigError::InvalidNumber {
                    field: "display_duration",
                    reason: format!("{d} is not a positive number of seconds"),
                });
                defaults.display_duration
            }
        };

        let duration = duration_tuning(raw, &mut issues);

        let config = DisplayConfig {
            text,
            font_path: raw.font_path.clone().filter(|p| !p.as_os_str().is_empty()),
            font_size,
            scroll: raw.scroll.unwrap_or(defaults.scroll),
            scroll_speed,
            scroll_delay,
            target_fps,
            scroll_loop: raw.scroll_loop.unwrap_or(defaults.scroll_loop),
            gap_width: raw.scroll_gap_width.unwrap_or(defaults.gap_width),
            policy: raw.scroll_policy.unwrap_or(defaults.policy),
            text_color,
            background_color,
            display_duration,
            duration,
        };

        for issue in &issues {
            warn!("Display config: {}", issue);
        }

        ValidatedConfig {
            config,
            issues,
            warnings,
        }
    }

    /// Fields that differ from `other`, in a stable order.
    pub fn diff(&self, other: &DisplayConfig) -> Vec<ConfigChange> {
        let mut changes = Vec::new();
        if self.text != other.text {
            changes.push(ConfigChange::Text);
        }
        if self.font_path != other.font_path || self.font_size != other.font_size {
            changes.push(ConfigChange::Font);
        }
        if self.scroll != other.scroll {
            changes.push(ConfigChange::ScrollEnabled);
        }
        if self.scroll_speed != other.scroll_speed {
            changes.push(ConfigChange::Speed);
        }
        if self.scroll_delay != other.scroll_delay {
            changes.push(ConfigChange::Delay);
        }
        if self.target_fps != other.target_fps {
            changes.push(ConfigChange::TargetFps);
        }
        if self.scroll_loop != other.scroll_loop {
            changes.push(ConfigChange::Loop);
        }
        if self.gap_width != other.gap_width {
            changes.push(ConfigChange::GapWidth);
        }
        if self.policy != other.policy {
            changes.push(ConfigChange::Policy);
        }
        if self.text_color != other.text_color {
            changes.push(ConfigChange::TextColor);
        }
        if self.background_color != other.background_color {
            changes.push(ConfigChange::BackgroundColor);
        }
        if self.display_duration != other.display_duration {
            changes.push(ConfigChange::DisplayDuration);
        }
        if self.duration != other.duration {
            changes.push(ConfigChange::DurationTuning);
        }
        changes
    }

    /// Seconds between effective scroll steps: the slower of the frame
    /// interval and the scroll delay.
    pub fn step_interval(&self) -> f32 {
        (1.0 / self.target_fps).max(self.scroll_delay)
    }

    pub fn pixels_per_second(&self) -> f32 {
        self.scroll_speed / self.step_interval()
    }
}

fn clamp_field(
    field: &'static str,
    value: Option<f32>,
    default: f32,
    min: f32,
    max: f32,
    issues: &mut Vec<ConfigError>,
    warnings: &mut Vec<String>,
) -> f32 {
    match value {
        None => default,
        Some(v) if !v.is_finite() => {
            issues.push(ConfigError::InvalidNumber {
                field,
                reason: format!("{v} is not a finite number"),
            });
            default
        }
        Some(v) if v < min || v > max => {
            let clamped = v.clamp(min, max);
            debug!("{} {} clamped to {}", field, v, clamped);
            warnings.push(format!("{field} {v} clamped to {clamped}"));
            clamped
        }
        Some(v) => v,
    }
}

fn color_field(
    field: &'static str,
    value: Option<&ColorValue>,
    default: Rgb,
    issues: &mut Vec<ConfigError>,
) -> Rgb {
    let parsed = match value {
        None => return default,
        Some(ColorValue::Triple(components)) => parse_rgb(field, components),
        Some(ColorValue::Other(other)) => Err(ConfigError::InvalidColor {
            field,
            reason: format!("must be RGB triple, got {other}"),
        }),
    };
    parsed.unwrap_or_else(|e| {
        issues.push(e);
        default
    })
}

/// Parse an `[r, g, b]` triple. Components may be integers, integral
/// floats, or numeric strings, each within 0-255.
pub fn parse_rgb(field: &'static str, components: &[ColorComponent]) -> Result<Rgb, ConfigError> {
    if components.len() != 3 {
        return Err(ConfigError::InvalidColor {
            field,
            reason: format!("must be RGB triple, got {} components", components.len()),
        });
    }

    let mut rgb = [0u8; 3];
    for (channel, component) in rgb.iter_mut().zip(components) {
        let value = match component {
            ColorComponent::Int(i) => Some(*i),
            ColorComponent::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            ColorComponent::Float(_) => None,
            ColorComponent::Text(s) => s.trim().parse::<i64>().ok(),
            ColorComponent::Other(_) => None,
        };
        let value = value.ok_or_else(|| ConfigError::InvalidColor {
            field,
            reason: format!("non-numeric component {component:?}"),
        })?;
        *channel = u8::try_from(value).map_err(|_| ConfigError::InvalidColor {
            field,
            reason: format!("values must be 0-255, got {value}"),
        })?;
    }
    Ok(rgb)
}

fn non_negative(
    field: &'static str,
    value: Option<f32>,
    default: f32,
    issues: &mut Vec<ConfigError>,
) -> f32 {
    match value {
        None => default,
        Some(v) if v.is_finite() && v >= 0.0 => v,
        Some(v) => {
            issues.push(ConfigError::InvalidNumber {
                field,
                reason: format!("{v} must be a non-negative number"),
            });
            default
        }
    }
}

fn duration_tuning(raw: &RawDisplayConfig, issues: &mut Vec<ConfigError>) -> DurationTuning {
    let defaults = DurationTuning::default();
    let min_secs = non_negative("min_duration", raw.min_duration, defaults.min_secs, issues);
    let max_secs = non_negative("max_duration", raw.max_duration, defaults.max_secs, issues);
    let buffer = non_negative("duration_buffer", raw.duration_buffer, defaults.buffer, issues);

    let (min_secs, max_secs) = if min_secs > max_secs {
        issues.push(ConfigError::InvalidNumber {
            field: "min_duration",
            reason: format!("{min_secs} exceeds max_duration {max_secs}"),
        });
        (defaults.min_secs, defaults.max_secs)
    } else {
        (min_secs, max_secs)
    };

    DurationTuning {
        enabled: raw.dynamic_duration.unwrap_or(defaults.enabled),
        min_secs,
        max_secs,
        buffer,
    }
}
