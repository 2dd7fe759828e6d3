/// Font loading and glyph rasterization.
/// TTF/OTF go through rusttype; BDF and the built-in 5x7 face are bitmap fonts.
pub mod bdf;
pub mod bitmap;
pub mod builtin;

use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Rgb;
use crate::error::{FontLoadError, RenderError};
use crate::render::metrics::{Bounds, TextMetrics};

pub use bitmap::BitmapFont;

/// An outline font at a fixed pixel size
pub struct OutlineFont {
    font: rusttype::Font<'static>,
    size_px: f32,
}

impl OutlineFont {
    pub fn from_bytes(data: Vec<u8>, size_px: u32) -> Option<Self> {
        let font = rusttype::Font::try_from_vec(data)?;
        Some(Self {
            font,
            size_px: size_px as f32,
        })
    }

    fn layout_at(&self, text: &str, x: i32, y: i32) -> Vec<rusttype::PositionedGlyph<'static>> {
        let scale = rusttype::Scale::uniform(self.size_px);
        let v_metrics = self.font.v_metrics(scale);
        self.font
            .layout(
                text,
                scale,
                rusttype::point(x as f32, y as f32 + v_metrics.ascent),
            )
            .collect()
    }

    fn measure(&self, text: &str) -> Option<Bounds> {
        self.layout_at(text, 0, 0)
            .iter()
            .filter_map(|g| g.pixel_bounding_box())
            .map(|bb| Bounds::new(bb.min.x, bb.min.y, bb.max.x, bb.max.y))
            .reduce(Bounds::union)
    }

    fn draw(&self, image: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb) {
        for glyph in self.layout_at(text, x, y) {
            if let Some(bb) = glyph.pixel_bounding_box() {
                glyph.draw(|gx, gy, coverage| {
                    blend_pixel(
                        image,
                        bb.min.x + gx as i32,
                        bb.min.y + gy as i32,
                        color,
                        coverage,
                    );
                });
            }
        }
    }
}

/// Where a font came from, for logging and the info snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum FontSource {
    Builtin,
    File(PathBuf),
}

pub enum FontFace {
    Outline(OutlineFont),
    Bitmap(BitmapFont),
}

pub struct Font {
    face: FontFace,
    source: FontSource,
    size_px: u32,
}

impl Font {
    /// The built-in 5x7 face, scaled by whole pixels to approach `size_px`
    pub fn builtin(size_px: u32) -> Self {
        Self {
            face: FontFace::Bitmap(builtin::font(size_px)),
            source: FontSource::Builtin,
            size_px,
        }
    }

    pub fn from_face(face: FontFace, source: FontSource, size_px: u32) -> Self {
        Self {
            face,
            source,
            size_px,
        }
    }

    pub fn source(&self) -> &FontSource {
        &self.source
    }

    pub fn size_px(&self) -> u32 {
        self.size_px
    }

    /// Tight ink box of `text` relative to a pen origin at the top of the line.
    pub fn measure(&self, text: &str) -> Result<TextMetrics, RenderError> {
        if text.is_empty() {
            return Err(RenderError::EmptyText);
        }
        let bounds = match &self.face {
            FontFace::Outline(f) => f.measure(text),
            FontFace::Bitmap(f) => f.measure(text),
        };
        bounds
            .map(TextMetrics::from_bounds)
            .ok_or_else(|| RenderError::Unmeasurable(preview(text)))
    }

    /// Draw `text` with its pen origin at (x, y), y being the top of the line.
    pub fn draw(&self, image: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb) {
        match &self.face {
            FontFace::Outline(f) => f.draw(image, x, y, text, color),
            FontFace::Bitmap(f) => f.draw(image, x, y, text, color),
        }
    }
}

/// Load a TTF/OTF or BDF font from disk.
pub fn load_font(path: &Path, size_px: u32) -> Result<Font, FontLoadError> {
    if !path.exists() {
        return Err(FontLoadError::NotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let read = || {
        std::fs::read(path).map_err(|source| FontLoadError::Io {
            path: path.to_path_buf(),
            source,
        })
    };

    let face = match extension.as_str() {
        "ttf" | "otf" => {
            let data = read()?;
            let font = OutlineFont::from_bytes(data, size_px).ok_or_else(|| FontLoadError::Parse {
                path: path.to_path_buf(),
                reason: "not a valid TrueType/OpenType font".to_string(),
            })?;
            FontFace::Outline(font)
        }
        "bdf" => {
            let data = read()?;
            let source = String::from_utf8_lossy(&data);
            let font = bdf::parse(&source).map_err(|reason| FontLoadError::Parse {
                path: path.to_path_buf(),
                reason,
            })?;
            FontFace::Bitmap(font)
        }
        _ => return Err(FontLoadError::UnsupportedExtension(path.display().to_string())),
    };

    info!("Loaded font: {} ({}px)", path.display(), size_px);
    Ok(Font::from_face(face, FontSource::File(path.to_path_buf()), size_px))
}

/// Load the configured font, falling back to the built-in face on any error.
pub fn load_font_or_default(path: Option<&Path>, size_px: u32) -> Font {
    match path {
        None => Font::builtin(size_px),
        Some(path) => load_font(path, size_px).unwrap_or_else(|e| {
            warn!("{}, using default font", e);
            Font::builtin(size_px)
        }),
    }
}

/// Blend `color` over the pixel at (x, y) by `coverage` (0.0-1.0). Out-of-bounds is ignored.
pub fn blend_pixel(image: &mut RgbImage, x: i32, y: i32, color: Rgb, coverage: f32) {
    if x < 0 || y < 0 || x >= image.width() as i32 || y >= image.height() as i32 {
        return;
    }
    let a = coverage.clamp(0.0, 1.0);
    if a <= 0.0 {
        return;
    }
    let pixel = image.get_pixel_mut(x as u32, y as u32);
    for (dst, src) in pixel.0.iter_mut().zip(color) {
        *dst = (*dst as f32 * (1.0 - a) + src as f32 * a).round() as u8;
    }
}

/// First 30 characters of `text`, for log lines
pub fn preview(text: &str) -> String {
    text.chars().take(30).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_font_file() {
        let err = load_font(Path::new("/nonexistent/font.ttf"), 12).err().unwrap();
        assert!(matches!(err, FontLoadError::NotFound(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("font.woff");
        std::fs::write(&path, b"not a font").unwrap();
        let err = load_font(&path, 12).err().unwrap();
        assert!(matches!(err, FontLoadError::UnsupportedExtension(_)));
    }

    #[test]
    fn test_corrupt_ttf_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"garbage").unwrap();
        let err = load_font(&path, 12).err().unwrap();
        assert!(matches!(err, FontLoadError::Parse { .. }));
    }

    #[test]
    fn test_fallback_to_builtin() {
        let font = load_font_or_default(Some(Path::new("/nonexistent/font.ttf")), 8);
        assert_eq!(font.source(), &FontSource::Builtin);
        assert!(font.measure("A").is_ok());
    }

    #[test]
    fn test_load_bdf_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.bdf");
        std::fs::write(&path, bdf::tests::TINY_BDF).unwrap();
        let font = load_font(&path, 8).unwrap();
        assert_eq!(font.source(), &FontSource::File(path.clone()));
        let metrics = font.measure("AA").unwrap();
        assert_eq!(metrics.width, 7);
    }

    fn dejavu_sans() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/DejaVuSans.ttf")
    }

    #[test]
    fn test_load_outline_font() {
        let font = load_font(&dejavu_sans(), 16).unwrap();
        assert_eq!(font.source(), &FontSource::File(dejavu_sans()));
        assert_eq!(font.size_px(), 16);

        let metrics = font.measure("Hello").unwrap();
        assert!(!metrics.estimated);
        assert!((17..80).contains(&metrics.width), "{metrics:?}");
        // Cap height without descenders
        assert!((10..=16).contains(&metrics.height), "{metrics:?}");
        assert!(font.measure("Hello, World").unwrap().width > metrics.width);
        assert!(matches!(font.measure("   "), Err(RenderError::Unmeasurable(_))));
    }

    #[test]
    fn test_outline_text_draws_centered() {
        let font = load_font(&dejavu_sans(), 16).unwrap();
        let metrics = font.measure("Hello").unwrap();
        let mut image = RgbImage::new(80, 32);
        let (x, y) = metrics.centered_origin(80, 32);
        font.draw(&mut image, x, y, "Hello", [255, 255, 255]);

        let ink: Vec<(u32, u32)> = image
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0 != [0, 0, 0])
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!ink.is_empty());
        let left = ink.iter().map(|p| p.0).min().unwrap() as i32;
        let right = ink.iter().map(|p| p.0).max().unwrap() as i32 + 1;
        let top = ink.iter().map(|p| p.1).min().unwrap() as i32;
        let bottom = ink.iter().map(|p| p.1).max().unwrap() as i32 + 1;

        assert!(right - left <= metrics.width as i32);
        assert!(bottom - top <= metrics.height as i32);
        // Faint antialiased edges may round to black
        assert!((left - (80 - right)).abs() <= 2, "{left}..{right}");
        assert!((top - (32 - bottom)).abs() <= 2, "{top}..{bottom}");
    }

    #[test]
    fn test_blend_pixel() {
        let mut image = RgbImage::from_pixel(2, 1, image::Rgb([0, 0, 0]));
        blend_pixel(&mut image, 0, 0, [255, 255, 255], 1.0);
        blend_pixel(&mut image, 1, 0, [200, 100, 0], 0.5);
        blend_pixel(&mut image, 5, 5, [255, 255, 255], 1.0);
        assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(image.get_pixel(1, 0).0, [100, 50, 0]);
    }

    #[test]
    fn test_empty_text_is_not_measurable() {
        let font = Font::builtin(8);
        assert_eq!(font.measure(""), Err(RenderError::EmptyText));
    }
}
