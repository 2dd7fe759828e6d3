/// Display sinks: where finished frames go.
use anyhow::{Context, Result};
use image::RgbImage;
use std::io::Write;
use std::path::{Path, PathBuf};
use tiny_skia::Pixmap;
use tracing::debug;

use crate::config::OutputMode;

/// A matrix-sized surface the controller draws into, and a way to push it out.
pub trait DisplaySink {
    fn image_mut(&mut self) -> &mut RgbImage;

    fn present_frame(&mut self) -> Result<()>;

    /// Hint that content is (or stopped) scrolling; sinks may ignore it
    fn set_scrolling_active(&mut self, _active: bool) {}
}

/// Software framebuffer backed by a tiny-skia pixmap.
pub struct PixmapSink {
    image: RgbImage,
    framebuffer: Pixmap,
    mode: OutputMode,
    output_path: PathBuf,
    /// Frames between PNG snapshots
    png_interval: u64,
    frames: u64,
    scrolling: bool,
}

impl PixmapSink {
    pub fn new(
        width: u32,
        height: u32,
        fps: u32,
        mode: OutputMode,
        output_path: &Path,
    ) -> Result<Self> {
        let framebuffer = Pixmap::new(width, height)
            .with_context(|| format!("Failed to create {width}x{height} framebuffer"))?;
        Ok(Self {
            image: RgbImage::new(width, height),
            framebuffer,
            mode,
            output_path: output_path.to_path_buf(),
            png_interval: (fps as u64 * 5).max(1),
            frames: 0,
            scrolling: false,
        })
    }

    pub fn framebuffer(&self) -> &Pixmap {
        &self.framebuffer
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames
    }

    pub fn is_scrolling(&self) -> bool {
        self.scrolling
    }

    /// Copy the RGB frame into the RGBA framebuffer (fully opaque)
    fn blit(&mut self) {
        let data = self.framebuffer.data_mut();
        for (dst, src) in data.chunks_exact_mut(4).zip(self.image.as_raw().chunks_exact(3)) {
            dst[..3].copy_from_slice(src);
            dst[3] = 255;
        }
    }
}

impl DisplaySink for PixmapSink {
    fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    fn present_frame(&mut self) -> Result<()> {
        self.blit();

        match self.mode {
            OutputMode::Png => {
                if self.frames % self.png_interval == 0 {
                    self.framebuffer
                        .save_png(&self.output_path)
                        .map_err(|e| anyhow::anyhow!("Failed to save PNG: {}", e))?;
                    debug!("Saved frame {} to {}", self.frames, self.output_path.display());
                }
            }
            OutputMode::Raw => {
                let mut stdout = std::io::stdout().lock();
                stdout
                    .write_all(self.image.as_raw())
                    .and_then(|_| stdout.flush())
                    .context("Failed to write frame to stdout")?;
            }
            OutputMode::Discard => {}
        }

        self.frames += 1;
        Ok(())
    }

    fn set_scrolling_active(&mut self, active: bool) {
        if self.scrolling != active {
            debug!("Scrolling {}", if active { "started" } else { "stopped" });
            self.scrolling = active;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_present_copies_into_framebuffer() {
        let unused = Path::new("unused.png");
        let mut sink = PixmapSink::new(4, 2, 30, OutputMode::Discard, unused).unwrap();
        sink.image_mut().put_pixel(1, 1, Rgb([10, 20, 30]));
        sink.present_frame().unwrap();

        let pixel = sink.framebuffer().pixel(1, 1).unwrap();
        assert_eq!(
            (pixel.red(), pixel.green(), pixel.blue(), pixel.alpha()),
            (10, 20, 30, 255)
        );
        assert_eq!(sink.frames_presented(), 1);
    }

    #[test]
    fn test_png_snapshot_on_first_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let mut sink = PixmapSink::new(8, 8, 30, OutputMode::Png, &path).unwrap();
        sink.present_frame().unwrap();
        assert!(path.exists());

        std::fs::remove_file(&path).unwrap();
        sink.present_frame().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_zero_sized_sink_fails() {
        assert!(PixmapSink::new(0, 8, 30, OutputMode::Discard, Path::new("x.png")).is_err());
    }

    #[test]
    fn test_scrolling_hint() {
        let mut sink = PixmapSink::new(4, 4, 30, OutputMode::Discard, Path::new("x.png")).unwrap();
        sink.set_scrolling_active(true);
        assert!(sink.is_scrolling());
    }
}
