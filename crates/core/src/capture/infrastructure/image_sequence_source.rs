use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::{Frame, PixelFormat};

/// Replays still images as a camera feed.
///
/// Each file is decoded lazily into an RGB frame. Timestamps advance by
/// `1 / capture_fps` per frame, continuing across loops so the rate limiter
/// sees a monotonic clock.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    capture_fps: f64,
    loops: u32,
}

impl ImageSequenceSource {
    pub fn new(paths: Vec<PathBuf>, capture_fps: f64) -> Result<Self, &'static str> {
        if paths.is_empty() {
            return Err("image sequence needs at least one path");
        }
        if !capture_fps.is_finite() || capture_fps <= 0.0 {
            return Err("capture_fps must be positive");
        }
        Ok(Self {
            paths,
            capture_fps,
            loops: 1,
        })
    }

    /// Expands directories into their image files (sorted by name) and keeps
    /// plain file paths as given.
    pub fn collect_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
        let mut paths = Vec::new();
        for input in inputs {
            if input.is_dir() {
                let mut found: Vec<PathBuf> = std::fs::read_dir(input)?
                    .filter_map(|entry| entry.ok().map(|e| e.path()))
                    .filter(|p| is_image_file(p))
                    .collect();
                found.sort();
                paths.extend(found);
            } else {
                paths.push(input.clone());
            }
        }
        Ok(paths)
    }

    /// Plays the whole sequence `loops` times. Zero is treated as one.
    pub fn with_loops(mut self, loops: u32) -> Self {
        self.loops = loops.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.paths.len() * self.loops as usize
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn load_frame(
    path: &Path,
    index: u64,
    timestamp: Duration,
) -> Result<Frame, Box<dyn std::error::Error>> {
    let rgb = image::open(path)
        .map_err(|e| format!("{}: {e}", path.display()))?
        .to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Frame::new(
        rgb.into_raw(),
        width,
        height,
        PixelFormat::Rgb8,
        index,
        timestamp,
    ))
}

impl FrameSource for ImageSequenceSource {
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let fps = self.capture_fps;
        let paths = &self.paths;
        Box::new(
            (0..self.loops)
                .flat_map(move |_| paths.iter())
                .enumerate()
                .map(move |(i, path)| {
                    let index = i as u64;
                    load_frame(path, index, Duration::from_secs_f64(index as f64 / fps))
                }),
        )
    }

    fn close(&mut self) {}
}
