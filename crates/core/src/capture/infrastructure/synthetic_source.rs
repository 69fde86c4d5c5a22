use std::time::Duration;

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::{Frame, PixelFormat};

const BACKGROUND_RGB: [u8; 3] = [28, 30, 34];
const COIN_RGB: [u8; 3] = [212, 176, 96];

/// A filled circle moving at a constant velocity (pixels per frame).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Disc {
    pub cx: f64,
    pub cy: f64,
    pub radius: f64,
    pub vx: f64,
    pub vy: f64,
}

impl Disc {
    pub fn still(cx: f64, cy: f64, radius: f64) -> Self {
        Self {
            cx,
            cy,
            radius,
            vx: 0.0,
            vy: 0.0,
        }
    }

    fn at_step(&self, step: u64) -> Disc {
        Disc {
            cx: self.cx + self.vx * step as f64,
            cy: self.cy + self.vy * step as f64,
            ..*self
        }
    }

    fn contains(&self, x: f64, y: f64) -> bool {
        let dx = x - self.cx;
        let dy = y - self.cy;
        dx * dx + dy * dy <= self.radius * self.radius
    }
}

/// Renders coin-colored discs over a dark background.
///
/// Formats without a known channel layout yield an empty buffer, which
/// makes this handy for producing deliberately corrupt frames.
pub fn render_discs(
    width: u32,
    height: u32,
    discs: &[Disc],
    format: PixelFormat,
    index: u64,
    timestamp: Duration,
) -> Frame {
    let channels = format.channels().unwrap_or(0) as usize;
    let mut data = Vec::with_capacity(width as usize * height as usize * channels);
    let gray = |rgb: [u8; 3]| crate::processing::frame_converter::luma(rgb[0], rgb[1], rgb[2]);

    if channels > 0 {
        for y in 0..height {
            for x in 0..width {
                let (px, py) = (x as f64 + 0.5, y as f64 + 0.5);
                let rgb = if discs.iter().any(|d| d.contains(px, py)) {
                    COIN_RGB
                } else {
                    BACKGROUND_RGB
                };
                match format {
                    PixelFormat::Gray8 => data.push(gray(rgb)),
                    PixelFormat::Rgb8 => data.extend_from_slice(&rgb),
                    PixelFormat::Rgba8 => data.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]),
                    PixelFormat::Bgra8 => data.extend_from_slice(&[rgb[2], rgb[1], rgb[0], 255]),
                    PixelFormat::Other(_) => {}
                }
            }
        }
    }

    Frame::new(data, width, height, format, index, timestamp)
}

/// Generates a fixed number of frames at a nominal capture rate.
///
/// With no discs this produces blank frames.
pub struct SyntheticCoinSource {
    width: u32,
    height: u32,
    discs: Vec<Disc>,
    format: PixelFormat,
    frame_count: u64,
    capture_fps: f64,
}

impl SyntheticCoinSource {
    pub fn new(
        width: u32,
        height: u32,
        frame_count: u64,
        capture_fps: f64,
    ) -> Result<Self, &'static str> {
        if width == 0 || height == 0 {
            return Err("synthetic frame size must be non-zero");
        }
        if !capture_fps.is_finite() || capture_fps <= 0.0 {
            return Err("capture_fps must be positive");
        }
        Ok(Self {
            width,
            height,
            discs: Vec::new(),
            format: PixelFormat::Rgb8,
            frame_count,
            capture_fps,
        })
    }

    pub fn with_discs(mut self, discs: Vec<Disc>) -> Self {
        self.discs = discs;
        self
    }

    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }

    fn frame_at(&self, index: u64) -> Frame {
        let discs: Vec<Disc> = self.discs.iter().map(|d| d.at_step(index)).collect();
        let timestamp = Duration::from_secs_f64(index as f64 / self.capture_fps);
        render_discs(
            self.width,
            self.height,
            &discs,
            self.format,
            index,
            timestamp,
        )
    }
}

impl FrameSource for SyntheticCoinSource {
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        Box::new(
            (0..self.frame_count)
                .map(move |i| Ok::<_, Box<dyn std::error::Error>>(self.frame_at(i))),
        )
    }

    fn close(&mut self) {}
}
