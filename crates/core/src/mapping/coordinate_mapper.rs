use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::shared::region::{PixelRegion, PresentationRegion};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error("presentation surface must have positive size, got {width}x{height}")]
    InvalidSurfaceSize { width: f64, height: f64 },
    #[error("frame must have positive size, got {width}x{height}")]
    InvalidFrameSize { width: u32, height: u32 },
}

/// How a frame's rectangle is laid onto a differently shaped surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FillMode {
    /// Independent x/y scaling; the frame covers the surface exactly.
    Stretch,
    /// Uniform scale, whole frame visible, letterboxed or pillarboxed.
    AspectFit,
    /// Uniform scale, surface fully covered, frame cropped.
    AspectFill,
}

impl FillMode {
    pub const ALL: &[FillMode] = &[FillMode::Stretch, FillMode::AspectFit, FillMode::AspectFill];
}

impl fmt::Display for FillMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillMode::Stretch => write!(f, "stretch"),
            FillMode::AspectFit => write!(f, "aspect-fit"),
            FillMode::AspectFill => write!(f, "aspect-fill"),
        }
    }
}

impl FromStr for FillMode {
    type Err = String;

    /// Accepts kebab-case names and the camera framework's video-gravity
    /// names (`resize`, `resizeAspect`, `resizeAspectFill`, optionally
    /// prefixed with `AVLayerVideoGravity`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix("AVLayerVideoGravity").unwrap_or(s);
        match name.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "stretch" | "resize" => Ok(FillMode::Stretch),
            "aspectfit" | "resizeaspect" => Ok(FillMode::AspectFit),
            "aspectfill" | "resizeaspectfill" => Ok(FillMode::AspectFill),
            _ => Err(format!(
                "unknown fill mode '{s}', expected stretch, aspect-fit or aspect-fill"
            )),
        }
    }
}

/// Surface geometry captured once per admitted frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PresentationContext {
    pub surface_width: f64,
    pub surface_height: f64,
    pub fill_mode: FillMode,
}

impl PresentationContext {
    pub fn new(surface_width: f64, surface_height: f64, fill_mode: FillMode) -> Self {
        Self {
            surface_width,
            surface_height,
            fill_mode,
        }
    }
}

/// Scale and offset that carry frame pixels onto one surface.
///
/// Built once per frame and applied to every region of that frame's batch,
/// so a batch never mixes two surface states.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceTransform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl SurfaceTransform {
    pub fn new(
        frame_size: (u32, u32),
        context: &PresentationContext,
    ) -> Result<Self, MappingError> {
        let (sw, sh) = (context.surface_width, context.surface_height);
        if !(sw.is_finite() && sh.is_finite() && sw > 0.0 && sh > 0.0) {
            return Err(MappingError::InvalidSurfaceSize {
                width: sw,
                height: sh,
            });
        }
        let (fw, fh) = frame_size;
        if fw == 0 || fh == 0 {
            return Err(MappingError::InvalidFrameSize {
                width: fw,
                height: fh,
            });
        }

        let (fw, fh) = (fw as f64, fh as f64);
        let ratio_x = sw / fw;
        let ratio_y = sh / fh;

        let transform = match context.fill_mode {
            FillMode::Stretch => Self {
                scale_x: ratio_x,
                scale_y: ratio_y,
                offset_x: 0.0,
                offset_y: 0.0,
            },
            FillMode::AspectFit => Self::centered(ratio_x.min(ratio_y), fw, fh, sw, sh),
            FillMode::AspectFill => Self::centered(ratio_x.max(ratio_y), fw, fh, sw, sh),
        };
        Ok(transform)
    }

    fn centered(scale: f64, fw: f64, fh: f64, sw: f64, sh: f64) -> Self {
        Self {
            scale_x: scale,
            scale_y: scale,
            offset_x: (sw - fw * scale) / 2.0,
            offset_y: (sh - fh * scale) / 2.0,
        }
    }

    pub fn apply(&self, region: &PixelRegion) -> PresentationRegion {
        PresentationRegion::new(
            region.x as f64 * self.scale_x + self.offset_x,
            region.y as f64 * self.scale_y + self.offset_y,
            region.width as f64 * self.scale_x,
            region.height as f64 * self.scale_y,
        )
    }

    /// Carries a surface rectangle back into frame pixel space, as
    /// `(x, y, width, height)` in fractional pixels.
    pub fn invert(&self, region: &PresentationRegion) -> (f64, f64, f64, f64) {
        (
            (region.x - self.offset_x) / self.scale_x,
            (region.y - self.offset_y) / self.scale_y,
            region.width / self.scale_x,
            region.height / self.scale_y,
        )
    }
}

/// Maps pixel-space regions into presentation space.
#[derive(Clone, Copy, Debug, Default)]
pub struct CoordinateMapper;

impl CoordinateMapper {
    pub fn new() -> Self {
        Self
    }

    pub fn map(
        &self,
        region: &PixelRegion,
        frame_size: (u32, u32),
        context: &PresentationContext,
    ) -> Result<PresentationRegion, MappingError> {
        Ok(SurfaceTransform::new(frame_size, context)?.apply(region))
    }

    /// Maps a whole batch against one transform.
    pub fn map_all(
        &self,
        regions: &[PixelRegion],
        frame_size: (u32, u32),
        context: &PresentationContext,
    ) -> Result<Vec<PresentationRegion>, MappingError> {
        let transform = SurfaceTransform::new(frame_size, context)?;
        Ok(regions.iter().map(|r| transform.apply(r)).collect())
    }
}
