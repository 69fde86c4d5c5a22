use std::fmt;

use thiserror::Error;

use crate::detection::domain::coin_detector::DetectionError;
use crate::mapping::coordinate_mapper::MappingError;
use crate::processing::frame_converter::ConvertError;

/// Why a single admitted frame produced no batch.
///
/// Every variant is recoverable: it aborts the current frame only.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameFault {
    #[error("conversion failed: {0}")]
    Convert(#[from] ConvertError),
    #[error("detection failed: {0}")]
    Detect(#[from] DetectionError),
    #[error("mapping failed: {0}")]
    Map(#[from] MappingError),
}

/// Coarse fault categories counted by the pipeline diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultKind {
    UnsupportedFormat,
    DetectionFailure,
    InvalidSurfaceSize,
}

impl FaultKind {
    pub const ALL: &[FaultKind] = &[
        FaultKind::UnsupportedFormat,
        FaultKind::DetectionFailure,
        FaultKind::InvalidSurfaceSize,
    ];
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::UnsupportedFormat => write!(f, "unsupported_format"),
            FaultKind::DetectionFailure => write!(f, "detection_failure"),
            FaultKind::InvalidSurfaceSize => write!(f, "invalid_surface_size"),
        }
    }
}

impl FrameFault {
    pub fn kind(&self) -> FaultKind {
        match self {
            FrameFault::Convert(_) => FaultKind::UnsupportedFormat,
            FrameFault::Detect(_) => FaultKind::DetectionFailure,
            FrameFault::Map(MappingError::InvalidSurfaceSize { .. }) => {
                FaultKind::InvalidSurfaceSize
            }
            // A zero-sized frame is malformed input, not a surface problem.
            FrameFault::Map(MappingError::InvalidFrameSize { .. }) => FaultKind::DetectionFailure,
        }
    }
}
