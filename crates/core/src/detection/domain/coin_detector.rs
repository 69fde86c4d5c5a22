use thiserror::Error;

use crate::shared::frame::{Frame, PixelFormat};
use crate::shared::region::PixelRegion;

/// Raised only for frames whose data cannot be trusted. Finding nothing is
/// an empty result, never an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("frame has zero area ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
    #[error("cannot interpret pixel format {0:?}")]
    UnreadableFormat(PixelFormat),
    #[error("frame buffer holds {actual} bytes, {expected} expected for its geometry")]
    Corrupt { expected: usize, actual: usize },
}

/// Domain interface for coin detection.
///
/// Implementations may keep scratch buffers between frames, hence `&mut self`.
pub trait CoinDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<PixelRegion>, DetectionError>;
}

/// Checks that a frame's buffer matches its declared geometry.
pub fn validate_frame(frame: &Frame) -> Result<(), DetectionError> {
    let (width, height) = frame.size();
    if width == 0 || height == 0 {
        return Err(DetectionError::EmptyFrame { width, height });
    }
    let expected = frame
        .expected_len()
        .ok_or(DetectionError::UnreadableFormat(frame.format()))?;
    let actual = frame.data().len();
    if expected != actual {
        return Err(DetectionError::Corrupt { expected, actual });
    }
    Ok(())
}
