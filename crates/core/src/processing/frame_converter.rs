use std::borrow::Cow;

use thiserror::Error;

use crate::shared::frame::{Frame, PixelFormat};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    #[error("unsupported pixel format {0:?}")]
    UnsupportedFormat(PixelFormat),
    #[error("frame buffer holds {actual} bytes, {expected} expected for its geometry")]
    BufferSize { expected: usize, actual: usize },
}

/// Integer BT.601 luma: `(77 R + 150 G + 29 B + 128) >> 8`.
///
/// Weights sum to 256, so pure white maps to 255 and pure black to 0.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32 + 128) >> 8) as u8
}

/// Reduces color frames to single-channel intensity on request.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameConverter;

impl FrameConverter {
    pub fn new() -> Self {
        Self
    }

    /// Returns the input untouched when `grayscale` is off or the frame is
    /// already single-channel; otherwise a new `Gray8` frame of the same size.
    pub fn convert<'a>(
        &self,
        frame: &'a Frame,
        grayscale: bool,
    ) -> Result<Cow<'a, Frame>, ConvertError> {
        if !grayscale {
            return Ok(Cow::Borrowed(frame));
        }

        let format = frame.format();
        if format == PixelFormat::Gray8 {
            check_len(frame)?;
            return Ok(Cow::Borrowed(frame));
        }

        let offsets = format
            .rgb_offsets()
            .ok_or(ConvertError::UnsupportedFormat(format))?;
        let channels = format
            .channels()
            .ok_or(ConvertError::UnsupportedFormat(format))? as usize;
        check_len(frame)?;

        let [ri, gi, bi] = offsets;
        let data: Vec<u8> = frame
            .data()
            .chunks_exact(channels)
            .map(|px| luma(px[ri], px[gi], px[bi]))
            .collect();

        Ok(Cow::Owned(Frame::new(
            data,
            frame.width(),
            frame.height(),
            PixelFormat::Gray8,
            frame.index(),
            frame.timestamp(),
        )))
    }
}

fn check_len(frame: &Frame) -> Result<(), ConvertError> {
    let expected = frame
        .expected_len()
        .ok_or(ConvertError::UnsupportedFormat(frame.format()))?;
    let actual = frame.data().len();
    if expected != actual {
        return Err(ConvertError::BufferSize { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    fn frame(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Frame {
        Frame::new(data, width, height, format, 3, Duration::from_millis(100))
    }

    fn gradient_rgb(width: u32, height: u32) -> Frame {
        let data = (0..width * height * 3).map(|i| (i * 7 % 256) as u8).collect();
        frame(data, width, height, PixelFormat::Rgb8)
    }

    #[test]
    fn test_disabled_returns_same_reference() {
        let input = gradient_rgb(4, 4);
        let out = FrameConverter::new().convert(&input, false).unwrap();
        match out {
            Cow::Borrowed(f) => assert!(std::ptr::eq(f, &input)),
            Cow::Owned(_) => panic!("disabled conversion must not copy"),
        }
    }

    #[test]
    fn test_disabled_passes_even_unsupported_formats() {
        let input = frame(vec![0; 6], 2, 2, PixelFormat::Other(0x3231_564e));
        assert!(FrameConverter::new().convert(&input, false).is_ok());
    }

    #[rstest]
    #[case::rgb(PixelFormat::Rgb8)]
    #[case::rgba(PixelFormat::Rgba8)]
    #[case::bgra(PixelFormat::Bgra8)]
    fn test_enabled_yields_single_channel_same_size(#[case] format: PixelFormat) {
        let channels = format.channels().unwrap() as u32;
        let input = frame(vec![90; (6 * 5 * channels) as usize], 6, 5, format);
        let out = FrameConverter::new().convert(&input, true).unwrap();
        assert_eq!(out.format(), PixelFormat::Gray8);
        assert_eq!(out.size(), (6, 5));
        assert_eq!(out.data().len(), 30);
        assert_eq!(out.index(), 3);
        assert_eq!(out.timestamp(), Duration::from_millis(100));
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let input = gradient_rgb(16, 9);
        let converter = FrameConverter::new();
        let a = converter.convert(&input, true).unwrap();
        let b = converter.convert(&input, true).unwrap();
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn test_luma_weights() {
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(255, 0, 0), 77);
        assert_eq!(luma(0, 255, 0), 149);
        assert_eq!(luma(0, 0, 255), 29);
    }

    #[test]
    fn test_bgra_reads_channels_in_memory_order() {
        // Pure red stored as B, G, R, A.
        let input = frame(vec![0, 0, 255, 255], 1, 1, PixelFormat::Bgra8);
        let out = FrameConverter::new().convert(&input, true).unwrap();
        assert_eq!(out.data(), &[77]);
    }

    #[test]
    fn test_gray_input_is_not_copied() {
        let input = frame(vec![10; 4], 2, 2, PixelFormat::Gray8);
        let out = FrameConverter::new().convert(&input, true).unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let input = frame(vec![0; 6], 2, 2, PixelFormat::Other(0x3231_564e));
        let err = FrameConverter::new().convert(&input, true).unwrap_err();
        assert_eq!(err, ConvertError::UnsupportedFormat(PixelFormat::Other(0x3231_564e)));
    }

    #[test]
    fn test_truncated_buffer_rejected() {
        let input = frame(vec![0; 10], 2, 2, PixelFormat::Rgb8);
        let err = FrameConverter::new().convert(&input, true).unwrap_err();
        assert_eq!(
            err,
            ConvertError::BufferSize {
                expected: 12,
                actual: 10
            }
        );
    }
}
