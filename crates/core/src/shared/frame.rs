use std::time::Duration;

use ndarray::ArrayView3;

/// Pixel layout of a frame buffer.
///
/// `Other` carries an opaque four-character code reported by the capture
/// facility for layouts the pipeline cannot interpret (e.g. planar YUV).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Gray8,
    Rgb8,
    Rgba8,
    Bgra8,
    Other(u32),
}

impl PixelFormat {
    /// Bytes per pixel, or `None` for uninterpretable layouts.
    pub fn channels(&self) -> Option<u8> {
        match self {
            PixelFormat::Gray8 => Some(1),
            PixelFormat::Rgb8 => Some(3),
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => Some(4),
            PixelFormat::Other(_) => None,
        }
    }

    /// Byte offsets of the red, green, and blue samples within one pixel.
    pub fn rgb_offsets(&self) -> Option<[usize; 3]> {
        match self {
            PixelFormat::Rgb8 | PixelFormat::Rgba8 => Some([0, 1, 2]),
            PixelFormat::Bgra8 => Some([2, 1, 0]),
            PixelFormat::Gray8 | PixelFormat::Other(_) => None,
        }
    }
}

/// A captured video frame: row-major pixel bytes plus capture metadata.
///
/// The buffer is not validated on construction. Capture hardware can hand
/// over truncated buffers, and those must reach the pipeline so they can be
/// reported as per-frame faults instead of panicking the producer thread.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
    index: u64,
    timestamp: Duration,
}

impl Frame {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        index: u64,
        timestamp: Duration,
    ) -> Self {
        Self {
            data,
            width,
            height,
            format,
            index,
            timestamp,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// Buffer length implied by the declared geometry and format.
    pub fn expected_len(&self) -> Option<usize> {
        self.format
            .channels()
            .map(|c| self.width as usize * self.height as usize * c as usize)
    }

    /// True when the buffer length matches the declared geometry and the
    /// frame has a non-zero area.
    pub fn is_well_formed(&self) -> bool {
        self.width > 0 && self.height > 0 && self.expected_len() == Some(self.data.len())
    }

    /// Views the buffer as `(height, width, channels)`.
    ///
    /// Returns `None` for malformed frames.
    pub fn as_ndarray(&self) -> Option<ArrayView3<'_, u8>> {
        let channels = self.format.channels()? as usize;
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, channels),
            &self.data,
        )
        .ok()
    }
}
