/// Processing rate used when no configuration is supplied.
pub const DEFAULT_TARGET_FPS: f32 = 15.0;

/// Longest side of the detector's working image, in pixels.
pub const DEFAULT_SEARCH_RESOLUTION: u32 = 160;

/// Upper bound on coins reported for one frame.
pub const MAX_COINS_PER_FRAME: usize = 16;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
