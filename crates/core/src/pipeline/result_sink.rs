use std::time::Duration;

use crate::mapping::coordinate_mapper::{FillMode, PresentationContext};
use crate::shared::region::PresentationRegion;

/// Every presentation-space region found in one admitted frame.
///
/// Region order is whatever the detector produced; the batch may be empty.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionBatch {
    pub frame_index: u64,
    pub timestamp: Duration,
    /// Surface geometry the regions were mapped against.
    pub context: PresentationContext,
    pub regions: Vec<PresentationRegion>,
}

impl DetectionBatch {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }
}

/// Consumer of detection results and owner of the presentation surface.
///
/// Called from the producer thread. `presentation_surface_size` and
/// `fill_mode` must answer without waiting on the presentation thread;
/// `on_detections` must hand the batch over without reordering.
pub trait ResultSink: Send + Sync {
    fn presentation_surface_size(&self) -> (f64, f64);

    fn fill_mode(&self) -> FillMode;

    fn on_detections(&self, batch: DetectionBatch);

    /// Size and fill mode read together for one frame.
    fn presentation_context(&self) -> PresentationContext {
        let (width, height) = self.presentation_surface_size();
        PresentationContext::new(width, height, self.fill_mode())
    }
}
