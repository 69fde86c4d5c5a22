use std::sync::{Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender};
use crossbeam_utils::atomic::AtomicCell;

use crate::mapping::coordinate_mapper::{FillMode, PresentationContext};
use crate::pipeline::result_sink::{DetectionBatch, ResultSink};

/// Result sink that forwards every batch over an unbounded channel.
///
/// The presentation side owns the receiver and drains it on its own thread.
/// Surface size and fill mode are kept together in one [`AtomicCell`], so the
/// producer reads them as a single snapshot and never waits on the consumer.
pub struct ChannelResultSink {
    context: AtomicCell<PresentationContext>,
    // Serializes partial updates from the presentation side; readers skip it.
    update_lock: Mutex<()>,
    batch_tx: Sender<DetectionBatch>,
}

impl ChannelResultSink {
    pub fn new(
        surface_width: f64,
        surface_height: f64,
        fill_mode: FillMode,
    ) -> (Self, Receiver<DetectionBatch>) {
        let (batch_tx, batch_rx) = crossbeam_channel::unbounded();
        let sink = Self {
            context: AtomicCell::new(PresentationContext::new(
                surface_width,
                surface_height,
                fill_mode,
            )),
            update_lock: Mutex::new(()),
            batch_tx,
        };
        (sink, batch_rx)
    }

    /// Replaces size and fill mode in one step. Takes effect for the next
    /// admitted frame.
    pub fn set_presentation(&self, context: PresentationContext) {
        let _guard = self.update_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.context.store(context);
    }

    pub fn set_surface_size(&self, width: f64, height: f64) {
        self.update(|c| {
            c.surface_width = width;
            c.surface_height = height;
        });
    }

    pub fn set_fill_mode(&self, fill_mode: FillMode) {
        self.update(|c| c.fill_mode = fill_mode);
    }

    fn update(&self, apply: impl FnOnce(&mut PresentationContext)) {
        let _guard = self.update_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut context = self.context.load();
        apply(&mut context);
        self.context.store(context);
    }
}

impl ResultSink for ChannelResultSink {
    fn presentation_surface_size(&self) -> (f64, f64) {
        let context = self.context.load();
        (context.surface_width, context.surface_height)
    }

    fn fill_mode(&self) -> FillMode {
        self.context.load().fill_mode
    }

    fn presentation_context(&self) -> PresentationContext {
        self.context.load()
    }

    fn on_detections(&self, batch: DetectionBatch) {
        // A closed receiver means nobody is presenting anymore.
        if self.batch_tx.send(batch).is_err() {
            log::trace!("Detection batch dropped: receiver closed");
        }
    }
}
