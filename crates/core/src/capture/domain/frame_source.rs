use crate::shared::frame::Frame;

/// Produces captured frames in delivery order.
///
/// Stands in for the camera facility: the capture session pulls from a
/// source on its producer thread and pushes each frame into the pipeline.
pub trait FrameSource: Send {
    /// Returns an iterator over frames in capture order.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases any resources held by the source.
    fn close(&mut self);
}
