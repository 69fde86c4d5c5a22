use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::capture::domain::frame_source::FrameSource;
use crate::pipeline::processing_pipeline::{PipelineControl, ProcessingPipeline};

type SessionError = Box<dyn std::error::Error + Send + Sync>;

/// How the producer thread spaces frames out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Pacing {
    /// Push frames as fast as the source yields them.
    #[default]
    AsFastAsPossible,
    /// Sleep so frames arrive at their capture timestamps, like a live camera.
    Realtime,
}

/// Owns the producer thread that feeds a frame source into the pipeline.
///
/// Layout: `source → [producer thread: on_frame] → sink`
///
/// The pipeline is started before the thread spawns and stopped when the
/// source runs dry or [`stop`](Self::stop) is called.
pub struct CaptureSession {
    control: PipelineControl,
    handle: JoinHandle<Result<ProcessingPipeline, SessionError>>,
}

impl CaptureSession {
    pub fn spawn(
        source: Box<dyn FrameSource>,
        pipeline: ProcessingPipeline,
        pacing: Pacing,
    ) -> Self {
        let control = pipeline.control();
        control.start();
        let handle = spawn_producer(source, pipeline, pacing);
        Self { control, handle }
    }

    pub fn control(&self) -> PipelineControl {
        self.control.clone()
    }

    /// Ends capture after the frame currently in flight.
    pub fn stop(&self) {
        self.control.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the producer thread and hands the pipeline back.
    pub fn join(self) -> Result<ProcessingPipeline, Box<dyn std::error::Error>> {
        match self.handle.join() {
            Ok(Ok(pipeline)) => Ok(pipeline),
            Ok(Err(e)) => Err(e.to_string().into()),
            Err(_) => Err("capture thread panicked".into()),
        }
    }
}

fn spawn_producer(
    mut source: Box<dyn FrameSource>,
    mut pipeline: ProcessingPipeline,
    pacing: Pacing,
) -> JoinHandle<Result<ProcessingPipeline, SessionError>> {
    std::thread::spawn(move || {
        let control = pipeline.control();
        let started = Instant::now();
        let mut first_timestamp: Option<Duration> = None;
        let mut result: Result<(), SessionError> = Ok(());

        for item in source.frames() {
            if !control.is_active() {
                break;
            }
            let frame = match item {
                Ok(frame) => frame,
                Err(e) => {
                    log::error!("Frame source failed: {e}");
                    result = Err(e.to_string().into());
                    break;
                }
            };

            if pacing == Pacing::Realtime {
                let base = *first_timestamp.get_or_insert(frame.timestamp());
                if let Some(offset) = frame.timestamp().checked_sub(base) {
                    if let Some(wait) = offset.checked_sub(started.elapsed()) {
                        std::thread::sleep(wait);
                    }
                }
            }

            pipeline.on_frame(&frame);
        }

        control.stop();
        source.close();
        result.map(|()| pipeline)
    })
}
