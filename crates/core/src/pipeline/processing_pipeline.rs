use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use crate::detection::domain::coin_detector::CoinDetector;
use crate::mapping::coordinate_mapper::CoordinateMapper;
use crate::pipeline::diagnostics::{DiagnosticsSnapshot, PipelineDiagnostics};
use crate::pipeline::frame_fault::{FaultKind, FrameFault};
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::pipeline::result_sink::{DetectionBatch, ResultSink};
use crate::processing::frame_converter::FrameConverter;
use crate::processing::processor_config::{ProcessorConfig, SharedConfig};
use crate::processing::rate_limiter::FrameRateLimiter;
use crate::shared::frame::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Active,
}

/// What happened to one frame pushed into [`ProcessingPipeline::on_frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The pipeline is idle; the frame was ignored.
    Inactive,
    /// The rate limiter rejected the frame.
    Dropped,
    /// A batch with `regions` entries reached the sink.
    Delivered { regions: usize },
    /// The frame was processed but the sink no longer exists.
    Undeliverable,
    /// The frame was abandoned after a recoverable fault.
    Failed(FaultKind),
}

struct ControlState {
    config: SharedConfig,
    active: AtomicBool,
    diagnostics: PipelineDiagnostics,
}

/// Cloneable handle for the control side: lifecycle, configuration, and
/// diagnostics. Never blocks the producer thread.
#[derive(Clone)]
pub struct PipelineControl {
    inner: Arc<ControlState>,
}

impl PipelineControl {
    fn new(config: ProcessorConfig) -> Self {
        Self {
            inner: Arc::new(ControlState {
                config: SharedConfig::new(config),
                active: AtomicBool::new(false),
                diagnostics: PipelineDiagnostics::new(),
            }),
        }
    }

    /// Moves the pipeline to Active. Returns false if it already was.
    pub fn start(&self) -> bool {
        let started = !self.inner.active.swap(true, Ordering::AcqRel);
        if started {
            log::info!("Coin pipeline started");
        }
        started
    }

    /// Moves the pipeline to Idle. A frame already in flight completes.
    pub fn stop(&self) -> bool {
        let stopped = self.inner.active.swap(false, Ordering::AcqRel);
        if stopped {
            log::info!("Coin pipeline stopped");
        }
        stopped
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    pub fn state(&self) -> PipelineState {
        if self.is_active() {
            PipelineState::Active
        } else {
            PipelineState::Idle
        }
    }

    pub fn config(&self) -> ProcessorConfig {
        self.inner.config.load()
    }

    pub fn set_config(&self, config: ProcessorConfig) {
        self.inner.config.store(config);
    }

    pub fn target_fps(&self) -> f32 {
        self.config().target_fps
    }

    pub fn set_target_fps(&self, target_fps: f32) {
        self.inner.config.set_target_fps(target_fps);
    }

    pub fn grayscale(&self) -> bool {
        self.config().grayscale
    }

    pub fn set_grayscale(&self, grayscale: bool) {
        self.inner.config.set_grayscale(grayscale);
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.inner.diagnostics.snapshot()
    }

    fn counters(&self) -> &PipelineDiagnostics {
        &self.inner.diagnostics
    }
}

/// Rate-limit → convert → detect → map → dispatch, one frame at a time.
///
/// `on_frame` runs synchronously on the caller's (producer) thread. The sink
/// is held weakly so the pipeline never keeps the presentation layer alive;
/// once the sink is gone, dispatch silently does nothing.
pub struct ProcessingPipeline {
    control: PipelineControl,
    limiter: FrameRateLimiter,
    converter: FrameConverter,
    detector: Box<dyn CoinDetector>,
    mapper: CoordinateMapper,
    sink: Weak<dyn ResultSink>,
    logger: Box<dyn PipelineLogger>,
}

impl ProcessingPipeline {
    pub fn new(
        detector: Box<dyn CoinDetector>,
        sink: &Arc<dyn ResultSink>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            control: PipelineControl::new(config),
            limiter: FrameRateLimiter::new(config.target_fps),
            converter: FrameConverter::new(),
            detector,
            mapper: CoordinateMapper::new(),
            sink: Arc::downgrade(sink),
            logger: Box::new(NullPipelineLogger),
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn control(&self) -> PipelineControl {
        self.control.clone()
    }

    pub fn start(&self) -> bool {
        self.control.start()
    }

    pub fn stop(&self) -> bool {
        self.control.stop()
    }

    pub fn state(&self) -> PipelineState {
        self.control.state()
    }

    pub fn logger(&self) -> &dyn PipelineLogger {
        self.logger.as_ref()
    }

    /// Handles one captured frame. The frame is only borrowed for the
    /// duration of the call.
    pub fn on_frame(&mut self, frame: &Frame) -> FrameOutcome {
        if !self.control.is_active() {
            return FrameOutcome::Inactive;
        }
        let control = self.control.clone();
        let counters = control.counters();
        counters.record_received();

        let config = control.config();
        if config.target_fps.to_bits() != self.limiter.target_fps().to_bits() {
            self.logger.info(&format!(
                "Target rate changed {} -> {} fps",
                self.limiter.target_fps(),
                config.target_fps
            ));
            self.limiter.reconfigure(config.target_fps);
        }

        if !self.limiter.admit(frame.timestamp()) {
            counters.record_dropped();
            return FrameOutcome::Dropped;
        }

        let outcome = match self.process(frame, config) {
            Ok(Some(regions)) => {
                counters.record_delivered();
                FrameOutcome::Delivered { regions }
            }
            Ok(None) => {
                counters.record_undeliverable();
                log::debug!("Frame {}: result sink is gone, batch discarded", frame.index());
                FrameOutcome::Undeliverable
            }
            Err(fault) => {
                let kind = fault.kind();
                counters.record_fault(kind);
                log::warn!("Frame {} skipped ({kind}): {fault}", frame.index());
                FrameOutcome::Failed(kind)
            }
        };
        self.logger.frame_processed(frame.index());
        outcome
    }

    /// Returns the delivered region count, or `None` when the sink is gone.
    fn process(
        &mut self,
        frame: &Frame,
        config: ProcessorConfig,
    ) -> Result<Option<usize>, FrameFault> {
        let t0 = Instant::now();
        let converted = self.converter.convert(frame, config.grayscale)?;
        let t1 = Instant::now();
        self.logger.timing("convert", elapsed_ms(t0, t1));

        let pixel_regions = self.detector.detect(&converted)?;
        let t2 = Instant::now();
        self.logger.timing("detect", elapsed_ms(t1, t2));
        self.logger.metric("regions", pixel_regions.len() as f64);

        let Some(sink) = self.sink.upgrade() else {
            return Ok(None);
        };

        let context = sink.presentation_context();
        let regions = self.mapper.map_all(&pixel_regions, frame.size(), &context)?;
        self.logger.timing("map", elapsed_ms(t2, Instant::now()));

        let count = regions.len();
        sink.on_detections(DetectionBatch {
            frame_index: frame.index(),
            timestamp: frame.timestamp(),
            context,
            regions,
        });
        Ok(Some(count))
    }
}

fn elapsed_ms(from: Instant, to: Instant) -> f64 {
    to.duration_since(from).as_secs_f64() * 1000.0
}
