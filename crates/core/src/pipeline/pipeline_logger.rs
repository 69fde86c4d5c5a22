use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for per-frame pipeline costs.
///
/// The orchestrator reports stage durations and counts here without knowing
/// where they end up.
pub trait PipelineLogger: Send {
    /// One admitted frame went through the whole pipeline (or faulted).
    fn frame_processed(&mut self, index: u64);

    /// Duration of a named stage (`convert`, `detect`, `map`) for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// A per-frame measurement such as the number of regions found.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Report what was aggregated so far. Default: nothing.
    fn summary(&self) {}
}

pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn frame_processed(&mut self, _index: u64) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running aggregate for one stage or metric.
///
/// A live feed never ends, so samples are folded in rather than stored.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningStats {
    pub count: u64,
    pub sum: f64,
    pub max: f64,
    pub last: f64,
}

impl RunningStats {
    fn push(&mut self, value: f64) {
        if self.count == 0 || value > self.max {
            self.max = value;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Folds stage timings and metrics into [`RunningStats`] and reports through
/// `log`, with a progress line every `throttle_frames` frames.
pub struct LogPipelineLogger {
    throttle_frames: u64,
    stages: BTreeMap<String, RunningStats>,
    metrics: BTreeMap<String, RunningStats>,
    started: Instant,
    frames: u64,
}

impl LogPipelineLogger {
    pub fn new(throttle_frames: u64) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            stages: BTreeMap::new(),
            metrics: BTreeMap::new(),
            started: Instant::now(),
            frames: 0,
        }
    }

    pub fn stage(&self, stage: &str) -> Option<RunningStats> {
        self.stages.get(stage).copied()
    }

    pub fn metric_stats(&self, name: &str) -> Option<RunningStats> {
        self.metrics.get(name).copied()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Multi-line report, or `None` before any frame has been measured.
    pub fn report(&self) -> Option<String> {
        if self.stages.is_empty() && self.metrics.is_empty() {
            return None;
        }
        let secs = self.started.elapsed().as_secs_f64();
        let mut out = format!("{} frames processed in {secs:.1}s", self.frames);

        for (stage, stats) in &self.stages {
            out.push_str(&format!(
                "\n  {stage:8} avg {:6.2}ms  max {:6.2}ms  total {:7.0}ms",
                stats.mean(),
                stats.max,
                stats.sum
            ));
        }
        for (name, stats) in &self.metrics {
            out.push_str(&format!("\n  {name}: avg {:.1}, max {:.0}", stats.mean(), stats.max));
        }
        if self.frames > 0 && secs > 0.0 {
            out.push_str(&format!("\n  {:.1} frames/s", self.frames as f64 / secs));
        }
        Some(out)
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn frame_processed(&mut self, index: u64) {
        self.frames += 1;
        if self.frames % self.throttle_frames != 0 {
            return;
        }
        let detect_ms = self.stage("detect").map(|s| s.last).unwrap_or(0.0);
        log::info!(
            "{} frames processed (frame #{index}, detect {detect_ms:.1}ms)",
            self.frames
        );
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.stages.entry(stage.to_owned()).or_default().push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_owned()).or_default().push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(report) = self.report() {
            log::info!("Pipeline summary: {report}");
        }
    }
}
