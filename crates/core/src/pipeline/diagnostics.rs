use std::sync::atomic::{AtomicU64, Ordering};

use crate::pipeline::frame_fault::FaultKind;

/// Lock-free per-pipeline counters.
///
/// Written by the producer thread, readable from anywhere. Keeps rate-limiter
/// drops apart from genuine failures, which the sink cannot tell apart.
#[derive(Default)]
pub struct PipelineDiagnostics {
    received: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
    undeliverable: AtomicU64,
    unsupported_format: AtomicU64,
    detection_failure: AtomicU64,
    invalid_surface_size: AtomicU64,
}

/// Point-in-time copy of [`PipelineDiagnostics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    pub received: u64,
    pub dropped: u64,
    pub delivered: u64,
    pub undeliverable: u64,
    pub unsupported_format: u64,
    pub detection_failure: u64,
    pub invalid_surface_size: u64,
}

impl DiagnosticsSnapshot {
    pub fn faults(&self, kind: FaultKind) -> u64 {
        match kind {
            FaultKind::UnsupportedFormat => self.unsupported_format,
            FaultKind::DetectionFailure => self.detection_failure,
            FaultKind::InvalidSurfaceSize => self.invalid_surface_size,
        }
    }

    pub fn total_faults(&self) -> u64 {
        FaultKind::ALL.iter().map(|k| self.faults(*k)).sum()
    }
}

impl PipelineDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_undeliverable(&self) {
        self.undeliverable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fault(&self, kind: FaultKind) {
        let counter = match kind {
            FaultKind::UnsupportedFormat => &self.unsupported_format,
            FaultKind::DetectionFailure => &self.detection_failure,
            FaultKind::InvalidSurfaceSize => &self.invalid_surface_size,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            undeliverable: self.undeliverable.load(Ordering::Relaxed),
            unsupported_format: self.unsupported_format.load(Ordering::Relaxed),
            detection_failure: self.detection_failure.load(Ordering::Relaxed),
            invalid_surface_size: self.invalid_surface_size.load(Ordering::Relaxed),
        }
    }
}
