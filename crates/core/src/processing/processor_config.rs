use std::sync::atomic::{AtomicU64, Ordering};

use crate::shared::constants::DEFAULT_TARGET_FPS;

const GRAYSCALE_BIT: u64 = 1 << 32;

/// Per-frame processing settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProcessorConfig {
    /// Frames per second to admit. Zero or negative pauses processing.
    pub target_fps: f32,
    /// Convert frames to single-channel intensity before detection.
    pub grayscale: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            target_fps: DEFAULT_TARGET_FPS,
            grayscale: false,
        }
    }
}

impl ProcessorConfig {
    fn pack(&self) -> u64 {
        let mut bits = self.target_fps.to_bits() as u64;
        if self.grayscale {
            bits |= GRAYSCALE_BIT;
        }
        bits
    }

    fn unpack(bits: u64) -> Self {
        Self {
            target_fps: f32::from_bits(bits as u32),
            grayscale: bits & GRAYSCALE_BIT != 0,
        }
    }
}

/// Lock-free holder for a [`ProcessorConfig`].
///
/// Both fields live in one `AtomicU64`, so the producer thread always reads
/// a consistent pair while the control side writes without blocking it.
pub struct SharedConfig {
    bits: AtomicU64,
}

impl SharedConfig {
    pub fn new(config: ProcessorConfig) -> Self {
        Self {
            bits: AtomicU64::new(config.pack()),
        }
    }

    pub fn load(&self) -> ProcessorConfig {
        ProcessorConfig::unpack(self.bits.load(Ordering::Acquire))
    }

    pub fn store(&self, config: ProcessorConfig) {
        self.bits.store(config.pack(), Ordering::Release);
    }

    pub fn set_target_fps(&self, target_fps: f32) {
        self.update(|c| c.target_fps = target_fps);
    }

    pub fn set_grayscale(&self, grayscale: bool) {
        self.update(|c| c.grayscale = grayscale);
    }

    fn update(&self, apply: impl Fn(&mut ProcessorConfig)) {
        let _ = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                let mut config = ProcessorConfig::unpack(bits);
                apply(&mut config);
                Some(config.pack())
            });
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self::new(ProcessorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_default_config() {
        let config = ProcessorConfig::default();
        assert_eq!(config.target_fps, DEFAULT_TARGET_FPS);
        assert!(!config.grayscale);
    }

    #[test]
    fn test_store_and_load() {
        let shared = SharedConfig::default();
        let config = ProcessorConfig {
            target_fps: 12.5,
            grayscale: true,
        };
        shared.store(config);
        assert_eq!(shared.load(), config);
    }

    #[test]
    fn test_setters_leave_other_field_untouched() {
        let shared = SharedConfig::new(ProcessorConfig {
            target_fps: 30.0,
            grayscale: true,
        });
        shared.set_target_fps(-1.0);
        assert_eq!(shared.load().target_fps, -1.0);
        assert!(shared.load().grayscale);

        shared.set_grayscale(false);
        assert_eq!(shared.load().target_fps, -1.0);
        assert!(!shared.load().grayscale);
    }

    #[test]
    fn test_concurrent_writers_never_tear() {
        let shared = Arc::new(SharedConfig::default());
        let writers: Vec<_> = (0..4)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        shared.set_target_fps(i as f32);
                        shared.set_grayscale(i % 2 == 0);
                    }
                })
            })
            .collect();
        for _ in 0..1000 {
            let fps = shared.load().target_fps;
            assert!(fps == DEFAULT_TARGET_FPS || (0.0..4.0).contains(&fps));
        }
        for w in writers {
            w.join().unwrap();
        }
    }
}
