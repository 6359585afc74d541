//! Host resource sampling.
//!
//! # Responsibilities
//! - Read host CPU and memory utilization on demand
//! - Never fail the caller: fall back to the last good reading
//!
//! # Design Decisions
//! - Instantaneous reads: CPU usage is the delta since the previous refresh,
//!   so a sample never sleeps
//! - A busy sampler is skipped rather than waited on (`try_lock`)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use sysinfo::System;

/// One utilization reading, both values in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSample {
    pub cpu_percent: f64,
    pub mem_percent: f64,
}

/// Source of resource readings used by the request middleware.
pub trait ResourceSampler: Send + Sync + 'static {
    fn sample(&self) -> ResourceSample;
}

/// Last successful reading, shared without locking.
#[derive(Debug, Default)]
struct LastKnown {
    cpu: AtomicU64,
    mem: AtomicU64,
}

impl LastKnown {
    fn load(&self) -> ResourceSample {
        ResourceSample {
            cpu_percent: f64::from_bits(self.cpu.load(Ordering::Relaxed)),
            mem_percent: f64::from_bits(self.mem.load(Ordering::Relaxed)),
        }
    }

    fn store_cpu(&self, value: f64) {
        self.cpu.store(value.to_bits(), Ordering::Relaxed);
    }

    fn store_mem(&self, value: f64) {
        self.mem.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// `ResourceSampler` backed by the operating system via `sysinfo`.
pub struct SystemSampler {
    system: Mutex<System>,
    last: LastKnown,
}

impl SystemSampler {
    pub fn new() -> Self {
        let sampler = Self {
            system: Mutex::new(System::new()),
            last: LastKnown::default(),
        };
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            tracing::warn!("Resource sampling unsupported on this platform, gauges stay at 0");
        }
        // Prime the CPU counters so the first real sample has a baseline.
        sampler.sample();
        sampler
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSampler for SystemSampler {
    fn sample(&self) -> ResourceSample {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return self.last.load();
        }

        let Ok(mut system) = self.system.try_lock() else {
            return self.last.load();
        };

        system.refresh_cpu();
        if let Some(cpu) = valid_percent(system.global_cpu_info().cpu_usage() as f64) {
            self.last.store_cpu(cpu);
        }

        system.refresh_memory();
        let total = system.total_memory();
        if total > 0 {
            let used = system.used_memory() as f64 / total as f64 * 100.0;
            if let Some(mem) = valid_percent(used) {
                self.last.store_mem(mem);
            }
        } else {
            tracing::debug!("Total memory reported as 0, keeping last memory reading");
        }

        self.last.load()
    }
}

fn valid_percent(value: f64) -> Option<f64> {
    value.is_finite().then(|| value.clamp(0.0, 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_percent_clamps_and_rejects_nan() {
        assert_eq!(valid_percent(42.0), Some(42.0));
        assert_eq!(valid_percent(-1.0), Some(0.0));
        assert_eq!(valid_percent(250.0), Some(100.0));
        assert_eq!(valid_percent(f64::NAN), None);
        assert_eq!(valid_percent(f64::INFINITY), None);
    }

    #[test]
    fn test_system_sample_is_in_range() {
        let sampler = SystemSampler::new();
        for _ in 0..3 {
            let sample = sampler.sample();
            assert!((0.0..=100.0).contains(&sample.cpu_percent));
            assert!((0.0..=100.0).contains(&sample.mem_percent));
        }
    }

    #[test]
    fn test_busy_sampler_returns_last_known() {
        let sampler = SystemSampler::new();
        sampler.last.store_cpu(12.0);
        sampler.last.store_mem(34.0);

        let _held = sampler.system.lock().unwrap();
        assert_eq!(
            sampler.sample(),
            ResourceSample {
                cpu_percent: 12.0,
                mem_percent: 34.0
            }
        );
    }
}
