//! Memory observation and pressure response.
//!
//! The governor samples resident memory once per batch boundary and maps the
//! reading onto three watermarks. Routine pressure is handled by the control
//! loop dropping batch state it already owns; high pressure adds a short
//! cooperative pause so freed pages can be returned before the next batch
//! starts; critical pressure stops the run after the in-flight batch has
//! merged, with a resumable checkpoint. Cleanup never allocates scratch
//! buffers to force reclamation.

use std::thread;
use std::time::Duration;

use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, warn};

/// Fractions of total system memory at which the governor reacts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Watermarks {
    /// Routine cleanup.
    pub low: f64,
    /// Aggressive cleanup with a settling pause.
    pub high: f64,
    /// Abort after the in-flight batch completes and merges.
    pub critical: f64,
}

impl Default for Watermarks {
    fn default() -> Self {
        Self {
            low: 0.70,
            high: 0.85,
            critical: 0.95,
        }
    }
}

impl Watermarks {
    /// Band a sample falls into.
    #[must_use]
    pub fn pressure_for(&self, sample: &MemorySample) -> MemoryPressure {
        let fraction = sample.fraction();
        if fraction >= self.critical {
            MemoryPressure::Critical
        } else if fraction >= self.high {
            MemoryPressure::High
        } else if fraction >= self.low {
            MemoryPressure::Elevated
        } else {
            MemoryPressure::Normal
        }
    }
}

/// One resident-memory reading. Not persisted; drives governor decisions
/// and initial batch sizing only.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MemorySample {
    /// Process resident set size in bytes.
    pub rss_bytes: u64,
    /// Total system memory in bytes.
    pub total_bytes: u64,
}

impl MemorySample {
    #[must_use]
    pub fn new(rss_bytes: u64, total_bytes: u64) -> Self {
        Self {
            rss_bytes,
            total_bytes,
        }
    }

    /// Resident fraction of total memory, `0.0` when the total is unknown.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.rss_bytes as f64 / self.total_bytes as f64
    }

    /// Resident size in whole megabytes.
    #[must_use]
    pub fn rss_mb(&self) -> u64 {
        self.rss_bytes / (1024 * 1024)
    }
}

/// Pressure bands in increasing severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryPressure {
    Normal,
    Elevated,
    High,
    Critical,
}

/// Samples process memory and decides cleanup or abort.
pub struct MemoryGovernor {
    system: System,
    pid: Option<Pid>,
    watermarks: Watermarks,
    settle_pause: Duration,
}

impl MemoryGovernor {
    #[must_use]
    pub fn new() -> Self {
        Self::with_watermarks(Watermarks::default())
    }

    #[must_use]
    pub fn with_watermarks(watermarks: Watermarks) -> Self {
        Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
            watermarks,
            settle_pause: Duration::from_millis(100),
        }
    }

    /// Take a fresh resident-memory reading.
    ///
    /// Falls back to system-wide used memory when the own process cannot be
    /// inspected.
    pub fn sample(&mut self) -> MemorySample {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        let rss = match self.pid {
            Some(pid) => {
                self.system
                    .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
                match self.system.process(pid) {
                    Some(process) => process.memory(),
                    None => self.system.used_memory(),
                }
            }
            None => self.system.used_memory(),
        };

        let sample = MemorySample::new(rss, total);
        debug!(
            rss_mb = sample.rss_mb(),
            fraction = format!("{:.2}", sample.fraction()),
            "memory sample"
        );
        sample
    }

    /// Band a sample falls into, against this governor's watermarks.
    #[must_use]
    pub fn pressure(&self, sample: &MemorySample) -> MemoryPressure {
        self.watermarks.pressure_for(sample)
    }

    /// React to a sample.
    ///
    /// The actual release of batch buffers happens when the control loop
    /// drops them; at high pressure this additionally pauses briefly so the
    /// allocator can return freed pages before more work is queued. Returns
    /// the band so callers can log it.
    pub fn maybe_cleanup(&self, sample: &MemorySample) -> MemoryPressure {
        let pressure = self.pressure(sample);
        match pressure {
            MemoryPressure::Normal => {}
            MemoryPressure::Elevated => {
                debug!(rss_mb = sample.rss_mb(), "elevated memory, routine cleanup");
            }
            MemoryPressure::High | MemoryPressure::Critical => {
                warn!(
                    rss_mb = sample.rss_mb(),
                    fraction = format!("{:.2}", sample.fraction()),
                    "high memory pressure, pausing to settle"
                );
                thread::sleep(self.settle_pause);
            }
        }
        pressure
    }

    /// True when the run should stop after the in-flight batch.
    #[must_use]
    pub fn should_abort(&self, sample: &MemorySample) -> bool {
        self.pressure(sample) == MemoryPressure::Critical
    }

    /// The configured watermarks.
    #[must_use]
    pub fn watermarks(&self) -> Watermarks {
        self.watermarks
    }
}

impl Default for MemoryGovernor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const GIB: u64 = 1024 * 1024 * 1024;

    #[test]
    fn test_pressure_bands() {
        let governor = MemoryGovernor::new();
        let total = 16 * GIB;

        let normal = MemorySample::new(4 * GIB, total);
        let elevated = MemorySample::new(12 * GIB, total);
        let high = MemorySample::new(14 * GIB, total);
        let critical = MemorySample::new(total, total);

        assert_eq!(governor.pressure(&normal), MemoryPressure::Normal);
        assert_eq!(governor.pressure(&elevated), MemoryPressure::Elevated);
        assert_eq!(governor.pressure(&high), MemoryPressure::High);
        assert_eq!(governor.pressure(&critical), MemoryPressure::Critical);
    }

    #[test]
    fn test_should_abort_only_at_critical() {
        let governor = MemoryGovernor::new();
        let total = 8 * GIB;

        assert!(!governor.should_abort(&MemorySample::new(6 * GIB, total)));
        assert!(governor.should_abort(&MemorySample::new(8 * GIB, total)));
    }

    #[test]
    fn test_custom_watermarks() {
        let governor = MemoryGovernor::with_watermarks(Watermarks {
            low: 0.10,
            high: 0.20,
            critical: 0.30,
        });
        let sample = MemorySample::new(GIB, 4 * GIB);

        assert_eq!(governor.pressure(&sample), MemoryPressure::Elevated);
    }

    #[test]
    fn test_fraction_with_unknown_total() {
        let sample = MemorySample::new(GIB, 0);

        assert!((sample.fraction() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rss_mb() {
        let sample = MemorySample::new(512 * 1024 * 1024, GIB);

        assert_eq!(sample.rss_mb(), 512);
    }
}
