// Hardware control surface for CPU frequency caps
//
// Linux: one `cpufreq/scaling_max_freq` file per core under
//        /sys/devices/system/cpu (root required to write)
// Other: no control surface, writes are dropped

use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Cores capped by the default control surface (big cores on the reference board)
pub const REFERENCE_CORES: &[usize] = &[4, 7];

/// Result of one frequency write across all control files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyOutcome {
    /// Control files a write was attempted on
    pub attempted: usize,
    /// Control files that accepted the value
    pub succeeded: usize,
}

impl ApplyOutcome {
    pub fn any_succeeded(&self) -> bool {
        self.succeeded > 0
    }
}

/// Destination for frequency changes
pub trait FrequencySink: Send + Sync {
    /// Write `khz` to the hardware. Must not panic; failures are reported
    /// through the outcome only.
    fn write_khz(&self, khz: u32) -> ApplyOutcome;
}

/// Path of the max-frequency cap for `cpu`
pub fn cpu_max_freq_path(cpu: usize) -> PathBuf {
    PathBuf::from(format!(
        "/sys/devices/system/cpu/cpu{}/cpufreq/scaling_max_freq",
        cpu
    ))
}

/// Writes the decimal kHz value to each control file in turn
#[derive(Debug, Clone)]
pub struct SysfsFrequencySink {
    paths: Vec<PathBuf>,
}

impl SysfsFrequencySink {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// Control files for the given cores
    pub fn for_cpus(cpus: &[usize]) -> Self {
        Self::new(cpus.iter().map(|&cpu| cpu_max_freq_path(cpu)).collect())
    }

    pub fn reference_cores() -> Self {
        Self::for_cpus(REFERENCE_CORES)
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    fn write_one(path: &Path, value: &str) -> std::io::Result<()> {
        // open for writing without create: a missing file is a missing core
        let mut file = OpenOptions::new().write(true).truncate(true).open(path)?;
        file.write_all(value.as_bytes())
    }
}

impl FrequencySink for SysfsFrequencySink {
    fn write_khz(&self, khz: u32) -> ApplyOutcome {
        let value = khz.to_string();
        let mut outcome = ApplyOutcome::default();

        for path in &self.paths {
            outcome.attempted += 1;
            match Self::write_one(path, &value) {
                Ok(()) => outcome.succeeded += 1,
                Err(e) => log::debug!("Failed to write {} kHz to {}: {}", khz, path.display(), e),
            }
        }

        outcome
    }
}

/// Records writes instead of touching hardware
#[derive(Debug, Default)]
pub struct RecordingSink {
    writes: Mutex<Vec<u32>>,
    count: AtomicUsize,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every write fails, for exercising the failure policy
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn write_count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// Every value written, in order
    pub fn writes(&self) -> Vec<u32> {
        self.writes.lock().clone()
    }
}

impl FrequencySink for RecordingSink {
    fn write_khz(&self, khz: u32) -> ApplyOutcome {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.writes.lock().push(khz);
        ApplyOutcome {
            attempted: 1,
            succeeded: if self.fail { 0 } else { 1 },
        }
    }
}

/// Drops every write
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl FrequencySink for NullSink {
    fn write_khz(&self, _khz: u32) -> ApplyOutcome {
        ApplyOutcome::default()
    }
}

impl<S: FrequencySink + ?Sized> FrequencySink for std::sync::Arc<S> {
    fn write_khz(&self, khz: u32) -> ApplyOutcome {
        (**self).write_khz(khz)
    }
}
