//! # Per-op frequency control
//!
//! - **FrequencyTable**: lock-free op kind -> target kHz map shared by all
//!   executor threads
//! - **FrequencyApplier**: writes an op's target to the hardware before the
//!   op runs, skipping writes that would not change anything
//! - **FrequencySink**: the hardware seam (`SysfsFrequencySink` on Linux,
//!   `RecordingSink` for tests and dry runs)
//!
//! Which frequency each op should get is decided elsewhere; this module only
//! stores and applies it.

pub mod applier;
pub mod sink;
pub mod table;

pub use applier::{FailurePolicy, FrequencyApplier};
pub use sink::{
    cpu_max_freq_path, ApplyOutcome, FrequencySink, NullSink, RecordingSink, SysfsFrequencySink,
    REFERENCE_CORES,
};
pub use table::{FrequencyTable, MAX_OP_SLOTS};
