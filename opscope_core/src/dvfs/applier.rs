//! Debounced frequency application
//!
//! Writing a frequency cap is slow and disturbs the running cores, so the
//! applier remembers the last value it applied and only writes when an op's
//! target differs from it.

use crate::dvfs::sink::{FrequencySink, NullSink, SysfsFrequencySink};
use crate::dvfs::table::FrequencyTable;
use crate::op::OpKind;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// When the last-applied frequency is updated after a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record on every attempt, even if no control file accepted the value.
    /// A failed change is not retried until the target changes.
    #[default]
    RecordAttempt,
    /// Record only when at least one control file accepted the value, so a
    /// failed change is retried on the next request.
    RecordOnSuccess,
}

/// Applies an op's target frequency to the hardware when it changes
pub struct FrequencyApplier {
    table: Arc<FrequencyTable>,
    sink: Box<dyn FrequencySink>,
    last_applied: AtomicU32,
    // held across write + record so `last_applied` names the last value written
    switching: Mutex<()>,
    policy: FailurePolicy,
}

impl FrequencyApplier {
    pub fn new(table: Arc<FrequencyTable>, sink: impl FrequencySink + 'static) -> Self {
        Self {
            table,
            sink: Box::new(sink),
            last_applied: AtomicU32::new(0),
            switching: Mutex::new(()),
            policy: FailurePolicy::default(),
        }
    }

    /// Applier over the reference cores' sysfs caps on Linux/Android; a
    /// no-op elsewhere
    pub fn system(table: Arc<FrequencyTable>) -> Self {
        if cfg!(any(target_os = "linux", target_os = "android")) {
            Self::new(table, SysfsFrequencySink::reference_cores())
        } else {
            Self::new(table, NullSink)
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Apply `op`'s target frequency if it is set and differs from the last
    /// applied one. Never fails; write errors are absorbed.
    ///
    /// Never blocks: if another thread is switching the frequency right now
    /// the call returns without writing, and the op's target is applied on
    /// its next request.
    #[inline]
    pub fn apply_if_needed(&self, op: OpKind) {
        self.apply_raw(op.index());
    }

    /// `apply_if_needed` by raw op id; out-of-range ids do nothing
    pub fn apply_raw(&self, op_id: usize) {
        let want = self.table.get_raw(op_id);
        if want == 0 || want == self.last_applied.load(Ordering::Relaxed) {
            return;
        }

        let Some(_switching) = self.switching.try_lock() else {
            return;
        };
        if want == self.last_applied.load(Ordering::Relaxed) {
            return;
        }

        let outcome = self.sink.write_khz(want);
        let record = match self.policy {
            FailurePolicy::RecordAttempt => true,
            FailurePolicy::RecordOnSuccess => outcome.any_succeeded(),
        };

        if outcome.any_succeeded() {
            log::info!(
                "Applied {} kHz for op {} ({}/{} control files)",
                want,
                OpKind::from_index(op_id).map_or("?", OpKind::name),
                outcome.succeeded,
                outcome.attempted
            );
        } else {
            log::debug!("Frequency {} kHz not accepted by any control file", want);
        }

        if record {
            self.last_applied.store(want, Ordering::Relaxed);
        }
    }

    /// Most recently recorded frequency, 0 before the first write
    pub fn last_applied(&self) -> u32 {
        self.last_applied.load(Ordering::Relaxed)
    }

    /// Forget the last applied frequency so the next request writes
    pub fn reset_last_applied(&self) {
        self.last_applied.store(0, Ordering::Relaxed);
    }

    pub fn table(&self) -> &Arc<FrequencyTable> {
        &self.table
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }
}

impl std::fmt::Debug for FrequencyApplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrequencyApplier")
            .field("last_applied", &self.last_applied())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
