//! Per-op target frequency table

use crate::op::OpKind;
use std::sync::atomic::{AtomicU32, Ordering};

/// Raw slot count; op ids at or above this are out of range
pub const MAX_OP_SLOTS: usize = 128;

const _: () = assert!(OpKind::COUNT <= MAX_OP_SLOTS);

/// Target clock frequency in kHz per op kind, 0 meaning "no preference".
///
/// Each slot is an independent relaxed atomic. Writes to different slots are
/// not ordered with respect to each other, so readers must not treat several
/// `get` calls as a consistent snapshot.
#[derive(Debug)]
pub struct FrequencyTable {
    slots: [AtomicU32; MAX_OP_SLOTS],
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| AtomicU32::new(0)),
        }
    }

    /// Store `khz` for `op`; 0 clears the preference
    #[inline]
    pub fn set(&self, op: OpKind, khz: u32) {
        self.set_raw(op.index(), khz);
    }

    /// Stored kHz for `op`, 0 when unset
    #[inline]
    pub fn get(&self, op: OpKind) -> u32 {
        self.get_raw(op.index())
    }

    /// Store by raw op id; out-of-range ids are ignored
    #[inline]
    pub fn set_raw(&self, op_id: usize, khz: u32) {
        if let Some(slot) = self.slots.get(op_id) {
            slot.store(khz, Ordering::Relaxed);
        }
    }

    /// Load by raw op id; out-of-range ids read as 0
    #[inline]
    pub fn get_raw(&self, op_id: usize) -> u32 {
        self.slots
            .get(op_id)
            .map_or(0, |slot| slot.load(Ordering::Relaxed))
    }

    pub fn clear(&self, op: OpKind) {
        self.set(op, 0);
    }

    /// Clear every slot
    pub fn reset(&self) {
        for slot in &self.slots {
            slot.store(0, Ordering::Relaxed);
        }
    }

    /// Op kinds with a preference set, read slot by slot
    pub fn snapshot(&self) -> Vec<(OpKind, u32)> {
        OpKind::ALL
            .iter()
            .filter_map(|&op| match self.get(op) {
                0 => None,
                khz => Some((op, khz)),
            })
            .collect()
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}
