//! Static per-op cost coefficients

use crate::op::OpKind;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cost coefficients for one op kind
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OpCostEntry {
    /// FLOPs per destination element; 0 for data movement and for `MUL_MAT`,
    /// whose cost is derived from operand shapes
    pub flops_per_element: f64,
    /// Leading operands that count toward byte traffic
    pub input_count: usize,
    /// Whether the destination counts toward byte traffic
    pub writes_output: bool,
}

impl OpCostEntry {
    pub const fn new(flops_per_element: f64, input_count: usize, writes_output: bool) -> Self {
        Self {
            flops_per_element,
            input_count,
            writes_output,
        }
    }

    /// Zero-cost entry reported for kinds without a model
    pub const ZERO: OpCostEntry = OpCostEntry::new(0.0, 0, false);
}

const ELEMENTWISE_BINARY: OpCostEntry = OpCostEntry::new(1.0, 2, true);
const NORMALIZATION: OpCostEntry = OpCostEntry::new(2.0, 1, true);
const COPY: OpCostEntry = OpCostEntry::new(0.0, 1, true);
const RELABEL: OpCostEntry = OpCostEntry::new(0.0, 1, false);
const FUSED_PAIR: OpCostEntry = OpCostEntry::new(2.0, 2, true);

static STANDARD: Lazy<Arc<OpCostModel>> = Lazy::new(|| Arc::new(OpCostModel::standard()));

/// Immutable lookup from op kind to cost entry
#[derive(Debug, Clone, PartialEq)]
pub struct OpCostModel {
    entries: [Option<OpCostEntry>; OpKind::COUNT],
}

impl OpCostModel {
    /// Shared instance of the standard table
    pub fn global() -> &'static OpCostModel {
        &STANDARD
    }

    /// Owning handle to the shared standard table
    pub fn shared() -> Arc<OpCostModel> {
        Arc::clone(&STANDARD)
    }

    /// The standard table
    pub fn standard() -> Self {
        Self::builder()
            .entry(OpKind::Add, ELEMENTWISE_BINARY)
            .entry(OpKind::Sub, ELEMENTWISE_BINARY)
            .entry(OpKind::Mul, ELEMENTWISE_BINARY)
            .entry(OpKind::Div, ELEMENTWISE_BINARY)
            .entry(OpKind::Norm, NORMALIZATION)
            .entry(OpKind::RmsNorm, NORMALIZATION)
            // flops_per_element recomputed from shapes by the analyzer
            .entry(OpKind::MulMat, OpCostEntry::new(0.0, 2, true))
            .entry(OpKind::Cpy, COPY)
            .entry(OpKind::Cont, COPY)
            .entry(OpKind::Reshape, RELABEL)
            .entry(OpKind::View, RELABEL)
            .entry(OpKind::Permute, RELABEL)
            .entry(OpKind::Transpose, RELABEL)
            .entry(OpKind::SoftMax, OpCostEntry::new(3.0, 1, true))
            .entry(OpKind::Rope, FUSED_PAIR)
            .entry(OpKind::Glu, FUSED_PAIR)
            .build()
    }

    /// Empty builder; every kind starts unmodeled
    pub fn builder() -> OpCostModelBuilder {
        OpCostModelBuilder {
            entries: [None; OpKind::COUNT],
        }
    }

    /// Builder seeded with this model's entries
    pub fn to_builder(&self) -> OpCostModelBuilder {
        OpCostModelBuilder {
            entries: self.entries,
        }
    }

    /// Cost entry for `op`; unmodeled kinds get `OpCostEntry::ZERO`
    #[inline]
    pub fn cost_of(&self, op: OpKind) -> OpCostEntry {
        self.lookup(op).unwrap_or(OpCostEntry::ZERO)
    }

    /// Cost entry for `op`, or `None` when no model is defined
    #[inline]
    pub fn lookup(&self, op: OpKind) -> Option<OpCostEntry> {
        self.entries[op.index()]
    }

    #[inline]
    pub fn is_modeled(&self, op: OpKind) -> bool {
        self.lookup(op).is_some()
    }

    /// Kinds that have an entry
    pub fn modeled_kinds(&self) -> impl Iterator<Item = OpKind> + '_ {
        OpKind::ALL.iter().copied().filter(|op| self.is_modeled(*op))
    }
}

impl Default for OpCostModel {
    fn default() -> Self {
        Self::standard()
    }
}

/// Builds an `OpCostModel`; the model is frozen once built
#[derive(Debug, Clone)]
pub struct OpCostModelBuilder {
    entries: [Option<OpCostEntry>; OpKind::COUNT],
}

impl OpCostModelBuilder {
    pub fn entry(mut self, op: OpKind, cost: OpCostEntry) -> Self {
        self.entries[op.index()] = Some(cost);
        self
    }

    /// Mark `op` as unmodeled
    pub fn remove(mut self, op: OpKind) -> Self {
        self.entries[op.index()] = None;
        self
    }

    pub fn build(self) -> OpCostModel {
        OpCostModel {
            entries: self.entries,
        }
    }
}
