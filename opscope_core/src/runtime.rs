//! Executor-owned bundle of both subsystems
//!
//! The executor creates one `OpscopeRuntime` and hands clones of it (or of
//! its parts) to its worker threads. Nothing here is a global; the C API
//! keeps its own process-wide instance.

use crate::config::OpscopeConfig;
use crate::dvfs::{FrequencyApplier, FrequencyTable};
use crate::error::OpscopeResult;
use crate::graph::ComputeGraph;
use crate::intensity::{IntensityReport, ProbeTrigger};
use crate::op::OpKind;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct OpscopeRuntime {
    table: Arc<FrequencyTable>,
    applier: Arc<FrequencyApplier>,
    trigger: ProbeTrigger,
}

impl OpscopeRuntime {
    pub fn new(applier: FrequencyApplier, trigger: ProbeTrigger) -> Self {
        Self {
            table: applier.table().clone(),
            applier: Arc::new(applier),
            trigger,
        }
    }

    /// Build from config: seeds the table, installs the signal trigger
    pub fn from_config(config: &OpscopeConfig) -> OpscopeResult<Self> {
        let table = Arc::new(FrequencyTable::new());
        let seeded = config.apply_frequencies(&table);
        let applier = config.build_applier(table);
        let trigger = config.build_trigger()?;
        log::info!(
            "opscope runtime ready: {} op frequencies, probe {}",
            seeded,
            if trigger.is_armed() { "armed" } else { "idle" }
        );
        Ok(Self::new(applier, trigger))
    }

    /// `from_config` with the default config file
    pub fn init() -> OpscopeResult<Self> {
        Self::from_config(&OpscopeConfig::load()?)
    }

    // Operator API

    pub fn set_frequency(&self, op: OpKind, khz: u32) {
        self.table.set(op, khz);
    }

    pub fn get_frequency(&self, op: OpKind) -> u32 {
        self.table.get(op)
    }

    pub fn request_probe(&self) {
        self.trigger.request_probe();
    }

    // Executor hooks

    /// Call before dispatching an op of kind `op`
    pub fn apply_if_needed(&self, op: OpKind) {
        self.applier.apply_if_needed(op);
    }

    /// Call at a graph boundary
    pub fn maybe_probe<G: ComputeGraph + ?Sized>(&self, graph: &G) -> Option<IntensityReport> {
        self.trigger.maybe_probe(graph)
    }

    pub fn table(&self) -> &Arc<FrequencyTable> {
        &self.table
    }

    pub fn applier(&self) -> &Arc<FrequencyApplier> {
        &self.applier
    }

    pub fn trigger(&self) -> &ProbeTrigger {
        &self.trigger
    }
}
