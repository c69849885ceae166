//! # opscope core
//!
//! Runtime instrumentation that hangs off a tensor graph executor's hooks.
//! Two independent subsystems:
//!
//! - **Intensity profiler**: on request, walks a compute graph and reports
//!   FLOPs, bytes moved and arithmetic intensity per node and in total
//! - **Frequency control**: a per-op table of target CPU frequencies and an
//!   applier that writes them to the cpufreq caps only when they change
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use opscope_core::{OpKind, OpscopeRuntime};
//! use opscope_core::graph::{ElementType, Graph};
//!
//! let runtime = OpscopeRuntime::init().unwrap();
//! runtime.set_frequency(OpKind::MulMat, 1_396_000);
//!
//! // before dispatching each op
//! runtime.apply_if_needed(OpKind::MulMat);
//!
//! // after each graph; only runs when requested (armed at startup)
//! let graph = Graph::new().mul_mat(4096, 1, 4096, ElementType::F16);
//! runtime.maybe_probe(&graph);
//! ```

pub mod config;
pub mod dvfs;
pub mod error;
pub mod graph;
pub mod intensity;
pub mod op;
pub mod runtime;

pub use config::OpscopeConfig;
pub use dvfs::{FailurePolicy, FrequencyApplier, FrequencySink, FrequencyTable};
pub use error::{OpscopeError, OpscopeResult};
pub use graph::{ComputeGraph, GraphNode, TensorInfo};
pub use intensity::{GraphAnalyzer, IntensityReport, OpCostEntry, OpCostModel, ProbeTrigger};
pub use op::OpKind;
pub use runtime::OpscopeRuntime;
