//! # Arithmetic-intensity profiler
//!
//! - **OpCostModel**: static FLOPs/bytes coefficients per op kind
//! - **GraphAnalyzer**: per-node and total FLOPs, bytes and intensity
//! - **ProbeTrigger**: one-shot gate so the analyzer only runs on request
//!
//! ## Usage
//!
//! ```rust,ignore
//! let trigger = ProbeTrigger::default();      // armed for the first graph
//! trigger.install_signal(libc::SIGUSR1)?;     // `kill -USR1 <pid>` re-arms
//!
//! // after each graph completes
//! trigger.maybe_probe(&graph);
//! ```

pub mod analyzer;
pub mod cost;
pub mod trigger;

pub use analyzer::{GraphAnalyzer, IntensityReport, NodeIntensity};
pub use cost::{OpCostEntry, OpCostModel, OpCostModelBuilder};
pub use trigger::{parse_signal, DiagnosticTarget, ProbeTrigger};
