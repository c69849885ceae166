//! Edge-triggered probe gate
//!
//! A single `AtomicBool` holds the request. `maybe_probe` consumes it with a
//! swap, so each request runs exactly one analysis no matter how many
//! executor threads race on it. Requests come from `request_probe` or from
//! an OS signal whose handler only stores `true` into the flag.

use crate::error::{OpscopeError, OpscopeResult};
use crate::graph::ComputeGraph;
use crate::intensity::analyzer::{GraphAnalyzer, IntensityReport};
use crate::intensity::cost::OpCostModel;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::sync::Arc;

/// Where `maybe_probe` writes its diagnostic lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticTarget {
    #[default]
    Stderr,
    Stdout,
    Off,
}

/// Gate that runs the analyzer once per request
#[derive(Debug, Clone)]
pub struct ProbeTrigger {
    requested: Arc<AtomicBool>,
    model: Arc<OpCostModel>,
    target: DiagnosticTarget,
}

impl ProbeTrigger {
    /// New trigger; `armed` is the request flag's initial value
    pub fn new(armed: bool) -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(armed)),
            model: OpCostModel::shared(),
            target: DiagnosticTarget::default(),
        }
    }

    pub fn with_model(mut self, model: OpCostModel) -> Self {
        self.model = Arc::new(model);
        self
    }

    pub fn with_diagnostics(mut self, target: DiagnosticTarget) -> Self {
        self.target = target;
        self
    }

    /// Arm the trigger; the next `maybe_probe` runs an analysis
    #[inline]
    pub fn request_probe(&self) {
        self.requested.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Analyze `graph` if a request is pending, writing diagnostics to the
    /// configured target. Returns the report when this call consumed the
    /// request.
    pub fn maybe_probe<G: ComputeGraph + ?Sized>(&self, graph: &G) -> Option<IntensityReport> {
        let report = self.consume(graph)?;
        let result = match self.target {
            DiagnosticTarget::Stderr => report.write_diagnostics(&mut io::stderr().lock()),
            DiagnosticTarget::Stdout => report.write_diagnostics(&mut io::stdout().lock()),
            DiagnosticTarget::Off => Ok(()),
        };
        if let Err(e) = result {
            log::debug!("Failed to write intensity diagnostics: {}", e);
        }
        Some(report)
    }

    /// Like `maybe_probe`, but diagnostics go to `out`
    pub fn maybe_probe_into<G, W>(&self, graph: &G, out: &mut W) -> Option<IntensityReport>
    where
        G: ComputeGraph + ?Sized,
        W: Write + ?Sized,
    {
        let report = self.consume(graph)?;
        if let Err(e) = report.write_diagnostics(out) {
            log::debug!("Failed to write intensity diagnostics: {}", e);
        }
        Some(report)
    }

    fn consume<G: ComputeGraph + ?Sized>(&self, graph: &G) -> Option<IntensityReport> {
        if !self.requested.swap(false, Ordering::AcqRel) {
            return None;
        }
        let report = GraphAnalyzer::with_model(&self.model).analyze(graph);
        log::debug!(
            "Intensity probe: {} nodes, {} unmodeled, AI={:.2}",
            report.nodes.len(),
            report.unmodeled_nodes,
            report.total_intensity
        );
        Some(report)
    }

    /// Arm this trigger whenever `signum` is delivered to the process.
    ///
    /// One signal registration is active per process; installing again
    /// (from any trigger) redirects the handler to the new flag.
    #[cfg(unix)]
    pub fn install_signal(&self, signum: i32) -> OpscopeResult<()> {
        let flag = Arc::into_raw(self.requested.clone()) as *mut AtomicBool;
        // The previous flag stays leaked: a handler may still be reading it.
        let previous = SIGNAL_FLAG.swap(flag, Ordering::AcqRel);

        let installed = unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = on_probe_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
            action.sa_flags = libc::SA_RESTART;
            libc::sigemptyset(&mut action.sa_mask);
            libc::sigaction(signum, &action, std::ptr::null_mut()) == 0
        };

        if !installed {
            SIGNAL_FLAG.store(previous, Ordering::Release);
            return Err(OpscopeError::Signal(format!(
                "sigaction({}) failed: {}",
                signum,
                io::Error::last_os_error()
            )));
        }

        log::info!("Intensity probe armed by signal {}", signum);
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn install_signal(&self, signum: i32) -> OpscopeResult<()> {
        Err(OpscopeError::Unsupported(format!(
            "signal {} trigger requires a Unix target",
            signum
        )))
    }
}

impl Default for ProbeTrigger {
    /// Armed at startup
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(unix)]
static SIGNAL_FLAG: AtomicPtr<AtomicBool> = AtomicPtr::new(std::ptr::null_mut());

#[cfg(unix)]
extern "C" fn on_probe_signal(_signum: libc::c_int) {
    // async-signal-safe: one atomic load and one atomic store
    let flag = SIGNAL_FLAG.load(Ordering::Acquire);
    if !flag.is_null() {
        unsafe { (*flag).store(true, Ordering::Release) };
    }
}

/// Resolve a signal given by number or by name (`SIGUSR1`, `usr1`, ...)
pub fn parse_signal(spec: &str) -> OpscopeResult<i32> {
    let spec = spec.trim();
    if let Ok(num) = spec.parse::<i32>() {
        return if num > 0 {
            Ok(num)
        } else {
            Err(OpscopeError::config(format!("invalid signal number {}", num)))
        };
    }

    let upper = spec.to_ascii_uppercase();
    let name = upper.strip_prefix("SIG").unwrap_or(&upper);
    signal_by_name(name).ok_or_else(|| OpscopeError::config(format!("unknown signal '{}'", spec)))
}

#[cfg(unix)]
fn signal_by_name(name: &str) -> Option<i32> {
    match name {
        "USR1" => Some(libc::SIGUSR1),
        "USR2" => Some(libc::SIGUSR2),
        "HUP" => Some(libc::SIGHUP),
        "WINCH" => Some(libc::SIGWINCH),
        _ => None,
    }
}

#[cfg(not(unix))]
fn signal_by_name(_name: &str) -> Option<i32> {
    None
}
