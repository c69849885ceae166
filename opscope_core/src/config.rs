//! Configuration for opscope
//!
//! Loaded from `.opscope/config.yaml` in the working directory when present,
//! or from an explicit YAML/TOML/JSON file. Missing sections fall back to
//! defaults.

use crate::dvfs::{
    FailurePolicy, FrequencyApplier, FrequencyTable, NullSink, SysfsFrequencySink, REFERENCE_CORES,
};
use crate::dvfs::sink::cpu_max_freq_path;
use crate::error::{OpscopeError, OpscopeResult};
use crate::intensity::{parse_signal, DiagnosticTarget, ProbeTrigger};
use crate::op::OpKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default config location, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = ".opscope/config.yaml";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpscopeConfig {
    pub probe: ProbeConfig,
    pub dvfs: DvfsConfig,
}

/// Intensity probe settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Initial value of the request flag
    pub armed_at_startup: bool,
    /// Signal that re-arms the probe; `None` disables the signal trigger
    pub signal: Option<SignalSpec>,
    pub diagnostics: DiagnosticTarget,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            armed_at_startup: true,
            signal: Some(SignalSpec::Name("SIGUSR1".to_string())),
            diagnostics: DiagnosticTarget::Stderr,
        }
    }
}

/// Signal given by number or name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalSpec {
    Number(i32),
    Name(String),
}

impl SignalSpec {
    pub fn resolve(&self) -> OpscopeResult<i32> {
        match self {
            SignalSpec::Number(n) => parse_signal(&n.to_string()),
            SignalSpec::Name(name) => parse_signal(name),
        }
    }
}

/// Frequency control settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DvfsConfig {
    /// Per-core `scaling_max_freq` files
    pub control_paths: Vec<PathBuf>,
    pub failure_policy: FailurePolicy,
    /// Initial table contents in kHz
    pub frequencies: BTreeMap<OpKind, u32>,
}

impl Default for DvfsConfig {
    fn default() -> Self {
        Self {
            control_paths: REFERENCE_CORES.iter().map(|&cpu| cpu_max_freq_path(cpu)).collect(),
            failure_policy: FailurePolicy::default(),
            frequencies: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Toml,
    Json,
}

impl Format {
    fn of(path: &Path) -> OpscopeResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            Some("toml") => Ok(Format::Toml),
            Some("json") => Ok(Format::Json),
            _ => Err(OpscopeError::config(format!(
                "unsupported config format: {}",
                path.display()
            ))),
        }
    }
}

impl OpscopeConfig {
    /// Load `DEFAULT_CONFIG_PATH`, or defaults if it does not exist
    pub fn load() -> OpscopeResult<Self> {
        let path = PathBuf::from(DEFAULT_CONFIG_PATH);
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from_path(path: &Path) -> OpscopeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = match Format::of(path)? {
            Format::Yaml => Self::from_yaml_str(&text)?,
            Format::Toml => Self::from_toml_str(&text)?,
            Format::Json => serde_json::from_str(&text)?,
        };
        log::info!(
            "Loaded opscope config from {} ({} frequency entries)",
            path.display(),
            config.dvfs.frequencies.len()
        );
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> OpscopeResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_toml_str(text: &str) -> OpscopeResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Write the config, format chosen by extension
    pub fn save_to_path(&self, path: &Path) -> OpscopeResult<()> {
        let text = match Format::of(path)? {
            Format::Yaml => serde_yaml::to_string(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
            Format::Json => serde_json::to_string_pretty(self)?,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Copy the configured frequencies into `table`; returns entries written
    pub fn apply_frequencies(&self, table: &FrequencyTable) -> usize {
        for (&op, &khz) in &self.dvfs.frequencies {
            table.set(op, khz);
        }
        self.dvfs.frequencies.len()
    }

    /// Applier over the configured control files. Targets without a sysfs
    /// cpufreq interface get a sink that drops writes.
    pub fn build_applier(&self, table: Arc<FrequencyTable>) -> FrequencyApplier {
        let has_sysfs = cfg!(any(target_os = "linux", target_os = "android"));
        let applier = if has_sysfs && !self.dvfs.control_paths.is_empty() {
            FrequencyApplier::new(table, SysfsFrequencySink::new(self.dvfs.control_paths.clone()))
        } else {
            FrequencyApplier::new(table, NullSink)
        };
        applier.with_policy(self.dvfs.failure_policy)
    }

    /// Trigger with the configured initial state and diagnostics, with the
    /// signal handler installed if one is configured
    pub fn build_trigger(&self) -> OpscopeResult<ProbeTrigger> {
        let trigger =
            ProbeTrigger::new(self.probe.armed_at_startup).with_diagnostics(self.probe.diagnostics);
        if let Some(signal) = &self.probe.signal {
            trigger.install_signal(signal.resolve()?)?;
        }
        Ok(trigger)
    }
}
