// opscope C FFI - process-wide instance behind plain int op ids
//
// Op ids are opscope's own dense ids (0..opscope_op_count()), not the
// engine's enum values. Executors translate once at startup with
// opscope_op_from_name(engine_op_name(i)).
use opscope_core::dvfs::{FrequencyApplier, FrequencyTable};
use opscope_core::graph::{ComputeGraph, GraphNode, TensorInfo};
use opscope_core::intensity::ProbeTrigger;
use opscope_core::{OpKind, OpscopeConfig, OpscopeRuntime};
use std::ffi::{c_char, c_int, CStr, CString};
use std::sync::Arc;

/// Max operands per node in the C graph layout
pub const OPSCOPE_MAX_SRC: usize = 4;

lazy_static::lazy_static! {
    static ref RUNTIME: OpscopeRuntime = init_runtime();
    static ref OP_NAMES: Vec<CString> = OpKind::ALL
        .iter()
        .map(|op| CString::new(op.name()).unwrap_or_default())
        .collect();
}

// Config file if present, else defaults; never fails. The host's signal
// dispositions are left alone until opscope_install_probe_signal.
fn init_runtime() -> OpscopeRuntime {
    let runtime = OpscopeConfig::load().and_then(|mut config| {
        config.probe.signal = None;
        OpscopeRuntime::from_config(&config)
    });
    runtime.unwrap_or_else(|e| {
        log::warn!("opscope config unusable ({}), using defaults", e);
        let table = Arc::new(FrequencyTable::new());
        OpscopeRuntime::new(FrequencyApplier::system(table), ProbeTrigger::default())
    })
}

fn op_slot(op_id: c_int) -> Option<usize> {
    usize::try_from(op_id).ok()
}

// Frequency table API
#[no_mangle]
pub extern "C" fn opscope_dvfs_set(op_id: c_int, khz: c_int) {
    if let Some(slot) = op_slot(op_id) {
        RUNTIME.table().set_raw(slot, khz.max(0) as u32);
    }
}

#[no_mangle]
pub extern "C" fn opscope_dvfs_get(op_id: c_int) -> c_int {
    op_slot(op_id)
        .map(|slot| RUNTIME.table().get_raw(slot))
        .map_or(0, |khz| c_int::try_from(khz).unwrap_or(c_int::MAX))
}

// Executor hook: call before dispatching an op
#[no_mangle]
pub extern "C" fn opscope_dvfs_apply_if_needed(op_id: c_int) {
    if let Some(slot) = op_slot(op_id) {
        RUNTIME.applier().apply_raw(slot);
    }
}

#[no_mangle]
pub extern "C" fn opscope_dvfs_last_applied() -> c_int {
    c_int::try_from(RUNTIME.applier().last_applied()).unwrap_or(c_int::MAX)
}

// Probe API
#[no_mangle]
pub extern "C" fn opscope_request_probe() {
    RUNTIME.request_probe();
}

#[no_mangle]
pub extern "C" fn opscope_probe_armed() -> bool {
    RUNTIME.trigger().is_armed()
}

#[no_mangle]
pub extern "C" fn opscope_install_probe_signal(signum: c_int) -> bool {
    match RUNTIME.trigger().install_signal(signum) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("{}", e);
            false
        }
    }
}

// Op metadata
#[no_mangle]
pub extern "C" fn opscope_op_count() -> c_int {
    OpKind::COUNT as c_int
}

/// NUL-terminated op name, or null for unknown ids
#[no_mangle]
pub extern "C" fn opscope_op_name(op_id: c_int) -> *const c_char {
    op_slot(op_id)
        .and_then(|slot| OP_NAMES.get(slot))
        .map_or(std::ptr::null(), |name| name.as_ptr())
}

/// opscope id for an engine op name (`"MUL_MAT"`, case-insensitive), or -1
/// for null or unknown names
#[no_mangle]
pub extern "C" fn opscope_op_from_name(name: *const c_char) -> c_int {
    if name.is_null() {
        return -1;
    }
    let name = unsafe { CStr::from_ptr(name) };
    name.to_str()
        .ok()
        .and_then(|name| name.parse::<OpKind>().ok())
        .map_or(-1, |op| op.index() as c_int)
}

/// Tensor metadata as laid out by the executor
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct OpscopeTensor {
    /// Elements per dimension; unused trailing dims are 1
    pub ne: [i64; 4],
    /// Bytes per element
    pub type_size: u64,
}

impl TensorInfo for OpscopeTensor {
    fn element_count(&self) -> u64 {
        self.ne.iter().map(|&d| d.max(0) as u64).product()
    }

    fn byte_size(&self) -> u64 {
        self.element_count() * self.type_size
    }

    fn dim(&self, axis: usize) -> u64 {
        self.ne.get(axis).map_or(1, |&d| d.max(0) as u64)
    }
}

/// One graph node; `src[..n_src]` are the operands
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct OpscopeNode {
    /// opscope op id, see `opscope_op_from_name`
    pub op: c_int,
    pub dst: OpscopeTensor,
    pub n_src: c_int,
    pub src: [OpscopeTensor; OPSCOPE_MAX_SRC],
}

impl GraphNode for OpscopeNode {
    type Tensor = OpscopeTensor;

    fn op(&self) -> OpKind {
        // unknown ids are analyzed as unmodeled no-ops
        op_slot(self.op)
            .and_then(OpKind::from_index)
            .unwrap_or(OpKind::Noop)
    }

    fn destination(&self) -> &OpscopeTensor {
        &self.dst
    }

    fn operand(&self, index: usize) -> Option<&OpscopeTensor> {
        let n_src = op_slot(self.n_src).unwrap_or(0).min(OPSCOPE_MAX_SRC);
        self.src[..n_src].get(index)
    }
}

struct NodeSlice<'a>(&'a [OpscopeNode]);

impl ComputeGraph for NodeSlice<'_> {
    type Node = OpscopeNode;

    fn node_count(&self) -> usize {
        self.0.len()
    }

    fn node(&self, index: usize) -> &OpscopeNode {
        &self.0[index]
    }
}

/// Executor hook: call at a graph boundary. Returns true if an analysis ran.
///
/// # Safety
/// `nodes` must point to `n_nodes` valid nodes, or be null with `n_nodes == 0`.
#[no_mangle]
pub unsafe extern "C" fn opscope_maybe_probe(nodes: *const OpscopeNode, n_nodes: usize) -> bool {
    let nodes = if nodes.is_null() || n_nodes == 0 {
        &[][..]
    } else {
        std::slice::from_raw_parts(nodes, n_nodes)
    };
    RUNTIME.maybe_probe(&NodeSlice(nodes)).is_some()
}
