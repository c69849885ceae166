//! Graph and tensor metadata seam
//!
//! The executor owns the real graph. The analyzer only needs read access to
//! a node's op kind, its operands, its destination and a few tensor
//! accessors, so those are expressed as traits the executor implements for
//! its own types. `Graph`, `Node` and `TensorDesc` are plain implementations
//! for embedders (and tests) that have no graph types of their own.

use crate::op::OpKind;
use serde::{Deserialize, Serialize};

/// Read-only tensor metadata
pub trait TensorInfo {
    /// Number of elements
    fn element_count(&self) -> u64;

    /// Total size in bytes
    fn byte_size(&self) -> u64;

    /// Size of dimension `axis`; dimensions past the tensor's rank are 1
    fn dim(&self, axis: usize) -> u64;
}

/// Read-only view of one graph node
pub trait GraphNode {
    type Tensor: TensorInfo;

    fn op(&self) -> OpKind;

    /// Destination tensor written by this node
    fn destination(&self) -> &Self::Tensor;

    /// Operand `index`, or `None` if the node has fewer operands
    fn operand(&self, index: usize) -> Option<&Self::Tensor>;
}

/// Ordered node sequence; order is execution order
pub trait ComputeGraph {
    type Node: GraphNode;

    fn node_count(&self) -> usize;

    fn node(&self, index: usize) -> &Self::Node;
}

impl<G: ComputeGraph + ?Sized> ComputeGraph for &G {
    type Node = G::Node;

    fn node_count(&self) -> usize {
        (**self).node_count()
    }

    fn node(&self, index: usize) -> &Self::Node {
        (**self).node(index)
    }
}

/// Element storage types with a fixed per-element size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    F32,
    F16,
    BF16,
    I32,
    I16,
    I8,
}

impl ElementType {
    pub const fn size_bytes(self) -> u64 {
        match self {
            ElementType::F32 | ElementType::I32 => 4,
            ElementType::F16 | ElementType::BF16 | ElementType::I16 => 2,
            ElementType::I8 => 1,
        }
    }
}

/// Shape plus element type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorDesc {
    pub shape: Vec<u64>,
    pub dtype: ElementType,
}

impl TensorDesc {
    pub fn new(shape: impl Into<Vec<u64>>, dtype: ElementType) -> Self {
        Self {
            shape: shape.into(),
            dtype,
        }
    }

    pub fn f32(shape: impl Into<Vec<u64>>) -> Self {
        Self::new(shape, ElementType::F32)
    }

    pub fn f16(shape: impl Into<Vec<u64>>) -> Self {
        Self::new(shape, ElementType::F16)
    }
}

impl TensorInfo for TensorDesc {
    fn element_count(&self) -> u64 {
        self.shape.iter().product()
    }

    fn byte_size(&self) -> u64 {
        self.element_count() * self.dtype.size_bytes()
    }

    fn dim(&self, axis: usize) -> u64 {
        self.shape.get(axis).copied().unwrap_or(1)
    }
}

/// A node: op kind, operands and destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub op: OpKind,
    pub operands: Vec<TensorDesc>,
    pub destination: TensorDesc,
}

impl Node {
    pub fn new(op: OpKind, operands: Vec<TensorDesc>, destination: TensorDesc) -> Self {
        Self {
            op,
            operands,
            destination,
        }
    }
}

impl GraphNode for Node {
    type Tensor = TensorDesc;

    fn op(&self) -> OpKind {
        self.op
    }

    fn destination(&self) -> &TensorDesc {
        &self.destination
    }

    fn operand(&self, index: usize) -> Option<&TensorDesc> {
        self.operands.get(index)
    }
}

/// Owned graph in execution order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node (builder style)
    pub fn push(mut self, op: OpKind, operands: Vec<TensorDesc>, destination: TensorDesc) -> Self {
        self.nodes.push(Node::new(op, operands, destination));
        self
    }

    /// Append an elementwise binary node over two `shape` tensors
    pub fn binary(self, op: OpKind, shape: &[u64], dtype: ElementType) -> Self {
        let t = TensorDesc::new(shape.to_vec(), dtype);
        self.push(op, vec![t.clone(), t.clone()], t)
    }

    /// Append a matrix multiply: operands `[k, m]` and `[k, n]`, result `[m, n]`
    pub fn mul_mat(self, m: u64, n: u64, k: u64, dtype: ElementType) -> Self {
        self.push(
            OpKind::MulMat,
            vec![
                TensorDesc::new(vec![k, m], dtype),
                TensorDesc::new(vec![k, n], dtype),
            ],
            TensorDesc::new(vec![m, n], dtype),
        )
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl ComputeGraph for Graph {
    type Node = Node;

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }
}
