//! Arithmetic-intensity analysis of a compute graph
//!
//! Walks a graph in execution order and derives FLOPs, bytes moved and their
//! ratio per node from the cost model. `MUL_MAT` is the one shape-dependent
//! kind: its FLOPs are `2 * M * N * K` regardless of the table entry.

use crate::error::OpscopeResult;
use crate::graph::{ComputeGraph, GraphNode, TensorInfo};
use crate::intensity::cost::OpCostModel;
use crate::op::OpKind;
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};

/// Per-node analysis record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeIntensity {
    pub index: usize,
    pub op: OpKind,
    pub flops: f64,
    pub bytes: f64,
    pub intensity: f64,
    /// False when the cost model has no entry for `op`
    pub modeled: bool,
}

impl fmt::Display for NodeIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node[{:2}]: op={:<12}  FLOP={:12.0}  Bytes={:12.0}  AI={:6.2}",
            self.index, self.op, self.flops, self.bytes, self.intensity
        )?;
        if !self.modeled {
            write!(f, "  [no cost model]")?;
        }
        Ok(())
    }
}

/// Result of one analysis pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntensityReport {
    pub nodes: Vec<NodeIntensity>,
    pub total_flops: f64,
    pub total_bytes: f64,
    pub total_intensity: f64,
    pub unmodeled_nodes: usize,
}

impl IntensityReport {
    /// Summary line for the whole graph
    pub fn total_line(&self) -> String {
        format!(
            "=== TOTAL:  FLOP={:.0}  Bytes={:.0}  AI={:.2} ===",
            self.total_flops, self.total_bytes, self.total_intensity
        )
    }

    /// One diagnostic line per node, in execution order
    pub fn node_lines(&self) -> impl Iterator<Item = String> + '_ {
        self.nodes.iter().map(|n| n.to_string())
    }

    /// Write the node lines followed by the summary line
    pub fn write_diagnostics<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        for node in &self.nodes {
            writeln!(out, "{}", node)?;
        }
        writeln!(out, "{}", self.total_line())
    }

    pub fn to_json(&self) -> OpscopeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for IntensityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            writeln!(f, "{}", node)?;
        }
        write!(f, "{}", self.total_line())
    }
}

/// Computes an `IntensityReport` for a graph
#[derive(Debug, Clone, Copy)]
pub struct GraphAnalyzer<'m> {
    model: &'m OpCostModel,
}

impl GraphAnalyzer<'static> {
    /// Analyzer over the standard cost table
    pub fn new() -> Self {
        Self {
            model: OpCostModel::global(),
        }
    }
}

impl Default for GraphAnalyzer<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'m> GraphAnalyzer<'m> {
    pub fn with_model(model: &'m OpCostModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &'m OpCostModel {
        self.model
    }

    /// Analyze every node of `graph` in execution order
    pub fn analyze<G: ComputeGraph + ?Sized>(&self, graph: &G) -> IntensityReport {
        let mut report = IntensityReport {
            nodes: Vec::with_capacity(graph.node_count()),
            ..Default::default()
        };

        for index in 0..graph.node_count() {
            let record = self.analyze_node(index, graph.node(index));

            report.total_flops += record.flops;
            report.total_bytes += record.bytes;
            if !record.modeled {
                report.unmodeled_nodes += 1;
            }
            report.nodes.push(record);
        }

        report.total_intensity = ratio(report.total_flops, report.total_bytes);
        report
    }

    /// Analyze a single node
    pub fn analyze_node<N: GraphNode + ?Sized>(&self, index: usize, node: &N) -> NodeIntensity {
        let op = node.op();
        let modeled = self.model.is_modeled(op);
        let cost = self.model.cost_of(op);
        let dst = node.destination();

        let flops = if op == OpKind::MulMat {
            // M, N from the destination; K is the contraction dim of operand 0
            let m = dst.dim(0) as f64;
            let n = dst.dim(1) as f64;
            let k = node.operand(0).map_or(0, |a| a.dim(0)) as f64;
            2.0 * m * n * k
        } else {
            cost.flops_per_element * dst.element_count() as f64
        };

        let mut bytes: f64 = (0..cost.input_count)
            .filter_map(|i| node.operand(i))
            .map(|t| t.byte_size() as f64)
            .sum();
        if cost.writes_output {
            bytes += dst.byte_size() as f64;
        }

        NodeIntensity {
            index,
            op,
            flops,
            bytes,
            intensity: ratio(flops, bytes),
            modeled,
        }
    }
}

#[inline]
fn ratio(flops: f64, bytes: f64) -> f64 {
    if bytes > 0.0 {
        flops / bytes
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ElementType, Graph, TensorDesc};
    use crate::intensity::cost::OpCostEntry;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_graph_is_all_zero() {
        let report = GraphAnalyzer::new().analyze(&Graph::new());
        assert!(report.nodes.is_empty());
        assert_eq!(report.total_flops, 0.0);
        assert_eq!(report.total_bytes, 0.0);
        assert_eq!(report.total_intensity, 0.0);
    }

    #[test]
    fn test_single_add() {
        let n = 1024u64;
        let graph = Graph::new().binary(OpKind::Add, &[n], ElementType::F32);
        let report = GraphAnalyzer::new().analyze(&graph);

        let node = &report.nodes[0];
        assert_eq!(node.flops, n as f64);
        assert_eq!(node.bytes, (3 * n * 4) as f64);
        assert_relative_eq!(node.intensity, 1.0 / 12.0);
        assert_relative_eq!(report.total_intensity, 1.0 / 12.0);
    }

    #[test]
    fn test_mul_mat_uses_shapes_not_table() {
        let (m, n, k) = (64u64, 32u64, 128u64);
        let graph = Graph::new().mul_mat(m, n, k, ElementType::F16);

        // a table that claims a huge per-element cost must be ignored
        let model = OpCostModel::global()
            .to_builder()
            .entry(OpKind::MulMat, OpCostEntry::new(1000.0, 2, true))
            .build();

        for analyzer in [GraphAnalyzer::new(), GraphAnalyzer::with_model(&model)] {
            let node = &analyzer.analyze(&graph).nodes[0];
            assert_eq!(node.flops, (2 * m * n * k) as f64);
            assert_eq!(node.bytes, ((k * m + k * n + m * n) * 2) as f64);
        }
    }

    #[test]
    fn test_relabel_ops_skip_output_bytes() {
        for op in [OpKind::Reshape, OpKind::View, OpKind::Permute, OpKind::Transpose] {
            let src = TensorDesc::f32(vec![8, 4]);
            let graph = Graph::new().push(op, vec![src.clone()], TensorDesc::f32(vec![4, 8]));
            let node = &GraphAnalyzer::new().analyze(&graph).nodes[0];
            assert_eq!(node.flops, 0.0, "{op}");
            assert_eq!(node.bytes, 128.0, "{op}");
            assert_eq!(node.intensity, 0.0, "{op}");
        }
    }

    #[test]
    fn test_input_count_ignores_extra_operands() {
        let t = TensorDesc::f32(vec![16]);
        let graph = Graph::new().push(OpKind::Cpy, vec![t.clone(), t.clone(), t.clone()], t);
        let node = &GraphAnalyzer::new().analyze(&graph).nodes[0];
        // one declared input + written output
        assert_eq!(node.bytes, 128.0);
    }

    #[test]
    fn test_missing_operands_contribute_nothing() {
        let graph = Graph::new()
            .push(OpKind::Add, vec![TensorDesc::f32(vec![4])], TensorDesc::f32(vec![4]))
            .push(OpKind::MulMat, vec![], TensorDesc::f32(vec![2, 2]));
        let report = GraphAnalyzer::new().analyze(&graph);
        assert_eq!(report.nodes[0].bytes, 32.0);
        assert_eq!(report.nodes[1].flops, 0.0);
        assert_eq!(report.nodes[1].bytes, 16.0);
    }

    #[test]
    fn test_unmodeled_nodes_are_flagged() {
        let t = TensorDesc::f32(vec![4]);
        let graph = Graph::new()
            .push(OpKind::Im2Col, vec![t.clone()], t.clone())
            .binary(OpKind::Mul, &[4], ElementType::F32);
        let report = GraphAnalyzer::new().analyze(&graph);

        assert_eq!(report.unmodeled_nodes, 1);
        assert!(!report.nodes[0].modeled);
        assert_eq!(report.nodes[0].flops, 0.0);
        assert_eq!(report.nodes[0].bytes, 0.0);
        assert!(report.nodes[0].to_string().ends_with("[no cost model]"));
        assert!(report.nodes[1].modeled);
    }

    #[test]
    fn test_totals_accumulate_in_order() {
        let graph = Graph::new()
            .binary(OpKind::Add, &[10], ElementType::F32)
            .push(
                OpKind::SoftMax,
                vec![TensorDesc::f32(vec![10])],
                TensorDesc::f32(vec![10]),
            );
        let report = GraphAnalyzer::new().analyze(&graph);

        let indices: Vec<_> = report.nodes.iter().map(|n| n.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(report.total_flops, 10.0 + 30.0);
        assert_eq!(report.total_bytes, 120.0 + 80.0);
        assert_relative_eq!(report.total_intensity, 40.0 / 200.0);
    }

    #[test]
    fn test_diagnostic_format() {
        let graph = Graph::new().binary(OpKind::Add, &[1024], ElementType::F32);
        let report = GraphAnalyzer::new().analyze(&graph);

        let mut out = Vec::new();
        report.write_diagnostics(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(
            lines,
            vec![
                "node[ 0]: op=ADD           FLOP=        1024  Bytes=       12288  AI=  0.08",
                "=== TOTAL:  FLOP=1024  Bytes=12288  AI=0.08 ===",
            ]
        );
    }

    #[test]
    fn test_report_json_export() {
        let graph = Graph::new().mul_mat(2, 2, 2, ElementType::F32);
        let json = GraphAnalyzer::new().analyze(&graph).to_json().unwrap();
        assert!(json.contains("\"op\": \"MUL_MAT\""));
        assert!(json.contains("\"total_flops\": 16.0"));
    }
}
