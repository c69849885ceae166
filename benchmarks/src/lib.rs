//! Graph fixtures shared by the opscope benches

use opscope_core::graph::{ElementType, Graph, TensorDesc};
use opscope_core::OpKind;

/// Decoder-only transformer forward pass: `layers` blocks of
/// norm / qkv / rope / attention / softmax / output / gated MLP
pub fn decoder_graph(layers: usize, hidden: u64, tokens: u64) -> Graph {
    let ffn = hidden * 4;
    let act = |rows: u64| TensorDesc::f16(vec![rows, tokens]);
    let mut graph = Graph::new();

    for _ in 0..layers {
        graph = graph
            .push(OpKind::RmsNorm, vec![act(hidden)], act(hidden))
            .mul_mat(hidden * 3, tokens, hidden, ElementType::F16)
            .push(OpKind::View, vec![act(hidden * 3)], act(hidden))
            .push(
                OpKind::Rope,
                vec![act(hidden), TensorDesc::new(vec![tokens], ElementType::I32)],
                act(hidden),
            )
            .push(OpKind::Permute, vec![act(hidden)], act(hidden))
            .mul_mat(tokens, tokens, hidden, ElementType::F16)
            .push(
                OpKind::SoftMax,
                vec![TensorDesc::f16(vec![tokens, tokens])],
                TensorDesc::f16(vec![tokens, tokens]),
            )
            .mul_mat(hidden, tokens, tokens, ElementType::F16)
            .mul_mat(hidden, tokens, hidden, ElementType::F16)
            .binary(OpKind::Add, &[hidden, tokens], ElementType::F16)
            .push(OpKind::RmsNorm, vec![act(hidden)], act(hidden))
            .mul_mat(ffn * 2, tokens, hidden, ElementType::F16)
            .push(OpKind::Glu, vec![act(ffn), act(ffn)], act(ffn))
            .mul_mat(hidden, tokens, ffn, ElementType::F16)
            .binary(OpKind::Add, &[hidden, tokens], ElementType::F16);
    }

    graph
}
