use petgraph::{
    Direction,
    graph::{EdgeIndex, NodeIndex},
    prelude::StableDiGraph,
    visit::EdgeRef,
};
use thiserror::Error;

use crate::{Dequantization, Elem, OpKind, OpNode};

/// Errors surfaced by descriptor attachment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A per-channel stage's value count disagrees with the channel dimension
    /// of the tensor it decorates.
    #[error("per-channel stage carries {actual} values but the tensor has {expected} channels")]
    ShapeMismatch { expected: usize, actual: usize },
}

/// The quantized compute graph: [`OpNode`]s connected by tensor edges, each
/// edge carrying the [`Dequantization`] descriptor still pending on that
/// tensor.
///
/// Node indices are stable across edits, so a traversal order snapshotted
/// with [`node_ids`](Self::node_ids) before a rewrite pass stays valid while
/// edges are swapped underneath it.
#[derive(Debug, Clone, Default)]
pub struct QuantGraph {
    graph: StableDiGraph<OpNode, Dequantization>,
}

impl QuantGraph {
    pub fn add_node(&mut self, node: OpNode) -> NodeIndex {
        self.graph.add_node(node)
    }

    /// Connect `src` to `dst` with a tensor edge carrying `dequant`.
    ///
    /// Fails with [`GraphError::ShapeMismatch`] when a per-channel stage of
    /// the descriptor disagrees with the channel dimension of the tensor
    /// flowing on the edge (the output tensor of `src`).
    pub fn connect(
        &mut self,
        src: NodeIndex,
        dst: NodeIndex,
        dequant: Dequantization,
    ) -> Result<EdgeIndex, GraphError> {
        validate(&dequant, self.channels(src))?;
        Ok(self.graph.add_edge(src, dst, dequant))
    }

    /// A snapshot of all node indices, fixed before mutation begins.
    pub fn node_ids(&self) -> Vec<NodeIndex> {
        self.graph.node_indices().collect()
    }

    pub fn node(&self, node: NodeIndex) -> &OpNode {
        &self.graph[node]
    }

    pub fn op_kind(&self, node: NodeIndex) -> OpKind {
        self.graph[node].kind
    }

    pub fn out_elem(&self, node: NodeIndex) -> Elem {
        self.graph[node].out_elem
    }

    pub fn set_out_elem(&mut self, node: NodeIndex, elem: Elem) {
        self.graph[node].out_elem = elem;
    }

    /// Channel-dimension size of the node's output tensor.
    pub fn channels(&self, node: NodeIndex) -> Option<usize> {
        self.graph[node].shape.get(1).copied()
    }

    /// Element type of the tensor feeding the node, `None` for source nodes.
    pub fn input_elem(&self, node: NodeIndex) -> Option<Elem> {
        let edge = self.input_edge(node)?;
        let (src, _) = self.graph.edge_endpoints(edge)?;
        Some(self.graph[src].out_elem)
    }

    /// The descriptor pending on the node's input edge.
    pub fn input_dequant(&self, node: NodeIndex) -> Option<&Dequantization> {
        self.input_edge(node).map(|edge| &self.graph[edge])
    }

    /// The descriptor pending on the node's output edge.
    pub fn output_dequant(&self, node: NodeIndex) -> Option<&Dequantization> {
        self.output_edge(node).map(|edge| &self.graph[edge])
    }

    /// Check that `dequant` could be attached to the node's input edge.
    pub fn validate_input_dequant(
        &self,
        node: NodeIndex,
        dequant: &Dequantization,
    ) -> Result<(), GraphError> {
        let channels = self
            .input_edge(node)
            .and_then(|edge| self.graph.edge_endpoints(edge))
            .and_then(|(src, _)| self.channels(src));
        validate(dequant, channels)
    }

    /// Check that `dequant` could be attached to the node's output edge.
    pub fn validate_output_dequant(
        &self,
        node: NodeIndex,
        dequant: &Dequantization,
    ) -> Result<(), GraphError> {
        validate(dequant, self.channels(node))
    }

    /// Replace the descriptor on the node's input edge.
    ///
    /// Panics when the node has no input edge; rules must not be applied to
    /// source nodes.
    pub fn set_input_dequant(
        &mut self,
        node: NodeIndex,
        dequant: Dequantization,
    ) -> Result<(), GraphError> {
        self.validate_input_dequant(node, &dequant)?;
        let edge = self.input_edge(node).expect("node has no input edge");
        self.graph[edge] = dequant;
        Ok(())
    }

    /// Replace the descriptor on the node's output edge.
    ///
    /// Panics when the node has no output edge; rules must not be applied to
    /// sink nodes.
    pub fn set_output_dequant(
        &mut self,
        node: NodeIndex,
        dequant: Dequantization,
    ) -> Result<(), GraphError> {
        self.validate_output_dequant(node, &dequant)?;
        let edge = self.output_edge(node).expect("node has no output edge");
        self.graph[edge] = dequant;
        Ok(())
    }

    fn input_edge(&self, node: NodeIndex) -> Option<EdgeIndex> {
        self.graph
            .edges_directed(node, Direction::Incoming)
            .map(|edge| edge.id())
            .next()
    }

    fn output_edge(&self, node: NodeIndex) -> Option<EdgeIndex> {
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .map(|edge| edge.id())
            .next()
    }
}

fn validate(dequant: &Dequantization, channels: Option<usize>) -> Result<(), GraphError> {
    for actual in dequant.channel_counts() {
        let expected = channels.unwrap_or(0);
        if actual != expected {
            return Err(GraphError::ShapeMismatch { expected, actual });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{FloatKind, UIntKind};

    const U8: Elem = Elem::UInt(UIntKind::U8);
    const F32: Elem = Elem::Float(FloatKind::F32);

    fn per_channel(scales: Vec<f32>) -> Dequantization {
        Dequantization::empty()
            .with_convert(F32)
            .with_multiply(scales)
    }

    #[test]
    fn connect_validates_per_channel_stages() {
        let mut graph = QuantGraph::default();
        let input = graph.add_node(OpNode::new(OpKind::Parameter, U8, [1, 3, 16, 16]));
        let relu = graph.add_node(OpNode::new(OpKind::Relu, U8, [1, 3, 16, 16]));

        let err = graph
            .connect(input, relu, per_channel(vec![0.1, 0.2]))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::ShapeMismatch {
                expected: 3,
                actual: 2
            }
        );

        graph
            .connect(input, relu, per_channel(vec![0.1, 0.2, 0.3]))
            .unwrap();
        assert_eq!(
            graph.input_dequant(relu),
            Some(&per_channel(vec![0.1, 0.2, 0.3]))
        );
    }

    #[test]
    fn edge_descriptors_are_swappable() {
        let mut graph = QuantGraph::default();
        let input = graph.add_node(OpNode::new(OpKind::Parameter, U8, [1, 3, 16, 16]));
        let relu = graph.add_node(OpNode::new(OpKind::Relu, U8, [1, 3, 16, 16]));
        let output = graph.add_node(OpNode::new(OpKind::Output, U8, [1, 3, 16, 16]));
        let dequant = Dequantization::empty().with_convert(F32).with_multiply(0.1);
        graph.connect(input, relu, dequant.clone()).unwrap();
        graph.connect(relu, output, Dequantization::empty()).unwrap();

        graph.set_input_dequant(relu, Dequantization::empty()).unwrap();
        graph.set_output_dequant(relu, dequant.clone()).unwrap();

        assert_eq!(graph.input_dequant(relu), Some(&Dequantization::empty()));
        assert_eq!(graph.output_dequant(relu), Some(&dequant));
        assert_eq!(graph.input_dequant(input), None);
        assert_eq!(graph.output_dequant(output), None);
    }

    #[test]
    fn input_elem_reads_the_producer() {
        let mut graph = QuantGraph::default();
        let input = graph.add_node(OpNode::new(OpKind::Parameter, U8, [1, 3, 16, 16]));
        let relu = graph.add_node(OpNode::new(OpKind::Relu, U8, [1, 3, 16, 16]));
        graph.connect(input, relu, Dequantization::empty()).unwrap();

        assert_eq!(graph.input_elem(relu), Some(U8));
        assert_eq!(graph.input_elem(input), None);

        graph.set_out_elem(input, F32);
        assert_eq!(graph.input_elem(relu), Some(F32));
    }

    #[test]
    fn channels_read_axis_one() {
        let mut graph = QuantGraph::default();
        let node = graph.add_node(OpNode::new(OpKind::Parameter, U8, [1, 3, 16, 16]));
        let scalar = graph.add_node(OpNode::new(OpKind::Parameter, U8, [4]));
        assert_eq!(graph.channels(node), Some(3));
        assert_eq!(graph.channels(scalar), None);
    }
}
