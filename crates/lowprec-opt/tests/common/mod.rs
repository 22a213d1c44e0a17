use lowprec_ir::{Dequantization, Elem, NodeIndex, OpKind, OpNode, QuantGraph};
use lowprec_opt::{ActivationRule, TransformParams, Transformer, TransformerBuilder};

pub const SHAPE: [usize; 4] = [1, 3, 16, 16];

/// A minimal quantized graph around one activation: parameter -> relu ->
/// output, with the decode chain pending on the activation's input edge. The
/// activation's recorded output type starts out equal to its input type, as
/// the quantization-insertion step leaves it.
pub struct ActivationGraph {
    pub graph: QuantGraph,
    pub relu: NodeIndex,
}

pub fn activation_graph(input_elem: Elem, dequant: Dequantization) -> ActivationGraph {
    let mut graph = QuantGraph::default();
    let input = graph.add_node(OpNode::new(OpKind::Parameter, input_elem, SHAPE));
    let relu = graph.add_node(OpNode::new(OpKind::Relu, input_elem, SHAPE));
    let output = graph.add_node(OpNode::new(OpKind::Output, input_elem, SHAPE));
    graph.connect(input, relu, dequant).unwrap();
    graph.connect(relu, output, Dequantization::empty()).unwrap();
    ActivationGraph { graph, relu }
}

pub fn transformer(params: TransformParams) -> Transformer {
    TransformerBuilder::default()
        .with_rule(ActivationRule)
        .build(params)
}
