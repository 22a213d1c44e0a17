use lowprec_ir::{Dequantization, Elem, FloatKind, GraphError, NodeIndex, OpKind, QuantGraph};

use crate::{RewriteRule, TransformParams};

/// Propagates a dequantization decode chain across a clamping activation.
///
/// The activation clamps values below a threshold, so a decode stage may only
/// move past it when the two commute: `max(k * x, 0) == k * max(x, 0)` holds
/// for every `k >= 0`, and for no `k < 0`. The zero-point shift never
/// commutes with the clamp and additionally needs the widened type produced
/// by the convert stage, so where a shift is present only the scale can move.
///
/// Whenever the chain cannot move, the rule falls back to executing the
/// activation on fully decoded f32 data, which is always equivalent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivationRule;

impl RewriteRule for ActivationRule {
    fn op_kind(&self) -> OpKind {
        OpKind::Relu
    }

    fn can_transform(
        &self,
        graph: &QuantGraph,
        node: NodeIndex,
        params: &TransformParams,
    ) -> bool {
        let Some(dequant) = graph.input_dequant(node) else {
            return false;
        };
        if dequant.is_empty() || graph.output_dequant(node).is_none() {
            return false;
        }
        let Some(input) = graph.input_elem(node) else {
            return false;
        };
        if input.is_float() {
            // Nothing to propagate, the tensor is already decoded.
            return false;
        }
        params.is_precision_supported(input, graph.out_elem(node))
    }

    fn transform(
        &self,
        graph: &mut QuantGraph,
        node: NodeIndex,
        params: &TransformParams,
    ) -> Result<(), GraphError> {
        assert!(
            self.can_transform(graph, node, params),
            "activation rewrite applied to an inapplicable node"
        );
        let Some(dequant) = graph.input_dequant(node).cloned() else {
            unreachable!("checked by can_transform")
        };

        if dequant.has_negative_scale() {
            // The clamp direction flips under a negative scale; the chain
            // stays put and the op runs on fully decoded data.
            graph.set_out_elem(node, Elem::Float(FloatKind::F32));
            graph.set_output_dequant(node, Dequantization::empty())?;
            return Ok(());
        }

        if dequant.subtract.is_none() {
            // Scale-only chains commute with the clamp; the whole chain moves
            // past the op and the op keeps its low-precision input type.
            graph.validate_output_dequant(node, &dequant)?;
            graph.set_input_dequant(node, Dequantization::empty())?;
            graph.set_output_dequant(node, dequant)?;
            return Ok(());
        }

        if !params.support_asymmetric_quantization {
            // The shift may not be split under this policy; same fallback as
            // the negative-scale case.
            graph.set_out_elem(node, Elem::Float(FloatKind::F32));
            graph.set_output_dequant(node, Dequantization::empty())?;
            return Ok(());
        }

        // The shift must happen before the op, in the widened type; only the
        // scale is deferred past the clamp.
        let (before, after) = dequant.split_multiply_out();
        graph.validate_input_dequant(node, &before)?;
        graph.validate_output_dequant(node, &after)?;
        graph.set_input_dequant(node, before)?;
        graph.set_out_elem(node, Elem::Float(FloatKind::F32));
        graph.set_output_dequant(node, after)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lowprec_ir::{OpNode, UIntKind};

    const U8: Elem = Elem::UInt(UIntKind::U8);
    const F32: Elem = Elem::Float(FloatKind::F32);

    fn graph_with(input_elem: Elem, dequant: Dequantization) -> (QuantGraph, NodeIndex) {
        let mut graph = QuantGraph::default();
        let input = graph.add_node(OpNode::new(OpKind::Parameter, input_elem, [1, 3, 16, 16]));
        let relu = graph.add_node(OpNode::new(OpKind::Relu, input_elem, [1, 3, 16, 16]));
        let output = graph.add_node(OpNode::new(OpKind::Output, input_elem, [1, 3, 16, 16]));
        graph.connect(input, relu, dequant).unwrap();
        graph.connect(relu, output, Dequantization::empty()).unwrap();
        (graph, relu)
    }

    #[test]
    fn inapplicable_to_empty_descriptor() {
        let (graph, relu) = graph_with(U8, Dequantization::empty());
        assert!(!ActivationRule.can_transform(&graph, relu, &TransformParams::u8_i8()));
    }

    #[test]
    fn inapplicable_to_float_input() {
        let dequant = Dequantization::empty().with_multiply(0.1);
        let (graph, relu) = graph_with(F32, dequant);
        assert!(!ActivationRule.can_transform(&graph, relu, &TransformParams::u8_i8()));
    }

    #[test]
    fn inapplicable_to_unsupported_precision_pair() {
        let dequant = Dequantization::empty().with_convert(F32).with_multiply(0.1);
        let (graph, relu) = graph_with(U8, dequant);
        assert!(!ActivationRule.can_transform(&graph, relu, &TransformParams::i8_i8()));
    }

    #[test]
    fn inapplicable_to_detached_nodes() {
        let mut graph = QuantGraph::default();
        let lone = graph.add_node(OpNode::new(OpKind::Relu, U8, [1, 3, 16, 16]));
        assert!(!ActivationRule.can_transform(&graph, lone, &TransformParams::u8_i8()));
    }

    #[test]
    #[should_panic(expected = "inapplicable")]
    fn transform_without_check_is_a_contract_violation() {
        let (mut graph, relu) = graph_with(U8, Dequantization::empty());
        let _ = ActivationRule.transform(&mut graph, relu, &TransformParams::u8_i8());
    }
}
