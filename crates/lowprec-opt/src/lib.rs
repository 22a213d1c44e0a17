//! # LowPrec Optimizer
//!
//! Graph transformations that relocate pending dequantization decode chains
//! across operations of a [`QuantGraph`], so that operations execute on
//! reduced-precision data wherever the rewrite provably preserves the graph's
//! numerics. The pass works as follows:
//!
//! 1. Snapshot the node list before any edit, so edge mutation cannot
//!    invalidate the traversal.
//! 2. For every node, look up the [`RewriteRule`] registered for its kind.
//! 3. Where the rule's [`can_transform`](RewriteRule::can_transform) holds,
//!    apply it; nodes it does not hold for are silently skipped.
//!
//! Each node's decision depends only on its own input descriptor and the
//! fixed [`TransformParams`], so the result of a pass does not depend on the
//! order nodes are visited in.

use std::collections::HashMap;

use lowprec_ir::{OpKind, QuantGraph};

mod params;
mod rules;

pub use params::*;
pub use rules::*;

/// Build a transformer with rewrite rules.
#[derive(Default)]
pub struct TransformerBuilder {
    rules: Vec<Box<dyn RewriteRule>>,
}

impl TransformerBuilder {
    /// Add a rewrite rule to the transformer. A later rule for the same node
    /// kind replaces an earlier one.
    pub fn with_rule(mut self, rule: impl RewriteRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Build the transformer with the parameters for this run.
    pub fn build(self, params: TransformParams) -> Transformer {
        let rules = self
            .rules
            .into_iter()
            .map(|rule| (rule.op_kind(), rule))
            .collect();
        Transformer { rules, params }
    }
}

/// Drives rewrite rules over one graph. Parameters are fixed at construction
/// and read-only for the duration of a run; independent graphs may be
/// processed concurrently with their own transformer each.
#[derive(Debug)]
pub struct Transformer {
    rules: HashMap<OpKind, Box<dyn RewriteRule>>,
    params: TransformParams,
}

impl Transformer {
    /// Apply all applicable rules once across the graph, returning the number
    /// of nodes rewritten. Nodes whose rewrite fails recoverably are left
    /// untouched and reported through `log`.
    pub fn run(&self, graph: &mut QuantGraph) -> usize {
        let mut applied = 0;
        for node in graph.node_ids() {
            let kind = graph.op_kind(node);
            let Some(rule) = self.rules.get(&kind) else {
                continue;
            };
            if !rule.can_transform(graph, node, &self.params) {
                continue;
            }
            match rule.transform(graph, node, &self.params) {
                Ok(()) => {
                    log::trace!("rewrote {kind} node {node:?}");
                    applied += 1;
                }
                Err(err) => log::warn!("skipping {kind} node {node:?}: {err}"),
            }
        }
        applied
    }
}
