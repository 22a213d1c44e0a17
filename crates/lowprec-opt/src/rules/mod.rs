mod activation;

pub use activation::*;

use lowprec_ir::{GraphError, NodeIndex, OpKind, QuantGraph};

use crate::TransformParams;

/// A graph rewrite keyed by node kind. The transformer engine looks the rule
/// up in its table and applies it where [`can_transform`](Self::can_transform)
/// holds.
pub trait RewriteRule: core::fmt::Debug {
    /// The node kind this rule rewrites.
    fn op_kind(&self) -> OpKind;

    /// Whether the rule applies to `node` under `params`. Returning false is
    /// not an error; the engine skips the node silently.
    fn can_transform(
        &self,
        graph: &QuantGraph,
        node: NodeIndex,
        params: &TransformParams,
    ) -> bool;

    /// Rewrite the graph in place. Only valid to call when
    /// [`can_transform`](Self::can_transform) returned true for the same node
    /// and parameters; violating that contract panics. A recoverable failure
    /// ([`GraphError::ShapeMismatch`]) leaves the graph in the state prior to
    /// the call.
    fn transform(
        &self,
        graph: &mut QuantGraph,
        node: NodeIndex,
        params: &TransformParams,
    ) -> Result<(), GraphError>;
}
