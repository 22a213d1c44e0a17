//! # LowPrec IR
//!
//! The quantized compute-graph representation that the LowPrec transformations
//! operate on: numeric [element types](Elem), the [dequantization
//! descriptor](Dequantization) describing the pending affine decode of a
//! tensor, and the [graph model](QuantGraph) whose edges carry those
//! descriptors.
//!
//! Descriptors are immutable values; the graph swaps the descriptor held on an
//! edge rather than mutating one in place. Per-channel descriptor stages are
//! validated against the channel dimension of the tensor they decorate at
//! attach time, since the channel count is only known once a descriptor is
//! bound to an edge.

mod dequantize;
mod element;
mod graph;
mod operation;

pub use dequantize::*;
pub use element::*;
pub use graph::*;
pub use operation::*;

pub use petgraph::graph::{EdgeIndex, NodeIndex};
