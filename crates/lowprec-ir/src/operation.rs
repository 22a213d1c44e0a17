use core::fmt::Display;

use smallvec::SmallVec;

use crate::Elem;

/// Tensor shape in NCHW layout; the channel dimension is axis 1.
pub type Shape = SmallVec<[usize; 4]>;

/// The kinds of nodes rewrite rules dispatch on.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// A graph input.
    Parameter,
    /// Rectifying linear unit, the activation-clamp family.
    Relu,
    /// A graph output.
    Output,
}

impl Display for OpKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            OpKind::Parameter => f.write_str("parameter"),
            OpKind::Relu => f.write_str("relu"),
            OpKind::Output => f.write_str("output"),
        }
    }
}

/// A node of the quantized graph: an operation together with the element type
/// and shape of its output tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct OpNode {
    pub kind: OpKind,
    pub out_elem: Elem,
    pub shape: Shape,
}

impl OpNode {
    pub fn new(kind: OpKind, out_elem: Elem, shape: impl IntoIterator<Item = usize>) -> Self {
        Self {
            kind,
            out_elem,
            shape: shape.into_iter().collect(),
        }
    }
}
