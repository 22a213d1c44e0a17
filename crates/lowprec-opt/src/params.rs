use std::collections::HashSet;

use lowprec_ir::{Elem, IntKind, UIntKind};

/// Configuration of one transformer run: which quantization variants the
/// surrounding system is allowed to produce. Built once per run and read-only
/// to rules; safe to share across concurrent runs on different graphs.
#[derive(Debug, Clone)]
pub struct TransformParams {
    precisions: HashSet<(Elem, Elem)>,
    /// Whether rules may split a zero-point shift out of a decode chain.
    pub support_asymmetric_quantization: bool,
}

impl TransformParams {
    pub fn new(precisions: impl IntoIterator<Item = (Elem, Elem)>) -> Self {
        Self {
            precisions: precisions.into_iter().collect(),
            support_asymmetric_quantization: true,
        }
    }

    /// The u8-activations / i8-weights precision profile.
    pub fn u8_i8() -> Self {
        let u8 = Elem::UInt(UIntKind::U8);
        let i8 = Elem::Int(IntKind::I8);
        Self::new([(u8, u8), (u8, i8), (i8, i8)])
    }

    /// The all-signed precision profile.
    pub fn i8_i8() -> Self {
        let i8 = Elem::Int(IntKind::I8);
        Self::new([(i8, i8)])
    }

    pub fn with_asymmetric(mut self, enabled: bool) -> Self {
        self.support_asymmetric_quantization = enabled;
        self
    }

    /// Whether the `(input, output)` precision pair is allowed.
    pub fn is_precision_supported(&self, input: Elem, output: Elem) -> bool {
        self.precisions.contains(&(input, output))
    }
}
