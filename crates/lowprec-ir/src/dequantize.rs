use core::fmt::Display;

use crate::{Elem, FloatKind};

/// Values of one descriptor stage: a single scalar for the whole tensor, or
/// one value per channel.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum StageValues {
    Scalar(f32),
    PerChannel(Vec<f32>),
}

impl StageValues {
    /// Number of channels this stage is bound to, `None` when per-tensor.
    pub fn channels(&self) -> Option<usize> {
        match self {
            StageValues::Scalar(_) => None,
            StageValues::PerChannel(values) => Some(values.len()),
        }
    }

    /// The value governing `channel`.
    pub fn get(&self, channel: usize) -> f32 {
        match self {
            StageValues::Scalar(value) => *value,
            StageValues::PerChannel(values) => values[channel],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        let values = match self {
            StageValues::Scalar(value) => core::slice::from_ref(value),
            StageValues::PerChannel(values) => values.as_slice(),
        };
        values.iter().copied()
    }
}

impl From<f32> for StageValues {
    fn from(value: f32) -> Self {
        StageValues::Scalar(value)
    }
}

impl From<Vec<f32>> for StageValues {
    fn from(values: Vec<f32>) -> Self {
        StageValues::PerChannel(values)
    }
}

impl Display for StageValues {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StageValues::Scalar(value) => write!(f, "{value}"),
            StageValues::PerChannel(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// The zero-point shift stage. `elem` is the element type of the shift
/// constant, always a widened type so the subtraction cannot underflow the
/// narrow input representation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Subtract {
    pub values: StageValues,
    pub elem: Elem,
}

impl Subtract {
    pub fn new(values: impl Into<StageValues>) -> Self {
        Self {
            values: values.into(),
            elem: Elem::Float(FloatKind::F32),
        }
    }

    pub fn with_elem(mut self, elem: Elem) -> Self {
        self.elem = elem;
        self
    }
}

/// The scale stage.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Multiply {
    pub values: StageValues,
}

impl Multiply {
    pub fn new(values: impl Into<StageValues>) -> Self {
        Self {
            values: values.into(),
        }
    }
}

/// An ordered affine decode chain attached to a tensor edge: convert to a
/// wider type, subtract the zero point, multiply by the scale. An absent
/// stage is the identity for that stage; a descriptor with all three stages
/// absent describes a tensor with no pending decode work.
///
/// Descriptors are immutable values. Transformations build new descriptors
/// and ask the graph to swap the one held on an edge.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dequantization {
    pub convert: Option<Elem>,
    pub subtract: Option<Subtract>,
    pub multiply: Option<Multiply>,
}

impl Dequantization {
    pub fn new(
        convert: Option<Elem>,
        subtract: Option<Subtract>,
        multiply: Option<Multiply>,
    ) -> Self {
        Self {
            convert,
            subtract,
            multiply,
        }
    }

    /// A descriptor with no pending decode work.
    pub const fn empty() -> Self {
        Self {
            convert: None,
            subtract: None,
            multiply: None,
        }
    }

    pub fn with_convert(mut self, elem: Elem) -> Self {
        self.convert = Some(elem);
        self
    }

    pub fn with_subtract(mut self, values: impl Into<StageValues>) -> Self {
        self.subtract = Some(Subtract::new(values));
        self
    }

    pub fn with_multiply(mut self, values: impl Into<StageValues>) -> Self {
        self.multiply = Some(Multiply::new(values));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.convert.is_none() && self.subtract.is_none() && self.multiply.is_none()
    }

    /// True iff any value of the scale stage is strictly negative.
    pub fn has_negative_scale(&self) -> bool {
        match &self.multiply {
            Some(multiply) => multiply.values.iter().any(|value| value < 0.0),
            None => false,
        }
    }

    /// Split the descriptor into the part that must stay before an operation
    /// (convert + subtract) and the part that can move past it (multiply).
    pub fn split_multiply_out(&self) -> (Dequantization, Dequantization) {
        let before = Dequantization {
            convert: self.convert,
            subtract: self.subtract.clone(),
            multiply: None,
        };
        let after = Dequantization {
            convert: None,
            subtract: None,
            multiply: self.multiply.clone(),
        };
        (before, after)
    }

    /// Channel counts of the per-channel stages, for attach-time validation.
    pub fn channel_counts(&self) -> impl Iterator<Item = usize> + '_ {
        let subtract = self.subtract.as_ref().and_then(|s| s.values.channels());
        let multiply = self.multiply.as_ref().and_then(|m| m.values.channels());
        subtract.into_iter().chain(multiply)
    }

    /// Decode one element of `channel`. The convert stage only widens the
    /// storage type and is numerically the identity.
    pub fn apply(&self, x: f64, channel: usize) -> f64 {
        let mut value = x;
        if let Some(subtract) = &self.subtract {
            value -= subtract.values.get(channel) as f64;
        }
        if let Some(multiply) = &self.multiply {
            value *= multiply.values.get(channel) as f64;
        }
        value
    }
}

impl Display for Dequantization {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_empty() {
            return f.write_str("identity");
        }
        let mut first = true;
        let mut sep = |f: &mut core::fmt::Formatter<'_>| {
            if first {
                first = false;
                Ok(())
            } else {
                f.write_str(" -> ")
            }
        };
        if let Some(elem) = &self.convert {
            sep(f)?;
            write!(f, "convert({elem})")?;
        }
        if let Some(subtract) = &self.subtract {
            sep(f)?;
            write!(f, "subtract({})", subtract.values)?;
        }
        if let Some(multiply) = &self.multiply {
            sep(f)?;
            write!(f, "multiply({})", multiply.values)?;
        }
        Ok(())
    }
}
