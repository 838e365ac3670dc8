//! Typed result of evaluating one formula node.
//!
//! Coercion rules used throughout the engine:
//! - numeric to boolean: `x != 0`, with NaN coercing to `false`
//! - boolean to numeric: `true` is 1.0, `false` is 0.0
//! - a `Scalar` stands for the same value at every index

/// One evaluated node. Vectors always have the length of the series being
/// evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Numeric(Vec<f64>),
    Boolean(Vec<bool>),
}

/// Numeric-to-boolean coercion.
pub fn truthy(x: f64) -> bool {
    !x.is_nan() && x != 0.0
}

pub fn bool_to_f64(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

impl Value {
    /// Name used in argument-type error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "a scalar",
            Value::Numeric(_) => "a numeric series",
            Value::Boolean(_) => "a boolean series",
        }
    }

    pub fn is_vector(&self) -> bool {
        !matches!(self, Value::Scalar(_))
    }

    /// Numeric reading at index `i`; booleans read as 0/1.
    pub fn number_at(&self, i: usize) -> f64 {
        match self {
            Value::Scalar(v) => *v,
            Value::Numeric(values) => values[i],
            Value::Boolean(flags) => bool_to_f64(flags[i]),
        }
    }

    /// Boolean reading at index `i` under the coercion rules.
    pub fn truthy_at(&self, i: usize) -> bool {
        match self {
            Value::Scalar(v) => truthy(*v),
            Value::Numeric(values) => truthy(values[i]),
            Value::Boolean(flags) => flags[i],
        }
    }

    /// Materialise as a numeric vector of length `len`, broadcasting scalars
    /// and coercing booleans to 0/1.
    pub fn into_numeric(self, len: usize) -> Vec<f64> {
        match self {
            Value::Scalar(v) => vec![v; len],
            Value::Numeric(values) => values,
            Value::Boolean(flags) => flags.into_iter().map(bool_to_f64).collect(),
        }
    }
}
