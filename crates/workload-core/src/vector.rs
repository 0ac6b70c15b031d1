//! Embedding vectors and their SQL text representation.

use std::fmt::Write;

/// Fixed-length single-precision embedding.
pub type Embedding = Vec<f32>;

/// Serialize an embedding in the vector extension's text input syntax:
/// `[0.123456,-0.654321,0.000012]` (six fractional digits).
pub fn to_vector_literal(values: &[f32]) -> String {
    let mut out = String::with_capacity(2 + values.len() * 10);
    out.push('[');
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        // Writing into a String cannot fail.
        let _ = write!(out, "{value:.6}");
    }
    out.push(']');
    out
}

/// Euclidean norm of `values`.
pub fn l2_norm(values: &[f32]) -> f32 {
    values
        .iter()
        .map(|v| f64::from(*v) * f64::from(*v))
        .sum::<f64>()
        .sqrt() as f32
}
