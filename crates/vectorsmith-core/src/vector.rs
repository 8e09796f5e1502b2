//! Vector encoding and SQL identifier helpers
//!
//! Shared by the relational adapters: identifier quoting for dynamic table
//! names, pgvector text literals, and sqlite-vec float blobs.

use crate::{Result, VectorSmithError};

/// Quote a SQL identifier, doubling any embedded double quotes
///
/// ```
/// use vectorsmith_core::vector::quote_identifier;
/// assert_eq!(quote_identifier("docs"), "\"docs\"");
/// assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render a vector as a pgvector text literal (`[1,2,3]`)
pub fn vector_literal(vector: &[f32]) -> String {
    let parts: Vec<String> = vector.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

/// Parse a pgvector text literal back into floats
pub fn parse_vector_literal(text: &str) -> Result<Vec<f32>> {
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| VectorSmithError::InvalidResponse(format!("Bad vector literal: {text}")))?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(|part| {
            part.trim().parse::<f32>().map_err(|e| {
                VectorSmithError::InvalidResponse(format!("Bad vector component {part:?}: {e}"))
            })
        })
        .collect()
}

/// Encode floats as a little-endian `f32` blob
pub fn vec_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        blob.extend_from_slice(&v.to_le_bytes());
    }
    blob
}

/// Decode a little-endian `f32` blob; trailing partial values are ignored
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Fail with `DimensionMismatch` unless `vector` has `expected` components
pub fn ensure_dimension(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != expected {
        return Err(VectorSmithError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

/// Reject empty vectors and NaN/infinite components
pub fn ensure_finite(vector: &[f32]) -> Result<()> {
    if vector.is_empty() {
        return Err(VectorSmithError::InvalidInput(
            "Vector must not be empty".to_string(),
        ));
    }
    if let Some(pos) = vector.iter().position(|v| !v.is_finite()) {
        return Err(VectorSmithError::InvalidInput(format!(
            "Vector component {pos} is not finite"
        )));
    }
    Ok(())
}
