//! Resource quantity parsing
//!
//! Converts Kubernetes-style quantity strings into the engine's units:
//! CPU in (fractional) cores, memory in GiB. Malformed input is an error,
//! never a silent zero.

use crate::error::{EngineError, EngineResult};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Binary and decimal memory suffixes, expressed in GiB.
///
/// Longest suffixes first so `Gi` is matched before `G`.
const MEMORY_SUFFIXES: &[(&str, f64)] = &[
    ("Ki", 1.0 / (1024.0 * 1024.0)),
    ("Mi", 1.0 / 1024.0),
    ("Gi", 1.0),
    ("Ti", 1024.0),
    ("Pi", 1024.0 * 1024.0),
    ("K", 1e3 / GIB),
    ("M", 1e6 / GIB),
    ("G", 1e9 / GIB),
    ("T", 1e12 / GIB),
];

/// Parse a CPU quantity (`"2"`, `"0.5"`, `"500m"`) into cores.
pub fn parse_cpu(quantity: &str) -> EngineResult<f64> {
    let trimmed = quantity.trim();
    if let Some(millis) = trimmed.strip_suffix('m') {
        return parse_number(quantity, millis).map(|v| v / 1000.0);
    }
    parse_number(quantity, trimmed)
}

/// Parse a memory quantity (`"4Gi"`, `"512Mi"`, `"1G"`) into GiB.
///
/// A bare number is taken to already be in GiB.
pub fn parse_memory_gib(quantity: &str) -> EngineResult<f64> {
    let trimmed = quantity.trim();
    for (suffix, scale) in MEMORY_SUFFIXES {
        if let Some(value) = trimmed.strip_suffix(suffix) {
            return parse_number(quantity, value).map(|v| v * scale);
        }
    }
    parse_number(quantity, trimmed)
}

/// Parse a whole-device count (GPU/NPU).
pub fn parse_device_count(quantity: &str) -> EngineResult<u32> {
    quantity
        .trim()
        .parse::<u32>()
        .map_err(|e| EngineError::parse(quantity, e.to_string()))
}

fn parse_number(original: &str, digits: &str) -> EngineResult<f64> {
    if digits.is_empty() {
        return Err(EngineError::parse(original, "missing numeric value"));
    }
    let value = digits
        .parse::<f64>()
        .map_err(|e| EngineError::parse(original, e.to_string()))?;
    if !value.is_finite() || value < 0.0 {
        return Err(EngineError::parse(original, "must be a finite, non-negative number"));
    }
    Ok(value)
}
