//! Tempo-chain decomposition.
//!
//! Audio time-stretch primitives only accept tempo multipliers in
//! `[TEMPO_MIN, TEMPO_MAX]`. Any positive factor is expressed as a chain of
//! such steps whose product equals the factor.

/// Smallest multiplier a single time-stretch step accepts.
pub const TEMPO_MIN: f64 = 0.5;

/// Largest multiplier a single time-stretch step accepts.
pub const TEMPO_MAX: f64 = 2.0;

/// Remainders this close to `1.0` are dropped.
pub const TEMPO_EPSILON: f64 = 1e-3;

/// Decompose `factor` into tempo steps, each within `[0.5, 2.0]`.
///
/// `decompose(1.0)` is empty and `decompose(5.0)` is `[2.0, 2.0, 1.25]`.
/// Non-finite or non-positive factors yield an empty chain; callers validate
/// factors before planning.
pub fn decompose(factor: f64) -> Vec<f64> {
    let mut chain = Vec::new();
    if !factor.is_finite() || factor <= 0.0 {
        return chain;
    }

    let mut remaining = factor;
    while remaining > TEMPO_MAX {
        chain.push(TEMPO_MAX);
        remaining /= TEMPO_MAX;
    }
    while remaining < TEMPO_MIN {
        chain.push(TEMPO_MIN);
        remaining /= TEMPO_MIN;
    }

    let remaining = remaining.clamp(TEMPO_MIN, TEMPO_MAX);
    if (remaining - 1.0).abs() > TEMPO_EPSILON {
        chain.push(remaining);
    }
    chain
}
