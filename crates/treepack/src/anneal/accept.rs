//! Metropolis acceptance.

/// Probability of accepting a move from `current` to `proposed` energy.
///
/// `exp((current − proposed) / max(T, ε))`. Values above 1 mean certain
/// acceptance. Exponents above `exponent_cap` saturate to `+∞` instead of
/// overflowing.
#[inline]
pub fn acceptance_probability(
    current: f64,
    proposed: f64,
    temperature: f64,
    min_temperature: f64,
    exponent_cap: f64,
) -> f64 {
    let exponent = (current - proposed) / temperature.max(min_temperature);
    if exponent > exponent_cap {
        f64::INFINITY
    } else {
        exponent.exp()
    }
}
