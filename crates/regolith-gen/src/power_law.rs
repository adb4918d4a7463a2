//! Size-frequency sampling shared by craters and rocks.
//!
//! Both crater radii and rock diameters follow truncated power laws: small
//! objects vastly outnumber large ones, with the skew controlled by a
//! negative exponent.

use rand::Rng;

use crate::seed::{det_exp, det_pow};

/// Safety cap on Poisson draws so a misconfigured density cannot spin.
const POISSON_CAP: u32 = 4096;

/// Draw a value from a truncated power law over `[min, max]` via inverse-CDF.
///
/// `exponent` is the distribution exponent (negative for the usual
/// small-objects-dominate shape). `u = 0` maps to `min`, `u = 1` to `max`.
pub fn sample_power_law(rng: &mut impl Rng, min: f64, max: f64, exponent: f64) -> f64 {
    let u: f64 = rng.random();
    let min_e = det_pow(min, exponent);
    let max_e = det_pow(max, exponent);
    det_pow(min_e + u * (max_e - min_e), 1.0 / exponent)
}

/// Draw a Poisson-distributed count with the given expected value.
///
/// Knuth's product method: multiply uniform draws until the running product
/// drops below `exp(-expected)`.
pub fn poisson_count(rng: &mut impl Rng, expected: f64) -> u32 {
    if expected <= 0.0 {
        return 0;
    }
    let limit = det_exp(-expected);
    let mut count = 0u32;
    let mut product = 1.0f64;
    loop {
        product *= rng.random::<f64>();
        if product <= limit || count >= POISSON_CAP {
            break;
        }
        count += 1;
    }
    count
}
