//! Distance functions shared by BMU search and neighborhood shaping.

use super::neuron::Coord;

/// Euclidean distance between two equal-length vectors.
#[inline]
pub fn distance(u: &[f64], v: &[f64]) -> f64 {
    distance_squared(u, v).sqrt()
}

/// Squared Euclidean distance (avoids the sqrt).
#[inline]
pub fn distance_squared(u: &[f64], v: &[f64]) -> f64 {
    debug_assert_eq!(u.len(), v.len(), "Vector dimensions must match");

    u.iter()
        .zip(v.iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum()
}

/// Squared 2-D Euclidean distance between two lattice coordinates.
#[inline]
pub fn lattice_distance_squared(a: Coord, b: Coord) -> f64 {
    let dr = a.row as f64 - b.row as f64;
    let dc = a.col as f64 - b.col as f64;
    dr * dr + dc * dc
}

/// Gaussian neighborhood `exp(-d^2 / (2 sigma^2))` for a squared distance.
#[inline]
pub fn gaussian(distance_sq: f64, sigma: f64) -> f64 {
    (-distance_sq / (2.0 * sigma * sigma)).exp()
}
