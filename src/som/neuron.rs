//! Neuron representation for the cross-coupled maps.

use super::metric;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

/// A position on a map lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coord {
    /// Row on the lattice.
    pub row: usize,
    /// Column on the lattice.
    pub col: usize,
}

impl Coord {
    /// Creates a coordinate.
    #[inline]
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Row and column counts of a lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatticeShape {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
}

impl LatticeShape {
    /// Creates a shape.
    #[inline]
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Number of lattice sites.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// True when the lattice has no sites.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if `coord` lies on the lattice.
    #[inline]
    pub fn contains(&self, coord: Coord) -> bool {
        coord.row < self.rows && coord.col < self.cols
    }

    /// Row-major index of `coord`.
    #[inline]
    pub fn index(&self, coord: Coord) -> usize {
        coord.row * self.cols + coord.col
    }

    /// Coordinate of a row-major index.
    #[inline]
    pub fn coord(&self, index: usize) -> Coord {
        Coord::new(index / self.cols, index % self.cols)
    }
}

impl std::fmt::Display for LatticeShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Cross-modal link weights of one neuron toward every site of the partner lattice.
///
/// Stored row-major in one contiguous buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkMatrix {
    shape: LatticeShape,
    values: Vec<f64>,
}

impl LinkMatrix {
    /// Creates a zero matrix.
    pub fn zeros(shape: LatticeShape) -> Self {
        Self {
            shape,
            values: vec![0.0; shape.len()],
        }
    }

    /// Creates a matrix with entries drawn uniformly from `[0, 1]`.
    pub fn random<R: Rng>(shape: LatticeShape, rng: &mut R) -> Self {
        let unit = Uniform::new_inclusive(0.0, 1.0);
        Self {
            shape,
            values: (0..shape.len()).map(|_| unit.sample(rng)).collect(),
        }
    }

    /// Shape of the partner lattice.
    #[inline]
    pub fn shape(&self) -> LatticeShape {
        self.shape
    }

    /// Link weight toward partner site `coord`.
    #[inline]
    pub fn get(&self, coord: Coord) -> f64 {
        debug_assert!(self.shape.contains(coord), "link coordinate outside partner lattice");
        self.values[self.shape.index(coord)]
    }

    /// Sets the link weight toward partner site `coord`.
    #[inline]
    pub fn set(&mut self, coord: Coord, value: f64) {
        debug_assert!(self.shape.contains(coord), "link coordinate outside partner lattice");
        let idx = self.shape.index(coord);
        self.values[idx] = value;
    }

    /// All link weights, row-major.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// All link weights, row-major, mutable.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }
}

/// Activation triple recomputed on every training step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Activation {
    /// Activity elicited by the sensory afferents (As).
    pub sensory: f64,
    /// Activity elicited through the cross-modal links (Ax).
    pub cross: f64,
    /// Joint activity (At).
    pub joint: f64,
}

/// A neuron of a map lattice.
///
/// Each neuron has a fixed lattice position, a sensory weight vector
/// matching the map's input, and a link matrix shaped like the partner
/// map's lattice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neuron {
    /// Row position on the lattice.
    pub row: usize,
    /// Column position on the lattice.
    pub col: usize,
    /// Sensory projection weights (W).
    pub weights: Vec<f64>,
    /// Cross-modal link weights (H).
    pub links: LinkMatrix,
    /// Activations of the latest step.
    pub activation: Activation,
}

impl Neuron {
    /// Creates a neuron with sensory weights drawn from `weight_dist` and
    /// links drawn uniformly from `[0, 1]`.
    pub fn new_random<R: Rng>(
        row: usize,
        col: usize,
        input_dim: usize,
        weight_dist: &Uniform<f64>,
        link_shape: LatticeShape,
        rng: &mut R,
    ) -> Self {
        let weights: Vec<f64> = (0..input_dim).map(|_| weight_dist.sample(rng)).collect();
        let links = LinkMatrix::random(link_shape, rng);

        Self {
            row,
            col,
            weights,
            links,
            activation: Activation::default(),
        }
    }

    /// Creates a neuron with zero weights and links.
    pub fn new_zeros(row: usize, col: usize, input_dim: usize, link_shape: LatticeShape) -> Self {
        Self::new_with_weights(row, col, vec![0.0; input_dim], link_shape)
    }

    /// Creates a neuron with the given sensory weights and zero links.
    pub fn new_with_weights(
        row: usize,
        col: usize,
        weights: Vec<f64>,
        link_shape: LatticeShape,
    ) -> Self {
        Self {
            row,
            col,
            weights,
            links: LinkMatrix::zeros(link_shape),
            activation: Activation::default(),
        }
    }

    /// Lattice position.
    #[inline]
    pub fn position(&self) -> Coord {
        Coord::new(self.row, self.col)
    }

    /// Euclidean distance between the sensory weights and an input vector.
    #[inline]
    pub fn distance(&self, input: &[f64]) -> f64 {
        metric::distance(&self.weights, input)
    }

    /// Squared Euclidean distance to an input vector.
    #[inline]
    pub fn distance_squared(&self, input: &[f64]) -> f64 {
        metric::distance_squared(&self.weights, input)
    }

    /// Gaussian neighborhood value of this neuron around `center`.
    #[inline]
    pub fn neighborhood(&self, center: Coord, sigma: f64) -> f64 {
        metric::gaussian(
            metric::lattice_distance_squared(self.position(), center),
            sigma,
        )
    }

    /// Modulated delta rule on the sensory weights.
    ///
    /// `W += alpha * At * (x - W) - xi * (As - At) * (x - W)`
    pub fn update_weights(&mut self, input: &[f64], alpha: f64, xi: f64) {
        let Activation { sensory, joint, .. } = self.activation;
        let gain = alpha * joint - xi * (sensory - joint);

        for (w, x) in self.weights.iter_mut().zip(input.iter()) {
            *w += gain * (x - *w);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_neuron_creation() {
        let neuron = Neuron::new_zeros(5, 10, 3, LatticeShape::new(4, 6));
        assert_eq!(neuron.position(), Coord::new(5, 10));
        assert_eq!(neuron.weights.len(), 3);
        assert_eq!(neuron.links.shape(), LatticeShape::new(4, 6));
        assert_eq!(neuron.links.as_slice().len(), 24);
    }

    #[test]
    fn test_random_initialization_ranges() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let dist = Uniform::new_inclusive(2.0, 12.0);
        let neuron = Neuron::new_random(0, 0, 50, &dist, LatticeShape::new(3, 3), &mut rng);

        assert!(neuron.weights.iter().all(|&w| (2.0..=12.0).contains(&w)));
        assert!(neuron.links.as_slice().iter().all(|&h| (0.0..=1.0).contains(&h)));
        assert!(neuron.weights.iter().any(|&w| w != neuron.weights[0]));
    }

    #[test]
    fn test_shape_indexing() {
        let shape = LatticeShape::new(3, 5);
        assert_eq!(shape.index(Coord::new(1, 2)), 7);
        assert_eq!(shape.coord(7), Coord::new(1, 2));
        assert!(shape.contains(Coord::new(2, 4)));
        assert!(!shape.contains(Coord::new(3, 0)));
    }

    #[test]
    fn test_link_get_set() {
        let mut links = LinkMatrix::zeros(LatticeShape::new(2, 3));
        links.set(Coord::new(1, 2), 0.75);
        assert_eq!(links.get(Coord::new(1, 2)), 0.75);
        assert_eq!(links.as_slice()[5], 0.75);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outside partner lattice")]
    fn test_link_get_out_of_range_column() {
        let links = LinkMatrix::zeros(LatticeShape::new(2, 3));
        links.get(Coord::new(0, 5));
    }

    #[test]
    fn test_plain_delta_rule_without_cross_modal_input() {
        // with As == At the inhibitory term vanishes
        let mut neuron = Neuron::new_with_weights(0, 0, vec![0.0, 0.0], LatticeShape::new(1, 1));
        neuron.activation = Activation {
            sensory: 1.0,
            cross: 1.0,
            joint: 1.0,
        };
        neuron.update_weights(&[1.0, 2.0], 0.5, 0.3);
        assert!((neuron.weights[0] - 0.5).abs() < 1e-12);
        assert!((neuron.weights[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_inhibitory_term_damps_update() {
        let mut plain = Neuron::new_with_weights(0, 0, vec![0.0], LatticeShape::new(1, 1));
        plain.activation = Activation {
            sensory: 0.5,
            cross: 0.5,
            joint: 0.5,
        };
        let mut damped = plain.clone();
        damped.activation = Activation {
            sensory: 0.9,
            cross: 0.1,
            joint: 0.5,
        };

        plain.update_weights(&[1.0], 0.2, 0.1);
        damped.update_weights(&[1.0], 0.2, 0.1);

        // 0.2 * 0.5 = 0.1 vs 0.1 - 0.1 * 0.4 = 0.06
        assert!((plain.weights[0] - 0.1).abs() < 1e-12);
        assert!((damped.weights[0] - 0.06).abs() < 1e-12);
    }
}
