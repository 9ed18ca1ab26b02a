//! Self-Organizing Map with a cross-modal link layer.

use crate::config::MapConfig;
use crate::error::{CorrsomError, Result};
use crate::som::{Coord, LatticeShape, Neuron};
use rand::Rng;
use rand_distr::Uniform;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A Self-Organizing Map receiving one sensory stream.
///
/// Neurons are stored row-major in one vector sized at construction. Each
/// neuron additionally carries link weights toward every site of the
/// partner map's lattice (`partner_shape`), so the pairing itself lives
/// outside the map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Som {
    /// Map identifier.
    pub id: u16,
    /// Lattice dimensions.
    pub shape: LatticeShape,
    /// Input vector dimensionality.
    pub input_dim: usize,
    /// Lattice dimensions of the partner map.
    pub partner_shape: LatticeShape,
    /// The neurons of the lattice (row-major order).
    pub neurons: Vec<Neuron>,
}

impl Som {
    /// Creates a map with sensory weights drawn uniformly from
    /// `[init_min, init_max]` and links drawn uniformly from `[0, 1]`.
    pub fn new<R: Rng>(config: &MapConfig, partner_shape: LatticeShape, rng: &mut R) -> Result<Self> {
        let shape = LatticeShape::new(config.rows, config.cols);
        if shape.is_empty() || partner_shape.is_empty() {
            return Err(CorrsomError::Som(format!(
                "SOM{} needs non-empty lattices (own {}, partner {})",
                config.id, shape, partner_shape
            )));
        }
        if config.input_dim == 0 {
            return Err(CorrsomError::Som(format!(
                "SOM{} needs a positive input dimension",
                config.id
            )));
        }
        if !(config.init_min.is_finite() && config.init_max.is_finite())
            || config.init_min > config.init_max
        {
            return Err(CorrsomError::Som(format!(
                "SOM{} has an invalid weight range [{}, {}]",
                config.id, config.init_min, config.init_max
            )));
        }

        log::info!(
            "Creating SOM{} with {} neurons, input dim {}",
            config.id,
            shape,
            config.input_dim
        );

        let weight_dist = Uniform::new_inclusive(config.init_min, config.init_max);
        let neurons: Vec<Neuron> = (0..shape.len())
            .map(|i| {
                let pos = shape.coord(i);
                Neuron::new_random(
                    pos.row,
                    pos.col,
                    config.input_dim,
                    &weight_dist,
                    partner_shape,
                    rng,
                )
            })
            .collect();

        Ok(Self {
            id: config.id,
            shape,
            input_dim: config.input_dim,
            partner_shape,
            neurons,
        })
    }

    /// Creates a map with zero weights and links.
    pub fn new_zeros(
        id: u16,
        shape: LatticeShape,
        input_dim: usize,
        partner_shape: LatticeShape,
    ) -> Self {
        let neurons: Vec<Neuron> = (0..shape.len())
            .map(|i| {
                let pos = shape.coord(i);
                Neuron::new_zeros(pos.row, pos.col, input_dim, partner_shape)
            })
            .collect();

        Self {
            id,
            shape,
            input_dim,
            partner_shape,
            neurons,
        }
    }

    /// Returns the total number of neurons.
    #[inline]
    pub fn total_neurons(&self) -> usize {
        self.neurons.len()
    }

    /// Gets a neuron by its 1D index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Neuron> {
        self.neurons.get(index)
    }

    /// Gets a neuron by its lattice position.
    #[inline]
    pub fn get_at(&self, row: usize, col: usize) -> Option<&Neuron> {
        let coord = Coord::new(row, col);
        if self.shape.contains(coord) {
            Some(&self.neurons[self.shape.index(coord)])
        } else {
            None
        }
    }

    /// Gets a mutable reference to a neuron by its lattice position.
    #[inline]
    pub fn get_at_mut(&mut self, row: usize, col: usize) -> Option<&mut Neuron> {
        let coord = Coord::new(row, col);
        if self.shape.contains(coord) {
            let idx = self.shape.index(coord);
            Some(&mut self.neurons[idx])
        } else {
            None
        }
    }

    /// Converts a 1D index to lattice coordinates.
    #[inline]
    pub fn index_to_coords(&self, index: usize) -> Coord {
        self.shape.coord(index)
    }

    /// Converts lattice coordinates to a 1D index.
    #[inline]
    pub fn coords_to_index(&self, coord: Coord) -> usize {
        self.shape.index(coord)
    }

    fn check_input(&self, input: &[f64]) -> Result<()> {
        if input.len() != self.input_dim {
            return Err(CorrsomError::mismatch(
                format!("SOM{} input vector", self.id),
                self.input_dim,
                input.len(),
            ));
        }
        Ok(())
    }

    fn check_coord(&self, coord: Coord) -> Result<()> {
        if !self.shape.contains(coord) {
            return Err(CorrsomError::Som(format!(
                "({}, {}) is outside the {} lattice of SOM{}",
                coord.row, coord.col, self.shape, self.id
            )));
        }
        Ok(())
    }

    /// Checks that the neurons fill the lattice in row-major order, that
    /// every weight vector has `input_dim` components and that every link
    /// matrix spans the partner lattice.
    pub fn validate(&self) -> Result<()> {
        if self.neurons.len() != self.shape.len() {
            return Err(CorrsomError::mismatch(
                format!("neuron count of SOM{}", self.id),
                self.shape.len(),
                self.neurons.len(),
            ));
        }
        for (i, neuron) in self.neurons.iter().enumerate() {
            let expected = self.shape.coord(i);
            if neuron.position() != expected {
                return Err(CorrsomError::Som(format!(
                    "SOM{}: neuron {} sits at ({}, {}), expected ({}, {})",
                    self.id, i, neuron.row, neuron.col, expected.row, expected.col
                )));
            }
            if neuron.weights.len() != self.input_dim {
                return Err(CorrsomError::mismatch(
                    format!("weights of SOM{} neuron ({}, {})", self.id, neuron.row, neuron.col),
                    self.input_dim,
                    neuron.weights.len(),
                ));
            }
            if neuron.links.shape() != self.partner_shape
                || neuron.links.as_slice().len() != self.partner_shape.len()
            {
                return Err(CorrsomError::mismatch(
                    format!("links of SOM{} neuron ({}, {})", self.id, neuron.row, neuron.col),
                    self.partner_shape,
                    format!("{} ({} values)", neuron.links.shape(), neuron.links.as_slice().len()),
                ));
            }
        }
        Ok(())
    }

    /// Finds the sensory Best Matching Unit for an input vector.
    ///
    /// Scans row-major with a strict `<`, so the first minimum wins ties.
    pub fn find_bmu(&self, input: &[f64]) -> Result<Coord> {
        self.check_input(input)?;

        let mut best_idx = 0;
        let mut best_dist = f64::INFINITY;
        for (i, neuron) in self.neurons.iter().enumerate() {
            if neuron.weights.len() != self.input_dim {
                return Err(CorrsomError::mismatch(
                    format!("weights of SOM{} neuron ({}, {})", self.id, neuron.row, neuron.col),
                    self.input_dim,
                    neuron.weights.len(),
                ));
            }
            let dist = neuron.distance_squared(input);
            if dist < best_dist {
                best_dist = dist;
                best_idx = i;
            }
        }

        Ok(self.shape.coord(best_idx))
    }

    /// Distance between an input and the weights of the neuron at `bmu`.
    pub fn quantization_error(&self, input: &[f64], bmu: Coord) -> Result<f64> {
        self.check_input(input)?;
        self.check_coord(bmu)?;
        Ok(self.neurons[self.shape.index(bmu)].distance(input))
    }

    /// Sets As of every neuron to the Gaussian neighborhood around `bmu`.
    pub fn compute_sensory_activation(&mut self, bmu: Coord, sigma: f64) -> Result<()> {
        self.check_coord(bmu)?;
        self.neurons
            .par_iter_mut()
            .for_each(|n| n.activation.sensory = n.neighborhood(bmu, sigma));
        Ok(())
    }

    /// Sets Ax of every neuron to the Gaussian neighborhood around the
    /// cross-modal `bmu`.
    pub fn compute_cross_activation(&mut self, bmu: Coord, sigma: f64) -> Result<()> {
        self.check_coord(bmu)?;
        self.neurons
            .par_iter_mut()
            .for_each(|n| n.activation.cross = n.neighborhood(bmu, sigma));
        Ok(())
    }

    /// Sets At = (1 - gamma) As + gamma Ax for every neuron.
    pub fn compute_joint_activation(&mut self, gamma: f64) {
        self.neurons.par_iter_mut().for_each(|n| {
            n.activation.joint = (1.0 - gamma) * n.activation.sensory + gamma * n.activation.cross;
        });
    }

    /// Applies the modulated delta rule to every neuron's sensory weights.
    ///
    /// Activations must already be final for the current step.
    pub fn adapt_sensory_weights(&mut self, input: &[f64], alpha: f64, xi: f64) -> Result<()> {
        self.check_input(input)?;
        self.validate()?;
        self.neurons
            .par_iter_mut()
            .for_each(|n| n.update_weights(input, alpha, xi));
        Ok(())
    }

    /// Sensory activations, row-major.
    pub fn sensory_activations(&self) -> Vec<f64> {
        self.neurons.iter().map(|n| n.activation.sensory).collect()
    }

    /// Joint activations, row-major.
    pub fn joint_activations(&self) -> Vec<f64> {
        self.neurons.iter().map(|n| n.activation.joint).collect()
    }

    /// Mean joint activation over the whole lattice.
    pub fn mean_joint_activation(&self) -> f64 {
        let sum: f64 = self.neurons.iter().map(|n| n.activation.joint).sum();
        sum / self.neurons.len() as f64
    }

    /// Smallest and largest link weight over the whole link tensor.
    pub fn link_bounds(&self) -> (f64, f64) {
        self.neurons
            .iter()
            .flat_map(|n| n.links.as_slice().iter().copied())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            })
    }
}

impl fmt::Display for Som {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SOM{} structure", self.id)?;
        writeln!(
            f,
            "SIZE: {}  INSIZE: {}  PARTNER: {}",
            self.shape, self.input_dim, self.partner_shape
        )?;

        writeln!(f, "\nSYNAPTIC WEIGHTS - SENSORY AFFERENTS")?;
        for row in self.neurons.chunks(self.shape.cols) {
            let cells: Vec<String> = row
                .iter()
                .map(|n| {
                    n.weights
                        .iter()
                        .map(|w| format!("{:.6}", w))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect();
            writeln!(f, "{}", cells.join("\t"))?;
        }

        writeln!(f, "\nSYNAPTIC WEIGHTS - CROSS MODAL LINKS")?;
        for neuron in &self.neurons {
            writeln!(f, "({}, {}):", neuron.row, neuron.col)?;
            for row in neuron.links.as_slice().chunks(self.partner_shape.cols) {
                let cells: Vec<String> = row.iter().map(|h| format!("{:.6}", h)).collect();
                writeln!(f, "  {}", cells.join(" "))?;
            }
        }

        let grids: [(&str, fn(&Neuron) -> f64); 3] = [
            ("SENSORY EVOKED NEURAL ACTIVATION", |n| n.activation.sensory),
            ("CROSS SENSORY EVOKED NEURAL ACTIVATION", |n| n.activation.cross),
            ("TOTAL NEURAL ACTIVATION", |n| n.activation.joint),
        ];
        for (title, value) in grids {
            writeln!(f, "\n{}", title)?;
            for row in self.neurons.chunks(self.shape.cols) {
                let cells: Vec<String> = row.iter().map(|n| format!("{:.6}", value(n))).collect();
                writeln!(f, "{}", cells.join(" "))?;
            }
        }
        Ok(())
    }
}
