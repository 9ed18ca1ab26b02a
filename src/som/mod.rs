//! Cross-coupled Self-Organizing Maps.
//!
//! - **Lattice**: neurons with sensory weights and cross-modal links (neuron.rs, map.rs)
//! - **Coupling**: cross-modal BMU search and link learning (coupling.rs)
//! - **Training**: the paired training step and epoch driver (training.rs)

mod map;
mod neuron;
pub mod coupling;
pub mod metric;
pub mod training;

pub use map::Som;
pub use neuron::{Activation, Coord, LatticeShape, LinkMatrix, Neuron};
pub use training::{Network, Pairing, StepReport, Trainer, TrainingMetrics};
