//! # corrsom - Correlation Learning with Self-Organizing Maps
//!
//! corrsom simulates unsupervised correlation learning between several
//! Self-Organizing Maps (SOMs). Each map receives its own sensory input
//! stream and, on top of the usual topological learning, learns
//! cross-modal links toward the lattice of a partner map.
//!
//! ## Overview
//!
//! Every training step, for each map:
//!
//! 1. the sensory BMU is found and a Gaussian activation (As) is spread
//!    around it;
//! 2. the partner's fresh As is propagated through its links to find the
//!    cross-modal BMU, around which Ax is spread;
//! 3. the joint activation `At = (1 - gamma) As + gamma Ax` drives a
//!    modulated delta rule on the sensory weights;
//! 4. links are updated with a Hebbian or covariance rule on both maps'
//!    At, then min-max normalized.
//!
//! ## Architecture
//!
//! - [`som`] - lattice, BMU search, activations and learning rules
//! - [`schedule`] - epoch-indexed learning coefficients
//! - [`data`] - artificial and recorded input datasets
//! - [`storage`] - binary persistence of run results
//! - [`config`] - run configuration
//!
//! ## Example
//!
//! ```rust,ignore
//! use corrsom::{Config, InputDataset, Network, RunRecord, Schedule, Trainer};
//! use rand::SeedableRng;
//!
//! let config = Config::default();
//! let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(42);
//!
//! let mut network = Network::from_config(&config.network, &mut rng)?;
//! let datasets = corrsom::data_for(&config, &mut rng)?;
//!
//! let mut trainer = Trainer::new(Schedule::from_config(&config.schedule)?);
//! trainer.train(&mut network, &datasets)?;
//!
//! let (schedule, metrics) = trainer.into_parts();
//! RunRecord::new(config, schedule, metrics, network, datasets).save("run.clnr")?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod data;
pub mod error;
pub mod schedule;
pub mod som;
pub mod storage;

// Re-export commonly used types
pub use config::{Config, DataConfig, MapConfig, NetworkConfig, ScheduleConfig};
pub use data::{ArtificialPattern, DataSource, InputDataset};
pub use error::{CorrsomError, Result};
pub use schedule::{Coefficients, CrossModalRule, Params, Schedule, UpdateMode};
pub use som::{Coord, LatticeShape, Network, Neuron, Som, Trainer, TrainingMetrics};
pub use storage::{RunFormat, RunRecord};

use rand::Rng;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Builds one input dataset per configured map, in map order.
pub fn data_for<R: Rng>(config: &Config, rng: &mut R) -> Result<Vec<InputDataset>> {
    let maps = &config.network.maps;
    match config.data.source {
        DataSource::Artificial => maps
            .iter()
            .map(|m| {
                InputDataset::artificial(
                    m.id,
                    config.data.pattern,
                    m.input_dim,
                    config.data.samples,
                    config.data.noise,
                    rng,
                )
            })
            .collect(),
        DataSource::Sensor => {
            if config.data.sensor_files.len() != maps.len() {
                return Err(CorrsomError::Config(format!(
                    "sensor data needs one file per map: {} maps, {} files",
                    maps.len(),
                    config.data.sensor_files.len()
                )));
            }
            maps.iter()
                .zip(&config.data.sensor_files)
                .map(|(m, path)| InputDataset::from_file(path, m.input_dim))
                .collect()
        }
    }
}
