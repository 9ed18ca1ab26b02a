//! Configuration for a correlation learning run.

use crate::data::{ArtificialPattern, DataSource};
use crate::error::{CorrsomError, Result};
use crate::schedule::{Coefficients, CrossModalRule, UpdateMode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration for a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Maps and their cross-modal pairings.
    pub network: NetworkConfig,

    /// Learning parameter schedule.
    pub schedule: ScheduleConfig,

    /// Input data generation or loading.
    pub data: DataConfig,

    /// Random seed for reproducibility.
    /// Default: None (random).
    pub seed: Option<u64>,

    /// Number of worker threads for per-neuron updates.
    /// Default: 0 (use all available cores).
    pub num_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        let network = NetworkConfig::default();
        let sigma = network
            .maps
            .first()
            .map(|m| (m.rows / 2 + 1) as f64)
            .unwrap_or(1.5);

        Self {
            network,
            schedule: ScheduleConfig {
                sigma,
                ..Default::default()
            },
            data: DataConfig::default(),
            seed: None,
            num_threads: 0,
        }
    }
}

impl Config {
    /// Loads a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CorrsomError::FileNotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Checks the whole configuration for consistency.
    pub fn validate(&self) -> Result<()> {
        self.network.validate()?;
        self.schedule.validate()?;
        self.data.validate(self.network.maps.len())?;
        Ok(())
    }
}

/// Lattice and input layout of a single map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    /// Map identifier, unique within a network.
    pub id: u16,

    /// Number of lattice rows.
    pub rows: usize,

    /// Number of lattice columns.
    pub cols: usize,

    /// Length of the sensory input vectors.
    pub input_dim: usize,

    /// Lower bound of the uniform sensory weight initialization.
    pub init_min: f64,

    /// Upper bound of the uniform sensory weight initialization.
    pub init_max: f64,
}

impl MapConfig {
    /// Returns the total number of neurons in the map.
    #[inline]
    pub fn total_neurons(&self) -> usize {
        self.rows * self.cols
    }

    fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(CorrsomError::Config(format!(
                "map {} has an empty lattice ({}x{})",
                self.id, self.rows, self.cols
            )));
        }
        if self.input_dim == 0 {
            return Err(CorrsomError::Config(format!(
                "map {} has zero input dimension",
                self.id
            )));
        }
        if !self.init_min.is_finite() || !self.init_max.is_finite() || self.init_min > self.init_max
        {
            return Err(CorrsomError::Config(format!(
                "map {} has an invalid weight range [{}, {}]",
                self.id, self.init_min, self.init_max
            )));
        }
        Ok(())
    }
}

/// Maps of the network and the pairings that cross-link them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// The maps, one per sensory variable.
    /// Default: two 10x10 maps with 2-dimensional input.
    pub maps: Vec<MapConfig>,

    /// Pairs of map ids that learn cross-modal links.
    /// Every map must appear in exactly one pairing.
    /// Default: [(1, 2)].
    pub pairings: Vec<(u16, u16)>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            maps: vec![
                MapConfig {
                    id: 1,
                    rows: 10,
                    cols: 10,
                    input_dim: 2,
                    init_min: 2.0,
                    init_max: 12.0,
                },
                MapConfig {
                    id: 2,
                    rows: 10,
                    cols: 10,
                    input_dim: 2,
                    init_min: 8.0,
                    init_max: 48.0,
                },
            ],
            pairings: vec![(1, 2)],
        }
    }
}

impl NetworkConfig {
    /// Looks up a map by id.
    pub fn map(&self, id: u16) -> Option<&MapConfig> {
        self.maps.iter().find(|m| m.id == id)
    }

    /// Returns the id of the map paired with `id`.
    pub fn partner_of(&self, id: u16) -> Option<u16> {
        self.pairings.iter().find_map(|&(a, b)| {
            if a == id {
                Some(b)
            } else if b == id {
                Some(a)
            } else {
                None
            }
        })
    }

    fn validate(&self) -> Result<()> {
        if self.maps.len() < 2 {
            return Err(CorrsomError::Config(
                "a network needs at least two maps".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        for map in &self.maps {
            map.validate()?;
            if !ids.insert(map.id) {
                return Err(CorrsomError::Config(format!("duplicate map id {}", map.id)));
            }
        }

        let mut paired = HashSet::new();
        for &(a, b) in &self.pairings {
            if a == b {
                return Err(CorrsomError::Config(format!(
                    "map {} cannot be paired with itself",
                    a
                )));
            }
            for id in [a, b] {
                if !ids.contains(&id) {
                    return Err(CorrsomError::Config(format!(
                        "pairing ({}, {}) references unknown map {}",
                        a, b, id
                    )));
                }
                if !paired.insert(id) {
                    return Err(CorrsomError::Config(format!(
                        "map {} appears in more than one pairing",
                        id
                    )));
                }
            }
        }

        if let Some(unpaired) = self.maps.iter().find(|m| !paired.contains(&m.id)) {
            return Err(CorrsomError::Config(format!(
                "map {} is not part of any pairing",
                unpaired.id
            )));
        }
        Ok(())
    }
}

/// Learning parameter schedule configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// How coefficients evolve over epochs.
    /// Default: Fixed.
    pub mode: UpdateMode,

    /// Cross-modal learning rule.
    /// Default: Hebbian.
    pub rule: CrossModalRule,

    /// Number of training epochs.
    /// Default: 100.
    pub epochs: usize,

    /// Initial sensory learning rate.
    /// Default: 0.1.
    pub alpha: f64,

    /// Initial neighborhood radius.
    /// Default: 6.0 (half the default lattice plus one).
    pub sigma: f64,

    /// Initial cross-modal impact factor.
    /// Default: 0.1.
    pub gamma: f64,

    /// Initial inhibitory factor.
    /// Default: 0.01.
    pub xi: f64,

    /// Initial cross-modal Hebbian learning rate.
    /// Default: 0.35.
    pub kappa: f64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            mode: UpdateMode::Fixed,
            rule: CrossModalRule::Hebbian,
            epochs: 100,
            alpha: 0.1,
            sigma: 6.0,
            gamma: 0.1,
            xi: 0.01,
            kappa: 0.35,
        }
    }
}

impl ScheduleConfig {
    /// Returns the epoch-zero coefficients.
    pub fn initial(&self) -> Coefficients {
        Coefficients {
            alpha: self.alpha,
            sigma: self.sigma,
            gamma: self.gamma,
            xi: self.xi,
            kappa: self.kappa,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(CorrsomError::Config("epochs must be positive".to_string()));
        }
        self.initial().validate()?;
        if self.mode == UpdateMode::Adaptive && self.sigma <= 1.0 {
            return Err(CorrsomError::Config(format!(
                "adaptive schedules need sigma > 1 (got {})",
                self.sigma
            )));
        }
        Ok(())
    }
}

/// Input data configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Where input vectors come from.
    /// Default: Artificial.
    pub source: DataSource,

    /// Pattern used for artificial data.
    /// Default: Algebraic.
    pub pattern: ArtificialPattern,

    /// Number of input vectors per map for artificial data.
    /// Default: 100.
    pub samples: usize,

    /// Standard deviation of Gaussian noise added to artificial data.
    /// Default: 0.0.
    pub noise: f64,

    /// One sensor file per map, in map order, for sensor data.
    /// Default: empty.
    pub sensor_files: Vec<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            source: DataSource::Artificial,
            pattern: ArtificialPattern::Algebraic,
            samples: 100,
            noise: 0.0,
            sensor_files: Vec::new(),
        }
    }
}

impl DataConfig {
    fn validate(&self, num_maps: usize) -> Result<()> {
        match self.source {
            DataSource::Artificial => {
                if self.samples == 0 {
                    return Err(CorrsomError::Config(
                        "artificial data needs at least one sample".to_string(),
                    ));
                }
                if !self.noise.is_finite() || self.noise < 0.0 {
                    return Err(CorrsomError::Config(format!(
                        "noise must be a non-negative number (got {})",
                        self.noise
                    )));
                }
            }
            DataSource::Sensor => {
                if self.sensor_files.len() != num_maps {
                    return Err(CorrsomError::Config(format!(
                        "sensor data needs one file per map: {} maps, {} files",
                        num_maps,
                        self.sensor_files.len()
                    )));
                }
            }
        }
        Ok(())
    }
}
