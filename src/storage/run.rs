//! Snapshot of a finished run.

use crate::config::Config;
use crate::data::InputDataset;
use crate::error::Result;
use crate::schedule::{Schedule, UpdateMode};
use crate::som::{Network, Pairing, Som, TrainingMetrics};
use crate::storage::format::RunFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Everything a run produced: configuration, the schedule as it was
/// written, per-epoch metrics, the input data and the final maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Configuration the run was started with.
    pub config: Config,
    /// Schedule with every epoch's coefficients.
    pub schedule: Schedule,
    /// Per-epoch metrics.
    pub metrics: TrainingMetrics,
    /// Map pairings, by index into `maps`.
    pub pairings: Vec<Pairing>,
    /// Final state of every map.
    pub maps: Vec<Som>,
    /// Input data of every map.
    pub datasets: Vec<InputDataset>,
}

impl RunRecord {
    /// Captures the state of a finished run.
    pub fn new(
        config: Config,
        schedule: Schedule,
        metrics: TrainingMetrics,
        network: Network,
        datasets: Vec<InputDataset>,
    ) -> Self {
        let pairings = network.pairings().to_vec();
        Self {
            config,
            schedule,
            metrics,
            pairings,
            maps: network.into_maps(),
            datasets,
        }
    }

    /// Rebuilds the network, checking the pairings again.
    pub fn network(&self) -> Result<Network> {
        Network::new(self.maps.clone(), self.pairings.clone())
    }

    /// Saves the record in the binary run format.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        RunFormat::write(path, self)
    }

    /// Loads a record saved with [`RunRecord::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        RunFormat::read(path)
    }

    /// File name describing the run, e.g.
    /// `1718000000_cln_runtime_data_som_1_2_100_epochs_artificial_srcdata_fixed_params_adaptation.clnr`.
    pub fn default_file_name(&self) -> String {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let ids: Vec<String> = self.maps.iter().map(|m| m.id.to_string()).collect();
        let mode = match self.schedule.mode() {
            UpdateMode::Fixed => "fixed",
            UpdateMode::Adaptive => "adaptive",
        };

        format!(
            "{}_cln_runtime_data_som_{}_{}_epochs_{}_srcdata_{}_params_adaptation.clnr",
            stamp,
            ids.join("_"),
            self.schedule.epochs(),
            self.config.data.source.name(),
            mode
        )
    }
}

impl fmt::Display for RunRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Run: {} maps, {} epochs, {} data, rule {}",
            self.maps.len(),
            self.schedule.epochs(),
            self.config.data.source.name(),
            self.schedule.rule()
        )?;
        for p in &self.pairings {
            writeln!(
                f,
                "  pairing: SOM{} <-> SOM{}",
                self.maps[p.first].id, self.maps[p.second].id
            )?;
        }
        for (som, data) in self.maps.iter().zip(&self.datasets) {
            writeln!(
                f,
                "  SOM{}: {} lattice, input dim {}, {} samples",
                som.id,
                som.shape,
                som.input_dim,
                data.len()
            )?;
        }
        if let Some(last) = self.metrics.quantization_errors.last() {
            writeln!(f, "  final quantization error: {:?}", last)?;
        }
        if let Some(last) = self.metrics.bmu_agreement.last() {
            writeln!(f, "  final sensory/cross-modal BMU agreement: {:?}", last)?;
        }
        Ok(())
    }
}
