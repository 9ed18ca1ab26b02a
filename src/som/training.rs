//! Paired-map training.
//!
//! A [`Network`] owns the maps and the pairing relation between them; maps
//! never reference each other. [`Network::step`] runs one learning step on
//! a read-only [`Params`] snapshot and [`Trainer`] drives the epochs,
//! writing the schedule before each one.

use crate::config::NetworkConfig;
use crate::data::InputDataset;
use crate::error::{CorrsomError, Result};
use crate::schedule::{CrossModalRule, Params, Schedule};
use crate::som::coupling::{accumulate_links, find_cross_modal_bmu, normalize_links};
use crate::som::{Coord, LatticeShape, Som};
use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Two maps, by index into [`Network::maps`], whose lattices are cross-linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    /// First map.
    pub first: usize,
    /// Second map.
    pub second: usize,
}

/// Winners and errors produced by one training step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Sensory BMU per map.
    pub sensory_bmus: Vec<Coord>,
    /// Cross-modal BMU per map.
    pub cross_bmus: Vec<Coord>,
    /// Distance between each map's input and its sensory BMU before the update.
    pub quantization_errors: Vec<f64>,
}

/// Maps plus the pairing relation that couples them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    maps: Vec<Som>,
    pairings: Vec<Pairing>,
    partners: Vec<usize>,
}

impl Network {
    /// Creates a network; every map must belong to exactly one pairing whose
    /// partner lattice matches the map's link matrices.
    pub fn new(maps: Vec<Som>, pairings: Vec<Pairing>) -> Result<Self> {
        if maps.is_empty() {
            return Err(CorrsomError::Config("a network needs at least one map".to_string()));
        }
        for som in &maps {
            som.validate()?;
        }

        let mut partners = vec![usize::MAX; maps.len()];

        for p in &pairings {
            if p.first == p.second || p.first >= maps.len() || p.second >= maps.len() {
                return Err(CorrsomError::Config(format!(
                    "invalid pairing ({}, {}) for {} maps",
                    p.first,
                    p.second,
                    maps.len()
                )));
            }
            for (a, b) in [(p.first, p.second), (p.second, p.first)] {
                if partners[a] != usize::MAX {
                    return Err(CorrsomError::Config(format!(
                        "SOM{} appears in more than one pairing",
                        maps[a].id
                    )));
                }
                if maps[a].partner_shape != maps[b].shape {
                    return Err(CorrsomError::mismatch(
                        format!("links of SOM{} toward SOM{}", maps[a].id, maps[b].id),
                        maps[b].shape,
                        maps[a].partner_shape,
                    ));
                }
                partners[a] = b;
            }
        }

        if let Some(idx) = partners.iter().position(|&p| p == usize::MAX) {
            return Err(CorrsomError::Config(format!(
                "SOM{} is not part of any pairing",
                maps[idx].id
            )));
        }

        Ok(Self {
            maps,
            pairings,
            partners,
        })
    }

    /// Builds and randomly initializes the maps described by `config`.
    pub fn from_config<R: Rng>(config: &NetworkConfig, rng: &mut R) -> Result<Self> {
        let index_of = |id: u16| {
            config
                .maps
                .iter()
                .position(|m| m.id == id)
                .ok_or_else(|| CorrsomError::Config(format!("unknown map id {}", id)))
        };

        let mut maps = Vec::with_capacity(config.maps.len());
        for map in &config.maps {
            let partner_id = config.partner_of(map.id).ok_or_else(|| {
                CorrsomError::Config(format!("map {} is not part of any pairing", map.id))
            })?;
            let partner = &config.maps[index_of(partner_id)?];
            maps.push(Som::new(
                map,
                LatticeShape::new(partner.rows, partner.cols),
                rng,
            )?);
        }

        let pairings = config
            .pairings
            .iter()
            .map(|&(a, b)| -> Result<Pairing> {
                Ok(Pairing {
                    first: index_of(a)?,
                    second: index_of(b)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(maps, pairings)
    }

    /// The maps, in configuration order.
    #[inline]
    pub fn maps(&self) -> &[Som] {
        &self.maps
    }

    /// The pairings.
    #[inline]
    pub fn pairings(&self) -> &[Pairing] {
        &self.pairings
    }

    /// Index of the map paired with map `index`.
    #[inline]
    pub fn partner(&self, index: usize) -> Option<usize> {
        self.partners.get(index).copied()
    }

    /// Consumes the network, returning its maps.
    pub fn into_maps(self) -> Vec<Som> {
        self.maps
    }

    fn pair_mut(&mut self, p: Pairing) -> (&mut Som, &mut Som) {
        if p.first < p.second {
            let (lo, hi) = self.maps.split_at_mut(p.second);
            (&mut lo[p.first], &mut hi[0])
        } else {
            let (lo, hi) = self.maps.split_at_mut(p.first);
            (&mut hi[0], &mut lo[p.second])
        }
    }

    /// Runs one learning step with one input vector per map.
    ///
    /// All activations of every map are finalized before any weight
    /// changes, and each cross-modal search reads the partner's sensory
    /// activation from this same step.
    pub fn step(&mut self, inputs: &[&[f64]], params: &Params) -> Result<StepReport> {
        if inputs.len() != self.maps.len() {
            return Err(CorrsomError::mismatch(
                "inputs per step",
                self.maps.len(),
                inputs.len(),
            ));
        }

        let mut sensory_bmus = Vec::with_capacity(self.maps.len());
        let mut quantization_errors = Vec::with_capacity(self.maps.len());
        for (som, input) in self.maps.iter_mut().zip(inputs) {
            let bmu = som.find_bmu(input)?;
            quantization_errors.push(som.quantization_error(input, bmu)?);
            som.compute_sensory_activation(bmu, params.sigma)?;
            sensory_bmus.push(bmu);
        }

        let cross_bmus = (0..self.maps.len())
            .map(|i| find_cross_modal_bmu(&self.maps[self.partners[i]], &self.maps[i]))
            .collect::<Result<Vec<_>>>()?;

        for (som, &bmu) in self.maps.iter_mut().zip(&cross_bmus) {
            som.compute_cross_activation(bmu, params.sigma)?;
            som.compute_joint_activation(params.gamma);
        }

        for (som, input) in self.maps.iter_mut().zip(inputs) {
            som.adapt_sensory_weights(input, params.alpha, params.xi)?;
        }

        // the mirrored update covers both directions of each pairing
        for i in 0..self.pairings.len() {
            let pairing = self.pairings[i];
            let (s, d) = self.pair_mut(pairing);
            accumulate_links(s, d, params.rule, params.kappa)?;
        }
        for som in &mut self.maps {
            if !normalize_links(som) && params.rule != CrossModalRule::None {
                warn!(
                    "SOM{}: degenerate link range at epoch {}, links cleared",
                    som.id, params.epoch
                );
            }
        }

        debug!(
            "epoch {}: sensory BMUs {:?}, cross-modal BMUs {:?}",
            params.epoch, sensory_bmus, cross_bmus
        );

        Ok(StepReport {
            sensory_bmus,
            cross_bmus,
            quantization_errors,
        })
    }
}

/// Per-epoch quality metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// Mean quantization error of each map, one row per epoch.
    pub quantization_errors: Vec<Vec<f64>>,
    /// Fraction of steps in which each map's sensory and cross-modal BMUs coincided.
    pub bmu_agreement: Vec<Vec<f64>>,
}

/// Drives a network through the epochs of a schedule.
pub struct Trainer {
    schedule: Schedule,
    metrics: TrainingMetrics,
}

impl Trainer {
    /// Creates a trainer that owns `schedule`.
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule,
            metrics: TrainingMetrics::default(),
        }
    }

    /// The schedule, with every epoch written so far.
    #[inline]
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Metrics collected so far.
    #[inline]
    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Returns the schedule and metrics.
    pub fn into_parts(self) -> (Schedule, TrainingMetrics) {
        (self.schedule, self.metrics)
    }

    fn check_datasets(network: &Network, datasets: &[InputDataset]) -> Result<usize> {
        if datasets.len() != network.maps().len() {
            return Err(CorrsomError::mismatch(
                "datasets per network",
                network.maps().len(),
                datasets.len(),
            ));
        }
        for (som, data) in network.maps().iter().zip(datasets) {
            if data.dim() != som.input_dim {
                return Err(CorrsomError::mismatch(
                    format!("dataset dimension for SOM{}", som.id),
                    som.input_dim,
                    data.dim(),
                ));
            }
        }

        let samples = datasets
            .first()
            .map(|d| d.len())
            .ok_or_else(|| CorrsomError::EmptyInput("no datasets".to_string()))?;
        if samples == 0 {
            return Err(CorrsomError::EmptyInput("dataset has no samples".to_string()));
        }
        if let Some(other) = datasets.iter().find(|d| d.len() != samples) {
            return Err(CorrsomError::mismatch(
                "samples per dataset",
                samples,
                other.len(),
            ));
        }
        Ok(samples)
    }

    /// Trains one epoch: every sample index is presented once, in order, to
    /// all maps at the same time.
    pub fn train_epoch(
        &mut self,
        network: &mut Network,
        datasets: &[InputDataset],
        epoch: usize,
    ) -> Result<Params> {
        let samples = Self::check_datasets(network, datasets)?;
        let params = self.schedule.prepare_epoch(epoch)?;
        let num_maps = network.maps().len();

        let mut error_sums = vec![0.0; num_maps];
        let mut agreements = vec![0usize; num_maps];
        for sample in 0..samples {
            let inputs: Vec<&[f64]> = datasets.iter().map(|d| d.get(sample)).collect();
            let report = network.step(&inputs, &params)?;

            for m in 0..num_maps {
                error_sums[m] += report.quantization_errors[m];
                if report.sensory_bmus[m] == report.cross_bmus[m] {
                    agreements[m] += 1;
                }
            }
        }

        let errors: Vec<f64> = error_sums.iter().map(|e| e / samples as f64).collect();
        let agreement: Vec<f64> = agreements
            .iter()
            .map(|&a| a as f64 / samples as f64)
            .collect();

        if epoch % 10 == 0 || epoch + 1 == self.schedule.epochs() {
            info!(
                "Epoch {}/{}: alpha={:.4}, sigma={:.3}, gamma={:.3}, qe={:?}",
                epoch + 1,
                self.schedule.epochs(),
                params.alpha,
                params.sigma,
                params.gamma,
                errors
            );
        }

        self.metrics.quantization_errors.push(errors);
        self.metrics.bmu_agreement.push(agreement);
        Ok(params)
    }

    /// Trains every epoch of the schedule.
    pub fn train(&mut self, network: &mut Network, datasets: &[InputDataset]) -> Result<()> {
        let epochs = self.schedule.epochs();
        info!(
            "Starting training: {} maps, {} epochs, {} samples per epoch",
            network.maps().len(),
            epochs,
            datasets.first().map(|d| d.len()).unwrap_or(0)
        );

        for epoch in 0..epochs {
            self.train_epoch(network, datasets, epoch)?;
        }

        info!("Training completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::schedule::{Coefficients, UpdateMode};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn params(rule: CrossModalRule) -> Params {
        Params::new(
            0,
            Coefficients {
                alpha: 0.1,
                sigma: 1.0,
                gamma: 0.3,
                xi: 0.01,
                kappa: 0.35,
            },
            rule,
        )
    }

    fn small_network() -> Network {
        let mut config = Config::default().network;
        for m in &mut config.maps {
            m.rows = 3;
            m.cols = 4;
        }
        config.maps[1].rows = 2;
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        Network::from_config(&config, &mut rng).unwrap()
    }

    #[test]
    fn test_from_config_shapes() {
        let network = small_network();
        let maps = network.maps();
        assert_eq!(maps[0].partner_shape, maps[1].shape);
        assert_eq!(maps[1].partner_shape, maps[0].shape);
        assert_eq!(network.partner(0), Some(1));
        assert_eq!(network.partner(1), Some(0));
    }

    #[test]
    fn test_rejects_mismatched_pairing() {
        let a = Som::new_zeros(1, LatticeShape::new(2, 2), 1, LatticeShape::new(3, 3));
        let b = Som::new_zeros(2, LatticeShape::new(2, 2), 1, LatticeShape::new(2, 2));
        let result = Network::new(vec![a, b], vec![Pairing { first: 0, second: 1 }]);
        assert!(matches!(result, Err(CorrsomError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_rejects_unpaired_map() {
        let a = Som::new_zeros(1, LatticeShape::new(2, 2), 1, LatticeShape::new(2, 2));
        let b = a.clone();
        assert!(Network::new(vec![a, b], vec![]).is_err());
    }

    #[test]
    fn test_rejects_empty_network() {
        assert!(matches!(
            Network::new(vec![], vec![]),
            Err(CorrsomError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_neurons() {
        let mut network = small_network();
        let mut maps = network.maps().to_vec();
        maps[1].neurons[2].weights.push(0.0);
        let pairings = network.pairings().to_vec();
        assert!(matches!(
            Network::new(maps, pairings.clone()),
            Err(CorrsomError::DimensionMismatch { .. })
        ));

        let mut maps = network.maps().to_vec();
        maps[0].neurons[0].links = crate::som::LinkMatrix::zeros(LatticeShape::new(1, 1));
        assert!(Network::new(maps, pairings).is_err());

        // untouched maps still train
        let inputs: [&[f64]; 2] = [&[5.0, 6.0], &[20.0, 30.0]];
        assert!(network.step(&inputs, &params(CrossModalRule::Hebbian)).is_ok());
    }

    #[test]
    fn test_train_without_datasets() {
        let mut network = small_network();
        let config = Config::default();
        let mut trainer = Trainer::new(Schedule::from_config(&config.schedule).unwrap());
        assert!(trainer.train(&mut network, &[]).is_err());
        assert!(trainer.metrics().quantization_errors.is_empty());
    }

    #[test]
    fn test_step_normalizes_links() {
        let mut network = small_network();
        let inputs: [&[f64]; 2] = [&[5.0, 6.0], &[20.0, 30.0]];
        network
            .step(&inputs, &params(CrossModalRule::Hebbian))
            .unwrap();

        for som in network.maps() {
            let (lo, hi) = som.link_bounds();
            assert_eq!(lo, 0.0);
            assert_eq!(hi, 1.0);
        }
    }

    #[test]
    fn test_step_uses_fresh_partner_activation() {
        let mut network = small_network();
        let p = params(CrossModalRule::Hebbian);
        let inputs: [&[f64]; 2] = [&[5.0, 6.0], &[20.0, 30.0]];

        let before = network.clone();
        let report = network.step(&inputs, &p).unwrap();

        // reproduce the cross-modal search by hand on the pre-step weights
        let mut source = before.maps()[1].clone();
        let bmu = source.find_bmu(inputs[1]).unwrap();
        source.compute_sensory_activation(bmu, p.sigma).unwrap();
        let expected = find_cross_modal_bmu(&source, &before.maps()[0]).unwrap();
        assert_eq!(report.cross_bmus[0], expected);
    }

    #[test]
    fn test_step_rejects_wrong_input() {
        let mut network = small_network();
        let inputs: [&[f64]; 2] = [&[5.0], &[20.0, 30.0]];
        assert!(matches!(
            network.step(&inputs, &params(CrossModalRule::Hebbian)),
            Err(CorrsomError::DimensionMismatch { .. })
        ));
        assert!(network
            .step(&inputs[..1], &params(CrossModalRule::Hebbian))
            .is_err());
    }

    #[test]
    fn test_none_rule_clears_links() {
        let mut network = small_network();
        let inputs: [&[f64]; 2] = [&[5.0, 6.0], &[20.0, 30.0]];
        network.step(&inputs, &params(CrossModalRule::None)).unwrap();
        for som in network.maps() {
            assert_eq!(som.link_bounds(), (0.0, 0.0));
        }
    }

    #[test]
    fn test_train_reduces_quantization_error() {
        let mut network = small_network();
        let schedule = Schedule::new(
            UpdateMode::Adaptive,
            CrossModalRule::Hebbian,
            20,
            Coefficients {
                alpha: 0.3,
                sigma: 2.0,
                gamma: 0.1,
                xi: 0.01,
                kappa: 0.35,
            },
        )
        .unwrap();

        let datasets = vec![
            InputDataset::new(2, vec![vec![3.0, 3.0], vec![4.0, 4.5], vec![3.5, 3.2]]).unwrap(),
            InputDataset::new(2, vec![vec![10.0, 9.0], vec![12.0, 11.0], vec![11.0, 10.0]])
                .unwrap(),
        ];

        let mut trainer = Trainer::new(schedule);
        trainer.train(&mut network, &datasets).unwrap();

        let metrics = trainer.metrics();
        assert_eq!(metrics.quantization_errors.len(), 20);
        assert_eq!(metrics.bmu_agreement.len(), 20);
        for m in 0..2 {
            let first = metrics.quantization_errors[0][m];
            let last = metrics.quantization_errors[19][m];
            assert!(last < first, "map {}: {} !< {}", m, last, first);
        }
        assert_eq!(trainer.schedule().cur_epoch(), 19);
    }

    #[test]
    fn test_train_rejects_mismatched_datasets() {
        let mut network = small_network();
        let schedule = Schedule::new(
            UpdateMode::Fixed,
            CrossModalRule::Hebbian,
            2,
            Coefficients {
                alpha: 0.1,
                sigma: 1.0,
                gamma: 0.1,
                xi: 0.01,
                kappa: 0.35,
            },
        )
        .unwrap();
        let mut trainer = Trainer::new(schedule);

        let uneven = vec![
            InputDataset::new(2, vec![vec![1.0, 1.0]]).unwrap(),
            InputDataset::new(2, vec![vec![1.0, 1.0], vec![2.0, 2.0]]).unwrap(),
        ];
        assert!(trainer.train(&mut network, &uneven).is_err());

        let wrong_dim = vec![
            InputDataset::new(3, vec![vec![1.0, 1.0, 1.0]]).unwrap(),
            InputDataset::new(2, vec![vec![1.0, 1.0]]).unwrap(),
        ];
        assert!(trainer.train(&mut network, &wrong_dim).is_err());
    }
}
