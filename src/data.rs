//! Input datasets feeding the sensory afferents of each map.
//!
//! Each map consumes its own sequence of fixed-length vectors. Datasets are
//! either generated artificially (with a built-in correlation to the map
//! id) or read from a sensor recording.

use crate::error::{CorrsomError, Result};
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Where input vectors come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    /// Recorded sensor data, one file per map.
    Sensor,
    /// Synthetic data generated from the map id.
    Artificial,
}

impl DataSource {
    /// Short lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            DataSource::Sensor => "sensory",
            DataSource::Artificial => "artificial",
        }
    }
}

/// Correlation structure of artificial data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtificialPattern {
    /// Values scale with the map id: `4.5 * id + U[1, 2]`.
    Algebraic,
    /// Square of the algebraic signal.
    Nonlinear,
    /// Sine sampled over time with amplitude equal to the map id.
    Temporal,
    /// Temporal signal shifted by `id` samples.
    Delay,
    /// Sum of the algebraic and temporal signals.
    AlgebraicTemporal,
}

/// Sine frequency of temporal data, in Hz.
pub const TEMPORAL_FREQUENCY: f64 = 25.0;

/// Sampling period of temporal data, in seconds.
pub const TEMPORAL_PERIOD: f64 = 0.025;

fn algebraic(id: f64, jitter: f64) -> f64 {
    4.5 * id + jitter
}

/// Sine of amplitude `id` at sample `step`.
fn temporal(id: f64, step: usize) -> f64 {
    let time = step as f64 * TEMPORAL_PERIOD;
    id * (2.0 * PI * TEMPORAL_FREQUENCY * time).sin()
}

/// An ordered sequence of equal-length input vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDataset {
    dim: usize,
    samples: Vec<Vec<f64>>,
}

impl InputDataset {
    /// Creates a dataset, checking every sample has length `dim`.
    pub fn new(dim: usize, samples: Vec<Vec<f64>>) -> Result<Self> {
        if dim == 0 {
            return Err(CorrsomError::Dataset("input dimension must be positive".to_string()));
        }
        if let Some((i, s)) = samples.iter().enumerate().find(|(_, s)| s.len() != dim) {
            return Err(CorrsomError::mismatch(format!("sample {}", i), dim, s.len()));
        }
        Ok(Self { dim, samples })
    }

    /// Generates `len` artificial samples for the map `map_id`.
    ///
    /// `noise` is the standard deviation of Gaussian noise added to every
    /// component (0 disables it).
    pub fn artificial<R: Rng>(
        map_id: u16,
        pattern: ArtificialPattern,
        dim: usize,
        len: usize,
        noise: f64,
        rng: &mut R,
    ) -> Result<Self> {
        if len == 0 {
            return Err(CorrsomError::EmptyInput("no samples requested".to_string()));
        }
        if !noise.is_finite() || noise < 0.0 {
            return Err(CorrsomError::Dataset(format!(
                "noise level must be finite and non-negative (got {})",
                noise
            )));
        }
        let noise = Normal::new(0.0, noise)
            .map_err(|e| CorrsomError::Dataset(format!("invalid noise level: {}", e)))?;
        let id = map_id as f64;

        let jitter = Uniform::new_inclusive(1.0, 2.0);
        let samples: Vec<Vec<f64>> = (0..len)
            .map(|t| {
                (0..dim)
                    .map(|k| {
                        let value = match pattern {
                            ArtificialPattern::Algebraic => algebraic(id, jitter.sample(rng)),
                            ArtificialPattern::Nonlinear => algebraic(id, jitter.sample(rng)).powi(2),
                            ArtificialPattern::Temporal => temporal(id, t + k),
                            ArtificialPattern::Delay => temporal(id, t + k + map_id as usize),
                            ArtificialPattern::AlgebraicTemporal => {
                                algebraic(id, jitter.sample(rng)) + temporal(id, t + k)
                            }
                        };
                        value + noise.sample(rng)
                    })
                    .collect()
            })
            .collect();

        log::info!(
            "Generated {} {:?} samples of dim {} for SOM{}",
            len,
            pattern,
            dim,
            map_id
        );
        Self::new(dim, samples)
    }

    /// Reads sensor samples from a text file.
    ///
    /// One sample per line; values separated by whitespace or commas. Blank
    /// lines and lines starting with `#` are skipped.
    pub fn from_file<P: AsRef<Path>>(path: P, dim: usize) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CorrsomError::FileNotFound(path.to_path_buf()));
        }

        let reader = BufReader::new(File::open(path)?);
        let mut samples = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let sample = line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<f64>().map_err(|_| {
                        CorrsomError::Dataset(format!(
                            "{}:{}: invalid number '{}'",
                            path.display(),
                            lineno + 1,
                            s
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;

            if sample.len() != dim {
                return Err(CorrsomError::mismatch(
                    format!("{}:{}", path.display(), lineno + 1),
                    dim,
                    sample.len(),
                ));
            }
            samples.push(sample);
        }

        if samples.is_empty() {
            return Err(CorrsomError::EmptyInput(format!(
                "no samples in {}",
                path.display()
            )));
        }

        log::info!("Read {} sensor samples from {}", samples.len(), path.display());
        Self::new(dim, samples)
    }

    /// Vector length.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if there are no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample at `index`.
    ///
    /// # Panics
    /// Panics if `index >= len()`.
    #[inline]
    pub fn get(&self, index: usize) -> &[f64] {
        &self.samples[index]
    }

    /// Iterates over the samples in order.
    pub fn iter(&self) -> impl Iterator<Item = &[f64]> {
        self.samples.iter().map(|s| s.as_slice())
    }

    /// Smallest and largest component over all samples.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.samples
            .iter()
            .flatten()
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::io::Write;

    #[test]
    fn test_new_checks_dimension() {
        assert!(InputDataset::new(2, vec![vec![1.0, 2.0], vec![3.0]]).is_err());
        assert!(InputDataset::new(0, vec![]).is_err());
        let ds = InputDataset::new(2, vec![vec![1.0, 2.0]]).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.get(0), &[1.0, 2.0]);
    }

    #[test]
    fn test_algebraic_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let ds =
            InputDataset::artificial(2, ArtificialPattern::Algebraic, 3, 50, 0.0, &mut rng).unwrap();
        assert_eq!(ds.len(), 50);
        assert_eq!(ds.dim(), 3);
        let (lo, hi) = ds.bounds().unwrap();
        assert!(lo >= 10.0 && hi <= 11.0);
    }

    #[test]
    fn test_temporal_amplitude() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let ds =
            InputDataset::artificial(3, ArtificialPattern::Temporal, 2, 40, 0.0, &mut rng).unwrap();
        let (lo, hi) = ds.bounds().unwrap();
        assert!(lo >= -3.0 - 1e-9 && hi <= 3.0 + 1e-9);
        assert!(hi > 2.0);
    }

    #[test]
    fn test_artificial_is_reproducible() {
        let a = InputDataset::artificial(
            1,
            ArtificialPattern::Algebraic,
            2,
            10,
            0.1,
            &mut ChaCha8Rng::seed_from_u64(5),
        )
        .unwrap();
        let b = InputDataset::artificial(
            1,
            ArtificialPattern::Algebraic,
            2,
            10,
            0.1,
            &mut ChaCha8Rng::seed_from_u64(5),
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_negative_noise() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for noise in [-1.0, -1e-9, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                InputDataset::artificial(1, ArtificialPattern::Temporal, 2, 5, noise, &mut rng),
                Err(CorrsomError::Dataset(_))
            ));
        }
        assert!(InputDataset::artificial(1, ArtificialPattern::Temporal, 2, 5, 0.0, &mut rng).is_ok());
    }

    #[test]
    fn test_nonlinear_is_squared_algebraic() {
        let ds = InputDataset::artificial(
            2,
            ArtificialPattern::Nonlinear,
            3,
            20,
            0.0,
            &mut ChaCha8Rng::seed_from_u64(8),
        )
        .unwrap();
        // (4.5 * 2 + U[1, 2])^2
        let (lo, hi) = ds.bounds().unwrap();
        assert!(lo >= 100.0 && hi <= 121.0);
    }

    #[test]
    fn test_delay_shifts_temporal_signal() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let temporal =
            InputDataset::artificial(3, ArtificialPattern::Temporal, 1, 10, 0.0, &mut rng).unwrap();
        let delayed =
            InputDataset::artificial(3, ArtificialPattern::Delay, 1, 10, 0.0, &mut rng).unwrap();
        for t in 0..7 {
            assert_eq!(delayed.get(t), temporal.get(t + 3));
        }
    }

    #[test]
    fn test_algebraic_temporal_combines_both() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let temporal =
            InputDataset::artificial(1, ArtificialPattern::Temporal, 2, 8, 0.0, &mut rng).unwrap();
        let combined = InputDataset::artificial(
            1,
            ArtificialPattern::AlgebraicTemporal,
            2,
            8,
            0.0,
            &mut rng,
        )
        .unwrap();
        for (c, t) in combined.iter().zip(temporal.iter()) {
            for (x, y) in c.iter().zip(t) {
                let residual = x - y;
                assert!(residual > 5.5 - 1e-9 && residual < 6.5 + 1e-9);
            }
        }
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# x y").unwrap();
        writeln!(file, "1.0 2.0").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "3.5, -4").unwrap();

        let ds = InputDataset::from_file(file.path(), 2).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(1), &[3.5, -4.0]);
    }

    #[test]
    fn test_from_file_wrong_width() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1.0 2.0 3.0").unwrap();
        assert!(matches!(
            InputDataset::from_file(file.path(), 2),
            Err(CorrsomError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_from_file_bad_number() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1.0 abc").unwrap();
        assert!(matches!(
            InputDataset::from_file(file.path(), 2),
            Err(CorrsomError::Dataset(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            InputDataset::from_file("/nonexistent/data.txt", 2),
            Err(CorrsomError::FileNotFound(_))
        ));
    }
}
