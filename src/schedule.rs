//! Epoch-indexed learning parameter schedule.
//!
//! The schedule stores one value per epoch for each of the five learning
//! coefficients. The training driver owns it: before each epoch it writes
//! that epoch's coefficients (constant in [`UpdateMode::Fixed`], exponential
//! in [`UpdateMode::Adaptive`]) and moves the cursor. The learning engine
//! only ever sees a [`Params`] snapshot taken at the cursor.

use crate::config::ScheduleConfig;
use crate::error::{CorrsomError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the coefficients evolve across epochs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateMode {
    /// Every epoch uses the initial coefficients.
    Fixed,
    /// Coefficients follow exponential schedules with time constant lambda.
    Adaptive,
}

/// Learning rule for the cross-modal links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossModalRule {
    /// Links are held at zero.
    None,
    /// Co-activation: `kappa * a * b`.
    Hebbian,
    /// Co-variation around each lattice's mean activation.
    Covariance,
}

impl fmt::Display for CrossModalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CrossModalRule::None => "none",
            CrossModalRule::Hebbian => "hebbian",
            CrossModalRule::Covariance => "covariance",
        };
        f.write_str(name)
    }
}

/// The five learning coefficients of one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    /// Sensory projection learning rate.
    pub alpha: f64,
    /// Neighborhood radius.
    pub sigma: f64,
    /// Cross-modal impact factor in the joint activation.
    pub gamma: f64,
    /// Inhibitory component factor.
    pub xi: f64,
    /// Cross-modal Hebbian learning rate.
    pub kappa: f64,
}

impl Coefficients {
    /// Checks that every coefficient is usable by the learning engine.
    pub fn validate(&self) -> Result<()> {
        let all = [self.alpha, self.sigma, self.gamma, self.xi, self.kappa];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(CorrsomError::Config(format!(
                "coefficients must be finite: {:?}",
                self
            )));
        }
        if self.sigma <= 0.0 {
            return Err(CorrsomError::Config(format!(
                "sigma must be positive (got {})",
                self.sigma
            )));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(CorrsomError::Config(format!(
                "gamma must lie in [0, 1] (got {})",
                self.gamma
            )));
        }
        if self.alpha < 0.0 || self.xi < 0.0 || self.kappa < 0.0 {
            return Err(CorrsomError::Config(format!(
                "alpha, xi and kappa must be non-negative: {:?}",
                self
            )));
        }
        Ok(())
    }
}

/// Read-only snapshot of the schedule at one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// Epoch the snapshot was taken at.
    pub epoch: usize,
    /// Sensory projection learning rate.
    pub alpha: f64,
    /// Neighborhood radius.
    pub sigma: f64,
    /// Cross-modal impact factor.
    pub gamma: f64,
    /// Inhibitory component factor.
    pub xi: f64,
    /// Cross-modal learning rate.
    pub kappa: f64,
    /// Cross-modal learning rule.
    pub rule: CrossModalRule,
}

impl Params {
    /// Builds a snapshot directly from coefficients.
    pub fn new(epoch: usize, c: Coefficients, rule: CrossModalRule) -> Self {
        Self {
            epoch,
            alpha: c.alpha,
            sigma: c.sigma,
            gamma: c.gamma,
            xi: c.xi,
            kappa: c.kappa,
            rule,
        }
    }
}

/// Per-epoch coefficient arrays plus the driver's cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    mode: UpdateMode,
    rule: CrossModalRule,
    lambda: f64,
    initial: Coefficients,
    alpha: Vec<f64>,
    sigma: Vec<f64>,
    gamma: Vec<f64>,
    xi: Vec<f64>,
    kappa: Vec<f64>,
    cur_epoch: usize,
}

impl Schedule {
    /// Creates a schedule with every epoch set to `initial`.
    ///
    /// `lambda = epochs / ln(sigma0)`; it is only meaningful for
    /// `sigma0 > 1`, which adaptive schedules require.
    pub fn new(
        mode: UpdateMode,
        rule: CrossModalRule,
        epochs: usize,
        initial: Coefficients,
    ) -> Result<Self> {
        if epochs == 0 {
            return Err(CorrsomError::Config("epochs must be positive".to_string()));
        }
        initial.validate()?;
        if mode == UpdateMode::Adaptive && initial.sigma <= 1.0 {
            return Err(CorrsomError::Config(format!(
                "adaptive schedules need sigma > 1 (got {})",
                initial.sigma
            )));
        }

        Ok(Self {
            mode,
            rule,
            lambda: epochs as f64 / initial.sigma.ln(),
            initial,
            alpha: vec![initial.alpha; epochs],
            sigma: vec![initial.sigma; epochs],
            gamma: vec![initial.gamma; epochs],
            xi: vec![initial.xi; epochs],
            kappa: vec![initial.kappa; epochs],
            cur_epoch: 0,
        })
    }

    /// Creates a schedule from its configuration section.
    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        Self::new(config.mode, config.rule, config.epochs, config.initial())
    }

    /// Total number of epochs.
    #[inline]
    pub fn epochs(&self) -> usize {
        self.alpha.len()
    }

    /// Time constant of the adaptive schedules.
    #[inline]
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Update mode.
    #[inline]
    pub fn mode(&self) -> UpdateMode {
        self.mode
    }

    /// Cross-modal learning rule.
    #[inline]
    pub fn rule(&self) -> CrossModalRule {
        self.rule
    }

    /// Current epoch cursor.
    #[inline]
    pub fn cur_epoch(&self) -> usize {
        self.cur_epoch
    }

    fn check_epoch(&self, epoch: usize) -> Result<()> {
        if epoch >= self.epochs() {
            return Err(CorrsomError::EpochOutOfRange {
                epoch,
                epochs: self.epochs(),
            });
        }
        Ok(())
    }

    /// Overwrites the coefficients of one epoch.
    pub fn set_epoch(&mut self, epoch: usize, c: Coefficients) -> Result<()> {
        self.check_epoch(epoch)?;
        c.validate()?;
        self.alpha[epoch] = c.alpha;
        self.sigma[epoch] = c.sigma;
        self.gamma[epoch] = c.gamma;
        self.xi[epoch] = c.xi;
        self.kappa[epoch] = c.kappa;
        Ok(())
    }

    /// Moves the cursor to `epoch`.
    pub fn set_cursor(&mut self, epoch: usize) -> Result<()> {
        self.check_epoch(epoch)?;
        self.cur_epoch = epoch;
        Ok(())
    }

    /// Coefficients stored for `epoch`.
    pub fn coefficients_at(&self, epoch: usize) -> Result<Coefficients> {
        self.check_epoch(epoch)?;
        Ok(Coefficients {
            alpha: self.alpha[epoch],
            sigma: self.sigma[epoch],
            gamma: self.gamma[epoch],
            xi: self.xi[epoch],
            kappa: self.kappa[epoch],
        })
    }

    /// Snapshot of the schedule at the cursor.
    pub fn params(&self) -> Result<Params> {
        let c = self.coefficients_at(self.cur_epoch)?;
        Ok(Params::new(self.cur_epoch, c, self.rule))
    }

    /// Writes the coefficients for `epoch` according to the update mode,
    /// moves the cursor there, and returns the resulting snapshot.
    pub fn prepare_epoch(&mut self, epoch: usize) -> Result<Params> {
        if self.mode == UpdateMode::Adaptive {
            let c = Self::adaptive_coefficients(&self.initial, self.lambda, epoch);
            self.set_epoch(epoch, c)?;
        }
        self.set_cursor(epoch)?;
        self.params()
    }

    /// Exponential schedules: alpha, sigma and xi decay as
    /// `v0 * exp(-t / lambda)`; gamma and kappa grow as `v0 * exp(t / lambda)`,
    /// gamma capped at 1.
    ///
    /// With `lambda = epochs / ln(sigma0)` sigma reaches 1 at the last epoch.
    pub fn adaptive_coefficients(initial: &Coefficients, lambda: f64, epoch: usize) -> Coefficients {
        let t = epoch as f64;
        let decay = (-t / lambda).exp();
        let growth = (t / lambda).exp();

        Coefficients {
            alpha: initial.alpha * decay,
            sigma: initial.sigma * decay,
            gamma: (initial.gamma * growth).min(1.0),
            xi: initial.xi * decay,
            kappa: initial.kappa * growth,
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "mode: {:?}  rule: {}  epochs: {}  lambda: {:.4}",
            self.mode,
            self.rule,
            self.epochs(),
            self.lambda
        )?;
        writeln!(
            f,
            "{:>7} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "epoch", "alpha", "sigma", "gamma", "xi", "kappa"
        )?;
        for epoch in 0..self.epochs() {
            writeln!(
                f,
                "{:>7} {:>10.6} {:>10.6} {:>10.6} {:>10.6} {:>10.6}",
                epoch,
                self.alpha[epoch],
                self.sigma[epoch],
                self.gamma[epoch],
                self.xi[epoch],
                self.kappa[epoch]
            )?;
        }
        Ok(())
    }
}
