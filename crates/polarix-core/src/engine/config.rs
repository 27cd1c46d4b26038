use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("'{first}' and '{second}' are mutually exclusive")]
    ExclusiveModes {
        first: &'static str,
        second: &'static str,
    },

    #[error("Parameter '{name}' must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },
}

/// Short-range screening applied to dipole interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DampingMode {
    /// Bare dipole-field tensor.
    None,
    /// Thole-style exponential screening with strength `damping_strength`.
    Exponential,
}

/// Settings for one polarization evaluation.
///
/// Defaults follow the reference parameterization: ranked Gauss-Seidel sweeps,
/// 50 iteration cap, 1e-11 convergence precision, 1.03 relaxation overshoot,
/// exponential damping strength 2.1304 (inactive until the mode is switched on).
///
/// The LJ cutoff and the tail/offset flags are not consumed by the solver
/// itself; they ride along because the persisted settings record stores them
/// for the collaborating short-range pairwise sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolarizationConfig {
    /// Global Lennard-Jones cutoff in Angstroms (persisted for collaborators).
    pub lj_cutoff: f64,
    /// Coulomb cutoff in Angstroms for static-field and charge-dipole terms.
    pub coulomb_cutoff: f64,
    /// Whether the collaborating LJ sum shifts energies to zero at the cutoff.
    pub offset_flag: bool,
    /// Whether the collaborating LJ sum applies long-range tail corrections.
    pub tail_flag: bool,
    /// Iteration cap for the induced-dipole solve.
    pub iterations_max: usize,
    /// Dipole-interaction screening mode.
    pub damping_mode: DampingMode,
    /// Exponential damping strength `a` in 1/Angstrom.
    pub damping_strength: f64,
    /// Skip the iterative solve entirely, keeping first-order dipoles.
    pub zero_dipole: bool,
    /// Convergence precision; the solve stops when the mean squared
    /// per-component dipole change drops to `precision^2`.
    pub precision: f64,
    /// Run exactly `iterations_max` sweeps instead of testing precision.
    pub fixed_iteration: bool,
    /// Plain Gauss-Seidel sweeps in storage order.
    pub gauss_seidel: bool,
    /// Gauss-Seidel sweeps in descending coupling-rank order.
    pub gauss_seidel_ranked: bool,
    /// Relaxation/overshoot factor applied to the initial dipole guess.
    pub relaxation: f64,
    /// Start each solve from the previous evaluation's dipoles.
    pub use_previous: bool,
    /// Emit per-sweep diagnostics through the observer.
    pub debug: bool,
}

impl PolarizationConfig {
    pub fn builder() -> PolarizationConfigBuilder {
        PolarizationConfigBuilder::new()
    }

    /// Checks the invariants the builder enforces; used again after reading a
    /// persisted settings record, which bypasses the builder.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gauss_seidel && self.gauss_seidel_ranked {
            return Err(ConfigError::ExclusiveModes {
                first: "gauss_seidel",
                second: "gauss_seidel_ranked",
            });
        }
        if self.zero_dipole && (self.gauss_seidel || self.gauss_seidel_ranked) {
            return Err(ConfigError::ExclusiveModes {
                first: "zero_dipole",
                second: "gauss_seidel/gauss_seidel_ranked",
            });
        }
        for (name, value) in [
            ("lj_cutoff", self.lj_cutoff),
            ("coulomb_cutoff", self.coulomb_cutoff),
            ("precision", self.precision),
            ("relaxation", self.relaxation),
            ("damping_strength", self.damping_strength),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        Ok(())
    }

    /// Whether sweeps commit each dipole immediately (Gauss-Seidel) rather
    /// than batching updates until the sweep completes (Jacobi).
    #[inline]
    pub fn commits_in_sweep(&self) -> bool {
        self.gauss_seidel || self.gauss_seidel_ranked
    }
}

/// Builds a [`PolarizationConfig`], starting from the reference defaults.
///
/// Only the LJ cutoff has no default; the Coulomb cutoff falls back to the LJ
/// cutoff when not set explicitly. Conflicting exclusive flags are rejected at
/// `build()` time, never silently reconciled.
#[derive(Debug, Default)]
pub struct PolarizationConfigBuilder {
    lj_cutoff: Option<f64>,
    coulomb_cutoff: Option<f64>,
    offset_flag: bool,
    tail_flag: bool,
    iterations_max: Option<usize>,
    damping_mode: Option<DampingMode>,
    damping_strength: Option<f64>,
    zero_dipole: bool,
    precision: Option<f64>,
    fixed_iteration: bool,
    gauss_seidel: bool,
    gauss_seidel_ranked: Option<bool>,
    relaxation: Option<f64>,
    use_previous: bool,
    debug: bool,
}

impl PolarizationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lj_cutoff(mut self, cutoff: f64) -> Self {
        self.lj_cutoff = Some(cutoff);
        self
    }
    pub fn coulomb_cutoff(mut self, cutoff: f64) -> Self {
        self.coulomb_cutoff = Some(cutoff);
        self
    }
    pub fn offset_flag(mut self, on: bool) -> Self {
        self.offset_flag = on;
        self
    }
    pub fn tail_flag(mut self, on: bool) -> Self {
        self.tail_flag = on;
        self
    }
    pub fn iterations_max(mut self, n: usize) -> Self {
        self.iterations_max = Some(n);
        self
    }
    pub fn damping_mode(mut self, mode: DampingMode) -> Self {
        self.damping_mode = Some(mode);
        self
    }
    pub fn damping_strength(mut self, a: f64) -> Self {
        self.damping_strength = Some(a);
        self
    }
    pub fn zero_dipole(mut self, on: bool) -> Self {
        self.zero_dipole = on;
        self
    }
    pub fn precision(mut self, precision: f64) -> Self {
        self.precision = Some(precision);
        self
    }
    pub fn fixed_iteration(mut self, on: bool) -> Self {
        self.fixed_iteration = on;
        self
    }
    pub fn gauss_seidel(mut self, on: bool) -> Self {
        self.gauss_seidel = on;
        self
    }
    pub fn gauss_seidel_ranked(mut self, on: bool) -> Self {
        self.gauss_seidel_ranked = Some(on);
        self
    }
    pub fn relaxation(mut self, gamma: f64) -> Self {
        self.relaxation = Some(gamma);
        self
    }
    pub fn use_previous(mut self, on: bool) -> Self {
        self.use_previous = on;
        self
    }
    pub fn debug(mut self, on: bool) -> Self {
        self.debug = on;
        self
    }

    pub fn build(self) -> Result<PolarizationConfig, ConfigError> {
        let lj_cutoff = self
            .lj_cutoff
            .ok_or(ConfigError::MissingParameter("lj_cutoff"))?;
        let config = PolarizationConfig {
            lj_cutoff,
            coulomb_cutoff: self.coulomb_cutoff.unwrap_or(lj_cutoff),
            offset_flag: self.offset_flag,
            tail_flag: self.tail_flag,
            iterations_max: self.iterations_max.unwrap_or(50),
            damping_mode: self.damping_mode.unwrap_or(DampingMode::None),
            damping_strength: self.damping_strength.unwrap_or(2.1304),
            zero_dipole: self.zero_dipole,
            precision: self.precision.unwrap_or(1e-11),
            fixed_iteration: self.fixed_iteration,
            gauss_seidel: self.gauss_seidel,
            gauss_seidel_ranked: self.gauss_seidel_ranked.unwrap_or(!self.gauss_seidel),
            relaxation: self.relaxation.unwrap_or(1.03),
            use_previous: self.use_previous,
            debug: self.debug,
        };
        config.validate()?;
        Ok(config)
    }
}
