use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use polarix::engine::config::{DampingMode, PolarizationConfig};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// The solver section of a TOML configuration file.
///
/// Every field is optional except the LJ cutoff; unset fields fall back to the
/// reference defaults baked into the core builder. Unknown keys are rejected
/// rather than silently ignored.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSolverConfig {
    pub lj_cutoff: Option<f64>,
    pub coulomb_cutoff: Option<f64>,
    pub offset: Option<bool>,
    pub tail: Option<bool>,
    pub max_iterations: Option<usize>,
    pub damping_mode: Option<DampingMode>,
    pub damping_strength: Option<f64>,
    pub zero_dipole: Option<bool>,
    pub precision: Option<f64>,
    pub fixed_iteration: Option<bool>,
    pub gauss_seidel: Option<bool>,
    pub gauss_seidel_ranked: Option<bool>,
    pub relaxation: Option<f64>,
    pub use_previous: Option<bool>,
    pub debug: Option<bool>,
}

impl FileSolverConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        debug!("Parsed solver configuration from {:?}", path);
        Ok(config)
    }

    /// Merges the file values with CLI overrides into a validated core config.
    pub fn merge_with_cli(self, args: &RunArgs) -> Result<PolarizationConfig> {
        let lj_cutoff = self
            .lj_cutoff
            .ok_or_else(|| CliError::Config("missing required key 'lj-cutoff'".to_string()))?;

        let mut builder = PolarizationConfig::builder().lj_cutoff(lj_cutoff);

        if let Some(cutoff) = args.coulomb_cutoff.or(self.coulomb_cutoff) {
            builder = builder.coulomb_cutoff(cutoff);
        }
        if let Some(on) = self.offset {
            builder = builder.offset_flag(on);
        }
        if let Some(on) = self.tail {
            builder = builder.tail_flag(on);
        }
        if let Some(n) = args.max_iterations.or(self.max_iterations) {
            builder = builder.iterations_max(n);
        }
        if let Some(mode) = args.damping.map(DampingMode::from).or(self.damping_mode) {
            builder = builder.damping_mode(mode);
        }
        if let Some(a) = args.damping_strength.or(self.damping_strength) {
            builder = builder.damping_strength(a);
        }
        if let Some(on) = self.zero_dipole {
            builder = builder.zero_dipole(on);
        }
        if let Some(p) = args.precision.or(self.precision) {
            builder = builder.precision(p);
        }
        if args.fixed_iteration || self.fixed_iteration.unwrap_or(false) {
            builder = builder.fixed_iteration(true);
        }
        if args.jacobi {
            builder = builder.gauss_seidel(false).gauss_seidel_ranked(false);
        } else {
            if let Some(on) = self.gauss_seidel {
                builder = builder.gauss_seidel(on);
            }
            if let Some(on) = self.gauss_seidel_ranked {
                builder = builder.gauss_seidel_ranked(on);
            }
        }
        if let Some(gamma) = args.relaxation.or(self.relaxation) {
            builder = builder.relaxation(gamma);
        }
        if let Some(on) = self.use_previous {
            builder = builder.use_previous(on);
        }
        if args.debug_solve || self.debug.unwrap_or(false) {
            builder = builder.debug(true);
        }

        builder
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }
}

/// Applies the `run` CLI overrides to a config loaded from a binary settings
/// record, which bypasses the builder, then re-validates.
pub fn apply_cli_overrides(
    mut config: PolarizationConfig,
    args: &RunArgs,
) -> Result<PolarizationConfig> {
    if let Some(cutoff) = args.coulomb_cutoff {
        config.coulomb_cutoff = cutoff;
    }
    if let Some(n) = args.max_iterations {
        config.iterations_max = n;
    }
    if let Some(p) = args.precision {
        config.precision = p;
    }
    if let Some(mode) = args.damping {
        config.damping_mode = mode.into();
    }
    if let Some(a) = args.damping_strength {
        config.damping_strength = a;
    }
    if let Some(gamma) = args.relaxation {
        config.relaxation = gamma;
    }
    if args.jacobi {
        config.gauss_seidel = false;
        config.gauss_seidel_ranked = false;
    }
    if args.fixed_iteration {
        config.fixed_iteration = true;
    }
    if args.debug_solve {
        config.debug = true;
    }
    config
        .validate()
        .map_err(|e| CliError::Config(e.to_string()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::RunArgs;
    use std::path::PathBuf;

    fn default_args() -> RunArgs {
        RunArgs {
            input: PathBuf::from("particles.csv"),
            output: None,
            config: None,
            settings: None,
            coulomb_cutoff: None,
            max_iterations: None,
            precision: None,
            damping: None,
            damping_strength: None,
            relaxation: None,
            jacobi: false,
            fixed_iteration: false,
            box_lengths: None,
            debug_solve: false,
        }
    }

    #[test]
    fn minimal_file_config_builds_with_defaults() {
        let file: FileSolverConfig = toml::from_str("lj-cutoff = 12.0").unwrap();
        let config = file.merge_with_cli(&default_args()).unwrap();
        assert_eq!(config.lj_cutoff, 12.0);
        assert_eq!(config.coulomb_cutoff, 12.0);
        assert_eq!(config.iterations_max, 50);
        assert!(config.gauss_seidel_ranked);
    }

    #[test]
    fn full_file_config_round_trips_every_key() {
        let file: FileSolverConfig = toml::from_str(
            r#"
            lj-cutoff = 12.0
            coulomb-cutoff = 10.0
            offset = true
            tail = true
            max-iterations = 30
            damping-mode = "exponential"
            damping-strength = 1.9
            precision = 1e-8
            fixed-iteration = false
            gauss-seidel = false
            gauss-seidel-ranked = true
            relaxation = 1.05
            use-previous = true
            debug = true
            "#,
        )
        .unwrap();
        let config = file.merge_with_cli(&default_args()).unwrap();
        assert_eq!(config.coulomb_cutoff, 10.0);
        assert_eq!(config.iterations_max, 30);
        assert_eq!(config.damping_mode, DampingMode::Exponential);
        assert_eq!(config.damping_strength, 1.9);
        assert_eq!(config.relaxation, 1.05);
        assert!(config.offset_flag && config.tail_flag);
        assert!(config.use_previous && config.debug);
    }

    #[test]
    fn cli_overrides_beat_file_values() {
        let file: FileSolverConfig =
            toml::from_str("lj-cutoff = 12.0\ncoulomb-cutoff = 10.0\nmax-iterations = 30").unwrap();
        let mut args = default_args();
        args.coulomb_cutoff = Some(8.0);
        args.max_iterations = Some(99);
        args.debug_solve = true;
        let config = file.merge_with_cli(&args).unwrap();
        assert_eq!(config.coulomb_cutoff, 8.0);
        assert_eq!(config.iterations_max, 99);
        assert!(config.debug);
    }

    #[test]
    fn jacobi_flag_disables_both_gauss_seidel_modes() {
        let file: FileSolverConfig =
            toml::from_str("lj-cutoff = 12.0\ngauss-seidel = true").unwrap();
        let mut args = default_args();
        args.jacobi = true;
        let config = file.merge_with_cli(&args).unwrap();
        assert!(!config.gauss_seidel);
        assert!(!config.gauss_seidel_ranked);
        assert!(!config.commits_in_sweep());
    }

    #[test]
    fn missing_lj_cutoff_is_a_config_error() {
        let file = FileSolverConfig::default();
        let result = file.merge_with_cli(&default_args());
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: std::result::Result<FileSolverConfig, _> =
            toml::from_str("lj-cutoff = 12.0\nwolf-alpha = 0.2");
        assert!(result.is_err());
    }

    #[test]
    fn conflicting_modes_surface_as_config_errors() {
        let file: FileSolverConfig =
            toml::from_str("lj-cutoff = 12.0\ngauss-seidel = true\ngauss-seidel-ranked = true")
                .unwrap();
        let result = file.merge_with_cli(&default_args());
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn settings_record_overrides_are_re_validated() {
        let config = PolarizationConfig::builder()
            .lj_cutoff(12.0)
            .build()
            .unwrap();
        let mut args = default_args();
        args.precision = Some(-1.0);
        let result = apply_cli_overrides(config, &args);
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
