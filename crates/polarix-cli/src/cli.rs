use clap::{Args, Parser, Subcommand, ValueEnum};
use polarix::engine::config::DampingMode;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Polarix CLI - A command-line interface for the Polarix self-consistent induced point-dipole polarization solver.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one polarization evaluation over a particle file.
    Run(RunArgs),
    /// Inspect or export binary solver settings records.
    Settings(SettingsArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the input particle file (CSV: x, y, z, charge, alpha, molecule).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the output CSV of induced dipoles and forces.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Path to the solver configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Load the solver configuration from a binary settings record instead.
    #[arg(long, value_name = "PATH", conflicts_with = "config")]
    pub settings: Option<PathBuf>,

    // --- Solver Overrides ---
    /// Override the Coulomb cutoff from the config file.
    #[arg(long, value_name = "FLOAT")]
    pub coulomb_cutoff: Option<f64>,

    /// Override the iteration cap for the dipole solve.
    #[arg(long, value_name = "INT")]
    pub max_iterations: Option<usize>,

    /// Override the convergence precision for the dipole solve.
    #[arg(long, value_name = "FLOAT")]
    pub precision: Option<f64>,

    /// Override the dipole damping mode from the config file.
    #[arg(long, value_name = "MODE")]
    pub damping: Option<DampingArg>,

    /// Override the exponential damping strength.
    #[arg(long, value_name = "FLOAT")]
    pub damping_strength: Option<f64>,

    /// Override the relaxation factor applied to the initial dipole guess.
    #[arg(long, value_name = "FLOAT")]
    pub relaxation: Option<f64>,

    /// Use plain Jacobi sweeps, disabling both Gauss-Seidel modes.
    #[arg(long)]
    pub jacobi: bool,

    /// Run exactly the configured iteration count, skipping the precision test.
    #[arg(long)]
    pub fixed_iteration: bool,

    /// Periodic box edge lengths; omit for an isolated cluster.
    #[arg(long, value_name = "LX,LY,LZ", value_delimiter = ',', num_args = 3)]
    pub box_lengths: Option<Vec<f64>>,

    /// Emit per-sweep solver diagnostics, overriding the config file.
    #[arg(long)]
    pub debug_solve: bool,
}

/// Command-line spelling of the core damping modes.
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum DampingArg {
    None,
    Exponential,
}

impl From<DampingArg> for DampingMode {
    fn from(arg: DampingArg) -> Self {
        match arg {
            DampingArg::None => DampingMode::None,
            DampingArg::Exponential => DampingMode::Exponential,
        }
    }
}

/// Arguments for the `settings` subcommand.
#[derive(Args, Debug)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommands,
}

/// Available commands for settings-record management.
#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Convert a TOML configuration file into a binary settings record.
    Export {
        /// The TOML configuration file to convert.
        #[arg(short, long, required = true, value_name = "PATH")]
        config: PathBuf,
        /// Where to write the binary settings record.
        #[arg(short, long, required = true, value_name = "PATH")]
        output: PathBuf,
    },
    /// Print the contents of a binary settings record as TOML.
    Show {
        /// The binary settings record to inspect.
        #[arg(required = true)]
        path: PathBuf,
    },
}
