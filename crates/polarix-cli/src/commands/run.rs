use crate::cli::RunArgs;
use crate::config::{self, FileSolverConfig};
use crate::data;
use crate::error::{CliError, Result};
use nalgebra::Vector3;
use polarix::engine::config::PolarizationConfig;
use polarix::engine::observer::{DiagnosticsReporter, SolverEvent};
use polarix::engine::settings::read_settings;
use polarix::workflows;
use std::fs::File;
use tracing::{debug, info, warn};

pub fn run(args: RunArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    debug!("Resolved solver configuration: {:?}", &config);

    info!("Loading particles from {:?}", &args.input);
    let system = data::read_particles(&args.input)?;

    let box_lengths = args
        .box_lengths
        .as_ref()
        .map(|l| Vector3::new(l[0], l[1], l[2]));

    let reporter = DiagnosticsReporter::with_callback(Box::new(|event| match event {
        SolverEvent::SolveStart { particles } => {
            debug!("Dipole solve started over {} particles.", particles)
        }
        SolverEvent::SweepComplete { iteration, change } => match change {
            Some(change) => debug!("Sweep {} complete, change {:.3e}.", iteration, change),
            None => debug!("Sweep {} complete.", iteration),
        },
        SolverEvent::Converged { iterations } => {
            info!("Dipole solve converged after {} iteration(s).", iterations)
        }
        SolverEvent::DivergenceFallback { iterations } => warn!(
            "Dipole solve did not converge within {} iterations; falling back to first-order dipoles.",
            iterations
        ),
        SolverEvent::Message(text) => info!("{}", text),
    }));

    println!("Starting polarization evaluation...");
    let result = workflows::evaluate::run(&system, &config, box_lengths, &reporter)?;
    drop(reporter);

    if !result.converged {
        println!("Warning: dipole solve did not converge; results use first-order dipoles.");
    }
    println!(
        "Polarization energy: {:.6} kcal/mol ({} iteration(s))",
        result.energy.total(),
        result.iterations
    );
    println!(
        "  self: {:.6}  field: {:.6}  dipole-dipole: {:.6}",
        result.energy.self_energy, result.energy.field, result.energy.dipole_dipole
    );

    if let Some(output) = &args.output {
        data::write_results(output, &result.induced_dipoles, &result.forces)?;
        println!("Results written to: {}", output.display());
    }

    Ok(())
}

fn resolve_config(args: &RunArgs) -> Result<PolarizationConfig> {
    if let Some(path) = &args.settings {
        info!("Loading solver settings record from {:?}", path);
        let mut file = File::open(path)?;
        let config = read_settings(&mut file)?;
        return config::apply_cli_overrides(config, args);
    }
    if let Some(path) = &args.config {
        info!("Loading solver configuration from {:?}", path);
        return FileSolverConfig::from_file(path)?.merge_with_cli(args);
    }
    Err(CliError::Argument(
        "either --config or --settings is required".to_string(),
    ))
}
