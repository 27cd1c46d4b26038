use crate::cli::{RunArgs, SettingsCommands};
use crate::config::FileSolverConfig;
use crate::error::{CliError, Result};
use polarix::engine::settings::{read_settings, write_settings};
use std::fs::File;
use std::path::PathBuf;
use tracing::info;

pub fn run(command: SettingsCommands) -> Result<()> {
    match command {
        SettingsCommands::Export { config, output } => export(config, output),
        SettingsCommands::Show { path } => show(path),
    }
}

fn export(config_path: PathBuf, output: PathBuf) -> Result<()> {
    let file_config = FileSolverConfig::from_file(&config_path)?;
    let config = file_config.merge_with_cli(&no_overrides())?;

    let mut file = File::create(&output)?;
    write_settings(&config, &mut file)?;
    info!("Exported settings record to {:?}", &output);
    println!("Settings record written to: {}", output.display());
    Ok(())
}

fn show(path: PathBuf) -> Result<()> {
    let mut file = File::open(&path)?;
    let config = read_settings(&mut file)?;
    let rendered = toml::to_string_pretty(&config)
        .map_err(|e| CliError::Other(anyhow::anyhow!("failed to render settings: {}", e)))?;
    println!("{rendered}");
    Ok(())
}

fn no_overrides() -> RunArgs {
    RunArgs {
        input: PathBuf::new(),
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
