use crate::error::{CliError, Result};
use nalgebra::{Point3, Vector3};
use polarix::core::models::particle::Particle;
use polarix::core::models::system::ParticleSystem;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// One row of the input particle file.
#[derive(Deserialize, Debug)]
struct ParticleRecord {
    x: f64,
    y: f64,
    z: f64,
    charge: f64,
    alpha: f64,
    #[serde(default)]
    molecule: u32,
}

/// One row of the output file: the induced dipole and polarization force of a
/// particle, in input order.
#[derive(Serialize, Debug)]
struct ResultRecord {
    index: usize,
    mu_x: f64,
    mu_y: f64,
    mu_z: f64,
    force_x: f64,
    force_y: f64,
    force_z: f64,
}

/// Reads a particle system from a headered CSV file with columns
/// `x, y, z, charge, alpha, molecule`.
pub fn read_particles(path: &Path) -> Result<ParticleSystem> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;

    let mut particles = Vec::new();
    for record in reader.deserialize() {
        let record: ParticleRecord = record.map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        if record.alpha < 0.0 {
            return Err(CliError::FileParsing {
                path: path.to_path_buf(),
                source: anyhow::anyhow!(
                    "particle {} has negative polarizability {}",
                    particles.len(),
                    record.alpha
                ),
            });
        }
        let mut particle = Particle::new(Point3::new(record.x, record.y, record.z));
        particle.charge = record.charge;
        particle.polarizability = record.alpha;
        particle.molecule_id = record.molecule;
        particles.push(particle);
    }

    info!("Loaded {} particles from {:?}", particles.len(), path);
    Ok(ParticleSystem::new(particles))
}

/// Writes induced dipoles and forces side by side, one row per particle.
pub fn write_results(
    path: &Path,
    dipoles: &[Vector3<f64>],
    forces: &[Vector3<f64>],
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    for (index, (mu, force)) in dipoles.iter().zip(forces).enumerate() {
        writer
            .serialize(ResultRecord {
                index,
                mu_x: mu.x,
                mu_y: mu.y,
                mu_z: mu.z,
                force_x: force.x,
                force_y: force.y,
                force_z: force.z,
            })
            .map_err(|e| CliError::FileParsing {
                path: path.to_path_buf(),
                source: e.into(),
            })?;
    }
    writer.flush()?;
    info!("Wrote {} result rows to {:?}", dipoles.len(), path);
    Ok(())
}
