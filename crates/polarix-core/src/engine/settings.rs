use std::io::{self, Read, Write};

use thiserror::Error;

use super::config::{ConfigError, DampingMode, PolarizationConfig};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error while accessing settings record: {0}")]
    Io(#[from] io::Error),

    #[error("Unknown damping mode tag {0} in settings record")]
    UnknownDampingMode(i32),

    #[error("Settings record holds an invalid configuration: {0}")]
    Invalid(#[from] ConfigError),
}

const DAMPING_EXPONENTIAL: i32 = 0;
const DAMPING_NONE: i32 = 1;

fn write_f64<W: Write>(w: &mut W, value: f64) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

fn write_i32<W: Write>(w: &mut W, value: i32) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

fn write_flag<W: Write>(w: &mut W, value: bool) -> io::Result<()> {
    write_i32(w, value as i32)
}

fn read_f64<R: Read>(r: &mut R) -> io::Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn read_i32<R: Read>(r: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_flag<R: Read>(r: &mut R) -> io::Result<bool> {
    Ok(read_i32(r)? != 0)
}

/// Writes the fixed-order, unversioned binary settings record.
///
/// Field order is a wire contract shared with readers of existing records:
/// LJ cutoff, Coulomb cutoff, offset flag, tail flag, iteration cap, damping
/// mode, damping strength, zero-dipole flag, precision, fixed-iteration flag,
/// Gauss-Seidel flag, ranked flag, relaxation factor, debug flag. All values
/// little-endian; flags and tags are 32-bit integers.
pub fn write_settings<W: Write>(config: &PolarizationConfig, w: &mut W) -> Result<(), SettingsError> {
    write_f64(w, config.lj_cutoff)?;
    write_f64(w, config.coulomb_cutoff)?;
    write_flag(w, config.offset_flag)?;
    write_flag(w, config.tail_flag)?;
    write_i32(w, config.iterations_max as i32)?;
    write_i32(
        w,
        match config.damping_mode {
            DampingMode::Exponential => DAMPING_EXPONENTIAL,
            DampingMode::None => DAMPING_NONE,
        },
    )?;
    write_f64(w, config.damping_strength)?;
    write_flag(w, config.zero_dipole)?;
    write_f64(w, config.precision)?;
    write_flag(w, config.fixed_iteration)?;
    write_flag(w, config.gauss_seidel)?;
    write_flag(w, config.gauss_seidel_ranked)?;
    write_f64(w, config.relaxation)?;
    write_flag(w, config.debug)?;
    Ok(())
}

/// Reads a settings record written by [`write_settings`] and re-validates it;
/// a record with conflicting flags is rejected, never silently patched.
pub fn read_settings<R: Read>(r: &mut R) -> Result<PolarizationConfig, SettingsError> {
    let lj_cutoff = read_f64(r)?;
    let coulomb_cutoff = read_f64(r)?;
    let offset_flag = read_flag(r)?;
    let tail_flag = read_flag(r)?;
    let iterations_max = read_i32(r)?.max(0) as usize;
    let damping_mode = match read_i32(r)? {
        DAMPING_EXPONENTIAL => DampingMode::Exponential,
        DAMPING_NONE => DampingMode::None,
        other => return Err(SettingsError::UnknownDampingMode(other)),
    };
    let damping_strength = read_f64(r)?;
    let zero_dipole = read_flag(r)?;
    let precision = read_f64(r)?;
    let fixed_iteration = read_flag(r)?;
    let gauss_seidel = read_flag(r)?;
    let gauss_seidel_ranked = read_flag(r)?;
    let relaxation = read_f64(r)?;
    let debug = read_flag(r)?;

    let config = PolarizationConfig {
        lj_cutoff,
        coulomb_cutoff,
        offset_flag,
        tail_flag,
        iterations_max,
        damping_mode,
        damping_strength,
        zero_dipole,
        precision,
        fixed_iteration,
        gauss_seidel,
        gauss_seidel_ranked,
        relaxation,
        use_previous: false,
        debug,
    };
    config.validate()?;
    Ok(config)
}
