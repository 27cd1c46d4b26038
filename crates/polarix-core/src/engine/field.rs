use nalgebra::Vector3;

use crate::core::geometry::MinimumImage;
use crate::core::models::system::ParticleSystem;
use crate::core::units;

/// Accumulates each local particle's static electric field from the fixed
/// charges of every other local particle.
///
/// Uses the Wolf-shifted Coulomb kernel: the bare `1/r^2` field is shifted by
/// `f_shift = -1/r_cut^2` so it vanishes smoothly at the cutoff, avoiding a
/// reciprocal-space evaluation for the field itself. Pairs excluded by the
/// molecule rule contribute nothing. The output is scaled once by the square
/// root of the Coulomb constant so that field x charge has energy dimension.
#[derive(Debug, Clone, Copy)]
pub struct StaticFieldCalculator {
    cutoff_sq: f64,
    f_shift: f64,
}

impl StaticFieldCalculator {
    pub fn new(coulomb_cutoff: f64) -> Self {
        Self {
            cutoff_sq: coulomb_cutoff * coulomb_cutoff,
            f_shift: -1.0 / (coulomb_cutoff * coulomb_cutoff),
        }
    }

    /// Overwrites `field[..n_local]` with the static field of each local
    /// particle, in internal (energy-homogeneous) units.
    pub fn accumulate<M: MinimumImage>(
        &self,
        system: &ParticleSystem,
        geometry: &M,
        field: &mut [Vector3<f64>],
    ) {
        let particles = system.local();
        let n = particles.len();
        for f in field[..n].iter_mut() {
            *f = Vector3::zeros();
        }

        for i in 0..n {
            for j in (i + 1)..n {
                let (pi, pj) = (&particles[i], &particles[j]);
                if pi.excludes(pj) {
                    continue;
                }
                let del = geometry.separation(&pi.position, &pj.position);
                let rsq = del.norm_squared();
                if rsq > self.cutoff_sq {
                    continue;
                }
                let r = rsq.sqrt();
                let field_scale = (1.0 / rsq + self.f_shift) / r;
                field[i] += del * (field_scale * pj.charge);
                field[j] -= del * (field_scale * pi.charge);
            }
        }

        let to_internal = units::charge_to_sqrt_energy_length();
        for f in field[..n].iter_mut() {
            *f *= to_internal;
        }
    }
}
