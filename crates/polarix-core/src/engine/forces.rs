use std::ops::{Add, AddAssign};

use nalgebra::{Matrix3, Vector3};

use super::config::{DampingMode, PolarizationConfig};
use crate::core::geometry::MinimumImage;
use crate::core::models::system::ParticleSystem;
use crate::core::units;

/// The decomposed polarization energy.
///
/// At a converged solve the three terms satisfy the duality
/// `total == -0.5 * sum_i E_static_i . mu_i` within numerical tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PolarizationEnergy {
    /// `0.5 |mu_i|^2 / alpha_i` summed over polarizable particles.
    pub self_energy: f64,
    /// Dipole-charge interaction through the Wolf-shifted kernel.
    pub field: f64,
    /// Dipole-dipole interaction, damped like the field tensor.
    pub dipole_dipole: f64,
}

impl PolarizationEnergy {
    #[inline]
    pub fn total(&self) -> f64 {
        self.self_energy + self.field + self.dipole_dipole
    }
}

impl Add for PolarizationEnergy {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            self_energy: self.self_energy + rhs.self_energy,
            field: self.field + rhs.field,
            dipole_dipole: self.dipole_dipole + rhs.dipole_dipole,
        }
    }
}

impl AddAssign for PolarizationEnergy {
    fn add_assign(&mut self, rhs: Self) {
        self.self_energy += rhs.self_energy;
        self.field += rhs.field;
        self.dipole_dipole += rhs.dipole_dipole;
    }
}

/// One evaluated pair interaction, as handed to an attached tally observer.
#[derive(Debug, Clone, Copy)]
pub struct PairTally {
    pub i: usize,
    pub j: usize,
    /// Charge-dipole plus dipole-dipole energy carried by this pair.
    pub energy: f64,
    /// Force added to particle `i`; particle `j` receives the negation.
    pub force: Vector3<f64>,
    /// Minimum-image displacement from `j` to `i`.
    pub displacement: Vector3<f64>,
}

pub type PairTallyCallback<'a> = Box<dyn Fn(PairTally) + Send + Sync + 'a>;

/// Optional per-pair accounting hook for consumers that need finer grain than
/// the summed energy and virial, such as per-atom stress profiles.
///
/// Without a callback every report is a no-op, so the plain accumulation path
/// pays nothing for the hook.
#[derive(Default)]
pub struct PairTallyReporter<'a> {
    callback: Option<PairTallyCallback<'a>>,
}

impl<'a> PairTallyReporter<'a> {
    pub fn new() -> Self {
        Self { callback: None }
    }

    pub fn with_callback(callback: PairTallyCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, tally: PairTally) {
        if let Some(callback) = &self.callback {
            callback(tally);
        }
    }
}

/// Differentiates a converged dipole configuration into forces and energies.
///
/// Charge-dipole terms use the same Wolf-shifted kernel and molecule-exclusion
/// rule as the static field; dipole-dipole terms use the same damping family
/// as the interaction matrix, taken to force-gradient order with the three
/// increasing-degree damping polynomials, and are deliberately not subject to
/// molecule exclusion.
pub struct PolarizationForceEnergy {
    cutoff_sq: f64,
    f_shift: f64,
    damping_mode: DampingMode,
    damping_strength: f64,
}

impl PolarizationForceEnergy {
    pub fn new(config: &PolarizationConfig) -> Self {
        let cutoff_sq = config.coulomb_cutoff * config.coulomb_cutoff;
        Self {
            cutoff_sq,
            f_shift: -1.0 / cutoff_sq,
            damping_mode: config.damping_mode,
            damping_strength: config.damping_strength,
        }
    }

    /// Adds the polarization force on every local particle into `forces`
    /// (Newton's third law, both members of each pair), and returns the energy
    /// decomposition together with the accumulated virial `sum d (x) f`.
    ///
    /// Coincident pairs are skipped entirely: the interaction matrix saturates
    /// them to a bounded sentinel, and their force limit carries no direction,
    /// so contributing nothing keeps every output finite.
    pub fn accumulate<M: MinimumImage>(
        &self,
        system: &ParticleSystem,
        geometry: &M,
        mu: &[Vector3<f64>],
        forces: &mut [Vector3<f64>],
    ) -> (PolarizationEnergy, Matrix3<f64>) {
        self.accumulate_tallied(system, geometry, mu, forces, &PairTallyReporter::new())
    }

    /// Like [`Self::accumulate`], but additionally reports every evaluated
    /// pair to `tally`: its indices, pairwise energy, the force applied to the
    /// first member, and the displacement the virial contraction uses.
    pub fn accumulate_tallied<M: MinimumImage>(
        &self,
        system: &ParticleSystem,
        geometry: &M,
        mu: &[Vector3<f64>],
        forces: &mut [Vector3<f64>],
        tally: &PairTallyReporter,
    ) -> (PolarizationEnergy, Matrix3<f64>) {
        let particles = system.local();
        let n = particles.len();
        let sqrt_k = units::charge_to_sqrt_energy_length();
        let mut energy = PolarizationEnergy::default();
        let mut virial = Matrix3::zeros();

        for (particle, dipole) in particles.iter().zip(mu) {
            if particle.is_polarizable() {
                energy.self_energy += 0.5 * dipole.norm_squared() / particle.polarizability;
            }
        }

        for i in 0..n {
            for j in (i + 1)..n {
                let (pi, pj) = (&particles[i], &particles[j]);
                let del = geometry.separation(&pi.position, &pj.position);
                let rsq = del.norm_squared();
                if rsq == 0.0 {
                    continue;
                }
                let r = rsq.sqrt();
                let r2_inv = 1.0 / rsq;
                let r3_inv = r2_inv / r;

                let mut pair_force = Vector3::zeros();
                let mut pair_energy = 0.0;

                if rsq < self.cutoff_sq && !pi.excludes(pj) {
                    let outer = del * del.transpose();
                    let gradient = Matrix3::identity() * (1.0 + self.f_shift * rsq)
                        - outer * (3.0 * r2_inv + self.f_shift);
                    let ef_scale = (r2_inv + self.f_shift) / r * sqrt_k;

                    // Dipole on i, charge on j.
                    if pi.is_polarizable() && pj.charge != 0.0 {
                        let common = pj.charge * sqrt_k * r3_inv;
                        pair_force += gradient * mu[i] * common;
                        let e = -mu[i].dot(&(del * (ef_scale * pj.charge)));
                        energy.field += e;
                        pair_energy += e;
                    }
                    // Dipole on j, charge on i.
                    if pj.is_polarizable() && pi.charge != 0.0 {
                        let common = pi.charge * sqrt_k * r3_inv;
                        pair_force -= gradient * mu[j] * common;
                        let e = mu[j].dot(&(del * (ef_scale * pi.charge)));
                        energy.field += e;
                        pair_energy += e;
                    }
                }

                // Dipole-dipole coupling stays active within a molecule.
                if pi.is_polarizable() && pj.is_polarizable() {
                    let r5_inv = r3_inv * r2_inv;
                    let r7_inv = r5_inv * r2_inv;
                    let pdotp = mu[i].dot(&mu[j]);
                    let pidotr = mu[i].dot(&del);
                    let pjdotr = mu[j].dot(&del);

                    match self.damping_mode {
                        DampingMode::None => {
                            let pre1 = 3.0 * r5_inv * pdotp - 15.0 * r7_inv * pidotr * pjdotr;
                            let pre2 = 3.0 * r5_inv * pjdotr;
                            let pre3 = 3.0 * r5_inv * pidotr;
                            pair_force += del * pre1 + mu[i] * pre2 + mu[j] * pre3;
                            let e = r3_inv * pdotp - 3.0 * r5_inv * pidotr * pjdotr;
                            energy.dipole_dipole += e;
                            pair_energy += e;
                        }
                        DampingMode::Exponential => {
                            let a = self.damping_strength;
                            let r_inv = 1.0 / r;
                            let decay = (-a * r).exp();
                            let poly2 = 1.0 + a * r + 0.5 * a * a * rsq;
                            let poly3 = poly2 + a * a * a * rsq * r / 6.0;

                            let pre1 = 3.0 * r5_inv * pdotp * (1.0 - decay * poly2)
                                - 15.0 * r7_inv * pidotr * pjdotr * (1.0 - decay * poly3);
                            let pre2 = 3.0 * r5_inv * pjdotr * (1.0 - decay * poly3);
                            let pre3 = 3.0 * r5_inv * pidotr * (1.0 - decay * poly3);
                            let pre4 = -pdotp
                                * r3_inv
                                * (-decay * (a * r_inv + a * a) + decay * a * poly2 * r_inv);
                            let pre5 = 3.0
                                * pidotr
                                * pjdotr
                                * r5_inv
                                * (-decay * (a * r_inv + a * a + 0.5 * r * a * a * a)
                                    + decay * a * poly3 * r_inv);

                            pair_force += del * (pre1 + pre4 + pre5) + mu[i] * pre2 + mu[j] * pre3;
                            let e = r3_inv * pdotp * (1.0 - decay * poly2)
                                - 3.0 * r5_inv * pidotr * pjdotr * (1.0 - decay * poly3);
                            energy.dipole_dipole += e;
                            pair_energy += e;
                        }
                    }
                }

                forces[i] += pair_force;
                forces[j] -= pair_force;
                virial += del * pair_force.transpose();
                tally.report(PairTally {
                    i,
                    j,
                    energy: pair_energy,
                    force: pair_force,
                    displacement: del,
                });
            }
        }

        (energy, virial)
    }
}
