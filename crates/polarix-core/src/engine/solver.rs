use nalgebra::Vector3;

use super::config::PolarizationConfig;
use super::observer::{DiagnosticsReporter, SolverEvent};
use super::tensor::DipoleFieldMatrix;
use crate::core::models::particle::Particle;

/// Scratch buffers for one induced-dipole solve.
///
/// Owned by the evaluator and reused across force evaluations; reallocated
/// whenever the local particle count grows, never patched in place.
#[derive(Debug, Default)]
pub struct SolverScratch {
    pub(crate) mu_old: Vec<Vector3<f64>>,
    pub(crate) mu_new: Vec<Vector3<f64>>,
    pub(crate) ef_induced: Vec<Vector3<f64>>,
}

impl SolverScratch {
    pub(crate) fn ensure(&mut self, n: usize) {
        if n > self.mu_old.len() {
            self.mu_old = vec![Vector3::zeros(); n];
            self.mu_new = vec![Vector3::zeros(); n];
            self.ef_induced = vec![Vector3::zeros(); n];
        }
    }
}

/// Diagnostic result of one solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveOutcome {
    /// Sweeps actually spent, capped at the configured maximum.
    pub iterations: usize,
    /// False only when the precision criterion was abandoned and the dipoles
    /// were reset to the first-order guess.
    pub converged: bool,
}

/// Fixed-point iterator for the self-consistent dipole system
/// `mu_i = alpha_i (E_static_i + E_induced_i)`.
///
/// Each sweep contracts the current dipoles with the interaction matrix to
/// refresh the induced field, then updates every dipole. Gauss-Seidel modes
/// commit each update immediately so later particles in the same sweep see it;
/// Jacobi holds all updates until the sweep completes. The solver always
/// terminates and always leaves a usable dipole field behind, falling back to
/// the undamped first-order guess `alpha E_static` when the iteration cap is
/// exceeded.
pub struct InducedDipoleSolver<'a> {
    config: &'a PolarizationConfig,
}

impl<'a> InducedDipoleSolver<'a> {
    pub fn new(config: &'a PolarizationConfig) -> Self {
        Self { config }
    }

    /// Runs sweeps until convergence, divergence fallback, or the fixed
    /// iteration count. `mu` holds the initial guess on entry and the final
    /// dipoles on exit; `order` is the sweep visiting order.
    pub fn solve(
        &self,
        matrix: &DipoleFieldMatrix,
        particles: &[Particle],
        ef_static: &[Vector3<f64>],
        order: &[usize],
        scratch: &mut SolverScratch,
        mu: &mut [Vector3<f64>],
        reporter: &DiagnosticsReporter,
    ) -> SolveOutcome {
        let n = particles.len();
        if n == 0 {
            return SolveOutcome {
                iterations: 0,
                converged: true,
            };
        }
        scratch.ensure(n);
        reporter.report(SolverEvent::SolveStart { particles: n });

        if self.config.fixed_iteration {
            return self.solve_fixed(matrix, particles, ef_static, order, scratch, mu, reporter);
        }

        let precision_sq = self.config.precision * self.config.precision;
        let mut iterations = 0;
        loop {
            self.sweep(matrix, particles, ef_static, order, scratch, mu);

            let mut change = 0.0;
            for i in 0..n {
                let d = scratch.mu_new[i] - scratch.mu_old[i];
                change += d.norm_squared();
            }
            change /= n as f64 * 3.0;

            mu[..n].copy_from_slice(&scratch.mu_new[..n]);
            iterations += 1;
            reporter.report(SolverEvent::SweepComplete {
                iteration: iterations,
                change: Some(change),
            });

            if change <= precision_sq {
                reporter.report(SolverEvent::Converged { iterations });
                return SolveOutcome {
                    iterations,
                    converged: true,
                };
            }
            if iterations > self.config.iterations_max {
                self.reset_to_first_order(particles, ef_static, mu);
                reporter.report(SolverEvent::DivergenceFallback {
                    iterations: self.config.iterations_max,
                });
                return SolveOutcome {
                    iterations: self.config.iterations_max,
                    converged: false,
                };
            }
        }
    }

    fn solve_fixed(
        &self,
        matrix: &DipoleFieldMatrix,
        particles: &[Particle],
        ef_static: &[Vector3<f64>],
        order: &[usize],
        scratch: &mut SolverScratch,
        mu: &mut [Vector3<f64>],
        reporter: &DiagnosticsReporter,
    ) -> SolveOutcome {
        let n = particles.len();
        if self.config.iterations_max == 0 {
            // Zero sweeps requested: hand back the plain first-order dipoles,
            // exactly as the divergence path would, but without a warning.
            self.reset_to_first_order(particles, ef_static, mu);
            return SolveOutcome {
                iterations: 0,
                converged: true,
            };
        }
        for iteration in 1..=self.config.iterations_max {
            self.sweep(matrix, particles, ef_static, order, scratch, mu);
            mu[..n].copy_from_slice(&scratch.mu_new[..n]);
            reporter.report(SolverEvent::SweepComplete {
                iteration,
                change: None,
            });
        }
        SolveOutcome {
            iterations: self.config.iterations_max,
            converged: true,
        }
    }

    /// One sweep over all particles in visiting order.
    fn sweep(
        &self,
        matrix: &DipoleFieldMatrix,
        particles: &[Particle],
        ef_static: &[Vector3<f64>],
        order: &[usize],
        scratch: &mut SolverScratch,
        mu: &mut [Vector3<f64>],
    ) {
        let n = particles.len();
        let commit_in_sweep = self.config.commits_in_sweep();
        for i in 0..n {
            scratch.mu_old[i] = mu[i];
            scratch.ef_induced[i] = Vector3::zeros();
        }

        for &index in order {
            let mut induced = Vector3::zeros();
            for j in 0..n {
                if j != index {
                    induced -= matrix.block_mul(index, j, &mu[j]);
                }
            }
            scratch.ef_induced[index] = induced;
            scratch.mu_new[index] = (ef_static[index] + induced) * particles[index].polarizability;
            if commit_in_sweep {
                mu[index] = scratch.mu_new[index];
            }
        }
    }

    fn reset_to_first_order(
        &self,
        particles: &[Particle],
        ef_static: &[Vector3<f64>],
        mu: &mut [Vector3<f64>],
    ) {
        for (i, particle) in particles.iter().enumerate() {
            mu[i] = ef_static[i] * particle.polarizability;
        }
    }
}

/// The initial dipole guess `gamma alpha E_static`, with `gamma` the
/// configured relaxation overshoot.
pub fn first_order_guess(
    particles: &[Particle],
    ef_static: &[Vector3<f64>],
    relaxation: f64,
    mu: &mut [Vector3<f64>],
) {
    for (i, particle) in particles.iter().enumerate() {
        mu[i] = ef_static[i] * (particle.polarizability * relaxation);
    }
}
