use nalgebra::{Matrix3, Vector3};

use super::config::PolarizationConfig;
use super::error::EngineError;
use super::exchange::GhostSync;
use super::field::StaticFieldCalculator;
use super::forces::{PolarizationEnergy, PolarizationForceEnergy};
use super::observer::{DiagnosticsReporter, SolverEvent};
use super::ranking::DipoleRanker;
use super::recip::ReciprocalSpace;
use super::solver::{InducedDipoleSolver, SolveOutcome, SolverScratch, first_order_guess};
use super::tensor::DipoleFieldMatrix;
use crate::core::geometry::MinimumImage;
use crate::core::models::system::ParticleSystem;

/// Diagnostics and tallies produced by one polarization evaluation.
#[derive(Debug, Clone, Copy)]
pub struct PolarizationReport {
    pub energy: PolarizationEnergy,
    /// Virial tally `sum d (x) f` over all pair interactions.
    pub virial: Matrix3<f64>,
    pub iterations: usize,
    pub converged: bool,
}

/// Owns the per-evaluation state of the polarization solve and drives one
/// force evaluation end to end.
///
/// The dense matrix and every scratch buffer live here, exclusively owned by
/// one evaluation at a time; they are rebuilt from scratch each call and
/// reallocated whenever the local particle count grows. Nothing is shared
/// across evaluations except the induced dipoles, and those only when
/// `use_previous` asks for the carry-over.
pub struct PolarizationEvaluator<M: MinimumImage> {
    config: PolarizationConfig,
    geometry: M,
    splitting_parameter: f64,
    field_calc: StaticFieldCalculator,
    force_calc: PolarizationForceEnergy,
    matrix: DipoleFieldMatrix,
    scratch: SolverScratch,
    ef_static: Vec<Vector3<f64>>,
    mu: Vec<Vector3<f64>>,
    n_local: usize,
}

impl<M: MinimumImage> PolarizationEvaluator<M> {
    /// Sets up an evaluator, failing fast on an invalid configuration or a
    /// missing reciprocal-space collaborator.
    pub fn new(
        config: PolarizationConfig,
        geometry: M,
        recip: Option<&dyn ReciprocalSpace>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let recip = recip.ok_or(EngineError::MissingReciprocalSpace)?;
        let field_calc = StaticFieldCalculator::new(config.coulomb_cutoff);
        let force_calc = PolarizationForceEnergy::new(&config);
        Ok(Self {
            splitting_parameter: recip.splitting_parameter(),
            field_calc,
            force_calc,
            config,
            geometry,
            matrix: DipoleFieldMatrix::new(),
            scratch: SolverScratch::default(),
            ef_static: Vec::new(),
            mu: Vec::new(),
            n_local: 0,
        })
    }

    pub fn config(&self) -> &PolarizationConfig {
        &self.config
    }

    /// The Ewald splitting parameter, re-exported for the collaborating
    /// short-range Coulomb kernel.
    pub fn splitting_parameter(&self) -> f64 {
        self.splitting_parameter
    }

    /// The induced dipoles of the most recent evaluation.
    pub fn induced_dipoles(&self) -> &[Vector3<f64>] {
        &self.mu[..self.n_local]
    }

    /// The static field of the most recent evaluation, in internal units.
    pub fn static_field(&self) -> &[Vector3<f64>] {
        &self.ef_static[..self.n_local]
    }

    /// Runs one full polarization evaluation and adds the resulting forces
    /// into `forces[..n_local]`.
    ///
    /// The ghost exchange barrier completes before anything reads ghost data.
    /// Divergence of the dipole solve is not an error: the report flags it and
    /// the forces are computed from the first-order fallback dipoles.
    pub fn evaluate(
        &mut self,
        system: &mut ParticleSystem,
        sync: &mut dyn GhostSync,
        forces: &mut [Vector3<f64>],
        reporter: &DiagnosticsReporter,
    ) -> Result<PolarizationReport, EngineError> {
        let n = system.n_local();
        if forces.len() < n {
            return Err(EngineError::ForceBufferMismatch {
                expected: n,
                actual: forces.len(),
            });
        }

        // Ghost data must be current before ranking or field sums read it.
        sync.synchronize(system)?;

        if n > self.mu.len() {
            self.mu = vec![Vector3::zeros(); n];
            self.ef_static = vec![Vector3::zeros(); n];
        }
        self.n_local = n;

        self.field_calc
            .accumulate(system, &self.geometry, &mut self.ef_static[..n]);

        if !self.config.use_previous {
            first_order_guess(
                system.local(),
                &self.ef_static[..n],
                self.config.relaxation,
                &mut self.mu[..n],
            );
        }

        let outcome = if self.config.zero_dipole {
            SolveOutcome {
                iterations: 0,
                converged: true,
            }
        } else {
            self.matrix.rebuild(
                system,
                &self.geometry,
                self.config.damping_mode,
                self.config.damping_strength,
            );
            let order: Vec<usize> = if self.config.gauss_seidel_ranked {
                let metrics = DipoleRanker::rank_metrics(system);
                DipoleRanker::ranked_order(&metrics)
            } else {
                (0..n).collect()
            };
            InducedDipoleSolver::new(&self.config).solve(
                &self.matrix,
                system.local(),
                &self.ef_static[..n],
                &order,
                &mut self.scratch,
                &mut self.mu[..n],
                reporter,
            )
        };

        let (energy, virial) =
            self.force_calc
                .accumulate(system, &self.geometry, &self.mu[..n], forces);

        if self.config.debug {
            let dual: f64 = self.ef_static[..n]
                .iter()
                .zip(&self.mu[..n])
                .map(|(e, m)| e.dot(m))
                .sum::<f64>()
                * -0.5;
            reporter.report(SolverEvent::Message(format!(
                "u_polar {:.12e} (duality {:.12e})",
                energy.total(),
                dual
            )));
        }

        Ok(PolarizationReport {
            energy,
            virial,
            iterations: outcome.iterations,
            converged: outcome.converged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::OpenBoundary;
    use crate::core::models::particle::Particle;
    use crate::core::units;
    use crate::engine::exchange::NullGhostSync;
    use crate::engine::recip::FixedSplitting;
    use nalgebra::Point3;

    fn particle(pos: [f64; 3], charge: f64, alpha: f64) -> Particle {
        let mut p = Particle::new(Point3::new(pos[0], pos[1], pos[2]));
        p.charge = charge;
        p.polarizability = alpha;
        p
    }

    fn evaluator(config: PolarizationConfig) -> PolarizationEvaluator<OpenBoundary> {
        PolarizationEvaluator::new(config, OpenBoundary, Some(&FixedSplitting(0.3))).unwrap()
    }

    fn default_config() -> PolarizationConfig {
        PolarizationConfig::builder().lj_cutoff(20.0).build().unwrap()
    }

    #[test]
    fn setup_without_reciprocal_space_solver_fails() {
        let result = PolarizationEvaluator::new(default_config(), OpenBoundary, None);
        assert!(matches!(result, Err(EngineError::MissingReciprocalSpace)));
    }

    #[test]
    fn setup_re_exports_the_splitting_parameter() {
        let eval = evaluator(default_config());
        assert_eq!(eval.splitting_parameter(), 0.3);
    }

    #[test]
    fn undersized_force_buffer_is_rejected() {
        let mut eval = evaluator(default_config());
        let mut system = ParticleSystem::new(vec![
            particle([0.0; 3], 1.0, 1.0),
            particle([5.0, 0.0, 0.0], 0.0, 1.0),
        ]);
        let mut forces = vec![Vector3::zeros(); 1];
        let result = eval.evaluate(
            &mut system,
            &mut NullGhostSync,
            &mut forces,
            &DiagnosticsReporter::new(),
        );
        assert!(matches!(
            result,
            Err(EngineError::ForceBufferMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    /// The reference scenario: a +1 charge and a neutral particle, both with
    /// alpha = 1, 10 length units apart, no damping. The neutral particle's
    /// dipole is the analytic alpha * E_static response, up to the tiny
    /// mutual-induction correction of order (2/r^3)^2.
    #[test]
    fn two_particle_scenario_matches_analytic_response() {
        let mut eval = evaluator(default_config());
        let mut system = ParticleSystem::new(vec![
            particle([0.0; 3], 1.0, 1.0),
            particle([10.0, 0.0, 0.0], 0.0, 1.0),
        ]);
        let mut forces = vec![Vector3::zeros(); 2];
        let report = eval
            .evaluate(
                &mut system,
                &mut NullGhostSync,
                &mut forces,
                &DiagnosticsReporter::new(),
            )
            .unwrap();
        assert!(report.converged);
        assert!(report.iterations <= 8);

        let r: f64 = 10.0;
        let cutoff: f64 = 20.0;
        let e_static =
            (1.0 / (r * r) - 1.0 / (cutoff * cutoff)) / r * r * units::charge_to_sqrt_energy_length();
        let mu = eval.induced_dipoles();
        // Field on the neutral particle points from the positive charge
        // towards it (+x direction of del = x1 - x0).
        assert!((mu[1].x - e_static).abs() < 1e-4 * e_static.abs());
        assert!(mu[1].y.abs() < 1e-12 && mu[1].z.abs() < 1e-12);

        // Exact fixed point including the mutual-induction correction.
        let c = 2.0 / (r * r * r);
        let exact = e_static / (1.0 - c * c);
        assert!((mu[1].x - exact).abs() < 1e-10);

        // The charged particle feels no static field; its dipole is purely
        // induced by the neutral one's dipole and correspondingly tiny.
        assert!(mu[0].norm() < 1e-2 * mu[1].norm());
    }

    #[test]
    fn energy_duality_holds_at_convergence() {
        let mut eval = evaluator(default_config());
        let mut a = particle([0.0, 0.0, 0.0], 0.8, 1.2);
        let mut b = particle([3.0, 1.0, 0.0], -0.5, 0.6);
        a.molecule_id = 1;
        b.molecule_id = 1;
        let mut system = ParticleSystem::new(vec![
            a,
            b,
            particle([-2.0, 2.5, 1.0], 0.4, 1.0),
            particle([1.5, -3.0, 2.0], -0.7, 0.9),
        ]);
        let mut forces = vec![Vector3::zeros(); 4];
        let report = eval
            .evaluate(
                &mut system,
                &mut NullGhostSync,
                &mut forces,
                &DiagnosticsReporter::new(),
            )
            .unwrap();
        assert!(report.converged);

        let dual: f64 = eval
            .static_field()
            .iter()
            .zip(eval.induced_dipoles())
            .map(|(e, m)| e.dot(m))
            .sum::<f64>()
            * -0.5;
        let total = report.energy.total();
        assert!(
            (total - dual).abs() <= 1e-8 * dual.abs(),
            "total {total} vs duality {dual}"
        );
    }

    #[test]
    fn zero_dipole_mode_skips_the_iterative_solve() {
        let config = PolarizationConfig::builder()
            .lj_cutoff(20.0)
            .gauss_seidel_ranked(false)
            .zero_dipole(true)
            .build()
            .unwrap();
        let mut eval = evaluator(config);
        let mut system = ParticleSystem::new(vec![
            particle([0.0; 3], 1.0, 1.0),
            particle([10.0, 0.0, 0.0], 0.0, 1.0),
        ]);
        let mut forces = vec![Vector3::zeros(); 2];
        let report = eval
            .evaluate(
                &mut system,
                &mut NullGhostSync,
                &mut forces,
                &DiagnosticsReporter::new(),
            )
            .unwrap();
        assert_eq!(report.iterations, 0);

        // Dipoles remain the relaxed first-order guess.
        let mu = eval.induced_dipoles();
        let e_static = eval.static_field();
        assert_eq!(mu[1], e_static[1] * 1.03);
    }

    #[test]
    fn forces_are_added_into_the_callers_buffer() {
        let mut eval = evaluator(default_config());
        let mut system = ParticleSystem::new(vec![
            particle([0.0; 3], 1.0, 1.0),
            particle([4.0, 0.0, 0.0], -1.0, 1.0),
        ]);
        let preload = Vector3::new(100.0, 0.0, 0.0);
        let mut forces = vec![preload, Vector3::zeros()];
        eval.evaluate(
            &mut system,
            &mut NullGhostSync,
            &mut forces,
            &DiagnosticsReporter::new(),
        )
        .unwrap();
        // The preloaded contribution survives and the pair forces cancel.
        assert!(((forces[0] - preload) + forces[1]).norm() < 1e-9);
        assert!((forces[0] - preload).norm() > 0.0);
    }

    #[test]
    fn carried_over_dipoles_persist_between_evaluations() {
        let config = PolarizationConfig::builder()
            .lj_cutoff(20.0)
            .use_previous(true)
            .build()
            .unwrap();
        let mut eval = evaluator(config);
        let mut system = ParticleSystem::new(vec![
            particle([0.0; 3], 1.0, 1.0),
            particle([10.0, 0.0, 0.0], 0.0, 1.0),
        ]);
        let mut forces = vec![Vector3::zeros(); 2];
        let first = eval
            .evaluate(
                &mut system,
                &mut NullGhostSync,
                &mut forces,
                &DiagnosticsReporter::new(),
            )
            .unwrap();
        let mu_after_first = eval.induced_dipoles().to_vec();
        let second = eval
            .evaluate(
                &mut system,
                &mut NullGhostSync,
                &mut forces,
                &DiagnosticsReporter::new(),
            )
            .unwrap();
        // Warm-started from the converged dipoles, the second solve needs
        // fewer sweeps and reproduces them.
        assert!(second.iterations <= first.iterations);
        for (before, after) in mu_after_first.iter().zip(eval.induced_dipoles()) {
            assert!((before - after).norm() < 1e-10);
        }
    }

    #[test]
    fn debug_mode_reports_energy_messages() {
        let config = PolarizationConfig::builder()
            .lj_cutoff(20.0)
            .debug(true)
            .build()
            .unwrap();
        let mut eval = evaluator(config);
        let mut system = ParticleSystem::new(vec![
            particle([0.0; 3], 1.0, 1.0),
            particle([5.0, 0.0, 0.0], -1.0, 1.0),
        ]);
        let mut forces = vec![Vector3::zeros(); 2];
        let saw_message = std::sync::atomic::AtomicBool::new(false);
        let reporter = DiagnosticsReporter::with_callback(Box::new(|event| {
            if matches!(event, SolverEvent::Message(_)) {
                saw_message.store(true, std::sync::atomic::Ordering::SeqCst);
            }
        }));
        eval.evaluate(&mut system, &mut NullGhostSync, &mut forces, &reporter)
            .unwrap();
        drop(reporter);
        assert!(saw_message.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn empty_system_evaluates_to_nothing() {
        let mut eval = evaluator(default_config());
        let mut system = ParticleSystem::default();
        let mut forces: Vec<Vector3<f64>> = Vec::new();
        let report = eval
            .evaluate(
                &mut system,
                &mut NullGhostSync,
                &mut forces,
                &DiagnosticsReporter::new(),
            )
            .unwrap();
        assert_eq!(report.energy.total(), 0.0);
        assert!(report.converged);
    }
}
