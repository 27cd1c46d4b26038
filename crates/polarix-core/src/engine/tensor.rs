use nalgebra::{Matrix3, Vector3};

use super::config::DampingMode;
use crate::core::geometry::MinimumImage;
use crate::core::models::system::ParticleSystem;

/// Thole screening factors for the field-level dipole tensor.
///
/// The isotropic `1/r^3` part and the anisotropic `3(d (x) d)/r^5` part are
/// scaled independently by `1 - e^{-ar} P(ar)` with `P` of degree 2 and 3.
#[inline]
pub(crate) fn thole_field_factors(a: f64, r: f64) -> (f64, f64) {
    let ar = a * r;
    let decay = (-ar).exp();
    let isotropic = 1.0 - decay * (0.5 * ar * ar + ar + 1.0);
    let anisotropic = 1.0 - decay * (ar * ar * ar / 6.0 + 0.5 * ar * ar + ar + 1.0);
    (isotropic, anisotropic)
}

/// The dense 3N x 3N dipole interaction matrix.
///
/// Row/column `3i+p` belongs to component `p` of particle `i`. Off-diagonal
/// 3x3 blocks hold the (possibly damped) dipole-field tensor
/// `I/r^3 - 3(d (x) d)/r^5`, with the sign convention that the induced field
/// is `E_i = -sum_j T_ij mu_j`. Diagonal blocks are `(1/alpha_i) I`, or a
/// saturating `f64::MAX` sentinel when `alpha_i = 0`, which pins that
/// particle's dipole at zero.
///
/// Storage is one flat contiguous buffer indexed `(3i+p) * 3N + (3j+q)`.
/// The buffer is reallocated when the particle count grows and rebuilt from
/// scratch every force evaluation; it is never patched incrementally.
#[derive(Debug, Clone, Default)]
pub struct DipoleFieldMatrix {
    data: Vec<f64>,
    n: usize,
}

impl DipoleFieldMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of particles the matrix currently describes.
    #[inline]
    pub fn n_particles(&self) -> usize {
        self.n
    }

    #[inline]
    fn idx(&self, row: usize, col: usize) -> usize {
        row * 3 * self.n + col
    }

    /// The 3x3 block coupling particles `i` and `j`.
    pub fn block(&self, i: usize, j: usize) -> Matrix3<f64> {
        let mut out = Matrix3::zeros();
        for p in 0..3 {
            for q in 0..3 {
                out[(p, q)] = self.data[self.idx(3 * i + p, 3 * j + q)];
            }
        }
        out
    }

    /// `T_ij * v` without materializing the block.
    #[inline]
    pub fn block_mul(&self, i: usize, j: usize, v: &Vector3<f64>) -> Vector3<f64> {
        let base = self.idx(3 * i, 3 * j);
        let stride = 3 * self.n;
        let row = |p: usize| {
            let r = base + p * stride;
            self.data[r] * v.x + self.data[r + 1] * v.y + self.data[r + 2] * v.z
        };
        Vector3::new(row(0), row(1), row(2))
    }

    /// Rebuilds the matrix for the local particles of `system`.
    ///
    /// Only the upper triangle of blocks is computed; each block is mirrored
    /// into its transpose position, which both halves the work and makes the
    /// blockwise symmetry `T_ij == T_ji^T` exact. Coincident positions
    /// saturate the radial factors to a finite sentinel instead of producing
    /// infinities.
    pub fn rebuild<M: MinimumImage>(
        &mut self,
        system: &ParticleSystem,
        geometry: &M,
        damping_mode: DampingMode,
        damping_strength: f64,
    ) {
        let particles = system.local();
        let n = particles.len();
        if n > self.n {
            self.data = vec![0.0; 9 * n * n];
        } else {
            self.data[..9 * n * n].fill(0.0);
        }
        self.n = n;

        for (i, particle) in particles.iter().enumerate() {
            let inv_alpha = if particle.polarizability != 0.0 {
                1.0 / particle.polarizability
            } else {
                f64::MAX
            };
            for p in 0..3 {
                let d = self.idx(3 * i + p, 3 * i + p);
                self.data[d] = inv_alpha;
            }
        }

        for i in 0..n {
            for j in (i + 1)..n {
                let del = geometry.separation(&particles[i].position, &particles[j].position);
                let r = del.norm();
                let (r3_inv, r5_inv) = if r == 0.0 {
                    (f64::MAX, f64::MAX)
                } else {
                    (1.0 / (r * r * r), 1.0 / (r * r * r * r * r))
                };

                let (damp_iso, damp_aniso) = match damping_mode {
                    DampingMode::None => (1.0, 1.0),
                    DampingMode::Exponential => thole_field_factors(damping_strength, r),
                };

                for p in 0..3 {
                    for q in 0..3 {
                        let mut t = -3.0 * del[p] * del[q] * damp_aniso * r5_inv;
                        if p == q {
                            t += damp_iso * r3_inv;
                        }
                        let at = self.idx(3 * i + p, 3 * j + q);
                        self.data[at] = t;
                    }
                }
                for p in 0..3 {
                    for q in 0..3 {
                        let upper = self.idx(3 * i + p, 3 * j + q);
                        let lower = self.idx(3 * j + p, 3 * i + q);
                        self.data[lower] = self.data[upper];
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::OpenBoundary;
    use crate::core::models::particle::Particle;
    use nalgebra::Point3;

    const TOLERANCE: f64 = 1e-12;

    fn polarizable(pos: [f64; 3], alpha: f64) -> Particle {
        let mut p = Particle::new(Point3::new(pos[0], pos[1], pos[2]));
        p.polarizability = alpha;
        p
    }

    fn three_particle_system() -> ParticleSystem {
        ParticleSystem::new(vec![
            polarizable([0.0, 0.0, 0.0], 1.0),
            polarizable([3.0, 1.0, -2.0], 0.5),
            polarizable([-1.0, 4.0, 2.0], 2.0),
        ])
    }

    #[test]
    fn diagonal_blocks_hold_inverse_polarizability() {
        let system = ParticleSystem::new(vec![polarizable([0.0; 3], 0.5)]);
        let mut matrix = DipoleFieldMatrix::new();
        matrix.rebuild(&system, &OpenBoundary, DampingMode::None, 2.1304);
        let block = matrix.block(0, 0);
        assert_eq!(block, Matrix3::identity() * 2.0);
    }

    #[test]
    fn zero_polarizability_diagonal_saturates() {
        let system = ParticleSystem::new(vec![polarizable([0.0; 3], 0.0)]);
        let mut matrix = DipoleFieldMatrix::new();
        matrix.rebuild(&system, &OpenBoundary, DampingMode::None, 2.1304);
        assert_eq!(matrix.block(0, 0)[(1, 1)], f64::MAX);
    }

    #[test]
    fn off_diagonal_blocks_match_dipole_field_tensor() {
        let r = 2.0;
        let system = ParticleSystem::new(vec![
            polarizable([0.0; 3], 1.0),
            polarizable([r, 0.0, 0.0], 1.0),
        ]);
        let mut matrix = DipoleFieldMatrix::new();
        matrix.rebuild(&system, &OpenBoundary, DampingMode::None, 2.1304);
        let block = matrix.block(0, 1);

        // Along the pair axis: 1/r^3 - 3/r^3 = -2/r^3; transverse: +1/r^3.
        let r3 = r * r * r;
        assert!((block[(0, 0)] - -2.0 / r3).abs() < TOLERANCE);
        assert!((block[(1, 1)] - 1.0 / r3).abs() < TOLERANCE);
        assert!((block[(2, 2)] - 1.0 / r3).abs() < TOLERANCE);
        assert!(block[(0, 1)].abs() < TOLERANCE);
    }

    #[test]
    fn blocks_are_transpose_symmetric_for_every_pair() {
        let system = three_particle_system();
        let mut matrix = DipoleFieldMatrix::new();
        matrix.rebuild(&system, &OpenBoundary, DampingMode::Exponential, 2.1304);
        for i in 0..3 {
            for j in 0..3 {
                if i == j {
                    continue;
                }
                let t_ij = matrix.block(i, j);
                let t_ji = matrix.block(j, i);
                assert!((t_ij - t_ji.transpose()).norm() < TOLERANCE);
            }
        }
    }

    #[test]
    fn rebuild_is_bit_identical_for_identical_inputs() {
        let system = three_particle_system();
        let mut first = DipoleFieldMatrix::new();
        let mut second = DipoleFieldMatrix::new();
        first.rebuild(&system, &OpenBoundary, DampingMode::Exponential, 2.1304);
        second.rebuild(&system, &OpenBoundary, DampingMode::Exponential, 2.1304);
        assert_eq!(first.data, second.data);

        // Rebuilding in place must give the same bits as a fresh build.
        first.rebuild(&system, &OpenBoundary, DampingMode::Exponential, 2.1304);
        assert_eq!(first.data, second.data);
    }

    #[test]
    fn coincident_positions_saturate_instead_of_faulting() {
        let system = ParticleSystem::new(vec![polarizable([1.0; 3], 1.0), polarizable([1.0; 3], 1.0)]);
        let mut matrix = DipoleFieldMatrix::new();
        matrix.rebuild(&system, &OpenBoundary, DampingMode::None, 2.1304);
        let block = matrix.block(0, 1);
        for p in 0..3 {
            for q in 0..3 {
                assert!(!block[(p, q)].is_nan());
                assert!(block[(p, q)].is_finite() || block[(p, q)] == f64::MAX);
            }
        }
        assert_eq!(block[(0, 0)], f64::MAX);
    }

    #[test]
    fn damping_weakens_short_range_coupling() {
        let system = ParticleSystem::new(vec![
            polarizable([0.0; 3], 1.0),
            polarizable([1.0, 0.0, 0.0], 1.0),
        ]);
        let mut bare = DipoleFieldMatrix::new();
        let mut damped = DipoleFieldMatrix::new();
        bare.rebuild(&system, &OpenBoundary, DampingMode::None, 2.1304);
        damped.rebuild(&system, &OpenBoundary, DampingMode::Exponential, 2.1304);
        let b = bare.block(0, 1);
        let d = damped.block(0, 1);
        assert!(d[(0, 0)].abs() < b[(0, 0)].abs());
        assert!(d[(1, 1)].abs() < b[(1, 1)].abs());
    }

    #[test]
    fn thole_factors_approach_unity_at_long_range() {
        let (iso, aniso) = thole_field_factors(2.1304, 50.0);
        assert!((iso - 1.0).abs() < 1e-12);
        assert!((aniso - 1.0).abs() < 1e-12);
        let (iso_close, aniso_close) = thole_field_factors(2.1304, 0.1);
        assert!(iso_close < 0.1);
        assert!(aniso_close < iso_close + 1e-12);
    }

    #[test]
    fn block_mul_agrees_with_materialized_block() {
        let system = three_particle_system();
        let mut matrix = DipoleFieldMatrix::new();
        matrix.rebuild(&system, &OpenBoundary, DampingMode::None, 2.1304);
        let v = Vector3::new(0.3, -1.2, 0.7);
        let direct = matrix.block_mul(0, 2, &v);
        let via_block = matrix.block(0, 2) * v;
        assert!((direct - via_block).norm() < TOLERANCE);
    }
}
