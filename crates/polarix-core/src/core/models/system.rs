use super::particle::Particle;

/// The particle store for one spatial-decomposition worker.
///
/// The first `n_local` particles are owned by this worker; everything after
/// them is a ghost copy of a boundary-adjacent particle owned by a neighboring
/// worker. Forces, fields and induced dipoles are only ever computed for the
/// local range, while ranking metrics also read ghost data. Ghosts are
/// refreshed by a [`GhostSync`](crate::engine::exchange::GhostSync)
/// collaborator before each evaluation.
#[derive(Debug, Clone, Default)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
    n_local: usize,
}

impl ParticleSystem {
    /// Creates a system owning all of the given particles, with no ghosts.
    pub fn new(local: Vec<Particle>) -> Self {
        let n_local = local.len();
        Self {
            particles: local,
            n_local,
        }
    }

    /// Creates a system with an explicit local/ghost split.
    pub fn with_ghosts(local: Vec<Particle>, ghosts: Vec<Particle>) -> Self {
        let n_local = local.len();
        let mut particles = local;
        particles.extend(ghosts);
        Self { particles, n_local }
    }

    /// Number of particles owned by this worker.
    #[inline]
    pub fn n_local(&self) -> usize {
        self.n_local
    }

    /// Number of particles visible to this worker, ghosts included.
    #[inline]
    pub fn n_total(&self) -> usize {
        self.particles.len()
    }

    /// The locally-owned particles.
    #[inline]
    pub fn local(&self) -> &[Particle] {
        &self.particles[..self.n_local]
    }

    /// All particles, ghosts included.
    #[inline]
    pub fn all(&self) -> &[Particle] {
        &self.particles
    }

    /// Replaces the ghost region, keeping local particles untouched.
    pub fn set_ghosts(&mut self, ghosts: Vec<Particle>) {
        self.particles.truncate(self.n_local);
        self.particles.extend(ghosts);
    }

    /// Mutable access to the locally-owned particles.
    #[inline]
    pub fn local_mut(&mut self) -> &mut [Particle] {
        &mut self.particles[..self.n_local]
    }
}
