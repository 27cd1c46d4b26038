use super::error::EngineError;
use crate::core::models::system::ParticleSystem;

/// Collective ghost-particle synchronization across decomposition boundaries.
///
/// Implementations refresh the ghost region of the system (positions, charges,
/// polarizabilities of boundary-adjacent particles owned by neighboring
/// workers). The call is a blocking barrier: when it returns, every worker's
/// ghost data is current, and only then may ranking metrics or field
/// calculations read it.
pub trait GhostSync {
    fn synchronize(&mut self, system: &mut ParticleSystem) -> Result<(), EngineError>;
}

/// Single-process stand-in: there are no neighbors, so nothing to exchange.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullGhostSync;

impl GhostSync for NullGhostSync {
    fn synchronize(&mut self, _system: &mut ParticleSystem) -> Result<(), EngineError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::particle::Particle;
    use nalgebra::Point3;

    #[test]
    fn null_sync_leaves_the_system_untouched() {
        let mut system = ParticleSystem::new(vec![Particle::new(Point3::origin())]);
        NullGhostSync.synchronize(&mut system).unwrap();
        assert_eq!(system.n_total(), 1);
    }
}
