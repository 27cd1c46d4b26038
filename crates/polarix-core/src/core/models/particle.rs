use nalgebra::Point3;

/// Identifies the intramolecular group a particle belongs to.
///
/// A value of `0` means the particle is unconstrained and exchanges static
/// field and charge-dipole interactions with every other particle, including
/// other unconstrained ones. A nonzero value groups particles into a molecule:
/// two particles sharing the same nonzero id exchange no static field and no
/// charge-dipole interaction. Dipole-dipole coupling is never excluded.
pub type MoleculeId = u32;

/// A point particle participating in the polarization solve.
///
/// Carries the minimal per-particle data the solver needs: a position, a fixed
/// partial charge, a scalar static polarizability, and the molecule id used by
/// the exclusion rule. Particles with zero polarizability are legal and keep an
/// identically-zero induced dipole throughout.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// The 3D coordinates of the particle in Angstroms.
    pub position: Point3<f64>,
    /// The fixed partial charge in elementary charge units.
    pub charge: f64,
    /// The scalar static polarizability in cubic Angstroms. Must be >= 0.
    pub polarizability: f64,
    /// The intramolecular group id (`0` = unconstrained).
    pub molecule_id: MoleculeId,
}

impl Particle {
    /// Creates a neutral, non-polarizable, unconstrained particle at `position`.
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            charge: 0.0,
            polarizability: 0.0,
            molecule_id: 0,
        }
    }

    /// Whether this particle is polarizable at all.
    #[inline]
    pub fn is_polarizable(&self) -> bool {
        self.polarizability != 0.0
    }

    /// The molecule-exclusion rule for static-field and charge-dipole terms.
    ///
    /// Two particles are excluded from each other exactly when they share the
    /// same nonzero molecule id. Id `0` never excludes anything.
    #[inline]
    pub fn excludes(&self, other: &Particle) -> bool {
        self.molecule_id != 0 && self.molecule_id == other.molecule_id
    }
}
