/// Handle to the reciprocal-space (Ewald) solver collaborator.
///
/// The polarization core itself never evaluates reciprocal-space sums, but the
/// collaborating short-range Coulomb kernel needs the Ewald splitting
/// parameter for its complementary-error-function term, and setup must fail
/// loudly when no solver is attached.
pub trait ReciprocalSpace {
    /// The Ewald splitting parameter in 1/Angstrom.
    fn splitting_parameter(&self) -> f64;
}

/// A reciprocal-space handle with a pre-computed splitting parameter, for
/// tests and single-process runs where the Ewald solver lives elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct FixedSplitting(pub f64);

impl ReciprocalSpace for FixedSplitting {
    #[inline]
    fn splitting_parameter(&self) -> f64 {
        self.0
    }
}
