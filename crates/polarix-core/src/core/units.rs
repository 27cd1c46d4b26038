/// Coulomb's constant in kcal·Å/(mol·e²).
pub const COULOMB_CONSTANT: f64 = 332.0637;

/// Conversion applied once to raw Coulombic fields so that field × charge has
/// energy dimension. Working in these Gaussian-like internal units keeps the
/// dipole formulas free of repeated unit factors.
#[inline]
pub fn charge_to_sqrt_energy_length() -> f64 {
    COULOMB_CONSTANT.sqrt()
}
