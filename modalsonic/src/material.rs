//! Physical material properties of a rigid body.
//!
//! A material only matters twice: its density sets the body's mass and
//! inertia, and together with Young's modulus it rescales a modal basis that
//! was computed for some reference material.

/// Elastic material parameters.
///
/// # Example
///
/// ```
/// use modalsonic::material::Material;
///
/// let steel = Material::STEEL;
/// let custom = Material::new(7800.0, 200e9, 0.3);
/// assert!(custom.density < steel.density);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Mass density in kg/m³
    pub density: f32,
    /// Young's modulus in Pa
    pub youngs_modulus: f32,
    /// Poisson ratio (dimensionless)
    pub poisson_ratio: f32,
}

impl Material {
    pub const STEEL: Self = Self {
        density: 8940.0,
        youngs_modulus: 123.4e9,
        poisson_ratio: 0.34,
    };

    pub const CERAMIC: Self = Self {
        density: 2700.0,
        youngs_modulus: 72e9,
        poisson_ratio: 0.19,
    };

    pub const GLASS: Self = Self {
        density: 2700.0,
        youngs_modulus: 62e9,
        poisson_ratio: 0.20,
    };

    pub const PLASTIC: Self = Self {
        density: 1200.0,
        youngs_modulus: 2.4e9,
        poisson_ratio: 0.37,
    };

    pub fn new(density: f32, youngs_modulus: f32, poisson_ratio: f32) -> Self {
        Self {
            density,
            youngs_modulus,
            poisson_ratio,
        }
    }

    /// Looks up a preset by name, case-insensitively.
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "steel" => Some(Self::STEEL),
            "ceramic" => Some(Self::CERAMIC),
            "glass" => Some(Self::GLASS),
            "plastic" => Some(Self::PLASTIC),
            _ => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.density > 0.0
            && self.density.is_finite()
            && self.youngs_modulus > 0.0
            && self.youngs_modulus.is_finite()
            && (-1.0..0.5).contains(&self.poisson_ratio)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::STEEL
    }
}
