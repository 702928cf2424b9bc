use crate::config::ModalBasisOptions;
use crate::error::{ModalSonicError, Result};
use crate::material::Material;
use crate::math::Vec3;

/// Raw modal data as produced by an offline eigen-analysis.
///
/// `shapes` is mode-major: the displacement of vertex `v` in mode `m` is
/// `shapes[m * vertex_count + v]`. Eigenvalues are `ω²` for the reference
/// material at unit scale, with a mass-normalized basis.
#[derive(Debug, Clone)]
pub struct ModalBasisDesc {
    pub eigenvalues: Vec<f32>,
    pub shapes: Vec<Vec3>,
    pub vertex_count: usize,
    /// Material the eigen-analysis was run with
    pub reference: Material,
    /// Rayleigh mass-proportional damping coefficient
    pub alpha: f32,
    /// Rayleigh stiffness-proportional damping coefficient
    pub beta: f32,
}

/// Vibration modes of one body, scaled to its material and size.
///
/// Immutable after construction.
#[derive(Debug, Clone)]
pub struct ModalBasis {
    omega: Vec<f64>,
    shapes: Vec<Vec3>,
    vertex_count: usize,
    alpha: f64,
    beta: f64,
}

impl ModalBasis {
    /// Rescales `desc` to `material` and a uniform geometric `scale`.
    ///
    /// Frequencies follow elastic similarity, `ω ∝ sqrt(E/ρ) / s`, and the
    /// shapes of a mass-normalized basis shrink by `sqrt((ρ/ρ₀)·s³)` as the
    /// body's mass grows.
    pub fn new(
        desc: ModalBasisDesc,
        material: &Material,
        scale: f32,
        options: ModalBasisOptions,
    ) -> Result<Self> {
        if !desc.reference.is_valid() || !material.is_valid() {
            return Err(ModalSonicError::InvalidModalData(format!(
                "invalid material parameters: reference {:?}, body {:?}",
                desc.reference, material
            )));
        }
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(ModalSonicError::InvalidModalData(format!(
                "scale must be positive, got {}",
                scale
            )));
        }
        if let Some((mode, lambda)) = desc
            .eigenvalues
            .iter()
            .enumerate()
            .find(|(_, l)| !(l.is_finite() && **l >= 0.0))
        {
            return Err(ModalSonicError::InvalidModalData(format!(
                "eigenvalue {} of mode {} is negative or not finite",
                lambda, mode
            )));
        }
        if (desc.reference.poisson_ratio - material.poisson_ratio).abs() > 1e-3 {
            log::warn!(
                "Modal basis Poisson ratio {} differs from material's {}; frequencies are only approximate",
                desc.reference.poisson_ratio,
                material.poisson_ratio
            );
        }

        let stiffness_ratio = material.youngs_modulus as f64 / desc.reference.youngs_modulus as f64;
        let density_ratio = material.density as f64 / desc.reference.density as f64;
        let scale = scale as f64;

        let omega = desc
            .eigenvalues
            .iter()
            .map(|&lambda| (lambda as f64 * stiffness_ratio / density_ratio).sqrt() / scale)
            .collect();
        let shape_scale = (1.0 / (density_ratio * scale.powi(3)).sqrt()) as f32;
        let shapes = desc.shapes.iter().map(|&phi| phi * shape_scale).collect();

        let basis = Self::from_frequencies(
            omega,
            shapes,
            desc.vertex_count,
            desc.alpha as f64,
            desc.beta as f64,
        )?;

        let basis = if options.discard_overdamped {
            basis.retain_underdamped()
        } else {
            basis
        };

        log::info!(
            "Loaded modal basis: {} modes over {} vertices ({} underdamped)",
            basis.mode_count(),
            basis.vertex_count(),
            (0..basis.mode_count())
                .filter(|&i| basis.is_underdamped(i))
                .count()
        );

        Ok(basis)
    }

    /// Builds a basis from already-scaled angular frequencies.
    pub fn from_frequencies(
        omega: Vec<f64>,
        shapes: Vec<Vec3>,
        vertex_count: usize,
        alpha: f64,
        beta: f64,
    ) -> Result<Self> {
        if omega.is_empty() || vertex_count == 0 {
            return Err(ModalSonicError::InvalidModalData(
                "modal basis needs at least one mode and one vertex".into(),
            ));
        }
        if shapes.len() != omega.len() * vertex_count {
            return Err(ModalSonicError::InvalidModalData(format!(
                "expected {} shape vectors for {} modes x {} vertices, got {}",
                omega.len() * vertex_count,
                omega.len(),
                vertex_count,
                shapes.len()
            )));
        }
        if omega.iter().any(|w| !(w.is_finite() && *w >= 0.0)) {
            return Err(ModalSonicError::InvalidModalData(
                "angular frequencies must be finite and non-negative".into(),
            ));
        }
        if shapes.iter().any(|phi| !phi.is_finite()) {
            return Err(ModalSonicError::InvalidModalData(
                "mode shapes must be finite".into(),
            ));
        }
        if !(alpha.is_finite() && beta.is_finite() && alpha >= 0.0 && beta >= 0.0) {
            return Err(ModalSonicError::InvalidModalData(format!(
                "Rayleigh coefficients must be finite and non-negative, got alpha {} beta {}",
                alpha, beta
            )));
        }

        Ok(Self {
            omega,
            shapes,
            vertex_count,
            alpha,
            beta,
        })
    }

    fn retain_underdamped(self) -> Self {
        let keep: Vec<usize> = (0..self.mode_count())
            .filter(|&i| self.is_underdamped(i))
            .collect();
        log::debug!(
            "Discarding {} non-underdamped modes",
            self.mode_count() - keep.len()
        );
        let omega = keep.iter().map(|&i| self.omega[i]).collect();
        let shapes = keep
            .iter()
            .flat_map(|&i| self.mode_shape(i).iter().copied())
            .collect();
        Self {
            omega,
            shapes,
            ..self
        }
    }

    pub fn mode_count(&self) -> usize {
        self.omega.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Natural angular frequency of `mode` in rad/s.
    pub fn omega(&self, mode: usize) -> f64 {
        self.omega[mode]
    }

    /// Displacement of every vertex in `mode`.
    pub fn mode_shape(&self, mode: usize) -> &[Vec3] {
        let start = mode * self.vertex_count;
        &self.shapes[start..start + self.vertex_count]
    }

    pub fn shape(&self, mode: usize, vertex: usize) -> Vec3 {
        self.shapes[mode * self.vertex_count + vertex]
    }

    /// Rayleigh damping ratio `ξ = ½(α/ω + β·ω)`.
    pub fn damping_ratio(&self, mode: usize) -> f64 {
        let omega = self.omega[mode];
        0.5 * (self.alpha / omega + self.beta * omega)
    }

    pub fn is_underdamped(&self, mode: usize) -> bool {
        let xi = self.damping_ratio(mode);
        xi > 0.0 && xi < 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(eigenvalues: Vec<f32>, vertex_count: usize) -> ModalBasisDesc {
        let shapes = vec![Vec3::new(0.0, 1.0, 0.0); eigenvalues.len() * vertex_count];
        ModalBasisDesc {
            eigenvalues,
            shapes,
            vertex_count,
            reference: Material::new(1000.0, 1e9, 0.3),
            alpha: 10.0,
            beta: 1e-7,
        }
    }

    #[test]
    fn test_same_material_unit_scale_keeps_frequencies() {
        let reference = Material::new(1000.0, 1e9, 0.3);
        let basis = ModalBasis::new(
            desc(vec![1e6, 4e6], 2),
            &reference,
            1.0,
            ModalBasisOptions::default(),
        )
        .unwrap();

        assert_eq!(basis.mode_count(), 2);
        assert!((basis.omega(0) - 1000.0).abs() < 1e-6);
        assert!((basis.omega(1) - 2000.0).abs() < 1e-6);
        assert!(basis.shape(1, 1).abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn test_rescales_to_material_and_size() {
        // Four times stiffer, same density, half the size: ω doubles twice.
        let material = Material::new(1000.0, 4e9, 0.3);
        let basis = ModalBasis::new(
            desc(vec![1e6], 1),
            &material,
            0.5,
            ModalBasisOptions::default(),
        )
        .unwrap();
        assert!((basis.omega(0) - 4000.0).abs() < 1e-3);

        // Mass shrinks by 1/8, so a mass-normalized shape grows by sqrt(8).
        let expected = 8.0f32.sqrt();
        assert!((basis.shape(0, 0).y - expected).abs() < 1e-4);
    }

    #[test]
    fn test_damping_ratio() {
        let basis =
            ModalBasis::from_frequencies(vec![100.0, 1e9], vec![Vec3::X; 2], 1, 20.0, 1e-8)
                .unwrap();
        // 0.5 * (20/100 + 1e-8 * 100)
        assert!((basis.damping_ratio(0) - 0.1000005).abs() < 1e-9);
        assert!(basis.is_underdamped(0));
        assert!(!basis.is_underdamped(1));
    }

    #[test]
    fn test_overdamped_modes_kept_by_default() {
        let mut d = desc(vec![1e6, 1e20], 1);
        d.beta = 1e-8;
        let material = d.reference;
        let kept = ModalBasis::new(d.clone(), &material, 1.0, ModalBasisOptions::default())
            .unwrap();
        assert_eq!(kept.mode_count(), 2);

        let filtered = ModalBasis::new(
            d,
            &material,
            1.0,
            ModalBasisOptions {
                discard_overdamped: true,
            },
        )
        .unwrap();
        assert_eq!(filtered.mode_count(), 1);
        assert!((filtered.omega(0) - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_mismatched_shapes() {
        let mut d = desc(vec![1.0, 2.0], 3);
        d.shapes.pop();
        let material = d.reference;
        assert!(matches!(
            ModalBasis::new(d, &material, 1.0, ModalBasisOptions::default()),
            Err(ModalSonicError::InvalidModalData(_))
        ));
    }

    #[test]
    fn test_rejects_negative_eigenvalue() {
        let d = desc(vec![-1.0], 1);
        let material = d.reference;
        assert!(ModalBasis::new(d, &material, 1.0, ModalBasisOptions::default()).is_err());
    }
}
