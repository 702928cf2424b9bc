//! Volume, center of mass and inertia of a closed triangle mesh.
//!
//! Each face and the origin span a signed tetrahedron; summing the
//! tetrahedra's moments over a closed surface yields the moments of the
//! enclosed solid (divergence theorem). Zeroth and first order moments use
//! the closed-form tetrahedron integrals; second order moments use the
//! single-pass polyhedral formulas of Eberly's "Polyhedral Mass Properties".
//!
//! The inertia tensor is kept diagonal. Meshes must already be aligned with
//! their principal axes; the products of inertia are computed only so the
//! caller can be warned when that precondition does not hold.

use crate::error::{ModalSonicError, Result};
use crate::math::{Mat3, Vec3};
use crate::mesh::Mesh;

/// Relative size above which discarded products of inertia are reported.
const PRODUCT_OF_INERTIA_TOLERANCE: f32 = 1e-3;

/// Volume integrals of `x²`, `y²`, `z²`, `xy`, `yz`, `xz`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SecondMoments {
    pub xx: f32,
    pub yy: f32,
    pub zz: f32,
    pub xy: f32,
    pub yz: f32,
    pub xz: f32,
}

impl SecondMoments {
    fn scaled(self, s: f32) -> Self {
        Self {
            xx: self.xx * s,
            yy: self.yy * s,
            zz: self.zz * s,
            xy: self.xy * s,
            yz: self.yz * s,
            xz: self.xz * s,
        }
    }
}

impl std::ops::AddAssign for SecondMoments {
    fn add_assign(&mut self, rhs: Self) {
        self.xx += rhs.xx;
        self.yy += rhs.yy;
        self.zz += rhs.zz;
        self.xy += rhs.xy;
        self.yz += rhs.yz;
        self.xz += rhs.xz;
    }
}

/// Result of integrating a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassProperties {
    /// Signed volume; negative when faces are wound inward
    pub signed_volume: f32,
    /// Center of mass of the mesh as it was given, before recentring
    pub center_of_mass: Vec3,
    pub mass: f32,
    /// Second moments about the center of mass, sign-corrected for winding
    pub moments: SecondMoments,
    /// Diagonal body-frame inertia tensor
    pub inertia: Mat3,
    pub inertia_inv: Mat3,
    /// Products of inertia `(Ixy, Iyz, Ixz)` that were dropped from `inertia`
    pub discarded_products: Vec3,
}

/// Signed volume of the tetrahedron spanned by a face and the origin.
fn signed_volume(tri: &[Vec3; 3]) -> f32 {
    tri[0].dot(tri[1].cross(tri[2])) / 6.0
}

/// `∫ c^pow dV` over a face tetrahedron, where `c` is coordinate `axis`.
///
/// `pow` is 0 (volume) or 1 (first moment).
fn signed_moment(tri: &[Vec3; 3], axis: usize, pow: u32) -> f32 {
    let volume = signed_volume(tri);
    match pow {
        0 => volume,
        _ => 0.25 * (tri[0][axis] + tri[1][axis] + tri[2][axis]) * volume,
    }
}

/// Second order moments contributed by one face.
fn signed_second_moments(tri: &[Vec3; 3]) -> SecondMoments {
    let [v0, v1, v2] = *tri;
    let delta = (v1 - v0).cross(v2 - v0);

    let mut f1 = [0.0f32; 3];
    let mut f2 = [0.0f32; 3];
    let mut f3 = [0.0f32; 3];
    let mut g = [[0.0f32; 3]; 3];
    for w in 0..3 {
        let (w0, w1, w2) = (v0[w], v1[w], v2[w]);
        f1[w] = w0 + w1 + w2;
        f2[w] = w0 * w0 + w1 * (w0 + w1) + w2 * f1[w];
        f3[w] = w0 * w0 * w0 + w1 * (w0 * w0 + w0 * w1 + w1 * w1) + w2 * f2[w];
        for (i, vertex) in tri.iter().enumerate() {
            let wi = vertex[w];
            g[i][w] = f2[w] + wi * (f1[w] + wi);
        }
    }

    let (x, y, z) = (0, 1, 2);
    SecondMoments {
        xx: delta.x * f3[x] / 60.0,
        yy: delta.y * f3[y] / 60.0,
        zz: delta.z * f3[z] / 60.0,
        xy: delta.x * (v0.y * g[0][x] + v1.y * g[1][x] + v2.y * g[2][x]) / 120.0,
        yz: delta.y * (v0.z * g[0][y] + v1.z * g[1][y] + v2.z * g[2][y]) / 120.0,
        xz: delta.z * (v0.x * g[0][z] + v1.x * g[1][z] + v2.x * g[2][z]) / 120.0,
    }
}

/// Signed volume and first moments `(∫x, ∫y, ∫z)` of the solid.
pub fn first_moments(mesh: &Mesh) -> (f32, Vec3) {
    mesh.triangles()
        .fold((0.0, Vec3::ZERO), |(volume, first), tri| {
            (
                volume + signed_moment(&tri, 0, 0),
                first
                    + Vec3::new(
                        signed_moment(&tri, 0, 1),
                        signed_moment(&tri, 1, 1),
                        signed_moment(&tri, 2, 1),
                    ),
            )
        })
}

/// Second moments of the solid about the coordinate origin.
pub fn second_moments(mesh: &Mesh) -> SecondMoments {
    let mut moments = SecondMoments::default();
    for tri in mesh.triangles() {
        moments += signed_second_moments(&tri);
    }
    moments
}

/// Integrates `mesh`, translating it so its center of mass sits at the origin.
///
/// Fails on a non-positive density or when the enclosed volume is too small to
/// define a center of mass.
pub fn integrate(mesh: &mut Mesh, density: f32) -> Result<MassProperties> {
    if !(density > 0.0 && density.is_finite()) {
        return Err(ModalSonicError::Configuration(format!(
            "density must be positive, got {}",
            density
        )));
    }

    let (signed_volume, first) = first_moments(mesh);
    let extent = bounding_extent(mesh);
    if !signed_volume.is_finite() || signed_volume.abs() <= 1e-6 * extent.powi(3) {
        return Err(ModalSonicError::DegenerateGeometry(format!(
            "integrated volume {} is too small for a mesh of extent {}",
            signed_volume, extent
        )));
    }

    let center_of_mass = first / signed_volume;
    mesh.translate(-center_of_mass);

    // Inward-wound meshes integrate to negated moments.
    let moments = second_moments(mesh).scaled(signed_volume.signum());
    let mass = density * signed_volume.abs();

    let diagonal = Vec3::new(
        density * (moments.yy + moments.zz),
        density * (moments.zz + moments.xx),
        density * (moments.xx + moments.yy),
    );
    if !(diagonal.is_finite() && diagonal.min_element() > 0.0) {
        return Err(ModalSonicError::DegenerateGeometry(format!(
            "principal moments of inertia {:?} are not positive",
            diagonal
        )));
    }

    let discarded_products = Vec3::new(
        density * moments.xy,
        density * moments.yz,
        density * moments.xz,
    );
    if discarded_products.abs().max_element()
        > PRODUCT_OF_INERTIA_TOLERANCE * diagonal.max_element()
    {
        log::warn!(
            "Mesh is not aligned with its principal axes; discarding products of inertia {:?}",
            discarded_products
        );
    }

    log::debug!(
        "Mass properties: volume {}, mass {}, center of mass {:?}, inertia {:?}",
        signed_volume,
        mass,
        center_of_mass,
        diagonal
    );

    Ok(MassProperties {
        signed_volume,
        center_of_mass,
        mass,
        moments,
        inertia: Mat3::from_diagonal(diagonal),
        inertia_inv: Mat3::from_diagonal(diagonal.recip()),
        discarded_products,
    })
}

fn bounding_extent(mesh: &Mesh) -> f32 {
    let (min, max) = mesh.vertices().iter().fold(
        (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
        |(min, max), v| (min.min(*v), max.max(*v)),
    );
    (max - min).max_element()
}
