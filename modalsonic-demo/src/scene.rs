//! Procedural demo scene: a few boxes dropped into a room-sized box.

use anyhow::Result;
use modalsonic::{
    Boundary, Material, Mesh, ModalBasis, ModalBasisDesc, ModalBasisOptions, ModalSonicWorld,
    ModalSonicWorldDesc, Quat, RigidBody, SynthesizerConfig, Vec3,
};

/// Natural frequencies in Hz of the synthetic unit-size steel basis
const UNIT_FREQUENCIES: [f32; 6] = [62.0, 97.0, 141.0, 188.0, 263.0, 349.0];

/// Rayleigh damping shared by every body
const ALPHA: f32 = 2.0;
const BETA: f32 = 3e-8;

struct BodySpec {
    half_extents: Vec3,
    scale: f32,
    position: Vec3,
    orientation: Quat,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
}

pub fn build_world(desc: ModalSonicWorldDesc, material: Material) -> Result<ModalSonicWorld> {
    let room = Boundary::new(Vec3::new(-1.5, 0.0, -1.0), Vec3::new(1.5, 2.5, 1.0))?;
    let mut world = ModalSonicWorld::new(desc, room)?;

    let specs = [
        BodySpec {
            half_extents: Vec3::splat(0.5),
            scale: 0.12,
            position: Vec3::new(-0.6, 1.8, 0.0),
            orientation: Quat::from_rotation_z(0.4) * Quat::from_rotation_x(0.25),
            linear_velocity: Vec3::new(1.2, 0.0, 0.3),
            angular_velocity: Vec3::new(0.0, 2.0, 4.0),
        },
        BodySpec {
            half_extents: Vec3::new(0.5, 0.15, 0.3),
            scale: 0.3,
            position: Vec3::new(0.7, 1.2, 0.2),
            orientation: Quat::from_rotation_y(0.9) * Quat::from_rotation_x(-0.3),
            linear_velocity: Vec3::new(-0.8, 1.5, -0.2),
            angular_velocity: Vec3::new(3.0, 0.0, -1.0),
        },
    ];

    for spec in &specs {
        let body = build_body(spec, material)?;
        let id = world.add_body(body);
        log::info!(
            "{}: {:?} box, scale {} m",
            id,
            spec.half_extents * 2.0,
            spec.scale
        );
    }

    Ok(world)
}

fn build_body(spec: &BodySpec, material: Material) -> Result<RigidBody> {
    let mesh = Mesh::cuboid(spec.half_extents).scaled(spec.scale);
    let basis = ModalBasis::new(
        synthetic_basis(&Mesh::cuboid(spec.half_extents)),
        &material,
        spec.scale,
        ModalBasisOptions::default(),
    )?;

    let mut body = RigidBody::new(mesh, material)?
        .with_modes(basis, SynthesizerConfig::all())?
        .with_position(spec.position);
    body.set_orientation(spec.orientation);
    body.set_velocity(spec.linear_velocity, spec.angular_velocity);
    Ok(body)
}

/// Mass-normalized modes of a unit-scale steel box, shaped from the corner
/// directions with a sign pattern that differs per mode.
fn synthetic_basis(unit_mesh: &Mesh) -> ModalBasisDesc {
    let reference = Material::STEEL;
    let volume: f32 = unit_mesh
        .triangles()
        .map(|[a, b, c]| a.dot(b.cross(c)) / 6.0)
        .sum();
    let amplitude = 1.0 / (reference.density * volume).sqrt();

    let vertex_count = unit_mesh.vertex_count();
    let shapes = (0..UNIT_FREQUENCIES.len())
        .flat_map(|mode| {
            unit_mesh.vertices().iter().enumerate().map(move |(v, corner)| {
                let sign = if ((v & (mode + 1)).count_ones() % 2) == 0 {
                    1.0
                } else {
                    -1.0
                };
                let axis = match mode % 3 {
                    0 => Vec3::new(corner.y, corner.x, 0.0),
                    1 => Vec3::new(0.0, corner.z, corner.y),
                    _ => Vec3::new(corner.z, 0.0, corner.x),
                };
                sign * amplitude * axis.normalize_or_zero()
            })
        })
        .collect();

    ModalBasisDesc {
        eigenvalues: UNIT_FREQUENCIES
            .iter()
            .map(|f| (std::f32::consts::TAU * f).powi(2))
            .collect(),
        shapes,
        vertex_count,
        reference,
        alpha: ALPHA,
        beta: BETA,
    }
}
