//! Rigid body state and temporal integration.

use crate::collision::VertexImpulse;
use crate::config::SynthesizerConfig;
use crate::error::{ModalSonicError, Result};
use crate::mass_properties::{self, MassProperties};
use crate::material::Material;
use crate::math::{Mat3, Pose, Quat, Vec3, Velocity};
use crate::mesh::Mesh;
use crate::modal::{ModalBasis, ModalSynthesizer, samples_per_tick};

/// A rigid body with a diagonal body-frame inertia tensor.
///
/// The mesh is recentred on its center of mass at construction. Position,
/// orientation and momenta are the primary state; the pose-derived matrices
/// and the velocities are recomputed together every time the primary state
/// changes, so they never go stale.
#[derive(Debug, Clone)]
pub struct RigidBody {
    mesh: Mesh,
    material: Material,
    mass: f32,
    inertia_body: Mat3,
    inertia_body_inv: Mat3,
    pose: Pose,
    linear_momentum: Vec3,
    angular_momentum: Vec3,
    velocity: Velocity,
    synthesizer: Option<ModalSynthesizer>,
}

impl RigidBody {
    /// Integrates `mesh` with `material`'s density and places the body at rest
    /// at the origin.
    pub fn new(mut mesh: Mesh, material: Material) -> Result<Self> {
        if !material.is_valid() {
            return Err(ModalSonicError::Configuration(format!(
                "invalid material {:?}",
                material
            )));
        }
        let MassProperties {
            mass,
            inertia,
            inertia_inv,
            ..
        } = mass_properties::integrate(&mut mesh, material.density)?;

        log::info!(
            "Created rigid body: {} vertices, {} faces, mass {} kg",
            mesh.vertex_count(),
            mesh.face_count(),
            mass
        );

        Ok(Self {
            mesh,
            material,
            mass,
            inertia_body: inertia,
            inertia_body_inv: inertia_inv,
            pose: Pose::identity(inertia_inv),
            linear_momentum: Vec3::ZERO,
            angular_momentum: Vec3::ZERO,
            velocity: Velocity::default(),
            synthesizer: None,
        })
    }

    /// Attaches a modal basis so impacts on this body make sound.
    pub fn with_modes(mut self, basis: ModalBasis, config: SynthesizerConfig) -> Result<Self> {
        if basis.vertex_count() != self.mesh.vertex_count() {
            return Err(ModalSonicError::InvalidModalData(format!(
                "modal basis covers {} vertices but the mesh has {}",
                basis.vertex_count(),
                self.mesh.vertex_count()
            )));
        }
        self.synthesizer = Some(ModalSynthesizer::new(basis, config));
        Ok(self)
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.set_position(position);
        self
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Diagonal body-frame inertia tensor.
    pub fn inertia_body(&self) -> Mat3 {
        self.inertia_body
    }

    pub fn inertia_body_inv(&self) -> Mat3 {
        self.inertia_body_inv
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position()
    }

    pub fn orientation(&self) -> Quat {
        self.pose.orientation()
    }

    pub fn linear_momentum(&self) -> Vec3 {
        self.linear_momentum
    }

    pub fn angular_momentum(&self) -> Vec3 {
        self.angular_momentum
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity.linear
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.velocity.angular
    }

    pub fn synthesizer(&self) -> Option<&ModalSynthesizer> {
        self.synthesizer.as_ref()
    }

    /// Kinetic energy, translational plus rotational.
    pub fn kinetic_energy(&self) -> f32 {
        0.5 * self.linear_momentum.dot(self.velocity.linear)
            + 0.5 * self.angular_momentum.dot(self.velocity.angular)
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.set_pose(position, self.pose.orientation());
    }

    pub fn set_orientation(&mut self, orientation: Quat) {
        self.set_pose(self.pose.position(), orientation);
    }

    pub fn set_momentum(&mut self, linear: Vec3, angular: Vec3) {
        self.linear_momentum = linear;
        self.angular_momentum = angular;
        self.refresh_velocity();
    }

    /// Sets momenta from the desired velocities under the current pose.
    pub fn set_velocity(&mut self, linear: Vec3, angular: Vec3) {
        let inertia_world = self.inertia_world();
        self.set_momentum(linear * self.mass, inertia_world * angular);
    }

    /// Applies a constant force for `dt` seconds through the center of mass.
    pub fn apply_force(&mut self, force: Vec3, dt: f32) {
        self.linear_momentum += force * dt;
        self.refresh_velocity();
    }

    /// Applies an impulse at world offset `r` from the center of mass.
    pub fn apply_impulse(&mut self, r: Vec3, impulse: Vec3) {
        self.linear_momentum += impulse;
        self.angular_momentum += r.cross(impulse);
        self.refresh_velocity();
    }

    /// Advances position and orientation by `dt` using the current velocities.
    ///
    /// The orientation is composed with the rotation `exp(dt/2 · w)` and then
    /// re-normalized.
    pub fn step(&mut self, dt: f32) -> Result<()> {
        check_time_step(dt)?;

        let position = self.pose.position() + dt * self.velocity.linear;

        let w = self.velocity.angular;
        let speed = w.length();
        let increment = if speed > 0.0 {
            Quat::from_axis_angle(w / speed, speed * dt)
        } else {
            Quat::IDENTITY
        };
        let orientation = (increment * self.pose.orientation()).normalize();

        self.set_pose(position, orientation);
        self.check_finite("step")
    }

    /// Re-derives the angular velocity from Euler's rotation equations.
    ///
    /// The gyroscopic terms are discretized semi-implicitly in the body
    /// frame, which keeps fast, torque-free spin stable. The angular momentum
    /// is then re-derived from the new angular velocity.
    pub fn step_w(&mut self, dt: f32) -> Result<()> {
        check_time_step(dt)?;

        let i = Vec3::new(
            self.inertia_body.x_axis.x,
            self.inertia_body.y_axis.y,
            self.inertia_body.z_axis.z,
        );
        let w = self.pose.to_body_direction(self.velocity.angular);

        let system = Mat3::from_cols(
            Vec3::new(i.x / dt, (i.z - i.y) * w.z, 0.0),
            Vec3::new(0.0, i.y / dt, (i.x - i.z) * w.x),
            Vec3::new((i.y - i.x) * w.y, 0.0, i.z / dt),
        )
        .transpose();
        let rhs = i * w / dt;

        let det = system.determinant();
        if !det.is_finite() || det.abs() <= f32::EPSILON * (i.x * i.y * i.z / (dt * dt * dt)) {
            return Err(ModalSonicError::NumericalBlowUp(format!(
                "singular angular velocity system (det {}) for w {:?}",
                det, w
            )));
        }
        let w_body = system.inverse() * rhs;

        self.angular_momentum = self.pose.world_offset(i * w_body);
        self.refresh_velocity();
        self.check_finite("step_w")
    }

    /// Runs this body's modal synthesizer for one tick, adding into `out`.
    ///
    /// A body without modal data produces silence but still reports the
    /// tick's sample count.
    pub fn step_audio(
        &mut self,
        dt: f32,
        impulses: &[VertexImpulse],
        h: f32,
        out: &mut Vec<f32>,
    ) -> Result<usize> {
        let rotation_inv = self.pose.rotation_inv();
        match self.synthesizer.as_mut() {
            Some(synth) => synth.synthesize(dt, impulses, rotation_inv, h, out),
            None => {
                check_time_step(dt)?;
                check_time_step(h)?;
                let samples = samples_per_tick(dt, h);
                if out.len() < samples {
                    out.resize(samples, 0.0);
                }
                Ok(samples)
            }
        }
    }

    fn inertia_world(&self) -> Mat3 {
        let r = self.pose.rotation();
        r * self.inertia_body * self.pose.rotation_inv()
    }

    fn set_pose(&mut self, position: Vec3, orientation: Quat) {
        self.pose = Pose::new(position, orientation, self.inertia_body_inv);
        self.refresh_velocity();
    }

    fn refresh_velocity(&mut self) {
        self.velocity = Velocity::from_momentum(
            self.linear_momentum,
            self.angular_momentum,
            self.mass,
            &self.pose,
        );
    }

    fn check_finite(&self, stage: &str) -> Result<()> {
        if self.velocity.is_finite()
            && self.pose.position().is_finite()
            && self.pose.orientation().is_finite()
        {
            Ok(())
        } else {
            Err(ModalSonicError::NumericalBlowUp(format!(
                "rigid body state became non-finite during {}",
                stage
            )))
        }
    }
}

fn check_time_step(dt: f32) -> Result<()> {
    if dt > 0.0 && dt.is_finite() {
        Ok(())
    } else {
        Err(ModalSonicError::InvalidTimeStep(dt))
    }
}
