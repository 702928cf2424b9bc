//! Math types for ModalSonic

pub use glam::{Mat3, Quat, Vec3};

/// Position and orientation of a rigid body together with every quantity
/// derived from the orientation.
///
/// The rotation matrix, its inverse and the world-frame inverse inertia are
/// computed in [`Pose::new`] and never touched independently, so a `Pose` is
/// always internally consistent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    position: Vec3,
    orientation: Quat,
    rotation: Mat3,
    rotation_inv: Mat3,
    inertia_inv: Mat3,
}

impl Pose {
    /// Builds a pose from a position, an orientation (re-normalized here) and
    /// the body-frame inverse inertia tensor.
    pub fn new(position: Vec3, orientation: Quat, body_inertia_inv: Mat3) -> Self {
        let orientation = orientation.normalize();
        let rotation = Mat3::from_quat(orientation);
        let rotation_inv = rotation.transpose();
        Self {
            position,
            orientation,
            rotation,
            rotation_inv,
            inertia_inv: rotation * body_inertia_inv * rotation_inv,
        }
    }

    pub fn identity(body_inertia_inv: Mat3) -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY, body_inertia_inv)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    /// Body-to-world rotation `R`.
    pub fn rotation(&self) -> Mat3 {
        self.rotation
    }

    /// World-to-body rotation `Rᵗ`.
    pub fn rotation_inv(&self) -> Mat3 {
        self.rotation_inv
    }

    /// World-frame inverse inertia `R·IBodyInv·Rᵗ`.
    pub fn inertia_inv(&self) -> Mat3 {
        self.inertia_inv
    }

    /// Offset of a body-frame point from the center of mass, in world axes.
    pub fn world_offset(&self, body_point: Vec3) -> Vec3 {
        self.rotation * body_point
    }

    pub fn to_world(&self, body_point: Vec3) -> Vec3 {
        self.position + self.world_offset(body_point)
    }

    pub fn to_body_direction(&self, world_direction: Vec3) -> Vec3 {
        self.rotation_inv * world_direction
    }
}

/// Linear and angular velocity derived from momenta.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity {
    pub linear: Vec3,
    pub angular: Vec3,
}

impl Velocity {
    /// `v = P/m`, `w = IInv·L`.
    pub fn from_momentum(
        linear_momentum: Vec3,
        angular_momentum: Vec3,
        mass: f32,
        pose: &Pose,
    ) -> Self {
        Self {
            linear: linear_momentum / mass,
            angular: pose.inertia_inv() * angular_momentum,
        }
    }

    /// Velocity of a point at world offset `r` from the center of mass.
    pub fn at_offset(&self, r: Vec3) -> Vec3 {
        self.linear + self.angular.cross(r)
    }

    pub fn is_finite(&self) -> bool {
        self.linear.is_finite() && self.angular.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_derived_fields_agree() {
        let inertia_inv = Mat3::from_diagonal(Vec3::new(1.0, 2.0, 4.0));
        let pose = Pose::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_2),
            inertia_inv,
        );

        let r = pose.rotation() * pose.rotation_inv();
        assert!(r.abs_diff_eq(Mat3::IDENTITY, 1e-6));

        // A quarter turn about z swaps the x and y principal axes.
        let world_inv = pose.inertia_inv();
        assert!((world_inv.x_axis.x - 2.0).abs() < 1e-5);
        assert!((world_inv.y_axis.y - 1.0).abs() < 1e-5);
        assert!((world_inv.z_axis.z - 4.0).abs() < 1e-5);

        let p = pose.to_world(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::new(1.0, 3.0, 3.0), 1e-6));
    }

    #[test]
    fn test_pose_normalizes_orientation() {
        let pose = Pose::new(
            Vec3::ZERO,
            Quat::from_xyzw(0.0, 0.0, 0.0, 3.0),
            Mat3::IDENTITY,
        );
        assert!((pose.orientation().length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_point_velocity() {
        let velocity = Velocity {
            linear: Vec3::new(1.0, 0.0, 0.0),
            angular: Vec3::new(0.0, 0.0, 2.0),
        };
        let v = velocity.at_offset(Vec3::new(1.0, 0.0, 0.0));
        assert!(v.abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), 1e-6));
    }
}
