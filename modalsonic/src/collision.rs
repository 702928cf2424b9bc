//! Vertex-versus-boundary collision detection and sequential impulses.

use crate::body::RigidBody;
use crate::error::{ModalSonicError, Result};
use crate::math::Vec3;

/// An impulse delivered to one mesh vertex, in world axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexImpulse {
    pub vertex: usize,
    pub impulse: Vec3,
}

/// One of the six planes of an axis-aligned boundary box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wall {
    XMin,
    XMax,
    YMin,
    YMax,
    ZMin,
    ZMax,
}

impl Wall {
    /// Unit normal pointing into the box.
    pub fn normal(self) -> Vec3 {
        match self {
            Wall::XMin => Vec3::X,
            Wall::XMax => Vec3::NEG_X,
            Wall::YMin => Vec3::Y,
            Wall::YMax => Vec3::NEG_Y,
            Wall::ZMin => Vec3::Z,
            Wall::ZMax => Vec3::NEG_Z,
        }
    }
}

/// Static axis-aligned box the bodies are confined to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    min: Vec3,
    max: Vec3,
}

impl Boundary {
    pub fn new(min: Vec3, max: Vec3) -> Result<Self> {
        if !(min.is_finite() && max.is_finite() && min.cmplt(max).all()) {
            return Err(ModalSonicError::Configuration(format!(
                "boundary min {:?} must be strictly below max {:?}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    /// Cube of half-width `half_extent` centered at the origin.
    pub fn centered_cube(half_extent: f32) -> Result<Self> {
        Self::new(Vec3::splat(-half_extent), Vec3::splat(half_extent))
    }

    pub fn min(&self) -> Vec3 {
        self.min
    }

    pub fn max(&self) -> Vec3 {
        self.max
    }

    /// True when `p` lies inside the box or on one of its walls.
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Earliest wall that a point at `p` moving with velocity `v` reaches
    /// before `t_max`.
    ///
    /// Only the wall the point moves towards is considered on each axis. A
    /// point already past that wall reports a negative hit time, so deeper
    /// penetrations are resolved first.
    pub fn hit_test(&self, p: Vec3, v: Vec3, t_max: f32) -> Option<(Wall, f32)> {
        let walls = [
            (Wall::XMin, Wall::XMax),
            (Wall::YMin, Wall::YMax),
            (Wall::ZMin, Wall::ZMax),
        ];

        let mut best: Option<(Wall, f32)> = None;
        let mut earliest = t_max;
        for (axis, (low, high)) in walls.into_iter().enumerate() {
            let (wall, t) = if v[axis] > 0.0 {
                (high, (self.max[axis] - p[axis]) / v[axis])
            } else if v[axis] < 0.0 {
                (low, (self.min[axis] - p[axis]) / v[axis])
            } else {
                continue;
            };
            if t < earliest {
                earliest = t;
                best = Some((wall, t));
            }
        }
        best
    }
}

/// A single resolved contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    pub wall: Wall,
    /// Time into the tick at which the contact was found (negative when the
    /// vertex had already crossed the wall)
    pub time: f32,
    pub impulse: VertexImpulse,
}

/// Everything the resolver did to a body during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub impacts: Vec<Impact>,
    /// True when the loop was cut off before every contact was resolved
    pub iteration_limit_hit: bool,
}

impl Resolution {
    /// The tick's impulses, in the order they were applied.
    pub fn impulses(&self) -> Vec<VertexImpulse> {
        self.impacts.iter().map(|impact| impact.impulse).collect()
    }
}

/// Resolver progress within a tick.
enum ResolveState {
    Scanning,
    CollisionFound(Contact),
    Done,
}

struct Contact {
    vertex: usize,
    wall: Wall,
    time: f32,
    /// World offset of the vertex from the center of mass
    offset: Vec3,
    velocity: Vec3,
}

/// Greedy sequential-impulse resolver against a static [`Boundary`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResolver {
    boundary: Boundary,
    restitution: f32,
    max_iterations: usize,
}

impl CollisionResolver {
    pub fn new(boundary: Boundary, restitution: f32, max_iterations: usize) -> Self {
        Self {
            boundary,
            restitution,
            max_iterations,
        }
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Resolves every vertex contact that happens within the next `dt`
    /// seconds, earliest first, updating the body's momenta after each one.
    ///
    /// Contacts take no time, so every scan looks across the full `dt`. The
    /// loop stops after `max_iterations` impulses even if contacts remain.
    pub fn resolve(&self, body: &mut RigidBody, dt: f32) -> Resolution {
        let mut resolution = Resolution::default();
        let mut state = ResolveState::Scanning;

        loop {
            state = match state {
                ResolveState::Scanning => match self.earliest_contact(body, dt) {
                    Some(contact) => ResolveState::CollisionFound(contact),
                    None => ResolveState::Done,
                },
                ResolveState::CollisionFound(contact) => {
                    if resolution.impacts.len() >= self.max_iterations {
                        resolution.iteration_limit_hit = true;
                        log::warn!(
                            "Collision loop stopped after {} impulses; vertex {} still hits {:?}",
                            self.max_iterations,
                            contact.vertex,
                            contact.wall
                        );
                        ResolveState::Done
                    } else {
                        resolution.impacts.push(self.apply_impulse(body, &contact));
                        ResolveState::Scanning
                    }
                }
                ResolveState::Done => break,
            };
        }

        resolution
    }

    fn earliest_contact(&self, body: &RigidBody, dt: f32) -> Option<Contact> {
        let pose = body.pose();
        let mut earliest: Option<Contact> = None;

        for (vertex, &local) in body.mesh().vertices().iter().enumerate() {
            let offset = pose.world_offset(local);
            let position = pose.position() + offset;
            let velocity = body.velocity() + body.angular_velocity().cross(offset);

            let t_max = earliest.as_ref().map_or(dt, |c| c.time);
            if let Some((wall, time)) = self.boundary.hit_test(position, velocity, t_max) {
                earliest = Some(Contact {
                    vertex,
                    wall,
                    time,
                    offset,
                    velocity,
                });
            }
        }

        earliest
    }

    fn apply_impulse(&self, body: &mut RigidBody, contact: &Contact) -> Impact {
        let n = contact.wall.normal();
        let r = contact.offset;

        let angular_term = (body.pose().inertia_inv() * r.cross(n)).cross(r).dot(n);
        let j = -(1.0 + self.restitution) * contact.velocity.dot(n)
            / (1.0 / body.mass() + angular_term);
        let impulse = j * n;

        body.apply_impulse(r, impulse);

        log::trace!(
            "Vertex {} hit {:?} at t = {}: impulse {:?}",
            contact.vertex,
            contact.wall,
            contact.time,
            impulse
        );

        Impact {
            wall: contact.wall,
            time: contact.time,
            impulse: VertexImpulse {
                vertex: contact.vertex,
                impulse,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::math::Quat;
    use crate::mesh::Mesh;

    fn cube_at(position: Vec3) -> RigidBody {
        RigidBody::new(Mesh::cuboid(Vec3::splat(0.5)), Material::new(1000.0, 1e9, 0.3))
            .unwrap()
            .with_position(position)
    }

    fn resolver() -> CollisionResolver {
        CollisionResolver::new(Boundary::centered_cube(2.0).unwrap(), 0.5, 64)
    }

    fn vertex_velocity(body: &RigidBody, vertex: usize) -> Vec3 {
        let r = body.pose().world_offset(body.mesh().vertices()[vertex]);
        body.velocity() + body.angular_velocity().cross(r)
    }

    #[test]
    fn test_hit_test_picks_earliest_wall() {
        let boundary = Boundary::centered_cube(1.0).unwrap();
        let hit = boundary.hit_test(Vec3::new(0.5, 0.0, 0.0), Vec3::new(1.0, -4.0, 0.0), 1.0);
        assert_eq!(hit.map(|(wall, _)| wall), Some(Wall::YMin));
        let (_, t) = hit.unwrap();
        assert!((t - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_hit_test_respects_time_budget() {
        let boundary = Boundary::centered_cube(1.0).unwrap();
        assert!(boundary.hit_test(Vec3::ZERO, Vec3::X, 0.5).is_none());
        assert!(boundary.hit_test(Vec3::ZERO, Vec3::ZERO, 10.0).is_none());
        let (wall, t) = boundary.hit_test(Vec3::ZERO, Vec3::X, 1.5).unwrap();
        assert_eq!(wall, Wall::XMax);
        assert!((t - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_hit_test_reports_penetration_as_negative_time() {
        let boundary = Boundary::centered_cube(1.0).unwrap();
        let (wall, t) = boundary.hit_test(Vec3::new(0.0, -1.2, 0.0), Vec3::NEG_Y, 0.01).unwrap();
        assert_eq!(wall, Wall::YMin);
        assert!(t < 0.0);
    }

    #[test]
    fn test_contains_includes_walls() {
        let boundary = Boundary::new(Vec3::new(-1.0, 0.0, -2.0), Vec3::new(1.0, 3.0, 2.0)).unwrap();
        assert!(boundary.contains(Vec3::new(0.0, 1.5, 0.0)));
        assert!(boundary.contains(boundary.min()));
        assert!(boundary.contains(boundary.max()));
        assert!(boundary.contains(Vec3::new(1.0, 0.0, 0.0)));
        assert!(!boundary.contains(Vec3::new(1.001, 1.0, 0.0)));
        assert!(!boundary.contains(Vec3::new(0.0, -1e-4, 0.0)));
        assert!(!boundary.contains(Vec3::new(0.0, 1.0, f32::NAN)));
    }

    #[test]
    fn test_boundary_rejects_inverted_box() {
        assert!(Boundary::new(Vec3::ONE, Vec3::ZERO).is_err());
        assert!(Boundary::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0)).is_err());
    }

    #[test]
    fn test_no_contact_without_motion() {
        let mut body = cube_at(Vec3::ZERO);
        let resolution = resolver().resolve(&mut body, 0.01);
        assert!(resolution.impacts.is_empty());
        assert!(!resolution.iteration_limit_hit);
    }

    #[test]
    fn test_vertex_on_plane_bounces_once() {
        // Tilted so a single corner touches the floor.
        let mut body = cube_at(Vec3::ZERO);
        body.set_orientation(Quat::from_rotation_z(0.3) * Quat::from_rotation_x(0.2));
        let lowest = body
            .mesh()
            .vertices()
            .iter()
            .enumerate()
            .min_by(|a, b| {
                let ya = body.pose().to_world(*a.1).y;
                let yb = body.pose().to_world(*b.1).y;
                ya.total_cmp(&yb)
            })
            .map(|(i, _)| i)
            .unwrap();
        let floor = body.pose().to_world(body.mesh().vertices()[lowest]).y;
        body.set_position(Vec3::new(0.0, -2.0 - floor, 0.0));
        body.set_velocity(Vec3::new(0.3, -1.0, 0.1), Vec3::new(0.5, 0.0, -0.2));

        let before = vertex_velocity(&body, lowest).dot(Vec3::Y);
        assert!(before < 0.0);

        let resolution = resolver().resolve(&mut body, 0.01);

        assert_eq!(resolution.impacts.len(), 1);
        let impact = resolution.impacts[0];
        assert_eq!(impact.wall, Wall::YMin);
        assert_eq!(impact.impulse.vertex, lowest);
        assert!(impact.impulse.impulse.y > 0.0);

        let after = vertex_velocity(&body, lowest).dot(Vec3::Y);
        assert!((after + 0.5 * before).abs() < 1e-4 * before.abs());
    }

    #[test]
    fn test_center_hit_reverses_momentum() {
        let mut body = cube_at(Vec3::new(0.0, -1.5, 0.0));
        body.set_velocity(Vec3::new(0.0, -2.0, 0.0), Vec3::ZERO);
        let resolution = resolver().resolve(&mut body, 0.01);

        // All four bottom corners reach the floor together; the first impulse
        // fixes the center velocity and the rest see a separating contact.
        assert!(!resolution.impacts.is_empty());
        assert!(resolution.impacts.iter().all(|i| i.wall == Wall::YMin));
        assert!(body.velocity().y > 0.0);
        assert!(!resolution.iteration_limit_hit);
    }

    #[test]
    fn test_resolves_earliest_contact_first() {
        let mut body = cube_at(Vec3::new(1.45, -1.48, 0.0));
        body.set_velocity(Vec3::new(1.0, -1.0, 0.0), Vec3::ZERO);
        let resolution = resolver().resolve(&mut body, 0.1);
        assert_eq!(resolution.impacts.first().map(|i| i.wall), Some(Wall::YMin));
        assert!(resolution.impacts.iter().any(|i| i.wall == Wall::XMax));
    }

    #[test]
    fn test_iteration_cap_terminates() {
        let mut body = cube_at(Vec3::new(0.0, -1.5, 0.0));
        body.set_velocity(Vec3::new(0.0, -2.0, 0.0), Vec3::new(3.0, 0.0, 4.0));
        let resolver = CollisionResolver::new(Boundary::centered_cube(2.0).unwrap(), 0.5, 1);
        let resolution = resolver.resolve(&mut body, 0.01);
        assert_eq!(resolution.impacts.len(), 1);
        assert!(resolution.iteration_limit_hit);
    }

    #[test]
    fn test_resolution_impulses_in_order() {
        let mut body = cube_at(Vec3::new(0.0, -1.5, 0.0));
        body.set_velocity(Vec3::new(0.0, -2.0, 0.0), Vec3::ZERO);
        let resolution = resolver().resolve(&mut body, 0.01);
        let impulses = resolution.impulses();
        assert_eq!(impulses.len(), resolution.impacts.len());
        assert_eq!(impulses[0], resolution.impacts[0].impulse);
    }
}
