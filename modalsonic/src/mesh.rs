//! Closed triangle meshes used as rigid-body geometry.

use crate::error::{ModalSonicError, Result};
use crate::math::Vec3;
use std::collections::HashMap;

/// A closed, triangulated surface.
///
/// Faces hold 0-based vertex indices and are wound counter-clockwise when
/// seen from outside, so `(v1 - v0) × (v2 - v0)` points outward. Construction
/// checks that every index is in range and that the surface is watertight;
/// the mass-property integrals are meaningless otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vec3>,
    faces: Vec<[usize; 3]>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vec3>, faces: Vec<[usize; 3]>) -> Result<Self> {
        validate(&vertices, &faces)?;
        Ok(Self { vertices, faces })
    }

    /// Builds a mesh from 1-based face indices, as found in OBJ-style data.
    pub fn from_one_based(vertices: Vec<Vec3>, faces: &[[usize; 3]]) -> Result<Self> {
        let faces = faces
            .iter()
            .enumerate()
            .map(|(face_idx, face)| {
                if face.contains(&0) {
                    return Err(ModalSonicError::InvalidMesh(format!(
                        "face {} uses index 0 in 1-based data",
                        face_idx
                    )));
                }
                Ok([face[0] - 1, face[1] - 1, face[2] - 1])
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(vertices, faces)
    }

    /// Axis-aligned box centered at the origin.
    pub fn cuboid(half_extents: Vec3) -> Self {
        let h = half_extents;
        let vertices = (0..8)
            .map(|i| {
                Vec3::new(
                    if i & 1 == 0 { -h.x } else { h.x },
                    if i & 2 == 0 { -h.y } else { h.y },
                    if i & 4 == 0 { -h.z } else { h.z },
                )
            })
            .collect();
        let faces = vec![
            [0, 4, 6],
            [0, 6, 2],
            [1, 3, 7],
            [1, 7, 5],
            [0, 1, 5],
            [0, 5, 4],
            [2, 6, 7],
            [2, 7, 3],
            [0, 2, 3],
            [0, 3, 1],
            [4, 5, 7],
            [4, 7, 6],
        ];
        Self { vertices, faces }
    }

    /// Returns the mesh uniformly scaled about the origin.
    pub fn scaled(mut self, scale: f32) -> Self {
        for v in &mut self.vertices {
            *v *= scale;
        }
        self
    }

    /// Shifts every vertex. Used once, to put the center of mass at the origin.
    pub(crate) fn translate(&mut self, offset: Vec3) {
        for v in &mut self.vertices {
            *v += offset;
        }
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Corner positions of every face.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.faces
            .iter()
            .map(|f| [self.vertices[f[0]], self.vertices[f[1]], self.vertices[f[2]]])
    }
}

fn validate(vertices: &[Vec3], faces: &[[usize; 3]]) -> Result<()> {
    if faces.len() < 4 {
        return Err(ModalSonicError::InvalidMesh(format!(
            "a closed surface needs at least 4 faces, got {}",
            faces.len()
        )));
    }
    if let Some(i) = vertices.iter().position(|v| !v.is_finite()) {
        return Err(ModalSonicError::InvalidMesh(format!(
            "vertex {} is not finite",
            i
        )));
    }

    // Each undirected edge of a watertight surface borders exactly two faces.
    let mut edge_uses: HashMap<(usize, usize), u32> = HashMap::new();
    for (face_idx, face) in faces.iter().enumerate() {
        if let Some(&bad) = face.iter().find(|&&idx| idx >= vertices.len()) {
            return Err(ModalSonicError::InvalidMesh(format!(
                "face {} references vertex {} but the mesh has {} vertices",
                face_idx,
                bad,
                vertices.len()
            )));
        }
        if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
            return Err(ModalSonicError::InvalidMesh(format!(
                "face {} repeats a vertex: {:?}",
                face_idx, face
            )));
        }
        for k in 0..3 {
            let a = face[k];
            let b = face[(k + 1) % 3];
            *edge_uses.entry((a.min(b), a.max(b))).or_insert(0) += 1;
        }
    }

    if let Some((edge, uses)) = edge_uses.iter().find(|(_, uses)| **uses != 2) {
        return Err(ModalSonicError::InvalidMesh(format!(
            "surface is not closed: edge {:?} borders {} faces",
            edge, uses
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron() -> (Vec<Vec3>, Vec<[usize; 3]>) {
        let vertices = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let faces = vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
        (vertices, faces)
    }

    #[test]
    fn test_tetrahedron_is_valid() {
        let (vertices, faces) = tetrahedron();
        let mesh = Mesh::new(vertices, faces).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 4);
    }

    #[test]
    fn test_cuboid_is_closed_and_outward() {
        let mesh = Mesh::cuboid(Vec3::new(1.0, 2.0, 3.0));
        assert!(validate(mesh.vertices(), mesh.faces()).is_ok());

        for [a, b, c] in mesh.triangles() {
            let normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(centroid) > 0.0, "face points inward");
        }
    }

    #[test]
    fn test_one_based_faces() {
        let (vertices, faces) = tetrahedron();
        let one_based: Vec<[usize; 3]> =
            faces.iter().map(|f| [f[0] + 1, f[1] + 1, f[2] + 1]).collect();
        let mesh = Mesh::from_one_based(vertices.clone(), &one_based).unwrap();
        assert_eq!(mesh.faces(), faces.as_slice());

        let err = Mesh::from_one_based(vertices, &faces).unwrap_err();
        assert!(matches!(err, ModalSonicError::InvalidMesh(_)));
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let (vertices, mut faces) = tetrahedron();
        faces[3] = [1, 2, 7];
        assert!(matches!(
            Mesh::new(vertices, faces),
            Err(ModalSonicError::InvalidMesh(_))
        ));
    }

    #[test]
    fn test_rejects_repeated_index_face() {
        let (vertices, mut faces) = tetrahedron();
        faces[3] = [1, 1, 3];
        assert!(matches!(
            Mesh::new(vertices, faces),
            Err(ModalSonicError::InvalidMesh(msg)) if msg.contains("repeats a vertex")
        ));
    }

    #[test]
    fn test_rejects_open_surface() {
        let mesh = Mesh::cuboid(Vec3::ONE);
        let mut faces = mesh.faces().to_vec();
        faces.pop();
        assert!(matches!(
            Mesh::new(mesh.vertices().to_vec(), faces),
            Err(ModalSonicError::InvalidMesh(_))
        ));
    }

    #[test]
    fn test_scaled() {
        let mesh = Mesh::cuboid(Vec3::ONE).scaled(0.5);
        assert!(
            mesh.vertices()
                .iter()
                .all(|v| v.abs().abs_diff_eq(Vec3::splat(0.5), 1e-6))
        );
    }
}
