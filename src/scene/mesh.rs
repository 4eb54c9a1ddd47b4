use crate::core::geometry::Vertex;
use nalgebra::{Point3, Vector2, Vector3};

/// A fully expanded triangle list.
///
/// Consecutive triples of vertices form one triangle; triangle `i` occupies
/// `vertices[3 * i..3 * i + 3]`. Vertices are never shared between triangles,
/// so each face can carry its own tangent basis and the list can be drawn
/// without an index buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vertex>,
}

impl Mesh {
    /// Wraps an expanded vertex list. The length must be a multiple of three.
    pub(crate) fn from_triangles(vertices: Vec<Vertex>) -> Self {
        debug_assert_eq!(vertices.len() % 3, 0, "mesh is not a triangle list");
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Iterates over the triangles as three-vertex slices.
    pub fn triangles(&self) -> impl Iterator<Item = &[Vertex]> {
        self.vertices.chunks_exact(3)
    }

    pub fn triangles_mut(&mut self) -> impl Iterator<Item = &mut [Vertex]> {
        self.vertices.chunks_exact_mut(3)
    }

    /// Index of the first triangle whose tangent or bitangent is NaN or infinite.
    pub fn first_non_finite_triangle(&self) -> Option<usize> {
        self.triangles()
            .position(|tri| tri.iter().any(|v| !v.has_finite_tangent_basis()))
    }

    /// Creates a single counter-clockwise triangle facing +Z, for testing.
    pub fn create_test_triangle() -> Self {
        let normal = Vector3::new(0.0, 0.0, 1.0);
        Self::from_triangles(vec![
            Vertex::new(Point3::new(-0.5, -0.5, 0.0), normal, Vector2::new(0.0, 0.0)),
            Vertex::new(Point3::new(0.5, -0.5, 0.0), normal, Vector2::new(1.0, 0.0)),
            Vertex::new(Point3::new(0.0, 0.5, 0.0), normal, Vector2::new(0.5, 1.0)),
        ])
    }
}
