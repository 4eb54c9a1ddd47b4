use bytemuck::{Pod, Zeroable};
use nalgebra::{Point3, Vector2, Vector3};
use std::mem::{offset_of, size_of};

/// A single mesh vertex, laid out exactly as it is uploaded to the vertex buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in local object space.
    pub position: Point3<f32>,
    /// Normal vector for lighting calculations.
    pub normal: Vector3<f32>,
    /// Texture coordinates (UV).
    pub uv: Vector2<f32>,
    /// Tangent (direction of increasing U). Zero until generated or imported.
    pub tangent: Vector3<f32>,
    /// Bitangent (direction of increasing V). Zero until generated or imported.
    pub bitangent: Vector3<f32>,
}

impl Vertex {
    /// Byte distance between consecutive vertices in the buffer.
    pub const STRIDE: usize = size_of::<Vertex>();

    /// Creates a vertex with an unset tangent basis.
    pub fn new(position: Point3<f32>, normal: Vector3<f32>, uv: Vector2<f32>) -> Self {
        Self {
            position,
            normal,
            uv,
            tangent: Vector3::zeros(),
            bitangent: Vector3::zeros(),
        }
    }

    pub fn with_tangent_basis(mut self, tangent: Vector3<f32>, bitangent: Vector3<f32>) -> Self {
        self.tangent = tangent;
        self.bitangent = bitangent;
        self
    }

    /// True when every tangent and bitangent component is a finite number.
    pub fn has_finite_tangent_basis(&self) -> bool {
        self.tangent.iter().chain(self.bitangent.iter()).all(|c| c.is_finite())
    }
}

/// One float attribute inside the [`Vertex`] layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Name the program exposes the attribute under.
    pub name: &'static str,
    /// Number of f32 components.
    pub components: usize,
    /// Byte offset from the start of a vertex.
    pub offset: usize,
}

/// The five per-vertex attributes in declaration order.
///
/// Offsets come from the struct itself, so they always accumulate by the size
/// of the preceding field: 0, 12, 24, 32, 44.
pub const VERTEX_LAYOUT: [VertexAttribute; 5] = [
    VertexAttribute {
        name: "position",
        components: 3,
        offset: offset_of!(Vertex, position),
    },
    VertexAttribute {
        name: "normal",
        components: 3,
        offset: offset_of!(Vertex, normal),
    },
    VertexAttribute {
        name: "texcoord",
        components: 2,
        offset: offset_of!(Vertex, uv),
    },
    VertexAttribute {
        name: "tangent",
        components: 3,
        offset: offset_of!(Vertex, tangent),
    },
    VertexAttribute {
        name: "bitangent",
        components: 3,
        offset: offset_of!(Vertex, bitangent),
    },
];
