//! The capability set the frame pipeline renders through.
//!
//! A backend owns GPU-side objects (vertex buffers, textures, offscreen
//! targets) behind opaque handles, exposes uniforms and attributes of its
//! linked program by name, and issues non-indexed triangle draws.

pub mod software;

#[cfg(test)]
pub mod recording;

use crate::core::geometry::Vertex;
use crate::scene::texture::TextureOptions;
use image::{DynamicImage, RgbaImage};
use nalgebra::Vector4;
use thiserror::Error;

pub use crate::core::pipeline::UniformValue;

/// Location of a named vertex attribute in the linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeLocation(pub u32);

/// Location of a named uniform in the linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(pub u32);

/// Where an enabled attribute reads its floats from in the bound vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributePointer {
    /// Number of f32 components, 1..=4.
    pub components: usize,
    /// Byte offset of the first component inside a vertex.
    pub offset: usize,
    /// Bytes between consecutive vertices.
    pub stride: usize,
}

/// What kind of name failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Attribute,
    Uniform,
}

impl std::fmt::Display for BindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Attribute => write!(f, "attribute"),
            Self::Uniform => write!(f, "uniform"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("unknown {kind} '{name}' in linked program")]
    Binding { kind: BindingKind, name: String },
    #[error("invalid or released {0} handle")]
    InvalidHandle(&'static str),
    #[error("no vertex buffer bound")]
    NoBufferBound,
    #[error("no render target bound")]
    NoTargetBound,
    #[error("texture unit {0} out of range")]
    InvalidTextureUnit(u32),
    #[error("attribute pointer reads past the end of the vertex buffer")]
    AttributeOutOfBounds,
    #[error("attribute pointer has {0} components, expected 1 to 4")]
    InvalidComponentCount(usize),
    #[error("texture error: {0}")]
    Texture(#[from] image::ImageError),
}

/// Capability interface over a shader/pipeline implementation.
///
/// Name lookups are expected once at setup; everything else takes the
/// resolved handles. Binding calls mirror GL's "current object" model: an
/// attribute pointer captures whichever vertex buffer is bound when it is set.
pub trait Backend {
    fn attribute_location(&self, name: &str) -> Result<AttributeLocation, BackendError>;
    fn uniform_location(&self, name: &str) -> Result<UniformLocation, BackendError>;
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) -> Result<(), BackendError>;

    fn create_vertex_buffer(&mut self, vertices: &[Vertex]) -> Result<BufferId, BackendError>;
    /// Binds a vertex buffer, or unbinds with `None`.
    fn bind_buffer(&mut self, buffer: Option<BufferId>) -> Result<(), BackendError>;
    fn release_buffer(&mut self, buffer: BufferId) -> Result<(), BackendError>;

    fn enable_attribute(&mut self, location: AttributeLocation) -> Result<(), BackendError>;
    fn set_attribute_buffer(
        &mut self,
        location: AttributeLocation,
        pointer: AttributePointer,
    ) -> Result<(), BackendError>;
    fn disable_attribute(&mut self, location: AttributeLocation) -> Result<(), BackendError>;

    fn create_texture(&mut self, image: &DynamicImage, options: TextureOptions) -> Result<TextureId, BackendError>;
    /// Binds a texture to `unit`, or clears the unit with `None`.
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) -> Result<(), BackendError>;
    fn release_texture(&mut self, texture: TextureId) -> Result<(), BackendError>;

    /// Offscreen color + depth target; `samples` is the sub-sample count per axis.
    fn create_target(&mut self, width: u32, height: u32, samples: u32) -> Result<TargetId, BackendError>;
    /// Binds a target for drawing, or unbinds with `None`.
    fn bind_target(&mut self, target: Option<TargetId>) -> Result<(), BackendError>;
    /// CPU-readable copy of the target's resolved color image.
    fn target_image(&self, target: TargetId) -> Result<RgbaImage, BackendError>;
    fn release_target(&mut self, target: TargetId) -> Result<(), BackendError>;

    fn set_depth_test(&mut self, enabled: bool);
    fn set_multisample(&mut self, enabled: bool);
    /// Clears color and depth of the bound target.
    fn clear(&mut self, color: Vector4<f32>) -> Result<(), BackendError>;
    /// Non-indexed triangle list draw of `count` vertices starting at `first`.
    fn draw_arrays(&mut self, first: usize, count: usize) -> Result<(), BackendError>;
}
