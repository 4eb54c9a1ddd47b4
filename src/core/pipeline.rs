use crate::scene::texture::Texture;
use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};
use std::ops::{Add, Mul};
use std::sync::Arc;

/// Types that can be linearly interpolated across a triangle's surface.
///
/// `Send + Sync` because fragments are shaded from several rayon workers.
pub trait Interpolatable:
    Copy + Clone + Add<Output = Self> + Mul<f32, Output = Self> + Send + Sync
{
    /// UV coordinates carried by the varying, if any. Used for mip selection.
    fn uv(&self) -> Option<Vector2<f32>> {
        None
    }
}

/// A value stored in a program uniform slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Vec3(Vector3<f32>),
    Mat3(Matrix3<f32>),
    Mat4(Matrix4<f32>),
}

/// Names a program exposes. A name's position in its list is its location.
#[derive(Debug, Clone, Copy)]
pub struct ProgramInterface {
    pub attributes: &'static [&'static str],
    pub uniforms: &'static [&'static str],
}

impl ProgramInterface {
    pub fn attribute_location(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| *a == name)
    }

    pub fn uniform_location(&self, name: &str) -> Option<usize> {
        self.uniforms.iter().position(|u| *u == name)
    }
}

/// Read-only view of the program state a shader invocation can see.
///
/// Accessors fall back to neutral values (identity, zero, false) when a slot
/// was never written or holds a value of another type.
#[derive(Clone, Copy)]
pub struct ShaderEnv<'a> {
    pub uniforms: &'a [Option<UniformValue>],
    pub texture_units: &'a [Option<Arc<Texture>>],
}

impl ShaderEnv<'_> {
    fn get(&self, location: usize) -> Option<UniformValue> {
        self.uniforms.get(location).copied().flatten()
    }

    pub fn mat4(&self, location: usize) -> Matrix4<f32> {
        match self.get(location) {
            Some(UniformValue::Mat4(m)) => m,
            _ => Matrix4::identity(),
        }
    }

    pub fn mat3(&self, location: usize) -> Matrix3<f32> {
        match self.get(location) {
            Some(UniformValue::Mat3(m)) => m,
            _ => Matrix3::identity(),
        }
    }

    pub fn vec3(&self, location: usize) -> Vector3<f32> {
        match self.get(location) {
            Some(UniformValue::Vec3(v)) => v,
            _ => Vector3::zeros(),
        }
    }

    pub fn int(&self, location: usize) -> i32 {
        match self.get(location) {
            Some(UniformValue::Int(i)) => i,
            _ => 0,
        }
    }

    pub fn bool(&self, location: usize) -> bool {
        match self.get(location) {
            Some(UniformValue::Bool(b)) => b,
            Some(UniformValue::Int(i)) => i != 0,
            _ => false,
        }
    }

    /// Texture bound to the unit stored in the sampler uniform at `location`.
    pub fn sampler(&self, location: usize) -> Option<&Texture> {
        let unit = usize::try_from(self.int(location)).ok()?;
        self.texture_units.get(unit)?.as_deref()
    }
}

/// A program for the software backend: the programmable stages of the pipeline.
pub trait Shader: Send + Sync {
    /// Per-vertex outputs interpolated for each fragment.
    type Varying: Interpolatable;

    /// Attribute and uniform names, in location order.
    fn interface(&self) -> ProgramInterface;

    /// Vertex stage. `attributes[location]` holds the fetched attribute, padded
    /// to four components with (0, 0, 0, 1). Returns the clip-space position.
    fn vertex(&self, env: &ShaderEnv<'_>, attributes: &[Vector4<f32>]) -> (Vector4<f32>, Self::Varying);

    /// Fragment stage. Returns linear RGBA.
    ///
    /// `uv_density` is a per-triangle estimate of UV units per framebuffer
    /// sample, 0.0 when unknown.
    fn fragment(&self, env: &ShaderEnv<'_>, varying: Self::Varying, uv_density: f32) -> Vector4<f32>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_falls_back_to_neutral_values() {
        let uniforms = [
            Some(UniformValue::Vec3(Vector3::new(1.0, 2.0, 3.0))),
            None,
            Some(UniformValue::Int(1)),
        ];
        let env = ShaderEnv {
            uniforms: &uniforms,
            texture_units: &[],
        };

        assert_eq!(env.mat4(0), Matrix4::identity());
        assert_eq!(env.vec3(0), Vector3::new(1.0, 2.0, 3.0));
        assert!(!env.bool(0));
        assert_eq!(env.vec3(1), Vector3::zeros());
        assert!(env.bool(2));
        assert_eq!(env.int(99), 0);
        assert!(env.sampler(2).is_none());
    }

    #[test]
    fn test_interface_locations() {
        let interface = ProgramInterface {
            attributes: &["position", "normal"],
            uniforms: &["model"],
        };
        assert_eq!(interface.attribute_location("normal"), Some(1));
        assert_eq!(interface.uniform_location("view"), None);
    }
}
