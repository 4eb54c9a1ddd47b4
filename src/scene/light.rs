use nalgebra::{Point3, Vector3};

/// The single point light of the scene, in world space.
///
/// Lighting has no distance falloff: `intensities` is the RGB radiance that
/// reaches every surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Point3<f32>,
    pub intensities: Vector3<f32>,
}

impl PointLight {
    pub fn new(position: Point3<f32>, intensities: Vector3<f32>) -> Self {
        Self { position, intensities }
    }

    /// Unit vector from `surface_point` toward the light.
    pub fn direction_from(&self, surface_point: &Point3<f32>) -> Vector3<f32> {
        (self.position - surface_point).normalize()
    }
}

impl Default for PointLight {
    fn default() -> Self {
        Self::new(Point3::new(-30.0, 30.0, 30.0), Vector3::new(0.66, 0.66, 0.66))
    }
}
