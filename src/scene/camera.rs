use crate::core::math::transform::TransformFactory;
use nalgebra::{Matrix4, Point3, Vector3};

/// A fixed perspective camera; the view and projection matrices are cached.
#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in degrees.
    pub fov_y_deg: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,

    view_matrix: Matrix4<f32>,
    projection_matrix: Matrix4<f32>,
}

impl Camera {
    pub fn new_perspective(
        eye: Point3<f32>,
        target: Point3<f32>,
        up: Vector3<f32>,
        fov_y_deg: f32,
        aspect_ratio: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let mut cam = Self {
            eye,
            target,
            up,
            fov_y_deg,
            aspect_ratio,
            near,
            far,
            view_matrix: Matrix4::identity(),
            projection_matrix: Matrix4::identity(),
        };
        cam.update_matrices();
        cam
    }

    /// Recomputes the cached matrices after a field was changed.
    pub fn update_matrices(&mut self) {
        self.view_matrix = TransformFactory::look_at(&self.eye, &self.target, &self.up);
        self.projection_matrix =
            TransformFactory::perspective(self.fov_y_deg, self.aspect_ratio, self.near, self.far);
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        self.view_matrix
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection_matrix
    }
}

impl Default for Camera {
    /// Looks at the origin from (0, 0, 6): 45 degree FOV, square aspect, depth range [0.1, 10].
    fn default() -> Self {
        Self::new_perspective(
            Point3::new(0.0, 0.0, 6.0),
            Point3::origin(),
            Vector3::y(),
            45.0,
            1.0,
            0.1,
            10.0,
        )
    }
}
