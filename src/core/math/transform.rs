use nalgebra::{Matrix3, Matrix4, Point2, Point3, Vector3, Vector4};

//=================================
// Transform Matrix Factory
//=================================

/// Factory for the transformation matrices used by the frame pipeline.
/// Written out by hand so the conventions are explicit: right-handed,
/// column vectors, NDC depth in [-1, 1].
pub struct TransformFactory;

#[rustfmt::skip]
impl TransformFactory {
    /// Rotation around an arbitrary axis, angle in degrees (Rodrigues' formula).
    pub fn rotation_deg(axis: &Vector3<f32>, angle_deg: f32) -> Matrix4<f32> {
        let a = axis.normalize();
        let (s, c) = angle_deg.to_radians().sin_cos();
        let t = 1.0 - c;

        Matrix4::new(
            t * a.x * a.x + c,       t * a.x * a.y - a.z * s, t * a.x * a.z + a.y * s, 0.0,
            t * a.x * a.y + a.z * s, t * a.y * a.y + c,       t * a.y * a.z - a.x * s, 0.0,
            t * a.x * a.z - a.y * s, t * a.y * a.z + a.x * s, t * a.z * a.z + c,       0.0,
            0.0,                     0.0,                     0.0,                     1.0,
        )
    }

    pub fn rotation_x_deg(angle_deg: f32) -> Matrix4<f32> {
        Self::rotation_deg(&Vector3::x(), angle_deg)
    }

    pub fn rotation_y_deg(angle_deg: f32) -> Matrix4<f32> {
        Self::rotation_deg(&Vector3::y(), angle_deg)
    }

    pub fn rotation_z_deg(angle_deg: f32) -> Matrix4<f32> {
        Self::rotation_deg(&Vector3::z(), angle_deg)
    }

    pub fn translation(offset: &Vector3<f32>) -> Matrix4<f32> {
        Matrix4::new(
            1.0, 0.0, 0.0, offset.x,
            0.0, 1.0, 0.0, offset.y,
            0.0, 0.0, 1.0, offset.z,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    pub fn scaling(factor: f32) -> Matrix4<f32> {
        Matrix4::new(
            factor, 0.0,    0.0,    0.0,
            0.0,    factor, 0.0,    0.0,
            0.0,    0.0,    factor, 0.0,
            0.0,    0.0,    0.0,    1.0,
        )
    }

    /// Look-at view matrix. The camera looks down its local -Z.
    pub fn look_at(eye: &Point3<f32>, target: &Point3<f32>, up: &Vector3<f32>) -> Matrix4<f32> {
        let back = (eye - target).normalize();
        let right = up.cross(&back).normalize();
        let true_up = back.cross(&right);

        let rotation = Matrix4::new(
            right.x,   right.y,   right.z,   0.0,
            true_up.x, true_up.y, true_up.z, 0.0,
            back.x,    back.y,    back.z,    0.0,
            0.0,       0.0,       0.0,       1.0,
        );

        rotation * Self::translation(&-eye.coords)
    }

    /// Perspective projection with a vertical field of view in degrees.
    pub fn perspective(fov_y_deg: f32, aspect_ratio: f32, near: f32, far: f32) -> Matrix4<f32> {
        let f = 1.0 / (fov_y_deg.to_radians() / 2.0).tan();
        let nf = 1.0 / (near - far);

        Matrix4::new(
            f / aspect_ratio, 0.0, 0.0,               0.0,
            0.0,              f,   0.0,               0.0,
            0.0,              0.0, (far + near) * nf, 2.0 * far * near * nf,
            0.0,              0.0, -1.0,              0.0,
        )
    }

    /// Object-to-world matrix: translate, then rotate X, Y, Z, then uniform scale,
    /// composed so that scale is applied to the vertex first.
    pub fn model(translation: &Vector3<f32>, angles_deg: &Vector3<f32>, scale: f32) -> Matrix4<f32> {
        Self::translation(translation)
            * Self::rotation_x_deg(angles_deg.x)
            * Self::rotation_y_deg(angles_deg.y)
            * Self::rotation_z_deg(angles_deg.z)
            * Self::scaling(scale)
    }

    /// Inverse-transpose of the upper 3x3 of `model`.
    /// Falls back to the plain upper 3x3 when it is singular (e.g. zero scale).
    pub fn normal_matrix(model: &Matrix4<f32>) -> Matrix3<f32> {
        let upper = model.fixed_view::<3, 3>(0, 0).into_owned();
        upper.try_inverse().unwrap_or(upper).transpose()
    }
}

//=================================
// Core Transformation Functions
//=================================

/// Clip space -> NDC. Returns `None` when `w` is too close to zero.
#[inline]
pub fn perspective_divide(clip: &Vector4<f32>) -> Option<Point3<f32>> {
    if clip.w.abs() > 1e-6 {
        Some(Point3::from(clip.xyz() / clip.w))
    } else {
        None
    }
}

/// NDC -> framebuffer coordinates; +Y in NDC is up, row 0 of the buffer is the top.
#[inline]
pub fn ndc_to_screen(ndc: &Point3<f32>, width: f32, height: f32) -> Point2<f32> {
    Point2::new(
        (ndc.x + 1.0) * 0.5 * width,
        (1.0 - ndc.y) * 0.5 * height,
    )
}
