use crate::core::framebuffer::FrameBuffer;
use crate::core::math::interpolation::{barycentric, covers, perspective_correct};
use crate::core::math::transform::{ndc_to_screen, perspective_divide};
use crate::core::pipeline::{Interpolatable, Shader, ShaderEnv};
use nalgebra::{Point2, Vector4};
use rayon::prelude::*;

/// A clip-space vertex together with its varying.
type ClipVertex<V> = (Vector4<f32>, V);

/// Frustum planes as (axis, sign): a point is inside when `sign * p[axis] <= p.w`.
const CLIP_PLANES: [(usize, f32); 6] = [
    (0, 1.0),
    (0, -1.0),
    (1, 1.0),
    (1, -1.0),
    (2, 1.0),
    (2, -1.0),
];

/// Draws triangles into a [`FrameBuffer`].
///
/// No face culling: both windings are filled.
#[derive(Debug, Clone, Copy)]
pub struct Rasterizer {
    pub depth_test: bool,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self { depth_test: true }
    }
}

impl Rasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clips a clip-space triangle against the view frustum (Sutherland–Hodgman
    /// in homogeneous space) and fills the resulting convex polygon as a fan.
    pub fn draw_triangle<S: Shader>(
        &self,
        framebuffer: &FrameBuffer,
        shader: &S,
        env: &ShaderEnv<'_>,
        triangle: [ClipVertex<S::Varying>; 3],
    ) {
        // A triangle clipped by six planes has at most nine corners.
        let mut polygon: Vec<ClipVertex<S::Varying>> = Vec::with_capacity(12);
        let mut scratch: Vec<ClipVertex<S::Varying>> = Vec::with_capacity(12);
        polygon.extend_from_slice(&triangle);

        for &(axis, sign) in &CLIP_PLANES {
            clip_against_plane(&polygon, &mut scratch, axis, sign);
            std::mem::swap(&mut polygon, &mut scratch);
            if polygon.len() < 3 {
                return;
            }
        }

        let apex = polygon[0];
        for edge in polygon[1..].windows(2) {
            self.fill(framebuffer, shader, env, [apex, edge[0], edge[1]]);
        }
    }

    /// Fills a triangle that lies entirely inside the frustum.
    fn fill<S: Shader>(
        &self,
        framebuffer: &FrameBuffer,
        shader: &S,
        env: &ShaderEnv<'_>,
        triangle: [ClipVertex<S::Varying>; 3],
    ) {
        let width = framebuffer.buffer_width as f32;
        let height = framebuffer.buffer_height as f32;

        let mut screen = [Point2::origin(); 3];
        let mut ndc_z = [0.0; 3];
        let mut w = [0.0; 3];
        for (i, (clip, _)) in triangle.iter().enumerate() {
            let Some(ndc) = perspective_divide(clip) else {
                return;
            };
            screen[i] = ndc_to_screen(&ndc, width, height);
            ndc_z[i] = ndc.z;
            w[i] = clip.w;
        }
        if barycentric(screen[0], screen[0], screen[1], screen[2]).is_none() {
            return;
        }

        let uv_density = uv_density(&screen, &triangle);

        let min_x = screen.iter().map(|p| p.x).fold(f32::INFINITY, f32::min).floor().max(0.0) as usize;
        let min_y = screen.iter().map(|p| p.y).fold(f32::INFINITY, f32::min).floor().max(0.0) as usize;
        let max_x = screen.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max).ceil();
        let max_y = screen.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max).ceil();
        if max_x < 0.0 || max_y < 0.0 {
            return;
        }
        let max_x = (max_x as usize).min(framebuffer.buffer_width.saturating_sub(1));
        let max_y = (max_y as usize).min(framebuffer.buffer_height.saturating_sub(1));
        if min_x > max_x || min_y > max_y {
            return;
        }

        // Rows are independent; work stealing evens out uneven row lengths.
        (min_y..=max_y).into_par_iter().for_each(|y| {
            for x in min_x..=max_x {
                let center = Point2::new(x as f32 + 0.5, y as f32 + 0.5);
                let Some(weights) = barycentric(center, screen[0], screen[1], screen[2]) else {
                    continue;
                };
                if !covers(&weights) {
                    continue;
                }
                let Some(corrected) = perspective_correct(&weights, w) else {
                    continue;
                };

                // NDC depth is affine in screen space, so it takes the uncorrected weights.
                let z_ndc = weights.x * ndc_z[0] + weights.y * ndc_z[1] + weights.z * ndc_z[2];
                let depth = z_ndc * 0.5 + 0.5;

                if self.depth_test && !framebuffer.depth_test_and_update(x, y, depth) {
                    continue;
                }

                let varying = triangle[0].1 * corrected.x
                    + triangle[1].1 * corrected.y
                    + triangle[2].1 * corrected.z;
                let color = shader.fragment(env, varying, uv_density);
                framebuffer.write_color(x, y, color);
            }
        });
    }
}

/// Clips `input` against one frustum plane into `output` (cleared first).
fn clip_against_plane<V: Interpolatable>(
    input: &[ClipVertex<V>],
    output: &mut Vec<ClipVertex<V>>,
    axis: usize,
    sign: f32,
) {
    output.clear();
    let Some(&last) = input.last() else {
        return;
    };

    let inside = |p: &Vector4<f32>| sign * p[axis] <= p.w + 1e-6;
    let mut prev = last;
    let mut prev_inside = inside(&prev.0);

    for &curr in input {
        let curr_inside = inside(&curr.0);
        if curr_inside != prev_inside {
            if let Some(hit) = intersect(prev, curr, axis, sign) {
                output.push(hit);
            }
        }
        if curr_inside {
            output.push(curr);
        }
        prev = curr;
        prev_inside = curr_inside;
    }
}

/// Point where edge `a -> b` crosses the plane `sign * p[axis] = p.w`.
#[inline(always)]
fn intersect<V: Interpolatable>(
    a: ClipVertex<V>,
    b: ClipVertex<V>,
    axis: usize,
    sign: f32,
) -> Option<ClipVertex<V>> {
    let da = a.0.w - sign * a.0[axis];
    let db = b.0.w - sign * b.0[axis];
    let denom = da - db;
    if denom.abs() < 1e-9 {
        return None;
    }
    let t = da / denom;
    if !t.is_finite() {
        return None;
    }
    Some((a.0 + (b.0 - a.0) * t, a.1 * (1.0 - t) + b.1 * t))
}

/// sqrt(UV area / screen area) for mip selection; 0.0 when the varying has no UVs.
fn uv_density<V: Interpolatable>(screen: &[Point2<f32>; 3], triangle: &[ClipVertex<V>; 3]) -> f32 {
    let area = |a: (f32, f32), b: (f32, f32), c: (f32, f32)| {
        0.5 * ((b.0 - a.0) * (c.1 - a.1) - (c.0 - a.0) * (b.1 - a.1)).abs()
    };

    let screen_area = area(
        (screen[0].x, screen[0].y),
        (screen[1].x, screen[1].y),
        (screen[2].x, screen[2].y),
    );
    if screen_area <= 1e-6 {
        return 0.0;
    }

    match (triangle[0].1.uv(), triangle[1].1.uv(), triangle[2].1.uv()) {
        (Some(a), Some(b), Some(c)) => (area((a.x, a.y), (b.x, b.y), (c.x, c.y)) / screen_area).sqrt(),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::ProgramInterface;
    use std::ops::{Add, Mul};

    #[derive(Clone, Copy)]
    struct Flat;

    impl Add for Flat {
        type Output = Self;
        fn add(self, _: Self) -> Self {
            Flat
        }
    }

    impl Mul<f32> for Flat {
        type Output = Self;
        fn mul(self, _: f32) -> Self {
            Flat
        }
    }

    impl Interpolatable for Flat {}

    struct Solid(Vector4<f32>);

    impl Shader for Solid {
        type Varying = Flat;

        fn interface(&self) -> ProgramInterface {
            ProgramInterface {
                attributes: &[],
                uniforms: &[],
            }
        }

        fn vertex(&self, _: &ShaderEnv<'_>, attributes: &[Vector4<f32>]) -> (Vector4<f32>, Flat) {
            (attributes[0], Flat)
        }

        fn fragment(&self, _: &ShaderEnv<'_>, _: Flat, _: f32) -> Vector4<f32> {
            self.0
        }
    }

    fn env() -> ShaderEnv<'static> {
        ShaderEnv {
            uniforms: &[],
            texture_units: &[],
        }
    }

    fn full_screen(z: f32) -> [[ClipVertex<Flat>; 3]; 2] {
        let v = |x: f32, y: f32| (Vector4::new(x, y, z, 1.0), Flat);
        [
            [v(-1.0, -1.0), v(1.0, -1.0), v(1.0, 1.0)],
            [v(-1.0, -1.0), v(1.0, 1.0), v(-1.0, 1.0)],
        ]
    }

    #[test]
    fn test_full_screen_quad_covers_every_pixel() {
        let fb = FrameBuffer::new(8, 8, 1);
        let red = Vector4::new(1.0, 0.0, 0.0, 1.0);
        for tri in full_screen(0.0) {
            Rasterizer::new().draw_triangle(&fb, &Solid(red), &env(), tri);
        }
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(fb.resolve(x, y, false), Some(red), "pixel {x},{y}");
            }
        }
    }

    #[test]
    fn test_depth_test_keeps_nearer_surface() {
        let fb = FrameBuffer::new(4, 4, 1);
        let near = Vector4::new(0.0, 1.0, 0.0, 1.0);
        let far = Vector4::new(0.0, 0.0, 1.0, 1.0);
        for tri in full_screen(-0.5) {
            Rasterizer::new().draw_triangle(&fb, &Solid(near), &env(), tri);
        }
        for tri in full_screen(0.5) {
            Rasterizer::new().draw_triangle(&fb, &Solid(far), &env(), tri);
        }
        assert_eq!(fb.resolve(2, 2, false), Some(near));

        // Without the depth test the later draw wins.
        let no_depth = Rasterizer { depth_test: false };
        for tri in full_screen(0.5) {
            no_depth.draw_triangle(&fb, &Solid(far), &env(), tri);
        }
        assert_eq!(fb.resolve(2, 2, false), Some(far));
    }

    #[test]
    fn test_triangle_behind_camera_is_clipped_away() {
        let fb = FrameBuffer::new(4, 4, 1);
        let tri = [
            (Vector4::new(-1.0, -1.0, 0.0, -1.0), Flat),
            (Vector4::new(1.0, -1.0, 0.0, -1.0), Flat),
            (Vector4::new(0.0, 1.0, 0.0, -1.0), Flat),
        ];
        Rasterizer::new().draw_triangle(&fb, &Solid(Vector4::new(1.0, 1.0, 1.0, 1.0)), &env(), tri);
        assert_eq!(fb.depth_at(1, 1), Some(1.0));
    }

    #[test]
    fn test_uv_density_without_uvs_is_zero() {
        let screen = [Point2::new(0.0, 0.0), Point2::new(4.0, 0.0), Point2::new(0.0, 4.0)];
        let tri = full_screen(0.0)[0];
        assert_eq!(uv_density(&screen, &tri), 0.0);
    }
}
