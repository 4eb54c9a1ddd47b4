use nalgebra::{Point2, Vector3};

const EPSILON: f32 = 1e-5;

/// Screen-space barycentric weights of `p` with respect to triangle `(a, b, c)`.
///
/// Returns `None` for a degenerate triangle (twice the signed area is below
/// `EPSILON`).
pub fn barycentric(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>, c: Point2<f32>) -> Option<Vector3<f32>> {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let area_x2 = ab.x * ac.y - ab.y * ac.x;
    if area_x2.abs() < EPSILON {
        return None;
    }

    let inv = 1.0 / area_x2;
    let w_b = (ap.x * ac.y - ap.y * ac.x) * inv;
    let w_c = (ab.x * ap.y - ab.y * ap.x) * inv;

    Some(Vector3::new(1.0 - w_b - w_c, w_b, w_c))
}

/// Inside test with a small tolerance so shared edges leave no cracks.
#[inline(always)]
pub fn covers(weights: &Vector3<f32>) -> bool {
    weights.iter().all(|&w| w >= -EPSILON)
}

/// Corrects screen-space weights for perspective using the clip-space `w` of each corner.
///
/// Returns `None` when the weighted sum collapses to zero.
pub fn perspective_correct(weights: &Vector3<f32>, w: [f32; 3]) -> Option<Vector3<f32>> {
    let recip = |w: f32| if w.abs() > EPSILON { 1.0 / w } else { 1.0 };
    let scaled = Vector3::new(
        weights.x * recip(w[0]),
        weights.y * recip(w[1]),
        weights.z * recip(w[2]),
    );

    let sum = scaled.sum();
    if sum.abs() < EPSILON {
        return None;
    }
    Some(scaled / sum)
}
