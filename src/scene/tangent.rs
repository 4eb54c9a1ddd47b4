use crate::scene::mesh::Mesh;
use nalgebra::Vector2;
use serde::Deserialize;

/// How the UV determinant of a triangle is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeterminantFormula {
    /// `duv1.x * duv2.y - duv2.y * duv2.x`.
    ///
    /// Reuses `duv2.y` where the textbook formula has `duv1.y`. Rendered output
    /// has always been produced with this variant, so it stays the default.
    #[default]
    Literal,
    /// `duv1.x * duv2.y - duv2.x * duv1.y`.
    Standard,
}

impl DeterminantFormula {
    #[inline]
    pub fn evaluate(self, duv1: &Vector2<f32>, duv2: &Vector2<f32>) -> f32 {
        match self {
            DeterminantFormula::Literal => duv1.x * duv2.y - duv2.y * duv2.x,
            DeterminantFormula::Standard => duv1.x * duv2.y - duv2.x * duv1.y,
        }
    }
}

/// Fills tangent and bitangent of every vertex using the literal determinant.
pub fn compute_tangent_space(mesh: &mut Mesh) {
    compute_tangent_space_with(mesh, DeterminantFormula::Literal);
}

/// Computes one flat tangent basis per triangle and writes it to all three corners.
///
/// A zero determinant is not guarded: the division yields infinities/NaNs, which
/// are left in place so callers can report the offending triangle.
pub fn compute_tangent_space_with(mesh: &mut Mesh, formula: DeterminantFormula) {
    for tri in mesh.triangles_mut() {
        let delta_pos1 = tri[1].position - tri[0].position;
        let delta_pos2 = tri[2].position - tri[0].position;
        let delta_uv1 = tri[1].uv - tri[0].uv;
        let delta_uv2 = tri[2].uv - tri[0].uv;

        let r = 1.0 / formula.evaluate(&delta_uv1, &delta_uv2);

        let tangent = ((delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r).normalize();
        let bitangent = ((delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * r).normalize();

        for vertex in tri.iter_mut() {
            vertex.tangent = tangent;
            vertex.bitangent = bitangent;
        }
    }
}
