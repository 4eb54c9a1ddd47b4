use crate::core::pipeline::{Interpolatable, ProgramInterface, Shader, ShaderEnv};
use crate::scene::light::PointLight;
use nalgebra::{Matrix3, Point3, Vector2, Vector3, Vector4};
use std::ops::{Add, Mul};

pub const ATTRIBUTES: [&str; 5] = ["position", "normal", "texcoord", "tangent", "bitangent"];

pub const UNIFORMS: [&str; 9] = [
    "view",
    "projection",
    "model",
    "normalMatrix",
    "lightPosition",
    "lightIntensities",
    "normalsEnabled",
    "diffuseMap",
    "normalMap",
];

// Locations, i.e. indices into the lists above.
const A_POSITION: usize = 0;
const A_NORMAL: usize = 1;
const A_TEXCOORD: usize = 2;
const A_TANGENT: usize = 3;
const A_BITANGENT: usize = 4;

const U_VIEW: usize = 0;
const U_PROJECTION: usize = 1;
const U_MODEL: usize = 2;
const U_NORMAL_MATRIX: usize = 3;
const U_LIGHT_POSITION: usize = 4;
const U_LIGHT_INTENSITIES: usize = 5;
const U_NORMALS_ENABLED: usize = 6;
const U_DIFFUSE_MAP: usize = 7;
const U_NORMAL_MAP: usize = 8;

/// Data passed from the vertex stage to the fragment stage, in world space.
#[derive(Clone, Copy, Debug)]
pub struct NormalMapVarying {
    pub world_pos: Point3<f32>,
    pub normal: Vector3<f32>,
    pub uv: Vector2<f32>,
    pub tangent: Vector3<f32>,
    pub bitangent: Vector3<f32>,
}

impl Add for NormalMapVarying {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            world_pos: Point3::from(self.world_pos.coords + other.world_pos.coords),
            normal: self.normal + other.normal,
            uv: self.uv + other.uv,
            tangent: self.tangent + other.tangent,
            bitangent: self.bitangent + other.bitangent,
        }
    }
}

impl Mul<f32> for NormalMapVarying {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self {
            world_pos: Point3::from(self.world_pos.coords * scalar),
            normal: self.normal * scalar,
            uv: self.uv * scalar,
            tangent: self.tangent * scalar,
            bitangent: self.bitangent * scalar,
        }
    }
}

impl Interpolatable for NormalMapVarying {
    fn uv(&self) -> Option<Vector2<f32>> {
        Some(self.uv)
    }
}

/// Diffuse texture lit by one point light, with optional tangent-space normal mapping.
///
/// Sampler uniforms hold texture unit numbers. A missing diffuse texture
/// shades white; a missing normal map falls back to the interpolated normal.
#[derive(Debug, Clone)]
pub struct NormalMapShader {
    pub ambient: f32,
}

impl Default for NormalMapShader {
    fn default() -> Self {
        Self { ambient: 0.1 }
    }
}

impl NormalMapShader {
    fn shading_normal(&self, env: &ShaderEnv<'_>, varying: &NormalMapVarying, uv_density: f32) -> Vector3<f32> {
        let geom_normal = varying.normal.normalize();
        if !env.bool(U_NORMALS_ENABLED) {
            return geom_normal;
        }
        let Some(normal_map) = env.sampler(U_NORMAL_MAP) else {
            return geom_normal;
        };
        if varying.tangent.norm_squared() < 1e-12 || varying.bitangent.norm_squared() < 1e-12 {
            return geom_normal;
        }

        // Re-orthogonalize T against the interpolated N.
        let t = (varying.tangent - geom_normal * geom_normal.dot(&varying.tangent)).normalize();
        let b = varying.bitangent.normalize();
        let tbn = Matrix3::from_columns(&[t, b, geom_normal]);

        let packed = normal_map.sample(&varying.uv, uv_density);
        let local = packed.xyz() * 2.0 - Vector3::repeat(1.0);
        let n = tbn * local;
        if n.iter().all(|c| c.is_finite()) && n.norm_squared() > 1e-12 {
            n.normalize()
        } else {
            geom_normal
        }
    }
}

impl Shader for NormalMapShader {
    type Varying = NormalMapVarying;

    fn interface(&self) -> ProgramInterface {
        ProgramInterface {
            attributes: &ATTRIBUTES,
            uniforms: &UNIFORMS,
        }
    }

    fn vertex(&self, env: &ShaderEnv<'_>, attributes: &[Vector4<f32>]) -> (Vector4<f32>, Self::Varying) {
        let model = env.mat4(U_MODEL);
        let normal_matrix: Matrix3<f32> = env.mat3(U_NORMAL_MATRIX);

        let position = attributes[A_POSITION];
        let world = model * position;
        let clip = env.mat4(U_PROJECTION) * env.mat4(U_VIEW) * world;

        (
            clip,
            NormalMapVarying {
                world_pos: Point3::from(world.xyz()),
                normal: normal_matrix * attributes[A_NORMAL].xyz(),
                uv: attributes[A_TEXCOORD].xy(),
                tangent: normal_matrix * attributes[A_TANGENT].xyz(),
                bitangent: normal_matrix * attributes[A_BITANGENT].xyz(),
            },
        )
    }

    fn fragment(&self, env: &ShaderEnv<'_>, varying: Self::Varying, uv_density: f32) -> Vector4<f32> {
        let albedo = env
            .sampler(U_DIFFUSE_MAP)
            .map(|tex| tex.sample(&varying.uv, uv_density))
            .unwrap_or_else(|| Vector4::repeat(1.0));

        let n = self.shading_normal(env, &varying, uv_density);
        let light = PointLight::new(
            Point3::from(env.vec3(U_LIGHT_POSITION)),
            env.vec3(U_LIGHT_INTENSITIES),
        );
        let l = light.direction_from(&varying.world_pos);
        let n_dot_l = n.dot(&l).max(0.0);

        let lighting = Vector3::repeat(self.ambient) + light.intensities * n_dot_l;
        let rgb = albedo.xyz().component_mul(&lighting);
        Vector4::new(rgb.x, rgb.y, rgb.z, 1.0)
    }
}
