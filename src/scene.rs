pub mod animation;
pub mod camera;
pub mod light;
pub mod mesh;
pub mod tangent;
pub mod texture;
