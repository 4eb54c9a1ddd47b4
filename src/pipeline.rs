pub mod frame;
pub mod shaders;
