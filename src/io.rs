pub mod config;
pub mod error;
pub mod image;
pub mod json_loader;
pub mod mesh_source;
pub mod obj_loader;
