pub mod app;
pub mod backend;
pub mod core;
pub mod io;
pub mod pipeline;
pub mod scene;
