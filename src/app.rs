use crate::backend::BackendError;
use crate::backend::software::SoftwareBackend;
use crate::io::config::{Config, ConfigError};
use crate::io::error::ImportError;
use crate::io::image::save_frame;
use crate::io::mesh_source::{MeshSource, load_mesh};
use crate::pipeline::frame::{
    FrameSettings, SceneTextures, init_render_state, present, release_render_state, render_frame,
};
use crate::pipeline::shaders::normal_map::NormalMapShader;
use crate::scene::animation::TickDriver;
use crate::scene::camera::Camera;
use crate::scene::light::PointLight;
use log::{debug, info};
use nalgebra::{Point3, Vector3, Vector4};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("mesh import failed: {0}")]
    Import(#[from] ImportError),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("render backend error: {0}")]
    Backend(#[from] BackendError),
}

/// What a headless run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub frames_rendered: u64,
    pub saved: Vec<PathBuf>,
}

/// Builds the frame pass parameters from the `[render]`, `[camera]`, `[light]` and `[model]` sections.
pub fn frame_settings(config: &Config) -> FrameSettings {
    let render = &config.render;
    let cam = &config.camera;
    let camera = Camera::new_perspective(
        Point3::from(cam.eye),
        Point3::from(cam.target),
        Vector3::from(cam.up),
        cam.fov,
        render.width as f32 / render.height.max(1) as f32,
        cam.near,
        cam.far,
    );
    FrameSettings {
        width: render.width,
        height: render.height,
        samples: render.samples.max(1),
        clear_color: Vector4::from(render.clear_color),
        camera,
        light: PointLight::new(
            Point3::from(config.light.position),
            Vector3::from(config.light.intensities),
        ),
        model_translation: Vector3::from(config.model.translation),
        model_scale: config.model.scale,
        normals_enabled: config.model.normal_mapping,
    }
}

/// Runs the headless presentation loop: render, present, then tick.
///
/// The first frame is drawn at zero rotation. Frames are written as PNG into
/// `render.output_dir`, every frame or only the last one. The driver is fed
/// one tick interval per frame, so toggles in `animation.pause_toggles` land on
/// the tick with that index.
pub fn run(config: &Config) -> Result<RunSummary, AppError> {
    let start_time = Instant::now();
    info!("Starting headless run ({} frames)...", config.render.frames);

    let source = MeshSource::new(&config.model.path, config.model.format);
    let mesh = load_mesh(&source, config.model.tangent_formula)?;
    let textures = SceneTextures::load(&config.model.diffuse_texture, &config.model.normal_texture)?;

    let settings = frame_settings(config);
    let backend = SoftwareBackend::new(NormalMapShader::default());
    let mut state = init_render_state(backend, &mesh, &textures, &settings)?;

    let mut driver = TickDriver::new(
        Vector3::from(config.animation.increments),
        Duration::from_millis(config.animation.interval_ms),
    );
    let output_dir = Path::new(&config.render.output_dir);
    let mut saved = Vec::new();

    for frame in 0..config.render.frames {
        render_frame(&mut state, driver.rotation())?;

        let last = frame + 1 == config.render.frames;
        if config.render.save_every_frame || last {
            let image = present(&state)?;
            saved.push(save_frame(&image, output_dir, frame)?);
        }

        let interval = driver.interval();
        for _ in 0..driver.due_ticks(interval) {
            if config.animation.pause_toggles.contains(&driver.ticks()) {
                driver.toggle_pause();
            }
            let outcome = driver.tick();
            debug!(
                "Tick {}: advanced = {}, paused = {}",
                driver.ticks(),
                outcome.advanced,
                driver.is_paused()
            );
        }
    }

    let frames_rendered = state.frames_rendered();
    let backend = release_render_state(state)?;
    let (buffers, textures, targets) = backend.live_objects();
    debug!(
        "Backend objects left: {} buffers, {} textures, {} targets",
        buffers, textures, targets
    );

    info!(
        "Rendered {} frames in {:.2?}, saved {}",
        frames_rendered,
        start_time.elapsed(),
        saved.len()
    );
    Ok(RunSummary {
        frames_rendered,
        saved,
    })
}
