//! Per-frame render pass over a [`Backend`].
//!
//! [`init_render_state`] resolves every program name and uploads the mesh,
//! textures and target once. [`render_frame`] then replays the same binding
//! sequence for each rotation state, and [`present`] reads the result back.

use crate::backend::{
    AttributeLocation, AttributePointer, Backend, BackendError, BufferId, TargetId, TextureId,
    UniformLocation, UniformValue,
};
use crate::core::geometry::{VERTEX_LAYOUT, Vertex};
use crate::core::math::transform::TransformFactory;
use crate::scene::animation::RotationState;
use crate::scene::camera::Camera;
use crate::scene::light::PointLight;
use crate::scene::mesh::Mesh;
use crate::scene::texture::{ColorSpace, Filter, TextureOptions};
use image::{DynamicImage, ImageError, RgbaImage};
use log::{debug, info};
use nalgebra::{Vector3, Vector4};
use std::path::Path;

const DIFFUSE_UNIT: u32 = 0;
const NORMAL_MAP_UNIT: u32 = 1;
const ATTRIBUTE_COUNT: usize = VERTEX_LAYOUT.len();

/// Fixed per-run parameters of the pass.
#[derive(Debug, Clone)]
pub struct FrameSettings {
    pub width: u32,
    pub height: u32,
    /// Sub-samples per axis of the offscreen target.
    pub samples: u32,
    pub clear_color: Vector4<f32>,
    pub camera: Camera,
    pub light: PointLight,
    pub model_translation: Vector3<f32>,
    pub model_scale: f32,
    pub normals_enabled: bool,
}

impl FrameSettings {
    /// Defaults for a `width` x `height` target, camera aspect included.
    pub fn new(width: u32, height: u32) -> Self {
        let mut camera = Camera::default();
        camera.aspect_ratio = width as f32 / height.max(1) as f32;
        camera.update_matrices();
        Self {
            width,
            height,
            samples: 2,
            clear_color: Vector4::zeros(),
            camera,
            light: PointLight::default(),
            model_translation: Vector3::zeros(),
            model_scale: 0.42,
            normals_enabled: true,
        }
    }
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self::new(600, 600)
    }
}

/// Decoded source images for the two texture units.
pub struct SceneTextures {
    pub diffuse: DynamicImage,
    pub normal_map: DynamicImage,
}

impl SceneTextures {
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(diffuse: P, normal_map: Q) -> Result<Self, ImageError> {
        info!("Loading diffuse texture: {}", diffuse.as_ref().display());
        let diffuse = image::open(diffuse)?;
        info!("Loading normal map: {}", normal_map.as_ref().display());
        let normal_map = image::open(normal_map)?;
        Ok(Self { diffuse, normal_map })
    }

    pub fn diffuse_options() -> TextureOptions {
        TextureOptions {
            color_space: ColorSpace::Srgb,
            filter: Filter::LinearMipmapLinear,
            generate_mipmaps: true,
        }
    }

    pub fn normal_map_options() -> TextureOptions {
        TextureOptions {
            color_space: ColorSpace::Linear,
            filter: Filter::LinearMipmapLinear,
            generate_mipmaps: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bindings {
    attributes: [AttributeLocation; ATTRIBUTE_COUNT],
    view: UniformLocation,
    projection: UniformLocation,
    model: UniformLocation,
    normal_matrix: UniformLocation,
    light_position: UniformLocation,
    light_intensities: UniformLocation,
    normals_enabled: UniformLocation,
    diffuse_map: UniformLocation,
    normal_map: UniformLocation,
}

impl Bindings {
    fn resolve<B: Backend>(backend: &B) -> Result<Self, BackendError> {
        let mut attributes = [AttributeLocation(0); ATTRIBUTE_COUNT];
        for (slot, attribute) in attributes.iter_mut().zip(VERTEX_LAYOUT.iter()) {
            *slot = backend.attribute_location(attribute.name)?;
        }
        Ok(Self {
            attributes,
            view: backend.uniform_location("view")?,
            projection: backend.uniform_location("projection")?,
            model: backend.uniform_location("model")?,
            normal_matrix: backend.uniform_location("normalMatrix")?,
            light_position: backend.uniform_location("lightPosition")?,
            light_intensities: backend.uniform_location("lightIntensities")?,
            normals_enabled: backend.uniform_location("normalsEnabled")?,
            diffuse_map: backend.uniform_location("diffuseMap")?,
            normal_map: backend.uniform_location("normalMap")?,
        })
    }
}

/// Everything a frame needs: the backend, resolved names and GPU handles.
pub struct RenderState<B: Backend> {
    backend: B,
    bindings: Bindings,
    vertex_buffer: BufferId,
    diffuse: TextureId,
    normal_map: TextureId,
    target: TargetId,
    triangle_count: usize,
    settings: FrameSettings,
    frames_rendered: u64,
}

impl<B: Backend> RenderState<B> {
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &FrameSettings {
        &self.settings
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }
}

/// One-time setup: name resolution, vertex upload, textures and target.
///
/// Fails on the first unknown attribute or uniform name.
pub fn init_render_state<B: Backend>(
    mut backend: B,
    mesh: &Mesh,
    textures: &SceneTextures,
    settings: &FrameSettings,
) -> Result<RenderState<B>, BackendError> {
    let bindings = Bindings::resolve(&backend)?;

    let vertex_buffer = backend.create_vertex_buffer(mesh.vertices())?;
    let diffuse = backend.create_texture(&textures.diffuse, SceneTextures::diffuse_options())?;
    let normal_map = backend.create_texture(&textures.normal_map, SceneTextures::normal_map_options())?;
    let target = backend.create_target(settings.width, settings.height, settings.samples)?;

    info!(
        "Render state ready: {} triangles, {}x{} target",
        mesh.triangle_count(),
        settings.width,
        settings.height
    );

    Ok(RenderState {
        backend,
        bindings,
        vertex_buffer,
        diffuse,
        normal_map,
        target,
        triangle_count: mesh.triangle_count(),
        settings: settings.clone(),
        frames_rendered: 0,
    })
}

/// Renders the mesh at `rotation` into the offscreen target.
pub fn render_frame<B: Backend>(state: &mut RenderState<B>, rotation: &RotationState) -> Result<(), BackendError> {
    let RenderState {
        backend,
        bindings,
        vertex_buffer,
        diffuse,
        normal_map,
        target,
        triangle_count,
        settings,
        frames_rendered,
    } = state;

    backend.bind_target(Some(*target))?;
    backend.set_depth_test(true);
    backend.set_multisample(true);
    backend.clear(settings.clear_color)?;

    let view = settings.camera.view_matrix();
    let projection = settings.camera.projection_matrix();
    let model = TransformFactory::model(&settings.model_translation, &rotation.angles, settings.model_scale);
    let normal_matrix = TransformFactory::normal_matrix(&model);

    backend.set_uniform(bindings.view, UniformValue::Mat4(view))?;
    backend.set_uniform(bindings.projection, UniformValue::Mat4(projection))?;
    backend.set_uniform(bindings.model, UniformValue::Mat4(model))?;
    backend.set_uniform(bindings.normal_matrix, UniformValue::Mat3(normal_matrix))?;
    backend.set_uniform(
        bindings.light_position,
        UniformValue::Vec3(settings.light.position.coords),
    )?;
    backend.set_uniform(
        bindings.light_intensities,
        UniformValue::Vec3(settings.light.intensities),
    )?;
    backend.set_uniform(bindings.normals_enabled, UniformValue::Bool(settings.normals_enabled))?;

    backend.bind_buffer(Some(*vertex_buffer))?;
    for (&location, attribute) in bindings.attributes.iter().zip(VERTEX_LAYOUT.iter()) {
        backend.enable_attribute(location)?;
        backend.set_attribute_buffer(
            location,
            AttributePointer {
                components: attribute.components,
                offset: attribute.offset,
                stride: Vertex::STRIDE,
            },
        )?;
    }
    backend.bind_buffer(None)?;

    backend.bind_texture(DIFFUSE_UNIT, Some(*diffuse))?;
    backend.bind_texture(NORMAL_MAP_UNIT, Some(*normal_map))?;
    backend.set_uniform(bindings.diffuse_map, UniformValue::Int(DIFFUSE_UNIT as i32))?;
    backend.set_uniform(bindings.normal_map, UniformValue::Int(NORMAL_MAP_UNIT as i32))?;

    backend.draw_arrays(0, 3 * *triangle_count)?;

    for &location in &bindings.attributes {
        backend.disable_attribute(location)?;
    }
    backend.bind_texture(DIFFUSE_UNIT, None)?;
    backend.bind_texture(NORMAL_MAP_UNIT, None)?;
    backend.bind_target(None)?;

    *frames_rendered += 1;
    debug!(
        "Frame {} rendered at angles ({:.1}, {:.1}, {:.1})",
        frames_rendered, rotation.angles.x, rotation.angles.y, rotation.angles.z
    );
    Ok(())
}

/// Copies the target's resolved color image out of the backend.
pub fn present<B: Backend>(state: &RenderState<B>) -> Result<RgbaImage, BackendError> {
    state.backend.target_image(state.target)
}

/// Frees every object created by [`init_render_state`] and returns the backend.
pub fn release_render_state<B: Backend>(state: RenderState<B>) -> Result<B, BackendError> {
    let RenderState {
        mut backend,
        vertex_buffer,
        diffuse,
        normal_map,
        target,
        frames_rendered,
        ..
    } = state;
    backend.release_buffer(vertex_buffer)?;
    backend.release_texture(diffuse)?;
    backend.release_texture(normal_map)?;
    backend.release_target(target)?;
    info!("Released render state after {} frames", frames_rendered);
    Ok(backend)
}
