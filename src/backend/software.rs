use crate::backend::{
    AttributeLocation, AttributePointer, Backend, BackendError, BindingKind, BufferId, TargetId,
    TextureId, UniformLocation, UniformValue,
};
use crate::core::framebuffer::FrameBuffer;
use crate::core::geometry::Vertex;
use crate::core::pipeline::{Shader, ShaderEnv};
use crate::core::rasterizer::Rasterizer;
use crate::scene::texture::{Texture, TextureOptions};
use image::{DynamicImage, RgbaImage};
use log::{debug, trace};
use nalgebra::Vector4;
use std::sync::Arc;

/// Number of texture units a program can sample from.
pub const TEXTURE_UNITS: usize = 8;

#[derive(Debug, Clone, Copy, Default)]
struct AttributeState {
    enabled: bool,
    source: Option<(BufferId, AttributePointer)>,
}

/// Slot storage for backend objects; a released slot becomes `None` and its
/// handle stays invalid.
struct Slots<T> {
    items: Vec<Option<T>>,
    kind: &'static str,
}

impl<T> Slots<T> {
    fn new(kind: &'static str) -> Self {
        Self { items: Vec::new(), kind }
    }

    fn insert(&mut self, item: T) -> u32 {
        self.items.push(Some(item));
        (self.items.len() - 1) as u32
    }

    fn get(&self, id: u32) -> Result<&T, BackendError> {
        self.items
            .get(id as usize)
            .and_then(Option::as_ref)
            .ok_or(BackendError::InvalidHandle(self.kind))
    }

    fn get_mut(&mut self, id: u32) -> Result<&mut T, BackendError> {
        self.items
            .get_mut(id as usize)
            .and_then(Option::as_mut)
            .ok_or(BackendError::InvalidHandle(self.kind))
    }

    fn remove(&mut self, id: u32) -> Result<T, BackendError> {
        self.items
            .get_mut(id as usize)
            .and_then(Option::take)
            .ok_or(BackendError::InvalidHandle(self.kind))
    }

    fn live(&self) -> usize {
        self.items.iter().filter(|i| i.is_some()).count()
    }
}

/// A CPU implementation of [`Backend`] running a single linked [`Shader`].
///
/// Vertex buffers are raw bytes, so attribute pointers are honoured exactly as
/// a GPU would: floats are fetched at `offset + stride * index`.
pub struct SoftwareBackend<S: Shader> {
    program: S,
    uniforms: Vec<Option<UniformValue>>,
    attributes: Vec<AttributeState>,

    buffers: Slots<Vec<u8>>,
    textures: Slots<Arc<Texture>>,
    targets: Slots<FrameBuffer>,

    bound_buffer: Option<BufferId>,
    bound_target: Option<TargetId>,
    texture_units: [Option<(TextureId, Arc<Texture>)>; TEXTURE_UNITS],

    depth_test: bool,
    multisample: bool,
}

impl<S: Shader> SoftwareBackend<S> {
    /// "Links" `program`: sizes uniform and attribute tables from its interface.
    pub fn new(program: S) -> Self {
        let interface = program.interface();
        debug!(
            "Linked software program: {} attributes, {} uniforms",
            interface.attributes.len(),
            interface.uniforms.len()
        );
        Self {
            uniforms: vec![None; interface.uniforms.len()],
            attributes: vec![AttributeState::default(); interface.attributes.len()],
            program,
            buffers: Slots::new("buffer"),
            textures: Slots::new("texture"),
            targets: Slots::new("target"),
            bound_buffer: None,
            bound_target: None,
            texture_units: Default::default(),
            depth_test: false,
            multisample: false,
        }
    }

    /// Objects still alive as (buffers, textures, targets).
    pub fn live_objects(&self) -> (usize, usize, usize) {
        (self.buffers.live(), self.textures.live(), self.targets.live())
    }

    fn attribute_mut(&mut self, location: AttributeLocation) -> Result<&mut AttributeState, BackendError> {
        self.attributes
            .get_mut(location.0 as usize)
            .ok_or(BackendError::InvalidHandle("attribute"))
    }

    /// Reads every attribute of vertex `index`; disabled ones read as (0, 0, 0, 1).
    fn fetch_vertex(&self, index: usize, out: &mut [Vector4<f32>]) -> Result<(), BackendError> {
        for (slot, state) in out.iter_mut().zip(&self.attributes) {
            *slot = Vector4::new(0.0, 0.0, 0.0, 1.0);
            let (true, Some((buffer, pointer))) = (state.enabled, state.source) else {
                continue;
            };
            let bytes = self.buffers.get(buffer.0)?;
            let start = pointer.offset + pointer.stride * index;
            let end = start + pointer.components * size_of::<f32>();
            let data = bytes.get(start..end).ok_or(BackendError::AttributeOutOfBounds)?;
            for (c, chunk) in data.chunks_exact(size_of::<f32>()).enumerate() {
                slot[c] = bytemuck::pod_read_unaligned::<f32>(chunk);
            }
        }
        Ok(())
    }
}

impl<S: Shader> Backend for SoftwareBackend<S> {
    fn attribute_location(&self, name: &str) -> Result<AttributeLocation, BackendError> {
        self.program
            .interface()
            .attribute_location(name)
            .map(|l| AttributeLocation(l as u32))
            .ok_or_else(|| BackendError::Binding {
                kind: BindingKind::Attribute,
                name: name.to_string(),
            })
    }

    fn uniform_location(&self, name: &str) -> Result<UniformLocation, BackendError> {
        self.program
            .interface()
            .uniform_location(name)
            .map(|l| UniformLocation(l as u32))
            .ok_or_else(|| BackendError::Binding {
                kind: BindingKind::Uniform,
                name: name.to_string(),
            })
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) -> Result<(), BackendError> {
        let slot = self
            .uniforms
            .get_mut(location.0 as usize)
            .ok_or(BackendError::InvalidHandle("uniform"))?;
        *slot = Some(value);
        Ok(())
    }

    fn create_vertex_buffer(&mut self, vertices: &[Vertex]) -> Result<BufferId, BackendError> {
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        debug!("Uploading vertex buffer: {} vertices, {} bytes", vertices.len(), bytes.len());
        Ok(BufferId(self.buffers.insert(bytes.to_vec())))
    }

    fn bind_buffer(&mut self, buffer: Option<BufferId>) -> Result<(), BackendError> {
        if let Some(id) = buffer {
            self.buffers.get(id.0)?;
        }
        self.bound_buffer = buffer;
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferId) -> Result<(), BackendError> {
        self.buffers.remove(buffer.0)?;
        if self.bound_buffer == Some(buffer) {
            self.bound_buffer = None;
        }
        for state in &mut self.attributes {
            if matches!(state.source, Some((id, _)) if id == buffer) {
                state.source = None;
            }
        }
        Ok(())
    }

    fn enable_attribute(&mut self, location: AttributeLocation) -> Result<(), BackendError> {
        self.attribute_mut(location)?.enabled = true;
        Ok(())
    }

    fn set_attribute_buffer(
        &mut self,
        location: AttributeLocation,
        pointer: AttributePointer,
    ) -> Result<(), BackendError> {
        if !(1..=4).contains(&pointer.components) {
            return Err(BackendError::InvalidComponentCount(pointer.components));
        }
        let buffer = self.bound_buffer.ok_or(BackendError::NoBufferBound)?;
        self.attribute_mut(location)?.source = Some((buffer, pointer));
        Ok(())
    }

    fn disable_attribute(&mut self, location: AttributeLocation) -> Result<(), BackendError> {
        self.attribute_mut(location)?.enabled = false;
        Ok(())
    }

    fn create_texture(&mut self, image: &DynamicImage, options: TextureOptions) -> Result<TextureId, BackendError> {
        let texture = Texture::from_image(image, options);
        Ok(TextureId(self.textures.insert(Arc::new(texture))))
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) -> Result<(), BackendError> {
        let bound = match texture {
            Some(id) => Some((id, Arc::clone(self.textures.get(id.0)?))),
            None => None,
        };
        let slot = self
            .texture_units
            .get_mut(unit as usize)
            .ok_or(BackendError::InvalidTextureUnit(unit))?;
        *slot = bound;
        Ok(())
    }

    fn release_texture(&mut self, texture: TextureId) -> Result<(), BackendError> {
        self.textures.remove(texture.0)?;
        for unit in &mut self.texture_units {
            if matches!(unit, Some((id, _)) if *id == texture) {
                *unit = None;
            }
        }
        Ok(())
    }

    fn create_target(&mut self, width: u32, height: u32, samples: u32) -> Result<TargetId, BackendError> {
        debug!("Creating offscreen target {}x{} ({}x{} samples)", width, height, samples, samples);
        let fb = FrameBuffer::new(width as usize, height as usize, samples as usize);
        Ok(TargetId(self.targets.insert(fb)))
    }

    fn bind_target(&mut self, target: Option<TargetId>) -> Result<(), BackendError> {
        if let Some(id) = target {
            self.targets.get(id.0)?;
        }
        self.bound_target = target;
        Ok(())
    }

    fn target_image(&self, target: TargetId) -> Result<RgbaImage, BackendError> {
        Ok(self.targets.get(target.0)?.to_image(self.multisample))
    }

    fn release_target(&mut self, target: TargetId) -> Result<(), BackendError> {
        self.targets.remove(target.0)?;
        if self.bound_target == Some(target) {
            self.bound_target = None;
        }
        Ok(())
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
    }

    fn set_multisample(&mut self, enabled: bool) {
        self.multisample = enabled;
    }

    fn clear(&mut self, color: Vector4<f32>) -> Result<(), BackendError> {
        let id = self.bound_target.ok_or(BackendError::NoTargetBound)?;
        self.targets.get_mut(id.0)?.clear(color, 1.0);
        Ok(())
    }

    fn draw_arrays(&mut self, first: usize, count: usize) -> Result<(), BackendError> {
        let id = self.bound_target.ok_or(BackendError::NoTargetBound)?;
        let framebuffer = self.targets.get(id.0)?;
        let rasterizer = Rasterizer {
            depth_test: self.depth_test,
        };

        let units: Vec<Option<Arc<Texture>>> = self
            .texture_units
            .iter()
            .map(|u| u.as_ref().map(|(_, tex)| Arc::clone(tex)))
            .collect();
        let env = ShaderEnv {
            uniforms: &self.uniforms,
            texture_units: &units,
        };

        let mut attributes = vec![Vector4::zeros(); self.attributes.len()];
        let triangles = count / 3;
        for t in 0..triangles {
            let base = first + 3 * t;
            let mut corners = Vec::with_capacity(3);
            for i in base..base + 3 {
                self.fetch_vertex(i, &mut attributes)?;
                corners.push(self.program.vertex(&env, &attributes));
            }
            let triangle = [corners[0], corners[1], corners[2]];
            rasterizer.draw_triangle(framebuffer, &self.program, &env, triangle);
        }
        trace!("draw_arrays: {} triangles", triangles);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::{Interpolatable, ProgramInterface};
    use crate::scene::mesh::Mesh;
    use std::mem::offset_of;
    use std::ops::{Add, Mul};

    #[derive(Clone, Copy)]
    struct Uv(nalgebra::Vector2<f32>);

    impl Add for Uv {
        type Output = Self;
        fn add(self, o: Self) -> Self {
            Uv(self.0 + o.0)
        }
    }

    impl Mul<f32> for Uv {
        type Output = Self;
        fn mul(self, s: f32) -> Self {
            Uv(self.0 * s)
        }
    }

    impl Interpolatable for Uv {}

    /// Passes positions straight to clip space and outputs the `tint` uniform.
    struct Passthrough;

    impl Shader for Passthrough {
        type Varying = Uv;

        fn interface(&self) -> ProgramInterface {
            ProgramInterface {
                attributes: &["position", "texcoord"],
                uniforms: &["tint"],
            }
        }

        fn vertex(&self, _: &ShaderEnv<'_>, attributes: &[Vector4<f32>]) -> (Vector4<f32>, Uv) {
            (attributes[0], Uv(attributes[1].xy()))
        }

        fn fragment(&self, env: &ShaderEnv<'_>, _: Uv, _: f32) -> Vector4<f32> {
            env.vec3(0).push(1.0)
        }
    }

    fn bind_position(backend: &mut SoftwareBackend<Passthrough>, buffer: BufferId) {
        let loc = backend.attribute_location("position").unwrap();
        backend.bind_buffer(Some(buffer)).unwrap();
        backend.enable_attribute(loc).unwrap();
        backend
            .set_attribute_buffer(
                loc,
                AttributePointer {
                    components: 3,
                    offset: offset_of!(Vertex, position),
                    stride: Vertex::STRIDE,
                },
            )
            .unwrap();
        backend.bind_buffer(None).unwrap();
    }

    #[test]
    fn test_unknown_names_are_binding_errors() {
        let backend = SoftwareBackend::new(Passthrough);
        assert_eq!(backend.attribute_location("texcoord").unwrap(), AttributeLocation(1));
        assert!(matches!(
            backend.uniform_location("model"),
            Err(BackendError::Binding { kind: BindingKind::Uniform, .. })
        ));
        assert!(matches!(
            backend.attribute_location("bogus"),
            Err(BackendError::Binding { kind: BindingKind::Attribute, .. })
        ));
    }

    #[test]
    fn test_fetch_honours_pointer_layout() {
        let mut backend = SoftwareBackend::new(Passthrough);
        let mesh = Mesh::create_test_triangle();
        let buffer = backend.create_vertex_buffer(mesh.vertices()).unwrap();
        bind_position(&mut backend, buffer);

        let mut out = vec![Vector4::zeros(); 2];
        backend.fetch_vertex(1, &mut out).unwrap();
        let p = mesh.vertices()[1].position;
        assert_eq!(out[0], Vector4::new(p.x, p.y, p.z, 1.0));
        // Disabled attribute reads the default.
        assert_eq!(out[1], Vector4::new(0.0, 0.0, 0.0, 1.0));

        assert!(matches!(backend.fetch_vertex(3, &mut out), Err(BackendError::AttributeOutOfBounds)));
    }

    #[test]
    fn test_pointer_requires_bound_buffer() {
        let mut backend = SoftwareBackend::new(Passthrough);
        let loc = backend.attribute_location("position").unwrap();
        let pointer = AttributePointer {
            components: 3,
            offset: 0,
            stride: Vertex::STRIDE,
        };
        assert!(matches!(
            backend.set_attribute_buffer(loc, pointer),
            Err(BackendError::NoBufferBound)
        ));
    }

    #[test]
    fn test_pointer_rejects_component_count_out_of_range() {
        let mut backend = SoftwareBackend::new(Passthrough);
        let buffer = backend.create_vertex_buffer(Mesh::create_test_triangle().vertices()).unwrap();
        let loc = backend.attribute_location("position").unwrap();
        backend.bind_buffer(Some(buffer)).unwrap();

        for components in [0, 5] {
            let pointer = AttributePointer {
                components,
                offset: 0,
                stride: Vertex::STRIDE,
            };
            assert!(matches!(
                backend.set_attribute_buffer(loc, pointer),
                Err(BackendError::InvalidComponentCount(n)) if n == components
            ));
        }

        // The rejected pointers leave the attribute without a source.
        backend.enable_attribute(loc).unwrap();
        let mut out = [Vector4::zeros(); 2];
        backend.fetch_vertex(0, &mut out).unwrap();
        assert_eq!(out[0], Vector4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_draw_requires_target() {
        let mut backend = SoftwareBackend::new(Passthrough);
        assert!(matches!(backend.draw_arrays(0, 3), Err(BackendError::NoTargetBound)));
        assert!(matches!(backend.clear(Vector4::zeros()), Err(BackendError::NoTargetBound)));
    }

    #[test]
    fn test_draw_fills_triangle_with_uniform_color() {
        let mut backend = SoftwareBackend::new(Passthrough);
        let mesh = Mesh::create_test_triangle();
        let buffer = backend.create_vertex_buffer(mesh.vertices()).unwrap();
        let target = backend.create_target(16, 16, 1).unwrap();

        backend.bind_target(Some(target)).unwrap();
        backend.set_depth_test(true);
        backend.clear(Vector4::new(0.0, 0.0, 0.0, 0.0)).unwrap();
        let tint = backend.uniform_location("tint").unwrap();
        backend
            .set_uniform(tint, UniformValue::Vec3(nalgebra::Vector3::new(1.0, 0.0, 0.0)))
            .unwrap();
        bind_position(&mut backend, buffer);
        backend.draw_arrays(0, mesh.len()).unwrap();
        backend.bind_target(None).unwrap();

        let img = backend.target_image(target).unwrap();
        // Triangle spans the middle of the target; corners stay clear.
        assert_eq!(img.get_pixel(8, 8).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_release_invalidates_handles() {
        let mut backend = SoftwareBackend::new(Passthrough);
        let buffer = backend.create_vertex_buffer(Mesh::create_test_triangle().vertices()).unwrap();
        let target = backend.create_target(4, 4, 2).unwrap();
        let img = DynamicImage::new_rgba8(2, 2);
        let texture = backend.create_texture(&img, TextureOptions::default()).unwrap();
        backend.bind_texture(0, Some(texture)).unwrap();
        assert_eq!(backend.live_objects(), (1, 1, 1));

        backend.release_buffer(buffer).unwrap();
        backend.release_texture(texture).unwrap();
        backend.release_target(target).unwrap();
        assert_eq!(backend.live_objects(), (0, 0, 0));

        assert!(matches!(backend.bind_buffer(Some(buffer)), Err(BackendError::InvalidHandle("buffer"))));
        assert!(matches!(backend.bind_texture(0, Some(texture)), Err(BackendError::InvalidHandle("texture"))));
        assert!(matches!(backend.bind_texture(99, None), Err(BackendError::InvalidTextureUnit(99))));
        assert!(backend.target_image(target).is_err());
    }
}
