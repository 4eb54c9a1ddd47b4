//! A backend that records every call, for asserting pipeline order in tests.

use crate::backend::{
    AttributeLocation, AttributePointer, Backend, BackendError, BindingKind, BufferId, TargetId,
    TextureId, UniformLocation, UniformValue,
};
use crate::core::geometry::Vertex;
use crate::scene::texture::TextureOptions;
use image::{DynamicImage, RgbaImage};
use nalgebra::Vector4;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetUniform(String, UniformValue),
    CreateVertexBuffer(usize),
    BindBuffer(Option<BufferId>),
    ReleaseBuffer(BufferId),
    EnableAttribute(String),
    SetAttributeBuffer(String, AttributePointer),
    DisableAttribute(String),
    CreateTexture(TextureOptions),
    BindTexture(u32, Option<TextureId>),
    ReleaseTexture(TextureId),
    CreateTarget(u32, u32, u32),
    BindTarget(Option<TargetId>),
    ReleaseTarget(TargetId),
    DepthTest(bool),
    Multisample(bool),
    Clear(Vector4<f32>),
    DrawArrays(usize, usize),
}

pub struct RecordingBackend {
    attributes: Vec<String>,
    uniforms: Vec<String>,
    next_id: u32,
    pub calls: Vec<Call>,
}

impl RecordingBackend {
    pub fn new(attributes: &[&str], uniforms: &[&str]) -> Self {
        Self {
            attributes: attributes.iter().map(|s| s.to_string()).collect(),
            uniforms: uniforms.iter().map(|s| s.to_string()).collect(),
            next_id: 0,
            calls: Vec::new(),
        }
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn attribute_name(&self, location: AttributeLocation) -> String {
        self.attributes[location.0 as usize].clone()
    }
}

impl Backend for RecordingBackend {
    fn attribute_location(&self, name: &str) -> Result<AttributeLocation, BackendError> {
        self.attributes
            .iter()
            .position(|a| a == name)
            .map(|i| AttributeLocation(i as u32))
            .ok_or_else(|| BackendError::Binding {
                kind: BindingKind::Attribute,
                name: name.to_string(),
            })
    }

    fn uniform_location(&self, name: &str) -> Result<UniformLocation, BackendError> {
        self.uniforms
            .iter()
            .position(|u| u == name)
            .map(|i| UniformLocation(i as u32))
            .ok_or_else(|| BackendError::Binding {
                kind: BindingKind::Uniform,
                name: name.to_string(),
            })
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) -> Result<(), BackendError> {
        let name = self.uniforms[location.0 as usize].clone();
        self.calls.push(Call::SetUniform(name, value));
        Ok(())
    }

    fn create_vertex_buffer(&mut self, vertices: &[Vertex]) -> Result<BufferId, BackendError> {
        self.calls.push(Call::CreateVertexBuffer(vertices.len()));
        Ok(BufferId(self.next()))
    }

    fn bind_buffer(&mut self, buffer: Option<BufferId>) -> Result<(), BackendError> {
        self.calls.push(Call::BindBuffer(buffer));
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferId) -> Result<(), BackendError> {
        self.calls.push(Call::ReleaseBuffer(buffer));
        Ok(())
    }

    fn enable_attribute(&mut self, location: AttributeLocation) -> Result<(), BackendError> {
        let name = self.attribute_name(location);
        self.calls.push(Call::EnableAttribute(name));
        Ok(())
    }

    fn set_attribute_buffer(
        &mut self,
        location: AttributeLocation,
        pointer: AttributePointer,
    ) -> Result<(), BackendError> {
        let name = self.attribute_name(location);
        self.calls.push(Call::SetAttributeBuffer(name, pointer));
        Ok(())
    }

    fn disable_attribute(&mut self, location: AttributeLocation) -> Result<(), BackendError> {
        let name = self.attribute_name(location);
        self.calls.push(Call::DisableAttribute(name));
        Ok(())
    }

    fn create_texture(&mut self, _image: &DynamicImage, options: TextureOptions) -> Result<TextureId, BackendError> {
        self.calls.push(Call::CreateTexture(options));
        Ok(TextureId(self.next()))
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) -> Result<(), BackendError> {
        self.calls.push(Call::BindTexture(unit, texture));
        Ok(())
    }

    fn release_texture(&mut self, texture: TextureId) -> Result<(), BackendError> {
        self.calls.push(Call::ReleaseTexture(texture));
        Ok(())
    }

    fn create_target(&mut self, width: u32, height: u32, samples: u32) -> Result<TargetId, BackendError> {
        self.calls.push(Call::CreateTarget(width, height, samples));
        Ok(TargetId(self.next()))
    }

    fn bind_target(&mut self, target: Option<TargetId>) -> Result<(), BackendError> {
        self.calls.push(Call::BindTarget(target));
        Ok(())
    }

    fn target_image(&self, _target: TargetId) -> Result<RgbaImage, BackendError> {
        Ok(RgbaImage::new(1, 1))
    }

    fn release_target(&mut self, target: TargetId) -> Result<(), BackendError> {
        self.calls.push(Call::ReleaseTarget(target));
        Ok(())
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.calls.push(Call::DepthTest(enabled));
    }

    fn set_multisample(&mut self, enabled: bool) {
        self.calls.push(Call::Multisample(enabled));
    }

    fn clear(&mut self, color: Vector4<f32>) -> Result<(), BackendError> {
        self.calls.push(Call::Clear(color));
        Ok(())
    }

    fn draw_arrays(&mut self, first: usize, count: usize) -> Result<(), BackendError> {
        self.calls.push(Call::DrawArrays(first, count));
        Ok(())
    }
}
