//! In-memory [`Device`] that records every call, for tests.

use std::collections::HashMap;
use std::convert::Infallible;

use super::attribute::AttributeData;
use super::device::{
    BufferHandle, BufferTarget, Device, ProgramHandle, ScalarKind, ShaderHandle, ShaderStage,
    UniformLocation, UniformUpload, VertexLayout,
};
use super::layout::ProgramInterface;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Compile { stage: ShaderStage },
    Link { program: ProgramHandle },
    CreateBuffer { buffer: BufferHandle, target: BufferTarget },
    BufferData { buffer: BufferHandle, len: usize },
    UseProgram(ProgramHandle),
    Uniform { location: UniformLocation, value: UniformUpload },
    BindVertex { location: u32, buffer: BufferHandle },
    BindIndex { buffer: BufferHandle, kind: ScalarKind },
    Viewport { width: u32, height: u32 },
    Clear { color: [f32; 4], depth: f32 },
    Draw { count: u32 },
    EndFrame,
}

#[derive(Debug, Default)]
pub(crate) struct RecordingDevice {
    calls: Vec<Call>,
    sources: Vec<(ShaderStage, String)>,
    programs: Vec<ProgramInterface>,
    buffers: HashMap<BufferHandle, Option<AttributeData>>,
    fail_compile: Option<ShaderStage>,
    fail_link: bool,
    hidden_uniforms: Vec<String>,
}

impl RecordingDevice {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_compile(stage: ShaderStage) -> Self {
        Self {
            fail_compile: Some(stage),
            ..Self::default()
        }
    }

    pub(crate) fn failing_link() -> Self {
        Self {
            fail_link: true,
            ..Self::default()
        }
    }

    /// Device whose linked programs report no location for `name`, as a
    /// driver does for a uniform it optimised away.
    pub(crate) fn hiding_uniform(name: &str) -> Self {
        Self {
            hidden_uniforms: vec![name.to_string()],
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub(crate) fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    /// Most recent source compiled for `stage`.
    pub(crate) fn source(&self, stage: ShaderStage) -> Option<&str> {
        self.sources
            .iter()
            .rev()
            .find(|(compiled, _)| *compiled == stage)
            .map(|(_, source)| source.as_str())
    }

    pub(crate) fn interface(&self, program: ProgramHandle) -> Option<&ProgramInterface> {
        self.programs.get(program.0 as usize)
    }

    pub(crate) fn buffer_contents(&self, buffer: BufferHandle) -> Option<&AttributeData> {
        self.buffers.get(&buffer).and_then(Option::as_ref)
    }

    /// Latest value uploaded for `name` in `program`.
    pub(crate) fn last_upload(&self, program: ProgramHandle, name: &str) -> Option<UniformUpload> {
        let location = self.interface(program)?.uniform_location(name)?;
        self.calls.iter().rev().find_map(|call| match call {
            Call::Uniform {
                location: written,
                value,
            } if *written == location => Some(*value),
            _ => None,
        })
    }

    pub(crate) fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }
}

impl Device for RecordingDevice {
    type FrameError = Infallible;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, String> {
        self.calls.push(Call::Compile { stage });
        self.sources.push((stage, source.to_string()));
        if self.fail_compile == Some(stage) {
            return Err(format!("ERROR: 0:1: '{stage}' : syntax error"));
        }
        Ok(ShaderHandle(self.sources.len() as u32 - 1))
    }

    fn link_program(
        &mut self,
        _vertex: ShaderHandle,
        _fragment: ShaderHandle,
        interface: ProgramInterface,
    ) -> Result<ProgramHandle, String> {
        if self.fail_link {
            return Err("vertex output v_color does not match any fragment input".to_string());
        }
        let program = ProgramHandle(self.programs.len() as u32);
        self.programs.push(interface);
        self.calls.push(Call::Link { program });
        Ok(program)
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        if self.hidden_uniforms.iter().any(|hidden| hidden == name) {
            return None;
        }
        self.interface(program)?.uniform_location(name)
    }

    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        self.interface(program)?.attribute_location(name)
    }

    fn create_buffer(&mut self, target: BufferTarget) -> BufferHandle {
        let buffer = BufferHandle(self.buffers.len() as u32);
        self.buffers.insert(buffer, None);
        self.calls.push(Call::CreateBuffer { buffer, target });
        buffer
    }

    fn buffer_data(&mut self, buffer: BufferHandle, data: &AttributeData) {
        self.buffers.insert(buffer, Some(data.clone()));
        self.calls.push(Call::BufferData {
            buffer,
            len: data.len(),
        });
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.calls.push(Call::UseProgram(program));
    }

    fn upload_uniform(&mut self, location: UniformLocation, value: UniformUpload) {
        self.calls.push(Call::Uniform { location, value });
    }

    fn bind_vertex_buffer(&mut self, location: u32, buffer: BufferHandle, _layout: VertexLayout) {
        self.calls.push(Call::BindVertex { location, buffer });
    }

    fn bind_index_buffer(&mut self, buffer: BufferHandle, kind: ScalarKind) {
        self.calls.push(Call::BindIndex { buffer, kind });
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.calls.push(Call::Viewport { width, height });
    }

    fn clear(&mut self, color: [f32; 4], depth: f32) {
        self.calls.push(Call::Clear { color, depth });
    }

    fn draw_indexed(&mut self, count: u32) {
        self.calls.push(Call::Draw { count });
    }

    fn end_frame(&mut self) -> Result<(), Infallible> {
        self.calls.push(Call::EndFrame);
        Ok(())
    }
}
