use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, warn};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::compile::compile_glsl;
use crate::gl::{
    AttributeData, BufferHandle, BufferTarget, Device, GlError, ProgramHandle, ProgramInterface,
    ScalarKind, ShaderHandle, ShaderStage, UniformLocation, UniformUpload, VertexLayout,
};
use crate::types::Antialiasing;

use super::context::GpuContext;
use super::pipeline::{layout_matches, ProgramPipeline};

/// Multisampled color target resolved into the swapchain texture.
struct MultisampleTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl MultisampleTarget {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let extent = wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa color target"),
            size: extent,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

struct DeviceBuffer {
    target: BufferTarget,
    buffer: Option<wgpu::Buffer>,
}

/// One indexed draw with the uniform values it was issued with.
struct QueuedDraw {
    program: usize,
    uniforms: [Vec<u8>; 2],
    vertex_buffers: Vec<(u32, wgpu::Buffer)>,
    index_buffer: wgpu::Buffer,
    index_format: wgpu::IndexFormat,
    count: u32,
}

/// [`Device`] backed by wgpu.
///
/// Immediate-style calls are recorded and replayed in [`Device::end_frame`]:
/// each queued draw gets its own render pass, preceded by a copy of that
/// draw's uniform snapshot into the program's uniform buffers.
pub struct WgpuDevice {
    context: GpuContext,
    multisample_target: Option<MultisampleTarget>,
    shaders: Vec<(ShaderStage, wgpu::ShaderModule)>,
    programs: Vec<ProgramPipeline>,
    buffers: Vec<DeviceBuffer>,
    current: Option<usize>,
    vertex_bindings: Vec<(u32, BufferHandle)>,
    index_binding: Option<(BufferHandle, ScalarKind)>,
    clear_color: Option<wgpu::Color>,
    draws: Vec<QueuedDraw>,
}

impl WgpuDevice {
    /// Opens a surface on `window`; failures mean there is nothing to draw on.
    pub fn new(
        window: Arc<Window>,
        size: PhysicalSize<u32>,
        antialiasing: Antialiasing,
    ) -> Result<Self, GlError> {
        let context = GpuContext::new(window, size, antialiasing)
            .map_err(|err| GlError::ContextUnavailable(format!("{err:#}")))?;
        let multisample_target = (context.sample_count > 1).then(|| {
            MultisampleTarget::new(
                &context.device,
                context.surface_format,
                context.size,
                context.sample_count,
            )
        });
        Ok(Self {
            context,
            multisample_target,
            shaders: Vec::new(),
            programs: Vec::new(),
            buffers: Vec::new(),
            current: None,
            vertex_bindings: Vec::new(),
            index_binding: None,
            clear_color: None,
            draws: Vec::new(),
        })
    }

    pub fn surface_size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub fn sample_count(&self) -> u32 {
        self.context.sample_count
    }

    /// Reconfigures the swapchain after `Lost`/`Outdated`.
    pub fn reconfigure(&mut self) {
        self.context.reconfigure();
    }

    fn current_program(&mut self) -> Option<&mut ProgramPipeline> {
        let index = self.current?;
        self.programs.get_mut(index)
    }

    fn buffer(&self, handle: BufferHandle) -> Option<&wgpu::Buffer> {
        self.buffers.get(handle.0 as usize)?.buffer.as_ref()
    }

    fn queue_draw(&self, program: usize, count: u32) -> Option<QueuedDraw> {
        let pipeline = self.programs.get(program)?;
        let (index_handle, kind) = self.index_binding?;
        let index_format = match kind {
            ScalarKind::U16 => wgpu::IndexFormat::Uint16,
            ScalarKind::U32 => wgpu::IndexFormat::Uint32,
            ScalarKind::F32 => {
                warn!("index buffer bound with float storage; draw skipped");
                return None;
            }
        };
        let index_buffer = self.buffer(index_handle)?.clone();

        let mut vertex_buffers = Vec::with_capacity(pipeline.interface.inputs.len());
        for input in &pipeline.interface.inputs {
            let bound = self
                .vertex_bindings
                .iter()
                .find(|(location, _)| *location == input.location)
                .and_then(|(_, handle)| self.buffer(*handle));
            let Some(buffer) = bound else {
                warn!(input = input.name, "vertex input has no buffer; draw skipped");
                return None;
            };
            let slot = pipeline.slot_for(input.location)?;
            vertex_buffers.push((slot, buffer.clone()));
        }

        Some(QueuedDraw {
            program,
            uniforms: pipeline.staged.clone(),
            vertex_buffers,
            index_buffer,
            index_format,
            count,
        })
    }

    fn encode_draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        draw: &QueuedDraw,
        load: wgpu::LoadOp<wgpu::Color>,
    ) {
        let Some(pipeline) = self.programs.get(draw.program) else {
            return;
        };

        // Upload uniforms for this pass via a staging buffer and copy on the
        // encoder so each pass sees its own values.
        for stage in ShaderStage::ALL {
            let Some(target) = &pipeline.uniform_buffers[stage.index()] else {
                continue;
            };
            let bytes = &draw.uniforms[stage.index()];
            let staging = self
                .context
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("uniform staging"),
                    contents: bytes,
                    usage: wgpu::BufferUsages::COPY_SRC,
                });
            encoder.copy_buffer_to_buffer(&staging, 0, target, 0, bytes.len() as u64);
        }

        let mut render_pass = self.begin_pass(encoder, view, load);
        render_pass.set_pipeline(&pipeline.pipeline);
        render_pass.set_bind_group(0, &pipeline.bind_group, &[]);
        for (slot, buffer) in &draw.vertex_buffers {
            render_pass.set_vertex_buffer(*slot, buffer.slice(..));
        }
        render_pass.set_index_buffer(draw.index_buffer.slice(..), draw.index_format);
        render_pass.draw_indexed(0..draw.count, 0, 0..1);
    }

    fn begin_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        load: wgpu::LoadOp<wgpu::Color>,
    ) -> wgpu::RenderPass<'e> {
        let (attachment_view, resolve_target) = match self.multisample_target.as_ref() {
            Some(msaa) => (&msaa.view, Some(view)),
            None => (view, None),
        };
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("gradient pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: attachment_view,
                depth_slice: None,
                resolve_target,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        })
    }
}

impl Device for WgpuDevice {
    type FrameError = wgpu::SurfaceError;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, String> {
        let module = compile_glsl(stage, source)?;
        let device = &self.context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(match stage {
                ShaderStage::Vertex => "gradient vertex",
                ShaderStage::Fragment => "gradient fragment",
            }),
            source: wgpu::ShaderSource::Naga(Cow::Owned(module)),
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(error.to_string());
        }
        debug!(%stage, bytes = source.len(), "compiled shader stage");
        self.shaders.push((stage, shader));
        Ok(ShaderHandle(self.shaders.len() as u32 - 1))
    }

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
        interface: ProgramInterface,
    ) -> Result<ProgramHandle, String> {
        let module = |handle: ShaderHandle, expected: ShaderStage| match self
            .shaders
            .get(handle.0 as usize)
        {
            Some((stage, module)) if *stage == expected => Ok(module),
            _ => Err(format!("no compiled {expected} shader for handle {}", handle.0)),
        };
        let pipeline = ProgramPipeline::new(
            &self.context.device,
            module(vertex, ShaderStage::Vertex)?,
            module(fragment, ShaderStage::Fragment)?,
            interface,
            self.context.surface_format,
            self.context.sample_count,
        )?;
        debug!(
            vertex_block = pipeline.staged[0].len(),
            fragment_block = pipeline.staged[1].len(),
            "linked program"
        );
        self.programs.push(pipeline);
        Ok(ProgramHandle(self.programs.len() as u32 - 1))
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.programs
            .get(program.0 as usize)?
            .interface
            .uniform_location(name)
    }

    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        self.programs
            .get(program.0 as usize)?
            .interface
            .attribute_location(name)
    }

    fn create_buffer(&mut self, target: BufferTarget) -> BufferHandle {
        self.buffers.push(DeviceBuffer {
            target,
            buffer: None,
        });
        BufferHandle(self.buffers.len() as u32 - 1)
    }

    fn buffer_data(&mut self, buffer: BufferHandle, data: &AttributeData) {
        let Some(slot) = self.buffers.get_mut(buffer.0 as usize) else {
            return;
        };
        let usage = match slot.target {
            BufferTarget::Vertex => wgpu::BufferUsages::VERTEX,
            BufferTarget::Index => wgpu::BufferUsages::INDEX,
        };
        slot.buffer = Some(self.context.device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some(match slot.target {
                    BufferTarget::Vertex => "vertex attribute",
                    BufferTarget::Index => "index attribute",
                }),
                contents: data.as_bytes(),
                usage,
            },
        ));
    }

    fn use_program(&mut self, program: ProgramHandle) {
        let index = program.0 as usize;
        self.current = (index < self.programs.len()).then_some(index);
    }

    fn upload_uniform(&mut self, location: UniformLocation, value: UniformUpload) {
        let Some(program) = self.current_program() else {
            return;
        };
        for stage in ShaderStage::ALL {
            if let Some(offset) = location.offset(stage) {
                let staged = &mut program.staged[stage.index()];
                if let Some(dst) = staged.get_mut(offset as usize..) {
                    value.write_std140(dst);
                }
            }
        }
    }

    fn bind_vertex_buffer(&mut self, location: u32, buffer: BufferHandle, layout: VertexLayout) {
        // pipelines fix each input to tightly packed f32 components
        debug_assert!(
            self.current
                .and_then(|index| self.programs.get(index))
                .and_then(|program| {
                    program
                        .interface
                        .inputs
                        .iter()
                        .find(|input| input.location == location)
                })
                .map_or(true, |input| layout_matches(input, layout)),
            "vertex buffer layout {layout:?} does not match input at location {location}"
        );
        match self
            .vertex_bindings
            .iter_mut()
            .find(|(bound, _)| *bound == location)
        {
            Some((_, slot)) => *slot = buffer,
            None => self.vertex_bindings.push((location, buffer)),
        }
    }

    fn bind_index_buffer(&mut self, buffer: BufferHandle, kind: ScalarKind) {
        self.index_binding = Some((buffer, kind));
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        let size = PhysicalSize::new(width, height);
        if self.context.resize(size) {
            self.multisample_target = (self.context.sample_count > 1).then(|| {
                MultisampleTarget::new(
                    &self.context.device,
                    self.context.surface_format,
                    size,
                    self.context.sample_count,
                )
            });
        }
    }

    /// Only color is cleared; the pipeline has no depth attachment.
    fn clear(&mut self, color: [f32; 4], _depth: f32) {
        let [r, g, b, a] = color.map(f64::from);
        self.clear_color = Some(wgpu::Color { r, g, b, a });
    }

    fn draw_indexed(&mut self, count: u32) {
        let Some(program) = self.current else {
            warn!("draw issued without a program in use");
            return;
        };
        if let Some(draw) = self.queue_draw(program, count) {
            self.draws.push(draw);
        }
    }

    fn end_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        let draws = std::mem::take(&mut self.draws);
        let clear = self.clear_color.take();

        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("gradient frame"),
                });

        let mut load = clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear);
        if draws.is_empty() {
            drop(self.begin_pass(&mut encoder, &view, load));
        }
        for draw in &draws {
            self.encode_draw(&mut encoder, &view, draw, load);
            load = wgpu::LoadOp::Load;
        }

        self.context.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}
