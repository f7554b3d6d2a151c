use std::num::NonZeroU64;

use crate::gl::{
    block_binding, ProgramInterface, ScalarKind, ShaderStage, VertexInput, VertexLayout,
};

/// A linked program: render pipeline, uniform blocks and their CPU copies.
pub(crate) struct ProgramPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group: wgpu::BindGroup,
    /// GPU uniform block per stage; `None` when the stage declares nothing.
    pub uniform_buffers: [Option<wgpu::Buffer>; 2],
    /// Latest values written through `upload_uniform`, in std140 layout.
    pub staged: [Vec<u8>; 2],
    pub interface: ProgramInterface,
}

impl ProgramPipeline {
    /// Builds the pipeline inside a validation error scope; any error raised
    /// while creating it is returned as the link log.
    pub fn new(
        device: &wgpu::Device,
        vertex: &wgpu::ShaderModule,
        fragment: &wgpu::ShaderModule,
        interface: ProgramInterface,
        surface_format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Result<Self, String> {
        let attributes = interface
            .inputs
            .iter()
            .map(vertex_attribute)
            .collect::<Result<Vec<_>, _>>()?;
        let vertex_buffers: Vec<wgpu::VertexBufferLayout<'_>> = interface
            .inputs
            .iter()
            .zip(&attributes)
            .map(|(input, attribute)| wgpu::VertexBufferLayout {
                array_stride: u64::from(input.components) * 4,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: std::slice::from_ref(attribute),
            })
            .collect();

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let layout_entries: Vec<wgpu::BindGroupLayoutEntry> = ShaderStage::ALL
            .into_iter()
            .filter(|stage| !interface.block(*stage).is_empty())
            .map(|stage| wgpu::BindGroupLayoutEntry {
                binding: block_binding(stage),
                visibility: stage_visibility(stage),
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(u64::from(interface.block(stage).size)),
                },
                count: None,
            })
            .collect();
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material uniform layout"),
            entries: &layout_entries,
        });

        let uniform_buffers = ShaderStage::ALL.map(|stage| {
            let block = interface.block(stage);
            (!block.is_empty()).then(|| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(match stage {
                        ShaderStage::Vertex => "vertex uniform block",
                        ShaderStage::Fragment => "fragment uniform block",
                    }),
                    size: u64::from(block.size),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
        });
        let bind_entries: Vec<wgpu::BindGroupEntry<'_>> = ShaderStage::ALL
            .into_iter()
            .zip(&uniform_buffers)
            .filter_map(|(stage, buffer)| {
                buffer.as_ref().map(|buffer| wgpu::BindGroupEntry {
                    binding: block_binding(stage),
                    resource: buffer.as_entire_binding(),
                })
            })
            .collect();
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material uniform bind group"),
            layout: &uniform_layout,
            entries: &bind_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("material pipeline layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("material pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: vertex,
                entry_point: Some("main"),
                buffers: &vertex_buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: fragment,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(error.to_string());
        }

        let staged = ShaderStage::ALL.map(|stage| vec![0_u8; interface.block(stage).size as usize]);
        Ok(Self {
            pipeline,
            bind_group,
            uniform_buffers,
            staged,
            interface,
        })
    }

    /// Vertex buffer slot that feeds attribute `location`.
    pub fn slot_for(&self, location: u32) -> Option<u32> {
        self.interface
            .inputs
            .iter()
            .position(|input| input.location == location)
            .map(|slot| slot as u32)
    }
}

fn vertex_attribute(input: &VertexInput) -> Result<wgpu::VertexAttribute, String> {
    let format = match input.components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        4 => wgpu::VertexFormat::Float32x4,
        other => {
            return Err(format!(
                "vertex input '{}' has unsupported component count {other}",
                input.name
            ))
        }
    };
    Ok(wgpu::VertexAttribute {
        format,
        offset: 0,
        shader_location: input.location,
    })
}

/// Whether a buffer with `layout` can feed `input` through the pipeline's
/// `Float32xN` attribute.
pub(crate) fn layout_matches(input: &VertexInput, layout: VertexLayout) -> bool {
    layout.components == input.components && layout.kind == ScalarKind::F32 && !layout.normalized
}

fn stage_visibility(stage: ShaderStage) -> wgpu::ShaderStages {
    match stage {
        ShaderStage::Vertex => wgpu::ShaderStages::VERTEX,
        ShaderStage::Fragment => wgpu::ShaderStages::FRAGMENT,
    }
}
