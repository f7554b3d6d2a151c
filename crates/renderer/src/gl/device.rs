use std::fmt;

use super::attribute::AttributeData;
use super::layout::ProgramInterface;

/// Programmable pipeline stage a shader source is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 2] = [ShaderStage::Vertex, ShaderStage::Fragment];

    pub fn as_str(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            ShaderStage::Vertex => 0,
            ShaderStage::Fragment => 1,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque handle to a compiled shader stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub(crate) u32);

/// Opaque handle to a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub(crate) u32);

/// Opaque handle to a device buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u32);

/// What a buffer feeds: per-vertex data or the triangle index list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    Vertex,
    Index,
}

/// Numeric storage type of a buffer payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    F32,
    U16,
    U32,
}

impl ScalarKind {
    pub fn size(self) -> u32 {
        match self {
            ScalarKind::F32 | ScalarKind::U32 => 4,
            ScalarKind::U16 => 2,
        }
    }
}

/// Layout of a tightly packed, non-interleaved vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    pub components: u32,
    pub kind: ScalarKind,
    pub normalized: bool,
}

/// Where a uniform lives inside each stage's uniform block.
///
/// A uniform declared in only one stage has `None` for the other. A lookup
/// that finds no stage at all yields no location at all, which callers treat
/// as "nothing to upload".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UniformLocation {
    pub offsets: [Option<u32>; 2],
}

impl UniformLocation {
    pub fn offset(&self, stage: ShaderStage) -> Option<u32> {
        self.offsets[stage.index()]
    }
}

/// A leaf uniform value ready for upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformUpload {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat4 { value: [f32; 16], transpose: bool },
}

impl UniformUpload {
    /// Number of bytes the value occupies in a std140 block.
    pub fn byte_len(&self) -> usize {
        match self {
            UniformUpload::Float(_) | UniformUpload::Int(_) => 4,
            UniformUpload::Vec2(_) => 8,
            UniformUpload::Vec3(_) => 12,
            UniformUpload::Vec4(_) => 16,
            UniformUpload::Mat4 { .. } => 64,
        }
    }

    /// Writes the value at the start of `dst` using std140 encoding.
    ///
    /// Matrices are stored column-major; `transpose` flips the incoming
    /// row/column order first.
    pub fn write_std140(&self, dst: &mut [u8]) {
        let len = self.byte_len();
        if dst.len() < len {
            return;
        }
        match self {
            UniformUpload::Float(value) => dst[..4].copy_from_slice(bytemuck::bytes_of(value)),
            UniformUpload::Int(value) => dst[..4].copy_from_slice(bytemuck::bytes_of(value)),
            UniformUpload::Vec2(value) => dst[..8].copy_from_slice(bytemuck::cast_slice(value)),
            UniformUpload::Vec3(value) => dst[..12].copy_from_slice(bytemuck::cast_slice(value)),
            UniformUpload::Vec4(value) => dst[..16].copy_from_slice(bytemuck::cast_slice(value)),
            UniformUpload::Mat4 { value, transpose } => {
                let mut columns = *value;
                if *transpose {
                    for row in 0..4 {
                        for column in 0..4 {
                            columns[column * 4 + row] = value[row * 4 + column];
                        }
                    }
                }
                dst[..64].copy_from_slice(bytemuck::cast_slice(&columns));
            }
        }
    }
}

/// The low-level graphics context the binding layer drives.
///
/// The surface is GL-shaped on purpose: stages are compiled, then linked into
/// a program; locations are looked up by name; buffers and uniforms are
/// pushed with immediate calls. Backends that record commands (wgpu) queue
/// the work until [`Device::end_frame`].
pub trait Device {
    /// Error surfaced when a frame cannot be presented.
    type FrameError: std::error::Error + Send + Sync + 'static;

    /// Compiles one stage; the error is the stage's info log.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, String>;

    /// Links a vertex and fragment stage; the error is the program's info log.
    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
        interface: ProgramInterface,
    ) -> Result<ProgramHandle, String>;

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32>;

    fn create_buffer(&mut self, target: BufferTarget) -> BufferHandle;

    fn buffer_data(&mut self, buffer: BufferHandle, data: &AttributeData);

    fn use_program(&mut self, program: ProgramHandle);

    /// Writes a uniform value for the program currently in use.
    fn upload_uniform(&mut self, location: UniformLocation, value: UniformUpload);

    fn bind_vertex_buffer(&mut self, location: u32, buffer: BufferHandle, layout: VertexLayout);

    fn bind_index_buffer(&mut self, buffer: BufferHandle, kind: ScalarKind);

    fn set_viewport(&mut self, width: u32, height: u32);

    fn clear(&mut self, color: [f32; 4], depth: f32);

    fn draw_indexed(&mut self, count: u32);

    /// Flushes queued work and presents the frame.
    fn end_frame(&mut self) -> Result<(), Self::FrameError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transposed_matrix_is_written_column_major() {
        let mut row_major = [0.0_f32; 16];
        row_major[1] = 7.0; // row 0, column 1
        let mut bytes = [0_u8; 64];
        UniformUpload::Mat4 {
            value: row_major,
            transpose: true,
        }
        .write_std140(&mut bytes);
        let written: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        assert_eq!(written[4], 7.0);
        assert_eq!(written[1], 0.0);
    }

    #[test]
    fn short_destination_is_left_untouched() {
        let mut bytes = [0xAA_u8; 8];
        UniformUpload::Vec3([1.0, 2.0, 3.0]).write_std140(&mut bytes);
        assert!(bytes.iter().all(|byte| *byte == 0xAA));
    }
}
