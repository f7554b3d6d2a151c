//! std140 placement of declared uniforms.
//!
//! Each stage gets one uniform block. Offsets are computed from the same
//! uniform tree that generates the declarations, so names resolve to the
//! bytes the shader actually reads.

use super::device::{ShaderStage, UniformLocation};
use super::uniform::{Uniform, UniformValue};

/// One vertex shader input the program declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexInput {
    pub name: &'static str,
    pub glsl_type: &'static str,
    pub components: u32,
    pub location: u32,
}

/// A flattened leaf uniform inside a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockField {
    pub name: String,
    pub offset: u32,
    pub size: u32,
}

/// Byte layout of one stage's uniform block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockLayout {
    pub size: u32,
    pub fields: Vec<BlockField>,
}

impl BlockLayout {
    /// Lays out every uniform declared in `stage`, in iteration order.
    pub fn build<'a>(
        uniforms: impl IntoIterator<Item = (&'a str, &'a Uniform)>,
        stage: ShaderStage,
    ) -> Self {
        let mut fields = Vec::new();
        let mut offset = 0;
        for (name, uniform) in uniforms {
            if !uniform.is_declared_in(stage) {
                continue;
            }
            let (align, size) = measure(uniform, stage, None);
            offset = round_up(offset, align);
            place(name, uniform, stage, offset, &mut fields);
            offset += size;
        }
        Self {
            size: round_up(offset, 16),
            fields,
        }
    }

    pub fn offset_of(&self, name: &str) -> Option<u32> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Everything a backend needs to know about a program's interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramInterface {
    pub inputs: Vec<VertexInput>,
    pub blocks: [BlockLayout; 2],
}

impl ProgramInterface {
    pub fn block(&self, stage: ShaderStage) -> &BlockLayout {
        &self.blocks[stage.index()]
    }

    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        let location = UniformLocation {
            offsets: [
                self.block(ShaderStage::Vertex).offset_of(name),
                self.block(ShaderStage::Fragment).offset_of(name),
            ],
        };
        location.offsets.iter().any(Option::is_some).then_some(location)
    }

    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.inputs
            .iter()
            .find(|input| input.name == name)
            .map(|input| input.location)
    }
}

/// Bind group 0 slot holding the uniform block of `stage`.
pub const fn block_binding(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => 0,
        ShaderStage::Fragment => 1,
    }
}

pub(crate) fn round_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}

/// Returns the std140 (alignment, size) of a declared uniform.
fn measure(uniform: &Uniform, stage: ShaderStage, array_len: Option<usize>) -> (u32, u32) {
    let (align, size) = match uniform.value() {
        UniformValue::Float(_) | UniformValue::Int(_) => (4, 4),
        UniformValue::Vec2(_) => (8, 8),
        UniformValue::Vec3(_) => (16, 12),
        UniformValue::Vec4(_) => (16, 16),
        UniformValue::Mat4(_) => (16, 64),
        UniformValue::Array(array) => {
            return measure(array.element(), stage, Some(array.len().max(1)));
        }
        UniformValue::Struct(fields) => {
            let mut offset = 0;
            let mut max_align = 4;
            for (_, field) in fields.iter() {
                if !field.is_declared_in(stage) {
                    continue;
                }
                let (field_align, field_size) = measure(field, stage, None);
                offset = round_up(offset, field_align) + field_size;
                max_align = max_align.max(field_align);
            }
            let align = round_up(max_align, 16);
            (align, round_up(offset, align))
        }
    };

    match array_len {
        Some(len) => {
            let stride = round_up(size, 16);
            (align.max(16), stride * len as u32)
        }
        None => (align, size),
    }
}

fn place(
    name: &str,
    uniform: &Uniform,
    stage: ShaderStage,
    base: u32,
    fields: &mut Vec<BlockField>,
) {
    match uniform.value() {
        UniformValue::Struct(members) => {
            let mut offset = 0;
            for (member_name, member) in members.iter() {
                if !member.is_declared_in(stage) {
                    continue;
                }
                let (align, size) = measure(member, stage, None);
                offset = round_up(offset, align);
                place(
                    &format!("{name}.{member_name}"),
                    member,
                    stage,
                    base + offset,
                    fields,
                );
                offset += size;
            }
        }
        UniformValue::Array(array) => {
            let (_, element_size) = measure(array.element(), stage, None);
            let stride = round_up(element_size, 16);
            for (index, item) in array.items().iter().enumerate() {
                place(
                    &format!("{name}[{index}]"),
                    item,
                    stage,
                    base + stride * index as u32,
                    fields,
                );
            }
        }
        _ => {
            let (_, size) = measure(uniform, stage, None);
            fields.push(BlockField {
                name: name.to_string(),
                offset: base,
                size,
            });
        }
    }
}
