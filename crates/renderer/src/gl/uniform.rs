//! Shader uniforms as a closed sum type.
//!
//! Every uniform carries its own value; struct and array uniforms carry child
//! uniforms. Declarations are generated from the tree itself, so the GLSL the
//! material compiles always matches the values it later uploads.

use std::fmt;

use super::device::{Device, ShaderStage, UniformLocation, UniformUpload};
use super::error::GlError;

/// Suffix of the integer constant emitted next to every array uniform.
pub const ARRAY_LENGTH_SUFFIX: &str = "_length";

/// Conventional prefix stripped from uniform names when naming struct types.
const UNIFORM_PREFIX: &str = "u_";

#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat4([f32; 16]),
    Struct(UniformMap),
    Array(UniformArray),
}

impl UniformValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            UniformValue::Float(_) => "float",
            UniformValue::Int(_) => "int",
            UniformValue::Vec2(_) => "vec2",
            UniformValue::Vec3(_) => "vec3",
            UniformValue::Vec4(_) => "vec4",
            UniformValue::Mat4(_) => "mat4",
            UniformValue::Struct(_) => "struct",
            UniformValue::Array(_) => "array",
        }
    }

    fn same_shape(&self, other: &UniformValue) -> bool {
        match (self, other) {
            (UniformValue::Struct(a), UniformValue::Struct(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|((name_a, a), (name_b, b))| {
                        name_a == name_b && a.value.same_shape(&b.value)
                    })
            }
            (UniformValue::Array(a), UniformValue::Array(b)) => {
                a.len() == b.len() && a.element.value.same_shape(&b.element.value)
            }
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

/// A named shader input: value plus declaration metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Uniform {
    value: UniformValue,
    exclude_from: Option<ShaderStage>,
    transpose: bool,
}

impl Uniform {
    pub fn new(value: UniformValue) -> Self {
        Self {
            value,
            exclude_from: None,
            transpose: false,
        }
    }

    pub fn float(value: f32) -> Self {
        Self::new(UniformValue::Float(value))
    }

    pub fn int(value: i32) -> Self {
        Self::new(UniformValue::Int(value))
    }

    pub fn vec2(value: [f32; 2]) -> Self {
        Self::new(UniformValue::Vec2(value))
    }

    pub fn vec3(value: [f32; 3]) -> Self {
        Self::new(UniformValue::Vec3(value))
    }

    pub fn vec4(value: [f32; 4]) -> Self {
        Self::new(UniformValue::Vec4(value))
    }

    pub fn mat4(value: [f32; 16]) -> Self {
        Self::new(UniformValue::Mat4(value))
    }

    pub fn structure(fields: UniformMap) -> Self {
        Self::new(UniformValue::Struct(fields))
    }

    pub fn array(items: UniformArray) -> Self {
        Self::new(UniformValue::Array(items))
    }

    /// Keeps the uniform out of the given stage's declarations.
    pub fn excluded_from(mut self, stage: ShaderStage) -> Self {
        self.exclude_from = Some(stage);
        self
    }

    pub fn transposed(mut self, transpose: bool) -> Self {
        self.transpose = transpose;
        self
    }

    pub fn value(&self) -> &UniformValue {
        &self.value
    }

    /// Replaces the value; the new value must have the same shape.
    pub fn set(&mut self, value: UniformValue) -> Result<(), GlError> {
        if !self.value.same_shape(&value) {
            return Err(GlError::UniformShape {
                expected: self.value.kind_name(),
                found: value.kind_name(),
            });
        }
        self.value = value;
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&Uniform> {
        match &self.value {
            UniformValue::Struct(fields) => fields.get(name),
            _ => None,
        }
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Uniform> {
        match &mut self.value {
            UniformValue::Struct(fields) => fields.get_mut(name),
            _ => None,
        }
    }

    pub fn item(&self, index: usize) -> Option<&Uniform> {
        match &self.value {
            UniformValue::Array(array) => array.items.get(index),
            _ => None,
        }
    }

    pub fn item_mut(&mut self, index: usize) -> Option<&mut Uniform> {
        match &mut self.value {
            UniformValue::Array(array) => array.items.get_mut(index),
            _ => None,
        }
    }

    /// Whether the uniform appears in `stage`'s source and block.
    ///
    /// A struct counts only when at least one of its fields does.
    pub fn is_declared_in(&self, stage: ShaderStage) -> bool {
        if self.exclude_from == Some(stage) {
            return false;
        }
        match &self.value {
            UniformValue::Struct(fields) => {
                fields.iter().any(|(_, field)| field.is_declared_in(stage))
            }
            UniformValue::Array(array) => array.element().is_declared_in(stage),
            _ => true,
        }
    }

    /// Leaf value in upload form; `None` for struct and array uniforms.
    pub fn upload(&self) -> Option<UniformUpload> {
        Some(match &self.value {
            UniformValue::Float(value) => UniformUpload::Float(*value),
            UniformValue::Int(value) => UniformUpload::Int(*value),
            UniformValue::Vec2(value) => UniformUpload::Vec2(*value),
            UniformValue::Vec3(value) => UniformUpload::Vec3(*value),
            UniformValue::Vec4(value) => UniformUpload::Vec4(*value),
            UniformValue::Mat4(value) => UniformUpload::Mat4 {
                value: *value,
                transpose: self.transpose,
            },
            UniformValue::Struct(_) | UniformValue::Array(_) => return None,
        })
    }

    /// Pushes the current value to `location`.
    ///
    /// A missing location is expected whenever the compiler drops an unused
    /// uniform and is silently skipped.
    pub fn update<D: Device>(&self, device: &mut D, location: Option<UniformLocation>) {
        let (Some(location), Some(upload)) = (location, self.upload()) else {
            return;
        };
        device.upload_uniform(location, upload);
    }

    /// Generates the GLSL declaring this uniform for `stage`.
    ///
    /// `array_len` is set when the uniform is the element of an array uniform.
    pub fn declaration(
        &self,
        name: &str,
        stage: ShaderStage,
        array_len: Option<usize>,
    ) -> Declaration {
        if !self.is_declared_in(stage) {
            return Declaration::default();
        }

        let suffix = array_len.map(|len| format!("[{len}]")).unwrap_or_default();
        match &self.value {
            UniformValue::Array(array) => {
                let len = array.len();
                let mut declaration = array.element.declaration(name, stage, Some(len.max(1)));
                if !declaration.is_empty() {
                    declaration
                        .constants
                        .push_str(&format!("const int {name}{ARRAY_LENGTH_SUFFIX} = {len};\n"));
                }
                declaration
            }
            UniformValue::Struct(fields) => {
                let type_name = struct_type_name(name);
                let mut declaration = Declaration::default();
                let mut body = String::new();
                for (field_name, field) in fields.iter() {
                    let nested = field.declaration(field_name, stage, None);
                    declaration.types.push_str(&nested.types);
                    declaration.constants.push_str(&nested.constants);
                    if !nested.member.is_empty() {
                        body.push_str("    ");
                        body.push_str(&nested.member);
                        body.push('\n');
                    }
                }
                declaration
                    .types
                    .push_str(&format!("struct {type_name} {{\n{body}}};\n"));
                declaration.member = format!("{type_name} {name}{suffix};");
                declaration
            }
            leaf => Declaration {
                member: format!("{} {name}{suffix};", leaf.kind_name()),
                ..Declaration::default()
            },
        }
    }
}

/// Struct type name for a struct uniform: `u_vertDeform` becomes `VertDeform`.
pub fn struct_type_name(uniform_name: &str) -> String {
    let stripped = uniform_name
        .strip_prefix(UNIFORM_PREFIX)
        .unwrap_or(uniform_name);
    let mut chars = stripped.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// GLSL text declaring one uniform.
///
/// Struct definitions and constants must live outside the uniform block, so
/// they are kept apart from the member line that goes inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declaration {
    pub types: String,
    pub member: String,
    pub constants: String,
}

impl Declaration {
    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.member.is_empty() && self.constants.is_empty()
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.types)?;
        if !self.member.is_empty() {
            writeln!(f, "{}", self.member)?;
        }
        f.write_str(&self.constants)
    }
}

/// Ordered name → uniform mapping, used for struct values and uniform sets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformMap {
    entries: Vec<(String, Uniform)>,
}

impl UniformMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, uniform: Uniform) -> Self {
        self.insert(name, uniform);
        self
    }

    /// Inserts or replaces `name`, keeping its original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, uniform: Uniform) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = uniform,
            None => self.entries.push((name, uniform)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Uniform> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, uniform)| uniform)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Uniform> {
        self.entries
            .iter_mut()
            .find(|(existing, _)| existing == name)
            .map(|(_, uniform)| uniform)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Uniform)> {
        self.entries
            .iter()
            .map(|(name, uniform)| (name.as_str(), uniform))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Homogeneous sequence of uniforms sharing one element type.
///
/// The element template keeps the declared type available when the array is
/// empty.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformArray {
    element: Box<Uniform>,
    items: Vec<Uniform>,
}

impl UniformArray {
    pub fn new(element: Uniform) -> Self {
        Self {
            element: Box::new(element),
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, item: Uniform) -> Result<(), GlError> {
        if !self.element.value.same_shape(&item.value) {
            return Err(GlError::UniformShape {
                expected: self.element.value.kind_name(),
                found: item.value.kind_name(),
            });
        }
        self.items.push(item);
        Ok(())
    }

    pub fn element(&self) -> &Uniform {
        &self.element
    }

    pub fn items(&self) -> &[Uniform] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
