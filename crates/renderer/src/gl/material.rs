use tracing::debug;

use super::device::{Device, ProgramHandle, ShaderStage, UniformLocation};
use super::error::GlError;
use super::layout::{block_binding, BlockLayout, ProgramInterface, VertexInput};
use super::uniform::{Uniform, UniformMap, UniformValue};

const GLSL_VERSION: &str = "#version 450";
const PRECISION: &str = "precision highp float;";

/// Vertex inputs every material declares, matching [`super::PlaneGeometry`].
pub const VERTEX_INPUTS: [VertexInput; 3] = [
    VertexInput {
        name: "position",
        glsl_type: "vec3",
        components: 3,
        location: 0,
    },
    VertexInput {
        name: "uv",
        glsl_type: "vec2",
        components: 2,
        location: 1,
    },
    VertexInput {
        name: "uvNorm",
        glsl_type: "vec2",
        components: 2,
        location: 2,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Common,
    Material,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathStep {
    Field(String),
    Item(usize),
}

/// A flattened leaf uniform bound to its resolved location.
#[derive(Debug, Clone)]
struct UniformBinding {
    scope: Scope,
    name: String,
    path: Vec<PathStep>,
    location: Option<UniformLocation>,
}

/// A compiled, linked program plus the uniforms it was built from.
///
/// The declared uniform set is fixed once the material exists; only values
/// change afterwards.
#[derive(Debug)]
pub struct Material {
    program: ProgramHandle,
    uniforms: UniformMap,
    bindings: Vec<UniformBinding>,
}

impl Material {
    /// Compiles and links `vertex_body`/`fragment_body` with generated
    /// declarations for `common` and `uniforms` prepended.
    pub fn new<D: Device>(
        device: &mut D,
        common: &UniformMap,
        vertex_body: &str,
        fragment_body: &str,
        uniforms: UniformMap,
    ) -> Result<Self, GlError> {
        let vertex_source = stage_source(ShaderStage::Vertex, common, &uniforms, vertex_body);
        let fragment_source =
            stage_source(ShaderStage::Fragment, common, &uniforms, fragment_body);

        let vertex = device
            .compile_shader(ShaderStage::Vertex, &vertex_source)
            .map_err(|log| GlError::Compile {
                stage: ShaderStage::Vertex,
                log,
            })?;
        let fragment = device
            .compile_shader(ShaderStage::Fragment, &fragment_source)
            .map_err(|log| GlError::Compile {
                stage: ShaderStage::Fragment,
                log,
            })?;

        let interface = program_interface(common, &uniforms);
        debug!(
            vertex_block = interface.block(ShaderStage::Vertex).size,
            fragment_block = interface.block(ShaderStage::Fragment).size,
            "linking material program"
        );
        let program = device
            .link_program(vertex, fragment, interface)
            .map_err(|log| GlError::Link { log })?;

        let mut bindings = Vec::new();
        for (scope, set) in [(Scope::Common, common), (Scope::Material, &uniforms)] {
            for (name, uniform) in set.iter() {
                flatten(
                    device,
                    program,
                    scope,
                    name.to_string(),
                    vec![PathStep::Field(name.to_string())],
                    uniform,
                    &mut bindings,
                );
            }
        }
        let unresolved = bindings.iter().filter(|b| b.location.is_none()).count();
        debug!(
            uniforms = bindings.len(),
            unresolved, "material uniforms bound"
        );

        Ok(Self {
            program,
            uniforms,
            bindings,
        })
    }

    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    pub fn uniforms(&self) -> &UniformMap {
        &self.uniforms
    }

    pub fn uniform(&self, name: &str) -> Option<&Uniform> {
        self.uniforms.get(name)
    }

    /// Mutable access to one uniform's value; the set itself stays fixed.
    pub fn uniform_mut(&mut self, name: &str) -> Option<&mut Uniform> {
        self.uniforms.get_mut(name)
    }

    /// Flattened names of every bound uniform, in upload order.
    pub fn bound_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|binding| binding.name.as_str())
    }

    /// Pushes every bound uniform's current value.
    pub(crate) fn upload_uniforms<D: Device>(&self, device: &mut D, common: &UniformMap) {
        for binding in &self.bindings {
            let root = match binding.scope {
                Scope::Common => common,
                Scope::Material => &self.uniforms,
            };
            if let Some(uniform) = resolve(root, &binding.path) {
                uniform.update(device, binding.location);
            }
        }
    }
}

fn stage_source(stage: ShaderStage, common: &UniformMap, uniforms: &UniformMap, body: &str) -> String {
    let mut types = String::new();
    let mut members = String::new();
    let mut constants = String::new();
    for (name, uniform) in common.iter().chain(uniforms.iter()) {
        let declaration = uniform.declaration(name, stage, None);
        types.push_str(&declaration.types);
        constants.push_str(&declaration.constants);
        if !declaration.member.is_empty() {
            members.push_str("    ");
            members.push_str(&declaration.member);
            members.push('\n');
        }
    }

    let mut source = format!("{GLSL_VERSION}\n{PRECISION}\n");
    if stage == ShaderStage::Vertex {
        for input in VERTEX_INPUTS {
            source.push_str(&format!(
                "layout(location = {}) in {} {};\n",
                input.location, input.glsl_type, input.name
            ));
        }
    }
    source.push_str(&types);
    if !members.is_empty() {
        let block = match stage {
            ShaderStage::Vertex => "VertexUniforms",
            ShaderStage::Fragment => "FragmentUniforms",
        };
        source.push_str(&format!(
            "layout(std140, set = 0, binding = {}) uniform {block} {{\n{members}}};\n",
            block_binding(stage)
        ));
    }
    source.push_str(&constants);
    source.push_str(body);
    source
}

fn program_interface(common: &UniformMap, uniforms: &UniformMap) -> ProgramInterface {
    let block = |stage| BlockLayout::build(common.iter().chain(uniforms.iter()), stage);
    ProgramInterface {
        inputs: VERTEX_INPUTS.to_vec(),
        blocks: [block(ShaderStage::Vertex), block(ShaderStage::Fragment)],
    }
}

fn flatten<D: Device>(
    device: &D,
    program: ProgramHandle,
    scope: Scope,
    name: String,
    path: Vec<PathStep>,
    uniform: &Uniform,
    bindings: &mut Vec<UniformBinding>,
) {
    match uniform.value() {
        UniformValue::Struct(fields) => {
            for (field_name, field) in fields.iter() {
                let mut field_path = path.clone();
                field_path.push(PathStep::Field(field_name.to_string()));
                flatten(
                    device,
                    program,
                    scope,
                    format!("{name}.{field_name}"),
                    field_path,
                    field,
                    bindings,
                );
            }
        }
        UniformValue::Array(array) => {
            for (index, item) in array.items().iter().enumerate() {
                let mut item_path = path.clone();
                item_path.push(PathStep::Item(index));
                flatten(
                    device,
                    program,
                    scope,
                    format!("{name}[{index}]"),
                    item_path,
                    item,
                    bindings,
                );
            }
        }
        _ => {
            let location = device.uniform_location(program, &name);
            bindings.push(UniformBinding {
                scope,
                name,
                path,
                location,
            });
        }
    }
}

fn resolve<'a>(root: &'a UniformMap, path: &[PathStep]) -> Option<&'a Uniform> {
    let (PathStep::Field(first), rest) = path.split_first()? else {
        return None;
    };
    let mut current = root.get(first)?;
    for step in rest {
        current = match step {
            PathStep::Field(name) => current.field(name)?,
            PathStep::Item(index) => current.item(*index)?,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::device::UniformUpload;
    use crate::gl::recording::{Call, RecordingDevice};
    use crate::gl::uniform::UniformArray;

    const VERTEX_BODY: &str = "void main() { gl_Position = vec4(position, 1.0); }\n";
    const FRAGMENT_BODY: &str = "layout(location = 0) out vec4 color;\nvoid main() { color = vec4(1.0); }\n";

    fn common() -> UniformMap {
        UniformMap::new()
            .with("resolution", Uniform::vec2([1.0, 1.0]))
            .with("aspectRatio", Uniform::float(1.0))
    }

    fn uniforms() -> UniformMap {
        let mut layers = UniformArray::new(Uniform::structure(
            UniformMap::new().with("color", Uniform::vec3([0.0; 3])),
        ));
        layers
            .push(Uniform::structure(
                UniformMap::new().with("color", Uniform::vec3([0.0, 1.0, 0.0])),
            ))
            .unwrap();
        UniformMap::new()
            .with("u_time", Uniform::float(0.0))
            .with(
                "u_vertDeform",
                Uniform::structure(UniformMap::new().with("noiseAmp", Uniform::float(320.0)))
                    .excluded_from(ShaderStage::Fragment),
            )
            .with(
                "u_waveLayers",
                Uniform::array(layers).excluded_from(ShaderStage::Fragment),
            )
    }

    #[test]
    fn sources_carry_prefix_declarations_and_body() {
        let mut device = RecordingDevice::new();
        Material::new(&mut device, &common(), VERTEX_BODY, FRAGMENT_BODY, uniforms()).unwrap();

        let vertex = device.source(ShaderStage::Vertex).unwrap();
        assert!(vertex.starts_with("#version 450\nprecision highp float;\n"));
        assert!(vertex.contains("layout(location = 2) in vec2 uvNorm;"));
        assert!(vertex.contains("struct VertDeform {"));
        assert!(vertex.contains("    VertDeform u_vertDeform;\n"));
        assert!(vertex.contains("const int u_waveLayers_length = 1;"));
        assert!(vertex.ends_with(VERTEX_BODY));
        let block = vertex.find("uniform VertexUniforms").unwrap();
        assert!(vertex.find("    vec2 resolution;").unwrap() > block);

        let fragment = device.source(ShaderStage::Fragment).unwrap();
        assert!(fragment.contains("layout(std140, set = 0, binding = 1) uniform FragmentUniforms"));
        assert!(!fragment.contains("u_vertDeform"));
        assert!(!fragment.contains("in vec3 position"));
    }

    #[test]
    fn compile_failure_names_the_stage() {
        let mut device = RecordingDevice::failing_compile(ShaderStage::Fragment);
        let err = Material::new(&mut device, &common(), VERTEX_BODY, FRAGMENT_BODY, uniforms())
            .unwrap_err();
        match &err {
            GlError::Compile { stage, log } => {
                assert_eq!(*stage, ShaderStage::Fragment);
                assert!(log.contains("syntax error"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().starts_with("fragment shader failed to compile"));
        assert_eq!(device.count(|call| matches!(call, Call::Link { .. })), 0);
    }

    #[test]
    fn link_failure_is_fatal() {
        let mut device = RecordingDevice::failing_link();
        let err = Material::new(&mut device, &common(), VERTEX_BODY, FRAGMENT_BODY, uniforms())
            .unwrap_err();
        assert!(matches!(err, GlError::Link { .. }));
    }

    #[test]
    fn nested_uniforms_flatten_to_dotted_and_indexed_names() {
        let mut device = RecordingDevice::new();
        let material =
            Material::new(&mut device, &common(), VERTEX_BODY, FRAGMENT_BODY, uniforms()).unwrap();
        let names: Vec<_> = material.bound_names().collect();
        assert_eq!(
            names,
            [
                "resolution",
                "aspectRatio",
                "u_time",
                "u_vertDeform.noiseAmp",
                "u_waveLayers[0].color",
            ]
        );
    }

    #[test]
    fn upload_pushes_current_values() {
        let mut device = RecordingDevice::new();
        let mut material =
            Material::new(&mut device, &common(), VERTEX_BODY, FRAGMENT_BODY, uniforms()).unwrap();
        material
            .uniform_mut("u_time")
            .unwrap()
            .set(UniformValue::Float(42.0))
            .unwrap();
        material.upload_uniforms(&mut device, &common());

        let program = material.program();
        assert_eq!(
            device.last_upload(program, "u_time"),
            Some(UniformUpload::Float(42.0))
        );
        assert_eq!(
            device.last_upload(program, "u_waveLayers[0].color"),
            Some(UniformUpload::Vec3([0.0, 1.0, 0.0]))
        );
        assert_eq!(
            device.count(|call| matches!(call, Call::Uniform { .. })),
            5
        );
    }

    #[test]
    fn unresolved_uniforms_are_skipped_on_upload() {
        let mut device = RecordingDevice::hiding_uniform("u_vertDeform.noiseAmp");
        let material =
            Material::new(&mut device, &common(), VERTEX_BODY, FRAGMENT_BODY, uniforms()).unwrap();
        assert!(material.bound_names().any(|name| name == "u_vertDeform.noiseAmp"));

        device.take_calls();
        material.upload_uniforms(&mut device, &common());

        let program = material.program();
        assert_eq!(device.last_upload(program, "u_vertDeform.noiseAmp"), None);
        assert_eq!(
            device.last_upload(program, "u_time"),
            Some(UniformUpload::Float(0.0))
        );
        assert_eq!(
            device.last_upload(program, "u_waveLayers[0].color"),
            Some(UniformUpload::Vec3([0.0, 1.0, 0.0]))
        );
        assert_eq!(
            device.count(|call| matches!(call, Call::Uniform { .. })),
            4
        );
    }
}
