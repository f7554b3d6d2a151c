//! GLSL front end for the wgpu backend.
//!
//! Each stage is parsed with naga's GLSL frontend and validated on its own,
//! so a broken stage fails at "compile" time with a diagnostic pointing into
//! the generated source instead of surfacing later as a pipeline error.

use wgpu::naga;
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::gl::ShaderStage;

/// Parses and validates one GLSL stage; the error is naga's rendered report.
pub(crate) fn compile_glsl(stage: ShaderStage, source: &str) -> Result<naga::Module, String> {
    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options::from(naga_stage(stage));
    let module = frontend
        .parse(&options, source)
        .map_err(|errors| errors.emit_to_string(source))?;

    Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|error| error.emit_to_string(source))?;
    Ok(module)
}

fn naga_stage(stage: ShaderStage) -> naga::ShaderStage {
    match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::recording::RecordingDevice;
    use crate::gradient::Gradient;

    #[test]
    fn gradient_sources_parse_and_validate() {
        let gradient = Gradient::new(
            RecordingDevice::new(),
            &["#38bdf8", "#ffffff", "#38bdf8", "#ffffff", "#38bdf8", "#ffffff"],
            (1280, 720),
        )
        .unwrap();
        for stage in ShaderStage::ALL {
            let source = gradient.device().source(stage).unwrap();
            if let Err(report) = compile_glsl(stage, source) {
                panic!("{stage} stage rejected:\n{report}\n{source}");
            }
        }
    }

    #[test]
    fn syntax_errors_are_reported_against_the_source() {
        let source = "#version 450\nvoid main() { float x = ; }\n";
        let report = compile_glsl(ShaderStage::Fragment, source).unwrap_err();
        assert!(!report.is_empty());
    }
}
