//! The gradient material's uniform tree.

use crate::gl::{GlError, ShaderStage, Uniform, UniformArray, UniformMap};

pub const TIME: &str = "u_time";
pub const SHADOW_POWER: &str = "u_shadow_power";
pub const DARKEN_TOP: &str = "u_darken_top";
pub const ACTIVE_COLORS: &str = "u_active_colors";
pub const GLOBAL: &str = "u_global";
pub const VERT_DEFORM: &str = "u_vertDeform";
pub const BASE_COLOR: &str = "u_baseColor";
pub const WAVE_LAYERS: &str = "u_waveLayers";

/// Shadow power the material starts with, before the first resize.
const INITIAL_SHADOW_POWER: f32 = 5.0;

/// Builds every uniform the gradient shaders read.
///
/// The first color is the base; each further color becomes one wave layer
/// whose noise parameters drift with its index so layers never move in step.
pub(crate) fn gradient_uniforms(colors: &[[f32; 3]]) -> Result<UniformMap, GlError> {
    let base = colors.first().copied().unwrap_or_default();
    let count = colors.len() as f32;

    let mut layers = UniformArray::new(wave_layer([0.0; 3], 0.0, 1.0));
    for (index, color) in colors.iter().enumerate().skip(1) {
        layers.push(wave_layer(*color, index as f32, count))?;
    }

    Ok(UniformMap::new()
        .with(TIME, Uniform::float(0.0))
        .with(SHADOW_POWER, Uniform::float(INITIAL_SHADOW_POWER))
        .with(DARKEN_TOP, Uniform::float(0.0))
        .with(ACTIVE_COLORS, Uniform::vec4([1.0; 4]))
        .with(
            GLOBAL,
            Uniform::structure(
                UniformMap::new()
                    .with("noiseFreq", Uniform::vec2([0.00014, 0.00029]))
                    .with("noiseSpeed", Uniform::float(0.000005)),
            ),
        )
        .with(
            VERT_DEFORM,
            Uniform::structure(
                UniformMap::new()
                    .with("incline", Uniform::float(0.0))
                    .with("offsetTop", Uniform::float(-0.5))
                    .with("offsetBottom", Uniform::float(-0.5))
                    .with("noiseFreq", Uniform::vec2([3.0, 4.0]))
                    .with("noiseAmp", Uniform::float(320.0))
                    .with("noiseSpeed", Uniform::float(10.0))
                    .with("noiseFlow", Uniform::float(3.0))
                    .with("noiseSeed", Uniform::float(5.0)),
            )
            .excluded_from(ShaderStage::Fragment),
        )
        .with(
            BASE_COLOR,
            Uniform::vec3(base).excluded_from(ShaderStage::Fragment),
        )
        .with(
            WAVE_LAYERS,
            Uniform::array(layers).excluded_from(ShaderStage::Fragment),
        ))
}

fn wave_layer(color: [f32; 3], index: f32, count: f32) -> Uniform {
    Uniform::structure(
        UniformMap::new()
            .with("color", Uniform::vec3(color))
            .with(
                "noiseFreq",
                Uniform::vec2([2.0 + index / count, 3.0 + index / count]),
            )
            .with("noiseSpeed", Uniform::float(11.0 + 0.3 * index))
            .with("noiseFlow", Uniform::float(6.5 + 0.3 * index))
            .with("noiseSeed", Uniform::float(5.0 + 10.0 * index))
            .with("noiseFloor", Uniform::float(0.1))
            .with("noiseCeil", Uniform::float(0.63 + 0.07 * index)),
    )
}
