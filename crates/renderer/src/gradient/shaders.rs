//! Shader bodies for the gradient material.
//!
//! Declarations for the uniforms, the vertex inputs and the `#version` line
//! are generated by [`crate::gl::Material`] and prepended to these bodies.

/// Displaces the plane with simplex noise and blends the wave layer colors
/// into `v_color`.
pub const VERTEX_SHADER: &str = r"
vec3 mod289(vec3 x) { return x - floor(x * (1.0 / 289.0)) * 289.0; }
vec4 mod289(vec4 x) { return x - floor(x * (1.0 / 289.0)) * 289.0; }
vec4 permute(vec4 x) { return mod289(((x * 34.0) + 1.0) * x); }
vec4 taylorInvSqrt(vec4 r) { return 1.79284291400159 - 0.85373472095314 * r; }

float snoise(vec3 v) {
    vec2 C = vec2(1.0 / 6.0, 1.0 / 3.0);
    vec4 D = vec4(0.0, 0.5, 1.0, 2.0);

    vec3 i = floor(v + dot(v, C.yyy));
    vec3 x0 = v - i + dot(i, C.xxx);

    vec3 g = step(x0.yzx, x0.xyz);
    vec3 l = 1.0 - g;
    vec3 i1 = min(g.xyz, l.zxy);
    vec3 i2 = max(g.xyz, l.zxy);

    vec3 x1 = x0 - i1 + C.xxx;
    vec3 x2 = x0 - i2 + C.yyy;
    vec3 x3 = x0 - D.yyy;

    i = mod289(i);
    vec4 p = permute(permute(permute(
                  i.z + vec4(0.0, i1.z, i2.z, 1.0))
                + i.y + vec4(0.0, i1.y, i2.y, 1.0))
                + i.x + vec4(0.0, i1.x, i2.x, 1.0));

    float n_ = 0.142857142857;
    vec3 ns = n_ * D.wyz - D.xzx;

    vec4 j = p - 49.0 * floor(p * ns.z * ns.z);

    vec4 x_ = floor(j * ns.z);
    vec4 y_ = floor(j - 7.0 * x_);

    vec4 x = x_ * ns.x + ns.yyyy;
    vec4 y = y_ * ns.x + ns.yyyy;
    vec4 h = 1.0 - abs(x) - abs(y);

    vec4 b0 = vec4(x.xy, y.xy);
    vec4 b1 = vec4(x.zw, y.zw);

    vec4 s0 = floor(b0) * 2.0 + 1.0;
    vec4 s1 = floor(b1) * 2.0 + 1.0;
    vec4 sh = -step(h, vec4(0.0));

    vec4 a0 = b0.xzyw + s0.xzyw * sh.xxyy;
    vec4 a1 = b1.xzyw + s1.xzyw * sh.zzww;

    vec3 p0 = vec3(a0.xy, h.x);
    vec3 p1 = vec3(a0.zw, h.y);
    vec3 p2 = vec3(a1.xy, h.z);
    vec3 p3 = vec3(a1.zw, h.w);

    vec4 norm = taylorInvSqrt(vec4(dot(p0, p0), dot(p1, p1), dot(p2, p2), dot(p3, p3)));
    p0 *= norm.x;
    p1 *= norm.y;
    p2 *= norm.z;
    p3 *= norm.w;

    vec4 m = max(0.6 - vec4(dot(x0, x0), dot(x1, x1), dot(x2, x2), dot(x3, x3)), 0.0);
    m = m * m;
    return 42.0 * dot(m * m, vec4(dot(p0, x0), dot(p1, x1), dot(p2, x2), dot(p3, x3)));
}

vec3 blendNormal(vec3 base, vec3 blend, float opacity) {
    return blend * opacity + base * (1.0 - opacity);
}

// Layers past the mask width have no switch and always draw.
bool layerActive(int index) {
    return index >= 4 || u_active_colors[min(index, 3)] == 1.0;
}

layout(location = 0) out vec3 v_color;

void main() {
    float time = u_time * u_global.noiseSpeed;

    vec2 noiseCoord = resolution * uvNorm * u_global.noiseFreq;

    float tilt = resolution.y / 2.0 * uvNorm.y;
    float incline = resolution.x * uvNorm.x / 2.0 * u_vertDeform.incline;
    float offset = resolution.x / 2.0 * u_vertDeform.incline
        * mix(u_vertDeform.offsetBottom, u_vertDeform.offsetTop, uv.y);

    float noise = snoise(vec3(
        noiseCoord.x * u_vertDeform.noiseFreq.x + time * u_vertDeform.noiseFlow,
        noiseCoord.y * u_vertDeform.noiseFreq.y,
        time * u_vertDeform.noiseSpeed + u_vertDeform.noiseSeed
    )) * u_vertDeform.noiseAmp;

    noise *= 1.0 - pow(abs(uvNorm.y), 2.0);
    noise = max(0.0, noise);

    vec3 pos = vec3(position.x, position.y + tilt + incline + noise - offset, position.z);

    v_color = u_baseColor;
    for (int i = 0; i < u_waveLayers_length; i++) {
        if (layerActive(i + 1)) {
            WaveLayers layer = u_waveLayers[i];
            float layerNoise = smoothstep(
                layer.noiseFloor,
                layer.noiseCeil,
                snoise(vec3(
                    noiseCoord.x * layer.noiseFreq.x + time * layer.noiseFlow,
                    noiseCoord.y * layer.noiseFreq.y,
                    time * layer.noiseSpeed + layer.noiseSeed
                )) / 2.0 + 0.5
            );
            v_color = blendNormal(v_color, layer.color, pow(layerNoise, 4.0));
        }
    }

    gl_Position = projectionMatrix * modelViewMatrix * vec4(pos, 1.0);
}
";

/// Writes the interpolated color, optionally darkening the top edge.
///
/// The framebuffer origin is top-left, so `gl_FragCoord.y` is flipped to keep
/// the shadow anchored to the top of the surface.
pub const FRAGMENT_SHADER: &str = r"
layout(location = 0) in vec3 v_color;
layout(location = 0) out vec4 fragColor;

void main() {
    vec3 color = v_color;
    if (u_darken_top == 1.0) {
        vec2 st = vec2(gl_FragCoord.x, resolution.y - gl_FragCoord.y) / resolution.xy;
        color.g -= pow(st.y + sin(-12.0) * st.x, u_shadow_power) * 0.4;
    }
    fragColor = vec4(color, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bodies_reference_generated_names() {
        for name in ["u_waveLayers_length", "WaveLayers", "u_vertDeform", "uvNorm"] {
            assert!(VERTEX_SHADER.contains(name), "vertex body misses {name}");
        }
        assert!(FRAGMENT_SHADER.contains("u_shadow_power"));
        assert!(!FRAGMENT_SHADER.contains("u_vertDeform"));
    }

    #[test]
    fn stages_agree_on_the_varying() {
        assert!(VERTEX_SHADER.contains("layout(location = 0) out vec3 v_color;"));
        assert!(FRAGMENT_SHADER.contains("layout(location = 0) in vec3 v_color;"));
    }
}
