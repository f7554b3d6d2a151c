//! Animated multi-color gradient drawn on one subdivided plane.
//!
//! ```text
//!   colors ──parse──▶ uniform tree ──▶ Material ─┐
//!                                                ├─▶ Mesh ─▶ GlContext::render
//!   resize(w, h) ──▶ PlaneGeometry::reshape ─────┘      ▲
//!                                                       │
//!   FrameScheduler ──timestamp──▶ animate ──u_time──────┘
//! ```
//!
//! The gradient owns its [`GlContext`] and therefore the device; dropping it
//! (or calling [`Gradient::teardown`]) releases both, and nothing outside
//! keeps a reference to the mesh.

mod color;
mod driver;
mod shaders;
mod uniforms;

use tracing::{debug, info, warn};

use crate::gl::{Device, GlContext, GlError, MeshId, Uniform, UniformValue};
use crate::types::GradientSettings;

pub use color::parse_hex_color;
pub use driver::{AnimationDriver, FrameRequest, FrameScheduler, MAX_FRAME_DELTA_MS};
pub use shaders::{FRAGMENT_SHADER, VERTEX_SHADER};

/// Horizontal mesh segments per pixel of width.
const X_SEGMENTS_PER_PIXEL: f32 = 0.02;
/// Vertical mesh segments per pixel of height.
const Y_SEGMENTS_PER_PIXEL: f32 = 0.05;
/// Surfaces narrower than this get a softer top shadow.
const NARROW_WIDTH: u32 = 600;

#[derive(Debug, thiserror::Error)]
pub enum GradientError {
    #[error("at least one color is required")]
    NoColors,
    #[error("invalid color '{0}', expected a #rrggbb hex triplet")]
    InvalidColor(String),
    #[error("gradient material has no uniform '{0}'")]
    MissingUniform(String),
    #[error(transparent)]
    Gl(#[from] GlError),
}

/// The gradient animation: one material, one plane mesh, one driver.
#[derive(Debug)]
pub struct Gradient<D: Device> {
    context: GlContext<D>,
    mesh: MeshId,
    driver: AnimationDriver,
}

impl<D: Device> Gradient<D> {
    /// Compiles the gradient material for `colors` and fits it to `size`.
    ///
    /// The first color is the base; every further color adds a wave layer.
    pub fn new<S: AsRef<str>>(
        device: D,
        colors: &[S],
        size: (u32, u32),
    ) -> Result<Self, GradientError> {
        if colors.is_empty() {
            return Err(GradientError::NoColors);
        }
        let parsed = colors
            .iter()
            .map(|color| parse_hex_color(color.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut context = GlContext::new(device);
        let material = context.create_material(
            VERTEX_SHADER,
            FRAGMENT_SHADER,
            uniforms::gradient_uniforms(&parsed)?,
        )?;
        let geometry = context.plane_geometry();
        let mesh = context.add_mesh(geometry, material);
        info!(colors = parsed.len(), "gradient material compiled");

        let mut gradient = Self {
            context,
            mesh,
            driver: AnimationDriver::new(),
        };
        gradient.fit(size.0, size.1)?;
        Ok(gradient)
    }

    pub fn context(&self) -> &GlContext<D> {
        &self.context
    }

    pub fn device(&self) -> &D {
        self.context.device()
    }

    pub fn device_mut(&mut self) -> &mut D {
        self.context.device_mut()
    }

    pub fn is_playing(&self) -> bool {
        self.driver.is_playing()
    }

    /// Accumulated animation time in milliseconds.
    pub fn time(&self) -> f64 {
        self.driver.time()
    }

    /// Current value of a top-level material uniform.
    pub fn uniform(&self, name: &str) -> Option<&Uniform> {
        self.context.mesh(self.mesh)?.material().uniform(name)
    }

    /// Writes the host's settings into the material uniforms.
    ///
    /// Only deformation fields that are set are written. Colors and playback
    /// are handled by the host.
    pub fn apply(&mut self, settings: &GradientSettings) -> Result<(), GradientError> {
        use uniforms::{DARKEN_TOP, GLOBAL, SHADOW_POWER, VERT_DEFORM};

        self.set_uniform(SHADOW_POWER, None, UniformValue::Float(settings.shadow_power))?;
        let darken = if settings.darken_top { 1.0 } else { 0.0 };
        self.set_uniform(DARKEN_TOP, None, UniformValue::Float(darken))?;
        self.set_uniform(
            GLOBAL,
            Some("noiseFreq"),
            UniformValue::Vec2(settings.noise_frequency),
        )?;
        self.set_uniform(
            GLOBAL,
            Some("noiseSpeed"),
            UniformValue::Float(settings.noise_speed),
        )?;

        let deform = &settings.deform;
        let floats = [
            ("incline", deform.incline),
            ("offsetTop", deform.offset_top),
            ("offsetBottom", deform.offset_bottom),
            ("noiseAmp", deform.noise_amp),
            ("noiseSpeed", deform.noise_speed),
            ("noiseFlow", deform.noise_flow),
            ("noiseSeed", deform.noise_seed),
        ];
        for (field, value) in floats {
            if let Some(value) = value {
                self.set_uniform(VERT_DEFORM, Some(field), UniformValue::Float(value))?;
            }
        }
        if let Some(frequency) = deform.noise_freq {
            self.set_uniform(VERT_DEFORM, Some("noiseFreq"), UniformValue::Vec2(frequency))?;
        }
        debug!(deform = ?settings.deform, "gradient settings applied");
        Ok(())
    }

    /// Fits viewport, camera and mesh to a `width` × `height` pixel surface.
    ///
    /// A resize to the current size is ignored, so settings applied since
    /// the last real resize (such as the shadow power) are kept.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), GradientError> {
        if self.context.size() == (width, height) {
            return Ok(());
        }
        self.fit(width, height)
    }

    fn fit(&mut self, width: u32, height: u32) -> Result<(), GradientError> {
        self.context.set_size(width, height);
        self.context.set_orthographic_camera();

        let (x_segments, y_segments) = segment_counts(width, height);
        if let Some((mesh, device)) = self.context.mesh_with_device(self.mesh) {
            mesh.geometry_mut().reshape(
                device,
                x_segments,
                y_segments,
                width as f32,
                height as f32,
            );
        }
        self.set_uniform(
            uniforms::SHADOW_POWER,
            None,
            UniformValue::Float(shadow_power_for_width(width)),
        )?;
        debug!(width, height, x_segments, y_segments, "gradient resized");
        Ok(())
    }

    /// Starts (or resumes) the animation.
    pub fn start(&mut self, scheduler: &mut impl FrameScheduler) {
        self.driver.start(scheduler);
    }

    /// Pauses the animation and cancels the pending frame.
    pub fn stop(&mut self, scheduler: &mut impl FrameScheduler) {
        self.driver.stop(scheduler);
    }

    /// Handles a scheduled frame: advance time, render, request the next one.
    ///
    /// Frames arriving while stopped are ignored.
    pub fn animate(
        &mut self,
        timestamp: f64,
        scheduler: &mut impl FrameScheduler,
    ) -> Result<(), D::FrameError> {
        let Some(time) = self.driver.advance(timestamp) else {
            return Ok(());
        };
        if let Err(err) = self.set_uniform(uniforms::TIME, None, UniformValue::Float(time as f32)) {
            warn!(%err, "animation time not updated");
        }
        let rendered = self.context.render();
        self.driver.schedule_next(scheduler);
        rendered
    }

    /// Renders the current state without advancing time.
    pub fn redraw(&mut self) -> Result<(), D::FrameError> {
        self.context.render()
    }

    /// Stops the animation and hands the device back; the mesh and material
    /// are dropped with the context.
    pub fn teardown(mut self, scheduler: &mut impl FrameScheduler) -> D {
        self.driver.stop(scheduler);
        info!(time_ms = self.driver.time(), "gradient torn down");
        self.context.into_device()
    }

    fn set_uniform(
        &mut self,
        name: &str,
        field: Option<&str>,
        value: UniformValue,
    ) -> Result<(), GradientError> {
        let missing = |name: &str| GradientError::MissingUniform(name.to_string());
        let uniform = self
            .context
            .mesh_mut(self.mesh)
            .and_then(|mesh| mesh.material_mut().uniform_mut(name))
            .ok_or_else(|| missing(name))?;
        let target = match field {
            Some(field) => uniform
                .field_mut(field)
                .ok_or_else(|| missing(&format!("{name}.{field}")))?,
            None => uniform,
        };
        target.set(value)?;
        Ok(())
    }
}

/// Mesh subdivision for a surface: ~2% of the width by ~5% of the height.
pub fn segment_counts(width: u32, height: u32) -> (u32, u32) {
    let x = (width as f32 * X_SEGMENTS_PER_PIXEL).ceil() as u32;
    let y = (height as f32 * Y_SEGMENTS_PER_PIXEL).ceil() as u32;
    (x.max(1), y.max(1))
}

pub fn shadow_power_for_width(width: u32) -> f32 {
    if width < NARROW_WIDTH {
        5.0
    } else {
        6.0
    }
}

#[cfg(test)]
mod tests {
    use super::driver::tests::ManualScheduler;
    use super::*;
    use crate::gl::recording::{Call, RecordingDevice};
    use crate::gl::ShaderStage;
    use crate::types::DeformSettings;

    const TWO_COLORS: [&str; 2] = ["#000000", "#00ff00"];

    fn gradient(colors: &[&str], size: (u32, u32)) -> Gradient<RecordingDevice> {
        Gradient::new(RecordingDevice::new(), colors, size).unwrap()
    }

    fn float(gradient: &Gradient<RecordingDevice>, name: &str, field: Option<&str>) -> f32 {
        let uniform = gradient.uniform(name).unwrap();
        let uniform = match field {
            Some(field) => uniform.field(field).unwrap(),
            None => uniform,
        };
        match uniform.value() {
            UniformValue::Float(value) => *value,
            other => panic!("{name} is a {}", other.kind_name()),
        }
    }

    #[test]
    fn shadow_power_depends_on_width() {
        let mut gradient = gradient(&TWO_COLORS, (599, 400));
        assert_eq!(float(&gradient, uniforms::SHADOW_POWER, None), 5.0);
        gradient.resize(600, 400).unwrap();
        assert_eq!(float(&gradient, uniforms::SHADOW_POWER, None), 6.0);
    }

    #[test]
    fn same_size_resize_keeps_applied_shadow_power() {
        let mut gradient = gradient(&TWO_COLORS, (1280, 720));
        let settings = GradientSettings {
            shadow_power: 8.0,
            ..GradientSettings::default()
        };
        gradient.apply(&settings).unwrap();
        gradient.device_mut().take_calls();

        gradient.resize(1280, 720).unwrap();
        assert_eq!(float(&gradient, uniforms::SHADOW_POWER, None), 8.0);
        assert_eq!(gradient.device().count(|call| matches!(call, Call::Viewport { .. })), 0);

        gradient.resize(1281, 720).unwrap();
        assert_eq!(float(&gradient, uniforms::SHADOW_POWER, None), 6.0);
    }

    #[test]
    fn initial_size_is_fitted_even_when_tiny() {
        let gradient = gradient(&TWO_COLORS, (1, 1));
        let mesh = gradient.context().mesh(gradient.mesh).unwrap();
        assert_eq!(mesh.geometry().size(), (1.0, 1.0));
        assert_eq!(gradient.device().count(|call| matches!(call, Call::Viewport { .. })), 1);
    }

    #[test]
    fn segments_scale_with_the_surface() {
        assert_eq!(segment_counts(1000, 500), (20, 25));
        assert_eq!(segment_counts(1001, 1), (21, 1));
        assert_eq!(segment_counts(0, 0), (1, 1));
    }

    #[test]
    fn resize_regenerates_viewport_camera_and_mesh() {
        let mut gradient = gradient(&TWO_COLORS, (100, 100));
        gradient.resize(1000, 500).unwrap();
        assert_eq!(
            gradient.device().calls().iter().rev().find(|call| matches!(call, Call::Viewport { .. })),
            Some(&Call::Viewport {
                width: 1000,
                height: 500
            })
        );
        let mesh = gradient.context().mesh(gradient.mesh).unwrap();
        assert_eq!(mesh.geometry().segments(), (20, 25));
        assert_eq!(mesh.geometry().vertex_count(), 21 * 26);
        assert_eq!(mesh.geometry().size(), (1000.0, 500.0));
    }

    #[test]
    fn single_color_builds_an_empty_layer_array() {
        let gradient = gradient(&["#38bdf8"], (800, 600));
        let vertex = gradient.device().source(ShaderStage::Vertex).unwrap();
        assert!(vertex.contains("const int u_waveLayers_length = 0;"));
        assert!(vertex.contains("WaveLayers u_waveLayers[1];"));
    }

    #[test]
    fn second_color_becomes_the_first_wave_layer() {
        let gradient = gradient(&TWO_COLORS, (800, 600));
        let layer = gradient
            .uniform(uniforms::WAVE_LAYERS)
            .and_then(|layers| layers.item(0))
            .unwrap();
        assert_eq!(
            layer.field("color").unwrap().value(),
            &UniformValue::Vec3([0.0, 1.0, 0.0])
        );
        assert_eq!(
            layer.field("noiseFreq").unwrap().value(),
            &UniformValue::Vec2([2.5, 3.5])
        );
        assert_eq!(
            gradient.uniform(uniforms::BASE_COLOR).unwrap().value(),
            &UniformValue::Vec3([0.0, 0.0, 0.0])
        );
    }

    #[test]
    fn bad_colors_are_rejected_before_compiling() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            Gradient::new(RecordingDevice::new(), &empty, (10, 10)),
            Err(GradientError::NoColors)
        ));
        assert!(matches!(
            Gradient::new(RecordingDevice::new(), &["#38bdf8", "blue"], (10, 10)),
            Err(GradientError::InvalidColor(color)) if color == "blue"
        ));
    }

    #[test]
    fn compile_and_link_failures_surface_the_log() {
        let err = Gradient::new(
            RecordingDevice::failing_compile(ShaderStage::Vertex),
            &TWO_COLORS,
            (10, 10),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            GradientError::Gl(GlError::Compile {
                stage: ShaderStage::Vertex,
                ..
            })
        ));
        assert!(err.to_string().contains("syntax error"));

        let err = Gradient::new(RecordingDevice::failing_link(), &TWO_COLORS, (10, 10)).unwrap_err();
        assert!(matches!(err, GradientError::Gl(GlError::Link { .. })));
    }

    #[test]
    fn apply_writes_only_provided_deform_fields() {
        let mut gradient = gradient(&TWO_COLORS, (800, 600));
        let settings = GradientSettings {
            shadow_power: 8.0,
            darken_top: true,
            deform: DeformSettings {
                noise_amp: Some(250.0),
                ..DeformSettings::default()
            },
            ..GradientSettings::default()
        };
        gradient.apply(&settings).unwrap();

        assert_eq!(float(&gradient, uniforms::SHADOW_POWER, None), 8.0);
        assert_eq!(float(&gradient, uniforms::DARKEN_TOP, None), 1.0);
        assert_eq!(
            float(&gradient, uniforms::GLOBAL, Some("noiseSpeed")),
            0.00001
        );
        assert_eq!(
            float(&gradient, uniforms::VERT_DEFORM, Some("noiseAmp")),
            250.0
        );
        assert_eq!(float(&gradient, uniforms::VERT_DEFORM, Some("incline")), 0.0);
        assert_eq!(
            float(&gradient, uniforms::VERT_DEFORM, Some("noiseSeed")),
            5.0
        );
    }

    #[test]
    fn animate_advances_time_renders_and_reschedules() {
        let mut scheduler = ManualScheduler::default();
        let mut gradient = gradient(&TWO_COLORS, (800, 600));
        gradient.start(&mut scheduler);
        gradient.device_mut().take_calls();

        gradient.animate(5000.0, &mut scheduler).unwrap();
        assert!((gradient.time() - MAX_FRAME_DELTA_MS).abs() < 1e-9);
        assert_eq!(float(&gradient, uniforms::TIME, None), MAX_FRAME_DELTA_MS as f32);
        assert_eq!(gradient.device().count(|call| *call == Call::EndFrame), 1);
        assert_eq!(scheduler.requested.len(), 2);
    }

    #[test]
    fn stop_freezes_time_and_rendering() {
        let mut scheduler = ManualScheduler::default();
        let mut gradient = gradient(&TWO_COLORS, (800, 600));
        gradient.start(&mut scheduler);
        gradient.animate(16.0, &mut scheduler).unwrap();
        gradient.stop(&mut scheduler);
        assert_eq!(scheduler.cancelled, [FrameRequest(1)]);

        gradient.device_mut().take_calls();
        gradient.animate(32.0, &mut scheduler).unwrap();
        assert_eq!(gradient.time(), 16.0);
        assert!(gradient.device().calls().is_empty());
        assert_eq!(scheduler.requested.len(), 2);
    }

    #[test]
    fn redraw_renders_without_advancing() {
        let mut gradient = gradient(&TWO_COLORS, (800, 600));
        gradient.device_mut().take_calls();
        gradient.redraw().unwrap();
        assert_eq!(gradient.time(), 0.0);
        assert_eq!(gradient.device().count(|call| matches!(call, Call::Draw { .. })), 1);
    }

    #[test]
    fn teardown_cancels_and_returns_the_device() {
        let mut scheduler = ManualScheduler::default();
        let mut gradient = gradient(&TWO_COLORS, (800, 600));
        gradient.start(&mut scheduler);
        let device = gradient.teardown(&mut scheduler);
        assert_eq!(scheduler.cancelled, [FrameRequest(0)]);
        assert!(device.count(|call| matches!(call, Call::Link { .. })) == 1);
    }
}
