//! Renderer crate for the valentine gradient.
//!
//! An animated, multi-color wave gradient drawn on one subdivided plane. The
//! overall flow is:
//!
//! ```text
//!   CLI / valentine
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ window (winit) ──▶ Gradient ──▶ GlContext ──▶ WgpuDevice
//!                        │  resize / space / escape     │               │
//!                        └── RedrawScheduler ◀──────────┘      naga GLSL + wgpu
//! ```
//!
//! [`gl`] is a small retained-mode layer over a GL-shaped [`gl::Device`]:
//! uniform trees that declare themselves in GLSL, plane geometry, materials and
//! meshes. [`gradient`] builds the wave material on top of it and animates it
//! from frame timestamps. [`gpu`] is the wgpu implementation of the device;
//! shader stages are compiled through naga's GLSL frontend.

mod compile;
pub mod gl;
pub mod gpu;
pub mod gradient;
pub mod runtime;
mod types;
mod window;

use anyhow::Result;

pub use gradient::{Gradient, GradientError};
pub use types::{Antialiasing, DeformSettings, GradientSettings, RendererConfig, DEFAULT_COLORS};

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    /// Builds a renderer for the supplied configuration.
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Opens the gradient window and blocks until it is closed.
    ///
    /// Failing to create the event loop or the window is an error. Failing
    /// to build the gradient is not: it is logged and the window stays open
    /// without a background.
    pub fn run(&mut self) -> Result<()> {
        window::run(&self.config)
    }
}
