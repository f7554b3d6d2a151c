//! wgpu backend for the GL-shaped [`Device`](crate::gl::Device).
//!
//! - `context` owns the instance, surface and swapchain configuration and
//!   rebuilds them when the window resizes.
//! - `pipeline` turns a linked program interface into a render pipeline with
//!   one uniform bind group (vertex block at binding 0, fragment block at 1).
//! - `device` records the immediate-style calls and replays them as render
//!   passes when the frame ends.

mod context;
mod device;
mod pipeline;

pub use device::WgpuDevice;
