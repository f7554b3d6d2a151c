//! Minimal retained-mode binding over a GL-shaped [`Device`].
//!
//! ```text
//!   GlContext ──owns──▶ Device
//!       │                  ▲
//!       ├─ common uniforms │ compile / link / upload / draw
//!       └─ meshes ─▶ Mesh ─┴─ PlaneGeometry (attributes)
//!                        └─── Material (program + uniform tree)
//! ```
//!
//! Uniforms are declared from the values they carry: a material prepends the
//! generated declarations to the shader bodies it is given, then binds every
//! flattened leaf (`u_global.noiseSpeed`, `u_waveLayers[2].color`) to its
//! location in the linked program.

mod attribute;
mod context;
mod device;
mod error;
mod geometry;
mod layout;
mod material;
mod mesh;
#[cfg(test)]
pub(crate) mod recording;
mod uniform;

pub use attribute::{Attribute, AttributeData};
pub use context::{GlContext, MeshId};
pub use device::{
    BufferHandle, BufferTarget, Device, ProgramHandle, ScalarKind, ShaderHandle, ShaderStage,
    UniformLocation, UniformUpload, VertexLayout,
};
pub use error::GlError;
pub use geometry::PlaneGeometry;
pub use layout::{block_binding, BlockField, BlockLayout, ProgramInterface, VertexInput};
pub use material::{Material, VERTEX_INPUTS};
pub use mesh::Mesh;
pub use uniform::{
    struct_type_name, Declaration, Uniform, UniformArray, UniformMap, UniformValue,
    ARRAY_LENGTH_SUFFIX,
};
