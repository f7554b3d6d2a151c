use super::attribute::{Attribute, AttributeData};
use super::device::{BufferTarget, Device, ScalarKind};

/// A subdivided rectangle centred on the origin in the xy plane.
///
/// Topology (segment counts, uv, indices) and size (positions) are rebuilt
/// separately; positions depend on the vertex count, so topology has to be
/// set first. [`PlaneGeometry::reshape`] does both in order.
#[derive(Debug)]
pub struct PlaneGeometry {
    x_segments: u32,
    y_segments: u32,
    width: f32,
    height: f32,
    position: Attribute,
    uv: Attribute,
    uv_norm: Attribute,
    index: Attribute,
}

impl PlaneGeometry {
    pub fn new<D: Device>(device: &mut D) -> Self {
        Self {
            x_segments: 0,
            y_segments: 0,
            width: 1.0,
            height: 1.0,
            position: Attribute::new(device, BufferTarget::Vertex, 3, ScalarKind::F32),
            uv: Attribute::new(device, BufferTarget::Vertex, 2, ScalarKind::F32),
            uv_norm: Attribute::new(device, BufferTarget::Vertex, 2, ScalarKind::F32),
            index: Attribute::new(device, BufferTarget::Index, 3, ScalarKind::U32),
        }
    }

    /// Rebuilds uv, uvNorm and the index list for `x_segments` × `y_segments`
    /// quads. Counts below one are raised to one.
    pub fn set_topology<D: Device>(&mut self, device: &mut D, x_segments: u32, y_segments: u32) {
        self.x_segments = x_segments.max(1);
        self.y_segments = y_segments.max(1);
        let (uv, uv_norm) = plane_uvs(self.x_segments, self.y_segments);
        self.uv.set_data(AttributeData::F32(uv));
        self.uv_norm.set_data(AttributeData::F32(uv_norm));
        self.index
            .set_data(AttributeData::U32(plane_indices(self.x_segments, self.y_segments)));
        self.uv.update(device);
        self.uv_norm.update(device);
        self.index.update(device);
    }

    /// Rebuilds positions for the current topology at `width` × `height`.
    pub fn set_size<D: Device>(&mut self, device: &mut D, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.position.set_data(AttributeData::F32(plane_positions(
            self.x_segments.max(1),
            self.y_segments.max(1),
            width,
            height,
        )));
        self.position.update(device);
    }

    pub fn reshape<D: Device>(
        &mut self,
        device: &mut D,
        x_segments: u32,
        y_segments: u32,
        width: f32,
        height: f32,
    ) {
        self.set_topology(device, x_segments, y_segments);
        self.set_size(device, width, height);
    }

    pub fn segments(&self) -> (u32, u32) {
        (self.x_segments, self.y_segments)
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn vertex_count(&self) -> usize {
        self.uv.len() / 2
    }

    pub fn index_count(&self) -> usize {
        self.index.len()
    }

    /// Attributes by the input name the material declares, index buffer last.
    pub fn attributes(&self) -> [(&'static str, &Attribute); 4] {
        [
            ("position", &self.position),
            ("uv", &self.uv),
            ("uvNorm", &self.uv_norm),
            ("index", &self.index),
        ]
    }
}

fn plane_uvs(x_segments: u32, y_segments: u32) -> (Vec<f32>, Vec<f32>) {
    let vertices = ((x_segments + 1) * (y_segments + 1)) as usize;
    let mut uv = Vec::with_capacity(vertices * 2);
    let mut uv_norm = Vec::with_capacity(vertices * 2);
    for y in 0..=y_segments {
        let v = y as f32 / y_segments as f32;
        for x in 0..=x_segments {
            let u = x as f32 / x_segments as f32;
            uv.extend_from_slice(&[u, 1.0 - v]);
            uv_norm.extend_from_slice(&[u * 2.0 - 1.0, 1.0 - v * 2.0]);
        }
    }
    (uv, uv_norm)
}

fn plane_indices(x_segments: u32, y_segments: u32) -> Vec<u32> {
    let mut indices = Vec::with_capacity((6 * x_segments * y_segments) as usize);
    for y in 0..y_segments {
        for x in 0..x_segments {
            let i = y * (x_segments + 1) + x;
            let below = i + x_segments + 1;
            indices.extend_from_slice(&[i, below, i + 1, i + 1, below, below + 1]);
        }
    }
    indices
}

fn plane_positions(x_segments: u32, y_segments: u32, width: f32, height: f32) -> Vec<f32> {
    let segment_width = width / x_segments as f32;
    let segment_height = height / y_segments as f32;
    let mut positions = Vec::with_capacity(((x_segments + 1) * (y_segments + 1) * 3) as usize);
    for y in 0..=y_segments {
        let pos_y = -height / 2.0 + y as f32 * segment_height;
        for x in 0..=x_segments {
            let pos_x = -width / 2.0 + x as f32 * segment_width;
            positions.extend_from_slice(&[pos_x, -pos_y, 0.0]);
        }
    }
    positions
}
