use super::device::{BufferHandle, BufferTarget, Device, ProgramHandle, ScalarKind, VertexLayout};

/// Raw payload of an attribute buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeData {
    F32(Vec<f32>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl AttributeData {
    pub fn kind(&self) -> ScalarKind {
        match self {
            AttributeData::F32(_) => ScalarKind::F32,
            AttributeData::U16(_) => ScalarKind::U16,
            AttributeData::U32(_) => ScalarKind::U32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AttributeData::F32(values) => values.len(),
            AttributeData::U16(values) => values.len(),
            AttributeData::U32(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            AttributeData::F32(values) => bytemuck::cast_slice(values),
            AttributeData::U16(values) => bytemuck::cast_slice(values),
            AttributeData::U32(values) => bytemuck::cast_slice(values),
        }
    }
}

/// A named per-vertex (or index) buffer.
#[derive(Debug)]
pub struct Attribute {
    target: BufferTarget,
    components: u32,
    kind: ScalarKind,
    normalized: bool,
    buffer: BufferHandle,
    data: Option<AttributeData>,
}

impl Attribute {
    pub fn new<D: Device>(
        device: &mut D,
        target: BufferTarget,
        components: u32,
        kind: ScalarKind,
    ) -> Self {
        Self {
            target,
            components,
            kind,
            normalized: false,
            buffer: device.create_buffer(target),
            data: None,
        }
    }

    pub fn target(&self) -> BufferTarget {
        self.target
    }

    pub fn components(&self) -> u32 {
        self.components
    }

    pub fn data(&self) -> Option<&AttributeData> {
        self.data.as_ref()
    }

    /// Number of scalar values in the payload.
    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, AttributeData::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replaces the payload; the caller uploads with [`Attribute::update`].
    pub(crate) fn set_data(&mut self, data: AttributeData) {
        debug_assert_eq!(data.kind(), self.kind);
        debug_assert_eq!(data.len() % self.components as usize, 0);
        self.data = Some(data);
    }

    /// Uploads the payload, if any.
    pub fn update<D: Device>(&self, device: &mut D) {
        if let Some(data) = &self.data {
            device.buffer_data(self.buffer, data);
        }
    }

    /// Resolves this attribute's location in `program` and binds it.
    ///
    /// Index buffers have no location; they are bound on every draw instead.
    pub fn attach<D: Device>(&self, device: &mut D, name: &str, program: ProgramHandle) -> Option<u32> {
        if self.target == BufferTarget::Index {
            return None;
        }
        let location = device.attribute_location(program, name)?;
        device.bind_vertex_buffer(location, self.buffer, self.layout());
        Some(location)
    }

    /// Re-binds the buffer before a draw.
    pub fn bind<D: Device>(&self, device: &mut D, location: Option<u32>) {
        match (self.target, location) {
            (BufferTarget::Index, _) => device.bind_index_buffer(self.buffer, self.kind),
            (BufferTarget::Vertex, Some(location)) => {
                device.bind_vertex_buffer(location, self.buffer, self.layout())
            }
            (BufferTarget::Vertex, None) => {}
        }
    }

    fn layout(&self) -> VertexLayout {
        VertexLayout {
            components: self.components,
            kind: self.kind,
            normalized: self.normalized,
        }
    }
}
