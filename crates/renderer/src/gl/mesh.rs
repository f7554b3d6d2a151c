use super::device::Device;
use super::geometry::PlaneGeometry;
use super::material::Material;
use super::uniform::UniformMap;

/// A plane geometry drawn with one material.
#[derive(Debug)]
pub struct Mesh {
    geometry: PlaneGeometry,
    material: Material,
    locations: [Option<u32>; 4],
}

impl Mesh {
    /// Resolves every geometry attribute against the material's program.
    pub fn new<D: Device>(device: &mut D, geometry: PlaneGeometry, material: Material) -> Self {
        let program = material.program();
        let locations = geometry
            .attributes()
            .map(|(name, attribute)| attribute.attach(device, name, program));
        Self {
            geometry,
            material,
            locations,
        }
    }

    pub fn geometry(&self) -> &PlaneGeometry {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut PlaneGeometry {
        &mut self.geometry
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn material_mut(&mut self) -> &mut Material {
        &mut self.material
    }

    /// Uses the program, pushes uniform values, rebinds attributes and issues
    /// one indexed triangle-list draw.
    pub fn draw<D: Device>(&self, device: &mut D, common: &UniformMap) {
        device.use_program(self.material.program());
        self.material.upload_uniforms(device, common);
        for ((_, attribute), location) in self.geometry.attributes().iter().zip(self.locations) {
            attribute.bind(device, location);
        }
        device.draw_indexed(self.geometry.index_count() as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::device::ShaderStage;
    use crate::gl::recording::{Call, RecordingDevice};
    use crate::gl::uniform::Uniform;

    fn mesh(device: &mut RecordingDevice) -> Mesh {
        let common = UniformMap::new().with("aspectRatio", Uniform::float(1.0));
        let material = Material::new(
            device,
            &common,
            "void main() {}\n",
            "void main() {}\n",
            UniformMap::new().with("u_time", Uniform::float(3.0)),
        )
        .unwrap();
        let mut geometry = PlaneGeometry::new(device);
        geometry.reshape(device, 2, 1, 4.0, 2.0);
        Mesh::new(device, geometry, material)
    }

    #[test]
    fn attributes_resolve_to_declared_input_locations() {
        let mut device = RecordingDevice::new();
        let mesh = mesh(&mut device);
        assert_eq!(mesh.locations, [Some(0), Some(1), Some(2), None]);
        assert!(device.source(ShaderStage::Vertex).is_some());
    }

    #[test]
    fn draw_uses_program_uploads_binds_then_draws() {
        let mut device = RecordingDevice::new();
        let mesh = mesh(&mut device);
        let common = UniformMap::new().with("aspectRatio", Uniform::float(2.0));
        device.take_calls();
        mesh.draw(&mut device, &common);

        let calls = device.calls();
        assert_eq!(calls.first(), Some(&Call::UseProgram(mesh.material().program())));
        assert_eq!(calls.last(), Some(&Call::Draw { count: 12 }));
        assert_eq!(device.count(|call| matches!(call, Call::Uniform { .. })), 2);
        assert_eq!(device.count(|call| matches!(call, Call::BindVertex { .. })), 3);
        assert_eq!(device.count(|call| matches!(call, Call::BindIndex { .. })), 1);
        assert_eq!(
            device.last_upload(mesh.material().program(), "aspectRatio"),
            Some(crate::gl::device::UniformUpload::Float(2.0))
        );
    }
}
