use tracing::debug;

use super::device::Device;
use super::error::GlError;
use super::geometry::PlaneGeometry;
use super::material::Material;
use super::mesh::Mesh;
use super::uniform::{Uniform, UniformMap};

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Depth scale of the orthographic camera; keeps every vertex inside the
/// clip volume regardless of its displacement.
const ORTHO_DEPTH: f32 = -0.001;

/// Registry key of a mesh added to a [`GlContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(u64);

/// Owns the device, the uniforms shared by every material, and the meshes
/// drawn each frame.
///
/// Meshes are drawn in the order they were added. Dropping the context drops
/// every registered mesh with it.
#[derive(Debug)]
pub struct GlContext<D: Device> {
    device: D,
    common: UniformMap,
    meshes: Vec<(MeshId, Mesh)>,
    next_mesh: u64,
    width: u32,
    height: u32,
}

impl<D: Device> GlContext<D> {
    pub fn new(device: D) -> Self {
        let common = UniformMap::new()
            .with("projectionMatrix", Uniform::mat4(IDENTITY))
            .with("modelViewMatrix", Uniform::mat4(IDENTITY))
            .with("resolution", Uniform::vec2([1.0, 1.0]))
            .with("aspectRatio", Uniform::float(1.0));
        Self {
            device,
            common,
            meshes: Vec::new(),
            next_mesh: 0,
            width: 1,
            height: 1,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Drops every mesh and hands the device back.
    pub fn into_device(self) -> D {
        self.device
    }

    pub fn common_uniforms(&self) -> &UniformMap {
        &self.common
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn create_material(
        &mut self,
        vertex_body: &str,
        fragment_body: &str,
        uniforms: UniformMap,
    ) -> Result<Material, GlError> {
        Material::new(
            &mut self.device,
            &self.common,
            vertex_body,
            fragment_body,
            uniforms,
        )
    }

    pub fn plane_geometry(&mut self) -> PlaneGeometry {
        PlaneGeometry::new(&mut self.device)
    }

    pub fn add_mesh(&mut self, geometry: PlaneGeometry, material: Material) -> MeshId {
        let id = MeshId(self.next_mesh);
        self.next_mesh += 1;
        let mesh = Mesh::new(&mut self.device, geometry, material);
        self.meshes.push((id, mesh));
        id
    }

    pub fn remove_mesh(&mut self, id: MeshId) -> Option<Mesh> {
        let position = self.meshes.iter().position(|(existing, _)| *existing == id)?;
        Some(self.meshes.remove(position).1)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, mesh)| mesh)
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut Mesh> {
        self.meshes
            .iter_mut()
            .find(|(existing, _)| *existing == id)
            .map(|(_, mesh)| mesh)
    }

    /// Borrows a mesh together with the device, for buffer regeneration.
    pub fn mesh_with_device(&mut self, id: MeshId) -> Option<(&mut Mesh, &mut D)> {
        let mesh = self
            .meshes
            .iter_mut()
            .find(|(existing, _)| *existing == id)
            .map(|(_, mesh)| mesh)?;
        Some((mesh, &mut self.device))
    }

    pub fn mesh_ids(&self) -> impl Iterator<Item = MeshId> + '_ {
        self.meshes.iter().map(|(id, _)| *id)
    }

    /// Sets the viewport and the `resolution`/`aspectRatio` uniforms.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.device.set_viewport(width, height);
        self.common
            .insert("resolution", Uniform::vec2([width as f32, height as f32]));
        self.common.insert(
            "aspectRatio",
            Uniform::float(width as f32 / height.max(1) as f32),
        );
        debug!(width, height, "viewport resized");
    }

    /// Projection mapping pixel space onto clip space, origin at the centre.
    pub fn set_orthographic_camera(&mut self) {
        let mut projection = IDENTITY;
        projection[0] = 2.0 / self.width.max(1) as f32;
        projection[5] = 2.0 / self.height.max(1) as f32;
        projection[10] = ORTHO_DEPTH;
        self.common
            .insert("projectionMatrix", Uniform::mat4(projection));
    }

    /// Clears to transparent and draws every mesh in registration order.
    pub fn render(&mut self) -> Result<(), D::FrameError> {
        self.device.clear([0.0, 0.0, 0.0, 0.0], 1.0);
        for (_, mesh) in &self.meshes {
            mesh.draw(&mut self.device, &self.common);
        }
        self.device.end_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::device::UniformUpload;
    use crate::gl::recording::{Call, RecordingDevice};
    use crate::gl::uniform::UniformValue;

    const VERTEX: &str = "void main() { gl_Position = projectionMatrix * vec4(position, 1.0); }\n";
    const FRAGMENT: &str = "void main() {}\n";

    fn context_with_meshes(count: usize) -> (GlContext<RecordingDevice>, Vec<MeshId>) {
        let mut context = GlContext::new(RecordingDevice::new());
        let ids = (0..count)
            .map(|_| {
                let material = context
                    .create_material(VERTEX, FRAGMENT, UniformMap::new())
                    .unwrap();
                let mut geometry = context.plane_geometry();
                geometry.set_topology(context.device_mut(), 1, 1);
                context.add_mesh(geometry, material)
            })
            .collect();
        (context, ids)
    }

    #[test]
    fn set_size_updates_viewport_and_common_uniforms() {
        let mut context = GlContext::new(RecordingDevice::new());
        context.set_size(800, 400);
        assert_eq!(
            context.device().calls().last(),
            Some(&Call::Viewport {
                width: 800,
                height: 400
            })
        );
        let common = context.common_uniforms();
        assert_eq!(
            common.get("resolution").unwrap().value(),
            &UniformValue::Vec2([800.0, 400.0])
        );
        assert_eq!(
            common.get("aspectRatio").unwrap().value(),
            &UniformValue::Float(2.0)
        );
    }

    #[test]
    fn orthographic_camera_fits_pixel_space() {
        let mut context = GlContext::new(RecordingDevice::new());
        context.set_size(1000, 500);
        context.set_orthographic_camera();
        let UniformValue::Mat4(matrix) = context
            .common_uniforms()
            .get("projectionMatrix")
            .unwrap()
            .value()
        else {
            panic!("projection is not a matrix");
        };
        assert_eq!(matrix[0], 2.0 / 1000.0);
        assert_eq!(matrix[5], 2.0 / 500.0);
        assert_eq!(matrix[10], -0.001);
        assert_eq!(matrix[15], 1.0);
        assert_eq!(matrix.iter().filter(|value| **value != 0.0).count(), 4);
    }

    #[test]
    fn render_clears_draws_in_order_and_presents() {
        let (mut context, ids) = context_with_meshes(2);
        let programs: Vec<_> = ids
            .iter()
            .map(|id| context.mesh(*id).unwrap().material().program())
            .collect();
        context.device_mut().take_calls();
        context.render().unwrap();

        let calls = context.device().calls();
        assert_eq!(
            calls.first(),
            Some(&Call::Clear {
                color: [0.0; 4],
                depth: 1.0
            })
        );
        assert_eq!(calls.last(), Some(&Call::EndFrame));
        let used: Vec<_> = calls
            .iter()
            .filter_map(|call| match call {
                Call::UseProgram(program) => Some(*program),
                _ => None,
            })
            .collect();
        assert_eq!(used, programs);
    }

    #[test]
    fn removed_meshes_are_no_longer_drawn() {
        let (mut context, ids) = context_with_meshes(3);
        assert!(context.remove_mesh(ids[1]).is_some());
        assert!(context.remove_mesh(ids[1]).is_none());
        assert_eq!(context.mesh_ids().collect::<Vec<_>>(), [ids[0], ids[2]]);

        context.device_mut().take_calls();
        context.render().unwrap();
        assert_eq!(
            context
                .device()
                .count(|call| matches!(call, Call::Draw { .. })),
            2
        );
    }

    #[test]
    fn common_uniforms_reach_every_material() {
        let (mut context, ids) = context_with_meshes(1);
        context.set_size(200, 100);
        context.set_orthographic_camera();
        context.render().unwrap();
        let program = context.mesh(ids[0]).unwrap().material().program();
        assert_eq!(
            context.device().last_upload(program, "aspectRatio"),
            Some(UniformUpload::Float(2.0))
        );
    }
}
