//! Geometry Buffers
//!
//! A [`GeometryBuffer`] owns raw float vertex data laid out according to a
//! [`VertexFormat`], optional 16-bit indices, and the GPU buffers they were
//! uploaded to. At draw time it matches the shader's attribute roles against
//! its own attribute list and wires the matching vertex slots.

use std::fmt;

use glam::{Vec2, Vec3};

use crate::errors::{Error, Result, VertexDataError};
use crate::gpu::{BufferId, BufferTarget, DeviceRef};
use crate::resources::shader::ShaderProgram;
use crate::resources::vertex_format::{AttributeRole, VertexFormat};

pub use crate::gpu::Topology;

/// Layout block appended when tangents are synthesized.
pub const TANGENT_BLOCK: &str = "tg3";

/// GPU-resident drawable geometry.
pub struct GeometryBuffer {
    device: DeviceRef,

    vertex_format: VertexFormat,
    vertices: Vec<f32>,
    indices: Option<Vec<u16>>,

    topology: Topology,
    vertex_count: u32,
    index_count: u32,
    primitive_count: u32,

    vertex_buffer: BufferId,
    index_buffer: Option<BufferId>,
}

impl GeometryBuffer {
    /// Builds and uploads a geometry.
    ///
    /// `indices` are narrowed to 16 bits and must address existing vertices.
    /// When `calculate_tangents` is set and the data qualifies (see
    /// [`compute_tangents`]), a `tg3` block is appended to the vertex data;
    /// otherwise the geometry is built without tangents.
    pub fn new(
        device: DeviceRef,
        vertices: &[f32],
        indices: Option<&[u32]>,
        format: &str,
        topology: Topology,
        calculate_tangents: bool,
    ) -> Result<Self> {
        let indices = indices.map(narrow_indices).transpose()?;
        let mut vertex_format = VertexFormat::new(format, vertices.len())?;
        let mut vertices = vertices.to_vec();

        let vertex_count = vertex_format.vertex_count() as u32;
        if let Some(&index) = indices
            .iter()
            .flatten()
            .find(|&&index| u32::from(index) >= vertex_count)
        {
            return Err(VertexDataError::IndexOutOfBounds {
                index: u32::from(index),
                vertex_count,
            }
            .into());
        }
        let index_count = indices.as_ref().map_or(vertex_count, |i| i.len() as u32);
        let primitive_count = topology.primitive_count(index_count);

        if calculate_tangents {
            match compute_tangents(&vertex_format, topology, &vertices, indices.as_deref()) {
                Some(tangents) => {
                    vertices.extend_from_slice(&tangents);
                    vertex_format = vertex_format.with_block(TANGENT_BLOCK, vertices.len())?;
                }
                None => log::debug!(
                    "Skipping tangent synthesis for '{}' ({topology:?})",
                    vertex_format.format()
                ),
            }
        }

        let vertex_buffer =
            device.create_buffer(BufferTarget::Vertex, bytemuck::cast_slice(vertices.as_slice()));
        let index_buffer = indices
            .as_ref()
            .map(|i| device.create_buffer(BufferTarget::Index, bytemuck::cast_slice(i.as_slice())));

        Ok(Self {
            device,
            vertex_format,
            vertices,
            indices,
            topology,
            vertex_count,
            index_count,
            primitive_count,
            vertex_buffer,
            index_buffer,
        })
    }

    #[inline]
    #[must_use]
    pub fn vertex_format(&self) -> &VertexFormat {
        &self.vertex_format
    }

    /// Vertex data as uploaded, including any synthesized tangents.
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    #[inline]
    #[must_use]
    pub fn indices(&self) -> Option<&[u16]> {
        self.indices.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Number of indices, or the vertex count for non-indexed geometry.
    #[inline]
    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    #[inline]
    #[must_use]
    pub fn primitive_count(&self) -> u32 {
        self.primitive_count
    }

    #[must_use]
    pub fn has_tangents(&self) -> bool {
        self.vertex_format.find(AttributeRole::Tangent).is_some()
    }

    #[inline]
    #[must_use]
    pub fn vertex_buffer(&self) -> BufferId {
        self.vertex_buffer
    }

    #[inline]
    #[must_use]
    pub fn index_buffer(&self) -> Option<BufferId> {
        self.index_buffer
    }

    /// Reads `components` floats of `role` for one vertex.
    #[must_use]
    pub fn read(&self, role: AttributeRole, vertex: usize) -> Option<&[f32]> {
        let attr = self.vertex_format.find(role)?;
        let start = attr.float_index(vertex);
        self.vertices.get(start..start + attr.components as usize)
    }

    /// Draws the geometry with `shader`.
    ///
    /// Every vertex slot up to the device maximum is disabled first. Each
    /// shader attribute is then wired to the first geometry attribute with
    /// the same role; shader attributes without a match stay disabled.
    pub fn draw(&self, shader: &ShaderProgram) {
        let device = &self.device;
        shader.apply();

        device.bind_buffer(BufferTarget::Vertex, Some(self.vertex_buffer));
        device.bind_buffer(BufferTarget::Index, self.index_buffer);

        for slot in 0..device.max_vertex_attribs() {
            device.disable_vertex_attrib(slot);
        }

        let attributes = self.vertex_format.attributes();
        for input in shader.attributes() {
            let Some(slot) = input.location else {
                continue;
            };
            if let Some(attr) = attributes.iter().find(|a| a.role == input.role) {
                device.enable_vertex_attrib(slot);
                device.vertex_attrib_pointer(slot, attr.components, attr.stride, attr.offset);
            }
        }

        if self.index_buffer.is_some() {
            device.draw_elements(self.topology, self.index_count, 0);
        } else {
            device.draw_arrays(self.topology, 0, self.index_count);
        }
    }
}

impl fmt::Debug for GeometryBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeometryBuffer")
            .field("format", &self.vertex_format.format())
            .field("topology", &self.topology)
            .field("vertex_count", &self.vertex_count)
            .field("index_count", &self.index_count)
            .field("primitive_count", &self.primitive_count)
            .field("vertex_buffer", &self.vertex_buffer)
            .field("index_buffer", &self.index_buffer)
            .finish_non_exhaustive()
    }
}

impl Drop for GeometryBuffer {
    fn drop(&mut self) {
        self.device.delete_buffer(self.vertex_buffer);
        if let Some(index_buffer) = self.index_buffer {
            self.device.delete_buffer(index_buffer);
        }
    }
}

fn narrow_indices(indices: &[u32]) -> Result<Vec<u16>> {
    indices
        .iter()
        .map(|&index| {
            u16::try_from(index)
                .map_err(|_| Error::from(VertexDataError::IndexOutOfRange { index }))
        })
        .collect()
}

/// Computes one tangent per vertex, as a flat `x, y, z` stream.
///
/// Requires triangle topology, a 3-component position and a 2-component
/// texture coordinate; returns `None` otherwise. Each triangle's tangent
/// solves `[Δuv1; Δuv2] · T = [q1; q2]` and is added, unnormalized, to its
/// three vertices; the sums are normalized at the end. Triangles with a zero
/// UV determinant or out-of-range indices contribute nothing, so a vertex
/// touched only by such triangles keeps a zero tangent.
#[must_use]
pub fn compute_tangents(
    format: &VertexFormat,
    topology: Topology,
    vertices: &[f32],
    indices: Option<&[u16]>,
) -> Option<Vec<f32>> {
    let pos_attr = format.find(AttributeRole::Position)?;
    let tex_attr = format.find(AttributeRole::TexCoord)?;
    if topology != Topology::Triangles || pos_attr.components != 3 || tex_attr.components != 2 {
        return None;
    }

    let vertex_count = format.vertex_count();
    let mut tangents = vec![Vec3::ZERO; vertex_count];

    let get_pos = |i: usize| {
        let start = pos_attr.float_index(i);
        Vec3::from_slice(&vertices[start..start + 3])
    };
    let get_uv = |i: usize| {
        let start = tex_attr.float_index(i);
        Vec2::from_slice(&vertices[start..start + 2])
    };

    let mut accumulate_triangle = |i0: usize, i1: usize, i2: usize| {
        if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
            return;
        }
        let p0 = get_pos(i0);
        let q1 = get_pos(i1) - p0;
        let q2 = get_pos(i2) - p0;

        let uv0 = get_uv(i0);
        let st1 = get_uv(i1) - uv0;
        let st2 = get_uv(i2) - uv0;

        let denom = st1.x * st2.y - st2.x * st1.y;
        if denom == 0.0 {
            return;
        }
        let tangent = (q1 * st2.y - q2 * st1.y) / denom;

        tangents[i0] += tangent;
        tangents[i1] += tangent;
        tangents[i2] += tangent;
    };

    match indices {
        Some(indices) => {
            for tri in indices.chunks_exact(3) {
                accumulate_triangle(tri[0] as usize, tri[1] as usize, tri[2] as usize);
            }
        }
        None => {
            for i in (0..vertex_count).step_by(3) {
                if i + 2 < vertex_count {
                    accumulate_triangle(i, i + 1, i + 2);
                }
            }
        }
    }

    Some(
        tangents
            .into_iter()
            .flat_map(|t| t.normalize_or_zero().to_array())
            .collect(),
    )
}
