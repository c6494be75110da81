//! Models
//!
//! A [`Model`] is an ordered list of [`GeometryBuffer`]s built from an
//! already parsed [`ModelDescription`] (the JSON intermediate form).
//!
//! The description stores texture coordinates per face corner, while a
//! [`GeometryBuffer`] needs them per vertex. [`resolve_tex_coords`] splits
//! every vertex whose corners disagree on their UV.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::errors::{AssetError, Result};
use crate::gpu::{DeviceRef, Topology};
use crate::resources::geometry::GeometryBuffer;
use crate::resources::shader::ShaderProgram;

/// Two texture coordinates closer than this on both axes are considered equal.
pub const TEX_COORD_EPSILON: f32 = 1e-5;

/// Decoded model file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDescription {
    pub objs: Vec<ModelObject>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelObject {
    pub mesh: MeshDescription,
}

/// Flat mesh arrays of one object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshDescription {
    /// Positions, 3 floats per vertex.
    pub v: Vec<f32>,
    /// Normals, 3 floats per vertex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<Vec<f32>>,
    /// UV channels, 2 floats per face corner. Only channel 0 is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv: Option<Vec<Vec<f32>>>,
    /// Triangle indices.
    pub f: Vec<u32>,
}

impl MeshDescription {
    fn tex_coords(&self) -> Option<&[f32]> {
        self.uv.as_ref()?.first().map(Vec::as_slice)
    }
}

/// Positions must be whole `xyz` triples and normals, when present, must
/// match them one to one.
fn check_vertex_arrays(positions: &[f32], normals: Option<&[f32]>) -> Result<()> {
    if positions.len() % 3 != 0 {
        return Err(AssetError::InvalidData(format!(
            "{} position floats do not form whole vertices",
            positions.len()
        ))
        .into());
    }
    if let Some(normals) = normals {
        if normals.len() != positions.len() {
            return Err(AssetError::InvalidData(format!(
                "{} normal floats for {} position floats",
                normals.len(),
                positions.len()
            ))
            .into());
        }
    }
    Ok(())
}

/// Per-vertex output of [`resolve_tex_coords`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedMesh {
    pub positions: Vec<f32>,
    pub normals: Option<Vec<f32>>,
    pub tex_coords: Vec<f32>,
    pub indices: Vec<u32>,
}

/// Converts per-corner texture coordinates into per-vertex ones.
///
/// The first corner seen for a vertex assigns its UV. A later corner with a
/// different UV is redirected to a copy of the vertex (position and normal
/// duplicated) carrying that UV; copies are reused when the same UV shows up
/// again. Vertices no corner references keep a zero UV.
pub fn resolve_tex_coords(
    indices: &[u32],
    positions: &[f32],
    normals: Option<&[f32]>,
    tex_coords: &[f32],
) -> Result<ResolvedMesh> {
    check_vertex_arrays(positions, normals)?;
    if tex_coords.len() < indices.len() * 2 {
        return Err(AssetError::InvalidData(format!(
            "{} texture coordinates for {} face corners",
            tex_coords.len() / 2,
            indices.len()
        ))
        .into());
    }

    let vertex_count = positions.len() / 3;
    let mut out = ResolvedMesh {
        positions: positions.to_vec(),
        normals: normals.map(<[f32]>::to_vec),
        tex_coords: vec![0.0; vertex_count * 2],
        indices: indices.to_vec(),
    };
    // Per source vertex: every UV it has been given, with the vertex carrying it.
    let mut seen: Vec<SmallVec<[([f32; 2], u32); 2]>> = vec![SmallVec::new(); vertex_count];

    for (corner, index) in out.indices.iter_mut().enumerate() {
        let vi = *index as usize;
        if vi >= vertex_count {
            return Err(AssetError::InvalidData(format!(
                "Index {vi} is out of range for {vertex_count} vertices"
            ))
            .into());
        }
        let uv = [tex_coords[corner * 2], tex_coords[corner * 2 + 1]];

        if seen[vi].is_empty() {
            seen[vi].push((uv, *index));
            out.tex_coords[vi * 2..vi * 2 + 2].copy_from_slice(&uv);
            continue;
        }
        if let Some(&(_, target)) = seen[vi].iter().find(|(known, _)| same_uv(*known, uv)) {
            *index = target;
            continue;
        }

        let split = (out.positions.len() / 3) as u32;
        out.positions.extend_from_within(vi * 3..vi * 3 + 3);
        if let Some(normals) = out.normals.as_mut() {
            normals.extend_from_within(vi * 3..vi * 3 + 3);
        }
        out.tex_coords.extend_from_slice(&uv);
        seen[vi].push((uv, split));
        *index = split;
    }

    Ok(out)
}

fn same_uv(a: [f32; 2], b: [f32; 2]) -> bool {
    (a[0] - b[0]).abs() <= TEX_COORD_EPSILON && (a[1] - b[1]).abs() <= TEX_COORD_EPSILON
}

/// Composite drawable made of one geometry per described object.
#[derive(Debug)]
pub struct Model {
    meshes: Vec<GeometryBuffer>,
}

impl Model {
    /// Builds one triangle-list geometry per object, with tangents.
    ///
    /// Fails on positions that are not whole triples, normals that do not
    /// match the positions, and indices past the last vertex.
    ///
    /// Positions, normals and texture coordinates are stored as separate
    /// non-interleaved blocks (`p3|n3|t2`, dropping absent parts).
    pub fn from_description(device: &DeviceRef, description: &ModelDescription) -> Result<Self> {
        let mut meshes = Vec::with_capacity(description.objs.len());

        for object in &description.objs {
            let mesh = &object.mesh;
            let normals = mesh.n.as_deref();
            check_vertex_arrays(&mesh.v, normals)?;
            let resolved = match mesh.tex_coords().filter(|uv| !uv.is_empty()) {
                Some(uv) => resolve_tex_coords(&mesh.f, &mesh.v, normals, uv)?,
                None => ResolvedMesh {
                    positions: mesh.v.clone(),
                    normals: normals.map(<[f32]>::to_vec),
                    tex_coords: Vec::new(),
                    indices: mesh.f.clone(),
                },
            };

            let mut format = String::from("p3");
            let mut vertices = resolved.positions;
            if let Some(normals) = &resolved.normals {
                format.push_str("|n3");
                vertices.extend_from_slice(normals);
            }
            if !resolved.tex_coords.is_empty() {
                format.push_str("|t2");
                vertices.extend_from_slice(&resolved.tex_coords);
            }

            meshes.push(GeometryBuffer::new(
                device.clone(),
                &vertices,
                Some(&resolved.indices),
                &format,
                Topology::Triangles,
                true,
            )?);
        }

        log::debug!("Built model with {} meshes", meshes.len());
        Ok(Self { meshes })
    }

    #[inline]
    #[must_use]
    pub fn meshes(&self) -> &[GeometryBuffer] {
        &self.meshes
    }

    /// Draws every mesh in order.
    pub fn draw(&self, shader: &ShaderProgram) {
        for mesh in &self.meshes {
            mesh.draw(shader);
        }
    }
}
