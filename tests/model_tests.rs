//! Model Tests
//!
//! Tests for:
//! - Splitting vertices whose face corners disagree on texture coordinates
//! - Building geometries from a parsed model description
//! - Rejecting inconsistent vertex arrays and indices

use std::sync::Arc;

use gloom::errors::{AssetError, Error, VertexDataError};
use gloom::gpu::{DeviceRef, HeadlessDevice};
use gloom::resources::{
    AttributeRole, MeshDescription, Model, ModelDescription, ModelObject, resolve_tex_coords,
};

fn headless() -> (Arc<HeadlessDevice>, DeviceRef) {
    let device = Arc::new(HeadlessDevice::new());
    let device_ref: DeviceRef = device.clone();
    (device, device_ref)
}

/// Two triangles sharing the edge 1-2 of a unit quad.
#[rustfmt::skip]
const QUAD_POSITIONS: [f32; 12] = [
    0.0, 0.0, 0.0,
    1.0, 0.0, 0.0,
    1.0, 1.0, 0.0,
    0.0, 1.0, 0.0,
];
const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

// ============================================================================
// Texture Coordinate Splitting
// ============================================================================

#[test]
fn consistent_corners_need_no_split() {
    #[rustfmt::skip]
    let uv = [
        0.0, 0.0,  1.0, 0.0,  1.0, 1.0,
        1.0, 1.0,  0.0, 1.0,  0.0, 0.0,
    ];
    let mesh = resolve_tex_coords(&QUAD_INDICES, &QUAD_POSITIONS, None, &uv).unwrap();

    assert_eq!(mesh.positions, QUAD_POSITIONS);
    assert_eq!(mesh.indices, QUAD_INDICES);
    assert_eq!(mesh.tex_coords, [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
}

#[test]
fn conflicting_corner_duplicates_vertex() {
    let normals = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.5, 0.5, 0.0, 0.0, 1.0];
    // Vertex 2 is seen with (1, 1) first, then with (0.5, 0.5).
    #[rustfmt::skip]
    let uv = [
        0.0, 0.0,  1.0, 0.0,  1.0, 1.0,
        0.5, 0.5,  0.0, 1.0,  0.0, 0.0,
    ];
    let mesh = resolve_tex_coords(&QUAD_INDICES, &QUAD_POSITIONS, Some(&normals), &uv).unwrap();

    assert_eq!(mesh.indices, [0, 1, 2, 4, 3, 0]);
    assert_eq!(mesh.positions.len(), 15);
    assert_eq!(mesh.positions[12..], [1.0, 1.0, 0.0]);
    let normals = mesh.normals.unwrap();
    assert_eq!(normals.len(), 15);
    assert_eq!(normals[12..], [0.0, 0.5, 0.5]);
    assert_eq!(mesh.tex_coords[4..6], [1.0, 1.0]);
    assert_eq!(mesh.tex_coords[8..], [0.5, 0.5]);
}

#[test]
fn repeated_split_uv_reuses_copy() {
    let positions = [0.0; 9];
    // Vertex 0 alternates between two UVs across three triangles.
    let indices = [0, 1, 2, 0, 1, 2, 0, 1, 2];
    #[rustfmt::skip]
    let uv = [
        0.0, 0.0,  1.0, 0.0,  0.0, 1.0,
        0.5, 0.0,  1.0, 0.0,  0.0, 1.0,
        0.5, 0.0,  1.0, 0.0,  0.0, 1.0,
    ];
    let mesh = resolve_tex_coords(&indices, &positions, None, &uv).unwrap();

    assert_eq!(mesh.positions.len(), 12);
    assert_eq!(mesh.indices, [0, 1, 2, 3, 1, 2, 3, 1, 2]);
}

#[test]
fn near_equal_uvs_are_not_split() {
    let uv = [0.25, 0.25, 1.0, 0.0, 0.0, 1.0, 0.250_001, 0.25, 1.0, 0.0, 0.0, 1.0];
    let mesh = resolve_tex_coords(&[0, 1, 2, 0, 1, 2], &[0.0; 9], None, &uv).unwrap();
    assert_eq!(mesh.positions.len(), 9);
    assert_eq!(mesh.indices, [0, 1, 2, 0, 1, 2]);
}

#[test]
fn unreferenced_vertices_keep_zero_uv() {
    let uv = [0.5, 0.5, 1.0, 0.0, 0.0, 1.0];
    let mesh = resolve_tex_coords(&[1, 2, 3], &QUAD_POSITIONS, None, &uv).unwrap();
    assert_eq!(mesh.tex_coords[0..2], [0.0, 0.0]);
    assert_eq!(mesh.tex_coords[2..4], [0.5, 0.5]);
}

#[test]
fn out_of_range_index_is_rejected() {
    let uv = [0.0; 6];
    assert!(resolve_tex_coords(&[0, 1, 7], &[0.0; 9], None, &uv).is_err());
}

// ============================================================================
// Model Construction
// ============================================================================

fn quad_object(with_uv: bool) -> ModelObject {
    #[rustfmt::skip]
    let uv = vec![
        0.0, 0.0,  1.0, 0.0,  1.0, 1.0,
        1.0, 1.0,  0.0, 1.0,  0.0, 0.0,
    ];
    ModelObject {
        mesh: MeshDescription {
            v: QUAD_POSITIONS.to_vec(),
            n: Some([0.0, 0.0, 1.0].repeat(4)),
            uv: with_uv.then(|| vec![uv]),
            f: QUAD_INDICES.to_vec(),
        },
    }
}

#[test]
fn model_builds_one_geometry_per_object() {
    let (device, device_ref) = headless();
    let description = ModelDescription {
        objs: vec![quad_object(true), quad_object(false)],
    };
    let model = Model::from_description(&device_ref, &description).unwrap();

    assert_eq!(model.meshes().len(), 2);
    // Vertex and index buffer per mesh.
    assert_eq!(device.live_buffers(), 4);

    let textured = &model.meshes()[0];
    assert_eq!(textured.vertex_format().format(), "p3|n3|t2|tg3");
    assert_eq!(textured.index_count(), 6);
    assert_eq!(textured.primitive_count(), 2);
    let tangent = textured.read(AttributeRole::Tangent, 0).unwrap();
    assert!((tangent[0] - 1.0).abs() < 1e-4);

    let plain = &model.meshes()[1];
    assert_eq!(plain.vertex_format().format(), "p3|n3");
    assert!(!plain.has_tangents());

    drop(model);
    assert_eq!(device.live_buffers(), 0);
}

#[test]
fn model_parses_from_json() {
    let (_, device) = headless();
    let description: ModelDescription = serde_json::from_str(
        r#"{"objs":[{"mesh":{"v":[0,0,0, 1,0,0, 0,1,0],"f":[0,1,2]}}]}"#,
    )
    .unwrap();
    let model = Model::from_description(&device, &description).unwrap();
    assert_eq!(model.meshes()[0].vertex_format().format(), "p3");
    assert_eq!(model.meshes()[0].vertex_count(), 3);
}

// ============================================================================
// Validation
// ============================================================================

fn single_object(mesh: MeshDescription) -> ModelDescription {
    ModelDescription {
        objs: vec![ModelObject { mesh }],
    }
}

#[test]
fn normals_must_match_positions() {
    let (device, device_ref) = headless();
    let description = single_object(MeshDescription {
        v: QUAD_POSITIONS.to_vec(),
        n: Some(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0]),
        uv: None,
        f: vec![0, 1, 3],
    });
    let err = Model::from_description(&device_ref, &description).unwrap_err();
    assert!(matches!(err, Error::Asset(AssetError::InvalidData(_))));
    assert_eq!(device.live_buffers(), 0);
}

#[test]
fn split_path_checks_normals_too() {
    let uv = [0.0; 6];
    let err = resolve_tex_coords(&[0, 1, 2], &[0.0; 9], Some(&[0.0; 3]), &uv).unwrap_err();
    assert!(matches!(err, Error::Asset(AssetError::InvalidData(_))));
}

#[test]
fn partial_vertex_is_rejected() {
    let (_, device) = headless();
    let description = single_object(MeshDescription {
        v: vec![0.0; 10],
        n: None,
        uv: None,
        f: vec![0, 1, 2],
    });
    let err = Model::from_description(&device, &description).unwrap_err();
    assert!(matches!(err, Error::Asset(AssetError::InvalidData(_))));
}

#[test]
fn untextured_index_past_last_vertex_is_rejected() {
    let (device, device_ref) = headless();
    let description = single_object(MeshDescription {
        v: vec![0.0; 9],
        n: None,
        uv: None,
        f: vec![0, 1, 3],
    });
    let err = Model::from_description(&device_ref, &description).unwrap_err();
    assert!(matches!(
        err,
        Error::VertexData(VertexDataError::IndexOutOfBounds { index: 3, vertex_count: 3 })
    ));
    assert_eq!(device.live_buffers(), 0);
}
