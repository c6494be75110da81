//! Core resource definitions
//!
//! CPU-side descriptions and the GPU objects built from them:
//! - VertexFormat: layout grammar and attribute placement
//! - GeometryBuffer: vertex/index data bound to shader attributes by role
//! - ShaderProgram: reflected program with dirty-tracked uniforms
//! - Model: geometry list decoded from a model description
//! - Image / Texture: pixel data and the texture object holding it

pub mod geometry;
pub mod image;
pub mod model;
pub mod shader;
pub mod texture;
pub mod vertex_format;

pub use geometry::{GeometryBuffer, TANGENT_BLOCK, Topology, compute_tangents};
pub use image::Image;
pub use model::{MeshDescription, Model, ModelDescription, ModelObject, resolve_tex_coords};
pub use shader::{ShaderAttribute, ShaderProgram, Uniform, UniformSetter, guess_attribute_role};
pub use texture::Texture;
pub use vertex_format::{
    AttributeRole, OwnedVertexBufferDesc, VertexAttribute, VertexBlock, VertexFormat,
};
