#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! # Gloom
//!
//! A small real-time 3D toolkit on top of an immediate-mode graphics API.
//!
//! - [`assets`]: asynchronous multi-resource loading, with each component
//!   reported ready exactly once
//! - [`resources`]: vertex layout grammar, geometry buffers with tangent
//!   synthesis, reflected shader programs, models and textures
//! - [`scene`]: components and the per-frame update/draw loop
//! - [`gpu`]: the graphics device boundary and a headless backend

pub mod assets;
pub mod errors;
pub mod gpu;
pub mod resources;
pub mod scene;

pub use assets::{Resource, ResourceData, ResourceManager, ResourceRef, ResourceSlots};
pub use errors::{Error, Result};
pub use gpu::{DeviceRef, GraphicsDevice, HeadlessDevice, Topology};
pub use resources::{
    AttributeRole, GeometryBuffer, Image, Model, ModelDescription, ShaderProgram, Texture,
    VertexFormat,
};
pub use scene::{Component, ComponentKey, ComponentState, FrameContext, Scene};
