//! Error Types
//!
//! This module defines the error types used throughout the toolkit.
//!
//! # Overview
//!
//! The main error type [`Error`] groups failures by the subsystem that raises them:
//! - [`VertexFormatError`]: malformed layout grammar (synchronous, fatal to that format)
//! - [`VertexDataError`]: raw vertex/index data that does not fit the declared layout
//! - [`UnknownUniformError`]: a shader uniform lookup that found nothing
//! - [`AssetError`]: I/O, decoding and GPU realization failures inside the loading pipeline
//!
//! Asset errors never travel through the resource counting protocol. Loaders log
//! them and resolve the resource without a payload.
//!
//! # Usage
//!
//! ```rust,ignore
//! use gloom::errors::Result;
//! use gloom::resources::VertexFormat;
//!
//! fn parse() -> Result<VertexFormat> {
//!     Ok(VertexFormat::new("p3|t2", 10)?)
//! }
//! ```

use thiserror::Error;

/// The main error type for the toolkit.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    VertexFormat(#[from] VertexFormatError),

    #[error(transparent)]
    VertexData(#[from] VertexDataError),

    #[error(transparent)]
    UnknownUniform(#[from] UnknownUniformError),

    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// Malformed vertex layout grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VertexFormatError {
    /// The layout (or one of its blocks) is empty or not made of `<code><count>` tokens.
    #[error("Vertex format string '{format}' is invalid at position {position}")]
    Syntax { format: String, position: usize },

    /// A token names a role code that is not registered.
    #[error("Vertex format string contains attribute with unknown role ({token})")]
    UnknownRole { token: String },

    /// A token's component count lies outside `1..=16`.
    #[error("Vertex format string contains attribute with invalid size ({token})")]
    InvalidSize { token: String },
}

/// Vertex or index data that does not match its declared layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VertexDataError {
    #[error(
        "Length of vertex data ({len} floats) is not a multiple of the vertex size ({elements_per_vertex} floats)"
    )]
    LengthMismatch {
        len: usize,
        elements_per_vertex: usize,
    },

    #[error("Index {index} exceeds the 16-bit index range")]
    IndexOutOfRange { index: u32 },

    #[error("Index {index} refers past the last of {vertex_count} vertices")]
    IndexOutOfBounds { index: u32, vertex_count: u32 },

    /// The buffer's byte size does not fit the 32-bit offsets of the layout.
    #[error("Vertex data of {len} floats is too large to address")]
    TooLarge { len: usize },
}

/// A uniform name that the shader program does not declare.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown uniform variable \"{name}\"")]
pub struct UnknownUniformError {
    pub name: String,
}

/// Failures raised while fetching, decoding or realizing an asset.
#[derive(Error, Debug)]
pub enum AssetError {
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport or status error.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Undecodable bytes (image, text or model description).
    #[error("Format error: {0}")]
    Format(String),

    /// Decoded data that is structurally inconsistent.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Shader compilation failed.
    #[error("Could not compile shader ({stage}) {path}:\n{log}")]
    Compile {
        path: String,
        stage: &'static str,
        log: String,
    },

    /// Shader program linking failed.
    #[error("Could not link shader program {path}:\n{log}")]
    Link { path: String, log: String },

    /// Async task join error.
    #[error("Task join error: {0}")]
    TaskJoin(String),

    /// Feature not enabled.
    #[error("Feature not enabled: {0}")]
    FeatureNotEnabled(String),
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Asset(AssetError::Io(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Asset(AssetError::Format(err.to_string()))
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Asset(AssetError::Format(err.to_string()))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Asset(AssetError::TaskJoin(err.to_string()))
    }
}

/// Alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
