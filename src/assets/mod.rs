//! Asset loading
//!
//! - [`io`]: byte readers for local files and HTTP
//! - [`loaders`]: per-extension loaders and the single-shot [`LoadRequest`]
//! - [`resource`]: shared [`Resource`] entries and component [`ResourceSlots`]
//! - [`manager`]: the [`ResourceManager`] that deduplicates resources and
//!   reports each component ready exactly once

pub mod io;
pub mod loaders;
pub mod manager;
pub mod resource;

pub use io::{AssetReader, AssetReaderVariant, FileAssetReader};
#[cfg(feature = "http")]
pub use io::HttpAssetReader;
pub use loaders::{
    CubeMapLoader, DecodedAsset, ImageLoader, LoadRequest, ModelLoader, ResourceLoader,
    ShaderLoader,
};
pub use manager::{ResourceManager, file_extension};
pub use resource::{Resource, ResourceData, ResourceRef, ResourceSlots};
