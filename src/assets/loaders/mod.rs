//! Resource loaders
//!
//! A [`ResourceLoader`] receives a fully qualified path and a single-shot
//! [`LoadRequest`]. It fetches and decodes on the shared asset runtime and
//! completes the request with a CPU-side [`DecodedAsset`]; the
//! [`ResourceManager`](super::ResourceManager) turns that into GPU objects on
//! the render thread.
//!
//! Every request reports exactly once: [`LoadRequest::complete`] consumes it,
//! and a request dropped without completing reports an empty payload.

mod cube_map;
mod image;
mod model;
mod shader;

use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::Runtime;

pub use cube_map::{CUBE_FACES, CUBE_MAP_TOKEN, CubeMapLoader};
pub use image::ImageLoader;
pub use model::ModelLoader;
pub use shader::ShaderLoader;

use crate::assets::ResourceData;
use crate::resources::{Image, ModelDescription};

fn asset_runtime() -> Option<&'static Runtime> {
    static RUNTIME: OnceLock<Option<Runtime>> = OnceLock::new();
    RUNTIME
        .get_or_init(|| match Runtime::new() {
            Ok(runtime) => Some(runtime),
            Err(e) => {
                log::error!("Failed to create asset loader runtime: {e}");
                None
            }
        })
        .as_ref()
}

/// Runs `future` on the shared asset runtime.
///
/// If the runtime cannot be created the future is dropped, which completes
/// any [`LoadRequest`] it owns with an empty payload.
pub fn spawn<F>(future: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Some(runtime) = asset_runtime() {
        runtime.spawn(future);
    }
}

/// CPU-side result of a load, realized into [`ResourceData`] on the render thread.
#[derive(Debug)]
pub enum DecodedAsset {
    /// Combined vertex/fragment GLSL source, compiled and linked on realize.
    ShaderSource(String),
    /// Single-layer image, uploaded as a mipmapped 2D texture.
    Image(Image),
    /// Six-layer image, uploaded as a cube map.
    CubeMap(Image),
    Model(ModelDescription),
    Bytes(Vec<u8>),
    /// Payload that needs no realization.
    Ready(ResourceData),
}

/// Message sent from a finished load to the manager.
#[derive(Debug)]
pub(crate) struct Completion {
    pub path: String,
    pub payload: Option<DecodedAsset>,
}

/// Single-shot completion handle for one dispatched load.
#[derive(Debug)]
pub struct LoadRequest {
    path: String,
    sender: Option<flume::Sender<Completion>>,
}

impl LoadRequest {
    pub(crate) fn new(path: String, sender: flume::Sender<Completion>) -> Self {
        Self {
            path,
            sender: Some(sender),
        }
    }

    /// Fully qualified path of the resource.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Reports the result. `None` resolves the resource without a payload.
    pub fn complete(mut self, payload: Option<DecodedAsset>) {
        self.send(payload);
    }

    /// Reports a load error: logs it and resolves without a payload.
    pub fn fail(self, error: &crate::errors::Error) {
        log::error!("Failed to load {}: {error}", self.path);
        self.complete(None);
    }

    fn send(&mut self, payload: Option<DecodedAsset>) {
        if let Some(sender) = self.sender.take() {
            let path = std::mem::take(&mut self.path);
            if sender.send(Completion { path, payload }).is_err() {
                log::debug!("Resource manager is gone, dropping completion");
            }
        }
    }
}

impl Drop for LoadRequest {
    fn drop(&mut self) {
        if self.sender.is_some() {
            log::warn!("Load of {} ended without a result", self.path);
            self.send(None);
        }
    }
}

/// Loader registered for one or more file extensions.
pub trait ResourceLoader: Send + Sync {
    fn load(&self, path: &str, request: LoadRequest);
}

impl<F> ResourceLoader for F
where
    F: Fn(&str, LoadRequest) + Send + Sync,
{
    fn load(&self, path: &str, request: LoadRequest) {
        self(path, request);
    }
}

/// Spawns `task` and completes `request` with its result.
pub(crate) fn spawn_load<F>(request: LoadRequest, task: F)
where
    F: Future<Output = crate::errors::Result<DecodedAsset>> + Send + 'static,
{
    spawn(async move {
        match task.await {
            Ok(asset) => {
                log::debug!("Decoded {}", request.path());
                request.complete(Some(asset));
            }
            Err(e) => request.fail(&e),
        }
    });
}
