//! Resource Manager
//!
//! Tracks the deduplicated resource registry, the per-component pending
//! counts and the extension → loader table.
//!
//! A component moves `Unregistered → Pending(n) → Loaded`, where `n` counts
//! the distinct resources it still waits for. Counts only ever decrease, and
//! a component is reported ready exactly once, when its count reaches zero.
//!
//! Loads complete in two phases: loaders fetch and decode off-thread and send
//! a [`DecodedAsset`] through a channel; [`ResourceManager::poll`] runs on the
//! render thread, creates the GPU objects and calls
//! [`ResourceManager::resource_loaded`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use rustc_hash::{FxHashMap, FxHashSet};

use super::loaders::{
    Completion, CubeMapLoader, DecodedAsset, ImageLoader, LoadRequest, ModelLoader,
    ResourceLoader, ShaderLoader,
};
use super::resource::{ResourceData, ResourceRef, ResourceSlots};
use crate::gpu::DeviceRef;
use crate::resources::{Model, ShaderProgram, Texture};
use crate::scene::ComponentKey;

/// Lowercase text after the final `.` of a file name, or `""`.
#[must_use]
pub fn file_extension(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

pub struct ResourceManager {
    base_url: String,
    device: DeviceRef,

    resources: FxHashMap<String, ResourceRef>,
    pending: FxHashMap<ComponentKey, usize>,
    loaders: FxHashMap<String, Arc<dyn ResourceLoader>>,
    /// Resources dispatched while no loader matched their extension.
    unresolved: FxHashSet<String>,

    sender: flume::Sender<Completion>,
    receiver: flume::Receiver<Completion>,
    in_flight: usize,
}

impl ResourceManager {
    /// Creates a manager that prefixes every file name with `base_url`, with
    /// the built-in loaders installed.
    pub fn new(base_url: impl Into<String>, device: DeviceRef) -> Self {
        let (sender, receiver) = flume::unbounded();
        let mut manager = Self {
            base_url: base_url.into(),
            device,
            resources: FxHashMap::default(),
            pending: FxHashMap::default(),
            loaders: FxHashMap::default(),
            unresolved: FxHashSet::default(),
            sender,
            receiver,
            in_flight: 0,
        };

        manager.add_loader(&["glsl"], ShaderLoader);
        manager.add_loader(&["jpg", "jpeg", "png", "gif"], ImageLoader::default());
        manager.add_loader(&["jpg|cube", "jpeg|cube", "png|cube", "gif|cube"], CubeMapLoader);
        manager.add_loader(&["json"], ModelLoader);
        manager
    }

    /// Maps `extensions` to `loader`, replacing earlier registrations.
    ///
    /// Resources already dispatched without a loader stay unresolved.
    pub fn add_loader(&mut self, extensions: &[&str], loader: impl ResourceLoader + 'static) {
        let loader: Arc<dyn ResourceLoader> = Arc::new(loader);
        for ext in extensions {
            self.loaders.insert(ext.to_lowercase(), loader.clone());
        }
    }

    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &DeviceRef {
        &self.device
    }

    /// Registers a component's resources and dispatches the new ones.
    ///
    /// Each placeholder is replaced with the canonical resource for its file
    /// name. Returns the number of distinct resources the component waits
    /// for; zero means it is ready now and will not be reported by
    /// [`poll`](Self::poll).
    ///
    /// Adding the same component again only counts resources it did not
    /// already own.
    pub fn add(&mut self, component: ComponentKey, slots: &mut ResourceSlots) -> usize {
        let mut count = 0;
        let mut dispatch = Vec::new();

        for slot in slots.iter_mut() {
            let canonical = match self.resources.get(slot.file_name()) {
                Some(existing) => {
                    *slot = existing.clone();
                    existing.clone()
                }
                None => {
                    self.resources.insert(slot.file_name().to_string(), slot.clone());
                    if !slot.is_resolved() {
                        dispatch.push(slot.clone());
                    }
                    slot.clone()
                }
            };
            if canonical.add_owner(component) && !canonical.is_resolved() {
                count += 1;
            }
        }

        if count > 0 {
            *self.pending.entry(component).or_insert(0) += count;
            log::debug!("Component {component:?} waits for {count} resources");
        }

        for resource in dispatch {
            self.dispatch(&resource);
        }

        self.pending_count(component)
    }

    fn dispatch(&mut self, resource: &ResourceRef) {
        let file_name = resource.file_name();
        let ext = file_extension(file_name);
        match self.loaders.get(&ext) {
            Some(loader) => {
                let path = format!("{}{file_name}", self.base_url);
                log::debug!("Loading {path}");
                self.in_flight += 1;
                loader.load(&path, LoadRequest::new(path.clone(), self.sender.clone()));
            }
            None => {
                log::warn!("No loader for extension '{ext}', {file_name} will not be loaded");
                self.unresolved.insert(file_name.to_string());
            }
        }
    }

    /// Stores a loaded payload and updates every owner's pending count.
    ///
    /// `path` may carry the base URL prefix. Returns the components that
    /// became ready. A second result for the same resource is ignored.
    pub fn resource_loaded(&mut self, path: &str, data: Option<ResourceData>) -> Vec<ComponentKey> {
        let file_name = path.strip_prefix(self.base_url.as_str()).unwrap_or(path);
        let Some(resource) = self.resources.get(file_name) else {
            log::warn!("Loaded resource {file_name} is not registered");
            return Vec::new();
        };
        if data.is_none() {
            log::warn!("Resource {file_name} resolved without data");
        }
        if !resource.resolve(data) {
            log::warn!("Resource {file_name} was already loaded, ignoring");
            return Vec::new();
        }
        log::info!("Loaded resource {file_name}");

        let mut ready = Vec::new();
        for owner in resource.owners() {
            let Some(count) = self.pending.get_mut(&owner) else {
                continue;
            };
            *count -= 1;
            log::debug!("Component {owner:?}: {count} resources pending");
            if *count == 0 {
                self.pending.remove(&owner);
                ready.push(owner);
            }
        }
        ready
    }

    /// Realizes every finished load. Returns the components that became ready.
    pub fn poll(&mut self) -> Vec<ComponentKey> {
        let mut ready = Vec::new();
        while let Ok(completion) = self.receiver.try_recv() {
            ready.extend(self.handle(completion));
        }
        ready
    }

    /// Blocks until no dispatched load is outstanding or `timeout` expires,
    /// realizing completions as they arrive.
    pub fn wait_idle(&mut self, timeout: Duration) -> Vec<ComponentKey> {
        let deadline = Instant::now() + timeout;
        let mut ready = self.poll();
        while self.in_flight > 0 {
            match self.receiver.recv_deadline(deadline) {
                Ok(completion) => ready.extend(self.handle(completion)),
                Err(_) => {
                    log::warn!("Timed out with {} loads in flight", self.in_flight);
                    break;
                }
            }
        }
        ready
    }

    fn handle(&mut self, completion: Completion) -> Vec<ComponentKey> {
        self.in_flight = self.in_flight.saturating_sub(1);
        let Completion { path, payload } = completion;
        let data = payload.and_then(|asset| self.realize(&path, asset));
        self.resource_loaded(&path, data)
    }

    fn realize(&self, path: &str, asset: DecodedAsset) -> Option<ResourceData> {
        let device = self.device.clone();
        match asset {
            DecodedAsset::ShaderSource(source) => match ShaderProgram::compile(device, path, &source) {
                Ok(program) => Some(ResourceData::Shader(Arc::new(program))),
                Err(e) => {
                    log::error!("{e}");
                    None
                }
            },
            DecodedAsset::Image(image) => {
                Some(ResourceData::Texture(Arc::new(Texture::new_2d(device, &image))))
            }
            DecodedAsset::CubeMap(image) => {
                Some(ResourceData::Texture(Arc::new(Texture::new_cube(device, &image))))
            }
            DecodedAsset::Model(description) => match Model::from_description(&device, &description) {
                Ok(model) => Some(ResourceData::Model(Arc::new(model))),
                Err(e) => {
                    log::error!("Could not build model {path}: {e}");
                    None
                }
            },
            DecodedAsset::Bytes(bytes) => Some(ResourceData::Bytes(bytes.into())),
            DecodedAsset::Ready(data) => Some(data),
        }
    }

    /// Distinct resources `component` still waits for.
    #[must_use]
    pub fn pending_count(&self, component: ComponentKey) -> usize {
        self.pending.get(&component).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_pending(&self, component: ComponentKey) -> bool {
        self.pending.contains_key(&component)
    }

    /// Number of components still waiting.
    #[must_use]
    pub fn pending_components(&self) -> usize {
        self.pending.len()
    }

    /// Loads dispatched whose result has not been realized yet.
    #[inline]
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Canonical resource for `file_name`.
    #[must_use]
    pub fn resource(&self, file_name: &str) -> Option<&ResourceRef> {
        self.resources.get(file_name)
    }

    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// File names that no loader was registered for when they were
    /// dispatched. Their owners never become ready.
    #[must_use]
    pub fn unresolved_resources(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.unresolved.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercase_text_after_last_dot() {
        assert_eq!(file_extension("a.GLSL"), "glsl");
        assert_eq!(file_extension("dir.v2/model.json"), "json");
        assert_eq!(file_extension("sky_<CubeMap>.JPG|cube"), "jpg|cube");
        assert_eq!(file_extension("README"), "");
    }
}
