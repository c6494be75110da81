//! Resources and resource slots
//!
//! A [`Resource`] is the shared, deduplicated entry for one file. Its payload
//! is set exactly once, by the loader that fetched it, and never reset.
//!
//! Components declare what they need through [`ResourceSlots`]: named slots
//! holding placeholder resources. When a component is registered the
//! [`ResourceManager`](super::ResourceManager) replaces each placeholder with
//! the canonical instance for its file name.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::resources::{Model, ShaderProgram, Texture};
use crate::scene::ComponentKey;

/// Shared reference to a resource.
pub type ResourceRef = Arc<Resource>;

/// Realized payload of a resource.
#[derive(Clone)]
pub enum ResourceData {
    Shader(Arc<ShaderProgram>),
    Texture(Arc<Texture>),
    Model(Arc<Model>),
    Bytes(Arc<[u8]>),
    /// Payload produced by a user-registered loader.
    Custom(Arc<dyn Any + Send + Sync>),
}

impl ResourceData {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Shader(_) => "shader",
            Self::Texture(_) => "texture",
            Self::Model(_) => "model",
            Self::Bytes(_) => "bytes",
            Self::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for ResourceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shader(shader) => f.debug_tuple("Shader").field(shader).finish(),
            Self::Texture(texture) => f.debug_tuple("Texture").field(texture).finish(),
            Self::Model(model) => f.debug_tuple("Model").field(model).finish(),
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One named asset, shared by every component that references its file.
pub struct Resource {
    file_name: String,
    data: OnceLock<Option<ResourceData>>,
    owners: Mutex<SmallVec<[ComponentKey; 4]>>,
}

impl Resource {
    #[must_use]
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            data: OnceLock::new(),
            owners: Mutex::new(SmallVec::new()),
        }
    }

    #[inline]
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Whether the loader has reported, with or without a payload.
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.data.get().is_some()
    }

    /// The payload, once the loader has produced one.
    #[must_use]
    pub fn data(&self) -> Option<&ResourceData> {
        self.data.get().and_then(Option::as_ref)
    }

    /// Stores the loader's result. Returns `false` if a result was already stored.
    pub fn resolve(&self, data: Option<ResourceData>) -> bool {
        self.data.set(data).is_ok()
    }

    #[must_use]
    pub fn shader(&self) -> Option<&Arc<ShaderProgram>> {
        match self.data()? {
            ResourceData::Shader(shader) => Some(shader),
            _ => None,
        }
    }

    #[must_use]
    pub fn texture(&self) -> Option<&Arc<Texture>> {
        match self.data()? {
            ResourceData::Texture(texture) => Some(texture),
            _ => None,
        }
    }

    #[must_use]
    pub fn model(&self) -> Option<&Arc<Model>> {
        match self.data()? {
            ResourceData::Model(model) => Some(model),
            _ => None,
        }
    }

    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        match self.data()? {
            ResourceData::Bytes(bytes) => Some(&bytes[..]),
            _ => None,
        }
    }

    /// Downcasts a [`ResourceData::Custom`] payload.
    #[must_use]
    pub fn custom<T: Any + Send + Sync>(&self) -> Option<&T> {
        match self.data()? {
            ResourceData::Custom(value) => value.downcast_ref(),
            _ => None,
        }
    }

    /// Components that reference this resource, in registration order.
    #[must_use]
    pub fn owners(&self) -> SmallVec<[ComponentKey; 4]> {
        self.owners.lock().clone()
    }

    /// Returns `false` when `owner` already held this resource.
    pub(crate) fn add_owner(&self, owner: ComponentKey) -> bool {
        let mut owners = self.owners.lock();
        if owners.contains(&owner) {
            return false;
        }
        owners.push(owner);
        true
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("file_name", &self.file_name)
            .field("resolved", &self.is_resolved())
            .field("data", &self.data().map(ResourceData::kind))
            .finish_non_exhaustive()
    }
}

/// Named resource slots declared by a component.
#[derive(Debug, Default)]
pub struct ResourceSlots {
    slots: Vec<(String, ResourceRef)>,
}

impl ResourceSlots {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`declare`](Self::declare).
    #[must_use]
    pub fn with(mut self, slot: &str, file_name: &str) -> Self {
        self.declare(slot, file_name);
        self
    }

    /// Declares (or redeclares) `slot` as a placeholder for `file_name`.
    pub fn declare(&mut self, slot: &str, file_name: &str) -> ResourceRef {
        let resource = Arc::new(Resource::new(file_name));
        match self.slots.iter_mut().find(|(name, _)| name.as_str() == slot) {
            Some((_, existing)) => *existing = resource.clone(),
            None => self.slots.push((slot.to_string(), resource.clone())),
        }
        resource
    }

    #[must_use]
    pub fn get(&self, slot: &str) -> Option<&ResourceRef> {
        self.slots
            .iter()
            .find_map(|(name, resource)| (name.as_str() == slot).then_some(resource))
    }

    #[must_use]
    pub fn shader(&self, slot: &str) -> Option<&Arc<ShaderProgram>> {
        self.get(slot)?.shader()
    }

    #[must_use]
    pub fn texture(&self, slot: &str) -> Option<&Arc<Texture>> {
        self.get(slot)?.texture()
    }

    #[must_use]
    pub fn model(&self, slot: &str) -> Option<&Arc<Model>> {
        self.get(slot)?.model()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResourceRef)> {
        self.slots.iter().map(|(name, resource)| (name.as_str(), resource))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ResourceRef> {
        self.slots.iter_mut().map(|(_, resource)| resource)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether every slot's resource has been resolved.
    #[must_use]
    pub fn all_resolved(&self) -> bool {
        self.slots.iter().all(|(_, resource)| resource.is_resolved())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_set_once() {
        let resource = Resource::new("a.bin");
        assert!(!resource.is_resolved());
        assert!(resource.resolve(Some(ResourceData::Bytes(Arc::from(&b"abc"[..])))));
        assert!(!resource.resolve(None));
        assert_eq!(resource.bytes(), Some(&b"abc"[..]));
    }

    #[test]
    fn redeclaring_a_slot_replaces_it() {
        let mut slots = ResourceSlots::new().with("effect", "a.glsl");
        slots.declare("effect", "b.glsl");
        assert_eq!(slots.len(), 1);
        assert_eq!(slots.get("effect").unwrap().file_name(), "b.glsl");
    }
}
