use glam::{Mat4, Vec3};
use slotmap::SlotMap;

use crate::assets::ResourceManager;
use crate::scene::{Component, ComponentKey, FrameContext, Timing};

/// Owns the components of a scene and drives their frame loop.
///
/// Each frame: finished loads are realized and newly ready components get
/// their `on_load`, loaded and enabled components are updated, loaded and
/// visible components are drawn, then the clock advances.
pub struct Scene {
    components: SlotMap<ComponentKey, Box<dyn Component>>,
    resources: ResourceManager,
    timing: Timing,
}

impl Scene {
    #[must_use]
    pub fn new(resources: ResourceManager) -> Self {
        Self {
            components: SlotMap::with_key(),
            resources,
            timing: Timing::new(),
        }
    }

    /// Adds a component and registers its resources.
    ///
    /// A component whose resources are all resolved already is loaded here.
    pub fn add(&mut self, component: impl Component + 'static) -> ComponentKey {
        let key = self.components.insert(Box::new(component));
        let pending = match self.components.get_mut(key) {
            Some(component) => self.resources.add(key, component.resources_mut()),
            None => 0,
        };
        if pending == 0 {
            self.mark_loaded(key);
        }
        key
    }

    /// Removes a component. Loads it was waiting for still complete.
    pub fn remove(&mut self, key: ComponentKey) -> Option<Box<dyn Component>> {
        self.components.remove(key)
    }

    #[must_use]
    pub fn get(&self, key: ComponentKey) -> Option<&dyn Component> {
        self.components.get(key).map(AsRef::as_ref)
    }

    pub fn get_mut(&mut self, key: ComponentKey) -> Option<&mut (dyn Component + 'static)> {
        self.components.get_mut(key).map(AsMut::as_mut)
    }

    #[must_use]
    pub fn is_loaded(&self, key: ComponentKey) -> bool {
        self.components.get(key).is_some_and(|c| c.state().loaded)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    #[inline]
    pub fn resources_mut(&mut self) -> &mut ResourceManager {
        &mut self.resources
    }

    #[inline]
    #[must_use]
    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Realizes finished loads. Returns the components that became loaded.
    pub fn poll(&mut self) -> Vec<ComponentKey> {
        let ready = self.resources.poll();
        self.finish_loading(ready)
    }

    /// Like [`poll`](Self::poll), but waits for every dispatched load.
    pub fn wait_for_resources(&mut self, timeout: std::time::Duration) -> Vec<ComponentKey> {
        let ready = self.resources.wait_idle(timeout);
        self.finish_loading(ready)
    }

    fn finish_loading(&mut self, ready: Vec<ComponentKey>) -> Vec<ComponentKey> {
        ready.into_iter().filter(|&key| self.mark_loaded(key)).collect()
    }

    fn mark_loaded(&mut self, key: ComponentKey) -> bool {
        let Some(component) = self.components.get_mut(key) else {
            log::debug!("Component {key:?} finished loading after removal");
            return false;
        };
        let state = component.state_mut();
        if state.loaded {
            return false;
        }
        state.loaded = true;
        component.on_load();
        true
    }

    pub fn update(&mut self, frame: &FrameContext) {
        for component in self.components.values_mut() {
            let state = component.state();
            if state.loaded && state.enabled {
                component.update(frame);
            }
        }
    }

    pub fn draw(&mut self, frame: &FrameContext) {
        for component in self.components.values_mut() {
            let state = component.state();
            if state.loaded && state.visible {
                component.draw(frame);
            }
        }
    }

    /// Runs one frame and returns the context it used.
    pub fn frame(&mut self, view: Mat4, projection: Mat4, camera_position: Vec3) -> FrameContext {
        self.poll();
        if let Some(fps) = self.timing.tick() {
            log::trace!("{fps:.1} fps");
        }
        let frame = FrameContext::new(view, projection, camera_position).with_timing(&self.timing);
        self.update(&frame);
        self.draw(&frame);
        frame
    }
}
