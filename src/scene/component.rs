use slotmap::new_key_type;

use crate::assets::ResourceSlots;
use crate::scene::FrameContext;

new_key_type! {
    /// Identifies a component inside a [`Scene`](super::Scene).
    pub struct ComponentKey;
}

/// Per-frame flags of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentState {
    /// Set once every declared resource has resolved.
    pub loaded: bool,
    /// Drawn each frame while loaded.
    pub visible: bool,
    /// Updated each frame while loaded.
    pub enabled: bool,
}

impl Default for ComponentState {
    fn default() -> Self {
        Self {
            loaded: false,
            visible: true,
            enabled: true,
        }
    }
}

/// Drawable, updatable scene member with declared resources.
///
/// `update` and `draw` are only called once the component is loaded, and
/// respectively enabled or visible.
pub trait Component {
    fn state(&self) -> &ComponentState;
    fn state_mut(&mut self) -> &mut ComponentState;

    /// Resources this component needs before it can be drawn.
    fn resources_mut(&mut self) -> &mut ResourceSlots;

    /// Called exactly once, after every declared resource has resolved.
    fn on_load(&mut self) {
        log::debug!("Component loaded");
    }

    fn update(&mut self, _frame: &FrameContext) {}

    fn draw(&mut self, _frame: &FrameContext) {}
}
