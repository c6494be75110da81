//! Scene
//!
//! - Component: drawable, updatable member with declared resources
//! - Scene: component container and frame loop
//! - FrameContext: per-frame camera and clock state
//! - Timing: frame clock with fps measurement

pub mod component;
pub mod frame;
pub mod scene;
pub mod timing;

pub use component::{Component, ComponentKey, ComponentState};
pub use frame::{FrameContext, apply_standard_uniforms};
pub use scene::Scene;
pub use timing::{FPS_WINDOW, Timing};
