use glam::{Mat4, Vec3};

use crate::resources::ShaderProgram;
use crate::scene::Timing;

/// Camera and clock state shared by every component during one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    pub view: Mat4,
    pub projection: Mat4,
    pub camera_position: Vec3,
    /// Seconds since the scene started.
    pub elapsed: f32,
    /// Seconds since the previous frame.
    pub delta: f32,
    pub frame: u64,
}

impl Default for FrameContext {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO)
    }
}

impl FrameContext {
    #[must_use]
    pub fn new(view: Mat4, projection: Mat4, camera_position: Vec3) -> Self {
        Self {
            view,
            projection,
            camera_position,
            elapsed: 0.0,
            delta: 0.0,
            frame: 0,
        }
    }

    #[must_use]
    pub fn with_timing(mut self, timing: &Timing) -> Self {
        self.elapsed = timing.elapsed.as_secs_f32();
        self.delta = timing.dt_seconds();
        self.frame = timing.frame_count;
        self
    }
}

/// Sets the transform uniforms a shader may declare: `World`, `View`,
/// `Projection`, `WorldViewProjection` and `CameraPosition`. Uniforms the
/// shader lacks are skipped.
pub fn apply_standard_uniforms(shader: &ShaderProgram, world: Mat4, frame: &FrameContext) {
    shader.set_uniform_if_present("World", world);
    shader.set_uniform_if_present("View", frame.view);
    shader.set_uniform_if_present("Projection", frame.projection);
    shader.set_uniform_if_present("WorldViewProjection", frame.projection * frame.view * world);
    shader.set_uniform_if_present("CameraPosition", frame.camera_position);
}
