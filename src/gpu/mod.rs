//! Graphics Device Boundary
//!
//! The toolkit draws through an immediate-mode graphics API (the WebGL / GLES 2
//! family). Everything it needs from that API is collected in the
//! [`GraphicsDevice`] trait so that the interesting parts of the crate (layout
//! parsing, geometry binding, uniform dispatch, resource tracking) never touch
//! a concrete context.
//!
//! Objects that own GPU handles ([`GeometryBuffer`](crate::resources::GeometryBuffer),
//! [`ShaderProgram`](crate::resources::ShaderProgram),
//! [`Texture`](crate::resources::Texture)) keep a [`DeviceRef`] and release
//! their handles when dropped.
//!
//! [`HeadlessDevice`] is an in-memory backend that records every command.

pub mod headless;

use std::sync::Arc;

use crate::resources::image::Image;

pub use headless::{GpuCommand, HeadlessDevice};

/// Shared reference to the graphics device.
pub type DeviceRef = Arc<dyn GraphicsDevice>;

macro_rules! gpu_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub u32);
        )*
    };
}

gpu_id! {
    /// Vertex or index buffer object.
    BufferId,
    /// Compiled shader stage.
    ShaderId,
    /// Linked shader program.
    ProgramId,
    /// 2D or cube texture object.
    TextureId,
    /// Location of an active uniform inside a linked program.
    UniformLocation,
}

/// Binding point of a buffer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// `ARRAY_BUFFER`
    Vertex,
    /// `ELEMENT_ARRAY_BUFFER`
    Index,
}

/// Binding point of a texture object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    D2,
    Cube,
}

/// Shader pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Preprocessor symbol defined in front of a combined shader source.
    #[must_use]
    pub fn define(self) -> &'static str {
        match self {
            Self::Vertex => "VERTEX_SHADER",
            Self::Fragment => "FRAGMENT_SHADER",
        }
    }
}

/// Primitive topology of a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Topology {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl Topology {
    /// Number of primitives described by `index_count` indices.
    #[must_use]
    pub fn primitive_count(self, index_count: u32) -> u32 {
        match self {
            Self::Triangles => index_count / 3,
            Self::TriangleStrip | Self::TriangleFan | Self::Lines => index_count / 2,
            Self::LineStrip | Self::LineLoop => index_count.saturating_sub(1),
            Self::Points => index_count,
        }
    }

    /// The matching wgpu topology. wgpu has no fans or loops.
    #[must_use]
    pub fn to_wgpu(self) -> Option<wgpu::PrimitiveTopology> {
        match self {
            Self::Points => Some(wgpu::PrimitiveTopology::PointList),
            Self::Lines => Some(wgpu::PrimitiveTopology::LineList),
            Self::LineStrip => Some(wgpu::PrimitiveTopology::LineStrip),
            Self::Triangles => Some(wgpu::PrimitiveTopology::TriangleList),
            Self::TriangleStrip => Some(wgpu::PrimitiveTopology::TriangleStrip),
            Self::LineLoop | Self::TriangleFan => None,
        }
    }
}

/// GLSL type of an active uniform or attribute, as reported by reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlslType {
    Float,
    FloatVec2,
    FloatVec3,
    FloatVec4,
    Int,
    IntVec2,
    IntVec3,
    IntVec4,
    Bool,
    BoolVec2,
    BoolVec3,
    BoolVec4,
    FloatMat2,
    FloatMat3,
    FloatMat4,
    Sampler2D,
    SamplerCube,
}

impl GlslType {
    /// Parses a GLSL type keyword.
    #[must_use]
    pub fn from_glsl(name: &str) -> Option<Self> {
        let ty = match name {
            "float" => Self::Float,
            "vec2" => Self::FloatVec2,
            "vec3" => Self::FloatVec3,
            "vec4" => Self::FloatVec4,
            "int" => Self::Int,
            "ivec2" => Self::IntVec2,
            "ivec3" => Self::IntVec3,
            "ivec4" => Self::IntVec4,
            "bool" => Self::Bool,
            "bvec2" => Self::BoolVec2,
            "bvec3" => Self::BoolVec3,
            "bvec4" => Self::BoolVec4,
            "mat2" => Self::FloatMat2,
            "mat3" => Self::FloatMat3,
            "mat4" => Self::FloatMat4,
            "sampler2D" => Self::Sampler2D,
            "samplerCube" => Self::SamplerCube,
            _ => return None,
        };
        Some(ty)
    }

    #[must_use]
    pub fn is_sampler(self) -> bool {
        matches!(self, Self::Sampler2D | Self::SamplerCube)
    }

    #[must_use]
    pub fn is_matrix(self) -> bool {
        matches!(self, Self::FloatMat2 | Self::FloatMat3 | Self::FloatMat4)
    }

    #[must_use]
    pub fn is_float(self) -> bool {
        matches!(
            self,
            Self::Float | Self::FloatVec2 | Self::FloatVec3 | Self::FloatVec4
        ) || self.is_matrix()
    }

    /// Number of scalar components of one element of this type.
    #[must_use]
    pub fn components(self) -> usize {
        match self {
            Self::Float | Self::Int | Self::Bool | Self::Sampler2D | Self::SamplerCube => 1,
            Self::FloatVec2 | Self::IntVec2 | Self::BoolVec2 => 2,
            Self::FloatVec3 | Self::IntVec3 | Self::BoolVec3 => 3,
            Self::FloatVec4 | Self::IntVec4 | Self::BoolVec4 | Self::FloatMat2 => 4,
            Self::FloatMat3 => 9,
            Self::FloatMat4 => 16,
        }
    }

    /// Texture binding point used by a sampler type.
    #[must_use]
    pub fn texture_target(self) -> Option<TextureTarget> {
        match self {
            Self::Sampler2D => Some(TextureTarget::D2),
            Self::SamplerCube => Some(TextureTarget::Cube),
            _ => None,
        }
    }
}

/// Reflection record of an active uniform or attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveInfo {
    pub name: String,
    /// Declared array size (1 for non-arrays).
    pub size: u32,
    pub ty: GlslType,
}

/// CPU-side value of a uniform variable.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Floats(Vec<f32>),
    Ints(Vec<i32>),
    Texture(Option<TextureId>),
}

impl UniformValue {
    /// Default value of a freshly linked uniform of the given type.
    #[must_use]
    pub fn zeroed(ty: GlslType, size: u32) -> Self {
        let len = ty.components() * size.max(1) as usize;
        if ty.is_sampler() {
            Self::Texture(None)
        } else if ty.is_float() {
            Self::Floats(vec![0.0; len])
        } else {
            Self::Ints(vec![0; len])
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::Floats(vec![v])
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        Self::Ints(vec![v])
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        Self::Ints(vec![i32::from(v)])
    }
}

impl From<glam::Vec2> for UniformValue {
    fn from(v: glam::Vec2) -> Self {
        Self::Floats(v.to_array().to_vec())
    }
}

impl From<glam::Vec3> for UniformValue {
    fn from(v: glam::Vec3) -> Self {
        Self::Floats(v.to_array().to_vec())
    }
}

impl From<glam::Vec4> for UniformValue {
    fn from(v: glam::Vec4) -> Self {
        Self::Floats(v.to_array().to_vec())
    }
}

impl From<glam::Mat3> for UniformValue {
    fn from(m: glam::Mat3) -> Self {
        Self::Floats(m.to_cols_array().to_vec())
    }
}

impl From<glam::Mat4> for UniformValue {
    fn from(m: glam::Mat4) -> Self {
        Self::Floats(m.to_cols_array().to_vec())
    }
}

impl From<Vec<f32>> for UniformValue {
    fn from(v: Vec<f32>) -> Self {
        Self::Floats(v)
    }
}

impl From<TextureId> for UniformValue {
    fn from(t: TextureId) -> Self {
        Self::Texture(Some(t))
    }
}

/// Immediate-mode graphics API used by the toolkit.
///
/// All methods take `&self`; implementations synchronize internally. Buffers
/// are created with static-draw usage and immutable contents. Indices are
/// always unsigned 16-bit.
pub trait GraphicsDevice: Send + Sync {
    // --- Buffers ---
    fn create_buffer(&self, target: BufferTarget, data: &[u8]) -> BufferId;
    fn delete_buffer(&self, buffer: BufferId);
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferId>);

    // --- Vertex input ---
    fn max_vertex_attribs(&self) -> u32;
    fn enable_vertex_attrib(&self, slot: u32);
    fn disable_vertex_attrib(&self, slot: u32);
    /// Wires `slot` to float data with `components` values, `stride` and `offset` in bytes.
    fn vertex_attrib_pointer(&self, slot: u32, components: u32, stride: u32, offset: u32);

    // --- Draw calls ---
    fn draw_arrays(&self, topology: Topology, first: u32, count: u32);
    fn draw_elements(&self, topology: Topology, count: u32, offset: u32);

    // --- Shaders ---
    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<ShaderId, String>;
    fn delete_shader(&self, shader: ShaderId);
    fn link_program(&self, shaders: &[ShaderId]) -> Result<ProgramId, String>;
    fn delete_program(&self, program: ProgramId);
    fn use_program(&self, program: ProgramId);
    fn active_uniforms(&self, program: ProgramId) -> Vec<ActiveInfo>;
    fn active_attributes(&self, program: ProgramId) -> Vec<ActiveInfo>;
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32>;
    fn uniform_value(&self, program: ProgramId, location: UniformLocation) -> UniformValue;
    fn uniform_f32(&self, location: UniformLocation, arity: u8, data: &[f32]);
    fn uniform_i32(&self, location: UniformLocation, arity: u8, data: &[i32]);
    fn uniform_matrix(&self, location: UniformLocation, dim: u8, data: &[f32]);

    // --- Textures ---
    fn create_texture(&self, target: TextureTarget, image: &Image, generate_mipmaps: bool)
    -> TextureId;
    fn delete_texture(&self, texture: TextureId);
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, target: TextureTarget, texture: Option<TextureId>);
}
