//! Shader Programs
//!
//! [`ShaderProgram`] wraps a linked program and its reflection data:
//!
//! - Uniforms carry a cached value, a dirty flag and a type-specific
//!   [`UniformSetter`]. Samplers get a texture unit, assigned in reflection
//!   order when the program is created.
//! - Attributes carry their slot and a semantic role guessed from the name
//!   (`APosition`, `ANormal`, `ATexCoord`, ...).
//!
//! [`ShaderProgram::apply`] re-binds every sampler each time and uploads only
//! the uniforms whose value changed since the last upload.

use std::borrow::Cow;
use std::fmt;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::errors::{AssetError, Result, UnknownUniformError};
use crate::gpu::{
    DeviceRef, GlslType, GraphicsDevice, ProgramId, ShaderStage, UniformLocation, UniformValue,
};
use crate::resources::vertex_format::AttributeRole;

/// Prefix that marks an attribute name as carrying a role, e.g. `APosition`.
pub const ATTRIBUTE_ROLE_PREFIX: char = 'A';

/// The upload call used for a uniform, chosen from its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformSetter {
    /// `uniform{N}f[v]` with arity `N`.
    Float(u8),
    /// `uniform{N}i[v]` with arity `N`, also used for bools and samplers.
    Int(u8),
    /// `uniformMatrix{N}fv`.
    Matrix(u8),
}

impl UniformSetter {
    #[must_use]
    pub fn for_type(ty: GlslType) -> Self {
        match ty {
            GlslType::FloatMat2 => Self::Matrix(2),
            GlslType::FloatMat3 => Self::Matrix(3),
            GlslType::FloatMat4 => Self::Matrix(4),
            _ if ty.is_float() => Self::Float(ty.components() as u8),
            _ => Self::Int(ty.components() as u8),
        }
    }

    pub fn upload(self, device: &dyn GraphicsDevice, location: UniformLocation, value: &UniformValue) {
        match self {
            Self::Matrix(dim) => device.uniform_matrix(location, dim, &as_floats(value)),
            Self::Float(arity) => device.uniform_f32(location, arity, &as_floats(value)),
            Self::Int(arity) => device.uniform_i32(location, arity, &as_ints(value)),
        }
    }
}

fn as_floats(value: &UniformValue) -> Cow<'_, [f32]> {
    match value {
        UniformValue::Floats(v) => Cow::Borrowed(v),
        UniformValue::Ints(v) => Cow::Owned(v.iter().map(|&i| i as f32).collect()),
        UniformValue::Texture(_) => Cow::Borrowed(&[]),
    }
}

fn as_ints(value: &UniformValue) -> Cow<'_, [i32]> {
    match value {
        UniformValue::Ints(v) => Cow::Borrowed(v),
        UniformValue::Floats(v) => Cow::Owned(v.iter().map(|&f| f as i32).collect()),
        UniformValue::Texture(_) => Cow::Borrowed(&[]),
    }
}

/// Reflected uniform variable.
#[derive(Debug, Clone)]
pub struct Uniform {
    pub name: String,
    pub size: u32,
    pub ty: GlslType,
    pub setter: UniformSetter,
    pub location: Option<UniformLocation>,
    /// Texture unit for sampler uniforms.
    pub texture_unit: Option<u32>,
    value: UniformValue,
    dirty: bool,
}

impl Uniform {
    #[must_use]
    pub fn value(&self) -> &UniformValue {
        &self.value
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Reflected vertex attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderAttribute {
    pub name: String,
    pub size: u32,
    pub ty: GlslType,
    /// Vertex slot assigned by the API.
    pub location: Option<u32>,
    pub role: AttributeRole,
}

/// Guesses an attribute's role from its declared name.
///
/// The name must start with [`ATTRIBUTE_ROLE_PREFIX`]; the remainder is
/// matched against the role names. Anything else is [`AttributeRole::Unknown`].
#[must_use]
pub fn guess_attribute_role(name: &str) -> AttributeRole {
    let role = name
        .strip_prefix(ATTRIBUTE_ROLE_PREFIX)
        .and_then(AttributeRole::from_name)
        .unwrap_or_default();
    log::debug!("{name} is a {role} attribute");
    role
}

#[derive(Default)]
struct UniformTable {
    entries: Vec<Uniform>,
    lookup: FxHashMap<String, usize>,
}

/// A linked shader program with reflected uniforms and attributes.
///
/// The program object is deleted when the `ShaderProgram` is dropped.
pub struct ShaderProgram {
    device: DeviceRef,
    program: ProgramId,
    label: String,
    uniforms: Mutex<UniformTable>,
    attributes: Vec<ShaderAttribute>,
}

impl ShaderProgram {
    /// Compiles `source` once per stage, with `#define VERTEX_SHADER` or
    /// `#define FRAGMENT_SHADER` prepended, and links the result.
    pub fn compile(device: DeviceRef, label: &str, source: &str) -> Result<Self> {
        let mut shaders = Vec::with_capacity(2);
        for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
            let staged = format!("#define {}\n{source}", stage.define());
            match device.compile_shader(stage, &staged) {
                Ok(shader) => {
                    log::info!("Successfully compiled shader {label} ({}).", stage.define());
                    shaders.push(shader);
                }
                Err(log) => {
                    for shader in shaders {
                        device.delete_shader(shader);
                    }
                    return Err(AssetError::Compile {
                        path: label.to_string(),
                        stage: stage.define(),
                        log,
                    }
                    .into());
                }
            }
        }

        let linked = device.link_program(&shaders);
        for shader in shaders {
            device.delete_shader(shader);
        }
        let program = linked.map_err(|log| AssetError::Link { path: label.to_string(), log })?;
        log::info!("Successfully linked shader program {label}.");

        Ok(Self::new(device, program, label))
    }

    /// Wraps an already linked program and reflects its interface.
    #[must_use]
    pub fn new(device: DeviceRef, program: ProgramId, label: &str) -> Self {
        let mut table = UniformTable::default();
        let mut texture_unit = 0;

        for info in device.active_uniforms(program) {
            let location = device.uniform_location(program, &info.name);
            let unit = info.ty.is_sampler().then(|| {
                let unit = texture_unit;
                texture_unit += 1;
                unit
            });
            let value = match location {
                Some(_) if info.ty.is_sampler() => UniformValue::Texture(None),
                Some(location) => device.uniform_value(program, location),
                None => UniformValue::zeroed(info.ty, info.size),
            };

            table.lookup.insert(info.name.clone(), table.entries.len());
            table.entries.push(Uniform {
                setter: UniformSetter::for_type(info.ty),
                name: info.name,
                size: info.size,
                ty: info.ty,
                location,
                texture_unit: unit,
                value,
                dirty: false,
            });
        }

        let attributes = device
            .active_attributes(program)
            .into_iter()
            .map(|info| ShaderAttribute {
                location: device.attrib_location(program, &info.name),
                role: guess_attribute_role(&info.name),
                name: info.name,
                size: info.size,
                ty: info.ty,
            })
            .collect();

        log::debug!(
            "Reflected shader program {label}: {} uniforms, {texture_unit} samplers",
            table.entries.len()
        );

        Self {
            device,
            program,
            label: label.to_string(),
            uniforms: Mutex::new(table),
            attributes,
        }
    }

    #[inline]
    #[must_use]
    pub fn program(&self) -> ProgramId {
        self.program
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &[ShaderAttribute] {
        &self.attributes
    }

    /// Snapshot of the reflected uniforms, in reflection order.
    #[must_use]
    pub fn uniforms(&self) -> Vec<Uniform> {
        self.uniforms.lock().entries.clone()
    }

    /// Cached value of a uniform.
    pub fn uniform(&self, name: &str) -> Result<UniformValue> {
        self.uniform_if_present(name)
            .ok_or_else(|| UnknownUniformError { name: name.to_string() }.into())
    }

    /// Cached value of a uniform, or `None` if the program has no such uniform.
    #[must_use]
    pub fn uniform_if_present(&self, name: &str) -> Option<UniformValue> {
        let table = self.uniforms.lock();
        let index = *table.lookup.get(name)?;
        Some(table.entries[index].value.clone())
    }

    /// Stores a new value and marks the uniform for upload on the next [`apply`](Self::apply).
    pub fn set_uniform(&self, name: &str, value: impl Into<UniformValue>) -> Result<()> {
        if self.set_uniform_if_present(name, value) {
            Ok(())
        } else {
            Err(UnknownUniformError { name: name.to_string() }.into())
        }
    }

    /// Like [`set_uniform`](Self::set_uniform), but an unknown name is not an
    /// error. Returns whether the uniform exists.
    pub fn set_uniform_if_present(&self, name: &str, value: impl Into<UniformValue>) -> bool {
        let mut table = self.uniforms.lock();
        let Some(&index) = table.lookup.get(name) else {
            return false;
        };
        let uniform = &mut table.entries[index];
        uniform.value = value.into();
        uniform.dirty = true;
        true
    }

    /// Makes this program current and pushes uniform state.
    ///
    /// Samplers bind their texture to their unit every call. Other uniforms
    /// are uploaded only when dirty.
    pub fn apply(&self) {
        let device = self.device.as_ref();
        device.use_program(self.program);

        let mut table = self.uniforms.lock();
        for uniform in &mut table.entries {
            let Some(location) = uniform.location else {
                continue;
            };
            if let Some(unit) = uniform.texture_unit {
                let texture = match uniform.value {
                    UniformValue::Texture(texture) => texture,
                    _ => None,
                };
                if let Some(target) = uniform.ty.texture_target() {
                    device.active_texture(unit);
                    device.bind_texture(target, texture);
                }
                uniform.setter.upload(device, location, &UniformValue::Ints(vec![unit as i32]));
            } else if uniform.dirty {
                uniform.setter.upload(device, location, &uniform.value);
                uniform.dirty = false;
            }
        }
    }
}

impl fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("label", &self.label)
            .field("program", &self.program)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        self.device.delete_program(self.program);
    }
}
