//! Headless Graphics Device
//!
//! An in-memory [`GraphicsDevice`] that needs no GPU. It allocates object ids,
//! keeps uploaded bytes, records every call as a [`GpuCommand`] and performs a
//! minimal GLSL "compile": a stage compiles when its source has a `main`
//! entry point, and linking reflects the `uniform` and `attribute`
//! declarations found in the attached sources.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::{
    ActiveInfo, BufferId, BufferTarget, GlslType, GraphicsDevice, ProgramId, ShaderId,
    ShaderStage, TextureId, TextureTarget, Topology, UniformLocation, UniformValue,
};
use crate::resources::image::Image;

const DEFAULT_MAX_VERTEX_ATTRIBS: u32 = 16;

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    CreateBuffer { id: BufferId, target: BufferTarget, len: usize },
    DeleteBuffer(BufferId),
    BindBuffer { target: BufferTarget, buffer: Option<BufferId> },
    EnableVertexAttrib(u32),
    DisableVertexAttrib(u32),
    VertexAttribPointer { slot: u32, components: u32, stride: u32, offset: u32 },
    DrawArrays { topology: Topology, first: u32, count: u32 },
    DrawElements { topology: Topology, count: u32, offset: u32 },
    CompileShader { id: ShaderId, stage: ShaderStage },
    DeleteShader(ShaderId),
    LinkProgram(ProgramId),
    DeleteProgram(ProgramId),
    UseProgram(ProgramId),
    Uniform { location: UniformLocation, value: UniformValue },
    CreateTexture { id: TextureId, target: TextureTarget, mipmaps: bool },
    DeleteTexture(TextureId),
    ActiveTexture(u32),
    BindTexture { target: TextureTarget, texture: Option<TextureId> },
}

struct ShaderObject {
    stage: ShaderStage,
    uniforms: Vec<ActiveInfo>,
    attributes: Vec<ActiveInfo>,
}

struct ProgramObject {
    uniforms: Vec<ActiveInfo>,
    attributes: Vec<ActiveInfo>,
    locations: Vec<UniformLocation>,
}

#[derive(Default)]
struct HeadlessState {
    next_id: u32,
    max_vertex_attribs: u32,
    buffers: FxHashMap<BufferId, (BufferTarget, Vec<u8>)>,
    shaders: FxHashMap<ShaderId, ShaderObject>,
    programs: FxHashMap<ProgramId, ProgramObject>,
    uniform_values: FxHashMap<UniformLocation, UniformValue>,
    textures: FxHashMap<TextureId, (TextureTarget, u32, u32, u32)>,
    commands: Vec<GpuCommand>,
}

impl HeadlessState {
    fn alloc(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory graphics device that records every command.
pub struct HeadlessDevice {
    state: Mutex<HeadlessState>,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HeadlessState {
                max_vertex_attribs: DEFAULT_MAX_VERTEX_ATTRIBS,
                ..Default::default()
            }),
        }
    }

    #[must_use]
    pub fn with_max_vertex_attribs(max: u32) -> Self {
        let device = Self::new();
        device.state.lock().max_vertex_attribs = max;
        device
    }

    /// Snapshot of every command recorded so far.
    #[must_use]
    pub fn commands(&self) -> Vec<GpuCommand> {
        self.state.lock().commands.clone()
    }

    /// Returns and clears the recorded commands.
    pub fn take_commands(&self) -> Vec<GpuCommand> {
        std::mem::take(&mut self.state.lock().commands)
    }

    /// Contents of a live buffer.
    #[must_use]
    pub fn buffer_data(&self, buffer: BufferId) -> Option<Vec<u8>> {
        self.state.lock().buffers.get(&buffer).map(|(_, data)| data.clone())
    }

    #[must_use]
    pub fn live_buffers(&self) -> usize {
        self.state.lock().buffers.len()
    }

    #[must_use]
    pub fn live_programs(&self) -> usize {
        self.state.lock().programs.len()
    }

    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.state.lock().textures.len()
    }

    /// Dimensions `(width, height, layers)` of a live texture.
    #[must_use]
    pub fn texture_size(&self, texture: TextureId) -> Option<(u32, u32, u32)> {
        self.state
            .lock()
            .textures
            .get(&texture)
            .map(|&(_, w, h, layers)| (w, h, layers))
    }

    fn record(&self, command: GpuCommand) {
        self.state.lock().commands.push(command);
    }
}

/// Collects `uniform` and `attribute` declarations from GLSL source.
fn reflect_declarations(source: &str) -> (Vec<ActiveInfo>, Vec<ActiveInfo>) {
    let mut uniforms = Vec::new();
    let mut attributes = Vec::new();

    let code: String = source
        .lines()
        .map(|line| line.split("//").next().unwrap_or(""))
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");

    for statement in code.split(';') {
        let mut tokens = statement
            .split_whitespace()
            .filter(|t| !matches!(*t, "lowp" | "mediump" | "highp"))
            .skip_while(|t| !matches!(*t, "uniform" | "attribute"));
        let list = match tokens.next() {
            Some("uniform") => &mut uniforms,
            Some("attribute") => &mut attributes,
            _ => continue,
        };
        let Some(ty) = tokens.next().and_then(GlslType::from_glsl) else {
            continue;
        };
        let rest: String = tokens.collect();
        for declarator in rest.split(',').filter(|d| !d.is_empty()) {
            let (name, size) = match declarator.split_once('[') {
                Some((name, dims)) => {
                    let size = dims.trim_end_matches(']').parse().unwrap_or(1);
                    (name, size)
                }
                None => (declarator, 1),
            };
            push_unique(list, ActiveInfo { name: name.to_string(), size, ty });
        }
    }

    (uniforms, attributes)
}

fn push_unique(list: &mut Vec<ActiveInfo>, info: ActiveInfo) {
    if !list.iter().any(|existing| existing.name == info.name) {
        list.push(info);
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_buffer(&self, target: BufferTarget, data: &[u8]) -> BufferId {
        let mut state = self.state.lock();
        let id = BufferId(state.alloc());
        state.buffers.insert(id, (target, data.to_vec()));
        state.commands.push(GpuCommand::CreateBuffer { id, target, len: data.len() });
        id
    }

    fn delete_buffer(&self, buffer: BufferId) {
        let mut state = self.state.lock();
        state.buffers.remove(&buffer);
        state.commands.push(GpuCommand::DeleteBuffer(buffer));
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferId>) {
        self.record(GpuCommand::BindBuffer { target, buffer });
    }

    fn max_vertex_attribs(&self) -> u32 {
        self.state.lock().max_vertex_attribs
    }

    fn enable_vertex_attrib(&self, slot: u32) {
        self.record(GpuCommand::EnableVertexAttrib(slot));
    }

    fn disable_vertex_attrib(&self, slot: u32) {
        self.record(GpuCommand::DisableVertexAttrib(slot));
    }

    fn vertex_attrib_pointer(&self, slot: u32, components: u32, stride: u32, offset: u32) {
        self.record(GpuCommand::VertexAttribPointer { slot, components, stride, offset });
    }

    fn draw_arrays(&self, topology: Topology, first: u32, count: u32) {
        self.record(GpuCommand::DrawArrays { topology, first, count });
    }

    fn draw_elements(&self, topology: Topology, count: u32, offset: u32) {
        self.record(GpuCommand::DrawElements { topology, count, offset });
    }

    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        if !source.contains("main") {
            return Err("ERROR: 0:1: 'main' : missing entry point".to_string());
        }
        let (uniforms, attributes) = reflect_declarations(source);
        let mut state = self.state.lock();
        let id = ShaderId(state.alloc());
        state.shaders.insert(id, ShaderObject { stage, uniforms, attributes });
        state.commands.push(GpuCommand::CompileShader { id, stage });
        Ok(id)
    }

    fn delete_shader(&self, shader: ShaderId) {
        let mut state = self.state.lock();
        state.shaders.remove(&shader);
        state.commands.push(GpuCommand::DeleteShader(shader));
    }

    fn link_program(&self, shaders: &[ShaderId]) -> Result<ProgramId, String> {
        let mut state = self.state.lock();
        let mut uniforms = Vec::new();
        let mut attributes = Vec::new();
        let mut has_vertex = false;
        let mut has_fragment = false;

        for id in shaders {
            let shader = state
                .shaders
                .get(id)
                .ok_or_else(|| format!("ERROR: shader {} is not a valid object", id.0))?;
            match shader.stage {
                ShaderStage::Vertex => has_vertex = true,
                ShaderStage::Fragment => has_fragment = true,
            }
            for u in &shader.uniforms {
                push_unique(&mut uniforms, u.clone());
            }
            for a in &shader.attributes {
                push_unique(&mut attributes, a.clone());
            }
        }
        if !has_vertex || !has_fragment {
            return Err("ERROR: program needs a vertex and a fragment shader".to_string());
        }

        let id = ProgramId(state.alloc());
        let mut locations = Vec::with_capacity(uniforms.len());
        for info in &uniforms {
            let location = UniformLocation(state.alloc());
            state
                .uniform_values
                .insert(location, UniformValue::zeroed(info.ty, info.size));
            locations.push(location);
        }
        state.programs.insert(id, ProgramObject { uniforms, attributes, locations });
        state.commands.push(GpuCommand::LinkProgram(id));
        Ok(id)
    }

    fn delete_program(&self, program: ProgramId) {
        let mut state = self.state.lock();
        if let Some(object) = state.programs.remove(&program) {
            for location in object.locations {
                state.uniform_values.remove(&location);
            }
        }
        state.commands.push(GpuCommand::DeleteProgram(program));
    }

    fn use_program(&self, program: ProgramId) {
        self.record(GpuCommand::UseProgram(program));
    }

    fn active_uniforms(&self, program: ProgramId) -> Vec<ActiveInfo> {
        self.state
            .lock()
            .programs
            .get(&program)
            .map(|p| p.uniforms.clone())
            .unwrap_or_default()
    }

    fn active_attributes(&self, program: ProgramId) -> Vec<ActiveInfo> {
        self.state
            .lock()
            .programs
            .get(&program)
            .map(|p| p.attributes.clone())
            .unwrap_or_default()
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let state = self.state.lock();
        let object = state.programs.get(&program)?;
        let index = object.uniforms.iter().position(|u| u.name == name)?;
        object.locations.get(index).copied()
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        let state = self.state.lock();
        let object = state.programs.get(&program)?;
        object
            .attributes
            .iter()
            .position(|a| a.name == name)
            .map(|i| i as u32)
    }

    fn uniform_value(&self, _program: ProgramId, location: UniformLocation) -> UniformValue {
        self.state
            .lock()
            .uniform_values
            .get(&location)
            .cloned()
            .unwrap_or(UniformValue::Floats(Vec::new()))
    }

    fn uniform_f32(&self, location: UniformLocation, _arity: u8, data: &[f32]) {
        let value = UniformValue::Floats(data.to_vec());
        let mut state = self.state.lock();
        state.uniform_values.insert(location, value.clone());
        state.commands.push(GpuCommand::Uniform { location, value });
    }

    fn uniform_i32(&self, location: UniformLocation, _arity: u8, data: &[i32]) {
        let value = UniformValue::Ints(data.to_vec());
        let mut state = self.state.lock();
        state.uniform_values.insert(location, value.clone());
        state.commands.push(GpuCommand::Uniform { location, value });
    }

    fn uniform_matrix(&self, location: UniformLocation, _dim: u8, data: &[f32]) {
        self.uniform_f32(location, 1, data);
    }

    fn create_texture(
        &self,
        target: TextureTarget,
        image: &Image,
        generate_mipmaps: bool,
    ) -> TextureId {
        let mut state = self.state.lock();
        let id = TextureId(state.alloc());
        state
            .textures
            .insert(id, (target, image.width, image.height, image.layers));
        state.commands.push(GpuCommand::CreateTexture { id, target, mipmaps: generate_mipmaps });
        id
    }

    fn delete_texture(&self, texture: TextureId) {
        let mut state = self.state.lock();
        state.textures.remove(&texture);
        state.commands.push(GpuCommand::DeleteTexture(texture));
    }

    fn active_texture(&self, unit: u32) {
        self.record(GpuCommand::ActiveTexture(unit));
    }

    fn bind_texture(&self, target: TextureTarget, texture: Option<TextureId>) {
        self.record(GpuCommand::BindTexture { target, texture });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "
        #ifdef VERTEX_SHADER
        attribute vec3 APosition; // position
        attribute highp vec2 ATexCoord;
        uniform mat4 WorldViewProjection;
        void main() {}
        #endif
        #ifdef FRAGMENT_SHADER
        uniform sampler2D Diffuse;
        uniform vec4 Tints[2], Extra;
        void main() {}
        #endif
    ";

    #[test]
    fn reflection_collects_declarations_in_order() {
        let (uniforms, attributes) = reflect_declarations(SOURCE);
        let names: Vec<_> = uniforms.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["WorldViewProjection", "Diffuse", "Tints", "Extra"]);
        assert_eq!(uniforms[2].size, 2);
        assert_eq!(uniforms[1].ty, GlslType::Sampler2D);

        let names: Vec<_> = attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["APosition", "ATexCoord"]);
    }

    #[test]
    fn link_requires_both_stages() {
        let device = HeadlessDevice::new();
        let vs = device.compile_shader(ShaderStage::Vertex, SOURCE).unwrap();
        assert!(device.link_program(&[vs]).is_err());

        let fs = device.compile_shader(ShaderStage::Fragment, SOURCE).unwrap();
        let program = device.link_program(&[vs, fs]).unwrap();
        assert_eq!(device.active_uniforms(program).len(), 4);
        assert_eq!(device.attrib_location(program, "ATexCoord"), Some(1));
    }

    #[test]
    fn compile_fails_without_entry_point() {
        let device = HeadlessDevice::new();
        assert!(device.compile_shader(ShaderStage::Vertex, "uniform float x;").is_err());
    }

    #[test]
    fn buffers_are_tracked_until_deleted() {
        let device = HeadlessDevice::new();
        let id = device.create_buffer(BufferTarget::Vertex, &[1, 2, 3, 4]);
        assert_eq!(device.buffer_data(id), Some(vec![1, 2, 3, 4]));
        assert_eq!(device.live_buffers(), 1);
        device.delete_buffer(id);
        assert_eq!(device.live_buffers(), 0);
    }
}
