//! Vertex Layout Grammar
//!
//! A vertex format is written as `|`-separated blocks of `<role><count>`
//! tokens, e.g. `p3|n3|t2` or `p3n3t2`:
//!
//! - A block with a single token is stored non-interleaved: the attribute
//!   occupies one contiguous run across all vertices and has stride 0.
//! - A block with several tokens is interleaved: its attributes share a stride
//!   equal to the block's component total times the element size.
//! - Blocks follow each other in the buffer; each starts after all vertices of
//!   the previous blocks.
//!
//! All elements are 32-bit floats.

use std::fmt;

use crate::errors::{Result, VertexDataError, VertexFormatError};

/// Size of one vertex element (an `f32`) in bytes.
pub const ELEMENT_SIZE: u32 = std::mem::size_of::<f32>() as u32;

/// Largest component count a single attribute may declare.
pub const MAX_COMPONENTS: u32 = 16;

/// Semantic role of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttributeRole {
    #[default]
    Unknown,
    Position,
    Normal,
    TexCoord,
    Color,
    Tangent,
    BiTangent,
}

impl AttributeRole {
    /// Every role with a short code, in lookup order.
    pub const KNOWN: [AttributeRole; 6] = [
        AttributeRole::Position,
        AttributeRole::Normal,
        AttributeRole::TexCoord,
        AttributeRole::Color,
        AttributeRole::Tangent,
        AttributeRole::BiTangent,
    ];

    /// Short code used in layout strings and attribute names.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Unknown => "",
            Self::Position => "p",
            Self::Normal => "n",
            Self::TexCoord => "t",
            Self::Color => "c",
            Self::Tangent => "tg",
            Self::BiTangent => "b",
        }
    }

    /// Looks up a role by its short code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::KNOWN.into_iter().find(|role| role.code() == code)
    }

    /// Looks up a role by its full name, e.g. `TexCoord`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::KNOWN.into_iter().find(|role| role.name() == name)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Position => "Position",
            Self::Normal => "Normal",
            Self::TexCoord => "TexCoord",
            Self::Color => "Color",
            Self::Tangent => "Tangent",
            Self::BiTangent => "BiTangent",
        }
    }
}

impl fmt::Display for AttributeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Placement of one attribute inside the raw vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub role: AttributeRole,
    /// Number of float components, `1..=16`.
    pub components: u32,
    /// Distance between consecutive vertices in bytes; 0 means tightly packed.
    pub stride: u32,
    /// Byte offset of the first vertex's value.
    pub offset: u32,
}

impl VertexAttribute {
    /// Stride in floats, resolving the tightly packed case.
    #[inline]
    #[must_use]
    pub fn float_stride(&self) -> usize {
        if self.stride == 0 {
            self.components as usize
        } else {
            (self.stride / ELEMENT_SIZE) as usize
        }
    }

    /// Index of the first float of vertex `vertex` in the raw buffer.
    #[inline]
    #[must_use]
    pub fn float_index(&self, vertex: usize) -> usize {
        (self.offset / ELEMENT_SIZE) as usize + vertex * self.float_stride()
    }
}

/// One `|`-separated block of the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBlock {
    /// Index of the block's first attribute in [`VertexFormat::attributes`].
    pub first_attribute: usize,
    pub attribute_count: usize,
    /// Total components of the block's attributes.
    pub components: u32,
    /// Byte offset of the block inside the buffer.
    pub offset: u32,
}

impl VertexBlock {
    #[must_use]
    pub fn is_interleaved(&self) -> bool {
        self.attribute_count > 1
    }
}

/// wgpu description of one block, with the byte offset at which the block
/// must be bound.
#[derive(Debug, Clone)]
pub struct OwnedVertexBufferDesc {
    pub base_offset: u64,
    pub array_stride: u64,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl OwnedVertexBufferDesc {
    #[must_use]
    pub fn as_wgpu(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.attributes,
        }
    }
}

/// Parsed vertex layout. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexFormat {
    format: String,
    attributes: Vec<VertexAttribute>,
    blocks: Vec<VertexBlock>,
    elements_per_vertex: usize,
    vertex_count: usize,
}

struct ParsedBlock {
    attrs: Vec<(AttributeRole, u32)>,
    size: u32,
}

impl VertexFormat {
    /// Parses `format` for a buffer holding `vertex_data_len` floats.
    pub fn new(format: &str, vertex_data_len: usize) -> Result<Self> {
        let mut parsed = Vec::new();
        let mut position = 0;
        for block in format.split('|') {
            parsed.push(read_block(format, block, position)?);
            position += block.len() + 1;
        }

        let elements_per_vertex: usize = parsed.iter().map(|b| b.size as usize).sum();
        if vertex_data_len % elements_per_vertex != 0 {
            return Err(VertexDataError::LengthMismatch {
                len: vertex_data_len,
                elements_per_vertex,
            }
            .into());
        }
        // Every block and attribute offset is bounded by the total byte size.
        if vertex_data_len
            .checked_mul(ELEMENT_SIZE as usize)
            .is_none_or(|bytes| u32::try_from(bytes).is_err())
        {
            return Err(VertexDataError::TooLarge { len: vertex_data_len }.into());
        }
        let vertex_count = vertex_data_len / elements_per_vertex;

        let mut attributes = Vec::new();
        let mut blocks = Vec::with_capacity(parsed.len());
        let mut block_offset = 0u32;
        for block in &parsed {
            let interleaved = block.attrs.len() > 1;
            blocks.push(VertexBlock {
                first_attribute: attributes.len(),
                attribute_count: block.attrs.len(),
                components: block.size,
                offset: block_offset,
            });

            let mut offset = block_offset;
            for &(role, components) in &block.attrs {
                attributes.push(VertexAttribute {
                    role,
                    components,
                    stride: if interleaved { block.size * ELEMENT_SIZE } else { 0 },
                    offset,
                });
                offset += components * ELEMENT_SIZE;
            }
            block_offset += block.size * vertex_count as u32 * ELEMENT_SIZE;
        }

        Ok(Self {
            format: format.to_string(),
            attributes,
            blocks,
            elements_per_vertex,
            vertex_count,
        })
    }

    /// Returns a new format with `block` appended, for a buffer of
    /// `vertex_data_len` floats.
    pub fn with_block(&self, block: &str, vertex_data_len: usize) -> Result<Self> {
        Self::new(&format!("{}|{block}", self.format), vertex_data_len)
    }

    /// First attribute with the given role.
    #[must_use]
    pub fn find(&self, role: AttributeRole) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|attr| attr.role == role)
    }

    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    #[inline]
    #[must_use]
    pub fn blocks(&self) -> &[VertexBlock] {
        &self.blocks
    }

    /// The layout string this format was parsed from.
    #[inline]
    #[must_use]
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Floats per vertex across all blocks.
    #[inline]
    #[must_use]
    pub fn elements_per_vertex(&self) -> usize {
        self.elements_per_vertex
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Describes each block as a wgpu vertex buffer layout. Shader locations
    /// are assigned in attribute order. Returns `None` when an attribute has
    /// more than four components, which wgpu cannot express.
    #[must_use]
    pub fn buffer_layouts(&self) -> Option<Vec<OwnedVertexBufferDesc>> {
        let mut location = 0;
        let mut layouts = Vec::with_capacity(self.blocks.len());

        for block in &self.blocks {
            let attrs =
                &self.attributes[block.first_attribute..block.first_attribute + block.attribute_count];
            let mut wgpu_attributes = Vec::with_capacity(attrs.len());
            for attr in attrs {
                wgpu_attributes.push(wgpu::VertexAttribute {
                    format: float_format(attr.components)?,
                    offset: u64::from(attr.offset - block.offset),
                    shader_location: location,
                });
                location += 1;
            }
            layouts.push(OwnedVertexBufferDesc {
                base_offset: u64::from(block.offset),
                array_stride: u64::from(block.components * ELEMENT_SIZE),
                attributes: wgpu_attributes,
            });
        }

        Some(layouts)
    }
}

fn float_format(components: u32) -> Option<wgpu::VertexFormat> {
    match components {
        1 => Some(wgpu::VertexFormat::Float32),
        2 => Some(wgpu::VertexFormat::Float32x2),
        3 => Some(wgpu::VertexFormat::Float32x3),
        4 => Some(wgpu::VertexFormat::Float32x4),
        _ => None,
    }
}

/// Reads one block of `<letters><digits>` tokens. `start` is the block's
/// position inside `format`, used for error reporting.
fn read_block(format: &str, block: &str, start: usize) -> Result<ParsedBlock> {
    let mut attrs = Vec::new();
    let mut size = 0;
    let bytes = block.as_bytes();
    let mut i = 0;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i == bytes.len() {
            break;
        }

        let code_start = i;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        let digits_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if code_start == digits_start || digits_start == i {
            return Err(VertexFormatError::Syntax {
                format: format.to_string(),
                position: start + code_start,
            }
            .into());
        }

        let token = &block[code_start..i];
        let code = &block[code_start..digits_start];
        let components = block[digits_start..i].parse::<u32>().unwrap_or(u32::MAX);
        if !(1..=MAX_COMPONENTS).contains(&components) {
            return Err(VertexFormatError::InvalidSize { token: token.to_string() }.into());
        }
        let role = AttributeRole::from_code(code)
            .ok_or_else(|| VertexFormatError::UnknownRole { token: token.to_string() })?;

        size += components;
        attrs.push((role, components));
    }

    if attrs.is_empty() {
        return Err(VertexFormatError::Syntax {
            format: format.to_string(),
            position: start,
        }
        .into());
    }

    Ok(ParsedBlock { attrs, size })
}
