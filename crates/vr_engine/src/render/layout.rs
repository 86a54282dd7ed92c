//! Vertex layout descriptors
//!
//! A layout is declared as a string and parsed once at buffer construction.
//! Two spellings are accepted and may not be mixed with ill effect since
//! parsing is per-token:
//!
//! * compact: `"a_position:3, a_normal:3, a_bone_indices:4i"` where the
//!   number is the component count and a trailing `i` marks an integer
//!   attribute
//! * typed: `"float3 a_position float2 a_texcoord"` with types `float[N]`
//!   and `int[N]`, N in 1 to 4
//!
//! Attributes are laid out in declaration order, tightly interleaved; all
//! offsets and strides are in 32-bit elements.

use crate::render::error::{RenderError, RenderResult};

/// One attribute slot within an interleaved vertex
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Name used to match shader attributes
    pub name: String,
    /// Declaration position
    pub index: usize,
    /// Offset from the start of a vertex, in 32-bit elements
    pub offset: usize,
    /// Component count, 1 to 4
    pub size: usize,
    /// Integer data, bound through the non-normalizing pointer variant
    pub is_int: bool,
    /// Whether any data has been stored for this attribute
    pub is_set: bool,
}

/// Parsed, immutable vertex layout
#[derive(Debug, Clone)]
pub struct VertexLayout {
    descriptor: String,
    attributes: Vec<Attribute>,
    stride: usize,
}

impl VertexLayout {
    /// Parse a descriptor string
    pub fn parse(descriptor: &str) -> RenderResult<Self> {
        let mut attributes: Vec<Attribute> = Vec::new();
        let mut offset = 0;

        let tokens: Vec<&str> = descriptor
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .collect();

        let mut i = 0;
        while i < tokens.len() {
            let token = tokens[i];
            let (name, size, is_int) = if let Some((name, count)) = token.split_once(':') {
                (name, Self::parse_count(descriptor, count)?, count.ends_with('i'))
            } else {
                // Typed form consumes two tokens
                let Some(name) = tokens.get(i + 1) else {
                    return Err(RenderError::BadDescriptor(format!(
                        "type {token:?} has no attribute name in {descriptor:?}"
                    )));
                };
                i += 1;
                let (base, count) = if let Some(rest) = token.strip_prefix("float") {
                    (false, rest)
                } else if let Some(rest) = token.strip_prefix("int") {
                    (true, rest)
                } else {
                    return Err(RenderError::BadDescriptor(format!(
                        "unknown type {token:?} in {descriptor:?}"
                    )));
                };
                let size = if count.is_empty() {
                    1
                } else {
                    Self::parse_count(descriptor, count)?
                };
                (*name, size, base)
            };

            if !(1..=4).contains(&size) {
                return Err(RenderError::BadDescriptor(format!(
                    "attribute {name:?} has component count {size}, must be 1 to 4"
                )));
            }
            if attributes.iter().any(|a| a.name == name) {
                return Err(RenderError::BadDescriptor(format!(
                    "attribute {name:?} declared twice in {descriptor:?}"
                )));
            }
            attributes.push(Attribute {
                name: name.to_owned(),
                index: attributes.len(),
                offset,
                size,
                is_int,
                is_set: false,
            });
            offset += size;
            i += 1;
        }

        if attributes.is_empty() {
            return Err(RenderError::BadDescriptor(format!(
                "no attributes in {descriptor:?}"
            )));
        }
        Ok(Self {
            descriptor: descriptor.to_owned(),
            attributes,
            stride: offset,
        })
    }

    fn parse_count(descriptor: &str, count: &str) -> RenderResult<usize> {
        count.trim_end_matches('i').parse().map_err(|_| {
            RenderError::BadDescriptor(format!("bad component count {count:?} in {descriptor:?}"))
        })
    }

    /// The string the layout was parsed from
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Attributes in declaration order
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Elements per vertex across all attributes
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Bytes per vertex
    pub fn vertex_byte_size(&self) -> usize {
        self.stride * 4
    }

    /// Look up an attribute, tolerating the historic `a_texcoord` /
    /// `a_tex_coord` spelling split
    pub fn find(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .or_else(|| self.find_alias(name))
    }

    fn find_alias(&self, name: &str) -> Option<&Attribute> {
        let alias = match name {
            "a_texcoord" => "a_tex_coord",
            "a_tex_coord" => "a_texcoord",
            _ => return None,
        };
        self.attributes.iter().find(|a| a.name == alias)
    }

    pub(crate) fn mark_set(&mut self, index: usize) {
        self.attributes[index].is_set = true;
    }
}
