//! Schema compiler: an ordered attribute list into a byte layout.
//!
//! The compiler is purely a layout planner. It assigns byte offsets in
//! declaration order, resolves conversion names against a registry and
//! groups the result by source kind for cheap lookup during traversal.
//! Whether a declared (source kind, field) pair actually exists on the
//! host's data is deliberately not checked here; that surfaces at write
//! time, against the live node.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::convert::{Conversion, ConversionRegistry};
use crate::format::AttributeFormat;
use crate::util::{Error, Result};

/// A category of data-bearing node attributes can be read from.
///
/// Material graph nodes are each their own source kind, keyed by the
/// node's type name, so a schema can address e.g. every `TEX_IMAGE`
/// node independently of the material itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Scene,
    Object,
    Polygon,
    Material,
    MaterialNode(String),
    Loop,
    Uv,
    Color,
    Vertex,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Scene => f.write_str("scene"),
            SourceKind::Object => f.write_str("object"),
            SourceKind::Polygon => f.write_str("polygon"),
            SourceKind::Material => f.write_str("material"),
            SourceKind::MaterialNode(name) => write!(f, "material_node({name})"),
            SourceKind::Loop => f.write_str("loop"),
            SourceKind::Uv => f.write_str("uv"),
            SourceKind::Color => f.write_str("color"),
            SourceKind::Vertex => f.write_str("vertex"),
        }
    }
}

/// One user-declared vertex attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeSpec {
    /// Which kind of node to read.
    pub source_kind: SourceKind,
    /// Which field on that node.
    pub field: String,
    /// Packed binary format, e.g. `"fff"`.
    pub format: String,
    /// 0 writes into the visited frame's buffer; 1 writes the same value
    /// into the previous frame's buffer at the same byte range.
    #[serde(default)]
    pub frame_offset: u8,
    /// Conversion function name. `None` (or `"none"`) passes the raw
    /// value straight to the codec.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion: Option<String>,
    /// Conversion-specific parameter bag, opaque to the compiler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<serde_json::Value>,
}

impl AttributeSpec {
    pub fn new(source_kind: SourceKind, field: &str, format: &str) -> Self {
        Self {
            source_kind,
            field: field.to_string(),
            format: format.to_string(),
            frame_offset: 0,
            conversion: None,
            args: None,
        }
    }

    pub fn with_conversion(mut self, name: &str) -> Self {
        self.conversion = Some(name.to_string());
        self
    }

    pub fn with_frame_offset(mut self, frame_offset: u8) -> Self {
        self.frame_offset = frame_offset;
        self
    }

    pub fn with_args(mut self, args: serde_json::Value) -> Self {
        self.args = Some(args);
        self
    }
}

/// One attribute's compiled placement within the vertex record.
///
/// The same (source kind, field) pair may occur several times in a
/// schema; each declaration becomes its own occurrence with its own
/// byte range. Occurrences sharing a field name are otherwise wholly
/// independent; in particular a frame-offset-1 occurrence does not
/// know about its frame-offset-0 sibling.
#[derive(Debug, Clone)]
pub struct FieldOccurrence {
    /// Byte offset within the vertex record.
    pub offset: usize,
    /// Packed length in bytes. Always `format.byte_len()`.
    pub byte_len: usize,
    pub format: AttributeFormat,
    pub frame_offset: u8,
    pub conversion: Option<Conversion>,
    pub args: Option<serde_json::Value>,
}

/// Per-field occurrence lists for one source kind. BTreeMap keeps field
/// iteration (and therefore error reporting) deterministic.
pub type FieldMap = BTreeMap<String, Vec<FieldOccurrence>>;

/// Compiled schema: grouped occurrences plus the total stride.
pub struct LayoutDescriptor {
    groups: HashMap<SourceKind, FieldMap>,
    stride: usize,
    specs: Vec<AttributeSpec>,
}

impl LayoutDescriptor {
    /// Compile an ordered attribute list.
    ///
    /// Offsets are assigned strictly in declaration order; grouping by
    /// source kind is a lookup optimization, not a layout change.
    /// Malformed format strings, unknown conversion names and invalid
    /// frame offsets fail here, before any buffer is allocated.
    pub fn compile(specs: &[AttributeSpec], registry: &ConversionRegistry) -> Result<Self> {
        let mut groups: HashMap<SourceKind, FieldMap> = HashMap::new();
        let mut offset = 0usize;

        for (index, spec) in specs.iter().enumerate() {
            let attribute_context = |source: Error| Error::Attribute {
                index,
                source_kind: spec.source_kind.to_string(),
                field: spec.field.clone(),
                source: Box::new(source),
            };

            let format = AttributeFormat::parse(&spec.format).map_err(attribute_context)?;
            if spec.frame_offset > 1 {
                return Err(attribute_context(Error::InvalidFrameOffset(
                    spec.frame_offset,
                )));
            }
            let conversion = match spec.conversion.as_deref() {
                None | Some("") | Some("none") => None,
                Some(name) => Some(registry.resolve(name).map_err(attribute_context)?),
            };

            let byte_len = format.byte_len();
            groups
                .entry(spec.source_kind.clone())
                .or_default()
                .entry(spec.field.clone())
                .or_default()
                .push(FieldOccurrence {
                    offset,
                    byte_len,
                    format,
                    frame_offset: spec.frame_offset,
                    conversion,
                    args: spec.args.clone(),
                });
            offset += byte_len;
        }

        Ok(Self {
            groups,
            stride: offset,
            specs: specs.to_vec(),
        })
    }

    /// Total bytes per vertex record.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The declared attribute list, in declaration order.
    pub fn specs(&self) -> &[AttributeSpec] {
        &self.specs
    }

    /// Field occurrences for one source kind. `None` when the schema
    /// never references the kind, which traversal treats as a no-op.
    pub fn fields(&self, kind: &SourceKind) -> Option<&FieldMap> {
        self.groups.get(kind)
    }

    /// True when the schema declares no attributes at all.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl fmt::Debug for LayoutDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutDescriptor")
            .field("stride", &self.stride)
            .field("attributes", &self.specs.len())
            .field("source_kinds", &self.groups.len())
            .finish()
    }
}
