//! # vbx
//!
//! Attribute-schema vertex buffer compiler and exporter.
//!
//! A user declares an ordered list of vertex attributes, each naming a
//! data source kind, a field on that source, a packed binary format, an
//! optional cross-frame offset and an optional conversion function. The
//! schema compiler turns the list into a fixed per-vertex byte layout;
//! the writer traverses per-frame triangulated vertex streams provided
//! by a host application and scatters every attribute's packed value
//! into the right byte range of the right frame's buffer. The
//! orchestrator concatenates the buffers into a headerless `.vbx` binary
//! plus a JSON manifest that carries all structural knowledge.
//!
//! The crate is host-agnostic: mesh generation, triangulation and
//! transform application stay on the host side behind the [`host`]
//! traits.
//!
//! ## Modules
//!
//! - [`format`] - Format codes, byte widths, little-endian pack/unpack
//! - [`value`] - Dynamic attribute values
//! - [`schema`] - Attribute declarations and the layout compiler
//! - [`convert`] - Conversion function registry and built-ins
//! - [`buffer`] - Per-object frame buffer sets
//! - [`host`] - Collaborator interfaces the host must implement
//! - [`writer`] - The traversal and scatter-write engine
//! - [`export`] - Orchestrator, manifest model, export summary
//! - [`util`] - Errors
//!
//! ## Example
//!
//! ```ignore
//! use vbx::prelude::*;
//!
//! let schema = vec![
//!     AttributeSpec::new(SourceKind::Vertex, "position", "fff"),
//!     AttributeSpec::new(SourceKind::Uv, "uv", "ff").with_conversion("invert_v"),
//! ];
//! let registry = ConversionRegistry::with_builtins();
//! let exporter = Exporter::new(&schema, &registry, ExportSettings::default())?;
//! let summary = exporter.export(&mut my_host, "out/scene")?;
//! println!("wrote {} bytes", summary.bytes_written);
//! ```

pub mod buffer;
pub mod convert;
pub mod export;
pub mod format;
pub mod host;
pub mod schema;
pub mod util;
pub mod value;
pub mod writer;

// Re-export commonly used types
pub use schema::{AttributeSpec, LayoutDescriptor, SourceKind};
pub use util::{Error, Result};
pub use value::Value;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::buffer::{FirstFramePolicy, FrameBufferSet};
    pub use crate::convert::ConversionRegistry;
    pub use crate::export::manifest::Manifest;
    pub use crate::export::{ExportSettings, ExportSummary, Exporter, FrameRange};
    pub use crate::format::AttributeFormat;
    pub use crate::host::{ExportHost, FrameMesh, SourceFields, TraversalContext};
    pub use crate::schema::{AttributeSpec, LayoutDescriptor, SourceKind};
    pub use crate::util::{Error, Result};
    pub use crate::value::Value;
}
