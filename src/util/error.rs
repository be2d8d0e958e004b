//! Error types for the vbx exporter core.

use thiserror::Error;

/// Main error type for export operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Schema errors (raised at compile time, before any allocation) ===
    /// Format string contains no codes
    #[error("Empty format string")]
    EmptyFormat,

    /// Format string contains a code outside the supported alphabet
    #[error("Unknown format code '{code}' in \"{format}\"")]
    UnknownFormatCode { code: char, format: String },

    /// Conversion name not present in the registry
    #[error("Unknown conversion function: {0}")]
    UnknownConversion(String),

    /// Frame offset outside the supported range
    #[error("Invalid frame offset {0} (must be 0 or 1)")]
    InvalidFrameOffset(u8),

    /// Wraps any of the above with the offending declaration's position
    #[error("Attribute {index} ({source_kind}.{field}): {source}")]
    Attribute {
        index: usize,
        source_kind: String,
        field: String,
        #[source]
        source: Box<Error>,
    },

    // === Resolution errors (raised during traversal) ===
    /// Declared field missing on a visited source node
    #[error("Field \"{field}\" not found on {source_kind} (object \"{object}\", frame {frame})")]
    FieldNotFound {
        source_kind: String,
        field: String,
        object: String,
        frame: i32,
    },

    // === Capacity errors (fatal, never recoverable) ===
    /// Vertex slot beyond the allocation-time vertex count
    #[error("Vertex slot {slot} out of bounds (allocated {vertex_count} vertices)")]
    VertexOverflow { slot: usize, vertex_count: usize },

    /// Frame buffer index beyond the allocated set
    #[error("Frame index {index} out of bounds (count: {count})")]
    FrameOutOfBounds { index: usize, count: usize },

    /// Byte range extends past the per-vertex stride
    #[error("Byte range at offset {offset} (length {len}) exceeds stride {stride}")]
    StrideOverflow {
        offset: usize,
        len: usize,
        stride: usize,
    },

    /// Triangulation changed between allocation and write
    #[error("Vertex count for \"{object}\" changed from {expected} to {actual} between frames")]
    VertexCountChanged {
        object: String,
        expected: usize,
        actual: usize,
    },

    // === Conversion and packing errors ===
    /// Conversion function rejected its input or arguments
    #[error("Conversion \"{name}\" failed: {reason}")]
    ConversionFailed { name: String, reason: String },

    /// Value shape incompatible with the declared format
    #[error("Value mismatch for format \"{format}\": {reason}")]
    ValueMismatch { format: String, reason: String },

    /// Vector value has fewer components than the format consumes
    #[error("Format \"{format}\" needs {expected} components, value has {actual}")]
    ComponentCount {
        format: String,
        expected: usize,
        actual: usize,
    },

    /// Adds object/frame/attribute context to a traversal-time failure
    #[error("Writing {source_kind}.{field} for object \"{object}\" at frame {frame}: {source}")]
    AttributeWrite {
        source_kind: String,
        field: String,
        object: String,
        frame: i32,
        #[source]
        source: Box<Error>,
    },

    // === Orchestration ===
    /// Frame selection resolved to zero frames
    #[error("Frame range is empty")]
    EmptyFrameRange,

    /// Object named in a request but not known to the host
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// Host collaborator reported a failure
    #[error("Host error: {0}")]
    Host(String),

    // === Manifest and I/O ===
    /// Manifest is structurally valid JSON but semantically unusable
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for buffer-capacity violations, which abort the whole export
    /// even when per-object skipping is enabled.
    pub fn is_capacity(&self) -> bool {
        match self {
            Error::VertexOverflow { .. }
            | Error::FrameOutOfBounds { .. }
            | Error::StrideOverflow { .. }
            | Error::VertexCountChanged { .. } => true,
            Error::AttributeWrite { source, .. } | Error::Attribute { source, .. } => {
                source.is_capacity()
            }
            _ => false,
        }
    }
}

/// Result type alias using the vbx [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
