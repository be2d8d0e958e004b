//! Collaborator interfaces the exporter requires from the host application.
//!
//! The core never reflects over host types. It declares which
//! (source kind, field) pairs it wants and the host resolves them through
//! [`SourceFields`]. Mesh generation, triangulation and transform
//! application are host responsibilities; the core consumes the result as
//! an already-triangulated [`FrameMesh`] snapshot per object per frame.
//!
//! The host must guarantee consistent triangulation across frames: the
//! same logical vertex must land on the same slot index in every frame,
//! otherwise cross-frame interpolation attributes are meaningless.

use crate::util::Result;
use crate::value::Value;

/// Host-provided reflection over one data-bearing node.
///
/// `None` means the field does not exist on this node, which the writer
/// treats as a hard resolution error for the declared schema.
pub trait SourceFields {
    fn field(&self, name: &str) -> Option<Value>;
}

/// One node of a node-based material graph, keyed by its type name.
pub struct MaterialNodeView<'a> {
    /// Node type name, e.g. `"TEX_IMAGE"`. Becomes the source-kind key.
    pub type_name: &'a str,
    pub fields: &'a dyn SourceFields,
}

/// The material assigned to a polygon, plus its graph nodes if any.
pub struct MaterialView<'a> {
    pub fields: &'a dyn SourceFields,
    pub nodes: Vec<MaterialNodeView<'a>>,
}

/// One corner (loop) of a polygon and the per-corner nodes hanging off it.
pub struct CornerView<'a> {
    /// Loop-level node.
    pub fields: &'a dyn SourceFields,
    /// Active UV layer's coordinate node, absent when the object has no
    /// UV layer.
    pub uv: Option<&'a dyn SourceFields>,
    /// Active vertex-color node, absent when the object has no color data.
    pub color: Option<&'a dyn SourceFields>,
    /// The vertex this corner references.
    pub vertex: &'a dyn SourceFields,
}

/// One polygon of a triangulated mesh snapshot.
pub struct PolygonView<'a> {
    pub fields: &'a dyn SourceFields,
    /// Absent when the object has no material in this polygon's slot.
    pub material: Option<MaterialView<'a>>,
    /// Corners in native winding order. Triangulated meshes always carry
    /// three.
    pub corners: Vec<CornerView<'a>>,
}

/// A consistent triangulated snapshot of one object at the active frame.
pub trait FrameMesh {
    /// Total vertex slots: 3 x triangle count.
    fn vertex_count(&self) -> usize;

    fn polygon_count(&self) -> usize;

    /// Polygon `index` in native polygon order.
    fn polygon(&self, index: usize) -> PolygonView<'_>;
}

/// The host application driving an export.
pub trait ExportHost {
    /// Mesh snapshot type produced per (object, frame).
    type Mesh: FrameMesh;

    /// The frame the host currently has evaluated.
    fn current_frame(&self) -> i32;

    /// Set the active frame. The host must fully resolve that frame's
    /// dependent data before returning; traversal starts right after.
    fn set_active_frame(&mut self, frame: i32) -> Result<()>;

    /// Scene-level source node.
    fn scene(&self) -> &dyn SourceFields;

    /// Exportable object names, in stable export order.
    fn objects(&self) -> Vec<String>;

    /// Object-level source node.
    fn object_fields(&self, name: &str) -> Result<&dyn SourceFields>;

    /// Triangulated snapshot of `name` at the active frame.
    fn frame_mesh(&self, name: &str) -> Result<Self::Mesh>;
}

/// Everything a conversion function may look at while one vertex visit
/// is in flight. Rebuilt every corner, never persisted across frames.
pub struct TraversalContext<'a> {
    pub scene: &'a dyn SourceFields,
    pub object: &'a dyn SourceFields,
    pub polygon: Option<&'a dyn SourceFields>,
    /// The loop-level node of the corner being visited.
    pub corner: Option<&'a dyn SourceFields>,
    /// Zero-based index into the export's frame sequence.
    pub frame: i32,
}
