//! Traversal engine: resolve, convert, pack and scatter attribute values.
//!
//! For one object at one frame, walks the triangulated mesh polygon by
//! polygon, corner by corner, and writes every declared attribute into
//! the object's [`FrameBufferSet`]. Source kinds are visited in a fixed
//! order per corner: scene, object, polygon, material and its graph
//! nodes, loop, uv, color, vertex. Re-running the same export yields
//! byte-identical output.

use smallvec::SmallVec;
use tracing::trace;

use crate::buffer::{FirstFramePolicy, FrameBufferSet};
use crate::host::{FrameMesh, SourceFields, TraversalContext};
use crate::schema::{FieldOccurrence, LayoutDescriptor, SourceKind};
use crate::util::{Error, Result};
use crate::value::Value;

/// Per-frame write options.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Visit each polygon's corners in reverse declaration order.
    pub reverse_winding: bool,
    /// Handling of frame-offset writes that land before frame 0.
    pub first_frame_policy: FirstFramePolicy,
}

/// Write one object's vertex data for one frame into `buffers`.
///
/// `frame_index` is the zero-based position in the export's frame
/// sequence, not the host's frame number. The vertex slot index advances
/// by one per corner visited, across all polygons; it is never reset per
/// polygon.
///
/// A source kind the layout never mentions costs nothing. A declared
/// field missing on a visited node is a hard error carrying the object,
/// frame and attribute that failed.
pub fn write_object_frame(
    layout: &LayoutDescriptor,
    scene: &dyn SourceFields,
    object_name: &str,
    object: &dyn SourceFields,
    mesh: &dyn FrameMesh,
    buffers: &mut FrameBufferSet,
    frame_index: usize,
    options: &WriteOptions,
) -> Result<()> {
    let mut slot = 0usize;

    for polygon_index in 0..mesh.polygon_count() {
        let polygon = mesh.polygon(polygon_index);

        // Material node kinds depend only on the polygon, not the corner.
        let node_kinds: Vec<SourceKind> = match &polygon.material {
            Some(material) => material
                .nodes
                .iter()
                .map(|node| SourceKind::MaterialNode(node.type_name.to_string()))
                .collect(),
            None => Vec::new(),
        };

        let corner_count = polygon.corners.len();
        let corner_indices: SmallVec<[usize; 4]> = if options.reverse_winding {
            (0..corner_count).rev().collect()
        } else {
            (0..corner_count).collect()
        };

        for corner_index in corner_indices {
            let corner = &polygon.corners[corner_index];
            let ctx = TraversalContext {
                scene,
                object,
                polygon: Some(polygon.fields),
                corner: Some(corner.fields),
                frame: frame_index as i32,
            };
            let mut visit = Visit {
                layout,
                buffers: &mut *buffers,
                slot,
                frame: frame_index,
                object_name,
                ctx: &ctx,
                policy: options.first_frame_policy,
            };

            visit.fetch_attribs(&SourceKind::Scene, scene)?;
            visit.fetch_attribs(&SourceKind::Object, object)?;
            visit.fetch_attribs(&SourceKind::Polygon, polygon.fields)?;
            if let Some(material) = &polygon.material {
                visit.fetch_attribs(&SourceKind::Material, material.fields)?;
                for (node, kind) in material.nodes.iter().zip(&node_kinds) {
                    visit.fetch_attribs(kind, node.fields)?;
                }
            }
            visit.fetch_attribs(&SourceKind::Loop, corner.fields)?;
            if let Some(uv) = corner.uv {
                visit.fetch_attribs(&SourceKind::Uv, uv)?;
            }
            if let Some(color) = corner.color {
                visit.fetch_attribs(&SourceKind::Color, color)?;
            }
            visit.fetch_attribs(&SourceKind::Vertex, corner.vertex)?;

            slot += 1;
        }
    }

    trace!(
        object = object_name,
        frame = frame_index,
        vertices = slot,
        "object frame written"
    );
    Ok(())
}

/// State for one corner visit.
struct Visit<'a, 'b> {
    layout: &'a LayoutDescriptor,
    buffers: &'a mut FrameBufferSet,
    slot: usize,
    frame: usize,
    object_name: &'a str,
    ctx: &'a TraversalContext<'b>,
    policy: FirstFramePolicy,
}

impl Visit<'_, '_> {
    /// Resolve and write every occurrence the layout declares for
    /// `kind`, reading fields from `node`.
    fn fetch_attribs(&mut self, kind: &SourceKind, node: &dyn SourceFields) -> Result<()> {
        let Some(fields) = self.layout.fields(kind) else {
            return Ok(());
        };
        for (field, occurrences) in fields {
            let raw = node.field(field).ok_or_else(|| Error::FieldNotFound {
                source_kind: kind.to_string(),
                field: field.clone(),
                object: self.object_name.to_string(),
                frame: self.frame as i32,
            })?;
            for occurrence in occurrences {
                self.write_occurrence(occurrence, &raw)
                    .map_err(|source| Error::AttributeWrite {
                        source_kind: kind.to_string(),
                        field: field.clone(),
                        object: self.object_name.to_string(),
                        frame: self.frame as i32,
                        source: Box::new(source),
                    })?;
            }
        }
        Ok(())
    }

    fn write_occurrence(&mut self, occurrence: &FieldOccurrence, raw: &Value) -> Result<()> {
        let value = match &occurrence.conversion {
            Some(conversion) => conversion.apply(raw, self.ctx, occurrence.args.as_ref())?,
            None => raw.clone(),
        };

        let mut packed: SmallVec<[u8; 16]> = SmallVec::new();
        packed.resize(occurrence.byte_len, 0);
        occurrence.format.pack(&value, &mut packed)?;

        let Some(target) = self.policy.target_frame(
            self.frame,
            occurrence.frame_offset,
            self.buffers.frame_count(),
        ) else {
            // Frame-offset write before the first frame, dropped by policy.
            return Ok(());
        };
        self.buffers.write(target, self.slot, occurrence.offset, &packed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ConversionRegistry;
    use crate::host::{CornerView, MaterialNodeView, MaterialView, PolygonView};
    use crate::schema::AttributeSpec;
    use crate::value::Value;
    use byteorder::{ByteOrder, LittleEndian};
    use std::collections::HashMap;

    /// Field map backed by a HashMap, the mock stand-in for host
    /// reflection.
    #[derive(Default, Clone)]
    struct Fields(HashMap<String, Value>);

    impl Fields {
        fn with(mut self, name: &str, value: Value) -> Self {
            self.0.insert(name.to_string(), value);
            self
        }
    }

    impl SourceFields for Fields {
        fn field(&self, name: &str) -> Option<Value> {
            self.0.get(name).cloned()
        }
    }

    struct TriMesh {
        polygon: Fields,
        material: Option<Fields>,
        material_nodes: Vec<(String, Fields)>,
        corners: Vec<(Fields, Option<Fields>, Option<Fields>, Fields)>,
    }

    impl TriMesh {
        fn single(corners: Vec<(Fields, Option<Fields>, Option<Fields>, Fields)>) -> Self {
            Self {
                polygon: Fields::default(),
                material: None,
                material_nodes: Vec::new(),
                corners,
            }
        }
    }

    impl FrameMesh for TriMesh {
        fn vertex_count(&self) -> usize {
            self.corners.len()
        }

        fn polygon_count(&self) -> usize {
            1
        }

        fn polygon(&self, _index: usize) -> PolygonView<'_> {
            PolygonView {
                fields: &self.polygon,
                material: self.material.as_ref().map(|m| MaterialView {
                    fields: m,
                    nodes: self
                        .material_nodes
                        .iter()
                        .map(|(type_name, fields)| MaterialNodeView {
                            type_name,
                            fields,
                        })
                        .collect(),
                }),
                corners: self
                    .corners
                    .iter()
                    .map(|(fields, uv, color, vertex)| CornerView {
                        fields,
                        uv: uv.as_ref().map(|f| f as &dyn SourceFields),
                        color: color.as_ref().map(|f| f as &dyn SourceFields),
                        vertex,
                    })
                    .collect(),
            }
        }
    }

    fn compile(specs: &[AttributeSpec]) -> LayoutDescriptor {
        LayoutDescriptor::compile(specs, &ConversionRegistry::with_builtins()).unwrap()
    }

    fn corner(position: [f64; 3], uv: [f64; 2]) -> (Fields, Option<Fields>, Option<Fields>, Fields) {
        (
            Fields::default(),
            Some(Fields::default().with("uv", Value::vec2(uv[0], uv[1]))),
            None,
            Fields::default().with("position", Value::vec3(position[0], position[1], position[2])),
        )
    }

    #[test]
    fn test_worked_example_triangle() {
        // stride 12 + 8 = 20, one triangle = 60 bytes per frame.
        let layout = compile(&[
            AttributeSpec::new(SourceKind::Vertex, "position", "fff").with_conversion("invert_y"),
            AttributeSpec::new(SourceKind::Uv, "uv", "ff").with_conversion("invert_v"),
        ]);
        assert_eq!(layout.stride(), 20);

        let mesh = TriMesh::single(vec![
            corner([1.0, 2.0, 3.0], [0.0, 0.0]),
            corner([4.0, 5.0, 6.0], [1.0, 0.0]),
            corner([7.0, 8.0, 9.0], [0.0, 1.0]),
        ]);
        let mut buffers = FrameBufferSet::allocate(3, 1, layout.stride());
        let scene = Fields::default();
        let object = Fields::default();

        write_object_frame(
            &layout,
            &scene,
            "Triangle",
            &object,
            &mesh,
            &mut buffers,
            0,
            &WriteOptions::default(),
        )
        .unwrap();

        let frame = buffers.frame(0).unwrap();
        assert_eq!(frame.len(), 60);

        // Slot 0: position (1, -2, 3) then uv (0, 1).
        assert_eq!(LittleEndian::read_f32(&frame[0..4]), 1.0);
        assert_eq!(LittleEndian::read_f32(&frame[4..8]), -2.0);
        assert_eq!(LittleEndian::read_f32(&frame[8..12]), 3.0);
        assert_eq!(LittleEndian::read_f32(&frame[12..16]), 0.0);
        assert_eq!(LittleEndian::read_f32(&frame[16..20]), 1.0);

        // Slot 2 starts at byte 40: position (7, -8, 9).
        assert_eq!(LittleEndian::read_f32(&frame[40..44]), 7.0);
        assert_eq!(LittleEndian::read_f32(&frame[44..48]), -8.0);
    }

    #[test]
    fn test_absent_source_kind_is_noop_and_stays_zero() {
        // Material declared in the schema but the mesh has none.
        let layout = compile(&[
            AttributeSpec::new(SourceKind::Vertex, "position", "fff"),
            AttributeSpec::new(SourceKind::Material, "diffuse_color", "BBBB"),
        ]);
        let mesh = TriMesh::single(vec![
            corner([1.0, 0.0, 0.0], [0.0, 0.0]),
            corner([0.0, 1.0, 0.0], [0.0, 0.0]),
            corner([0.0, 0.0, 1.0], [0.0, 0.0]),
        ]);
        let mut buffers = FrameBufferSet::allocate(3, 1, layout.stride());

        write_object_frame(
            &layout,
            &Fields::default(),
            "NoMaterial",
            &Fields::default(),
            &mesh,
            &mut buffers,
            0,
            &WriteOptions::default(),
        )
        .unwrap();

        let frame = buffers.frame(0).unwrap();
        for slot in 0..3 {
            let start = slot * 16 + 12;
            assert_eq!(&frame[start..start + 4], &[0, 0, 0, 0]);
        }
    }

    #[test]
    fn test_missing_field_is_hard_error() {
        let layout = compile(&[AttributeSpec::new(SourceKind::Vertex, "normal", "fff")]);
        let mesh = TriMesh::single(vec![corner([0.0; 3], [0.0; 2])]);
        let mut buffers = FrameBufferSet::allocate(1, 1, layout.stride());

        let err = write_object_frame(
            &layout,
            &Fields::default(),
            "Cube",
            &Fields::default(),
            &mesh,
            &mut buffers,
            0,
            &WriteOptions::default(),
        )
        .unwrap_err();
        match err {
            Error::FieldNotFound { field, object, .. } => {
                assert_eq!(field, "normal");
                assert_eq!(object, "Cube");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_frame_offset_writes_previous_frame() {
        let layout = compile(&[
            AttributeSpec::new(SourceKind::Vertex, "position", "fff"),
            AttributeSpec::new(SourceKind::Vertex, "position", "fff").with_frame_offset(1),
        ]);
        assert_eq!(layout.stride(), 24);

        let mut buffers = FrameBufferSet::allocate(1, 2, layout.stride());
        let scene = Fields::default();
        let object = Fields::default();

        // Frame 0: position (0, 0, 0). Frame 1: position (5, 0, 0).
        for (frame, x) in [(0usize, 0.0f64), (1, 5.0)] {
            let mesh = TriMesh::single(vec![(
                Fields::default(),
                None,
                None,
                Fields::default().with("position", Value::vec3(x, 0.0, 0.0)),
            )]);
            write_object_frame(
                &layout,
                &scene,
                "Morph",
                &object,
                &mesh,
                &mut buffers,
                frame,
                &WriteOptions::default(),
            )
            .unwrap();
        }

        let frame0 = buffers.frame(0).unwrap();
        let frame1 = buffers.frame(1).unwrap();
        // Frame 0 holds its own value and frame 1's value in the
        // next-frame slot.
        assert_eq!(LittleEndian::read_f32(&frame0[0..4]), 0.0);
        assert_eq!(LittleEndian::read_f32(&frame0[12..16]), 5.0);
        // Frame 1's own slot matches the value stamped into frame 0.
        assert_eq!(LittleEndian::read_f32(&frame1[0..4]), 5.0);
        // Frame 1's next-frame slot stays zero (no frame 2, and the
        // frame-0 visit's offset write was dropped).
        assert_eq!(LittleEndian::read_f32(&frame1[12..16]), 0.0);
    }

    #[test]
    fn test_reverse_winding_flips_corner_order() {
        let layout = compile(&[AttributeSpec::new(SourceKind::Vertex, "position", "fff")]);
        let mesh = TriMesh::single(vec![
            corner([1.0, 0.0, 0.0], [0.0; 2]),
            corner([2.0, 0.0, 0.0], [0.0; 2]),
            corner([3.0, 0.0, 0.0], [0.0; 2]),
        ]);
        let mut buffers = FrameBufferSet::allocate(3, 1, layout.stride());

        write_object_frame(
            &layout,
            &Fields::default(),
            "Reversed",
            &Fields::default(),
            &mesh,
            &mut buffers,
            0,
            &WriteOptions {
                reverse_winding: true,
                ..Default::default()
            },
        )
        .unwrap();

        let frame = buffers.frame(0).unwrap();
        assert_eq!(LittleEndian::read_f32(&frame[0..4]), 3.0);
        assert_eq!(LittleEndian::read_f32(&frame[12..16]), 2.0);
        assert_eq!(LittleEndian::read_f32(&frame[24..28]), 1.0);
    }

    #[test]
    fn test_material_node_source_kind() {
        let layout = compile(&[
            AttributeSpec::new(SourceKind::Vertex, "position", "fff"),
            AttributeSpec::new(
                SourceKind::MaterialNode("TEX_IMAGE".to_string()),
                "scale",
                "f",
            ),
        ]);
        let mut mesh = TriMesh::single(vec![corner([0.0; 3], [0.0; 2])]);
        mesh.material = Some(Fields::default());
        mesh.material_nodes = vec![(
            "TEX_IMAGE".to_string(),
            Fields::default().with("scale", Value::Float(2.5)),
        )];

        let mut buffers = FrameBufferSet::allocate(1, 1, layout.stride());
        write_object_frame(
            &layout,
            &Fields::default(),
            "Textured",
            &Fields::default(),
            &mesh,
            &mut buffers,
            0,
            &WriteOptions::default(),
        )
        .unwrap();

        let frame = buffers.frame(0).unwrap();
        assert_eq!(LittleEndian::read_f32(&frame[12..16]), 2.5);
    }

    #[test]
    fn test_conversion_arity_mismatch_is_error() {
        // BBBB declared, invert_y returns 3 components.
        let layout = compile(&[
            AttributeSpec::new(SourceKind::Vertex, "position", "BBBB").with_conversion("invert_y"),
        ]);
        let mesh = TriMesh::single(vec![corner([1.0, 2.0, 3.0], [0.0; 2])]);
        let mut buffers = FrameBufferSet::allocate(1, 1, layout.stride());

        let err = write_object_frame(
            &layout,
            &Fields::default(),
            "Mismatch",
            &Fields::default(),
            &mesh,
            &mut buffers,
            0,
            &WriteOptions::default(),
        )
        .unwrap_err();
        match err {
            Error::AttributeWrite { source, .. } => {
                assert!(matches!(*source, Error::ComponentCount { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
