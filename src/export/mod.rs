//! Export orchestrator.
//!
//! Drives the whole pipeline: compile the schema once, allocate one
//! [`FrameBufferSet`] per object, walk the frame sequence (setting the
//! host's active frame before each traversal), then concatenate every
//! object's buffers (per object in export order, frames in order) into
//! the `.vbx` binary and write the JSON manifest next to it.
//!
//! Nothing touches disk until every frame of every object is complete,
//! so an error mid-export never leaves a parseable-but-half-written
//! file behind.

pub mod manifest;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::buffer::{FirstFramePolicy, FrameBufferSet};
use crate::convert::ConversionRegistry;
use crate::host::{ExportHost, FrameMesh};
use crate::schema::{AttributeSpec, LayoutDescriptor};
use crate::util::{Error, Result};
use crate::writer::{write_object_frame, WriteOptions};

use manifest::{ExporterInfo, Manifest, ManifestSettings, MeshData, ObjectRange};

/// Which frames to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRange {
    /// Only the host's current frame.
    Current,
    /// Every frame from `start` through `end` inclusive, honoring
    /// `step`. A step of 1 exports every frame.
    Range { start: i32, end: i32, step: u32 },
}

impl FrameRange {
    /// Resolve to the concrete frame numbers to visit.
    fn frames(&self, current: i32) -> Vec<i32> {
        match *self {
            FrameRange::Current => vec![current],
            FrameRange::Range { start, end, step } => {
                let step = step.max(1) as i32;
                (start..=end).step_by(step as usize).collect()
            }
        }
    }
}

impl Default for FrameRange {
    fn default() -> Self {
        FrameRange::Current
    }
}

/// Options controlling one export run.
#[derive(Debug, Clone, Default)]
pub struct ExportSettings {
    pub frames: FrameRange,
    /// Visit polygon corners in reverse order.
    pub reverse_winding: bool,
    /// Recorded in the manifest; applying transforms is the host's job.
    pub apply_transforms: bool,
    pub first_frame_policy: FirstFramePolicy,
    /// When true, an object whose fields fail to resolve is dropped from
    /// the export (with a warning and an entry in the summary) instead
    /// of aborting the run. Capacity errors always abort.
    pub skip_failed_objects: bool,
}

/// What an export run produced.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub frame_count: usize,
    pub stride: usize,
    pub bytes_written: u64,
    /// Per-object ranges in export order.
    pub ranges: Vec<(String, ObjectRange)>,
    /// Objects dropped because of resolution failures.
    pub skipped: Vec<String>,
    pub binary_path: PathBuf,
    pub manifest_path: PathBuf,
}

/// A compiled schema plus settings, reusable across export runs.
pub struct Exporter {
    layout: LayoutDescriptor,
    settings: ExportSettings,
}

impl Exporter {
    /// Compile `specs` against `registry`. Schema errors surface here,
    /// before any host interaction or allocation.
    pub fn new(
        specs: &[AttributeSpec],
        registry: &ConversionRegistry,
        settings: ExportSettings,
    ) -> Result<Self> {
        let layout = LayoutDescriptor::compile(specs, registry)?;
        Ok(Self { layout, settings })
    }

    /// The compiled layout.
    pub fn layout(&self) -> &LayoutDescriptor {
        &self.layout
    }

    /// Run a full export. `out_stem` names the output pair: the binary
    /// goes to `<out_stem>.vbx`, the manifest to `<out_stem>.json`.
    pub fn export<H: ExportHost>(&self, host: &mut H, out_stem: impl AsRef<Path>) -> Result<ExportSummary> {
        let binary_path = out_stem.as_ref().with_extension("vbx");
        let manifest_path = out_stem.as_ref().with_extension("json");

        let frames = self.settings.frames.frames(host.current_frame());
        if frames.is_empty() {
            return Err(Error::EmptyFrameRange);
        }
        let frame_count = frames.len();
        let stride = self.layout.stride();

        let object_names = host.objects();
        info!(
            objects = object_names.len(),
            frames = frame_count,
            stride,
            "starting export"
        );

        // Allocation pass at the first frame. The batch index is a side
        // table owned here; host objects are never mutated.
        host.set_active_frame(frames[0])?;
        let mut objects: Vec<ObjectState> = Vec::with_capacity(object_names.len());
        for (batch_index, name) in object_names.into_iter().enumerate() {
            let mesh = host.frame_mesh(&name)?;
            let vertex_count = mesh.vertex_count();
            debug!(object = %name, vertex_count, "allocated buffers");
            objects.push(ObjectState {
                buffers: FrameBufferSet::allocate(vertex_count, frame_count, stride),
                name,
                vertex_count,
                batch_index,
                failed: false,
            });
        }

        let options = WriteOptions {
            reverse_winding: self.settings.reverse_winding,
            first_frame_policy: self.settings.first_frame_policy,
        };

        // Frame loop. The host resolves each frame fully before we read.
        for (frame_index, &frame) in frames.iter().enumerate() {
            host.set_active_frame(frame)?;
            for object in objects.iter_mut().filter(|o| !o.failed) {
                let mesh = host.frame_mesh(&object.name)?;
                let mesh_verts = mesh.vertex_count();
                if mesh_verts != object.vertex_count {
                    return Err(Error::VertexCountChanged {
                        object: object.name.clone(),
                        expected: object.vertex_count,
                        actual: mesh_verts,
                    });
                }
                let object_fields = host.object_fields(&object.name)?;
                let result = write_object_frame(
                    &self.layout,
                    host.scene(),
                    &object.name,
                    object_fields,
                    &mesh,
                    &mut object.buffers,
                    frame_index,
                    &options,
                );
                match result {
                    Ok(()) => {}
                    Err(e) if self.settings.skip_failed_objects && !e.is_capacity() => {
                        warn!(object = %object.name, error = %e, "skipping object");
                        object.failed = true;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        // All buffers complete; only now touch the filesystem.
        let mut writer = BufWriter::new(File::create(&binary_path)?);
        let mut offset = 0u64;
        let mut ranges: Vec<(String, ObjectRange)> = Vec::new();
        let mut skipped = Vec::new();
        for object in &objects {
            if object.failed {
                skipped.push(object.name.clone());
                continue;
            }
            ranges.push((
                object.name.clone(),
                ObjectRange {
                    vertex_count: object.vertex_count,
                    byte_offset: offset,
                    batch_index: object.batch_index,
                },
            ));
            for frame in object.buffers.frames() {
                writer.write_all(frame)?;
                offset += frame.len() as u64;
            }
        }
        writer.flush()?;

        let manifest = self.build_manifest(&binary_path, &ranges, frame_count);
        manifest.save(&manifest_path)?;
        info!(
            bytes = offset,
            binary = %binary_path.display(),
            manifest = %manifest_path.display(),
            "export finished"
        );

        Ok(ExportSummary {
            frame_count,
            stride,
            bytes_written: offset,
            ranges,
            skipped,
            binary_path,
            manifest_path,
        })
    }

    fn build_manifest(
        &self,
        binary_path: &Path,
        ranges: &[(String, ObjectRange)],
        frame_count: usize,
    ) -> Manifest {
        let location = binary_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let range_map: BTreeMap<String, ObjectRange> = ranges.iter().cloned().collect();
        Manifest {
            mesh_data: MeshData {
                location,
                format: self.layout.specs().iter().map(Into::into).collect(),
                ranges: range_map,
            },
            settings: ManifestSettings {
                apply_transforms: self.settings.apply_transforms,
            },
            no_frames: frame_count,
            exporter: ExporterInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            byte_order: "little".to_string(),
        }
    }
}

struct ObjectState {
    name: String,
    buffers: FrameBufferSet,
    vertex_count: usize,
    batch_index: usize,
    failed: bool,
}
