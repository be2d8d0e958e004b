//! JSON manifest accompanying the binary buffer file.
//!
//! The binary stream carries no header; everything a consumer needs to
//! decode it (attribute layout, stride, per-object ranges, frame count
//! and byte order) lives here. Decoding is a matter of replaying
//! `format` against `stride` for `vertex_count` records starting at
//! `byte_offset`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::format::AttributeFormat;
use crate::schema::{AttributeSpec, SourceKind};
use crate::util::{Error, Result};

/// One schema entry as recorded in the manifest, reproducing the
/// declaration exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatEntry {
    pub source_kind: SourceKind,
    pub field: String,
    pub format: String,
}

impl From<&AttributeSpec> for FormatEntry {
    fn from(spec: &AttributeSpec) -> Self {
        Self {
            source_kind: spec.source_kind.clone(),
            field: spec.field.clone(),
            format: spec.format.clone(),
        }
    }
}

/// One object's slice of the binary file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRange {
    /// Vertex records per frame (3 x triangle count).
    pub vertex_count: usize,
    /// Byte offset of this object's first frame in the binary file.
    pub byte_offset: u64,
    /// Stable per-export object index.
    pub batch_index: usize,
}

/// Layout and placement of the mesh data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshData {
    /// Path of the binary file, relative to the manifest.
    pub location: String,
    /// Declared schema in declaration order.
    pub format: Vec<FormatEntry>,
    /// Per-object ranges, keyed by object name.
    pub ranges: BTreeMap<String, ObjectRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestSettings {
    /// Whether the host applied object transforms before handing over
    /// vertex data. Recorded for consumers; the core never transforms.
    pub apply_transforms: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterInfo {
    pub name: String,
    pub version: String,
}

/// The side JSON document describing the binary layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub mesh_data: MeshData,
    pub settings: ManifestSettings,
    /// Number of frames stored per object.
    pub no_frames: usize,
    pub exporter: ExporterInfo,
    /// Byte order of every multi-byte value. Always `"little"`.
    pub byte_order: String,
}

impl Manifest {
    /// Read a manifest from `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let manifest: Manifest = serde_json::from_reader(BufReader::new(file))?;
        if manifest.byte_order != "little" {
            return Err(Error::InvalidManifest(format!(
                "unsupported byte order \"{}\"",
                manifest.byte_order
            )));
        }
        Ok(manifest)
    }

    /// Write the manifest to `path` as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Parse every format entry.
    pub fn formats(&self) -> Result<Vec<AttributeFormat>> {
        self.mesh_data
            .format
            .iter()
            .map(|entry| AttributeFormat::parse(&entry.format))
            .collect()
    }

    /// Vertex record stride implied by the format entries.
    pub fn stride(&self) -> Result<usize> {
        Ok(self.formats()?.iter().map(AttributeFormat::byte_len).sum())
    }

    /// Range entry for `name`.
    pub fn range(&self, name: &str) -> Result<&ObjectRange> {
        self.mesh_data
            .ranges
            .get(name)
            .ok_or_else(|| Error::ObjectNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Manifest {
        let mut ranges = BTreeMap::new();
        ranges.insert(
            "Cube".to_string(),
            ObjectRange {
                vertex_count: 36,
                byte_offset: 0,
                batch_index: 0,
            },
        );
        Manifest {
            mesh_data: MeshData {
                location: "scene.vbx".to_string(),
                format: vec![
                    FormatEntry {
                        source_kind: SourceKind::Vertex,
                        field: "position".to_string(),
                        format: "fff".to_string(),
                    },
                    FormatEntry {
                        source_kind: SourceKind::Uv,
                        field: "uv".to_string(),
                        format: "ff".to_string(),
                    },
                ],
                ranges,
            },
            settings: ManifestSettings {
                apply_transforms: false,
            },
            no_frames: 1,
            exporter: ExporterInfo {
                name: "vbx".to_string(),
                version: "0.1.0".to_string(),
            },
            byte_order: "little".to_string(),
        }
    }

    #[test]
    fn test_stride_from_formats() {
        assert_eq!(sample().stride().unwrap(), 20);
    }

    #[test]
    fn test_save_and_open_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        let manifest = sample();
        manifest.save(&path).unwrap();

        let loaded = Manifest::open(&path).unwrap();
        assert_eq!(loaded.mesh_data.location, "scene.vbx");
        assert_eq!(loaded.mesh_data.format, manifest.mesh_data.format);
        assert_eq!(loaded.range("Cube").unwrap().vertex_count, 36);
        assert_eq!(loaded.no_frames, 1);
    }

    #[test]
    fn test_unknown_object_range() {
        assert!(matches!(
            sample().range("Missing"),
            Err(Error::ObjectNotFound(_))
        ));
    }

    #[test]
    fn test_rejects_big_endian() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        let mut manifest = sample();
        manifest.byte_order = "big".to_string();
        manifest.save(&path).unwrap();
        assert!(matches!(
            Manifest::open(&path),
            Err(Error::InvalidManifest(_))
        ));
    }
}
