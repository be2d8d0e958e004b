//! vbx CLI - inspect exported vertex buffer files via their manifest.

use std::path::{Path, PathBuf};
use std::process::exit;

use vbx::export::manifest::Manifest;
use vbx::format::AttributeFormat;
use vbx::util::{Error, Result};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Parse global flags
    let mut level = "info";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            _ => filtered_args.push(arg),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .init();

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let result = match filtered_args[0] {
        "info" | "i" => match filtered_args.get(1) {
            Some(path) => cmd_info(Path::new(path)),
            None => {
                eprintln!("Usage: vbx info <manifest.json>");
                exit(2);
            }
        },
        "dump" | "d" => {
            let Some(path) = filtered_args.get(1) else {
                eprintln!("Usage: vbx dump <manifest.json> [object] [--frame N] [--max N]");
                exit(2);
            };
            let mut object: Option<&str> = None;
            let mut frame = 0usize;
            let mut max_records = 12usize;
            let mut rest = filtered_args[2..].iter();
            while let Some(arg) = rest.next() {
                match *arg {
                    "--frame" => frame = parse_number(rest.next(), "--frame"),
                    "--max" => max_records = parse_number(rest.next(), "--max"),
                    other => object = Some(other),
                }
            }
            cmd_dump(Path::new(path), object, frame, max_records)
        }
        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_help();
            exit(2);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        exit(1);
    }
}

fn parse_number(arg: Option<&&str>, flag: &str) -> usize {
    match arg.and_then(|s| s.parse().ok()) {
        Some(n) => n,
        None => {
            eprintln!("{flag} requires a number");
            exit(2);
        }
    }
}

fn cmd_info(path: &Path) -> Result<()> {
    let manifest = Manifest::open(path)?;
    let stride = manifest.stride()?;

    println!("Manifest:   {}", path.display());
    println!("Binary:     {}", manifest.mesh_data.location);
    println!(
        "Exporter:   {} {}",
        manifest.exporter.name, manifest.exporter.version
    );
    println!("Byte order: {}", manifest.byte_order);
    println!("Frames:     {}", manifest.no_frames);
    println!("Stride:     {stride} bytes");
    println!(
        "Transforms: {}",
        if manifest.settings.apply_transforms {
            "applied by host"
        } else {
            "not applied"
        }
    );

    println!("\nLayout:");
    let mut offset = 0usize;
    for entry in &manifest.mesh_data.format {
        let len = AttributeFormat::parse(&entry.format)?.byte_len();
        println!(
            "  {:>3}..{:<3} {} {}.{}",
            offset,
            offset + len,
            entry.format,
            entry.source_kind,
            entry.field
        );
        offset += len;
    }

    println!("\nObjects:");
    for (name, range) in &manifest.mesh_data.ranges {
        let bytes = range.vertex_count * stride * manifest.no_frames;
        println!(
            "  {name}: {} vertices, offset {}, {} bytes, batch {}",
            range.vertex_count, range.byte_offset, bytes, range.batch_index
        );
    }
    Ok(())
}

fn cmd_dump(path: &Path, object: Option<&str>, frame: usize, max_records: usize) -> Result<()> {
    let manifest = Manifest::open(path)?;
    let stride = manifest.stride()?;
    let formats = manifest.formats()?;
    let binary_path = binary_location(path, &manifest);
    let data = std::fs::read(&binary_path)?;

    let name = match object {
        Some(name) => name.to_string(),
        None => manifest
            .mesh_data
            .ranges
            .keys()
            .next()
            .cloned()
            .ok_or_else(|| Error::InvalidManifest("manifest lists no objects".to_string()))?,
    };
    let range = manifest.range(&name)?;
    if frame >= manifest.no_frames {
        return Err(Error::FrameOutOfBounds {
            index: frame,
            count: manifest.no_frames,
        });
    }

    let frame_bytes = range.vertex_count * stride;
    let start = range.byte_offset as usize + frame * frame_bytes;
    let end = start + frame_bytes;
    if end > data.len() {
        return Err(Error::InvalidManifest(format!(
            "range for \"{name}\" extends past the end of {}",
            binary_path.display()
        )));
    }

    println!(
        "{name}, frame {frame}: {} vertices ({} shown)",
        range.vertex_count,
        max_records.min(range.vertex_count)
    );
    for slot in 0..range.vertex_count.min(max_records) {
        let record = &data[start + slot * stride..start + (slot + 1) * stride];
        let mut fields = Vec::new();
        let mut pos = 0usize;
        for (entry, format) in manifest.mesh_data.format.iter().zip(&formats) {
            let len = format.byte_len();
            let value = format.unpack(&record[pos..pos + len])?;
            fields.push(format!("{}.{}={:?}", entry.source_kind, entry.field, value));
            pos += len;
        }
        println!("  [{slot}] {}", fields.join(" "));
    }
    Ok(())
}

/// The binary lives next to the manifest; `location` is relative to it.
fn binary_location(manifest_path: &Path, manifest: &Manifest) -> PathBuf {
    manifest_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(&manifest.mesh_data.location)
}

fn print_help() {
    println!("vbx - vertex buffer export inspector");
    println!();
    println!("Usage: vbx [flags] <command> [args]");
    println!();
    println!("Commands:");
    println!("  info <manifest.json>                         Show layout, ranges and frame count");
    println!("  dump <manifest.json> [object] [--frame N] [--max N]");
    println!("                                               Decode and print vertex records");
    println!("  help                                         Show this help");
    println!();
    println!("Flags:");
    println!("  -v, --verbose    Debug logging");
    println!("  -vv, --trace     Trace logging");
    println!("  -q, --quiet      Errors only");
}
