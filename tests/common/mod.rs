#![allow(dead_code)]

use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::path::{Path, PathBuf};

/// Writes an executable shell script at `dir/rel`.
#[cfg(unix)]
pub fn write_script(dir: &Path, rel: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Text container with an embedded thumbnail block split over two lines.
pub fn wire_with_marker(bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    let (a, b) = encoded.split_at(encoded.len() / 2);
    format!("header line\nthumbnail JPEG\nTh {a}\nTh {b}\nthumbnail end\ntrailing geometry\n")
}

/// Converter stand-in: writes `output/1/<stem>.svf` and a sibling resource
/// next to the manifest it is given.
pub const CONVERTER_OK: &str = r#"root=$(dirname "$1")
stem=$(basename "$2")
stem="${stem%.*}"
mkdir -p "$root/output/1"
printf 'svf-data' > "$root/output/1/$stem.svf"
printf 'pack' > "$root/output/1/0.pf"
"#;

/// Renderer stand-in: `svf -outpath=DIR -size=N ...` writes the expected PNG.
pub const RENDERER_OK: &str = r#"out="${2#-outpath=}"
size="${3#-size=}"
printf 'png-bytes' > "$out/01_thumb_${size}x${size}.png"
"#;

/// Metadata extractor stand-in: `--icv OUT SOURCE` writes a JPEG to OUT.
pub const METADATA_OK: &str = r#"printf 'jpeg-from-metadata' > "$2""#;
