//! Renames converter output to canonical names, stores the thumbnail and
//! zips the `output/` tree.

use crate::error::PackagingError;
use crate::runner::OUTPUT_DIR;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Converter output folder holding the primary asset.
pub const PRIMARY_DIR: &str = "1";
pub const IMAGES_DIR: &str = "images";
pub const SVF_EXTENSION: &str = "svf";

#[derive(Debug, Clone)]
pub enum ThumbnailSource {
    Bytes(Vec<u8>),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    pub archive_path: PathBuf,
    pub svf_path: PathBuf,
    pub thumbnail_path: Option<PathBuf>,
}

/// Finds the converter's primary asset under `output/1/`.
///
/// Prefers `<default_stem>.svf`; otherwise accepts a single `.svf` file.
/// `<reserved>.svf` is never picked by that fallback: it is the rename
/// target, and a file already there is a collision, not the asset.
pub fn locate_svf(
    output_tree: &Path,
    default_stem: &str,
    reserved: Option<&str>,
) -> Result<PathBuf, PackagingError> {
    let dir = output_tree.join(OUTPUT_DIR).join(PRIMARY_DIR);
    let preferred = dir.join(format!("{default_stem}.{SVF_EXTENSION}"));
    if preferred.is_file() {
        return Ok(preferred);
    }
    let reserved = reserved.map(|name| dir.join(format!("{name}.{SVF_EXTENSION}")));

    let entries = std::fs::read_dir(&dir).map_err(|_| PackagingError::MissingSvf { dir: dir.clone() })?;
    let mut found: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|x| x == SVF_EXTENSION))
        .filter(|p| reserved.as_ref() != Some(p))
        .collect();

    match found.len() {
        1 => Ok(found.remove(0)),
        _ => Err(PackagingError::MissingSvf { dir }),
    }
}

#[derive(Debug, Clone, Default)]
pub struct Packager;

impl Packager {
    pub fn new() -> Self {
        Self
    }

    /// Finalizes a translated tree into `<output_tree>/<name>.zip`.
    ///
    /// `svf_path` is the asset found by [`locate_svf`]; callers resolve it
    /// first because the thumbnail stage needs it before packaging.
    ///
    /// With a `canonical_name` the svf is renamed to `<name>.svf` first; an
    /// existing file at that path is never overwritten. Without one, the
    /// located svf's stem names the archive and thumbnail.
    pub fn package(
        &self,
        output_tree: &Path,
        svf_path: &Path,
        canonical_name: Option<&str>,
        thumbnail: Option<&ThumbnailSource>,
    ) -> Result<Package, PackagingError> {
        if !output_tree.is_dir() {
            return Err(PackagingError::MissingOutput {
                path: output_tree.to_path_buf(),
            });
        }
        let output_dir = output_tree.join(OUTPUT_DIR);

        let (name, svf_path) = match canonical_name {
            Some(name) => {
                validate_name(name)?;
                (name.to_string(), rename_svf(&output_dir, svf_path, name)?)
            }
            None => (stem_of(svf_path), svf_path.to_path_buf()),
        };

        let thumbnail_path = match thumbnail {
            Some(src) => Some(write_thumbnail(&output_dir, &name, src)?),
            None => None,
        };

        let archive_path = output_tree.join(format!("{name}.zip"));
        info!("archiving {} -> {}", output_dir.display(), archive_path.display());
        write_archive(&output_dir, &archive_path)?;

        Ok(Package {
            archive_path,
            svf_path,
            thumbnail_path,
        })
    }
}

fn validate_name(name: &str) -> Result<(), PackagingError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);
    if bad {
        return Err(PackagingError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn rename_svf(output_dir: &Path, svf_path: &Path, name: &str) -> Result<PathBuf, PackagingError> {
    let target = output_dir
        .join(PRIMARY_DIR)
        .join(format!("{name}.{SVF_EXTENSION}"));
    if target == svf_path {
        return Ok(target);
    }
    if target.exists() {
        return Err(PackagingError::NameCollision { path: target });
    }
    debug!("renaming {} -> {}", svf_path.display(), target.display());
    std::fs::rename(svf_path, &target).map_err(|source| PackagingError::Io {
        path: svf_path.to_path_buf(),
        source,
    })?;
    Ok(target)
}

fn write_thumbnail(
    output_dir: &Path,
    name: &str,
    src: &ThumbnailSource,
) -> Result<PathBuf, PackagingError> {
    let images = output_dir.join(IMAGES_DIR);
    std::fs::create_dir_all(&images).map_err(|source| PackagingError::Io {
        path: images.clone(),
        source,
    })?;
    let dest = images.join(format!("{name}.jpg"));
    let result = match src {
        ThumbnailSource::Bytes(bytes) => std::fs::write(&dest, bytes),
        ThumbnailSource::File(path) => std::fs::copy(path, &dest).map(|_| ()),
    };
    result.map_err(|source| PackagingError::Io {
        path: dest.clone(),
        source,
    })?;
    Ok(dest)
}

/// Zips `root` with entries relative to it, in sorted order and with fixed
/// timestamps, so identical trees produce identical archives.
pub fn write_archive(root: &Path, archive_path: &Path) -> Result<(), PackagingError> {
    let io_err = |path: &Path, source| PackagingError::Io {
        path: path.to_path_buf(),
        source,
    };
    let zip_err = |source| PackagingError::Zip {
        path: archive_path.to_path_buf(),
        source,
    };

    let file = File::create(archive_path).map_err(|e| io_err(archive_path, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    let base = SimpleFileOptions::default().last_modified_time(DateTime::default());
    let file_opts = base
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);
    let dir_opts = base.unix_permissions(0o755);

    let walker = WalkDir::new(root).min_depth(1).sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|source| PackagingError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let name = entry_name(root, path);

        if entry.file_type().is_dir() {
            zip.add_directory(name, dir_opts).map_err(zip_err)?;
        } else if entry.file_type().is_file() {
            zip.start_file(name, file_opts).map_err(zip_err)?;
            let mut src = File::open(path).map_err(|e| io_err(path, e))?;
            std::io::copy(&mut src, &mut zip).map_err(|e| io_err(path, e))?;
        }
    }

    let mut inner = zip.finish().map_err(zip_err)?;
    inner.flush().map_err(|e| io_err(archive_path, e))?;
    Ok(())
}

fn entry_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
