use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use proctor_core::{LoadedManifest, TestManifest};
use tracing::debug;
use walkdir::WalkDir;

/// Manifests larger than this are rejected unread.
pub const MAX_MANIFEST_BYTES: u64 = 1024 * 1024;

const EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Load every manifest reachable from `paths`, in argument order.
pub fn load_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<LoadedManifest>> {
    let mut manifests = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let loaded = load_path(path).with_context(|| format!("load {}", path.display()))?;
        manifests.extend(loaded);
    }
    Ok(manifests)
}

/// A file is loaded as-is; a directory is walked recursively for `.yaml` and
/// `.yml` files in sorted order.
pub fn load_path(path: &Path) -> Result<Vec<LoadedManifest>> {
    let manifests = manifest_files(path)?
        .iter()
        .map(|file| load_file(file))
        .collect::<Result<Vec<_>>>()?;
    debug!(path = %path.display(), count = manifests.len(), "loaded manifests");
    Ok(manifests)
}

/// Manifest files reachable from `path`, using the same rules as `load_path`.
pub fn manifest_files(path: &Path) -> Result<Vec<PathBuf>> {
    let meta = std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
    if !meta.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", path.display()))?;
        if entry.file_type().is_file() && is_manifest_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

pub fn load_file(path: &Path) -> Result<LoadedManifest> {
    let text = read_manifest(path)?;
    let mut manifest: TestManifest =
        serde_yaml::from_str(&text).with_context(|| format!("parse manifest yaml: {}", path.display()))?;

    if manifest.name.is_empty() {
        manifest.name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    Ok(LoadedManifest::new(manifest, path))
}

/// Raw manifest text, subject to `MAX_MANIFEST_BYTES`.
pub fn read_manifest(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let size = file.metadata().with_context(|| format!("stat {}", path.display()))?.len();
    if size > MAX_MANIFEST_BYTES {
        bail!("{} is {size} bytes; manifests are limited to {MAX_MANIFEST_BYTES}", path.display());
    }

    let mut text = String::new();
    file.take(MAX_MANIFEST_BYTES)
        .read_to_string(&mut text)
        .with_context(|| format!("read {}", path.display()))?;
    Ok(text)
}

fn is_manifest_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
}
