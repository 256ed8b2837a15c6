use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{debug, warn};

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
pub const ANY_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tiff"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    AnyImage,
    Video,
}

impl MediaKind {
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => IMAGE_EXTENSIONS,
            MediaKind::AnyImage => ANY_IMAGE_EXTENSIONS,
            MediaKind::Video => VIDEO_EXTENSIONS,
        }
    }

    pub fn matches(self, path: &Path) -> bool {
        path.extension()
            .and_then(OsStr::to_str)
            .map(|extension| {
                let extension = extension.to_ascii_lowercase();
                self.extensions().contains(&extension.as_str())
            })
            .unwrap_or(false)
    }
}

/// Lists files of `kind` under `root`, unsorted.
pub fn scan(root: &Path, recursive: bool, kind: MediaKind) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        bail!("path is wrong or isn't a directory: {}", root.display());
    }

    let mut found = Vec::new();
    if recursive {
        walk(root, kind, &mut found);
    } else {
        let entries =
            fs::read_dir(root).with_context(|| format!("cannot read {}", root.display()))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && kind.matches(&path) {
                found.push(path);
            }
        }
    }

    debug!(
        "Scanned {} ({}recursive): {} {kind:?} files",
        root.display(),
        if recursive { "" } else { "non-" },
        found.len()
    );
    Ok(found)
}

fn walk(dir: &Path, kind: MediaKind, found: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("Skipping unreadable directory {}: {err}", dir.display());
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk(&path, kind, found);
        } else if kind.matches(&path) {
            found.push(path);
        }
    }
}

pub fn sort_paths(paths: &mut [PathBuf], natural: bool) {
    if natural {
        alphanumeric_sort::sort_path_slice(paths);
    } else {
        paths.sort();
    }
}

pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
