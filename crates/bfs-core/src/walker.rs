//! Recursive directory enumeration
//!
//! Files come out in whatever order the filesystem returns them. Callers must
//! not assume the order is sorted or stable across platforms.

use crate::{Error, Result};
use std::path::{Component, Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// A regular file found under the walk root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Path on disk
    pub path: PathBuf,
    /// Path relative to the root, components joined with `/`
    pub relative: String,
}

/// Lazily enumerates the files below a root directory
#[derive(Debug, Clone)]
pub struct DirectoryWalker {
    root: PathBuf,
    follow_symlinks: bool,
}

impl DirectoryWalker {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            follow_symlinks: false,
        }
    }

    /// Archive the targets of symbolic links instead of skipping the links
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Iterate over every regular file under the root
    pub fn walk(&self) -> impl Iterator<Item = Result<WalkEntry>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(self.follow_symlinks)
            .min_depth(1)
            .into_iter()
            .filter_map(move |entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        if let Some(ancestor) = e.loop_ancestor() {
                            return Some(Err(Error::Io(std::io::Error::new(
                                std::io::ErrorKind::Other,
                                format!(
                                    "Symlink loop detected at {:?} (points back to {:?})",
                                    e.path().unwrap_or(ancestor),
                                    ancestor
                                ),
                            ))));
                        }
                        return Some(Err(e.into()));
                    }
                };

                let file_type = entry.file_type();
                if file_type.is_symlink() {
                    // Only reachable when links are not followed
                    warn!(path = ?entry.path(), "Skipping symbolic link");
                    return None;
                }
                if !file_type.is_file() {
                    return None;
                }

                Some(
                    relative_path(&self.root, entry.path()).map(|relative| WalkEntry {
                        path: entry.path().to_path_buf(),
                        relative,
                    }),
                )
            })
    }
}

/// Convert `path` to a `/`-separated path relative to `root`
pub fn relative_path(root: &Path, path: &Path) -> Result<String> {
    let stripped = path.strip_prefix(root).map_err(|_| {
        Error::InvalidPath(format!("{:?} is not inside {:?}", path, root))
    })?;

    let mut parts = Vec::new();
    for component in stripped.components() {
        match component {
            Component::Normal(name) => {
                let name = name.to_str().ok_or_else(|| {
                    Error::Validation(format!("Path is not valid UTF-8: {:?}", path))
                })?;
                // Archive readers treat `\` as a separator
                if name.contains('\\') {
                    return Err(Error::Validation(format!(
                        "File name contains a backslash: {:?}",
                        path
                    )));
                }
                parts.push(name);
            }
            Component::CurDir => {}
            other => {
                return Err(Error::InvalidPath(format!(
                    "Unexpected component {:?} in {:?}",
                    other, path
                )))
            }
        }
    }

    if parts.is_empty() {
        return Err(Error::InvalidPath(format!(
            "{:?} has no path relative to {:?}",
            path, root
        )));
    }
    Ok(parts.join("/"))
}
