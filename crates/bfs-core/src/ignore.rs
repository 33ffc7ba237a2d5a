//! Ignore-list loading and matching
//!
//! The ignore list is a plain text file with one root-relative path per line.
//! Matching is exact string equality; there are no wildcards. Both the lines
//! and the candidate paths go through [`normalize_relative`] so that
//! `sub\file.txt`, `./sub/file.txt` and `sub/file.txt` all name the same entry.

use crate::Result;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Name of the ignore-list file looked up at the root of the input directory
pub const IGNORE_FILE_NAME: &str = "BFS_IGNORE";

/// Canonical form of a root-relative path: forward slashes, no leading `./`,
/// no surrounding whitespace or trailing carriage return.
pub fn normalize_relative(path: &str) -> String {
    let mut normalized = path.trim().replace('\\', "/");
    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_string();
    }
    normalized
}

/// Set of root-relative paths excluded from an archive
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    entries: Vec<String>,
    lookup: HashSet<String>,
}

impl IgnoreList {
    /// Empty list that includes everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the text of an ignore file. Blank lines are skipped.
    pub fn parse(contents: &str) -> Self {
        let mut list = Self::new();
        for line in contents.lines() {
            list.insert(line);
        }
        list
    }

    /// Load an ignore file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let list = Self::parse(&contents);
        debug!(path = ?path, entries = list.len(), "Loaded ignore list");
        Ok(list)
    }

    /// Load `file_name` from `root` if it exists, otherwise return an empty list
    pub fn load_from_root<P: AsRef<Path>>(root: P, file_name: &str) -> Result<Self> {
        let path = root.as_ref().join(file_name);
        if path.is_file() {
            Self::load(path)
        } else {
            debug!(path = ?path, "No ignore list found");
            Ok(Self::new())
        }
    }

    /// Add a path to the list
    pub fn insert(&mut self, path: &str) {
        let normalized = normalize_relative(path);
        if normalized.is_empty() {
            return;
        }
        if self.lookup.insert(normalized.clone()) {
            self.entries.push(normalized);
        }
    }

    /// Whether `relative_path` should be packed
    pub fn should_include(&self, relative_path: &str) -> bool {
        !self.lookup.contains(&normalize_relative(relative_path))
    }

    /// Entries in file order
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
