//! Common assertions for bfs testing

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

/// Maps every regular file under `dir` to its contents, keyed by the
/// `/`-separated path relative to `dir`
pub fn collect_files(dir: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)?
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        files.insert(relative, std::fs::read(entry.path())?);
    }
    Ok(files)
}

/// Asserts that two directory trees hold the same files with the same bytes
pub fn assert_dirs_equal(dir1: &Path, dir2: &Path) -> Result<()> {
    let files1 = collect_files(dir1)?;
    let files2 = collect_files(dir2)?;

    assert_eq!(
        files1.keys().collect::<Vec<_>>(),
        files2.keys().collect::<Vec<_>>(),
        "Different file sets in {:?} and {:?}",
        dir1,
        dir2
    );

    for (path, content1) in &files1 {
        assert!(
            content1 == &files2[path],
            "Content mismatch for {:?}",
            path
        );
    }

    Ok(())
}

/// Asserts that `copy` holds the files of `source` minus `excluded`
pub fn assert_dirs_equal_except(source: &Path, copy: &Path, excluded: &[&str]) -> Result<()> {
    let mut expected = collect_files(source)?;
    for path in excluded {
        expected.remove(*path);
    }
    let actual = collect_files(copy)?;

    assert_eq!(
        expected.keys().collect::<Vec<_>>(),
        actual.keys().collect::<Vec<_>>(),
        "Different file sets"
    );
    for (path, content) in &expected {
        assert!(content == &actual[path], "Content mismatch for {:?}", path);
    }
    Ok(())
}
