//! Common test fixtures for bfs testing

use crate::TestDir;
use anyhow::Result;

/// The two-file tree used throughout the format documentation
pub fn create_hello_world(test_dir: &TestDir) -> Result<()> {
    test_dir.create_file("a.txt", b"hello")?;
    test_dir.create_file("sub/b.txt", b"world")?;
    Ok(())
}

/// Creates a standard test file structure
pub fn create_test_files(test_dir: &TestDir) -> Result<()> {
    // Text files
    test_dir.create_file("file1.txt", b"This is file 1 content.")?;
    test_dir.create_file("file2.txt", b"This is file 2 content.")?;

    // Directory structure
    test_dir.create_file("subdir/file3.txt", b"This is file 3 in subdir.")?;
    test_dir.create_file("subdir/nested/deep.txt", b"Deeply nested.")?;

    // Binary file with every byte value, NUL included
    let binary: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    test_dir.create_file("data.bin", &binary)?;

    // Empty file
    test_dir.create_file("empty.txt", b"")?;

    // Large compressible file
    let large_content = "x".repeat(1024 * 1024); // 1MB
    test_dir.create_file("large.log", large_content.as_bytes())?;

    Ok(())
}

/// Creates a tree with an ignore list at its root
pub fn create_ignored_structure(test_dir: &TestDir, ignore_file_name: &str) -> Result<()> {
    test_dir.create_file("keep.txt", b"kept")?;
    test_dir.create_file("secret.txt", b"do not pack")?;
    test_dir.create_file("build/output.bin", &[0xDE, 0xAD, 0xBE, 0xEF])?;
    test_dir.create_file("build/keep.bin", &[0x01])?;
    test_dir.create_file(ignore_file_name, b"secret.txt\nbuild/output.bin\n")?;
    Ok(())
}
