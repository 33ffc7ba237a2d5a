//! End-to-end pack and extract tests

use bfs_core::archive::{self, PackOptions};
use bfs_core::codec::StoreCodec;
use bfs_core::{extract, inspect_file, pack, Algorithm, ErrorKind, ExtractOptions};
use bfs_testing::assertions::{assert_dirs_equal, collect_files};
use bfs_testing::fixtures::{create_hello_world, create_test_files};
use bfs_testing::TestDir;
use std::fs;

fn options(algorithm: Algorithm) -> (PackOptions, ExtractOptions) {
    let pack = PackOptions {
        algorithm,
        ..PackOptions::default()
    };
    let extract = ExtractOptions {
        algorithm,
        ..ExtractOptions::default()
    };
    (pack, extract)
}

#[test]
fn test_round_trip_every_codec() {
    let source = TestDir::new().unwrap();
    create_test_files(&source).unwrap();

    for algorithm in Algorithm::ALL {
        let work = TestDir::new().unwrap();
        let archive_path = work.join("tree.bfs");
        let output = work.join("out");
        let (pack_opts, extract_opts) = options(algorithm);

        let summary = pack(source.path(), &archive_path, &pack_opts).unwrap();
        assert_eq!(summary.entries, 7, "{}", algorithm);
        assert_eq!(
            summary.archive_size,
            fs::metadata(&archive_path).unwrap().len()
        );

        let decoded = extract(&archive_path, &output, &extract_opts).unwrap();
        assert_eq!(decoded.entries, 7, "{}", algorithm);
        assert_dirs_equal(source.path(), &output).unwrap();
    }
}

#[test]
fn test_extracting_twice_gives_identical_trees() {
    let source = TestDir::new().unwrap();
    create_test_files(&source).unwrap();
    let work = TestDir::new().unwrap();
    let (pack_opts, extract_opts) = options(Algorithm::Gzip);
    pack(source.path(), work.join("a.bfs"), &pack_opts).unwrap();

    extract(work.join("a.bfs"), work.join("one"), &extract_opts).unwrap();
    extract(work.join("a.bfs"), work.join("two"), &extract_opts).unwrap();
    assert_dirs_equal(&work.join("one"), &work.join("two")).unwrap();
}

#[test]
fn test_repacking_extracted_tree_is_equivalent() {
    let source = TestDir::new().unwrap();
    create_test_files(&source).unwrap();
    let work = TestDir::new().unwrap();
    let (pack_opts, extract_opts) = options(Algorithm::Lz4);

    pack(source.path(), work.join("first.bfs"), &pack_opts).unwrap();
    extract(work.join("first.bfs"), work.join("first"), &extract_opts).unwrap();
    pack(work.join("first"), work.join("second.bfs"), &pack_opts).unwrap();
    extract(work.join("second.bfs"), work.join("second"), &extract_opts).unwrap();

    assert_dirs_equal(&work.join("first"), &work.join("second")).unwrap();
    assert_dirs_equal(source.path(), &work.join("second")).unwrap();
}

#[test]
fn test_hello_world_layout_with_store_codec() {
    let source = TestDir::new().unwrap();
    create_hello_world(&source).unwrap();
    let work = TestDir::new().unwrap();
    let archive_path = work.join("hello.bfs");
    let (pack_opts, _) = options(Algorithm::Store);

    pack(source.path(), &archive_path, &pack_opts).unwrap();
    let bytes = fs::read(&archive_path).unwrap();

    let a_entry: &[u8] = b"a.txt\0\x05\x00\x00\x00hello";
    let b_entry: &[u8] = b"sub/b.txt\0\x05\x00\x00\x00world";
    let first = [b"BFS".as_slice(), a_entry, b_entry].concat();
    let second = [b"BFS".as_slice(), b_entry, a_entry].concat();
    assert!(
        bytes == first || bytes == second,
        "unexpected archive bytes: {:?}",
        bytes
    );
}

#[test]
fn test_empty_directory_packs_to_signature() {
    let source = TestDir::new().unwrap();
    let work = TestDir::new().unwrap();
    let archive_path = work.join("empty.bfs");

    let summary = pack(source.path(), &archive_path, &PackOptions::default()).unwrap();
    assert_eq!(summary.entries, 0);
    assert_eq!(fs::read(&archive_path).unwrap(), b"BFS");

    let output = work.join("out");
    let decoded = extract(&archive_path, &output, &ExtractOptions::default()).unwrap();
    assert_eq!(decoded.entries, 0);
    assert!(output.is_dir());
    assert!(collect_files(&output).unwrap().is_empty());
}

#[test]
fn test_extract_overwrites_existing_files() {
    let work = TestDir::new().unwrap();
    let mut encoder = archive::ArchiveEncoder::new(&StoreCodec);
    encoder.append("a.txt", b"new").unwrap();
    fs::write(work.join("a.bfs"), encoder.finish()).unwrap();

    let output = work.create_dir("out").unwrap();
    fs::write(output.join("a.txt"), b"old contents").unwrap();
    fs::write(output.join("other.txt"), b"untouched").unwrap();

    let (_, extract_opts) = options(Algorithm::Store);
    extract(work.join("a.bfs"), &output, &extract_opts).unwrap();

    assert_eq!(fs::read(output.join("a.txt")).unwrap(), b"new");
    assert_eq!(fs::read(output.join("other.txt")).unwrap(), b"untouched");
}

#[test]
fn test_codec_mismatch_is_format_error() {
    let source = TestDir::new().unwrap();
    create_hello_world(&source).unwrap();
    let work = TestDir::new().unwrap();
    let archive_path = work.join("zstd.bfs");

    pack(source.path(), &archive_path, &options(Algorithm::Zstd).0).unwrap();
    let err = extract(&archive_path, work.join("out"), &options(Algorithm::Xz).1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_inspect_lists_entries() {
    let source = TestDir::new().unwrap();
    create_hello_world(&source).unwrap();
    let work = TestDir::new().unwrap();
    let archive_path = work.join("hello.bfs");
    let (pack_opts, extract_opts) = options(Algorithm::Store);
    pack(source.path(), &archive_path, &pack_opts).unwrap();

    let mut entries = inspect_file(&archive_path, &extract_opts).unwrap();
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, ["a.txt", "sub/b.txt"]);
    assert!(entries.iter().all(|e| e.size == 5 && e.compressed_size == 5));
    assert!(entries.iter().any(|e| e.offset == 3));
}

#[cfg(unix)]
#[test]
fn test_colon_in_top_level_name_round_trips() {
    let source = TestDir::new().unwrap();
    source.create_file("notes:2024.txt", b"hi").unwrap();
    source.create_file("logs/12:30.log", b"noon").unwrap();
    let work = TestDir::new().unwrap();

    let summary = pack(source.path(), work.join("a.bfs"), &PackOptions::default()).unwrap();
    assert_eq!(summary.entries, 2);
    extract(work.join("a.bfs"), work.join("out"), &ExtractOptions::default()).unwrap();
    assert_dirs_equal(source.path(), &work.join("out")).unwrap();
}

#[cfg(unix)]
#[test]
fn test_backslash_in_name_is_refused_not_split() {
    let source = TestDir::new().unwrap();
    source.create_file("a\\b.txt", b"ab").unwrap();
    let work = TestDir::new().unwrap();

    let err = pack(source.path(), work.join("a.bfs"), &PackOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(!work.join("a.bfs").exists());
}

#[test]
fn test_input_validation() {
    let work = TestDir::new().unwrap();
    let file = work.create_file("plain.txt", b"not a directory").unwrap();

    let err = pack(work.join("missing"), work.join("a.bfs"), &PackOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);

    let err = pack(&file, work.join("a.bfs"), &PackOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = extract(work.join("missing.bfs"), work.join("out"), &ExtractOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);

    let err = extract(work.path(), work.join("out"), &ExtractOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_extract_into_file_is_validation_error() {
    let work = TestDir::new().unwrap();
    fs::write(work.join("a.bfs"), b"BFS").unwrap();
    let blocker = work.create_file("blocker", b"").unwrap();

    let err = extract(work.join("a.bfs"), &blocker, &ExtractOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
