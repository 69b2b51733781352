mod common;

use common::V1Builder;
use hashfs::hashfs::EntryFlags;
use hashfs::{
    EntryKind, Error, HashFsReader, MemoryReader, ReadAt, ReaderOptions, Version, hash_path,
};

fn open(data: Vec<u8>) -> HashFsReader<MemoryReader> {
    HashFsReader::from_reader(MemoryReader::new(data), &ReaderOptions::default()).unwrap()
}

fn sample() -> V1Builder {
    V1Builder::new(0)
        .dir("/", &["def"], &["manifest.sii"])
        .file("manifest.sii", b"SiiNunit { }")
        .dir("/def", &["world"], &["city.sii", "empty.sii"])
        .compressed_file("/def/city.sii", &b"city : .berlin { }\n".repeat(40))
        .file("/def/empty.sii", b"")
        .compressed_dir("/def/world", &[], &["road.sii"])
}

#[test]
fn opens_header_and_table() {
    let reader = open(sample().build());
    assert_eq!(reader.version(), Version::V1);
    assert_eq!(reader.salt(), 0);
    assert_eq!(reader.len(), 6);
    assert!(!reader.is_empty());
}

#[test]
fn lookup_outcomes() {
    let reader = open(sample().build());
    assert_eq!(reader.entry_exists("/"), EntryKind::Directory);
    assert_eq!(reader.entry_exists("/def"), EntryKind::Directory);
    assert_eq!(reader.entry_exists("/def/"), EntryKind::Directory);
    assert_eq!(reader.entry_exists("/def/city.sii"), EntryKind::File);
    assert_eq!(reader.entry_exists("def/city.sii"), EntryKind::File);
    assert_eq!(reader.entry_exists("/def/town.sii"), EntryKind::NotFound);
}

#[test]
fn entries_keep_v1_passthrough_fields() {
    let reader = open(sample().build());
    let entry = reader.get_entry("/def/city.sii").unwrap();
    assert!(entry.is_compressed);
    assert!(!entry.is_tobj);
    assert_eq!(entry.crc(), Some(0x1234_5678));
    assert!(entry.texture().is_none());
    match &entry.detail {
        hashfs::hashfs::EntryDetail::V1 { flags, .. } => {
            assert_eq!(flags.bits(), EntryFlags::COMPRESSED);
        }
        other => panic!("unexpected detail {other:?}"),
    }
}

#[test]
fn extracts_plain_and_compressed_files() {
    let reader = open(sample().build());
    assert_eq!(reader.extract("/manifest.sii").unwrap(), b"SiiNunit { }");
    assert_eq!(
        reader.extract("/def/city.sii").unwrap(),
        b"city : .berlin { }\n".repeat(40)
    );
    assert!(reader.extract("/def/empty.sii").unwrap().is_empty());
}

#[test]
fn uncompressed_extraction_matches_entry_size() {
    let reader = open(sample().build());
    for entry in reader.entries().values() {
        if !entry.is_compressed && !entry.is_directory {
            assert_eq!(reader.extract_entry(entry).unwrap().len(), entry.size as usize);
        }
    }
}

#[test]
fn strict_accessors_distinguish_failures() {
    let reader = open(sample().build());
    assert!(matches!(reader.get_entry("/nope"), Err(Error::NotFound(_))));
    assert!(matches!(reader.extract("/nope"), Err(Error::NotFound(_))));
    assert!(matches!(reader.extract("/def"), Err(Error::IsADirectory(_))));
    assert!(matches!(
        reader.get_directory_listing("/manifest.sii", false, false),
        Err(Error::NotADirectory(_))
    ));
    assert!(matches!(
        reader.get_directory_listing("/nope", false, false),
        Err(Error::NotFound(_))
    ));

    let dir = reader.get_entry("/def").unwrap();
    assert!(matches!(reader.extract_entry(dir), Err(Error::IsADirectory(_))));
}

#[test]
fn directory_listing_relative_and_absolute() {
    let reader = open(sample().build());

    let root = reader.get_directory_listing("/", false, false).unwrap();
    assert_eq!(root.subdirectories, vec!["def/"]);
    assert_eq!(root.files, vec!["manifest.sii"]);

    let root = reader.get_directory_listing("/", false, true).unwrap();
    assert_eq!(root.subdirectories, vec!["/def/"]);
    assert_eq!(root.files, vec!["/manifest.sii"]);

    let def = reader.get_directory_listing("/def", false, true).unwrap();
    assert_eq!(def.subdirectories, vec!["/def/world/"]);
    assert_eq!(def.files, vec!["/def/city.sii", "/def/empty.sii"]);

    let world = reader.get_directory_listing("/def/world", true, true).unwrap();
    assert!(world.subdirectories.is_empty());
    assert_eq!(world.files, vec!["/def/world/road.sii"]);
}

#[test]
fn trailing_slash_does_not_change_listing() {
    let reader = open(sample().build());
    assert_eq!(
        reader.get_directory_listing("/def/", false, true).unwrap(),
        reader.get_directory_listing("/def", false, true).unwrap()
    );
    assert_eq!(
        reader.get_directory_listing("/def/world/", false, false).unwrap(),
        reader.get_directory_listing("/def/world", false, false).unwrap()
    );
}

#[test]
fn listed_paths_resolve() {
    let reader = open(sample().build());
    let def = reader.get_directory_listing("/def", false, true).unwrap();
    for dir in &def.subdirectories {
        assert_eq!(reader.entry_exists(dir), EntryKind::Directory, "{dir}");
    }
    for file in &def.files {
        assert_eq!(reader.entry_exists(file), EntryKind::File, "{file}");
    }
}

#[test]
fn duplicate_directory_records_are_merged() {
    let data = V1Builder::new(0)
        .dir("/base", &["a"], &["one.txt"])
        .dir("/base", &["b"], &["two.txt", "three.txt"])
        .build();
    let reader = open(data);

    assert_eq!(reader.len(), 1);
    let hash = reader.hash_path("/base", None);
    assert_eq!(reader.fragments(hash).len(), 1);

    let listing = reader.get_directory_listing("/base", false, false).unwrap();
    assert_eq!(listing.subdirectories, vec!["a/", "b/"]);
    assert_eq!(listing.files, vec!["one.txt", "two.txt", "three.txt"]);
}

#[test]
fn duplicate_file_records_keep_the_first() {
    let data = V1Builder::new(0)
        .file("/a.txt", b"first")
        .file("/a.txt", b"second")
        .build();
    let reader = open(data);

    assert_eq!(reader.len(), 1);
    assert!(reader.fragments(hash_path("a.txt", 0)).is_empty());
    assert_eq!(reader.extract("/a.txt").unwrap(), b"first");
}

#[test]
fn file_colliding_with_directory_is_discarded() {
    let data = V1Builder::new(0)
        .dir("/x", &[], &["y"])
        .file("/x", b"not a dir")
        .build();
    let reader = open(data);
    assert_eq!(reader.entry_exists("/x"), EntryKind::Directory);
    assert!(reader.fragments(reader.hash_path("/x", None)).is_empty());
}

#[test]
fn salted_archive_uses_its_salt() {
    let data = V1Builder::new(7).file("def/a.txt", b"salted").build();
    let reader = open(data);

    assert_eq!(reader.salt(), 7);
    assert_eq!(reader.hash_path("def/a.txt", None), hash_path("def/a.txt", 7));
    assert_ne!(reader.hash_path("def/a.txt", Some(0)), reader.hash_path("def/a.txt", None));
    assert_eq!(reader.extract("/def/a.txt").unwrap(), b"salted");
}

#[test]
fn entry_table_can_be_forced_from_end() {
    let data = sample().build_with_start_offset(3);

    // Garbage table offset: records decode to nonsense and lookups miss
    let misread = HashFsReader::from_reader(MemoryReader::new(data.clone()), &ReaderOptions::default());
    if let Ok(reader) = misread {
        assert_eq!(reader.entry_exists("/manifest.sii"), EntryKind::NotFound);
    }

    let options = ReaderOptions {
        force_entry_table_at_end: true,
    };
    let reader = HashFsReader::from_reader(MemoryReader::new(data), &options).unwrap();
    assert_eq!(reader.extract("/manifest.sii").unwrap(), b"SiiNunit { }");
}

#[test]
fn corrupt_compressed_member_reports_decompression_error() {
    let data = V1Builder::new(0)
        .record(hash_path("bad.bin", 0), 0x2, 100, b"this is no zlib stream".to_vec())
        .build();
    let reader = open(data);
    assert!(matches!(
        reader.extract("/bad.bin"),
        Err(Error::Decompress { .. })
    ));
}

#[test]
fn extract_to_file_creates_parents() {
    let reader = open(sample().build());
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("nested/deeper/city.sii");

    reader.extract_to_file("/def/city.sii", &out).unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), b"city : .berlin { }\n".repeat(40));

    assert!(matches!(
        reader.extract_to_file("/def", &tmp.path().join("def")),
        Err(Error::IsADirectory(_))
    ));
}

#[test]
fn zero_size_extraction_does_not_read_the_archive() {
    let source = MemoryReader::new(sample().build());
    let reader = HashFsReader::from_reader(&source, &ReaderOptions::default()).unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out/empty.sii");

    let before = source.transferred_bytes();
    reader.extract_to_file("/def/empty.sii", &out).unwrap();
    assert_eq!(source.transferred_bytes(), before);

    assert!(out.is_file());
    assert_eq!(std::fs::metadata(&out).unwrap().len(), 0);
}

#[test]
fn close_returns_the_source() {
    let data = sample().build();
    let len = data.len();
    let reader = open(data);
    let source = reader.close();
    assert_eq!(source.into_inner().len(), len);
}

#[test]
fn header_fields_are_exposed() {
    let data = sample().build();
    let source = MemoryReader::new(data);
    let archive = hashfs::v1::HashFsV1::parse(&source, false).unwrap();

    let header = archive.header();
    assert_eq!(header.hash_method, *b"CITY");
    assert_eq!(header.entries_count, 6);
    assert_eq!(u64::from(header.start_offset) + 6 * 32, source.size());
}
