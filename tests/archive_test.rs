use lyradb_formats::{Archive, ArchiveBuilder, CodecId, FormatError, FormatKind};
use std::collections::HashMap;

#[test]
fn roundtrip_across_codecs() {
    let text = b"the quick brown fox jumps over the lazy dog ".repeat(100);
    let mut builder = ArchiveBuilder::new();
    builder.add("stored.bin", b"raw bytes".to_vec(), CodecId::None);
    builder.add("compressed.zst", text.clone(), CodecId::Zstd);
    builder.add("fast.lz4", text.clone(), CodecId::Lz4);
    let bytes = builder.finish().unwrap();

    let ar = Archive::decode(&bytes).unwrap();
    assert_eq!(ar.list(), vec!["stored.bin", "compressed.zst", "fast.lz4"]);
    assert_eq!(ar.extract("stored.bin").unwrap(), b"raw bytes");
    assert_eq!(ar.extract("compressed.zst").unwrap(), text);
    assert_eq!(ar.extract("fast.lz4").unwrap(), text);

    // Compression actually happened for the repetitive payload.
    let zst = ar.stat("compressed.zst").unwrap();
    assert!(zst.stored_len < zst.original_len);
}

#[test]
fn empty_archive_is_valid() {
    let bytes = ArchiveBuilder::new().finish().unwrap();
    let ar = Archive::decode(&bytes).unwrap();
    assert!(ar.is_empty());
    assert!(ar.list().is_empty());
}

#[test]
fn duplicate_entry_names_rejected() {
    let mut builder = ArchiveBuilder::new();
    builder.add("same", vec![1], CodecId::None);
    builder.add("same", vec![2], CodecId::None);
    assert!(matches!(
        builder.finish(),
        Err(FormatError::DuplicateKey(n)) if n == "same"
    ));
}

#[test]
fn missing_entry_is_not_found() {
    let mut builder = ArchiveBuilder::new();
    builder.add("present", vec![1], CodecId::None);
    let bytes = builder.finish().unwrap();
    let ar = Archive::decode(&bytes).unwrap();
    assert!(matches!(
        ar.extract("absent"),
        Err(FormatError::NotFound(n)) if n == "absent"
    ));
}

#[test]
fn corrupt_entry_fails_lazily_without_breaking_the_listing() {
    let mut builder = ArchiveBuilder::new();
    builder.add("a.bin", b"entry a contents".to_vec(), CodecId::None);
    builder.add("b.bin", b"entry b contents".to_vec(), CodecId::None);
    builder.add("c.bin", b"entry c contents".to_vec(), CodecId::None);
    let mut bytes = builder.finish().unwrap();

    // Flip one byte inside b's stored span. Entry payloads are outside the
    // trailer checksum, so decode and listing must still succeed.
    let header_len = FormatKind::Archive.header_len();
    let offset_b = {
        let ar = Archive::decode(&bytes).unwrap();
        ar.stat("b.bin").unwrap().offset as usize
    };
    bytes[header_len + offset_b] ^= 0xFF;

    let ar = Archive::decode(&bytes).unwrap();
    assert_eq!(ar.list(), vec!["a.bin", "b.bin", "c.bin"]);
    assert_eq!(ar.extract("a.bin").unwrap(), b"entry a contents");
    assert_eq!(ar.extract("c.bin").unwrap(), b"entry c contents");
    assert!(matches!(
        ar.extract("b.bin"),
        Err(FormatError::CorruptData(_))
    ));
}

#[test]
fn corrupt_index_fails_at_decode() {
    let mut builder = ArchiveBuilder::new();
    builder.add("a.bin", vec![1, 2, 3], CodecId::None);
    let mut bytes = builder.finish().unwrap();

    // The index region sits right before the 4-byte trailer and is covered
    // by it.
    let in_index = bytes.len() - 6;
    bytes[in_index] ^= 0xFF;
    assert!(matches!(
        Archive::decode(&bytes),
        Err(FormatError::CorruptData(_))
    ));
}

#[test]
fn corrupt_trailer_fails_at_decode() {
    let mut builder = ArchiveBuilder::new();
    builder.add("a.bin", vec![1, 2, 3], CodecId::None);
    let mut bytes = builder.finish().unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    assert!(matches!(
        Archive::decode(&bytes),
        Err(FormatError::CorruptData(_))
    ));
}

#[test]
fn metadata_survives_the_roundtrip() {
    let mut meta = HashMap::new();
    meta.insert("role".to_owned(), "primary".to_owned());
    meta.insert("schema".to_owned(), "v7".to_owned());

    let mut builder = ArchiveBuilder::new();
    builder.add_with_metadata("db.lyradb", vec![0u8; 32], CodecId::Zstd, meta.clone());
    let bytes = builder.finish().unwrap();

    let ar = Archive::decode(&bytes).unwrap();
    assert_eq!(ar.stat("db.lyradb").unwrap().metadata, meta);
}

#[test]
fn archives_can_bundle_containers() {
    use lyradb_formats::{Container, ContainerBuilder};

    let mut db_builder = ContainerBuilder::new();
    db_builder.push("k", "v");
    let db_bytes = db_builder.finish().unwrap();

    let mut builder = ArchiveBuilder::new();
    builder.add("main.lyradb", db_bytes.clone(), CodecId::Zstd);
    let archive_bytes = builder.finish().unwrap();

    let ar = Archive::decode(&archive_bytes).unwrap();
    let extracted = ar.extract("main.lyradb").unwrap();
    assert_eq!(extracted, db_bytes);
    let db = Container::decode(&extracted).unwrap();
    assert_eq!(db.get(b"k").unwrap(), b"v");
}

#[test]
fn truncated_archive_is_detected() {
    let mut builder = ArchiveBuilder::new();
    builder.add("a.bin", vec![9; 64], CodecId::None);
    let bytes = builder.finish().unwrap();
    assert!(matches!(
        Archive::decode(&bytes[..bytes.len() - 10]),
        Err(FormatError::TruncatedInput { .. })
    ));
}

#[test]
fn detect_identifies_archive() {
    let bytes = ArchiveBuilder::new().finish().unwrap();
    assert_eq!(FormatKind::detect(&bytes), Some(FormatKind::Archive));
}
