use lyradb_formats::container::MAX_KEY_LEN;
use lyradb_formats::{Container, ContainerBuilder, FormatError, FormatKind};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn encode_pairs(pairs: &[(&[u8], &[u8])]) -> Vec<u8> {
    let mut builder = ContainerBuilder::new();
    for (k, v) in pairs {
        builder.push(k.to_vec(), v.to_vec());
    }
    builder.finish().unwrap()
}

#[test]
fn two_record_scenario() {
    let bytes = encode_pairs(&[(b"a", b"1"), (b"b", b"2")]);
    let db = Container::decode(&bytes).unwrap();

    assert_eq!(db.len(), 2);
    assert_eq!(db.get(b"b").unwrap(), b"2");
    assert!(matches!(db.get(b"c"), Err(FormatError::NotFound(_))));

    let records: Vec<_> = db.scan().collect::<Result<_, _>>().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!((records[0].key, records[0].value), (&b"a"[..], &b"1"[..]));
    assert_eq!((records[1].key, records[1].value), (&b"b"[..], &b"2"[..]));
}

#[test]
fn scan_preserves_insertion_order_not_key_order() {
    let bytes = encode_pairs(&[(b"zebra", b"3"), (b"apple", b"1"), (b"mango", b"2")]);
    let db = Container::decode(&bytes).unwrap();

    let keys: Vec<_> = db
        .scan()
        .map(|r| r.unwrap().key.to_vec())
        .collect();
    assert_eq!(keys, vec![b"zebra".to_vec(), b"apple".to_vec(), b"mango".to_vec()]);

    // Lookup still works through the sorted footer index.
    assert_eq!(db.get(b"apple").unwrap(), b"1");
    assert_eq!(db.get(b"zebra").unwrap(), b"3");
}

#[test]
fn empty_container_is_valid() {
    let bytes = ContainerBuilder::new().finish().unwrap();
    let db = Container::decode(&bytes).unwrap();
    assert!(db.is_empty());
    assert_eq!(db.scan().count(), 0);
    assert!(matches!(db.get(b"any"), Err(FormatError::NotFound(_))));
}

#[test]
fn duplicate_keys_rejected() {
    let mut builder = ContainerBuilder::new();
    builder.push("dup", "1");
    builder.push("other", "2");
    builder.push("dup", "3");
    assert!(matches!(
        builder.finish(),
        Err(FormatError::DuplicateKey(k)) if k == "dup"
    ));
}

#[test]
fn oversized_key_exceeds_format_limit() {
    let mut builder = ContainerBuilder::new();
    builder.push(vec![0u8; MAX_KEY_LEN + 1], "v");
    assert!(matches!(
        builder.finish(),
        Err(FormatError::FormatLimitExceeded(_))
    ));
}

#[test]
fn every_payload_byte_flip_is_detected() {
    let bytes = encode_pairs(&[(b"a", b"1"), (b"b", b"2")]);
    let header_len = FormatKind::Container.header_len();

    // Every byte after the fixed header is covered by the trailer checksum,
    // including the trailer itself.
    for i in header_len..bytes.len() {
        let mut corrupted = bytes.clone();
        corrupted[i] ^= 0xFF;
        match Container::decode(&corrupted) {
            Err(FormatError::CorruptData(_)) => {}
            other => panic!("flip at byte {i} produced {other:?}"),
        }
    }
}

#[test]
fn truncated_buffer_is_detected() {
    let bytes = encode_pairs(&[(b"key", b"value")]);
    for cut in [bytes.len() - 1, bytes.len() / 2, 3] {
        assert!(matches!(
            Container::decode(&bytes[..cut]),
            Err(FormatError::TruncatedInput { .. }) | Err(FormatError::FormatMismatch(_))
        ));
    }
}

#[test]
fn wrong_magic_is_format_mismatch() {
    let bytes = encode_pairs(&[(b"k", b"v")]);
    let mut wrong = bytes.clone();
    wrong[0] = b'X';
    assert!(matches!(
        Container::decode(&wrong),
        Err(FormatError::FormatMismatch(_))
    ));
}

#[test]
fn future_version_rejected_before_payload() {
    let mut bytes = encode_pairs(&[(b"k", b"v")]);
    // version_major is the u16 right after the 6-byte magic
    bytes[6] = 99;
    assert!(matches!(
        Container::decode(&bytes),
        Err(FormatError::FormatMismatch(_))
    ));
}

#[cfg(feature = "strict-validation")]
#[test]
fn trailing_garbage_rejected_in_strict_mode() {
    let mut bytes = encode_pairs(&[(b"k", b"v")]);
    bytes.extend_from_slice(b"junk");
    assert!(matches!(
        Container::decode(&bytes),
        Err(FormatError::CorruptData(_))
    ));
}

#[test]
fn rewrite_keeps_identity_and_bumps_generation() {
    let bytes = encode_pairs(&[(b"k", b"v")]);
    let db = Container::decode(&bytes).unwrap();
    assert_eq!(db.generation(), 0);

    let mut next = ContainerBuilder::rewrite(&db);
    next.push("k", "v2");
    let bytes2 = next.finish().unwrap();
    let db2 = Container::decode(&bytes2).unwrap();

    assert_eq!(db2.uuid(), db.uuid());
    assert_eq!(db2.generation(), 1);
    assert_eq!(db2.get(b"k").unwrap(), b"v2");
}

#[test]
fn detect_identifies_container() {
    let bytes = encode_pairs(&[(b"k", b"v")]);
    assert_eq!(FormatKind::detect(&bytes), Some(FormatKind::Container));
    assert_eq!(FormatKind::detect(b"garbage"), None);
}

proptest! {
    #[test]
    fn roundtrip_arbitrary_records(
        entries in prop::collection::btree_map(
            prop::collection::vec(any::<u8>(), 0..64),
            prop::collection::vec(any::<u8>(), 0..256),
            0..32,
        )
    ) {
        let entries: BTreeMap<Vec<u8>, Vec<u8>> = entries;
        let mut builder = ContainerBuilder::new();
        for (k, v) in &entries {
            builder.push(k.clone(), v.clone());
        }
        let bytes = builder.finish().unwrap();
        let db = Container::decode(&bytes).unwrap();

        prop_assert_eq!(db.len(), entries.len());
        let scanned: Vec<_> = db.scan().collect::<Result<_, _>>().unwrap();
        for (record, (k, v)) in scanned.iter().zip(entries.iter()) {
            prop_assert_eq!(record.key, k.as_slice());
            prop_assert_eq!(record.value, v.as_slice());
        }
        for (k, v) in &entries {
            prop_assert_eq!(db.get(k).unwrap(), v.as_slice());
        }
    }
}
