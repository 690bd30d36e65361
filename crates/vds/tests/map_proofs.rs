use rand::Rng;
use serde_json::json;
use vds::{
    default_leaf_values, empty_map_root, leaf_hash, node_hash, verify_map_entry, InMemoryMap, InMemoryNodeStore,
    MapEntryResponse, MapSource, MerkleLeaf, SparseMerkleTree, VdsError, VerifiableEntry, MAP_DEPTH,
};

#[test]
fn test_empty_map_root() {
    let mut h = leaf_hash(b"");
    for _ in 0..256 {
        h = node_hash(&h, &h);
    }
    assert_eq!(empty_map_root(), h);
    assert_eq!(default_leaf_values()[MAP_DEPTH], leaf_hash(b""));

    let map = InMemoryMap::new();
    assert_eq!(map.tree_head(0).unwrap().root_hash, h);
}

#[test]
fn test_single_key_all_defaults() {
    let mut map = InMemoryMap::new();
    let head = map.set(b"foo", VerifiableEntry::RawData(b"bar".to_vec())).unwrap();

    let entry = map.get(b"foo", 0).unwrap();
    assert_eq!(entry.tree_size, 1);
    assert!(entry.audit_path.iter().all(Option::is_none));
    assert_eq!(entry.value, VerifiableEntry::RawData(b"bar".to_vec()));
    verify_map_entry(&entry, &head).unwrap();

    let absent = map.get(b"baz", 0).unwrap();
    assert_eq!(absent.value.leaf_hash().unwrap(), leaf_hash(b""));
    verify_map_entry(&absent, &head).unwrap();
}

#[test]
fn test_random_keys() {
    let mut rng = rand::thread_rng();
    let mut tree = SparseMerkleTree::new(InMemoryNodeStore::new());
    let mut keys = Vec::new();

    for _ in 0..50 {
        let key: [u8; 16] = rng.gen();
        let value: [u8; 8] = rng.gen();
        tree.update(&key, leaf_hash(&value));
        keys.push((key, value));
    }

    let mut map = InMemoryMap::new();
    for (key, value) in &keys {
        map.set(key, VerifiableEntry::RawData(value.to_vec())).unwrap();
    }
    let head = map.tree_head(0).unwrap();
    assert_eq!(head.root_hash, tree.root());

    for (key, value) in &keys {
        let entry = map.get(key, 0).unwrap();
        assert_eq!(entry.value, VerifiableEntry::RawData(value.to_vec()));
        verify_map_entry(&entry, &head).unwrap();
    }
}

#[test]
fn test_historical_get() {
    let mut map = InMemoryMap::new();
    let first = map.set(b"k", VerifiableEntry::Json(json!({"v": 1}))).unwrap();
    map.set(b"k", VerifiableEntry::Json(json!({"v": 2}))).unwrap();
    let third = map.delete(b"k").unwrap();

    let old = map.get(b"k", 1).unwrap();
    assert_eq!(old.value, VerifiableEntry::Json(json!({"v": 1})));
    verify_map_entry(&old, &first).unwrap();

    let gone = map.get(b"k", 3).unwrap();
    assert_eq!(gone.value, VerifiableEntry::RawData(vec![]));
    verify_map_entry(&gone, &third).unwrap();
    assert_eq!(third.root_hash, empty_map_root());
}

#[test]
fn test_update_needs_matching_previous() {
    let mut map = InMemoryMap::new();
    map.set(b"k", VerifiableEntry::RawData(b"a".to_vec())).unwrap();

    let stale = map
        .update(b"k", VerifiableEntry::RawData(b"b".to_vec()), leaf_hash(b"zzz"))
        .unwrap();
    assert_eq!(map.get(b"k", 0).unwrap().value, VerifiableEntry::RawData(b"a".to_vec()));
    assert_eq!(stale.tree_size(), 2);

    let previous = map.leaf(b"k");
    map.update(b"k", VerifiableEntry::RawData(b"b".to_vec()), previous).unwrap();
    assert_eq!(map.get(b"k", 0).unwrap().value, VerifiableEntry::RawData(b"b".to_vec()));
}

#[test]
fn test_map_tampering() {
    let mut map = InMemoryMap::new();
    map.set(b"a", VerifiableEntry::RawData(b"1".to_vec())).unwrap();
    let head = map.set(b"b", VerifiableEntry::RawData(b"2".to_vec())).unwrap();

    let good = map.get(b"a", 0).unwrap();
    verify_map_entry(&good, &head).unwrap();

    let wrong_value = MapEntryResponse { value: VerifiableEntry::RawData(b"9".to_vec()), ..good.clone() };
    assert!(matches!(verify_map_entry(&wrong_value, &head), Err(VdsError::VerificationFailed)));

    let wrong_size = MapEntryResponse { tree_size: 1, ..good.clone() };
    assert!(matches!(verify_map_entry(&wrong_size, &head), Err(VdsError::VerificationFailed)));

    let mut wrong_path = good.clone();
    let slot = wrong_path.audit_path.iter().position(Option::is_some).unwrap();
    wrong_path.audit_path[slot] = None;
    assert!(matches!(verify_map_entry(&wrong_path, &head), Err(VdsError::VerificationFailed)));

    let short = MapEntryResponse { audit_path: good.audit_path[1..].to_vec(), ..good };
    assert!(matches!(verify_map_entry(&short, &head), Err(VdsError::InvalidRange(_))));
}
