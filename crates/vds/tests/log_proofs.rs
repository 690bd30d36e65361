use vds::{
    consistency_ranges, inclusion_ranges, leaf_hash, node_hash, root_of, subtree_hash, verify_consistency,
    verify_consistency_proof, verify_inclusion, Hash32, InMemoryLog, LogConsistencyProof, LogInclusionProof,
    LogSource, LogTreeHead, VdsError, VerifiableEntry, VerifiableLog,
};

fn leaves(n: u64) -> Vec<Hash32> {
    (0..n).map(|i| leaf_hash(format!("leaf {i}").as_bytes())).collect()
}

/// Root computed by pairing adjacent nodes level by level, carrying an odd
/// last node up unchanged. Independent of the range splitting.
fn brute_force_root(leaves: &[Hash32]) -> Hash32 {
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| if pair.len() == 2 { node_hash(&pair[0], &pair[1]) } else { pair[0] })
            .collect();
    }
    level[0]
}

fn head(leaves: &[Hash32], size: u64) -> LogTreeHead {
    LogTreeHead::new(size, Some(brute_force_root(&leaves[..size as usize]))).unwrap()
}

#[test]
fn test_inclusion_all_positions() {
    for n in [1u64, 2, 3, 4, 5, 8, 17, 100] {
        let l = leaves(n);
        let h = head(&l, n);
        for m in 0..n {
            let proof = LogInclusionProof {
                leaf_hash: l[m as usize],
                tree_size: n,
                leaf_index: m,
                audit_path: inclusion_ranges(m, 0, n)
                    .into_iter()
                    .map(|(s, e)| subtree_hash(&l, s, e))
                    .collect(),
            };
            verify_inclusion(&proof, &h).unwrap_or_else(|e| panic!("leaf {m} of {n}: {e}"));
        }
    }
}

#[test]
fn test_consistency_all_pairs() {
    let l = leaves(100);
    for b in 1..=100u64 {
        let second = head(&l, b);
        for a in 1..=b {
            let first = head(&l, a);
            let proof = LogConsistencyProof {
                first_size: a,
                second_size: b,
                audit_path: consistency_ranges(a, 0, b, true)
                    .into_iter()
                    .map(|(s, e)| subtree_hash(&l, s, e))
                    .collect(),
            };
            if a == b {
                verify_consistency(&first, &second, |_, _| panic!("no proof needed")).unwrap();
            } else {
                verify_consistency_proof(&proof, &first, &second)
                    .unwrap_or_else(|e| panic!("{a} -> {b}: {e}"));
            }
        }
    }
}

#[test]
fn test_five_entry_log() {
    let inputs = ["entry1", "entry2", "entry3", "entry4", "entry5"];
    let mut log = InMemoryLog::new();
    for input in inputs {
        log.append(VerifiableEntry::RawData(input.as_bytes().to_vec())).unwrap();
    }

    let r5 = root_of(&inputs).unwrap();
    let r3 = root_of(&inputs[..3]).unwrap();
    let head5 = log.tree_head(5).unwrap();
    let head3 = log.tree_head(3).unwrap();
    assert_eq!(head5.root_hash, Some(r5));
    assert_eq!(head3.root_hash, Some(r3));

    let proof = log.inclusion_proof_by_index(5, 2).unwrap();
    assert_eq!(proof.leaf_hash, leaf_hash(b"entry3"));
    verify_inclusion(&proof, &head5).unwrap();

    let consistency = log.consistency_proof(3, 5).unwrap();
    verify_consistency_proof(&consistency, &head3, &head5).unwrap();

    let vlog = VerifiableLog::new(&log);
    vlog.verify_inclusion(&head5, &VerifiableEntry::RawData(b"entry3".to_vec())).unwrap();
    vlog.verify_consistency(&head5, &head3).unwrap();
}

#[test]
fn test_equal_size_heads() {
    let l = leaves(4);
    let a = head(&l, 4);
    verify_consistency(&a, &a.clone(), |_, _| panic!("no proof needed")).unwrap();

    let other = LogTreeHead::new(4, Some([7u8; 32])).unwrap();
    let err = verify_consistency(&a, &other, |_, _| panic!("no proof needed")).unwrap_err();
    assert!(matches!(err, VdsError::VerificationFailed));
}

#[test]
fn test_bad_ranges() {
    let l = leaves(4);
    let h = head(&l, 4);

    let proof = LogInclusionProof { leaf_hash: l[0], tree_size: 4, leaf_index: 4, audit_path: vec![] };
    assert!(matches!(verify_inclusion(&proof, &h), Err(VdsError::InvalidRange(_))));

    let err = verify_consistency(&LogTreeHead::empty(), &h, |_, _| panic!("no proof needed")).unwrap_err();
    assert!(matches!(err, VdsError::InvalidRange(_)));

    assert!(LogTreeHead::new(0, Some([0u8; 32])).is_err());
    assert!(LogTreeHead::new(3, None).is_err());
}

#[test]
fn test_tampered_proofs_fail() {
    let l = leaves(17);
    let h = head(&l, 17);

    let mut proof = LogInclusionProof {
        leaf_hash: l[5],
        tree_size: 17,
        leaf_index: 5,
        audit_path: inclusion_ranges(5, 0, 17).into_iter().map(|(s, e)| subtree_hash(&l, s, e)).collect(),
    };
    verify_inclusion(&proof, &h).unwrap();

    proof.audit_path[1][0] ^= 1;
    assert!(matches!(verify_inclusion(&proof, &h), Err(VdsError::VerificationFailed)));
    proof.audit_path[1][0] ^= 1;

    proof.leaf_index = 6;
    assert!(matches!(verify_inclusion(&proof, &h), Err(VdsError::VerificationFailed)));
    proof.leaf_index = 5;

    proof.audit_path.pop();
    assert!(matches!(verify_inclusion(&proof, &h), Err(VdsError::VerificationFailed)));

    let first = head(&l, 6);
    let mut consistency = LogConsistencyProof {
        first_size: 6,
        second_size: 17,
        audit_path: consistency_ranges(6, 0, 17, true).into_iter().map(|(s, e)| subtree_hash(&l, s, e)).collect(),
    };
    verify_consistency_proof(&consistency, &first, &h).unwrap();
    consistency.audit_path[0][31] ^= 0x80;
    assert!(matches!(
        verify_consistency_proof(&consistency, &first, &h),
        Err(VdsError::VerificationFailed)
    ));
}

#[test]
fn test_proof_wire_names() {
    let proof = LogConsistencyProof { first_size: 3, second_size: 5, audit_path: vec![] };
    let v = serde_json::to_value(&proof).unwrap();
    assert_eq!(v["from_size"], 3);
    assert_eq!(v["tree_size"], 5);
}
