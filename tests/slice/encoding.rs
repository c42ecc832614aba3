//! Versioned encoding of the values a slice ships between nodes

use crate::common::*;
use arbor::prelude::*;
use arbor_wire::{
    decode_for_version, decode_tagged, encode_for_cluster, encode_for_version, encode_tagged,
    ClusterVersion,
};
use proptest::prelude::*;

fn sample_mutations() -> Vec<Mutation> {
    vec![
        Mutation::GetCas { key: key("a") },
        Mutation::set(key("b"), "payload"),
        Mutation::Set {
            key: key("c"),
            data: vec![0, 255, 7],
            flags: u32::MAX,
            exptime: 1_700_000_000,
            add_policy: AddPolicy::No,
            replace_policy: ReplacePolicy::IfCasMatches(Cas(9)),
            return_old: true,
        },
        Mutation::IncrDecr {
            key: key("d"),
            kind: IncrDecrKind::Decr,
            amount: u64::MAX,
        },
        Mutation::AppendPrepend {
            key: key("e"),
            kind: AppendPrependKind::Prepend,
            data: b"x".to_vec(),
        },
        Mutation::Delete {
            key: key("f"),
            dont_put_in_delete_queue: true,
        },
    ]
}

#[test]
fn mutations_round_trip_in_every_version() {
    for version in ClusterVersion::ALL {
        for mutation in sample_mutations() {
            let bytes = encode_for_version(version, &mutation);
            let decoded: Mutation = decode_for_version(version, &bytes).unwrap();
            assert_eq!(decoded, mutation, "version {}", version);
        }
    }
}

#[test]
fn results_from_a_live_slice_round_trip() {
    let ts = TestSlice::new();
    let mut results = Vec::new();
    for mutation in sample_mutations() {
        results.push(ts.apply(mutation));
    }
    results.push(ts.apply(Mutation::GetCas { key: key("b") }));
    for result in results {
        let bytes = encode_for_cluster(&result);
        let decoded: MutationResult = decode_for_version(ClusterVersion::CLUSTER, &bytes).unwrap();
        assert_eq!(decoded, result);
    }
}

#[test]
fn tagged_encoding_carries_its_version() {
    let mutation = Mutation::set(key("k"), "v");
    let bytes = encode_tagged(ClusterVersion::V1_13, &mutation);
    let (version, decoded): (ClusterVersion, Mutation) = decode_tagged(&bytes).unwrap();
    assert_eq!(version, ClusterVersion::V1_13);
    assert_eq!(decoded, mutation);
}

#[test]
fn truncated_input_is_an_error() {
    let bytes = encode_for_cluster(&Mutation::set(key("key"), "value"));
    let err = decode_for_version::<Mutation>(ClusterVersion::CLUSTER, &bytes[..bytes.len() - 1]).unwrap_err();
    assert!(arbor::Error::from(err).to_string().contains("serialization"));
}

proptest! {
    #[test]
    fn backfill_atoms_round_trip(
        k in "[a-z]{0,40}",
        data in prop::collection::vec(any::<u8>(), 0..300),
        flags in any::<u32>(),
        cas in any::<u64>(),
        ts in any::<u64>(),
    ) {
        let atom = BackfillAtom {
            key: key(&k),
            value: StoredValue::new(data, flags, 0, Castime::new(Cas(cas), ReplTimestamp(ts))),
        };
        for version in ClusterVersion::ALL {
            let bytes = encode_for_version(version, &atom);
            prop_assert_eq!(decode_for_version::<BackfillAtom>(version, &bytes).unwrap(), atom.clone());
        }
    }
}
