use std::collections::BTreeSet;

use light_indexer_test_utils::fixtures::{
    delta,
    ordi_state,
    s3_source,
    DocumentBuilder,
    META_PROTOCOL,
};
use light_indexer_types::{
    CommitmentError,
    CommitteeSource,
    ConsensusError,
    ParseError,
    ResolveError,
    StaleConfigError,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::tempdir;

use crate::{
    conflict_evidence,
    ConsensusResolver,
    DenyEntry,
    DenyList,
    Normalizer,
    SourcedCheckpoint,
};

fn source(name: &str) -> CommitteeSource {
    CommitteeSource::S3(s3_source(name))
}

fn normalizer() -> Normalizer {
    Normalizer::new([0, 1])
}

fn committees(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn sourced(builder: &DocumentBuilder) -> SourcedCheckpoint {
    let checkpoint = builder.checkpoint();
    SourcedCheckpoint {
        committee: checkpoint.name.clone(),
        checkpoint,
    }
}

fn at(name: &str, height: u64) -> DocumentBuilder {
    DocumentBuilder::new(name, height).deltas(ordi_state())
}

fn forged(name: &str, height: u64) -> DocumentBuilder {
    DocumentBuilder::new(name, height).deltas(vec![delta("ordi", "0014aa", None, 1, 1)])
}

#[test]
fn test_normalize_valid_document() {
    let builder = at("a", 800000);
    let document = normalizer().normalize(&source("a"), &builder.build()).unwrap();

    assert_eq!(document.checkpoint, builder.checkpoint());
    assert_eq!(document.committee(), "a");
    assert_eq!(document.base_height, None);
    assert_eq!(document.deltas, ordi_state());
}

#[test]
fn test_normalize_lowercases_ticks_and_drops_empty_wallets() {
    let mut value = at("a", 800000).json();
    value["deltas"] = json!([{
        "tick": "ORDI",
        "pkscript": "0014aa",
        "wallet": "",
        "availableBalance": "7",
        "overallBalance": "9",
    }]);
    let document = normalizer()
        .normalize(&source("a"), &serde_json::to_vec(&value).unwrap())
        .unwrap();

    assert_eq!(document.deltas, vec![delta("ordi", "0014aa", None, 7, 9)]);
}

#[test]
fn test_normalize_accepts_numeric_height_and_base_height() {
    let builder = at("a", 800010).incremental(800000, ordi_state());
    let mut value = builder.json();
    value["height"] = json!(800010);
    value["baseHeight"] = json!(800000);
    let document = normalizer()
        .normalize(&source("a"), &serde_json::to_vec(&value).unwrap())
        .unwrap();

    assert_eq!(document.checkpoint.height, 800010);
    assert_eq!(document.base_height, Some(800000));
}

#[test]
fn test_normalize_rejects_malformed_commitment() {
    let mut value = at("a", 800000).json();
    value["commitment"] = json!("0xabc");
    let err = normalizer()
        .normalize(&source("a"), &serde_json::to_vec(&value).unwrap())
        .unwrap_err();
    assert!(matches!(err, ParseError::Commitment(CommitmentError::Hex(_))));

    value["commitment"] = json!(format!("0x{}", "ab".repeat(16)));
    let err = normalizer()
        .normalize(&source("a"), &serde_json::to_vec(&value).unwrap())
        .unwrap_err();
    assert_eq!(
        err,
        ParseError::Commitment(CommitmentError::Length {
            expected: 32,
            found: 16
        })
    );
}

#[test]
fn test_normalize_rejects_unsupported_version() {
    let document = at("a", 800000).version("v7").build();
    assert_eq!(
        normalizer().normalize(&source("a"), &document).unwrap_err(),
        ParseError::UnsupportedVersion("v7".to_string())
    );

    let document = at("a", 800000).version("1.2.0").build();
    assert!(normalizer().normalize(&source("a"), &document).is_ok());
}

#[test]
fn test_normalize_rejects_missing_fields() {
    let mut value = at("a", 800000).json();
    value.as_object_mut().unwrap().remove("hash");
    assert!(matches!(
        normalizer().normalize(&source("a"), &serde_json::to_vec(&value).unwrap()),
        Err(ParseError::Json(_))
    ));

    assert!(matches!(
        normalizer().normalize(&source("a"), b"<html>503</html>"),
        Err(ParseError::Json(_))
    ));

    let document = at("a", 800000).meta_protocol("").build();
    assert!(matches!(
        normalizer().normalize(&source("a"), &document),
        Err(ParseError::InvalidField {
            field: "metaProtocol",
            ..
        })
    ));
}

#[test]
fn test_normalize_rejects_document_of_other_committee() {
    let document = at("b", 800000).build();
    assert_eq!(
        normalizer().normalize(&source("a"), &document).unwrap_err(),
        ParseError::CommitteeMismatch {
            expected: "a".to_string(),
            found: "b".to_string()
        }
    );
}

#[test]
fn test_normalize_rejects_bad_deltas() {
    let mut value = at("a", 800000).json();
    value["deltas"][0]["availableBalance"] = json!("-5");
    assert!(matches!(
        normalizer().normalize(&source("a"), &serde_json::to_vec(&value).unwrap()),
        Err(ParseError::InvalidField { field: "deltas", .. })
    ));

    let mut value = at("a", 800000).json();
    value["deltas"][0]["availableBalance"] = json!("151");
    assert!(matches!(
        normalizer().normalize(&source("a"), &serde_json::to_vec(&value).unwrap()),
        Err(ParseError::InvalidField { field: "deltas", .. })
    ));

    let mut value = at("a", 800000).json();
    value["deltas"][0]["pkscript"] = json!("");
    assert!(matches!(
        normalizer().normalize(&source("a"), &serde_json::to_vec(&value).unwrap()),
        Err(ParseError::InvalidField {
            field: "pkscript",
            ..
        })
    ));
}

#[test]
fn test_normalize_rejects_base_height_not_below_height() {
    let document = at("a", 800000).incremental(800000, ordi_state()).build();
    assert!(matches!(
        normalizer().normalize(&source("a"), &document),
        Err(ParseError::InvalidField {
            field: "baseHeight",
            ..
        })
    ));
}

#[test]
fn test_resolve_all_agree() {
    let resolver = ConsensusResolver::new(META_PROTOCOL, committees(&["a", "b", "c"]), 2, 0);
    let reported = vec![
        sourced(&at("a", 800000)),
        sourced(&at("b", 800000)),
        sourced(&at("c", 800000)),
    ];

    let resolution = resolver.resolve(&reported).unwrap();
    assert_eq!(resolution.checkpoint, at("a", 800000).checkpoint());
    assert_eq!(resolution.agreeing, committees(&["a", "b", "c"]));
    assert!(resolution.missing.is_empty());
}

#[test]
fn test_resolve_picks_highest_height_with_quorum() {
    // c is ahead of the others and alone at its height.
    let resolver = ConsensusResolver::new(META_PROTOCOL, committees(&["a", "b", "c"]), 2, 0);
    let reported = vec![
        sourced(&at("a", 800000)),
        sourced(&at("b", 800000)),
        sourced(&at("c", 800010)),
    ];

    let resolution = resolver.resolve(&reported).unwrap();
    assert_eq!(resolution.checkpoint.height, 800000);
    assert_eq!(resolution.agreeing, committees(&["a", "b"]));
    assert_eq!(resolution.missing, committees(&["c"]));
}

#[test]
fn test_resolve_conflict_at_same_height() {
    let resolver = ConsensusResolver::new(META_PROTOCOL, committees(&["a", "b", "c"]), 2, 0);
    let reported = vec![
        sourced(&at("a", 800000)),
        sourced(&at("b", 800000)),
        sourced(&forged("c", 800000)),
    ];

    let mut expected = vec![
        at("a", 800000).checkpoint().commitment,
        forged("c", 800000).checkpoint().commitment,
    ];
    expected.sort();
    assert_eq!(
        resolver.resolve(&reported).unwrap_err(),
        ResolveError::Consensus(ConsensusError::Conflict {
            height: 800000,
            commitments: expected,
        })
    );
}

#[test]
fn test_resolve_conflict_above_agreed_height_is_fatal() {
    // A conflict at any inspected height stops the walk.
    let resolver = ConsensusResolver::new(META_PROTOCOL, committees(&["a", "b", "c"]), 2, 0);
    let reported = vec![
        sourced(&at("a", 800000)),
        sourced(&at("b", 800010)),
        sourced(&forged("c", 800010)),
    ];
    assert!(matches!(
        resolver.resolve(&reported),
        Err(ResolveError::Consensus(ConsensusError::Conflict {
            height: 800010,
            ..
        }))
    ));
}

#[test]
fn test_resolve_conflict_within_one_committee() {
    let resolver = ConsensusResolver::new(META_PROTOCOL, committees(&["a", "b"]), 1, 0);
    let reported = vec![
        sourced(&at("a", 800000)),
        sourced(&forged("a", 800000)),
        sourced(&at("b", 800000)),
    ];
    assert!(matches!(
        resolver.resolve(&reported),
        Err(ResolveError::Consensus(ConsensusError::Conflict { .. }))
    ));
}

#[test]
fn test_resolve_partial_outage_within_quorum() {
    let resolver = ConsensusResolver::new(META_PROTOCOL, committees(&["a", "b", "c"]), 2, 0);
    let reported = vec![sourced(&at("a", 800000)), sourced(&at("b", 800000))];

    let resolution = resolver.resolve(&reported).unwrap();
    assert_eq!(resolution.checkpoint.height, 800000);
    assert_eq!(resolution.missing, committees(&["c"]));
}

#[test]
fn test_resolve_below_quorum() {
    let resolver = ConsensusResolver::new(META_PROTOCOL, committees(&["a", "b", "c"]), 2, 0);
    let reported = vec![sourced(&at("a", 800000)), sourced(&at("b", 800010))];
    assert_eq!(
        resolver.resolve(&reported).unwrap_err(),
        ResolveError::Consensus(ConsensusError::InsufficientQuorum { required: 2 })
    );

    assert_eq!(
        resolver.resolve(&[]).unwrap_err(),
        ResolveError::Consensus(ConsensusError::NoCheckpoints)
    );
}

#[test]
fn test_resolve_single_committee_agrees_with_itself() {
    let resolver = ConsensusResolver::new(META_PROTOCOL, committees(&["a"]), 1, 0);
    let resolution = resolver.resolve(&[sourced(&at("a", 800000))]).unwrap();
    assert_eq!(resolution.agreeing, committees(&["a"]));
}

#[test]
fn test_resolve_below_minimal_checkpoint() {
    let resolver = ConsensusResolver::new(META_PROTOCOL, committees(&["a", "b"]), 2, 800005);
    let reported = vec![sourced(&at("a", 800000)), sourced(&at("b", 800000))];
    assert_eq!(
        resolver.resolve(&reported).unwrap_err(),
        ResolveError::Stale(StaleConfigError {
            height: 800000,
            minimal: 800005
        })
    );
}

#[test]
fn test_resolve_ignores_other_meta_protocols_and_unknown_committees() {
    let resolver = ConsensusResolver::new(META_PROTOCOL, committees(&["a", "b"]), 2, 0);
    let reported = vec![
        sourced(&at("a", 800000)),
        sourced(&at("b", 800000)),
        sourced(&forged("a", 800010).meta_protocol("runes")),
        sourced(&forged("b", 800010).meta_protocol("runes")),
        sourced(&forged("z", 800000)),
    ];

    let resolution = resolver.resolve(&reported).unwrap();
    assert_eq!(resolution.checkpoint, at("a", 800000).checkpoint());

    let only_foreign = vec![sourced(&at("a", 800000).meta_protocol("runes"))];
    assert_eq!(
        resolver.resolve(&only_foreign).unwrap_err(),
        ResolveError::Consensus(ConsensusError::NoCheckpoints)
    );
}

#[test]
fn test_deny_list_append_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("deny_list.jsonl");

    let mut list = DenyList::load(&path).unwrap();
    assert!(list.entries().is_empty());
    assert!(!list.is_denied(&source("c")));

    let entry = DenyEntry::new(source("c"), None);
    list.append(entry.clone()).unwrap();
    assert!(list.is_denied(&source("c")));
    assert!(!list.is_denied(&source("a")));

    let reloaded = DenyList::load(&path).unwrap();
    assert_eq!(reloaded.entries(), &[entry]);
    assert!(reloaded.is_denied(&source("c")));
    assert_eq!(reloaded.path(), Some(path.as_path()));
}

#[test]
fn test_deny_list_stops_at_unparsable_line() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("deny_list.jsonl");
    let first = serde_json::to_string(&DenyEntry::new(source("a"), None)).unwrap();
    let last = serde_json::to_string(&DenyEntry::new(source("c"), None)).unwrap();
    std::fs::write(&path, format!("{first}\n\nnot json\n{last}\n")).unwrap();

    let list = DenyList::load(&path).unwrap();
    assert_eq!(list.entries().len(), 1);
    assert!(list.is_denied(&source("a")));
    assert!(!list.is_denied(&source("c")));
}

#[test]
fn test_in_memory_deny_list() {
    let mut list = DenyList::in_memory();
    list.append(DenyEntry::new(source("b"), None)).unwrap();
    assert!(list.is_denied(&source("b")));
    assert_eq!(list.path(), None);
}

#[test]
fn test_conflict_evidence_targets_minority() {
    let documents = vec![
        normalizer()
            .normalize(&source("a"), &at("a", 800000).build())
            .unwrap(),
        normalizer()
            .normalize(&source("b"), &at("b", 800000).build())
            .unwrap(),
        normalizer()
            .normalize(&source("c"), &forged("c", 800000).build())
            .unwrap(),
    ];

    let entries = conflict_evidence(&documents, 800000, 2);
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.source_s3, Some(s3_source("c")));
    let evidence = entry.evidence.as_ref().unwrap();
    assert_eq!(evidence.height, 800000);
    assert_eq!(evidence.correct_commitment, at("a", 800000).checkpoint().commitment);
    assert_eq!(evidence.fraud_commitment, forged("c", 800000).checkpoint().commitment);

    // Without a quorum behind one commitment nobody can be blamed.
    assert!(conflict_evidence(&documents, 800000, 3).is_empty());
    assert!(conflict_evidence(&documents, 800010, 2).is_empty());
}

#[test]
fn test_deny_entry_wire_format() {
    let entry = DenyEntry::new(source("c"), None);
    let value = serde_json::to_value(&entry).unwrap();
    assert_eq!(
        value,
        json!({"sourceS3": {"region": "us-west-2", "bucket": "c-checkpoints", "name": "c"}})
    );
    let parsed: DenyEntry = serde_json::from_value(value).unwrap();
    assert_eq!(parsed, entry);
}
