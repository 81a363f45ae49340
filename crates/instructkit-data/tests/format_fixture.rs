//! Formatter tests against the on-disk JSONL fixtures.

use instructkit_core::{ConversationRow, FormattedRecord, MetaMathRow, RawSplit, Role};
use instructkit_data::{format_dataset, format_meta_math, format_rows};
use instructkit_hub::read_jsonl_rows;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load<T: serde::de::DeserializeOwned>(name: &str) -> Vec<T> {
    let rows = read_jsonl_rows(&fixture(name)).expect("Failed to read fixture");
    RawSplit::new("train", rows)
        .decode()
        .expect("Failed to decode fixture")
}

#[test]
fn test_wizardlm_fixture_pairs() {
    let rows: Vec<ConversationRow> = load("wizardlm_evol_instruct_v2.jsonl");
    let formatted = format_dataset(&rows, false).unwrap();

    assert_eq!(formatted.len(), rows.len());
    for (record, row) in formatted.iter().zip(&rows) {
        assert_eq!(record.instruction, row.conversations[0].value);
        assert_eq!(record.output, row.conversations[1].value);
        assert_eq!(record.input, "");
    }
}

#[test]
fn test_wizardlm_fixture_known_rows() {
    let rows: Vec<ConversationRow> = load("wizardlm_evol_instruct_v2.jsonl");
    let outcome = format_rows(&rows, false).unwrap();

    assert_eq!(outcome.records[0], FormattedRecord::new("2+2?", "4"));
    assert_eq!(outcome.records[2], FormattedRecord::new("oops", "hi"));
    assert_eq!(
        outcome.records[3],
        FormattedRecord::new(
            "Name a prime number greater than 10.",
            "11 is a prime number greater than 10."
        )
    );

    // Only row "9" has its roles swapped; the user/assistant aliases are fine.
    assert_eq!(outcome.mismatches.len(), 2);
    assert!(outcome.mismatches.iter().all(|m| m.idx == "9"));
    assert_eq!(outcome.mismatches[0].found, Role::Assistant);
    assert_eq!(outcome.mismatches[1].found, Role::Human);
}

#[test]
fn test_meta_math_fixture() {
    let rows: Vec<MetaMathRow> = load("meta_math_qa.jsonl");
    let formatted = format_meta_math(&rows);

    assert_eq!(formatted.len(), 3);
    for (record, row) in formatted.iter().zip(&rows) {
        assert_eq!(record.instruction, row.query);
        assert_eq!(record.output, row.response);
        assert!(record.input.is_empty());
    }
    assert_eq!(rows[1].kind, "MATH_AnsAug");
}
