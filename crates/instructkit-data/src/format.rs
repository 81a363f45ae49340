//! Conversion of raw dataset rows into single-turn SFT records.

use instructkit_core::{ConversationRow, Error, FormattedRecord, MetaMathRow, Result, Role, Turn};

/// A turn whose speaker is not the one expected at its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMismatch {
    /// Row identifier.
    pub idx: String,
    /// Turn position (0 for the prompt, 1 for the response).
    pub position: usize,
    /// Role the position should hold.
    pub expected: Role,
    /// Role actually found.
    pub found: Role,
}

/// Records produced from a batch of rows, with the role problems seen.
#[derive(Debug, Clone, Default)]
pub struct FormatOutcome {
    /// One record per input row, in input order.
    pub records: Vec<FormattedRecord>,
    /// Every role mismatch encountered. Each one was also logged.
    pub mismatches: Vec<RoleMismatch>,
}

/// Convert ShareGPT-style conversations into single-turn SFT records.
///
/// Record `i` is built from row `i`: the first turn becomes `instruction`,
/// the second becomes `output`, and `input` is left empty. Turns after the
/// first pair are dropped.
///
/// A first turn that is not from the human, or a second turn that is not
/// from the model, is logged as a warning and used anyway. A row with fewer
/// than two turns fails with [`Error::MissingTurn`].
///
/// `include_multiturn_conversations` has no effect and only exists for
/// callers that pass it.
pub fn format_dataset(
    rows: &[ConversationRow],
    include_multiturn_conversations: bool,
) -> Result<Vec<FormattedRecord>> {
    format_rows(rows, include_multiturn_conversations).map(|outcome| outcome.records)
}

/// Like [`format_dataset`], but also returns the role mismatches.
pub fn format_rows(
    rows: &[ConversationRow],
    _include_multiturn_conversations: bool,
) -> Result<FormatOutcome> {
    let mut outcome = FormatOutcome {
        records: Vec::with_capacity(rows.len()),
        mismatches: Vec::new(),
    };

    for row in rows {
        let human = turn_at(row, 0)?;
        if let Some(mismatch) = check_role(row, 0, human, Role::Human) {
            outcome.mismatches.push(mismatch);
        }

        let ai = turn_at(row, 1)?;
        if let Some(mismatch) = check_role(row, 1, ai, Role::Assistant) {
            outcome.mismatches.push(mismatch);
        }

        outcome.records.push(FormattedRecord {
            instruction: human.value.clone(),
            input: String::new(),
            output: ai.value.clone(),
        });
    }

    Ok(outcome)
}

/// Convert MetaMathQA rows: `query` becomes `instruction`, `response` becomes `output`.
pub fn format_meta_math(rows: &[MetaMathRow]) -> Vec<FormattedRecord> {
    rows.iter()
        .map(|row| FormattedRecord::new(row.query.clone(), row.response.clone()))
        .collect()
}

fn turn_at(row: &ConversationRow, position: usize) -> Result<&Turn> {
    row.conversations
        .get(position)
        .ok_or_else(|| Error::MissingTurn {
            idx: row.idx.clone(),
            position,
            len: row.conversations.len(),
        })
}

fn check_role(
    row: &ConversationRow,
    position: usize,
    turn: &Turn,
    expected: Role,
) -> Option<RoleMismatch> {
    if turn.from == expected {
        return None;
    }

    let expected_label = match expected {
        Role::Human => "user",
        Role::Assistant => "assistant",
    };
    tracing::warn!(
        row = %row.idx,
        expected = expected_label,
        found = %turn.from,
        "Row is corrupted: unexpected role, using its value anyway"
    );

    Some(RoleMismatch {
        idx: row.idx.clone(),
        position,
        expected,
        found: turn.from,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(idx: &str, turns: Vec<Turn>) -> ConversationRow {
        ConversationRow {
            conversations: turns,
            idx: idx.to_string(),
        }
    }

    #[test]
    fn test_well_formed_row() {
        let rows = vec![row("7", vec![Turn::human("2+2?"), Turn::assistant("4")])];

        let formatted = format_dataset(&rows, false).unwrap();
        assert_eq!(formatted, vec![FormattedRecord::new("2+2?", "4")]);
        assert_eq!(formatted[0].input, "");
    }

    #[test]
    fn test_swapped_roles_warn_but_format() {
        let rows = vec![row("9", vec![Turn::assistant("oops"), Turn::human("hi")])];

        let outcome = format_rows(&rows, false).unwrap();
        assert_eq!(outcome.records, vec![FormattedRecord::new("oops", "hi")]);
        assert_eq!(
            outcome.mismatches,
            vec![
                RoleMismatch {
                    idx: "9".to_string(),
                    position: 0,
                    expected: Role::Human,
                    found: Role::Assistant,
                },
                RoleMismatch {
                    idx: "9".to_string(),
                    position: 1,
                    expected: Role::Assistant,
                    found: Role::Human,
                },
            ]
        );
    }

    #[test]
    fn test_single_turn_is_structural_error() {
        let rows = vec![row("3", vec![Turn::human("alone")])];

        match format_dataset(&rows, false) {
            Err(Error::MissingTurn { idx, position, len }) => {
                assert_eq!(idx, "3");
                assert_eq!(position, 1);
                assert_eq!(len, 1);
            }
            other => panic!("expected MissingTurn, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_conversation_fails_on_first_turn() {
        let rows = vec![row("4", Vec::new())];
        assert!(matches!(
            format_dataset(&rows, false),
            Err(Error::MissingTurn { position: 0, .. })
        ));
    }

    #[test]
    fn test_extra_turns_discarded() {
        let rows = vec![row(
            "5",
            vec![
                Turn::human("first"),
                Turn::assistant("answer"),
                Turn::human("follow-up"),
                Turn::assistant("second answer"),
            ],
        )];

        let formatted = format_dataset(&rows, true).unwrap();
        assert_eq!(formatted, vec![FormattedRecord::new("first", "answer")]);
    }

    #[test]
    fn test_multiturn_flag_has_no_effect() {
        let rows = vec![
            row("0", vec![Turn::human("a"), Turn::assistant("b"), Turn::human("c")]),
            row("1", vec![Turn::human("d"), Turn::assistant("e")]),
        ];
        assert_eq!(
            format_dataset(&rows, false).unwrap(),
            format_dataset(&rows, true).unwrap()
        );
    }

    #[test]
    fn test_order_and_length_preserved() {
        let rows: Vec<ConversationRow> = (0..50)
            .map(|i| {
                row(
                    &i.to_string(),
                    vec![Turn::human(format!("q{i}")), Turn::assistant(format!("a{i}"))],
                )
            })
            .collect();

        let formatted = format_dataset(&rows, false).unwrap();
        assert_eq!(formatted.len(), rows.len());
        for (record, row) in formatted.iter().zip(&rows) {
            assert_eq!(record.instruction, row.conversations[0].value);
            assert_eq!(record.output, row.conversations[1].value);
            assert!(record.input.is_empty());
        }
    }

    #[test]
    fn test_input_rows_untouched() {
        let rows = vec![row("1", vec![Turn::assistant("x"), Turn::assistant("y")])];
        let before = rows.clone();
        let _ = format_dataset(&rows, false).unwrap();
        assert_eq!(rows, before);
    }

    #[test]
    fn test_meta_math() {
        let rows = vec![MetaMathRow {
            query: "What is 5-3?".to_string(),
            response: "5-3 = 2. The answer is: 2".to_string(),
            kind: "GSM_AnsAug".to_string(),
            original_question: "What is 5-3?".to_string(),
        }];

        let formatted = format_meta_math(&rows);
        assert_eq!(formatted.len(), 1);
        assert_eq!(formatted[0].instruction, "What is 5-3?");
        assert_eq!(formatted[0].input, "");
        assert_eq!(formatted[0].output, "5-3 = 2. The answer is: 2");
    }
}
