//! Reading dataset files into JSON rows.
//!
//! Parquet batches are serialized with `arrow-json` and parsed back, which
//! keeps nested columns (lists of turn structs) intact without walking Arrow
//! arrays by hand.

use arrow_json::LineDelimitedWriter;
use instructkit_core::{Error, Result};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Read every row of a `.parquet`, `.jsonl` or `.json` file.
pub fn read_rows(path: &Path) -> Result<Vec<Value>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match extension.as_str() {
        "parquet" => read_parquet_rows(path),
        "jsonl" => read_jsonl_rows(path),
        "json" => read_json_rows(path),
        other => Err(Error::Dataset(format!(
            "Unsupported dataset file extension '{}' for {}",
            other,
            path.display()
        ))),
    }
}

/// Read a JSON Lines file. Blank lines are skipped.
pub fn read_jsonl_rows(path: &Path) -> Result<Vec<Value>> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value = serde_json::from_str(&line).map_err(|e| {
            Error::Dataset(format!("{} line {}: {}", path.display(), line_num + 1, e))
        })?;
        rows.push(value);
    }

    Ok(rows)
}

/// Read a JSON file holding an array of rows.
///
/// Files with a `.json` extension that are actually line-delimited are
/// accepted too.
pub fn read_json_rows(path: &Path) -> Result<Vec<Value>> {
    let reader = BufReader::new(File::open(path)?);
    match serde_json::from_reader::<_, Value>(reader) {
        Ok(Value::Array(rows)) => Ok(rows),
        Ok(Value::Object(_)) => Err(Error::Dataset(format!(
            "{} holds a single JSON object, expected an array of rows",
            path.display()
        ))),
        Ok(_) => Err(Error::Dataset(format!(
            "{} does not hold an array of rows",
            path.display()
        ))),
        Err(e) if e.is_syntax() || e.is_data() => {
            tracing::debug!(path = %path.display(), "Not a JSON array, reading as JSON Lines");
            read_jsonl_rows(path)
        }
        Err(e) => Err(e.into()),
    }
}

/// Read a Parquet file, one JSON object per row.
pub fn read_parquet_rows(path: &Path) -> Result<Vec<Value>> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .and_then(|builder| builder.build())
        .map_err(|e| {
            Error::Dataset(format!(
                "Failed to open Parquet file {}: {}",
                path.display(),
                e
            ))
        })?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch
            .map_err(|e| Error::Dataset(format!("Failed to read Parquet batch: {}", e)))?;

        let mut json_buf = Vec::new();
        {
            let mut writer = LineDelimitedWriter::new(&mut json_buf);
            writer
                .write(&batch)
                .and_then(|_| writer.finish())
                .map_err(|e| Error::Dataset(format!("Failed to convert Parquet batch: {}", e)))?;
        }

        for line in json_buf.split(|b| *b == b'\n') {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            rows.push(serde_json::from_slice(line)?);
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_jsonl_rows_skip_blank_lines() {
        let mut file = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();
        writeln!(file, r#"{{"query": "a", "response": "b"}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"query": "c", "response": "d"}}"#).unwrap();

        let rows = read_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["query"], "c");
    }

    #[test]
    fn test_jsonl_error_names_line() {
        let mut file = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();
        writeln!(file, r#"{{"query": "a"}}"#).unwrap();
        writeln!(file, "not json").unwrap();

        let err = read_rows(file.path()).unwrap_err().to_string();
        assert!(err.contains("line 2"), "unexpected error: {err}");
    }

    #[test]
    fn test_json_array_rows() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        let rows = json!([
            {"idx": "0", "conversations": [{"from": "human", "value": "hi"}]},
            {"idx": "1", "conversations": []}
        ]);
        write!(file, "{}", rows).unwrap();

        let read = read_rows(file.path()).unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0]["conversations"][0]["value"], "hi");
    }

    #[test]
    fn test_json_extension_with_lines() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, r#"{{"a": 1}}"#).unwrap();
        writeln!(file, r#"{{"a": 2}}"#).unwrap();

        let read = read_rows(file.path()).unwrap();
        assert_eq!(read, vec![json!({"a": 1}), json!({"a": 2})]);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        assert!(matches!(read_rows(file.path()), Err(Error::Dataset(_))));
    }

    #[test]
    fn test_parquet_rows() {
        use arrow::array::StringBuilder;
        use arrow::datatypes::{DataType, Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::arrow_writer::ArrowWriter;
        use std::sync::Arc;

        let temp_file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let path = temp_file.path().to_path_buf();

        let schema = Arc::new(Schema::new(vec![
            Field::new("query", DataType::Utf8, false),
            Field::new("response", DataType::Utf8, false),
        ]));

        let mut query = StringBuilder::new();
        query.append_value("What is 2+2?");
        query.append_value("What is 3*3?");
        let mut response = StringBuilder::new();
        response.append_value("4");
        response.append_value("9");

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(query.finish()), Arc::new(response.finish())],
        )
        .unwrap();

        let file = File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(
            rows,
            vec![
                json!({"query": "What is 2+2?", "response": "4"}),
                json!({"query": "What is 3*3?", "response": "9"}),
            ]
        );
    }
}
