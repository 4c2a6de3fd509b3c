//! File I/O: record ingestion, document text extraction and JSONL artifacts.
//!
//! Inputs are CSV, JSONL/JSON, plain text (one record per line) and Parquet.
//! When no text column is named, one is picked from the string columns,
//! preferring the common names in [`PREFERRED_TEXT_COLUMNS`].

use crate::error::DedupError;
use arrow::array::{Array, LargeStringArray, StringArray};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Column names tried first during auto-detection, in priority order.
pub const PREFERRED_TEXT_COLUMNS: &[&str] = &[
    "text",
    "content",
    "message",
    "body",
    "description",
    "title",
    "name",
];

/// Extensions picked up when scanning a directory of documents.
pub const DOCUMENT_EXTENSIONS: &[&str] = &[
    "txt", "md", "csv", "json", "jsonl", "pdf", "docx", "pptx", "xlsx",
];

/// Errors from ingestion and artifact writing.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Field '{field}' not found or not text at line {line}")]
    MissingField { field: String, line: usize },

    #[error("Column '{column}' not found")]
    ColumnNotFound { column: String },

    #[error("Column '{column}' is not a string column")]
    NotTextColumn { column: String },

    #[error("Could not auto-detect a text column; pass one explicitly")]
    NoTextColumn,

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, IoError>;

/// Input format, detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Csv,
    Jsonl,
    Text,
    Parquet,
}

impl InputFormat {
    /// Detect format from file path extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?;
        match ext.to_lowercase().as_str() {
            "csv" => Some(InputFormat::Csv),
            "jsonl" | "json" | "ndjson" => Some(InputFormat::Jsonl),
            "txt" | "text" => Some(InputFormat::Text),
            "parquet" | "pq" => Some(InputFormat::Parquet),
            _ => None,
        }
    }
}

/// Texts read from an input file.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested {
    /// One entry per input row, in file order.
    pub texts: Vec<String>,
    /// Column the texts were taken from.
    pub column: String,
    pub format: InputFormat,
}

/// Pick a text column from the string-typed candidates.
///
/// A preferred name wins if present; otherwise the first candidate.
pub fn detect_text_column<S: AsRef<str>>(candidates: &[S]) -> Option<String> {
    PREFERRED_TEXT_COLUMNS
        .iter()
        .find(|p| candidates.iter().any(|c| c.as_ref() == **p))
        .map(|p| (*p).to_string())
        .or_else(|| candidates.first().map(|c| c.as_ref().to_string()))
}

/// Read one text per row from `path`.
///
/// `column` selects the text field; `None` auto-detects it. Plain-text files
/// have a single implicit `text` column holding each trimmed line.
pub fn read_texts<P: AsRef<Path>>(path: P, column: Option<&str>) -> Result<Ingested> {
    let path = path.as_ref();
    let format = InputFormat::from_path(path)
        .ok_or_else(|| IoError::UnsupportedFormat(path.display().to_string()))?;

    let (texts, column) = match format {
        InputFormat::Csv => read_csv_texts(path, column)?,
        InputFormat::Jsonl => {
            let rows = read_json_rows(path)?;
            texts_from_rows(&rows, column)?
        }
        InputFormat::Text => {
            if let Some(c) = column {
                debug!(column = c, "ignoring text column for plain-text input");
            }
            (read_lines(path)?, "text".to_string())
        }
        InputFormat::Parquet => read_parquet_texts(path, column)?,
    };

    debug!(
        path = %path.display(),
        rows = texts.len(),
        column = %column,
        "ingested records"
    );
    Ok(Ingested {
        texts,
        column,
        format,
    })
}

/// Read a headed CSV file. Empty cells and short rows yield empty text.
///
/// Columns whose non-empty cells all parse as numbers are not auto-detected.
fn read_csv_texts(path: &Path, column: Option<&str>) -> Result<(Vec<String>, String)> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .collect::<std::result::Result<Vec<csv::StringRecord>, _>>()?;

    let column = match column {
        Some(c) => c.to_string(),
        None => {
            let candidates: Vec<&str> = headers
                .iter()
                .enumerate()
                .filter(|(idx, _)| !is_numeric_column(&rows, *idx))
                .map(|(_, h)| h.as_str())
                .collect();
            detect_text_column(&candidates).ok_or(IoError::NoTextColumn)?
        }
    };
    let idx = headers
        .iter()
        .position(|h| *h == column)
        .ok_or_else(|| IoError::ColumnNotFound {
            column: column.clone(),
        })?;

    let texts = rows
        .iter()
        .map(|row| row.get(idx).unwrap_or_default().to_string())
        .collect();
    Ok((texts, column))
}

fn is_numeric_column(rows: &[csv::StringRecord], idx: usize) -> bool {
    let mut cells = rows
        .iter()
        .filter_map(|row| row.get(idx))
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .peekable();
    cells.peek().is_some() && cells.all(|cell| cell.parse::<f64>().is_ok())
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(|l| l.trim().to_string())
        .collect())
}

/// Parse a JSON array of objects, or one object per line.
fn read_json_rows(path: &Path) -> Result<Vec<Map<String, Value>>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let starts_with_array = {
        let buf = reader.fill_buf()?;
        buf.iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|b| *b == b'[')
    };

    if starts_with_array {
        let values: Vec<Value> = serde_json::from_reader(reader).map_err(|e| IoError::Parse {
            line: e.line(),
            message: e.to_string(),
        })?;
        return values
            .into_iter()
            .enumerate()
            .map(|(i, v)| into_object(v, i + 1))
            .collect();
    }

    let mut rows = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line).map_err(|e| IoError::Parse {
            line: line_num + 1,
            message: e.to_string(),
        })?;
        rows.push(into_object(value, line_num + 1)?);
    }
    Ok(rows)
}

fn into_object(value: Value, line: usize) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(IoError::Parse {
            line,
            message: format!("expected a JSON object, found {other}"),
        }),
    }
}

fn texts_from_rows(rows: &[Map<String, Value>], column: Option<&str>) -> Result<(Vec<String>, String)> {
    let column = match column {
        Some(c) => c.to_string(),
        None => {
            let candidates = string_keys(rows);
            detect_text_column(&candidates).ok_or(IoError::NoTextColumn)?
        }
    };

    let texts = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            scalar_text(row.get(&column)).ok_or_else(|| IoError::MissingField {
                field: column.clone(),
                line: i + 1,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((texts, column))
}

/// Keys holding a string in every row, in key order of the first row.
fn string_keys(rows: &[Map<String, Value>]) -> Vec<String> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    first
        .keys()
        .filter(|k| rows.iter().all(|r| matches!(r.get(*k), Some(Value::String(_)))))
        .cloned()
        .collect()
}

fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn read_parquet_texts(path: &Path, column: Option<&str>) -> Result<(Vec<String>, String)> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

    let schema = builder.schema().clone();
    let column = match column {
        Some(c) => {
            let field = schema
                .field_with_name(c)
                .map_err(|_| IoError::ColumnNotFound { column: c.to_string() })?;
            if !is_string_type(field.data_type()) {
                return Err(IoError::NotTextColumn { column: c.to_string() });
            }
            c.to_string()
        }
        None => {
            let candidates: Vec<&str> = schema
                .fields()
                .iter()
                .filter(|f| is_string_type(f.data_type()))
                .map(|f| f.name().as_str())
                .collect();
            detect_text_column(&candidates).ok_or(IoError::NoTextColumn)?
        }
    };

    let reader = builder.build()?;
    let mut texts = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;
        let idx = batch
            .schema()
            .index_of(&column)
            .map_err(|_| IoError::ColumnNotFound {
                column: column.clone(),
            })?;
        let array = batch.column(idx);

        if let Some(strings) = array.as_any().downcast_ref::<StringArray>() {
            texts.extend((0..strings.len()).map(|row| {
                if strings.is_null(row) {
                    String::new()
                } else {
                    strings.value(row).to_string()
                }
            }));
        } else if let Some(strings) = array.as_any().downcast_ref::<LargeStringArray>() {
            texts.extend((0..strings.len()).map(|row| {
                if strings.is_null(row) {
                    String::new()
                } else {
                    strings.value(row).to_string()
                }
            }));
        } else {
            return Err(IoError::NotTextColumn { column });
        }
    }

    Ok((texts, column))
}

fn is_string_type(data_type: &DataType) -> bool {
    matches!(data_type, DataType::Utf8 | DataType::LargeUtf8)
}

/// One line of a JSONL artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRow {
    pub id: u64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_text: Option<String>,
    /// Hex fingerprint of the normalized text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Id of the record this one duplicates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<u64>,
}

/// Write serializable rows as JSONL, creating parent directories.
pub fn write_jsonl<P: AsRef<Path>, T: Serialize>(path: P, rows: &[T]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

/// Row of the `ingested.csv` artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestedRow {
    pub temp_id: u64,
    #[serde(rename = "_text")]
    pub text: String,
}

/// Row of the `normalized.csv` artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub temp_id: u64,
    #[serde(rename = "_text")]
    pub text: String,
    #[serde(rename = "_norm")]
    pub normalized: String,
}

/// Write rows as a headed CSV file, creating parent directories.
///
/// The header comes from the row type's field names; an empty slice writes
/// an empty file.
pub fn write_csv<P: AsRef<Path>, T: Serialize>(path: P, rows: &[T]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a JSONL artifact back.
pub fn read_artifact<P: AsRef<Path>>(path: P) -> Result<Vec<ArtifactRow>> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        rows.push(serde_json::from_str(&line).map_err(|e| IoError::Parse {
            line: line_num + 1,
            message: e.to_string(),
        })?);
    }
    Ok(rows)
}

/// Extract plain text from a document.
///
/// Text-like files (`txt`, `md`, `csv`) are read as-is; JSON/JSONL rows are
/// flattened to their scalar values joined by spaces, one row per line. Other
/// extensions yield an empty string.
pub fn extract_text<P: AsRef<Path>>(path: P) -> crate::error::Result<String> {
    let path = path.as_ref();
    let failure = |message: String| DedupError::ExtractionFailure {
        path: path.to_path_buf(),
        message,
    };

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "txt" | "md" | "csv" | "text" => {
            let bytes = std::fs::read(path).map_err(|e| failure(e.to_string()))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        "json" | "jsonl" | "ndjson" => {
            let rows = read_json_rows(path).map_err(|e| failure(e.to_string()))?;
            Ok(rows
                .iter()
                .map(|row| {
                    row.values()
                        .filter_map(|v| scalar_text(Some(v)))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect::<Vec<_>>()
                .join("\n"))
        }
        _ => {
            debug!(path = %path.display(), "no text extractor for extension");
            Ok(String::new())
        }
    }
}

/// [`extract_text`], with failures logged and replaced by an empty string.
pub fn extract_text_or_empty<P: AsRef<Path>>(path: P) -> String {
    match extract_text(path) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "text extraction failed; using empty text");
            String::new()
        }
    }
}

/// Recursively list document files under `dir`, sorted by path.
pub fn collect_dir_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(IoError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("not a directory: {}", dir.display()),
        )));
    }

    let files = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        })
        .map(|e| e.into_path())
        .collect();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_jsonl_auto_detects_preferred_column() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "in.jsonl",
            "{\"author\": \"a\", \"body\": \"Hello world\"}\n\n{\"author\": \"b\", \"body\": \"Second\"}\n",
        );
        let ingested = read_texts(&path, None).unwrap();
        assert_eq!(ingested.column, "body");
        assert_eq!(ingested.texts, vec!["Hello world", "Second"]);
        assert_eq!(ingested.format, InputFormat::Jsonl);
    }

    #[test]
    fn test_read_jsonl_explicit_column() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "in.jsonl", "{\"text\": \"x\", \"note\": \"keep me\"}\n");
        let ingested = read_texts(&path, Some("note")).unwrap();
        assert_eq!(ingested.texts, vec!["keep me"]);
    }

    #[test]
    fn test_read_jsonl_missing_field() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "in.jsonl", "{\"text\": \"a\"}\n{\"other\": \"b\"}\n");
        let err = read_texts(&path, Some("text")).unwrap_err();
        assert!(matches!(err, IoError::MissingField { line: 2, .. }));
    }

    #[test]
    fn test_read_jsonl_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "in.jsonl", "{\"text\": \"a\"}\nnot json\n");
        let err = read_texts(&path, None).unwrap_err();
        assert!(matches!(err, IoError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_read_json_array() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "in.json",
            "  [{\"id\": 1, \"content\": \"first\"}, {\"id\": 2, \"content\": \"second\"}]",
        );
        let ingested = read_texts(&path, None).unwrap();
        assert_eq!(ingested.column, "content");
        assert_eq!(ingested.texts, vec!["first", "second"]);
    }

    #[test]
    fn test_no_text_column() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "in.jsonl", "{\"n\": 1}\n{\"n\": 2}\n");
        assert!(matches!(read_texts(&path, None), Err(IoError::NoTextColumn)));
    }

    #[test]
    fn test_read_txt_lines() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "in.txt", "  first line \nsecond\n\nthird\n");
        let ingested = read_texts(&path, None).unwrap();
        assert_eq!(ingested.column, "text");
        assert_eq!(ingested.texts, vec!["first line", "second", "", "third"]);
    }

    #[test]
    fn test_unsupported_format() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "in.xml", "<text>hello</text>");
        assert!(matches!(read_texts(&path, None), Err(IoError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_read_csv_auto_detects_text_column() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "in.csv",
            "id,author,message\n1,ann,\"Hello, world\"\n2,bob,\n3,cy,\"multi\nline\"\n",
        );
        let ingested = read_texts(&path, None).unwrap();
        assert_eq!(ingested.format, InputFormat::Csv);
        assert_eq!(ingested.column, "message");
        assert_eq!(ingested.texts, vec!["Hello, world", "", "multi\nline"]);
    }

    #[test]
    fn test_read_csv_skips_numeric_columns() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "in.csv", "score,remark\n1.5,good\n2,\n,fine\n");
        let ingested = read_texts(&path, None).unwrap();
        assert_eq!(ingested.column, "remark");
        assert_eq!(ingested.texts, vec!["good", "", "fine"]);

        let numeric_only = write_file(&dir, "nums.csv", "a,b\n1,2\n3,4\n");
        assert!(matches!(read_texts(&numeric_only, None), Err(IoError::NoTextColumn)));
    }

    #[test]
    fn test_read_csv_explicit_column() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "in.csv", "text,note\na,first\nb\n");
        let ingested = read_texts(&path, Some("note")).unwrap();
        assert_eq!(ingested.texts, vec!["first", ""]);
        assert!(matches!(
            read_texts(&path, Some("missing")),
            Err(IoError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_write_csv_artifacts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("normalized.csv");
        let rows = vec![
            NormalizedRow {
                temp_id: 1,
                text: "Hello, World".into(),
                normalized: "hello world".into(),
            },
            NormalizedRow {
                temp_id: 2,
                text: "x".into(),
                normalized: "x".into(),
            },
        ];
        write_csv(&path, &rows).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "temp_id,_text,_norm");
        assert_eq!(lines[1], "1,\"Hello, World\",hello world");
        assert_eq!(lines.len(), 3);

        let back: Vec<NormalizedRow> = csv::Reader::from_path(&path)
            .unwrap()
            .deserialize()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn test_read_parquet_auto_detect() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.parquet");

        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("title", DataType::Utf8, true),
            Field::new("description", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef,
                Arc::new(StringArray::from(vec![Some("a"), Some("b"), Some("c")])) as ArrayRef,
                Arc::new(StringArray::from(vec![Some("first doc"), None, Some("third doc")])) as ArrayRef,
            ],
        )
        .unwrap();
        let file = File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ingested = read_texts(&path, None).unwrap();
        assert_eq!(ingested.column, "description");
        assert_eq!(ingested.texts, vec!["first doc", "", "third doc"]);

        assert!(matches!(
            read_texts(&path, Some("id")),
            Err(IoError::NotTextColumn { .. })
        ));
        assert!(matches!(
            read_texts(&path, Some("missing")),
            Err(IoError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_detect_text_column() {
        assert_eq!(detect_text_column(&["zeta", "title", "content"]), Some("content".to_string()));
        assert_eq!(detect_text_column(&["zeta", "alpha"]), Some("zeta".to_string()));
        assert_eq!(detect_text_column::<&str>(&[]), None);
    }

    #[test]
    fn test_write_and_read_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("rows.jsonl");
        let rows = vec![
            ArtifactRow {
                id: 1,
                text: "Hello".into(),
                normalized_text: Some("hello".into()),
                fingerprint: None,
                duplicate_of: None,
            },
            ArtifactRow {
                id: 2,
                text: "hello!".into(),
                normalized_text: Some("hello".into()),
                fingerprint: Some("ab".into()),
                duplicate_of: Some(1),
            },
        ];
        write_jsonl(&path, &rows).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(!content.lines().next().unwrap().contains("duplicate_of"));
        assert_eq!(read_artifact(&path).unwrap(), rows);
    }

    #[test]
    fn test_extract_text_variants() {
        let dir = TempDir::new().unwrap();
        let txt = write_file(&dir, "a.txt", "plain words");
        let json = write_file(&dir, "b.jsonl", "{\"a\": \"x\", \"b\": 2}\n{\"a\": \"y\"}\n");
        let pdf = write_file(&dir, "c.pdf", "%PDF-1.4");

        assert_eq!(extract_text(&txt).unwrap(), "plain words");
        assert_eq!(extract_text(&json).unwrap(), "x 2\ny");
        assert_eq!(extract_text(&pdf).unwrap(), "");
    }

    #[test]
    fn test_extract_failure_recovered() {
        let dir = TempDir::new().unwrap();
        let broken = write_file(&dir, "broken.json", "{not json");
        assert!(matches!(
            extract_text(&broken),
            Err(DedupError::ExtractionFailure { .. })
        ));
        assert_eq!(extract_text_or_empty(&broken), "");
        assert_eq!(extract_text_or_empty(dir.path().join("missing.txt")), "");
    }

    #[test]
    fn test_collect_dir_files() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        write_file(&dir, "b.txt", "b");
        write_file(&dir, "a.md", "a");
        write_file(&dir, "skip.bin", "x");
        write_file(&dir, "sub/c.JSON", "{}");

        let files = collect_dir_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.md", "b.txt", "sub/c.JSON"]);

        assert!(collect_dir_files(dir.path().join("nope")).is_err());
    }
}
