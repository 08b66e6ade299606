use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Source layout of an opened file.
///
/// Wire spellings are fixed (`"JsonL"` / `"JsonArray"`); the UI passes
/// them back verbatim into search/sort invocations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FileFormat {
  JsonL,
  JsonArray,
}

/// One logical record: a JSONL line or one element of the outer array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
  /// Zero-based index in the emitted record stream. Stable for the
  /// session, never persisted.
  pub id: u64,
  /// Verbatim textual form of the record (line or array element), minus
  /// line terminator / trailing separator.
  pub content: String,
  /// The record's JSON value. `parse(content) == parsed` always holds.
  pub parsed: Value,
  /// Byte position in the file where `content` begins.
  pub byte_offset: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
  pub path: String,
  /// Count of records actually emitted (skipped lines excluded).
  pub total_lines: u64,
  pub file_size: u64,
  pub format: FileFormat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
  #[serde(default)]
  pub text: Option<String>,
  #[serde(default)]
  pub json_path: Option<String>,
  #[serde(default)]
  pub case_sensitive: bool,
  /// Accepted for wire compatibility; matching is currently literal.
  #[serde(default)]
  pub regex: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
  pub line_id: u64,
  /// String projections that satisfied the predicate (see the search
  /// module for what a projection is per mode).
  pub matches: Vec<String>,
  /// The record's raw JSON text.
  pub context: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SearchStats {
  pub total_matches: u64,
  pub lines_searched: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
  Asc,
  Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortColumn {
  /// Flat underscore-joined path, e.g. `user_name`.
  pub column: String,
  pub direction: SortDirection,
}

/// A column surfaced by schema inference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnInfo {
  pub path: String,
  /// True iff every sampled occurrence was a plain scalar (or absent).
  pub is_sortable: bool,
  /// `path` with its first segment stripped when it has ≥ 2 segments.
  pub display_name: String,
}
