use std::{fs::File, io::Read, path::Path};

use crate::{
  engine::CoreError,
  models::{FileFormat, Record},
};

mod json_array;
mod jsonl;

/// Decide the source layout: `.jsonl`/`.ndjson` extensions win, otherwise
/// the first non-whitespace byte (BOM tolerated) decides — `[` means a
/// root array, anything else is treated as line-delimited.
pub(crate) fn detect_format(path: &Path) -> Result<FileFormat, CoreError> {
  let ext = path
    .extension()
    .and_then(|s| s.to_str())
    .unwrap_or("")
    .to_ascii_lowercase();
  if matches!(ext.as_str(), "jsonl" | "ndjson") {
    return Ok(FileFormat::JsonL);
  }

  let mut head = [0u8; 4096];
  let n = File::open(path)?.read(&mut head)?;
  let mut bytes = &head[..n];
  if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
    bytes = &bytes[3..];
  }
  let first = bytes
    .iter()
    .find(|b| **b != 0 && !b.is_ascii_whitespace());
  match first {
    Some(b'[') => Ok(FileFormat::JsonArray),
    _ => Ok(FileFormat::JsonL),
  }
}

/// Streaming record source over either layout. Records carry consecutive
/// ids starting at 0 and the byte offset where their text begins.
pub(crate) enum RecordReader {
  Lines(jsonl::LinesReader),
  Array(json_array::ArrayReader),
}

impl RecordReader {
  pub(crate) fn open(path: &Path, format: FileFormat) -> Result<Self, CoreError> {
    match format {
      FileFormat::JsonL => Ok(Self::Lines(jsonl::LinesReader::open(path)?)),
      FileFormat::JsonArray => Ok(Self::Array(json_array::ArrayReader::open(path)?)),
    }
  }

  /// Malformed lines dropped so far (always 0 for array sources, where a
  /// malformed element fails the whole document instead).
  pub(crate) fn skipped(&self) -> u64 {
    match self {
      Self::Lines(r) => r.skipped(),
      Self::Array(_) => 0,
    }
  }
}

impl Iterator for RecordReader {
  type Item = Result<Record, CoreError>;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      Self::Lines(r) => r.next(),
      Self::Array(r) => r.next(),
    }
  }
}
