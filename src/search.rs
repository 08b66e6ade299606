use std::path::Path;

use serde_json::Value;
use serde_json_path::JsonPath;
use tracing::debug;

use crate::{
  channel::{ChunkSink, Chunker},
  engine::CoreError,
  formats::RecordReader,
  models::{FileFormat, Record, SearchQuery, SearchResult, SearchStats},
};

/// A query normalized once so the per-record test is allocation-light:
/// text is pre-folded for case-insensitive mode, the JSONPath is
/// pre-compiled. The `regex` flag is accepted upstream but matching is
/// literal substring.
pub(crate) struct PreparedQuery {
  text: Option<String>,
  path: Option<JsonPath>,
  case_sensitive: bool,
}

impl PreparedQuery {
  pub(crate) fn new(query: &SearchQuery) -> Result<Self, CoreError> {
    let text = query
      .text
      .as_deref()
      .map(str::trim)
      .filter(|t| !t.is_empty())
      .map(|t| {
        if query.case_sensitive {
          t.to_string()
        } else {
          t.to_lowercase()
        }
      });

    let path = match query
      .json_path
      .as_deref()
      .map(str::trim)
      .filter(|p| !p.is_empty())
    {
      Some(p) => Some(JsonPath::parse(p).map_err(|e| CoreError::Query(e.to_string()))?),
      None => None,
    };

    Ok(Self {
      text,
      path,
      case_sensitive: query.case_sensitive,
    })
  }

  /// Test one record. Returns the result to emit, or `None`.
  ///
  /// Modes by which parts are present:
  /// - neither: never matches (the scan still counts the record);
  /// - text only: substring over the raw content, which is also the
  ///   reported projection;
  /// - path only: matches iff the JSONPath yields ≥ 1 node, projections
  ///   are the stringified nodes;
  /// - both: projections are the JSONPath nodes whose string form
  ///   contains the text; matches iff ≥ 1 survives.
  pub(crate) fn match_record(&self, record: &Record) -> Option<SearchResult> {
    let matches = match (&self.text, &self.path) {
      (None, None) => return None,
      (Some(text), None) => {
        if !self.normalize(&record.content).contains(text.as_str()) {
          return None;
        }
        vec![record.content.clone()]
      }
      (None, Some(path)) => {
        let nodes = path.query(&record.parsed).all();
        if nodes.is_empty() {
          return None;
        }
        nodes.into_iter().map(node_text).collect()
      }
      (Some(text), Some(path)) => {
        let hits: Vec<String> = path
          .query(&record.parsed)
          .all()
          .into_iter()
          .map(node_text)
          .filter(|s| self.normalize(s).contains(text.as_str()))
          .collect();
        if hits.is_empty() {
          return None;
        }
        hits
      }
    };

    Some(SearchResult {
      line_id: record.id,
      matches,
      context: record.content.clone(),
    })
  }

  fn normalize(&self, s: &str) -> String {
    if self.case_sensitive {
      s.to_string()
    } else {
      s.to_lowercase()
    }
  }
}

/// Canonical string form of a JSONPath node: primitives as-is (`null`
/// included), containers as compact JSON.
fn node_text(value: &Value) -> String {
  match value {
    Value::Null => "null".to_string(),
    Value::Bool(b) => b.to_string(),
    Value::Number(n) => n.to_string(),
    Value::String(s) => s.clone(),
    Value::Array(_) | Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
  }
}

/// Scan the whole file, streaming matches in record order.
pub(crate) fn run_search(
  path: &Path,
  query: &SearchQuery,
  format: FileFormat,
  sink: &dyn ChunkSink<SearchResult>,
  chunk_size: usize,
) -> Result<SearchStats, CoreError> {
  let prepared = PreparedQuery::new(query)?;
  let mut reader = RecordReader::open(path, format)?;
  let mut chunker = Chunker::new(sink, chunk_size);
  let mut stats = SearchStats::default();

  for rec in &mut reader {
    let rec = rec?;
    stats.lines_searched += 1;
    if let Some(hit) = prepared.match_record(&rec) {
      stats.total_matches += 1;
      chunker.push(hit)?;
    }
  }
  chunker.finish()?;

  debug!(
    path = %path.display(),
    total_matches = stats.total_matches,
    lines_searched = stats.lines_searched,
    "search finished"
  );
  Ok(stats)
}
