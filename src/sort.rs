use std::path::Path;

use serde_json::Value;

use crate::{
  channel::{ChunkSink, Chunker},
  engine::CoreError,
  formats::RecordReader,
  models::{FileFormat, Record, SearchResult, SortColumn, SortDirection},
  value::{get_flat, smart_format, text_key, to_sort_key, SortKey},
};

/// Sort every record of a file by a flat column and stream the result.
///
/// The whole file is materialized; keys are pre-extracted so the
/// comparator never touches JSON.
pub(crate) fn sort_file(
  path: &Path,
  sort_column: &SortColumn,
  format: FileFormat,
  sink: &dyn ChunkSink<Record>,
  chunk_size: usize,
) -> Result<u64, CoreError> {
  validate(sort_column)?;

  let mut reader = RecordReader::open(path, format)?;
  let mut keyed: Vec<(SortKey, String, Record)> = Vec::new();
  for rec in &mut reader {
    let rec = rec?;
    let target = get_flat(&rec.parsed, &sort_column.column);
    let key = to_sort_key(target);
    let display = smart_format(target).text;
    keyed.push((key, display, rec));
  }

  stream_ordered(keyed, sort_column.direction, sink, chunk_size)
}

/// Sort an already-delivered result set; each result's `context` is
/// re-parsed to extract the key. Unparseable context yields a `Null`
/// key (key-extraction failure is not an error here).
pub(crate) fn sort_results(
  results: Vec<SearchResult>,
  sort_column: &SortColumn,
  sink: &dyn ChunkSink<SearchResult>,
  chunk_size: usize,
) -> Result<u64, CoreError> {
  validate(sort_column)?;

  let keyed: Vec<(SortKey, String, SearchResult)> = results
    .into_iter()
    .map(|res| {
      let parsed: Option<Value> = serde_json::from_str(&res.context).ok();
      let target = parsed.as_ref().and_then(|v| get_flat(v, &sort_column.column));
      let key = to_sort_key(target);
      let display = smart_format(target).text;
      (key, display, res)
    })
    .collect();

  stream_ordered(keyed, sort_column.direction, sink, chunk_size)
}

fn validate(sort_column: &SortColumn) -> Result<(), CoreError> {
  if sort_column.column.trim().is_empty() {
    return Err(CoreError::InvalidArg("sort column is empty".into()));
  }
  Ok(())
}

fn stream_ordered<T>(
  keyed: Vec<(SortKey, String, T)>,
  direction: SortDirection,
  sink: &dyn ChunkSink<T>,
  chunk_size: usize,
) -> Result<u64, CoreError> {
  let ordered = order(keyed, direction);
  let count = ordered.len() as u64;
  let mut chunker = Chunker::new(sink, chunk_size);
  for item in ordered {
    chunker.push(item)?;
  }
  chunker.finish()?;
  Ok(count)
}

/// Stable ordering with the column-level rules:
/// - mixed non-null variants re-coerce everything to `Text` of the
///   display form;
/// - `Null` keys form a contiguous tail in original order, regardless
///   of direction;
/// - `desc` reverses key comparison only, so equal keys keep original
///   order either way.
fn order<T>(keyed: Vec<(SortKey, String, T)>, direction: SortDirection) -> Vec<T> {
  let mut variants_seen = [false; 3];
  for (key, _, _) in &keyed {
    if !key.is_null() {
      variants_seen[key.rank() as usize] = true;
    }
  }
  let heterogeneous = variants_seen.iter().filter(|seen| **seen).count() > 1;

  let mut non_null: Vec<(SortKey, T)> = Vec::new();
  let mut nulls: Vec<T> = Vec::new();
  for (key, display, item) in keyed {
    if key.is_null() {
      nulls.push(item);
    } else if heterogeneous {
      non_null.push((text_key(&display), item));
    } else {
      non_null.push((key, item));
    }
  }

  non_null.sort_by(|(a, _), (b, _)| {
    let ord = a.compare(b);
    match direction {
      SortDirection::Asc => ord,
      SortDirection::Desc => ord.reverse(),
    }
  });

  non_null
    .into_iter()
    .map(|(_, item)| item)
    .chain(nulls)
    .collect()
}
