use std::collections::BTreeMap;

use serde_json::Value;

use crate::{
  models::{ColumnInfo, Record},
  value::smart_format,
};

/// How many records schema inference samples.
pub const SCHEMA_SAMPLE: usize = 50;
/// Maximum flat-path depth (path segment count).
pub const SCHEMA_MAX_DEPTH: usize = 2;
/// Hard cap on the number of inferred columns.
pub const SCHEMA_MAX_COLUMNS: usize = 100;

/// First-segment names that bump a column toward the front of the
/// schema, in priority order.
const PRIORITY_KEYS: [&str; 13] = [
  "id",
  "timestamp",
  "time",
  "date",
  "level",
  "severity",
  "message",
  "msg",
  "name",
  "type",
  "status",
  "user",
  "meta",
];

#[derive(Debug, Default)]
struct ColumnStat {
  count: u64,
  complex_seen: bool,
}

/// Infer the flat column schema from the first `SCHEMA_SAMPLE` records.
///
/// Nested objects contribute underscore-joined paths down to
/// `SCHEMA_MAX_DEPTH` segments; arrays are not descended. A column is
/// sortable iff every sampled occurrence renders as a plain scalar.
/// Ordering: priority first segments (list order, ties lexicographic),
/// then descending occurrence count (ties lexicographic), truncated to
/// `SCHEMA_MAX_COLUMNS`. Deterministic for identical input.
pub fn infer_columns(records: &[Record]) -> Vec<ColumnInfo> {
  let mut stats: BTreeMap<String, ColumnStat> = BTreeMap::new();

  for rec in records.iter().take(SCHEMA_SAMPLE) {
    walk_flat_paths(&rec.parsed, &mut |path, value| {
      let stat = stats.entry(path.to_string()).or_default();
      stat.count += 1;
      if smart_format(Some(value)).is_complex {
        stat.complex_seen = true;
      }
    });
  }

  let mut paths: Vec<(String, ColumnStat)> = stats.into_iter().collect();
  paths.sort_by(|(pa, sa), (pb, sb)| {
    let prio_a = priority_index(pa);
    let prio_b = priority_index(pb);
    match (prio_a, prio_b) {
      (Some(a), Some(b)) => a.cmp(&b).then_with(|| pa.cmp(pb)),
      (Some(_), None) => std::cmp::Ordering::Less,
      (None, Some(_)) => std::cmp::Ordering::Greater,
      (None, None) => sb.count.cmp(&sa.count).then_with(|| pa.cmp(pb)),
    }
  });
  paths.truncate(SCHEMA_MAX_COLUMNS);

  paths
    .into_iter()
    .map(|(path, stat)| {
      let display_name = display_name(&path);
      ColumnInfo {
        is_sortable: !stat.complex_seen,
        display_name,
        path,
      }
    })
    .collect()
}

fn priority_index(path: &str) -> Option<usize> {
  let first = path.split('_').next().unwrap_or(path);
  PRIORITY_KEYS.iter().position(|k| *k == first)
}

fn display_name(path: &str) -> String {
  match path.split_once('_') {
    Some((_, rest)) if !rest.is_empty() => rest.to_string(),
    _ => path.to_string(),
  }
}

/// Walk a record's object tree, reporting every flat path with its
/// value. Scalars, arrays and nulls are reported where they sit; objects
/// recurse until the depth cap, where they are reported as-is. Explicit
/// recursion with an owned path buffer; non-object roots yield nothing.
pub(crate) fn walk_flat_paths(value: &Value, f: &mut impl FnMut(&str, &Value)) {
  let Some(obj) = value.as_object() else {
    return;
  };
  let mut buf = String::new();
  walk_object(obj, 1, &mut buf, f);
}

fn walk_object(
  obj: &serde_json::Map<String, Value>,
  depth: usize,
  buf: &mut String,
  f: &mut impl FnMut(&str, &Value),
) {
  for (key, value) in obj {
    let len_before = buf.len();
    if !buf.is_empty() {
      buf.push('_');
    }
    buf.push_str(key);

    match value.as_object() {
      Some(inner) if depth < SCHEMA_MAX_DEPTH => walk_object(inner, depth + 1, buf, f),
      _ => f(buf, value),
    }

    buf.truncate(len_before);
  }
}
