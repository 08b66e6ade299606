use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Keys that identify the "display" field of an object when rendering
/// containers into a table cell. Order is priority order.
const DISPLAY_KEYS: [&str; 10] = [
  "name", "title", "label", "id", "slug", "email", "username", "code", "key", "status",
];

/// Navigate a flat underscore-joined path (`a_b_c` walks keys `a`, `b`,
/// `c`). Returns `None` if any step is missing or non-object.
///
/// The flat convention conflates `obj.a.b` with a literal `"a_b"` key;
/// only the nested interpretation is attempted, so a shallower `"a_b"`
/// key is shadowed and unreachable through this function.
pub fn get_flat<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
  let mut cur = value;
  for seg in path.split('_') {
    cur = cur.as_object()?.get(seg)?;
  }
  Some(cur)
}

/// A value rendered for tabular display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatted {
  pub text: String,
  /// True for containers; complex columns are not sortable.
  pub is_complex: bool,
}

/// Render a (possibly absent) value into a table cell.
///
/// Scalars render canonically. An array of objects whose first element
/// carries a display key projects that key across the array; other
/// arrays join their elements. An object with a display key renders that
/// key's value, else compact JSON.
pub fn smart_format(value: Option<&Value>) -> Formatted {
  let value = match value {
    None | Some(Value::Null) => {
      return Formatted {
        text: String::new(),
        is_complex: false,
      }
    }
    Some(v) => v,
  };

  match value {
    Value::Bool(b) => Formatted {
      text: b.to_string(),
      is_complex: false,
    },
    Value::Number(n) => Formatted {
      text: n.to_string(),
      is_complex: false,
    },
    Value::String(s) => Formatted {
      text: s.clone(),
      is_complex: false,
    },
    Value::Array(items) => {
      let text = if let Some(key) = items.first().and_then(display_key) {
        items
          .iter()
          .map(|el| el.get(key).map(scalar_text).unwrap_or_default())
          .collect::<Vec<_>>()
          .join(", ")
      } else {
        items.iter().map(scalar_text).collect::<Vec<_>>().join(", ")
      };
      Formatted {
        text,
        is_complex: true,
      }
    }
    Value::Object(_) => {
      let text = match display_key(value) {
        Some(key) => value.get(key).map(scalar_text).unwrap_or_default(),
        None => compact(value),
      };
      Formatted {
        text,
        is_complex: true,
      }
    }
    Value::Null => unreachable!("handled above"),
  }
}

fn display_key(value: &Value) -> Option<&'static str> {
  let obj = value.as_object()?;
  DISPLAY_KEYS.iter().find(|k| obj.contains_key(**k)).copied()
}

/// Canonical string form of a single value: scalars as-is, `null` as
/// empty, containers as compact JSON.
fn scalar_text(value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::Bool(b) => b.to_string(),
    Value::Number(n) => n.to_string(),
    Value::String(s) => s.clone(),
    Value::Array(_) | Value::Object(_) => compact(value),
  }
}

fn compact(value: &Value) -> String {
  serde_json::to_string(value).unwrap_or_default()
}

/// Typed projection of a value used for ordering.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
  Number(f64),
  /// Milliseconds since the Unix epoch, UTC.
  Date(i64),
  /// Case-insensitive collation: compare the folded form, tie-break on
  /// the original. Both are pre-computed so the comparator stays O(1).
  Text { folded: String, raw: String },
  Null,
}

impl SortKey {
  pub fn is_null(&self) -> bool {
    matches!(self, SortKey::Null)
  }

  pub(crate) fn rank(&self) -> u8 {
    match self {
      SortKey::Number(_) => 0,
      SortKey::Date(_) => 1,
      SortKey::Text { .. } => 2,
      SortKey::Null => 3,
    }
  }

  /// Total order over keys. `Null` ranks after every other variant; the
  /// cross-variant arm is a backstop only, the sort engine re-coerces
  /// heterogeneous columns to `Text` before comparing.
  pub fn compare(&self, other: &SortKey) -> Ordering {
    match (self, other) {
      (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
      (SortKey::Date(a), SortKey::Date(b)) => a.cmp(b),
      (
        SortKey::Text {
          folded: fa,
          raw: ra,
        },
        SortKey::Text {
          folded: fb,
          raw: rb,
        },
      ) => fa.cmp(fb).then_with(|| ra.cmp(rb)),
      (SortKey::Null, SortKey::Null) => Ordering::Equal,
      _ => self.rank().cmp(&other.rank()),
    }
  }
}

pub(crate) fn text_key(s: &str) -> SortKey {
  SortKey::Text {
    folded: s.to_lowercase(),
    raw: s.to_string(),
  }
}

/// Coerce a (possibly absent) value into its sort key.
///
/// Precedence: null/absent → `Null`; numbers and booleans (`false=0`,
/// `true=1`) → `Number`; strings try finite `f64`, then RFC 3339 /
/// ISO 8601 date-time (date-only at midnight UTC, timezone-less forms
/// read as UTC), then fall back to `Text`; containers → `Text` of their
/// compact JSON.
pub fn to_sort_key(value: Option<&Value>) -> SortKey {
  match value {
    None | Some(Value::Null) => SortKey::Null,
    Some(Value::Bool(b)) => SortKey::Number(if *b { 1.0 } else { 0.0 }),
    Some(Value::Number(n)) => SortKey::Number(n.as_f64().unwrap_or_default()),
    Some(Value::String(s)) => {
      if let Ok(x) = s.trim().parse::<f64>() {
        if x.is_finite() {
          return SortKey::Number(x);
        }
      }
      match parse_date_ms(s) {
        Some(ms) => SortKey::Date(ms),
        None => text_key(s),
      }
    }
    Some(other) => text_key(&compact(other)),
  }
}

fn parse_date_ms(s: &str) -> Option<i64> {
  let t = s.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
    return Some(dt.timestamp_millis());
  }
  if let Ok(d) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
    return Some(d.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis());
  }
  // Timezone-less date-times (space- or T-separated) are read as UTC.
  for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
    if let Ok(ndt) = NaiveDateTime::parse_from_str(t, fmt) {
      return Some(ndt.and_utc().timestamp_millis());
    }
  }
  None
}
