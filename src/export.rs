use std::{collections::BTreeSet, path::Path};

use crate::{engine::CoreError, formats, formats::RecordReader, schema::walk_flat_paths};

/// How many leading records the header collector samples.
pub const HEADER_SAMPLE: usize = 1000;

/// Union of all flat paths over the first `sample` records, sorted
/// alphabetically. Downstream writers (CSV/XLSX, out of this crate)
/// group consecutive headers sharing a first segment.
pub(crate) fn collect_headers(path: &Path, sample: usize) -> Result<Vec<String>, CoreError> {
  let format = formats::detect_format(path)?;
  let reader = RecordReader::open(path, format)?;

  let mut headers: BTreeSet<String> = BTreeSet::new();
  for rec in reader.take(sample) {
    let rec = rec?;
    walk_flat_paths(&rec.parsed, &mut |path, _| {
      if !headers.contains(path) {
        headers.insert(path.to_string());
      }
    });
  }
  Ok(headers.into_iter().collect())
}
