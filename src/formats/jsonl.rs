use std::{
  fs::File,
  io::{BufRead, BufReader},
  path::Path,
};

use serde_json::Value;
use tracing::debug;

use crate::{engine::CoreError, models::Record};

/// Line-by-line JSONL reader.
///
/// Blank/whitespace-only lines are skipped without consuming an id;
/// malformed lines are dropped silently (counted, logged at debug).
/// Non-UTF-8 bytes are tolerated lossily. Memory stays at one line.
pub(crate) struct LinesReader {
  reader: BufReader<File>,
  offset: u64,
  next_id: u64,
  skipped: u64,
}

impl LinesReader {
  pub(crate) fn open(path: &Path) -> Result<Self, CoreError> {
    let file = File::open(path)?;
    Ok(Self {
      reader: BufReader::new(file),
      offset: 0,
      next_id: 0,
      skipped: 0,
    })
  }

  pub(crate) fn skipped(&self) -> u64 {
    self.skipped
  }
}

impl Iterator for LinesReader {
  type Item = Result<Record, CoreError>;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      let mut start = self.offset;
      let mut buf = Vec::new();
      let n = match self.reader.read_until(b'\n', &mut buf) {
        Ok(n) => n,
        Err(e) => return Some(Err(e.into())),
      };
      if n == 0 {
        return None;
      }
      self.offset += n as u64;

      // Tolerate a UTF-8 BOM on the first line.
      if start == 0 && buf.starts_with(&[0xEF, 0xBB, 0xBF]) {
        buf.drain(..3);
        start = 3;
      }

      // Trim newline & CRLF
      if buf.ends_with(b"\n") {
        buf.pop();
        if buf.ends_with(b"\r") {
          buf.pop();
        }
      }

      let line = String::from_utf8_lossy(&buf).to_string();
      if line.trim().is_empty() {
        continue;
      }

      match serde_json::from_str::<Value>(&line) {
        Ok(parsed) => {
          let id = self.next_id;
          self.next_id += 1;
          return Some(Ok(Record {
            id,
            content: line,
            parsed,
            byte_offset: start,
          }));
        }
        Err(e) => {
          self.skipped += 1;
          debug!(byte_offset = start, error = %e, "skipping malformed jsonl line");
        }
      }
    }
  }
}
