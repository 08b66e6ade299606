use std::{
  fs::File,
  io::{BufRead, BufReader, Read},
  path::Path,
};

use crate::{engine::CoreError, models::Record};

/// Streaming reader over a root JSON array.
///
/// Elements are scanned byte-by-byte (string/escape/depth state machine),
/// so each record carries its verbatim text and a real start offset, and
/// memory stays at one element rather than the whole document. The file
/// must open with `[` after optional BOM/whitespace; a malformed element
/// fails the whole document.
pub(crate) struct ArrayReader {
  reader: BufReader<File>,
  abs: u64,
  next_id: u64,
  done: bool,
}

impl ArrayReader {
  pub(crate) fn open(path: &Path) -> Result<Self, CoreError> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(1024 * 1024, file);
    let mut abs = 0u64;
    skip_bom_and_ws(&mut reader, &mut abs)?;
    match peek_byte(&mut reader)? {
      Some(b'[') => {
        consume_one(&mut reader, &mut abs)?;
      }
      _ => {
        return Err(CoreError::Format(
          "json source is not an array: file must start with '['".into(),
        ))
      }
    }
    Ok(Self {
      reader,
      abs,
      next_id: 0,
      done: false,
    })
  }

  fn next_inner(&mut self) -> Result<Option<Record>, CoreError> {
    loop {
      skip_ws_and_nul(&mut self.reader, &mut self.abs)?;
      match peek_byte(&mut self.reader)? {
        Some(b',') => {
          consume_one(&mut self.reader, &mut self.abs)?;
        }
        Some(b']') | None => {
          self.done = true;
          return Ok(None);
        }
        Some(_) => break,
      }
    }

    let start = self.abs;
    let bytes = scan_one_value(&mut self.reader, &mut self.abs)?;
    let content = String::from_utf8_lossy(&bytes).to_string();
    let parsed = serde_json::from_str(&content)
      .map_err(|e| CoreError::Format(format!("malformed array element at byte {start}: {e}")))?;

    let id = self.next_id;
    self.next_id += 1;
    Ok(Some(Record {
      id,
      content,
      parsed,
      byte_offset: start,
    }))
  }
}

impl Iterator for ArrayReader {
  type Item = Result<Record, CoreError>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.done {
      return None;
    }
    match self.next_inner() {
      Ok(rec) => rec.map(Ok),
      Err(e) => {
        self.done = true;
        Some(Err(e))
      }
    }
  }
}

/// Consume exactly one JSON value starting at the current position.
/// The caller guarantees a value starts here (whitespace already
/// skipped). Stops before the trailing delimiter/whitespace.
fn scan_one_value(reader: &mut BufReader<File>, abs: &mut u64) -> Result<Vec<u8>, CoreError> {
  let mut out = Vec::new();
  let mut in_string = false;
  let mut escape = false;
  let mut depth: u64 = 0;

  let first = consume_one(reader, abs)?;
  out.push(first);
  match first {
    b'"' => in_string = true,
    b'{' | b'[' => depth = 1,
    _ => {}
  }

  loop {
    if !in_string && depth == 0 {
      match peek_byte(reader)? {
        None => break,
        Some(b) if b == b',' || b == b']' || b == 0 || b.is_ascii_whitespace() => break,
        Some(_) => {}
      }
    }
    let b = match peek_byte(reader)? {
      None => {
        if in_string || depth > 0 {
          return Err(CoreError::Format("unexpected EOF inside array element".into()));
        }
        break;
      }
      Some(_) => consume_one(reader, abs)?,
    };
    out.push(b);

    if in_string {
      if escape {
        escape = false;
        continue;
      }
      match b {
        b'\\' => escape = true,
        b'"' => in_string = false,
        _ => {}
      }
      continue;
    }

    match b {
      b'"' => in_string = true,
      b'{' | b'[' => depth += 1,
      b'}' | b']' => depth = depth.saturating_sub(1),
      _ => {}
    }
  }

  Ok(out)
}

fn peek_byte(reader: &mut BufReader<File>) -> Result<Option<u8>, std::io::Error> {
  let buf = reader.fill_buf()?;
  if buf.is_empty() {
    Ok(None)
  } else {
    Ok(Some(buf[0]))
  }
}

fn consume_one(reader: &mut BufReader<File>, abs: &mut u64) -> Result<u8, std::io::Error> {
  let mut buf = [0u8; 1];
  let n = reader.read(&mut buf)?;
  if n == 0 {
    return Err(std::io::Error::new(
      std::io::ErrorKind::UnexpectedEof,
      "unexpected EOF",
    ));
  }
  *abs += 1;
  Ok(buf[0])
}

fn skip_bom_and_ws(reader: &mut BufReader<File>, abs: &mut u64) -> Result<(), std::io::Error> {
  // UTF-8 BOM: EF BB BF
  let buf = reader.fill_buf()?;
  if buf.len() >= 3 && buf[0] == 0xEF && buf[1] == 0xBB && buf[2] == 0xBF {
    reader.consume(3);
    *abs += 3;
  }
  skip_ws_and_nul(reader, abs)
}

fn skip_ws_and_nul(reader: &mut BufReader<File>, abs: &mut u64) -> Result<(), std::io::Error> {
  loop {
    match peek_byte(reader)? {
      Some(b) if b == 0 || b.is_ascii_whitespace() => {
        consume_one(reader, abs)?;
      }
      _ => break,
    }
  }
  Ok(())
}
