use std::{path::PathBuf, sync::mpsc, thread};

use jlv_core::{CoreEngine, CoreOptions, Record};

fn main() -> Result<(), String> {
  let path = std::env::args()
    .nth(1)
    .ok_or_else(|| "usage: cargo run --example smoke_parse -- <path-to-file>".to_string())?;
  let path = PathBuf::from(path);

  let eng = CoreEngine::new(CoreOptions::default());

  let (tx, rx) = mpsc::channel::<Vec<Record>>();
  let drainer = thread::spawn(move || {
    let mut received = 0usize;
    let mut first: Option<Record> = None;
    while let Ok(chunk) = rx.recv() {
      if first.is_none() {
        first = chunk.first().cloned();
      }
      received += chunk.len();
    }
    (received, first)
  });

  let meta = eng.parse_file_streaming(&path, &tx).map_err(|e| e.to_string())?;
  drop(tx);
  let (received, first) = drainer.join().map_err(|_| "drain thread panicked".to_string())?;

  println!("format={:?}", meta.format);
  println!("total_lines={}", meta.total_lines);
  println!("file_size={}", meta.file_size);
  println!("received={received}");
  if let Some(r0) = first {
    println!("first.id={}", r0.id);
    println!("first.byte_offset={}", r0.byte_offset);
    println!("first.content={}", r0.content);
  }
  Ok(())
}
