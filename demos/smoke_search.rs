use std::{path::PathBuf, sync::mpsc, thread};

use jlv_core::{CoreEngine, CoreOptions, Record, SearchQuery, SearchResult};

fn main() -> Result<(), String> {
  let mut args = std::env::args().skip(1);
  let usage = "usage: cargo run --example smoke_search -- <path-to-file> <text>";
  let path = PathBuf::from(args.next().ok_or_else(|| usage.to_string())?);
  let text = args.next().ok_or_else(|| usage.to_string())?;

  let eng = CoreEngine::new(CoreOptions::default());

  // Parse once to learn the format (records are discarded).
  let (tx, rx) = mpsc::channel::<Vec<Record>>();
  let drainer = thread::spawn(move || while rx.recv().is_ok() {});
  let meta = eng.parse_file_streaming(&path, &tx).map_err(|e| e.to_string())?;
  drop(tx);
  let _ = drainer.join();

  let query = SearchQuery {
    text: Some(text),
    ..SearchQuery::default()
  };
  let (tx, rx) = mpsc::channel::<Vec<SearchResult>>();
  let drainer = thread::spawn(move || {
    let mut shown = 0usize;
    while let Ok(chunk) = rx.recv() {
      for hit in chunk {
        if shown < 5 {
          println!("line {}: {}", hit.line_id, hit.context);
          shown += 1;
        }
      }
    }
  });

  let stats = eng
    .search_in_file(&path, &query, meta.format, &tx)
    .map_err(|e| e.to_string())?;
  drop(tx);
  let _ = drainer.join();

  println!("total_matches={}", stats.total_matches);
  println!("lines_searched={}", stats.lines_searched);
  Ok(())
}
