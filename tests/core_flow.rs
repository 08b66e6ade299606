use std::{path::PathBuf, sync::mpsc};

use jlv_core::{
  CoreEngine, CoreError, CoreOptions, FileFormat, Record, SearchQuery, SearchResult, SortColumn,
  SortDirection,
};

fn engine() -> CoreEngine {
  CoreEngine::new(CoreOptions::default())
}

fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
  let path = dir.path().join(name);
  std::fs::write(&path, contents).unwrap();
  path
}

fn drain<T>(rx: &mpsc::Receiver<Vec<T>>) -> Vec<T> {
  rx.try_iter().flatten().collect()
}

fn text_query(text: &str, case_sensitive: bool) -> SearchQuery {
  SearchQuery {
    text: Some(text.to_string()),
    case_sensitive,
    ..SearchQuery::default()
  }
}

#[test]
fn jsonl_parse_skips_blank_lines() {
  let dir = tempfile::tempdir().unwrap();
  let file = write_file(
    &dir,
    "a.jsonl",
    "{\"id\":1,\"user\":{\"name\":\"A\"}}\n\n{\"id\":2,\"user\":{\"name\":\"B\"}}\n",
  );

  let (tx, rx) = mpsc::channel::<Vec<Record>>();
  let meta = engine().parse_file_streaming(&file, &tx).unwrap();
  assert_eq!(meta.format, FileFormat::JsonL);
  assert_eq!(meta.total_lines, 2);
  assert_eq!(meta.file_size, std::fs::metadata(&file).unwrap().len());

  let records = drain(&rx);
  assert_eq!(records.len(), 2);
  assert_eq!(records[0].id, 0);
  assert_eq!(records[1].id, 1);
  assert_eq!(records[0].parsed["id"], 1);
  assert_eq!(records[1].parsed["id"], 2);

  // content and parsed agree; byte_offset points at the content.
  let raw = std::fs::read_to_string(&file).unwrap();
  for r in &records {
    let reparsed: serde_json::Value = serde_json::from_str(&r.content).unwrap();
    assert_eq!(reparsed, r.parsed);
    let start = r.byte_offset as usize;
    assert_eq!(&raw[start..start + r.content.len()], r.content);
  }
}

#[test]
fn jsonl_malformed_lines_are_dropped() {
  let dir = tempfile::tempdir().unwrap();
  let file = write_file(&dir, "a.jsonl", "{\"x\":1}\nnot json\n{\"x\":2}\n");

  let (tx, rx) = mpsc::channel::<Vec<Record>>();
  let meta = engine().parse_file_streaming(&file, &tx).unwrap();
  assert_eq!(meta.total_lines, 2);

  let records = drain(&rx);
  let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
  assert_eq!(ids, vec![0, 1]);
  assert_eq!(records[1].parsed["x"], 2);
}

#[test]
fn jsonl_without_valid_records_is_format_error() {
  let dir = tempfile::tempdir().unwrap();
  let file = write_file(&dir, "a.jsonl", "not json\nstill not\n");

  let (tx, _rx) = mpsc::channel::<Vec<Record>>();
  let err = engine().parse_file_streaming(&file, &tx).unwrap_err();
  assert!(matches!(err, CoreError::Format(_)), "got {err:?}");
}

#[test]
fn json_array_parse_works() {
  let dir = tempfile::tempdir().unwrap();
  let file = write_file(&dir, "a.json", "[\n  {\"x\":1},\n  {\"x\":2}\n]");

  let (tx, rx) = mpsc::channel::<Vec<Record>>();
  let meta = engine().parse_file_streaming(&file, &tx).unwrap();
  assert_eq!(meta.format, FileFormat::JsonArray);
  assert_eq!(meta.total_lines, 2);

  let records = drain(&rx);
  assert_eq!(records.len(), 2);
  assert_eq!(records[0].parsed["x"], 1);
  assert_eq!(records[1].parsed["x"], 2);
  assert_eq!(records[0].content, "{\"x\":1}");

  // Element offsets are real byte positions into the file.
  let raw = std::fs::read_to_string(&file).unwrap();
  for r in &records {
    let start = r.byte_offset as usize;
    assert_eq!(&raw[start..start + r.content.len()], r.content);
  }
}

#[test]
fn ndjson_extension_wins_over_sniffing() {
  let dir = tempfile::tempdir().unwrap();
  // Starts with '[' but the extension pins it to line-delimited.
  let file = write_file(&dir, "a.ndjson", "[1,2]\n{\"x\":1}\n");

  let (tx, rx) = mpsc::channel::<Vec<Record>>();
  let meta = engine().parse_file_streaming(&file, &tx).unwrap();
  assert_eq!(meta.format, FileFormat::JsonL);
  assert_eq!(meta.total_lines, 2);
  assert_eq!(drain(&rx).len(), 2);
}

#[test]
fn non_array_source_opened_as_array_is_format_error() {
  let dir = tempfile::tempdir().unwrap();
  let file = write_file(&dir, "a.jsonl", "{\"x\":1}\n");

  let (tx, _rx) = mpsc::channel::<Vec<SearchResult>>();
  let err = engine()
    .search_in_file(&file, &text_query("x", false), FileFormat::JsonArray, &tx)
    .unwrap_err();
  assert!(matches!(err, CoreError::Format(_)), "got {err:?}");
}

#[test]
fn parse_streams_in_chunks() {
  let dir = tempfile::tempdir().unwrap();
  let lines: String = (0..5).map(|i| format!("{{\"i\":{i}}}\n")).collect();
  let file = write_file(&dir, "a.jsonl", &lines);

  let eng = CoreEngine::new(CoreOptions {
    parse_chunk: 2,
    ..CoreOptions::default()
  });
  let (tx, rx) = mpsc::channel::<Vec<Record>>();
  let meta = eng.parse_file_streaming(&file, &tx).unwrap();
  assert_eq!(meta.total_lines, 5);

  let chunk_sizes: Vec<usize> = rx.try_iter().map(|c| c.len()).collect();
  assert_eq!(chunk_sizes, vec![2, 2, 1]);
}

#[test]
fn dropped_consumer_cancels_parse() {
  let dir = tempfile::tempdir().unwrap();
  let file = write_file(&dir, "a.jsonl", "{\"x\":1}\n{\"x\":2}\n{\"x\":3}\n");

  let eng = CoreEngine::new(CoreOptions {
    parse_chunk: 1,
    ..CoreOptions::default()
  });
  let (tx, rx) = mpsc::channel::<Vec<Record>>();
  drop(rx);
  let err = eng.parse_file_streaming(&file, &tx).unwrap_err();
  assert!(matches!(err, CoreError::Cancelled), "got {err:?}");
  // The aborted parse must not publish metadata.
  assert!(eng.current_file().is_none());
}

#[test]
fn current_file_tracks_last_parse_and_reset() {
  let dir = tempfile::tempdir().unwrap();
  let file = write_file(&dir, "a.jsonl", "{\"x\":1}\n");

  let eng = engine();
  assert!(eng.current_file().is_none());
  let (tx, _rx) = mpsc::channel::<Vec<Record>>();
  let meta = eng.parse_file_streaming(&file, &tx).unwrap();
  assert_eq!(eng.current_file().unwrap().path, meta.path);
  eng.reset();
  assert!(eng.current_file().is_none());
}

#[test]
fn empty_query_scans_but_matches_nothing() {
  let dir = tempfile::tempdir().unwrap();
  let file = write_file(&dir, "a.jsonl", "{\"x\":1}\n{\"x\":2}\n{\"x\":3}\n");

  let (tx, rx) = mpsc::channel::<Vec<SearchResult>>();
  let stats = engine()
    .search_in_file(&file, &SearchQuery::default(), FileFormat::JsonL, &tx)
    .unwrap();
  assert_eq!(stats.total_matches, 0);
  assert_eq!(stats.lines_searched, 3);
  assert!(drain(&rx).is_empty());
}

#[test]
fn text_search_is_case_insensitive_by_default() {
  let dir = tempfile::tempdir().unwrap();
  let file = write_file(
    &dir,
    "a.jsonl",
    "{\"msg\":\"ERROR\"}\n{\"msg\":\"errand\"}\n{\"msg\":\"ok\"}\n",
  );

  let (tx, rx) = mpsc::channel::<Vec<SearchResult>>();
  let stats = engine()
    .search_in_file(&file, &text_query("err", false), FileFormat::JsonL, &tx)
    .unwrap();
  assert_eq!(stats.total_matches, 2);
  assert_eq!(stats.lines_searched, 3);

  let hits = drain(&rx);
  let lines: Vec<u64> = hits.iter().map(|h| h.line_id).collect();
  assert_eq!(lines, vec![0, 1]);
  // Hits stream in record order and carry the raw content as context.
  assert!(hits[0].context.contains("ERROR"));
}

#[test]
fn text_search_case_sensitive() {
  let dir = tempfile::tempdir().unwrap();
  let file = write_file(&dir, "a.jsonl", "{\"msg\":\"ERROR\"}\n{\"msg\":\"errand\"}\n");

  let (tx, rx) = mpsc::channel::<Vec<SearchResult>>();
  let stats = engine()
    .search_in_file(&file, &text_query("err", true), FileFormat::JsonL, &tx)
    .unwrap();
  assert_eq!(stats.total_matches, 1);
  assert_eq!(drain(&rx)[0].line_id, 1);
}

#[test]
fn json_path_with_text_matches_projections() {
  let dir = tempfile::tempdir().unwrap();
  let file = write_file(
    &dir,
    "a.jsonl",
    "{\"user\":{\"name\":\"Alice\"}}\n{\"user\":{\"name\":\"bob\"}}\n",
  );

  let query = SearchQuery {
    text: Some("alice".into()),
    json_path: Some("$.user.name".into()),
    case_sensitive: false,
    regex: false,
  };
  let (tx, rx) = mpsc::channel::<Vec<SearchResult>>();
  let stats = engine()
    .search_in_file(&file, &query, FileFormat::JsonL, &tx)
    .unwrap();
  assert_eq!(stats.total_matches, 1);
  assert_eq!(stats.lines_searched, 2);

  let hits = drain(&rx);
  assert_eq!(hits[0].line_id, 0);
  assert_eq!(hits[0].matches, vec!["Alice".to_string()]);
}

#[test]
fn json_path_only_reports_all_hits() {
  let dir = tempfile::tempdir().unwrap();
  let file = write_file(
    &dir,
    "a.jsonl",
    "{\"users\":[{\"name\":\"a\"},{\"name\":\"b\"}]}\n{\"users\":[]}\n",
  );

  let query = SearchQuery {
    json_path: Some("$.users[*].name".into()),
    ..SearchQuery::default()
  };
  let (tx, rx) = mpsc::channel::<Vec<SearchResult>>();
  let stats = engine()
    .search_in_file(&file, &query, FileFormat::JsonL, &tx)
    .unwrap();
  assert_eq!(stats.total_matches, 1);

  let hits = drain(&rx);
  assert_eq!(hits[0].line_id, 0);
  assert_eq!(hits[0].matches, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn invalid_json_path_is_query_error() {
  let dir = tempfile::tempdir().unwrap();
  let file = write_file(&dir, "a.jsonl", "{\"x\":1}\n");

  let query = SearchQuery {
    json_path: Some("$[".into()),
    ..SearchQuery::default()
  };
  let (tx, _rx) = mpsc::channel::<Vec<SearchResult>>();
  let err = engine()
    .search_in_file(&file, &query, FileFormat::JsonL, &tx)
    .unwrap_err();
  assert!(matches!(err, CoreError::Query(_)), "got {err:?}");
}

fn sort_file_ids(file: &std::path::Path, column: &str, direction: SortDirection) -> Vec<u64> {
  let (tx, rx) = mpsc::channel::<Vec<Record>>();
  let count = engine()
    .sort_file_lines(
      file,
      &SortColumn {
        column: column.to_string(),
        direction,
      },
      FileFormat::JsonL,
      &tx,
    )
    .unwrap();
  let records = drain(&rx);
  assert_eq!(count as usize, records.len());
  records.iter().map(|r| r.id).collect()
}

#[test]
fn sort_by_date_column_keeps_nulls_last() {
  let dir = tempfile::tempdir().unwrap();
  let file = write_file(
    &dir,
    "a.jsonl",
    concat!(
      "{\"created\":\"2024-01-15 10:30:00\"}\n",
      "{\"created\":\"2024-01-14T09:00:00Z\"}\n",
      "{\"created\":null}\n",
      "{\"created\":\"2024-01-15T10:30:01Z\"}\n",
    ),
  );

  assert_eq!(
    sort_file_ids(&file, "created", SortDirection::Asc),
    vec![1, 0, 3, 2]
  );
  // Descending reverses the dated records only; the null stays at the tail.
  assert_eq!(
    sort_file_ids(&file, "created", SortDirection::Desc),
    vec![3, 0, 1, 2]
  );
}

#[test]
fn sort_by_numeric_column_is_stable() {
  let dir = tempfile::tempdir().unwrap();
  let file = write_file(
    &dir,
    "a.jsonl",
    concat!(
      "{\"n\":2,\"tag\":\"a\"}\n",
      "{\"n\":1}\n",
      "{\"n\":2,\"tag\":\"b\"}\n",
      "{\"n\":\"10\"}\n",
    ),
  );

  // Numeric strings coerce to numbers; equal keys keep original order.
  assert_eq!(
    sort_file_ids(&file, "n", SortDirection::Asc),
    vec![1, 0, 2, 3]
  );
  assert_eq!(
    sort_file_ids(&file, "n", SortDirection::Desc),
    vec![3, 0, 2, 1]
  );
}

#[test]
fn mixed_typed_column_falls_back_to_text_order() {
  let dir = tempfile::tempdir().unwrap();
  let file = write_file(
    &dir,
    "a.jsonl",
    "{\"v\":10}\n{\"v\":\"Zed\"}\n{\"v\":\"apple\"}\n",
  );

  // Number + text in one column: everything compares as folded text.
  assert_eq!(
    sort_file_ids(&file, "v", SortDirection::Asc),
    vec![0, 2, 1]
  );
}

#[test]
fn missing_column_sorts_records_to_the_tail_in_order() {
  let dir = tempfile::tempdir().unwrap();
  let file = write_file(
    &dir,
    "a.jsonl",
    "{\"other\":1}\n{\"v\":2}\n{\"other\":2}\n{\"v\":1}\n",
  );

  assert_eq!(
    sort_file_ids(&file, "v", SortDirection::Asc),
    vec![3, 1, 0, 2]
  );
  assert_eq!(
    sort_file_ids(&file, "v", SortDirection::Desc),
    vec![1, 3, 0, 2]
  );
}

#[test]
fn empty_sort_column_is_invalid() {
  let dir = tempfile::tempdir().unwrap();
  let file = write_file(&dir, "a.jsonl", "{\"x\":1}\n");

  let (tx, _rx) = mpsc::channel::<Vec<Record>>();
  let err = engine()
    .sort_file_lines(
      &file,
      &SortColumn {
        column: "  ".into(),
        direction: SortDirection::Asc,
      },
      FileFormat::JsonL,
      &tx,
    )
    .unwrap_err();
  assert!(matches!(err, CoreError::InvalidArg(_)), "got {err:?}");
}

#[test]
fn sort_search_results_by_nested_column() {
  let results = vec![
    SearchResult {
      line_id: 0,
      matches: vec![],
      context: "{\"user\":{\"score\":3}}".into(),
    },
    SearchResult {
      line_id: 1,
      matches: vec![],
      context: "{\"user\":{\"score\":1}}".into(),
    },
    SearchResult {
      line_id: 2,
      matches: vec![],
      context: "not json".into(),
    },
    SearchResult {
      line_id: 3,
      matches: vec![],
      context: "{\"user\":{\"score\":2}}".into(),
    },
  ];
  let column = SortColumn {
    column: "user_score".into(),
    direction: SortDirection::Asc,
  };

  let (tx, rx) = mpsc::channel::<Vec<SearchResult>>();
  let count = engine()
    .sort_search_results(results, &column, &tx)
    .unwrap();
  assert_eq!(count, 4);

  let sorted = drain(&rx);
  let lines: Vec<u64> = sorted.iter().map(|r| r.line_id).collect();
  // Unparseable context gets a null key and lands at the tail.
  assert_eq!(lines, vec![1, 3, 0, 2]);

  // Sorting the sorted output again does not change it.
  let (tx2, rx2) = mpsc::channel::<Vec<SearchResult>>();
  engine().sort_search_results(sorted, &column, &tx2).unwrap();
  let again: Vec<u64> = drain(&rx2).iter().map(|r| r.line_id).collect();
  assert_eq!(again, lines);
}

#[test]
fn collect_headers_unions_flat_paths_alphabetically() {
  let dir = tempfile::tempdir().unwrap();
  let file = write_file(
    &dir,
    "a.jsonl",
    "{\"id\":1,\"user\":{\"name\":\"a\"}}\n{\"msg\":\"hi\",\"user\":{\"id\":5}}\n",
  );

  let headers = engine().collect_headers(&file).unwrap();
  assert_eq!(headers, vec!["id", "msg", "user_id", "user_name"]);
}

#[test]
fn wire_shapes_are_stable() {
  assert_eq!(
    serde_json::to_value(FileFormat::JsonL).unwrap(),
    serde_json::json!("JsonL")
  );
  assert_eq!(
    serde_json::to_value(FileFormat::JsonArray).unwrap(),
    serde_json::json!("JsonArray")
  );
  assert_eq!(
    serde_json::to_value(SortDirection::Desc).unwrap(),
    serde_json::json!("desc")
  );

  // All query fields are optional on the wire.
  let q: SearchQuery = serde_json::from_str("{}").unwrap();
  assert!(q.text.is_none());
  assert!(q.json_path.is_none());
  assert!(!q.case_sensitive);
  assert!(!q.regex);

  let rec = Record {
    id: 7,
    content: "{\"x\":1}".into(),
    parsed: serde_json::json!({"x": 1}),
    byte_offset: 42,
  };
  let v = serde_json::to_value(&rec).unwrap();
  assert_eq!(v["id"], 7);
  assert_eq!(v["content"], "{\"x\":1}");
  assert_eq!(v["parsed"]["x"], 1);
  assert_eq!(v["byte_offset"], 42);
}

#[test]
fn parse_reports_monotonic_progress() {
  let dir = tempfile::tempdir().unwrap();
  let lines: String = (0..200)
    .map(|i| format!("{{\"i\":{i},\"pad\":\"xxxxxxxxxx\"}}\n"))
    .collect();
  let file = write_file(&dir, "a.jsonl", &lines);

  let (tx, _rx) = mpsc::channel::<Vec<Record>>();
  let mut pcts: Vec<u8> = Vec::new();
  engine()
    .parse_file_streaming_with_progress(&file, &tx, |p| pcts.push(p))
    .unwrap();
  assert_eq!(pcts.first(), Some(&0));
  assert_eq!(pcts.last(), Some(&100));
  assert!(pcts.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn jsonl_bom_on_first_line_is_tolerated() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("a.jsonl");
  let mut bytes = vec![0xEF, 0xBB, 0xBF];
  bytes.extend_from_slice(b"{\"x\":1}\n{\"x\":2}\n");
  std::fs::write(&path, bytes).unwrap();

  let (tx, rx) = mpsc::channel::<Vec<Record>>();
  let meta = engine().parse_file_streaming(&path, &tx).unwrap();
  assert_eq!(meta.total_lines, 2);

  let records = drain(&rx);
  assert_eq!(records[0].byte_offset, 3);
  assert_eq!(records[0].parsed["x"], 1);
}

#[test]
fn crlf_lines_are_tolerated() {
  let dir = tempfile::tempdir().unwrap();
  let file = write_file(&dir, "a.jsonl", "{\"a\":1}\r\n{\"a\":2}\r\n");

  let (tx, rx) = mpsc::channel::<Vec<Record>>();
  let meta = engine().parse_file_streaming(&file, &tx).unwrap();
  assert_eq!(meta.total_lines, 2);

  let records = drain(&rx);
  assert_eq!(records[0].content, "{\"a\":1}");
  assert_eq!(records[1].byte_offset, 9);
}
