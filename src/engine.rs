use std::{path::Path, sync::Arc};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  channel::{ChunkSink, Chunker, SinkClosed},
  export,
  formats::{self, RecordReader},
  models::{FileFormat, FileMetadata, Record, SearchQuery, SearchResult, SearchStats, SortColumn},
  search, sort,
};

/// Records per chunk for parse and file-sort streams.
pub const PARSE_CHUNK: usize = 2000;
/// Results per chunk for search and result-sort streams.
pub const SEARCH_CHUNK: usize = 100;

#[derive(Debug, Error)]
pub enum CoreError {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
  #[error("format error: {0}")]
  Format(String),
  #[error("query error: {0}")]
  Query(String),
  #[error("invalid argument: {0}")]
  InvalidArg(String),
  #[error("cancelled")]
  Cancelled,
}

impl From<SinkClosed> for CoreError {
  fn from(_: SinkClosed) -> Self {
    CoreError::Cancelled
  }
}

/// Chunk/sample sizes. The defaults are the documented engine constants;
/// tests shrink them to exercise chunk boundaries on small fixtures.
#[derive(Debug, Clone)]
pub struct CoreOptions {
  pub parse_chunk: usize,
  pub search_chunk: usize,
  pub header_sample: usize,
}

impl Default for CoreOptions {
  fn default() -> Self {
    Self {
      parse_chunk: PARSE_CHUNK,
      search_chunk: SEARCH_CHUNK,
      header_sample: export::HEADER_SAMPLE,
    }
  }
}

/// The record-processing engine behind the viewer.
///
/// One file session at a time: the metadata slot is replaced on each
/// successful parse. Every command takes the file path and a chunk sink;
/// an IPC shell runs commands on blocking workers and adapts its channel
/// type to [`ChunkSink`]. Cancellation is cooperative: dropping the
/// consumer end makes the producer's next send fail, and the command
/// returns [`CoreError::Cancelled`] without finalizing.
#[derive(Clone, Default)]
pub struct CoreEngine {
  options: CoreOptions,
  current: Arc<Mutex<Option<FileMetadata>>>,
}

impl CoreEngine {
  pub fn new(options: CoreOptions) -> Self {
    Self {
      options,
      current: Arc::new(Mutex::new(None)),
    }
  }

  /// IPC API: parse_file_streaming(path, channel) -> FileMetadata
  ///
  /// Detects the format, streams records in chunks of `parse_chunk`,
  /// and returns the file metadata. A JSONL source that yields no valid
  /// record at all is a format error.
  pub fn parse_file_streaming(
    &self,
    path: impl AsRef<Path>,
    sink: &dyn ChunkSink<Record>,
  ) -> Result<FileMetadata, CoreError> {
    self.parse_file_streaming_with_progress(path, sink, |_| {})
  }

  /// Like `parse_file_streaming`, but reports coarse progress
  /// (`pct_0_100`, deduplicated, 100 only on completion) derived from
  /// byte positions. The shell forwards it to a progress bar for large
  /// files.
  pub fn parse_file_streaming_with_progress(
    &self,
    path: impl AsRef<Path>,
    sink: &dyn ChunkSink<Record>,
    mut on_progress_pct: impl FnMut(u8),
  ) -> Result<FileMetadata, CoreError> {
    let path = path.as_ref();
    let format = formats::detect_format(path)?;
    let file_size = std::fs::metadata(path)?.len();
    on_progress_pct(0);

    let mut reader = RecordReader::open(path, format)?;
    let mut chunker = Chunker::new(sink, self.options.parse_chunk);
    let mut total = 0u64;
    let mut last_pct: u8 = 0;
    for rec in &mut reader {
      let rec = rec?;
      total += 1;
      if file_size > 0 {
        let pct = ((rec.byte_offset.saturating_mul(100)) / file_size).min(99) as u8;
        if pct != last_pct {
          last_pct = pct;
          on_progress_pct(pct);
        }
      }
      chunker.push(rec)?;
    }
    chunker.finish()?;

    let skipped = reader.skipped();
    if skipped > 0 {
      debug!(path = %path.display(), skipped, "dropped malformed lines");
    }
    if total == 0 && format == FileFormat::JsonL {
      return Err(CoreError::Format("no valid records in jsonl source".into()));
    }

    let meta = FileMetadata {
      path: path.to_string_lossy().to_string(),
      total_lines: total,
      file_size,
      format,
    };
    info!(path = %meta.path, total_lines = total, file_size, "parsed file");
    *self.current.lock() = Some(meta.clone());
    on_progress_pct(100);
    Ok(meta)
  }

  /// IPC API: search_in_file(path, query, file_format, channel) -> SearchStats
  pub fn search_in_file(
    &self,
    path: impl AsRef<Path>,
    query: &SearchQuery,
    file_format: FileFormat,
    sink: &dyn ChunkSink<SearchResult>,
  ) -> Result<SearchStats, CoreError> {
    search::run_search(
      path.as_ref(),
      query,
      file_format,
      sink,
      self.options.search_chunk,
    )
  }

  /// IPC API: sort_file_lines(path, sort_column, file_format, channel) -> count
  pub fn sort_file_lines(
    &self,
    path: impl AsRef<Path>,
    sort_column: &SortColumn,
    file_format: FileFormat,
    sink: &dyn ChunkSink<Record>,
  ) -> Result<u64, CoreError> {
    sort::sort_file(
      path.as_ref(),
      sort_column,
      file_format,
      sink,
      self.options.parse_chunk,
    )
  }

  /// IPC API: sort_search_results(results, sort_column, channel) -> count
  pub fn sort_search_results(
    &self,
    results: Vec<SearchResult>,
    sort_column: &SortColumn,
    sink: &dyn ChunkSink<SearchResult>,
  ) -> Result<u64, CoreError> {
    sort::sort_results(results, sort_column, sink, self.options.search_chunk)
  }

  /// IPC API: collect_headers(path) -> string[]
  pub fn collect_headers(&self, path: impl AsRef<Path>) -> Result<Vec<String>, CoreError> {
    export::collect_headers(path.as_ref(), self.options.header_sample)
  }

  /// Metadata of the most recently parsed file, if any.
  pub fn current_file(&self) -> Option<FileMetadata> {
    self.current.lock().clone()
  }

  /// Forget the current file; the next parse starts a fresh session.
  pub fn reset(&self) {
    *self.current.lock() = None;
  }
}
