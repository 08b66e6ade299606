mod channel;
mod engine;
mod export;
mod formats;
mod models;
mod schema;
mod search;
mod sort;
mod value;

pub use crate::channel::{ChunkSink, SinkClosed};
pub use crate::engine::{CoreEngine, CoreError, CoreOptions, PARSE_CHUNK, SEARCH_CHUNK};
pub use crate::export::HEADER_SAMPLE;
pub use crate::models::{
  ColumnInfo, FileFormat, FileMetadata, Record, SearchQuery, SearchResult, SearchStats,
  SortColumn, SortDirection,
};
pub use crate::schema::{infer_columns, SCHEMA_MAX_COLUMNS, SCHEMA_MAX_DEPTH, SCHEMA_SAMPLE};
pub use crate::value::{get_flat, smart_format, to_sort_key, Formatted, SortKey};
