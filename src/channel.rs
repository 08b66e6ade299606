use std::sync::mpsc;

/// The consumer end of the channel is gone.
///
/// Producers treat this as the cancellation signal: the invoking request
/// was dropped at the boundary, so the command aborts on its next send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

/// One-way, ordered, typed delivery of record/result chunks.
///
/// The engine never depends on a concrete IPC transport: a desktop shell
/// adapts its own channel type (e.g. a Tauri IPC channel) behind this
/// trait, and tests plug in an in-memory `std::sync::mpsc` channel.
/// `send` returns once the chunk is enqueued; there is no back-pressure
/// from the consumer, which buffers and rate-flushes on its side.
pub trait ChunkSink<T> {
  fn send(&self, chunk: Vec<T>) -> Result<(), SinkClosed>;
}

impl<T> ChunkSink<T> for mpsc::Sender<Vec<T>> {
  fn send(&self, chunk: Vec<T>) -> Result<(), SinkClosed> {
    mpsc::Sender::send(self, chunk).map_err(|_| SinkClosed)
  }
}

/// Accumulates items and flushes a chunk whenever `cap` is reached.
///
/// The final short chunk must be flushed explicitly with `finish`.
pub(crate) struct Chunker<'a, T> {
  sink: &'a dyn ChunkSink<T>,
  cap: usize,
  buf: Vec<T>,
}

impl<'a, T> Chunker<'a, T> {
  pub(crate) fn new(sink: &'a dyn ChunkSink<T>, cap: usize) -> Self {
    let cap = cap.max(1);
    Self {
      sink,
      cap,
      buf: Vec::with_capacity(cap),
    }
  }

  pub(crate) fn push(&mut self, item: T) -> Result<(), SinkClosed> {
    self.buf.push(item);
    if self.buf.len() >= self.cap {
      self.flush()?;
    }
    Ok(())
  }

  pub(crate) fn finish(mut self) -> Result<(), SinkClosed> {
    if self.buf.is_empty() {
      return Ok(());
    }
    self.flush()
  }

  fn flush(&mut self) -> Result<(), SinkClosed> {
    let chunk = std::mem::replace(&mut self.buf, Vec::with_capacity(self.cap));
    self.sink.send(chunk)
  }
}
