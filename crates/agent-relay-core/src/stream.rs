//! Buffered streaming relay session.
//!
//! A `StreamSession` sits between a producer writing arbitrary text fragments
//! and a remote delivery sink with a hard message-size cap. Incoming text is
//! re-chunked into line- and size-bounded batches and handed to a single
//! background dispatch worker, so the producer never waits on the network.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::sink::{DeliverySink, OutputSink};

/// Upper bound on one delivery attempt before the worker moves on.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounded wait for the dispatch worker to stop during `close`.
const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Buffering parameters for a streaming session.
#[derive(Debug, Clone, Copy)]
pub struct StreamOptions {
    /// Minimum number of completed lines before a batch is dispatched.
    pub min_lines: usize,
    /// Character ceiling (completed lines + partial line) that forces a
    /// dispatch regardless of line completeness.
    pub max_buffer_chars: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            min_lines: 1,
            max_buffer_chars: 1500,
        }
    }
}

/// Item on the dispatch queue. Ordering is FIFO and the worker is the single
/// consumer, so chunks reach the destination in write order.
enum DispatchItem {
    Chunk(String),
    /// Drain marker: acked once every previously queued chunk was attempted.
    Drain(oneshot::Sender<()>),
    Shutdown,
}

/// Producer-side buffers. Mutated only under the session lock, held briefly.
#[derive(Default)]
struct BufferState {
    /// Completed lines waiting for the next flush.
    lines: Vec<String>,
    /// Trailing characters of the current, not yet completed line.
    partial: String,
    /// Exact untruncated concatenation of everything ever written.
    total: String,
}

impl BufferState {
    fn buffered_chars(&self) -> usize {
        self.lines.iter().map(|l| l.chars().count()).sum::<usize>()
            + self.partial.chars().count()
    }

    fn complete_partial(&mut self) {
        if !self.partial.is_empty() {
            self.lines.push(std::mem::take(&mut self.partial));
        }
    }

    /// Join and clear the completed lines. Whitespace-only content is dropped
    /// rather than dispatched.
    fn take_lines(&mut self) -> Option<String> {
        if self.lines.is_empty() {
            return None;
        }
        let content = self.lines.join("\n");
        self.lines.clear();
        if content.trim().is_empty() {
            None
        } else {
            Some(content)
        }
    }

    fn take_all(&mut self) -> Option<String> {
        self.complete_partial();
        self.take_lines()
    }
}

/// One streaming relay bound to one destination sink.
///
/// Created at the start of a single agent invocation and never reused. The
/// producer writes through [`OutputSink`]; a dedicated background worker
/// drains the chunk queue strictly in order and performs the delivery calls.
/// Delivery failures are logged and swallowed; the full text stays
/// recoverable via [`StreamSession::full_content`].
pub struct StreamSession {
    state: Mutex<BufferState>,
    tx: mpsc::UnboundedSender<DispatchItem>,
    worker: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
    options: StreamOptions,
}

impl StreamSession {
    /// Open a session and start its dispatch worker.
    ///
    /// `options` are caller-supplied and not validated further; degenerate
    /// values stay safe (`min_lines = 0` flushes on every newline, a huge
    /// `max_buffer_chars` defers the forced flush indefinitely).
    #[must_use]
    pub fn open(sink: Arc<dyn DeliverySink>, options: StreamOptions) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(dispatch_worker(rx, sink));

        tracing::debug!(
            min_lines = options.min_lines,
            max_buffer_chars = options.max_buffer_chars,
            "stream session opened"
        );

        Self {
            state: Mutex::new(BufferState::default()),
            tx,
            worker: Mutex::new(Some(worker)),
            closed: AtomicBool::new(false),
            options,
        }
    }

    /// Append text to the session.
    ///
    /// Safe to call repeatedly from the producer while the dispatch worker
    /// runs. Each newline completes the current line and may trigger a
    /// line-count flush; once the whole input is processed, a buffered-size
    /// check may force a flush of everything including the partial line.
    /// Flushes only enqueue; no network call happens on this path.
    ///
    /// Returns the number of characters accepted, always the full character
    /// count of `text`.
    pub fn write(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        let mut state = self.state.lock().unwrap();
        state.total.push_str(text);

        for ch in text.chars() {
            if ch == '\n' {
                state.complete_partial();
                if state.lines.len() >= self.options.min_lines {
                    if let Some(chunk) = state.take_lines() {
                        self.enqueue(chunk);
                    }
                }
            } else {
                state.partial.push(ch);
            }
        }

        if state.buffered_chars() >= self.options.max_buffer_chars {
            if let Some(chunk) = state.take_all() {
                self.enqueue(chunk);
            }
        }

        text.chars().count()
    }

    /// Move all buffered content (completed lines + trailing partial line)
    /// into one final chunk, then wait until the worker has attempted every
    /// queued delivery. "Attempted" includes failed deliveries. Idempotent
    /// when nothing is buffered.
    pub async fn flush_remaining(&self) {
        let chunk = self.state.lock().unwrap().take_all();
        if let Some(chunk) = chunk {
            self.enqueue(chunk);
        }

        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(DispatchItem::Drain(ack_tx)).is_ok() {
            // The worker acks in FIFO position, after everything queued above.
            let _ = ack_rx.await;
        }
    }

    /// Flush, stop the dispatch worker, and join it with a bounded wait.
    ///
    /// Safe to call more than once; later calls observe the closed session
    /// and return immediately. A worker wedged past the join timeout is
    /// aborted rather than hanging the caller.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.flush_remaining().await;
        let _ = self.tx.send(DispatchItem::Shutdown);

        let handle = self.worker.lock().unwrap().take();
        if let Some(mut handle) = handle {
            match tokio::time::timeout(WORKER_JOIN_TIMEOUT, &mut handle).await {
                Ok(_) => tracing::debug!("stream session closed"),
                Err(_) => {
                    tracing::warn!("dispatch worker did not stop in time, aborting");
                    handle.abort();
                }
            }
        }
    }

    /// Consistent snapshot of the exact untruncated text ever written,
    /// independent of what was delivered.
    #[must_use]
    pub fn full_content(&self) -> String {
        self.state.lock().unwrap().total.clone()
    }

    fn enqueue(&self, chunk: String) {
        tracing::debug!(chars = chunk.chars().count(), "chunk queued");
        if self.tx.send(DispatchItem::Chunk(chunk)).is_err() {
            tracing::warn!("dispatch worker gone, dropping chunk");
        }
    }
}

impl OutputSink for StreamSession {
    fn write(&self, text: &str) -> usize {
        StreamSession::write(self, text)
    }
}

/// Single-consumer dispatch loop. Delivers chunks strictly in order, one at
/// a time; failures never stop the loop or propagate to the producer.
async fn dispatch_worker(
    mut rx: mpsc::UnboundedReceiver<DispatchItem>,
    sink: Arc<dyn DeliverySink>,
) {
    while let Some(item) = rx.recv().await {
        match item {
            DispatchItem::Chunk(content) => {
                match tokio::time::timeout(DELIVERY_TIMEOUT, sink.deliver_chunk(&content)).await
                {
                    Ok(Ok(outcome)) if outcome.is_success() => {
                        tracing::debug!(chars = content.chars().count(), "chunk delivered");
                    }
                    Ok(Ok(outcome)) => {
                        tracing::warn!(
                            status = outcome.status,
                            body = %outcome.body,
                            "chunk delivery rejected"
                        );
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "chunk delivery failed");
                    }
                    Err(_) => {
                        tracing::warn!("chunk delivery timed out");
                    }
                }
            }
            DispatchItem::Drain(ack) => {
                let _ = ack.send(());
            }
            DispatchItem::Shutdown => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{DeliveryOutcome, SinkError};
    use async_trait::async_trait;

    /// Records delivered chunks in order.
    #[derive(Default)]
    struct RecordingSink {
        chunks: Mutex<Vec<String>>,
        delay: Option<Duration>,
    }

    impl RecordingSink {
        fn chunks(&self) -> Vec<String> {
            self.chunks.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DeliverySink for RecordingSink {
        async fn deliver_chunk(&self, content: &str) -> Result<DeliveryOutcome, SinkError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.chunks.lock().unwrap().push(content.to_string());
            Ok(DeliveryOutcome {
                status: 204,
                body: String::new(),
            })
        }

        async fn deliver_message(&self, content: &str) -> Result<DeliveryOutcome, SinkError> {
            self.deliver_chunk(content).await
        }
    }

    /// Fails every delivery but counts the attempts.
    #[derive(Default)]
    struct FailingSink {
        attempts: Mutex<usize>,
    }

    #[async_trait]
    impl DeliverySink for FailingSink {
        async fn deliver_chunk(&self, _content: &str) -> Result<DeliveryOutcome, SinkError> {
            *self.attempts.lock().unwrap() += 1;
            Err(SinkError::Transport("connection refused".into()))
        }

        async fn deliver_message(&self, content: &str) -> Result<DeliveryOutcome, SinkError> {
            self.deliver_chunk(content).await
        }
    }

    fn options(min_lines: usize, max_buffer_chars: usize) -> StreamOptions {
        StreamOptions {
            min_lines,
            max_buffer_chars,
        }
    }

    #[tokio::test]
    async fn full_content_matches_writes() {
        let sink = Arc::new(RecordingSink::default());
        let session = StreamSession::open(sink, StreamOptions::default());

        session.write("alpha ");
        session.write("beta\ngamma");
        session.write("");
        session.write("\ndelta");

        assert_eq!(session.full_content(), "alpha beta\ngamma\ndelta");
        session.close().await;
        assert_eq!(session.full_content(), "alpha beta\ngamma\ndelta");
    }

    #[tokio::test]
    async fn each_line_flushes_at_min_lines_one() {
        let sink = Arc::new(RecordingSink::default());
        let session = StreamSession::open(Arc::clone(&sink) as Arc<dyn DeliverySink>, options(1, 1500));

        session.write("a\nb\nc\n");
        session.flush_remaining().await;

        assert_eq!(sink.chunks(), vec!["a", "b", "c"]);
        session.close().await;
    }

    #[tokio::test]
    async fn incomplete_batch_force_flushed() {
        let sink = Arc::new(RecordingSink::default());
        let session = StreamSession::open(Arc::clone(&sink) as Arc<dyn DeliverySink>, options(3, 1500));

        session.write("a\nb\n");
        session.flush_remaining().await;

        assert_eq!(sink.chunks(), vec!["a\nb"]);
        session.close().await;
    }

    #[tokio::test]
    async fn oversized_line_hard_flushes_within_write() {
        let sink = Arc::new(RecordingSink::default());
        let session = StreamSession::open(Arc::clone(&sink) as Arc<dyn DeliverySink>, options(1, 10));

        // 15 chars, no newline: the size ceiling fires inside write() and the
        // whole line goes out as one chunk.
        session.write("aaaaaaaaaaaaaaa");
        session.write("x");
        session.flush_remaining().await;

        assert_eq!(sink.chunks(), vec!["aaaaaaaaaaaaaaa", "x"]);
        session.close().await;
    }

    #[tokio::test]
    async fn whitespace_only_lines_are_dropped() {
        let sink = Arc::new(RecordingSink::default());
        let session = StreamSession::open(Arc::clone(&sink) as Arc<dyn DeliverySink>, options(1, 1500));

        session.write("   \n");
        session.write("\t\n");
        session.flush_remaining().await;

        assert!(sink.chunks().is_empty());
        // Dropped from delivery, never from the accumulator.
        assert_eq!(session.full_content(), "   \n\t\n");
        session.close().await;
    }

    #[tokio::test]
    async fn whitespace_counts_toward_size_ceiling() {
        let sink = Arc::new(RecordingSink::default());
        let session = StreamSession::open(Arc::clone(&sink) as Arc<dyn DeliverySink>, options(10, 8));

        // Buffered whitespace pushes the size over the ceiling; the forced
        // flush then includes the non-whitespace tail.
        session.write("      \nab");
        session.flush_remaining().await;

        assert_eq!(sink.chunks(), vec!["      \nab"]);
        session.close().await;
    }

    #[tokio::test]
    async fn chunks_keep_write_order() {
        let sink = Arc::new(RecordingSink {
            chunks: Mutex::new(Vec::new()),
            delay: Some(Duration::from_millis(20)),
        });
        let session = StreamSession::open(Arc::clone(&sink) as Arc<dyn DeliverySink>, options(1, 1500));

        for i in 0..5 {
            session.write(&format!("line-{i}\n"));
        }
        session.flush_remaining().await;

        assert_eq!(
            sink.chunks(),
            vec!["line-0", "line-1", "line-2", "line-3", "line-4"]
        );
        session.close().await;
    }

    #[tokio::test]
    async fn multibyte_text_flushes_on_char_counts() {
        let sink = Arc::new(RecordingSink::default());
        let session = StreamSession::open(Arc::clone(&sink) as Arc<dyn DeliverySink>, options(1, 4));

        // Four multibyte chars hit the 4-char ceiling even though the byte
        // length is far larger.
        session.write("ねこねこ");
        session.flush_remaining().await;

        assert_eq!(sink.chunks(), vec!["ねこねこ"]);
        session.close().await;
    }

    #[tokio::test]
    async fn delivery_failures_do_not_stop_the_worker() {
        let sink = Arc::new(FailingSink::default());
        let session = StreamSession::open(Arc::clone(&sink) as Arc<dyn DeliverySink>, options(1, 1500));

        session.write("a\nb\n");
        session.flush_remaining().await;
        session.close().await;

        // Both deliveries were attempted and the content survives.
        assert_eq!(*sink.attempts.lock().unwrap(), 2);
        assert_eq!(session.full_content(), "a\nb\n");
    }

    #[tokio::test]
    async fn close_twice_is_safe() {
        let sink = Arc::new(RecordingSink::default());
        let session = StreamSession::open(Arc::clone(&sink) as Arc<dyn DeliverySink>, options(1, 1500));

        session.write("done\n");
        session.close().await;
        session.close().await;

        assert_eq!(sink.chunks(), vec!["done"]);
    }

    #[tokio::test]
    async fn flush_remaining_with_empty_buffer_is_idempotent() {
        let sink = Arc::new(RecordingSink::default());
        let session = StreamSession::open(Arc::clone(&sink) as Arc<dyn DeliverySink>, options(1, 1500));

        session.flush_remaining().await;
        session.flush_remaining().await;

        assert!(sink.chunks().is_empty());
        session.close().await;
    }

    #[tokio::test]
    async fn blank_lines_between_content_are_elided_from_chunks() {
        let sink = Arc::new(RecordingSink::default());
        let session = StreamSession::open(Arc::clone(&sink) as Arc<dyn DeliverySink>, options(2, 1500));

        session.write("a\n\nb\n");
        session.flush_remaining().await;

        assert_eq!(sink.chunks(), vec!["a\nb"]);
        assert_eq!(session.full_content(), "a\n\nb\n");
        session.close().await;
    }
}
