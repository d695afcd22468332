//! Read-coalescing scheduler.
//!
//! Batches overlapping or nearby byte-range requests into fewer underlying
//! reads. Purely a latency/throughput optimization, callers always observe
//! exactly the bytes they asked for.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::channel::oneshot;
use parking_lot::Mutex;
use quarry_error::{QuarryError, Result};
use tracing::debug;

use crate::FileSource;

/// Batching policy for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Max gap in bytes between the end of one request and the start of the
    /// next for both to share an underlying read.
    pub max_span: usize,
    /// Max total span in bytes a single underlying read may cover.
    pub max_length: usize,
    /// How long to wait for more requests to arrive before processing the
    /// queue.
    pub queue_wait: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            max_span: 100_000,
            max_length: 10_000_000,
            queue_wait: Duration::from_millis(5),
        }
    }
}

#[derive(Debug)]
struct QueuedRead {
    offset: usize,
    len: usize,
    tx: oneshot::Sender<Result<Bytes>>,
}

#[derive(Debug)]
struct SchedulerInner<S> {
    source: Mutex<S>,
    conf: SchedulerConfig,
    queue: Mutex<Vec<QueuedRead>>,
    timer_armed: AtomicBool,
}

/// Coalesces byte-range reads against an underlying source.
///
/// Requests queue until a quiescence timer fires, then nearby requests are
/// grouped per [`SchedulerConfig`] and each group is served by one
/// underlying read. Every request resolves with exactly its requested
/// range regardless of how it was batched.
///
/// Cloning is cheap; all clones share one queue. `read` must be called
/// from within a tokio runtime, the quiescence timer is spawned onto it.
#[derive(Debug)]
pub struct ReadScheduler<S> {
    inner: Arc<SchedulerInner<S>>,
}

impl<S> Clone for ReadScheduler<S> {
    fn clone(&self) -> Self {
        ReadScheduler {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: FileSource + 'static> ReadScheduler<S> {
    pub fn new(source: S, conf: SchedulerConfig) -> Self {
        ReadScheduler {
            inner: Arc::new(SchedulerInner {
                source: Mutex::new(source),
                conf,
                queue: Mutex::new(Vec::new()),
                timer_armed: AtomicBool::new(false),
            }),
        }
    }

    /// Request `len` bytes starting at `offset`.
    ///
    /// Resolves once the batch containing this request has been read from
    /// the underlying source.
    pub async fn read(&self, offset: usize, len: usize) -> Result<Bytes> {
        let (tx, rx) = oneshot::channel();
        self.inner.queue.lock().push(QueuedRead { offset, len, tx });

        if !self.inner.timer_armed.swap(true, Ordering::AcqRel) {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                tokio::time::sleep(inner.conf.queue_wait).await;
                inner.timer_armed.store(false, Ordering::Release);
                inner.process_queue().await;
            });
        }

        rx.await
            .map_err(|_| QuarryError::new("Read scheduler dropped request"))?
    }

    /// Process all queued requests immediately.
    ///
    /// Useful for deterministic draining in tests and shutdown paths.
    pub async fn flush_now(&self) {
        self.inner.process_queue().await
    }
}

impl<S: FileSource> SchedulerInner<S> {
    async fn process_queue(&self) {
        let mut queue = {
            let mut guard = self.queue.lock();
            std::mem::take(&mut *guard)
        };
        if queue.is_empty() {
            return;
        }

        queue.sort_by_key(|r| r.offset);

        let ranges: Vec<_> = queue.iter().map(|r| (r.offset, r.len)).collect();
        let batches = plan_batches(&ranges, self.conf.max_span, self.conf.max_length);

        debug!(
            num_requests = queue.len(),
            num_batches = batches.len(),
            "processing read queue"
        );

        let mut requests = queue.into_iter();
        for batch in batches {
            let reqs: Vec<_> = requests.by_ref().take(batch.num_requests).collect();
            self.read_batch(batch, reqs).await;
        }
    }

    async fn read_batch(&self, batch: ReadBatch, reqs: Vec<QueuedRead>) {
        debug!(start = batch.start, len = batch.len, "issuing batched read");

        let read_result = {
            let fut = self.source.lock().read_range(batch.start, batch.len);
            fut.await
        };

        match read_result {
            Ok(buf) => {
                for req in reqs {
                    let begin = req.offset - batch.start;
                    let _ = req.tx.send(Ok(buf.slice(begin..begin + req.len)));
                }
            }
            Err(e) => {
                // The source error isn't cloneable, give each waiter its
                // message.
                let msg = e.to_string();
                for req in reqs {
                    let _ = req.tx.send(Err(QuarryError::new(format!(
                        "Batched read failed, offset: {}, len: {}: {msg}",
                        req.offset, req.len
                    ))));
                }
            }
        }
    }
}

/// One planned underlying read covering `num_requests` consecutive entries
/// of the sorted request queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadBatch {
    pub start: usize,
    pub len: usize,
    pub num_requests: usize,
}

/// Group sorted `(offset, len)` requests into batches.
///
/// Walks the requests in offset order accumulating a sub-batch while each
/// new request starts within `max_span` bytes of the previous request's end
/// and the sub-batch's total span stays below `max_length`. A request
/// violating either threshold flushes the current sub-batch and starts the
/// next one, even when only the length threshold triggered the flush.
pub fn plan_batches(
    requests: &[(usize, usize)],
    max_span: usize,
    max_length: usize,
) -> Vec<ReadBatch> {
    let mut batches = Vec::new();

    let mut iter = requests.iter();
    let (first_offset, first_len) = match iter.next() {
        Some(&r) => r,
        None => return batches,
    };

    let mut start = first_offset;
    let mut end = first_offset + first_len;
    let mut prev_end = end;
    let mut count = 1;

    for &(offset, len) in iter {
        let gap = offset.saturating_sub(prev_end);
        let new_end = end.max(offset + len);

        if gap < max_span && new_end - start < max_length {
            end = new_end;
            prev_end = offset + len;
            count += 1;
        } else {
            batches.push(ReadBatch {
                start,
                len: end - start,
                num_requests: count,
            });
            start = offset;
            end = offset + len;
            prev_end = end;
            count = 1;
        }
    }

    batches.push(ReadBatch {
        start,
        len: end - start,
        num_requests: count,
    });

    batches
}
