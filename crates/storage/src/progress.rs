//! Completion-ratio aggregation for one upload operation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

use swiftslice_common::ProgressCallback;

/// Derives a single 0..1 completion ratio from chunk states and in-flight
/// byte counts:
///
/// ```text
/// ratio = (sum of finished chunk sizes + bytes sent of running chunks) / total
/// ```
///
/// Recomputed and emitted on every transfer byte-progress tick and every
/// chunk state transition. Queued and retry-pending chunks contribute
/// nothing. The emitted ratio is clamped monotonically non-decreasing, so
/// a failed transfer never makes reported progress move backwards.
///
/// The callback returning `false` cancels the operation through the shared
/// cancellation token.
pub struct ProgressAggregator<'a> {
    total_bytes: u64,
    done_bytes: AtomicU64,
    inflight: Mutex<HashMap<u64, u64>>,
    last_ratio: Mutex<f64>,
    callback: Option<&'a dyn ProgressCallback<f64>>,
    cancel: CancellationToken,
}

impl<'a> ProgressAggregator<'a> {
    /// Create an aggregator for a source of `total_bytes`.
    pub fn new(
        total_bytes: u64,
        callback: Option<&'a dyn ProgressCallback<f64>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            total_bytes,
            done_bytes: AtomicU64::new(0),
            inflight: Mutex::new(HashMap::new()),
            last_ratio: Mutex::new(0.0),
            callback,
            cancel,
        }
    }

    /// Record a byte-progress tick for a running chunk.
    pub fn transfer_progress(&self, number: u64, sent: u64) {
        {
            let mut inflight = self.inflight.lock().expect("lock poisoned");
            inflight.insert(number, sent);
        }
        self.emit();
    }

    /// Record a chunk reaching its finished state.
    pub fn chunk_done(&self, number: u64, size: u64) {
        {
            let mut inflight = self.inflight.lock().expect("lock poisoned");
            inflight.remove(&number);
        }
        self.done_bytes.fetch_add(size, Ordering::SeqCst);
        self.emit();
    }

    /// Record a chunk transfer failing. Its in-flight bytes no longer count.
    pub fn chunk_failed(&self, number: u64) {
        {
            let mut inflight = self.inflight.lock().expect("lock poisoned");
            inflight.remove(&number);
        }
        self.emit();
    }

    /// Current raw completion ratio in `[0, 1]`.
    ///
    /// A zero-byte source is complete by definition.
    pub fn ratio(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        let inflight: u64 = {
            let inflight = self.inflight.lock().expect("lock poisoned");
            inflight.values().sum()
        };
        let done: u64 = self.done_bytes.load(Ordering::SeqCst);
        ((done + inflight) as f64 / self.total_bytes as f64).min(1.0)
    }

    fn emit(&self) {
        let ratio: f64 = {
            let mut last = self.last_ratio.lock().expect("lock poisoned");
            let ratio: f64 = self.ratio().max(*last);
            *last = ratio;
            ratio
        };
        if let Some(cb) = self.callback {
            if !cb.on_progress(&ratio) {
                log::debug!("progress callback requested cancellation at {:.3}", ratio);
                self.cancel.cancel();
            }
        }
    }
}
