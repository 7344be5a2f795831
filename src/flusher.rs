//! Background write-back worker.
//!
//! A single long-lived thread owns the periodic flush: every `period` it walks
//! the buffer pool, claims Dirty slots by CAS and writes their values to the
//! record store. Shutdown is a message on a channel; the worker answers with
//! one final pass before exiting, so no dirty slot is abandoned by an orderly
//! shutdown.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::debug;

use crate::engine::CacheShared;
use crate::slot::SlotStatus;
use crate::value::CacheValue;

pub(crate) enum FlushSignal {
    Shutdown,
}

/// Handle to the flusher thread.
///
/// `stop` is idempotent: the first call sends the shutdown signal and joins
/// the worker, later calls (including the one from `Drop`) are no-ops.
pub(crate) struct FlushWorker {
    tx: Sender<FlushSignal>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl FlushWorker {
    pub(crate) fn spawn<V: CacheValue>(shared: Arc<CacheShared<V>>, period: Duration) -> Self {
        let (tx, rx) = bounded::<FlushSignal>(1);
        let worker = thread::spawn(move || worker_loop(shared, rx, period));

        Self {
            tx,
            worker: Mutex::new(Some(worker)),
        }
    }

    pub(crate) fn stop(&self) {
        if let Some(worker) = self.worker.lock().take() {
            let _ = self.tx.send(FlushSignal::Shutdown);
            let _ = worker.join();
        }
    }
}

impl Drop for FlushWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop<V: CacheValue>(
    shared: Arc<CacheShared<V>>,
    rx: Receiver<FlushSignal>,
    period: Duration,
) {
    debug!(period_ms = period.as_millis() as u64, "flusher started");
    loop {
        match rx.recv_timeout(period) {
            Err(RecvTimeoutError::Timeout) => {
                let flushed = flush_pass(&shared);
                if flushed > 0 {
                    debug!(flushed, "periodic flush pass");
                }
            }
            Ok(FlushSignal::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                let flushed = flush_pass(&shared);
                debug!(flushed, "final flush pass, flusher exiting");
                return;
            }
        }
    }
}

/// Write every Dirty slot back to the record store.
///
/// Each Dirty slot is claimed by CASing it to Valid with its frequency and
/// value unchanged; only the claimant writes the record, so a slot's value is
/// persisted at most once per cycle. A failed CAS or a slot with no bound
/// line (mid-eviction) is skipped and will be caught on a later cycle or by
/// the eviction write-back. Returns the number of records written.
pub(crate) fn flush_pass<V: CacheValue>(shared: &CacheShared<V>) -> u64 {
    let mut flushed = 0;
    for slot in 0..shared.pool.len() {
        let current = shared.pool.load(slot);
        if current.status != SlotStatus::Dirty {
            continue;
        }
        if !shared
            .pool
            .cas(slot, current, current.with_status(SlotStatus::Valid))
        {
            continue;
        }
        if let Some(line) = shared.index.line_for(slot) {
            shared.store.write(line, &current.value.to_field());
            flushed += 1;
        }
    }
    shared.stats.record_flush_pass(flushed);
    flushed
}
