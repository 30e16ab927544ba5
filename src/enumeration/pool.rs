//! Bounded fan-out/fan-in worker pool driving the enumeration.

use crate::core::config::Config;
use crate::core::models::{EnumerationSummary, Verdict};
use crate::core::probe::Prober;
use crate::enumeration::sink::ResultSink;
use crate::enumeration::source::IdentitySource;

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Fixed-size pool of workers draining one shared bounded queue.
///
/// The producer task feeds identities from the source and blocks once the
/// queue is full, so memory stays bounded regardless of input size. The
/// first `AuthError` verdict cancels the shared token: the producer stops
/// feeding, idle workers wake and exit, and in-flight jobs run to
/// completion. Identities still queued at that point are abandoned and
/// counted, never probed.
pub struct WorkerPool {
    prober: Arc<Prober>,
    sink: Arc<ResultSink>,
    workers: usize,
    queue_capacity: usize,
    cancel: CancellationToken,
}

impl WorkerPool {
    pub fn new(prober: Arc<Prober>, sink: Arc<ResultSink>, config: &Config) -> Self {
        Self {
            prober,
            sink,
            workers: config.workers,
            queue_capacity: config.queue_capacity,
            cancel: CancellationToken::new(),
        }
    }

    /// Token observed by the pool; callers may cancel it to stop a run early.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drains the source through the pool. Returns once the producer is done
    /// and every worker has exited.
    pub async fn run(&self, mut source: IdentitySource) -> EnumerationSummary {
        let (tx, rx) = mpsc::channel::<String>(self.queue_capacity);
        let queue = Arc::new(Mutex::new(rx));

        tracing::debug!(target: "pool",
            "Starting {} workers (queue capacity {}).", self.workers, self.queue_capacity);

        let mut handles = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            let queue = Arc::clone(&queue);
            let prober = Arc::clone(&self.prober);
            let sink = Arc::clone(&self.sink);
            let cancel = self.cancel.clone();

            handles.push(tokio::spawn(async move {
                let mut tally = EnumerationSummary::default();
                loop {
                    // Cancellation wins over a ready job: queued identities
                    // are abandoned once the credential is known dead.
                    let job = {
                        let mut queue = queue.lock().await;
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => None,
                            job = queue.recv() => job,
                        }
                    };
                    let Some(identity) = job else { break };

                    let verdict = prober.probe_identity(&identity).await;
                    if matches!(verdict, Verdict::AuthError) && !cancel.is_cancelled() {
                        tracing::warn!(target: "pool",
                            "Worker {}: credential rejected (401); abandoning queued lookups.",
                            worker_id
                        );
                        cancel.cancel();
                    }
                    tally.absorb(&verdict);

                    if let Err(e) = sink.record(&identity, &verdict) {
                        tracing::error!(target: "pool",
                            "Failed to record verdict for {}: {}", identity, e);
                    }
                }
                tracing::trace!(target: "pool",
                    "Worker {} exiting after {} jobs.", worker_id, tally.processed);
                tally
            }));
        }

        // Producer: feed until exhaustion or cancellation. Dropping the
        // sender is what closes the queue for the workers.
        let producer = {
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        next = source.next_identity() => next,
                    };
                    match next {
                        Ok(Some(identity)) => {
                            tokio::select! {
                                biased;
                                _ = cancel.cancelled() => break,
                                sent = tx.send(identity) => {
                                    if sent.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            tracing::error!(target: "pool", "Input source failed mid-run: {}", e);
                            break;
                        }
                    }
                }
            })
        };

        if let Err(e) = producer.await {
            tracing::error!(target: "pool", "Producer task failed to join: {}", e);
        }

        let mut summary = EnumerationSummary::default();
        for handle in handles {
            match handle.await {
                Ok(tally) => summary.merge(&tally),
                Err(e) => {
                    tracing::error!(target: "pool", "A worker task failed to join: {}", e);
                }
            }
        }

        // Whatever is still buffered was never probed.
        {
            let mut queue = queue.lock().await;
            queue.close();
            while queue.try_recv().is_ok() {
                summary.abandoned += 1;
            }
        }
        summary.cancelled |= self.cancel.is_cancelled();

        if summary.abandoned > 0 {
            tracing::warn!(target: "pool",
                "{} queued identities were abandoned after cancellation.", summary.abandoned);
        }

        summary
    }
}
