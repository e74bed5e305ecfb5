use crate::error::Result;
use crate::recognition::{
    recognize_batch, BatchTarget, RecognitionBatch, RecognitionRequest, RecognitionService,
};
use crate::store::{InventoryStore, RecognitionReport};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use uuid::Uuid;

/// Runs recognition calls off the caller's thread. Finished calls queue up
/// on a bounded channel; whoever owns the store drains it and each result is
/// applied as its own batch, in arrival order.
#[derive(Clone)]
pub struct RecognitionJobs {
    inner: Arc<JobsInner>,
}

struct JobsInner {
    tx: Sender<CompletedJob>,
    rx: Receiver<CompletedJob>,
    /// Submitted jobs not yet drained, mapped to their discard flag.
    live: Mutex<HashMap<String, bool>>,
}

struct CompletedJob {
    id: String,
    outcome: Result<RecognitionBatch>,
}

#[derive(Debug)]
pub enum JobOutcome {
    Applied {
        job_id: String,
        report: RecognitionReport,
    },
    /// The call failed or its result could not be applied to the store.
    Failed {
        job_id: String,
        error: String,
    },
    Discarded {
        job_id: String,
    },
}

impl RecognitionJobs {
    pub fn new(queue_capacity: usize) -> Self {
        let (tx, rx) = bounded::<CompletedJob>(queue_capacity.max(1));
        Self {
            inner: Arc::new(JobsInner {
                tx,
                rx,
                live: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Starts a recognition call and returns its job id.
    pub fn submit(
        &self,
        service: Arc<dyn RecognitionService>,
        request: RecognitionRequest,
        target: BatchTarget,
    ) -> String {
        let job_id = Uuid::new_v4().to_string();
        self.live().insert(job_id.clone(), false);

        let tx = self.inner.tx.clone();
        let id = job_id.clone();
        thread::spawn(move || {
            let outcome = recognize_batch(service.as_ref(), &request, target);
            if tx.send(CompletedJob { id, outcome }).is_err() {
                log::warn!("Recognition queue closed; dropping a finished job");
            }
        });
        log::debug!("Submitted recognition job {job_id}");
        job_id
    }

    /// Marks a pending job so its result is dropped instead of applied.
    /// Returns false for ids that are unknown or already drained.
    pub fn discard(&self, job_id: &str) -> bool {
        match self.live().get_mut(job_id) {
            Some(discarded) => {
                *discarded = true;
                true
            }
            None => false,
        }
    }

    /// Jobs submitted but not yet drained.
    pub fn pending(&self) -> usize {
        self.live().len()
    }

    /// Applies every result that has already arrived, without blocking.
    /// A result the store rejects is reported as failed and draining goes on.
    pub fn apply_ready(&self, store: &mut InventoryStore) -> Vec<JobOutcome> {
        let mut outcomes = Vec::new();
        loop {
            match self.inner.rx.try_recv() {
                Ok(job) => outcomes.push(self.apply(job, store)),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        outcomes
    }

    /// Waits up to `timeout` for the next result and applies it.
    pub fn apply_next(&self, store: &mut InventoryStore, timeout: Duration) -> Option<JobOutcome> {
        match self.inner.rx.recv_timeout(timeout) {
            Ok(job) => Some(self.apply(job, store)),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    fn apply(&self, job: CompletedJob, store: &mut InventoryStore) -> JobOutcome {
        let discarded = self.live().remove(&job.id).unwrap_or(false);
        if discarded {
            log::info!("Dropping result of discarded recognition job {}", job.id);
            return JobOutcome::Discarded { job_id: job.id };
        }
        let applied = job
            .outcome
            .and_then(|batch| store.add_recognized_items(batch));
        match applied {
            Ok(report) => JobOutcome::Applied {
                job_id: job.id,
                report,
            },
            Err(err) => {
                log::warn!("Recognition job {} failed: {err}", job.id);
                JobOutcome::Failed {
                    job_id: job.id,
                    error: err.to_string(),
                }
            }
        }
    }

    fn live(&self) -> MutexGuard<'_, HashMap<String, bool>> {
        self.inner
            .live
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
