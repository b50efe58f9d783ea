//! Batch verification over a bounded worker pool.
//!
//! Each entity is looked up, fetched and verified on one worker. Results are
//! slotted back by input index, so output order never depends on completion
//! order. A failing or panicking entity becomes a `failed` result and the
//! other workers carry on.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Instant;

use log::{debug, info, warn};

use crate::engine::{failed_result, Verifier};
use crate::error::ReconError;
use crate::model::VerificationResult;
use crate::store::{RecordStore, SourceProvider};

/// Cancel token for a batch. Set to true to stop starting new entities.
pub type CancelToken = Arc<AtomicBool>;

pub fn cancel_token() -> CancelToken {
    Arc::new(AtomicBool::new(false))
}

/// Drives verification of many entities using injected collaborators.
pub struct Orchestrator<S, P> {
    verifier: Verifier,
    store: S,
    provider: P,
}

impl<S: RecordStore, P: SourceProvider> Orchestrator<S, P> {
    pub fn new(verifier: Verifier, store: S, provider: P) -> Self {
        Self {
            verifier,
            store,
            provider,
        }
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    /// Look up, fetch and verify one entity. Never fails outward.
    pub fn verify_entity(&self, id: &str) -> VerificationResult {
        let started = Instant::now();

        let record = match self.store.get(id) {
            Ok(record) => record,
            Err(e) => {
                warn!("{id}: record lookup failed: {e}");
                return failed_result(id, "", &e, started);
            }
        };

        let observations = match self.provider.fetch(&record) {
            Ok(observations) => observations,
            Err(e) => {
                let e = match e {
                    ReconError::SourceUnavailable { .. } => e,
                    other => ReconError::SourceUnavailable {
                        entity_id: record.id.clone(),
                        message: other.to_string(),
                    },
                };
                warn!("{id}: {e}");
                return failed_result(&record.id, &record.name, &e, started);
            }
        };

        self.verifier.verify_since(&record, &observations, started)
    }

    /// `verify_entity` with panics inside collaborators contained.
    fn verify_isolated(&self, id: &str) -> VerificationResult {
        let started = Instant::now();
        match catch_unwind(AssertUnwindSafe(|| self.verify_entity(id))) {
            Ok(result) => result,
            Err(payload) => {
                let e = ReconError::Internal(panic_message(payload.as_ref()));
                warn!("{id}: {e}");
                failed_result(id, "", &e, started)
            }
        }
    }

    /// Verify every id, in input order.
    ///
    /// Up to `batch.workers` entities run at once; each worker pauses
    /// `batch.inter_entity_delay_ms` between its entities. Once `cancel` is
    /// set no new entity starts, in-flight ones finish, and only finished
    /// entities are returned.
    pub fn verify_many(&self, ids: &[String], cancel: &CancelToken) -> Vec<VerificationResult> {
        if ids.is_empty() {
            return Vec::new();
        }

        let batch = &self.verifier.config().batch;
        let workers = batch.workers.clamp(1, ids.len());
        let delay = batch.inter_entity_delay();
        info!("batch: {} entities on {workers} workers", ids.len());

        let next = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel::<(usize, VerificationResult)>();

        thread::scope(|scope| {
            for worker in 0..workers {
                let tx = tx.clone();
                let next = &next;
                scope.spawn(move || {
                    let mut first = true;
                    loop {
                        if cancel.load(Ordering::SeqCst) {
                            debug!("worker {worker}: cancelled");
                            break;
                        }
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        if index >= ids.len() {
                            break;
                        }
                        if !first && !delay.is_zero() {
                            thread::sleep(delay);
                            if cancel.load(Ordering::SeqCst) {
                                debug!("worker {worker}: cancelled");
                                break;
                            }
                        }
                        first = false;

                        debug!("worker {worker}: entity {} ({})", index + 1, ids[index]);
                        let result = self.verify_isolated(&ids[index]);
                        if tx.send((index, result)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(tx);

        let mut slots: Vec<Option<VerificationResult>> = (0..ids.len()).map(|_| None).collect();
        for (index, result) in rx {
            slots[index] = Some(result);
        }
        let results: Vec<VerificationResult> = slots.into_iter().flatten().collect();

        if results.len() < ids.len() {
            info!("batch cancelled: {} of {} entities verified", results.len(), ids.len());
        } else {
            info!("batch complete: {} entities", results.len());
        }
        results
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic while verifying entity".to_string()
    }
}
