//! Fixed-size worker pool for batch processing.
//!
//! A feeder thread pushes indexed utterances into a bounded channel, workers
//! process them concurrently and send indexed results back. The caller
//! reassembles results in input order.

use super::orchestrator::Engine;
use crate::error::{IpaError, Result};
use crate::types::{AnnotatedTranscript, Utterance};
use crossbeam_channel::bounded;
use std::thread;

/// Jobs buffered per worker before the feeder blocks.
const JOBS_PER_WORKER: usize = 2;

impl Engine {
    /// Process a batch of utterances on `workers` threads.
    ///
    /// Results come back in input order. The first failed utterance (or a
    /// worker panic) fails the whole batch.
    pub fn process_batch(
        &self,
        utterances: Vec<Utterance>,
        workers: usize,
    ) -> Result<Vec<AnnotatedTranscript>> {
        let total = utterances.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        let workers = workers.clamp(1, total);
        let capacity = workers * JOBS_PER_WORKER;

        let (job_tx, job_rx) = bounded::<(usize, Utterance)>(capacity);
        let (result_tx, result_rx) = bounded::<(usize, Result<AnnotatedTranscript>)>(capacity);

        tracing::debug!("Processing {total} utterances on {workers} workers");

        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let jobs = job_rx.clone();
                    let results = result_tx.clone();
                    scope.spawn(move || {
                        let mut processed = 0usize;
                        for (index, utterance) in jobs.iter() {
                            let transcript = self.process(&utterance);
                            if let Err(e) = &transcript {
                                tracing::warn!(
                                    "Worker {worker}: utterance {} failed: {e}",
                                    utterance.utterance_id
                                );
                            }
                            if results.send((index, transcript)).is_err() {
                                break;
                            }
                            processed += 1;
                        }
                        tracing::trace!("Worker {worker} done after {processed} utterances");
                    })
                })
                .collect();
            drop(job_rx);
            drop(result_tx);

            let feeder = scope.spawn(move || {
                for job in utterances.into_iter().enumerate() {
                    if job_tx.send(job).is_err() {
                        break;
                    }
                }
            });

            let mut slots: Vec<Option<Result<AnnotatedTranscript>>> =
                (0..total).map(|_| None).collect();
            for (index, result) in result_rx.iter() {
                slots[index] = Some(result);
            }

            let mut panicked = 0usize;
            for handle in handles {
                if handle.join().is_err() {
                    panicked += 1;
                }
            }
            if feeder.join().is_err() {
                panicked += 1;
            }
            if panicked > 0 {
                return Err(IpaError::Worker {
                    message: format!("{panicked} worker thread(s) panicked"),
                });
            }

            slots
                .into_iter()
                .enumerate()
                .map(|(index, slot)| {
                    slot.unwrap_or_else(|| {
                        Err(IpaError::Worker {
                            message: format!("no result for utterance #{index}"),
                        })
                    })
                })
                .collect()
        })
    }
}
