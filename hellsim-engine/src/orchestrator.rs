//! Batch orchestration over a pool of tokio worker tasks.
//!
//! A coordinator task owns the batch bookkeeping. Workers each hold a command
//! receiver and share one report sender; a trial runs in slices with a
//! `yield_now` between them so progress and cancellation get through. Every
//! ticket handed to a worker yields exactly one `Done` or `Stopped` report.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{ConfigError, SimConfig};
use crate::constants::{PROGRESS_COMPLETE, SLICE_BUDGET};
use crate::rng::{derive_trial_seed, entropy_seed};
use crate::runner::{SliceOutcome, TrialEnding, TrialRunner, TrialTicket};
use crate::stats::TrialStats;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("a batch needs at least one trial")]
    NoTrials,
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("worker pool failure: {0}")]
    WorkerPool(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Worker tasks to spawn; clamped to `1..=trials`.
    pub threads: usize,
    /// Batch seed. `None` draws one from OS entropy.
    pub seed: Option<u64>,
    /// Wall-clock time a worker runs a trial before yielding.
    pub slice_budget: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            threads: std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get),
            seed: None,
            slice_budget: SLICE_BUDGET,
        }
    }
}

impl BatchOptions {
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Aggregate of a finished or cancelled batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub stats: TrialStats,
    pub trials_requested: u64,
    pub trials_completed: u64,
    /// Trials cut short by cancellation; their partial statistics are merged.
    pub trials_stopped: u64,
    pub cancelled: bool,
    pub elapsed: Duration,
    pub seed: u64,
}

impl BatchSummary {
    /// Trials whose statistics ended up in the aggregate.
    #[must_use]
    pub const fn trials_merged(&self) -> u64 {
        self.trials_completed + self.trials_stopped
    }
}

#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// Whole-batch progress; never decreases.
    Progress { percent: u8 },
    Finished(BatchSummary),
}

/// Raises the shared stop flag. Cloneable so a signal handler can hold one.
#[derive(Debug, Clone)]
pub struct CancelToken {
    stop: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn cancel(&self) {
        if !self.stop.swap(true, Ordering::AcqRel) {
            log::debug!("batch cancellation requested");
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

pub struct BatchHandle {
    events: mpsc::UnboundedReceiver<BatchEvent>,
    token: CancelToken,
    coordinator: Option<JoinHandle<()>>,
}

impl BatchHandle {
    /// Next progress or final event; `None` once the batch has finished.
    pub async fn next_event(&mut self) -> Option<BatchEvent> {
        self.events.recv().await
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Drain events until the summary arrives.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::WorkerPool`] when the coordinator goes away
    /// without producing a summary.
    pub async fn wait(mut self) -> Result<BatchSummary, BatchError> {
        while let Some(event) = self.next_event().await {
            if let BatchEvent::Finished(summary) = event {
                return Ok(summary);
            }
        }
        let reason = match self.coordinator.take() {
            Some(task) => match task.await {
                Err(err) => err.to_string(),
                Ok(()) => "coordinator closed without a summary".to_string(),
            },
            None => "coordinator already joined".to_string(),
        };
        Err(BatchError::WorkerPool(reason))
    }
}

impl Drop for BatchHandle {
    fn drop(&mut self) {
        // nobody is listening any more
        self.token.cancel();
    }
}

/// Entry point for running batches.
pub struct Batch;

impl Batch {
    /// Validate the configuration, spawn the worker pool and coordinator and
    /// dispatch the first trials. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`BatchError::NoTrials`] for an empty batch, [`BatchError::InvalidConfig`]
    /// when the configuration fails validation and [`BatchError::WorkerPool`]
    /// outside a runtime.
    pub fn start(
        config: SimConfig,
        trials: u64,
        options: BatchOptions,
    ) -> Result<BatchHandle, BatchError> {
        if trials == 0 {
            return Err(BatchError::NoTrials);
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|err| BatchError::WorkerPool(err.to_string()))?;
        let config = Arc::new(config.finalize()?);
        let seed = options.seed.unwrap_or_else(entropy_seed);
        let pool_size = usize::try_from(trials)
            .unwrap_or(usize::MAX)
            .min(options.threads.max(1));
        let stop = Arc::new(AtomicBool::new(false));

        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let mut workers = Vec::with_capacity(pool_size);
        for index in 0..pool_size {
            let (command_tx, command_rx) = mpsc::unbounded_channel();
            let worker = Worker {
                index,
                config: Arc::clone(&config),
                batch_size: trials,
                budget: options.slice_budget,
                stop: Arc::clone(&stop),
                reports: report_tx.clone(),
            };
            runtime.spawn(worker.run(command_rx));
            workers.push(command_tx);
        }
        drop(report_tx);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let coordinator = Coordinator {
            seed,
            requested: trials,
            started: 0,
            completed: 0,
            stopped: 0,
            running: 0,
            total: TrialStats::seeded(&config),
            stop: Arc::clone(&stop),
            started_at: Instant::now(),
            progress_sum: 0,
            percent: 0,
            workers,
            events: event_tx,
        };
        log::debug!("batch of {trials} trials on {pool_size} workers, seed {seed}");
        let task = runtime.spawn(coordinator.run(report_rx));

        Ok(BatchHandle {
            events: event_rx,
            token: CancelToken { stop },
            coordinator: Some(task),
        })
    }
}

#[derive(Debug)]
enum WorkerCommand {
    Start(TrialTicket),
    Shutdown,
}

#[derive(Debug)]
enum WorkerReport {
    Progress {
        increment: u8,
    },
    Done {
        worker: usize,
        trial_id: u64,
        ending: TrialEnding,
        stats: Box<TrialStats>,
    },
    Stopped {
        worker: usize,
        trial_id: u64,
        stats: Box<TrialStats>,
    },
}

struct Worker {
    index: usize,
    config: Arc<SimConfig>,
    batch_size: u64,
    budget: Duration,
    stop: Arc<AtomicBool>,
    reports: mpsc::UnboundedSender<WorkerReport>,
}

impl Worker {
    async fn run(self, mut commands: mpsc::UnboundedReceiver<WorkerCommand>) {
        while let Some(command) = commands.recv().await {
            let ticket = match command {
                WorkerCommand::Start(ticket) => ticket,
                WorkerCommand::Shutdown => break,
            };
            let report = self.run_trial(ticket).await;
            if self.reports.send(report).is_err() {
                break;
            }
        }
        log::trace!("worker {} shut down", self.index);
    }

    async fn run_trial(&self, ticket: TrialTicket) -> WorkerReport {
        if self.stop.load(Ordering::Acquire) {
            return WorkerReport::Stopped {
                worker: self.index,
                trial_id: ticket.trial_id,
                stats: Box::new(TrialStats::seeded(&self.config)),
            };
        }

        let mut runner = TrialRunner::new(Arc::clone(&self.config), ticket, self.batch_size);
        loop {
            let outcome = {
                let mut sink = |increment: u8| {
                    let _ = self.reports.send(WorkerReport::Progress { increment });
                };
                runner.run_slice(self.budget, &self.stop, &mut sink)
            };
            match outcome {
                SliceOutcome::Yielded => tokio::task::yield_now().await,
                SliceOutcome::Finished(ending) => {
                    return WorkerReport::Done {
                        worker: self.index,
                        trial_id: ticket.trial_id,
                        ending,
                        stats: Box::new(runner.into_stats()),
                    };
                }
                SliceOutcome::Stopped => {
                    return WorkerReport::Stopped {
                        worker: self.index,
                        trial_id: ticket.trial_id,
                        stats: Box::new(runner.into_stats()),
                    };
                }
            }
        }
    }
}

struct Coordinator {
    seed: u64,
    requested: u64,
    started: u64,
    completed: u64,
    stopped: u64,
    running: u64,
    total: TrialStats,
    stop: Arc<AtomicBool>,
    started_at: Instant,
    /// Sum of per-trial progress increments, in percent of one trial.
    progress_sum: u64,
    percent: u8,
    workers: Vec<mpsc::UnboundedSender<WorkerCommand>>,
    events: mpsc::UnboundedSender<BatchEvent>,
}

impl Coordinator {
    async fn run(mut self, mut reports: mpsc::UnboundedReceiver<WorkerReport>) {
        for worker in 0..self.workers.len() {
            self.dispatch(worker);
        }

        while self.running > 0 {
            let Some(report) = reports.recv().await else {
                log::error!("all workers went away with {} trials running", self.running);
                return;
            };
            match report {
                WorkerReport::Progress { increment } => self.advance_progress(increment),
                WorkerReport::Done {
                    worker,
                    trial_id,
                    ending,
                    stats,
                } => {
                    log::trace!("trial {trial_id} done on worker {worker}: {ending:?}");
                    self.total.merge(*stats);
                    self.completed += 1;
                    self.running -= 1;
                    self.dispatch(worker);
                }
                WorkerReport::Stopped {
                    worker,
                    trial_id,
                    stats,
                } => {
                    log::trace!("trial {trial_id} stopped on worker {worker}");
                    self.total.merge(*stats);
                    self.stopped += 1;
                    self.running -= 1;
                }
            }
        }

        for worker in &self.workers {
            let _ = worker.send(WorkerCommand::Shutdown);
        }
        self.finish();
    }

    /// Hand the next trial to `worker` unless the batch is exhausted or
    /// stopping.
    fn dispatch(&mut self, worker: usize) {
        if self.started >= self.requested || self.stop.load(Ordering::Acquire) {
            return;
        }
        let trial_id = self.started + 1;
        let ticket = TrialTicket {
            trial_id,
            seed: derive_trial_seed(self.seed, trial_id),
        };
        let Some(sender) = self.workers.get(worker) else {
            return;
        };
        if sender.send(WorkerCommand::Start(ticket)).is_err() {
            log::error!("worker {worker} is gone; trial {trial_id} not dispatched");
            return;
        }
        self.started += 1;
        self.running += 1;
    }

    fn advance_progress(&mut self, increment: u8) {
        self.progress_sum += u64::from(increment);
        let percent = (self.progress_sum / self.requested).min(u64::from(PROGRESS_COMPLETE));
        let percent = u8::try_from(percent).unwrap_or(PROGRESS_COMPLETE);
        if percent > self.percent {
            self.percent = percent;
            let _ = self.events.send(BatchEvent::Progress { percent });
        }
    }

    fn finish(self) {
        let cancelled = self.stop.load(Ordering::Acquire) && self.completed < self.requested;
        let summary = BatchSummary {
            stats: self.total,
            trials_requested: self.requested,
            trials_completed: self.completed,
            trials_stopped: self.stopped,
            cancelled,
            elapsed: self.started_at.elapsed(),
            seed: self.seed,
        };
        log::debug!(
            "batch finished: {}/{} trials in {:.2?}{}",
            summary.trials_completed,
            summary.trials_requested,
            summary.elapsed,
            if cancelled { " (cancelled)" } else { "" }
        );
        let _ = self.events.send(BatchEvent::Finished(summary));
    }
}
