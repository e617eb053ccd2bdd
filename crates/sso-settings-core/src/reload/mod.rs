//! Post-commit reload worker
//!
//! Mutations never call reload targets directly. They hand a [`ReloadJob`]
//! to a [`ReloadDispatcher`], and a dedicated [`ReloadWorker`] task performs
//! the reload and owns its logging policy.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  try_send   ┌──────────────┐   reload()   ┌──────────────┐
//! │ upsert/delete│────────────▶│ ReloadWorker │─────────────▶│ ReloadTarget │
//! └──────────────┘  ReloadJob  └──────────────┘              └──────────────┘
//!                                     │
//!                                     ▼
//!                               ReloadEvent (telemetry)
//! ```
//!
//! Both channels are bounded. A full job queue drops the job with a warning;
//! a full event channel drops the event with a warning. Failed reloads are
//! not retried.
//!
//! ## Shutdown
//!
//! [`ReloadWorker::shutdown`] closes the queue, lets the worker finish the
//! jobs already queued, then waits for the task to exit.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

use crate::config::ReloadConfig;
use crate::model::SettingsRecord;
use crate::registry::{FallbackRegistry, ReloadRegistry};

/// Work handed from a committed mutation to the worker
#[derive(Debug, Clone, PartialEq)]
pub enum ReloadJob {
    /// Reload the provider's target with this resolved plaintext record
    Apply {
        record: SettingsRecord,
    },

    /// Reload the provider's target with its fallback defaults
    Revert {
        provider: String,
    },
}

impl ReloadJob {
    /// Provider the job concerns
    pub fn provider(&self) -> &str {
        match self {
            ReloadJob::Apply { record } => &record.provider,
            ReloadJob::Revert { provider } => provider,
        }
    }
}

/// Events emitted by the reload worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadEvent {
    /// The target accepted the new settings
    Applied {
        provider: String,
    },

    /// Loading defaults or the reload itself failed
    Failed {
        provider: String,
        error: String,
    },

    /// No target is registered for the provider
    Skipped {
        provider: String,
    },
}

/// Non-blocking handle for enqueueing reload jobs
#[derive(Debug, Clone)]
pub struct ReloadDispatcher {
    jobs: mpsc::Sender<ReloadJob>,
}

impl ReloadDispatcher {
    /// Create a dispatcher over a job sender
    pub fn new(jobs: mpsc::Sender<ReloadJob>) -> Self {
        Self { jobs }
    }

    /// Enqueue a job without waiting
    ///
    /// Returns `false` when the job was dropped because the queue is full or
    /// the worker has stopped.
    pub fn enqueue(&self, job: ReloadJob) -> bool {
        match self.jobs.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(
                    provider = job.provider(),
                    "Reload queue full, dropping job. Consider increasing queue_capacity."
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                warn!(provider = job.provider(), "Reload worker stopped, dropping job");
                false
            }
        }
    }
}

/// Dedicated task that applies reload jobs
///
/// Dropping the handle detaches the task; it keeps serving jobs until every
/// [`ReloadDispatcher`] is dropped. Only [`ReloadWorker::shutdown`] stops it early.
#[must_use = "call `shutdown` to drain queued reloads before exit"]
pub struct ReloadWorker {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ReloadWorker {
    /// Spawn the worker on the current Tokio runtime
    ///
    /// # Returns
    ///
    /// A tuple of (worker, dispatcher, event_receiver)
    pub fn spawn(
        config: &ReloadConfig,
        fallbacks: FallbackRegistry,
        targets: Arc<ReloadRegistry>,
    ) -> (Self, ReloadDispatcher, mpsc::Receiver<ReloadEvent>) {
        let (job_tx, job_rx) = mpsc::channel(config.queue_capacity);
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runner = Runner {
            fallbacks,
            targets,
            events: event_tx,
        };
        let handle = tokio::spawn(runner.run(ReceiverStream::new(job_rx), shutdown_rx));

        let worker = Self { shutdown_tx, handle };
        (worker, ReloadDispatcher::new(job_tx), event_rx)
    }

    /// Stop accepting jobs, finish queued ones, and wait for the task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);

        if let Err(e) = self.handle.await {
            error!("Reload worker task failed: {}", e);
        }
    }
}

struct Runner {
    fallbacks: FallbackRegistry,
    targets: Arc<ReloadRegistry>,
    events: mpsc::Sender<ReloadEvent>,
}

impl Runner {
    async fn run(self, mut jobs: ReceiverStream<ReloadJob>, mut shutdown_rx: watch::Receiver<bool>) {
        info!("Reload worker started");

        // A dropped worker handle is not a shutdown request; the worker then
        // runs until every dispatcher is gone.
        let mut handle_alive = true;

        loop {
            tokio::select! {
                job = jobs.next() => match job {
                    Some(job) => self.process(job).await,
                    None => {
                        debug!("All dispatchers dropped");
                        break;
                    }
                },

                changed = shutdown_rx.changed(), if handle_alive => match changed {
                    Ok(()) => {
                        jobs.close();
                        let mut drained = 0usize;
                        while let Some(job) = jobs.next().await {
                            self.process(job).await;
                            drained += 1;
                        }
                        debug!(drained, "Drained reload queue");
                        break;
                    }
                    Err(_) => {
                        debug!("Worker handle dropped, serving until all dispatchers are dropped");
                        handle_alive = false;
                    }
                },
            }
        }

        info!("Reload worker stopped");
    }

    async fn process(&self, job: ReloadJob) {
        let record = match job {
            ReloadJob::Apply { record } => record,
            ReloadJob::Revert { provider } => match self.fallbacks.defaults_for(&provider).await {
                Ok(defaults) => SettingsRecord::derived(provider, defaults),
                Err(e) => {
                    error!(provider = %provider, "Failed to load defaults for reload: {}", e);
                    self.emit(ReloadEvent::Failed {
                        provider,
                        error: e.to_string(),
                    });
                    return;
                }
            },
        };

        let provider = record.provider.clone();

        let Some(target) = self.targets.get(&provider) else {
            warn!(provider = %provider, "No reload target registered, skipping reload");
            self.emit(ReloadEvent::Skipped { provider });
            return;
        };

        match target.reload(&record).await {
            Ok(()) => {
                info!(provider = %provider, origin = ?record.origin, "Reloaded SSO settings");
                self.emit(ReloadEvent::Applied { provider });
            }
            Err(e) => {
                error!(provider = %provider, "Failed to reload SSO settings: {}", e);
                self.emit(ReloadEvent::Failed {
                    provider,
                    error: e.to_string(),
                });
            }
        }
    }

    fn emit(&self, event: ReloadEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Reload event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                debug!(event = ?event, "Reload event receiver dropped, discarding event");
            }
        }
    }
}
