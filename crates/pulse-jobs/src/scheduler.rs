//! In-process cron scheduler.

use crate::error::{JobError, JobResult};
use crate::job::Job;
use crate::metrics::SchedulerMetrics;
use chrono::{DateTime, Utc};
use cron::Schedule;
use parking_lot::RwLock;
use pulse_core::Clock;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// Scheduled job definition.
#[derive(Clone)]
pub struct ScheduledJob {
    /// Unique name for this scheduled job.
    pub name: String,

    /// Cron expression.
    pub cron: String,

    /// Parsed cron schedule.
    schedule: Schedule,

    /// The job to run.
    job: Arc<dyn Job>,

    /// Is job enabled.
    pub enabled: bool,

    /// Anchor for the next fire time. Starts at registration.
    last_run: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for ScheduledJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledJob")
            .field("name", &self.name)
            .field("cron", &self.cron)
            .field("enabled", &self.enabled)
            .field("last_run", &self.last_run)
            .finish()
    }
}

impl ScheduledJob {
    /// Create a new scheduled job.
    pub fn new(name: impl Into<String>, cron_expr: &str, job: Arc<dyn Job>) -> JobResult<Self> {
        let schedule = Schedule::from_str(cron_expr)
            .map_err(|e| JobError::Configuration(format!("Invalid cron expression: {}", e)))?;

        Ok(Self {
            name: name.into(),
            cron: cron_expr.to_string(),
            schedule,
            job,
            enabled: true,
            last_run: None,
        })
    }

    /// Set whether the job is enabled.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Calculate the next fire time strictly after `from`.
    pub fn next_run_from(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&from).next()
    }

    fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        let anchor = self.last_run.unwrap_or(now);
        self.next_run_from(anchor).is_some_and(|next| next <= now)
    }
}

/// Scheduler statistics.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStats {
    /// Number of scheduled jobs.
    pub scheduled_jobs: usize,

    /// Jobs triggered since creation.
    pub jobs_triggered: u64,

    /// Is the poll loop running.
    pub running: bool,
}

/// Cron scheduler that runs jobs in-process.
///
/// A job fires once when the first cron time after its previous run has
/// passed. Fire times missed while the process was busy collapse into one
/// run. Jobs run one at a time on the scheduler task.
pub struct Scheduler {
    /// Registered scheduled jobs.
    jobs: Arc<RwLock<HashMap<String, ScheduledJob>>>,

    /// Time source for due checks.
    clock: Arc<dyn Clock>,

    /// How often to check for due jobs.
    poll_interval: Duration,

    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,

    /// Running flag.
    running: Arc<AtomicBool>,

    /// Set by `stop` so a loop that has not subscribed yet still exits.
    stop_requested: Arc<AtomicBool>,

    /// Jobs triggered counter.
    jobs_triggered: Arc<AtomicU64>,
}

impl Scheduler {
    /// Create a new scheduler.
    pub fn new(clock: Arc<dyn Clock>, poll_interval: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            clock,
            poll_interval,
            shutdown_tx,
            running: Arc::new(AtomicBool::new(false)),
            stop_requested: Arc::new(AtomicBool::new(false)),
            jobs_triggered: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register a scheduled job. Its first fire time is computed from now.
    pub fn register(&self, mut job: ScheduledJob) {
        let name = job.name.clone();
        job.last_run.get_or_insert_with(|| self.clock.now());
        if let Some(next) = job.next_run_from(self.clock.now()) {
            info!(job_name = %name, cron = %job.cron, next_run = %next, "Registered scheduled job");
        }
        self.jobs.write().insert(name, job);
    }

    /// Register a job with cron expression.
    pub fn schedule(&self, name: impl Into<String>, cron_expr: &str, job: Arc<dyn Job>) -> JobResult<()> {
        let scheduled_job = ScheduledJob::new(name, cron_expr, job)?;
        self.register(scheduled_job);
        Ok(())
    }

    /// Is the poll loop running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get scheduler statistics.
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            scheduled_jobs: self.jobs.read().len(),
            jobs_triggered: self.jobs_triggered.load(Ordering::Relaxed),
            running: self.is_running(),
        }
    }

    /// Run the poll loop until [`Scheduler::stop`] is called.
    pub async fn start(&self) -> JobResult<()> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(JobError::Scheduler("Scheduler already running".to_string()));
        }

        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            scheduled_jobs = self.jobs.read().len(),
            "Starting scheduler"
        );

        let mut poll_interval = interval(self.poll_interval);
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.stop_requested.load(Ordering::SeqCst) {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    break;
                }

                _ = poll_interval.tick() => {
                    let triggered = self.run_due(self.clock.now()).await;
                    if triggered > 0 {
                        debug!(triggered, "Scheduler tick");
                    }
                }
            }
        }

        self.stop_requested.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        info!("Scheduler stopped");

        Ok(())
    }

    /// Stop the scheduler.
    pub fn stop(&self) {
        info!("Stopping scheduler...");
        self.stop_requested.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }

    /// Run every job that is due at `now` and return how many were triggered.
    ///
    /// Job failures are logged and do not stop the remaining jobs.
    pub async fn run_due(&self, now: DateTime<Utc>) -> usize {
        let due: Vec<(String, Arc<dyn Job>)> = {
            let mut jobs = self.jobs.write();
            jobs.values_mut()
                .filter(|scheduled| scheduled.is_due(now))
                .map(|scheduled| {
                    // Advance before running so a slow job is not fired twice.
                    scheduled.last_run = Some(now);
                    (scheduled.name.clone(), scheduled.job.clone())
                })
                .collect()
        };

        for (name, job) in &due {
            SchedulerMetrics::job_triggered(name);
            self.jobs_triggered.fetch_add(1, Ordering::Relaxed);

            match job.execute().await {
                Ok(summary) => info!(job_name = %name, summary = %summary, "Scheduled job finished"),
                Err(e) => error!(job_name = %name, error = %e, "Scheduled job failed"),
            }
        }

        due.len()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("poll_interval", &self.poll_interval)
            .field("stats", &self.stats())
            .finish()
    }
}
