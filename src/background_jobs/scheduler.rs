use super::context::JobContext;
use super::job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Manages background job scheduling and execution.
///
/// Interval schedules are tracked in memory: the next run time is set when
/// a job is spawned (so a slow job never piles up overlapping runs) and
/// refreshed when it completes. A job already in its running set is never
/// spawned a second time, which gives the at-most-one-run-in-flight
/// guarantee the precompute pipeline relies on.
pub struct JobScheduler {
    /// Registered jobs by id.
    jobs: HashMap<String, Arc<dyn BackgroundJob>>,

    /// Ids of currently running jobs, shared with the spawned tasks.
    running_jobs: Arc<RwLock<HashSet<String>>>,

    /// Task handles for currently running jobs.
    running_handles: HashMap<String, JoinHandle<()>>,

    /// Cancellation tokens for each running job.
    job_cancel_tokens: HashMap<String, CancellationToken>,

    /// Next scheduled run per interval job.
    next_runs: HashMap<String, DateTime<Utc>>,

    /// Receiver for hook events from the HTTP server.
    hook_receiver: mpsc::Receiver<HookEvent>,

    /// Token to signal scheduler shutdown.
    shutdown_token: CancellationToken,

    /// Shared context provided to jobs during execution.
    job_context: JobContext,
}

impl JobScheduler {
    pub fn new(
        hook_receiver: mpsc::Receiver<HookEvent>,
        shutdown_token: CancellationToken,
        job_context: JobContext,
    ) -> Self {
        Self {
            jobs: HashMap::new(),
            running_jobs: Arc::new(RwLock::new(HashSet::new())),
            running_handles: HashMap::new(),
            job_cancel_tokens: HashMap::new(),
            next_runs: HashMap::new(),
            hook_receiver,
            shutdown_token,
            job_context,
        }
    }

    /// Register a job with the scheduler.
    pub fn register_job(&mut self, job: Arc<dyn BackgroundJob>) {
        let job_id = job.id().to_string();
        info!("Registering job: {} - {}", job_id, job.description());
        self.jobs.insert(job_id, job);
    }

    /// Get the number of registered jobs.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Whether a job is currently running.
    pub fn is_job_running(&self, job_id: &str) -> bool {
        self.running_jobs.read().unwrap().contains(job_id)
    }

    /// Main scheduler loop.
    pub async fn run(&mut self) {
        info!("Starting job scheduler with {} registered jobs", self.jobs.len());

        // Fire OnStartup hooks
        self.trigger_jobs_for_hook(HookEvent::OnStartup);

        loop {
            self.cleanup_completed_jobs().await;

            let sleep_duration = self.time_until_next_scheduled_job();
            debug!(
                "Scheduler sleeping for {:?} until next scheduled job",
                sleep_duration
            );

            tokio::select! {
                _ = tokio::time::sleep(sleep_duration) => {
                    self.run_due_jobs();
                }
                Some(event) = self.hook_receiver.recv() => {
                    debug!("Received hook event: {}", event);
                    self.trigger_jobs_for_hook(event);
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Scheduler received shutdown signal");
                    self.shutdown().await;
                    break;
                }
            }
        }

        info!("Job scheduler stopped");
    }

    /// Calculate time until the next scheduled job should run.
    fn time_until_next_scheduled_job(&self) -> Duration {
        let mut min_duration = Duration::from_secs(60); // Default check interval
        let now = Utc::now();
        let running = self.running_jobs.read().unwrap();

        for (job_id, job) in &self.jobs {
            if running.contains(job_id) {
                continue;
            }
            if let Some(next_run) = self.next_run_time(job_id, job.schedule()) {
                if next_run > now {
                    let duration = (next_run - now).to_std().unwrap_or(Duration::from_secs(1));
                    if duration < min_duration {
                        min_duration = duration;
                    }
                } else {
                    return Duration::from_secs(0);
                }
            }
        }

        min_duration
    }

    /// Next scheduled run time for a job; hook-only jobs have none.
    fn next_run_time(&self, job_id: &str, schedule: JobSchedule) -> Option<DateTime<Utc>> {
        let has_interval = matches!(
            schedule,
            JobSchedule::Interval(_)
                | JobSchedule::Combined {
                    interval: Some(_),
                    ..
                }
        );
        if !has_interval {
            return None;
        }
        // No recorded state yet means the job has never run: due now.
        Some(self.next_runs.get(job_id).copied().unwrap_or_else(Utc::now))
    }

    /// Run all jobs that are due for scheduled execution.
    fn run_due_jobs(&mut self) {
        let now = Utc::now();
        let mut jobs_to_run = Vec::new();

        {
            let running = self.running_jobs.read().unwrap();
            for (job_id, job) in &self.jobs {
                if running.contains(job_id) {
                    continue;
                }
                if let Some(next_run) = self.next_run_time(job_id, job.schedule()) {
                    if next_run <= now {
                        jobs_to_run.push(job_id.clone());
                    }
                }
            }
        }

        for job_id in jobs_to_run {
            self.spawn_job(&job_id, "schedule");
        }
    }

    /// Trigger all jobs that listen for a specific hook event.
    fn trigger_jobs_for_hook(&mut self, event: HookEvent) {
        let mut jobs_to_trigger = Vec::new();

        {
            let running = self.running_jobs.read().unwrap();
            for (job_id, job) in &self.jobs {
                if running.contains(job_id) {
                    debug!("Skipping hook trigger for already running job: {}", job_id);
                    continue;
                }
                let should_trigger = match job.schedule() {
                    JobSchedule::Hook(hook_event) => hook_event == event,
                    JobSchedule::Combined { ref hooks, .. } => hooks.contains(&event),
                    _ => false,
                };
                if should_trigger {
                    jobs_to_trigger.push(job_id.clone());
                }
            }
        }

        for job_id in jobs_to_trigger {
            let trigger = format!("hook:{}", event);
            self.spawn_job(&job_id, &trigger);
        }
    }

    fn job_interval(schedule: &JobSchedule) -> Option<Duration> {
        match schedule {
            JobSchedule::Interval(interval) => Some(*interval),
            JobSchedule::Combined { interval, .. } => *interval,
            JobSchedule::Hook(_) => None,
        }
    }

    /// Spawn a job execution task.
    fn spawn_job(&mut self, job_id: &str, triggered_by: &str) {
        let job = match self.jobs.get(job_id) {
            Some(job) => Arc::clone(job),
            None => {
                error!("Attempted to spawn unknown job: {}", job_id);
                return;
            }
        };

        info!("Starting job: {} (triggered_by: {})", job_id, triggered_by);

        self.running_jobs
            .write()
            .unwrap()
            .insert(job_id.to_string());

        // Push the next run out by one interval up front so a slow job does
        // not get re-spawned in a tight loop.
        if let Some(interval) = Self::job_interval(&job.schedule()) {
            let next_run = Utc::now() + chrono::Duration::from_std(interval).unwrap_or_default();
            self.next_runs.insert(job_id.to_string(), next_run);
        }

        let cancel_token = self.job_context.cancellation_token.child_token();
        self.job_cancel_tokens
            .insert(job_id.to_string(), cancel_token.clone());

        let ctx = JobContext::new(
            cancel_token,
            Arc::clone(&self.job_context.engine),
            Arc::clone(&self.job_context.history_store),
        );

        let job_id_owned = job_id.to_string();
        let running_jobs = Arc::clone(&self.running_jobs);

        // Jobs are synchronous; run them on the blocking pool.
        let handle = tokio::spawn(async move {
            let start_time = Instant::now();
            let result = tokio::task::spawn_blocking(move || job.execute(&ctx)).await;
            let elapsed = start_time.elapsed();

            match result {
                Ok(Ok(())) => {
                    info!("Job {} completed successfully in {:?}", job_id_owned, elapsed);
                }
                Ok(Err(JobError::Cancelled)) => {
                    info!("Job {} was cancelled after {:?}", job_id_owned, elapsed);
                }
                Ok(Err(e)) => {
                    error!("Job {} failed after {:?}: {}", job_id_owned, elapsed, e);
                }
                Err(e) => {
                    error!("Job {} panicked after {:?}: {}", job_id_owned, elapsed, e);
                }
            }

            running_jobs.write().unwrap().remove(&job_id_owned);
        });

        self.running_handles.insert(job_id.to_string(), handle);
    }

    /// Clean up handles for completed jobs and refresh their schedules.
    async fn cleanup_completed_jobs(&mut self) {
        let completed: Vec<String> = self
            .running_handles
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(job_id, _)| job_id.clone())
            .collect();

        for job_id in completed {
            if let Some(handle) = self.running_handles.remove(&job_id) {
                let _ = handle.await;
            }
            self.job_cancel_tokens.remove(&job_id);

            if let Some(job) = self.jobs.get(&job_id) {
                if let Some(interval) = Self::job_interval(&job.schedule()) {
                    let next_run =
                        Utc::now() + chrono::Duration::from_std(interval).unwrap_or_default();
                    self.next_runs.insert(job_id.clone(), next_run);
                }
            }
        }
    }

    /// Gracefully shut down the scheduler.
    async fn shutdown(&mut self) {
        info!("Shutting down scheduler...");

        {
            let running = self.running_jobs.read().unwrap();
            for job_id in running.iter() {
                if let Some(job) = self.jobs.get(job_id) {
                    if job.shutdown_behavior() == ShutdownBehavior::Cancellable {
                        if let Some(token) = self.job_cancel_tokens.get(job_id) {
                            debug!("Cancelling job: {}", job_id);
                            token.cancel();
                        }
                    }
                }
            }
        }

        for (job_id, handle) in self.running_handles.drain() {
            let behavior = self
                .jobs
                .get(&job_id)
                .map(|j| j.shutdown_behavior())
                .unwrap_or_default();
            if behavior == ShutdownBehavior::WaitForCompletion {
                info!("Waiting for job {} to complete...", job_id);
            }
            if tokio::time::timeout(Duration::from_secs(30), handle)
                .await
                .is_err()
            {
                warn!("Job {} did not stop within the shutdown timeout", job_id);
            }
        }

        self.job_cancel_tokens.clear();
        info!("Scheduler shutdown complete");
    }
}
