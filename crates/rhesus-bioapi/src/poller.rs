//! Drives a submitted job to a terminal state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::jobs::{JobKind, JobPoll, JobService, JobState};

#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Delay before the first check and between checks.
    pub interval: Duration,
    /// Upper bound on total polling time.
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(5 * 60),
        }
    }
}

impl PollConfig {
    pub fn timeout_message(&self) -> String {
        let secs = self.timeout.as_secs();
        if secs >= 60 && secs % 60 == 0 {
            let mins = secs / 60;
            format!("Polling timed out after {} minute{}.", mins, if mins == 1 { "" } else { "s" })
        } else {
            format!("Polling timed out after {} seconds.", self.timeout.as_secs_f64())
        }
    }
}

#[derive(Clone)]
pub struct JobPoller {
    service: Arc<dyn JobService>,
    config: PollConfig,
}

impl JobPoller {
    pub fn new(service: Arc<dyn JobService>, config: PollConfig) -> Self {
        Self { service, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    pub fn service(&self) -> &Arc<dyn JobService> {
        &self.service
    }

    /// Poll `job_id` until it finishes, fails, times out, or `cancel` flips to true.
    ///
    /// Re-attaching to a job that is already known to the remote side is
    /// allowed; the first check happens one interval after the call.
    pub async fn run(&self, kind: JobKind, job_id: String, mut cancel: watch::Receiver<bool>) -> JobState {
        let start = Instant::now();
        let deadline = sleep_until(start + self.config.timeout);
        tokio::pin!(deadline);
        let mut ticker = interval_at(start + self.config.interval, self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(%kind, job_id = %job_id, "Polling EBI job");

        loop {
            if *cancel.borrow() {
                return self.interrupted(kind, job_id);
            }

            tokio::select! {
                biased;
                changed = cancel.changed() => {
                    // A dropped sender means nobody is waiting for the result anymore.
                    if changed.is_err() || *cancel.borrow() {
                        return self.interrupted(kind, job_id);
                    }
                    continue;
                }
                _ = &mut deadline => return self.timed_out(kind, job_id),
                _ = ticker.tick() => {}
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.changed() => return self.interrupted(kind, job_id),
                _ = &mut deadline => return self.timed_out(kind, job_id),
                outcome = self.service.check(kind, &job_id) => outcome,
            };

            match outcome {
                Ok(JobPoll::Running) => debug!(%kind, job_id = %job_id, "Job still running"),
                Ok(JobPoll::Finished(output)) => {
                    info!(%kind, job_id = %job_id, elapsed_ms = start.elapsed().as_millis() as u64, "Job finished");
                    return JobState::Finished { job_id, output };
                }
                Ok(JobPoll::Failed(reason)) => {
                    warn!(%kind, job_id = %job_id, reason = %reason, "Job failed");
                    return JobState::Failed { job_id: Some(job_id), reason };
                }
                Err(e) => {
                    warn!(%kind, job_id = %job_id, error = %e, "Job status check failed");
                    return JobState::Failed { job_id: Some(job_id), reason: e.to_string() };
                }
            }
        }
    }

    fn interrupted(&self, kind: JobKind, job_id: String) -> JobState {
        info!(%kind, job_id = %job_id, "Polling interrupted");
        JobState::Interrupted { job_id: Some(job_id), reason: kind.interrupted_message().to_string() }
    }

    fn timed_out(&self, kind: JobKind, job_id: String) -> JobState {
        warn!(%kind, job_id = %job_id, "Polling timed out");
        JobState::Failed { job_id: Some(job_id), reason: self.config.timeout_message() }
    }
}
