// dbvault/src/report/mod.rs
//! Reporting sinks: the per-request interactive reporter and the durable
//! operational log. Sinks never fail the caller.

use tokio::sync::mpsc;

/// Request-scoped, human-readable messages back to whoever triggered a job.
pub trait Reporter: Send + Sync {
    fn send_message(&self, message: &str);
}

/// Append-only operational record.
pub trait OpsLog: Send + Sync {
    fn info(&self, message: &str);
    fn severe(&self, message: &str);
}

/// Forwards messages over a channel; the receiving side decides how to display them.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelReporter { tx }, rx)
    }
}

impl Reporter for ChannelReporter {
    fn send_message(&self, message: &str) {
        // Receiver gone means the caller stopped listening; the job carries on.
        let _ = self.tx.send(message.to_string());
    }
}

/// Durable log backed by `tracing`; the subscriber set up in `utils::logging`
/// decides where the records land.
#[derive(Debug, Clone, Default)]
pub struct TracingLog;

impl OpsLog for TracingLog {
    fn info(&self, message: &str) {
        tracing::info!(target: "dbvault::job", "{message}");
    }

    fn severe(&self, message: &str) {
        tracing::error!(target: "dbvault::job", "{message}");
    }
}

/// Prefixes every line with the job id so interleaved log output stays traceable.
pub struct JobLog<'a> {
    inner: &'a dyn OpsLog,
    job_id: String,
}

impl<'a> JobLog<'a> {
    pub fn new(inner: &'a dyn OpsLog, job_id: impl Into<String>) -> Self {
        JobLog {
            inner,
            job_id: job_id.into(),
        }
    }
}

impl OpsLog for JobLog<'_> {
    fn info(&self, message: &str) {
        self.inner.info(&format!("[job {}] {}", self.job_id, message));
    }

    fn severe(&self, message: &str) {
        self.inner.severe(&format!("[job {}] {}", self.job_id, message));
    }
}
