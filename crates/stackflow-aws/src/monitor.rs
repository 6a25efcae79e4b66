//! Remote operation monitor
//!
//! Polls the status of a long-running remote operation until the status
//! classifies as success or failure. The first query happens immediately and
//! later ones are spaced by the operation's poll interval. A status nobody
//! recognises ends the wait with an error instead of polling forever.

use crate::client::RemoteError;
use async_trait::async_trait;
use stackflow_lifecycle::CancellationFlag;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

/// Kind of operation being awaited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Create => write!(f, "create"),
            OperationKind::Update => write!(f, "update"),
            OperationKind::Delete => write!(f, "delete"),
        }
    }
}

/// Result of classifying a raw status string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    InProgress,
    Success,
    Failure,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalState {
    Success { status: String, polls: u32 },
    Failure { status: String, polls: u32 },
}

impl TerminalState {
    pub fn status(&self) -> &str {
        match self {
            TerminalState::Success { status, .. } | TerminalState::Failure { status, .. } => status,
        }
    }

    pub fn polls(&self) -> u32 {
        match self {
            TerminalState::Success { polls, .. } | TerminalState::Failure { polls, .. } => *polls,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TerminalState::Success { .. })
    }
}

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Operation {operation_id} reported unknown status '{status}'")]
    UnknownStatus { operation_id: String, status: String },

    #[error("Timed out after {elapsed:?} waiting for {operation_id} (last status: {last_status})")]
    Timeout {
        operation_id: String,
        elapsed: Duration,
        last_status: String,
    },

    #[error("Monitoring {operation_id} was cancelled")]
    Cancelled { operation_id: String },

    #[error("Status query for {operation_id} failed: {source}")]
    Query {
        operation_id: String,
        #[source]
        source: RemoteError,
    },
}

/// A remote operation in flight
#[derive(Debug, Clone)]
pub struct RemoteOperation {
    pub operation_id: String,
    pub kind: OperationKind,
    pub poll_interval: Duration,
    pub deadline: Instant,
    /// Extra attempts for a status query that fails with a retryable error
    pub query_retries: u32,
}

impl RemoteOperation {
    pub fn new(
        operation_id: impl Into<String>,
        kind: OperationKind,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            operation_id: operation_id.into(),
            kind,
            poll_interval,
            deadline: Instant::now() + timeout,
            query_retries: 3,
        }
    }

    pub fn with_query_retries(mut self, retries: u32) -> Self {
        self.query_retries = retries;
        self
    }
}

/// Where statuses come from
#[async_trait]
pub trait StatusSource: Send {
    async fn poll(&mut self, operation_id: &str) -> Result<String, RemoteError>;
}

/// Polls `source` until `classify` reports a terminal status.
pub async fn await_operation<S, F>(
    operation: &RemoteOperation,
    classify: F,
    source: &mut S,
    cancel: &CancellationFlag,
) -> Result<TerminalState, MonitorError>
where
    S: StatusSource + ?Sized,
    F: Fn(&str) -> Classification,
{
    let started = Instant::now();
    let mut polls = 0u32;

    loop {
        if polls > 0 {
            sleep(operation.poll_interval).await;
        }
        if cancel.is_cancelled() {
            return Err(MonitorError::Cancelled {
                operation_id: operation.operation_id.clone(),
            });
        }

        let status = query(operation, source).await?;
        polls += 1;

        match classify(&status) {
            Classification::Success => return Ok(TerminalState::Success { status, polls }),
            Classification::Failure => return Ok(TerminalState::Failure { status, polls }),
            Classification::Unknown => {
                return Err(MonitorError::UnknownStatus {
                    operation_id: operation.operation_id.clone(),
                    status,
                });
            }
            Classification::InProgress => {
                debug!(operation = %operation.operation_id, %status, polls, "still in progress");
                if Instant::now() >= operation.deadline {
                    return Err(MonitorError::Timeout {
                        operation_id: operation.operation_id.clone(),
                        elapsed: started.elapsed(),
                        last_status: status,
                    });
                }
            }
        }
    }
}

async fn query<S>(operation: &RemoteOperation, source: &mut S) -> Result<String, MonitorError>
where
    S: StatusSource + ?Sized,
{
    let mut failures = 0;
    loop {
        match source.poll(&operation.operation_id).await {
            Ok(status) => return Ok(status),
            Err(err) if err.is_retryable() && failures < operation.query_retries => {
                failures += 1;
                warn!(
                    operation = %operation.operation_id,
                    error = %err,
                    "status query failed, retrying ({}/{})",
                    failures,
                    operation.query_retries
                );
                sleep(operation.poll_interval).await;
            }
            Err(err) => {
                return Err(MonitorError::Query {
                    operation_id: operation.operation_id.clone(),
                    source: err,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Scripted {
        responses: VecDeque<Result<String, RemoteError>>,
        calls: u32,
    }

    impl Scripted {
        fn statuses(statuses: &[&str]) -> Self {
            Self {
                responses: statuses.iter().map(|s| Ok(s.to_string())).collect(),
                calls: 0,
            }
        }
    }

    #[async_trait]
    impl StatusSource for Scripted {
        async fn poll(&mut self, _operation_id: &str) -> Result<String, RemoteError> {
            self.calls += 1;
            self.responses
                .pop_front()
                .unwrap_or_else(|| Ok("IN_PROGRESS".to_string()))
        }
    }

    fn classify(status: &str) -> Classification {
        match status {
            "IN_PROGRESS" => Classification::InProgress,
            "DELETE_COMPLETE" => Classification::Success,
            "DELETE_FAILED" => Classification::Failure,
            _ => Classification::Unknown,
        }
    }

    fn operation() -> RemoteOperation {
        RemoteOperation::new(
            "stack-1",
            OperationKind::Delete,
            Duration::from_secs(5),
            Duration::from_secs(60),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_success() {
        let mut source = Scripted::statuses(&["IN_PROGRESS", "IN_PROGRESS", "DELETE_COMPLETE"]);
        let started = Instant::now();

        let state = await_operation(&operation(), classify, &mut source, &CancellationFlag::new())
            .await
            .unwrap();

        assert_eq!(
            state,
            TerminalState::Success {
                status: "DELETE_COMPLETE".to_string(),
                polls: 3
            }
        );
        assert_eq!(source.calls, 3);
        // first poll is immediate, two intervals follow
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_terminal() {
        let mut source = Scripted::statuses(&["IN_PROGRESS", "DELETE_FAILED"]);
        let state = await_operation(&operation(), classify, &mut source, &CancellationFlag::new())
            .await
            .unwrap();
        assert!(!state.is_success());
        assert_eq!(state.status(), "DELETE_FAILED");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_status_is_fatal() {
        let mut source = Scripted::statuses(&["IN_PROGRESS", "IN_PROGRESS", "UNUSUAL_STATUS"]);
        let err = await_operation(&operation(), classify, &mut source, &CancellationFlag::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("UNUSUAL_STATUS"), "{err}");
        assert!(
            matches!(err, MonitorError::UnknownStatus { ref status, .. } if status == "UNUSUAL_STATUS")
        );
        assert_eq!(source.calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let mut source = Scripted::statuses(&[]);
        let err = await_operation(&operation(), classify, &mut source, &CancellationFlag::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::Timeout { .. }));
        // 60s deadline at 5s spacing
        assert_eq!(source.calls, 13);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_query_failure_is_retried() {
        let mut source = Scripted {
            responses: VecDeque::from(vec![
                Err(RemoteError::new("Throttling", "Rate exceeded")),
                Ok("DELETE_COMPLETE".to_string()),
            ]),
            calls: 0,
        };
        let state = await_operation(&operation(), classify, &mut source, &CancellationFlag::new())
            .await
            .unwrap();
        assert!(state.is_success());
        assert_eq!(state.polls(), 1);
        assert_eq!(source.calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_query_failure_stops() {
        let mut source = Scripted {
            responses: VecDeque::from(vec![Err(
                RemoteError::new("AccessDenied", "no").with_status(403)
            )]),
            calls: 0,
        };
        let err = await_operation(&operation(), classify, &mut source, &CancellationFlag::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::Query { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled() {
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let mut source = Scripted::statuses(&["IN_PROGRESS"]);
        let err = await_operation(&operation(), classify, &mut source, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::Cancelled { .. }));
        assert_eq!(source.calls, 0);
    }
}
