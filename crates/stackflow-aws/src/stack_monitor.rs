//! CloudFormation stack monitoring
//!
//! Feeds stack events into the generic monitor. Each poll reads
//! `describeStackEvents`, logs events not seen before and reports either the
//! stack's own status or, as soon as any resource fails, that failed status.

use crate::client::{ProviderClient, RemoteError};
use crate::context::MonitorSettings;
use crate::error::{AwsError, Result};
use crate::monitor::{
    Classification, OperationKind, RemoteOperation, StatusSource, TerminalState, await_operation,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use stackflow_lifecycle::CancellationFlag;
use std::collections::HashSet;
use tracing::{debug, info};

pub const CLOUDFORMATION: &str = "CloudFormation";
const STACK_RESOURCE_TYPE: &str = "AWS::CloudFormation::Stack";

/// Maps a stack status to the monitor's classification for `kind`
pub fn classify_stack_status(kind: OperationKind, status: &str) -> Classification {
    if status.ends_with("_FAILED") {
        return Classification::Failure;
    }
    match kind {
        OperationKind::Create => match status {
            "CREATE_COMPLETE" => Classification::Success,
            "CREATE_IN_PROGRESS" | "REVIEW_IN_PROGRESS" => Classification::InProgress,
            // the stack is being rolled back or torn down instead of created
            "ROLLBACK_IN_PROGRESS" | "ROLLBACK_COMPLETE" | "DELETE_IN_PROGRESS"
            | "DELETE_COMPLETE" => Classification::Failure,
            _ => Classification::Unknown,
        },
        OperationKind::Update => match status {
            "UPDATE_COMPLETE" => Classification::Success,
            "UPDATE_IN_PROGRESS" | "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS" => {
                Classification::InProgress
            }
            "UPDATE_ROLLBACK_IN_PROGRESS"
            | "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS"
            | "UPDATE_ROLLBACK_COMPLETE" => Classification::Failure,
            _ => Classification::Unknown,
        },
        OperationKind::Delete => match status {
            "DELETE_COMPLETE" => Classification::Success,
            "DELETE_IN_PROGRESS" => Classification::InProgress,
            _ => Classification::Unknown,
        },
    }
}

fn in_progress_status(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Create => "CREATE_IN_PROGRESS",
        OperationKind::Update => "UPDATE_IN_PROGRESS",
        OperationKind::Delete => "DELETE_IN_PROGRESS",
    }
}

/// One entry of `describeStackEvents`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct StackEvent {
    pub event_id: Option<String>,
    pub logical_resource_id: Option<String>,
    pub physical_resource_id: Option<String>,
    pub resource_type: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub resource_status: Option<String>,
    pub resource_status_reason: Option<String>,
}

impl StackEvent {
    fn is_stack_level(&self, stack_name: &str) -> bool {
        self.resource_type.as_deref() == Some(STACK_RESOURCE_TYPE)
            && self.logical_resource_id.as_deref() == Some(stack_name)
    }
}

/// Status source backed by stack events
pub struct StackEventSource<'a> {
    client: &'a dyn ProviderClient,
    stack_name: String,
    kind: OperationKind,
    since: Option<DateTime<Utc>>,
    seen: HashSet<String>,
    status: String,
    failed_status: Option<String>,
    failure: Option<String>,
}

impl<'a> StackEventSource<'a> {
    pub fn new(
        client: &'a dyn ProviderClient,
        stack_name: impl Into<String>,
        kind: OperationKind,
        since: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            client,
            stack_name: stack_name.into(),
            kind,
            since,
            seen: HashSet::new(),
            status: in_progress_status(kind).to_string(),
            failed_status: None,
            failure: None,
        }
    }

    /// `An error occurred: <LogicalId> - <reason>.`
    pub fn failure_message(&self, status: &str) -> String {
        let detail = self
            .failure
            .clone()
            .unwrap_or_else(|| format!("{} - {}", self.stack_name, status));
        format!("An error occurred: {detail}.")
    }

    fn observe(&mut self, event: StackEvent) {
        if let Some(id) = &event.event_id {
            if !self.seen.insert(id.clone()) {
                return;
            }
        }
        if let (Some(since), Some(timestamp)) = (self.since, event.timestamp) {
            if timestamp < since {
                return;
            }
        }

        let status = event.resource_status.clone().unwrap_or_default();
        let logical_id = event.logical_resource_id.clone().unwrap_or_default();
        info!(
            "  {} - {} - {}",
            status,
            event.resource_type.as_deref().unwrap_or("-"),
            logical_id
        );

        let stack_level = event.is_stack_level(&self.stack_name);
        let failed = status.ends_with("_FAILED")
            || (stack_level
                && classify_stack_status(self.kind, &status) == Classification::Failure);

        if failed && self.failure.is_none() {
            if let Some(reason) = &event.resource_status_reason {
                self.failure = Some(format!("{logical_id} - {reason}"));
            }
        }
        if status.ends_with("_FAILED") && self.failed_status.is_none() {
            self.failed_status = Some(status.clone());
        }
        if stack_level {
            self.status = status;
        }
    }
}

#[async_trait]
impl StatusSource for StackEventSource<'_> {
    async fn poll(&mut self, _operation_id: &str) -> std::result::Result<String, RemoteError> {
        let response = match self
            .client
            .request(
                CLOUDFORMATION,
                "describeStackEvents",
                json!({ "StackName": self.stack_name }),
            )
            .await
        {
            Ok(response) => response,
            Err(err) if self.kind == OperationKind::Delete && err.is_missing_stack() => {
                debug!(stack = %self.stack_name, "stack is gone");
                return Ok("DELETE_COMPLETE".to_string());
            }
            Err(err) => return Err(err),
        };

        let events: Vec<StackEvent> =
            serde_json::from_value(response["StackEvents"].clone()).map_err(|e| {
                RemoteError::new("InvalidResponse", format!("describeStackEvents: {e}"))
            })?;

        // newest first on the wire
        for event in events.into_iter().rev() {
            self.observe(event);
        }

        Ok(self
            .failed_status
            .clone()
            .unwrap_or_else(|| self.status.clone()))
    }
}

/// Waits for the stack operation to finish.
///
/// Returns the final stack status, or
/// [`AwsError::StackOperationFailed`] naming the first failed resource.
pub async fn monitor_stack(
    client: &dyn ProviderClient,
    stack_name: &str,
    kind: OperationKind,
    since: Option<DateTime<Utc>>,
    settings: &MonitorSettings,
    cancel: &CancellationFlag,
) -> Result<String> {
    let operation = RemoteOperation::new(stack_name, kind, settings.poll_interval, settings.timeout)
        .with_query_retries(settings.query_retries);
    let mut source = StackEventSource::new(client, stack_name, kind, since);

    info!("Checking stack {} progress...", kind);
    let state = await_operation(
        &operation,
        |status| classify_stack_status(kind, status),
        &mut source,
        cancel,
    )
    .await?;

    match state {
        TerminalState::Success { status, polls } => {
            debug!(stack = stack_name, %status, polls, "stack operation finished");
            Ok(status)
        }
        TerminalState::Failure { status, .. } => Err(AwsError::StackOperationFailed(
            source.failure_message(&status),
        )),
    }
}
