//! Stack description and `info`

use crate::client::{ProviderClient, RetryConfig, request_with_retry};
use crate::context::{CommandContext, StackInfo};
use crate::error::{AwsError, Result};
use crate::stack_monitor::CLOUDFORMATION;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeStacksResponse {
    stacks: Vec<StackDescription>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct StackDescription {
    stack_name: Option<String>,
    stack_status: Option<String>,
    outputs: Vec<StackOutput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct StackOutput {
    output_key: Option<String>,
    output_value: Option<String>,
}

/// Current state of the stack, `None` when it does not exist
pub async fn describe_stack(
    client: &dyn ProviderClient,
    retry: &RetryConfig,
    stack_name: &str,
) -> Result<Option<StackInfo>> {
    let response = match request_with_retry(
        client,
        retry,
        CLOUDFORMATION,
        "describeStacks",
        json!({ "StackName": stack_name }),
    )
    .await
    {
        Ok(response) => response,
        Err(err) if err.is_missing_stack() => {
            debug!(stack = stack_name, "stack does not exist");
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };

    let response: DescribeStacksResponse =
        serde_json::from_value(response).map_err(|e| AwsError::UnexpectedResponse {
            operation: "describeStacks".to_string(),
            message: e.to_string(),
        })?;
    let Some(stack) = response.stacks.into_iter().next() else {
        return Ok(None);
    };

    let outputs: BTreeMap<String, String> = stack
        .outputs
        .into_iter()
        .filter_map(|output| Some((output.output_key?, output.output_value?)))
        .collect();

    Ok(Some(StackInfo {
        stack_name: stack.stack_name.unwrap_or_else(|| stack_name.to_string()),
        status: stack.stack_status.unwrap_or_default(),
        outputs,
    }))
}

/// Fills [`CommandContext::stack_info`]
pub async fn info(ctx: &mut CommandContext) -> Result<()> {
    let client = ctx.client()?;
    let stack_name = ctx.stack_name();
    let info = describe_stack(client.as_ref(), &ctx.settings.retry, &stack_name)
        .await?
        .ok_or(AwsError::StackNotFound(stack_name))?;
    ctx.stack_info = Some(info);
    Ok(())
}
