//! `deploy` and `remove`
//!
//! Deploy creates the stack from the core template when it does not exist
//! yet, reads the deployment bucket name from its outputs and then updates
//! the stack to the full compiled template. Every operation is monitored to
//! completion before the next one starts.

use crate::client::{ProviderClient, request_with_retry};
use crate::context::CommandContext;
use crate::error::{AwsError, Result};
use crate::info::describe_stack;
use crate::monitor::OperationKind;
use crate::package::load_packaged;
use crate::stack_monitor::{CLOUDFORMATION, monitor_stack};
use chrono::{DateTime, Utc};
use serde_json::json;
use stackflow_core::{CompiledTemplate, Entity, LateBound, ServiceState, naming};
use tracing::{info, instrument, warn};

const CAPABILITIES: [&str; 2] = ["CAPABILITY_IAM", "CAPABILITY_NAMED_IAM"];

/// Events older than this margin before an operation starts are not
/// attributed to it
fn monitoring_start() -> DateTime<Utc> {
    Utc::now() - chrono::Duration::seconds(5)
}

#[instrument(skip_all, fields(stack = %ctx.stack_name()))]
pub async fn deploy(ctx: &mut CommandContext) -> Result<()> {
    load_packaged(ctx).await?;
    let client = ctx.client()?;
    let stack_name = ctx.stack_name();
    let retry = ctx.settings.retry.clone();
    let uses_own_bucket = ctx.service.provider.deployment_bucket.is_some();

    let (core, mut compiled) = match (ctx.core_template.clone(), ctx.compiled.clone()) {
        (Some(core), Some(compiled)) => (core, compiled),
        _ => return Err(AwsError::NotPackaged(stack_name)),
    };

    let existing = describe_stack(client.as_ref(), &retry, &stack_name).await?;
    let mut created_with_full_template = false;
    if existing.is_none() {
        // a configured bucket leaves the core template empty, so the stack is
        // created from the full template right away
        let body = if uses_own_bucket { &compiled } else { &core };
        create_stack(ctx, client.as_ref(), &stack_name, body).await?;
        created_with_full_template = uses_own_bucket;
    }

    let bucket = match &ctx.service.provider.deployment_bucket {
        Some(bucket) => bucket.clone(),
        None => describe_stack(client.as_ref(), &retry, &stack_name)
            .await?
            .and_then(|stack| stack.outputs.get(naming::DEPLOYMENT_BUCKET_OUTPUT_ID).cloned())
            .ok_or_else(|| AwsError::UnexpectedResponse {
                operation: "describeStacks".to_string(),
                message: format!(
                    "stack {stack_name} has no {} output",
                    naming::DEPLOYMENT_BUCKET_OUTPUT_ID
                ),
            })?,
    };
    compiled.bind(LateBound::DeploymentBucketName, bucket);

    if !created_with_full_template {
        update_stack(ctx, client.as_ref(), &stack_name, &compiled).await?;
    }

    let mut state = ctx.state.clone().unwrap_or_else(|| {
        ServiceState::new(
            ctx.service.service.clone(),
            ctx.stage(),
            ctx.region(),
            stack_name.clone(),
        )
    });
    state.record_bindings(&compiled);
    state.deployed_at = Some(Utc::now());
    ctx.store.save(&Entity::ServiceState(state.clone())).await?;

    ctx.compiled = Some(compiled);
    ctx.state = Some(state);
    info!("Service deployed to stack {}", stack_name);
    Ok(())
}

async fn create_stack(
    ctx: &CommandContext,
    client: &dyn ProviderClient,
    stack_name: &str,
    template: &CompiledTemplate,
) -> Result<()> {
    info!("Creating stack {}...", stack_name);
    let since = monitoring_start();
    request_with_retry(
        client,
        &ctx.settings.retry,
        CLOUDFORMATION,
        "createStack",
        json!({
            "StackName": stack_name,
            "TemplateBody": template.to_json()?,
            "Capabilities": CAPABILITIES,
        }),
    )
    .await?;

    monitor_stack(
        client,
        stack_name,
        OperationKind::Create,
        Some(since),
        &ctx.settings.monitor,
        &ctx.cancel,
    )
    .await?;
    Ok(())
}

async fn update_stack(
    ctx: &CommandContext,
    client: &dyn ProviderClient,
    stack_name: &str,
    template: &CompiledTemplate,
) -> Result<()> {
    info!("Updating stack {}...", stack_name);
    let since = monitoring_start();
    let result = request_with_retry(
        client,
        &ctx.settings.retry,
        CLOUDFORMATION,
        "updateStack",
        json!({
            "StackName": stack_name,
            "TemplateBody": template.to_json()?,
            "Capabilities": CAPABILITIES,
        }),
    )
    .await;

    match result {
        Ok(_) => {}
        Err(err) if err.is_no_op_update() => {
            info!("Stack {} is already up to date", stack_name);
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    }

    monitor_stack(
        client,
        stack_name,
        OperationKind::Update,
        Some(since),
        &ctx.settings.monitor,
        &ctx.cancel,
    )
    .await?;
    Ok(())
}

/// Deletes the stack. A stack that is already gone is not an error.
#[instrument(skip_all, fields(stack = %ctx.stack_name()))]
pub async fn remove(ctx: &mut CommandContext) -> Result<()> {
    let client = ctx.client()?;
    let stack_name = ctx.stack_name();
    let since = monitoring_start();

    info!("Removing stack {}...", stack_name);
    match request_with_retry(
        client.as_ref(),
        &ctx.settings.retry,
        CLOUDFORMATION,
        "deleteStack",
        json!({ "StackName": stack_name }),
    )
    .await
    {
        Ok(_) => {}
        Err(err) if err.is_missing_stack() => {
            warn!("Stack {} does not exist, nothing to remove", stack_name);
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    }

    monitor_stack(
        client.as_ref(),
        &stack_name,
        OperationKind::Delete,
        Some(since),
        &ctx.settings.monitor,
        &ctx.cancel,
    )
    .await?;
    info!("Stack {} removed", stack_name);
    Ok(())
}
