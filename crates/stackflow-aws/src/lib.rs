//! AWS provider for stackflow
//!
//! Built-in plugins that compile a service into a CloudFormation template and
//! deploy it, plus the pieces they stand on:
//!
//! - [`client`]: the `(service, method, params)` request boundary and retries
//! - [`monitor`]: provider-independent polling of long-running operations
//! - [`stack_monitor`]: stack events fed into the monitor
//! - [`sdk`]: the request boundary implemented with the AWS SDK
//!
//! [`plugins`] returns the plugins in the order they must be registered;
//! hooks on the same event run in registration order.

pub mod client;
pub mod compile;
pub mod context;
pub mod deploy;
pub mod error;
pub mod info;
pub mod monitor;
pub mod package;
pub mod sdk;
pub mod stack_monitor;

pub use client::{ErrorClass, ProviderClient, RemoteError, RetryConfig, request_with_retry};
pub use context::{CommandContext, DeploySettings, MonitorSettings, StackInfo};
pub use error::{AwsError, Result};
pub use monitor::{
    Classification, MonitorError, OperationKind, RemoteOperation, StatusSource, TerminalState,
    await_operation,
};
pub use sdk::CloudFormationClient;

use stackflow_lifecycle::Plugin;

pub const PROVIDER: &str = "aws";

async fn compile_core(ctx: &mut CommandContext) -> anyhow::Result<()> {
    Ok(compile::core_stack::compile(ctx)?)
}

async fn compile_functions(ctx: &mut CommandContext) -> anyhow::Result<()> {
    Ok(compile::functions::compile(ctx)?)
}

async fn compile_schedules(ctx: &mut CommandContext) -> anyhow::Result<()> {
    Ok(compile::schedule::compile(ctx)?)
}

async fn compile_cloudwatch_logs(ctx: &mut CommandContext) -> anyhow::Result<()> {
    Ok(compile::cloudwatch_log::compile(ctx)?)
}

async fn merge_custom_resources(ctx: &mut CommandContext) -> anyhow::Result<()> {
    Ok(compile::custom_resources::compile(ctx)?)
}

async fn write_artifacts(ctx: &mut CommandContext) -> anyhow::Result<()> {
    Ok(package::write_artifacts(ctx).await?)
}

async fn deploy_stack(ctx: &mut CommandContext) -> anyhow::Result<()> {
    Ok(deploy::deploy(ctx).await?)
}

async fn remove_stack(ctx: &mut CommandContext) -> anyhow::Result<()> {
    Ok(deploy::remove(ctx).await?)
}

async fn describe_stack(ctx: &mut CommandContext) -> anyhow::Result<()> {
    Ok(info::info(ctx).await?)
}

/// Built-in AWS plugins in registration order
pub fn plugins() -> Vec<Plugin<CommandContext>> {
    vec![
        Plugin::<CommandContext>::new("AwsCompileCore")
            .provider(PROVIDER)
            .hook("package:initialize", |ctx| Box::pin(compile_core(ctx))),
        Plugin::<CommandContext>::new("AwsCompileFunctions")
            .provider(PROVIDER)
            .hook("package:compileFunctions", |ctx| {
                Box::pin(compile_functions(ctx))
            }),
        Plugin::<CommandContext>::new("AwsCompileScheduledEvents")
            .provider(PROVIDER)
            .hook("package:compileEvents", |ctx| Box::pin(compile_schedules(ctx))),
        Plugin::<CommandContext>::new("AwsCompileCloudWatchLogEvents")
            .provider(PROVIDER)
            .hook("package:compileEvents", |ctx| {
                Box::pin(compile_cloudwatch_logs(ctx))
            }),
        Plugin::<CommandContext>::new("AwsMergeCustomResources")
            .provider(PROVIDER)
            .hook("package:finalize", |ctx| Box::pin(merge_custom_resources(ctx))),
        Plugin::<CommandContext>::new("AwsPackageWriter")
            .provider(PROVIDER)
            .hook("package:finalize", |ctx| Box::pin(write_artifacts(ctx))),
        Plugin::<CommandContext>::new("AwsDeploy")
            .provider(PROVIDER)
            .hook("deploy:deploy", |ctx| Box::pin(deploy_stack(ctx))),
        Plugin::<CommandContext>::new("AwsRemove")
            .provider(PROVIDER)
            .hook("remove:remove", |ctx| Box::pin(remove_stack(ctx))),
        Plugin::<CommandContext>::new("AwsInfo")
            .provider(PROVIDER)
            .hook("info:info", |ctx| Box::pin(describe_stack(ctx))),
    ]
}
