//! Resource compilers
//!
//! Each compiler reads the service definition and writes entries into the
//! command context's [`CompilationContext`](stackflow_core::CompilationContext).
//! Ids always come from [`stackflow_core::naming`], so compilers that run on
//! different events can reference each other's resources without sharing
//! state.

pub mod cloudwatch_log;
pub mod core_stack;
pub mod custom_resources;
pub mod functions;
pub mod schedule;

use crate::context::CommandContext;
use serde_json::Value;
use stackflow_core::{intrinsic, naming};

/// `Fn::GetAtt` of a function's ARN
pub(crate) fn function_arn(function_key: &str) -> Value {
    intrinsic::get_att(&naming::lambda_logical_id(function_key), "Arn")
}

/// Bucket the function code is read from: the configured one, else the
/// generated deployment bucket
pub(crate) fn deployment_bucket(ctx: &CommandContext) -> Value {
    match &ctx.service.provider.deployment_bucket {
        Some(bucket) => Value::String(bucket.clone()),
        None => intrinsic::reference(naming::DEPLOYMENT_BUCKET_ID),
    }
}

/// Object key of the packaged service code
pub(crate) fn artifact_key(ctx: &CommandContext) -> String {
    format!(
        "stackflow/{service}/{stage}/{service}.zip",
        service = ctx.service.service,
        stage = ctx.stage()
    )
}
