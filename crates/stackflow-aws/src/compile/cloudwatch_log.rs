//! `cloudwatchLog` events: log subscription filters targeting a function

use super::function_arn;
use crate::context::CommandContext;
use crate::error::{AwsError, Result};
use serde_json::json;
use stackflow_core::{ResourceSpec, intrinsic, naming};
use std::collections::BTreeSet;
use tracing::debug;

/// One subscription filter per declaration and a single permission per
/// function whose source covers every subscribed log group.
///
/// A log group can only be subscribed once in the whole service.
pub fn compile(ctx: &mut CommandContext) -> Result<()> {
    let mut used_groups = BTreeSet::new();
    let mut entries = Vec::new();

    for (function_key, function) in &ctx.service.functions {
        let permission_id = naming::lambda_cloudwatch_log_permission_logical_id(function_key);
        let mut groups = Vec::new();

        for event in &function.events {
            let Some(subscription) = &event.cloudwatch_log else {
                continue;
            };
            let log_group = subscription.log_group();
            if log_group.is_empty() {
                return Err(AwsError::invalid_event(
                    function_key,
                    "cloudwatchLog",
                    "'logGroup' is required",
                ));
            }
            if !used_groups.insert(log_group.to_string()) {
                return Err(AwsError::invalid_event(
                    function_key,
                    "cloudwatchLog",
                    format!("log group '{log_group}' is already subscribed"),
                ));
            }
            groups.push(log_group.to_string());

            let filter = subscription.filter().unwrap_or_default().replace("\\\"", "\"");
            let id = naming::cloudwatch_log_logical_id(function_key, groups.len() as u32);
            let spec = ResourceSpec::new("AWS::Logs::SubscriptionFilter")
                .with_property("LogGroupName", json!(log_group))
                .with_property("FilterPattern", json!(filter))
                .with_property("DestinationArn", function_arn(function_key))
                .depends_on(permission_id.clone());
            entries.push((id, spec));
        }

        if groups.is_empty() {
            continue;
        }

        let source_arn = intrinsic::join(
            "",
            vec![
                json!("arn:"),
                intrinsic::reference("AWS::Partition"),
                json!(":logs:"),
                intrinsic::reference("AWS::Region"),
                json!(":"),
                intrinsic::reference("AWS::AccountId"),
                json!(":log-group:"),
                json!(naming::longest_common_wildcard_prefix(&groups)),
                json!(":*"),
            ],
        );
        let permission = ResourceSpec::new("AWS::Lambda::Permission")
            .with_property("FunctionName", function_arn(function_key))
            .with_property("Action", json!("lambda:InvokeFunction"))
            .with_property(
                "Principal",
                intrinsic::join(
                    "",
                    vec![
                        json!("logs."),
                        intrinsic::reference("AWS::Region"),
                        json!(".amazonaws.com"),
                    ],
                ),
            )
            .with_property("SourceArn", source_arn);
        entries.push((permission_id, permission));
    }

    for (id, spec) in entries {
        debug!(id = %id, kind = %spec.kind, "compiled log subscription");
        ctx.template.put_resource(id, spec)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use stackflow_core::ServiceDefinition;

    fn context(functions: Value) -> CommandContext {
        let service: ServiceDefinition =
            serde_json::from_value(json!({ "service": "audit", "functions": functions }))
                .unwrap();
        CommandContext::new(service, ".")
    }

    #[test]
    fn test_filters_and_single_permission() {
        let mut ctx = context(json!({
            "ship": {
                "handler": "ship.handle",
                "events": [
                    { "cloudwatchLog": "/aws/lambda/billing-dev-charge" },
                    { "cloudwatchLog": { "logGroup": "/aws/lambda/billing-dev-refund", "filter": "{$.level = \\\"error\\\"}" } }
                ]
            }
        }));
        compile(&mut ctx).unwrap();

        let first = ctx
            .template
            .resource("ShipLogsSubscriptionFilterCloudWatchLog1")
            .unwrap();
        assert_eq!(first.properties["FilterPattern"], "");
        assert!(
            first
                .depends_on
                .contains("ShipLambdaPermissionLogsSubscriptionFilterCloudWatchLog")
        );

        let second = ctx
            .template
            .resource("ShipLogsSubscriptionFilterCloudWatchLog2")
            .unwrap();
        assert_eq!(second.properties["FilterPattern"], r#"{$.level = "error"}"#);

        let permission = ctx
            .template
            .resource("ShipLambdaPermissionLogsSubscriptionFilterCloudWatchLog")
            .unwrap();
        let parts = &permission.properties["SourceArn"]["Fn::Join"][1];
        assert_eq!(parts[7], "/aws/lambda/billing-dev-*");
    }

    #[test]
    fn test_single_group_is_not_wildcarded() {
        let mut ctx = context(json!({
            "ship": { "handler": "ship.handle", "events": [{ "cloudwatchLog": "/custom/app" }] }
        }));
        compile(&mut ctx).unwrap();

        let permission = ctx
            .template
            .resource("ShipLambdaPermissionLogsSubscriptionFilterCloudWatchLog")
            .unwrap();
        assert_eq!(permission.properties["SourceArn"]["Fn::Join"][1][7], "/custom/app");
    }

    #[test]
    fn test_duplicate_log_group_is_rejected() {
        let mut ctx = context(json!({
            "a": { "handler": "a.h", "events": [{ "cloudwatchLog": "/custom/app" }] },
            "b": { "handler": "b.h", "events": [{ "cloudwatchLog": "/custom/app" }] }
        }));
        let err = compile(&mut ctx).unwrap_err();
        assert!(matches!(err, AwsError::InvalidEvent { ref function, .. } if function == "b"));
    }
}
