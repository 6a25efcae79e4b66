//! Lambda functions, their log groups and the shared execution role

use super::{artifact_key, deployment_bucket};
use crate::context::CommandContext;
use crate::error::Result;
use serde_json::{Map, Value, json};
use stackflow_core::{FunctionDefinition, ResourceSpec, intrinsic, naming};
use tracing::{debug, warn};

const VPC_ACCESS_POLICY: &str = "service-role/AWSLambdaVPCAccessExecutionRole";
const SUPPORTED_EVENTS: [&str; 2] = ["schedule", "cloudwatchLog"];

pub fn compile(ctx: &mut CommandContext) -> Result<()> {
    if ctx.service.functions.is_empty() {
        debug!("no functions to compile");
        return Ok(());
    }

    let stage = ctx.stage();
    let log_groups: Vec<String> = ctx
        .service
        .functions
        .keys()
        .map(|key| naming::log_group_name(&ctx.service.deployed_function_name(key, &stage)))
        .collect();
    let role = execution_role(&ctx.service.service, &stage, &log_groups);
    ctx.template
        .put_resource(naming::LAMBDA_EXECUTION_ROLE_ID, role)?;

    let bucket = deployment_bucket(ctx);
    let key = artifact_key(ctx);

    let functions: Vec<(String, FunctionDefinition)> = ctx
        .service
        .functions
        .iter()
        .map(|(k, f)| (k.clone(), f.clone()))
        .collect();

    for (function_key, function) in &functions {
        let deployed_name = ctx.service.deployed_function_name(function_key, &stage);
        let log_group_id = naming::log_group_logical_id(function_key);

        ctx.template.put_resource(
            log_group_id.clone(),
            ResourceSpec::new("AWS::Logs::LogGroup")
                .with_property("LogGroupName", json!(naming::log_group_name(&deployed_name))),
        )?;

        let lambda = lambda_function(ctx, function, &deployed_name, &bucket, &key)
            .depends_on(log_group_id)
            .depends_on(naming::LAMBDA_EXECUTION_ROLE_ID);
        ctx.template
            .put_resource(naming::lambda_logical_id(function_key), lambda)?;

        if function.vpc.is_some() {
            ctx.template.merge_resource(
                naming::LAMBDA_EXECUTION_ROLE_ID,
                ResourceSpec::new("AWS::IAM::Role").with_property(
                    "ManagedPolicyArns",
                    json!([intrinsic::join(
                        "",
                        vec![
                            json!("arn:"),
                            intrinsic::reference("AWS::Partition"),
                            json!(format!(":iam::aws:policy/{VPC_ACCESS_POLICY}")),
                        ],
                    )]),
                ),
            )?;
        }

        for event in &function.events {
            for name in event.other.keys() {
                if !SUPPORTED_EVENTS.contains(&name.as_str()) {
                    warn!(function = %function_key, event = %name, "unsupported event type ignored");
                }
            }
        }

        debug!(function = %function_key, name = %deployed_name, "compiled function");
    }

    Ok(())
}

fn lambda_function(
    ctx: &CommandContext,
    function: &FunctionDefinition,
    deployed_name: &str,
    bucket: &Value,
    key: &str,
) -> ResourceSpec {
    let provider = &ctx.service.provider;
    let mut spec = ResourceSpec::new("AWS::Lambda::Function")
        .with_property("Code", json!({ "S3Bucket": bucket, "S3Key": key }))
        .with_property("FunctionName", json!(deployed_name))
        .with_property("Handler", json!(function.handler))
        .with_property(
            "MemorySize",
            json!(function.memory_size.unwrap_or(provider.memory_size())),
        )
        .with_property(
            "Role",
            intrinsic::get_att(naming::LAMBDA_EXECUTION_ROLE_ID, "Arn"),
        )
        .with_property(
            "Runtime",
            json!(function.runtime.as_deref().unwrap_or(provider.runtime())),
        )
        .with_property(
            "Timeout",
            json!(function.timeout.unwrap_or(provider.timeout())),
        );

    if let Some(description) = &function.description {
        spec = spec.with_property("Description", json!(description));
    }
    if !function.environment.is_empty() {
        spec = spec.with_property("Environment", json!({ "Variables": function.environment }));
    }
    if let Some(vpc) = &function.vpc {
        spec = spec.with_property(
            "VpcConfig",
            json!({
                "SecurityGroupIds": vpc.security_group_ids,
                "SubnetIds": vpc.subnet_ids,
            }),
        );
    }
    spec
}

/// Role every function runs as. Log permissions cover all function log
/// groups through their longest common wildcard prefix.
fn execution_role(service: &str, stage: &str, log_groups: &[String]) -> ResourceSpec {
    let pattern = naming::longest_common_wildcard_prefix(log_groups);
    let log_group_arn = format!(
        "arn:${{AWS::Partition}}:logs:${{AWS::Region}}:${{AWS::AccountId}}:log-group:{pattern}"
    );

    let mut policy = Map::new();
    policy.insert(
        "PolicyName".to_string(),
        intrinsic::join("-", vec![json!(service), json!(stage), json!("lambda")]),
    );
    policy.insert(
        "PolicyDocument".to_string(),
        json!({
            "Version": "2012-10-17",
            "Statement": [
                {
                    "Effect": "Allow",
                    "Action": ["logs:CreateLogStream", "logs:CreateLogGroup"],
                    "Resource": [intrinsic::sub(&format!("{log_group_arn}:*"))]
                },
                {
                    "Effect": "Allow",
                    "Action": ["logs:PutLogEvents"],
                    "Resource": [intrinsic::sub(&format!("{log_group_arn}:*:*"))]
                }
            ]
        }),
    );

    ResourceSpec::new("AWS::IAM::Role")
        .with_property(
            "AssumeRolePolicyDocument",
            json!({
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": { "Service": ["lambda.amazonaws.com"] },
                    "Action": ["sts:AssumeRole"]
                }]
            }),
        )
        .with_property("Path", json!("/"))
        .with_property(
            "RoleName",
            intrinsic::join(
                "-",
                vec![
                    json!(service),
                    json!(stage),
                    intrinsic::reference("AWS::Region"),
                    json!("lambdaRole"),
                ],
            ),
        )
        .with_property("Policies", json!([Value::Object(policy)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackflow_core::{ServiceDefinition, VpcConfig};

    fn service() -> ServiceDefinition {
        serde_json::from_str(
            r#"{
                "service": "orders",
                "functions": {
                    "create-order": { "handler": "handler.create", "memorySize": 512 },
                    "list": { "handler": "handler.list", "environment": { "TABLE": "orders" } }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_function_resources() {
        let mut ctx = CommandContext::new(service(), ".");
        compile(&mut ctx).unwrap();

        let lambda = ctx
            .template
            .resource("CreateDashorderLambdaFunction")
            .unwrap();
        assert_eq!(lambda.kind, "AWS::Lambda::Function");
        assert_eq!(lambda.properties["FunctionName"], "orders-dev-create-order");
        assert_eq!(lambda.properties["MemorySize"], 512);
        assert_eq!(lambda.properties["Timeout"], 6);
        assert_eq!(
            lambda.properties["Code"]["S3Key"],
            "stackflow/orders/dev/orders.zip"
        );
        assert!(lambda.depends_on.contains("CreateDashorderLogGroup"));
        assert!(lambda.depends_on.contains(naming::LAMBDA_EXECUTION_ROLE_ID));

        let list = ctx.template.resource("ListLambdaFunction").unwrap();
        assert_eq!(list.properties["Environment"]["Variables"]["TABLE"], "orders");

        let group = ctx.template.resource("ListLogGroup").unwrap();
        assert_eq!(group.properties["LogGroupName"], "/aws/lambda/orders-dev-list");
    }

    #[test]
    fn test_role_covers_all_log_groups() {
        let mut ctx = CommandContext::new(service(), ".");
        compile(&mut ctx).unwrap();

        let role = ctx.template.resource(naming::LAMBDA_EXECUTION_ROLE_ID).unwrap();
        let statement = &role.properties["Policies"][0]["PolicyDocument"]["Statement"][0];
        assert_eq!(
            statement["Resource"][0]["Fn::Sub"],
            "arn:${AWS::Partition}:logs:${AWS::Region}:${AWS::AccountId}:log-group:/aws/lambda/orders-dev-*:*"
        );
    }

    #[test]
    fn test_vpc_function_adds_managed_policy() {
        let mut service = service();
        if let Some(function) = service.functions.get_mut("list") {
            function.vpc = Some(VpcConfig {
                security_group_ids: vec!["sg-1".to_string()],
                subnet_ids: vec!["subnet-1".to_string()],
            });
        }
        let mut ctx = CommandContext::new(service, ".");
        compile(&mut ctx).unwrap();

        let role = ctx.template.resource(naming::LAMBDA_EXECUTION_ROLE_ID).unwrap();
        assert_eq!(role.properties["ManagedPolicyArns"].as_array().unwrap().len(), 1);
        let lambda = ctx.template.resource("ListLambdaFunction").unwrap();
        assert_eq!(lambda.properties["VpcConfig"]["SubnetIds"][0], "subnet-1");
    }

    #[test]
    fn test_no_functions_no_role() {
        let mut ctx = CommandContext::new(ServiceDefinition::default(), ".");
        compile(&mut ctx).unwrap();
        assert!(ctx.template.resources().is_empty());
    }
}
