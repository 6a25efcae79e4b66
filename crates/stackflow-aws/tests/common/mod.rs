use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use stackflow_aws::{CommandContext, ProviderClient, RemoteError};
use stackflow_core::ServiceDefinition;
use stackflow_lifecycle::{CommandSpec, Dispatcher, Plugin, PluginRegistry};
use std::sync::Mutex;
use tempfile::TempDir;

pub const BUCKET: &str = "orders-dev-deploymentbucket-1";

/// In-memory CloudFormation that completes every operation on the next poll
#[derive(Default)]
pub struct MockCloud {
    state: Mutex<CloudState>,
}

#[derive(Default)]
struct CloudState {
    exists: bool,
    status: String,
    events: Vec<Value>,
    calls: Vec<String>,
    fail_update: Option<(String, String)>,
    templates: Vec<Value>,
}

impl MockCloud {
    #[allow(dead_code)]
    pub fn with_stack() -> Self {
        let cloud = Self::default();
        {
            let mut state = cloud.state.lock().unwrap();
            state.exists = true;
            state.status = "CREATE_COMPLETE".to_string();
        }
        cloud
    }

    /// Makes the next update fail on `logical_id` with `reason`
    #[allow(dead_code)]
    pub fn fail_update(self, logical_id: &str, reason: &str) -> Self {
        self.state.lock().unwrap().fail_update = Some((logical_id.to_string(), reason.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    #[allow(dead_code)]
    pub fn templates(&self) -> Vec<Value> {
        self.state.lock().unwrap().templates.clone()
    }
}

fn event(state: &CloudState, logical_id: &str, resource_type: &str, status: &str, reason: Option<&str>) -> Value {
    json!({
        "EventId": format!("evt-{}", state.events.len() + 1),
        "StackName": "orders-dev",
        "LogicalResourceId": logical_id,
        "ResourceType": resource_type,
        "Timestamp": Utc::now().to_rfc3339(),
        "ResourceStatus": status,
        "ResourceStatusReason": reason,
    })
}

fn missing(stack: &str) -> RemoteError {
    RemoteError::new("ValidationError", format!("Stack with id {stack} does not exist"))
        .with_status(400)
}

#[async_trait]
impl ProviderClient for MockCloud {
    fn name(&self) -> &str {
        "aws"
    }

    fn region(&self) -> &str {
        "us-east-1"
    }

    async fn request(
        &self,
        _service: &str,
        method: &str,
        params: Value,
    ) -> Result<Value, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(method.to_string());
        let stack = params["StackName"].as_str().unwrap_or_default().to_string();
        const STACK: &str = "AWS::CloudFormation::Stack";

        match method {
            "describeStacks" => {
                if !state.exists {
                    return Err(missing(&stack));
                }
                Ok(json!({
                    "Stacks": [{
                        "StackName": stack,
                        "StackStatus": state.status,
                        "Outputs": [{
                            "OutputKey": "ServerlessDeploymentBucketName",
                            "OutputValue": BUCKET
                        }]
                    }]
                }))
            }
            "createStack" => {
                let template: Value =
                    serde_json::from_str(params["TemplateBody"].as_str().unwrap_or("{}")).unwrap();
                state.templates.push(template);
                state.exists = true;
                state.status = "CREATE_COMPLETE".to_string();
                let e = event(&state, &stack, STACK, "CREATE_COMPLETE", None);
                state.events.push(e);
                Ok(json!({ "StackId": format!("arn:aws:cloudformation:::stack/{stack}") }))
            }
            "updateStack" => {
                let template: Value =
                    serde_json::from_str(params["TemplateBody"].as_str().unwrap_or("{}")).unwrap();
                if state.templates.last() == Some(&template) {
                    return Err(RemoteError::new(
                        "ValidationError",
                        "No updates are to be performed.",
                    )
                    .with_status(400));
                }
                state.templates.push(template);
                if let Some((logical_id, reason)) = state.fail_update.clone() {
                    let e = event(&state, &logical_id, "AWS::Lambda::Function", "UPDATE_FAILED", Some(&reason));
                    state.events.push(e);
                    let e = event(&state, &stack, STACK, "UPDATE_ROLLBACK_COMPLETE", None);
                    state.events.push(e);
                    state.status = "UPDATE_ROLLBACK_COMPLETE".to_string();
                } else {
                    let e = event(&state, &stack, STACK, "UPDATE_COMPLETE", None);
                    state.events.push(e);
                    state.status = "UPDATE_COMPLETE".to_string();
                }
                Ok(json!({}))
            }
            "deleteStack" => {
                if !state.exists {
                    return Err(missing(&stack));
                }
                state.exists = false;
                Ok(json!({}))
            }
            "describeStackEvents" => {
                if !state.exists {
                    return Err(missing(&stack));
                }
                let newest_first: Vec<Value> = state.events.iter().rev().cloned().collect();
                Ok(json!({ "StackEvents": newest_first }))
            }
            other => Err(RemoteError::new("UnsupportedOperation", other)),
        }
    }
}

/// Command table the CLI declares, reduced to what the AWS plugins hook into
pub fn commands() -> Plugin<CommandContext> {
    Plugin::<CommandContext>::new("Commands")
        .command(CommandSpec::new("package").events([
            "cleanup",
            "initialize",
            "setupProviderConfiguration",
            "compileFunctions",
            "compileEvents",
            "finalize",
        ]))
        .command(CommandSpec::new("deploy").events(["deploy"]).extends("package"))
        .command(CommandSpec::new("remove").events(["remove"]))
        .command(CommandSpec::new("info").events(["info"]))
}

pub fn dispatcher() -> Dispatcher<CommandContext> {
    let mut registry = PluginRegistry::for_provider("aws");
    registry.register(commands()).unwrap();
    for plugin in stackflow_aws::plugins() {
        registry.register(plugin).unwrap();
    }
    Dispatcher::new(registry)
}

pub fn service() -> ServiceDefinition {
    serde_json::from_value(json!({
        "service": "orders",
        "provider": { "name": "aws" },
        "functions": {
            "create": {
                "handler": "handler.create",
                "events": [{ "schedule": "rate(5 minutes)" }]
            },
            "audit": {
                "handler": "handler.audit",
                "events": [
                    { "cloudwatchLog": "/aws/lambda/orders-dev-create" },
                    { "cloudwatchLog": { "logGroup": "/aws/lambda/orders-dev-list", "filter": "ERROR" } }
                ]
            }
        },
        "resources": {
            "Resources": {
                "OrdersTable": {
                    "Type": "AWS::DynamoDB::Table",
                    "Properties": { "BillingMode": "PAY_PER_REQUEST" }
                }
            }
        }
    }))
    .unwrap()
}

pub fn project() -> TempDir {
    tempfile::tempdir().unwrap()
}
