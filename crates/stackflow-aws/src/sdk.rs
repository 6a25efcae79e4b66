//! [`ProviderClient`] backed by the AWS SDK
//!
//! Translates the JSON request boundary into CloudFormation SDK calls and back.

use crate::client::{ProviderClient, RemoteError};
use async_trait::async_trait;
use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::config::Region;
use aws_sdk_cloudformation::config::http::HttpResponse;
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudformation::primitives::DateTime as SdkDateTime;
use aws_sdk_cloudformation::types::{Capability, Stack, StackEvent};
use serde_json::{Value, json};
use tracing::debug;

/// SDK accessors return `&T` for required members and `Option<&T>` for
/// optional ones; this flattens both to `Option<&T>`.
trait Member<'a, T: ?Sized> {
    fn member(self) -> Option<&'a T>;
}

impl<'a, T: ?Sized> Member<'a, T> for &'a T {
    fn member(self) -> Option<&'a T> {
        Some(self)
    }
}

impl<'a, T: ?Sized> Member<'a, T> for Option<&'a T> {
    fn member(self) -> Option<&'a T> {
        self
    }
}

pub struct CloudFormationClient {
    client: Client,
    region: String,
}

impl CloudFormationClient {
    /// Loads credentials from the default provider chain
    pub async fn connect(region: &str) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        debug!(region, "created CloudFormation client");
        Self {
            client: Client::new(&config),
            region: region.to_string(),
        }
    }

    async fn describe_stacks(&self, params: &Value) -> Result<Value, RemoteError> {
        let output = self
            .client
            .describe_stacks()
            .stack_name(required_str(params, "StackName")?)
            .send()
            .await
            .map_err(remote_error)?;
        let stacks: Vec<Value> = output
            .stacks()
            .member()
            .unwrap_or_default()
            .iter()
            .map(stack_to_json)
            .collect();
        Ok(json!({ "Stacks": stacks }))
    }

    async fn create_stack(&self, params: &Value) -> Result<Value, RemoteError> {
        let mut request = self
            .client
            .create_stack()
            .stack_name(required_str(params, "StackName")?)
            .template_body(required_str(params, "TemplateBody")?);
        for capability in str_list(params, "Capabilities") {
            request = request.capabilities(Capability::from(capability));
        }
        let output = request.send().await.map_err(remote_error)?;
        Ok(json!({ "StackId": output.stack_id().member() }))
    }

    async fn update_stack(&self, params: &Value) -> Result<Value, RemoteError> {
        let mut request = self
            .client
            .update_stack()
            .stack_name(required_str(params, "StackName")?)
            .template_body(required_str(params, "TemplateBody")?);
        for capability in str_list(params, "Capabilities") {
            request = request.capabilities(Capability::from(capability));
        }
        let output = request.send().await.map_err(remote_error)?;
        Ok(json!({ "StackId": output.stack_id().member() }))
    }

    async fn delete_stack(&self, params: &Value) -> Result<Value, RemoteError> {
        self.client
            .delete_stack()
            .stack_name(required_str(params, "StackName")?)
            .send()
            .await
            .map_err(remote_error)?;
        Ok(json!({}))
    }

    async fn describe_stack_events(&self, params: &Value) -> Result<Value, RemoteError> {
        let output = self
            .client
            .describe_stack_events()
            .stack_name(required_str(params, "StackName")?)
            .send()
            .await
            .map_err(remote_error)?;
        let events: Vec<Value> = output
            .stack_events()
            .member()
            .unwrap_or_default()
            .iter()
            .map(event_to_json)
            .collect();
        Ok(json!({ "StackEvents": events }))
    }
}

#[async_trait]
impl ProviderClient for CloudFormationClient {
    fn name(&self) -> &str {
        "aws"
    }

    fn region(&self) -> &str {
        &self.region
    }

    async fn request(
        &self,
        service: &str,
        method: &str,
        params: Value,
    ) -> Result<Value, RemoteError> {
        debug!(service, method, "aws request");
        match (service, method) {
            ("CloudFormation", "describeStacks") => self.describe_stacks(&params).await,
            ("CloudFormation", "createStack") => self.create_stack(&params).await,
            ("CloudFormation", "updateStack") => self.update_stack(&params).await,
            ("CloudFormation", "deleteStack") => self.delete_stack(&params).await,
            ("CloudFormation", "describeStackEvents") => {
                self.describe_stack_events(&params).await
            }
            _ => Err(RemoteError::new(
                "UnsupportedOperation",
                format!("{service}.{method} is not supported"),
            )),
        }
    }
}

fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, RemoteError> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| RemoteError::new("MissingParameter", format!("'{key}' is required")))
}

fn str_list<'a>(params: &'a Value, key: &str) -> Vec<&'a str> {
    params
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn stack_to_json(stack: &Stack) -> Value {
    let outputs: Vec<Value> = stack
        .outputs()
        .member()
        .unwrap_or_default()
        .iter()
        .map(|output| {
            json!({
                "OutputKey": output.output_key(),
                "OutputValue": output.output_value(),
                "Description": output.description(),
            })
        })
        .collect();

    json!({
        "StackName": stack.stack_name().member(),
        "StackId": stack.stack_id().member(),
        "StackStatus": stack.stack_status().member().map(|s| s.as_str()),
        "StackStatusReason": stack.stack_status_reason().member(),
        "Outputs": outputs,
    })
}

fn event_to_json(event: &StackEvent) -> Value {
    json!({
        "EventId": event.event_id().member(),
        "StackName": event.stack_name().member(),
        "LogicalResourceId": event.logical_resource_id().member(),
        "PhysicalResourceId": event.physical_resource_id().member(),
        "ResourceType": event.resource_type().member(),
        "Timestamp": event.timestamp().member().and_then(to_rfc3339),
        "ResourceStatus": event.resource_status().member().map(|s| s.as_str()),
        "ResourceStatusReason": event.resource_status_reason().member(),
    })
}

fn to_rfc3339(timestamp: &SdkDateTime) -> Option<String> {
    chrono::DateTime::<chrono::Utc>::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
        .map(|t| t.to_rfc3339())
}

fn remote_error<E>(err: SdkError<E, HttpResponse>) -> RemoteError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match &err {
        SdkError::TimeoutError(_) => {
            return RemoteError::new("TimeoutError", DisplayErrorContext(&err).to_string());
        }
        SdkError::DispatchFailure(_) => {
            return RemoteError::new("NetworkingError", DisplayErrorContext(&err).to_string());
        }
        _ => {}
    }

    let status = err.raw_response().map(|response| response.status().as_u16());
    let code = err.code().unwrap_or("Unknown").to_string();
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

    let remote = RemoteError::new(code, message);
    match status {
        Some(status) => remote.with_status(status),
        None => remote,
    }
}
