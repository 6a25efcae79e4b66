//! Service definition model
//!
//! The in-memory shape of a service file: service name, provider settings,
//! functions with their events, and raw custom resources that are merged into
//! the compiled template last.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_STAGE: &str = "dev";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_RUNTIME: &str = "nodejs20.x";
pub const DEFAULT_MEMORY_SIZE: u32 = 1024;
pub const DEFAULT_TIMEOUT: u32 = 6;

/// A whole service file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub service: String,

    #[serde(default)]
    pub provider: ProviderConfig,

    /// Functions keyed by their short name. Kept sorted so compilation order
    /// does not depend on file layout.
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionDefinition>,

    #[serde(default)]
    pub resources: CustomResources,
}

impl ServiceDefinition {
    pub fn function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.get(name)
    }

    /// Deployed name of a function: explicit `name`, else `{service}-{stage}-{key}`
    pub fn deployed_function_name(&self, key: &str, stage: &str) -> String {
        self.functions
            .get(key)
            .and_then(|f| f.name.clone())
            .unwrap_or_else(|| format!("{}-{}-{}", self.service, stage, key))
    }
}

/// `provider:` block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default = "default_provider_name")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,

    /// Pre-existing bucket to deploy into instead of a generated one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_bucket: Option<String>,
}

fn default_provider_name() -> String {
    "aws".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            stage: None,
            region: None,
            stack_name: None,
            runtime: None,
            memory_size: None,
            timeout: None,
            deployment_bucket: None,
        }
    }
}

impl ProviderConfig {
    pub fn stage(&self) -> &str {
        self.stage.as_deref().unwrap_or(DEFAULT_STAGE)
    }

    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    pub fn runtime(&self) -> &str {
        self.runtime.as_deref().unwrap_or(DEFAULT_RUNTIME)
    }

    pub fn memory_size(&self) -> u32 {
        self.memory_size.unwrap_or(DEFAULT_MEMORY_SIZE)
    }

    pub fn timeout(&self) -> u32 {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }
}

/// One entry under `functions:`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDefinition {
    pub handler: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc: Option<VpcConfig>,

    #[serde(default)]
    pub events: Vec<FunctionEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpcConfig {
    #[serde(default)]
    pub security_group_ids: Vec<String>,
    #[serde(default)]
    pub subnet_ids: Vec<String>,
}

/// One item of a function's `events:` list.
///
/// Exactly one key is expected per item; keys this tool does not compile
/// end up in `other` so compilers can report them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleEvent>,

    #[serde(
        default,
        rename = "cloudwatchLog",
        skip_serializing_if = "Option::is_none"
    )]
    pub cloudwatch_log: Option<CloudwatchLogEvent>,

    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

/// `schedule: rate(10 minutes)` or the detailed form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScheduleEvent {
    Expression(String),
    Detailed(ScheduleConfig),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(deserialize_with = "one_or_many")]
    pub rate: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Passed to the target verbatim when a string, JSON-encoded otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
}

impl ScheduleEvent {
    pub fn rates(&self) -> Vec<String> {
        match self {
            ScheduleEvent::Expression(rate) => vec![rate.clone()],
            ScheduleEvent::Detailed(config) => config.rate.clone(),
        }
    }

    pub fn config(&self) -> Option<&ScheduleConfig> {
        match self {
            ScheduleEvent::Expression(_) => None,
            ScheduleEvent::Detailed(config) => Some(config),
        }
    }
}

/// `cloudwatchLog: /aws/lambda/x` or `{ logGroup, filter }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CloudwatchLogEvent {
    LogGroup(String),
    Detailed {
        #[serde(rename = "logGroup")]
        log_group: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter: Option<String>,
    },
}

impl CloudwatchLogEvent {
    pub fn log_group(&self) -> &str {
        match self {
            CloudwatchLogEvent::LogGroup(group) => group,
            CloudwatchLogEvent::Detailed { log_group, .. } => log_group,
        }
    }

    pub fn filter(&self) -> Option<&str> {
        match self {
            CloudwatchLogEvent::LogGroup(_) => None,
            CloudwatchLogEvent::Detailed { filter, .. } => filter.as_deref(),
        }
    }
}

/// `resources:` block, merged over generated output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomResources {
    #[serde(
        rename = "Resources",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub resources: BTreeMap<String, serde_json::Value>,

    #[serde(rename = "Outputs", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, serde_json::Value>,
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(rate) => vec![rate],
        OneOrMany::Many(rates) => rates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_defaults() {
        let provider = ProviderConfig::default();
        assert_eq!(provider.name, "aws");
        assert_eq!(provider.stage(), "dev");
        assert_eq!(provider.region(), "us-east-1");
        assert_eq!(provider.memory_size(), 1024);
        assert_eq!(provider.timeout(), 6);
    }

    #[test]
    fn test_deployed_function_name() {
        let mut service = ServiceDefinition {
            service: "orders".to_string(),
            ..Default::default()
        };
        service
            .functions
            .insert("create".to_string(), FunctionDefinition::default());
        service.functions.insert(
            "named".to_string(),
            FunctionDefinition {
                name: Some("custom-name".to_string()),
                ..Default::default()
            },
        );

        assert_eq!(
            service.deployed_function_name("create", "prod"),
            "orders-prod-create"
        );
        assert_eq!(service.deployed_function_name("named", "prod"), "custom-name");
    }

    #[test]
    fn test_event_shapes_from_json() {
        let events: Vec<FunctionEvent> = serde_json::from_value(serde_json::json!([
            { "schedule": "rate(10 minutes)" },
            { "schedule": { "rate": ["rate(1 hour)", "cron(0 12 * * ? *)"], "enabled": false } },
            { "cloudwatchLog": "/aws/lambda/hello" },
            { "cloudwatchLog": { "logGroup": "/aws/lambda/world", "filter": "ERROR" } },
            { "http": { "path": "/" } }
        ]))
        .unwrap();

        assert_eq!(
            events[0].schedule.as_ref().unwrap().rates(),
            vec!["rate(10 minutes)"]
        );
        let detailed = events[1].schedule.as_ref().unwrap();
        assert_eq!(detailed.rates().len(), 2);
        assert_eq!(detailed.config().unwrap().enabled, Some(false));
        assert_eq!(
            events[2].cloudwatch_log.as_ref().unwrap().log_group(),
            "/aws/lambda/hello"
        );
        assert_eq!(events[3].cloudwatch_log.as_ref().unwrap().filter(), Some("ERROR"));
        assert!(events[4].other.contains_key("http"));
    }
}
