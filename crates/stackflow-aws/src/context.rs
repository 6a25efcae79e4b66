//! Command context shared by every hook of a run

use crate::client::{ProviderClient, RetryConfig};
use crate::error::{AwsError, Result};
use stackflow_core::naming;
use stackflow_core::{
    ArtifactStore, CompilationContext, CompiledTemplate, ServiceDefinition, ServiceState,
};
use stackflow_lifecycle::{CancellationFlag, LifecycleContext, Options};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// How stack operations are awaited
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub timeout: Duration,
    /// Extra attempts for a failed status query
    pub query_retries: u32,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(3600),
            query_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploySettings {
    pub monitor: MonitorSettings,
    pub retry: RetryConfig,
}

/// What `info` found out about the deployed stack
#[derive(Debug, Clone, PartialEq)]
pub struct StackInfo {
    pub stack_name: String,
    pub status: String,
    pub outputs: BTreeMap<String, String>,
}

pub struct CommandContext {
    pub service: ServiceDefinition,
    pub options: Options,
    /// Entries written by the compilers during `package`
    pub template: CompilationContext,
    /// Frozen bucket-only template used to create the stack
    pub core_template: Option<CompiledTemplate>,
    /// Frozen full template, set at the end of `package`
    pub compiled: Option<CompiledTemplate>,
    pub state: Option<ServiceState>,
    pub stack_info: Option<StackInfo>,
    pub store: ArtifactStore,
    pub settings: DeploySettings,
    pub cancel: CancellationFlag,
    client: Option<Arc<dyn ProviderClient>>,
}

impl CommandContext {
    pub fn new(service: ServiceDefinition, service_dir: impl AsRef<Path>) -> Self {
        Self {
            service,
            options: Options::new(),
            template: CompilationContext::new(),
            core_template: None,
            compiled: None,
            state: None,
            stack_info: None,
            store: ArtifactStore::new(service_dir),
            settings: DeploySettings::default(),
            cancel: CancellationFlag::new(),
            client: None,
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn with_client(mut self, client: Arc<dyn ProviderClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_settings(mut self, settings: DeploySettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn client(&self) -> Result<Arc<dyn ProviderClient>> {
        self.client.clone().ok_or(AwsError::NoClient)
    }

    /// `--stage`, else the provider's stage, else `dev`
    pub fn stage(&self) -> String {
        self.options
            .get("stage")
            .cloned()
            .unwrap_or_else(|| self.service.provider.stage().to_string())
    }

    /// `--region`, else the provider's region, else `us-east-1`
    pub fn region(&self) -> String {
        self.options
            .get("region")
            .cloned()
            .unwrap_or_else(|| self.service.provider.region().to_string())
    }

    pub fn stack_name(&self) -> String {
        self.service
            .provider
            .stack_name
            .clone()
            .unwrap_or_else(|| naming::stack_name(&self.service.service, &self.stage()))
    }

    pub fn deployed_function_name(&self, key: &str) -> String {
        self.service.deployed_function_name(key, &self.stage())
    }
}

impl LifecycleContext for CommandContext {
    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }
}
