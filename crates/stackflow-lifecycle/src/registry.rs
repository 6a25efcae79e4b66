//! Plugin registry
//!
//! Collects plugins, merges the commands they declare and indexes their hooks
//! by key. Hooks for the same key keep global registration order.

use crate::error::{LifecycleError, Result};
use crate::plugin::{CommandSpec, Handler, OptionSpec, Plugin};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

/// A handler as stored in the registry
pub struct HookRegistration<C> {
    pub plugin: String,
    pub event: String,
    /// Position in global registration order
    pub order: usize,
    pub(crate) handler: Handler<C>,
}

impl<C> Clone for HookRegistration<C> {
    fn clone(&self) -> Self {
        Self {
            plugin: self.plugin.clone(),
            event: self.event.clone(),
            order: self.order,
            handler: self.handler.clone(),
        }
    }
}

/// Ordered lifecycle events of one command, each qualified as `command:event`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    command: String,
    events: Vec<String>,
    options: Vec<OptionSpec>,
}

impl Pipeline {
    /// Builds a pipeline, rejecting duplicate event names
    pub fn new(command: impl Into<String>, events: Vec<String>) -> Result<Self> {
        let command = command.into();
        let mut seen = HashSet::new();
        for event in &events {
            if !seen.insert(event.as_str()) {
                return Err(LifecycleError::InvalidPipeline {
                    command,
                    message: format!("event '{event}' appears more than once"),
                });
            }
        }
        Ok(Self {
            command,
            events,
            options: Vec::new(),
        })
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    /// Options declared by the command and every command it extends
    pub fn options(&self) -> &[OptionSpec] {
        &self.options
    }
}

pub struct PluginRegistry<C> {
    provider: Option<String>,
    plugins: Vec<String>,
    commands: BTreeMap<String, CommandSpec>,
    hooks: HashMap<String, Vec<HookRegistration<C>>>,
    next_order: usize,
}

impl<C> Default for PluginRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> PluginRegistry<C> {
    pub fn new() -> Self {
        Self {
            provider: None,
            plugins: Vec::new(),
            commands: BTreeMap::new(),
            hooks: HashMap::new(),
            next_order: 0,
        }
    }

    /// Only plugins without a provider or bound to `provider` are accepted
    pub fn for_provider(provider: impl Into<String>) -> Self {
        Self {
            provider: Some(provider.into()),
            ..Self::new()
        }
    }

    /// Registers a plugin. Returns `false` when it was skipped because it is
    /// bound to a different provider.
    pub fn register(&mut self, plugin: Plugin<C>) -> Result<bool> {
        validate_shape(&plugin)?;

        if self.plugins.iter().any(|name| *name == plugin.name) {
            return Err(LifecycleError::Registration {
                plugin: plugin.name,
                message: "a plugin with this name is already registered".to_string(),
            });
        }

        if let (Some(wanted), Some(bound)) = (&self.provider, &plugin.provider) {
            if wanted != bound {
                debug!(plugin = %plugin.name, provider = %bound, "skipping plugin for other provider");
                return Ok(false);
            }
        }

        let Plugin {
            name,
            commands,
            hooks,
            ..
        } = plugin;

        for command in commands {
            match self.commands.get_mut(&command.name) {
                Some(existing) => existing.merge(command),
                None => {
                    self.commands.insert(command.name.clone(), command);
                }
            }
        }

        let hook_count = hooks.len();
        for (event, handler) in hooks {
            let registration = HookRegistration {
                plugin: name.clone(),
                event: event.clone(),
                order: self.next_order,
                handler,
            };
            self.next_order += 1;
            self.hooks.entry(event).or_default().push(registration);
        }

        info!(plugin = %name, hooks = hook_count, "registered plugin");
        self.plugins.push(name);
        Ok(true)
    }

    pub fn plugin_names(&self) -> &[String] {
        &self.plugins
    }

    pub fn commands(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.values()
    }

    pub fn command(&self, name: &str) -> Result<&CommandSpec> {
        self.commands
            .get(name)
            .ok_or_else(|| LifecycleError::UnknownCommand(name.to_string()))
    }

    /// Handlers bound to a hook key, in registration order
    pub fn hooks_for(&self, key: &str) -> &[HookRegistration<C>] {
        self.hooks.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resolves the full pipeline for `command`, prepending the pipelines
    /// of the commands it extends
    pub fn pipeline(&self, command: &str) -> Result<Pipeline> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(command);

        while let Some(name) = current {
            if !visited.insert(name) {
                return Err(LifecycleError::InvalidPipeline {
                    command: command.to_string(),
                    message: format!("'{name}' is extended in a cycle"),
                });
            }
            let spec = self.command(name)?;
            chain.push(spec);
            current = spec.extends.as_deref();
        }

        let mut events = Vec::new();
        let mut options: Vec<OptionSpec> = Vec::new();
        for spec in chain.iter().rev() {
            events.extend(
                spec.lifecycle_events
                    .iter()
                    .map(|event| format!("{}:{}", spec.name, event)),
            );
        }
        for spec in &chain {
            for option in &spec.options {
                if !options.iter().any(|o| o.name == option.name) {
                    options.push(option.clone());
                }
            }
        }

        let mut pipeline = Pipeline::new(command, events)?;
        pipeline.options = options;
        Ok(pipeline)
    }
}

fn validate_shape<C>(plugin: &Plugin<C>) -> Result<()> {
    let fail = |message: String| LifecycleError::Registration {
        plugin: plugin.name.clone(),
        message,
    };

    if plugin.name.trim().is_empty() {
        return Err(fail("plugin name must not be empty".to_string()));
    }
    for (event, _) in &plugin.hooks {
        if event.trim().is_empty() || event.ends_with(':') || event.starts_with(':') {
            return Err(fail(format!("invalid hook key '{event}'")));
        }
    }
    for command in &plugin.commands {
        if command.name.trim().is_empty() || command.name.contains(':') {
            return Err(fail(format!("invalid command name '{}'", command.name)));
        }
        let mut seen = HashSet::new();
        for event in &command.lifecycle_events {
            if event.is_empty() || event.contains(':') {
                return Err(fail(format!(
                    "invalid lifecycle event '{event}' in command '{}'",
                    command.name
                )));
            }
            if !seen.insert(event) {
                return Err(fail(format!(
                    "lifecycle event '{event}' is declared twice in command '{}'",
                    command.name
                )));
            }
        }
    }
    Ok(())
}
