//! Plugin descriptors
//!
//! A plugin is a name, optionally a provider it is bound to, the commands it
//! declares and the hooks it binds to lifecycle events. Handlers receive the
//! shared command context mutably and return a boxed future.

use futures_util::future::BoxFuture;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Future returned by a hook handler
pub type HookFuture<'a> = BoxFuture<'a, anyhow::Result<()>>;

/// A hook handler bound to an event
pub type Handler<C> = Arc<dyn for<'a> Fn(&'a mut C) -> HookFuture<'a> + Send + Sync>;

/// Command options as `--name value` pairs
pub type Options = BTreeMap<String, String>;

/// Events run around every command, outside its pipeline
pub const INITIALIZE_EVENT: &str = "initialize";
pub const ERROR_EVENT: &str = "error";
pub const FINALIZE_EVENT: &str = "finalize";

/// Lifecycle phase of a hook relative to its event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Before,
    At,
    After,
}

impl Phase {
    pub const ORDER: [Phase; 3] = [Phase::Before, Phase::At, Phase::After];

    /// Full hook key for `event` in this phase, e.g. `before:package:compileEvents`
    pub fn hook_key(self, event: &str) -> String {
        match self {
            Phase::Before => format!("before:{event}"),
            Phase::At => event.to_string(),
            Phase::After => format!("after:{event}"),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Before => write!(f, "before"),
            Phase::At => write!(f, "at"),
            Phase::After => write!(f, "after"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    pub name: String,
    pub usage: String,
    pub default: Option<String>,
    pub required: bool,
}

impl OptionSpec {
    pub fn new(name: impl Into<String>, usage: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            usage: usage.into(),
            default: None,
            required: false,
        }
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A command and the ordered lifecycle events it runs.
///
/// `extends` names another command whose pipeline runs first, so `deploy`
/// can reuse every `package` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: String,
    pub usage: String,
    pub lifecycle_events: Vec<String>,
    pub options: Vec<OptionSpec>,
    pub extends: Option<String>,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            usage: String::new(),
            lifecycle_events: Vec::new(),
            options: Vec::new(),
            extends: None,
        }
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    pub fn events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lifecycle_events = events.into_iter().map(Into::into).collect();
        self
    }

    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    pub fn extends(mut self, command: impl Into<String>) -> Self {
        self.extends = Some(command.into());
        self
    }

    /// Combines a later declaration of the same command into this one.
    /// A non-empty event list replaces, options accumulate, and the first
    /// usage and `extends` seen are kept.
    pub fn merge(&mut self, other: CommandSpec) {
        if !other.lifecycle_events.is_empty() {
            self.lifecycle_events = other.lifecycle_events;
        }
        for option in other.options {
            if !self.options.iter().any(|o| o.name == option.name) {
                self.options.push(option);
            }
        }
        if self.usage.is_empty() {
            self.usage = other.usage;
        }
        if self.extends.is_none() {
            self.extends = other.extends;
        }
    }
}

/// Plugin descriptor built with a small builder
pub struct Plugin<C> {
    pub(crate) name: String,
    pub(crate) provider: Option<String>,
    pub(crate) commands: Vec<CommandSpec>,
    pub(crate) hooks: Vec<(String, Handler<C>)>,
}

impl<C> Plugin<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: None,
            commands: Vec::new(),
            hooks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Restricts the plugin to services using `provider`
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn command(mut self, command: CommandSpec) -> Self {
        self.commands.push(command);
        self
    }

    /// Binds `handler` to a hook key such as `package:compileEvents`,
    /// `before:deploy:deploy` or `initialize`
    pub fn hook<F>(mut self, event: impl Into<String>, handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut C) -> HookFuture<'a> + Send + Sync + 'static,
    {
        self.hooks.push((event.into(), Arc::new(handler)));
        self
    }

    pub fn hook_keys(&self) -> impl Iterator<Item = &str> {
        self.hooks.iter().map(|(event, _)| event.as_str())
    }
}

impl<C> fmt::Debug for Plugin<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("provider", &self.provider)
            .field("commands", &self.commands)
            .field("hooks", &self.hooks.iter().map(|(e, _)| e).collect::<Vec<_>>())
            .finish()
    }
}
