//! Lifecycle dispatcher
//!
//! Runs a command's pipeline against a registry: for every event, the
//! `before:`, plain and `after:` handlers run in registration order, one at a
//! time, each awaited before the next starts. The first failure stops the run.

use crate::error::{LifecycleError, Result};
use crate::plugin::{ERROR_EVENT, FINALIZE_EVENT, INITIALIZE_EVENT, Options, Phase};
use crate::registry::{Pipeline, PluginRegistry};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

/// Context types the dispatcher can drive
pub trait LifecycleContext: Send {
    fn options(&self) -> &Options;
    fn options_mut(&mut self) -> &mut Options;
}

/// Shared flag checked between hooks and by long-running handlers
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running { event_index: usize },
    Completed,
    Failed {
        event_index: Option<usize>,
        plugin: String,
        event: String,
    },
}

/// One handler that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookTrace {
    pub plugin: String,
    pub event: String,
}

/// Summary of a finished invocation
#[derive(Debug, Clone)]
pub struct RunReport {
    pub command: String,
    pub state: RunState,
    pub trace: Vec<HookTrace>,
}

impl RunReport {
    fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            state: RunState::NotStarted,
            trace: Vec::new(),
        }
    }
}

impl LifecycleError {
    /// Run state a failed invocation ended in
    pub fn run_state(&self) -> Option<RunState> {
        match self {
            LifecycleError::HookExecution {
                plugin,
                event,
                event_index,
                ..
            } => Some(RunState::Failed {
                event_index: *event_index,
                plugin: plugin.clone(),
                event: event.clone(),
            }),
            _ => None,
        }
    }
}

pub struct Dispatcher<C> {
    registry: PluginRegistry<C>,
    cancel: CancellationFlag,
}

impl<C: LifecycleContext + 'static> Dispatcher<C> {
    pub fn new(registry: PluginRegistry<C>) -> Self {
        Self {
            registry,
            cancel: CancellationFlag::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn registry(&self) -> &PluginRegistry<C> {
        &self.registry
    }

    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Runs `command` wrapped in the `initialize`, `error` and `finalize`
    /// hooks. Error hooks run only when the pipeline failed and their own
    /// failure is logged without masking the pipeline's error; finalize hooks
    /// run only after a successful pipeline.
    pub async fn run(&self, command: &str, ctx: &mut C) -> Result<RunReport> {
        let mut outer = RunReport::new(command);
        self.run_hooks(INITIALIZE_EVENT, None, ctx, &mut outer)
            .await?;

        let result = self.invoke(command, ctx).await;

        if let Err(err) = &result {
            error!(command, error = %err, "command failed");
            if let Err(hook_err) = self.run_hooks(ERROR_EVENT, None, ctx, &mut outer).await {
                warn!(error = %hook_err, "error hook failed");
            }
        } else {
            self.run_hooks(FINALIZE_EVENT, None, ctx, &mut outer).await?;
        }

        result.map(|mut report| {
            let mut trace = outer.trace;
            trace.append(&mut report.trace);
            report.trace = trace;
            report
        })
    }

    /// Resolves and executes the pipeline of `command`
    pub async fn invoke(&self, command: &str, ctx: &mut C) -> Result<RunReport> {
        let pipeline = self.registry.pipeline(command)?;
        apply_option_defaults(&pipeline, ctx.options_mut());
        check_required_options(&pipeline, ctx.options())?;
        if self.has_hooks(&pipeline) {
            info!(events = pipeline.events().len(), "Invoke {command}");
        } else {
            info!("Invoke {command} (noop due to no registered hooks)");
        }
        self.execute(&pipeline, ctx).await
    }

    /// Executes an already resolved pipeline
    pub async fn execute(&self, pipeline: &Pipeline, ctx: &mut C) -> Result<RunReport> {
        let mut report = RunReport::new(pipeline.command());

        for (index, event) in pipeline.events().iter().enumerate() {
            report.state = RunState::Running { event_index: index };
            debug!(event = %event, index, "lifecycle event");
            for phase in Phase::ORDER {
                let key = phase.hook_key(event);
                if let Err(err) = self.run_hooks(&key, Some(index), ctx, &mut report).await {
                    debug!(event = %key, completed = report.trace.len(), "pipeline stopped");
                    return Err(err);
                }
            }
        }

        report.state = RunState::Completed;
        Ok(report)
    }

    fn has_hooks(&self, pipeline: &Pipeline) -> bool {
        pipeline.events().iter().any(|event| {
            Phase::ORDER
                .iter()
                .any(|phase| !self.registry.hooks_for(&phase.hook_key(event)).is_empty())
        })
    }

    async fn run_hooks(
        &self,
        key: &str,
        event_index: Option<usize>,
        ctx: &mut C,
        report: &mut RunReport,
    ) -> Result<()> {
        for registration in self.registry.hooks_for(key) {
            if self.cancel.is_cancelled() {
                return Err(LifecycleError::Cancelled {
                    event: key.to_string(),
                });
            }
            debug!(plugin = %registration.plugin, hook = key, "running hook");
            (registration.handler)(ctx).await.map_err(|source| {
                LifecycleError::HookExecution {
                    plugin: registration.plugin.clone(),
                    event: key.to_string(),
                    event_index,
                    source: source.into(),
                }
            })?;
            report.trace.push(HookTrace {
                plugin: registration.plugin.clone(),
                event: key.to_string(),
            });
        }
        Ok(())
    }
}

fn apply_option_defaults(pipeline: &Pipeline, options: &mut Options) {
    for option in pipeline.options() {
        if let Some(default) = &option.default {
            options
                .entry(option.name.clone())
                .or_insert_with(|| default.clone());
        }
    }
}

fn check_required_options(pipeline: &Pipeline, options: &Options) -> Result<()> {
    match pipeline
        .options()
        .iter()
        .find(|option| option.required && !options.contains_key(&option.name))
    {
        Some(option) => Err(LifecycleError::MissingOption {
            command: pipeline.command().to_string(),
            option: option.name.clone(),
        }),
        None => Ok(()),
    }
}
