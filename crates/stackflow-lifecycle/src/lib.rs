//! stackflow lifecycle
//!
//! Plugins declare commands as ordered lists of lifecycle events and bind
//! handlers to those events. The [`Dispatcher`] turns a command name into a
//! [`Pipeline`] and runs `before:`, plain and `after:` handlers for each event
//! in registration order, stopping at the first failure.
//!
//! The crate is generic over the context type handlers mutate, so it knows
//! nothing about templates or providers.

pub mod dispatcher;
pub mod error;
pub mod plugin;
pub mod registry;

pub use dispatcher::{
    CancellationFlag, Dispatcher, HookTrace, LifecycleContext, RunReport, RunState,
};
pub use error::{LifecycleError, Result};
pub use plugin::{
    CommandSpec, ERROR_EVENT, FINALIZE_EVENT, Handler, HookFuture, INITIALIZE_EVENT, OptionSpec,
    Options, Phase, Plugin,
};
pub use registry::{HookRegistration, Pipeline, PluginRegistry};
