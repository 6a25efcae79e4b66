use thiserror::Error;

/// Errors raised while registering plugins or dispatching lifecycle events
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Plugin registration failed for '{plugin}': {message}")]
    Registration { plugin: String, message: String },

    #[error("Command '{0}' is not defined by any registered plugin")]
    UnknownCommand(String),

    #[error("Command '{command}' requires option '{option}'")]
    MissingOption { command: String, option: String },

    #[error("Invalid lifecycle for command '{command}': {message}")]
    InvalidPipeline { command: String, message: String },

    #[error("Hook '{event}' of plugin '{plugin}' failed")]
    HookExecution {
        plugin: String,
        event: String,
        /// Index of the failing event in the command's pipeline, `None`
        /// for initialize/error/finalize hooks
        event_index: Option<usize>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Cancelled before '{event}'")]
    Cancelled { event: String },
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
