//! stackflow core
//!
//! Provider-independent building blocks shared by the lifecycle, the AWS
//! compilers and the CLI.
//!
//! ```text
//! ┌──────────────────────┐   compilers put/merge    ┌──────────────────────┐
//! │  ServiceDefinition   │ ───────────────────────▶ │  CompilationContext  │
//! │  (model)             │   ids from `naming`      │  (template)          │
//! └──────────────────────┘                          └──────────┬───────────┘
//!                                                        freeze │
//!                                                   ┌──────────▼───────────┐
//!                                                   │   CompiledTemplate   │
//!                                                   └──────────┬───────────┘
//!                                                              │ save
//!                                                   ┌──────────▼───────────┐
//!                                                   │    ArtifactStore     │
//!                                                   │    (.stackflow/)     │
//!                                                   └──────────────────────┘
//! ```

pub mod artifacts;
pub mod error;
pub mod intrinsic;
pub mod model;
pub mod naming;
pub mod template;

pub use artifacts::{ArtifactStore, Codec, Entity, EntityKind, ServiceState};
pub use error::{CoreError, Result};
pub use model::{
    CloudwatchLogEvent, CustomResources, FunctionDefinition, FunctionEvent, ProviderConfig,
    ScheduleConfig, ScheduleEvent, ServiceDefinition, VpcConfig,
};
pub use template::{
    CompilationContext, CompiledTemplate, DeletionPolicy, LateBound, OutputSpec, ResourceSpec,
    Section,
};
