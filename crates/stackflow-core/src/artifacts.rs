//! Build artifacts on disk
//!
//! Manages the `.stackflow/` directory next to the service file. Each entity
//! kind has a fixed file name and a serialize/deserialize pair chosen at
//! compile time through [`EntityKind::codec`].

use crate::error::{CoreError, Result};
use crate::template::{CompiledTemplate, LateBound};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;

const ARTIFACT_DIR: &str = ".stackflow";
const STATE_VERSION: u32 = 1;

/// Everything the artifact store knows how to persist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Template used to create the stack with only the deployment bucket
    CoreTemplate,
    /// Full template used for stack updates
    CompiledTemplate,
    /// What was packaged and, after deploy, the late-bound values
    ServiceState,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [
        EntityKind::CoreTemplate,
        EntityKind::CompiledTemplate,
        EntityKind::ServiceState,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            EntityKind::CoreTemplate => "cloudformation-template-create-stack.json",
            EntityKind::CompiledTemplate => "cloudformation-template-update-stack.json",
            EntityKind::ServiceState => "stackflow-state.json",
        }
    }

    pub fn codec(self) -> Codec {
        match self {
            EntityKind::CoreTemplate => Codec {
                serialize: serialize_template,
                deserialize: |content| Ok(Entity::CoreTemplate(CompiledTemplate::from_json(content)?)),
            },
            EntityKind::CompiledTemplate => Codec {
                serialize: serialize_template,
                deserialize: |content| {
                    Ok(Entity::CompiledTemplate(CompiledTemplate::from_json(
                        content,
                    )?))
                },
            },
            EntityKind::ServiceState => Codec {
                serialize: serialize_state,
                deserialize: |content| Ok(Entity::ServiceState(serde_json::from_str(content)?)),
            },
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::CoreTemplate => write!(f, "core template"),
            EntityKind::CompiledTemplate => write!(f, "compiled template"),
            EntityKind::ServiceState => write!(f, "service state"),
        }
    }
}

/// Serialize/deserialize pair for one entity kind
#[derive(Clone, Copy)]
pub struct Codec {
    pub serialize: fn(&Entity) -> Result<String>,
    pub deserialize: fn(&str) -> Result<Entity>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    CoreTemplate(CompiledTemplate),
    CompiledTemplate(CompiledTemplate),
    ServiceState(ServiceState),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::CoreTemplate(_) => EntityKind::CoreTemplate,
            Entity::CompiledTemplate(_) => EntityKind::CompiledTemplate,
            Entity::ServiceState(_) => EntityKind::ServiceState,
        }
    }
}

fn serialize_template(entity: &Entity) -> Result<String> {
    match entity {
        Entity::CoreTemplate(template) | Entity::CompiledTemplate(template) => {
            template.to_json_pretty()
        }
        other => Err(mismatch(EntityKind::CompiledTemplate, other.kind())),
    }
}

fn serialize_state(entity: &Entity) -> Result<String> {
    match entity {
        Entity::ServiceState(state) => Ok(serde_json::to_string_pretty(state)?),
        other => Err(mismatch(EntityKind::ServiceState, other.kind())),
    }
}

fn mismatch(expected: EntityKind, found: EntityKind) -> CoreError {
    CoreError::EntityMismatch {
        file: expected.file_name().to_string(),
        expected: expected.to_string(),
        found: found.to_string(),
    }
}

/// Record of the last package/deploy of a service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceState {
    pub version: u32,
    pub service: String,
    pub stage: String,
    pub region: String,
    pub stack_name: String,
    pub packaged_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_at: Option<DateTime<Utc>>,
    /// Late-bound values keyed by [`LateBound::key`]
    #[serde(default)]
    pub bindings: BTreeMap<String, String>,
}

impl ServiceState {
    pub fn new(
        service: impl Into<String>,
        stage: impl Into<String>,
        region: impl Into<String>,
        stack_name: impl Into<String>,
    ) -> Self {
        Self {
            version: STATE_VERSION,
            service: service.into(),
            stage: stage.into(),
            region: region.into(),
            stack_name: stack_name.into(),
            packaged_at: Utc::now(),
            deployed_at: None,
            bindings: BTreeMap::new(),
        }
    }

    pub fn record_bindings(&mut self, template: &CompiledTemplate) {
        for (key, value) in template.bindings() {
            self.bindings.insert(key.key().to_string(), value.to_string());
        }
    }

    pub fn binding(&self, key: LateBound) -> Option<&str> {
        self.bindings.get(key.key()).map(String::as_str)
    }
}

/// Reads and writes entities under `<service_dir>/.stackflow`
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    service_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(service_dir: impl AsRef<Path>) -> Self {
        Self {
            service_dir: service_dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> PathBuf {
        self.service_dir.join(ARTIFACT_DIR)
    }

    pub fn path(&self, kind: EntityKind) -> PathBuf {
        self.dir().join(kind.file_name())
    }

    fn backup_path(&self, kind: EntityKind) -> PathBuf {
        self.dir().join(format!("{}.backup", kind.file_name()))
    }

    async fn ensure_dir(&self) -> Result<()> {
        let dir = self.dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created artifact directory: {}", dir.display());
        }
        Ok(())
    }

    /// Writes an entity, keeping the previous file as a backup
    pub async fn save(&self, entity: &Entity) -> Result<PathBuf> {
        self.ensure_dir().await?;

        let kind = entity.kind();
        let path = self.path(kind);
        let backup = self.backup_path(kind);

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
        }

        let content = (kind.codec().serialize)(entity)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved {} to {}", kind, path.display());
        Ok(path)
    }

    /// Loads an entity, `None` when it was never written
    pub async fn load(&self, kind: EntityKind) -> Result<Option<Entity>> {
        let path = self.path(kind);
        if !path.exists() {
            tracing::debug!("{} not found at {}", kind, path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let entity = (kind.codec().deserialize)(&content)?;

        if let Entity::ServiceState(state) = &entity {
            if state.version > STATE_VERSION {
                return Err(CoreError::InvalidSpec {
                    id: kind.file_name().to_string(),
                    message: format!(
                        "state version {} is newer than supported version {}",
                        state.version, STATE_VERSION
                    ),
                });
            }
        }
        Ok(Some(entity))
    }

    pub async fn load_template(&self, kind: EntityKind) -> Result<Option<CompiledTemplate>> {
        Ok(match self.load(kind).await? {
            Some(Entity::CoreTemplate(t)) | Some(Entity::CompiledTemplate(t)) => Some(t),
            Some(other) => return Err(mismatch(kind, other.kind())),
            None => None,
        })
    }

    pub async fn load_state(&self) -> Result<Option<ServiceState>> {
        Ok(match self.load(EntityKind::ServiceState).await? {
            Some(Entity::ServiceState(state)) => Some(state),
            Some(other) => return Err(mismatch(EntityKind::ServiceState, other.kind())),
            None => None,
        })
    }

    /// Removes the whole artifact directory
    pub async fn clean(&self) -> Result<()> {
        let dir = self.dir();
        if dir.exists() {
            fs::remove_dir_all(&dir).await?;
            tracing::debug!("Removed {}", dir.display());
        }
        Ok(())
    }
}
