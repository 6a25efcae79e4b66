//! Compilation context and compiled template
//!
//! Compilers write resources and outputs into a [`CompilationContext`] under
//! logical ids. Once every compiler has run the context is frozen into a
//! [`CompiledTemplate`], which is validated and serialized deterministically:
//! all maps are ordered by key and `DependsOn` is an ordered set, so the same
//! definition always yields byte-identical output.

use crate::error::{CoreError, Result};
use crate::intrinsic;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Top-level template section an entry lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Resources,
    Outputs,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Resources => write!(f, "Resources"),
            Section::Outputs => write!(f, "Outputs"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionPolicy {
    Delete,
    Retain,
    Snapshot,
}

/// One entry of `Resources`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    #[serde(rename = "Type")]
    pub kind: String,

    #[serde(rename = "Properties", default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,

    #[serde(rename = "DependsOn", default, skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on: BTreeSet<String>,

    #[serde(
        rename = "DeletionPolicy",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub deletion_policy: Option<DeletionPolicy>,
}

impl ResourceSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            properties: Map::new(),
            depends_on: BTreeSet::new(),
            deletion_policy: None,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_properties(mut self, properties: Value) -> Self {
        if let Value::Object(map) = properties {
            self.properties.extend(map);
        }
        self
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on.insert(id.into());
        self
    }

    pub fn with_deletion_policy(mut self, policy: DeletionPolicy) -> Self {
        self.deletion_policy = Some(policy);
        self
    }

    /// Parses a raw template fragment such as a user-supplied custom resource
    pub fn from_value(id: &str, value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| CoreError::InvalidSpec {
            id: id.to_string(),
            message: e.to_string(),
        })
    }
}

/// One entry of `Outputs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    #[serde(rename = "Value")]
    pub value: Value,

    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "Export", default, skip_serializing_if = "Option::is_none")]
    pub export: Option<Value>,
}

impl OutputSpec {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            description: None,
            export: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn from_value(id: &str, value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| CoreError::InvalidSpec {
            id: id.to_string(),
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeMode {
    /// Objects merge recursively, arrays union, scalar conflicts are errors.
    /// The result does not depend on the order of merges.
    Commutative,
    /// Objects merge recursively, incoming arrays and scalars replace.
    Override,
}

/// Mutable accumulation of template entries keyed by logical id.
///
/// A logical id is unique across both sections.
#[derive(Debug, Clone, Default)]
pub struct CompilationContext {
    description: Option<String>,
    resources: BTreeMap<String, ResourceSpec>,
    outputs: BTreeMap<String, OutputSpec>,
}

impl CompilationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub fn resources(&self) -> &BTreeMap<String, ResourceSpec> {
        &self.resources
    }

    pub fn outputs(&self) -> &BTreeMap<String, OutputSpec> {
        &self.outputs
    }

    pub fn resource(&self, id: &str) -> Option<&ResourceSpec> {
        self.resources.get(id)
    }

    pub fn output(&self, id: &str) -> Option<&OutputSpec> {
        self.outputs.get(id)
    }

    /// Section `id` is defined in, if any
    pub fn section_of(&self, id: &str) -> Option<Section> {
        if self.resources.contains_key(id) {
            Some(Section::Resources)
        } else if self.outputs.contains_key(id) {
            Some(Section::Outputs)
        } else {
            None
        }
    }

    /// Inserts a resource. Writing an identical spec again is a no-op;
    /// a different spec under the same id is a [`CoreError::NamingCollision`].
    pub fn put_resource(&mut self, id: impl Into<String>, spec: ResourceSpec) -> Result<()> {
        let id = id.into();
        self.ensure_not_in(Section::Outputs, &id, &spec.kind)?;
        if let Some(existing) = self.resources.get(&id) {
            if *existing == spec {
                return Ok(());
            }
            return Err(CoreError::NamingCollision {
                section: Section::Resources,
                id,
                existing_kind: existing.kind.clone(),
                incoming_kind: spec.kind,
            });
        }
        debug!(id = %id, kind = %spec.kind, "put resource");
        self.resources.insert(id, spec);
        Ok(())
    }

    /// Inserts a resource, replacing any previous one under the same id
    pub fn put_or_replace_resource(&mut self, id: impl Into<String>, spec: ResourceSpec) {
        let id = id.into();
        if let Some(existing) = self.resources.get(&id) {
            if *existing != spec {
                warn!(id = %id, "replacing existing resource definition");
            }
        }
        self.outputs.remove(&id);
        self.resources.insert(id, spec);
    }

    /// Merges a partial spec into the resource under `id`, creating it when absent.
    ///
    /// Properties merge recursively, arrays become an ordered set union and
    /// `DependsOn` sets union. `Ref` and `Fn::*` values are compared whole.
    /// Two different scalars or references at the same path are a
    /// [`CoreError::MergeConflict`], so any sequence of successful merges
    /// produces the same result regardless of order.
    pub fn merge_resource(&mut self, id: impl Into<String>, partial: ResourceSpec) -> Result<()> {
        self.merge_resource_with(id.into(), partial, MergeMode::Commutative)
    }

    /// Like [`merge_resource`](Self::merge_resource) but the incoming value
    /// wins every scalar and array conflict. Used for user-supplied fragments,
    /// which are applied after all generated entries.
    pub fn override_resource(
        &mut self,
        id: impl Into<String>,
        partial: ResourceSpec,
    ) -> Result<()> {
        self.merge_resource_with(id.into(), partial, MergeMode::Override)
    }

    fn merge_resource_with(
        &mut self,
        id: String,
        partial: ResourceSpec,
        mode: MergeMode,
    ) -> Result<()> {
        self.ensure_not_in(Section::Outputs, &id, &partial.kind)?;
        let Some(existing) = self.resources.get_mut(&id) else {
            debug!(id = %id, kind = %partial.kind, "merge created resource");
            self.resources.insert(id, partial);
            return Ok(());
        };

        if existing.kind != partial.kind {
            if mode == MergeMode::Override {
                existing.kind = partial.kind;
            } else {
                return Err(CoreError::NamingCollision {
                    section: Section::Resources,
                    id,
                    existing_kind: existing.kind.clone(),
                    incoming_kind: partial.kind,
                });
            }
        }

        let mut path = vec!["Properties".to_string()];
        merge_maps(&mut existing.properties, partial.properties, mode, &mut path)
            .map_err(|path| CoreError::MergeConflict {
                id: id.clone(),
                path,
            })?;

        existing.depends_on.extend(partial.depends_on);

        match (existing.deletion_policy, partial.deletion_policy) {
            (_, None) => {}
            (None, incoming) => existing.deletion_policy = incoming,
            (Some(a), Some(b)) if a == b => {}
            (Some(_), incoming) => {
                if mode == MergeMode::Override {
                    existing.deletion_policy = incoming;
                } else {
                    return Err(CoreError::MergeConflict {
                        id,
                        path: "DeletionPolicy".to_string(),
                    });
                }
            }
        }

        debug!(id = %id, "merged resource");
        Ok(())
    }

    pub fn put_output(&mut self, id: impl Into<String>, spec: OutputSpec) -> Result<()> {
        let id = id.into();
        self.ensure_not_in(Section::Resources, &id, "Output")?;
        if let Some(existing) = self.outputs.get(&id) {
            if *existing == spec {
                return Ok(());
            }
            return Err(CoreError::NamingCollision {
                section: Section::Outputs,
                id,
                existing_kind: "Output".to_string(),
                incoming_kind: "Output".to_string(),
            });
        }
        self.outputs.insert(id, spec);
        Ok(())
    }

    /// Merges an output; the incoming value replaces scalars
    pub fn override_output(&mut self, id: impl Into<String>, spec: OutputSpec) -> Result<()> {
        let id = id.into();
        self.ensure_not_in(Section::Resources, &id, "Output")?;
        match self.outputs.get_mut(&id) {
            Some(existing) => {
                let mut path = vec!["Value".to_string()];
                merge_value(&mut existing.value, spec.value, MergeMode::Override, &mut path)
                    .map_err(|path| CoreError::MergeConflict {
                        id: id.clone(),
                        path,
                    })?;
                if spec.description.is_some() {
                    existing.description = spec.description;
                }
                if spec.export.is_some() {
                    existing.export = spec.export;
                }
            }
            None => {
                self.outputs.insert(id, spec);
            }
        }
        Ok(())
    }

    fn ensure_not_in(&self, section: Section, id: &str, incoming_kind: &str) -> Result<()> {
        let clash = match section {
            Section::Resources => self.resources.get(id).map(|r| r.kind.clone()),
            Section::Outputs => self.outputs.get(id).map(|_| "Output".to_string()),
        };
        match clash {
            Some(existing_kind) => Err(CoreError::NamingCollision {
                section,
                id: id.to_string(),
                existing_kind,
                incoming_kind: incoming_kind.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Checks that every `DependsOn` entry and every `Ref`/`Fn::GetAtt`/`Fn::Sub`
    /// target names a resource in this context
    pub fn validate(&self) -> Result<()> {
        for (id, spec) in &self.resources {
            for target in &spec.depends_on {
                if !self.resources.contains_key(target) {
                    return Err(CoreError::DanglingReference {
                        from: id.clone(),
                        to: target.clone(),
                    });
                }
            }
            let properties = Value::Object(spec.properties.clone());
            self.check_references(id, &properties)?;
        }
        for (id, output) in &self.outputs {
            self.check_references(id, &output.value)?;
        }
        Ok(())
    }

    fn check_references(&self, from: &str, value: &Value) -> Result<()> {
        for target in intrinsic::referenced_ids(value) {
            if !self.resources.contains_key(&target) {
                return Err(CoreError::DanglingReference {
                    from: from.to_string(),
                    to: target,
                });
            }
        }
        Ok(())
    }

    /// Validates and produces the read-only template
    pub fn freeze(&self) -> Result<CompiledTemplate> {
        self.validate()?;
        debug!(
            resources = self.resources.len(),
            outputs = self.outputs.len(),
            "froze compilation context"
        );
        Ok(CompiledTemplate {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description: self.description.clone(),
            resources: self.resources.clone(),
            outputs: self.outputs.clone(),
            bindings: BTreeMap::new(),
        })
    }
}

/// Values that are only known after part of a deployment has happened.
/// These are the only things that may be attached to a frozen template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LateBound {
    DeploymentBucketName,
}

impl LateBound {
    pub fn key(self) -> &'static str {
        match self {
            LateBound::DeploymentBucketName => "deploymentBucketName",
        }
    }
}

/// Frozen, serializable template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledTemplate {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,

    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "Resources", default)]
    resources: BTreeMap<String, ResourceSpec>,

    #[serde(rename = "Outputs", default, skip_serializing_if = "BTreeMap::is_empty")]
    outputs: BTreeMap<String, OutputSpec>,

    #[serde(skip)]
    bindings: BTreeMap<LateBound, String>,
}

impl CompiledTemplate {
    pub fn resources(&self) -> &BTreeMap<String, ResourceSpec> {
        &self.resources
    }

    pub fn outputs(&self) -> &BTreeMap<String, OutputSpec> {
        &self.outputs
    }

    pub fn resource(&self, id: &str) -> Option<&ResourceSpec> {
        self.resources.get(id)
    }

    pub fn bind(&mut self, key: LateBound, value: impl Into<String>) {
        self.bindings.insert(key, value.into());
    }

    pub fn binding(&self, key: LateBound) -> Option<&str> {
        self.bindings.get(&key).map(String::as_str)
    }

    pub fn bindings(&self) -> impl Iterator<Item = (LateBound, &str)> {
        self.bindings.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

fn merge_maps(
    target: &mut Map<String, Value>,
    incoming: Map<String, Value>,
    mode: MergeMode,
    path: &mut Vec<String>,
) -> std::result::Result<(), String> {
    for (key, value) in incoming {
        path.push(key.clone());
        match target.get_mut(&key) {
            Some(existing) => merge_value(existing, value, mode, path)?,
            None => {
                target.insert(key, value);
            }
        }
        path.pop();
    }
    Ok(())
}

/// `{ "Ref": .. }` or `{ "Fn::*": .. }`, which merges as a single value
fn is_intrinsic(map: &Map<String, Value>) -> bool {
    map.len() == 1
        && map
            .keys()
            .all(|key| key == "Ref" || key.starts_with("Fn::"))
}

fn merge_value(
    target: &mut Value,
    incoming: Value,
    mode: MergeMode,
    path: &mut Vec<String>,
) -> std::result::Result<(), String> {
    if *target == incoming {
        return Ok(());
    }
    match (target, incoming) {
        (Value::Object(existing), Value::Object(incoming))
            if !is_intrinsic(existing) && !is_intrinsic(&incoming) =>
        {
            merge_maps(existing, incoming, mode, path)
        }
        (Value::Array(existing), Value::Array(incoming)) if mode == MergeMode::Commutative => {
            existing.extend(incoming);
            existing.sort_by_cached_key(|item| item.to_string());
            existing.dedup();
            Ok(())
        }
        (existing, incoming) => {
            if *existing == incoming {
                Ok(())
            } else if mode == MergeMode::Override {
                *existing = incoming;
                Ok(())
            } else {
                Err(path.join("."))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intrinsic::{get_att, reference};
    use serde_json::json;

    fn role() -> ResourceSpec {
        ResourceSpec::new("AWS::IAM::Role").with_property("Path", json!("/"))
    }

    #[test]
    fn test_put_identical_is_noop() {
        let mut ctx = CompilationContext::new();
        ctx.put_resource("Role", role()).unwrap();
        ctx.put_resource("Role", role()).unwrap();
        assert_eq!(ctx.resources().len(), 1);
    }

    #[test]
    fn test_put_different_spec_collides() {
        let mut ctx = CompilationContext::new();
        ctx.put_resource("Role", role()).unwrap();
        let err = ctx
            .put_resource("Role", ResourceSpec::new("AWS::S3::Bucket"))
            .unwrap_err();
        assert!(matches!(err, CoreError::NamingCollision { ref id, .. } if id == "Role"));
    }

    #[test]
    fn test_ids_unique_across_sections() {
        let mut ctx = CompilationContext::new();
        ctx.put_resource("Bucket", ResourceSpec::new("AWS::S3::Bucket"))
            .unwrap();
        let err = ctx
            .put_output("Bucket", OutputSpec::new(reference("Bucket")))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::NamingCollision {
                section: Section::Resources,
                ..
            }
        ));
    }

    #[test]
    fn test_put_or_replace_last_write_wins() {
        let mut ctx = CompilationContext::new();
        ctx.put_resource("Role", role()).unwrap();
        ctx.put_or_replace_resource("Role", ResourceSpec::new("AWS::S3::Bucket"));
        assert_eq!(ctx.resource("Role").unwrap().kind, "AWS::S3::Bucket");
    }

    #[test]
    fn test_merge_is_order_independent() {
        let a = ResourceSpec::new("AWS::IAM::Role")
            .with_property("ManagedPolicyArns", json!(["arn:b"]))
            .with_property("Tags", json!({ "team": "core" }))
            .depends_on("LogGroupA");
        let b = ResourceSpec::new("AWS::IAM::Role")
            .with_property("ManagedPolicyArns", json!(["arn:a", "arn:b"]))
            .with_property("Tags", json!({ "stage": "dev" }))
            .depends_on("LogGroupB");
        let c = ResourceSpec::new("AWS::IAM::Role").with_property("Path", json!("/"));

        let mut forward = CompilationContext::new();
        for spec in [a.clone(), b.clone(), c.clone()] {
            forward.merge_resource("Role", spec).unwrap();
        }
        let mut backward = CompilationContext::new();
        for spec in [c, b, a] {
            backward.merge_resource("Role", spec).unwrap();
        }

        let merged = forward.resource("Role").unwrap();
        assert_eq!(merged, backward.resource("Role").unwrap());
        assert_eq!(merged.properties["ManagedPolicyArns"], json!(["arn:a", "arn:b"]));
        assert_eq!(merged.properties["Tags"], json!({ "stage": "dev", "team": "core" }));
        assert_eq!(merged.depends_on.len(), 2);
    }

    #[test]
    fn test_merge_scalar_conflict() {
        let mut ctx = CompilationContext::new();
        ctx.merge_resource("Role", role()).unwrap();
        let err = ctx
            .merge_resource(
                "Role",
                ResourceSpec::new("AWS::IAM::Role").with_property("Path", json!("/other/")),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::MergeConflict { ref path, .. } if path == "Properties.Path"));
    }

    #[test]
    fn test_merge_same_spec_keeps_references() {
        let permission = ResourceSpec::new("AWS::Lambda::Permission")
            .with_property("SourceArn", get_att("Queue", "Arn"))
            .with_property("Principal", json!("sqs.amazonaws.com"));

        let mut ctx = CompilationContext::new();
        ctx.merge_resource("Perm", permission.clone()).unwrap();
        ctx.merge_resource("Perm", permission.clone()).unwrap();

        assert_eq!(ctx.resource("Perm").unwrap(), &permission);
        assert_eq!(
            ctx.resource("Perm").unwrap().properties["SourceArn"],
            json!({ "Fn::GetAtt": ["Queue", "Arn"] })
        );
    }

    #[test]
    fn test_merge_different_references_conflict() {
        let mut ctx = CompilationContext::new();
        ctx.merge_resource(
            "Perm",
            ResourceSpec::new("AWS::Lambda::Permission")
                .with_property("SourceArn", get_att("Queue", "Arn")),
        )
        .unwrap();
        let err = ctx
            .merge_resource(
                "Perm",
                ResourceSpec::new("AWS::Lambda::Permission")
                    .with_property("SourceArn", get_att("Topic", "Arn")),
            )
            .unwrap_err();
        assert!(
            matches!(err, CoreError::MergeConflict { ref path, .. } if path == "Properties.SourceArn")
        );
    }

    #[test]
    fn test_merge_arrays_with_duplicates_is_order_independent() {
        let first = ResourceSpec::new("AWS::IAM::Role")
            .with_property("ManagedPolicyArns", json!(["arn:a", "arn:a"]));
        let second =
            ResourceSpec::new("AWS::IAM::Role").with_property("ManagedPolicyArns", json!(["arn:b"]));

        let mut forward = CompilationContext::new();
        forward.merge_resource("Role", first.clone()).unwrap();
        forward.merge_resource("Role", second.clone()).unwrap();
        let mut backward = CompilationContext::new();
        backward.merge_resource("Role", second).unwrap();
        backward.merge_resource("Role", first).unwrap();

        let merged = forward.resource("Role").unwrap();
        assert_eq!(merged, backward.resource("Role").unwrap());
        assert_eq!(merged.properties["ManagedPolicyArns"], json!(["arn:a", "arn:b"]));
    }

    #[test]
    fn test_override_incoming_wins() {
        let mut ctx = CompilationContext::new();
        ctx.put_resource(
            "Role",
            role().with_property("ManagedPolicyArns", json!(["arn:a"])),
        )
        .unwrap();
        ctx.override_resource(
            "Role",
            ResourceSpec::new("AWS::IAM::Role")
                .with_property("Path", json!("/custom/"))
                .with_property("ManagedPolicyArns", json!(["arn:z"])),
        )
        .unwrap();

        let merged = ctx.resource("Role").unwrap();
        assert_eq!(merged.properties["Path"], json!("/custom/"));
        assert_eq!(merged.properties["ManagedPolicyArns"], json!(["arn:z"]));
    }

    #[test]
    fn test_freeze_rejects_dangling_reference() {
        let mut ctx = CompilationContext::new();
        ctx.put_resource(
            "Fn",
            ResourceSpec::new("AWS::Lambda::Function").with_property("Role", get_att("Role", "Arn")),
        )
        .unwrap();
        let err = ctx.freeze().unwrap_err();
        assert!(matches!(err, CoreError::DanglingReference { ref to, .. } if to == "Role"));

        ctx.put_resource("Role", role()).unwrap();
        assert!(ctx.freeze().is_ok());
    }

    #[test]
    fn test_freeze_rejects_dangling_depends_on() {
        let mut ctx = CompilationContext::new();
        ctx.put_resource("Fn", ResourceSpec::new("AWS::Lambda::Function").depends_on("Missing"))
            .unwrap();
        assert!(matches!(
            ctx.freeze(),
            Err(CoreError::DanglingReference { .. })
        ));
    }

    #[test]
    fn test_pseudo_parameters_are_not_dangling() {
        let mut ctx = CompilationContext::new();
        ctx.put_resource(
            "Bucket",
            ResourceSpec::new("AWS::S3::Bucket")
                .with_property("BucketName", json!({ "Fn::Sub": "logs-${AWS::AccountId}" })),
        )
        .unwrap();
        assert!(ctx.freeze().is_ok());
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let build = |order: &[&str]| {
            let mut ctx = CompilationContext::new().with_description("test");
            for id in order {
                ctx.put_resource(
                    *id,
                    ResourceSpec::new("AWS::Logs::LogGroup")
                        .with_property("LogGroupName", json!(format!("/aws/lambda/{id}"))),
                )
                .unwrap();
            }
            ctx.freeze().unwrap().to_json().unwrap()
        };

        let first = build(&["B", "A", "C"]);
        assert_eq!(first, build(&["C", "B", "A"]));
        assert!(first.starts_with(r#"{"AWSTemplateFormatVersion":"2010-09-09""#));
    }

    #[test]
    fn test_late_bound_values_are_not_serialized() {
        let mut template = CompilationContext::new().freeze().unwrap();
        template.bind(LateBound::DeploymentBucketName, "bucket-123");
        assert_eq!(template.binding(LateBound::DeploymentBucketName), Some("bucket-123"));
        assert!(!template.to_json().unwrap().contains("bucket-123"));
    }
}
