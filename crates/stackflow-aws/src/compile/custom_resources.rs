//! User-supplied `resources:` fragments
//!
//! Applied after every generated entry. A fragment for an existing id is
//! merged over it with the user's values winning, and may leave out `Type`.

use crate::context::CommandContext;
use crate::error::Result;
use serde_json::Value;
use stackflow_core::{CoreError, OutputSpec, ResourceSpec};
use tracing::debug;

pub fn compile(ctx: &mut CommandContext) -> Result<()> {
    let fragments = ctx.service.resources.clone();

    for (id, mut fragment) in fragments.resources {
        if let Value::Object(map) = &mut fragment {
            if !map.contains_key("Type") {
                let existing = ctx.template.resource(&id).ok_or_else(|| CoreError::InvalidSpec {
                    id: id.clone(),
                    message: "custom resource needs a 'Type'".to_string(),
                })?;
                map.insert("Type".to_string(), Value::String(existing.kind.clone()));
            }
        }
        let spec = ResourceSpec::from_value(&id, fragment)?;
        debug!(id = %id, kind = %spec.kind, "applying custom resource");
        ctx.template.override_resource(id, spec)?;
    }

    for (id, fragment) in fragments.outputs {
        let spec = OutputSpec::from_value(&id, fragment)?;
        ctx.template.override_output(id, spec)?;
    }
    Ok(())
}
