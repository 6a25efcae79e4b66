//! Freezes the compiled template and writes the build artifacts

use crate::context::CommandContext;
use crate::error::{AwsError, Result};
use stackflow_core::{Entity, ServiceState};
use tracing::info;

pub async fn write_artifacts(ctx: &mut CommandContext) -> Result<()> {
    let core = ctx
        .core_template
        .clone()
        .ok_or_else(|| AwsError::NotPackaged("core template was not compiled".to_string()))?;
    let compiled = ctx.template.freeze()?;

    let state = ServiceState::new(
        ctx.service.service.clone(),
        ctx.stage(),
        ctx.region(),
        ctx.stack_name(),
    );

    ctx.store.save(&Entity::CoreTemplate(core)).await?;
    let path = ctx
        .store
        .save(&Entity::CompiledTemplate(compiled.clone()))
        .await?;
    ctx.store.save(&Entity::ServiceState(state.clone())).await?;

    info!(
        resources = compiled.resources().len(),
        "Packaged service into {}",
        path.display()
    );
    ctx.compiled = Some(compiled);
    ctx.state = Some(state);
    Ok(())
}

/// Templates from the current run, or from the last `package` on disk
pub async fn load_packaged(ctx: &mut CommandContext) -> Result<()> {
    if ctx.core_template.is_none() {
        ctx.core_template = ctx
            .store
            .load_template(stackflow_core::EntityKind::CoreTemplate)
            .await?;
    }
    if ctx.compiled.is_none() {
        ctx.compiled = ctx
            .store
            .load_template(stackflow_core::EntityKind::CompiledTemplate)
            .await?;
    }
    if ctx.state.is_none() {
        ctx.state = ctx.store.load_state().await?;
    }

    if ctx.core_template.is_none() || ctx.compiled.is_none() {
        return Err(AwsError::NotPackaged(format!(
            "no templates in {}, run `stackflow package` first",
            ctx.store.dir().display()
        )));
    }
    Ok(())
}
