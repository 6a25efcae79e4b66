//! Command table and provider-independent hooks

use colored::Colorize;
use stackflow_aws::CommandContext;
use stackflow_lifecycle::{CommandSpec, OptionSpec, Plugin, PluginRegistry};

/// Lifecycle events of `package`, in order
pub const PACKAGE_EVENTS: [&str; 8] = [
    "cleanup",
    "initialize",
    "setupProviderConfiguration",
    "createDeploymentArtifacts",
    "compileLayers",
    "compileFunctions",
    "compileEvents",
    "finalize",
];

fn stage_option() -> OptionSpec {
    OptionSpec::new("stage", "Stage of the service")
}

fn region_option() -> OptionSpec {
    OptionSpec::new("region", "Region of the service")
}

async fn clean_artifacts(ctx: &mut CommandContext) -> anyhow::Result<()> {
    ctx.store.clean().await?;
    Ok(())
}

async fn print_template(ctx: &mut CommandContext) -> anyhow::Result<()> {
    let template = ctx
        .compiled
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("nothing was compiled"))?;
    let rendered = match ctx.options.get("format").map(String::as_str) {
        Some("yaml") => serde_yaml::to_string(template)?,
        Some("json") | None => template.to_json_pretty()?,
        Some(other) => anyhow::bail!("unsupported format '{other}', use json or yaml"),
    };
    println!("{rendered}");
    Ok(())
}

async fn print_package_summary(ctx: &mut CommandContext) -> anyhow::Result<()> {
    if let Some(template) = &ctx.compiled {
        println!(
            "{} {} ({} resources)",
            "✓ Packaged".green().bold(),
            ctx.service.service.cyan(),
            template.resources().len()
        );
        println!("  {}", ctx.store.dir().display());
    }
    Ok(())
}

async fn print_deploy_summary(ctx: &mut CommandContext) -> anyhow::Result<()> {
    println!(
        "{} {} to stage {}",
        "✓ Deployed".green().bold(),
        ctx.service.service.cyan(),
        ctx.stage().cyan()
    );
    println!("  stack: {}", ctx.stack_name());
    let functions: Vec<String> = ctx
        .service
        .functions
        .keys()
        .map(|key| ctx.deployed_function_name(key))
        .collect();
    if !functions.is_empty() {
        println!("  functions:");
        for name in functions {
            println!("    - {}", name);
        }
    }
    Ok(())
}

async fn print_remove_summary(ctx: &mut CommandContext) -> anyhow::Result<()> {
    println!(
        "{} {}",
        "✓ Removed".green().bold(),
        ctx.stack_name().cyan()
    );
    Ok(())
}

async fn print_stack_info(ctx: &mut CommandContext) -> anyhow::Result<()> {
    let Some(info) = &ctx.stack_info else {
        return Ok(());
    };
    println!("{}", "Service Information".bold());
    println!("  service: {}", ctx.service.service.cyan());
    println!("  stage:   {}", ctx.stage());
    println!("  region:  {}", ctx.region());
    println!("  stack:   {}", info.stack_name);
    println!("  status:  {}", info.status);
    if !info.outputs.is_empty() {
        println!("  outputs:");
        for (key, value) in &info.outputs {
            println!("    {}: {}", key, value);
        }
    }
    Ok(())
}

/// Declares every command and the hooks that do not talk to a provider
pub fn core_plugin() -> Plugin<CommandContext> {
    Plugin::<CommandContext>::new("Core")
        .command(
            CommandSpec::new("package")
                .usage("Packages the service into CloudFormation templates")
                .events(PACKAGE_EVENTS)
                .option(stage_option())
                .option(region_option()),
        )
        .command(
            CommandSpec::new("deploy")
                .usage("Deploys the service")
                .events(["deploy", "finalize"])
                .extends("package"),
        )
        .command(
            CommandSpec::new("remove")
                .usage("Removes the deployed stack")
                .events(["remove"])
                .option(stage_option())
                .option(region_option()),
        )
        .command(
            CommandSpec::new("info")
                .usage("Displays information about the deployed stack")
                .events(["info"])
                .option(stage_option())
                .option(region_option()),
        )
        .command(
            CommandSpec::new("print")
                .usage("Prints the compiled template")
                .events(["print"])
                .option(
                    OptionSpec::new("format", "Output format: json or yaml").default_value("json"),
                )
                .extends("package"),
        )
        .hook("package:cleanup", |ctx| Box::pin(clean_artifacts(ctx)))
        .hook("print:print", |ctx| Box::pin(print_template(ctx)))
        .hook("after:info:info", |ctx| Box::pin(print_stack_info(ctx)))
        .hook("after:deploy:finalize", |ctx| {
            Box::pin(print_deploy_summary(ctx))
        })
        .hook("after:remove:remove", |ctx| {
            Box::pin(print_remove_summary(ctx))
        })
}

/// Summary printed when `package` is run on its own
pub fn package_summary_plugin() -> Plugin<CommandContext> {
    Plugin::<CommandContext>::new("PackageSummary")
        .hook("after:package:finalize", |ctx| {
            Box::pin(print_package_summary(ctx))
        })
}

/// Registry holding the core plugin followed by the provider's plugins
pub fn registry(provider: &str, command: &str) -> anyhow::Result<PluginRegistry<CommandContext>> {
    let mut registry = PluginRegistry::for_provider(provider);
    registry.register(core_plugin())?;
    if command == "package" {
        registry.register(package_summary_plugin())?;
    }

    let mut skipped = Vec::new();
    for plugin in stackflow_aws::plugins() {
        let name = plugin.name().to_string();
        if !registry.register(plugin)? {
            skipped.push(name);
        }
    }
    if !skipped.is_empty() {
        tracing::warn!(
            provider,
            "provider has no built-in support, skipped {}",
            skipped.join(", ")
        );
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_runs_package_first() {
        let registry = registry("aws", "deploy").unwrap();
        let pipeline = registry.pipeline("deploy").unwrap();
        let events = pipeline.events();
        assert_eq!(events.first().map(String::as_str), Some("package:cleanup"));
        assert_eq!(events.last().map(String::as_str), Some("deploy:finalize"));
        assert_eq!(events.len(), PACKAGE_EVENTS.len() + 2);
    }

    #[test]
    fn test_print_format_defaults_to_json() {
        let registry = registry("aws", "print").unwrap();
        let pipeline = registry.pipeline("print").unwrap();
        let format = pipeline
            .options()
            .iter()
            .find(|option| option.name == "format")
            .unwrap();
        assert_eq!(format.default.as_deref(), Some("json"));
    }

    #[test]
    fn test_other_provider_skips_aws_plugins() {
        let registry = registry("azure", "package").unwrap();
        assert_eq!(registry.plugin_names(), ["Core", "PackageSummary"]);
    }
}
