//! `schedule` events: an EventBridge rule plus an invoke permission per rate

use super::function_arn;
use crate::context::CommandContext;
use crate::error::{AwsError, Result};
use regex::Regex;
use serde_json::{Value, json};
use stackflow_core::{ResourceSpec, ScheduleEvent, intrinsic, naming};
use std::sync::LazyLock;
use tracing::debug;

static RATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^rate\((?:1 (?:minute|hour|day)|(?:1\d+|[2-9]\d*) (?:minute|hour|day)s)\)$")
        .expect("valid rate pattern")
});

static CRON_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^cron\(\S+ \S+ \S+ \S+ \S+ \S+\)$").expect("valid cron pattern")
});

pub fn is_valid_expression(expression: &str) -> bool {
    RATE_PATTERN.is_match(expression) || CRON_PATTERN.is_match(expression)
}

/// Ordinals count every rate of a function, across all of its schedule
/// events, starting at 1.
pub fn compile(ctx: &mut CommandContext) -> Result<()> {
    let mut entries = Vec::new();

    for (function_key, function) in &ctx.service.functions {
        let mut ordinal = 0u32;
        for event in &function.events {
            let Some(schedule) = &event.schedule else {
                continue;
            };
            let rates = schedule.rates();
            if rates.is_empty() {
                return Err(AwsError::invalid_event(
                    function_key,
                    "schedule",
                    "a rate or cron expression is required",
                ));
            }
            if let Some(config) = schedule.config() {
                if config.name.is_some() && rates.len() > 1 {
                    return Err(AwsError::invalid_event(
                        function_key,
                        "schedule",
                        "'name' cannot be used with more than one rate",
                    ));
                }
            }

            for rate in rates {
                if !is_valid_expression(&rate) {
                    return Err(AwsError::invalid_event(
                        function_key,
                        "schedule",
                        format!("'{rate}' is not a valid rate or cron expression"),
                    ));
                }
                ordinal += 1;
                entries.push(schedule_entries(function_key, schedule, &rate, ordinal));
            }
        }
    }

    for (rule_id, rule, permission_id, permission) in entries {
        debug!(rule = %rule_id, "compiled schedule");
        ctx.template.put_resource(rule_id, rule)?;
        ctx.template.put_resource(permission_id, permission)?;
    }
    Ok(())
}

fn schedule_entries(
    function_key: &str,
    schedule: &ScheduleEvent,
    rate: &str,
    ordinal: u32,
) -> (String, ResourceSpec, String, ResourceSpec) {
    let rule_id = naming::schedule_logical_id(function_key, ordinal);
    let config = schedule.config();

    let enabled = config.and_then(|c| c.enabled).unwrap_or(true);
    let mut target = json!({
        "Arn": function_arn(function_key),
        "Id": format!("{}Schedule", naming::normalize_function_name(function_key)),
    });
    if let Some(input) = config.and_then(|c| c.input.as_ref()) {
        let input = match input {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        };
        target["Input"] = json!(input);
    }

    let mut rule = ResourceSpec::new("AWS::Events::Rule")
        .with_property("ScheduleExpression", json!(rate))
        .with_property("State", json!(if enabled { "ENABLED" } else { "DISABLED" }))
        .with_property("Targets", json!([target]));
    if let Some(name) = config.and_then(|c| c.name.as_ref()) {
        rule = rule.with_property("Name", json!(name));
    }
    if let Some(description) = config.and_then(|c| c.description.as_ref()) {
        rule = rule.with_property("Description", json!(description));
    }

    let permission = ResourceSpec::new("AWS::Lambda::Permission")
        .with_property("FunctionName", function_arn(function_key))
        .with_property("Action", json!("lambda:InvokeFunction"))
        .with_property("Principal", json!("events.amazonaws.com"))
        .with_property("SourceArn", intrinsic::get_att(&rule_id, "Arn"));

    (
        rule_id,
        rule,
        naming::lambda_schedule_permission_logical_id(function_key, ordinal),
        permission,
    )
}
