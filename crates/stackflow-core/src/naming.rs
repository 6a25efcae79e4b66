//! Logical id naming
//!
//! Pure functions mapping function names, event ordinals and resource kinds to
//! the logical ids used in compiled templates. Every id produced here is
//! alphanumeric and stable for the same input.

use std::fmt;

pub const DEPLOYMENT_BUCKET_ID: &str = "ServerlessDeploymentBucket";
pub const DEPLOYMENT_BUCKET_POLICY_ID: &str = "ServerlessDeploymentBucketPolicy";
pub const DEPLOYMENT_BUCKET_OUTPUT_ID: &str = "ServerlessDeploymentBucketName";
pub const LAMBDA_EXECUTION_ROLE_ID: &str = "IamRoleLambdaExecution";

/// Prefix of every log group AWS Lambda writes to
pub const LAMBDA_LOG_GROUP_PREFIX: &str = "/aws/lambda/";

/// Kinds of generated resources that derive their id from a function name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    LambdaFunction,
    LogGroup,
    ScheduleRule,
    SchedulePermission,
    LogSubscriptionFilter,
    LogSubscriptionPermission,
}

impl ResourceKind {
    /// Whether ids of this kind carry an event ordinal
    pub fn is_ordinal(self) -> bool {
        matches!(
            self,
            ResourceKind::ScheduleRule
                | ResourceKind::SchedulePermission
                | ResourceKind::LogSubscriptionFilter
        )
    }

    fn suffix(self) -> &'static str {
        match self {
            ResourceKind::LambdaFunction => "LambdaFunction",
            ResourceKind::LogGroup => "LogGroup",
            ResourceKind::ScheduleRule => "EventsRuleSchedule",
            ResourceKind::SchedulePermission => "LambdaPermissionEventsRuleSchedule",
            ResourceKind::LogSubscriptionFilter => "LogsSubscriptionFilterCloudWatchLog",
            ResourceKind::LogSubscriptionPermission => {
                "LambdaPermissionLogsSubscriptionFilterCloudWatchLog"
            }
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Logical id for `kind` derived from `base` (a function name).
///
/// `disambiguator` is the 1-based event ordinal for ordinal kinds and is
/// ignored otherwise.
pub fn logical_id(kind: ResourceKind, base: &str, disambiguator: Option<u32>) -> String {
    let mut id = normalize_function_name(base);
    id.push_str(kind.suffix());
    if kind.is_ordinal() {
        if let Some(ordinal) = disambiguator {
            id.push_str(&ordinal.to_string());
        }
    }
    id
}

/// Upper-cases the first character
pub fn normalize_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Spells out `-` and `_`, drops anything else that is not alphanumeric,
/// then upper-cases the first character
pub fn normalize_name_to_alphanumeric(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '-' => out.push_str("Dash"),
            '_' => out.push_str("Underscore"),
            c if c.is_ascii_alphanumeric() => out.push(c),
            _ => {}
        }
    }
    normalize_name(&out)
}

pub fn normalize_function_name(function_name: &str) -> String {
    normalize_name_to_alphanumeric(function_name)
}

pub fn lambda_logical_id(function_name: &str) -> String {
    logical_id(ResourceKind::LambdaFunction, function_name, None)
}

pub fn log_group_logical_id(function_name: &str) -> String {
    logical_id(ResourceKind::LogGroup, function_name, None)
}

pub fn log_group_name(deployed_function_name: &str) -> String {
    format!("{LAMBDA_LOG_GROUP_PREFIX}{deployed_function_name}")
}

pub fn schedule_logical_id(function_name: &str, ordinal: u32) -> String {
    logical_id(ResourceKind::ScheduleRule, function_name, Some(ordinal))
}

pub fn lambda_schedule_permission_logical_id(function_name: &str, ordinal: u32) -> String {
    logical_id(ResourceKind::SchedulePermission, function_name, Some(ordinal))
}

pub fn cloudwatch_log_logical_id(function_name: &str, ordinal: u32) -> String {
    logical_id(ResourceKind::LogSubscriptionFilter, function_name, Some(ordinal))
}

/// One permission per function covers all of its log subscriptions
pub fn lambda_cloudwatch_log_permission_logical_id(function_name: &str) -> String {
    logical_id(ResourceKind::LogSubscriptionPermission, function_name, None)
}

/// Default stack name: `{service}-{stage}`
pub fn stack_name(service: &str, stage: &str) -> String {
    format!("{service}-{stage}")
}

/// Shortest pattern ending in `*` that covers every input log group.
///
/// Bare names are first expanded with the Lambda log group prefix. A single
/// input, or identical inputs, are returned unchanged. The common prefix is
/// taken character by character, and a trailing `*` already present in it is
/// absorbed so the result never ends in `**`.
pub fn longest_common_wildcard_prefix<S: AsRef<str>>(inputs: &[S]) -> String {
    let groups: Vec<String> = inputs
        .iter()
        .map(|input| expand_log_group(input.as_ref()))
        .collect();

    let Some((first, rest)) = groups.split_first() else {
        return String::new();
    };
    if rest.iter().all(|group| group == first) {
        return first.clone();
    }

    let mut prefix_len = first.len();
    for group in rest {
        prefix_len = first
            .char_indices()
            .zip(group.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map(|((i, c), _)| i + c.len_utf8())
            .unwrap_or(0)
            .min(prefix_len);
    }

    let prefix = first[..prefix_len].trim_end_matches('*');
    format!("{prefix}*")
}

fn expand_log_group(input: &str) -> String {
    if input.starts_with('/') {
        input.to_string()
    } else {
        log_group_name(input)
    }
}
