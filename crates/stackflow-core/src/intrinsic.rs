//! Intrinsic function helpers
//!
//! Builders for `Ref`, `Fn::GetAtt`, `Fn::Join` and `Fn::Sub` values, and a
//! scanner that collects the logical ids a value refers to.

use serde_json::{Value, json};
use std::collections::BTreeSet;

/// `{ "Ref": id }`
pub fn reference(id: &str) -> Value {
    json!({ "Ref": id })
}

/// `{ "Fn::GetAtt": [id, attribute] }`
pub fn get_att(id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [id, attribute] })
}

/// `{ "Fn::Join": [separator, parts] }`
pub fn join(separator: &str, parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": [separator, parts] })
}

/// `{ "Fn::Sub": template }`
pub fn sub(template: &str) -> Value {
    json!({ "Fn::Sub": template })
}

/// Whether `id` is a pseudo parameter such as `AWS::Region`
pub fn is_pseudo_parameter(id: &str) -> bool {
    id.starts_with("AWS::")
}

/// Logical ids referenced anywhere inside `value`, pseudo parameters excluded
pub fn referenced_ids(value: &Value) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();
    collect(value, &mut ids);
    ids
}

fn collect(value: &Value, ids: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(id)) = map.get("Ref") {
                push(id, ids);
            }
            if let Some(target) = map.get("Fn::GetAtt") {
                match target {
                    Value::Array(parts) => {
                        if let Some(Value::String(id)) = parts.first() {
                            push(id, ids);
                        }
                    }
                    // short form "Resource.Attribute"
                    Value::String(dotted) => {
                        if let Some((id, _)) = dotted.split_once('.') {
                            push(id, ids);
                        }
                    }
                    _ => {}
                }
            }
            if let Some(template) = map.get("Fn::Sub") {
                let text = match template {
                    Value::String(text) => Some(text.as_str()),
                    Value::Array(parts) => parts.first().and_then(Value::as_str),
                    _ => None,
                };
                if let Some(text) = text {
                    let locals = sub_locals(template);
                    for id in sub_placeholders(text) {
                        if !locals.contains(&id) {
                            push(&id, ids);
                        }
                    }
                }
            }
            for nested in map.values() {
                collect(nested, ids);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect(item, ids);
            }
        }
        _ => {}
    }
}

fn push(id: &str, ids: &mut BTreeSet<String>) {
    if !is_pseudo_parameter(id) {
        ids.insert(id.to_string());
    }
}

/// Variables defined by the second element of the array form of `Fn::Sub`
fn sub_locals(template: &Value) -> BTreeSet<String> {
    template
        .as_array()
        .and_then(|parts| parts.get(1))
        .and_then(Value::as_object)
        .map(|vars| vars.keys().cloned().collect())
        .unwrap_or_default()
}

/// Resource ids named by `${Id}` / `${Id.Attr}` placeholders; `${!Literal}` is skipped
fn sub_placeholders(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        let inner = &after[..end];
        if !inner.starts_with('!') {
            let id = inner.split('.').next().unwrap_or(inner);
            if !id.is_empty() {
                found.push(id.to_string());
            }
        }
        rest = &after[end + 1..];
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        assert_eq!(reference("Bucket"), json!({ "Ref": "Bucket" }));
        assert_eq!(
            get_att("Fn", "Arn"),
            json!({ "Fn::GetAtt": ["Fn", "Arn"] })
        );
        assert_eq!(
            join("", vec![json!("a"), reference("B")]),
            json!({ "Fn::Join": ["", ["a", { "Ref": "B" }]] })
        );
    }

    #[test]
    fn test_referenced_ids() {
        let value = json!({
            "Role": get_att("IamRole", "Arn"),
            "Bucket": { "Ref": "Bucket" },
            "Region": { "Ref": "AWS::Region" },
            "Short": { "Fn::GetAtt": "Queue.Arn" },
            "Arn": sub("arn:${AWS::Partition}:s3:::${Bucket}/${Other.Name}/${!Literal}"),
            "Local": { "Fn::Sub": ["${Var}-${Topic}", { "Var": "x" }] },
            "List": [reference("Nested")]
        });

        let ids: Vec<String> = referenced_ids(&value).into_iter().collect();
        assert_eq!(ids, vec!["Bucket", "IamRole", "Nested", "Other", "Queue", "Topic"]);
    }
}
