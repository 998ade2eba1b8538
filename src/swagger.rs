//! Swagger 2.0 Downgrade
//!
//! Rewrites 3.0 operation shapes into their 2.0 equivalents. Content with no
//! 2.0 form (links, callbacks, operation-level servers, components other than
//! schemas/parameters/responses/securitySchemes) is dropped.

use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::document::Components;

const HTTP_METHODS: [&str; 7] = ["get", "put", "post", "delete", "options", "head", "patch"];
const FORM_MEDIA_TYPES: [&str; 2] = ["application/x-www-form-urlencoded", "multipart/form-data"];

const SCHEMA_REF: &str = "#/components/schemas/";
const REQUEST_BODY_REF: &str = "#/components/requestBodies/";
const REF_REWRITES: [(&str, &str); 3] = [
    (SCHEMA_REF, "#/definitions/"),
    ("#/components/parameters/", "#/parameters/"),
    ("#/components/responses/", "#/responses/"),
];

/// Schema keywords a non-body parameter or header carries inline in 2.0.
const INLINE_SCHEMA_KEYS: [&str; 16] = [
    "type", "format", "items", "enum", "default", "minimum", "maximum",
    "exclusiveMinimum", "exclusiveMaximum", "minLength", "maxLength", "pattern",
    "minItems", "maxItems", "uniqueItems", "multipleOf",
];

/// 3.0 parameter keys that have no 2.0 counterpart.
const DROPPED_PARAMETER_KEYS: [&str; 7] =
    ["schema", "style", "explode", "allowReserved", "example", "examples", "content"];

pub(crate) fn convert_paths(
    paths: &BTreeMap<String, Value>,
    components: &Components,
) -> BTreeMap<String, Value> {
    paths
        .iter()
        .map(|(path, item)| (path.clone(), rewrite_refs(&convert_path_item(item, components))))
        .collect()
}

pub(crate) fn convert_definitions(components: &Components) -> BTreeMap<String, Value> {
    components
        .schemas
        .iter()
        .map(|(k, v)| (k.clone(), rewrite_refs(v)))
        .collect()
}

/// `components.parameters` -> top-level `parameters`.
pub(crate) fn convert_shared_parameters(components: &Components) -> BTreeMap<String, Value> {
    shared(components, "parameters")
        .map(|(k, v)| (k.clone(), rewrite_refs(&convert_parameter(v, components))))
        .collect()
}

/// `components.responses` -> top-level `responses`.
pub(crate) fn convert_shared_responses(components: &Components) -> BTreeMap<String, Value> {
    let mut produces = BTreeSet::new();
    shared(components, "responses")
        .map(|(k, v)| (k.clone(), rewrite_refs(&convert_response(v, &mut produces))))
        .collect()
}

fn shared<'a>(components: &'a Components, kind: &str) -> impl Iterator<Item = (&'a String, &'a Value)> {
    components
        .extra
        .get(kind)
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|m| m.iter())
}

fn convert_path_item(item: &Value, components: &Components) -> Value {
    let Some(item) = item.as_object() else {
        return item.clone();
    };

    let mut out = Map::new();
    for (key, value) in item {
        let k = key.as_str();
        if HTTP_METHODS.contains(&k) {
            out.insert(key.clone(), convert_operation(value, components));
        } else if k == "parameters" {
            out.insert(key.clone(), convert_parameter_list(value, components));
        } else if k == "$ref" || k.starts_with("x-") {
            out.insert(key.clone(), value.clone());
        }
    }
    Value::Object(out)
}

fn convert_operation(operation: &Value, components: &Components) -> Value {
    let Some(operation) = operation.as_object() else {
        return operation.clone();
    };

    let mut parameters: Vec<Value> = match operation.get("parameters") {
        Some(Value::Array(list)) => list.iter().map(|p| convert_parameter(p, components)).collect(),
        _ => vec![],
    };
    let mut consumes = BTreeSet::new();
    let mut produces = BTreeSet::new();

    if let Some(body) = operation
        .get("requestBody")
        .and_then(|b| resolve_request_body(b, components))
    {
        parameters.extend(body_parameters(body, components, &mut consumes));
    }

    let mut out = Map::new();
    for (key, value) in operation {
        match key.as_str() {
            "parameters" | "requestBody" | "servers" | "callbacks" => {}
            "responses" => {
                out.insert(key.clone(), convert_responses(value, &mut produces));
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }

    if !consumes.is_empty() {
        out.insert("consumes".to_string(), json!(consumes));
    }
    if !produces.is_empty() {
        out.insert("produces".to_string(), json!(produces));
    }
    if !parameters.is_empty() {
        out.insert("parameters".to_string(), Value::Array(parameters));
    }
    Value::Object(out)
}

fn resolve_request_body<'a>(body: &'a Value, components: &'a Components) -> Option<&'a Value> {
    match body.get("$ref").and_then(Value::as_str) {
        Some(target) => {
            let name = target.strip_prefix(REQUEST_BODY_REF)?;
            components.extra.get("requestBodies")?.get(name)
        }
        None => Some(body),
    }
}

fn resolve_schema<'a>(schema: &'a Value, components: &'a Components) -> &'a Value {
    schema
        .get("$ref")
        .and_then(Value::as_str)
        .and_then(|target| target.strip_prefix(SCHEMA_REF))
        .and_then(|name| components.schemas.get(name))
        .unwrap_or(schema)
}

fn body_parameters(
    body: &Value,
    components: &Components,
    consumes: &mut BTreeSet<String>,
) -> Vec<Value> {
    let Some(content) = body.get("content").and_then(Value::as_object) else {
        return vec![];
    };
    consumes.extend(content.keys().cloned());

    if let Some(media) = content
        .iter()
        .find(|(media_type, _)| FORM_MEDIA_TYPES.contains(&media_type.as_str()))
        .map(|(_, media)| media)
    {
        return match media.get("schema") {
            Some(schema) => form_parameters(resolve_schema(schema, components)),
            None => vec![],
        };
    }

    let schema = content
        .values()
        .find_map(|media| media.get("schema"))
        .cloned()
        .unwrap_or_else(|| json!({}));

    let mut param = Map::new();
    param.insert("name".to_string(), body.get("x-bodyName").cloned().unwrap_or_else(|| json!("body")));
    param.insert("in".to_string(), json!("body"));
    if let Some(description) = body.get("description") {
        param.insert("description".to_string(), description.clone());
    }
    param.insert("required".to_string(), body.get("required").cloned().unwrap_or(json!(false)));
    param.insert("schema".to_string(), schema);
    vec![Value::Object(param)]
}

fn form_parameters(schema: &Value) -> Vec<Value> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return vec![];
    };
    let required: BTreeSet<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, property)| {
            let mut param = Map::new();
            param.insert("name".to_string(), json!(name));
            param.insert("in".to_string(), json!("formData"));
            if let Some(description) = property.get("description") {
                param.insert("description".to_string(), description.clone());
            }
            param.insert("required".to_string(), json!(required.contains(name.as_str())));
            inline_schema(&mut param, property);
            if property.get("format").and_then(Value::as_str) == Some("binary") {
                param.insert("type".to_string(), json!("file"));
                param.remove("format");
            }
            Value::Object(param)
        })
        .collect()
}

fn convert_parameter_list(list: &Value, components: &Components) -> Value {
    match list {
        Value::Array(items) => items.iter().map(|p| convert_parameter(p, components)).collect(),
        other => other.clone(),
    }
}

fn convert_parameter(param: &Value, components: &Components) -> Value {
    let Some(map) = param.as_object() else {
        return param.clone();
    };
    if map.contains_key("$ref") {
        return param.clone();
    }

    let mut out: Map<String, Value> = map
        .iter()
        .filter(|(k, _)| !DROPPED_PARAMETER_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    if let Some(schema) = map.get("schema") {
        let schema = resolve_schema(schema, components);
        inline_schema(&mut out, schema);
        if schema.get("type").and_then(Value::as_str) == Some("array") {
            let exploded_query = map.get("in").and_then(Value::as_str) == Some("query")
                && map.get("explode").and_then(Value::as_bool) != Some(false);
            let format = if exploded_query { "multi" } else { "csv" };
            out.insert("collectionFormat".to_string(), json!(format));
        }
    }
    Value::Object(out)
}

fn inline_schema(target: &mut Map<String, Value>, schema: &Value) {
    for key in INLINE_SCHEMA_KEYS {
        if let Some(value) = schema.get(key) {
            target.insert(key.to_string(), value.clone());
        }
    }
    if !target.contains_key("type") {
        target.insert("type".to_string(), json!("string"));
    }
}

fn convert_responses(responses: &Value, produces: &mut BTreeSet<String>) -> Value {
    match responses {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(code, response)| (code.clone(), convert_response(response, produces)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn convert_response(response: &Value, produces: &mut BTreeSet<String>) -> Value {
    let Some(map) = response.as_object() else {
        return response.clone();
    };
    if map.contains_key("$ref") {
        return response.clone();
    }

    let mut out = Map::new();
    out.insert(
        "description".to_string(),
        map.get("description").cloned().unwrap_or_else(|| json!("")),
    );

    if let Some(content) = map.get("content").and_then(Value::as_object) {
        produces.extend(content.keys().cloned());
        if let Some(schema) = content.values().find_map(|media| media.get("schema")) {
            out.insert("schema".to_string(), schema.clone());
        }
        let examples: Map<String, Value> = content
            .iter()
            .filter_map(|(media_type, media)| Some((media_type.clone(), media.get("example")?.clone())))
            .collect();
        if !examples.is_empty() {
            out.insert("examples".to_string(), Value::Object(examples));
        }
    }

    if let Some(headers) = map.get("headers").and_then(Value::as_object) {
        let headers: Map<String, Value> = headers
            .iter()
            .map(|(name, header)| {
                let mut h = Map::new();
                if let Some(description) = header.get("description") {
                    h.insert("description".to_string(), description.clone());
                }
                inline_schema(&mut h, header.get("schema").unwrap_or(&Value::Null));
                (name.clone(), Value::Object(h))
            })
            .collect();
        out.insert("headers".to_string(), Value::Object(headers));
    }

    for (key, value) in map.iter().filter(|(k, _)| k.starts_with("x-")) {
        out.insert(key.clone(), value.clone());
    }
    Value::Object(out)
}

/// Points 3.0 component references at their 2.0 homes and renames
/// `nullable` to the `x-nullable` extension.
pub(crate) fn rewrite_refs(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| match (k.as_str(), v) {
                    ("$ref", Value::String(target)) => (k.clone(), Value::String(rewrite_ref(target))),
                    ("nullable", Value::Bool(_)) => ("x-nullable".to_string(), v.clone()),
                    _ => (k.clone(), rewrite_refs(v)),
                })
                .collect(),
        ),
        Value::Array(arr) => Value::Array(arr.iter().map(rewrite_refs).collect()),
        _ => value.clone(),
    }
}

fn rewrite_ref(target: &str) -> String {
    REF_REWRITES
        .iter()
        .find_map(|(from, to)| target.strip_prefix(from).map(|name| format!("{to}{name}")))
        .unwrap_or_else(|| target.to_string())
}
