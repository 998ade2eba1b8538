//! OpenAPI Document Model And Serializer
//!
//! The engine produces version-neutral documents; the serializer lays them
//! out as OpenAPI 2.0 or 3.0 and renders JSON or YAML.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::options::{OutputFormat, SpecVersion};
use crate::swagger;

const OPENAPI_V3_VERSION: &str = "3.0.1";
const SWAGGER_VERSION: &str = "2.0";

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpenApiDocument {
    pub info: Info,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    #[serde(default)]
    pub paths: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Components::is_empty")]
    pub components: Components,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<Value>,
    /// `x-` vendor extensions.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub schemas: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub security_schemes: BTreeMap<String, Value>,
    /// parameters, responses, requestBodies, headers, examples, links, callbacks.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Components {
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.security_schemes.is_empty() && self.extra.is_empty()
    }
}

impl OpenApiDocument {
    pub fn set_description(&mut self, description: &str) {
        self.info.description = Some(description.to_string());
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OpenApiV3<'a> {
    openapi: &'static str,
    info: &'a Info,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_docs: Option<&'a Value>,
    #[serde(skip_serializing_if = "<[Server]>::is_empty")]
    servers: &'a [Server],
    #[serde(skip_serializing_if = "<[Value]>::is_empty")]
    security: &'a [Value],
    paths: &'a BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Components::is_empty")]
    components: &'a Components,
    #[serde(skip_serializing_if = "<[Value]>::is_empty")]
    tags: &'a [Value],
    #[serde(flatten)]
    extensions: BTreeMap<String, Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SwaggerV2<'a> {
    swagger: &'static str,
    info: &'a Info,
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_path: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    schemes: Vec<String>,
    paths: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    definitions: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    parameters: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    responses: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    security_definitions: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "<[Value]>::is_empty")]
    security: &'a [Value],
    #[serde(skip_serializing_if = "<[Value]>::is_empty")]
    tags: &'a [Value],
    #[serde(skip_serializing_if = "Option::is_none")]
    external_docs: Option<&'a Value>,
    #[serde(flatten)]
    extensions: BTreeMap<String, Value>,
}

/// Render a document in the requested spec version and format.
pub fn serialize_document(
    document: &OpenApiDocument,
    version: SpecVersion,
    format: OutputFormat,
) -> Result<String, SerializeError> {
    match version {
        SpecVersion::V3 => render(&as_v3(document), format),
        SpecVersion::V2 => render(&as_v2(document), format),
    }
}

fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String, SerializeError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
    }
}

fn as_v3(document: &OpenApiDocument) -> OpenApiV3<'_> {
    OpenApiV3 {
        openapi: OPENAPI_V3_VERSION,
        info: &document.info,
        external_docs: document.external_docs.as_ref(),
        servers: &document.servers,
        security: &document.security,
        paths: &document.paths,
        components: &document.components,
        tags: &document.tags,
        extensions: vendor_extensions(document),
    }
}

fn as_v2(document: &OpenApiDocument) -> SwaggerV2<'_> {
    let (host, base_path, schemes) = match document.servers.first() {
        Some(server) => split_server_url(&server.url),
        None => (None, None, vec![]),
    };
    let components = &document.components;

    SwaggerV2 {
        swagger: SWAGGER_VERSION,
        info: &document.info,
        host,
        base_path,
        schemes,
        paths: swagger::convert_paths(&document.paths, components),
        definitions: swagger::convert_definitions(components),
        parameters: swagger::convert_shared_parameters(components),
        responses: swagger::convert_shared_responses(components),
        security_definitions: components.security_schemes.clone(),
        security: &document.security,
        tags: &document.tags,
        external_docs: document.external_docs.as_ref(),
        extensions: vendor_extensions(document),
    }
}

/// Only `x-` keys survive; anything else the engine left at top level is
/// replaced by the version-specific layout.
fn vendor_extensions(document: &OpenApiDocument) -> BTreeMap<String, Value> {
    document
        .extensions
        .iter()
        .filter(|(k, _)| k.starts_with("x-"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// `https://api.contoso.com/v1` -> host `api.contoso.com`, basePath `/v1`, schemes `[https]`.
fn split_server_url(url: &str) -> (Option<String>, Option<String>, Vec<String>) {
    let (schemes, rest) = match url.split_once("://") {
        Some((scheme, rest)) => (vec![scheme.to_string()], rest),
        None => (vec![], url),
    };

    let (host, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };

    let host = (!host.is_empty()).then(|| host.to_string());
    let base_path = (!path.is_empty() && path != "/").then(|| path.trim_end_matches('/').to_string());
    (host, base_path, schemes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> OpenApiDocument {
        let mut doc = OpenApiDocument {
            info: Info {
                title: "Contoso".to_string(),
                version: "V1".to_string(),
                description: Some("From the engine".to_string()),
                extra: BTreeMap::new(),
            },
            servers: vec![Server { url: "https://api.contoso.com/v1".to_string(), description: None }],
            ..Default::default()
        };
        doc.paths.insert(
            "/values/{id}".to_string(),
            json!({"get": {"responses": {"200": {"description": "OK",
                "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Value"}}}}}}}),
        );
        doc.components.schemas.insert("Value".to_string(), json!({"type": "object"}));
        doc
    }

    #[test]
    fn test_v3_json_layout() {
        let text = serialize_document(&sample(), SpecVersion::V3, OutputFormat::Json).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["openapi"], "3.0.1");
        assert_eq!(value["info"]["title"], "Contoso");
        assert_eq!(value["servers"][0]["url"], "https://api.contoso.com/v1");
        assert!(value["components"]["schemas"]["Value"].is_object());
        assert!(text.trim_start().starts_with("{\n  \"openapi\""));
    }

    #[test]
    fn test_v2_rewrites_refs_and_server() {
        let text = serialize_document(&sample(), SpecVersion::V2, OutputFormat::Json).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["swagger"], "2.0");
        assert_eq!(value["host"], "api.contoso.com");
        assert_eq!(value["basePath"], "/v1");
        assert_eq!(value["schemes"][0], "https");
        assert!(value["definitions"]["Value"].is_object());
        assert!(value.get("components").is_none());
        assert!(text.contains("#/definitions/Value"));
        assert!(!text.contains("#/components/schemas/"));

        let ok = &value["paths"]["/values/{id}"]["get"]["responses"]["200"];
        assert_eq!(ok["schema"]["$ref"], "#/definitions/Value");
        assert_eq!(value["paths"]["/values/{id}"]["get"]["produces"][0], "application/json");
        assert!(!text.contains("\"content\""));
        assert!(!text.contains("requestBody"));
    }

    fn full_document() -> OpenApiDocument {
        serde_json::from_value(json!({
            "info": {"title": "Contoso", "version": "V1"},
            "security": [{"oauth": ["read"]}],
            "externalDocs": {"url": "https://docs.contoso.com"},
            "paths": {"/values": {"post": {
                "parameters": [{"$ref": "#/components/parameters/Id"}],
                "requestBody": {"content": {"application/json": {"schema": {"$ref": "#/components/schemas/Value"}}}},
                "responses": {"404": {"$ref": "#/components/responses/NotFound"}}
            }}},
            "components": {
                "schemas": {"Value": {"type": "object"}},
                "parameters": {"Id": {"name": "id", "in": "query", "schema": {"type": "integer"}}},
                "responses": {"NotFound": {"description": "Missing",
                    "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Value"}}}}},
                "examples": {"Sample": {"value": {"id": 1}}}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_v3_keeps_security_docs_and_components() {
        let doc = full_document();
        let text = serialize_document(&doc, SpecVersion::V3, OutputFormat::Json).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["security"][0]["oauth"][0], "read");
        assert_eq!(value["externalDocs"]["url"], "https://docs.contoso.com");
        assert_eq!(value["components"]["parameters"]["Id"]["name"], "id");
        assert_eq!(value["components"]["responses"]["NotFound"]["description"], "Missing");
        assert!(value["components"]["examples"]["Sample"].is_object());

        let mut value = value;
        value.as_object_mut().unwrap().remove("openapi");
        let reparsed: OpenApiDocument = serde_json::from_value(value).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn test_v2_keeps_security_docs_and_shared_components() {
        let text = serialize_document(&full_document(), SpecVersion::V2, OutputFormat::Json).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["security"][0]["oauth"][0], "read");
        assert_eq!(value["externalDocs"]["url"], "https://docs.contoso.com");
        assert_eq!(value["parameters"]["Id"]["type"], "integer");
        assert!(value["parameters"]["Id"].get("schema").is_none());
        assert_eq!(value["responses"]["NotFound"]["schema"]["$ref"], "#/definitions/Value");

        let post = &value["paths"]["/values"]["post"];
        assert_eq!(post["parameters"][0]["$ref"], "#/parameters/Id");
        assert_eq!(post["parameters"][1]["in"], "body");
        assert_eq!(post["responses"]["404"]["$ref"], "#/responses/NotFound");
        assert!(!text.contains("#/components/"));
    }

    #[test]
    fn test_yaml_output() {
        let text = serialize_document(&sample(), SpecVersion::V3, OutputFormat::Yaml).unwrap();
        assert!(text.starts_with("openapi: 3.0.1"));
        let value: Value = serde_yaml::from_str(&text).unwrap();
        assert_eq!(value["info"]["version"], "V1");
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let a = serialize_document(&sample(), SpecVersion::V2, OutputFormat::Yaml).unwrap();
        let b = serialize_document(&sample(), SpecVersion::V2, OutputFormat::Yaml).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_extensions_are_top_level() {
        let mut doc = sample();
        doc.extensions.insert("x-audience".to_string(), json!("internal"));
        let text = serialize_document(&doc, SpecVersion::V3, OutputFormat::Json).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["x-audience"], "internal");
    }

    #[test]
    fn test_engine_version_key_not_duplicated() {
        let doc: OpenApiDocument = serde_json::from_value(json!({
            "openapi": "3.0.0",
            "info": {"title": "T", "version": "1"},
            "paths": {}
        }))
        .unwrap();
        let text = serialize_document(&doc, SpecVersion::V2, OutputFormat::Json).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["swagger"], "2.0");
        assert!(value.get("openapi").is_none());
    }

    #[test]
    fn test_split_server_url() {
        assert_eq!(
            split_server_url("http://localhost:5000"),
            (Some("localhost:5000".to_string()), None, vec!["http".to_string()])
        );
        assert_eq!(
            split_server_url("/api/"),
            (None, Some("/api".to_string()), vec![])
        );
    }
}
