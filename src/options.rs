//! Generation Options - Raw Parameters And The Validated Request

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::validation::ValidationViolation;
use crate::DEFAULT_FILE_PREFIX;

/// OpenAPI schema version of the serialized output.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SpecVersion {
    #[serde(rename = "2.0")]
    V2,
    #[default]
    #[serde(rename = "3.0")]
    V3,
}

impl SpecVersion {
    /// Case-insensitive match against the recognized tokens.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "2.0" => Some(Self::V2),
            "3.0" => Some(Self::V3),
            _ => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Self::V2 => "2.0",
            Self::V3 => "3.0",
        }
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Canonical name, also used as the output file extension.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Json => "Json",
            Self::Yaml => "Yaml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters as handed over by the host, before any checking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParameters {
    #[serde(default)]
    pub document_version: String,
    #[serde(default)]
    pub assembly_paths: Vec<PathBuf>,
    #[serde(default)]
    pub documentation_paths: Vec<PathBuf>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default = "default_spec_version_token")]
    pub spec_version: String,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "default_format_token")]
    pub format: String,
}

fn default_spec_version_token() -> String { "3.0".to_string() }
fn default_file_prefix() -> String { DEFAULT_FILE_PREFIX.to_string() }
fn default_format_token() -> String { "JSON".to_string() }

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            document_version: String::new(),
            assembly_paths: vec![],
            documentation_paths: vec![],
            description: None,
            output_dir: None,
            spec_version: default_spec_version_token(),
            file_prefix: default_file_prefix(),
            format: default_format_token(),
        }
    }
}

/// A fully validated request. Only [`crate::InputValidator`] builds one from
/// host parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub document_version: String,
    pub assembly_paths: Vec<PathBuf>,
    pub documentation_paths: Vec<PathBuf>,
    #[serde(default)]
    pub description: Option<String>,
    pub output_dir: PathBuf,
    pub spec_version: SpecVersion,
    pub file_prefix: String,
    pub format: OutputFormat,
    /// Non-blocking findings recorded while validating.
    #[serde(default)]
    pub warnings: Vec<ValidationViolation>,
}

impl GenerationRequest {
    /// The description to stamp on every document, if one was really given.
    pub fn effective_description(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.is_empty())
    }

    /// `{prefix}.{title}.{format}`, or `{prefix}.{format}` for an untitled variant.
    pub fn file_name(&self, variant_title: &str) -> String {
        if variant_title.is_empty() {
            format!("{}.{}", self.file_prefix, self.format.name())
        } else {
            format!("{}.{}.{}", self.file_prefix, variant_title, self.format.name())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prefix: &str, format: OutputFormat) -> GenerationRequest {
        GenerationRequest {
            document_version: "V1".to_string(),
            assembly_paths: vec![],
            documentation_paths: vec![],
            description: None,
            output_dir: PathBuf::from("/out"),
            spec_version: SpecVersion::V3,
            file_prefix: prefix.to_string(),
            format,
            warnings: vec![],
        }
    }

    #[test]
    fn test_spec_version_tokens() {
        assert_eq!(SpecVersion::from_token("2.0"), Some(SpecVersion::V2));
        assert_eq!(SpecVersion::from_token(" 3.0 "), Some(SpecVersion::V3));
        assert_eq!(SpecVersion::from_token("3.1"), None);
        assert_eq!(SpecVersion::from_token(""), None);
    }

    #[test]
    fn test_format_tokens_case_insensitive() {
        assert_eq!(OutputFormat::from_token("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_token("yAmL"), Some(OutputFormat::Yaml));
        assert_eq!(OutputFormat::from_token("xml"), None);
    }

    #[test]
    fn test_file_name_with_and_without_title() {
        let req = request("Doc", OutputFormat::Json);
        assert_eq!(req.file_name("internal"), "Doc.internal.Json");
        assert_eq!(req.file_name(""), "Doc.Json");

        let req = request("OpenApiDocument", OutputFormat::Yaml);
        assert_eq!(req.file_name("v1"), "OpenApiDocument.v1.Yaml");
    }

    #[test]
    fn test_empty_description_is_not_supplied() {
        let mut req = request("Doc", OutputFormat::Json);
        assert_eq!(req.effective_description(), None);
        req.description = Some(String::new());
        assert_eq!(req.effective_description(), None);
        req.description = Some("Public API".to_string());
        assert_eq!(req.effective_description(), Some("Public API"));
    }

    #[test]
    fn test_parameter_defaults() {
        let params: GenerationParameters = serde_json::from_str("{}").unwrap();
        assert_eq!(params.spec_version, "3.0");
        assert_eq!(params.format, "JSON");
        assert_eq!(params.file_prefix, "OpenApiDocument");
    }
}
