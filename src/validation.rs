//! Validation System - Category Checks And Token Policy
//!
//! Each category check produces a value plus structured violations.
//! Policy decides which violations block generation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::options::{GenerationParameters, GenerationRequest, OutputFormat, SpecVersion};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCategory {
    AssemblyPaths,
    DocumentationPaths,
    OutputPath,
    SpecVersion,
    OutputFormat,
}

impl fmt::Display for ValidationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AssemblyPaths => "assembly paths",
            Self::DocumentationPaths => "documentation paths",
            Self::OutputPath => "output path",
            Self::SpecVersion => "spec version",
            Self::OutputFormat => "output format",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub category: ValidationCategory,
    pub severity: ViolationSeverity,
    pub message: String,
    /// The offending path or token.
    pub actual: Option<String>,
    pub remediation: Vec<String>,
}

/// Outcome of one category check: the best value available plus whatever
/// went wrong. `value` is always usable, even when `ok()` is false.
#[derive(Debug, Clone)]
pub struct Validated<T> {
    pub value: T,
    pub violations: Vec<ValidationViolation>,
}

impl<T> Validated<T> {
    pub fn ok(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Returned when a category blocks generation.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("Invalid {category}: {}", summarize(.violations))]
pub struct ValidationReport {
    pub category: ValidationCategory,
    pub violations: Vec<ValidationViolation>,
}

fn summarize(violations: &[ValidationViolation]) -> String {
    violations
        .iter()
        .map(|v| match &v.actual {
            Some(actual) => format!("{} ({})", v.message, actual),
            None => v.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// What to do with a spec version or output format token nobody recognizes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenPolicy {
    /// Block generation.
    #[default]
    Reject,
    /// Proceed with the default value and keep a warning on the request.
    Fallback,
}

// --- Category Checks ---

pub fn validate_assembly_paths(paths: &[PathBuf]) -> Validated<Vec<PathBuf>> {
    validate_existing_files(paths, ValidationCategory::AssemblyPaths, "Assembly file not found")
}

pub fn validate_documentation_paths(paths: &[PathBuf]) -> Validated<Vec<PathBuf>> {
    validate_existing_files(
        paths,
        ValidationCategory::DocumentationPaths,
        "Documentation file not found",
    )
}

fn validate_existing_files(
    paths: &[PathBuf],
    category: ValidationCategory,
    message: &str,
) -> Validated<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut value = vec![];
    let mut violations = vec![];

    for path in paths {
        if !seen.insert(path.clone()) {
            continue;
        }
        if path.is_file() {
            value.push(path.clone());
        } else {
            violations.push(ValidationViolation {
                category,
                severity: ViolationSeverity::Error,
                message: message.to_string(),
                actual: Some(path.display().to_string()),
                remediation: vec!["Check that the path exists and names a regular file".to_string()],
            });
        }
    }

    Validated { value, violations }
}

pub fn validate_output_path(requested: Option<&Path>, fallback: &Path) -> Validated<PathBuf> {
    let resolved = match requested {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => fallback.to_path_buf(),
    };

    let violations = if resolved.as_os_str().is_empty() {
        vec![ValidationViolation {
            category: ValidationCategory::OutputPath,
            severity: ViolationSeverity::Error,
            message: "No output directory given and no fallback available".to_string(),
            actual: None,
            remediation: vec!["Pass an output directory explicitly".to_string()],
        }]
    } else {
        vec![]
    };

    Validated { value: resolved, violations }
}

pub fn validate_spec_version(token: &str) -> Validated<SpecVersion> {
    match SpecVersion::from_token(token) {
        Some(value) => Validated { value, violations: vec![] },
        None => Validated {
            value: SpecVersion::V3,
            violations: vec![ValidationViolation {
                category: ValidationCategory::SpecVersion,
                severity: ViolationSeverity::Error,
                message: "Unrecognized OpenAPI spec version".to_string(),
                actual: Some(token.to_string()),
                remediation: vec!["Use \"2.0\" or \"3.0\"".to_string()],
            }],
        },
    }
}

pub fn validate_output_format(token: &str) -> Validated<OutputFormat> {
    match OutputFormat::from_token(token) {
        Some(value) => Validated { value, violations: vec![] },
        None => Validated {
            value: OutputFormat::Json,
            violations: vec![ValidationViolation {
                category: ValidationCategory::OutputFormat,
                severity: ViolationSeverity::Error,
                message: "Unrecognized output format".to_string(),
                actual: Some(token.to_string()),
                remediation: vec!["Use \"JSON\" or \"YAML\"".to_string()],
            }],
        },
    }
}

/// Runs the category checks in order and applies policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputValidator {
    token_policy: TokenPolicy,
}

impl InputValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token_policy(token_policy: TokenPolicy) -> Self {
        Self { token_policy }
    }

    pub fn token_policy(&self) -> TokenPolicy {
        self.token_policy
    }

    /// Stops at the first category that blocks; later categories are not
    /// checked.
    pub fn validate(
        &self,
        params: &GenerationParameters,
        fallback_output_dir: &Path,
    ) -> Result<GenerationRequest, ValidationReport> {
        let mut warnings = vec![];

        let assemblies = validate_assembly_paths(&params.assembly_paths);
        block(ValidationCategory::AssemblyPaths, assemblies.violations)?;

        let docs = validate_documentation_paths(&params.documentation_paths);
        block(ValidationCategory::DocumentationPaths, docs.violations)?;

        let output = validate_output_path(params.output_dir.as_deref(), fallback_output_dir);
        block(ValidationCategory::OutputPath, output.violations)?;

        let version = validate_spec_version(&params.spec_version);
        warnings.extend(self.apply_token_policy(ValidationCategory::SpecVersion, version.violations)?);

        let format = validate_output_format(&params.format);
        warnings.extend(self.apply_token_policy(ValidationCategory::OutputFormat, format.violations)?);

        Ok(GenerationRequest {
            document_version: params.document_version.clone(),
            assembly_paths: assemblies.value,
            documentation_paths: docs.value,
            description: params.description.clone(),
            output_dir: output.value,
            spec_version: version.value,
            file_prefix: params.file_prefix.clone(),
            format: format.value,
            warnings,
        })
    }

    fn apply_token_policy(
        &self,
        category: ValidationCategory,
        violations: Vec<ValidationViolation>,
    ) -> Result<Vec<ValidationViolation>, ValidationReport> {
        match self.token_policy {
            TokenPolicy::Reject => block(category, violations).map(|_| vec![]),
            TokenPolicy::Fallback => Ok(violations
                .into_iter()
                .map(|v| ValidationViolation { severity: ViolationSeverity::Warning, ..v })
                .collect()),
        }
    }
}

fn block(
    category: ValidationCategory,
    violations: Vec<ValidationViolation>,
) -> Result<(), ValidationReport> {
    if violations.iter().any(|v| v.severity == ViolationSeverity::Error) {
        Err(ValidationReport { category, violations })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, b"x").unwrap();
        path
    }

    fn params(dir: &TempDir) -> GenerationParameters {
        GenerationParameters {
            document_version: "V1".to_string(),
            assembly_paths: vec![touch(dir, "Api.dll")],
            documentation_paths: vec![touch(dir, "Api.xml")],
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_path_keeps_existing_subset() {
        let dir = TempDir::new().unwrap();
        let good = touch(&dir, "a.dll");
        let missing = dir.path().join("missing.dll");
        let also_missing = dir.path().join("gone.dll");

        let result = validate_assembly_paths(&[missing.clone(), good.clone(), also_missing]);
        assert!(!result.ok());
        assert_eq!(result.value, vec![good]);
        assert_eq!(result.violations.len(), 2);
        assert_eq!(result.violations[0].actual.as_deref(), Some(missing.display().to_string().as_str()));
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let dir = TempDir::new().unwrap();
        let result = validate_documentation_paths(&[dir.path().to_path_buf()]);
        assert!(!result.ok());
        assert!(result.value.is_empty());
    }

    #[test]
    fn test_duplicate_paths_collapse() {
        let dir = TempDir::new().unwrap();
        let a = touch(&dir, "a.xml");
        let b = touch(&dir, "b.xml");
        let result = validate_documentation_paths(&[b.clone(), a.clone(), b.clone()]);
        assert!(result.ok());
        assert_eq!(result.value, vec![b, a]);
    }

    #[test]
    fn test_output_path_fallback() {
        let fallback = Path::new("/fallback");
        assert_eq!(validate_output_path(Some(Path::new("/out")), fallback).value, PathBuf::from("/out"));
        assert_eq!(validate_output_path(Some(Path::new("")), fallback).value, PathBuf::from("/fallback"));
        assert_eq!(validate_output_path(None, fallback).value, PathBuf::from("/fallback"));
        assert!(!validate_output_path(None, Path::new("")).ok());
    }

    #[test]
    fn test_unknown_tokens_default_even_on_failure() {
        let version = validate_spec_version("4.2");
        assert!(!version.ok());
        assert_eq!(version.value, SpecVersion::V3);

        let format = validate_output_format("toml");
        assert!(!format.ok());
        assert_eq!(format.value, OutputFormat::Json);

        assert_eq!(validate_spec_version("2.0").value, SpecVersion::V2);
        assert_eq!(validate_output_format("Yaml").value, OutputFormat::Yaml);
    }

    #[test]
    fn test_valid_parameters_build_request() {
        let dir = TempDir::new().unwrap();
        let mut p = params(&dir);
        p.spec_version = "2.0".to_string();
        p.format = "yaml".to_string();

        let request = InputValidator::new().validate(&p, dir.path()).unwrap();
        assert_eq!(request.spec_version, SpecVersion::V2);
        assert_eq!(request.format, OutputFormat::Yaml);
        assert_eq!(request.output_dir, dir.path());
        assert_eq!(request.file_prefix, "OpenApiDocument");
        assert!(request.warnings.is_empty());
    }

    #[test]
    fn test_first_failing_category_short_circuits() {
        let dir = TempDir::new().unwrap();
        let mut p = params(&dir);
        p.documentation_paths.push(dir.path().join("nope.xml"));
        p.spec_version = "9".to_string();

        let report = InputValidator::new().validate(&p, dir.path()).unwrap_err();
        assert_eq!(report.category, ValidationCategory::DocumentationPaths);
        assert_eq!(report.violations.len(), 1);
        assert!(report.to_string().contains("nope.xml"));
    }

    #[test]
    fn test_reject_policy_blocks_unknown_format() {
        let dir = TempDir::new().unwrap();
        let mut p = params(&dir);
        p.format = "xml".to_string();

        let report = InputValidator::new().validate(&p, dir.path()).unwrap_err();
        assert_eq!(report.category, ValidationCategory::OutputFormat);
    }

    #[test]
    fn test_fallback_policy_proceeds_with_defaults() {
        let dir = TempDir::new().unwrap();
        let mut p = params(&dir);
        p.spec_version = "1.2".to_string();
        p.format = "xml".to_string();

        let validator = InputValidator::with_token_policy(TokenPolicy::Fallback);
        let request = validator.validate(&p, dir.path()).unwrap();
        assert_eq!(request.spec_version, SpecVersion::V3);
        assert_eq!(request.format, OutputFormat::Json);
        assert_eq!(request.warnings.len(), 2);
        assert!(request.warnings.iter().all(|w| w.severity == ViolationSeverity::Warning));
    }

    #[test]
    fn test_fallback_policy_still_blocks_bad_paths() {
        let dir = TempDir::new().unwrap();
        let mut p = params(&dir);
        p.assembly_paths = vec![dir.path().join("missing.dll")];

        let validator = InputValidator::with_token_policy(TokenPolicy::Fallback);
        let report = validator.validate(&p, dir.path()).unwrap_err();
        assert_eq!(report.category, ValidationCategory::AssemblyPaths);
    }
}
