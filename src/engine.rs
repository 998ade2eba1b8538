//! Generation Engine Boundary
//!
//! The engine turns loaded documentation plus assembly metadata into one
//! document per variant and a diagnostics report. It never fails by
//! signature: everything that goes wrong lands in the diagnostics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, warn};

use crate::document::OpenApiDocument;
use crate::xml::XmlDocument;

/// Exception type reported when the engine process itself misbehaves.
pub const ENGINE_PROCESS_EXCEPTION: &str = "EngineProcessException";

/// Names one document among the siblings of a run. The untitled variant has
/// an empty title and sorts first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct DocumentVariant {
    pub title: String,
}

impl DocumentVariant {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }

    pub fn untitled() -> Self {
        Self::default()
    }
}

/// Keyed by variant; iteration order is the key order.
pub type GeneratedDocumentSet = BTreeMap<DocumentVariant, OpenApiDocument>;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum FilterSetVersion {
    #[default]
    V1,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PropertyNameResolution {
    #[default]
    Default,
    CamelCase,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    pub property_name_resolution: PropertyNameResolution,
    /// Strip the duplicated parameter-name text the documentation compiler
    /// emits for some generic parameters.
    pub remove_duplicate_string_from_param_name: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            property_name_resolution: PropertyNameResolution::Default,
            remove_duplicate_string_from_param_name: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineInput {
    pub documents: Vec<XmlDocument>,
    pub assembly_paths: Vec<PathBuf>,
    pub document_version: String,
    pub filter_set_version: FilterSetVersion,
    pub settings: GenerationSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationError {
    pub exception_type: String,
    pub message: String,
}

impl GenerationError {
    pub fn new(exception_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            exception_type: exception_type.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDiagnostic {
    /// Documented method identifier, e.g. `M:Contoso.Values.Get(System.Int32)`.
    pub operation_method: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub errors: Vec<GenerationError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationDiagnostics {
    #[serde(default)]
    pub document_errors: Vec<GenerationError>,
    #[serde(default)]
    pub operation_diagnostics: Vec<OperationDiagnostic>,
}

impl GenerationDiagnostics {
    pub fn has_errors(&self) -> bool {
        !self.document_errors.is_empty() || self.failed_operations().next().is_some()
    }

    /// Operations that reported at least one error.
    pub fn failed_operations(&self) -> impl Iterator<Item = &OperationDiagnostic> {
        self.operation_diagnostics.iter().filter(|op| !op.errors.is_empty())
    }

    fn engine_failure(message: impl Into<String>) -> Self {
        Self {
            document_errors: vec![GenerationError::new(ENGINE_PROCESS_EXCEPTION, message)],
            operation_diagnostics: vec![],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineOutput {
    #[serde(default)]
    pub documents: GeneratedDocumentSet,
    #[serde(default)]
    pub diagnostics: GenerationDiagnostics,
}

impl EngineOutput {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            documents: GeneratedDocumentSet::new(),
            diagnostics: GenerationDiagnostics::engine_failure(message),
        }
    }
}

pub trait GenerationEngine {
    fn generate(&self, input: &EngineInput) -> EngineOutput;
}

/// Runs an external generator: JSON `EngineInput` on stdin, JSON
/// `EngineOutput` on stdout.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl GenerationEngine for ProcessEngine {
    fn generate(&self, input: &EngineInput) -> EngineOutput {
        let payload = match serde_json::to_vec(input) {
            Ok(p) => p,
            Err(e) => return EngineOutput::failed(format!("cannot encode engine input: {e}")),
        };

        debug!(program = %self.program.display(), documents = input.documents.len(), "starting generation engine");

        let mut child = match Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(c) => c,
            Err(e) => {
                return EngineOutput::failed(format!(
                    "cannot start {}: {e}",
                    self.program.display()
                ))
            }
        };

        // Feed stdin from a separate thread so a chatty child cannot fill its
        // stdout pipe while we are still writing.
        let writer = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || stdin.write_all(&payload))
        });

        let output = match child.wait_with_output() {
            Ok(o) => o,
            Err(e) => return EngineOutput::failed(format!("engine process failed: {e}")),
        };

        if let Some(handle) = writer {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "engine closed stdin early"),
                Err(_) => warn!("stdin writer panicked"),
            }
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            debug!(target: "oasgen::engine", "{line}");
        }

        if !output.status.success() {
            return EngineOutput::failed(format!(
                "engine exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        match serde_json::from_slice::<EngineOutput>(&output.stdout) {
            Ok(out) => out,
            Err(e) => EngineOutput::failed(format!("cannot decode engine output: {e}")),
        }
    }
}
