//! Generation Pipeline - Single Entry Point
//!
//! CRITICAL: nothing is written unless the engine's diagnostics are clean.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::document::{serialize_document, SerializeError};
use crate::engine::{
    EngineInput, EngineOutput, FilterSetVersion, GenerationDiagnostics, GenerationEngine,
    GenerationSettings,
};
use crate::options::GenerationRequest;
use crate::xml::{LoadError, XmlDocument};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to load documentation file {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },

    #[error(transparent)]
    Generation(#[from] AggregatedGenerationError),

    #[error("Failed to serialize {}: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: SerializeError,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Every error the engine reported for one run, in one value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}", render_diagnostics(.diagnostics))]
pub struct AggregatedGenerationError {
    pub diagnostics: GenerationDiagnostics,
}

fn render_diagnostics(diagnostics: &GenerationDiagnostics) -> String {
    let mut lines = vec!["Document generation failed.".to_string()];

    lines.extend(
        diagnostics
            .document_errors
            .iter()
            .map(|error| format!("{}: {}", error.exception_type, error.message)),
    );

    let mut failed = diagnostics.failed_operations().peekable();
    if failed.peek().is_some() {
        lines.push("Operation generation errors:".to_string());
        for op in failed {
            lines.push(match &op.path {
                Some(path) => format!("{} ({}):", op.operation_method, path),
                None => format!("{}:", op.operation_method),
            });
            lines.extend(
                op.errors
                    .iter()
                    .map(|error| format!("  {}: {}", error.exception_type, error.message)),
            );
        }
    }

    lines.join("\n")
}

/// Absolute paths of the files written, in write order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputManifest {
    paths: Vec<PathBuf>,
}

impl OutputManifest {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// The generation pipeline - drives one engine call per request.
pub struct GenerationPipeline<E> {
    engine: E,
}

impl<E: GenerationEngine> GenerationPipeline<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Generate and write every variant for a validated request.
    pub fn generate_documents(
        &self,
        request: &GenerationRequest,
    ) -> Result<OutputManifest, PipelineError> {
        let documents = load_documents(&request.documentation_paths)?;

        let input = EngineInput {
            documents,
            assembly_paths: request.assembly_paths.clone(),
            document_version: request.document_version.clone(),
            filter_set_version: FilterSetVersion::V1,
            settings: GenerationSettings::default(),
        };

        let EngineOutput { documents, diagnostics } = self.engine.generate(&input);

        if diagnostics.has_errors() {
            return Err(AggregatedGenerationError { diagnostics }.into());
        }

        let output_dir = absolute_dir(&request.output_dir).map_err(|source| PipelineError::Io {
            path: request.output_dir.clone(),
            source,
        })?;

        // Render everything before touching the disk so a bad document or an
        // unusable target leaves no files behind.
        let mut rendered = Vec::with_capacity(documents.len());
        for (variant, mut document) in documents {
            if let Some(description) = request.effective_description() {
                document.set_description(description);
            }

            let path = output_dir.join(request.file_name(&variant.title));

            let text = serialize_document(&document, request.spec_version, request.format)
                .map_err(|source| PipelineError::Serialize { path: path.clone(), source })?;

            if path.is_dir() {
                return Err(PipelineError::Io {
                    source: io::Error::new(io::ErrorKind::AlreadyExists, "a directory exists at the target path"),
                    path,
                });
            }
            rendered.push((path, text));
        }

        let mut manifest = OutputManifest::default();
        for (path, text) in rendered {
            write_file(&path, &text)?;
            manifest.paths.push(path);
        }

        Ok(manifest)
    }
}

fn load_documents(paths: &[PathBuf]) -> Result<Vec<XmlDocument>, PipelineError> {
    paths
        .iter()
        .map(|path| {
            XmlDocument::load(path).map_err(|source| PipelineError::Load {
                path: path.clone(),
                source,
            })
        })
        .collect()
}

fn absolute_dir(dir: &Path) -> io::Result<PathBuf> {
    if dir.is_absolute() {
        Ok(dir.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(dir))
    }
}

fn write_file(path: &Path, text: &str) -> Result<(), PipelineError> {
    let io_err = |source| PipelineError::Io { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, text).map_err(io_err)
}
