//! oasgen Core - OpenAPI Document Generation Step
//!
//! # Guarantees
//! 1. Validation Runs First
//! 2. One Engine Call Per Invocation
//! 3. All Or Nothing: a dirty diagnostics report writes no files
//! 4. Deterministic File Names And Order
//! 5. One Aggregated Error Per Failed Generation

pub mod options;
pub mod validation;
pub mod xml;
pub mod document;
mod swagger;
pub mod engine;
pub mod hashing;
pub mod pipeline;

pub use options::{GenerationRequest, GenerationParameters, SpecVersion, OutputFormat};
pub use validation::{InputValidator, TokenPolicy, Validated, ValidationReport, ValidationViolation};
pub use document::{OpenApiDocument, SerializeError, serialize_document};
pub use xml::{LoadError, XmlDocument};
pub use engine::{
    DocumentVariant, EngineInput, EngineOutput, GenerationDiagnostics, GenerationEngine,
    ProcessEngine,
};
pub use pipeline::{AggregatedGenerationError, GenerationPipeline, OutputManifest, PipelineError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DEFAULT_FILE_PREFIX: &str = "OpenApiDocument";
