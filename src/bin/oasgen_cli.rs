//! oasgen CLI - Build step front end
//!
//! Commands: validate, generate
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on validation or generation failure

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use oasgen_core::{
    hashing::FileDigest,
    validation::ViolationSeverity,
    GenerationParameters, GenerationPipeline, GenerationRequest, InputValidator, PipelineError,
    ProcessEngine, TokenPolicy, ValidationReport, ValidationViolation, DEFAULT_FILE_PREFIX,
    VERSION,
};

#[derive(Parser)]
#[command(name = "oasgen-cli")]
#[command(about = "oasgen CLI - OpenAPI documents from documentation XML")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// More log output (repeat for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the inputs without generating anything
    Validate {
        #[command(flatten)]
        inputs: Inputs,
    },

    /// Validate, then generate and write every document variant
    Generate {
        #[command(flatten)]
        inputs: Inputs,

        /// Generation engine executable
        #[arg(long, env = "OASGEN_ENGINE")]
        engine: PathBuf,

        /// Extra argument passed to the engine (repeatable)
        #[arg(long = "engine-arg", allow_hyphen_values = true)]
        engine_args: Vec<String>,
    },
}

#[derive(Args)]
struct Inputs {
    /// Version string stamped into the documents
    #[arg(long, env = "OASGEN_DOCUMENT_VERSION", default_value = "V1")]
    document_version: String,

    /// Compiled assembly (repeatable)
    #[arg(short, long = "assembly")]
    assemblies: Vec<PathBuf>,

    /// Documentation XML file (repeatable)
    #[arg(short, long = "documentation")]
    documentation: Vec<PathBuf>,

    /// Overrides the description of every document
    #[arg(long)]
    description: Option<String>,

    /// Output directory
    #[arg(short, long, env = "OASGEN_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Used when no output directory is given (defaults to the working directory)
    #[arg(long, env = "OASGEN_DEFAULT_OUTPUT_DIR")]
    fallback_output_dir: Option<PathBuf>,

    /// OpenAPI spec version: 2.0 or 3.0
    #[arg(long, env = "OASGEN_SPEC_VERSION", default_value = "3.0")]
    spec_version: String,

    /// Output file name prefix
    #[arg(long, env = "OASGEN_PREFIX", default_value = DEFAULT_FILE_PREFIX)]
    prefix: String,

    /// Output format: JSON or YAML
    #[arg(short, long, env = "OASGEN_FORMAT", default_value = "JSON")]
    format: String,

    /// Fall back to 3.0 / JSON on unrecognized tokens instead of failing
    #[arg(long)]
    lenient_tokens: bool,
}

impl Inputs {
    fn parameters(&self) -> GenerationParameters {
        GenerationParameters {
            document_version: self.document_version.clone(),
            assembly_paths: self.assemblies.clone(),
            documentation_paths: self.documentation.clone(),
            description: self.description.clone(),
            output_dir: self.output_dir.clone(),
            spec_version: self.spec_version.clone(),
            file_prefix: self.prefix.clone(),
            format: self.format.clone(),
        }
    }

    fn validator(&self) -> InputValidator {
        if self.lenient_tokens {
            InputValidator::with_token_policy(TokenPolicy::Fallback)
        } else {
            InputValidator::new()
        }
    }

    fn fallback_output_dir(&self) -> PathBuf {
        self.fallback_output_dir
            .clone()
            .or_else(|| env::current_dir().ok())
            .unwrap_or_default()
    }

    fn validate(&self) -> Result<GenerationRequest, ValidationReport> {
        let result = self
            .validator()
            .validate(&self.parameters(), &self.fallback_output_dir());

        match &result {
            Ok(request) => request.warnings.iter().for_each(log_violation),
            Err(report) => report.violations.iter().for_each(log_violation),
        }
        result
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn log_violation(v: &ValidationViolation) {
    let actual = v.actual.as_deref().unwrap_or("");
    match v.severity {
        ViolationSeverity::Error => error!(category = %v.category, actual, "{}", v.message),
        ViolationSeverity::Warning => warn!(category = %v.category, actual, "{}", v.message),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Validate { inputs } => match inputs.validate() {
            Ok(request) => {
                let output = serde_json::json!({
                    "valid": true,
                    "request": request,
                });
                println!("{}", to_json(&output));
                ExitCode::SUCCESS
            }
            Err(report) => {
                let output = serde_json::json!({
                    "valid": false,
                    "error": report.to_string(),
                    "report": report,
                });
                println!("{}", to_json(&output));
                ExitCode::from(2)
            }
        },

        Commands::Generate { inputs, engine, engine_args } => {
            let request = match inputs.validate() {
                Ok(r) => r,
                Err(report) => {
                    let output = serde_json::json!({
                        "success": false,
                        "error": report.to_string(),
                        "report": report,
                    });
                    println!("{}", to_json(&output));
                    return ExitCode::from(2);
                }
            };

            let pipeline = GenerationPipeline::new(ProcessEngine::new(engine).with_args(engine_args));

            match pipeline.generate_documents(&request) {
                Ok(manifest) => {
                    if manifest.is_empty() {
                        warn!("engine produced no document variants");
                    }
                    let mut files = Vec::with_capacity(manifest.len());
                    for path in manifest.paths() {
                        info!(path = %path.display(), "wrote document");
                        match FileDigest::of(path) {
                            Ok(digest) => files.push(digest),
                            Err(e) => warn!(path = %path.display(), error = %e, "cannot hash output"),
                        }
                    }

                    let output = serde_json::json!({
                        "success": true,
                        "version": VERSION,
                        "finishedAt": Utc::now(),
                        "outputs": manifest,
                        "files": files,
                        "warnings": request.warnings,
                    });
                    println!("{}", to_json(&output));
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("{e}");
                    let output = serde_json::json!({
                        "success": false,
                        "error": e.to_string(),
                    });
                    println!("{}", to_json(&output));
                    match e {
                        PipelineError::Generation(_) => ExitCode::from(2),
                        _ => ExitCode::FAILURE,
                    }
                }
            }
        }
    }
}

fn to_json(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!(r#"{{"error": "{e}"}}"#))
}
