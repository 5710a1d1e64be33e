use std::path::PathBuf;

use docmerge_core::archive::archive_to_path;
use docmerge_core::batch::progress::CancelToken;
use docmerge_core::batch::sink::DirectorySink;
use docmerge_core::config::{
    load_config, parse_column_list, validate_config, BatchConfig, MissingPlaceholderPolicy,
};
use docmerge_core::error::DocmergeError;
use docmerge_core::naming::{CollisionPolicy, FilenamePolicy};

use crate::output;

pub struct GenerateArgs {
    pub data: PathBuf,
    pub template: PathBuf,
    pub config: Option<PathBuf>,
    pub required: Option<String>,
    pub filename_template: Option<String>,
    pub filename_columns: Option<String>,
    pub sheet: Option<String>,
    pub on_missing: Option<String>,
    pub collisions: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub zip: Option<PathBuf>,
    pub output: String,
}

pub fn run(args: GenerateArgs) -> Result<(), DocmergeError> {
    let config = resolve_config(&args)?;

    let mut sink = match &args.output_dir {
        Some(dir) => DirectorySink::new(dir),
        None => {
            if args.zip.is_none() {
                eprintln!(
                    "warning: no --output-dir or --zip given; documents are discarded after the run"
                );
            }
            DirectorySink::staging()?
        }
    };

    let progress = output::progress::StderrProgress;
    let result = docmerge_core::generate_from_files(
        &args.data,
        &args.template,
        &config,
        &mut sink,
        &progress,
        &CancelToken::new(),
    )?;

    if let Some(zip_path) = &args.zip {
        let packed = archive_to_path(&result.successes, zip_path)?;
        eprintln!("Packed {packed} document(s) into {}", zip_path.display());
    }

    match args.output.as_str() {
        "json" => output::json::print(&result)?,
        _ => output::table::print_batch(&result, !sink.is_staging()),
    }

    Ok(())
}

/// Config file first, then command-line overrides.
fn resolve_config(args: &GenerateArgs) -> Result<BatchConfig, DocmergeError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => BatchConfig::default(),
    };

    if let Some(required) = &args.required {
        config.required_columns = parse_column_list(required);
    }
    if let Some(template) = &args.filename_template {
        config.filename = FilenamePolicy::Template {
            template: template.clone(),
        };
    }
    if let Some(columns) = &args.filename_columns {
        config.filename = FilenamePolicy::Columns {
            columns: parse_column_list(columns),
        };
    }
    if args.sheet.is_some() {
        config.sheet = args.sheet.clone();
    }
    if let Some(policy) = &args.on_missing {
        config.missing_placeholders = parse_missing_policy(policy)?;
    }
    if let Some(policy) = &args.collisions {
        config.collisions = parse_collision_policy(policy)?;
    }

    validate_config(&config)?;
    tracing::debug!(?config, "resolved batch config");
    Ok(config)
}

fn parse_missing_policy(raw: &str) -> Result<MissingPlaceholderPolicy, DocmergeError> {
    match raw.to_lowercase().as_str() {
        "keep" => Ok(MissingPlaceholderPolicy::Keep),
        "warn" => Ok(MissingPlaceholderPolicy::Warn),
        "fail" => Ok(MissingPlaceholderPolicy::Fail),
        other => Err(DocmergeError::ConfigInvalid(format!(
            "unknown --on-missing policy '{other}' (expected keep, warn or fail)"
        ))),
    }
}

fn parse_collision_policy(raw: &str) -> Result<CollisionPolicy, DocmergeError> {
    match raw.to_lowercase().as_str() {
        "suffix" => Ok(CollisionPolicy::Suffix),
        "overwrite" => Ok(CollisionPolicy::Overwrite),
        other => Err(DocmergeError::ConfigInvalid(format!(
            "unknown --collisions policy '{other}' (expected suffix or overwrite)"
        ))),
    }
}
