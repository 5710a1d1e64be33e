mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "docmerge",
    version,
    about = "Generate one Word document per spreadsheet row from a placeholder template"
)]
struct Cli {
    /// Log batch progress (info level) unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate documents from a data file and a .docx template
    Generate {
        /// Spreadsheet (xlsx, xls, xlsb, ods) or JSON array of objects
        data: PathBuf,

        /// Word template containing {{name}}, ${name}, {name} or [[name]] markers
        template: PathBuf,

        /// JSON batch config file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Comma-separated columns that must exist in the data
        #[arg(long, value_name = "COLUMNS")]
        required: Option<String>,

        /// File name template, e.g. "Invoice_{{id}}" (a timestamp is appended)
        #[arg(long, value_name = "TEMPLATE", conflicts_with = "filename_columns")]
        filename_template: Option<String>,

        /// Comma-separated columns joined into the file name
        #[arg(long, value_name = "COLUMNS")]
        filename_columns: Option<String>,

        /// Sheet to read (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,

        /// Unmatched placeholders: keep, warn or fail
        #[arg(long, value_name = "POLICY")]
        on_missing: Option<String>,

        /// Duplicate file names: suffix or overwrite
        #[arg(long, value_name = "POLICY")]
        collisions: Option<String>,

        /// Directory for generated documents (default: temporary staging directory)
        #[arg(short = 'd', long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Also pack all generated documents into this zip file
        #[arg(long, value_name = "FILE")]
        zip: Option<PathBuf>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// List the placeholders used by a template
    Inspect {
        /// Word template
        template: PathBuf,

        /// Data file to compare the placeholders against
        #[arg(long, value_name = "FILE")]
        data: Option<PathBuf>,

        /// Sheet to read (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,
    },
    /// Show the columns and row count of a data file
    Columns {
        /// Spreadsheet or JSON data file
        data: PathBuf,

        /// Sheet to read (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Generate {
            data,
            template,
            config,
            required,
            filename_template,
            filename_columns,
            sheet,
            on_missing,
            collisions,
            output_dir,
            zip,
            output,
        } => commands::generate::run(commands::generate::GenerateArgs {
            data,
            template,
            config,
            required,
            filename_template,
            filename_columns,
            sheet,
            on_missing,
            collisions,
            output_dir,
            zip,
            output,
        }),
        Commands::Inspect {
            template,
            data,
            sheet,
        } => commands::inspect::run(template, data, sheet),
        Commands::Columns { data, sheet } => commands::columns::run(data, sheet),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
