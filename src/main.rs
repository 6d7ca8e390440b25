//! # docqa CLI
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa serve` | Start the HTTP server |
//! | `docqa ask --upload <files>... "<question>"` | Upload files, then ask one question |
//! | `docqa extract <file>` | Print the text extracted from a PDF or DOCX file |

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use docqa::config;
use docqa::extract::{extract_text, DocumentKind};
use docqa::models::{Answer, UploadFile};
use docqa::store::encode_data_url;
use docqa::DocumentQa;

/// Ask questions about a batch of uploaded documents.
#[derive(Parser)]
#[command(name = "docqa", version)]
struct Cli {
    /// Path to configuration file (TOML). A missing file means defaults.
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server on `[server].bind`.
    Serve {
        /// Override the bind address from the config file.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Upload files as one batch, build the index, and answer a question.
    Ask {
        /// Files to upload. The working directory is replaced by exactly these.
        #[arg(long, required = true, num_args = 1..)]
        upload: Vec<PathBuf>,

        /// The question.
        question: String,
    },

    /// Print the text extracted from a PDF or DOCX file.
    Extract {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("docqa=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract { file } => run_extract(&file)?,
        Commands::Serve { bind } => {
            let mut cfg = config::load_config(&cli.config)?;
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            docqa::server::run_server(&cfg).await?;
        }
        Commands::Ask { upload, question } => {
            let cfg = config::load_config(&cli.config)?;
            let files = upload
                .iter()
                .map(|path| read_upload(path))
                .collect::<anyhow::Result<Vec<_>>>()?;

            let service = DocumentQa::from_config(&cfg).await?;
            let report = service.ingest(files).await?;
            println!(
                "Indexed {} file(s) ({} passages) from {} upload(s)",
                report.indexed_files, report.chunks, report.documents
            );

            match service.query(&question).await? {
                Answer::Text(answer) => println!("\n{}", answer),
                Answer::NoRelevantResult => println!("\n{}", Answer::NO_RELEVANT_MESSAGE),
            }
        }
    }

    Ok(())
}

fn run_extract(path: &Path) -> anyhow::Result<()> {
    let name = file_name(path)?;
    let Some(kind) = DocumentKind::from_file_name(&name) else {
        bail!("{}: only .pdf and .docx files are supported", path.display());
    };
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let text = extract_text(&bytes, kind)?;
    println!("{}", text);
    Ok(())
}

fn read_upload(path: &Path) -> anyhow::Result<UploadFile> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = file_name(path)?;
    let mime = match DocumentKind::from_file_name(&name) {
        Some(DocumentKind::Pdf) => "application/pdf",
        Some(DocumentKind::Docx) => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        None => "text/plain",
    };
    Ok(UploadFile::new(name, encode_data_url(mime, &bytes)))
}

fn file_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))
}
