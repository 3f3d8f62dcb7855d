use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use txt_history_analytics::config::AppConfig;
use txt_history_analytics::decoder::{self, DecodeError};
use txt_history_analytics::logging::{init_logging, OperationTimer};
use txt_history_analytics::models::SenderFilter;
use txt_history_analytics::pipeline::Pipeline;
use txt_history_analytics::report_writer::{write_report, write_report_file, ReportFormat};
use txt_history_analytics::source::ChatDbSource;
use txt_history_analytics::validation::InputValidator;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Extra configuration file layered over the defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one conversation from a Messages database
    Analyze {
        /// Path to chat.db (defaults to the configured path)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Phone number or email of the other participant
        #[arg(short, long)]
        contact: Option<String>,

        /// Restrict to one sender: all, me or them
        #[arg(short, long, default_value = "all")]
        sender: SenderFilter,

        /// Keep reaction messages such as Loved “…”
        #[arg(long)]
        no_reaction_filter: bool,

        /// Report format: json or yaml
        #[arg(short, long)]
        format: Option<ReportFormat>,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Recover the text of a raw attributed-body payload
    Decode {
        /// File holding the payload bytes
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_from(cli.config.as_deref())?;

    let log_file = config.logging.file_path.as_deref().map(Path::new);
    let _guard = init_logging(
        Some(&config.get_log_level()),
        log_file,
        config.logging.format == "json",
    )?;

    info!("Starting txt-analytics");

    match cli.command {
        Commands::Analyze {
            db,
            contact,
            sender,
            no_reaction_filter,
            format,
            output,
        } => {
            if no_reaction_filter {
                config.ingest.reaction_filter = false;
            }
            let db_path = db.unwrap_or_else(|| config.get_database_path());
            let contact = contact
                .or_else(|| config.source.contact.clone())
                .ok_or_else(|| anyhow!("No contact given; pass --contact or set source.contact"))?;
            let format = match format {
                Some(format) => format,
                None => config.output.format.parse()?,
            };
            let output = output.or_else(|| config.output.path.clone().map(PathBuf::from));

            analyze(&config, &db_path, &contact, sender, format, output.as_deref()).await?;
        },
        Commands::Decode { file } => decode_file(&file)?,
    }

    Ok(())
}

async fn analyze(
    config: &AppConfig,
    db_path: &Path,
    contact: &str,
    sender: SenderFilter,
    format: ReportFormat,
    output: Option<&Path>,
) -> Result<()> {
    InputValidator::validate_imessage_db_path(db_path)?;
    InputValidator::validate_contact_identifier(contact)?;
    InputValidator::validate_batch_size(config.ingest.batch_size)?;
    if let Some(path) = output {
        InputValidator::validate_output_path(path)?;
    }

    info!(db = %db_path.display(), contact, sender = sender_label(sender), "Analyzing conversation");
    let timer = OperationTimer::new("analyze");

    let source = ChatDbSource::new(db_path, contact);
    let report = Pipeline::from(config)
        .run(&source, sender, Utc::now())
        .await
        .inspect_err(|e| error!(error = %e, "Analysis failed"))
        .context("Analysis failed")?;

    let diagnostics = &report.diagnostics;
    info!(
        rows = diagnostics.rows_read,
        accepted = diagnostics.messages_accepted,
        skipped_no_text = diagnostics.skipped_no_text,
        reactions = diagnostics.reactions_filtered,
        decoded = diagnostics.payloads_decoded,
        undecoded = diagnostics.payloads_undecoded,
        "Ingest summary"
    );
    if diagnostics.messages_accepted == 0 {
        warn!("No messages survived ingest; the report is empty");
    }

    match output {
        Some(path) => {
            write_report_file(&report, format, path)?;
            info!(path = %path.display(), %format, "Report written");
        },
        None => write_report(&report, format, std::io::stdout().lock())?,
    }

    timer.finish();
    Ok(())
}

fn decode_file(path: &Path) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut stdout = std::io::stdout().lock();

    match decoder::decode(&bytes) {
        Ok(decoded) => {
            info!(strategy = %decoded.strategy, "Payload decoded");
            writeln!(stdout, "{}", decoded.text)?;
        },
        Err(DecodeError::EmptyPayload) => warn!("Payload file is empty"),
        Err(DecodeError::Undecodable { diagnostics }) => {
            warn!(
                strings_found = diagnostics.strings_found,
                unique_strings = diagnostics.unique_strings,
                meaningful_strings = diagnostics.meaningful_strings,
                "No strategy recovered text"
            );
            serde_json::to_writer_pretty(&mut stdout, &diagnostics)?;
            writeln!(stdout)?;
        },
    }

    Ok(())
}

const fn sender_label(filter: SenderFilter) -> &'static str {
    match filter {
        SenderFilter::All => "all",
        SenderFilter::Me => "me",
        SenderFilter::Them => "them",
    }
}
