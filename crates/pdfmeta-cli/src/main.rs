use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Parser;
use pdfmeta_core::{Config, PaperlessClient, PdfSource, SyncError, SyncEvent, TagPolicy};
use tracing_subscriber::EnvFilter;

mod output;

use output::ColorMode;

/// Copy PDF info-dictionary metadata (author, title, creation date, keywords)
/// onto a Paperless document.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Numeric id of the document to update
    #[arg(required_unless_present = "hook")]
    document_id: Option<u64>,

    /// Path to the PDF whose metadata is copied
    #[arg(required_unless_present = "hook")]
    pdf_path: Option<PathBuf>,

    /// Post-consume hook mode: read DOCUMENT_ID and DOCUMENT_SOURCE_PATH from the environment
    #[arg(long, conflicts_with_all = ["document_id", "pdf_path"])]
    hook: bool,

    /// Base URL of the Paperless instance
    #[arg(long)]
    url: Option<String>,

    /// API token
    #[arg(long)]
    token: Option<String>,

    /// How keyword tags combine with existing tags: merge or replace
    #[arg(long)]
    tag_policy: Option<TagPolicy>,

    /// Verify URL and token with one request before doing anything else
    #[arg(long)]
    check_connection: bool,

    /// Dry run: extract and print the metadata without contacting the service
    #[arg(long)]
    dry_run: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing();

    tracing::debug!(
        document_id = ?cli.document_id,
        pdf_path = ?cli.pdf_path,
        hook = cli.hook,
        dry_run = cli.dry_run,
        "parsed arguments"
    );

    // CLI flags > env vars > config file > defaults
    let file = pdfmeta_core::config_file::load_config();
    let config = Config::from_sources(&file, with_flags(&cli, |key| std::env::var(key).ok()))?;
    tracing::debug!(?config, "resolved configuration");

    config.require_token()?;
    let (document_id, pdf_path) = resolve_target(&cli)?;

    tracing::info!(
        base_url = %config.base_url,
        token_set = config.token.is_some(),
        tag_policy = %config.tag_policy,
        document_id,
        "starting metadata sync"
    );

    let color = ColorMode(!cli.no_color && std::io::stdout().is_terminal());
    let mut stdout = std::io::stdout();
    let observer = |event: SyncEvent| output::log_event(&event);
    let source = PdfSource::Path(pdf_path);

    if cli.dry_run {
        let metadata = pdfmeta_ingest::extract_metadata(&source, &observer);
        output::print_metadata(&mut stdout, &source.display_name(), &metadata, color)?;
        return Ok(());
    }

    let client = PaperlessClient::new(&config)?;

    if config.check_connection {
        let count = client.check_connection().await?;
        tracing::info!(api_root = client.api_root(), documents = count, "connection verified");
    }

    let metadata = pdfmeta_ingest::extract_metadata(&source, &observer);
    let report = pdfmeta_core::sync(
        &client,
        document_id,
        &metadata,
        config.tag_policy,
        &observer,
    )
    .await;

    output::print_report(&mut stdout, &report, color)?;

    if let Some(fatal) = report.failures.iter().find(|e| e.is_fatal()) {
        anyhow::bail!("{}", fatal);
    }
    if !report.is_success() {
        anyhow::bail!("document {} was not updated", document_id);
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Layer command-line flags over an environment lookup, so a flag shadows
/// its variable before the variable is ever parsed.
fn with_flags<'a>(
    cli: &'a Cli,
    env: impl Fn(&str) -> Option<String> + 'a,
) -> impl Fn(&str) -> Option<String> + 'a {
    move |key: &str| {
        let flag = match key {
            "PAPERLESS_URL" => cli.url.clone(),
            "PAPERLESS_TOKEN" => cli.token.clone().filter(|t| !t.trim().is_empty()),
            "PDFMETA_TAG_POLICY" => cli.tag_policy.map(|p| p.to_string()),
            "PDFMETA_CHECK_CONNECTION" => cli.check_connection.then(|| "true".to_string()),
            _ => None,
        };
        flag.or_else(|| env(key))
    }
}

/// Document id and PDF path, from the positional arguments or, in hook
/// mode, from the post-consume environment.
fn resolve_target(cli: &Cli) -> Result<(u64, PathBuf), SyncError> {
    if cli.hook {
        return target_from_env(|key| std::env::var(key).ok());
    }
    match (cli.document_id, &cli.pdf_path) {
        (Some(id), Some(path)) => Ok((id, path.clone())),
        _ => Err(SyncError::Configuration(
            "a document id and a PDF path are required".into(),
        )),
    }
}

fn target_from_env(env: impl Fn(&str) -> Option<String>) -> Result<(u64, PathBuf), SyncError> {
    let required = |key: &str| {
        env(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                SyncError::Configuration(format!("{key} environment variable is required in hook mode"))
            })
    };

    let raw_id = required("DOCUMENT_ID")?;
    let document_id = raw_id.parse().map_err(|_| {
        SyncError::Configuration(format!("DOCUMENT_ID must be a numeric id, got {raw_id:?}"))
    })?;
    let path = required("DOCUMENT_SOURCE_PATH")?;

    Ok((document_id, PathBuf::from(path)))
}
