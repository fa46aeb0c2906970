//! Attachlink composer
//!
//! Composes one outbound mail from a JSON request, applying the configured
//! attachment quota and publishing policy, then prints or sends the result.
//! Also reaps expired publications and inspects guest shares.

mod request;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use attachlink_core::compose::{AttachmentHandler, ComposeSession, HandlerSettings};
use attachlink_core::i18n::{Catalog, Locale, Translator};
use attachlink_core::publish::{Publisher, ShareLinkPublisher, StorePublisher};
use attachlink_core::recipients::{DirectoryError, StaticDirectory, UserResolver};
use attachlink_core::storage::{StorageConfig, StorageDrive, StorageService, StorageShareService};
use attachlink_core::transport::{MailTransport, SmtpTransport};
use attachlink_shared::AppConfig;
use attachlink_shared::config::PublishMode;
use attachlink_shared::types::{ContextId, FolderId, UserId};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use request::{ComposeRequest, OutcomeSummary, deliverable};

#[derive(Parser, Debug)]
#[command(
    name = "attachlink",
    version,
    about = "Compose mails, publishing attachments that exceed the upload quota"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose a mail from a JSON request
    Compose(ComposeArgs),
    /// Delete expired published documents and guest shares
    Purge,
    /// Show the guest share behind a token
    Share {
        /// Share token from a guest link
        token: String,
    },
}

#[derive(Args, Debug)]
struct ComposeArgs {
    /// JSON compose request
    request: PathBuf,

    /// Hand the composed mails to the configured SMTP relay
    #[arg(long)]
    send: bool,

    /// Mail account the request is sent through (0 = primary)
    #[arg(long, default_value_t = 0)]
    account: u32,

    /// Tenant context of the sender
    #[arg(long, default_value = "00000000-0000-0000-0000-000000000000")]
    context: ContextId,

    /// Sender locale, used when the sender is not in the directory
    #[arg(long)]
    locale: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attachlink=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("failed to load configuration")?;

    let storage = Arc::new(StorageService::from_config(StorageConfig::from_settings(
        &config.storage,
    ))?);
    info!(provider = storage.provider_name(), "Storage configured");

    match cli.command {
        Command::Compose(args) => compose(&args, &config, storage).await,
        Command::Purge => purge(&config, &storage).await,
        Command::Share { token } => show_share(&config, &storage, &token).await,
    }
}

async fn compose(
    args: &ComposeArgs,
    config: &AppConfig,
    storage: Arc<StorageService>,
) -> anyhow::Result<()> {
    let json = tokio::fs::read_to_string(&args.request)
        .await
        .with_context(|| format!("cannot read {}", args.request.display()))?;
    let request = ComposeRequest::from_json(&json)?;

    let directory = Arc::new(StaticDirectory::from_config(&config.directory)?);
    let session = sender_session(args, &request, directory.as_ref()).await?;
    info!(
        user = %session.user,
        account = session.account_id,
        locale = %session.locale,
        "Composing mail"
    );

    let base = args
        .request
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    match config.publish.mode {
        PublishMode::Publish => {
            let publisher = StorePublisher::new(Arc::clone(&storage), &config.links);
            run(args, config, &request, &base, session, directory, publisher).await
        }
        PublishMode::ShareLink => {
            let drive = StorageDrive::new(&storage);
            let shares = Arc::new(StorageShareService::new(&storage, &config.links)?);
            let publisher = ShareLinkPublisher::new(
                Arc::new(drive.folders()),
                Arc::new(drive.files()),
                shares,
                config.publish.publishing_folder_name.clone(),
                config.publish.share_link.clone(),
                &config.links,
            );
            run(args, config, &request, &base, session, directory, publisher).await
        }
    }
}

async fn purge(config: &AppConfig, storage: &StorageService) -> anyhow::Result<()> {
    let now = Utc::now();
    let documents = storage.purge_expired(now).await?;
    let shares = StorageShareService::new(storage, &config.links)?
        .purge_expired(now)
        .await?;
    info!(documents, shares, "Expired publications purged");
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "documents": documents,
            "shares": shares,
        }))?
    );
    Ok(())
}

async fn show_share(
    config: &AppConfig,
    storage: &StorageService,
    token: &str,
) -> anyhow::Result<()> {
    let shares = StorageShareService::new(storage, &config.links)?;
    let share = shares
        .lookup(token)
        .await?
        .with_context(|| format!("no live share for token '{token}'"))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "owner": share.owner,
            "share": share.info,
        }))?
    );
    Ok(())
}

/// Identify the sender, falling back to an ad-hoc user for unknown addresses.
async fn sender_session(
    cli: &ComposeArgs,
    request: &ComposeRequest,
    directory: &StaticDirectory,
) -> anyhow::Result<ComposeSession> {
    let address = request.sender()?;
    let (user, locale) = match directory.find_user_by_address(&address, cli.context).await {
        Ok(found) => (found.id, cli.locale.as_deref().map_or(found.locale, Locale::parse)),
        Err(DirectoryError::NotFound(_)) => (
            UserId::new(),
            cli.locale
                .as_deref()
                .map_or_else(Locale::english, Locale::parse),
        ),
        Err(e) => return Err(e.into()),
    };

    Ok(ComposeSession {
        user,
        context: cli.context,
        account_id: cli.account,
        address,
        locale,
        home_folder: FolderId::new(format!("{}/{user}/drive/", cli.context)),
    })
}

async fn run<P: Publisher>(
    cli: &ComposeArgs,
    config: &AppConfig,
    request: &ComposeRequest,
    base: &Path,
    session: ComposeSession,
    directory: Arc<StaticDirectory>,
    publisher: P,
) -> anyhow::Result<()> {
    let translator: Arc<dyn Translator> = Arc::new(Catalog);
    let mut handler = AttachmentHandler::new(
        HandlerSettings::from_config(config),
        session,
        directory,
        translator,
        publisher,
    );

    if let Some(text) = request.text() {
        handler.set_text_part(text);
    }
    for part in request.read_attachments(base).await? {
        handler.add_attachment(part)?;
    }

    let outcome = handler.generate_composed_mails(request.draft()?).await?;

    if cli.send {
        let transport = SmtpTransport::new(&config.email)?;
        let mut sent = 0;
        for mail in deliverable(&outcome.mails) {
            transport.send(mail).await?;
            sent += 1;
        }
        let skipped = outcome.mails.len() - sent;
        if skipped > 0 {
            warn!(skipped, "Mails without recipients were not sent");
        }
        info!(mails = sent, "Mails sent");
    }

    let summary = OutcomeSummary::from(&outcome);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
