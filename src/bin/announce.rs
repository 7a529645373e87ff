//! Command-line portal for announcements.
//!
//! Usage:
//!   announce --role student list [--filter all] [--expand]
//!   announce --role coordinator --sender-id c-42 --sender-name "Exams Office" \
//!       post --title "Exam Schedule" --message "Finals start Monday" --to student
//!   announce --role student open <ID>
//!   announce --role admin --remote [--api-url http://localhost:3000] list --filter student
//!
//! Reads the local cache by default; `--remote` talks to the API instead,
//! at `--api-url` or `API_BASE_URL`.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use campus_announcements::{
    config::Config,
    error::AnnouncementError,
    models::{role::Role, session::SessionContext},
    services::{
        composer::{Composer, FormState},
        feed::Feed,
        filter::AudienceFilter,
    },
    store::{AnnouncementStore, LocalStore, RemoteStore},
};

#[derive(Parser)]
#[command(name = "announce", about = "Read and publish university announcements")]
struct Args {
    /// Role of the signed-in user
    #[arg(long, env = "ANNOUNCE_ROLE")]
    role: Role,

    /// Sender identifier from the identity provider
    #[arg(long, env = "ANNOUNCE_SENDER_ID", default_value = "")]
    sender_id: String,

    /// Display name used on published announcements
    #[arg(long, env = "ANNOUNCE_SENDER_NAME", default_value = "")]
    sender_name: String,

    /// Use the announcement API instead of the local cache
    #[arg(long)]
    remote: bool,

    /// Base URL of the announcement API (defaults to API_BASE_URL)
    #[arg(long, requires = "remote")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the announcements visible to this role
    List {
        /// "all", "everyone" or a role tag
        #[arg(long, default_value = "all")]
        filter: String,
        /// Show message bodies
        #[arg(long)]
        expand: bool,
    },
    /// Publish an announcement
    Post {
        #[arg(long)]
        title: String,
        #[arg(long)]
        message: String,
        /// Recipient roles, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        to: Vec<Role>,
        #[arg(long)]
        important: bool,
        /// Reference to an already uploaded attachment
        #[arg(long)]
        attachment: Option<String>,
    },
    /// Expand one announcement and mark it read
    Open { id: Uuid },
}

enum Backend {
    Local(Arc<LocalStore>),
    Remote(Arc<RemoteStore>),
}

impl Backend {
    fn store(&self) -> Arc<dyn AnnouncementStore> {
        match self {
            Backend::Local(s) => s.clone(),
            Backend::Remote(s) => s.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<AnnouncementError>() {
                Some(err) => eprintln!("{}", err.user_message()),
                None => eprintln!("error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let backend = if args.remote {
        let url = args.api_url.as_deref().unwrap_or(&config.api_base_url);
        Backend::Remote(Arc::new(RemoteStore::new(
            url,
            args.role,
            config.request_timeout(),
        )?))
    } else {
        Backend::Local(Arc::new(LocalStore::open(config.cache_path()).await))
    };
    let store = backend.store();

    match args.command {
        Command::List { filter, expand } => {
            let mut feed = load_feed(store.as_ref(), args.role, &AudienceFilter::parse(&filter)).await?;
            if expand {
                let ids: Vec<Uuid> = feed.entries().iter().map(|e| e.announcement.id).collect();
                for id in ids {
                    if let Some(i) = feed.open(id) {
                        if i.newly_read {
                            persist_read(&backend, id, args.role).await?;
                        }
                    }
                }
            }
            print!("{}", feed.render());
            println!("{} unread", feed.unread_count());
        }
        Command::Post {
            title,
            message,
            to,
            important,
            attachment,
        } => {
            let session = SessionContext {
                sender_id: args.sender_id,
                sender_name: args.sender_name,
                role: args.role,
            };
            let composer = Composer::new(store, session);
            let mut form = FormState {
                title,
                message,
                selected_recipients: to.into_iter().collect(),
                attachment_ref: attachment,
                important,
            };
            let created = composer.submit(&mut form).await?;
            println!("Published {}", created.id);
        }
        Command::Open { id } => {
            let mut feed = load_feed(store.as_ref(), args.role, &AudienceFilter::All).await?;
            let Some(interaction) = feed.open(id) else {
                anyhow::bail!("No visible announcement with id {id}");
            };
            if interaction.newly_read {
                persist_read(&backend, id, args.role).await?;
            }
            print!("{}", feed.render_one(id).unwrap_or_default());
        }
    }

    Ok(())
}

async fn load_feed(
    store: &dyn AnnouncementStore,
    viewer: Role,
    audience: &AudienceFilter,
) -> anyhow::Result<Feed> {
    let shown = store.list_visible(viewer, audience).await?;
    Ok(Feed::new(shown, viewer))
}

/// Read marks are viewer-local: only the local cache keeps them.
async fn persist_read(backend: &Backend, id: Uuid, role: Role) -> anyhow::Result<()> {
    if let Backend::Local(store) = backend {
        store.mark_read(id, role).await?;
    }
    Ok(())
}
