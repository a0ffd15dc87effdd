use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use ektoken::{Credentials, Session, Signer, Storage, crypto, default_storage};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
mod auth;

fn resolve_storage(path: Option<PathBuf>) -> Result<Storage> {
    match path {
        Some(p) => Ok(Storage::new(p)),
        None => default_storage(),
    }
}

#[derive(Debug, clap::Args)]
struct SessionArgs {
    /// Session token returned by the /at/ endpoint (offset, secret, suffix)
    #[arg(long, value_name = "TOKEN", env = "EKTOKEN_AT_TOKEN", hide_env_values = true)]
    at_token: String,
}

impl SessionArgs {
    fn session(&self) -> Result<Session> {
        Session::from_at_token(&self.at_token).context("invalid --at-token")
    }
}

#[derive(Debug, Parser)]
#[command(name = "ektoken")]
#[command(
    version,
    about = "Build and inspect Electric Kiwi API request tokens."
)]
struct Cli {
    ///Path to the saved credentials file
    #[arg(long, global = true, value_name = "PATH", env = "EKTOKEN_PATH")]
    store: Option<PathBuf>,

    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Encrypts a message into a CryptoJS-compatible Salted__ envelope
    #[command(arg_required_else_help = true)]
    Encrypt { message: String },

    /// Decrypts a Salted__ envelope
    #[command(arg_required_else_help = true)]
    Decrypt { envelope: String },

    /// Prints an x-token header value for an endpoint
    #[command(arg_required_else_help = true)]
    Token {
        #[command(flatten)]
        session: SessionArgs,
        endpoint: String,
    },

    /// Opens an x-token with the session secret and prints its payload
    #[command(arg_required_else_help = true)]
    Open {
        #[command(flatten)]
        session: SessionArgs,
        token: String,
    },

    /// Prints the full authenticated header set for an endpoint
    #[command(arg_required_else_help = true)]
    Headers {
        #[command(flatten)]
        session: SessionArgs,
        /// Session id returned by /login/
        #[arg(long)]
        sid: Option<String>,
        endpoint: String,
    },

    /// Manages saved login credentials
    #[command(subcommand)]
    Creds(CredsCommand),
}

#[derive(Debug, Subcommand)]
enum CredsCommand {
    /// Saves email and password hash
    Save {
        #[arg(long)]
        email: String,
    },
    /// Shows saved email and password hash
    Show,
}

fn setup_logging(verbosity: &Verbosity<WarnLevel>) {
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .init();
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();
    setup_logging(&args.verbose);

    let now: DateTime<Utc> = Utc::now();

    match args.command {
        Commands::Encrypt { message } => {
            let passphrase = auth::read_secret(auth::PASSPHRASE_ENV, "Passphrase: ")?;
            println!("{}", crypto::encrypt(message.as_bytes(), passphrase.as_bytes())?);
        }
        Commands::Decrypt { envelope } => {
            let passphrase = auth::read_secret(auth::PASSPHRASE_ENV, "Passphrase: ")?;
            let plaintext = crypto::decrypt(&envelope, passphrase.as_bytes())?;
            println!("{}", String::from_utf8_lossy(&plaintext));
        }
        Commands::Token { session, endpoint } => {
            println!("{}", session.session()?.build_token(&endpoint, now)?);
        }
        Commands::Open { session, token } => {
            let opened = session.session()?.open_token(&token)?;
            let payload = &opened.payload;
            println!("prefix length: {}", opened.prefix_len);
            println!("endpoint:      {}", payload.endpoint);
            println!("expires at:    {}", payload.expires_at);
            println!("nonce:         {}", payload.nonce);
            println!("expired:       {}", payload.is_expired(now));
        }
        Commands::Headers {
            session,
            sid,
            endpoint,
        } => {
            let signer = Signer::with_session(session.session()?);
            if let Some(sid) = sid {
                signer.set_sid(sid);
            }
            for (name, value) in signer.headers_for(&endpoint, now)? {
                println!("{name}: {value}");
            }
        }
        Commands::Creds(CredsCommand::Save { email }) => {
            let storage = resolve_storage(args.store)?;
            let password = auth::read_secret(auth::PASSWORD_ENV, "Password: ")?;
            Credentials::new(&email, &password)?.save(&storage)?;
            println!("credentials saved to {}", storage.path().display());
        }
        Commands::Creds(CredsCommand::Show) => {
            let storage = resolve_storage(args.store)?;
            let creds = Credentials::load(&storage)?;
            println!("email:         {}", creds.email());
            println!("password hash: {}", creds.password_hash());
            println!("saved:         {}", creds.saved());
        }
    }

    Ok(())
}
