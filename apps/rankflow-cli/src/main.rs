use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use identity_session::contract::model::{AuditAction, AuditQuery};
use identity_session::{IdentitySession, IdentitySessionConfig};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs};
use secrecy::SecretString;
use uuid::Uuid;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const PASSWORD_ENV: &str = "RANKFLOW_PASSWORD";

/// RankFlow client - session and impersonation control from the terminal
#[derive(Parser)]
#[command(name = "rankflow")]
#[command(about = "RankFlow client - session and impersonation control from the terminal")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current session
    Status,
    /// Log in (password read from RANKFLOW_PASSWORD)
    Login { email: String },
    /// Create an account and log in (password read from RANKFLOW_PASSWORD)
    Register { name: String, email: String },
    /// Act as another user (SUPER_ADMIN only)
    Impersonate { target_id: Uuid },
    /// Return to your own identity
    ExitImpersonate,
    /// Re-read the active identity from the backend
    Refresh,
    /// End the session and forget stored credentials
    Logout,
    /// List audit log entries (SUPER_ADMIN only)
    Audit {
        #[arg(long)]
        action: Option<String>,
        #[arg(long, default_value_t = 0)]
        skip: u32,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
    /// GET a backend resource under /api with the active credential
    Get { path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // Defaults, then the file, then APP__ variables; home_dir comes back absolute
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    runtime::logging::init_logging_from_config(&config.logging_or_default(), &config.home_dir());

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let module_cfg: IdentitySessionConfig = config.module_config("identity_session")?;
    let session = IdentitySession::init(&module_cfg, &config.home_dir())?;
    tracing::debug!(backend = %module_cfg.backend_url, "RankFlow client ready");

    run(&session, cli.command.unwrap_or(Commands::Status)).await
}

async fn run(session: &IdentitySession, command: Commands) -> Result<()> {
    let api = session.api();
    match command {
        Commands::Status => print_json(&api.snapshot()),
        Commands::Login { email } => {
            let identity = api.authenticate(&email, &password()?).await?;
            print_json(&identity)
        }
        Commands::Register { name, email } => {
            let identity = api.register(&name, &email, &password()?).await?;
            print_json(&identity)
        }
        Commands::Impersonate { target_id } => {
            let identity = api.impersonate(target_id).await?;
            print_json(&identity)
        }
        Commands::ExitImpersonate => {
            let identity = api.exit_impersonate().await?;
            print_json(&identity)
        }
        Commands::Refresh => {
            let identity = api.refresh().await?;
            print_json(&identity)
        }
        Commands::Logout => {
            api.logout();
            print_json(&api.snapshot())
        }
        Commands::Audit {
            action,
            skip,
            limit,
        } => {
            let query = AuditQuery {
                action: action.map(AuditAction::from),
                skip,
                limit,
            };
            let page = session.audit().list(&query).await?;
            print_json(&page)
        }
        Commands::Get { path } => {
            let body: serde_json::Value = session.gateway().get_json(&path).await?;
            print_json(&body)
        }
    }
}

fn password() -> Result<SecretString> {
    let raw = std::env::var(PASSWORD_ENV)
        .with_context(|| format!("{PASSWORD_ENV} must be set for this command"))?;
    if raw.is_empty() {
        bail!("{PASSWORD_ENV} is empty");
    }
    Ok(SecretString::from(raw))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
