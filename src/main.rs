use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokfetch::commands::{
    config::{Config, Settings},
    get, token_import, token_refresh, token_show,
};
use tokfetch::runtime::RealRuntime;
use tokio_util::sync::CancellationToken;

/// tokfetch - fetch OAuth2-protected resources
///
/// Sends bearer-authenticated GET requests, refreshing the access token when
/// the server rejects it and retrying transient server errors with backoff.
///
/// The OAuth client secret, if any, is read from TOKFETCH_CLIENT_SECRET.
///
/// Examples:
///   tokfetch token import --access-token A --refresh-token R
///   tokfetch --token-url https://idp.example/token get https://api.example/x
#[derive(Parser, Debug)]
#[command(author, version = env!("TOKFETCH_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Token file (defaults to <config dir>/tokfetch/token.json)
    #[arg(long, env = "TOKFETCH_TOKEN_FILE", value_name = "PATH", global = true)]
    token_file: Option<PathBuf>,

    /// OAuth2 token endpoint used for refreshing
    #[arg(long, env = "TOKFETCH_TOKEN_URL", value_name = "URL", global = true)]
    token_url: Option<String>,

    /// OAuth2 client id sent with refresh requests
    #[arg(long, env = "TOKFETCH_CLIENT_ID", value_name = "ID", global = true)]
    client_id: Option<String>,

    /// Maximum number of attempts per request, the first one included
    #[arg(long, value_name = "N", global = true)]
    max_attempts: Option<u32>,

    /// Delay before the first retry, in milliseconds
    #[arg(long, value_name = "MS", global = true)]
    base_delay_ms: Option<u64>,

    /// Upper bound for the backoff delay, in milliseconds
    #[arg(long, value_name = "MS", global = true)]
    max_delay_ms: Option<u64>,

    /// HTTP status to retry (repeatable; defaults to 500, 503 and 504)
    #[arg(long = "retry-status", value_name = "CODE", global = true)]
    retry_statuses: Vec<u16>,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            token_file: self.token_file.clone(),
            token_url: self.token_url.clone(),
            client_id: self.client_id.clone(),
            max_attempts: self.max_attempts,
            base_delay_ms: self.base_delay_ms,
            max_delay_ms: self.max_delay_ms,
            retry_statuses: self.retry_statuses.clone(),
        }
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Fetch a URL and print the response body
    Get(GetArgs),

    /// Manage the stored token
    #[command(subcommand)]
    Token(TokenCommands),
}

#[derive(clap::Args, Debug)]
struct GetArgs {
    /// The URL to fetch
    #[arg(value_name = "URL")]
    url: String,

    /// Write the body to a file instead of stdout
    #[arg(long, short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum TokenCommands {
    /// Show the stored token (masked) and its expiry
    Show,

    /// Refresh the stored token now
    Refresh,

    /// Store a token obtained elsewhere
    Import(ImportArgs),
}

#[derive(clap::Args, Debug)]
struct ImportArgs {
    #[arg(long, env = "TOKFETCH_ACCESS_TOKEN", hide_env_values = true)]
    access_token: String,

    #[arg(long, env = "TOKFETCH_REFRESH_TOKEN", hide_env_values = true)]
    refresh_token: String,

    /// Seconds until the access token expires (default 3600)
    #[arg(long, value_name = "SECONDS")]
    expires_in: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = Config::new(RealRuntime, cli.settings())?;
    let mut stdout = std::io::stdout();

    match cli.command {
        Commands::Get(args) => {
            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    trigger.cancel();
                }
            });
            get(&config, &args.url, args.output.as_deref(), &cancel, &mut stdout).await?
        }
        Commands::Token(TokenCommands::Show) => token_show(&config, &mut stdout)?,
        Commands::Token(TokenCommands::Refresh) => token_refresh(&config, &mut stdout).await?,
        Commands::Token(TokenCommands::Import(args)) => token_import(
            &config,
            &args.access_token,
            &args.refresh_token,
            args.expires_in,
        )?,
    }
    Ok(())
}
