//! folio -- command-line front end for the Folio portfolio API.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use folio_client::auth::Navigator;
use folio_client::config::ClientConfig;
use folio_client::{FolioClient, FolioClientBuilder, LoginRequest};

// ---------------------------------------------------------------------------
// CLI argument parsing (minimal, no clap dependency)
// ---------------------------------------------------------------------------

enum Command {
    Login { email: String, password: String },
    Whoami,
    Holdings,
    Logout,
}

struct CliArgs {
    config_path: Option<PathBuf>,
    command: Command,
}

fn parse_args() -> CliArgs {
    let mut args = std::env::args().skip(1);
    let mut config_path = None;
    let mut positional = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                if let Some(path) = args.next() {
                    config_path = Some(PathBuf::from(path));
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("folio {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown argument: {other}");
                eprintln!("Run with --help for usage information.");
                std::process::exit(1);
            }
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let command = match positional.next().as_deref() {
        Some("login") => match (positional.next(), positional.next()) {
            (Some(email), Some(password)) => Command::Login { email, password },
            _ => {
                eprintln!("Error: login requires <EMAIL> <PASSWORD>");
                std::process::exit(1);
            }
        },
        Some("whoami") => Command::Whoami,
        Some("holdings") => Command::Holdings,
        Some("logout") => Command::Logout,
        Some(other) => {
            eprintln!("Unknown command: {other}");
            eprintln!("Run with --help for usage information.");
            std::process::exit(1);
        }
        None => {
            print_usage();
            std::process::exit(1);
        }
    };

    CliArgs { config_path, command }
}

fn print_usage() {
    println!(
        "\
folio {version} -- Folio portfolio API client

USAGE:
    folio [OPTIONS] <COMMAND>

COMMANDS:
    login <EMAIL> <PASSWORD>    Log in and store the refresh credential
    whoami                      Show the signed-in user
    holdings                    List portfolio holdings
    logout                      End the session and forget the credential

OPTIONS:
    -c, --config <PATH>    Path to configuration file
    -h, --help             Print this help message
    -V, --version          Print version information

ENVIRONMENT:
    RUST_LOG               Override log level (e.g. RUST_LOG=debug)
    FOLIO_CONFIG           Alternative to --config flag
",
        version = env!("CARGO_PKG_VERSION")
    );
}

/// Stands in for a browser router: a redirect is reported, not followed.
#[derive(Default)]
struct TerminalNavigator {
    location: Mutex<String>,
}

impl Navigator for TerminalNavigator {
    fn current_location(&self) -> String {
        self.location
            .lock()
            .map(|l| l.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    fn navigate(&self, path: &str) {
        eprintln!("Session expired. Run `folio login` to sign in again.");
        tracing::info!(path, "Redirected to login");
        let mut location = self.location.lock().unwrap_or_else(|e| e.into_inner());
        *location = path.to_string();
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?
        .block_on(async_main())
}

async fn async_main() -> anyhow::Result<()> {
    let cli = parse_args();

    let config_path = std::env::var("FOLIO_CONFIG")
        .map(PathBuf::from)
        .ok()
        .or(cli.config_path)
        .unwrap_or_else(default_config_path);

    let config = ClientConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    init_tracing(&config);

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "Starting folio"
    );

    let client = FolioClientBuilder::new()
        .config(config)
        .navigator(Arc::new(TerminalNavigator::default()))
        .build()
        .await?;

    run(&client, cli.command).await
}

async fn run(client: &FolioClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Login { email, password } => {
            client.auth().login(&LoginRequest { email, password }).await?;
            println!("Logged in.");
        }
        Command::Whoami => match client.auth().current_user().await? {
            Some(user) => println!("{} <{}>", user.user_name, user.masked_email()),
            None => println!("Not signed in."),
        },
        Command::Holdings => {
            client.ensure_signed_in().await?;
            let holdings = client.holdings().list().await?;
            if holdings.is_empty() {
                println!("No holdings.");
            }
            for h in holdings {
                println!(
                    "{:>6}  {:<12} avg {:>12.4}  bought {:>12.4}",
                    h.id, h.coin_name, h.average_price, h.buying_price
                );
            }
        }
        Command::Logout => {
            client.auth().logout().await?;
            println!("Logged out.");
        }
    }
    Ok(())
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("folio").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("folio.toml"))
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

fn init_tracing(config: &ClientConfig) {
    // RUST_LOG env var takes precedence over config file
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        EnvFilter::new(format!("folio_client={level},folio={level},warn"))
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
