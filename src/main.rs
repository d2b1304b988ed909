use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use autoresponder_gateway::config::file::config_file_path;
use autoresponder_gateway::{Config, Daemon};

/// Autoresponder - automatic replies for a `WhatsApp` account
#[derive(Parser)]
#[command(name = "autoresponder", version, about)]
struct Cli {
    /// Port to listen on (overrides the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable the interactive stdin console
    #[arg(long, env = "AUTORESPONDER_NO_CONSOLE")]
    no_console: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the resolved configuration and exit
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,autoresponder_gateway=info",
        1 => "info,autoresponder_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    if let Some(Command::Config) = cli.command {
        print_config(&config);
        return Ok(());
    }

    tracing::info!(
        port = config.server.port,
        spam_limit = config.responder.spam_limit,
        spam_time_window_ms = config.responder.spam_time_window_ms,
        reactivation_time_ms = config.responder.reactivation_time_ms,
        "starting autoresponder gateway"
    );
    tracing::debug!(?config, "loaded configuration");

    if !config.whatsapp.is_configured() {
        anyhow::bail!("WHATSAPP_TOKEN and WHATSAPP_PHONE_ID must be set");
    }

    let daemon = Daemon::new(config)?.console(!cli.no_console);
    daemon.run().await?;

    Ok(())
}

fn print_config(config: &Config) {
    let set_or_not = |present: bool| if present { "set" } else { "not set" };

    println!("Autoresponder configuration");
    println!();
    match config_file_path() {
        Some(path) => println!("  Config file:       {}", path.display()),
        None => println!("  Config file:       (no config directory)"),
    }
    println!();
    println!("  [responder]");
    println!("  Message:           {}", config.responder.auto_response_message);
    println!("  Spam limit:        {}", config.responder.spam_limit);
    println!("  Spam window:       {} ms", config.responder.spam_time_window_ms);
    println!("  Reactivation:      {} ms", config.responder.reactivation_time_ms);
    println!();
    println!("  [whatsapp]");
    println!("  Access token:      {}", set_or_not(config.whatsapp.access_token.is_some()));
    println!(
        "  Phone number ID:   {}",
        config.whatsapp.phone_number_id.as_deref().unwrap_or("not set")
    );
    println!("  API base URL:      {}", config.whatsapp.api_base_url);
    println!(
        "  Owner number:      {}",
        config.whatsapp.owner_number.as_deref().unwrap_or("not set")
    );
    println!();
    println!("  [server]");
    println!("  Port:              {}", config.server.port);
    println!("  API key:           {}", set_or_not(config.server.api_key.is_some()));
    match config.server.webhook_deliveries_per_minute {
        Some(per_minute) => println!("  Webhook limit:     {per_minute}/min per caller"),
        None => println!("  Webhook limit:     unlimited"),
    }
}
