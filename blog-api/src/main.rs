mod application;
mod data;
mod domain;
mod infrastructure;
mod presentation;
mod server;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use infrastructure::config::AppConfig;
use infrastructure::database::create_pool;
use infrastructure::logging::init_logging;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "blog-api", about = "HTTP API for blog posts and users")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server (default)
    Serve(ServeArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Bind address, overrides HOST
    #[arg(long)]
    host: Option<String>,
    /// Listen port, overrides PORT
    #[arg(short, long)]
    port: Option<u16>,
    /// Enable CORS headers, overrides ENABLE_CORS
    #[arg(long)]
    cors: bool,
}

impl ServeArgs {
    fn apply(self, config: &mut AppConfig) {
        if let Some(host) = self.host {
            config.http.host = host;
        }
        if let Some(port) = self.port {
            config.http.port = port;
        }
        if self.cors {
            config.http.cors_enabled = true;
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Command::Serve(args) = cli.command.unwrap_or(Command::Serve(ServeArgs::default()));

    let mut config = AppConfig::from_env().context("invalid configuration")?;
    args.apply(&mut config);

    init_logging(&config.log);

    let options = config
        .database
        .connect_options()
        .inspect_err(|e| error!(error = %e, "invalid database configuration"))?;
    let pool = create_pool(options)
        .await
        .inspect_err(|e| error!(error = %e, "failed to connect to database"))
        .context("failed to connect to database")?;

    server::start_rest_server(config.http, pool).await
}
