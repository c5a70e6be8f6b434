use access_portal_core::{
    config::Config,
    domain::Role,
    jwt::{JwtManager, TokenSubject},
    migration, server, telemetry,
};
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "access-portal-core")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (default)
    Serve,
    /// Create the database if needed and apply migrations
    Migrate,
    /// Mint a development session token
    Token {
        #[arg(long)]
        sub: Uuid,
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, value_parser = parse_role)]
        role: Role,
        #[arg(long)]
        manager_level: Option<String>,
    },
}

fn parse_role(raw: &str) -> std::result::Result<Role, String> {
    raw.parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let prometheus = telemetry::init(&config.telemetry);
            info!(
                environment = %config.environment,
                addr = %config.http_addr(),
                "Starting access portal"
            );
            server::run(config, prometheus).await
        }
        Commands::Migrate => {
            telemetry::init(&config.telemetry);
            migration::run_migrations(&config).await
        }
        Commands::Token {
            sub,
            email,
            name,
            role,
            manager_level,
        } => {
            let jwt = JwtManager::new(config.jwt)?;
            let token = jwt.create_token(&TokenSubject {
                id: sub,
                email: &email,
                name: &name,
                role,
                manager_level: manager_level.as_deref(),
            })?;
            println!("{token}");
            Ok(())
        }
    }
}
