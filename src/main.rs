use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use job_aggregator::{
    aggregator::{Aggregator, ScrapeStateManager},
    config::Config,
    database::Database,
    models::{SearchQuery, SourceKind},
    sources::SourceRegistry,
    web::WebServer,
};

#[derive(Parser)]
#[command(name = "job-aggregator")]
#[command(version = "0.1.0")]
#[command(about = "Job board aggregation service with saved-job tracking")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP", global = true)]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT", global = true)]
    port: Option<u16>,

    /// Database URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL", global = true)]
    database_url: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP service (default)
    Serve,

    /// Run a search against every source and print a summary
    Search {
        /// Job title or keywords
        job: String,

        /// City or region
        #[arg(default_value = "")]
        location: String,

        /// Listings wanted per source
        #[arg(short = 'n', long, default_value_t = 10)]
        results: u32,

        /// Custom Welcome to the Jungle search URL
        #[arg(long, value_name = "URL")]
        wttj_url: Option<String>,

        /// Print the aggregated payload as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage users and API tokens
    Users {
        #[command(subcommand)]
        command: UserCommand,
    },
}

#[derive(Subcommand)]
enum UserCommand {
    /// Create a user and print a new API token
    Create {
        #[arg(long)]
        email: String,

        #[arg(long)]
        name: Option<String>,
    },

    /// Issue a new API token for an existing user
    Token {
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.log_level == "trace" {
        format!("job_aggregator={},tower_http=trace", cli.log_level)
    } else {
        format!("job_aggregator={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    std::env::set_var("CONFIG_FILE", &cli.config);
    let mut config = Config::load()?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Search {
            job,
            location,
            results,
            wttj_url,
            json,
        } => {
            let query = SearchQuery::new(job, location, results).with_custom_url(wttj_url);
            search(config, query, json).await
        }
        Command::Users { command } => users(config, command).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting Job Aggregator v{}", env!("CARGO_PKG_VERSION"));
    info!("Using database: {}", config.database.url);

    let database = Database::new(&config.database).await?;
    database.migrate().await?;
    info!("Database connection established and migrations applied");

    let state_manager = ScrapeStateManager::new();
    let registry = SourceRegistry::from_config(&config.scraper)?;
    let aggregator = Aggregator::new(registry, state_manager.clone(), config.scraper.source_timeout());

    let web_server = WebServer::new(config, database, aggregator, state_manager)?;

    info!(
        "Starting web server on {}:{}",
        web_server.host(),
        web_server.port()
    );
    web_server.serve().await?;

    Ok(())
}

/// Query each source in turn, the way a smoke test of the scrapers would
async fn search(config: Config, query: SearchQuery, json: bool) -> Result<()> {
    let registry = SourceRegistry::from_config(&config.scraper)?;
    let aggregator = Aggregator::new(registry, ScrapeStateManager::new(), config.scraper.source_timeout());

    if json {
        let results = aggregator.search_all(&query).await;
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!(
        "Searching '{}' in '{}' ({} results per source)\n",
        query.job_query, query.location_query, query.results_wanted
    );

    let mut total = 0;
    let mut failed = Vec::new();
    for kind in aggregator.registry().kinds() {
        let found = aggregator.search_one(kind, &query).await;
        match &found.error {
            Some(error) => {
                println!("{:<24} failed: {}", kind.display_name(), error);
                failed.push(kind);
            }
            None => {
                println!("{:<24} {} jobs", kind.display_name(), found.count);
                for job in found.jobs.iter().take(3) {
                    println!("    - {} | {} | {}", job.title, job.company_name, job.location);
                }
            }
        }
        total += found.count;
    }

    println!("\nTotal: {} jobs from {} sources", total, aggregator.registry().len());
    if !failed.is_empty() {
        println!(
            "Unavailable: {}",
            failed
                .iter()
                .map(SourceKind::display_name)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    Ok(())
}

async fn users(config: Config, command: UserCommand) -> Result<()> {
    let database = Database::new(&config.database).await?;
    database.migrate().await?;

    match command {
        UserCommand::Create { email, name } => {
            let user = database.create_user(&email, name.as_deref()).await?;
            let token = database.issue_token(user.id).await?;
            println!("Created user {} ({})", user.email, user.id);
            println!("API token: {}", token);
        }
        UserCommand::Token { email } => {
            let user = database
                .get_user_by_email(&email)
                .await?
                .ok_or_else(|| anyhow::anyhow!("No user with email {}", email))?;
            let token = database.issue_token(user.id).await?;
            println!("API token for {}: {}", user.email, token);
        }
    }

    Ok(())
}
