use anyhow::Result;
use clap::{Parser, Subcommand};
use similar_entities::entity::WikibaseClient;
use similar_entities::server::{self, AppState};
use similar_entities::service::{derive_conditions, find_similar, SimilarityRequest};
use similar_entities::sparql::SparqlQueryRunner;
use similar_entities::Config;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "similar-entities")]
#[command(about = "Find Wikibase entities similar to a reference entity")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a JSON array of entities similar to ENTITY_ID
    Find {
        entity_id: String,
        /// Number of results (clamped to 1..=search.max_limit)
        #[arg(short, long)]
        limit: Option<i64>,
        /// Print the full search report instead of the id array
        #[arg(long)]
        report: bool,
    },
    /// Print the conditions derived for ENTITY_ID
    Conditions { entity_id: String },
    /// Serve GET /similar over HTTP
    Serve {
        /// Overrides http_server.port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean JSON
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let args = Args::parse();
    let config = Config::load()?;

    match args.command {
        Command::Find {
            entity_id,
            limit,
            report,
        } => run_find(&config, &entity_id, limit, report).await?,
        Command::Conditions { entity_id } => run_conditions(&config, &entity_id).await?,
        Command::Serve { port } => {
            let port = port.unwrap_or(config.http_server.port);
            log::info!("Starting similar-entities HTTP server v{}", env!("CARGO_PKG_VERSION"));
            let state = AppState::from_config(config)?;
            server::run(state, port).await?;
        }
    }

    Ok(())
}

async fn run_find(config: &Config, entity_id: &str, limit: Option<i64>, report: bool) -> Result<()> {
    let limit = limit.unwrap_or(config.search.default_limit as i64);
    let request = SimilarityRequest::new(entity_id, limit, config.search.max_limit)?;

    let wikibase = WikibaseClient::new(&config.endpoints)?;
    let runner = SparqlQueryRunner::new(&config.endpoints)?;

    let start = Instant::now();
    let outcome = find_similar(&request, &wikibase, &wikibase, &runner, &config.search).await?;
    log::info!(
        "Search for {} took {:?} ({} queries)",
        request.entity_id(),
        start.elapsed(),
        outcome.queries_issued
    );

    if report {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", serde_json::to_string(&outcome.entities)?);
    }

    Ok(())
}

async fn run_conditions(config: &Config, entity_id: &str) -> Result<()> {
    let request = SimilarityRequest::new(entity_id, 1, config.search.max_limit)?;
    let wikibase = WikibaseClient::new(&config.endpoints)?;

    let conditions = derive_conditions(request.entity_id(), &wikibase, &wikibase).await?;
    log::info!(
        "{}: {} value-relevant, {} value-irrelevant conditions",
        request.entity_id(),
        conditions.value_relevant.len(),
        conditions.value_irrelevant.len()
    );

    println!("{}", serde_json::to_string_pretty(&conditions)?);
    Ok(())
}
