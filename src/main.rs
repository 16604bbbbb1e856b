//! SmartKG - star-pattern routing over partitioned RDF sources
//!
//! Command-line front end: shows how the BGPs of a query would be routed against
//! the partition catalog of a source, and optionally downloads the chosen
//! partition files into the local cache.
//!
//! Usage:
//!   smartkg plan --source http://quantum.ex.org/watdiv --query-file q.sparql --fetch

use clap::{Args, Parser, Subcommand};
use serde_json::json;
use smartkg::{
    cache::ObjectCache,
    config::RouterConfig,
    core::{DataSource, QueryContext},
    parsing::parse_bgps,
    routing::RoutingPlanner,
    services::ReqwestFetcher,
    AdmissionError,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "smartkg")]
#[command(about = "Star-pattern routing over SmartKG partitioned sources", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the routing decisions for every BGP of a query
    Plan(PlanArgs),
}

#[derive(Args, Debug)]
struct PlanArgs {
    /// URI of the fragments source
    #[arg(short, long)]
    source: String,

    /// SPARQL query text
    #[arg(short, long, conflicts_with = "query_file", required_unless_present = "query_file")]
    query: Option<String>,

    /// File containing the SPARQL query
    #[arg(long)]
    query_file: Option<PathBuf>,

    /// JSON router configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    cache_dir: Option<PathBuf>,

    #[arg(long)]
    max_families: Option<usize>,

    /// Download the partition files of routed stars
    #[arg(long)]
    fetch: bool,

    /// Also download the HDT index file of each partition
    #[arg(long)]
    fetch_index_files: bool,

    /// HTTP timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

fn load_config(args: &PlanArgs) -> smartkg::Result<RouterConfig> {
    let mut config = match &args.config {
        Some(path) => RouterConfig::from_json_file(path)?,
        None => RouterConfig::default(),
    };
    if let Some(dir) = &args.cache_dir {
        config.cache_dir = dir.clone();
    }
    if let Some(max) = args.max_families {
        config.max_families = max;
    }
    if args.fetch_index_files {
        config.fetch_hdt_index_files = true;
    }
    Ok(config)
}

async fn plan(args: PlanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args)?;
    let query = match (&args.query, &args.query_file) {
        (Some(query), _) => query.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => return Err("either --query or --query-file is required".into()),
    };

    let fetcher = ReqwestFetcher::new(args.timeout_secs.map(Duration::from_secs))?;
    let cache = Arc::new(ObjectCache::new(config.cache_dir.clone(), Arc::new(fetcher))?);
    let planner = RoutingPlanner::new(&config, cache)?;

    let context = QueryContext::new().with_source(DataSource::uri(&args.source));
    let index_uri = planner.index_uri(&context).ok_or(AdmissionError::NoPartitionedSource)?;
    info!("Using SmartKG index {}", index_uri);

    let catalog = planner.load_catalog(&index_uri, &context).await?;
    let mut reports = Vec::new();
    for bgp in parse_bgps(&query)? {
        let patterns: Vec<String> = bgp.patterns().iter().map(ToString::to_string).collect();
        let stars = planner.plan_decisions(&bgp, &catalog);

        let mut report = json!({ "patterns": patterns, "stars": stars });
        if args.fetch {
            let plan = planner.plan(&bgp, &catalog, &index_uri, &context).await?;
            let files: Vec<String> = plan
                .routed
                .iter()
                .flat_map(|routed| routed.sources.iter())
                .filter_map(|source| source.as_path().map(|path| path.display().to_string()))
                .collect();
            report["local_files"] = json!(files);
            report["fallback"] = json!(plan.fallback);
        }
        reports.push(report);
    }

    let output = json!({
        "source": args.source,
        "index_uri": index_uri,
        "families": catalog.families.len(),
        "bgps": reports,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Plan(args) => plan(args).await,
    }
}
