use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use verbgraph::config::BackendKind;
use verbgraph::db::{migrate, Db};
use verbgraph::error::GraphError;
use verbgraph::graph::checked_distance;
use verbgraph::{Config, Grapher, GraphRegistry, NodeRef};

#[derive(Parser, Debug)]
#[command(name = "verbgraph")]
#[command(version, about = "Inspect and update a verb-labeled relationship graph")]
struct Cli {
    /// Config file (defaults to $VERBGRAPH_CONFIG, then ./verbgraph.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record an edge: FROM --VERB--> TO (nodes as Type:Value)
    Put {
        from: String,
        verb: String,
        to: String,
    },
    /// List the neighbors of a node
    Neighbors {
        /// Start node as Type:Value
        node: String,
        /// Directed verb such as '>Purchased'; repeatable. Defaults to the node type's configured verbs
        #[arg(short = 'v', long = "verb")]
        verbs: Vec<String>,
        /// Number of hops
        #[arg(short, long, allow_negative_numbers = true)]
        distance: Option<i64>,
        /// Count paths per node and order by count
        #[arg(long)]
        ranked: bool,
        /// Print JSON instead of plain lines
        #[arg(long)]
        json: bool,
    },
    /// Dump the raw members of a store key, e.g. 'User:1:>Purchased'
    Members { key: String },
    /// Run migrations and check the store schema
    Verify,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let _ = dotenv::dotenv();
            Config::from_file(path)?
        }
        None => Config::load()?,
    };

    // Logs go to stderr so query output on stdout stays clean
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.store.log_level.as_str())
    ).init();

    match cli.command.unwrap_or(Command::Verify) {
        Command::Put { from, verb, to } => {
            let grapher = Grapher::from_config(&config, GraphRegistry::new()).await?;
            let from: NodeRef = from.parse()?;
            let to: NodeRef = to.parse()?;
            grapher.put_edge(&from, &verb, &to).await?;
            log::info!("Stored {} --{}--> {}", from, verb, to);
        }
        Command::Neighbors { node, verbs, distance, ranked, json } => {
            let grapher = Grapher::from_config(&config, GraphRegistry::new()).await?;
            let node: NodeRef = node.parse()?;
            let distance = distance.map(checked_distance).transpose()?;
            let verb_refs: Vec<&str> = verbs.iter().map(String::as_str).collect();
            let verbs = if verb_refs.is_empty() { None } else { Some(verb_refs.as_slice()) };

            if ranked {
                let results = grapher.ranked_neighbors_of(&node, verbs, distance).await?;
                if json {
                    let rows: Vec<_> = results
                        .iter()
                        .map(|(count, node)| json!({ "count": count, "node": node }))
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                } else {
                    for (count, node) in &results {
                        println!("{:>6}  {}", count, node);
                    }
                }
            } else {
                let results = grapher.neighbors_of(&node, verbs, distance).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&results)?);
                } else {
                    for node in &results {
                        println!("{}", node);
                    }
                }
            }
        }
        Command::Members { key } => {
            let grapher = Grapher::from_config(&config, GraphRegistry::new()).await?;
            for member in grapher.store().backend().members(&key).await? {
                println!("{}", member);
            }
        }
        Command::Verify => {
            run_verification(&config).await?;
        }
    }

    Ok(())
}

/// Check that the configured store is usable
async fn run_verification(config: &Config) -> Result<()> {
    log::info!("Starting verbgraph v{}", env!("CARGO_PKG_VERSION"));

    let registry = GraphRegistry::from_config(config)?;
    log::info!("Configuration loaded successfully");
    for node in &config.nodes {
        log::debug!("✓ {} default verbs: {:?}", node.type_name, registry.node_verbs(&node.type_name));
    }

    if config.store.backend == BackendKind::Memory {
        log::info!("Memory backend selected: nothing to verify on disk");
        return Ok(());
    }

    log::info!("Database path: {}", config.db_path().display());
    let db = Db::new(config.db_path());
    db.with_connection(|conn| migrate::run_migrations(conn)).await?;
    log::info!("Database initialized successfully");

    db.with_connection(|conn| {
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let tables: Vec<String> = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        for table in ["member_sets", "schema_migrations"] {
            if !tables.iter().any(|t| t == table) {
                log::error!("Missing table: {}", table);
                return Err(GraphError::InvalidConfiguration(format!("missing table {}", table)));
            }
            log::debug!("✓ Table exists: {}", table);
        }

        let applied = migrate::get_applied_migrations(conn)?;
        log::debug!("✓ {} migrations applied", applied.len());

        let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        if journal_mode.to_uppercase() != "WAL" {
            log::warn!("Journal mode is not WAL: {}", journal_mode);
        }

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(GraphError::BackendUnavailable(format!(
                "database integrity check failed: {}",
                integrity
            )));
        }
        log::info!("✓ Database integrity: OK");

        Ok(())
    }).await?;

    log::info!("✓ Store verification complete");
    Ok(())
}
