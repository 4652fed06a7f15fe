mod jobs;
mod settings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tally_core::StatementId;
use tally_engine::TransferLinker;
use tracing_subscriber::EnvFilter;

use settings::Settings;

#[derive(Parser)]
#[command(name = "tally", about = "Tags, categorizes and links bank statements.")]
struct Cli {
    /// Settings file (default: tally.toml in the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Database file, overriding the settings
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database if it does not exist yet.
    Init,
    /// Upsert categories, tags and patterns from a TOML rules file.
    LoadRules {
        path: PathBuf,
    },
    /// Import a JSON array of statements, classifying each one.
    LoadStatements {
        path: PathBuf,
    },
    /// Re-apply tag and category patterns to every statement.
    Reclassify,
    /// Rebuild the transfer links between statements.
    Relink,
    /// Print the current transfer links.
    Links,
    /// Print one statement with its tags and links.
    Show {
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let db_path = match cli.db {
        Some(path) => path,
        None => settings.database_path()?,
    };
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let pool = tally_storage::create_db(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    match cli.command {
        Commands::Init => {
            println!("Database ready at {}", db_path.display());
        }
        Commands::LoadRules { path } => {
            let rules = jobs::load_rules(&pool, &path).await?;
            println!(
                "Loaded {} categories, {} tags, {} category patterns, {} tag patterns",
                rules.categories.len(),
                rules.tags.len(),
                rules.category_patterns.len(),
                rules.tag_patterns.len()
            );
        }
        Commands::LoadStatements { path } => {
            let report = jobs::load_statements(&pool, &path).await?;
            println!(
                "Inserted {} statements, skipped {} duplicates",
                report.inserted, report.duplicates
            );
        }
        Commands::Reclassify => {
            let report = jobs::reclassify_all(&pool).await?;
            println!(
                "Classified {} statements, {} updated",
                report.statements, report.updated
            );
        }
        Commands::Relink => {
            let linker = TransferLinker::new(settings.link_max_day_span);
            let count = jobs::relink_all(&pool, &linker).await?;
            println!("{count} transfer links");
        }
        Commands::Links => {
            for link in tally_storage::get_links(&pool).await? {
                println!("{} -> {}", link.first_statement_id, link.second_statement_id);
            }
        }
        Commands::Show { id } => {
            let id = StatementId(id);
            let statement = tally_storage::get_statement(&pool, id).await?;
            let links: Vec<_> = tally_storage::get_links(&pool)
                .await?
                .into_iter()
                .filter(|l| l.involves(id))
                .collect();
            let output = serde_json::json!({
                "statement": statement,
                "id_hash": statement.record.id_hash(),
                "content_hash": statement.record.content_hash(),
                "links": links,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
