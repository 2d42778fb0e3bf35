use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::{error, info};

use product_import::category::{CategoryPathResolver, MysqlCategoryStore, PathResolution};
use product_import::meta::MetaData;
use product_import::util::db::Db;
use product_import::util::env;
use product_import::util::tracing::init_tracing;

/// Bulk-import category name paths straight into the catalog schema.
#[derive(Debug, Parser)]
#[command(name = "import_categories")]
struct Args {
    /// File with one category name path per line.
    #[arg(long, conflicts_with = "csv")]
    paths: Option<PathBuf>,

    /// CSV file holding category paths in --column.
    #[arg(long, requires = "column")]
    csv: Option<PathBuf>,

    /// CSV column containing the category path.
    #[arg(long)]
    column: Option<String>,

    /// Separator between category names inside one path.
    #[arg(long, default_value = "/")]
    separator: String,

    /// Create categories missing from the tree.
    #[arg(long)]
    auto_create: bool,

    /// Write a JSON run summary to this file.
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Pool size for the store connection.
    #[arg(long, default_value_t = 4)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    env::init_env();
    init_tracing("info")?;
    let args = Args::parse();

    let paths = read_paths(&args)?;
    if paths.is_empty() {
        bail!("no category paths in input");
    }
    info!(paths = paths.len(), auto_create = args.auto_create, "starting category import");

    let db = Db::connect(&env::db_url()?, args.max_connections).await?;
    let meta = Arc::new(MetaData::load(&db).await?);
    let store = MysqlCategoryStore::new(db, meta.clone());
    let mut resolver = CategoryPathResolver::new(store, meta);

    let results = resolver
        .import_category_paths(&paths, args.auto_create, &args.separator)
        .await?;

    let mut resolved = 0usize;
    for (path, result) in paths.iter().zip(&results) {
        match result {
            PathResolution::Resolved(id) => {
                resolved += 1;
                info!(path = %path, id, "resolved");
            }
            PathResolution::NotFound { segment } => {
                error!(path = %path, segment = %segment, "category not found");
            }
        }
    }
    let failed = paths.len() - resolved;
    info!(total = paths.len(), resolved, failed, "category import finished");

    if let Some(out) = &args.summary_json {
        let summary = json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "total": paths.len(),
            "resolved": resolved,
            "failed": failed,
            "results": paths.iter().zip(&results).map(|(path, result)| json!({
                "path": path,
                "id": result.id(),
                "error": match result {
                    PathResolution::NotFound { segment } => {
                        Some(format!("category not found: {segment}"))
                    }
                    PathResolution::Resolved(_) => None,
                },
            })).collect::<Vec<_>>(),
        });
        std::fs::write(out, serde_json::to_string_pretty(&summary)?)
            .with_context(|| format!("writing summary to {}", out.display()))?;
        info!(file = %out.display(), "summary written");
    }

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn read_paths(args: &Args) -> Result<Vec<String>> {
    if let Some(file) = &args.paths {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("reading {}", file.display()))?;
        return Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect());
    }

    if let (Some(file), Some(column)) = (&args.csv, &args.column) {
        let mut reader = csv::Reader::from_path(file)
            .with_context(|| format!("reading {}", file.display()))?;
        let index = reader
            .headers()?
            .iter()
            .position(|header| header == column)
            .with_context(|| format!("column {column} not found in csv header"))?;
        let mut paths = Vec::new();
        for record in reader.records() {
            let record = record?;
            if let Some(value) = record.get(index) {
                let value = value.trim();
                if !value.is_empty() {
                    paths.push(value.to_string());
                }
            }
        }
        return Ok(paths);
    }

    bail!("pass --paths <file> or --csv <file> --column <name>")
}
