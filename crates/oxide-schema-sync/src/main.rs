//! oxide-schema CLI
//!
//! Command-line tool for planning and applying schema migrations.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Parser, Subcommand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_schema::{emit, parse, Dialect, Planner, Table};
use oxide_schema_sync::dialect_by_name;
use oxide_schema_sync::prelude::*;

/// Declarative schema migrations.
#[derive(Parser)]
#[command(name = "oxide-schema")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (SQLite path or connection string).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the migration script for a declared schema.
    Plan {
        /// JSON file holding the declared tables.
        #[arg(short, long)]
        schema: PathBuf,

        /// Dialect to render statements for.
        #[arg(long, default_value = "sqlite")]
        dialect: String,

        /// Plan against the tables in this DDL file instead of the database.
        #[arg(long)]
        current_ddl: Option<PathBuf>,
    },

    /// Apply the declared schema to the database.
    Apply {
        /// JSON file holding the declared tables.
        #[arg(short, long)]
        schema: PathBuf,

        /// Allow rebuilding tables (columns not declared are lost).
        #[arg(long)]
        allow_destructive: bool,

        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the live schema.
    Inspect {
        /// Tables to print (all if not specified).
        tables: Vec<String>,

        /// Print JSON instead of DDL.
        #[arg(long)]
        json: bool,
    },

    /// Parse a DDL file and print it back.
    Parse {
        /// DDL file.
        file: PathBuf,

        /// Dialect to re-emit the tables in.
        #[arg(long, default_value = "sqlite")]
        dialect: String,

        /// Print JSON instead of DDL.
        #[arg(long)]
        json: bool,
    },
}

async fn connect(url: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Reads a DDL file, reporting parse errors as `file:line:column`.
fn parse_ddl_file(path: &Path) -> anyhow::Result<Vec<Table>> {
    let sql = std::fs::read_to_string(path)?;
    parse(&sql).map_err(|err| {
        if let oxide_schema::Error::UnsupportedSchema(e) = &err {
            let (line, column) = e.line_column(&sql);
            return anyhow::anyhow!("{}:{line}:{column}: {e}", path.display());
        }
        err.into()
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Plan {
            schema,
            dialect,
            current_ddl,
        } => {
            let dialect = dialect_by_name(&dialect)?;
            let desired = load_schema(&schema)?;
            let plan = match current_ddl {
                Some(path) => {
                    let current = parse_ddl_file(&path)?;
                    Planner::new(dialect).plan(&desired, &current)?
                }
                None => {
                    let pool = connect(&cli.database).await?;
                    Synchronizer::new(pool, SyncOptions::new().dialect(dialect))
                        .plan(&desired)
                        .await?
                }
            };

            if plan.is_empty() {
                info!("No changes.");
            } else {
                if plan.is_destructive() {
                    info!(tables = ?plan.destructive_tables(), "Plan recreates tables");
                }
                print!("{}", plan.script());
            }
        }

        Commands::Apply {
            schema,
            allow_destructive,
            dry_run,
        } => {
            let desired = load_schema(&schema)?;
            let pool = connect(&cli.database).await?;

            if dry_run {
                info!("Dry run mode - SQL will be printed but not executed.");
            }

            let options = SyncOptions::new()
                .allow_destructive(allow_destructive)
                .dry_run(dry_run);
            let report = Synchronizer::new(pool, options).sync(&desired).await?;
            if report.is_noop() {
                info!("Database already matches the declared schema.");
            } else {
                info!(
                    statements = report.executed,
                    recreated = ?report.recreated,
                    "Schema applied"
                );
            }
        }

        Commands::Inspect { tables, json } => {
            let pool = connect(&cli.database).await?;
            let live = SqliteSchemaReader::new(pool).read(&tables).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&live)?);
            } else {
                let dialect = Dialect::sqlite();
                for table in &live {
                    print!("{}", emit(table, &dialect));
                }
            }
        }

        Commands::Parse {
            file,
            dialect,
            json,
        } => {
            let dialect = dialect_by_name(&dialect)?;
            let tables = parse_ddl_file(&file)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tables)?);
            } else {
                for table in &tables {
                    print!("{}", emit(table, &dialect));
                }
            }
        }
    }

    Ok(())
}
