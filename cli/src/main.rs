use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use recordkit_core::registry;
use recordkit_sqlite::{DEFAULT_CONFIG_FILE, Migration, MigrationStatus, ProjectConfig, SqliteExecutor};
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "recordkit")]
#[command(about = "Table migrations for recordkit projects")]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Project file declaring the database and models.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Database file, overriding the one named in the project file.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the tables of every declared model (default), drop them, or report their status.
    Migrate(MigrateArgs),
    #[command(external_subcommand)]
    Unknown(Vec<String>),
}

#[derive(Debug, Args)]
struct MigrateArgs {
    #[command(subcommand)]
    operation: Option<MigrateOperation>,
}

#[derive(Debug, Subcommand)]
enum MigrateOperation {
    /// Create missing tables.
    Up,
    /// Drop every table.
    Down,
    /// Show which tables exist and how many rows they hold.
    Status,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate(args) => run_migrate(&cli.global, args),
        Command::Unknown(args) => {
            let name = args.first().map(String::as_str).unwrap_or_default();
            println!("unknown command: {name}");
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_migrate(global: &GlobalArgs, args: MigrateArgs) -> Result<(), String> {
    let config = ProjectConfig::load(&global.config)
        .map_err(|e| format!("Failed to load project file '{}': {e}", global.config.display()))?;
    let db = global.db.clone().unwrap_or_else(|| config.database.clone());

    let registry = config
        .registry()
        .map_err(|e| format!("Invalid models in '{}': {e}", global.config.display()))?;
    let registry =
        registry::install(registry).map_err(|e| format!("Failed to install registry: {e}"))?;
    debug!(config = %global.config.display(), db = %db.display(), "loaded project");

    let executor = SqliteExecutor::open(&db)
        .map_err(|e| format!("Failed to open database '{}': {e}", db.display()))?;
    let mut migration = Migration::new(executor, registry);

    match args.operation.unwrap_or(MigrateOperation::Up) {
        MigrateOperation::Up => {
            let count = migration
                .up()
                .map_err(|e| format!("Migration up failed: {e}"))?;
            println!(
                "Migration up complete. {count} table(s) ensured in '{}'.",
                db.display()
            );
        }
        MigrateOperation::Down => {
            migration
                .down()
                .map_err(|e| format!("Migration down failed: {e}"))?;
            println!("Migration down complete. Tables dropped from '{}'.", db.display());
        }
        MigrateOperation::Status => {
            let status = migration
                .status()
                .map_err(|e| format!("Failed to get migration status: {e}"))?;
            print_status(&db, &status);
        }
    }
    Ok(())
}

fn print_status(db: &Path, status: &MigrationStatus) {
    println!("Migration Status ({}):", db.display());
    for table in &status.tables {
        if table.exists {
            println!("  {}: {} row(s)", table.name, table.row_count);
        } else {
            println!("  {}: missing", table.name);
        }
    }
    println!(
        "  Tables exist: {}",
        if status.tables_exist() { "yes" } else { "no" }
    );
}
