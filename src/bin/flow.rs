use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use flow::migrate::{scaffold, MigrateError};
use flow::{App, Migrator, Request, Response, Router};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flow", version)]
#[command(about = "Run a flow app and manage its database migrations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the development server
    Serve {
        #[arg(long, env = "FLOW_ADDR", default_value = flow::DEFAULT_ADDR)]
        addr: String,
    },
    /// Print the CLI version
    Version,
    /// Database migration commands
    Db {
        /// Directory holding the .up.sql / .down.sql files
        #[arg(long, env = "FLOW_MIGRATIONS_DIR", default_value = "db/migrate", global = true)]
        dir: PathBuf,

        /// SQLite database file
        #[arg(long, env = "FLOW_DATABASE", default_value = "db/flow.db", global = true)]
        database: PathBuf,

        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Subcommand)]
enum DbCommands {
    /// Apply all pending migrations
    Migrate,
    /// Rollback the most recent migration
    Rollback,
    /// Show applied and pending migrations
    Status,
    /// Create an empty up/down migration pair
    New {
        /// What the migration does, e.g. "create users"
        description: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Commands::Serve { addr } => serve(addr),
        Commands::Version => {
            println!("flow {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Db { dir, database, command } => {
            let migrator = Migrator::new(dir);
            match command {
                DbCommands::Migrate => migrate(&migrator, &database),
                DbCommands::Rollback => rollback(&migrator, &database),
                DbCommands::Status => status(&migrator, &database),
                DbCommands::New { description } => {
                    let (up, down) = scaffold::create(migrator.dir(), &description)?;
                    println!("created {}", up.display());
                    println!("created {}", down.display());
                    Ok(())
                }
            }
        }
    }
}

fn serve(addr: String) -> Result<(), Box<dyn Error>> {
    let router = Router::new()
        .get("/", |_req: Request| async { Response::text("Flow app running") })
        .get("/health", |_req: Request| async { Response::json(r#"{"status":"ok"}"#) });

    let app = flow::default_middleware()
        .into_iter()
        .fold(App::new("flow").addr(addr).router(router), App::use_middleware);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(app.serve())?;
    Ok(())
}

fn open(database: &Path) -> Result<Connection, Box<dyn Error>> {
    if let Some(parent) = database.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Connection::open(database)?)
}

fn migrate(migrator: &Migrator, database: &Path) -> Result<(), Box<dyn Error>> {
    let mut conn = open(database)?;

    let pending = migrator.pending(&conn)?;
    if pending.is_empty() {
        println!("No pending migrations to apply.");
        return Ok(());
    }

    let applied = migrator.apply_all(&mut conn)?;
    println!("Applied migrations:");
    for name in applied {
        println!(" - {name}");
    }
    Ok(())
}

fn rollback(migrator: &Migrator, database: &Path) -> Result<(), Box<dyn Error>> {
    let mut conn = open(database)?;
    match migrator.rollback_last(&mut conn) {
        Ok(name) => {
            println!("Rolled back: {name}");
            Ok(())
        }
        Err(MigrateError::NothingToRollback) => {
            println!("No applied migrations found; nothing to rollback.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn status(migrator: &Migrator, database: &Path) -> Result<(), Box<dyn Error>> {
    let conn = open(database)?;
    let applied = Migrator::applied(&conn)?;
    let pending = migrator.pending(&conn)?;

    print_section("Applied migrations:", &applied);
    print_section("Pending migrations:", &pending);
    Ok(())
}

fn print_section(title: &str, names: &[String]) {
    println!("{title}");
    if names.is_empty() {
        println!(" (none)");
    }
    for name in names {
        println!(" - {name}");
    }
}
