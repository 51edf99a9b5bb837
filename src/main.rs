//! Task manager server.
//!
//! Serves the task, worker and reference-data routes over HTTP and offers
//! a few admin subcommands for bootstrapping a database.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::Path;
use task_manager::cli::{AddWorkerArgs, Cli, Command};
use task_manager::config::{Config, ConfigLoader, ConfigPaths};
use task_manager::db::Database;
use task_manager::forms::{NameForm, WorkerForm};
use task_manager::http::{self, AppState};
use task_manager::logging::{self, LogTarget};
use task_manager::services;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let Ok(target) = cli.log.parse::<LogTarget>();
    logging::init(&target, cli.verbose)?;

    let mut paths = ConfigPaths::discover();
    if let Some(config_path) = &cli.config {
        paths = paths.with_explicit_file(config_path);
    }
    let mut loader = ConfigLoader::load_with_paths(paths)?;
    if let Some(path) = loader.config_path() {
        info!("Using configuration from {}", path.display());
    }

    let config = loader.config_mut();
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }
    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    let config = loader.into_config();

    let db = open_database(&config.server.db_path)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(db, config).await,
        Command::AddWorker(args) => add_worker(&db, args),
        Command::AddPosition { name } => {
            let position = db.create_position(&clean_name(&name)?)?;
            println!("Created position {} ({})", position.name, position.id);
            Ok(())
        }
        Command::AddTaskType { name } => {
            let task_type = db.create_task_type(&clean_name(&name)?)?;
            println!("Created task type {} ({})", task_type.name, task_type.id);
            Ok(())
        }
    }
}

fn open_database(path: &Path) -> Result<Database> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating database directory {}", parent.display()))?;
    }
    let db = Database::open(path)
        .with_context(|| format!("opening database {}", path.display()))?;
    info!("Database ready at {}", path.display());
    Ok(db)
}

async fn serve(db: Database, config: Config) -> Result<()> {
    let addr = config.server.socket_addr()?;
    let (shutdown_tx, bound_addr) = http::start_server(AppState::new(db, config), addr).await?;
    info!("Press Ctrl-C to stop ({})", bound_addr);

    tokio::signal::ctrl_c().await?;
    let _ = shutdown_tx.send(());
    Ok(())
}

fn add_worker(db: &Database, args: AddWorkerArgs) -> Result<()> {
    let mut form = WorkerForm::new()
        .username(args.username)
        .full_name(args.first_name, args.last_name);
    if let Some(email) = args.email {
        form = form.email(email);
    }
    if let Some(name) = args.position {
        let Some(position) = db.find_position_by_name(&name)? else {
            bail!("no position named {:?}; create it with add-position first", name);
        };
        form = form.position(position.id);
    }

    let worker = services::workers::register(db, &form, args.staff)?;
    println!(
        "Created worker {} ({}){}",
        worker.username,
        worker.id,
        if worker.is_staff { " [staff]" } else { "" }
    );
    Ok(())
}

fn clean_name(raw: &str) -> Result<String> {
    NameForm::with_name(raw)
        .clean()
        .map_err(|errors| anyhow::anyhow!("{}", errors))
}
