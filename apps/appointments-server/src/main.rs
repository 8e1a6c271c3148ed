use anyhow::{anyhow, Context, Result};
use api_ingress::{ApiIngress, ApiIngressConfig};
use appointments::config::AppointmentsConfig;
use appointments::infra::storage::SqliteOptions;
use appointments::{Appointments, StorageBackend};
use axum::Router;
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs, DatabaseConfig};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const MODULE_NAME: &str = "appointments";

/// Rewrite a SQLite DSN so its file path is absolute, resolving relative
/// paths against `base_dir`. In-memory DSNs pass through unchanged.
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path) -> Result<String> {
    if dsn.eq_ignore_ascii_case("sqlite::memory:") || dsn.eq_ignore_ascii_case("sqlite://:memory:")
    {
        return Ok("sqlite::memory:".to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {})", dsn))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

/// Appointments service: CRUD and price/date range queries over a document store
#[derive(Parser)]
#[command(name = "appointments-server")]
#[command(about = "Appointments service: CRUD and range queries over a document store")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Keep appointments in memory instead of the configured database
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // home_dir comes back absolute and created
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("Appointments server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(config),
    }
}

/// Map the `database` section onto a storage backend.
fn storage_backend(db: &DatabaseConfig, home_dir: &Path) -> Result<StorageBackend> {
    let url = db.url.trim();
    if url.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }

    let options = SqliteOptions {
        max_conns: db.max_conns,
        busy_timeout_ms: db.busy_timeout_ms,
        create_dirs: true,
    };

    if url.starts_with("sqlite:") {
        let dsn = absolutize_sqlite_dsn(url, home_dir)?;
        StorageBackend::from_url(&dsn, options)
    } else {
        StorageBackend::from_url(url, options)
    }
}

fn ingress_from(config: &AppConfig) -> ApiIngress {
    ApiIngress::new(ApiIngressConfig::new(
        &config.server.host,
        config.server.port,
        config.server.timeout_sec,
    ))
}

async fn run_server(config: AppConfig) -> Result<()> {
    let module_cfg = AppointmentsConfig::from_module_value(config.module_config(MODULE_NAME))
        .with_context(|| format!("Invalid modules.{MODULE_NAME} configuration"))?;
    let backend = storage_backend(
        &config.database_or_default(),
        Path::new(&config.server.home_dir),
    )?;

    tracing::info!(?backend, collection = %module_cfg.collection, "Initializing appointments module");
    let module = Appointments::init(&module_cfg, backend).await?;

    let ingress = ingress_from(&config);
    let router = ingress.build_router(module.register_rest(Router::new()));
    let listener = ingress.bind().await?;

    let cancel = CancellationToken::new();
    let _signals = runtime::shutdown::cancel_on_shutdown(cancel.clone());

    api_ingress::serve(listener, router, cancel).await?;
    tracing::info!("Appointments server stopped");
    Ok(())
}

fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    AppointmentsConfig::from_module_value(config.module_config(MODULE_NAME))
        .with_context(|| format!("Invalid modules.{MODULE_NAME} configuration"))?;
    storage_backend(
        &config.database_or_default(),
        Path::new(&config.server.home_dir),
    )?;
    ingress_from(&config).bind_addr()?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}
