use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "nbp")]
#[command(about = "Nobel trading plan CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> trader overrides ...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Trading plan commands
    Plan {
        #[command(subcommand)]
        cmd: PlanCmd,
    },

    /// Print the mission for one capital value
    Mission {
        /// Capital entering the day
        #[arg(long, allow_hyphen_values = true)]
        capital: f64,

        /// Layered config paths in merge order (default: built-in Nobel rules)
        #[arg(long = "config")]
        config_paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status {
        /// Layered config paths in merge order (names the database URL env var)
        #[arg(long = "config")]
        config_paths: Vec<String>,
    },

    /// Apply SQL migrations (idempotent).
    Migrate {
        /// Layered config paths in merge order (names the database URL env var)
        #[arg(long = "config")]
        config_paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum PlanCmd {
    /// Generate the plan and upsert it keyed by (trader_id, linha).
    Seed {
        /// Layered config paths in merge order (default: built-in Nobel rules)
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Override /plan/trader_id
        #[arg(long)]
        trader_id: Option<String>,

        /// Override /plan/rows
        #[arg(long)]
        rows: Option<u32>,

        /// Override /plan/compounding (realized | nominal)
        #[arg(long)]
        compounding: Option<String>,

        /// Print the generated rows without touching the database
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Print the stored plan ordered by linha
    Show {
        /// Layered config paths in merge order (default: built-in Nobel rules)
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Override /plan/trader_id
        #[arg(long)]
        trader_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => match cmd {
            DbCmd::Status { config_paths } => {
                let cfg = commands::load_plan_config(&config_paths)?;
                commands::db::db_status(&cfg).await?
            }
            DbCmd::Migrate { config_paths } => {
                let cfg = commands::load_plan_config(&config_paths)?;
                commands::db::db_migrate(&cfg).await?
            }
        },

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = nbp_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Plan { cmd } => match cmd {
            PlanCmd::Seed {
                config_paths,
                trader_id,
                rows,
                compounding,
                dry_run,
            } => {
                let cfg = commands::load_plan_config(&config_paths)?;
                let cfg = commands::apply_overrides(cfg, trader_id, rows, compounding)?;
                commands::plan::plan_seed(&cfg, dry_run).await?;
            }

            PlanCmd::Show {
                config_paths,
                trader_id,
            } => {
                let cfg = commands::load_plan_config(&config_paths)?;
                let cfg = commands::apply_overrides(cfg, trader_id, None, None)?;
                commands::plan::plan_show(&cfg).await?;
            }
        },

        Commands::Mission {
            capital,
            config_paths,
        } => {
            let cfg = commands::load_plan_config(&config_paths)?;
            commands::plan::mission(&cfg, capital)?;
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable key=value output.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}
