use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "edm")]
#[command(about = "EduMind backend operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands (EDM_DATABASE_URL)
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> local overrides...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Print a bcrypt hash for a plain-text password
    HashPassword {
        plain: String,

        /// bcrypt cost; defaults to the configured cost
        #[arg(long)]
        cost: Option<u32>,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations.
    Migrate,

    /// Insert the demo accounts and courses. Existing rows are left alone.
    Seed {
        /// Password for every demo account
        #[arg(long, default_value = edm_db::DEMO_PASSWORD)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = edm_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = edm_db::status(&pool).await?;
                    println!("db_ok={} has_users_table={}", s.ok, s.has_users_table);
                }
                DbCmd::Migrate => {
                    edm_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
                DbCmd::Seed { password } => {
                    let cost = configured_cost()?;
                    let hash = bcrypt::hash(&password, cost).context("bcrypt hash failed")?;
                    edm_db::migrate(&pool).await?;
                    let store = edm_db::PgStore::new(pool);
                    let report = edm_db::seed_demo(&store, &hash).await?;
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = edm_config::load_layered_yaml(&path_refs)?;
            loaded.app().context("merged config is not a valid EduMind config")?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::HashPassword { plain, cost } => {
            if plain.chars().count() < 6 {
                anyhow::bail!("password must be at least 6 characters");
            }
            let cost = match cost {
                Some(c) => c,
                None => configured_cost()?,
            };
            let hash = bcrypt::hash(&plain, cost).context("bcrypt hash failed")?;
            println!("{hash}");
        }
    }

    Ok(())
}

/// bcrypt cost from the layered config named by EDM_CONFIG.
fn configured_cost() -> Result<u32> {
    Ok(edm_config::load_from_env()?.app()?.auth.bcrypt_cost)
}
