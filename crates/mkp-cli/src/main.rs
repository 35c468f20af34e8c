use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mkp_config::{secrets::resolve_secrets, EngineSettings, UnusedKeyPolicy};
use mkp_pricing::{compute_charge, price_to_micros};
use tracing::info;

#[derive(Parser)]
#[command(name = "mkp")]
#[command(about = "Marketplace operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands (reads MKP_DATABASE_URL)
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env overrides...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Validate layered config: typed settings, secrets, unused keys
    ConfigCheck {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,

        /// Exit non-zero when any config key is not consumed by the engine.
        #[arg(long, default_value_t = false)]
        fail_on_unused: bool,
    },

    /// Price a line without touching any store
    Quote {
        /// Unit price, e.g. 12.50
        #[arg(long)]
        price: f64,

        /// Discount percent, 0..=100
        #[arg(long, default_value_t = 0)]
        discount: i64,

        /// Quantity, >= 1
        #[arg(long)]
        qty: i64,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    /// Connectivity and schema presence
    Status,

    /// Apply embedded SQL migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = mkp_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = mkp_db::status(&pool).await?;
                    println!(
                        "db_ok={} has_items_table={} has_orders_table={}",
                        s.ok, s.has_items_table, s.has_orders_table
                    );
                }
                DbCmd::Migrate => {
                    mkp_db::migrate(&pool).await?;
                    info!("migrations applied");
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = mkp_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::ConfigCheck {
            paths,
            fail_on_unused,
        } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = mkp_config::load_layered_yaml(&path_refs)?;

            let policy = if fail_on_unused {
                UnusedKeyPolicy::Fail
            } else {
                UnusedKeyPolicy::Warn
            };
            let report = mkp_config::report_unused_keys(&loaded.config_json, policy)?;
            let settings = EngineSettings::from_config_json(&loaded.config_json)?;
            let secrets = resolve_secrets(&settings)?;

            println!("config_hash={}", loaded.config_hash);
            println!("bind_addr={}", settings.bind_addr);
            println!("storage_backend={}", settings.storage.backend.as_str());
            println!("database_url_resolved={}", secrets.database_url.is_some());
            println!("lifecycle_policy={}", settings.lifecycle_policy.as_str());
            println!("delete_policy={}", settings.delete_policy.as_str());
            println!("phone_digits={}", settings.ledger.phone_digits);
            println!("delivery_pending_hours={}", settings.ledger.delivery.pending_hours);
            println!("delivery_shipped_hours={}", settings.ledger.delivery.shipped_hours);
            println!("unused_keys={}", report.unused_leaf_pointers.len());
            for p in &report.unused_leaf_pointers {
                println!("unused_key={p}");
            }
        }

        Commands::Quote {
            price,
            discount,
            qty,
        } => {
            let unit = price_to_micros(price)?;
            let discount_pct = u8::try_from(discount)
                .with_context(|| format!("discount must be within 0..=100, got {discount}"))?;
            let total = compute_charge(unit, discount_pct, qty)?;
            println!("unit_price={unit}");
            println!("discount_pct={discount_pct}");
            println!("qty={qty}");
            println!("total={total}");
            println!("total_micros={}", total.raw());
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout carries only `key=value` output.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}
