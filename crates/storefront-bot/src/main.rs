use std::env;
use std::sync::Arc;
use std::time::Duration;

use brain_core::{short_fingerprint, Brain};
use catalog::{CatalogProvider, LocalCatalog, RemoteCatalog, RemoteCatalogConfig};
use crm_client::{CrmClient, CrmConfig};
use database::{lead, order, order_status, Database, LeadStatus};
use gemini_brain::GeminiBrain;
use message_listener::{BridgeConfig, EventProcessor, HttpBridgeSource, ProcessorConfig};
use notifier::{Dispatcher, LogNotifier, TelegramConfig, TelegramNotifier};
use orchestrator::{Orchestrator, OrchestratorConfig, OrderPipeline};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info,orchestrator=debug";

const DEFAULT_DATABASE_URL: &str = "sqlite:storefront.db?mode=rwc";
const DEFAULT_CATALOG_FILE: &str = "catalog.json";

const USAGE: &str = "usage: storefront-bot [run | retry-order <id> | retry-pending | check-crm \
                     | ship-order <id> <tracking> | orders <customer> | leads [status]]";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Run,
    RetryOrder(i64),
    RetryPending,
    CheckCrm,
    ShipOrder { order_id: i64, tracking_number: String },
    Orders(String),
    Leads(Option<LeadStatus>),
}

fn order_id_arg(args: &[String]) -> Result<i64, String> {
    let raw = args.get(1).ok_or_else(|| USAGE.to_string())?;
    raw.parse().map_err(|_| format!("invalid order id: {}", raw))
}

fn parse_command(args: &[String]) -> Result<Command, String> {
    match args.first().map(String::as_str) {
        None | Some("run") => Ok(Command::Run),
        Some("check-crm") => Ok(Command::CheckCrm),
        Some("retry-order") => order_id_arg(args).map(Command::RetryOrder),
        Some("retry-pending") => Ok(Command::RetryPending),
        Some("ship-order") => {
            let order_id = order_id_arg(args)?;
            let tracking_number = args
                .get(2)
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .ok_or_else(|| USAGE.to_string())?;
            Ok(Command::ShipOrder {
                order_id,
                tracking_number: tracking_number.to_string(),
            })
        }
        Some("orders") => args
            .get(1)
            .map(|c| Command::Orders(c.clone()))
            .ok_or_else(|| USAGE.to_string()),
        Some("leads") => match args.get(1) {
            None => Ok(Command::Leads(None)),
            Some(raw) => LeadStatus::parse(raw)
                .map(|status| Command::Leads(Some(status)))
                .ok_or_else(|| format!("invalid lead status: {}", raw)),
        },
        Some(other) => Err(format!("unknown command: {}\n{}", other, USAGE)),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Local product store, empty when the file is missing or broken.
async fn load_local_catalog() -> LocalCatalog {
    let path = env::var("CATALOG_FILE").unwrap_or_else(|_| DEFAULT_CATALOG_FILE.to_string());
    match LocalCatalog::load(&path).await {
        Ok(catalog) => {
            info!("Loaded {} products from {}", catalog.products().len(), path);
            catalog
        }
        Err(e) => {
            warn!("No local catalog at {}: {}", path, e);
            LocalCatalog::empty()
        }
    }
}

fn remote_catalog() -> Result<Option<RemoteCatalog>, Box<dyn std::error::Error>> {
    let Some(url) = env::var("CATALOG_URL").ok().filter(|u| !u.trim().is_empty()) else {
        return Ok(None);
    };
    let mut config = RemoteCatalogConfig::new(url.trim());
    if let Ok(secs) = env::var("CATALOG_CACHE_SECS") {
        let secs: u64 = secs.trim().parse().map_err(|_| format!("invalid CATALOG_CACHE_SECS: {}", secs))?;
        config = config.with_cache_ttl(Duration::from_secs(secs));
    }
    info!("Using remote knowledge base at {}", config.base_url);
    Ok(Some(RemoteCatalog::new(config)?))
}

fn dispatcher() -> Result<Dispatcher, Box<dyn std::error::Error>> {
    match TelegramConfig::from_env() {
        Some(config) => {
            info!("Operator alerts go to Telegram chat {}", config.chat_id);
            Ok(Dispatcher::new(TelegramNotifier::new(config)?))
        }
        None => {
            warn!("TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID not set, alerts are logged only");
            Ok(Dispatcher::new(LogNotifier))
        }
    }
}

fn crm_client() -> Result<Option<CrmClient>, Box<dyn std::error::Error>> {
    match CrmConfig::from_env()? {
        Some(config) => Ok(Some(CrmClient::new(config)?)),
        None => Ok(None),
    }
}

async fn open_database() -> Result<Database, Box<dyn std::error::Error>> {
    let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let db = Database::connect(&database_url).await?;
    db.migrate().await?;
    Ok(db)
}

async fn build_orchestrator() -> Result<Orchestrator<HttpBridgeSource>, Box<dyn std::error::Error>> {
    let config = OrchestratorConfig::from_env()?;
    info!(
        prompt = %short_fingerprint(&config.system_prompt),
        phrases = config.escalation_phrases.len(),
        products_mapped = config.product_ids.len(),
        "Loaded orchestrator config"
    );

    let db = open_database().await?;

    let brain: Arc<dyn Brain> = Arc::new(GeminiBrain::from_env()?);
    info!("Generation brain: {}", brain.name());

    let local = Arc::new(load_local_catalog().await);
    let catalog: Arc<dyn CatalogProvider> = match remote_catalog()? {
        Some(remote) => Arc::new(remote),
        None => local.clone() as Arc<dyn CatalogProvider>,
    };

    let source = HttpBridgeSource::new(BridgeConfig::from_env())?;
    info!("Channel bridge at {}", source.config().base_url);

    let product_ids = config.product_ids.clone();
    let timeout = config.generation_timeout;
    let dispatcher = dispatcher()?;
    info!("Alert channel: {}", dispatcher.notifier_name());
    let mut orchestrator = Orchestrator::new(config, db, brain.clone(), catalog, dispatcher, source)
        .with_local_products(local);

    match crm_client()? {
        Some(crm) => {
            if let Err(e) = crm.health_check().await {
                warn!("CRM health check failed, pushes may fail: {}", e);
            }
            let pipeline = OrderPipeline::new(crm, product_ids)
                .with_brain(brain)
                .with_timeout(timeout);
            orchestrator = orchestrator.with_order_pipeline(pipeline);
        }
        None => warn!("CRM_API_KEY not set, confirmed orders are stored but not pushed"),
    }

    Ok(orchestrator)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = parse_command(&args)?;
    info!("storefront-bot {} ({:?})", env!("CARGO_PKG_VERSION"), command);

    match command {
        Command::CheckCrm => {
            let crm = crm_client()?.ok_or("CRM_API_KEY not set")?;
            crm.health_check().await?;
            println!("CRM reachable at {}", crm.config().base_url);
        }
        Command::RetryOrder(order_id) => {
            let orchestrator = build_orchestrator().await?;
            let outcome = orchestrator.retry_order_push(order_id).await?;
            println!(
                "Order {} pushed: client {}, sale {}, amount {}",
                order_id, outcome.client_id, outcome.sale_id, outcome.amount
            );
        }
        Command::RetryPending => {
            let orchestrator = build_orchestrator().await?;
            let pending = order::list_orders_by_status(orchestrator.database().pool(), order_status::NEW).await?;
            info!("{} order(s) waiting for CRM push", pending.len());
            for stored in pending {
                match orchestrator.retry_order_push(stored.id).await {
                    Ok(outcome) => println!("Order {} pushed: sale {}", stored.id, outcome.sale_id),
                    Err(e) => println!("Order {} failed: {}", stored.id, e),
                }
            }
        }
        Command::ShipOrder {
            order_id,
            tracking_number,
        } => {
            let db = open_database().await?;
            order::set_tracking_number(db.pool(), order_id, &tracking_number).await?;
            println!("Order {} shipped, tracking {}", order_id, tracking_number);
        }
        Command::Orders(customer_id) => {
            let db = open_database().await?;
            for stored in order::list_orders_for_customer(db.pool(), &customer_id).await? {
                println!(
                    "#{} {} {} грн [{}] {}",
                    stored.id,
                    stored.created_at,
                    stored.total_price.unwrap_or_default(),
                    stored.status,
                    stored.tracking_number.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Leads(status) => {
            let db = open_database().await?;
            for customer in lead::list_leads(db.pool(), status).await? {
                println!(
                    "{} {} [{}] {} msg",
                    customer.customer_id,
                    customer.phone.as_deref().unwrap_or("-"),
                    customer.status,
                    customer.messages_count
                );
            }
        }
        Command::Run => {
            let orchestrator = build_orchestrator().await?;
            let processor = EventProcessor::new(orchestrator, ProcessorConfig::from_env());
            let stats = processor.run_until_stopped().await;
            info!(
                handled = stats.handled,
                duplicates = stats.duplicates,
                errors = stats.errors,
                "Stopped"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command(&args(&[])), Ok(Command::Run));
        assert_eq!(parse_command(&args(&["run"])), Ok(Command::Run));
        assert_eq!(parse_command(&args(&["check-crm"])), Ok(Command::CheckCrm));
        assert_eq!(parse_command(&args(&["retry-order", "42"])), Ok(Command::RetryOrder(42)));
        assert_eq!(parse_command(&args(&["retry-pending"])), Ok(Command::RetryPending));
        assert_eq!(
            parse_command(&args(&["ship-order", "7", "20450000000000"])),
            Ok(Command::ShipOrder {
                order_id: 7,
                tracking_number: "20450000000000".into()
            })
        );
        assert_eq!(
            parse_command(&args(&["orders", "maria"])),
            Ok(Command::Orders("maria".into()))
        );
        assert_eq!(parse_command(&args(&["leads"])), Ok(Command::Leads(None)));
        assert_eq!(
            parse_command(&args(&["leads", "converted"])),
            Ok(Command::Leads(Some(LeadStatus::Converted)))
        );
    }

    #[test]
    fn test_parse_command_errors() {
        assert!(parse_command(&args(&["retry-order"])).is_err());
        assert!(parse_command(&args(&["retry-order", "x"]))
            .unwrap_err()
            .contains("invalid order id"));
        assert!(parse_command(&args(&["serve"])).unwrap_err().contains("unknown command"));
        assert!(parse_command(&args(&["ship-order", "7"])).is_err());
        assert!(parse_command(&args(&["orders"])).is_err());
        assert!(parse_command(&args(&["leads", "vip"]))
            .unwrap_err()
            .contains("invalid lead status"));
    }
}
