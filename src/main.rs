use order_extract::config::Config;
use order_extract::heuristics;
use order_extract::order_db::OrderStore;
use order_extract::order_processor;
use std::io::Read;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: order_extract <command>

commands:
  parse <file|->   extract one export (\"-\" reads stdin) and print JSON
  batch <dir>      extract every export in a directory
  reparse          extract stored exports that have no result yet
  show <uid>       print a stored result as JSON
  stats            print store counts";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load_or_default(Config::path())?;

    // init tracing
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.log_filter))?;
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str);
    let arg = args.get(1).map(String::as_str);

    match (command, arg) {
        (Some("parse"), Some(source)) => parse_one(&cfg, source)?,
        (Some("batch"), Some(dir)) => {
            let db = open_store(&cfg)?;
            order_processor::process_dir(Path::new(dir), &cfg, &db).await?;
        }
        (Some("reparse"), None) => {
            let db = open_store(&cfg)?;
            let summary = order_processor::reparse_stored(&db)?;
            info!(
                processed = summary.processed,
                complete = summary.complete,
                incomplete = summary.incomplete,
                "Reparse complete"
            );
        }
        (Some("show"), Some(uid)) => {
            let db = open_store(&cfg)?;
            let order = db
                .get_parsed(uid)?
                .ok_or_else(|| format!("No parsed order with uid {uid}"))?;
            println!("{}", serde_json::to_string_pretty(&order)?);
        }
        (Some("stats"), None) => {
            let db = open_store(&cfg)?;
            let (exports, parsed, incomplete) = db.get_counts()?;
            info!(exports, parsed, incomplete, "Store statistics");
        }
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}

fn parse_one(cfg: &Config, source: &str) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = if source == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        std::fs::read(source)?
    };

    let raw_text = heuristics::decode_export(bytes)?;
    let order = heuristics::extract_order(&raw_text);
    order_processor::log_order(&order);
    println!("{}", serde_json::to_string_pretty(&order)?);

    if cfg.store_results {
        let db = open_store(cfg)?;
        let label = if source == "-" { "stdin" } else { source };
        let uid = order_processor::process_text(&db, label, &raw_text, &order)?;
        info!(uid = %uid, "STORED");
    }

    Ok(())
}

fn open_store(cfg: &Config) -> Result<OrderStore, Box<dyn std::error::Error>> {
    if let Some(parent) = Path::new(&cfg.db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(OrderStore::new(&cfg.db_path)?)
}
