// src/order_processor.rs

use crate::config::Config;
use crate::heuristics::{self, MissingField, ParsedOrder};
use crate::order_db::{OrderStore, StoredExport};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Outcome counts for a `batch` run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub complete: usize,
    pub incomplete: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn record(&mut self, order: &ParsedOrder) {
        self.processed += 1;
        if order.is_complete() {
            self.complete += 1;
        } else {
            self.incomplete += 1;
        }
    }
}

/// Emit one structured summary event plus one event per line item.
pub fn log_order(order: &ParsedOrder) {
    let (filled, total) = order.coverage();
    let missing: Vec<&str> = order.missing_fields.iter().map(|f| f.as_str()).collect();
    info!(
        filled = filled,
        total = total,
        customer = %order.customer_name,
        email = %order.email_address,
        phone = %order.phone_number,
        order_number = %order.order_number,
        items = order.items.len(),
        missing = ?missing,
        "Extraction result"
    );
    if order.is_missing(MissingField::OrderItems) {
        warn!("No line items recognized; export needs manual entry");
    }

    for (i, item) in order.items.iter().enumerate() {
        info!(
            idx = i,
            product = %item.product_name,
            style = %item.style_code,
            size = %item.size,
            qty = item.quantity,
            "Line item"
        );
    }
}

/// Persist one export and its parse. `source` labels where the text came from.
pub fn process_text(
    db: &OrderStore,
    source: &str,
    raw_text: &str,
    order: &ParsedOrder,
) -> Result<String, Box<dyn std::error::Error>> {
    let uid = OrderStore::generate_uid(raw_text);
    db.upsert_export(&StoredExport {
        uid: uid.clone(),
        source: source.to_string(),
        raw_text: raw_text.to_string(),
    })?;
    db.save_parsed(&uid, order)?;
    Ok(uid)
}

/// Read one file, extract it, and store both the export and the result.
pub fn process_file(
    path: &Path,
    db: &OrderStore,
) -> Result<(String, ParsedOrder), Box<dyn std::error::Error>> {
    let span = tracing::info_span!("export", file = %path.display());
    let _guard = span.enter();

    let raw_text = heuristics::decode_export(std::fs::read(path)?)?;
    let order = heuristics::extract_order(&raw_text);
    log_order(&order);

    let uid = process_text(db, &path.display().to_string(), &raw_text, &order)?;
    Ok((uid, order))
}

/// Export files in `dir` with the configured extension, sorted by path.
pub fn collect_exports(
    dir: &Path,
    extension: &str,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Extract every export in `dir` in parallel, then store results in file order.
///
/// Each file is one independent extraction on the blocking pool; the number in
/// flight is capped by `cfg.batch_concurrency`. Unreadable or non-UTF-8 files
/// are logged and counted as failed.
pub async fn process_dir(
    dir: &Path,
    cfg: &Config,
    db: &OrderStore,
) -> Result<BatchSummary, Box<dyn std::error::Error>> {
    let files = collect_exports(dir, &cfg.export_extension)?;
    info!(dir = %dir.display(), count = files.len(), "Exports to extract");

    let permits = Arc::new(Semaphore::new(cfg.batch_concurrency.max(1)));
    let mut handles = Vec::with_capacity(files.len());

    for path in files {
        let permits = Arc::clone(&permits);
        handles.push(tokio::spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let task_path = path.clone();
            let result = tokio::task::spawn_blocking(move || {
                let raw_text = heuristics::decode_export(std::fs::read(&task_path)?)?;
                let order = heuristics::extract_order(&raw_text);
                Ok::<_, Box<dyn std::error::Error + Send + Sync>>((raw_text, order))
            })
            .await?;
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>((path, result))
        }));
    }

    let mut summary = BatchSummary::default();
    for handle in handles {
        let (path, result) = match handle.await? {
            Ok(done) => done,
            Err(e) => {
                tracing::error!(error = %e, "Extraction task failed");
                summary.failed += 1;
                continue;
            }
        };

        let span = tracing::info_span!("export", file = %path.display());
        let _guard = span.enter();

        match result {
            Ok((raw_text, order)) => {
                log_order(&order);
                process_text(db, &path.display().to_string(), &raw_text, &order)?;
                summary.record(&order);
            }
            Err(e) => {
                warn!(error = %e, "Skipping export");
                summary.failed += 1;
            }
        }
    }

    info!(
        processed = summary.processed,
        complete = summary.complete,
        incomplete = summary.incomplete,
        failed = summary.failed,
        "Batch complete"
    );
    Ok(summary)
}

/// Run the extractor over stored exports that have no result yet.
pub fn reparse_stored(db: &OrderStore) -> Result<BatchSummary, Box<dyn std::error::Error>> {
    let pending = db.get_unparsed_exports()?;
    info!(count = pending.len(), "Stored exports without a parse");

    let mut summary = BatchSummary::default();
    for export in &pending {
        let span = tracing::info_span!("reparse", uid = %export.uid, source = %export.source);
        let _guard = span.enter();

        let order = heuristics::extract_order(&export.raw_text);
        log_order(&order);
        db.save_parsed(&export.uid, &order)?;
        summary.record(&order);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "order_extract_{name}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_process_file_stores_result() {
        let dir = scratch_dir("single");
        let path = dir.join("order.txt");
        fs::write(&path, "Order #9\nBeanie - BN1\nOS\nx 2\n").unwrap();

        let db = OrderStore::new(":memory:").unwrap();
        let (uid, order) = process_file(&path, &db).unwrap();

        assert_eq!(order.order_number, "9");
        assert_eq!(db.get_parsed(&uid).unwrap(), Some(order));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_process_file_rejects_binary() {
        let dir = scratch_dir("binary");
        let path = dir.join("blob.txt");
        fs::write(&path, [0xffu8, 0xfe, 0x00]).unwrap();

        let db = OrderStore::new(":memory:").unwrap();
        assert!(process_file(&path, &db).is_err());
        assert_eq!(db.get_counts().unwrap(), (0, 0, 0));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_collect_exports_filters_and_sorts() {
        let dir = scratch_dir("collect");
        for name in ["b.txt", "a.TXT", "c.csv"] {
            fs::write(dir.join(name), "x").unwrap();
        }
        let files = collect_exports(&dir, "txt").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.TXT", "b.txt"]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_process_dir_counts_outcomes() {
        let dir = scratch_dir("batch");
        fs::write(
            dir.join("1.txt"),
            "Order #1\nOrder confirmation email was sent to Al Bo (al@bo.com)\n555-201-3344\nCap - C1\nOS\nx 1",
        )
        .unwrap();
        fs::write(dir.join("2.txt"), "Wool Socks - WS01").unwrap();
        fs::write(dir.join("3.txt"), [0xffu8, 0xfe]).unwrap();
        fs::write(dir.join("ignored.md"), "Tee - T1").unwrap();

        let cfg = Config {
            batch_concurrency: 2,
            ..Config::default()
        };
        let db = OrderStore::new(":memory:").unwrap();
        let summary = process_dir(&dir, &cfg, &db).await.unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                processed: 2,
                complete: 1,
                incomplete: 1,
                failed: 1,
            }
        );
        assert_eq!(db.get_counts().unwrap(), (2, 2, 1));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_reparse_stored_fills_gaps() {
        let db = OrderStore::new(":memory:").unwrap();
        let raw = "Scarf - SC1\nx 3";
        db.upsert_export(&StoredExport {
            uid: OrderStore::generate_uid(raw),
            source: "stdin".into(),
            raw_text: raw.into(),
        })
        .unwrap();

        let summary = reparse_stored(&db).unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.incomplete, 1);

        let order = db.get_parsed(&OrderStore::generate_uid(raw)).unwrap().unwrap();
        assert_eq!(order.items[0].quantity, 3);
        assert_eq!(reparse_stored(&db).unwrap().processed, 0);
    }
}
