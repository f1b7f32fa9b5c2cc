use crate::error::StoreResult;
use crate::heuristics::{LineItem, MissingField, ParsedOrder};
use rusqlite::{Connection, params};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

pub struct OrderStore {
    conn: Connection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredExport {
    pub uid: String,
    /// Where the export came from (file path, "stdin", ...).
    pub source: String,
    pub raw_text: String,
}

impl OrderStore {
    /// Open (or create) the order store. `":memory:"` gives a throwaway database.
    pub fn new<P: AsRef<Path>>(db_path: P) -> StoreResult<Self> {
        let conn = Connection::open(db_path)?;

        // Raw pasted exports, keyed by content hash
        conn.execute(
            "CREATE TABLE IF NOT EXISTS exports (
                uid TEXT PRIMARY KEY,
                source TEXT NOT NULL,
                raw_text TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        // Latest extraction result per export
        conn.execute(
            "CREATE TABLE IF NOT EXISTS parsed_orders (
                uid TEXT PRIMARY KEY,
                customer_name TEXT NOT NULL,
                email_address TEXT NOT NULL,
                phone_number TEXT NOT NULL,
                order_number TEXT NOT NULL,
                items_json TEXT NOT NULL,
                missing_json TEXT NOT NULL,
                is_complete INTEGER NOT NULL DEFAULT 0,
                parsed_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (uid) REFERENCES exports(uid) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_parsed_orders_is_complete ON parsed_orders(is_complete)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_parsed_orders_order_number ON parsed_orders(order_number)",
            [],
        )?;

        info!("Order store initialized");
        Ok(Self { conn })
    }

    /// Content hash of an export; pasting the same text twice gives the same uid.
    pub fn generate_uid(raw_text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(raw_text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn upsert_export(&self, export: &StoredExport) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO exports (uid, source, raw_text)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(uid) DO UPDATE SET source = excluded.source",
            params![export.uid, export.source, export.raw_text],
        )?;
        info!(uid = %export.uid, source = %export.source, "Export stored");
        Ok(())
    }

    /// Store (or replace) the parse result for an export.
    pub fn save_parsed(&self, uid: &str, order: &ParsedOrder) -> StoreResult<()> {
        let items_json = serde_json::to_string(&order.items)?;
        let missing_json = serde_json::to_string(&order.missing_fields)?;

        self.conn.execute(
            "INSERT INTO parsed_orders
                (uid, customer_name, email_address, phone_number, order_number, items_json, missing_json, is_complete)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(uid) DO UPDATE SET
                customer_name = excluded.customer_name,
                email_address = excluded.email_address,
                phone_number = excluded.phone_number,
                order_number = excluded.order_number,
                items_json = excluded.items_json,
                missing_json = excluded.missing_json,
                is_complete = excluded.is_complete,
                parsed_at = CURRENT_TIMESTAMP",
            params![
                uid,
                order.customer_name,
                order.email_address,
                order.phone_number,
                order.order_number,
                items_json,
                missing_json,
                order.is_complete(),
            ],
        )?;
        info!(uid = %uid, complete = order.is_complete(), "Parsed order stored");
        Ok(())
    }

    pub fn get_export(&self, uid: &str) -> StoreResult<Option<StoredExport>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uid, source, raw_text FROM exports WHERE uid = ?1")?;
        let mut rows = stmt.query(params![uid])?;
        match rows.next()? {
            Some(row) => Ok(Some(StoredExport {
                uid: row.get(0)?,
                source: row.get(1)?,
                raw_text: row.get(2)?,
            })),
            None => Ok(None),
        }
    }

    pub fn get_parsed(&self, uid: &str) -> StoreResult<Option<ParsedOrder>> {
        let mut stmt = self.conn.prepare(
            "SELECT customer_name, email_address, phone_number, order_number, items_json, missing_json
             FROM parsed_orders
             WHERE uid = ?1",
        )?;
        let mut rows = stmt.query(params![uid])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let items_json: String = row.get(4)?;
        let missing_json: String = row.get(5)?;
        let items: Vec<LineItem> = serde_json::from_str(&items_json)?;
        let missing_fields: Vec<MissingField> = serde_json::from_str(&missing_json)?;

        Ok(Some(ParsedOrder {
            customer_name: row.get(0)?,
            email_address: row.get(1)?,
            phone_number: row.get(2)?,
            order_number: row.get(3)?,
            items,
            missing_fields,
        }))
    }

    /// Exports that have never been run through the extractor.
    pub fn get_unparsed_exports(&self) -> StoreResult<Vec<StoredExport>> {
        let mut stmt = self.conn.prepare(
            "SELECT e.uid, e.source, e.raw_text
             FROM exports e
             LEFT JOIN parsed_orders p ON p.uid = e.uid
             WHERE p.uid IS NULL
             ORDER BY e.created_at, e.uid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(StoredExport {
                uid: row.get(0)?,
                source: row.get(1)?,
                raw_text: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Parsed orders that still need a human to fill gaps.
    pub fn get_incomplete_uids(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT uid FROM parsed_orders WHERE is_complete = 0 ORDER BY parsed_at DESC, uid",
        )?;
        let uids = stmt.query_map([], |row| row.get(0))?;
        Ok(uids.collect::<Result<Vec<_>, _>>()?)
    }

    /// (exports, parsed, incomplete)
    pub fn get_counts(&self) -> StoreResult<(usize, usize, usize)> {
        let exports: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM exports", [], |row| row.get(0))?;

        let parsed: usize =
            self.conn
                .query_row("SELECT COUNT(*) FROM parsed_orders", [], |row| row.get(0))?;

        let incomplete: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM parsed_orders WHERE is_complete = 0",
            [],
            |row| row.get(0),
        )?;

        Ok((exports, parsed, incomplete))
    }
}
