//! Recover customer, order-number and line-item fields from pasted
//! order-management exports.

pub mod config;
pub mod error;
pub mod heuristics;
pub mod order_db;
pub mod order_processor;

pub use error::{ExtractError, StoreError};
pub use heuristics::{
    LineItem, MissingField, ParsedOrder, decode_export, extract_order, extract_order_bytes,
};
