// src/heuristics/mod.rs

mod contact;
mod items;
mod normalize;

pub use normalize::NormalizedText;

use crate::error::ExtractError;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use tracing::debug;

pub const CUSTOMER_NAME_NOT_FOUND: &str = "[Customer Name Not Found]";
pub const EMAIL_NOT_FOUND: &str = "[Email Not Found]";
pub const PHONE_NOT_FOUND: &str = "[Phone Not Found]";
pub const ORDER_NUMBER_NOT_FOUND: &str = "[Order # Not Found]";
pub const NO_STYLE_CODE: &str = "N/A";
pub const SIZE_NOT_FOUND: &str = "Size Not Found";
pub const ONE_SIZE: &str = "One Size";

/// A single product line recovered from the export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_name: String,
    /// `N/A` when the line carried no trailing style code.
    pub style_code: String,
    /// `Size Not Found` unless resolved; unsized sock lines read `One Size`.
    pub size: String,
    pub quantity: u32,
}

impl LineItem {
    pub fn has_size(&self) -> bool {
        self.size != SIZE_NOT_FOUND
    }
}

/// A datum a human has to supply or double-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissingField {
    #[serde(rename = "Customer Name")]
    CustomerName,
    #[serde(rename = "Email Address")]
    EmailAddress,
    #[serde(rename = "Phone Number")]
    PhoneNumber,
    #[serde(rename = "Order Number")]
    OrderNumber,
    #[serde(rename = "Order Items")]
    OrderItems,
    #[serde(rename = "Item Sizes")]
    ItemSizes,
}

impl MissingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomerName => "Customer Name",
            Self::EmailAddress => "Email Address",
            Self::PhoneNumber => "Phone Number",
            Self::OrderNumber => "Order Number",
            Self::OrderItems => "Order Items",
            Self::ItemSizes => "Item Sizes",
        }
    }
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything recovered from one pasted order export.
///
/// Every field always holds a value: either what was found or the matching
/// sentinel, with the gap listed in `missing_fields`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedOrder {
    pub customer_name: String,
    pub email_address: String,
    pub phone_number: String,
    pub order_number: String,
    pub items: Vec<LineItem>,
    pub missing_fields: Vec<MissingField>,
}

impl ParsedOrder {
    /// How many top-level fields resolved: the four contact fields plus the item list.
    pub fn coverage(&self) -> (usize, usize) {
        let total = 5;
        let filled = [
            MissingField::CustomerName,
            MissingField::EmailAddress,
            MissingField::PhoneNumber,
            MissingField::OrderNumber,
            MissingField::OrderItems,
        ]
        .iter()
        .filter(|f| !self.missing_fields.contains(*f))
        .count();
        (filled, total)
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields.is_empty()
    }

    pub fn is_missing(&self, field: MissingField) -> bool {
        self.missing_fields.contains(&field)
    }
}

// ---------------------------------------------------------------------------
// Missing-field report + aggregation
// ---------------------------------------------------------------------------

struct ContactFields {
    customer_name: Option<String>,
    email_address: Option<String>,
    phone_number: Option<String>,
    order_number: Option<String>,
}

fn missing_fields(contact: &ContactFields, items: &[LineItem]) -> Vec<MissingField> {
    let mut missing = Vec::new();
    if contact.customer_name.is_none() {
        missing.push(MissingField::CustomerName);
    }
    if contact.email_address.is_none() {
        missing.push(MissingField::EmailAddress);
    }
    if contact.phone_number.is_none() {
        missing.push(MissingField::PhoneNumber);
    }
    if contact.order_number.is_none() {
        missing.push(MissingField::OrderNumber);
    }
    if items.is_empty() {
        missing.push(MissingField::OrderItems);
    }
    if items.iter().any(|i| !i.has_size()) {
        missing.push(MissingField::ItemSizes);
    }
    missing
}

fn aggregate(contact: ContactFields, items: Vec<LineItem>) -> ParsedOrder {
    let missing_fields = missing_fields(&contact, &items);
    ParsedOrder {
        customer_name: contact
            .customer_name
            .unwrap_or_else(|| CUSTOMER_NAME_NOT_FOUND.to_string()),
        email_address: contact
            .email_address
            .unwrap_or_else(|| EMAIL_NOT_FOUND.to_string()),
        phone_number: contact
            .phone_number
            .unwrap_or_else(|| PHONE_NOT_FOUND.to_string()),
        order_number: contact
            .order_number
            .unwrap_or_else(|| ORDER_NUMBER_NOT_FOUND.to_string()),
        items,
        missing_fields,
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Extract a structured order from a pasted order-management export.
///
/// Never fails: anything that cannot be resolved comes back as a sentinel and
/// is listed in `missing_fields`.
pub fn extract_order(text: &str) -> ParsedOrder {
    let normalized = NormalizedText::new(text);

    let contact = ContactFields {
        customer_name: contact::extract_customer_name(&normalized),
        email_address: contact::extract_email(text, &normalized),
        phone_number: contact::extract_phone(text, &normalized),
        order_number: contact::extract_order_number(&normalized),
    };
    let items = items::extract_line_items(&normalized);

    let order = aggregate(contact, items);
    debug!(
        lines = normalized.lines.len(),
        items = order.items.len(),
        missing = order.missing_fields.len(),
        "Order extracted"
    );
    order
}

/// Same as [`extract_order`], for raw bytes that still have to prove they are text.
pub fn extract_order_bytes(bytes: &[u8]) -> Result<ParsedOrder, ExtractError> {
    let text = std::str::from_utf8(bytes)?;
    Ok(extract_order(text))
}

/// Take ownership of a raw export as text, for callers that keep the text after extracting.
pub fn decode_export(bytes: Vec<u8>) -> Result<String, ExtractError> {
    String::from_utf8(bytes).map_err(|e| ExtractError::InvalidUtf8(e.utf8_error()))
}
