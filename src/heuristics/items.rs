use super::normalize::NormalizedText;
use super::{LineItem, NO_STYLE_CODE, ONE_SIZE, SIZE_NOT_FOUND};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

/// Lines after the candidate line that the detail scan may look at.
const DETAIL_WINDOW: usize = 5;

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

// "Classic Tee - CT-001": trailing dash-separated style code
static RE_STYLED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^.+ - [a-z0-9-]+$").unwrap());

// "$45.00 x 3"
static RE_PRICED_QTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\$\s*\d[\d,]*(?:\.\d+)?\s*x\s*\d+").unwrap());

static RE_SUMMARY_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)sku|discount|subtotal|shipping|tax|total|paid|balance").unwrap()
});

static RE_PREV_LINE_EXCLUDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)sku|discount|subtotal").unwrap());

static RE_SCAN_STOP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)subtotal|discount|shipping|tax|total|paid|balance").unwrap()
});

// "x 2", "$25.00x2"; not the x inside a word such as "Box 2"
static RE_QUANTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|[^a-z])x\s*(\d+)").unwrap());

static RE_SIZE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[\s(:,])(one\s+size|xxxl|xxl|xl|xs|os|s|m|l)(?:$|[\s),])").unwrap()
});

// "M/Black", "10/NVY": the first token is the size, both touch the slash
static RE_SIZE_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\s)([a-z0-9.]{1,5})/[a-z][a-z0-9-]*").unwrap()
});

static RE_SKU: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)sku").unwrap());

static RE_SOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)sock").unwrap());

// The whole line must be the size, nothing else
static RE_SIZE_NUMERIC_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:(?:us|eu)\s*)?\d{1,2}(?:\.5)?$").unwrap());

// ---------------------------------------------------------------------------
// Candidate detection
// ---------------------------------------------------------------------------

/// A line believed to name a product, plus the text to split into name/style.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    line_idx: usize,
    text: String,
}

fn is_styled_candidate(line: &str) -> bool {
    RE_STYLED_LINE.is_match(line) && !RE_SUMMARY_KEYWORDS.is_match(line)
}

fn find_candidates(lines: &[String]) -> Vec<Candidate> {
    let styled: Vec<Candidate> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| is_styled_candidate(l))
        .map(|(i, l)| Candidate {
            line_idx: i,
            text: l.clone(),
        })
        .collect();

    if !styled.is_empty() {
        debug!(count = styled.len(), "styled item lines");
        return styled;
    }

    // Only when no styled line exists anywhere in the export
    let mut priced = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if !RE_PRICED_QTY.is_match(line) || RE_SUMMARY_KEYWORDS.is_match(line) {
            continue;
        }

        let prev = i.checked_sub(1).map(|p| (p, lines[p].as_str()));
        match prev {
            Some((p, prev_line))
                if prev_line.contains(" - ") && !RE_PREV_LINE_EXCLUDE.is_match(prev_line) =>
            {
                priced.push(Candidate {
                    line_idx: p,
                    text: prev_line.to_string(),
                });
            }
            _ => {
                let name = line.split('$').next().unwrap_or_default().trim();
                priced.push(Candidate {
                    line_idx: i,
                    text: name.to_string(),
                });
            }
        }
    }
    debug!(count = priced.len(), "priced quantity lines (fallback)");
    priced
}

// ---------------------------------------------------------------------------
// Per-candidate parsing
// ---------------------------------------------------------------------------

fn split_name_and_style(text: &str) -> (String, String) {
    match text.rsplit_once(" - ") {
        Some((name, style)) => (name.trim().to_string(), style.trim().to_string()),
        None => (text.trim().to_string(), NO_STYLE_CODE.to_string()),
    }
}

fn match_quantity(line: &str) -> Option<u32> {
    RE_QUANTITY
        .captures(line)
        .and_then(|c| c[1].parse::<u32>().ok())
        .filter(|&q| q >= 1)
}

fn match_size(line: &str) -> Option<String> {
    if let Some(cap) = RE_SIZE_TOKEN.captures(line) {
        return Some(canonical_size(&cap[1]));
    }

    if let Some(cap) = RE_SIZE_PAIR.captures(line) {
        return Some(cap[1].to_uppercase());
    }

    if line.contains('$') || RE_SKU.is_match(line) {
        return None;
    }
    RE_SIZE_NUMERIC_LINE
        .is_match(line)
        .then(|| line.to_uppercase())
}

fn canonical_size(token: &str) -> String {
    let upper = token.to_uppercase();
    if upper.starts_with("ONE") {
        ONE_SIZE.to_string()
    } else {
        upper
    }
}

/// Walk the window after a candidate, freezing size and quantity on first sight.
fn scan_details(lines: &[String], anchor: usize) -> (Option<String>, Option<u32>) {
    let mut size = None;
    let mut quantity = None;
    let end = (anchor + DETAIL_WINDOW + 1).min(lines.len());

    for (j, line) in lines.iter().enumerate().take(end).skip(anchor) {
        if j != anchor && (RE_SCAN_STOP.is_match(line) || is_styled_candidate(line)) {
            break;
        }

        if quantity.is_none() {
            quantity = match_quantity(line);
        }
        if size.is_none() {
            size = match_size(line);
        }
        if size.is_some() && quantity.is_some() {
            break;
        }
    }

    (size, quantity)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn extract_line_items(text: &NormalizedText) -> Vec<LineItem> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut items = Vec::new();
    let mut processed: HashSet<usize> = HashSet::new();

    for candidate in find_candidates(&text.lines) {
        if !processed.insert(candidate.line_idx) {
            continue;
        }

        let (product_name, style_code) = split_name_and_style(&candidate.text);
        let (size, quantity) = scan_details(&text.lines, candidate.line_idx);

        let size = match size {
            Some(s) => s,
            None if RE_SOCK.is_match(&product_name) => ONE_SIZE.to_string(),
            None => SIZE_NOT_FOUND.to_string(),
        };

        items.push(LineItem {
            product_name,
            style_code,
            size,
            quantity: quantity.unwrap_or(1),
        });
    }

    items
}
