use super::normalize::NormalizedText;
use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static RE_CONFIRMATION_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)order\s+confirmation\s+email\s+was\s+sent\s+to\s+(.+?)\s*\(\s*[^\s()]+@[^\s()]+\s*\)")
        .unwrap()
});

static RE_CUSTOMER_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:customer|contact\s+information)$").unwrap());

static RE_ADDRESS_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:shipping|billing)\s+address$").unwrap());

static RE_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").unwrap()
});

static RE_EMAIL_LABELED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bemail\s*:\s*([a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,})\b").unwrap()
});

// North American shape, optional +1 country code. The leading group keeps us
// from starting inside a longer digit run (order numbers, SKUs).
static RE_PHONE_NANP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\d+#])((?:\+?1[\s.-]?)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4})(?:$|\D)").unwrap()
});

static RE_PHONE_LABELED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:phone|tel|contact)\s*:\s*(\+?[\d()][\d\s().-]{7,})").unwrap()
});

static RE_ORDER_VENDOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)dazzlepremium\s*#\s*(\d+)").unwrap());

static RE_ORDER_GENERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:order\s*#|order\s+number|invoice\s*#)\s*:?\s*#?\s*(\d+)").unwrap()
});

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

pub fn extract_customer_name(text: &NormalizedText) -> Option<String> {
    // "Order confirmation email was sent to Jane Doe (jane@x.com)", possibly wrapped
    if let Some(cap) = RE_CONFIRMATION_NAME.captures(&text.flat) {
        let name = cap[1].trim();
        if !name.is_empty() {
            trace!(strategy = "confirmation", "customer name");
            return Some(name.to_string());
        }
    }

    if let Some(name) = name_after_label(&text.lines, &RE_CUSTOMER_LABEL) {
        trace!(strategy = "customer_label", "customer name");
        return Some(name);
    }

    let name = name_after_label(&text.lines, &RE_ADDRESS_LABEL)?;
    trace!(strategy = "address_label", "customer name");
    Some(name)
}

/// First line following a label line that still looks like a person's name.
fn name_after_label(lines: &[String], label: &Regex) -> Option<String> {
    lines
        .windows(2)
        .filter(|w| label.is_match(&w[0]))
        .map(|w| w[1].as_str())
        .find(|candidate| looks_like_name(candidate))
        .map(str::to_string)
}

fn looks_like_name(line: &str) -> bool {
    if line.contains('@') {
        return false;
    }
    !line
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '+')
}

pub fn extract_email(raw: &str, text: &NormalizedText) -> Option<String> {
    if let Some(m) = RE_EMAIL.find(raw) {
        return Some(m.as_str().to_string());
    }

    text.lines
        .iter()
        .find_map(|l| RE_EMAIL_LABELED.captures(l))
        .map(|c| c[1].to_string())
}

pub fn extract_phone(raw: &str, text: &NormalizedText) -> Option<String> {
    if let Some(cap) = RE_PHONE_NANP.captures(raw) {
        return Some(cap[1].trim().to_string());
    }

    text.lines
        .iter()
        .find_map(|l| RE_PHONE_LABELED.captures(l))
        .map(|c| c[1].trim().to_string())
}

pub fn extract_order_number(text: &NormalizedText) -> Option<String> {
    // Vendor token wins over generic labels wherever both appear
    if let Some(cap) = RE_ORDER_VENDOR.captures(&text.flat) {
        trace!(strategy = "vendor", "order number");
        return Some(cap[1].to_string());
    }

    RE_ORDER_GENERIC
        .captures(&text.flat)
        .map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(s: &str) -> NormalizedText {
        NormalizedText::new(s)
    }

    #[test]
    fn test_name_from_confirmation_line() {
        let raw = "Order confirmation email was sent to Jane Doe (jane@x.com)";
        assert_eq!(extract_customer_name(&norm(raw)).as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_name_from_wrapped_confirmation() {
        let raw = "ORDER CONFIRMATION EMAIL WAS SENT TO\nMary Ann Smith\n(mary@shop.co)";
        assert_eq!(
            extract_customer_name(&norm(raw)).as_deref(),
            Some("Mary Ann Smith")
        );
    }

    #[test]
    fn test_name_after_customer_label() {
        let raw = "Customer\nJohn Smith\njohn@smith.com";
        assert_eq!(extract_customer_name(&norm(raw)).as_deref(), Some("John Smith"));
    }

    #[test]
    fn test_name_after_contact_information_label() {
        let raw = "Contact information\nAlex Rivera\n";
        assert_eq!(extract_customer_name(&norm(raw)).as_deref(), Some("Alex Rivera"));
    }

    #[test]
    fn test_label_followed_by_email_is_skipped() {
        // Contact block only has an email; shipping address supplies the name
        let raw = "Contact information\nalex@x.com\nShipping address\nAlex Rivera\n12 Main St";
        assert_eq!(extract_customer_name(&norm(raw)).as_deref(), Some("Alex Rivera"));
    }

    #[test]
    fn test_label_followed_by_phone_is_rejected() {
        let raw = "Billing address\n+1 555 123 4567";
        assert_eq!(extract_customer_name(&norm(raw)), None);
    }

    #[test]
    fn test_name_not_found() {
        let raw = "nothing useful here";
        assert_eq!(extract_customer_name(&norm(raw)), None);
    }

    #[test]
    fn test_email_first_match_wins() {
        let raw = "from shop@store.com to buyer@mail.org";
        assert_eq!(extract_email(raw, &norm(raw)).as_deref(), Some("shop@store.com"));
    }

    #[test]
    fn test_email_not_found() {
        let raw = "Email: none given";
        assert_eq!(extract_email(raw, &norm(raw)), None);
    }

    #[test]
    fn test_phone_shapes() {
        for (raw, want) in [
            ("call (555) 123-4567 today", "(555) 123-4567"),
            ("Phone +1 555-123-4567", "+1 555-123-4567"),
            ("5551234567", "5551234567"),
        ] {
            assert_eq!(extract_phone(raw, &norm(raw)).as_deref(), Some(want), "{raw}");
        }
    }

    #[test]
    fn test_phone_labeled_fallback() {
        let raw = "Tel: 44 20 7946 0958";
        assert_eq!(extract_phone(raw, &norm(raw)).as_deref(), Some("44 20 7946 0958"));
    }

    #[test]
    fn test_phone_ignores_long_digit_runs() {
        let raw = "dazzlepremium#12345678901234";
        assert_eq!(extract_phone(raw, &norm(raw)), None);
    }

    #[test]
    fn test_order_vendor_token_beats_generic() {
        let raw = "Order # 456\nRef dazzlepremium#123";
        assert_eq!(extract_order_number(&norm(raw)).as_deref(), Some("123"));
        // Same winner on a rerun
        assert_eq!(extract_order_number(&norm(raw)).as_deref(), Some("123"));
    }

    #[test]
    fn test_order_generic_labels() {
        for raw in ["Order #1001", "Order Number: 1001", "INVOICE # 1001", "order\n#1001"] {
            assert_eq!(extract_order_number(&norm(raw)).as_deref(), Some("1001"), "{raw}");
        }
    }

    #[test]
    fn test_order_not_found() {
        assert_eq!(extract_order_number(&norm("Order confirmation")), None);
    }
}
