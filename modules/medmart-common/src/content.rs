//! Pure text heuristics over message content.
//!
//! Derived-field rules shared by the curation stage and the report queries.

/// Substring patterns that mark a message as carrying price information.
/// Lowercase; matching is case-insensitive on the message side.
const PRICE_PATTERNS: [&str; 6] = ["etb", "birr", "usd", "$", "price", "ህ"];

/// Substring patterns that mark a message as carrying contact information.
const CONTACT_PATTERNS: [&str; 6] = ["09", "+251", "@", "telegram", "call", "ጥያቄ"];

/// Character count of the message text, 0 when the text is absent.
pub fn message_length(text: Option<&str>) -> u32 {
    text.map(|t| t.chars().count() as u32).unwrap_or(0)
}

/// A message is valid when its text is present and non-empty.
pub fn is_valid_text(text: Option<&str>) -> bool {
    text.map(|t| !t.is_empty()).unwrap_or(false)
}

pub fn contains_price(text: &str) -> bool {
    let lower = text.to_lowercase();
    PRICE_PATTERNS.iter().any(|p| lower.contains(p))
}

pub fn contains_contact(text: &str) -> bool {
    let lower = text.to_lowercase();
    CONTACT_PATTERNS.iter().any(|p| lower.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_detected_in_currency_mentions() {
        assert!(contains_price("Price: 100 ETB"));
        assert!(contains_price("Only 50 birr!"));
        assert!(contains_price("Special offer $5"));
        assert!(!contains_price("Free sample available today"));
    }

    #[test]
    fn contact_detected_in_phone_and_handle_mentions() {
        assert!(contains_contact("Call 0912345678"));
        assert!(contains_contact("Contact: +251912345678"));
        assert!(contains_contact("Telegram: @user"));
        assert!(!contains_contact("No further info"));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        assert_eq!(message_length(Some("abc")), 3);
        assert_eq!(message_length(Some("ጤና ይስጥልኝ")), 8);
        assert_eq!(message_length(Some("")), 0);
        assert_eq!(message_length(None), 0);
    }

    #[test]
    fn empty_and_missing_text_are_invalid() {
        assert!(!is_valid_text(None));
        assert!(!is_valid_text(Some("")));
        assert!(is_valid_text(Some("hello")));
        // Whitespace is content as far as validity is concerned.
        assert!(is_valid_text(Some(" ")));
    }
}
