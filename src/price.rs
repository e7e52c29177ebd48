/// Digits of the headline price in a card's price block.
///
/// Only the first line counts; the lines after it hold condo fee and IPTU.
pub fn price_digits(price_text: &str) -> String {
    price_text
        .split('\n')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_digit)
        .collect()
}

/// Parse a digit string like "500000" into a price
pub fn parse_price(price_number: &str) -> Option<f64> {
    let trimmed = price_number.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|p| p.is_finite())
}
