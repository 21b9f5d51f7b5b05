use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

/// Price texts that mean "no charge". Compared against the trimmed,
/// lower-cased input.
const FREE_WORDS: [&str; 5] = ["free", "rsvp", "no cover", "complimentary", "donation"];

/// First currency-prefixed amount anywhere in the text, e.g. `from $10.50`.
#[expect(clippy::expect_used, reason = "Static regex pattern is valid")]
static CURRENCY_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[$€£]\s*([0-9]{1,3}(?:,[0-9]{3})+|[0-9]+)(?:\.([0-9]+))?")
        .expect("Static regex pattern is guaranteed to be valid")
});

/// The whole text is a bare number, e.g. `25` or `10.50`.
#[expect(clippy::expect_used, reason = "Static regex pattern is valid")]
static BARE_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{1,3}(?:,[0-9]{3})+|[0-9]+)(?:\.([0-9]+))?$")
        .expect("Static regex pattern is guaranteed to be valid")
});

/// Normalize free-form price text into `(is_free, amount_minor)`.
///
/// Empty input and the free words give `(true, None)`. A number, optionally
/// behind a currency symbol, gives `(false, Some(cents))`, and `"$0"` stays a
/// stated zero price `(false, Some(0))`. Anything else is treated as
/// free/unknown.
#[must_use]
pub fn parse_price(raw: Option<&str>) -> (bool, Option<i64>) {
    let Some(text) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return (true, None);
    };
    let lowered = text.to_lowercase();

    if FREE_WORDS.contains(&lowered.as_str()) {
        return (true, None);
    }

    let amount = CURRENCY_AMOUNT
        .captures(&lowered)
        .or_else(|| BARE_AMOUNT.captures(&lowered))
        .and_then(|caps| to_minor_units(&caps));

    if let Some(amount) = amount {
        return (false, Some(amount));
    }

    debug!("Unrecognized price text {text:?}, treating as free");
    (true, None)
}

/// Convert captured whole/fraction digits to cents, rounding half up on the
/// third fractional digit.
fn to_minor_units(caps: &Captures<'_>) -> Option<i64> {
    let whole: i64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;

    let fraction = caps.get(2).map_or("", |m| m.as_str());
    let mut digits = fraction.bytes().map(|b| i64::from(b - b'0'));
    let tens = digits.next().unwrap_or(0);
    let ones = digits.next().unwrap_or(0);
    let round_up = i64::from(digits.next().is_some_and(|d| d >= 5));

    whole
        .checked_mul(100)?
        .checked_add(tens * 10 + ones + round_up)
}
