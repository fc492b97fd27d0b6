//! Discount coupons valid for exactly one calendar month.
//!
//! The plaintext `<MMM><YY>-<discount>` (for example `OCT26-10`) is Z85 encoded.
//! A coupon only decodes to a discount during the month it was created for;
//! anything else, including a garbled string, is simply "no discount".

use regex::Regex;
use std::sync::LazyLock;
use time::{Month, OffsetDateTime};
use tracing::debug;

static COUPON_FORMAT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEP|OCT|NOV|DEC)[0-9]{2}-[0-9]+$").ok()
});

const fn month_code(month: Month) -> &'static str {
    match month {
        Month::January => "JAN",
        Month::February => "FEB",
        Month::March => "MAR",
        Month::April => "APR",
        Month::May => "MAY",
        Month::June => "JUN",
        Month::July => "JUL",
        Month::August => "AUG",
        Month::September => "SEP",
        Month::October => "OCT",
        Month::November => "NOV",
        Month::December => "DEC",
    }
}

/// Validity tag of `date`, e.g. `OCT26`.
#[must_use]
pub fn validity_tag(date: OffsetDateTime) -> String {
    format!(
        "{}{:02}",
        month_code(date.month()),
        date.year().rem_euclid(100)
    )
}

/// Encode a coupon granting `discount` percent during the month of `at`.
#[must_use]
pub fn encode(discount: u32, at: OffsetDateTime) -> String {
    z85::encode(format!("{}-{discount}", validity_tag(at)))
}

/// Discount granted by `coupon` right now, if any.
#[must_use]
pub fn decode(coupon: &str) -> Option<u32> {
    decode_at(coupon, OffsetDateTime::now_utc())
}

/// Discount granted by `coupon` at `now`, if any.
///
/// The discount value is not range checked.
#[must_use]
pub fn decode_at(coupon: &str, now: OffsetDateTime) -> Option<u32> {
    if coupon.is_empty() {
        return None;
    }
    let bytes = z85::decode(coupon).ok()?;
    let plaintext = String::from_utf8(bytes).ok()?;

    let format = COUPON_FORMAT.as_ref()?;
    if !format.is_match(&plaintext) {
        debug!("malformed coupon");
        return None;
    }

    let (validity, discount) = plaintext.split_once('-')?;
    if validity != validity_tag(now) {
        debug!("coupon {} not valid in {}", validity, validity_tag(now));
        return None;
    }

    discount.parse().ok()
}
