//! Outbound redirect allowlist. Matching is exact and case sensitive.

pub const REDIRECT_ALLOWLIST: [&str; 5] = [
    "https://github.com/juice-shop/juice-shop",
    "http://shop.spreadshirt.com/juiceshop",
    "http://shop.spreadshirt.de/juiceshop",
    "https://www.stickeryou.com/products/owasp-juice-shop/794",
    "http://leanpub.com/juice-shop",
];

#[must_use]
pub fn is_allowed(url: &str) -> bool {
    REDIRECT_ALLOWLIST.contains(&url)
}
