//! Token symbol normalization.
//!
//! Balances and bridge requests are keyed by canonical symbol. Wallets and
//! markets report the same asset under several tickers (wrapped native,
//! bridged stablecoin variants, lowercase), so every symbol entering the
//! core passes through [`normalize_symbol`] exactly once.

pub const ETH: &str = "ETH";
pub const USDC: &str = "USDC";
pub const USDT: &str = "USDT";

/// Upper-cased alias → canonical symbol.
const ALIASES: &[(&str, &str)] = &[
    ("WETH", ETH),
    ("USD₮0", USDT),
    ("USDT0", USDT),
    ("USDC.E", USDC),
];

/// Map a reported symbol to its canonical form.
///
/// Unknown symbols are returned upper-cased.
pub fn normalize_symbol(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == upper)
        .map_or(upper, |(_, canonical)| (*canonical).to_string())
}
