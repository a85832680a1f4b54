//! Market data structures for exported events

use crate::error::ExportResult;
use crate::table::CsvTable;
use crate::time::to_local_display;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Columns of the markets CSV
pub const MARKET_COLUMNS: [&str; 10] = [
    "name",
    "condition_id",
    "yes_token",
    "no_token",
    "yes_price",
    "no_price",
    "yes_volume",
    "no_volume",
    "total_volume",
    "updated",
];

/// Columns of the K-line CSV
pub const KLINE_COLUMNS: [&str; 6] = [
    "market_name",
    "market_id",
    "token_type",
    "token_id",
    "price",
    "timestamp",
];

/// Number of decimal places prices are fixed to
pub const PRICE_DECIMALS: u32 = 3;

/// Outcome side of a binary market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeSide {
    Yes,
    No,
}

impl OutcomeSide {
    /// Sides in the order they are collected
    pub const ALL: [OutcomeSide; 2] = [OutcomeSide::Yes, OutcomeSide::No];

    /// Label written into the `token_type` column
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeSide::Yes => "yes",
            OutcomeSide::No => "no",
        }
    }
}

impl fmt::Display for OutcomeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A sub-market of an event after normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMarket {
    /// Display name (group item title, question range, or "Unknown")
    pub name: String,

    /// Condition ID of the market
    pub condition_id: String,

    /// YES outcome token ID (empty when the market has no tokens)
    pub yes_token: String,

    /// NO outcome token ID (empty when the market has no tokens)
    pub no_token: String,

    /// YES price, rounded to 3 decimal places
    pub yes_price: Decimal,

    /// NO price, rounded to 3 decimal places
    pub no_price: Decimal,

    /// Aggregate traded volume. Reused for the yes, no and total volume columns.
    pub volume: Decimal,

    /// Last update timestamp as sent by the API (ISO-8601 UTC)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl NormalizedMarket {
    /// Token ID for an outcome side
    pub fn token(&self, side: OutcomeSide) -> &str {
        match side {
            OutcomeSide::Yes => &self.yes_token,
            OutcomeSide::No => &self.no_token,
        }
    }

    /// YES price as fixed 3-place text
    pub fn yes_price_text(&self) -> String {
        fixed_price(self.yes_price)
    }

    /// NO price as fixed 3-place text
    pub fn no_price_text(&self) -> String {
        fixed_price(self.no_price)
    }

    /// Build the markets CSV row for this market
    ///
    /// Fails with `Format` when `updated_at` is present but not a timestamp.
    pub fn to_csv_row(&self) -> ExportResult<Vec<String>> {
        let updated = match &self.updated_at {
            Some(ts) => to_local_display(ts)?,
            None => String::new(),
        };
        let volume = self.volume.normalize().to_string();

        Ok(vec![
            self.name.clone(),
            self.condition_id.clone(),
            self.yes_token.clone(),
            self.no_token.clone(),
            self.yes_price_text(),
            self.no_price_text(),
            volume.clone(),
            volume.clone(),
            volume,
            updated,
        ])
    }
}

/// Round a price to the export precision
pub fn round_price(price: Decimal) -> Decimal {
    price.round_dp_with_strategy(PRICE_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// Render a price with exactly 3 decimal places
pub fn fixed_price(price: Decimal) -> String {
    format!("{:.3}", round_price(price))
}

/// A single point of a token's price history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KlinePoint {
    /// Unix timestamp in seconds
    pub timestamp: i64,
    /// Price (0.0 - 1.0)
    pub price: Decimal,
}

/// Build the markets table (header + one row per market, in order)
pub fn markets_table(markets: &[NormalizedMarket]) -> ExportResult<CsvTable> {
    let mut table = CsvTable::new(MARKET_COLUMNS);
    for market in markets {
        table.push_row(market.to_csv_row()?)?;
    }
    Ok(table)
}

/// Empty K-line table with its header
pub fn kline_table() -> CsvTable {
    CsvTable::new(KLINE_COLUMNS)
}

/// Build one K-line row
pub fn kline_row(market: &NormalizedMarket, side: OutcomeSide, point: &KlinePoint) -> Vec<String> {
    vec![
        market.name.clone(),
        market.condition_id.clone(),
        side.label().to_string(),
        market.token(side).to_string(),
        point.price.normalize().to_string(),
        point.timestamp.to_string(),
    ]
}
