//! Polymarket API response types
//!
//! These types mirror the Gamma and CLOB API responses and are converted
//! to polyexport-core types before anything is exported.

use polyexport_core::market::round_price;
use polyexport_core::{KlinePoint, NormalizedMarket};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

/// Base URL for Polymarket Gamma API
pub const GAMMA_API_BASE: &str = "https://gamma-api.polymarket.com";

/// Base URL for the CLOB API (price history)
pub const CLOB_API_BASE: &str = "https://clob.polymarket.com";

/// Name used when neither a group title nor a numeric range is available
pub const UNKNOWN_MARKET_NAME: &str = "Unknown";

/// Numeric range in a question, e.g. "100-119" in "Will Elon tweet 100-119 times?"
static QUESTION_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+-\d+").expect("valid range pattern"));

/// A Polymarket event from `GET /events/slug/{slug}`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolymarketEvent {
    /// Event ID
    #[serde(default)]
    pub id: Option<String>,

    /// Event title
    #[serde(default)]
    pub title: Option<String>,

    /// Event slug
    #[serde(default)]
    pub slug: Option<String>,

    /// Markets in this event
    #[serde(default)]
    pub markets: Vec<PolymarketMarket>,
}

/// A Polymarket market from the Gamma API
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolymarketMarket {
    /// Market question
    #[serde(default)]
    pub question: Option<String>,

    /// Condition ID (used for CLOB)
    #[serde(default)]
    pub condition_id: Option<String>,

    /// CLOB token IDs as a JSON-encoded array: "[\"YES_TOKEN\", \"NO_TOKEN\"]"
    #[serde(default, deserialize_with = "lenient_token_ids")]
    pub clob_token_ids: Option<String>,

    /// Lowest ask for the YES token
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub best_ask: Option<Decimal>,

    /// Highest bid for the YES token
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub best_bid: Option<Decimal>,

    /// Price of the last trade
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub last_trade_price: Option<Decimal>,

    /// Numeric volume
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub volume_num: Option<Decimal>,

    /// Last update timestamp (ISO-8601 UTC)
    #[serde(default)]
    pub updated_at: Option<String>,

    /// Group item title (for multi-outcome events, e.g., "100-119" in "Elon tweets this week")
    #[serde(default)]
    pub group_item_title: Option<String>,
}

/// Accept a number, a numeric string, or null. Anything else reads as absent.
fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n
            .as_f64()
            .and_then(|f| Decimal::from_str(&f.to_string()).ok()),
        Some(serde_json::Value::String(s)) => Decimal::from_str(s.trim())
            .or_else(|_| Decimal::from_scientific(s.trim()))
            .ok(),
        _ => None,
    })
}

/// Accept the JSON-in-a-string encoding or a plain array, re-encoded so both
/// go through `parse_clob_token_ids`. Anything else reads as absent.
fn lenient_token_ids<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(array @ serde_json::Value::Array(_)) => Some(array.to_string()),
        Some(other) => {
            debug!("Ignoring clobTokenIds of unexpected type: {}", other);
            None
        }
    })
}

impl PolymarketMarket {
    /// Parse CLOB token IDs from the JSON string
    ///
    /// Returns (yes_token_id, no_token_id). A missing or unparseable encoding
    /// yields an empty pair; a missing element yields an empty ID.
    pub fn parse_clob_token_ids(&self) -> (String, String) {
        let Some(ids_str) = self.clob_token_ids.as_deref() else {
            return (String::new(), String::new());
        };

        match serde_json::from_str::<Vec<String>>(ids_str) {
            Ok(ids) => {
                let mut ids = ids.into_iter();
                let yes = ids.next().unwrap_or_default();
                let no = ids.next().unwrap_or_default();
                (yes, no)
            }
            Err(e) => {
                debug!("Ignoring malformed clobTokenIds {:?}: {}", ids_str, e);
                (String::new(), String::new())
            }
        }
    }

    /// Display name: group item title, else the first `\d+-\d+` in the question,
    /// else "Unknown"
    pub fn derive_name(&self) -> String {
        if let Some(title) = self.group_item_title.as_deref().filter(|t| !t.is_empty()) {
            return title.to_string();
        }

        self.question
            .as_deref()
            .and_then(|q| QUESTION_RANGE.find(q))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| UNKNOWN_MARKET_NAME.to_string())
    }

    /// YES price: best ask, else last trade price, else zero
    pub fn derive_yes_price(&self) -> Decimal {
        self.best_ask
            .or(self.last_trade_price)
            .unwrap_or(Decimal::ZERO)
    }

    /// NO price: complement of the best bid, else complement of the YES price
    pub fn derive_no_price(&self, yes_price: Decimal) -> Decimal {
        match self.best_bid {
            Some(bid) => Decimal::ONE - bid,
            None => Decimal::ONE - yes_price,
        }
    }

    /// Aggregate volume, zero when absent
    pub fn derive_volume(&self) -> Decimal {
        self.volume_num.unwrap_or(Decimal::ZERO)
    }

    /// Convert to a polyexport-core NormalizedMarket
    pub fn to_normalized_market(&self) -> NormalizedMarket {
        let (yes_token, no_token) = self.parse_clob_token_ids();
        let yes_price = self.derive_yes_price();
        let no_price = self.derive_no_price(yes_price);

        NormalizedMarket {
            name: self.derive_name(),
            condition_id: self.condition_id.clone().unwrap_or_default(),
            yes_token,
            no_token,
            yes_price: round_price(yes_price),
            no_price: round_price(no_price),
            volume: self.derive_volume(),
            updated_at: self.updated_at.clone(),
        }
    }
}

/// Response from GET /prices-history
#[derive(Debug, Clone, Deserialize)]
pub struct PricesHistoryResponse {
    /// List of timestamp/price pairs
    #[serde(default)]
    pub history: Vec<PriceHistoryPoint>,
}

/// A single price point from the CLOB API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PriceHistoryPoint {
    /// Unix timestamp in seconds
    pub t: i64,
    /// Price (0.0 - 1.0)
    pub p: f64,
}

impl PriceHistoryPoint {
    /// Convert to a polyexport-core KlinePoint
    pub fn to_kline_point(&self) -> KlinePoint {
        KlinePoint {
            timestamp: self.t,
            price: Decimal::from_str(&self.p.to_string()).unwrap_or(Decimal::ZERO),
        }
    }
}
