use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// USD price of a token as reported by its feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceData {
    pub price: f64,
    /// Decimals of the feed answer the price was derived from.
    pub decimals: u8,
    pub updated_at: DateTime<Utc>,
}

pub type TokenPrices = HashMap<Address, PriceData>;
