use crate::models::{PortfolioSummary, Position};
use chrono::{DateTime, Utc};

/// Reduce a position set to portfolio totals, stamped with the current time.
pub fn summarize(positions: Vec<Position>) -> PortfolioSummary {
    summarize_at(positions, Utc::now())
}

/// `summarize` with an explicit timestamp.
///
/// * `total_value`: every asset's USD value, missing values as zero.
/// * `total_accrued`: every position's accrued value with its sign, so borrow costs
///   reduce it.
/// * `weighted_apy`: value-weighted apy over positions worth more than zero that carry
///   an apy, negative rates included. Zero when nothing qualifies.
pub fn summarize_at(positions: Vec<Position>, now: DateTime<Utc>) -> PortfolioSummary {
    let mut total_value = 0.0;
    let mut total_accrued = 0.0;
    let mut weighted_sum = 0.0;
    let mut weight = 0.0;

    for position in &positions {
        let value = position.value_usd();
        total_value += value;
        total_accrued += position.accrued.unwrap_or(0.0);

        if let Some(apy) = position.apy {
            if value > 0.0 {
                weighted_sum += value * apy;
                weight += value;
            }
        }
    }

    let weighted_apy = if weight > 0.0 {
        weighted_sum / weight
    } else {
        0.0
    };

    PortfolioSummary {
        total_value,
        total_accrued,
        weighted_apy,
        positions,
        last_updated: now,
    }
}
