//! K-line Collector
//!
//! Walks the normalized markets of an event and fetches the price history of
//! each outcome token, one request at a time with a fixed pause before every
//! request.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use polyexport_core::market::{kline_row, kline_table};
use polyexport_core::{CsvTable, ExportResult, NormalizedMarket, OutcomeSide};
use polyexport_polymarket::MarketDataSource;

/// Parameters shared by every price history request of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KlineRequest {
    /// Unix seconds of the first point
    pub start_ts: i64,
    /// Granularity in minutes
    pub fidelity_minutes: u32,
    /// Pause before each request
    pub delay: Duration,
}

/// Running counts, reported after each outcome side of a market completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KlineProgress {
    /// Zero-based position of the market in the list
    pub market_index: usize,
    pub market_count: usize,
    pub market_name: String,
    /// Side that just completed
    pub side: OutcomeSide,
    /// Rows collected for this market's YES token so far
    pub yes_rows: usize,
    /// Rows collected for this market's NO token so far
    pub no_rows: usize,
    /// Rows collected across all markets so far
    pub total_rows: usize,
}

/// Sequential price history collector
pub struct KlineCollector<S: ?Sized> {
    source: Arc<S>,
    request: KlineRequest,
}

impl<S: MarketDataSource + ?Sized> KlineCollector<S> {
    pub fn new(source: Arc<S>, request: KlineRequest) -> Self {
        Self { source, request }
    }

    /// Collect the K-line table for `markets`
    ///
    /// Rows follow market order, YES before NO within a market, then the
    /// order the API returned the points in. Sides with an empty token ID
    /// issue no request and no delay. The first failed request aborts the
    /// whole collection.
    pub async fn collect<F>(
        &self,
        markets: &[NormalizedMarket],
        mut on_progress: F,
    ) -> ExportResult<CsvTable>
    where
        F: FnMut(&KlineProgress),
    {
        let mut table = kline_table();

        for (index, market) in markets.iter().enumerate() {
            let mut yes_rows = 0;
            let mut no_rows = 0;

            for side in OutcomeSide::ALL {
                let token = market.token(side);

                if !token.is_empty() {
                    if !self.request.delay.is_zero() {
                        tokio::time::sleep(self.request.delay).await;
                    }

                    let points = self
                        .source
                        .fetch_price_history(
                            token,
                            self.request.start_ts,
                            self.request.fidelity_minutes,
                        )
                        .await?;

                    debug!(
                        "{} {} token {}: {} points",
                        market.name,
                        side,
                        token,
                        points.len()
                    );

                    for point in &points {
                        table.push_row(kline_row(market, side, point))?;
                    }

                    match side {
                        OutcomeSide::Yes => yes_rows = points.len(),
                        OutcomeSide::No => no_rows = points.len(),
                    }
                }

                on_progress(&KlineProgress {
                    market_index: index,
                    market_count: markets.len(),
                    market_name: market.name.clone(),
                    side,
                    yes_rows,
                    no_rows,
                    total_rows: table.len(),
                });
            }
        }

        info!(
            "Collected {} K-line rows for {} markets",
            table.len(),
            markets.len()
        );
        Ok(table)
    }
}
