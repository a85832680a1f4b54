//! Polymarket API client
//!
//! Provides the market listing (Gamma API) and price history (CLOB API)
//! requests the exporter is built on.

use crate::types::{
    PolymarketEvent, PolymarketMarket, PricesHistoryResponse, CLOB_API_BASE, GAMMA_API_BASE,
};
use async_trait::async_trait;
use polyexport_core::{ExportError, ExportResult, KlinePoint};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of event markets and token price history
///
/// Implemented by [`PolymarketClient`]; the collector and pipeline only
/// depend on this trait.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Raw markets of the event with the given slug
    ///
    /// Fails with `EmptyResult` when the event has no markets.
    async fn fetch_markets(&self, event_slug: &str) -> ExportResult<Vec<PolymarketMarket>>;

    /// Price history of one outcome token, in the order the API returns it
    async fn fetch_price_history(
        &self,
        token_id: &str,
        start_ts: i64,
        fidelity_minutes: u32,
    ) -> ExportResult<Vec<KlinePoint>>;
}

/// Polymarket API client
#[derive(Clone)]
pub struct PolymarketClient {
    client: Client,
    base_url: String,
    clob_url: String,
}

impl PolymarketClient {
    /// Create a client against the public Polymarket hosts
    pub fn new() -> ExportResult<Self> {
        Self::with_urls(GAMMA_API_BASE, CLOB_API_BASE, DEFAULT_TIMEOUT)
    }

    /// Create a client against explicit hosts
    pub fn with_urls(
        base_url: impl Into<String>,
        clob_url: impl Into<String>,
        timeout: Duration,
    ) -> ExportResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExportError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            clob_url: clob_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the CLOB URL
    pub fn clob_url(&self) -> &str {
        &self.clob_url
    }

    /// Get an event by slug
    #[instrument(skip(self))]
    pub async fn get_event(&self, slug: &str) -> ExportResult<PolymarketEvent> {
        let url = format!("{}/events/slug/{}", self.base_url, slug);

        debug!("Fetching Polymarket event from: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ExportError::network(format!("Failed to fetch event: {}", e)))?;

        decode(response, "Gamma API", "event").await
    }

    /// Get price history for a token from the CLOB API
    ///
    /// # Arguments
    /// * `token_id` - The CLOB token ID (YES or NO token)
    /// * `start_ts` - Unix seconds of the first point
    /// * `fidelity` - Granularity in minutes
    #[instrument(skip(self))]
    pub async fn get_prices_history(
        &self,
        token_id: &str,
        start_ts: i64,
        fidelity: u32,
    ) -> ExportResult<PricesHistoryResponse> {
        let url = format!(
            "{}/prices-history?startTs={}&market={}&fidelity={}",
            self.clob_url, start_ts, token_id, fidelity
        );

        debug!("Fetching Polymarket price history from: {}", url);

        let response =
            self.client.get(&url).send().await.map_err(|e| {
                ExportError::network(format!("Failed to fetch price history: {}", e))
            })?;

        decode(response, "CLOB API", "price history").await
    }
}

/// Reject non-success statuses, then decode the JSON body
async fn decode<T: DeserializeOwned>(
    response: Response,
    api: &str,
    what: &str,
) -> ExportResult<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ExportError::network(format!(
            "{} error ({}): {}",
            api, status, body
        )));
    }

    response
        .json()
        .await
        .map_err(|e| ExportError::parse(format!("Failed to parse {} response: {}", what, e)))
}

#[async_trait]
impl MarketDataSource for PolymarketClient {
    async fn fetch_markets(&self, event_slug: &str) -> ExportResult<Vec<PolymarketMarket>> {
        let event = self.get_event(event_slug).await?;

        if event.markets.is_empty() {
            return Err(ExportError::empty_result(format!(
                "Event {} has no markets",
                event_slug
            )));
        }

        debug!("Event {} has {} markets", event_slug, event.markets.len());
        Ok(event.markets)
    }

    async fn fetch_price_history(
        &self,
        token_id: &str,
        start_ts: i64,
        fidelity_minutes: u32,
    ) -> ExportResult<Vec<KlinePoint>> {
        let response = self
            .get_prices_history(token_id, start_ts, fidelity_minutes)
            .await?;

        Ok(response
            .history
            .iter()
            .map(|p| p.to_kline_point())
            .collect())
    }
}

impl std::fmt::Debug for PolymarketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolymarketClient")
            .field("base_url", &self.base_url)
            .field("clob_url", &self.clob_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a loopback port, returning its URL
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{}", addr)
    }

    fn client_for(url: &str) -> PolymarketClient {
        PolymarketClient::with_urls(url, url, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_trailing_slashes_trimmed() {
        let client = PolymarketClient::with_urls(
            "http://localhost:9000/",
            "http://localhost:9001//",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000");
        assert_eq!(client.clob_url(), "http://localhost:9001");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Port 9 (discard) on loopback refuses connections on CI hosts
        let client = PolymarketClient::with_urls(
            "http://127.0.0.1:9",
            "http://127.0.0.1:9",
            Duration::from_secs(2),
        )
        .unwrap();

        let err = client.fetch_markets("will-x-happen").await.unwrap_err();
        assert!(matches!(err, ExportError::Network(_)));

        let err = client.fetch_price_history("111", 0, 60).await.unwrap_err();
        assert!(matches!(err, ExportError::Network(_)));
    }

    #[tokio::test]
    async fn test_error_status_is_network_error_with_body() {
        let url = serve_once("500 Internal Server Error", "upstream exploded").await;

        let err = client_for(&url).fetch_markets("will-x-happen").await.unwrap_err();

        match err {
            ExportError::Network(msg) => {
                assert!(msg.contains("500"), "{}", msg);
                assert!(msg.contains("upstream exploded"), "{}", msg);
            }
            other => panic!("expected network error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_event_without_markets_is_empty_result() {
        for body in [r#"{"markets":[]}"#, r#"{"id":"1","title":"T"}"#] {
            let url = serve_once("200 OK", body).await;

            let err = client_for(&url).fetch_markets("will-x-happen").await.unwrap_err();
            assert!(matches!(err, ExportError::EmptyResult(_)), "{:?}", err);
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let url = serve_once("200 OK", "<html>").await;

        let err = client_for(&url).fetch_price_history("111", 0, 60).await.unwrap_err();
        assert!(matches!(err, ExportError::Parse(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_price_history_points() {
        let url = serve_once(
            "200 OK",
            r#"{"history":[{"t":1700000000,"p":0.5},{"t":1700003600,"p":0.52}]}"#,
        )
        .await;

        let points = client_for(&url).fetch_price_history("111", 0, 60).await.unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[1].timestamp, 1_700_003_600);
        assert_eq!(points[1].price.to_string(), "0.52");
    }
}
