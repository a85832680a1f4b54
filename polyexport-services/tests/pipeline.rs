//! End-to-end export runs against an in-memory market source

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use polyexport_core::{ExportError, ExportResult, KlinePoint};
use polyexport_polymarket::{MarketDataSource, PolymarketMarket};
use polyexport_services::{
    ExportConfig, ExportPipeline, PanelRenderer, PipelineState, ProgressPanel,
};
use rust_decimal::Decimal;

struct FakeSource {
    markets: Vec<PolymarketMarket>,
    history: HashMap<String, Vec<KlinePoint>>,
    failing_token: Option<String>,
    requests: Mutex<Vec<String>>,
}

impl FakeSource {
    fn new(markets: serde_json::Value) -> Self {
        Self {
            markets: serde_json::from_value(markets).unwrap(),
            history: HashMap::new(),
            failing_token: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn with_points(mut self, token: &str, count: usize) -> Self {
        let points = (0..count)
            .map(|i| KlinePoint {
                timestamp: 1_704_067_200 + i as i64 * 3600,
                price: Decimal::new(40 + i as i64, 2),
            })
            .collect();
        self.history.insert(token.to_string(), points);
        self
    }
}

#[async_trait]
impl MarketDataSource for FakeSource {
    async fn fetch_markets(&self, event_slug: &str) -> ExportResult<Vec<PolymarketMarket>> {
        assert_eq!(event_slug, "will-x-happen");
        Ok(self.markets.clone())
    }

    async fn fetch_price_history(
        &self,
        token_id: &str,
        _start_ts: i64,
        fidelity_minutes: u32,
    ) -> ExportResult<Vec<KlinePoint>> {
        assert_eq!(fidelity_minutes, 60);
        self.requests.lock().push(token_id.to_string());
        if self.failing_token.as_deref() == Some(token_id) {
            return Err(ExportError::network("CLOB API error (429 Too Many Requests): slow down"));
        }
        Ok(self.history.get(token_id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct FrameRecorder(Mutex<Vec<String>>);

impl PanelRenderer for FrameRecorder {
    fn render(&self, panel: &ProgressPanel) {
        self.0.lock().push(panel.render_text());
    }
}

fn two_markets() -> serde_json::Value {
    serde_json::json!([
        {
            "question": "Will X happen 100-119 times?",
            "conditionId": "0xaaa",
            "clobTokenIds": "[\"yes-token-000001\", \"no-token-0000002\"]",
            "bestAsk": 0.62,
            "bestBid": 0.6,
            "volumeNum": 1500.25,
            "updatedAt": "2024-01-01T00:00:00.000Z"
        },
        {
            "question": "Will X happen at all?",
            "conditionId": "0xbbb",
            "clobTokenIds": "[]",
            "lastTradePrice": "0.1",
            "updatedAt": "2024-01-02T12:30:00Z"
        }
    ])
}

fn config(dir: &Path) -> ExportConfig {
    ExportConfig {
        output_dir: dir.to_path_buf(),
        request_delay_ms: 0,
        start_ts: Some(1_704_000_000),
        ..ExportConfig::default()
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .split('\n')
        .map(String::from)
        .collect()
}

#[tokio::test]
async fn test_exports_markets_and_klines() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(
        FakeSource::new(two_markets())
            .with_points("yes-token-000001", 3)
            .with_points("no-token-0000002", 3),
    );
    let recorder = Arc::new(FrameRecorder::default());
    let pipeline = ExportPipeline::new(
        source.clone(),
        config(dir.path()),
        ProgressPanel::default().with_renderer(recorder.clone()),
    );

    let summary = pipeline
        .run("https://polymarket.com/event/will-x-happen")
        .await
        .unwrap();

    assert_eq!(pipeline.state(), PipelineState::Done);
    assert!(pipeline.is_armed());
    assert_eq!(summary.market_count, 2);
    assert_eq!(summary.kline_rows, 6);
    assert_eq!(summary.summary_text(), "总市场：2 个 ｜ K 线记录：6");

    let markets_name = summary.markets_path.file_name().unwrap().to_str().unwrap();
    assert!(markets_name.starts_with("markets_will-x-happen_"));
    assert!(markets_name.ends_with(".csv"));
    let kline_name = summary.kline_path.file_name().unwrap().to_str().unwrap();
    assert!(kline_name.starts_with("kline_will-x-happen_"));

    let markets = read_lines(&summary.markets_path);
    assert_eq!(markets.len(), 3);
    assert_eq!(
        markets[0],
        "name,condition_id,yes_token,no_token,yes_price,no_price,yes_volume,no_volume,total_volume,updated"
    );
    assert_eq!(
        markets[1],
        "100-119,0xaaa,yes-token-000001,no-token-0000002,0.620,0.400,1500.25,1500.25,1500.25,2024-01-01 08:00:00.000"
    );
    assert_eq!(
        markets[2],
        "Unknown,0xbbb,,,0.100,0.900,0,0,0,2024-01-02 20:30:00.000"
    );

    let klines = read_lines(&summary.kline_path);
    assert_eq!(klines.len(), 7);
    assert_eq!(klines[0], "market_name,market_id,token_type,token_id,price,timestamp");
    assert_eq!(klines[1], "100-119,0xaaa,yes,yes-token-000001,0.4,1704067200");
    assert_eq!(klines[4], "100-119,0xaaa,no,no-token-0000002,0.4,1704067200");
    assert_eq!(klines[6], "100-119,0xaaa,no,no-token-0000002,0.42,1704074400");

    assert_eq!(
        *source.requests.lock(),
        vec!["yes-token-000001".to_string(), "no-token-0000002".to_string()]
    );

    pipeline.with_panel(|panel| {
        assert_eq!(panel.summary(), "总市场：2 个 ｜ K 线记录：6");
        assert_eq!(panel.preview().len(), 2);
        assert_eq!(panel.preview()[0].yes_token, "yes-token-…");
        assert_eq!(panel.preview()[1].yes_token, "");
    });
    let frames = recorder.0.lock();
    assert!(frames.iter().any(|f| f.contains("K 线 1/2 100-119：yes 3 条，no 3 条")));
    assert!(frames.last().unwrap().contains("总市场：2 个 ｜ K 线记录：6"));
}

#[tokio::test]
async fn test_kline_failure_keeps_markets_file_only() {
    let dir = tempfile::tempdir().unwrap();
    let mut fake = FakeSource::new(two_markets()).with_points("yes-token-000001", 3);
    fake.failing_token = Some("no-token-0000002".to_string());
    let pipeline = ExportPipeline::new(
        Arc::new(fake),
        config(dir.path()),
        ProgressPanel::default(),
    );

    let err = pipeline.run("will-x-happen").await.unwrap_err();

    assert!(matches!(err, ExportError::Network(_)));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(pipeline.is_armed());

    let files: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("markets_will-x-happen_"));

    pipeline.with_panel(|panel| {
        assert!(panel.status().contains("429"));
        assert_eq!(panel.summary(), "");
    });
}

#[tokio::test]
async fn test_malformed_update_time_fails_before_any_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeSource::new(serde_json::json!([
        { "groupItemTitle": "A", "updatedAt": "last tuesday" }
    ]));
    let pipeline = ExportPipeline::new(
        Arc::new(source),
        config(dir.path()),
        ProgressPanel::default(),
    );

    let err = pipeline.run("will-x-happen").await.unwrap_err();

    assert!(matches!(err, ExportError::Format(_)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_pipeline_can_run_again_after_failure() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = ExportPipeline::new(
        Arc::new(FakeSource::new(two_markets())),
        config(dir.path()),
        ProgressPanel::default(),
    );

    assert!(pipeline.run("https://polymarket.com/").await.is_err());
    assert_eq!(pipeline.state(), PipelineState::Failed);

    let summary = pipeline.run("will-x-happen").await.unwrap();
    assert_eq!(summary.kline_rows, 0);
    assert_eq!(pipeline.state(), PipelineState::Done);
}
