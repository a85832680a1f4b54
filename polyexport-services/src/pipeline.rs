//! Export Pipeline
//!
//! One run exports an event in two steps: the markets CSV, then the K-line
//! CSV. Runs are strictly sequential and only one can be in flight.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{error, info, warn};

use polyexport_core::market::markets_table;
use polyexport_core::{
    slug_from_location, CsvWriter, ExportError, ExportKind, ExportResult, NormalizedMarket,
};
use polyexport_polymarket::MarketDataSource;

use crate::config::ExportConfig;
use crate::kline_collector::{KlineCollector, KlineProgress, KlineRequest};
use crate::progress_panel::ProgressPanel;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    FetchingMarkets,
    MarketsExported,
    FetchingKline,
    Done,
    Failed,
}

impl PipelineState {
    /// Whether a run is in flight
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            PipelineState::FetchingMarkets
                | PipelineState::MarketsExported
                | PipelineState::FetchingKline
        )
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub slug: String,
    pub market_count: usize,
    pub kline_rows: usize,
    pub markets_path: PathBuf,
    pub kline_path: PathBuf,
}

impl ExportSummary {
    /// Summary line shown in the panel
    pub fn summary_text(&self) -> String {
        format!(
            "总市场：{} 个 ｜ K 线记录：{}",
            self.market_count, self.kline_rows
        )
    }
}

/// Drives export runs against a market data source
pub struct ExportPipeline<S: ?Sized> {
    source: Arc<S>,
    config: ExportConfig,
    writer: CsvWriter,
    state: Mutex<PipelineState>,
    panel: Mutex<ProgressPanel>,
}

impl<S: MarketDataSource + ?Sized> ExportPipeline<S> {
    pub fn new(source: Arc<S>, config: ExportConfig, panel: ProgressPanel) -> Self {
        let writer = CsvWriter::new(config.output_dir.clone());
        Self {
            source,
            config,
            writer,
            state: Mutex::new(PipelineState::Idle),
            panel: Mutex::new(panel),
        }
    }

    pub fn state(&self) -> PipelineState {
        *self.state.lock()
    }

    /// Whether a new run may be triggered
    pub fn is_armed(&self) -> bool {
        !self.state().is_running()
    }

    /// Run `f` against the panel
    pub fn with_panel<R>(&self, f: impl FnOnce(&mut ProgressPanel) -> R) -> R {
        f(&mut self.panel.lock())
    }

    /// Export the event at `location` (page URL or slug)
    ///
    /// Fails with `AlreadyRunning`, without touching the current run, when
    /// another run is in flight. Any other failure moves the pipeline to
    /// `Failed`, shows the message in the panel and re-arms the trigger.
    /// Files written before the failure are left in place.
    ///
    /// Dropping the returned future mid-run also re-arms the trigger.
    pub async fn run(&self, location: &str) -> ExportResult<ExportSummary> {
        {
            let mut state = self.state.lock();
            if state.is_running() {
                return Err(ExportError::AlreadyRunning);
            }
            *state = PipelineState::FetchingMarkets;
        }
        let _guard = RunGuard {
            state: &self.state,
            panel: &self.panel,
        };

        match self.execute(location).await {
            Ok(summary) => {
                self.transition(PipelineState::Done);
                self.with_panel(|panel| {
                    panel.set_status("✅ 导出完成");
                    panel.set_summary(summary.summary_text());
                });
                info!(
                    "Export of {} finished: {} markets, {} K-line rows",
                    summary.slug, summary.market_count, summary.kline_rows
                );
                Ok(summary)
            }
            Err(e) => {
                error!("Export failed: {}", e);
                self.transition(PipelineState::Failed);
                self.with_panel(|panel| panel.set_status(format!("❌ 出错：{}", e)));
                Err(e)
            }
        }
    }

    async fn execute(&self, location: &str) -> ExportResult<ExportSummary> {
        let slug = slug_from_location(location)?;
        self.with_panel(|panel| {
            panel.set_summary("");
            panel.set_status(format!("⏳ 正在获取市场列表：{}", slug));
        });

        let markets = self.export_markets(&slug).await?;
        let markets_path = self.writer.download(
            &ExportKind::Markets.filename(&slug, Utc::now().timestamp_millis()),
            &markets_table(&markets)?,
        )?;
        self.transition(PipelineState::MarketsExported);
        self.with_panel(|panel| {
            panel.set_preview(&markets);
            panel.set_status(format!("✅ 已导出 {} 个市场，开始获取 K 线…", markets.len()));
        });

        self.transition(PipelineState::FetchingKline);
        let request = KlineRequest {
            start_ts: self.config.start_timestamp(Utc::now())?,
            fidelity_minutes: self.config.fidelity_minutes,
            delay: self.config.request_delay(),
        };
        let collector = KlineCollector::new(Arc::clone(&self.source), request);
        let table = collector
            .collect(&markets, |progress| self.report_kline_progress(progress))
            .await?;

        let kline_path = self.writer.download(
            &ExportKind::Kline.filename(&slug, Utc::now().timestamp_millis()),
            &table,
        )?;

        Ok(ExportSummary {
            slug,
            market_count: markets.len(),
            kline_rows: table.len(),
            markets_path,
            kline_path,
        })
    }

    async fn export_markets(&self, slug: &str) -> ExportResult<Vec<NormalizedMarket>> {
        let raw = self.source.fetch_markets(slug).await?;
        if raw.is_empty() {
            return Err(ExportError::empty_result(format!(
                "Event {} has no markets",
                slug
            )));
        }

        info!("Fetched {} markets for {}", raw.len(), slug);
        Ok(raw.iter().map(|m| m.to_normalized_market()).collect())
    }

    fn report_kline_progress(&self, progress: &KlineProgress) {
        self.with_panel(|panel| {
            panel.set_status(format!(
                "📈 K 线 {}/{} {}：yes {} 条，no {} 条",
                progress.market_index + 1,
                progress.market_count,
                progress.market_name,
                progress.yes_rows,
                progress.no_rows
            ))
        });
    }

    fn transition(&self, next: PipelineState) {
        let mut state = self.state.lock();
        info!("Pipeline {:?} -> {:?}", *state, next);
        *state = next;
    }
}

/// Moves a run that was abandoned mid-flight to `Failed`
struct RunGuard<'a> {
    state: &'a Mutex<PipelineState>,
    panel: &'a Mutex<ProgressPanel>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state.is_running() {
            warn!("Export abandoned during {:?}", *state);
            *state = PipelineState::Failed;
            drop(state);
            self.panel.lock().set_status("❌ 出错：导出已中断");
        }
    }
}
