//! Export pipeline services for the Polymarket event exporter
//!
//! This crate drives an export run: it fetches the event's markets, writes the
//! markets CSV, collects the price history of every outcome token and writes
//! the K-line CSV, while keeping a progress panel up to date.

pub mod config;
pub mod kline_collector;
pub mod pipeline;
pub mod progress_panel;

pub use config::ExportConfig;
pub use kline_collector::{KlineCollector, KlineProgress, KlineRequest};
pub use pipeline::{ExportPipeline, ExportSummary, PipelineState};
pub use progress_panel::{PanelRenderer, PreviewRow, ProgressPanel};
