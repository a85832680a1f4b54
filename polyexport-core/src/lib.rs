//! Core types for the Polymarket event exporter
//!
//! This crate defines the shared data structures used across the exporter,
//! including normalized markets, price points, CSV tables and the error type.

pub mod error;
pub mod market;
pub mod slug;
pub mod table;
pub mod time;

pub use error::{ExportError, ExportResult};
pub use market::{KlinePoint, NormalizedMarket, OutcomeSide};
pub use slug::slug_from_location;
pub use table::{CsvTable, CsvWriter, ExportKind};
pub use time::to_local_display;
