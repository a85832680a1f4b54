//! Progress panel state
//!
//! Holds what the user sees during an export: a status line, a summary line
//! and a preview of the first markets. Every setter asks the attached
//! renderer, if any, to redraw.

use std::sync::Arc;

use polyexport_core::NormalizedMarket;
use unicode_width::UnicodeWidthStr;

use crate::config::DEFAULT_PREVIEW_LIMIT;

/// Characters of a token ID kept in the preview
pub const TOKEN_PREVIEW_CHARS: usize = 10;

const PANEL_TITLE: &str = "Polymarket 数据导出";

/// Draws the panel somewhere the user can see it
pub trait PanelRenderer: Send + Sync {
    fn render(&self, panel: &ProgressPanel);
}

/// One row of the market preview table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRow {
    pub name: String,
    pub yes_token: String,
    pub no_token: String,
    pub yes_price: String,
}

impl PreviewRow {
    fn from_market(market: &NormalizedMarket) -> Self {
        Self {
            name: market.name.clone(),
            yes_token: truncate_token(&market.yes_token),
            no_token: truncate_token(&market.no_token),
            yes_price: market.yes_price_text(),
        }
    }
}

/// Shorten a token ID for display
pub fn truncate_token(token: &str) -> String {
    if token.chars().count() <= TOKEN_PREVIEW_CHARS {
        return token.to_string();
    }
    let head: String = token.chars().take(TOKEN_PREVIEW_CHARS).collect();
    format!("{}…", head)
}

/// Left-align `text` in `width` terminal columns
fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

/// UI state of an export run
pub struct ProgressPanel {
    collapsed: bool,
    status: String,
    summary: String,
    preview: Vec<PreviewRow>,
    preview_limit: usize,
    renderer: Option<Arc<dyn PanelRenderer>>,
}

impl ProgressPanel {
    pub fn new(preview_limit: usize) -> Self {
        Self {
            collapsed: false,
            status: String::new(),
            summary: String::new(),
            preview: Vec::new(),
            preview_limit,
            renderer: None,
        }
    }

    /// Attach a renderer that is invoked after every change
    pub fn with_renderer(mut self, renderer: Arc<dyn PanelRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.redraw();
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = summary.into();
        self.redraw();
    }

    /// Show the first `preview_limit` markets
    pub fn set_preview(&mut self, markets: &[NormalizedMarket]) {
        self.preview = markets
            .iter()
            .take(self.preview_limit)
            .map(PreviewRow::from_market)
            .collect();
        self.redraw();
    }

    /// Collapse or expand; the contents are kept either way
    pub fn toggle_collapsed(&mut self) {
        self.collapsed = !self.collapsed;
        self.redraw();
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn preview(&self) -> &[PreviewRow] {
        &self.preview
    }

    /// Plain-text view of the panel
    pub fn render_text(&self) -> String {
        if self.collapsed {
            return format!("▸ {}", PANEL_TITLE);
        }

        let mut lines = vec![format!("▾ {}", PANEL_TITLE)];
        if !self.status.is_empty() {
            lines.push(format!("状态：{}", self.status));
        }
        if !self.summary.is_empty() {
            lines.push(self.summary.clone());
        }

        if !self.preview.is_empty() {
            let name_width = self
                .preview
                .iter()
                .map(|r| r.name.width())
                .max()
                .unwrap_or(0)
                .max("name".len());
            let token_width = TOKEN_PREVIEW_CHARS + 1;

            let row = |name: &str, yes: &str, no: &str, price: &str| {
                format!(
                    "{}  {}  {}  {}",
                    pad(name, name_width),
                    pad(yes, token_width),
                    pad(no, token_width),
                    price
                )
            };

            lines.push(row("name", "yes_token", "no_token", "yes_price"));
            for r in &self.preview {
                lines.push(row(&r.name, &r.yes_token, &r.no_token, &r.yes_price));
            }
        }

        lines.join("\n")
    }

    fn redraw(&self) {
        if let Some(renderer) = &self.renderer {
            renderer.render(self);
        }
    }
}

impl Default for ProgressPanel {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_LIMIT)
    }
}

impl std::fmt::Debug for ProgressPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressPanel")
            .field("collapsed", &self.collapsed)
            .field("status", &self.status)
            .field("summary", &self.summary)
            .field("preview_rows", &self.preview.len())
            .finish()
    }
}
