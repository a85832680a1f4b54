//! Terminal rendering of the progress panel

use std::io::{self, Write};

use crossterm::cursor::MoveUp;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use crossterm::tty::IsTty;
use parking_lot::Mutex;
use polyexport_services::{PanelRenderer, ProgressPanel};

/// Draws the panel on stderr
///
/// On a terminal the panel is redrawn in place. Otherwise only new status and
/// summary lines are written, so redirected output stays readable.
pub struct TerminalRenderer {
    interactive: bool,
    last: Mutex<Frame>,
}

#[derive(Default)]
struct Frame {
    lines: usize,
    status: String,
    summary: String,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self {
            interactive: io::stderr().is_tty(),
            last: Mutex::new(Frame::default()),
        }
    }
}

/// Replace the previous frame of `previous_lines` lines with `text`
///
/// Returns the number of lines now on screen.
fn redraw<W: Write>(out: &mut W, text: &str, previous_lines: usize) -> io::Result<usize> {
    if previous_lines > 0 {
        let up = u16::try_from(previous_lines).unwrap_or(u16::MAX);
        queue!(out, MoveUp(up), Clear(ClearType::FromCursorDown))?;
    }
    writeln!(out, "{}", text)?;
    out.flush()?;

    Ok(text.lines().count())
}

/// Write the status and summary lines that changed since the last frame
fn append<W: Write>(out: &mut W, panel: &ProgressPanel, frame: &Frame) -> io::Result<()> {
    if panel.status() != frame.status && !panel.status().is_empty() {
        writeln!(out, "{}", panel.status())?;
    }
    if panel.summary() != frame.summary && !panel.summary().is_empty() {
        writeln!(out, "{}", panel.summary())?;
    }
    out.flush()
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelRenderer for TerminalRenderer {
    fn render(&self, panel: &ProgressPanel) {
        let mut frame = self.last.lock();
        let mut err = io::stderr().lock();

        // A broken stderr must not abort the export
        if self.interactive {
            if let Ok(lines) = redraw(&mut err, &panel.render_text(), frame.lines) {
                frame.lines = lines;
            }
        } else {
            let _ = append(&mut err, panel, &frame);
        }

        frame.status = panel.status().to_string();
        frame.summary = panel.summary().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_is_written_as_is() {
        let mut out = Vec::new();
        let lines = redraw(&mut out, "▾ title\n状态：a", 0).unwrap();

        assert_eq!(lines, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "▾ title\n状态：a\n");
    }

    #[test]
    fn test_next_frame_clears_the_previous_one() {
        let mut out = Vec::new();
        let lines = redraw(&mut out, "▸ title", 3).unwrap();

        let written = String::from_utf8(out).unwrap();
        assert_eq!(lines, 1);
        assert!(written.starts_with("\x1b[3A"));
        assert!(written.ends_with("▸ title\n"));
    }

    #[test]
    fn test_append_skips_unchanged_lines() {
        let mut panel = ProgressPanel::default();
        panel.set_status("working");
        let frame = Frame {
            lines: 0,
            status: "working".to_string(),
            summary: String::new(),
        };

        let mut out = Vec::new();
        append(&mut out, &panel, &frame).unwrap();
        assert!(out.is_empty());

        panel.set_summary("总市场：1 个 ｜ K 线记录：0");
        append(&mut out, &panel, &frame).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "总市场：1 个 ｜ K 线记录：0\n");
    }
}
