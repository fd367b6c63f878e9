// src/render/terminal.rs

use super::BandRenderer;
use crate::config::DisplayConfig;
use crossterm::{
    cursor::MoveTo,
    queue,
    terminal::{BeginSynchronizedUpdate, Clear, ClearType, EndSynchronizedUpdate},
};
use std::fmt::Write as FmtWrite;
use std::io::{self, Write, stdout};

const PARTIAL: [char; 7] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇'];
const FULL: char = '█';
const REFERENCE_FLOOR: f32 = 1e-6;

/// Lays out a vertical bar chart, top row first.
///
/// Each band is `bar_width` columns wide with one blank column between bars.
/// Values are scaled against `reference` and clamped to the chart height.
pub fn bar_rows(bands: &[f32], height: usize, bar_width: usize, reference: f32) -> Vec<String> {
    let h = height.max(1);
    let w = bar_width.max(1);
    let reference = reference.max(REFERENCE_FLOOR);

    // Height of each bar in eighths of a cell.
    let eighths: Vec<usize> = bands
        .iter()
        .map(|&b| {
            let level = (b.max(0.0) / reference).min(1.0) * h as f32;
            (level * 8.0).round() as usize
        })
        .collect();

    (0..h)
        .map(|row_from_top| {
            let row = h - 1 - row_from_top;
            let mut line = String::with_capacity(bands.len() * (w + 1));
            for (i, &e) in eighths.iter().enumerate() {
                if i > 0 {
                    line.push(' ');
                }
                let full = e / 8;
                let rem = e % 8;
                let cell = if row < full {
                    FULL
                } else if row == full && rem > 0 {
                    PARTIAL[rem - 1]
                } else {
                    ' '
                };
                for _ in 0..w {
                    line.push(cell);
                }
            }
            line
        })
        .collect()
}

/// Bar chart drawn in place below a fixed terminal row.
pub struct TerminalBars {
    origin_row: u16,
    height: usize,
    bar_width: usize,
    peak_decay: f32,
    reference: f32,
    draw_buffer: String,
}

impl TerminalBars {
    pub fn new(origin_row: u16, display: &DisplayConfig) -> Self {
        Self {
            origin_row,
            height: display.height,
            bar_width: display.bar_width,
            peak_decay: display.peak_decay,
            reference: 0.0,
            draw_buffer: String::with_capacity(4096),
        }
    }

    /// Follows the loudest band immediately and falls back slowly when it drops.
    fn update_reference(&mut self, bands: &[f32]) -> f32 {
        let loudest = bands.iter().copied().fold(0.0f32, f32::max);
        self.reference = loudest.max(self.reference * self.peak_decay);
        self.reference
    }

    fn compose(&mut self, bands: &[f32]) -> Vec<String> {
        let reference = self.update_reference(bands);
        bar_rows(bands, self.height, self.bar_width, reference)
    }
}

impl BandRenderer for TerminalBars {
    fn render(&mut self, bands: &[f32]) -> Result<(), anyhow::Error> {
        let rows = self.compose(bands);

        self.draw_buffer.clear();
        for (i, line) in rows.iter().enumerate() {
            let _ = write!(
                self.draw_buffer,
                "{}{}{}",
                MoveTo(0, self.origin_row.saturating_add(i as u16)),
                Clear(ClearType::CurrentLine),
                line
            );
        }

        let mut out = stdout().lock();
        queue!(out, BeginSynchronizedUpdate)?;
        out.write_all(self.draw_buffer.as_bytes())?;
        queue!(out, EndSynchronizedUpdate)?;
        out.flush()?;
        Ok(())
    }
}

/// Positions, clears and writes one text line as a single unit on `out`.
pub fn write_status_line<W: Write>(out: &mut W, row: u16, text: &str) -> io::Result<()> {
    queue!(out, MoveTo(0, row), Clear(ClearType::CurrentLine))?;
    out.write_all(text.as_bytes())?;
    out.flush()
}

/// Status text below the chart. Holds the stdout lock for the whole line, so a
/// chart redraw from the render thread cannot land in the middle of it.
pub fn draw_status_line(row: u16, text: &str) -> io::Result<()> {
    let mut out = stdout().lock();
    write_status_line(&mut out, row, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(rows: &[String], col: usize) -> String {
        rows.iter().map(|r| r.chars().nth(col).unwrap()).collect()
    }

    #[test]
    fn full_and_empty_bars() {
        let rows = bar_rows(&[1.0, 0.0], 4, 1, 1.0);
        assert_eq!(rows.len(), 4);
        assert_eq!(column(&rows, 0), "████");
        assert_eq!(column(&rows, 2), "    ");
    }

    #[test]
    fn half_bar_fills_lower_rows() {
        let rows = bar_rows(&[0.5], 4, 1, 1.0);
        assert_eq!(column(&rows, 0), "  ██");
    }

    #[test]
    fn partial_cell_on_top() {
        // 0.3 of 4 rows = 1.2 rows -> one full cell plus a low partial block
        let rows = bar_rows(&[0.3], 4, 1, 1.0);
        assert_eq!(column(&rows, 0), "  ▂█");
    }

    #[test]
    fn values_above_reference_are_clamped() {
        let rows = bar_rows(&[10.0], 3, 2, 1.0);
        assert!(rows.iter().all(|r| r == "██"));
    }

    #[test]
    fn bar_width_and_gaps() {
        let rows = bar_rows(&[1.0, 1.0, 1.0], 1, 3, 1.0);
        assert_eq!(rows[0], "███ ███ ███");
    }

    #[test]
    fn zero_reference_draws_nothing() {
        let rows = bar_rows(&[0.0, 0.0], 2, 1, 0.0);
        assert!(rows.iter().all(|r| r.trim().is_empty()));
    }

    #[test]
    fn reference_decays_towards_quieter_frames() {
        let mut bars = TerminalBars::new(0, &DisplayConfig::default());
        assert_eq!(bars.update_reference(&[2.0, 1.0]), 2.0);
        let r = bars.update_reference(&[0.5]);
        assert!((r - 1.8).abs() < 1e-6);
        assert_eq!(bars.update_reference(&[5.0]), 5.0);
    }

    #[test]
    fn status_line_is_one_positioned_write() {
        let mut out = Vec::new();
        write_status_line(&mut out, 3, "vol 50%").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\x1b[4;1H\x1b[2Kvol 50%");
    }
}
