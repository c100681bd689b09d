//! Styled rendering for human display.
//!
//! Unlike marshaling, rendering is not meant to reconstruct state: it
//! overlays a visible cursor (reverse video at the cursor cell, honoring the
//! blink epoch) and terminates every line with a reset so partial output
//! never bleeds styles into the host terminal.

use std::io;
use std::time::Instant;

use crate::canvas::Region;
use crate::format::{Format, FormatFlags};
use crate::screen::Screen;
use crate::terminal::Terminal;

const RESET_SEQ: &str = "\x1b[0m";

/// A captured line: content runes plus the format runs covering them.
///
/// Delivered to the scrollback hook when rows fall off the top of the
/// scroll region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub content: Vec<char>,
    pub regions: Vec<Region>,
}

impl Line {
    /// The line's text without any styling.
    pub fn text(&self) -> String {
        self.content.iter().collect()
    }

    /// The line styled with ANSI escapes, reset at the end.
    pub fn display(&self) -> String {
        let mut out = String::new();
        let mut last = Format::EMPTY;
        let mut pos = 0;
        for region in &self.regions {
            if region.format != last {
                out.push_str(&region.format.render(None, None));
                last = region.format;
            }
            let end = (pos + region.size).min(self.content.len());
            out.extend(&self.content[pos..end]);
            pos = end;
        }
        // Content past the last region keeps the trailing format.
        out.extend(&self.content[pos.min(self.content.len())..]);
        out.push_str(RESET_SEQ);
        out
    }
}

/// Whether a blinking cursor is currently in its visible phase.
fn blink_visible(epoch: Option<Instant>) -> bool {
    match epoch {
        None => true,
        Some(epoch) => epoch.elapsed().as_secs() % 2 == 0,
    }
}

fn render_line_to(w: &mut dyn io::Write, screen: &Screen, row: usize) -> io::Result<()> {
    let mut last = Format::EMPTY;
    let mut emit = |w: &mut dyn io::Write, f: Format, last: &mut Format| -> io::Result<()> {
        if f != *last {
            w.write_all(f.render(None, None).as_bytes())?;
            *last = f;
        }
        Ok(())
    };

    let line = screen.line(row).unwrap_or(&[]);
    let cursor = screen.cursor();
    let mut pos = 0;

    for region in screen.regions(row) {
        let end = (pos + region.size).min(line.len());
        if end <= pos {
            break;
        }

        let show_cursor = screen.cursor_visible()
            && row == cursor.y
            && cursor.x >= pos
            && cursor.x < end
            && blink_visible(screen.cursor_blink_epoch);

        if show_cursor {
            let before: String = line[pos..cursor.x].iter().collect();
            let at: String = line[cursor.x..=cursor.x].iter().collect();
            let after: String = line[cursor.x + 1..end].iter().collect();

            if !before.is_empty() {
                emit(w, region.format, &mut last)?;
                w.write_all(before.as_bytes())?;
            }

            let mut invert = region.format;
            invert.flags.toggle(FormatFlags::REVERSE);
            emit(w, invert, &mut last)?;
            w.write_all(at.as_bytes())?;

            if !after.is_empty() {
                emit(w, region.format, &mut last)?;
                w.write_all(after.as_bytes())?;
            }
        } else {
            emit(w, region.format, &mut last)?;
            let text: String = line[pos..end].iter().collect();
            w.write_all(text.as_bytes())?;
        }

        pos = end;
    }

    w.write_all(RESET_SEQ.as_bytes())
}

impl Terminal {
    /// Write a styled rendition of the whole screen, one line per row.
    pub fn render(&self, w: &mut dyn io::Write) -> io::Result<()> {
        for row in 0..self.screen.height() {
            if row > 0 {
                w.write_all(b"\n")?;
            }
            render_line_to(w, &self.screen, row)?;
        }
        Ok(())
    }

    /// Write a styled rendition of a single row.
    pub fn render_line(&self, w: &mut dyn io::Write, row: usize) -> io::Result<()> {
        if row >= self.screen.height() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("line {row} exceeds screen height"),
            ));
        }
        render_line_to(w, &self.screen, row)
    }
}
